//! LeapMotion landmarks (feature `leap`).
//!
//! Leap reports joints in millimetres above the device; they are projected
//! onto the 21-point image layout so the classifier cannot tell the
//! difference from a camera model.

use hand_gesture::{Landmark, Landmarks, LANDMARK_COUNT};

/// Width of the tracked box mapped onto the image, mm.
const SPAN_MM: f32 = 400.0;
/// Height above the device mapped to the bottom of the image, mm.
const FLOOR_MM: f32 = 50.0;

/// Project one Leap joint into normalised, mirrored image coordinates.
pub fn leap_to_image(p: [f32; 3]) -> Landmark {
    Landmark::new(
        0.5 + p[0] / SPAN_MM,
        1.0 - (p[1] - FLOOR_MM) / SPAN_MM,
        p[2] / SPAN_MM,
    )
}

/// Build the 21-point layout from a wrist and five digits of four joints
/// each (base, two knuckles, tip), thumb first.
pub fn landmarks_from_joints(wrist: [f32; 3], digits: &[[[f32; 3]; 4]; 5]) -> Landmarks {
    let mut out: Landmarks = [leap_to_image(wrist); LANDMARK_COUNT];
    for (f, joints) in digits.iter().enumerate() {
        for (j, p) in joints.iter().enumerate() {
            out[1 + f * 4 + j] = leap_to_image(*p);
        }
    }
    out
}

// ════════════════════════════════════════════════════════════════════════════
// LeapLandmarkSource — real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "leap")]
pub use self::device::LeapLandmarkSource;

#[cfg(feature = "leap")]
mod device {
    use leaprs::*;

    use hand_gesture::{HandObservation, HandSide};

    use super::landmarks_from_joints;
    use crate::camera::Frame;
    use crate::landmarks::{LandmarkError, LandmarkSource};

    /// Tracking messages drained per video frame.
    const POLLS_PER_FRAME: usize = 8;

    /// Requires the LeapC shared library installed on the system.
    pub struct LeapLandmarkSource {
        connection: Connection,
        last:       Vec<HandObservation>,
    }

    impl LeapLandmarkSource {
        pub fn open() -> Result<Self, LandmarkError> {
            let mut connection = Connection::create(ConnectionConfig::default())
                .map_err(|e| LandmarkError::Init(format!("LeapC connection: {:?}", e)))?;
            connection
                .open()
                .map_err(|e| LandmarkError::Init(format!("LeapMotion device: {:?}", e)))?;
            log::info!("LeapMotion connection open");
            Ok(LeapLandmarkSource { connection, last: Vec::new() })
        }
    }

    impl LandmarkSource for LeapLandmarkSource {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<HandObservation>, LandmarkError> {
            for _ in 0..POLLS_PER_FRAME {
                let msg = match self.connection.poll(0) {
                    Ok(m)  => m,
                    Err(_) => break,
                };

                if let Event::Tracking(tracking) = msg.event() {
                    let mut hands = Vec::with_capacity(2);
                    for hand in tracking.hands() {
                        let side = if hand.hand_type() == HandType::Left { HandSide::Left } else { HandSide::Right };
                        let digits: Vec<_> = hand.digits().collect();
                        if digits.len() < 5 {
                            continue;
                        }

                        let mut joints = [[[0.0f32; 3]; 4]; 5];
                        for (f, digit) in digits.iter().take(5).enumerate() {
                            let bones = [
                                digit.proximal().prev_joint(),
                                digit.intermediate().prev_joint(),
                                digit.distal().prev_joint(),
                                digit.distal().next_joint(),
                            ];
                            for (j, v) in bones.iter().enumerate() {
                                joints[f][j] = [v.x, v.y, v.z];
                            }
                        }

                        // Wrist ≈ mean of the four finger metacarpal bases
                        let mut wrist = [0.0f32; 3];
                        for digit in digits.iter().skip(1).take(4) {
                            let base = digit.metacarpal().prev_joint();
                            wrist[0] += base.x / 4.0;
                            wrist[1] += base.y / 4.0;
                            wrist[2] += base.z / 4.0;
                        }

                        hands.push(HandObservation::new(side, landmarks_from_joints(wrist, &joints), frame.timestamp));
                    }
                    self.last = hands;
                }
            }

            // Re-stamp the latest hands with this frame's time
            Ok(self
                .last
                .iter()
                .map(|h| HandObservation { timestamp: frame.timestamp, ..h.clone() })
                .collect())
        }

        fn name(&self) -> &str {
            "LeapMotion"
        }
    }
}
