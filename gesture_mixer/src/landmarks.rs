//! Hand-landmark sources: simulated from the keyboard, or real hardware.
//!
//! The main loop only sees [`LandmarkSource`]: give it a frame, get back the
//! hands it found. Whether those came from a model, a LeapMotion or the
//! keyboard simulator does not matter downstream.

use std::sync::mpsc::Receiver;

use thiserror::Error;

use hand_gesture::{Direction, HandObservation, HandSide};

use crate::camera::Frame;

#[derive(Debug, Error)]
pub enum LandmarkError {
    #[error("model not found: {0}")]
    ModelMissing(String),

    #[error("landmark backend failed to start: {0}")]
    Init(String),

    #[error("landmark inference failed: {0}")]
    Inference(String),
}

// ════════════════════════════════════════════════════════════════════════════
// LandmarkSource: one interface over model, hardware and simulator
// ════════════════════════════════════════════════════════════════════════════

pub trait LandmarkSource {
    /// Hands visible in `frame`, at most one per side expected.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandObservation>, LandmarkError>;

    fn name(&self) -> &str;
}

// ════════════════════════════════════════════════════════════════════════════
// Simulation input (sent by the overlay window)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input event from the overlay window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    KeyDown(SimKey),
}

/// Simulated key codes (mapped from minifb keys by the overlay).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimKey {
    /// W/A/S/D for the left hand, I/J/K/L for the right.
    Move(HandSide, Direction),
    /// E for the left hand, O for the right.
    Rotate(HandSide),
    /// Z for the left hand, X for the right.
    ToggleVisible(HandSide),
}

// ════════════════════════════════════════════════════════════════════════════
// SimLandmarkSource — keyboard simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Distance moved per key event, normalised image units.
pub const SIM_STEP: f32 = 0.025;
/// Rotation per key event, degrees.
pub const SIM_TURN_DEG: f32 = 6.0;
const SIM_HAND_SIZE: f32 = 0.09;

#[derive(Clone, Copy, Debug, PartialEq)]
struct SimHand {
    x:       f32,
    y:       f32,
    angle:   f32,
    visible: bool,
}

impl SimHand {
    fn home(side: HandSide) -> Self {
        let x = match side {
            HandSide::Left  => 0.3,
            HandSide::Right => 0.7,
        };
        SimHand { x, y: 0.7, angle: 0.0, visible: true }
    }
}

/// Two synthetic 21-point hands steered by [`SimInput`] events.
///
/// Each call to `detect` first applies every pending key event, then reports
/// the visible hands at the frame's timestamp.
pub struct SimLandmarkSource {
    rx:    Receiver<SimInput>,
    left:  SimHand,
    right: SimHand,
}

impl SimLandmarkSource {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        SimLandmarkSource {
            rx,
            left:  SimHand::home(HandSide::Left),
            right: SimHand::home(HandSide::Right),
        }
    }

    fn hand_mut(&mut self, side: HandSide) -> &mut SimHand {
        match side {
            HandSide::Left  => &mut self.left,
            HandSide::Right => &mut self.right,
        }
    }

    fn apply(&mut self, input: SimInput) {
        let SimInput::KeyDown(key) = input;
        match key {
            SimKey::Move(side, dir) => {
                let hand = self.hand_mut(side);
                let (dx, dy) = match dir {
                    Direction::Up    => (0.0, -SIM_STEP),
                    Direction::Down  => (0.0, SIM_STEP),
                    Direction::Left  => (-SIM_STEP, 0.0),
                    Direction::Right => (SIM_STEP, 0.0),
                };
                hand.x = (hand.x + dx).clamp(0.05, 0.95);
                hand.y = (hand.y + dy).clamp(0.25, 0.95);
            }
            SimKey::Rotate(side) => {
                let hand = self.hand_mut(side);
                hand.angle = (hand.angle + SIM_TURN_DEG) % 360.0;
            }
            SimKey::ToggleVisible(side) => {
                let hand = self.hand_mut(side);
                hand.visible = !hand.visible;
                log::info!("Simulated {} hand {}", side, if hand.visible { "shown" } else { "hidden" });
            }
        }
    }
}

impl LandmarkSource for SimLandmarkSource {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<HandObservation>, LandmarkError> {
        while let Ok(input) = self.rx.try_recv() {
            self.apply(input);
        }
        let hands = [(HandSide::Left, self.left), (HandSide::Right, self.right)];
        Ok(hands
            .iter()
            .filter(|(_, h)| h.visible)
            .map(|(side, h)| HandObservation::synthetic(*side, h.x, h.y, h.angle, SIM_HAND_SIZE, frame.timestamp))
            .collect())
    }

    fn name(&self) -> &str {
        "keyboard simulation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hand_gesture::{DualClassifier, GestureConfig};
    use std::sync::mpsc;
    use std::time::Duration;

    fn frame(n: u64) -> Frame {
        Frame::blank(4, 4, Duration::from_millis(n * 33))
    }

    #[test]
    fn both_hands_visible_at_start() {
        let (_tx, rx) = mpsc::channel();
        let mut sim = SimLandmarkSource::new(rx);
        let hands = sim.detect(&frame(0)).unwrap();
        assert_eq!(hands.len(), 2);
        assert_eq!(hands[0].side, HandSide::Left);
        assert!(hands[0].wrist().x < hands[1].wrist().x);
        assert_eq!(hands[1].timestamp, Duration::ZERO);
    }

    #[test]
    fn move_key_shifts_only_that_hand() {
        let (tx, rx) = mpsc::channel();
        let mut sim = SimLandmarkSource::new(rx);
        let before = sim.detect(&frame(0)).unwrap();
        tx.send(SimInput::KeyDown(SimKey::Move(HandSide::Right, Direction::Up))).unwrap();
        let after = sim.detect(&frame(1)).unwrap();
        assert_eq!(before[0].wrist(), after[0].wrist());
        assert!((before[1].wrist().y - after[1].wrist().y - SIM_STEP).abs() < 1e-6);
    }

    #[test]
    fn toggle_hides_a_hand() {
        let (tx, rx) = mpsc::channel();
        let mut sim = SimLandmarkSource::new(rx);
        tx.send(SimInput::KeyDown(SimKey::ToggleVisible(HandSide::Left))).unwrap();
        let hands = sim.detect(&frame(0)).unwrap();
        assert_eq!(hands.len(), 1);
        assert_eq!(hands[0].side, HandSide::Right);
    }

    #[test]
    fn positions_stay_on_screen() {
        let (tx, rx) = mpsc::channel();
        let mut sim = SimLandmarkSource::new(rx);
        for _ in 0..100 {
            tx.send(SimInput::KeyDown(SimKey::Move(HandSide::Left, Direction::Left))).unwrap();
        }
        let hands = sim.detect(&frame(0)).unwrap();
        assert!((hands[0].wrist().x - 0.05).abs() < 1e-6);
    }

    #[test]
    fn held_move_key_fires_one_directional_gesture() {
        let (tx, rx) = mpsc::channel();
        let mut sim = SimLandmarkSource::new(rx);
        let mut classifier = DualClassifier::new(GestureConfig::default());

        let mut fired = Vec::new();
        for n in 0..6 {
            if n > 0 {
                tx.send(SimInput::KeyDown(SimKey::Move(HandSide::Left, Direction::Up))).unwrap();
            }
            let hands = sim.detect(&frame(n)).unwrap();
            fired.extend(classifier.process(&hands).into_iter().filter_map(|s| s.fired));
        }
        assert_eq!(fired, vec![Direction::Up]);
    }

    #[test]
    fn held_rotate_key_toggles_once() {
        let (tx, rx) = mpsc::channel();
        let mut sim = SimLandmarkSource::new(rx);
        let mut classifier = DualClassifier::new(GestureConfig::default());

        let mut toggles = 0;
        for n in 0..12 {
            if n > 0 {
                tx.send(SimInput::KeyDown(SimKey::Rotate(HandSide::Right))).unwrap();
            }
            let hands = sim.detect(&frame(n)).unwrap();
            toggles += classifier.process(&hands).iter().filter(|s| s.rotation_toggled).count();
        }
        assert_eq!(toggles, 1);
    }
}
