//! Hand observations as delivered by a landmark source.
//!
//! Coordinates are normalised image coordinates: `x` grows to the right,
//! `y` grows downward, both in `0.0..=1.0` for points inside the frame.
//! `z` is relative depth and is carried through but not used for gestures.

use std::fmt;
use std::time::Duration;

/// Number of keypoints in one hand.
pub const LANDMARK_COUNT: usize = 21;

/// Tracked for position.
pub const WRIST:      usize = 0;
/// Wrist → middle-finger knuckle gives the hand's rotation.
pub const MIDDLE_MCP: usize = 9;

// ════════════════════════════════════════════════════════════════════════════
// HandSide
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandSide {
    Left,
    Right,
}

impl HandSide {
    pub const BOTH: [HandSide; 2] = [HandSide::Left, HandSide::Right];

    pub fn label(self) -> &'static str {
        match self {
            HandSide::Left  => "Left",
            HandSide::Right => "Right",
        }
    }
}

impl fmt::Display for HandSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark
// ════════════════════════════════════════════════════════════════════════════

/// A single keypoint.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z }
    }

    pub const fn xy(x: f32, y: f32) -> Self {
        Landmark { x, y, z: 0.0 }
    }

    /// Angle of the vector `self → other` in degrees, in image coordinates.
    pub fn angle_to(&self, other: &Landmark) -> f32 {
        (other.y - self.y).atan2(other.x - self.x).to_degrees()
    }
}

pub type Landmarks = [Landmark; LANDMARK_COUNT];

// ════════════════════════════════════════════════════════════════════════════
// HandObservation
// ════════════════════════════════════════════════════════════════════════════

/// One detected hand in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct HandObservation {
    pub side:       HandSide,
    pub landmarks:  Landmarks,
    /// Detector confidence, 0.0–1.0.
    pub confidence: f32,
    /// Capture time, measured from the start of the capture loop.
    pub timestamp:  Duration,
}

impl HandObservation {
    pub fn new(side: HandSide, landmarks: Landmarks, timestamp: Duration) -> Self {
        HandObservation { side, landmarks, confidence: 1.0, timestamp }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn wrist(&self) -> Landmark {
        self.landmarks[WRIST]
    }

    /// Synthesise an upright open hand with its wrist at `(x, y)`, rotated by
    /// `angle_deg` around the wrist and scaled so the wrist→middle-MCP bone
    /// is `size` long.
    ///
    /// Used by the keyboard simulator and throughout the tests.
    pub fn synthetic(side: HandSide, x: f32, y: f32, angle_deg: f32, size: f32, timestamp: Duration) -> Self {
        // Layout in hand space: wrist at the origin, fingers pointing to -y.
        // Columns are finger offsets in x, rows are joint distances in -y.
        const FINGER_X: [f32; 5] = [-0.55, -0.25, 0.0, 0.25, 0.48];
        const JOINT_Y:  [[f32; 4]; 5] = [
            [0.25, 0.50, 0.72, 0.92],   // thumb: cmc, mcp, ip, tip
            [1.00, 1.40, 1.65, 1.85],   // index
            [1.00, 1.45, 1.72, 1.95],   // middle
            [0.95, 1.35, 1.60, 1.80],   // ring
            [0.85, 1.15, 1.35, 1.50],   // pinky
        ];

        let mirror = if side == HandSide::Left { -1.0 } else { 1.0 };
        let (sin, cos) = angle_deg.to_radians().sin_cos();
        let place = |hx: f32, hy: f32| {
            let hx = hx * mirror * size;
            let hy = -hy * size;
            Landmark::xy(x + hx * cos - hy * sin, y + hx * sin + hy * cos)
        };

        let mut landmarks = [Landmark::xy(x, y); LANDMARK_COUNT];
        for (finger, joints) in JOINT_Y.iter().enumerate() {
            // Thumb fans out sideways as it extends
            let spread = if finger == 0 { 0.35 } else { 0.0 };
            for (j, &jy) in joints.iter().enumerate() {
                let fx = FINGER_X[finger] - spread * j as f32;
                landmarks[1 + finger * 4 + j] = place(fx, jy);
            }
        }

        HandObservation::new(side, landmarks, timestamp)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
