//! # hand_gesture
//!
//! Turns per-frame hand landmarks into discrete gesture events.
//!
//! A landmark source delivers zero, one or two [`HandObservation`]s per video
//! frame. [`DualClassifier`] routes them to one [`HandClassifier`] per side,
//! each of which smooths the landmarks over a short window and runs two
//! explicit state machines:
//!
//! | Machine | Input | Event |
//! |---|---|---|
//! | Directional | smoothed wrist displacement | `fired: Some(Up/Down/Left/Right)`, rate-limited by a cooldown |
//! | Rotation | smoothed wrist→middle-MCP angle | `rotation_toggled`, once per held rotation |
//!
//! Nothing here knows about audio; mapping events to mixer actions happens
//! downstream.

pub mod classifier;
pub mod landmark;
pub mod pair;
pub mod window;

pub use classifier::{
    Direction, GestureConfig, GestureSignal, HandClassifier, MotionPhase, RotationPhase,
    REARM_REST_FRAMES,
};
pub use landmark::{HandObservation, HandSide, Landmark, Landmarks, LANDMARK_COUNT};
pub use pair::DualClassifier;
pub use window::SmoothingWindow;
