//! # gesture_mixer
//!
//! Play a song and shape it with your hands: a webcam (or LeapMotion, or
//! the keyboard) supplies hand landmarks, [`hand_gesture`] turns them into
//! directional and rotation gestures, and [`audio_fx`] applies the result to
//! the running effect chain.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Hand | Action |
//! |---|---|---|
//! | Move up / down | Left | Bass ± 2 dB |
//! | Move right / left | Left | Treble ± 2 dB |
//! | Rotate | Left | Toggle echo |
//! | Move up / down | Right | Volume ± 3 dB |
//! | Move right / left | Right | Clarity ± 2 dB |
//! | Rotate | Right | Toggle reverb |
//!
//! Directions are as seen in the mirrored overlay.
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**, blank frames and keyboard-driven hands.
//! * `camera`: real webcam frames via nokhwa, hands still simulated.
//! * `onnx`: webcam + ONNX Runtime hand-landmark model.
//! * `leap`: hands from a LeapMotion controller via LeapC.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Gesture |
//! |---|---|
//! | `W` `A` `S` `D` / hold | Move left hand |
//! | `E` / hold | Rotate left hand |
//! | `I` `J` `K` `L` / hold | Move right hand |
//! | `O` / hold | Rotate right hand |
//! | `Z` / `X` | Hide / show left / right hand |
//! | `Q` or `Escape` | Quit |

pub mod app;
pub mod camera;
pub mod cli;
pub mod config;
pub mod error;
pub mod landmarks;
pub mod leap;
pub mod onnx;
pub mod overlay;
pub mod status;
