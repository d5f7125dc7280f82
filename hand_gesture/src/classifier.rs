//! Per-hand gesture recognition.
//!
//! Each hand owns a [`HandClassifier`]: a smoothing window plus two small
//! explicit state machines, one for directional motion and one for rotation.
//! The classifier never touches audio state; it only reports what it saw and
//! which edge-triggered events fired this frame.
//!
//! ```text
//!  directional:   Idle ──move──► Fired{dir, at} ──still──► Cooldown{until} ──expire──► Idle
//!                                   │  ▲
//!                                   └──┘ same dir, cooldown elapsed → fire again
//!
//!  rotation:      Armed{acc} ──|acc| ≥ threshold──► Latched ──rest × 2──► Armed{0}
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::landmark::{HandObservation, HandSide, Landmarks, MIDDLE_MCP, WRIST};
use crate::window::SmoothingWindow;

/// Consecutive rest frames needed before a latched rotation re-arms.
pub const REARM_REST_FRAMES: u32 = 2;

// ════════════════════════════════════════════════════════════════════════════
// GestureConfig
// ════════════════════════════════════════════════════════════════════════════

/// Thresholds and timings for gesture recognition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Moving-average window length in frames.
    pub window: usize,
    /// Minimum smoothed wrist displacement per frame (normalised units)
    /// before a direction is reported.
    pub direction_threshold: f32,
    /// Minimum time between two directional actions of the same hand.
    pub cooldown_ms: u64,
    /// Accumulated rotation (degrees) that fires a toggle.
    pub rotation_threshold_deg: f32,
    /// Per-frame rotation (degrees) below which the hand counts as resting.
    pub rotation_rest_deg: f32,
    /// Missed frames after which a hand's history is discarded.
    pub stale_after_frames: u32,
    /// Observations below this confidence are treated as absent.
    pub min_confidence: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        GestureConfig {
            window:                 5,
            direction_threshold:    0.012,
            cooldown_ms:            300,
            rotation_threshold_deg: 15.0,
            rotation_rest_deg:      1.5,
            stale_after_frames:     15,
            min_confidence:         0.5,
        }
    }
}

impl GestureConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Reasons this configuration cannot be used; empty when valid.
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.window == 0 {
            out.push("window must be at least 1 frame".to_string());
        }
        if !(self.direction_threshold > 0.0) {
            out.push(format!("direction_threshold must be positive, got {}", self.direction_threshold));
        }
        if !(self.rotation_rest_deg >= 0.0 && self.rotation_rest_deg < self.rotation_threshold_deg) {
            out.push(format!(
                "rotation_rest_deg ({}) must be in [0, rotation_threshold_deg ({}))",
                self.rotation_rest_deg, self.rotation_threshold_deg
            ));
        }
        if self.stale_after_frames == 0 {
            out.push("stale_after_frames must be at least 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            out.push(format!("min_confidence must be within 0..=1, got {}", self.min_confidence));
        }
        out
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Direction
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn arrow(self) -> &'static str {
        match self {
            Direction::Up    => "↑",
            Direction::Down  => "↓",
            Direction::Left  => "←",
            Direction::Right => "→",
        }
    }

    /// Plain ASCII marker for the overlay font.
    pub fn ascii(self) -> &'static str {
        match self {
            Direction::Up    => "^",
            Direction::Down  => "v",
            Direction::Left  => "<",
            Direction::Right => ">",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Direction::Up    => "Up",
            Direction::Down  => "Down",
            Direction::Left  => "Left",
            Direction::Right => "Right",
        };
        f.write_str(name)
    }
}

/// Dominant-axis direction of a displacement, or `None` below `threshold`.
///
/// Returns the direction and the magnitude along the dominant axis.
pub fn classify_delta(dx: f32, dy: f32, threshold: f32) -> (Option<Direction>, f32) {
    let (ax, ay) = (dx.abs(), dy.abs());
    let magnitude = ax.max(ay);
    if magnitude < threshold || magnitude == 0.0 {
        return (None, magnitude);
    }
    let dir = if ay >= ax {
        if dy < 0.0 { Direction::Up } else { Direction::Down }
    } else if dx > 0.0 {
        Direction::Right
    } else {
        Direction::Left
    };
    (Some(dir), magnitude)
}

/// Wrap an angle difference into (-180, 180].
pub fn wrap_degrees(delta: f32) -> f32 {
    let mut d = delta % 360.0;
    if d > 180.0 {
        d -= 360.0;
    } else if d <= -180.0 {
        d += 360.0;
    }
    d
}

fn hand_angle(landmarks: &Landmarks) -> f32 {
    landmarks[WRIST].angle_to(&landmarks[MIDDLE_MCP])
}

// ════════════════════════════════════════════════════════════════════════════
// GestureSignal
// ════════════════════════════════════════════════════════════════════════════

/// What one hand did in one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct GestureSignal {
    pub side:             HandSide,
    /// Instantaneous smoothed direction; `None` when below threshold.
    pub direction:        Option<Direction>,
    /// Rotation since the previous frame, degrees (positive = clockwise on screen).
    pub rotation_delta:   f32,
    /// Displacement along the dominant axis.
    pub magnitude:        f32,
    /// Directional action let through by the state machine this frame.
    pub fired:            Option<Direction>,
    /// Rotation toggle edge this frame.
    pub rotation_toggled: bool,
}

impl GestureSignal {
    /// True when the signal carries an event worth acting on.
    pub fn is_actionable(&self) -> bool {
        self.fired.is_some() || self.rotation_toggled
    }
}

// ════════════════════════════════════════════════════════════════════════════
// State machines
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MotionPhase {
    /// No recent directional action.
    Idle,
    /// A directional action fired at `at` and the hand is still moving.
    Fired { direction: Direction, at: Duration },
    /// The hand stopped; new motion is ignored until `until`.
    Cooldown { until: Duration },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RotationPhase {
    /// Collecting same-signed rotation.
    Armed { accumulated: f32 },
    /// Toggle fired; waiting for the hand to rest.
    Latched { rest_frames: u32 },
}

// ════════════════════════════════════════════════════════════════════════════
// HandClassifier
// ════════════════════════════════════════════════════════════════════════════

/// Gesture recogniser for one hand.
#[derive(Debug, Clone)]
pub struct HandClassifier {
    side:     HandSide,
    config:   GestureConfig,
    window:   SmoothingWindow,
    /// Smoothed landmarks of the previous observed frame.
    previous: Option<Landmarks>,
    motion:   MotionPhase,
    rotation: RotationPhase,
    missed:   u32,
}

impl HandClassifier {
    pub fn new(side: HandSide, config: GestureConfig) -> Self {
        HandClassifier {
            side,
            window:   SmoothingWindow::new(config.window),
            config,
            previous: None,
            motion:   MotionPhase::Idle,
            rotation: RotationPhase::Armed { accumulated: 0.0 },
            missed:   0,
        }
    }

    pub fn side(&self)           -> HandSide      { self.side }
    pub fn motion_phase(&self)   -> MotionPhase   { self.motion }
    pub fn rotation_phase(&self) -> RotationPhase { self.rotation }
    pub fn missed_frames(&self)  -> u32           { self.missed }
    pub fn is_tracking(&self)    -> bool          { !self.window.is_empty() }

    /// Latest smoothed landmarks, if the hand has history.
    pub fn smoothed(&self) -> Option<Landmarks> {
        self.previous
    }

    /// Fold a new observation into the window and emit this frame's signal.
    pub fn observe(&mut self, obs: &HandObservation) -> GestureSignal {
        self.missed = 0;
        let smoothed = self.window.push(&obs.landmarks);

        let (direction, magnitude, rotation_delta) = match self.previous {
            Some(prev) => {
                let dx = smoothed[WRIST].x - prev[WRIST].x;
                let dy = smoothed[WRIST].y - prev[WRIST].y;
                let (dir, mag) = classify_delta(dx, dy, self.config.direction_threshold);
                let rot = wrap_degrees(hand_angle(&smoothed) - hand_angle(&prev));
                (dir, mag, rot)
            }
            None => (None, 0.0, 0.0),
        };
        let had_previous = self.previous.is_some();
        self.previous = Some(smoothed);

        let fired = self.step_motion(direction, obs.timestamp);
        let rotation_toggled = had_previous && self.step_rotation(rotation_delta);

        if let Some(d) = fired {
            log::debug!("{} hand fired {} (magnitude {:.4})", self.side, d, magnitude);
        }
        if rotation_toggled {
            log::debug!("{} hand rotation toggle ({:+.1}°)", self.side, rotation_delta);
        }

        GestureSignal {
            side: self.side,
            direction,
            rotation_delta,
            magnitude,
            fired,
            rotation_toggled,
        }
    }

    /// The hand was not seen this frame.
    ///
    /// The window is left as is; once the hand has been missing for
    /// `stale_after_frames` the history is dropped so a re-entry is not read
    /// as one large motion.
    pub fn observe_absent(&mut self) {
        self.missed = self.missed.saturating_add(1);
        if self.missed >= self.config.stale_after_frames && self.is_tracking() {
            log::debug!("{} hand lost for {} frames, resetting", self.side, self.missed);
            self.reset();
        }
    }

    pub fn reset(&mut self) {
        self.window.clear();
        self.previous = None;
        self.motion   = MotionPhase::Idle;
        self.rotation = RotationPhase::Armed { accumulated: 0.0 };
    }

    fn step_motion(&mut self, direction: Option<Direction>, now: Duration) -> Option<Direction> {
        let cooldown = self.config.cooldown();

        // An expired cooldown behaves exactly like Idle.
        if let MotionPhase::Cooldown { until } = self.motion {
            if now >= until {
                self.motion = MotionPhase::Idle;
            }
        }

        let (next, fired) = match (self.motion, direction) {
            (MotionPhase::Idle, None) => (MotionPhase::Idle, None),
            (MotionPhase::Idle, Some(d)) => (MotionPhase::Fired { direction: d, at: now }, Some(d)),

            (MotionPhase::Fired { at, .. }, None) => {
                let until = at + cooldown;
                if now >= until {
                    (MotionPhase::Idle, None)
                } else {
                    (MotionPhase::Cooldown { until }, None)
                }
            }
            (MotionPhase::Fired { direction: prev, at }, Some(d)) => {
                if now.saturating_sub(at) >= cooldown {
                    (MotionPhase::Fired { direction: d, at: now }, Some(d))
                } else {
                    (MotionPhase::Fired { direction: prev, at }, None)
                }
            }

            (phase @ MotionPhase::Cooldown { .. }, _) => (phase, None),
        };

        self.motion = next;
        fired
    }

    fn step_rotation(&mut self, delta: f32) -> bool {
        let resting = delta.abs() < self.config.rotation_rest_deg;

        let (next, toggled) = match self.rotation {
            RotationPhase::Armed { .. } if resting => (RotationPhase::Armed { accumulated: 0.0 }, false),
            RotationPhase::Armed { accumulated } => {
                let accumulated = if accumulated != 0.0 && accumulated.signum() != delta.signum() {
                    delta
                } else {
                    accumulated + delta
                };
                if accumulated.abs() >= self.config.rotation_threshold_deg {
                    (RotationPhase::Latched { rest_frames: 0 }, true)
                } else {
                    (RotationPhase::Armed { accumulated }, false)
                }
            }
            RotationPhase::Latched { rest_frames } if resting => {
                let rest_frames = rest_frames + 1;
                if rest_frames >= REARM_REST_FRAMES {
                    (RotationPhase::Armed { accumulated: 0.0 }, false)
                } else {
                    (RotationPhase::Latched { rest_frames }, false)
                }
            }
            RotationPhase::Latched { .. } => (RotationPhase::Latched { rest_frames: 0 }, false),
        };

        self.rotation = next;
        toggled
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
