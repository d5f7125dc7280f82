//! Console output: banner, key legend, one line per applied action.

use std::fmt;

use audio_fx::{Change, MixerState};
use hand_gesture::{Direction, GestureSignal, HandSide};

// ════════════════════════════════════════════════════════════════════════════
// Applied gesture
// ════════════════════════════════════════════════════════════════════════════

/// What a hand did to fire an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Trigger {
    Motion(Direction),
    Rotation,
}

impl Trigger {
    pub fn arrow(self) -> &'static str {
        match self {
            Trigger::Motion(d) => d.arrow(),
            Trigger::Rotation  => "⟳",
        }
    }

    /// Marker for the overlay's ASCII font.
    pub fn ascii(self) -> &'static str {
        match self {
            Trigger::Motion(d) => d.ascii(),
            Trigger::Rotation  => "@",
        }
    }

    /// Triggers carried by one signal, directional first.
    pub fn from_signal(signal: &GestureSignal) -> Vec<Trigger> {
        let mut out = Vec::with_capacity(2);
        if let Some(d) = signal.fired {
            out.push(Trigger::Motion(d));
        }
        if signal.rotation_toggled {
            out.push(Trigger::Rotation);
        }
        out
    }
}

/// One action that reached the mixer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AppliedGesture {
    pub side:    HandSide,
    pub trigger: Trigger,
    pub change:  Change,
}

impl AppliedGesture {
    pub fn is_toggle(&self) -> bool {
        matches!(self.change, Change::Toggled { .. })
    }

    /// Short form for the overlay: `L ^ Bass +4.0 dB`.
    pub fn short(&self) -> String {
        let hand = match self.side {
            HandSide::Left  => "L",
            HandSide::Right => "R",
        };
        let what = match self.change {
            Change::Level { param, to_db, .. } => format!("{} {:+.1} dB", param.label(), to_db),
            Change::Toggled { effect, enabled } => {
                format!("{} {}", effect.label(), if enabled { "ON" } else { "OFF" })
            }
        };
        format!("{} {} {}", hand, self.trigger.ascii(), what)
    }
}

impl fmt::Display for AppliedGesture {
    /// `Detected: Left hand ↑ → Bass +2.0 dB (now +4.0 dB)`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Detected: {} hand {} → {}", self.side, self.trigger.arrow(), self.change)
    }
}

/// `Active Filters: Echo [ON], Reverb [OFF]`
pub fn filters_line(state: &MixerState) -> String {
    format!("Active Filters: {}", state.filters_summary())
}

/// Lines to print for one frame's applied gestures.
pub fn frame_report(applied: &[AppliedGesture], state: &MixerState) -> Vec<String> {
    let mut lines: Vec<String> = applied.iter().map(|a| a.to_string()).collect();
    if applied.iter().any(AppliedGesture::is_toggle) {
        lines.push(filters_line(state));
    }
    lines
}

// ════════════════════════════════════════════════════════════════════════════
// Banner and legend
// ════════════════════════════════════════════════════════════════════════════

pub const LEGEND_LEFT: &str  = "LEFT HAND:  ↑=Bass+  ↓=Bass-  →=Treble+  ←=Treble-  Rotate=Echo Toggle";
pub const LEGEND_RIGHT: &str = "RIGHT HAND: ↑=Vol+   ↓=Vol-   →=Clarity+ ←=Clarity- Rotate=Reverb Toggle";

pub fn print_banner(mode: &str) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║          Gesture Mixer — hand-controlled audio effects       ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("  Mode: {}", mode);
    println!();
}

pub fn print_legend() {
    println!("Gesture Control Active!");
    println!("{}", "=".repeat(80));
    println!("{}", LEGEND_LEFT);
    println!("{}", LEGEND_RIGHT);
    println!("{}", "=".repeat(80));
    println!("Press 'q' to quit");
    println!();
}

/// Closing summary.
pub fn summary_lines(frames: u64, applied: u64, state: &MixerState) -> Vec<String> {
    vec![
        format!("Frames processed: {}, gestures applied: {}", frames, applied),
        format!(
            "Final mix: Bass {:+.1} dB, Treble {:+.1} dB, Clarity {:+.1} dB, Volume {:+.1} dB",
            state.bass_db, state.treble_db, state.clarity_db, state.volume_db
        ),
        filters_line(state),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use audio_fx::{Effect, Param};

    fn bass_up() -> AppliedGesture {
        AppliedGesture {
            side:    HandSide::Left,
            trigger: Trigger::Motion(Direction::Up),
            change:  Change::Level { param: Param::Bass, from_db: 2.0, to_db: 4.0, clamped: false },
        }
    }

    fn reverb_on() -> AppliedGesture {
        AppliedGesture {
            side:    HandSide::Right,
            trigger: Trigger::Rotation,
            change:  Change::Toggled { effect: Effect::Reverb, enabled: true },
        }
    }

    #[test]
    fn action_line_format() {
        assert_eq!(bass_up().to_string(), "Detected: Left hand ↑ → Bass +2.0 dB (now +4.0 dB)");
        assert_eq!(reverb_on().to_string(), "Detected: Right hand ⟳ → Reverb ON");
    }

    #[test]
    fn filters_follow_toggles_only() {
        let state = MixerState { reverb_enabled: true, ..MixerState::default() };
        assert_eq!(frame_report(&[bass_up()], &state).len(), 1);

        let lines = frame_report(&[bass_up(), reverb_on()], &state);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[2], "Active Filters: Echo [OFF], Reverb [ON]");
    }

    #[test]
    fn nothing_applied_prints_nothing() {
        assert!(frame_report(&[], &MixerState::default()).is_empty());
    }

    #[test]
    fn short_form_is_ascii() {
        assert_eq!(bass_up().short(), "L ^ Bass +4.0 dB");
        assert!(reverb_on().short().is_ascii());
    }

    #[test]
    fn triggers_from_signal_keep_order() {
        let signal = GestureSignal {
            side:             HandSide::Left,
            direction:        Some(Direction::Down),
            rotation_delta:   20.0,
            magnitude:        0.02,
            fired:            Some(Direction::Down),
            rotation_toggled: true,
        };
        assert_eq!(Trigger::from_signal(&signal), vec![Trigger::Motion(Direction::Down), Trigger::Rotation]);
    }

    #[test]
    fn triggers_line_up_with_actions() {
        use audio_fx::{actions_for, Action};
        let signal = GestureSignal {
            side:             HandSide::Right,
            direction:        Some(Direction::Left),
            rotation_delta:   -18.0,
            magnitude:        0.03,
            fired:            Some(Direction::Left),
            rotation_toggled: true,
        };
        let pairs: Vec<_> = Trigger::from_signal(&signal).into_iter().zip(actions_for(&signal)).collect();
        assert_eq!(
            pairs,
            vec![
                (Trigger::Motion(Direction::Left), Action::Decrease(Param::Clarity)),
                (Trigger::Rotation, Action::Toggle(Effect::Reverb)),
            ]
        );
    }
}
