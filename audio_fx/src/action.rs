//! Gesture → mixer action table.
//!
//! | Hand  | Up       | Down     | Right     | Left      | Rotate        |
//! |-------|----------|----------|-----------|-----------|---------------|
//! | Left  | Bass +   | Bass −   | Treble +  | Treble −  | Toggle Echo   |
//! | Right | Volume + | Volume − | Clarity + | Clarity − | Toggle Reverb |

use std::fmt;

use hand_gesture::{Direction, GestureSignal, HandSide};

/// Numeric mixer parameter, in dB.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Param {
    Bass,
    Treble,
    Volume,
    Clarity,
}

impl Param {
    pub const ALL: [Param; 4] = [Param::Bass, Param::Treble, Param::Volume, Param::Clarity];

    pub fn label(self) -> &'static str {
        match self {
            Param::Bass    => "Bass",
            Param::Treble  => "Treble",
            Param::Volume  => "Volume",
            Param::Clarity => "Clarity",
        }
    }
}

/// On/off effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Effect {
    Echo,
    Reverb,
}

impl Effect {
    pub const ALL: [Effect; 2] = [Effect::Echo, Effect::Reverb];

    pub fn label(self) -> &'static str {
        match self {
            Effect::Echo   => "Echo",
            Effect::Reverb => "Reverb",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Action {
    Increase(Param),
    Decrease(Param),
    Toggle(Effect),
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Increase(p) => write!(f, "{} +", p.label()),
            Action::Decrease(p) => write!(f, "{} -", p.label()),
            Action::Toggle(e)   => write!(f, "Toggle {}", e.label()),
        }
    }
}

/// Action for a directional gesture of one hand.
pub fn directional_action(side: HandSide, direction: Direction) -> Action {
    let (vertical, horizontal) = match side {
        HandSide::Left  => (Param::Bass, Param::Treble),
        HandSide::Right => (Param::Volume, Param::Clarity),
    };
    match direction {
        Direction::Up    => Action::Increase(vertical),
        Direction::Down  => Action::Decrease(vertical),
        Direction::Right => Action::Increase(horizontal),
        Direction::Left  => Action::Decrease(horizontal),
    }
}

pub fn rotation_action(side: HandSide) -> Action {
    match side {
        HandSide::Left  => Action::Toggle(Effect::Echo),
        HandSide::Right => Action::Toggle(Effect::Reverb),
    }
}

/// Actions triggered by one gesture signal.
///
/// Only the edge-triggered events count; a signal that merely reports an
/// instantaneous direction maps to nothing.
pub fn actions_for(signal: &GestureSignal) -> Vec<Action> {
    let mut out = Vec::new();
    if let Some(dir) = signal.fired {
        out.push(directional_action(signal.side, dir));
    }
    if signal.rotation_toggled {
        out.push(rotation_action(signal.side));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(side: HandSide, fired: Option<Direction>, toggled: bool) -> GestureSignal {
        GestureSignal {
            side,
            direction: fired,
            rotation_delta: 0.0,
            magnitude: 0.0,
            fired,
            rotation_toggled: toggled,
        }
    }

    #[test]
    fn left_hand_table() {
        use Direction::*;
        assert_eq!(directional_action(HandSide::Left, Up), Action::Increase(Param::Bass));
        assert_eq!(directional_action(HandSide::Left, Down), Action::Decrease(Param::Bass));
        assert_eq!(directional_action(HandSide::Left, Right), Action::Increase(Param::Treble));
        assert_eq!(directional_action(HandSide::Left, Left), Action::Decrease(Param::Treble));
        assert_eq!(rotation_action(HandSide::Left), Action::Toggle(Effect::Echo));
    }

    #[test]
    fn right_hand_table() {
        use Direction::*;
        assert_eq!(directional_action(HandSide::Right, Up), Action::Increase(Param::Volume));
        assert_eq!(directional_action(HandSide::Right, Down), Action::Decrease(Param::Volume));
        assert_eq!(directional_action(HandSide::Right, Right), Action::Increase(Param::Clarity));
        assert_eq!(directional_action(HandSide::Right, Left), Action::Decrease(Param::Clarity));
        assert_eq!(rotation_action(HandSide::Right), Action::Toggle(Effect::Reverb));
    }

    #[test]
    fn instantaneous_direction_alone_maps_to_nothing() {
        let mut s = signal(HandSide::Left, None, false);
        s.direction = Some(Direction::Up);
        assert!(actions_for(&s).is_empty());
    }

    #[test]
    fn fired_and_toggle_in_one_frame_give_two_actions() {
        let s = signal(HandSide::Right, Some(Direction::Down), true);
        assert_eq!(
            actions_for(&s),
            vec![Action::Decrease(Param::Volume), Action::Toggle(Effect::Reverb)]
        );
    }
}
