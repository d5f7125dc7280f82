//! Mixer state and its single-writer update rules.

use std::fmt;

use crate::action::{Action, Effect, Param};
use crate::config::MixerLimits;

/// Current target of every mixer control.
///
/// Plain `Copy` data: the render path only ever sees whole copies.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MixerState {
    pub bass_db:        f32,
    pub treble_db:      f32,
    pub volume_db:      f32,
    pub clarity_db:     f32,
    pub echo_enabled:   bool,
    pub reverb_enabled: bool,
}

/// Result of applying one action.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Change {
    Level {
        param:   Param,
        from_db: f32,
        to_db:   f32,
        /// The step was cut short by a bound.
        clamped: bool,
    },
    Toggled {
        effect:  Effect,
        enabled: bool,
    },
}

impl Change {
    /// True when the state actually moved.
    pub fn is_effective(&self) -> bool {
        match self {
            Change::Level { from_db, to_db, .. } => from_db != to_db,
            Change::Toggled { .. } => true,
        }
    }
}

impl fmt::Display for Change {
    /// `Bass +2.0 dB (now +4.0 dB)`, `Echo ON`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::Level { param, from_db, to_db, clamped } => {
                write!(f, "{} {:+.1} dB (now {:+.1} dB)", param.label(), to_db - from_db, to_db)?;
                if *clamped {
                    f.write_str(" [limit]")?;
                }
                Ok(())
            }
            Change::Toggled { effect, enabled } => {
                write!(f, "{} {}", effect.label(), if *enabled { "ON" } else { "OFF" })
            }
        }
    }
}

impl MixerState {
    pub fn level(&self, param: Param) -> f32 {
        match param {
            Param::Bass    => self.bass_db,
            Param::Treble  => self.treble_db,
            Param::Volume  => self.volume_db,
            Param::Clarity => self.clarity_db,
        }
    }

    fn level_mut(&mut self, param: Param) -> &mut f32 {
        match param {
            Param::Bass    => &mut self.bass_db,
            Param::Treble  => &mut self.treble_db,
            Param::Volume  => &mut self.volume_db,
            Param::Clarity => &mut self.clarity_db,
        }
    }

    pub fn enabled(&self, effect: Effect) -> bool {
        match effect {
            Effect::Echo   => self.echo_enabled,
            Effect::Reverb => self.reverb_enabled,
        }
    }

    fn enabled_mut(&mut self, effect: Effect) -> &mut bool {
        match effect {
            Effect::Echo   => &mut self.echo_enabled,
            Effect::Reverb => &mut self.reverb_enabled,
        }
    }

    /// Apply one action. Out-of-range steps are clamped silently.
    pub fn apply(&mut self, action: Action, limits: &MixerLimits) -> Change {
        match action {
            Action::Increase(param) => self.step(param, 1.0, limits),
            Action::Decrease(param) => self.step(param, -1.0, limits),
            Action::Toggle(effect) => {
                let flag = self.enabled_mut(effect);
                *flag = !*flag;
                Change::Toggled { effect, enabled: *flag }
            }
        }
    }

    fn step(&mut self, param: Param, sign: f32, limits: &MixerLimits) -> Change {
        let (step, min, max) = match param {
            Param::Volume => (limits.volume_step_db, limits.volume_min_db, limits.volume_max_db),
            _             => (limits.eq_step_db, limits.eq_min_db, limits.eq_max_db),
        };
        let level = self.level_mut(param);
        let from_db = *level;
        let wanted = from_db + sign * step;
        let to_db = wanted.clamp(min, max);
        *level = to_db;
        Change::Level { param, from_db, to_db, clamped: to_db != wanted }
    }

    /// `Echo [ON], Reverb [OFF]`
    pub fn filters_summary(&self) -> String {
        Effect::ALL
            .iter()
            .map(|e| format!("{} [{}]", e.label(), if self.enabled(*e) { "ON" } else { "OFF" }))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bass_up_adds_one_step() {
        let mut s = MixerState::default();
        let c = s.apply(Action::Increase(Param::Bass), &MixerLimits::default());
        assert_eq!(s.bass_db, 2.0);
        assert_eq!(c, Change::Level { param: Param::Bass, from_db: 0.0, to_db: 2.0, clamped: false });
    }

    #[test]
    fn repeated_steps_clamp_at_bound() {
        let limits = MixerLimits::default();
        let mut s = MixerState::default();
        let mut last = None;
        for _ in 0..10 {
            last = Some(s.apply(Action::Increase(Param::Treble), &limits));
        }
        assert_eq!(s.treble_db, limits.eq_max_db);
        match last {
            Some(Change::Level { clamped, from_db, to_db, .. }) => {
                assert!(clamped);
                assert_eq!(from_db, to_db);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn volume_uses_its_own_range() {
        let limits = MixerLimits::default();
        let mut s = MixerState::default();
        for _ in 0..30 {
            s.apply(Action::Decrease(Param::Volume), &limits);
        }
        assert_eq!(s.volume_db, limits.volume_min_db);
        s.apply(Action::Increase(Param::Volume), &limits);
        assert_eq!(s.volume_db, limits.volume_min_db + limits.volume_step_db);
    }

    #[test]
    fn partial_step_is_clamped_and_flagged() {
        let limits = MixerLimits::default();
        let mut s = MixerState { volume_db: 5.0, ..MixerState::default() };
        let c = s.apply(Action::Increase(Param::Volume), &limits);
        assert_eq!(s.volume_db, 6.0);
        assert!(c.is_effective());
        assert!(matches!(c, Change::Level { clamped: true, .. }));
    }

    #[test]
    fn toggle_flips_only_its_effect() {
        let mut s = MixerState::default();
        let c = s.apply(Action::Toggle(Effect::Echo), &MixerLimits::default());
        assert_eq!(c, Change::Toggled { effect: Effect::Echo, enabled: true });
        assert!(s.echo_enabled && !s.reverb_enabled);
        s.apply(Action::Toggle(Effect::Echo), &MixerLimits::default());
        assert!(!s.echo_enabled);
    }

    #[test]
    fn change_formats_for_console() {
        let c = Change::Level { param: Param::Bass, from_db: 2.0, to_db: 4.0, clamped: false };
        assert_eq!(c.to_string(), "Bass +2.0 dB (now +4.0 dB)");
        let c = Change::Toggled { effect: Effect::Reverb, enabled: false };
        assert_eq!(c.to_string(), "Reverb OFF");
    }

    #[test]
    fn filters_summary_lists_both_effects() {
        let s = MixerState { echo_enabled: true, ..MixerState::default() };
        assert_eq!(s.filters_summary(), "Echo [ON], Reverb [OFF]");
    }
}
