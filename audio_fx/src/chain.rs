//! The effect chain: parameter smoothing, toggle fades and stage order.
//!
//! ```text
//!  input ─► bass shelf ─► treble shelf ─► clarity peak ─► echo ─► reverb ─► volume ─► peak guard ─► output
//! ```
//!
//! The chain works in sub-blocks of [`SUB_BLOCK`] frames. At the start of each
//! sub-block the dB parameters take one step of a one-pole glide toward their
//! targets and the echo/reverb wet levels take one step of a linear ramp. A
//! wet level that has reached exactly zero skips its stage, so a chain with
//! both effects off and flat EQ passes samples through untouched.

use crate::action::Effect;
use crate::config::ChainConfig;
use crate::dsp::{db_to_gain, DspBackend};
use crate::state::MixerState;

/// Frames per parameter update.
pub const SUB_BLOCK: usize = 64;

/// dB distance under which a glide snaps onto its target.
const SNAP_DB: f32 = 1e-3;

/// Glide of one dB parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Glide {
    current: f32,
    target:  f32,
}

impl Glide {
    fn at(value: f32) -> Self {
        Glide { current: value, target: value }
    }

    fn step(&mut self, alpha: f32) {
        self.current += (self.target - self.current) * alpha;
        if (self.target - self.current).abs() < SNAP_DB {
            self.current = self.target;
        }
    }
}

/// Linear wet-level ramp of one toggled effect.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Fade {
    level:  f32,
    target: f32,
}

impl Fade {
    fn at(on: bool) -> Self {
        let v = if on { 1.0 } else { 0.0 };
        Fade { level: v, target: v }
    }

    fn step(&mut self, amount: f32) {
        self.level = if self.target > self.level {
            (self.level + amount).min(self.target)
        } else {
            (self.level - amount).max(self.target)
        };
    }
}

pub struct EffectChain<B: DspBackend> {
    backend:      B,
    sample_rate:  f32,
    smoothing_s:  f32,
    fade_s:       f32,
    release_s:    f32,
    target:       MixerState,
    bass:         Glide,
    treble:       Glide,
    clarity:      Glide,
    volume:       Glide,
    echo:         Fade,
    reverb:       Fade,
    /// Output gain of the peak guard; 1.0 when idle.
    guard:        f32,
}

impl<B: DspBackend> EffectChain<B> {
    /// A chain already settled at `initial`.
    pub fn new(backend: B, sample_rate: f32, config: &ChainConfig, initial: MixerState) -> Self {
        EffectChain {
            backend,
            sample_rate,
            smoothing_s: config.smoothing_ms / 1000.0,
            fade_s:      config.fade_ms / 1000.0,
            release_s:   config.release_ms / 1000.0,
            target:      initial,
            bass:        Glide::at(initial.bass_db),
            treble:      Glide::at(initial.treble_db),
            clarity:     Glide::at(initial.clarity_db),
            volume:      Glide::at(initial.volume_db),
            echo:        Fade::at(initial.echo_enabled),
            reverb:      Fade::at(initial.reverb_enabled),
            guard:       1.0,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn target(&self) -> MixerState {
        self.target
    }

    /// Parameter values in effect right now; flags are on while any wet signal remains.
    pub fn current(&self) -> MixerState {
        MixerState {
            bass_db:        self.bass.current,
            treble_db:      self.treble.current,
            volume_db:      self.volume.current,
            clarity_db:     self.clarity.current,
            echo_enabled:   self.echo.level > 0.0,
            reverb_enabled: self.reverb.level > 0.0,
        }
    }

    pub fn wet_level(&self, effect: Effect) -> f32 {
        match effect {
            Effect::Echo   => self.echo.level,
            Effect::Reverb => self.reverb.level,
        }
    }

    pub fn guard_gain(&self) -> f32 {
        self.guard
    }

    /// Set new targets. Cheap; intended to be called once per callback.
    pub fn set_target(&mut self, state: MixerState) {
        if state == self.target {
            return;
        }
        self.target         = state;
        self.bass.target    = state.bass_db;
        self.treble.target  = state.treble_db;
        self.clarity.target = state.clarity_db;
        self.volume.target  = state.volume_db;

        for (effect, fade, on) in [
            (Effect::Echo, &mut self.echo, state.echo_enabled),
            (Effect::Reverb, &mut self.reverb, state.reverb_enabled),
        ] {
            // A silent effect starting up again must not replay its old tail
            if on && fade.level == 0.0 && fade.target == 0.0 {
                self.backend.clear_tail(effect);
            }
            fade.target = if on { 1.0 } else { 0.0 };
        }
    }

    /// Process a mono buffer in place.
    pub fn process(&mut self, buffer: &mut [f32]) {
        for block in buffer.chunks_mut(SUB_BLOCK) {
            self.advance(block.len());
            self.process_block(block);
        }
    }

    /// Drop all filter and delay state and jump to the targets.
    pub fn reset(&mut self) {
        self.backend.reset();
        for g in [&mut self.bass, &mut self.treble, &mut self.clarity, &mut self.volume] {
            g.current = g.target;
        }
        self.echo.level   = self.echo.target;
        self.reverb.level = self.reverb.target;
        self.guard = 1.0;
    }

    fn advance(&mut self, frames: usize) {
        let frames = frames as f32;

        let alpha = one_pole_alpha(frames, self.smoothing_s * self.sample_rate);
        for g in [&mut self.bass, &mut self.treble, &mut self.clarity, &mut self.volume] {
            g.step(alpha);
        }

        let fade_frames = self.fade_s * self.sample_rate;
        let amount = if fade_frames > 0.0 { frames / fade_frames } else { 1.0 };
        self.echo.step(amount);
        self.reverb.step(amount);
    }

    fn process_block(&mut self, block: &mut [f32]) {
        self.backend.apply_low_shelf(block, self.bass.current);
        self.backend.apply_high_shelf(block, self.treble.current);
        self.backend.apply_band_boost(block, self.clarity.current);

        if self.echo.level > 0.0 {
            self.backend.apply_echo(block, self.echo.level);
        }
        if self.reverb.level > 0.0 {
            self.backend.apply_reverb(block, self.reverb.level);
        }

        self.backend.apply_gain(block, db_to_gain(self.volume.current));

        let peak = block.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        if peak.is_finite() && peak * self.guard > 1.0 {
            self.guard = 1.0 / peak;
        }
        if self.guard < 1.0 {
            self.backend.apply_gain(block, self.guard);
            let alpha = one_pole_alpha(block.len() as f32, self.release_s * self.sample_rate);
            self.guard += (1.0 - self.guard) * alpha;
            if self.guard > 1.0 - 1e-4 {
                self.guard = 1.0;
            }
        }
    }
}

/// Per-block coefficient of a one-pole smoother with time constant `tau_frames`.
fn one_pole_alpha(frames: f32, tau_frames: f32) -> f32 {
    if tau_frames <= 0.0 {
        1.0
    } else {
        1.0 - (-frames / tau_frames).exp()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::BiquadBackend;

    const SR: f32 = 48_000.0;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Call {
        LowShelf(f32),
        HighShelf(f32),
        Band(f32),
        Gain(f32),
        Echo(f32),
        Reverb(f32),
        ClearTail(Effect),
        Reset,
    }

    /// Records every call and leaves samples alone.
    #[derive(Default)]
    struct Recorder {
        calls: Vec<Call>,
    }

    impl Recorder {
        fn take(&mut self) -> Vec<Call> {
            std::mem::take(&mut self.calls)
        }
    }

    impl DspBackend for Recorder {
        fn apply_low_shelf(&mut self, _: &mut [f32], db: f32)  { self.calls.push(Call::LowShelf(db)) }
        fn apply_high_shelf(&mut self, _: &mut [f32], db: f32) { self.calls.push(Call::HighShelf(db)) }
        fn apply_band_boost(&mut self, _: &mut [f32], db: f32) { self.calls.push(Call::Band(db)) }
        fn apply_gain(&mut self, b: &mut [f32], g: f32) {
            for s in b.iter_mut() {
                *s *= g;
            }
            self.calls.push(Call::Gain(g))
        }
        fn apply_echo(&mut self, _: &mut [f32], wet: f32)   { self.calls.push(Call::Echo(wet)) }
        fn apply_reverb(&mut self, _: &mut [f32], wet: f32) { self.calls.push(Call::Reverb(wet)) }
        fn clear_tail(&mut self, e: Effect)                 { self.calls.push(Call::ClearTail(e)) }
        fn reset(&mut self)                                 { self.calls.push(Call::Reset) }
    }

    fn instant() -> ChainConfig {
        ChainConfig { smoothing_ms: 0.0, fade_ms: 0.0, ..ChainConfig::default() }
    }

    fn signal(len: usize, offset: usize) -> Vec<f32> {
        (offset..offset + len)
            .map(|i| {
                let t = i as f32 / SR;
                0.25 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
                    + 0.15 * (2.0 * std::f32::consts::PI * 3_100.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn stages_run_in_fixed_order() {
        let initial = MixerState {
            bass_db: 2.0, treble_db: -2.0, clarity_db: 4.0, volume_db: 0.0,
            echo_enabled: true, reverb_enabled: true,
        };
        let mut chain = EffectChain::new(Recorder::default(), SR, &instant(), initial);
        chain.process(&mut [0.0; SUB_BLOCK]);
        assert_eq!(
            chain.backend_mut().take(),
            vec![
                Call::LowShelf(2.0),
                Call::HighShelf(-2.0),
                Call::Band(4.0),
                Call::Echo(1.0),
                Call::Reverb(1.0),
                Call::Gain(1.0),
            ]
        );
    }

    #[test]
    fn disabled_effects_are_skipped() {
        let mut chain = EffectChain::new(Recorder::default(), SR, &instant(), MixerState::default());
        chain.process(&mut [0.0; SUB_BLOCK]);
        let calls = chain.backend_mut().take();
        assert!(!calls.iter().any(|c| matches!(c, Call::Echo(_) | Call::Reverb(_))));
    }

    #[test]
    fn buffer_is_split_into_sub_blocks() {
        let mut chain = EffectChain::new(Recorder::default(), SR, &instant(), MixerState::default());
        chain.process(&mut [0.0; 100]);
        let shelves = chain.backend_mut().take().iter().filter(|c| matches!(c, Call::LowShelf(_))).count();
        assert_eq!(shelves, 2);
    }

    #[test]
    fn parameters_glide_toward_target() {
        let mut chain = EffectChain::new(Recorder::default(), SR, &ChainConfig::default(), MixerState::default());
        chain.set_target(MixerState { bass_db: 12.0, ..MixerState::default() });

        chain.process(&mut [0.0; SUB_BLOCK]);
        let first = chain.current().bass_db;
        assert!(first > 0.0 && first < 12.0, "first step {}", first);

        chain.process(&mut vec![0.0; SR as usize / 2]);
        assert_eq!(chain.current().bass_db, 12.0);
    }

    #[test]
    fn toggle_ramps_linearly_then_bypasses() {
        let mut chain = EffectChain::new(Recorder::default(), SR, &ChainConfig::default(), MixerState::default());
        chain.set_target(MixerState { echo_enabled: true, ..MixerState::default() });
        assert_eq!(chain.backend_mut().take(), vec![Call::ClearTail(Effect::Echo)]);

        // 25 ms at 48 kHz = 1200 frames = 18.75 sub-blocks
        let mut wets = Vec::new();
        for _ in 0..20 {
            chain.process(&mut [0.0; SUB_BLOCK]);
            for c in chain.backend_mut().take() {
                if let Call::Echo(w) = c {
                    wets.push(w);
                }
            }
        }
        assert_eq!(wets.len(), 20);
        assert!((wets[0] - SUB_BLOCK as f32 / 1200.0).abs() < 1e-6);
        assert!(wets.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(*wets.last().unwrap_or(&0.0), 1.0);

        chain.set_target(MixerState::default());
        let mut blocks_with_echo = 0;
        for _ in 0..25 {
            chain.process(&mut [0.0; SUB_BLOCK]);
            if chain.backend_mut().take().iter().any(|c| matches!(c, Call::Echo(_))) {
                blocks_with_echo += 1;
            }
        }
        // 18 blocks still carry some wet signal, the 19th reaches zero
        assert_eq!(blocks_with_echo, 18);
        assert_eq!(chain.wet_level(Effect::Echo), 0.0);
    }

    #[test]
    fn re_enabling_during_fade_out_keeps_tail() {
        let mut chain = EffectChain::new(Recorder::default(), SR, &ChainConfig::default(), MixerState::default());
        let on = MixerState { reverb_enabled: true, ..MixerState::default() };
        chain.set_target(on);
        chain.process(&mut [0.0; SUB_BLOCK * 30]);
        chain.set_target(MixerState::default());
        chain.process(&mut [0.0; SUB_BLOCK * 2]);
        chain.backend_mut().take();

        chain.set_target(on);
        assert!(chain.backend_mut().take().is_empty());
    }

    #[test]
    fn echo_on_then_off_matches_dry_chain() {
        let cfg = ChainConfig::default();
        let mut dry = EffectChain::new(BiquadBackend::new(SR, &cfg), SR, &cfg, MixerState::default());
        let mut wet = EffectChain::new(BiquadBackend::new(SR, &cfg), SR, &cfg, MixerState::default());

        let warmup = signal(SR as usize / 2, 0);
        let mut a = warmup.clone();
        let mut b = warmup.clone();
        dry.process(&mut a);
        wet.set_target(MixerState { echo_enabled: true, ..MixerState::default() });
        wet.process(&mut b);
        assert_ne!(a, b);

        // Turn the echo off and let the fade finish
        wet.set_target(MixerState::default());
        let settle = signal(SR as usize / 10, warmup.len());
        let (mut a, mut b) = (settle.clone(), settle.clone());
        dry.process(&mut a);
        wet.process(&mut b);
        assert_eq!(wet.wet_level(Effect::Echo), 0.0);

        let tail = signal(SR as usize / 2, warmup.len() + settle.len());
        let (mut a, mut b) = (tail.clone(), tail.clone());
        dry.process(&mut a);
        wet.process(&mut b);
        assert_eq!(a, b);
        // Flat chain is the identity
        assert_eq!(a, tail);
    }

    #[test]
    fn peak_guard_holds_output_at_full_scale() {
        let cfg = ChainConfig::default();
        let mut chain = EffectChain::new(BiquadBackend::new(SR, &cfg), SR, &cfg, MixerState::default());
        let mut loud = vec![2.0f32; SUB_BLOCK * 4];
        chain.process(&mut loud);
        assert!(loud.iter().all(|s| s.abs() <= 1.0 + 1e-6));
        assert!(chain.guard_gain() < 1.0);

        let mut quiet = vec![0.1f32; SR as usize * 5];
        chain.process(&mut quiet);
        assert_eq!(chain.guard_gain(), 1.0);
    }

    #[test]
    fn volume_gain_follows_db() {
        let initial = MixerState { volume_db: -6.0, ..MixerState::default() };
        let mut chain = EffectChain::new(Recorder::default(), SR, &instant(), initial);
        let mut block = [1.0f32; SUB_BLOCK];
        chain.process(&mut block);
        assert!((block[0] - 0.501_187).abs() < 1e-4);
    }

    #[test]
    fn reset_jumps_to_targets() {
        let mut chain = EffectChain::new(Recorder::default(), SR, &ChainConfig::default(), MixerState::default());
        chain.set_target(MixerState { treble_db: -8.0, reverb_enabled: true, ..MixerState::default() });
        chain.reset();
        assert_eq!(chain.current().treble_db, -8.0);
        assert_eq!(chain.wet_level(Effect::Reverb), 1.0);
        assert!(chain.backend_mut().take().contains(&Call::Reset));
    }
}
