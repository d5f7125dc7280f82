//! Signal-processing capability used by the effect chain.
//!
//! The chain decides *when* and *how much*; a [`DspBackend`] does the
//! per-sample work. All methods operate in place on a mono block and must not
//! allocate.

pub mod backend;
pub mod biquad;
pub mod delay;
pub mod reverb;

pub use backend::BiquadBackend;

use crate::action::Effect;

pub trait DspBackend: Send {
    /// Shelf below the bass corner, `gain_db` boost or cut.
    fn apply_low_shelf(&mut self, block: &mut [f32], gain_db: f32);

    /// Shelf above the treble corner.
    fn apply_high_shelf(&mut self, block: &mut [f32], gain_db: f32);

    /// Peaking boost over the speech band.
    fn apply_band_boost(&mut self, block: &mut [f32], gain_db: f32);

    /// Linear gain.
    fn apply_gain(&mut self, block: &mut [f32], gain: f32);

    /// Mix the echo into `block` scaled by `wet` (0.0–1.0).
    fn apply_echo(&mut self, block: &mut [f32], wet: f32);

    /// Mix the reverb into `block` scaled by `wet` (0.0–1.0).
    fn apply_reverb(&mut self, block: &mut [f32], wet: f32);

    /// Forget the tail of one effect, before it fades back in.
    fn clear_tail(&mut self, effect: Effect);

    /// Clear all filter and delay state.
    fn reset(&mut self);
}

impl<B: DspBackend + ?Sized> DspBackend for Box<B> {
    fn apply_low_shelf(&mut self, block: &mut [f32], gain_db: f32)  { (**self).apply_low_shelf(block, gain_db) }
    fn apply_high_shelf(&mut self, block: &mut [f32], gain_db: f32) { (**self).apply_high_shelf(block, gain_db) }
    fn apply_band_boost(&mut self, block: &mut [f32], gain_db: f32) { (**self).apply_band_boost(block, gain_db) }
    fn apply_gain(&mut self, block: &mut [f32], gain: f32)          { (**self).apply_gain(block, gain) }
    fn apply_echo(&mut self, block: &mut [f32], wet: f32)           { (**self).apply_echo(block, wet) }
    fn apply_reverb(&mut self, block: &mut [f32], wet: f32)         { (**self).apply_reverb(block, wet) }
    fn clear_tail(&mut self, effect: Effect)                        { (**self).clear_tail(effect) }
    fn reset(&mut self)                                             { (**self).reset() }
}

/// dB → linear amplitude.
#[inline]
pub fn db_to_gain(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}
