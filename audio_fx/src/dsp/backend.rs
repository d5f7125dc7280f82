//! The real DSP backend: biquad EQ, delay-line echo, Freeverb.

use crate::action::Effect;
use crate::config::ChainConfig;

use super::biquad::{Biquad, BiquadCoeffs};
use super::delay::Echo;
use super::reverb::Reverb;
use super::DspBackend;

pub struct BiquadBackend {
    sample_rate: f32,
    bass_hz:     f32,
    treble_hz:   f32,
    clarity_hz:  f32,
    clarity_q:   f32,
    bass:        Biquad,
    treble:      Biquad,
    clarity:     Biquad,
    echo:        Echo,
    reverb:      Reverb,
}

impl BiquadBackend {
    pub fn new(sample_rate: f32, config: &ChainConfig) -> Self {
        BiquadBackend {
            sample_rate,
            bass_hz:    config.bass_hz,
            treble_hz:  config.treble_hz,
            clarity_hz: config.clarity_hz,
            clarity_q:  config.clarity_q,
            bass:       Biquad::default(),
            treble:     Biquad::default(),
            clarity:    Biquad::default(),
            echo:       Echo::new(&config.echo, sample_rate),
            reverb:     Reverb::new(&config.reverb, sample_rate),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }
}

impl DspBackend for BiquadBackend {
    fn apply_low_shelf(&mut self, block: &mut [f32], gain_db: f32) {
        let (freq, sr) = (self.bass_hz, self.sample_rate);
        self.bass.retune(gain_db, |g| BiquadCoeffs::low_shelf(freq, g, sr));
        self.bass.process(block);
    }

    fn apply_high_shelf(&mut self, block: &mut [f32], gain_db: f32) {
        let (freq, sr) = (self.treble_hz, self.sample_rate);
        self.treble.retune(gain_db, |g| BiquadCoeffs::high_shelf(freq, g, sr));
        self.treble.process(block);
    }

    fn apply_band_boost(&mut self, block: &mut [f32], gain_db: f32) {
        let (freq, q, sr) = (self.clarity_hz, self.clarity_q, self.sample_rate);
        self.clarity.retune(gain_db, |g| BiquadCoeffs::peaking(freq, g, q, sr));
        self.clarity.process(block);
    }

    fn apply_gain(&mut self, block: &mut [f32], gain: f32) {
        for s in block.iter_mut() {
            *s *= gain;
        }
    }

    fn apply_echo(&mut self, block: &mut [f32], wet: f32) {
        self.echo.process(block, wet);
    }

    fn apply_reverb(&mut self, block: &mut [f32], wet: f32) {
        self.reverb.process(block, wet);
    }

    fn clear_tail(&mut self, effect: Effect) {
        match effect {
            Effect::Echo   => self.echo.reset(),
            Effect::Reverb => self.reverb.reset(),
        }
    }

    fn reset(&mut self) {
        self.bass.reset();
        self.treble.reset();
        self.clarity.reset();
        self.echo.reset();
        self.reverb.reset();
    }
}
