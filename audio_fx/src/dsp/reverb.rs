//! Mono Freeverb: eight damped comb filters in parallel into four allpasses.

use crate::config::ReverbConfig;

/// Comb lengths in samples at 44.1 kHz; mutually prime-ish to avoid ringing.
const COMB_LENGTHS: [usize; 8] = [1557, 1617, 1491, 1422, 1277, 1356, 1188, 1116];

const ALLPASS_LENGTHS: [usize; 4] = [225, 556, 441, 341];

const ALLPASS_FEEDBACK: f32 = 0.5;

/// Input attenuation before the combs; keeps the summed tank near unity.
const INPUT_GAIN: f32 = 0.015;

fn scaled(len: usize, sample_rate: f32) -> usize {
    ((len as f32 * sample_rate / 44_100.0) as usize).max(1)
}

#[derive(Debug, Clone)]
struct CombFilter {
    buffer:       Vec<f32>,
    pos:          usize,
    filter_state: f32,
}

impl CombFilter {
    fn new(length: usize) -> Self {
        CombFilter { buffer: vec![0.0; length], pos: 0, filter_state: 0.0 }
    }

    #[inline]
    fn process(&mut self, input: f32, feedback: f32, damp: f32) -> f32 {
        let output = self.buffer[self.pos];
        // One-pole lowpass in the loop darkens the tail
        self.filter_state = output * (1.0 - damp) + self.filter_state * damp;
        self.buffer[self.pos] = input + self.filter_state * feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.filter_state = 0.0;
    }
}

#[derive(Debug, Clone)]
struct AllpassFilter {
    buffer: Vec<f32>,
    pos:    usize,
}

impl AllpassFilter {
    fn new(length: usize) -> Self {
        AllpassFilter { buffer: vec![0.0; length], pos: 0 }
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let buffered = self.buffer[self.pos];
        let output = -input + buffered;
        self.buffer[self.pos] = input + buffered * ALLPASS_FEEDBACK;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
    }
}

#[derive(Debug, Clone)]
pub struct Reverb {
    combs:    Vec<CombFilter>,
    allpass:  Vec<AllpassFilter>,
    feedback: f32,
    damp:     f32,
    level:    f32,
}

impl Reverb {
    pub fn new(config: &ReverbConfig, sample_rate: f32) -> Self {
        Reverb {
            combs:    COMB_LENGTHS.iter().map(|&l| CombFilter::new(scaled(l, sample_rate))).collect(),
            allpass:  ALLPASS_LENGTHS.iter().map(|&l| AllpassFilter::new(scaled(l, sample_rate))).collect(),
            // Room size maps onto the usable feedback range 0.7–0.98
            feedback: 0.7 + config.room_size.clamp(0.0, 1.0) * 0.28,
            damp:     config.damping.clamp(0.0, 1.0),
            level:    config.wet,
        }
    }

    /// Adds `wet · level` of the reverberated signal to the dry input.
    pub fn process(&mut self, block: &mut [f32], wet: f32) {
        let gain = wet * self.level;
        for s in block.iter_mut() {
            let input = *s * INPUT_GAIN;
            let mut acc = 0.0;
            for comb in self.combs.iter_mut() {
                acc += comb.process(input, self.feedback, self.damp);
            }
            for ap in self.allpass.iter_mut() {
                acc = ap.process(acc);
            }
            *s += gain * acc;
        }
    }

    pub fn reset(&mut self) {
        self.combs.iter_mut().for_each(CombFilter::reset);
        self.allpass.iter_mut().for_each(AllpassFilter::reset);
    }
}
