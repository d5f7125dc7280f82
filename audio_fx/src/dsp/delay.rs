//! Single-tap feedback echo.

use crate::config::EchoConfig;

/// Mono circular delay line sized for one fixed delay.
#[derive(Debug, Clone)]
pub struct DelayLine {
    buffer:    Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    /// A line that returns each sample `delay_samples` writes later.
    pub fn new(delay_samples: usize) -> Self {
        DelayLine {
            buffer:    vec![0.0; delay_samples.max(1)],
            write_pos: 0,
        }
    }

    pub fn delay_samples(&self) -> usize {
        self.buffer.len()
    }

    /// Read the sample written `delay_samples` ago, then overwrite it.
    #[inline]
    pub fn exchange(&mut self, input: f32) -> f32 {
        let delayed = self.buffer[self.write_pos];
        self.buffer[self.write_pos] = input;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        delayed
    }

    pub fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}

/// `y = x + wet · decay · d`, where `d` is the line output and the line is
/// fed `x + feedback · d`.
#[derive(Debug, Clone)]
pub struct Echo {
    line:     DelayLine,
    decay:    f32,
    feedback: f32,
}

impl Echo {
    pub fn new(config: &EchoConfig, sample_rate: f32) -> Self {
        let delay = (config.delay_ms / 1000.0 * sample_rate).round() as usize;
        Echo {
            line:     DelayLine::new(delay),
            decay:    config.decay,
            feedback: config.feedback,
        }
    }

    pub fn process(&mut self, block: &mut [f32], wet: f32) {
        let level = wet * self.decay;
        for s in block.iter_mut() {
            let delayed = self.line_peek();
            self.line.exchange(*s + self.feedback * delayed);
            *s += level * delayed;
        }
    }

    #[inline]
    fn line_peek(&self) -> f32 {
        self.line.buffer[self.line.write_pos]
    }

    pub fn reset(&mut self) {
        self.line.reset();
    }
}
