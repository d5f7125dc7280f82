//! Playback position over a decoded track.

use crate::loader::DecodedTrack;

/// Reads a mono track that is already at the device rate.
///
/// Owned by the render path; nothing else touches it while playing.
#[derive(Debug, Clone)]
pub struct PlaybackSession {
    samples:  Vec<f32>,
    cursor:   usize,
    looping:  bool,
    finished: bool,
    loops:    u32,
}

impl PlaybackSession {
    /// `track` must already be resampled to the output rate
    /// (see [`resample_to`](crate::loader::resample_to)).
    pub fn new(track: DecodedTrack, looping: bool) -> Self {
        PlaybackSession {
            samples:  track.samples,
            cursor:   0,
            looping,
            finished: false,
            loops:    0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Number of times playback wrapped to the start.
    pub fn loops(&self) -> u32 {
        self.loops
    }

    /// Cursor position as a fraction of the track.
    pub fn progress(&self) -> f64 {
        if self.samples.is_empty() {
            return 1.0;
        }
        self.cursor as f64 / self.samples.len() as f64
    }

    /// Copy samples from the cursor into `out`, wrapping when looping.
    ///
    /// Returns the number of samples written. Fewer than `out.len()` means the
    /// track ended without looping; the rest of `out` is left untouched.
    pub fn read_into(&mut self, out: &mut [f32]) -> usize {
        let len = self.samples.len();
        if len == 0 || self.finished {
            self.finished = true;
            return 0;
        }

        let mut written = 0;
        while written < out.len() {
            if self.cursor >= len {
                if !self.looping {
                    self.finished = true;
                    return written;
                }
                self.cursor = 0;
                self.loops += 1;
            }
            let n = (len - self.cursor).min(out.len() - written);
            out[written..written + n].copy_from_slice(&self.samples[self.cursor..self.cursor + n]);
            self.cursor += n;
            written += n;
        }
        written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(samples: Vec<f32>) -> DecodedTrack {
        DecodedTrack { samples, sample_rate: 48_000, source_channels: 1 }
    }

    #[test]
    fn samples_are_copied_in_order() {
        let mut s = PlaybackSession::new(track(vec![0.1, 0.2, 0.3, 0.4]), false);
        let mut out = [0.0; 4];
        assert_eq!(s.read_into(&mut out), 4);
        assert_eq!(out, [0.1, 0.2, 0.3, 0.4]);
        assert!((s.progress() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn end_without_loop_reports_short_read() {
        let mut s = PlaybackSession::new(track(vec![0.5; 3]), false);
        let mut out = [0.0; 5];
        assert_eq!(s.read_into(&mut out), 3);
        assert!(s.is_finished());
        assert_eq!(s.read_into(&mut out), 0);
    }

    #[test]
    fn looping_wraps_to_start() {
        let mut s = PlaybackSession::new(track(vec![1.0, 2.0, 3.0]), true);
        let mut out = [0.0; 7];
        assert_eq!(s.read_into(&mut out), 7);
        assert_eq!(out, [1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 1.0]);
        assert_eq!(s.loops(), 2);
        assert!(!s.is_finished());
    }

    #[test]
    fn single_sample_track_loops_through_a_long_buffer() {
        let mut s = PlaybackSession::new(track(vec![0.25]), true);
        let mut out = [0.0; 8];
        assert_eq!(s.read_into(&mut out), 8);
        assert_eq!(out, [0.25; 8]);
        assert_eq!(s.loops(), 7);
    }

    #[test]
    fn reads_continue_across_calls() {
        let mut s = PlaybackSession::new(track((0..6).map(|i| i as f32).collect()), true);
        let mut a = [0.0; 4];
        let mut b = [0.0; 4];
        s.read_into(&mut a);
        s.read_into(&mut b);
        assert_eq!(b, [4.0, 5.0, 0.0, 1.0]);
    }

    #[test]
    fn empty_track_is_finished_at_once() {
        let mut s = PlaybackSession::new(track(Vec::new()), true);
        assert_eq!(s.read_into(&mut [0.0; 4]), 0);
        assert!(s.is_finished());
    }
}
