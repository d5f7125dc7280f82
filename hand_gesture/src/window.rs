//! Moving-average smoothing over recent landmark frames.

use std::collections::VecDeque;

use crate::landmark::{Landmark, Landmarks, LANDMARK_COUNT};

/// Fixed-size moving average over the last `capacity` landmark frames.
///
/// Until the window has filled, the average is taken over the frames seen so
/// far, so the first frame passes through unchanged.
#[derive(Clone, Debug)]
pub struct SmoothingWindow {
    frames:   VecDeque<Landmarks>,
    capacity: usize,
}

impl SmoothingWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        SmoothingWindow {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a frame (the oldest falls off) and return the new average.
    pub fn push(&mut self, landmarks: &Landmarks) -> Landmarks {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(*landmarks);
        self.average()
    }

    /// Average of the frames currently held, or `None` when empty.
    pub fn current(&self) -> Option<Landmarks> {
        if self.frames.is_empty() { None } else { Some(self.average()) }
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn average(&self) -> Landmarks {
        let n = self.frames.len().max(1) as f32;
        let mut sum = [Landmark::default(); LANDMARK_COUNT];
        for frame in &self.frames {
            for (acc, p) in sum.iter_mut().zip(frame.iter()) {
                acc.x += p.x;
                acc.y += p.y;
                acc.z += p.z;
            }
        }
        for p in sum.iter_mut() {
            p.x /= n;
            p.y /= n;
            p.z /= n;
        }
        sum
    }
}
