//! Left/right classifier pair.

use crate::classifier::{GestureConfig, GestureSignal, HandClassifier};
use crate::landmark::{HandObservation, HandSide};

/// Routes each frame's observations to the matching per-hand classifier.
#[derive(Debug, Clone)]
pub struct DualClassifier {
    left:           HandClassifier,
    right:          HandClassifier,
    min_confidence: f32,
}

impl DualClassifier {
    pub fn new(config: GestureConfig) -> Self {
        DualClassifier {
            min_confidence: config.min_confidence,
            left:           HandClassifier::new(HandSide::Left, config.clone()),
            right:          HandClassifier::new(HandSide::Right, config),
        }
    }

    pub fn hand(&self, side: HandSide) -> &HandClassifier {
        match side {
            HandSide::Left  => &self.left,
            HandSide::Right => &self.right,
        }
    }

    fn hand_mut(&mut self, side: HandSide) -> &mut HandClassifier {
        match side {
            HandSide::Left  => &mut self.left,
            HandSide::Right => &mut self.right,
        }
    }

    /// Process one frame. Emits at most one signal per side, left first.
    ///
    /// When a side appears more than once the most confident observation
    /// wins; observations under `min_confidence` count as absent.
    pub fn process(&mut self, observations: &[HandObservation]) -> Vec<GestureSignal> {
        let mut signals = Vec::with_capacity(2);
        for side in HandSide::BOTH {
            let best = observations
                .iter()
                .filter(|o| o.side == side && o.confidence >= self.min_confidence)
                .max_by(|a, b| a.confidence.total_cmp(&b.confidence));

            let hand = self.hand_mut(side);
            match best {
                Some(obs) => signals.push(hand.observe(obs)),
                None      => hand.observe_absent(),
            }
        }
        signals
    }

    pub fn reset(&mut self) {
        self.left.reset();
        self.right.reset();
    }
}
