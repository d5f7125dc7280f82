//! Mixer snapshots from the gesture thread to the audio callback.
//!
//! The gesture side owns the only mutable [`MixerState`]. After each frame's
//! actions it pushes one copy through an `rtrb` ring; the callback drains the
//! ring and keeps the newest copy. Neither side blocks or allocates.

use rtrb::{Consumer, Producer, PushError, RingBuffer};

use crate::action::Action;
use crate::config::MixerLimits;
use crate::state::{Change, MixerState};

/// Create a snapshot queue seeded with `initial` on the receiving side.
pub fn snapshot_channel(capacity: usize, initial: MixerState) -> (SnapshotPublisher, SnapshotReceiver) {
    let (producer, consumer) = RingBuffer::new(capacity.max(1));
    (
        SnapshotPublisher { producer, pending: None },
        SnapshotReceiver { consumer, current: initial },
    )
}

// ════════════════════════════════════════════════════════════════════════════
// Publisher
// ════════════════════════════════════════════════════════════════════════════

pub struct SnapshotPublisher {
    producer: Producer<MixerState>,
    /// Newest snapshot that did not fit the ring yet.
    pending:  Option<MixerState>,
}

impl SnapshotPublisher {
    /// Queue `state` and try to deliver it. Returns `true` once it is in the ring.
    pub fn publish(&mut self, state: MixerState) -> bool {
        self.pending = Some(state);
        self.flush()
    }

    /// Retry a snapshot that found the ring full.
    pub fn flush(&mut self) -> bool {
        let Some(state) = self.pending.take() else {
            return true;
        };
        match self.producer.push(state) {
            Ok(()) => true,
            Err(PushError::Full(state)) => {
                self.pending = Some(state);
                false
            }
        }
    }

    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// The audio side has dropped its receiver.
    pub fn is_abandoned(&self) -> bool {
        self.producer.is_abandoned()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Receiver
// ════════════════════════════════════════════════════════════════════════════

pub struct SnapshotReceiver {
    consumer: Consumer<MixerState>,
    current:  MixerState,
}

impl SnapshotReceiver {
    /// Drain the ring and return the newest snapshot seen so far.
    pub fn latest(&mut self) -> MixerState {
        while let Ok(state) = self.consumer.pop() {
            self.current = state;
        }
        self.current
    }
}

// ════════════════════════════════════════════════════════════════════════════
// MixerControl
// ════════════════════════════════════════════════════════════════════════════

/// Writer side of the mixer: owns the state, its limits and the publisher.
pub struct MixerControl {
    state:     MixerState,
    limits:    MixerLimits,
    publisher: SnapshotPublisher,
    published: u64,
}

impl MixerControl {
    pub fn new(initial: MixerState, limits: MixerLimits, publisher: SnapshotPublisher) -> Self {
        MixerControl { state: initial, limits, publisher, published: 0 }
    }

    pub fn state(&self) -> MixerState {
        self.state
    }

    pub fn limits(&self) -> &MixerLimits {
        &self.limits
    }

    /// Number of snapshots handed to the publisher so far.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Apply every action of one frame, then publish a single snapshot.
    ///
    /// Nothing is published for an empty frame.
    pub fn apply_all(&mut self, actions: &[Action]) -> Vec<Change> {
        if actions.is_empty() {
            self.publisher.flush();
            return Vec::new();
        }
        let changes: Vec<Change> = actions
            .iter()
            .map(|a| self.state.apply(*a, &self.limits))
            .collect();
        self.published += 1;
        if !self.publisher.publish(self.state) {
            log::debug!("snapshot queue full, will retry");
        }
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{Effect, Param};

    #[test]
    fn receiver_starts_at_initial_state() {
        let initial = MixerState { volume_db: -6.0, ..MixerState::default() };
        let (_tx, mut rx) = snapshot_channel(4, initial);
        assert_eq!(rx.latest(), initial);
    }

    #[test]
    fn latest_returns_newest_of_several() {
        let (mut tx, mut rx) = snapshot_channel(4, MixerState::default());
        for db in [1.0, 2.0, 3.0] {
            tx.publish(MixerState { bass_db: db, ..MixerState::default() });
        }
        assert_eq!(rx.latest().bass_db, 3.0);
        // Nothing new: still the same copy
        assert_eq!(rx.latest().bass_db, 3.0);
    }

    #[test]
    fn full_ring_keeps_pending_until_flush() {
        let (mut tx, mut rx) = snapshot_channel(1, MixerState::default());
        assert!(tx.publish(MixerState { bass_db: 1.0, ..MixerState::default() }));
        assert!(!tx.publish(MixerState { bass_db: 2.0, ..MixerState::default() }));
        assert!(tx.has_pending());

        assert_eq!(rx.latest().bass_db, 1.0);
        assert!(tx.flush());
        assert_eq!(rx.latest().bass_db, 2.0);
    }

    #[test]
    fn newer_publish_replaces_pending() {
        let (mut tx, mut rx) = snapshot_channel(1, MixerState::default());
        tx.publish(MixerState { bass_db: 1.0, ..MixerState::default() });
        tx.publish(MixerState { bass_db: 2.0, ..MixerState::default() });
        tx.publish(MixerState { bass_db: 3.0, ..MixerState::default() });
        rx.latest();
        tx.flush();
        assert_eq!(rx.latest().bass_db, 3.0);
    }

    #[test]
    fn both_hands_changes_arrive_in_one_snapshot() {
        let (tx, mut rx) = snapshot_channel(4, MixerState::default());
        let mut control = MixerControl::new(MixerState::default(), MixerLimits::default(), tx);

        let changes = control.apply_all(&[Action::Increase(Param::Bass), Action::Decrease(Param::Volume)]);
        assert_eq!(changes.len(), 2);
        assert_eq!(control.published(), 1);

        let seen = rx.latest();
        assert_eq!(seen.bass_db, 2.0);
        assert_eq!(seen.volume_db, -3.0);
    }

    #[test]
    fn empty_frame_publishes_nothing() {
        let (tx, _rx) = snapshot_channel(4, MixerState::default());
        let mut control = MixerControl::new(MixerState::default(), MixerLimits::default(), tx);
        for _ in 0..10 {
            assert!(control.apply_all(&[]).is_empty());
        }
        assert_eq!(control.published(), 0);
        assert_eq!(control.state(), MixerState::default());
    }

    #[test]
    fn receiver_drop_is_visible_to_publisher() {
        let (tx, rx) = snapshot_channel(4, MixerState::default());
        drop(rx);
        assert!(tx.is_abandoned());
        let mut control = MixerControl::new(MixerState::default(), MixerLimits::default(), tx);
        let changes = control.apply_all(&[Action::Toggle(Effect::Echo)]);
        assert!(control.state().echo_enabled);
        assert_eq!(changes.len(), 1);
    }
}
