//! The audio callback body.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::chain::EffectChain;
use crate::dsp::DspBackend;
use crate::session::PlaybackSession;
use crate::snapshot::SnapshotReceiver;

/// Mono frames processed per pass; larger device buffers take several passes.
const SCRATCH_FRAMES: usize = 4096;

// ════════════════════════════════════════════════════════════════════════════
// AudioEvent — sent from the callback to the main loop
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AudioEvent {
    /// The output stream reported an error.
    StreamError(String),
    /// A non-looping track has played to the end.
    EndOfTrack,
}

// ════════════════════════════════════════════════════════════════════════════
// AudioRenderer
// ════════════════════════════════════════════════════════════════════════════

/// Everything the callback owns: session, chain and the snapshot receiver.
///
/// `render` never blocks and never allocates.
pub struct AudioRenderer<B: DspBackend> {
    session:      PlaybackSession,
    chain:        EffectChain<B>,
    snapshots:    SnapshotReceiver,
    closing:      Arc<AtomicBool>,
    events:       Sender<AudioEvent>,
    scratch:      Vec<f32>,
    end_reported: bool,
}

impl<B: DspBackend> AudioRenderer<B> {
    pub fn new(
        session:   PlaybackSession,
        chain:     EffectChain<B>,
        snapshots: SnapshotReceiver,
        closing:   Arc<AtomicBool>,
        events:    Sender<AudioEvent>,
    ) -> Self {
        AudioRenderer {
            session,
            chain,
            snapshots,
            closing,
            events,
            scratch: vec![0.0; SCRATCH_FRAMES],
            end_reported: false,
        }
    }

    pub fn session(&self) -> &PlaybackSession {
        &self.session
    }

    pub fn chain(&self) -> &EffectChain<B> {
        &self.chain
    }

    /// Fill an interleaved device buffer of `channels` channels.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        if self.closing.load(Ordering::Acquire) {
            out.fill(0.0);
            return;
        }
        let channels = channels.max(1);

        self.chain.set_target(self.snapshots.latest());

        let frames = out.len() / channels;
        let mut done = 0;
        while done < frames {
            let n = (frames - done).min(self.scratch.len());
            let mono = &mut self.scratch[..n];

            let got = self.session.read_into(mono);
            mono[got..].fill(0.0);
            self.chain.process(mono);

            let dest = &mut out[done * channels..(done + n) * channels];
            for (frame, sample) in dest.chunks_exact_mut(channels).zip(mono.iter()) {
                frame.fill(*sample);
            }
            done += n;
        }
        // Stray samples of a partial frame
        out[frames * channels..].fill(0.0);

        if self.session.is_finished() && !self.end_reported {
            self.end_reported = true;
            let _ = self.events.try_send(AudioEvent::EndOfTrack);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChainConfig;
    use crate::dsp::BiquadBackend;
    use crate::loader::DecodedTrack;
    use crate::snapshot::{snapshot_channel, SnapshotPublisher};
    use crate::state::MixerState;
    use crossbeam_channel::Receiver;

    const SR: u32 = 48_000;

    struct Rig {
        renderer:  AudioRenderer<BiquadBackend>,
        publisher: SnapshotPublisher,
        closing:   Arc<AtomicBool>,
        events:    Receiver<AudioEvent>,
    }

    fn rig(samples: Vec<f32>, looping: bool) -> Rig {
        let cfg = ChainConfig { smoothing_ms: 0.0, fade_ms: 0.0, ..ChainConfig::default() };
        let track = DecodedTrack { samples, sample_rate: SR, source_channels: 1 };
        let session = PlaybackSession::new(track, looping);
        let chain = EffectChain::new(BiquadBackend::new(SR as f32, &cfg), SR as f32, &cfg, MixerState::default());
        let (publisher, receiver) = snapshot_channel(4, MixerState::default());
        let closing = Arc::new(AtomicBool::new(false));
        let (tx, events) = crossbeam_channel::bounded(4);
        Rig {
            renderer: AudioRenderer::new(session, chain, receiver, closing.clone(), tx),
            publisher,
            closing,
            events,
        }
    }

    #[test]
    fn mono_is_copied_to_every_channel() {
        let mut r = rig(vec![0.1, 0.2, 0.3], true);
        let mut out = [0.0f32; 6];
        r.renderer.render(&mut out, 2);
        assert_eq!(out, [0.1, 0.1, 0.2, 0.2, 0.3, 0.3]);
    }

    #[test]
    fn closing_flag_renders_silence() {
        let mut r = rig(vec![0.5; 100], true);
        r.closing.store(true, Ordering::Release);
        let mut out = [1.0f32; 8];
        r.renderer.render(&mut out, 2);
        assert!(out.iter().all(|s| *s == 0.0));
        assert_eq!(r.renderer.session().progress(), 0.0);
    }

    #[test]
    fn new_snapshot_is_applied_on_next_callback() {
        let mut r = rig(vec![0.5; 256], true);
        r.publisher.publish(MixerState { volume_db: -20.0, ..MixerState::default() });
        let mut out = [0.0f32; 64];
        r.renderer.render(&mut out, 1);
        assert!((out[0] - 0.05).abs() < 1e-4, "{}", out[0]);
        assert_eq!(r.renderer.chain().target().volume_db, -20.0);
    }

    #[test]
    fn end_of_track_reported_once_then_silence() {
        let mut r = rig(vec![0.25; 10], false);
        let mut out = [9.0f32; 32];
        r.renderer.render(&mut out, 2);
        assert_eq!(&out[..20], &[0.25; 20]);
        assert!(out[20..].iter().all(|s| *s == 0.0));

        r.renderer.render(&mut out, 2);
        assert_eq!(r.events.try_iter().collect::<Vec<_>>(), vec![AudioEvent::EndOfTrack]);
    }

    #[test]
    fn large_buffers_take_several_passes() {
        let mut r = rig((0..10_000).map(|i| (i % 7) as f32 * 0.01).collect(), false);
        let mut out = vec![0.0f32; 9000];
        r.renderer.render(&mut out, 1);
        assert_eq!(out[8999], (8999 % 7) as f32 * 0.01);
    }

    #[test]
    fn odd_buffer_tail_is_zeroed() {
        let mut r = rig(vec![0.5; 10], true);
        let mut out = [7.0f32; 5];
        r.renderer.render(&mut out, 2);
        assert_eq!(out, [0.5, 0.5, 0.5, 0.5, 0.0]);
    }
}
