//! # audio_fx
//!
//! The audio half of the gesture mixer: mixer state and its update rules, the
//! lock-free snapshot path to the audio callback, the effect chain and the
//! cpal output that drives it.
//!
//! ```text
//!  gesture thread                              audio callback
//!  ──────────────                              ──────────────
//!  actions_for(signal)                         SnapshotReceiver::latest()
//!      │                                           │
//!  MixerControl::apply_all ──► rtrb ring ──────────┘
//!                                                  ▼
//!                          PlaybackSession ─► EffectChain<BiquadBackend> ─► device
//! ```
//!
//! The callback never locks or allocates. Errors and end-of-track travel
//! back to the main loop as [`AudioEvent`]s.

pub mod action;
pub mod chain;
pub mod config;
pub mod dsp;
pub mod loader;
pub mod output;
pub mod render;
pub mod session;
pub mod snapshot;
pub mod state;

pub use action::{actions_for, Action, Effect, Param};
pub use chain::EffectChain;
pub use config::{AudioFxConfig, ChainConfig, EchoConfig, MixerLimits, ReverbConfig};
pub use dsp::{BiquadBackend, DspBackend};
pub use loader::{decode_file, DecodedTrack, LoadError};
pub use output::{AudioError, AudioOutput};
pub use render::{AudioEvent, AudioRenderer};
pub use session::PlaybackSession;
pub use snapshot::{snapshot_channel, MixerControl, SnapshotPublisher, SnapshotReceiver};
pub use state::{Change, MixerState};
