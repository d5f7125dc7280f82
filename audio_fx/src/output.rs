//! cpal output stream around an [`AudioRenderer`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, Stream, StreamConfig, SupportedStreamConfig};
use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;

use crate::chain::EffectChain;
use crate::config::AudioFxConfig;
use crate::dsp::BiquadBackend;
use crate::loader::{resample_to, DecodedTrack, LoadError};
use crate::render::{AudioEvent, AudioRenderer};
use crate::session::PlaybackSession;
use crate::snapshot::{snapshot_channel, SnapshotPublisher};
use crate::state::MixerState;

/// Capacity of the callback → main loop event channel.
const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("audio output device not found: {0}")]
    DeviceNotFound(String),

    #[error("failed to get device config: {0}")]
    Config(String),

    #[error("unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to build audio stream: {0}")]
    StreamBuild(String),

    #[error("failed to start audio stream: {0}")]
    StreamPlay(String),

    #[error(transparent)]
    Track(#[from] LoadError),
}

pub type AudioResult<T> = Result<T, AudioError>;

// ════════════════════════════════════════════════════════════════════════════
// Device selection
// ════════════════════════════════════════════════════════════════════════════

fn find_device(host: &cpal::Host, name: Option<&str>) -> AudioResult<cpal::Device> {
    match name {
        Some(wanted) => {
            let devices = host.output_devices().map_err(|e| AudioError::Config(e.to_string()))?;
            for device in devices {
                if device.name().map(|n| n == wanted).unwrap_or(false) {
                    return Ok(device);
                }
            }
            Err(AudioError::DeviceNotFound(wanted.to_string()))
        }
        None => host.default_output_device().ok_or(AudioError::NoDevice),
    }
}

/// Prefer f32 at the track's rate; otherwise the closest rate the device offers.
fn get_output_config(device: &cpal::Device, target_rate: u32) -> AudioResult<SupportedStreamConfig> {
    let supported: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::Config(e.to_string()))?
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();

    if supported.is_empty() {
        let default = device
            .default_output_config()
            .map_err(|e| AudioError::Config(e.to_string()))?;
        return Err(AudioError::UnsupportedFormat(format!("{:?}", default.sample_format())));
    }

    let in_range = |c: &&cpal::SupportedStreamConfigRange| {
        target_rate >= c.min_sample_rate().0 && target_rate <= c.max_sample_rate().0
    };

    if let Some(range) = supported.iter().find(in_range) {
        return Ok(range.clone().with_sample_rate(cpal::SampleRate(target_rate)));
    }

    let range = &supported[0];
    let rate = target_rate.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
    log::warn!("Device does not support {} Hz, playing at {} Hz (resampled)", target_rate, rate);
    Ok(range.clone().with_sample_rate(cpal::SampleRate(rate)))
}

// ════════════════════════════════════════════════════════════════════════════
// AudioOutput — handle to the running stream
// ════════════════════════════════════════════════════════════════════════════

pub struct AudioOutput {
    stream:      Option<Stream>,
    closing:     Arc<AtomicBool>,
    events:      Receiver<AudioEvent>,
    sample_rate: u32,
    channels:    u16,
    device_name: String,
}

impl AudioOutput {
    /// Open the device, build the chain and start playing `track`.
    ///
    /// Returns the running output and the publisher the gesture side uses to
    /// push mixer snapshots.
    pub fn start(
        track:   DecodedTrack,
        config:  &AudioFxConfig,
        initial: MixerState,
    ) -> AudioResult<(AudioOutput, SnapshotPublisher)> {
        let host = cpal::default_host();
        let device = find_device(&host, config.device.as_deref())?;
        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

        let supported = get_output_config(&device, track.sample_rate)?;
        let stream_config: StreamConfig = supported.config();
        let sample_rate = stream_config.sample_rate.0;
        let channels = stream_config.channels;

        let (publisher, receiver) = snapshot_channel(config.snapshot_capacity, initial);
        let closing = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = crossbeam_channel::bounded(EVENT_CAPACITY);

        let track = resample_to(track, sample_rate)?;
        let session = PlaybackSession::new(track, config.loop_playback);
        let backend = BiquadBackend::new(sample_rate as f32, &config.chain);
        let chain = EffectChain::new(backend, sample_rate as f32, &config.chain, initial);
        let renderer = AudioRenderer::new(session, chain, receiver, closing.clone(), event_tx.clone());

        let stream = build_stream(&device, &stream_config, renderer, event_tx)?;
        stream.play().map_err(|e| AudioError::StreamPlay(e.to_string()))?;

        log::info!("Audio output: {} ({} Hz, {} ch)", device_name, sample_rate, channels);

        let output = AudioOutput {
            stream: Some(stream),
            closing,
            events: event_rx,
            sample_rate,
            channels,
            device_name,
        };
        Ok((output, publisher))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// A handle on the callback → main loop event channel.
    pub fn events(&self) -> Receiver<AudioEvent> {
        self.events.clone()
    }

    /// Silence the callback, then pause and drop the stream.
    pub fn stop(&mut self) {
        self.closing.store(true, Ordering::Release);
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("pausing audio stream: {}", e);
            }
            drop(stream);
            log::info!("Audio output stopped");
        }
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        self.stop();
    }
}

fn build_stream(
    device:   &cpal::Device,
    config:   &StreamConfig,
    mut renderer: AudioRenderer<BiquadBackend>,
    events:   Sender<AudioEvent>,
) -> AudioResult<Stream> {
    let channels = config.channels as usize;
    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                renderer.render(data, channels);
            },
            move |err| {
                let _ = events.try_send(AudioEvent::StreamError(err.to_string()));
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuild(e.to_string()))
}
