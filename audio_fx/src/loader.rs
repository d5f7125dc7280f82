//! Song decoding with symphonia.
//!
//! The whole file is decoded up front and averaged to mono; the song is
//! expected to fit in memory. Once the output device is known the track is
//! resampled to its rate with rubato, so playback is a plain sample copy.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rubato::{FftFixedIn, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open {path}: {source}")]
    Open {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported audio in {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },

    #[error("{path} decoded to no audio")]
    Empty { path: PathBuf },

    #[error("cannot resample {from} Hz to {to} Hz: {reason}")]
    Resample { from: u32, to: u32, reason: String },
}

/// Input frames per resampler call.
const RESAMPLE_CHUNK: usize = 1024;

/// A fully decoded song, mono.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTrack {
    pub samples:         Vec<f32>,
    pub sample_rate:     u32,
    /// Channel count of the file before downmixing.
    pub source_channels: u16,
}

impl DecodedTrack {
    pub fn frames(&self) -> usize {
        self.samples.len()
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate.max(1) as f64)
    }
}

/// Average interleaved frames of `channels` samples into one sample each.
pub fn downmix(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    if channels <= 1 {
        out.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / channels as f32;
    out.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

/// Decode `path` to a mono track.
pub fn decode_file(path: &Path) -> Result<DecodedTrack, LoadError> {
    let unsupported = |reason: String| LoadError::Unsupported { path: path.to_path_buf(), reason };

    let file = File::open(path).map_err(|source| LoadError::Open { path: path.to_path_buf(), source })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| unsupported(e.to_string()))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| unsupported("no audio track".to_string()))?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| unsupported("unknown sample rate".to_string()))?;
    let source_channels = track.codec_params.channels.map(|c| c.count() as u16).unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| unsupported(e.to_string()))?;

    let mut samples = Vec::new();
    // Interleaved scratch buffer and its capacity in frames
    let mut scratch: Option<(SampleBuffer<f32>, usize)> = None;
    let mut bad_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                log::warn!("{}: stopped reading packets: {}", path.display(), e);
                break;
            }
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                bad_packets += 1;
                log::debug!("{}: skipping corrupt packet: {}", path.display(), e);
                continue;
            }
            Err(e) => return Err(unsupported(e.to_string())),
        };

        let spec = *decoded.spec();
        let frames = decoded.capacity();
        let needs_new = match &scratch {
            Some((_, cap)) => *cap < frames,
            None => true,
        };
        if needs_new {
            scratch = Some((SampleBuffer::new(frames as u64, spec), frames));
        }
        if let Some((buf, _)) = scratch.as_mut() {
            buf.copy_interleaved_ref(decoded);
            downmix(buf.samples(), spec.channels.count(), &mut samples);
        }
    }

    if bad_packets > 0 {
        log::warn!("{}: skipped {} corrupt packets", path.display(), bad_packets);
    }
    if samples.is_empty() {
        return Err(LoadError::Empty { path: path.to_path_buf() });
    }

    log::info!(
        "Loaded {} ({} Hz, {} ch → mono, {:.1} s)",
        path.display(),
        sample_rate,
        source_channels,
        samples.len() as f64 / sample_rate as f64
    );

    Ok(DecodedTrack { samples, sample_rate, source_channels })
}

/// Convert `track` to `rate` Hz.
///
/// The output is trimmed of the resampler delay and has exactly
/// `ceil(frames * rate / sample_rate)` frames.
pub fn resample_to(track: DecodedTrack, rate: u32) -> Result<DecodedTrack, LoadError> {
    let from = track.sample_rate;
    if from == rate || track.samples.is_empty() {
        return Ok(DecodedTrack { sample_rate: rate, ..track });
    }
    let fail = |reason: String| LoadError::Resample { from, to: rate, reason };
    if from == 0 || rate == 0 {
        return Err(fail("zero sample rate".to_string()));
    }

    let mut resampler = FftFixedIn::<f32>::new(from as usize, rate as usize, RESAMPLE_CHUNK, 2, 1)
        .map_err(|e| fail(e.to_string()))?;

    let input = &track.samples;
    let expected = (input.len() as u64 * rate as u64).div_ceil(from as u64) as usize;
    let delay = resampler.output_delay();
    let mut out: Vec<f32> = Vec::with_capacity(expected + delay + RESAMPLE_CHUNK * 2);

    let mut pos = 0;
    while input.len() - pos >= resampler.input_frames_next() {
        let n = resampler.input_frames_next();
        let chunk = [&input[pos..pos + n]];
        let frames = resampler.process(&chunk[..], None).map_err(|e| fail(e.to_string()))?;
        out.extend_from_slice(&frames[0]);
        pos += n;
    }
    if pos < input.len() {
        let chunk = [&input[pos..]];
        let frames = resampler
            .process_partial(Some(&chunk[..]), None)
            .map_err(|e| fail(e.to_string()))?;
        out.extend_from_slice(&frames[0]);
    }
    // Flush the filter tail
    while out.len() < expected + delay {
        let frames = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| fail(e.to_string()))?;
        if frames[0].is_empty() {
            break;
        }
        out.extend_from_slice(&frames[0]);
    }

    let samples: Vec<f32> = out.into_iter().skip(delay).take(expected).collect();
    log::info!("Resampled {} Hz → {} Hz ({} → {} frames)", from, rate, input.len(), samples.len());
    Ok(DecodedTrack { samples, sample_rate: rate, source_channels: track.source_channels })
}
