//! Application-level error and exit codes.

use thiserror::Error;

use audio_fx::{AudioError, LoadError};

use crate::camera::CameraError;
use crate::cli::CliError;
use crate::landmarks::LandmarkError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Usage(#[from] CliError),

    #[error("configuration: {0:#}")]
    Config(anyhow::Error),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("camera: {0}")]
    Camera(#[from] CameraError),

    #[error("hand landmarks: {0}")]
    Landmarks(#[from] LandmarkError),

    #[error("audio: {0}")]
    Audio(#[from] AudioError),

    #[error("overlay window: {0}")]
    Window(String),
}

impl AppError {
    /// 1 for bad input, 2 for the camera, 3 for the audio device.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Usage(_)
            | AppError::Config(_)
            | AppError::Load(_)
            | AppError::Landmarks(_)
            | AppError::Window(_)
            | AppError::Audio(AudioError::Track(_)) => 1,
            AppError::Camera(_) => 2,
            AppError::Audio(_)  => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn exit_codes_follow_the_failing_component() {
        let load = AppError::from(LoadError::Empty { path: PathBuf::from("x.wav") });
        assert_eq!(load.exit_code(), 1);
        assert_eq!(AppError::from(CameraError::Open("busy".into())).exit_code(), 2);
        assert_eq!(AppError::from(AudioError::NoDevice).exit_code(), 3);
        let resample = AudioError::from(LoadError::Resample { from: 0, to: 48_000, reason: "zero".into() });
        assert_eq!(AppError::from(resample).exit_code(), 1);
        assert_eq!(AppError::from(CliError::MissingSong).exit_code(), 1);
    }

    #[test]
    fn messages_keep_the_cause() {
        let e = AppError::from(AudioError::DeviceNotFound("USB DAC".into()));
        assert_eq!(e.to_string(), "audio: audio output device not found: USB DAC");
    }
}
