//! Application configuration (YAML).
//!
//! Every section is `#[serde(default)]`, so a file only needs the values it
//! changes:
//!
//! ```yaml
//! gesture:
//!   cooldown_ms: 250
//! audio:
//!   limits:
//!     eq_step_db: 1.0
//!   chain:
//!     echo:
//!       delay_ms: 420
//! camera:
//!   index: 1
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use audio_fx::AudioFxConfig;
use hand_gesture::GestureConfig;

use crate::error::AppError;

// ════════════════════════════════════════════════════════════════════════════
// Sections
// ════════════════════════════════════════════════════════════════════════════

/// Frame source settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub index:                    u32,
    /// Requested capture size; the device may pick something else.
    pub width:                    u32,
    pub height:                   u32,
    /// Flip frames horizontally so the overlay behaves like a mirror.
    pub mirror:                   bool,
    /// Frame rate of the blank source used without a camera.
    pub fps:                      u32,
    /// Consecutive failed frames before the loop gives up.
    pub max_consecutive_failures: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            index:                    0,
            width:                    640,
            height:                   480,
            mirror:                   true,
            fps:                      30,
            max_consecutive_failures: 30,
        }
    }
}

impl CameraConfig {
    fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.width == 0 || self.height == 0 {
            out.push(format!("frame size {}x{} is empty", self.width, self.height));
        }
        if self.fps == 0 {
            out.push("fps must be at least 1".to_string());
        }
        if self.max_consecutive_failures == 0 {
            out.push("max_consecutive_failures must be at least 1".to_string());
        }
        out
    }
}

/// Hand-landmark model settings (used by the `onnx` build).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub path:          PathBuf,
    /// Square input edge the model expects, in pixels.
    pub input_size:    u32,
    pub intra_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            path:          PathBuf::from("models/hand_landmark.onnx"),
            input_size:    224,
            intra_threads: 2,
        }
    }
}

/// Overlay window settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    pub width:          usize,
    pub height:         usize,
    pub show_landmarks: bool,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig { width: 960, height: 600, show_landmarks: true }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gesture: GestureConfig,
    pub audio:   AudioFxConfig,
    pub camera:  CameraConfig,
    pub model:   ModelConfig,
    pub overlay: OverlayConfig,
}

impl AppConfig {
    /// Replace invalid sections with their defaults, logging why.
    pub fn validated(mut self) -> Self {
        let problems = self.gesture.problems();
        if !problems.is_empty() {
            for p in &problems {
                log::warn!("gesture: {}", p);
            }
            log::warn!("gesture: using defaults");
            self.gesture = GestureConfig::default();
        }

        let problems = self.camera.problems();
        if !problems.is_empty() {
            for p in &problems {
                log::warn!("camera: {}", p);
            }
            log::warn!("camera: using defaults");
            self.camera = CameraConfig::default();
        }

        if self.overlay.width < 320 || self.overlay.height < 240 {
            log::warn!(
                "overlay: {}x{} is too small, using defaults",
                self.overlay.width,
                self.overlay.height
            );
            self.overlay = OverlayConfig::default();
        }

        self.audio = self.audio.validated();
        self
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Loading
// ════════════════════════════════════════════════════════════════════════════

/// `~/.config/gesture-mixer/config.yaml` (or the platform equivalent).
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
        .join("gesture-mixer")
        .join("config.yaml")
}

/// Read and parse one YAML file.
pub fn read_config(path: &Path) -> Result<AppConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config = serde_yaml::from_str::<AppConfig>(&contents)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    Ok(config)
}

/// Load configuration from a YAML file.
///
/// A missing file gives the defaults. An unreadable or invalid file logs a
/// warning and also gives the defaults.
pub fn load_config(path: &Path) -> AppConfig {
    log::info!("load_config: Loading from {:?}", path);

    if !path.exists() {
        log::info!("load_config: Config file doesn't exist, using defaults");
        return AppConfig::default();
    }

    match read_config(path) {
        Ok(config) => {
            log::info!("load_config: Successfully loaded config from {:?}", path);
            config
        }
        Err(e) => {
            log::warn!("load_config: {:#}, using defaults", e);
            AppConfig::default()
        }
    }
}

/// Configuration for this run.
///
/// A path given on the command line must exist; the default path may not.
pub fn resolve_config(explicit: Option<&Path>) -> Result<AppConfig, AppError> {
    let config = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(AppError::Config(anyhow::anyhow!("config file {:?} not found", path)));
            }
            load_config(path)
        }
        None => load_config(&default_config_path()),
    };
    Ok(config.validated())
}
