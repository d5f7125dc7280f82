//! Configuration sections for the mixer and effect chain.
//!
//! Every section is `#[serde(default)]` so a partial YAML file only overrides
//! what it names. [`AudioFxConfig::validated`] replaces a section whose values
//! make no sense with its defaults and logs a warning.

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// MixerLimits
// ════════════════════════════════════════════════════════════════════════════

/// Step sizes and bounds for the numeric mixer parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerLimits {
    /// Bass, treble and clarity step per gesture.
    pub eq_step_db:     f32,
    pub eq_min_db:      f32,
    pub eq_max_db:      f32,
    pub volume_step_db: f32,
    pub volume_min_db:  f32,
    pub volume_max_db:  f32,
}

impl Default for MixerLimits {
    fn default() -> Self {
        MixerLimits {
            eq_step_db:     2.0,
            eq_min_db:     -12.0,
            eq_max_db:      12.0,
            volume_step_db: 3.0,
            volume_min_db: -60.0,
            volume_max_db:  6.0,
        }
    }
}

impl MixerLimits {
    /// Problems with these limits, empty when usable.
    ///
    /// Zero must lie inside both ranges since the mixer starts flat.
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        let finite = [
            self.eq_step_db, self.eq_min_db, self.eq_max_db,
            self.volume_step_db, self.volume_min_db, self.volume_max_db,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !finite {
            out.push("limits contain a non-finite value".to_string());
            return out;
        }
        if self.eq_step_db <= 0.0 {
            out.push(format!("eq_step_db must be positive (got {})", self.eq_step_db));
        }
        if self.volume_step_db <= 0.0 {
            out.push(format!("volume_step_db must be positive (got {})", self.volume_step_db));
        }
        if !(self.eq_min_db < self.eq_max_db) || self.eq_min_db > 0.0 || self.eq_max_db < 0.0 {
            out.push(format!("eq range {}..{} dB must contain 0", self.eq_min_db, self.eq_max_db));
        }
        if !(self.volume_min_db < self.volume_max_db) || self.volume_min_db > 0.0 || self.volume_max_db < 0.0 {
            out.push(format!(
                "volume range {}..{} dB must contain 0",
                self.volume_min_db, self.volume_max_db
            ));
        }
        out
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Effect sections
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    pub delay_ms: f32,
    /// Level of the first repeat relative to the dry signal.
    pub decay:    f32,
    /// Portion of each repeat fed back into the line.
    pub feedback: f32,
}

impl Default for EchoConfig {
    fn default() -> Self {
        EchoConfig { delay_ms: 300.0, decay: 0.5, feedback: 0.25 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReverbConfig {
    /// 0.0–1.0, longer tail as it grows.
    pub room_size: f32,
    /// 0.0 bright … 1.0 dark.
    pub damping:   f32,
    pub wet:       f32,
}

impl Default for ReverbConfig {
    fn default() -> Self {
        ReverbConfig { room_size: 0.6, damping: 0.4, wet: 0.35 }
    }
}

/// Filter corner frequencies and timing of the effect chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub bass_hz:      f32,
    pub treble_hz:    f32,
    /// Centre of the speech-clarity peak; with the default Q it spans ~1–3 kHz.
    pub clarity_hz:   f32,
    pub clarity_q:    f32,
    /// Time constant of the dB parameter glide.
    pub smoothing_ms: f32,
    /// Length of the echo/reverb wet ramp on toggle.
    pub fade_ms:      f32,
    /// Release time of the output peak guard.
    pub release_ms:   f32,
    pub echo:         EchoConfig,
    pub reverb:       ReverbConfig,
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig {
            bass_hz:      250.0,
            treble_hz:    4000.0,
            clarity_hz:   1730.0,
            clarity_q:    0.87,
            smoothing_ms: 40.0,
            fade_ms:      25.0,
            release_ms:   500.0,
            echo:         EchoConfig::default(),
            reverb:       ReverbConfig::default(),
        }
    }
}

impl ChainConfig {
    pub fn problems(&self) -> Vec<String> {
        let mut out = Vec::new();
        for (name, hz) in [("bass_hz", self.bass_hz), ("treble_hz", self.treble_hz), ("clarity_hz", self.clarity_hz)] {
            if !(hz > 0.0 && hz < 20_000.0) {
                out.push(format!("{} must be within 0..20000 Hz (got {})", name, hz));
            }
        }
        if !(self.clarity_q > 0.0) {
            out.push(format!("clarity_q must be positive (got {})", self.clarity_q));
        }
        for (name, ms) in [("smoothing_ms", self.smoothing_ms), ("fade_ms", self.fade_ms), ("release_ms", self.release_ms)] {
            if !(ms >= 0.0 && ms.is_finite()) {
                out.push(format!("{} must be non-negative (got {})", name, ms));
            }
        }
        if !(self.echo.delay_ms > 0.0 && self.echo.delay_ms <= 2000.0) {
            out.push(format!("echo.delay_ms must be within 0..2000 (got {})", self.echo.delay_ms));
        }
        if !(0.0..1.0).contains(&self.echo.feedback) {
            out.push(format!("echo.feedback must be within 0..1 (got {})", self.echo.feedback));
        }
        if !(0.0..=1.0).contains(&self.echo.decay) {
            out.push(format!("echo.decay must be within 0..=1 (got {})", self.echo.decay));
        }
        let r = &self.reverb;
        if ![r.room_size, r.damping, r.wet].iter().all(|v| (0.0..=1.0).contains(v)) {
            out.push("reverb parameters must be within 0..=1".to_string());
        }
        out
    }
}

// ════════════════════════════════════════════════════════════════════════════
// AudioFxConfig
// ════════════════════════════════════════════════════════════════════════════

/// Everything the audio side needs at start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioFxConfig {
    /// Output device name; `None` uses the host default.
    pub device:            Option<String>,
    /// Restart the song when it ends.
    pub loop_playback:     bool,
    /// Slots in the snapshot queue to the audio callback.
    pub snapshot_capacity: usize,
    pub limits:            MixerLimits,
    pub chain:             ChainConfig,
}

impl Default for AudioFxConfig {
    fn default() -> Self {
        AudioFxConfig {
            device:            None,
            loop_playback:     true,
            snapshot_capacity: 16,
            limits:            MixerLimits::default(),
            chain:             ChainConfig::default(),
        }
    }
}

impl AudioFxConfig {
    /// Replace invalid sections with defaults, logging each problem.
    pub fn validated(mut self) -> Self {
        let problems = self.limits.problems();
        if !problems.is_empty() {
            for p in &problems {
                log::warn!("audio limits: {}", p);
            }
            log::warn!("audio limits: using defaults");
            self.limits = MixerLimits::default();
        }

        let problems = self.chain.problems();
        if !problems.is_empty() {
            for p in &problems {
                log::warn!("effect chain: {}", p);
            }
            log::warn!("effect chain: using defaults");
            self.chain = ChainConfig::default();
        }

        if self.snapshot_capacity == 0 {
            log::warn!("snapshot_capacity must be at least 1, using 16");
            self.snapshot_capacity = 16;
        }
        self
    }
}
