//! hitmix-player configuration
//!
//! Loaded from TOML (see `hitmix_common::config` for file resolution). Every
//! field has a built-in default, so an empty or absent file is valid. CLI
//! flags override individual fields after loading.
//!
//! ```toml
//! sample_rate = 48000
//! balance_factor = 0.8
//! master_volume = 0.9
//! release_fade_ms = 400
//! release_curve = "linear"
//! loop_quantum_ms = 1
//! event_channel_capacity = 256
//! prewarm_concurrency = 0
//! ```

use crate::error::{Error, Result};
use crate::playback::orchestrator::ReleaseEnvelope;
use hitmix_common::FadeCurve;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_sample_rate() -> u32 {
    44100
}

fn default_balance_factor() -> f32 {
    0.8
}

fn default_master_volume() -> f32 {
    1.0
}

fn default_release_fade_ms() -> u64 {
    crate::playback::fader::DEFAULT_RELEASE_MS
}

fn default_loop_quantum_ms() -> u64 {
    1
}

fn default_event_channel_capacity() -> usize {
    256
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Mixer sample rate; every sound is resampled to it on load
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Multiplier applied to every event balance
    #[serde(default = "default_balance_factor")]
    pub balance_factor: f32,

    /// Channel master volume (0.0-1.0)
    #[serde(default = "default_master_volume")]
    pub master_volume: f32,

    /// Release fade for stopped sustained sounds
    #[serde(default = "default_release_fade_ms")]
    pub release_fade_ms: u64,

    /// Release fade shape (linear, logarithmic, s_curve, equal_power)
    pub release_curve: FadeCurve,

    /// Playback loop sleep between dispatch passes
    #[serde(default = "default_loop_quantum_ms")]
    pub loop_quantum_ms: u64,

    /// Capacity of the notification broadcast channel
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Concurrent sound loads during initialization (0 = available cores)
    pub prewarm_concurrency: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            balance_factor: default_balance_factor(),
            master_volume: default_master_volume(),
            release_fade_ms: default_release_fade_ms(),
            release_curve: FadeCurve::default(),
            loop_quantum_ms: default_loop_quantum_ms(),
            event_channel_capacity: default_event_channel_capacity(),
            prewarm_concurrency: 0,
        }
    }
}

impl PlayerConfig {
    /// Resolve and load the config file (CLI path, `HITMIX_CONFIG`, platform dir)
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        let config: Self =
            hitmix_common::config::load_config(cli_path, hitmix_common::config::CONFIG_ENV_VAR)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(Error::Config("sample_rate must be positive".to_string()));
        }
        if !self.balance_factor.is_finite() {
            return Err(Error::Config("balance_factor must be finite".to_string()));
        }
        if !(0.0..=1.0).contains(&self.master_volume) {
            return Err(Error::Config(format!(
                "master_volume {} outside 0.0-1.0",
                self.master_volume
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::Config(
                "event_channel_capacity must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn release_envelope(&self) -> ReleaseEnvelope {
        ReleaseEnvelope {
            frames: hitmix_common::time::ms_to_frames(self.release_fade_ms as f64, self.sample_rate),
            curve: self.release_curve,
        }
    }

    /// Loop sleep, never below one millisecond
    pub fn loop_quantum(&self) -> Duration {
        Duration::from_millis(self.loop_quantum_ms.max(1))
    }
}
