//! Configuration types for squishfile

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote compression service settings
///
/// Used as a flattened sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the compression service (default: "http://127.0.0.1:8000")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request transport timeout in seconds (default: 120)
    ///
    /// Compression of large videos can take minutes, so this is generous. It is a
    /// transport guard only; the pipeline never retries a timed-out request.
    #[serde(default = "default_request_timeout", with = "duration_secs_serde")]
    pub request_timeout: Duration,

    /// File name used when saving a bundle download (default: "squishfile.zip")
    #[serde(default = "default_bundle_filename")]
    pub bundle_filename: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
            bundle_filename: default_bundle_filename(),
        }
    }
}

/// Synthetic progress schedule
///
/// The compress collaborator only answers once it is finished, so progress while
/// compressing is fabricated: start at `baseline`, add `step` every `interval`,
/// never pass `ceiling`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Progress shown as soon as compression starts (default: 10)
    #[serde(default = "default_baseline")]
    pub baseline: u8,

    /// Increment per tick (default: 15)
    #[serde(default = "default_step")]
    pub step: u8,

    /// Highest fabricated value, must stay below 100 (default: 90)
    #[serde(default = "default_ceiling")]
    pub ceiling: u8,

    /// Tick interval in milliseconds (default: 300)
    #[serde(default = "default_tick_interval", with = "duration_millis_serde")]
    pub interval: Duration,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            baseline: default_baseline(),
            step: default_step(),
            ceiling: default_ceiling(),
            interval: default_tick_interval(),
        }
    }
}

/// Target size bounds
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target used by a fresh session, in KB (default: 500)
    #[serde(default = "default_target_kb")]
    pub default_target_kb: u64,

    /// Smallest target the user may choose, in KB (default: 10)
    #[serde(default = "default_min_target_kb")]
    pub min_target_kb: u64,

    /// Upper bound of the target range before any file is seen, in KB (default: 10240)
    ///
    /// Grows to the size of the largest uploaded file.
    #[serde(default = "default_max_kb")]
    pub default_max_kb: u64,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            default_target_kb: default_target_kb(),
            min_target_kb: default_min_target_kb(),
            default_max_kb: default_max_kb(),
        }
    }
}

/// Pipeline behavior
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Start compressing as soon as an upload finishes (default: false)
    #[serde(default)]
    pub auto_compress: bool,

    /// Event channel capacity (default: 1000)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            auto_compress: false,
            event_buffer: default_event_buffer(),
        }
    }
}

/// Main configuration for [`Pipeline`](crate::Pipeline)
///
/// - [`service`](ServiceConfig): remote service endpoint (flattened)
/// - [`progress`](ProgressConfig): synthetic progress schedule
/// - [`target`](TargetConfig): target size bounds
/// - [`pipeline`](PipelineConfig): orchestration behavior
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote service endpoint
    #[serde(flatten)]
    pub service: ServiceConfig,

    /// Synthetic progress schedule
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Target size bounds
    #[serde(default)]
    pub target: TargetConfig,

    /// Orchestration behavior
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Check the configuration for values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        let progress = &self.progress;
        if progress.ceiling >= 100 {
            return Err(config_error(
                "progress.ceiling",
                format!(
                    "ceiling must be below 100 so fabricated progress never reads as complete (got {})",
                    progress.ceiling
                ),
            ));
        }
        if progress.baseline > progress.ceiling {
            return Err(config_error(
                "progress.baseline",
                format!(
                    "baseline {} is above ceiling {}",
                    progress.baseline, progress.ceiling
                ),
            ));
        }
        if progress.step == 0 {
            return Err(config_error("progress.step", "step must be at least 1"));
        }
        if progress.interval.is_zero() {
            return Err(config_error(
                "progress.interval",
                "interval must be greater than zero",
            ));
        }

        let target = &self.target;
        if target.min_target_kb == 0 {
            return Err(config_error(
                "target.min_target_kb",
                "minimum target must be at least 1 KB",
            ));
        }
        if target.default_target_kb < target.min_target_kb {
            return Err(config_error(
                "target.default_target_kb",
                format!(
                    "default target {} KB is below the minimum {} KB",
                    target.default_target_kb, target.min_target_kb
                ),
            ));
        }
        if target.default_target_kb > target.default_max_kb {
            return Err(config_error(
                "target.default_target_kb",
                format!(
                    "default target {} KB is above the default maximum {} KB",
                    target.default_target_kb, target.default_max_kb
                ),
            ));
        }

        if self.service.base_url.trim().is_empty() {
            return Err(config_error("base_url", "base_url must not be empty"));
        }
        if self.pipeline.event_buffer == 0 {
            return Err(config_error(
                "pipeline.event_buffer",
                "event buffer must hold at least one event",
            ));
        }

        Ok(())
    }
}

fn config_error(key: &str, message: impl Into<String>) -> Error {
    Error::Config {
        message: message.into(),
        key: Some(key.to_string()),
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_bundle_filename() -> String {
    "squishfile.zip".to_string()
}

fn default_baseline() -> u8 {
    10
}

fn default_step() -> u8 {
    15
}

fn default_ceiling() -> u8 {
    90
}

fn default_tick_interval() -> Duration {
    Duration::from_millis(300)
}

fn default_target_kb() -> u64 {
    500
}

fn default_min_target_kb() -> u64 {
    10
}

fn default_max_kb() -> u64 {
    10240
}

fn default_event_buffer() -> usize {
    1000
}

// Duration serialization helpers
mod duration_secs_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
