mod defaults;
mod participants;
mod providers;

#[cfg(test)]
mod tests;

pub use participants::*;
pub use providers::*;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

use crate::error::ChorusError;
use defaults::*;

/// Top-level Chorus configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub chorus: ChorusConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub delay: DelayConfig,
    #[serde(default)]
    pub autonomous: AutonomousConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub participants: Vec<ParticipantConfig>,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChorusConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for rolling log files. Unset = stderr only.
    #[serde(default)]
    pub log_dir: Option<String>,
    /// Display label of the human in the room.
    #[serde(default = "default_human_label")]
    pub human_label: String,
    #[serde(default = "default_room")]
    pub room: String,
    /// Fixed RNG seed for reproducible scheduling. Unset = OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for ChorusConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            log_level: default_log_level(),
            log_dir: None,
            human_label: default_human_label(),
            room: default_room(),
            seed: None,
        }
    }
}

/// Queue, context window, and sleep/wake settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum entries kept in the conversation window.
    #[serde(default = "default_context_capacity")]
    pub context_capacity: usize,
    /// Entries handed to a generator per call.
    #[serde(default = "default_generation_window")]
    pub generation_window: usize,
    #[serde(default = "default_max_queue_len")]
    pub max_queue_len: usize,
    /// Pause between two dispatched messages.
    #[serde(default = "default_drain_pacing_ms")]
    pub drain_pacing_ms: u64,
    /// Unattended agent messages before everyone goes to sleep.
    #[serde(default = "default_sleep_threshold")]
    pub sleep_threshold: u32,
    #[serde(default = "default_generation_timeout_secs")]
    pub generation_timeout_secs: u64,
    /// Priority assigned to every human-authored message.
    #[serde(default = "default_human_priority")]
    pub human_priority: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            context_capacity: default_context_capacity(),
            generation_window: default_generation_window(),
            max_queue_len: default_max_queue_len(),
            drain_pacing_ms: default_drain_pacing_ms(),
            sleep_threshold: default_sleep_threshold(),
            generation_timeout_secs: default_generation_timeout_secs(),
            human_priority: default_human_priority(),
        }
    }
}

/// Per-responder delay settings (milliseconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayConfig {
    #[serde(default = "default_human_min_ms")]
    pub human_min_ms: u64,
    #[serde(default = "default_human_max_ms")]
    pub human_max_ms: u64,
    #[serde(default = "default_background_min_ms")]
    pub background_min_ms: u64,
    #[serde(default = "default_background_max_ms")]
    pub background_max_ms: u64,
    /// Fixed stagger added per ordinal position.
    #[serde(default = "default_min_gap_ms")]
    pub min_gap_ms: u64,
    /// Upper bound of the random stagger.
    #[serde(default = "default_max_gap_ms")]
    pub max_gap_ms: u64,
    #[serde(default = "default_mention_floor_ms")]
    pub mention_floor_ms: u64,
    #[serde(default = "default_mention_discount")]
    pub mention_discount: f64,
    #[serde(default = "default_catch_up_scale_ms")]
    pub catch_up_scale_ms: u64,
}

impl Default for DelayConfig {
    fn default() -> Self {
        Self {
            human_min_ms: default_human_min_ms(),
            human_max_ms: default_human_max_ms(),
            background_min_ms: default_background_min_ms(),
            background_max_ms: default_background_max_ms(),
            min_gap_ms: default_min_gap_ms(),
            max_gap_ms: default_max_gap_ms(),
            mention_floor_ms: default_mention_floor_ms(),
            mention_discount: default_mention_discount(),
            catch_up_scale_ms: default_catch_up_scale_ms(),
        }
    }
}

impl DelayConfig {
    /// Clamp the ranges into a consistent shape.
    ///
    /// Minimum delays are raised to the mention floor so a mentioned
    /// responder is never scheduled later than an unmentioned one.
    pub fn validated(mut self) -> Self {
        if !(self.mention_discount > 0.0 && self.mention_discount <= 1.0) {
            warn!(
                "config: mention_discount {} outside (0, 1], using {}",
                self.mention_discount,
                default_mention_discount()
            );
            self.mention_discount = default_mention_discount();
        }
        let floor = self.mention_floor_ms;
        (self.human_min_ms, self.human_max_ms) =
            clamp_range("human", self.human_min_ms, self.human_max_ms, floor);
        (self.background_min_ms, self.background_max_ms) = clamp_range(
            "background",
            self.background_min_ms,
            self.background_max_ms,
            floor,
        );
        self
    }
}

fn clamp_range(label: &str, min: u64, max: u64, floor: u64) -> (u64, u64) {
    let lo = if min < floor {
        warn!("config: {label}_min_ms {min} below mention floor, raised to {floor}");
        floor
    } else {
        min
    };
    let hi = if max < lo {
        warn!("config: {label}_max_ms {max} below {label}_min_ms, raised to {lo}");
        lo
    } else {
        max
    };
    (lo, hi)
}

/// Autonomous background conversation settings (seconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomousConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Wait while asleep or with no active participants.
    #[serde(default = "default_retry_interval_secs")]
    pub retry_interval_secs: u64,
    #[serde(default = "default_autonomous_min_secs")]
    pub min_delay_secs: u64,
    #[serde(default = "default_autonomous_max_secs")]
    pub max_delay_secs: u64,
    /// Idle time after which background chatter is suppressed.
    #[serde(default = "default_silence_timeout_secs")]
    pub silence_timeout_secs: u64,
}

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            retry_interval_secs: default_retry_interval_secs(),
            min_delay_secs: default_autonomous_min_secs(),
            max_delay_secs: default_autonomous_max_secs(),
            silence_timeout_secs: default_silence_timeout_secs(),
        }
    }
}

impl Config {
    /// Clamp every section into a usable shape.
    pub fn validated(mut self) -> Self {
        self.delay = self.delay.validated();
        if self.scheduler.context_capacity == 0 {
            warn!("config: context_capacity 0, using 1");
            self.scheduler.context_capacity = 1;
        }
        if self.scheduler.max_queue_len == 0 {
            warn!("config: max_queue_len 0, using 1");
            self.scheduler.max_queue_len = 1;
        }
        if self.scheduler.sleep_threshold == 0 {
            warn!("config: sleep_threshold 0, using 1");
            self.scheduler.sleep_threshold = 1;
        }
        if self.autonomous.retry_interval_secs == 0 {
            self.autonomous.retry_interval_secs = 1;
        }
        if self.autonomous.max_delay_secs < self.autonomous.min_delay_secs {
            warn!("config: autonomous max_delay_secs below min_delay_secs, raised");
            self.autonomous.max_delay_secs = self.autonomous.min_delay_secs;
        }
        self
    }
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, ChorusError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default().validated());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ChorusError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    parse(&content)
}

/// Parse configuration from TOML text.
pub fn parse(content: &str) -> Result<Config, ChorusError> {
    let config: Config = toml::from_str(content)
        .map_err(|e| ChorusError::Config(format!("failed to parse config: {}", e)))?;
    Ok(config.validated())
}
