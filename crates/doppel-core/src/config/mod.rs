mod channels;
mod defaults;
mod persona;
mod providers;


pub use channels::*;
pub use persona::*;
pub use providers::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::DoppelError;
use defaults::*;

/// Top-level Doppel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub doppel: DoppelConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub youtube: YouTubeConfig,
    #[serde(default)]
    pub voice: VoiceConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// General process settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoppelConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DoppelConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Pipeline timing and gating knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// How long an owner message silences the bot on that chat.
    #[serde(default = "default_silence_window")]
    pub silence_window_secs: u64,
    /// Takeover records idle longer than this are dropped.
    #[serde(default = "default_takeover_gc")]
    pub takeover_gc_secs: u64,
    #[serde(default = "default_max_group_reply")]
    pub max_group_reply: usize,
    #[serde(default = "default_typing_base")]
    pub typing_base_ms: u64,
    /// Tenths of a millisecond of typing per character.
    #[serde(default = "default_typing_per_char")]
    pub typing_per_char: u64,
    #[serde(default = "default_typing_max")]
    pub typing_max_ms: u64,
    /// Attach a synthesized voice note to replies.
    #[serde(default)]
    pub voice_replies: bool,
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval_secs: u64,
    /// Temporary audio files older than this are swept.
    #[serde(default = "default_temp_audio_max_age")]
    pub temp_audio_max_age_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            silence_window_secs: default_silence_window(),
            takeover_gc_secs: default_takeover_gc(),
            max_group_reply: default_max_group_reply(),
            typing_base_ms: default_typing_base(),
            typing_per_char: default_typing_per_char(),
            typing_max_ms: default_typing_max(),
            voice_replies: false,
            maintenance_interval_secs: default_maintenance_interval(),
            temp_audio_max_age_secs: default_temp_audio_max_age(),
        }
    }
}

/// Memory config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_max_context")]
    pub max_context_messages: usize,
    /// History length at which a recap starts being produced.
    #[serde(default = "default_recap_threshold")]
    pub recap_threshold: usize,
    /// Most recent turns always passed through uncompressed.
    #[serde(default = "default_recap_keep_recent")]
    pub recap_keep_recent: usize,
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            max_context_messages: default_max_context(),
            recap_threshold: default_recap_threshold(),
            recap_keep_recent: default_recap_keep_recent(),
            retention_days: default_retention_days(),
        }
    }
}

/// Scheduler configuration -- reminder delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_secs: default_poll_interval(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist. Secrets left empty in
/// the file are filled from the environment.
pub fn load(path: &str) -> Result<Config, DoppelError> {
    let path = Path::new(path);
    let mut config = if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    } else {
        let content = std::fs::read_to_string(path).map_err(|e| {
            DoppelError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&content)
            .map_err(|e| DoppelError::Config(format!("failed to parse config: {}", e)))?
    };

    apply_env(&mut config);
    Ok(config)
}

/// Fill empty secrets from well-known environment variables.
fn apply_env(config: &mut Config) {
    fill_from_env(&mut config.provider.gemini.api_key, "GEMINI_API_KEY");
    fill_from_env(&mut config.search.api_key, "SEARCH_API_KEY");
    fill_from_env(&mut config.youtube.api_key, "YOUTUBE_API_KEY");
}

fn fill_from_env(slot: &mut String, var: &str) {
    if slot.is_empty() {
        if let Ok(value) = std::env::var(var) {
            *slot = value;
        }
    }
}
