use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Channel configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChannelConfig {
    pub console: Option<ConsoleConfig>,
}

/// Local console channel: stdin lines in, stdout out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Sender identifier used for typed lines.
    #[serde(default = "default_console_sender")]
    pub sender_id: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sender_id: default_console_sender(),
        }
    }
}
