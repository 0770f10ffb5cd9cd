use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Who the bot is pretending to be and who owns the account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    /// Display name; also the group name-tag trigger (case-insensitive).
    #[serde(default = "default_persona_name")]
    pub name: String,
    /// The bot's own identifier on the transport (mentions, quoted authors).
    #[serde(default = "default_bot_id")]
    pub bot_id: String,
    /// The account owner's identifier. Commands are only honored from here.
    #[serde(default)]
    pub owner_id: String,
    /// Local time offset used for late-night and special-day logic.
    #[serde(default = "default_utc_offset")]
    pub utc_offset_minutes: i32,
    /// Static persona description placed at the top of every system prompt.
    #[serde(default = "default_persona_description")]
    pub description: String,
    /// Facts the knowledge handler can surface.
    #[serde(default)]
    pub knowledge: Vec<KnowledgeEntry>,
    /// Special days as `MM-DD = "label"`.
    #[serde(default)]
    pub special_days: std::collections::BTreeMap<String, String>,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_persona_name(),
            bot_id: default_bot_id(),
            owner_id: String::new(),
            utc_offset_minutes: default_utc_offset(),
            description: default_persona_description(),
            knowledge: Vec::new(),
            special_days: Default::default(),
        }
    }
}

/// One knowledge-base fact and the keywords that surface it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub keywords: Vec<String>,
    pub fact: String,
}
