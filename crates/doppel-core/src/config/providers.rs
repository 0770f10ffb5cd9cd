use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Provider configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Gemini LLM config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_gemini_model(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Web search config (Serper-compatible JSON API).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            endpoint: default_search_endpoint(),
            timeout_secs: default_lookup_timeout(),
            max_results: default_max_results(),
        }
    }
}

/// YouTube Data API config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YouTubeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_lookup_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for YouTubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            timeout_secs: default_lookup_timeout(),
            max_results: default_max_results(),
        }
    }
}

/// Text-to-speech config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_tts_chunk_budget")]
    pub chunk_budget: usize,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_audio_bytes")]
    pub max_bytes: usize,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            chunk_budget: default_tts_chunk_budget(),
            timeout_secs: default_llm_timeout(),
            max_bytes: default_max_audio_bytes(),
        }
    }
}
