use thiserror::Error;

/// Top-level error type for Doppel.
#[derive(Debug, Error)]
pub enum DoppelError {
    /// Error from an LLM, search, speech, or other external provider.
    #[error("provider error: {0}")]
    Provider(String),

    /// Error from a messaging channel.
    #[error("channel error: {0}")]
    Channel(String),

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Memory/storage error.
    #[error("memory error: {0}")]
    Memory(String),

    /// A handler produced no usable response.
    #[error("handler error: {0}")]
    Handler(String),

    /// An external call exceeded its time budget.
    #[error("timed out after {0}s: {1}")]
    Timeout(u64, String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DoppelError {
    /// Whether the error looks persistent (missing credentials, exhausted quota)
    /// rather than a transient network hiccup.
    pub fn is_persistent(&self) -> bool {
        match self {
            Self::Provider(msg) => {
                let lower = msg.to_lowercase();
                lower.contains("401")
                    || lower.contains("403")
                    || lower.contains("429")
                    || lower.contains("api key")
                    || lower.contains("quota")
            }
            Self::Config(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persistent_provider_errors() {
        assert!(DoppelError::Provider("gemini returned 429 Too Many Requests".into()).is_persistent());
        assert!(DoppelError::Provider("no API key configured".into()).is_persistent());
        assert!(!DoppelError::Provider("connection reset".into()).is_persistent());
        assert!(!DoppelError::Timeout(20, "gemini".into()).is_persistent());
    }
}
