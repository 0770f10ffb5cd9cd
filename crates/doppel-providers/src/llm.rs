//! LLM-backed utility collaborators: conversation summarizer and translator.

use async_trait::async_trait;
use doppel_core::{
    context::{Context, ContextEntry, GenerationConfig},
    error::DoppelError,
    traits::{Lookup, Provider, Summarizer},
};
use std::sync::Arc;

const SUMMARY_PROMPT: &str = "You compress chat transcripts. Summarize the conversation below \
in 2-3 short sentences: who said what, open questions, plans made. Plain text, no lists, no preamble.";

const TRANSLATE_PROMPT: &str = "You are a translator. Translate the user's text into the requested \
language. Reply with the translation only, no quotes, no notes. Use the native script unless the \
user asks for Roman script.";

/// Low-temperature sampling for utility calls.
fn utility_generation(max_output_tokens: u32) -> GenerationConfig {
    GenerationConfig {
        temperature: 0.3,
        top_p: 0.9,
        top_k: 20,
        max_output_tokens,
    }
}

/// Render turns as a plain `role: content` transcript.
pub fn transcript(turns: &[ContextEntry]) -> String {
    turns
        .iter()
        .map(|t| {
            let who = if t.role == "assistant" { "me" } else { "them" };
            format!("{who}: {}", t.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Summarizes conversation turns through the configured LLM.
pub struct LlmSummarizer {
    provider: Arc<dyn Provider>,
}

impl LlmSummarizer {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, turns: &[ContextEntry]) -> Result<Option<String>, DoppelError> {
        if turns.is_empty() {
            return Ok(None);
        }
        let mut context = Context::new(&transcript(turns));
        context.system_prompt = SUMMARY_PROMPT.to_string();
        context.generation = utility_generation(200);

        let resp = self.provider.complete(&context).await?;
        let text = resp.text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

/// Translates a request of the form `Translate to <language>: <text>`.
pub struct LlmTranslator {
    provider: Arc<dyn Provider>,
}

impl LlmTranslator {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Build the request string this translator expects.
    pub fn request(text: &str, language: &str) -> String {
        format!("Translate to {language}: {text}")
    }
}

#[async_trait]
impl Lookup for LlmTranslator {
    fn name(&self) -> &str {
        "translate"
    }

    async fn lookup(&self, query: &str, _is_group: bool) -> Result<Option<String>, DoppelError> {
        let mut context = Context::new(query);
        context.system_prompt = TRANSLATE_PROMPT.to_string();
        context.generation = utility_generation(400);

        let resp = self.provider.complete(&context).await?;
        let text = resp.text.trim().trim_matches('"').trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doppel_core::message::OutgoingMessage;
    use std::sync::Mutex;

    /// Echoes a canned reply and remembers the last context it saw.
    struct CannedProvider {
        reply: String,
        seen: Mutex<Option<Context>>,
    }

    impl CannedProvider {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                seen: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(&self, context: &Context) -> Result<OutgoingMessage, DoppelError> {
            *self.seen.lock().unwrap() = Some(context.clone());
            Ok(OutgoingMessage {
                text: self.reply.clone(),
                ..Default::default()
            })
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    fn entry(role: &str, content: &str) -> ContextEntry {
        ContextEntry {
            role: role.into(),
            content: content.into(),
        }
    }

    #[test]
    fn test_transcript_labels_roles() {
        let t = transcript(&[entry("user", "hey"), entry("assistant", "yo")]);
        assert_eq!(t, "them: hey\nme: yo");
    }

    #[tokio::test]
    async fn test_summarizer_sends_transcript() {
        let provider = CannedProvider::new("  They planned a trip.  ");
        let summarizer = LlmSummarizer::new(provider.clone());
        let out = summarizer
            .summarize(&[entry("user", "goa next week?")])
            .await
            .unwrap();
        assert_eq!(out.as_deref(), Some("They planned a trip."));

        let seen = provider.seen.lock().unwrap().clone().unwrap();
        assert!(seen.current_message.contains("them: goa next week?"));
        assert_eq!(seen.generation.max_output_tokens, 200);
    }

    #[tokio::test]
    async fn test_summarizer_empty_inputs() {
        let summarizer = LlmSummarizer::new(CannedProvider::new(""));
        assert!(summarizer.summarize(&[]).await.unwrap().is_none());
        assert!(summarizer
            .summarize(&[entry("user", "hi")])
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_translator_strips_quotes() {
        let provider = CannedProvider::new("\"Bonjour\"");
        let translator = LlmTranslator::new(provider.clone());
        let out = translator
            .lookup(&LlmTranslator::request("hello", "French"), false)
            .await
            .unwrap();
        assert_eq!(out.as_deref(), Some("Bonjour"));
        let seen = provider.seen.lock().unwrap().clone().unwrap();
        assert_eq!(seen.current_message, "Translate to French: hello");
    }
}
