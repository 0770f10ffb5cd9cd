use crate::{
    context::{Context, ContextEntry},
    error::DoppelError,
    message::{Envelope, OutgoingMessage},
};
use async_trait::async_trait;

/// LLM provider trait: the brain.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Human-readable provider name.
    fn name(&self) -> &str;

    /// Send a conversation context to the provider and get a completion.
    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, DoppelError>;

    /// Check if the provider is available and ready.
    async fn is_available(&self) -> bool;
}

/// Typing-presence states shown to the contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Composing,
    Paused,
}

/// Messaging channel trait: the transport collaborator.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening. Returns a receiver yielding envelopes in arrival order.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<Envelope>, DoppelError>;

    /// Send a text message.
    async fn send(&self, message: OutgoingMessage) -> Result<(), DoppelError>;

    /// Send an image with a caption.
    async fn send_image(
        &self,
        _target: &str,
        _image: &[u8],
        _caption: &str,
    ) -> Result<(), DoppelError> {
        Ok(())
    }

    /// Send an audio clip, optionally as a push-to-talk voice note.
    async fn send_audio(
        &self,
        _target: &str,
        _audio: &[u8],
        _mime: &str,
        _push_to_talk: bool,
    ) -> Result<(), DoppelError> {
        Ok(())
    }

    /// Update the typing indicator for a chat.
    async fn set_presence(&self, _target: &str, _presence: Presence) -> Result<(), DoppelError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), DoppelError>;
}

/// A text-in, findings-out collaborator (search, video, link preview, translation).
///
/// `Ok(None)` means "no usable result, fall through".
#[async_trait]
pub trait Lookup: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(&self, query: &str, is_group: bool) -> Result<Option<String>, DoppelError>;
}

/// Text-to-speech collaborator.
#[async_trait]
pub trait Speech: Send + Sync {
    fn name(&self) -> &str;

    /// Largest chunk of text the provider accepts in one request.
    fn chunk_budget(&self) -> usize;

    /// Synthesize one chunk of text. `language` is an ISO code like `hi` or `en`.
    async fn synthesize(&self, chunk: &str, language: &str, slow: bool)
        -> Result<Vec<u8>, DoppelError>;
}

/// Summarization collaborator used for conversation recaps.
#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Compress the given turns (oldest first) into a short recap.
    async fn summarize(&self, turns: &[ContextEntry]) -> Result<Option<String>, DoppelError>;
}
