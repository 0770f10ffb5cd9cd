use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An inbound unit delivered by a transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub id: Uuid,
    /// Channel name (e.g. "whatsapp", "instagram", "console").
    pub channel: String,
    /// Opaque platform-specific sender identifier.
    pub sender_id: String,
    /// Human-readable sender name.
    pub sender_name: Option<String>,
    pub phone: Option<String>,
    /// Whether this message comes from a group chat.
    #[serde(default)]
    pub is_group: bool,
    /// Platform-specific target for routing the response (chat id).
    #[serde(default)]
    pub reply_target: Option<String>,
    /// Message text content (possibly empty for image-only messages).
    pub text: String,
    #[serde(default)]
    pub image: Option<ImageData>,
    /// The message this one quotes, if any.
    #[serde(default)]
    pub quoted: Option<QuotedMessage>,
    /// Identifiers mentioned in the message (group context info).
    #[serde(default)]
    pub mentioned_ids: Vec<String>,
    /// True when this is an observation of the account owner's own outbound message.
    #[serde(default)]
    pub from_owner: bool,
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Build a plain direct-chat text envelope.
    pub fn text(channel: &str, sender_id: &str, text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: None,
            phone: None,
            is_group: false,
            reply_target: Some(sender_id.to_string()),
            text: text.to_string(),
            image: None,
            quoted: None,
            mentioned_ids: Vec::new(),
            from_owner: false,
            timestamp: Utc::now(),
        }
    }

    /// At least one of non-empty text or an image must be present.
    pub fn has_content(&self) -> bool {
        !self.text.trim().is_empty() || self.image.is_some()
    }

    /// Chat key used for per-chat state (owner takeover, typing).
    pub fn chat_key(&self) -> &str {
        self.reply_target.as_deref().unwrap_or(&self.sender_id)
    }
}

/// Raw image bytes with their detected MIME type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// A quoted-message reference carried through from the transport unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuotedMessage {
    pub text: String,
    /// Author of the quoted message, if the transport knows it.
    pub author_id: Option<String>,
}

/// Message payload as decoded by a transport, before text extraction.
///
/// Wrapper variants are listed exhaustively so text extraction never
/// depends on matching by example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Payload {
    Conversation(String),
    ExtendedText(String),
    ImageCaption(Option<String>),
    VideoCaption(Option<String>),
    DocumentCaption(Option<String>),
    Ephemeral(Box<Payload>),
    ViewOnce(Box<Payload>),
    ViewOnceV2(Box<Payload>),
    DeviceSent(Box<Payload>),
    DocumentWithCaption(Box<Payload>),
    Edited(Box<Payload>),
    /// Anything without a text body (stickers, reactions, calls).
    Unsupported,
}

impl Payload {
    /// Extract the text body, unwrapping nested wrappers.
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Conversation(t) | Self::ExtendedText(t) => Some(t.as_str()),
            Self::ImageCaption(c) | Self::VideoCaption(c) | Self::DocumentCaption(c) => {
                c.as_deref()
            }
            Self::Ephemeral(inner)
            | Self::ViewOnce(inner)
            | Self::ViewOnceV2(inner)
            | Self::DeviceSent(inner)
            | Self::DocumentWithCaption(inner)
            | Self::Edited(inner) => inner.text(),
            Self::Unsupported => None,
        }
    }

    /// Whether the innermost payload carries an image.
    pub fn is_image(&self) -> bool {
        match self {
            Self::ImageCaption(_) => true,
            Self::Ephemeral(inner)
            | Self::ViewOnce(inner)
            | Self::ViewOnceV2(inner)
            | Self::DeviceSent(inner)
            | Self::DocumentWithCaption(inner)
            | Self::Edited(inner) => inner.is_image(),
            _ => false,
        }
    }
}

/// An outgoing text message, or a provider completion on its way to becoming one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub text: String,
    pub metadata: MessageMetadata,
    /// Platform-specific target for routing (chat id).
    #[serde(default)]
    pub reply_target: Option<String>,
}

/// Metadata about how a message was generated.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MessageMetadata {
    /// Which provider produced this response.
    pub provider_used: String,
    /// Token count (if available from the provider).
    pub tokens_used: Option<u64>,
    /// Wall-clock processing time in milliseconds.
    pub processing_time_ms: u64,
    /// Model identifier (if applicable).
    pub model: Option<String>,
}
