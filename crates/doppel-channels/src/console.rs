//! Local console channel: stdin lines in, stdout out.
//!
//! Line prefixes simulate transport events that a phone would produce:
//! - `!owner <text>`: the account owner replied on the console chat
//! - `!group <text>`: a group message (plain, no mention metadata)
//! - `!mention <text>`: a group message that mentions the bot id

use async_trait::async_trait;
use doppel_core::{
    config::ConsoleConfig,
    error::DoppelError,
    message::{Envelope, OutgoingMessage},
    traits::{Channel, Presence},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Chat id used for simulated group messages.
const GROUP_CHAT: &str = "console-group";

pub struct ConsoleChannel {
    sender_id: String,
    bot_id: String,
}

impl ConsoleChannel {
    pub fn new(config: &ConsoleConfig, bot_id: &str) -> Self {
        Self {
            sender_id: config.sender_id.clone(),
            bot_id: bot_id.to_string(),
        }
    }

    /// Turn one typed line into an envelope. Blank lines yield nothing.
    pub fn parse_line(&self, line: &str) -> Option<Envelope> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (prefix, rest) = match line.split_once(' ') {
            Some((p, r)) if p.starts_with('!') => (p, r.trim()),
            _ if line.starts_with('!') => (line, ""),
            _ => ("", line),
        };

        let mut env = Envelope::text("console", &self.sender_id, rest);
        env.sender_name = Some("you".to_string());
        match prefix {
            "" => {}
            "!owner" => env.from_owner = true,
            "!group" => {
                env.is_group = true;
                env.reply_target = Some(GROUP_CHAT.to_string());
            }
            "!mention" => {
                env.is_group = true;
                env.reply_target = Some(GROUP_CHAT.to_string());
                env.mentioned_ids.push(self.bot_id.clone());
            }
            other => {
                warn!("console: unknown prefix {other}, sending as plain text");
                env.text = line.to_string();
            }
        }

        env.has_content().then_some(env)
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    fn name(&self) -> &str {
        "console"
    }

    async fn start(&self) -> Result<mpsc::Receiver<Envelope>, DoppelError> {
        let (tx, rx) = mpsc::channel(64);
        let parser = ConsoleChannel {
            sender_id: self.sender_id.clone(),
            bot_id: self.bot_id.clone(),
        };

        info!("Console channel reading from stdin as {}", self.sender_id);

        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(env) = parser.parse_line(&line) else {
                            continue;
                        };
                        if tx.send(env).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        info!("console: stdin closed");
                        break;
                    }
                    Err(e) => {
                        warn!("console: read error: {e}");
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), DoppelError> {
        let target = message.reply_target.as_deref().unwrap_or("?");
        println!("[{target}] {}", message.text);
        Ok(())
    }

    async fn send_image(
        &self,
        target: &str,
        image: &[u8],
        caption: &str,
    ) -> Result<(), DoppelError> {
        println!("[{target}] <image {} bytes> {caption}", image.len());
        Ok(())
    }

    async fn send_audio(
        &self,
        target: &str,
        audio: &[u8],
        mime: &str,
        push_to_talk: bool,
    ) -> Result<(), DoppelError> {
        let kind = if push_to_talk { "voice note" } else { "audio" };
        println!("[{target}] <{kind} {} bytes, {mime}>", audio.len());
        Ok(())
    }

    async fn set_presence(&self, target: &str, presence: Presence) -> Result<(), DoppelError> {
        debug!("console: {target} presence {presence:?}");
        if presence == Presence::Composing {
            println!("[{target}] typing…");
        }
        Ok(())
    }

    async fn stop(&self) -> Result<(), DoppelError> {
        info!("Console channel stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel() -> ConsoleChannel {
        ConsoleChannel::new(&ConsoleConfig::default(), "bot")
    }

    #[test]
    fn test_parse_plain_line() {
        let env = channel().parse_line("  yo what's up ").unwrap();
        assert_eq!(env.text, "yo what's up");
        assert_eq!(env.sender_id, "console-user");
        assert_eq!(env.channel, "console");
        assert!(!env.is_group);
        assert!(!env.from_owner);
        assert_eq!(env.reply_target.as_deref(), Some("console-user"));
    }

    #[test]
    fn test_parse_blank_line() {
        assert!(channel().parse_line("   ").is_none());
        assert!(channel().parse_line("!group").is_none());
    }

    #[test]
    fn test_parse_owner_line() {
        let env = channel().parse_line("!owner I'll handle this").unwrap();
        assert!(env.from_owner);
        assert_eq!(env.text, "I'll handle this");
    }

    #[test]
    fn test_parse_group_lines() {
        let env = channel().parse_line("!group anyone up for coffee?").unwrap();
        assert!(env.is_group);
        assert!(env.mentioned_ids.is_empty());
        assert_eq!(env.chat_key(), GROUP_CHAT);

        let env = channel().parse_line("!mention what's the plan").unwrap();
        assert_eq!(env.mentioned_ids, vec!["bot".to_string()]);
    }

    #[test]
    fn test_parse_unknown_prefix_keeps_text() {
        let env = channel().parse_line("!wat hello").unwrap();
        assert_eq!(env.text, "!wat hello");
    }
}
