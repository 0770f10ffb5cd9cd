//! Owner commands: instant responses and mode switches, no provider call.

mod modes;
mod status;


use crate::analytics::Analytics;
use crate::owner::{AutoReply, Takeover};
use doppel_memory::Store;
use std::sync::Mutex;
use std::time::Instant;

/// Grouped context for command execution.
pub struct CommandContext<'a> {
    pub store: &'a Store,
    /// Chat the command applies to (pause/resume).
    pub chat: &'a str,
    pub text: &'a str,
    /// Event time in epoch milliseconds.
    pub now: i64,
    pub uptime: &'a Instant,
    pub provider_name: &'a str,
    pub utc_offset_minutes: i32,
    pub takeover: &'a Mutex<Takeover>,
    pub auto_reply: &'a Mutex<AutoReply>,
    pub analytics: &'a Mutex<Analytics>,
}

impl CommandContext<'_> {
    /// Everything after the command token.
    fn args(&self) -> &str {
        self.text
            .trim()
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest.trim())
            .unwrap_or("")
    }
}

/// Known owner commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    Stats,
    Digest,
    Help,
    Away,
    Dnd,
    Busy,
    Auto,
    Online,
    Status,
}

impl Command {
    /// Parse a command from message text. Returns `None` for unknown `/` prefixes
    /// (which pass through as normal text).
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        // Strip @suffix (e.g. "/help@doppel" → "/help").
        let cmd = first.split('@').next().unwrap_or(first).to_lowercase();
        match cmd.as_str() {
            "/pause" => Some(Self::Pause),
            "/resume" => Some(Self::Resume),
            "/stats" => Some(Self::Stats),
            "/digest" => Some(Self::Digest),
            "/help" => Some(Self::Help),
            "/away" => Some(Self::Away),
            "/dnd" => Some(Self::Dnd),
            "/busy" => Some(Self::Busy),
            "/auto" => Some(Self::Auto),
            "/online" => Some(Self::Online),
            "/status" => Some(Self::Status),
            _ => None,
        }
    }
}

/// Handle a command and return the response text.
pub async fn handle(cmd: Command, ctx: &CommandContext<'_>) -> String {
    match cmd {
        Command::Pause => modes::handle_pause(ctx),
        Command::Resume => modes::handle_resume(ctx),
        Command::Away => modes::handle_away(ctx),
        Command::Dnd => modes::handle_dnd(ctx),
        Command::Busy => modes::handle_busy(ctx),
        Command::Auto => modes::handle_auto(ctx),
        Command::Online => modes::handle_online(ctx),
        Command::Stats => status::handle_stats(ctx),
        Command::Digest => status::handle_digest(ctx).await,
        Command::Status => status::handle_status(ctx).await,
        Command::Help => status::handle_help(),
    }
}
