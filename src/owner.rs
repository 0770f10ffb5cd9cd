//! Owner control state: per-chat takeover and the auto-reply mode.
//!
//! All methods take an explicit `now` in epoch milliseconds so the gating
//! decisions are a pure function of the observed event times.

use std::collections::{HashMap, HashSet};
use std::fmt;

/// Reply used in away/busy mode when no canned message was set.
pub const DEFAULT_AWAY_REPLY: &str = "hey! I'm away right now, will get back to you soon.";

/// Per-chat silencing after the owner speaks, plus manual pauses.
#[derive(Debug)]
pub struct Takeover {
    last_owner_activity: HashMap<String, i64>,
    paused: HashSet<String>,
    window_ms: i64,
    gc_ms: i64,
}

impl Takeover {
    pub fn new(window_secs: u64, gc_secs: u64) -> Self {
        Self {
            last_owner_activity: HashMap::new(),
            paused: HashSet::new(),
            window_ms: window_secs as i64 * 1000,
            gc_ms: gc_secs as i64 * 1000,
        }
    }

    /// The owner spoke on this chat.
    pub fn observe(&mut self, chat: &str, now: i64) {
        self.last_owner_activity.insert(chat.to_string(), now);
    }

    /// Milliseconds of silence left on this chat, if any.
    pub fn remaining_ms(&self, chat: &str, now: i64) -> Option<i64> {
        let last = self.last_owner_activity.get(chat)?;
        let remaining = self.window_ms - (now - last);
        (remaining > 0).then_some(remaining)
    }

    pub fn pause(&mut self, chat: &str) {
        self.paused.insert(chat.to_string());
    }

    /// Clear both the manual pause and any live takeover window.
    pub fn resume(&mut self, chat: &str) {
        self.paused.remove(chat);
        self.last_owner_activity.remove(chat);
    }

    pub fn is_paused(&self, chat: &str) -> bool {
        self.paused.contains(chat)
    }

    /// Whether normal replies on this chat are suppressed.
    pub fn is_silenced(&self, chat: &str, now: i64) -> bool {
        self.is_paused(chat) || self.remaining_ms(chat, now).is_some()
    }

    /// Drop records idle longer than the GC horizon. Returns how many went.
    pub fn gc(&mut self, now: i64) -> usize {
        let before = self.last_owner_activity.len();
        let horizon = self.gc_ms.max(self.window_ms);
        self.last_owner_activity
            .retain(|_, last| now - *last < horizon);
        before - self.last_owner_activity.len()
    }

    /// Chats currently silenced (live window or paused).
    pub fn active_count(&self, now: i64) -> usize {
        let live = self
            .last_owner_activity
            .keys()
            .filter(|chat| self.remaining_ms(chat, now).is_some() && !self.paused.contains(*chat))
            .count();
        live + self.paused.len()
    }
}

/// Process-wide auto-reply mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Online,
    Away,
    Dnd,
    Busy,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Dnd => "dnd",
            Self::Busy => "busy",
        };
        f.write_str(s)
    }
}

/// What the auto-reply gate decided for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutoDecision {
    /// Mode is online; continue the pipeline.
    Pass,
    /// Halt without replying.
    Silent,
    /// Send this text and halt.
    Canned(String),
}

#[derive(Debug)]
pub struct AutoReply {
    mode: Mode,
    canned: Option<String>,
    busy_until: Option<i64>,
    notified: HashSet<String>,
}

impl Default for AutoReply {
    fn default() -> Self {
        Self {
            mode: Mode::Online,
            canned: None,
            busy_until: None,
            notified: HashSet::new(),
        }
    }
}

impl AutoReply {
    /// Current mode; an expired busy window reverts to online.
    pub fn mode(&mut self, now: i64) -> Mode {
        if self.mode == Mode::Busy && self.busy_until.is_some_and(|until| now >= until) {
            self.set_mode(Mode::Online, None);
        }
        self.mode
    }

    pub fn busy_until(&self) -> Option<i64> {
        self.busy_until
    }

    pub fn canned(&self) -> Option<&str> {
        self.canned.as_deref()
    }

    /// Switch mode. Every activation starts a fresh notified-sender set.
    pub fn set_mode(&mut self, mode: Mode, busy_until: Option<i64>) {
        self.mode = mode;
        self.busy_until = if mode == Mode::Busy { busy_until } else { None };
        self.notified.clear();
    }

    /// Set the canned message without changing the mode.
    pub fn set_canned(&mut self, message: &str) {
        let message = message.trim();
        self.canned = (!message.is_empty()).then(|| message.to_string());
    }

    /// Gate an inbound message from `sender`.
    pub fn decide(&mut self, sender: &str, now: i64) -> AutoDecision {
        match self.mode(now) {
            Mode::Online => AutoDecision::Pass,
            Mode::Dnd => AutoDecision::Silent,
            Mode::Away | Mode::Busy => {
                if !self.notified.insert(sender.to_string()) {
                    return AutoDecision::Silent;
                }
                let text = self.canned.as_deref().unwrap_or(DEFAULT_AWAY_REPLY);
                AutoDecision::Canned(text.to_string())
            }
        }
    }
}

/// Parse a busy duration: `2h`, `30m`, `1h30m`, or bare minutes like `90`.
pub fn parse_duration_ms(input: &str) -> Option<i64> {
    let s = input.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    if let Ok(minutes) = s.parse::<i64>() {
        return minutes.checked_mul(60_000).filter(|ms| *ms > 0);
    }

    let (hours, rest) = match s.split_once('h') {
        Some((h, rest)) => (h.parse::<i64>().ok()?, rest),
        None => (0, s.as_str()),
    };
    let minutes = match rest {
        "" => 0,
        m => m.strip_suffix('m')?.parse::<i64>().ok()?,
    };

    hours
        .checked_mul(60)
        .and_then(|h| h.checked_add(minutes))
        .and_then(|total| total.checked_mul(60_000))
        .filter(|ms| *ms > 0)
}
