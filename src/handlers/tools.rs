//! Personal tools: per-contact todo list and reminders.

use super::{Bundle, HandlerKind, HandlerResult, Handlers};
use crate::clock::local_time;
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use doppel_core::error::DoppelError;
use regex::Regex;
use std::sync::LazyLock;
use tracing::info;

/// A parsed todo request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoOp {
    Add(String),
    List,
    Done(usize),
    Delete(usize),
    Progress,
}

static TODO_ADD_TO_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*add\s+(.+?)\s+to\s+(?:my\s+)?(?:todo|to-do)s?(?:\s+list)?\s*$").unwrap()
});
static TODO_ADD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:my\s+)?(?:todo|to-do)s?\s+add|add\s+(?:to\s+)?(?:my\s+)?(?:todo|to-do)s?)\s*:?\s+(.+)$")
        .unwrap()
});
static TODO_DONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:done|complete|completed|finish|finished|tick)\s+#?(\d+)\b").unwrap()
});
static TODO_DELETE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:delete|remove|del)\s+#?(\d+)\b").unwrap());
static TODO_PROGRESS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bprogress\b").unwrap());
static TODO_LIST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:show|list|view|see|what'?s on)\b").unwrap());
static TODO_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:my\s+)?(?:todo|to-do)s?(?:\s+list)?\s*:?\s*").unwrap()
});

/// Parse a todo request. Anything that isn't a recognized verb is an add.
pub fn parse_todo(text: &str) -> TodoOp {
    if let Some(c) = TODO_ADD_TO_LIST.captures(text).or_else(|| TODO_ADD.captures(text)) {
        return TodoOp::Add(c[1].trim().to_string());
    }
    let number = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c[1].parse::<usize>().ok())
    };
    if let Some(n) = number(&TODO_DONE) {
        return TodoOp::Done(n);
    }
    if let Some(n) = number(&TODO_DELETE) {
        return TodoOp::Delete(n);
    }
    if TODO_PROGRESS.is_match(text) {
        return TodoOp::Progress;
    }
    if TODO_LIST.is_match(text) {
        return TodoOp::List;
    }
    let rest = TODO_PREFIX.replace(text, "");
    let rest = rest.trim();
    if rest.is_empty() {
        TodoOp::List
    } else {
        TodoOp::Add(rest.to_string())
    }
}

pub(super) async fn todo(h: &Handlers, bundle: &Bundle) -> Result<HandlerResult, DoppelError> {
    let who = bundle.sender_id.as_str();
    let reply = match parse_todo(&bundle.text) {
        TodoOp::Add(item) => {
            let pos = h.store.add_todo(who, &item).await?;
            format!("added to your list (#{pos}): {item}")
        }
        TodoOp::List => {
            let items = h.store.list_todos(who).await?;
            if items.is_empty() {
                "your list is empty".to_string()
            } else {
                let lines: Vec<String> = items
                    .iter()
                    .enumerate()
                    .map(|(i, t)| {
                        let mark = if t.done { "x" } else { " " };
                        format!("{}. [{mark}] {}", i + 1, t.text)
                    })
                    .collect();
                format!("your list:\n{}", lines.join("\n"))
            }
        }
        TodoOp::Done(n) => match h.store.complete_todo(who, n).await? {
            Some(item) => format!("nice, ticked off #{n}: {}", item.text),
            None => format!("there's no #{n} on your list"),
        },
        TodoOp::Delete(n) => match h.store.delete_todo(who, n).await? {
            Some(item) => format!("removed #{n}: {}", item.text),
            None => format!("there's no #{n} on your list"),
        },
        TodoOp::Progress => {
            let items = h.store.list_todos(who).await?;
            let done = items.iter().filter(|t| t.done).count();
            if items.is_empty() {
                "nothing on your list yet".to_string()
            } else {
                format!(
                    "{done}/{} done ({}%)",
                    items.len(),
                    done * 100 / items.len()
                )
            }
        }
    };
    Ok(HandlerResult::text(HandlerKind::Todo, reply))
}

/// A parsed reminder request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReminderOp {
    Create { text: String, due_at: i64 },
    List,
    Cancel(usize),
    Unclear,
}

static REMIND_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)remind me\s+(?:to\s+|about\s+)?(.+?)\s+in\s+(\d+)\s*(seconds?|secs?|s|minutes?|mins?|m|hours?|hrs?|h|days?|d)\b",
    )
    .unwrap()
});
static REMIND_AT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)remind me\s+(?:to\s+|about\s+)?(.+?)\s+at\s+(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\s*$",
    )
    .unwrap()
});
static REMIND_CANCEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcancel\s+reminder\s+#?(\d+)").unwrap());
static REMIND_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:(?:list|show|see|my)\s+(?:my\s+)?)?reminders\s*[?.!]*\s*$").unwrap()
});

/// Furthest ahead a relative reminder may be set: one year.
const MAX_REMINDER_AHEAD_MS: i64 = 366 * 86_400_000;

fn unit_ms(unit: &str) -> i64 {
    match unit.to_lowercase().chars().next() {
        Some('s') => 1000,
        Some('h') => 3_600_000,
        Some('d') => 86_400_000,
        _ => 60_000,
    }
}

/// Parse a reminder request relative to `now`, in the persona's timezone.
pub fn parse_reminder(text: &str, now: DateTime<Utc>, utc_offset_minutes: i32) -> ReminderOp {
    if let Some(c) = REMIND_CANCEL.captures(text) {
        if let Ok(n) = c[1].parse() {
            return ReminderOp::Cancel(n);
        }
    }
    if REMIND_LIST.is_match(text) {
        return ReminderOp::List;
    }

    if let Some(c) = REMIND_IN.captures(text) {
        let due_at = c[2]
            .parse::<i64>()
            .ok()
            .and_then(|amount| amount.checked_mul(unit_ms(&c[3])))
            .filter(|ahead| *ahead <= MAX_REMINDER_AHEAD_MS)
            .and_then(|ahead| now.timestamp_millis().checked_add(ahead));
        let Some(due_at) = due_at else {
            return ReminderOp::Unclear;
        };
        return ReminderOp::Create {
            text: c[1].trim().to_string(),
            due_at,
        };
    }

    if let Some(c) = REMIND_AT.captures(text) {
        let mut hour: u32 = c[2].parse().unwrap_or(99);
        let minute: u32 = c.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        match c.get(4).map(|m| m.as_str().to_lowercase()).as_deref() {
            Some("pm") if hour < 12 => hour += 12,
            Some("am") if hour == 12 => hour = 0,
            _ => {}
        }
        let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) else {
            return ReminderOp::Unclear;
        };

        let local = local_time(now, utc_offset_minutes);
        let tz = *local.offset();
        let Some(mut due) = tz
            .from_local_datetime(&local.date_naive().and_time(time))
            .single()
        else {
            return ReminderOp::Unclear;
        };
        if due <= local {
            due += Duration::days(1);
        }
        return ReminderOp::Create {
            text: c[1].trim().to_string(),
            due_at: due.timestamp_millis(),
        };
    }

    ReminderOp::Unclear
}

fn format_due(due_at: i64, utc_offset_minutes: i32) -> String {
    match DateTime::<Utc>::from_timestamp_millis(due_at) {
        Some(t) => local_time(t, utc_offset_minutes)
            .format("%a %H:%M")
            .to_string(),
        None => "later".to_string(),
    }
}

pub(super) async fn reminder(
    h: &Handlers,
    bundle: &Bundle,
) -> Result<HandlerResult, DoppelError> {
    let offset = h.persona.utc_offset_minutes;
    let reply = match parse_reminder(&bundle.text, bundle.now, offset) {
        ReminderOp::Create { text, due_at } => {
            let id = h
                .store
                .create_reminder(
                    &bundle.channel,
                    &bundle.sender_id,
                    &bundle.chat_id,
                    &text,
                    due_at,
                )
                .await?;
            info!("reminder {id} set for {} at {due_at}", bundle.sender_id);
            format!("done, I'll remind you to {text} ({})", format_due(due_at, offset))
        }
        ReminderOp::List => {
            let pending = h.store.pending_reminders(&bundle.sender_id).await?;
            if pending.is_empty() {
                "no reminders pending".to_string()
            } else {
                let lines: Vec<String> = pending
                    .iter()
                    .enumerate()
                    .map(|(i, r)| format!("{}. {} ({})", i + 1, r.text, format_due(r.due_at, offset)))
                    .collect();
                format!("your reminders:\n{}", lines.join("\n"))
            }
        }
        ReminderOp::Cancel(n) => match h.store.cancel_reminder(&bundle.sender_id, n).await? {
            Some(r) => format!("cancelled: {}", r.text),
            None => format!("there's no reminder #{n}"),
        },
        ReminderOp::Unclear => {
            "tell me like: remind me to call mom in 20 minutes, or at 18:30".to_string()
        }
    };
    Ok(HandlerResult::text(HandlerKind::Reminder, reply))
}
