//! Takeover and auto-reply mode commands: /pause, /resume, /away, /dnd,
//! /busy, /auto, /online.

use super::CommandContext;
use crate::gateway::locked;
use crate::owner::{parse_duration_ms, Mode};
use tracing::info;

pub(super) fn handle_pause(ctx: &CommandContext<'_>) -> String {
    locked(ctx.takeover).pause(ctx.chat);
    info!("takeover: paused {}", ctx.chat);
    "paused here. /resume when you want me back".to_string()
}

pub(super) fn handle_resume(ctx: &CommandContext<'_>) -> String {
    locked(ctx.takeover).resume(ctx.chat);
    info!("takeover: resumed {}", ctx.chat);
    "back on it".to_string()
}

pub(super) fn handle_away(ctx: &CommandContext<'_>) -> String {
    let mut auto = locked(ctx.auto_reply);
    let msg = ctx.args();
    if !msg.is_empty() {
        auto.set_canned(msg);
    }
    auto.set_mode(Mode::Away, None);
    info!("auto-reply: away");
    match auto.canned() {
        Some(m) => format!("away mode on. replying with: {m}"),
        None => "away mode on. replying with the default message".to_string(),
    }
}

pub(super) fn handle_dnd(ctx: &CommandContext<'_>) -> String {
    locked(ctx.auto_reply).set_mode(Mode::Dnd, None);
    info!("auto-reply: dnd");
    "do not disturb on. staying quiet".to_string()
}

pub(super) fn handle_busy(ctx: &CommandContext<'_>) -> String {
    let usage = "usage: /busy 2h | 30m | 1h30m | 90 (minutes)";
    let Some(duration) = parse_duration_ms(ctx.args()) else {
        return usage.to_string();
    };
    let Some(until) = ctx.now.checked_add(duration) else {
        return usage.to_string();
    };
    locked(ctx.auto_reply).set_mode(Mode::Busy, Some(until));
    info!("auto-reply: busy for {} min", duration / 60_000);
    format!("busy for {} min", duration / 60_000)
}

pub(super) fn handle_auto(ctx: &CommandContext<'_>) -> String {
    let msg = ctx.args();
    if msg.is_empty() {
        return "usage: /auto <message>".to_string();
    }
    let mut auto = locked(ctx.auto_reply);
    auto.set_canned(msg);
    format!("auto-reply set ({} mode kept)", auto.mode(ctx.now))
}

pub(super) fn handle_online(ctx: &CommandContext<'_>) -> String {
    locked(ctx.auto_reply).set_mode(Mode::Online, None);
    info!("auto-reply: online");
    "online. replying normally".to_string()
}
