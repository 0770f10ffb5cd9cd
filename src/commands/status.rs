//! Information commands: /status, /stats, /digest, /help.

use super::CommandContext;
use crate::gateway::locked;
use crate::owner::Mode;
use tracing::warn;

const DAY_MS: i64 = 24 * 3600 * 1000;

pub(super) async fn handle_status(ctx: &CommandContext<'_>) -> String {
    let elapsed = ctx.uptime.elapsed();
    let hours = elapsed.as_secs() / 3600;
    let minutes = (elapsed.as_secs() % 3600) / 60;

    let mode_line = {
        let mut auto = locked(ctx.auto_reply);
        match (auto.mode(ctx.now), auto.busy_until()) {
            (Mode::Busy, Some(until)) => {
                format!("busy ({} min left)", (until - ctx.now).max(0) / 60_000)
            }
            (mode, _) => mode.to_string(),
        }
    };
    let silenced = locked(ctx.takeover).active_count(ctx.now);

    let memory = match ctx.store.stats(ctx.now - DAY_MS).await {
        Ok(s) => format!(
            "{} contacts, {} turns ({} today), db {}",
            s.contacts,
            s.turns,
            s.turns_today,
            format_bytes(s.db_size)
        ),
        Err(e) => {
            warn!("status: stats failed: {e}");
            "unavailable".to_string()
        }
    };

    format!(
        "status\n\
         mode: {mode_line}\n\
         silenced chats: {silenced}\n\
         uptime: {hours}h {minutes}m\n\
         provider: {}\n\
         memory: {memory}",
        ctx.provider_name
    )
}

pub(super) fn handle_stats(ctx: &CommandContext<'_>) -> String {
    let snap = locked(ctx.analytics).snapshot();
    if snap.total == 0 {
        return "no messages handled yet".to_string();
    }

    let list = |items: Vec<(String, u64)>| {
        items
            .iter()
            .map(|(k, n)| format!("{k} {n}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut out = format!(
        "stats\nmessages: {} from {} people",
        snap.total,
        snap.per_sender.len()
    );
    if let Some(avg) = snap.avg_response_ms {
        out.push_str(&format!("\navg response: {avg} ms"));
    }
    if let Some(hour) = snap.peak_hour() {
        out.push_str(&format!("\npeak hour today: {hour:02}:00"));
    }
    out.push_str(&format!("\nintents: {}", list(snap.top_intents(5))));
    out.push_str(&format!("\nhandlers: {}", list(snap.top_handlers(5))));
    out
}

pub(super) async fn handle_digest(ctx: &CommandContext<'_>) -> String {
    match ctx.store.digest(ctx.now - DAY_MS, 10).await {
        Ok(rows) if rows.is_empty() => "nobody texted in the last 24h".to_string(),
        Ok(rows) => {
            let lines: Vec<String> = rows
                .iter()
                .map(|(id, name, n)| match name {
                    Some(name) => format!("- {name} ({id}): {n}"),
                    None => format!("- {id}: {n}"),
                })
                .collect();
            format!("last 24h\n{}", lines.join("\n"))
        }
        Err(e) => {
            warn!("digest failed: {e}");
            "digest unavailable right now".to_string()
        }
    }
}

pub(super) fn handle_help() -> String {
    [
        "commands",
        "/pause, /resume: stop or restart replies in this chat",
        "/away [msg]: auto-reply once per person",
        "/busy 2h: like away, expires on its own",
        "/dnd: stay completely quiet",
        "/auto <msg>: set the auto-reply text",
        "/online: back to normal",
        "/status, /stats, /digest, /help",
    ]
    .join("\n")
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
