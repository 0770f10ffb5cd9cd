//! Humanizer and delivery planner: make a reply read like a person typed it
//! and schedule its parts with realistic typing delays.

use doppel_core::config::GatewayConfig;
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

/// Floor for the first part's delay, after subtracting handler time.
pub const MIN_DELAY_MS: u64 = 600;
/// Floor for follow-up parts.
pub const MIN_FOLLOWUP_DELAY_MS: u64 = 800;

static ROBOTIC_OPENER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^\s*(certainly|absolutely|of course|sure thing|great question|what a great question|i'?d be (happy|glad) to( help)?|thank you for (asking|reaching out))\s*[!,.:\-]*\s*",
    )
    .unwrap()
});
static EXCLAIM_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!{2,}").unwrap());
static PART_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*-{3,}\s*$|\n[ \t]*\n[ \t]*\n").unwrap());

/// Binary attachment carried alongside the first part.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub mime: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedPart {
    pub text: String,
    pub delay_ms: u64,
}

/// Ordered parts with their typing delays, plus optional media for part 0.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeliveryPlan {
    pub parts: Vec<PlannedPart>,
    pub image: Option<Attachment>,
    pub audio: Option<Attachment>,
}

impl DeliveryPlan {
    /// All part texts joined, as recorded in memory.
    pub fn full_text(&self) -> String {
        self.parts
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Facts about the reply that shape its delays.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlanContext {
    pub is_group: bool,
    pub quick_intent: bool,
    pub late_night: bool,
    /// Wall time already spent producing the reply.
    pub handler_elapsed_ms: u64,
}

pub struct Humanizer {
    max_group_reply: usize,
    typing_base_ms: u64,
    typing_per_char: u64,
    typing_max_ms: u64,
}

impl Humanizer {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            max_group_reply: config.max_group_reply.max(2),
            typing_base_ms: config.typing_base_ms,
            typing_per_char: config.typing_per_char,
            typing_max_ms: config.typing_max_ms.max(MIN_DELAY_MS),
        }
    }

    /// Rewrite the text: drop robotic openers, calm down late at night,
    /// and keep group replies short.
    pub fn humanize(
        &self,
        text: &str,
        is_group: bool,
        late_night: bool,
        rng: &mut impl Rng,
    ) -> String {
        let mut out = trim_robotic_opener(text);

        if late_night {
            out = EXCLAIM_RUN.replace_all(&out, "!").into_owned();
            if out.ends_with('!') && rng.gen_bool(0.5) {
                out.pop();
                out.push('.');
            }
        }

        if is_group {
            out = truncate_reply(&out, self.max_group_reply);
        }
        out
    }

    /// Typing delay for a text of `chars` characters, before elapsed-time
    /// correction.
    fn base_delay(&self, chars: usize, ctx: &PlanContext, rng: &mut impl Rng) -> u64 {
        let raw = self.typing_base_ms + chars as u64 * self.typing_per_char / 10;
        let mut delay = raw.clamp(MIN_DELAY_MS, self.typing_max_ms) as f64;
        if ctx.is_group {
            delay *= 0.6;
        }
        if ctx.quick_intent {
            delay *= 0.5;
        }
        if ctx.late_night {
            delay *= 1.3;
        }
        delay *= rng.gen_range(0.8..=1.2);
        (delay.round() as u64).min(self.typing_max_ms)
    }

    /// Humanize, split, and schedule a reply.
    pub fn plan(&self, text: &str, ctx: PlanContext, rng: &mut impl Rng) -> DeliveryPlan {
        let text = self.humanize(text, ctx.is_group, ctx.late_night, rng);
        let parts = split_parts(&text);

        let planned = parts
            .into_iter()
            .enumerate()
            .map(|(i, part)| {
                let delay = self.base_delay(part.chars().count(), &ctx, rng);
                let delay_ms = if i == 0 {
                    delay.saturating_sub(ctx.handler_elapsed_ms).max(MIN_DELAY_MS)
                } else {
                    (delay / 2).max(MIN_FOLLOWUP_DELAY_MS)
                };
                PlannedPart {
                    text: part,
                    delay_ms,
                }
            })
            .collect();

        DeliveryPlan {
            parts: planned,
            image: None,
            audio: None,
        }
    }
}

/// Drop an assistant-style opener. Keeps the original if nothing would remain.
pub fn trim_robotic_opener(text: &str) -> String {
    let trimmed = ROBOTIC_OPENER.replace(text, "");
    if trimmed.trim().is_empty() {
        text.trim().to_string()
    } else {
        trimmed.trim().to_string()
    }
}

/// Cut to `max` characters, preferring the last sentence end inside the limit.
pub fn truncate_reply(text: &str, max: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= max {
        return text.to_string();
    }

    let window = &chars[..max];
    if let Some(end) = window
        .iter()
        .rposition(|c| matches!(c, '.' | '!' | '?' | '\n'))
        .filter(|&i| i > 0)
    {
        return window[..=end].iter().collect::<String>().trim().to_string();
    }

    let mut cut: String = chars[..max - 1].iter().collect();
    cut = cut.trim_end().to_string();
    cut.push('…');
    cut
}

/// Split a reply into separately delivered parts on `---` lines or
/// double blank lines.
pub fn split_parts(text: &str) -> Vec<String> {
    let parts: Vec<String> = PART_BREAK
        .split(text)
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        vec![text.trim().to_string()]
    } else {
        parts
    }
}
