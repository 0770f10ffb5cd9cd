//! Rule-based message annotation: intent, emotion, language, and shape flags.
//!
//! The classifiers are driven entirely by the rule tables in `intent` and
//! `emotion`; changing behavior means editing a table, not the matcher.

mod emotion;
mod intent;


use doppel_core::annotation::{Annotations, Language};
use regex::Regex;
use std::sync::LazyLock;

pub use emotion::classify_emotion;
pub use intent::classify_intent;

static EMOJI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{1F300}-\x{1FAFF}\x{2600}-\x{27BF}\x{1F1E6}-\x{1F1FF}]").unwrap()
});

/// Whether the text contains at least one pictographic emoji.
pub fn has_emoji(text: &str) -> bool {
    EMOJI_RE.is_match(text)
}

/// Annotate one message. Total and deterministic.
pub fn annotate(text: &str) -> Annotations {
    let intent = classify_intent(text);
    let (emotion, intensity) = classify_emotion(text);
    let chars = text.chars().count();

    Annotations {
        intent: intent.intent,
        sub_intent: intent.sub_intent,
        confidence: intent.confidence,
        emotion,
        intensity,
        language: Language::detect(text),
        is_short: chars < 20,
        is_long: chars > 200,
        has_emoji: has_emoji(text),
    }
}
