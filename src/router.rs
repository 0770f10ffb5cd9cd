//! Handler selection from annotations and explicit lexical triggers.

use crate::handlers::HandlerKind;
use doppel_core::annotation::{Annotations, Intent};
use regex::Regex;
use std::sync::LazyLock;

/// Languages the translation trigger recognizes.
pub const LANGUAGES: &[&str] = &[
    "hindi", "english", "french", "spanish", "german", "italian", "portuguese", "russian",
    "japanese", "korean", "chinese", "arabic", "urdu", "marathi", "gujarati", "tamil", "telugu",
    "kannada", "malayalam", "bengali", "punjabi",
];

/// (handler, patterns) in routing order, checked after spam.
const LEXICON: &[(HandlerKind, &[&str])] = &[
    (HandlerKind::Todo, &[r"\b(todo|todos|to-do|to-dos)\b"]),
    (HandlerKind::Reminder, &[r"\bremind me\b", r"\breminders?\b"]),
    (
        HandlerKind::Translate,
        &[
            r"\btranslate\b",
            r"\b(in|into) ({langs})\s*[?.!]*\s*$",
            r"\bko ({langs}) (mein|me)\b",
        ],
    ),
    (
        HandlerKind::Summarize,
        &[r"\b(summari[sz]e|summary|tl;?dr|recap)\b"],
    ),
    (
        HandlerKind::Youtube,
        &[r"\b(youtube|yt|videos?)\b", r"\brecommend\b"],
    ),
    (HandlerKind::Link, &[r"https?://\S+"]),
    (
        HandlerKind::Search,
        &[r"^\s*(search|google)\b", r"\b(search for|look up|google (it|this|for))\b"],
    ),
];

static RULES: LazyLock<Vec<(HandlerKind, Vec<Regex>)>> = LazyLock::new(|| {
    let langs = LANGUAGES.join("|");
    LEXICON
        .iter()
        .map(|(kind, patterns)| {
            let compiled = patterns
                .iter()
                .map(|p| {
                    let p = p.replace("{langs}", &langs);
                    Regex::new(&format!("(?i){p}")).unwrap()
                })
                .collect();
            (*kind, compiled)
        })
        .collect()
});

/// Choose the handler for a message. Pure and deterministic.
pub fn route(annotations: &Annotations, text: &str) -> HandlerKind {
    if annotations.intent == Intent::Spam {
        return HandlerKind::Social;
    }

    for (kind, patterns) in RULES.iter() {
        if patterns.iter().any(|re| re.is_match(text)) {
            return *kind;
        }
    }

    match annotations.intent {
        Intent::Birthday | Intent::Festival => HandlerKind::Social,
        Intent::AboutInquiry
        | Intent::WorkInquiry
        | Intent::TechInquiry
        | Intent::ContactInquiry => HandlerKind::Knowledge,
        _ => HandlerKind::Chat,
    }
}
