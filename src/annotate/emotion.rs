//! Emotion scoring from weighted keyword and emoji tables.

use doppel_core::annotation::{Emotion, Intensity};
use regex::Regex;
use std::sync::LazyLock;

/// (emotion, weight, keywords, emojis). Emoji hits count at 0.8 × weight.
const EMOTION_RULES: &[(Emotion, f32, &[&str], &[&str])] = &[
    (
        Emotion::Happy,
        1.0,
        &[
            "happy", "glad", "great", "awesome", "yay", "love it", "amazing", "wonderful",
            "khush", "mast", "badhiya",
        ],
        &["😊", "😄", "😁", "🙂", "😃", "❤️"],
    ),
    (
        Emotion::Excited,
        1.2,
        &["excited", "can't wait", "cant wait", "omg", "wow", "let's go", "hyped", "pumped"],
        &["🤩", "🔥", "🎉", "🥳"],
    ),
    (
        Emotion::Sad,
        1.5,
        &[
            "sad", "upset", "depressed", "lonely", "miss", "crying", "cry", "hurt", "heartbroken",
            "dukhi", "udaas",
        ],
        &["😢", "😭", "💔", "😞"],
    ),
    (
        Emotion::Frustrated,
        1.3,
        &[
            "frustrated", "annoying", "annoyed", "irritated", "ugh", "fed up", "tired of",
            "not working", "pareshan",
        ],
        &["😤", "😩"],
    ),
    (
        Emotion::Angry,
        1.5,
        &["angry", "furious", "hate", "pissed", "mad at", "gussa", "wtf"],
        &["😡", "🤬", "😠"],
    ),
    (
        Emotion::Confused,
        1.0,
        &[
            "confused", "don't understand", "dont understand", "what do you mean", "samajh nahi",
            "huh",
        ],
        &["😕", "🤔", "❓"],
    ),
    (
        Emotion::Curious,
        0.8,
        &["curious", "wondering", "how does", "why does", "what if", "tell me more"],
        &["🧐"],
    ),
    (
        Emotion::Grateful,
        1.0,
        &["thanks", "thank you", "grateful", "appreciate", "shukriya", "dhanyavaad"],
        &["🙏"],
    ),
    (
        Emotion::Anxious,
        1.3,
        &[
            "anxious", "worried", "nervous", "scared", "stress", "stressed", "tension", "afraid",
            "panic",
        ],
        &["😰", "😟", "😬"],
    ),
    (
        Emotion::Sarcastic,
        1.0,
        &["yeah right", "sure buddy", "oh great", "as if", "wow thanks"],
        &["🙄", "😏"],
    ),
    (
        Emotion::Challenging,
        1.0,
        &["prove it", "bet you", "you can't", "are you a bot", "are you real", "fake"],
        &[],
    ),
];

/// Phrases that signal sadness regardless of keyword hits.
const SADNESS_TEMPLATES: &[&str] = &[
    r"\bi feel (so )?(alone|low|empty|lost)\b",
    r"\bnobody (cares|understands)\b",
    r"\bwhat'?s the point\b",
    r"\bi give up\b",
];

static KEYWORDS: LazyLock<Vec<Option<Regex>>> = LazyLock::new(|| {
    EMOTION_RULES
        .iter()
        .map(|(_, _, keywords, _)| {
            if keywords.is_empty() {
                return None;
            }
            let alternation = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            Some(Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).unwrap())
        })
        .collect()
});

static SADNESS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    SADNESS_TEMPLATES
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
        .collect()
});

static EXCLAIM_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"!{2,}").unwrap());
static QUESTION_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\?{2,}").unwrap());
static CAPS_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b[A-Z]{3,}\b").unwrap());

/// Raw score per table row, in table order.
fn scores(text: &str) -> Vec<(Emotion, f32)> {
    let mut out: Vec<(Emotion, f32)> = EMOTION_RULES
        .iter()
        .zip(KEYWORDS.iter())
        .map(|((emotion, weight, _, emojis), keywords)| {
            let hits = keywords
                .as_ref()
                .map_or(0, |re| re.find_iter(text).count()) as f32;
            let emoji_hits = emojis.iter().map(|e| text.matches(e).count()).sum::<usize>() as f32;
            (*emotion, hits * weight + emoji_hits * 0.8 * weight)
        })
        .collect();

    let mut bump = |target: Emotion, amount: f32| {
        if let Some(slot) = out.iter_mut().find(|(e, _)| *e == target) {
            slot.1 += amount;
        }
    };

    bump(Emotion::Excited, EXCLAIM_RUN.find_iter(text).count() as f32);
    bump(Emotion::Confused, QUESTION_RUN.find_iter(text).count() as f32);

    let caps = CAPS_WORD.find_iter(text).count();
    if caps >= 2 {
        bump(Emotion::Angry, 0.5 * caps as f32);
    }

    let templates = SADNESS.iter().filter(|re| re.is_match(text)).count();
    bump(Emotion::Sad, 2.0 * templates as f32);

    out
}

/// Top-scoring emotion and its intensity. Neutral only when nothing scored.
pub fn classify_emotion(text: &str) -> (Emotion, Intensity) {
    let mut best = (Emotion::Neutral, 0.0_f32);
    for (emotion, score) in scores(text) {
        if score > best.1 {
            best = (emotion, score);
        }
    }
    (best.0, Intensity::from_score(best.1))
}
