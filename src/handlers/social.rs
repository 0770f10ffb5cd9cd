//! Canned social replies: birthdays, festivals, spam, and the emergency
//! phrase used when every handler has failed.

use doppel_core::annotation::{Annotations, Emotion, Intent};

const BIRTHDAY: &[&str] = &[
    "thank youuu 🥹🎂",
    "aww thanks a lot! 🎉",
    "thank you so much, made my day 😄",
];
const GREETING: &[&str] = &["hey! 👋", "heyy, what's up?", "yo! how's it going"];
const THANKS: &[&str] = &["anytime!", "no worries 🙌", "happy to help haha"];
const FAREWELL: &[&str] = &["bye! take care", "catch you later 👋", "ttyl!"];
const SPAM: &str = "not interested, thanks";

const SUPPORTIVE: &[&str] = &[
    "hey, I'm here. give me a bit and I'll reply properly ❤️",
    "I hear you. can't talk properly this second but I'll get back to you soon 🤗",
];
const GENERIC: &[&str] = &[
    "haha one sec, will get back to you",
    "wait give me a min 😅",
    "hmm let me get back to you on that",
];

/// Stable choice from a pool, keyed on the message text.
fn pick<'a>(pool: &[&'a str], key: &str) -> &'a str {
    let sum: usize = key.bytes().map(usize::from).sum();
    pool[sum % pool.len()]
}

fn festival_greeting(sub_intent: &str) -> String {
    let (name, emoji) = match sub_intent {
        "diwali" => ("Diwali", "🪔"),
        "holi" => ("Holi", "🎨"),
        "eid" => ("Eid", "🌙"),
        "christmas" => ("Christmas", "🎄"),
        "new_year" => ("New Year", "🎆"),
        _ => return "same to you and your family! 🎉".to_string(),
    };
    format!("Happy {name} to you too! {emoji}")
}

/// Template reply for social intents, if one fits.
pub fn social_reply(annotations: &Annotations, text: &str) -> Option<String> {
    let reply = match annotations.intent {
        Intent::Spam => SPAM.to_string(),
        Intent::Birthday => pick(BIRTHDAY, text).to_string(),
        Intent::Festival => festival_greeting(&annotations.sub_intent),
        Intent::Greeting => pick(GREETING, text).to_string(),
        Intent::Thanks => pick(THANKS, text).to_string(),
        Intent::Farewell => pick(FAREWELL, text).to_string(),
        _ => return None,
    };
    Some(reply)
}

/// Last-resort reply; supportive when the sender seems sad or anxious.
pub fn emergency_reply(annotations: &Annotations, text: &str) -> &'static str {
    match annotations.emotion {
        Emotion::Sad | Emotion::Anxious => pick(SUPPORTIVE, text),
        _ => pick(GENERIC, text),
    }
}
