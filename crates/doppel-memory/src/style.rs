//! Regex classifiers for per-sender communication style and topic tags.

use doppel_core::annotation::hinglish_hits;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// How a contact tends to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommunicationStyle {
    CasualFriendly,
    Formal,
    Humorous,
    Hinglish,
    Brief,
    Detailed,
    Neutral,
}

impl CommunicationStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CasualFriendly => "casual-friendly",
            Self::Formal => "formal",
            Self::Humorous => "humorous",
            Self::Hinglish => "hinglish",
            Self::Brief => "brief",
            Self::Detailed => "detailed",
            Self::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "casual-friendly" => Self::CasualFriendly,
            "formal" => Self::Formal,
            "humorous" => Self::Humorous,
            "hinglish" => Self::Hinglish,
            "brief" => Self::Brief,
            "detailed" => Self::Detailed,
            _ => Self::Neutral,
        }
    }
}

static FORMAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(dear|regards|kindly|sincerely|respected|please find|greetings|sir|madam)\b")
        .unwrap()
});
static HUMOROUS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(\bha(ha)+\b|\bhe(he)+\b|\blo+l\b|\blmao\b|\brofl\b|😂|🤣|😆)").unwrap());
static CASUAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(bro|bruh|dude|yo|hey|sup|buddy|mate|gonna|wanna|ya)\b").unwrap()
});

/// Classify a single message into exactly one style label.
///
/// Checked in order: formal, humorous, hinglish, casual-friendly, detailed,
/// brief, neutral.
pub fn detect_style(text: &str) -> CommunicationStyle {
    let len = text.chars().count();
    if FORMAL.is_match(text) {
        CommunicationStyle::Formal
    } else if HUMOROUS.is_match(text) {
        CommunicationStyle::Humorous
    } else if hinglish_hits(text) >= 2 {
        CommunicationStyle::Hinglish
    } else if CASUAL.is_match(text) {
        CommunicationStyle::CasualFriendly
    } else if len > 200 {
        CommunicationStyle::Detailed
    } else if len > 0 && len < 15 {
        CommunicationStyle::Brief
    } else {
        CommunicationStyle::Neutral
    }
}

/// Topic tags tracked on a person profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topic {
    Tech,
    Ai,
    Bike,
    Chess,
    Finance,
    Career,
    Music,
    Personal,
    Youtube,
    Education,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tech => "tech",
            Self::Ai => "ai",
            Self::Bike => "bike",
            Self::Chess => "chess",
            Self::Finance => "finance",
            Self::Career => "career",
            Self::Music => "music",
            Self::Personal => "personal",
            Self::Youtube => "youtube",
            Self::Education => "education",
        }
    }
}

const TOPIC_PATTERNS: &[(Topic, &str)] = &[
    (
        Topic::Tech,
        r"\b(code|coding|programming|software|laptop|computer|app|developer|rust|python|javascript|linux|github|keyboard)s?\b",
    ),
    (
        Topic::Ai,
        r"\b(ai|ml|gpt|llm|chatgpt|gemini|machine learning|neural|deep learning)\b",
    ),
    (
        Topic::Bike,
        r"\b(bike|ride|riding|motorcycle|royal enfield|ktm|helmet)s?\b",
    ),
    (Topic::Chess, r"\b(chess|checkmate|gambit|elo|blitz|magnus)\b"),
    (
        Topic::Finance,
        r"\b(stock|invest|investment|crypto|bitcoin|market|mutual fund|sip|trading)s?\b",
    ),
    (
        Topic::Career,
        r"\b(job|career|interview|resume|cv|salary|hiring|internship|promotion)s?\b",
    ),
    (
        Topic::Music,
        r"\b(song|music|playlist|guitar|spotify|album|singer|concert)s?\b",
    ),
    (
        Topic::Personal,
        r"\b(family|mom|dad|girlfriend|boyfriend|wife|husband|health|relationship)s?\b",
    ),
    (
        Topic::Youtube,
        r"\b(youtube|yt|vlog|subscribe|youtuber)s?\b",
    ),
    (
        Topic::Education,
        r"\b(exam|college|study|studying|course|semester|university|school|degree)s?\b",
    ),
];

static TOPICS: LazyLock<Vec<(Topic, Regex)>> = LazyLock::new(|| {
    TOPIC_PATTERNS
        .iter()
        .map(|(topic, pattern)| (*topic, Regex::new(&format!("(?i){pattern}")).unwrap()))
        .collect()
});

/// All topic tags mentioned in the text, in table order.
pub fn detect_topics(text: &str) -> Vec<Topic> {
    TOPICS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(topic, _)| *topic)
        .collect()
}

/// Merge newly seen topics into a bounded most-recent-last list of distinct tags.
pub fn merge_topics(existing: &mut Vec<Topic>, seen: &[Topic], cap: usize) {
    for topic in seen {
        existing.retain(|t| t != topic);
        existing.push(*topic);
    }
    if existing.len() > cap {
        let excess = existing.len() - cap;
        existing.drain(..excess);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_style_labels() {
        assert_eq!(
            detect_style("Dear Manthan, kindly share the document."),
            CommunicationStyle::Formal
        );
        assert_eq!(detect_style("hahaha that's wild"), CommunicationStyle::Humorous);
        assert_eq!(
            detect_style("kya kar raha hai aaj"),
            CommunicationStyle::Hinglish
        );
        assert_eq!(
            detect_style("yo dude wanna play later"),
            CommunicationStyle::CasualFriendly
        );
        assert_eq!(detect_style("ok cool"), CommunicationStyle::Brief);
        assert_eq!(
            detect_style("I was wondering about the project timeline"),
            CommunicationStyle::Neutral
        );
        assert_eq!(detect_style(&"word ".repeat(50)), CommunicationStyle::Detailed);
    }

    #[test]
    fn test_style_parse_round_trip() {
        for s in [
            CommunicationStyle::CasualFriendly,
            CommunicationStyle::Hinglish,
            CommunicationStyle::Detailed,
        ] {
            assert_eq!(CommunicationStyle::parse(s.as_str()), s);
        }
        assert_eq!(
            CommunicationStyle::parse("garbage"),
            CommunicationStyle::Neutral
        );
    }

    #[test]
    fn test_detect_topics() {
        let topics = detect_topics("best ergonomic keyboards for coding and chess");
        assert_eq!(topics, vec![Topic::Tech, Topic::Chess]);
        assert!(detect_topics("nothing to see").is_empty());
    }

    #[test]
    fn test_merge_topics_bounded_and_distinct() {
        let mut topics = vec![Topic::Tech, Topic::Ai, Topic::Bike, Topic::Chess, Topic::Music];
        merge_topics(&mut topics, &[Topic::Tech, Topic::Career], 5);
        assert_eq!(
            topics,
            vec![Topic::Bike, Topic::Chess, Topic::Music, Topic::Tech, Topic::Career]
        );
    }
}
