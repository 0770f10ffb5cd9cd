//! Message annotations: intent, emotion, intensity, and language labels.

use serde::{Deserialize, Serialize};

/// Primary intent of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    Farewell,
    Question,
    AboutInquiry,
    WorkInquiry,
    TechInquiry,
    ContactInquiry,
    Collaboration,
    HumanRequest,
    Thanks,
    Birthday,
    Festival,
    Opinion,
    Help,
    Casual,
    Challenge,
    Request,
    Emotional,
    Spam,
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Farewell => "farewell",
            Self::Question => "question",
            Self::AboutInquiry => "about_inquiry",
            Self::WorkInquiry => "work_inquiry",
            Self::TechInquiry => "tech_inquiry",
            Self::ContactInquiry => "contact_inquiry",
            Self::Collaboration => "collaboration",
            Self::HumanRequest => "human_request",
            Self::Thanks => "thanks",
            Self::Birthday => "birthday",
            Self::Festival => "festival",
            Self::Opinion => "opinion",
            Self::Help => "help",
            Self::Casual => "casual",
            Self::Challenge => "challenge",
            Self::Request => "request",
            Self::Emotional => "emotional",
            Self::Spam => "spam",
            Self::Unknown => "unknown",
        }
    }

    /// Intents that deserve a snappy reply.
    pub fn is_quick(&self) -> bool {
        matches!(self, Self::Greeting | Self::Farewell | Self::Thanks)
    }
}

/// Emotion detected in an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Excited,
    Sad,
    Frustrated,
    Angry,
    Confused,
    Curious,
    Grateful,
    Anxious,
    Sarcastic,
    Challenging,
    Neutral,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Excited => "excited",
            Self::Sad => "sad",
            Self::Frustrated => "frustrated",
            Self::Angry => "angry",
            Self::Confused => "confused",
            Self::Curious => "curious",
            Self::Grateful => "grateful",
            Self::Anxious => "anxious",
            Self::Sarcastic => "sarcastic",
            Self::Challenging => "challenging",
            Self::Neutral => "neutral",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "happy" => Self::Happy,
            "excited" => Self::Excited,
            "sad" => Self::Sad,
            "frustrated" => Self::Frustrated,
            "angry" => Self::Angry,
            "confused" => Self::Confused,
            "curious" => Self::Curious,
            "grateful" => Self::Grateful,
            "anxious" => Self::Anxious,
            "sarcastic" => Self::Sarcastic,
            "challenging" => Self::Challenging,
            "neutral" => Self::Neutral,
            _ => return None,
        })
    }

    /// How the reply should sound for this emotion.
    pub fn tone_hint(&self) -> &'static str {
        match self {
            Self::Happy | Self::Excited => "match their energy, keep it upbeat",
            Self::Sad => "be gentle and supportive, no jokes",
            Self::Frustrated | Self::Angry => "stay calm, acknowledge the frustration, be brief",
            Self::Confused => "explain simply, one step at a time",
            Self::Curious => "be informative but keep it conversational",
            Self::Grateful => "accept the thanks warmly, keep it short",
            Self::Anxious => "reassure, be steady and kind",
            Self::Sarcastic => "play along lightly, don't get defensive",
            Self::Challenging => "stay confident and witty, never defensive",
            Self::Neutral => "casual and natural",
        }
    }
}

/// Strength of the detected emotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    /// Bucket a top emotion score.
    pub fn from_score(score: f32) -> Self {
        if score > 3.0 {
            Self::High
        } else if score > 1.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Romanized-Hindi function words used to spot Hinglish.
pub const HINGLISH_WORDS: &[&str] = &[
    "hai", "hain", "kya", "kaise", "kaisa", "nahi", "nahin", "haan", "acha", "accha", "achha",
    "bhai", "yaar", "kar", "karo", "raha", "rahi", "rahe", "tha", "thi", "mein", "mai", "mujhe",
    "tum", "tumhe", "aap", "aapko", "kuch", "bahut", "bohot", "abhi", "kab", "kyun", "kyu",
    "matlab", "chal", "chalo", "bata", "batao", "samjha", "jawab", "ko", "se", "ka", "ki", "ke",
    "hoga", "hogi", "dekh", "dekho", "sahi", "theek", "thik", "arre", "arey", "bol", "bolo",
];

/// Language of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Hindi,
    Hinglish,
}

impl Language {
    /// Devanagari → Hindi; any Romanized-Hindi function word → Hinglish; else English.
    pub fn detect(text: &str) -> Self {
        if has_devanagari(text) {
            Self::Hindi
        } else if hinglish_hits(text) >= 1 {
            Self::Hinglish
        } else {
            Self::English
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::English => "english",
            Self::Hindi => "hindi",
            Self::Hinglish => "hinglish",
        }
    }
}

/// Whether the text contains any Devanagari codepoint.
pub fn has_devanagari(text: &str) -> bool {
    text.chars().any(|c| ('\u{0900}'..='\u{097F}').contains(&c))
}

/// Count words in the text that belong to the Romanized-Hindi lexicon.
pub fn hinglish_hits(text: &str) -> usize {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .filter(|w| HINGLISH_WORDS.contains(&w.as_str()))
        .count()
}

/// Full annotation set for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotations {
    pub intent: Intent,
    pub sub_intent: String,
    pub confidence: f32,
    pub emotion: Emotion,
    pub intensity: Intensity,
    pub language: Language,
    pub is_short: bool,
    pub is_long: bool,
    pub has_emoji: bool,
}

impl Default for Annotations {
    fn default() -> Self {
        Self {
            intent: Intent::Unknown,
            sub_intent: "general".to_string(),
            confidence: 0.0,
            emotion: Emotion::Neutral,
            intensity: Intensity::Low,
            language: Language::English,
            is_short: false,
            is_long: false,
            has_emoji: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(Language::detect("नमस्ते दोस्त"), Language::Hindi);
        assert_eq!(Language::detect("kya haal hai bhai"), Language::Hinglish);
        assert_eq!(Language::detect("how are you doing"), Language::English);
    }

    #[test]
    fn test_hinglish_hits_are_word_based() {
        // "kaiser" must not count as "kaise".
        assert_eq!(hinglish_hits("kaiser wilhelm"), 0);
        assert_eq!(hinglish_hits("Kya scene hai, bhai?"), 3);
    }

    #[test]
    fn test_intensity_buckets() {
        assert_eq!(Intensity::from_score(0.0), Intensity::Low);
        assert_eq!(Intensity::from_score(1.5), Intensity::Low);
        assert_eq!(Intensity::from_score(2.0), Intensity::Medium);
        assert_eq!(Intensity::from_score(3.5), Intensity::High);
    }

    #[test]
    fn test_emotion_round_trip_labels() {
        for e in [Emotion::Sad, Emotion::Challenging, Emotion::Neutral] {
            assert_eq!(Emotion::parse(e.as_str()), Some(e));
        }
        assert_eq!(Emotion::parse("bored"), None);
    }

    #[test]
    fn test_intent_serde_snake_case() {
        let json = serde_json::to_string(&Intent::AboutInquiry).unwrap();
        assert_eq!(json, "\"about_inquiry\"");
        assert!(Intent::Thanks.is_quick());
        assert!(!Intent::Question.is_quick());
    }
}
