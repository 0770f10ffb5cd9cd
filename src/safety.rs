//! Outbound safety filter: identity-leak redaction, sensitive-commitment
//! deferral, URL policy, and whitespace cleanup.

use doppel_memory::SafetyRule;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Sent instead of a reply that would commit the owner to something sensitive.
pub const DEFERRAL: &str = "let me check and get back to you on this one";

/// Sent when filtering leaves (almost) nothing.
pub const PLACEHOLDER: &str = "hmm";

/// Phrases that give away that a model is answering.
const IDENTITY_LEAKS: &[&str] = &[
    r"\bas an? (ai|a\.i\.|artificial intelligence|language model|large language model|llm|chatbot|virtual assistant)\b,?",
    r"\bi('m| am) (just |only |merely )?an? (ai|a\.i\.|artificial intelligence|language model|large language model|llm|chatbot|bot|virtual assistant)\b",
    r"\bi was (trained|created|developed|made|built) by (google|openai|anthropic|meta|deepmind)\b",
    r"\b(chatgpt|gpt-?[34o]|gemini|openai|anthropic|claude|bard|deepmind)\b",
    r"\b(my|the) (training data|knowledge cutoff)\b",
];

/// User text about money, credentials, meetings, or legal matters.
const SENSITIVE_TOPICS: &[&str] = &[
    r"\b(bank|account number|pin|otp|cvv|password|upi|loan|salary|ctc)\b",
    r"\b(pay|payment|transfer|invest|money)\b",
    r"\b(meet|meeting|appointment|schedule)\b",
    r"\b(lawyer|legal|court|contract|sign)\b",
];

/// Replies that promise or disclose on the owner's behalf.
const COMMITMENTS: &[&str] = &[
    r"\bi('ll| will) (meet|pay|send|transfer|sign|come|call|lend)\b",
    r"\bmy (account|bank account|upi|card|pin|password)( number| id)? is\b",
    r"\bhere'?s my (number|account|upi|card|password)\b",
    r"\bi (promise|guarantee)\b",
    r"\b(it'?s a deal|that'?s a deal|done deal|deal done|i confirm)\b",
    r"\b(sure|yes|ok(ay)?),? let'?s do it\b",
];

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)https?://\S+").unwrap());
static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());
static BLANK_LINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
        .collect()
}

/// A redaction rule: pattern and what to put in its place.
struct Redaction {
    pattern: Regex,
    replacement: String,
}

pub struct SafetyFilter {
    identity: Vec<Redaction>,
    sensitive: Vec<Regex>,
    commitments: Vec<Regex>,
}

impl Default for SafetyFilter {
    fn default() -> Self {
        Self {
            identity: compile_all(IDENTITY_LEAKS)
                .into_iter()
                .map(|pattern| Redaction {
                    pattern,
                    replacement: String::new(),
                })
                .collect(),
            sensitive: compile_all(SENSITIVE_TOPICS),
            commitments: compile_all(COMMITMENTS),
        }
    }
}

impl SafetyFilter {
    /// Built-in rules extended with rows from the `safety_rules` table.
    ///
    /// Rule types: `identity` (redact), `sensitive` (user-side topic),
    /// `commitment` (reply-side promise). Bad patterns are skipped.
    pub fn with_rules(rules: &[SafetyRule]) -> Self {
        let mut filter = Self::default();
        for rule in rules {
            let pattern = match Regex::new(&format!("(?i){}", rule.pattern)) {
                Ok(re) => re,
                Err(e) => {
                    warn!("safety: skipping rule {} ({}): {e}", rule.id, rule.pattern);
                    continue;
                }
            };
            match rule.rule_type.as_str() {
                "identity" => filter.identity.push(Redaction {
                    pattern,
                    replacement: rule.replacement.clone(),
                }),
                "sensitive" => filter.sensitive.push(pattern),
                "commitment" => filter.commitments.push(pattern),
                other => warn!("safety: unknown rule type {other} on rule {}", rule.id),
            }
        }
        filter
    }

    /// Whether any identity-leak pattern is present.
    pub fn leaks_identity(&self, text: &str) -> bool {
        self.identity.iter().any(|r| r.pattern.is_match(text))
    }

    fn redact(&self, text: &str) -> String {
        let mut out = text.to_string();
        // Removing one phrase can splice a new one together; repeat until clean.
        for _ in 0..4 {
            if !self.leaks_identity(&out) {
                break;
            }
            for rule in &self.identity {
                out = rule
                    .pattern
                    .replace_all(&out, rule.replacement.as_str())
                    .into_owned();
            }
        }
        out
    }

    fn is_sensitive_commitment(&self, user_text: &str, response: &str) -> bool {
        self.sensitive.iter().any(|re| re.is_match(user_text))
            && self.commitments.iter().any(|re| re.is_match(response))
    }

    /// Filter one outbound response.
    ///
    /// `allow_urls` is true only when the reply was built from findings.
    pub fn apply(&self, response: &str, user_text: &str, allow_urls: bool) -> String {
        if self.is_sensitive_commitment(user_text, response) {
            return DEFERRAL.to_string();
        }

        let mut out = if self.leaks_identity(response) {
            self.redact(response)
        } else {
            response.to_string()
        };

        if !allow_urls && URL_RE.is_match(&out) {
            out = URL_RE.replace_all(&out, "").into_owned();
        }

        let out = normalize_whitespace(&out);
        if out.chars().count() < 2 {
            return PLACEHOLDER.to_string();
        }
        out
    }
}

/// Collapse runs of spaces, trim lines, and drop stray leading punctuation.
pub fn normalize_whitespace(text: &str) -> String {
    let collapsed = SPACES.replace_all(text, " ");
    let lines: Vec<&str> = collapsed.lines().map(str::trim).collect();
    let joined = lines.join("\n");
    let joined = BLANK_LINES.replace_all(&joined, "\n\n\n");
    joined
        .trim()
        .trim_start_matches([',', '.', ';', ':'])
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> SafetyFilter {
        SafetyFilter::default()
    }

    #[test]
    fn test_clean_response_unchanged() {
        let r = "haha nothing much, just chilling. you?";
        assert_eq!(filter().apply(r, "yo what's up", false), r);
    }

    #[test]
    fn test_identity_leaks_redacted() {
        let f = filter();
        let out = f.apply("As an AI, I can't go out. but coffee sounds fun", "coffee?", false);
        assert!(!f.leaks_identity(&out));
        assert!(out.contains("coffee sounds fun"));

        let out = f.apply("lol I'm an AI made by Google, Gemini to be exact", "who r u", false);
        assert!(!f.leaks_identity(&out));
        assert!(!out.to_lowercase().contains("gemini"));
    }

    #[test]
    fn test_fully_redacted_reply_becomes_placeholder() {
        assert_eq!(filter().apply("I am an AI.", "are you a bot?", false), PLACEHOLDER);
        assert_eq!(filter().apply("  ", "hi", false), PLACEHOLDER);
    }

    #[test]
    fn test_sensitive_commitment_deferred() {
        let f = filter();
        assert_eq!(
            f.apply("sure, I'll transfer it tonight", "can you send the loan money?", false),
            DEFERRAL
        );
        // Commitment language without a sensitive topic passes.
        assert_eq!(
            f.apply("I'll call you later", "you free tonight?", false),
            "I'll call you later"
        );
        assert_eq!(
            f.apply("done deal, see you at the meeting", "can we meet friday?", false),
            DEFERRAL
        );
        // Mentioning a deal is not agreeing to one.
        assert_eq!(
            f.apply("idk what the deal is tbh", "what's the meeting about?", false),
            "idk what the deal is tbh"
        );
        // Sensitive topic without a commitment passes.
        assert_eq!(
            f.apply("hmm salary talk is boring", "what's your salary", false),
            "hmm salary talk is boring"
        );
    }

    #[test]
    fn test_urls_stripped_without_findings() {
        let f = filter();
        let out = f.apply("try https://example.com/x it's good", "any tips", false);
        assert!(!out.contains("http"));
        assert_eq!(out, "try it's good");

        let out = f.apply("see HTTPS://Example.com/x later", "any tips", false);
        assert_eq!(out, "see later");

        let kept = f.apply("try https://example.com/x", "search tips", true);
        assert!(kept.contains("https://example.com/x"));
    }

    #[test]
    fn test_store_rules_extend_builtins() {
        let rules = vec![
            SafetyRule {
                id: 1,
                rule_type: "identity".into(),
                pattern: r"\bmy prompt\b".into(),
                severity: "high".into(),
                replacement: String::new(),
            },
            SafetyRule {
                id: 2,
                rule_type: "identity".into(),
                pattern: "([".into(),
                severity: "low".into(),
                replacement: String::new(),
            },
        ];
        let f = SafetyFilter::with_rules(&rules);
        assert_eq!(f.apply("that's in my prompt lol", "hm", false), "that's in lol");
        // Built-ins still apply.
        assert!(!f.leaks_identity(&f.apply("as an AI, no", "x", false)));
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace(",  hello   there "), "hello there");
        assert_eq!(normalize_whitespace("a\n\n\n\n\nb"), "a\n\n\nb");
    }
}
