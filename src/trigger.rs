//! Group trigger gate, answer-this redirection, and bot-mention stripping.

use doppel_core::message::Envelope;
use regex::Regex;
use std::sync::LazyLock;

static BOT_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)^\s*@bot\s+").unwrap());
static ANSWER_VERB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(answer|reply|respond|explain|jawab|bata|samjha)").unwrap());

/// Word count at or under which a verb anywhere in the text counts as imperative.
const SHORT_IMPERATIVE_WORDS: usize = 4;

/// Decides whether a group message is addressed to the bot.
pub struct TriggerGate {
    bot_id: String,
    name_tag: Regex,
}

impl TriggerGate {
    pub fn new(persona_name: &str, bot_id: &str) -> Self {
        let name = regex::escape(persona_name.trim());
        let pattern = if name.is_empty() {
            r"(?i)@bot".to_string()
        } else {
            format!(r"(?i)(@?{name}|@bot)")
        };
        let name_tag = Regex::new(&pattern).unwrap_or_else(|_| Regex::new(r"(?i)@bot").unwrap());
        Self {
            bot_id: bot_id.to_string(),
            name_tag,
        }
    }

    fn quotes_bot(&self, env: &Envelope) -> bool {
        env.quoted
            .as_ref()
            .and_then(|q| q.author_id.as_deref())
            .is_some_and(|a| a == self.bot_id)
    }

    /// Direct chats always pass. Groups need a mention, a quote of the bot,
    /// or the name tag in the text or image caption.
    pub fn is_triggered(&self, env: &Envelope) -> bool {
        if !env.is_group {
            return true;
        }
        env.mentioned_ids.iter().any(|id| id == &self.bot_id)
            || self.quotes_bot(env)
            || self.name_tag.is_match(&env.text)
    }

    /// Whether the text tells the bot to answer the quoted message.
    fn is_answer_imperative(&self, text: &str) -> bool {
        let stripped = self.name_tag.replace_all(text, " ");
        let words: Vec<&str> = stripped.split_whitespace().collect();
        let Some(first) = words.first() else {
            return false;
        };
        ANSWER_VERB.find(first).is_some_and(|m| m.start() == 0)
            || (words.len() <= SHORT_IMPERATIVE_WORDS && ANSWER_VERB.is_match(&stripped))
    }

    /// The text the pipeline should act on.
    ///
    /// In a triggered group message that quotes someone other than the bot
    /// and says "answer this", the quoted text takes over. A leading `@bot `
    /// is removed.
    pub fn effective_text(&self, env: &Envelope) -> String {
        if env.is_group && !self.quotes_bot(env) {
            if let Some(quoted) = env.quoted.as_ref() {
                if !quoted.text.trim().is_empty() && self.is_answer_imperative(&env.text) {
                    return quoted.text.trim().to_string();
                }
            }
        }
        strip_bot_prefix(&env.text)
    }
}

/// Remove a leading `@bot ` (case-insensitive).
pub fn strip_bot_prefix(text: &str) -> String {
    BOT_PREFIX.replace(text, "").trim().to_string()
}

/// Whether the text starts with `@bot `.
pub fn has_bot_prefix(text: &str) -> bool {
    BOT_PREFIX.is_match(text)
}
