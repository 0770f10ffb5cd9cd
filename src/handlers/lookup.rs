//! Handlers backed by lookups: search, youtube, knowledge, link previews,
//! translation, and conversation summaries.

use super::{chat, with_timeout, Bundle, HandlerKind, HandlerResult, Handlers};
use crate::router::LANGUAGES;
use doppel_core::{
    annotation::Intent, config::PersonaConfig, error::DoppelError, traits::Lookup,
};
use doppel_providers::{link::first_url, llm::LlmTranslator};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static TRANSLATE_X_TO_L: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*translate\s+(.+?)\s+(?:to|in|into)\s+([a-z]+)\s*[?.!]*\s*$").unwrap()
});
static TRANSLATE_TO_L_X: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*translate\s+(?:to|in|into)\s+([a-z]+)\s*[:,-]?\s+(.+)$").unwrap()
});
static X_KO_L_MEIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(.+?)\s+ko\s+([a-z]+)\s+(?:mein|me)\b").unwrap()
});
static X_IN_L: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:how (?:do you|to) say\s+)?(.+?)\s+(?:in|into)\s+([a-z]+)\s*[?.!]*\s*$")
        .unwrap()
});
static DEICTIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(this|that|it|this message|that message)$").unwrap());

/// Capitalized language name if it is one we translate to.
fn known_language(lang: &str) -> Option<String> {
    let lower = lang.to_lowercase();
    LANGUAGES.contains(&lower.as_str()).then(|| {
        let mut chars = lower.chars();
        chars
            .next()
            .map(|c| c.to_uppercase().chain(chars).collect())
            .unwrap_or_default()
    })
}

/// Pull `(text, language)` out of a translation request.
///
/// "this"/"that" refer to the quoted message when there is one.
pub fn parse_translation(text: &str, quoted: Option<&str>) -> Option<(String, String)> {
    let (phrase, lang) = if let Some(c) = TRANSLATE_X_TO_L.captures(text) {
        (c[1].to_string(), c[2].to_string())
    } else if let Some(c) = TRANSLATE_TO_L_X.captures(text) {
        (c[2].to_string(), c[1].to_string())
    } else if let Some(c) = X_KO_L_MEIN.captures(text) {
        (c[1].to_string(), c[2].to_string())
    } else if let Some(c) = X_IN_L.captures(text) {
        (c[1].to_string(), c[2].to_string())
    } else {
        return None;
    };

    let lang = known_language(&lang)?;
    let phrase = phrase.trim().trim_matches('"').trim().to_string();
    let phrase = match quoted {
        Some(q) if DEICTIC.is_match(&phrase) => q.trim().to_string(),
        _ => phrase,
    };
    (!phrase.is_empty()).then_some((phrase, lang))
}

/// Knowledge-base facts whose keywords appear in the text.
pub fn knowledge_findings(persona: &PersonaConfig, text: &str, intent: Intent) -> Option<String> {
    let facts: Vec<&str> = persona
        .knowledge
        .iter()
        .filter(|entry| {
            entry.keywords.iter().any(|kw| {
                let kw = kw.trim();
                !kw.is_empty()
                    && Regex::new(&format!(r"(?i)\b{}\b", regex::escape(kw)))
                        .is_ok_and(|re| re.is_match(text))
            })
        })
        .map(|entry| entry.fact.as_str())
        .collect();

    if !facts.is_empty() {
        return Some(facts.join("\n"));
    }
    // "Who are you" always has an answer.
    (intent == Intent::AboutInquiry && !persona.description.trim().is_empty())
        .then(|| persona.description.trim().to_string())
}

/// If findings carry links and the reply dropped all of them, append the first.
fn ensure_link(reply: String, findings: &str) -> String {
    if reply.contains("http://") || reply.contains("https://") {
        return reply;
    }
    match first_url(findings) {
        Some(url) => format!("{reply}\n{url}"),
        None => reply,
    }
}

/// Run chat over findings and tag the result.
async fn compose(
    h: &Handlers,
    bundle: &Bundle,
    source: HandlerKind,
    findings: String,
) -> Result<HandlerResult, DoppelError> {
    let mut with_findings = bundle.clone();
    with_findings.findings = Some(findings.clone());
    let reply = chat::respond(h, &with_findings).await?;
    if reply.is_empty() {
        return Err(DoppelError::Handler(format!("{source}: chat produced nothing")));
    }
    Ok(HandlerResult {
        response: ensure_link(reply, &findings),
        source,
        findings: Some(findings),
        image: None,
        audio: None,
    })
}

async fn findings_from(
    h: &Handlers,
    lookup: &dyn Lookup,
    bundle: &Bundle,
) -> Result<String, DoppelError> {
    let found = with_timeout(
        h.lookup_timeout,
        lookup.name(),
        lookup.lookup(&bundle.text, bundle.is_group),
    )
    .await?;
    found.ok_or_else(|| DoppelError::Handler(format!("{}: no findings", lookup.name())))
}

pub(super) async fn search(h: &Handlers, bundle: &Bundle) -> Result<HandlerResult, DoppelError> {
    let findings = findings_from(h, h.collab.search.as_ref(), bundle).await?;
    compose(h, bundle, HandlerKind::Search, findings).await
}

pub(super) async fn youtube(h: &Handlers, bundle: &Bundle) -> Result<HandlerResult, DoppelError> {
    let findings = findings_from(h, h.collab.youtube.as_ref(), bundle).await?;
    compose(h, bundle, HandlerKind::Youtube, findings).await
}

pub(super) async fn knowledge(
    h: &Handlers,
    bundle: &Bundle,
) -> Result<HandlerResult, DoppelError> {
    let findings = knowledge_findings(&h.persona, &bundle.text, bundle.annotations.intent)
        .ok_or_else(|| DoppelError::Handler("knowledge: nothing matched".into()))?;
    compose(h, bundle, HandlerKind::Knowledge, findings).await
}

/// Host part of a URL, for the no-fetch preview.
fn host_of(url: &str) -> &str {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    rest.split(['/', '?', '#']).next().unwrap_or(rest)
}

pub(super) async fn link(h: &Handlers, bundle: &Bundle) -> Result<HandlerResult, DoppelError> {
    let url = first_url(&bundle.text)
        .ok_or_else(|| DoppelError::Handler("link: no url in text".into()))?
        .to_string();

    let lookup = h.collab.link.as_ref();
    let preview = match with_timeout(
        h.lookup_timeout,
        lookup.name(),
        lookup.lookup(&bundle.text, bundle.is_group),
    )
    .await
    {
        Ok(Some(preview)) => preview,
        Ok(None) => {
            debug!("link: no metadata for {url}");
            format!("{}\n{url}", host_of(&url))
        }
        Err(e) => {
            warn!("link: preview failed for {url}: {e}");
            format!("{}\n{url}", host_of(&url))
        }
    };

    Ok(HandlerResult {
        response: preview.clone(),
        source: HandlerKind::Link,
        findings: Some(preview),
        image: None,
        audio: None,
    })
}

pub(super) async fn translate(
    h: &Handlers,
    bundle: &Bundle,
) -> Result<HandlerResult, DoppelError> {
    let (phrase, lang) = parse_translation(&bundle.text, bundle.quoted.as_deref())
        .ok_or_else(|| DoppelError::Handler("translate: could not parse request".into()))?;

    let lookup = h.collab.translator.as_ref();
    let translated = with_timeout(
        h.llm_timeout,
        lookup.name(),
        lookup.lookup(&LlmTranslator::request(&phrase, &lang), bundle.is_group),
    )
    .await?
    .ok_or_else(|| DoppelError::Handler("translate: empty translation".into()))?;

    Ok(HandlerResult::text(HandlerKind::Translate, translated))
}

/// Turns considered for an on-demand summary.
const SUMMARY_TURNS: usize = 30;

pub(super) async fn summarize(
    h: &Handlers,
    bundle: &Bundle,
) -> Result<HandlerResult, DoppelError> {
    let turns = h
        .store
        .recent_turns(&bundle.sender_id, SUMMARY_TURNS + 1)
        .await?;
    let entries: Vec<_> = turns
        .iter()
        .filter(|t| Some(t.id) != bundle.user_turn_id)
        .map(|t| t.to_entry())
        .collect();
    if entries.is_empty() {
        return Ok(HandlerResult::text(
            HandlerKind::Summarize,
            "nothing to summarize yet, we just started talking".to_string(),
        ));
    }

    let summary = with_timeout(
        h.llm_timeout,
        "summarizer",
        h.collab.summarizer.summarize(&entries),
    )
    .await?
    .ok_or_else(|| DoppelError::Handler("summarize: empty summary".into()))?;

    Ok(HandlerResult::text(
        HandlerKind::Summarize,
        format!("quick recap: {summary}"),
    ))
}
