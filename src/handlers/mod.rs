//! Response handlers and the fallback chain.
//!
//! Every handler turns a [`Bundle`] into a response. Selection happens in
//! the router; dispatch is a single `match` on [`HandlerKind`].

mod chat;
mod lookup;
mod social;
mod tools;


use crate::humanize::Attachment;
use chrono::{DateTime, Utc};
use doppel_core::{
    annotation::Annotations,
    config::PersonaConfig,
    context::ContextEntry,
    error::DoppelError,
    message::ImageData,
    traits::{Lookup, Provider, Speech, Summarizer},
};
use doppel_memory::{PersonProfile, Store};
use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, warn};

pub use chat::{build_context, system_prompt};
pub use lookup::{knowledge_findings, parse_translation};
pub use social::{emergency_reply, social_reply};
pub use tools::{parse_reminder, parse_todo, ReminderOp, TodoOp};

/// The handler set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Chat,
    Search,
    Youtube,
    Knowledge,
    Link,
    Translate,
    Todo,
    Reminder,
    Summarize,
    Social,
    Vision,
}

impl HandlerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Search => "search",
            Self::Youtube => "youtube",
            Self::Knowledge => "knowledge",
            Self::Link => "link",
            Self::Translate => "translate",
            Self::Todo => "todo",
            Self::Reminder => "reminder",
            Self::Summarize => "summarize",
            Self::Social => "social",
            Self::Vision => "vision",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a handler may look at for one message.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub channel: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub chat_id: String,
    /// Effective text after trigger processing.
    pub text: String,
    pub annotations: Annotations,
    pub is_group: bool,
    pub person: Option<PersonProfile>,
    pub is_new_contact: bool,
    pub recap: String,
    pub quoted: Option<String>,
    pub image: Option<ImageData>,
    pub findings: Option<String>,
    /// Recent turns, oldest first, without the current message.
    pub history: Vec<ContextEntry>,
    pub user_turn_id: Option<i64>,
    pub now: DateTime<Utc>,
}

impl Bundle {
    /// A minimal bundle for a direct text message.
    pub fn direct(channel: &str, sender_id: &str, text: &str, annotations: Annotations) -> Self {
        Self {
            channel: channel.to_string(),
            sender_id: sender_id.to_string(),
            sender_name: None,
            chat_id: sender_id.to_string(),
            text: text.to_string(),
            annotations,
            is_group: false,
            person: None,
            is_new_contact: false,
            recap: String::new(),
            quoted: None,
            image: None,
            findings: None,
            history: Vec::new(),
            user_turn_id: None,
            now: Utc::now(),
        }
    }
}

/// A handler's output.
#[derive(Debug, Clone)]
pub struct HandlerResult {
    pub response: String,
    pub source: HandlerKind,
    /// Findings the response was built from. URLs are allowed only when set.
    pub findings: Option<String>,
    pub image: Option<Attachment>,
    pub audio: Option<Attachment>,
}

impl HandlerResult {
    fn text(source: HandlerKind, response: String) -> Self {
        Self {
            response,
            source,
            findings: None,
            image: None,
            audio: None,
        }
    }
}

/// External collaborators the handlers call out to.
pub struct Collaborators {
    pub provider: Arc<dyn Provider>,
    pub summarizer: Arc<dyn Summarizer>,
    pub search: Arc<dyn Lookup>,
    pub youtube: Arc<dyn Lookup>,
    pub link: Arc<dyn Lookup>,
    pub translator: Arc<dyn Lookup>,
    pub speech: Option<Arc<dyn Speech>>,
}

/// Steps tried after `failed`, in order. Each kind appears at most once.
pub fn fallback_chain(failed: HandlerKind) -> Vec<HandlerKind> {
    let mut chain = Vec::new();
    if !matches!(failed, HandlerKind::Chat | HandlerKind::Knowledge) {
        chain.push(HandlerKind::Chat);
    }
    chain.extend([HandlerKind::Search, HandlerKind::Knowledge, HandlerKind::Social]);
    chain.retain(|k| *k != failed);
    chain
}

/// Run a collaborator call under a deadline.
pub(crate) async fn with_timeout<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = Result<T, DoppelError>>,
) -> Result<T, DoppelError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| DoppelError::Timeout(limit.as_secs(), what.to_string()))?
}

pub struct Handlers {
    pub(crate) collab: Collaborators,
    store: Store,
    persona: PersonaConfig,
    llm_timeout: Duration,
    lookup_timeout: Duration,
    /// Persistent errors already logged, keyed by handler and message.
    logged_once: Mutex<HashSet<String>>,
}

impl Handlers {
    pub fn new(
        collab: Collaborators,
        store: Store,
        persona: PersonaConfig,
        llm_timeout: Duration,
        lookup_timeout: Duration,
    ) -> Self {
        Self {
            collab,
            store,
            persona,
            llm_timeout,
            lookup_timeout,
            logged_once: Mutex::new(HashSet::new()),
        }
    }

    pub fn provider_name(&self) -> &str {
        self.collab.provider.name()
    }

    pub fn speech(&self) -> Option<&Arc<dyn Speech>> {
        self.collab.speech.as_ref()
    }

    pub fn summarizer(&self) -> &dyn Summarizer {
        self.collab.summarizer.as_ref()
    }

    pub fn llm_timeout(&self) -> Duration {
        self.llm_timeout
    }

    /// Run one handler. Empty responses count as failure.
    pub async fn run(
        &self,
        kind: HandlerKind,
        bundle: &Bundle,
    ) -> Result<HandlerResult, DoppelError> {
        let result = match kind {
            HandlerKind::Chat => chat::respond(self, bundle)
                .await
                .map(|text| HandlerResult::text(kind, text)),
            HandlerKind::Vision => chat::vision(self, bundle)
                .await
                .map(|text| HandlerResult::text(kind, text)),
            HandlerKind::Search => lookup::search(self, bundle).await,
            HandlerKind::Youtube => lookup::youtube(self, bundle).await,
            HandlerKind::Knowledge => lookup::knowledge(self, bundle).await,
            HandlerKind::Link => lookup::link(self, bundle).await,
            HandlerKind::Translate => lookup::translate(self, bundle).await,
            HandlerKind::Summarize => lookup::summarize(self, bundle).await,
            HandlerKind::Todo => tools::todo(self, bundle).await,
            HandlerKind::Reminder => tools::reminder(self, bundle).await,
            HandlerKind::Social => social_reply(&bundle.annotations, &bundle.text)
                .map(|text| HandlerResult::text(kind, text))
                .ok_or_else(|| DoppelError::Handler("no social template fits".into())),
        }?;

        if result.response.trim().is_empty() {
            return Err(DoppelError::Handler(format!("{kind} returned an empty response")));
        }
        Ok(result)
    }

    /// Run the routed handler, walking the fallback chain on failure.
    /// Always produces a response.
    pub async fn respond(&self, kind: HandlerKind, bundle: &Bundle) -> HandlerResult {
        let err = match self.run(kind, bundle).await {
            Ok(result) => return result,
            Err(e) => e,
        };
        self.log_failure(kind, &err);

        for step in fallback_chain(kind) {
            debug!("fallback: {kind} -> {step}");
            match self.run(step, bundle).await {
                Ok(result) => return result,
                Err(e) => self.log_failure(step, &e),
            }
        }

        warn!("all handlers failed for {}, sending emergency reply", bundle.sender_id);
        HandlerResult::text(
            kind,
            emergency_reply(&bundle.annotations, &bundle.text).to_string(),
        )
    }

    /// Persistent provider errors (auth, quota) are logged once per process.
    fn log_failure(&self, kind: HandlerKind, err: &DoppelError) {
        if err.is_persistent() {
            let key = format!("{kind}:{err}");
            let first = match self.logged_once.lock() {
                Ok(mut seen) => seen.insert(key),
                Err(_) => true,
            };
            if first {
                warn!("{kind} handler failed (persistent, logged once): {err}");
            }
            return;
        }
        warn!("{kind} handler failed: {err}");
    }
}
