//! Hand-written mocks shared by the unit and gateway tests.

use crate::handlers::Collaborators;
use async_trait::async_trait;
use doppel_core::{
    context::{Context, ContextEntry},
    error::DoppelError,
    message::{Envelope, OutgoingMessage},
    traits::{Channel, Lookup, Presence, Provider, Speech, Summarizer},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

type Script = Box<dyn Fn(&Context) -> Result<String, DoppelError> + Send + Sync>;

/// Provider whose reply is computed from the context it receives.
pub struct ScriptedProvider {
    script: Script,
    pub calls: Mutex<Vec<Context>>,
}

impl ScriptedProvider {
    pub fn new(
        script: impl Fn(&Context) -> Result<String, DoppelError> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn replying(text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    pub fn failing(msg: &str) -> Arc<Self> {
        let msg = msg.to_string();
        Self::new(move |_| Err(DoppelError::Provider(msg.clone())))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<Context> {
        self.calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, context: &Context) -> Result<OutgoingMessage, DoppelError> {
        self.calls.lock().unwrap().push(context.clone());
        let text = (self.script)(context)?;
        Ok(OutgoingMessage {
            text,
            ..Default::default()
        })
    }

    async fn is_available(&self) -> bool {
        true
    }
}

/// Lookup with a fixed answer.
pub struct StaticLookup {
    name: String,
    answer: Result<Option<String>, String>,
    pub queries: Mutex<Vec<String>>,
}

impl StaticLookup {
    pub fn found(name: &str, answer: &str) -> Arc<Self> {
        Self::with(name, Ok(Some(answer.to_string())))
    }

    pub fn empty(name: &str) -> Arc<Self> {
        Self::with(name, Ok(None))
    }

    pub fn failing(name: &str, msg: &str) -> Arc<Self> {
        Self::with(name, Err(msg.to_string()))
    }

    fn with(name: &str, answer: Result<Option<String>, String>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            answer,
            queries: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Lookup for StaticLookup {
    fn name(&self) -> &str {
        &self.name
    }

    async fn lookup(&self, query: &str, _is_group: bool) -> Result<Option<String>, DoppelError> {
        self.queries.lock().unwrap().push(query.to_string());
        self.answer.clone().map_err(DoppelError::Provider)
    }
}

/// Summarizer that reports how many turns it saw.
pub struct CountingSummarizer;

#[async_trait]
impl Summarizer for CountingSummarizer {
    async fn summarize(&self, turns: &[ContextEntry]) -> Result<Option<String>, DoppelError> {
        Ok(Some(format!("{} turns about stuff", turns.len())))
    }
}

/// Speech that returns one byte per character.
pub struct ByteSpeech;

#[async_trait]
impl Speech for ByteSpeech {
    fn name(&self) -> &str {
        "bytes"
    }

    fn chunk_budget(&self) -> usize {
        200
    }

    async fn synthesize(
        &self,
        chunk: &str,
        _language: &str,
        _slow: bool,
    ) -> Result<Vec<u8>, DoppelError> {
        Ok(vec![1u8; chunk.chars().count()])
    }
}

/// Collaborators where every lookup finds nothing.
pub fn collaborators(provider: Arc<dyn Provider>) -> Collaborators {
    Collaborators {
        provider,
        summarizer: Arc::new(CountingSummarizer),
        search: StaticLookup::empty("search"),
        youtube: StaticLookup::empty("youtube"),
        link: StaticLookup::empty("link"),
        translator: StaticLookup::empty("translate"),
        speech: None,
    }
}

/// Something a channel was asked to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Presence(String, Presence),
    Text(String, String),
    Image(String, usize, String),
    Audio(String, usize, bool),
}

/// Channel that records everything and can be told to fail text sends.
pub struct RecordingChannel {
    name: String,
    pub sent: Mutex<Vec<Sent>>,
    failures_left: AtomicUsize,
}

impl RecordingChannel {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            sent: Mutex::new(Vec::new()),
            failures_left: AtomicUsize::new(0),
        })
    }

    /// Fail the next `n` text sends.
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn texts(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter_map(|s| match s {
                Sent::Text(_, t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn events(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn start(&self) -> Result<mpsc::Receiver<Envelope>, DoppelError> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), DoppelError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(DoppelError::Channel("socket closed".into()));
        }
        let target = message.reply_target.unwrap_or_default();
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Text(target, message.text));
        Ok(())
    }

    async fn send_image(
        &self,
        target: &str,
        image: &[u8],
        caption: &str,
    ) -> Result<(), DoppelError> {
        self.sent.lock().unwrap().push(Sent::Image(
            target.to_string(),
            image.len(),
            caption.to_string(),
        ));
        Ok(())
    }

    async fn send_audio(
        &self,
        target: &str,
        audio: &[u8],
        _mime: &str,
        push_to_talk: bool,
    ) -> Result<(), DoppelError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Audio(target.to_string(), audio.len(), push_to_talk));
        Ok(())
    }

    async fn set_presence(&self, target: &str, presence: Presence) -> Result<(), DoppelError> {
        self.sent
            .lock()
            .unwrap()
            .push(Sent::Presence(target.to_string(), presence));
        Ok(())
    }

    async fn stop(&self) -> Result<(), DoppelError> {
        Ok(())
    }
}
