//! Text-to-speech via the Google Translate TTS endpoint.
//!
//! The endpoint accepts short texts only, so longer replies are chunked on
//! sentence, comma, or space boundaries and the MP3 buffers concatenated.

use async_trait::async_trait;
use doppel_core::{
    annotation::{has_devanagari, hinglish_hits},
    config::VoiceConfig,
    error::DoppelError,
    traits::Speech,
};
use std::time::Duration;
use tracing::debug;

const TTS_URL: &str = "https://translate.google.com/translate_tts";

/// Google Translate TTS.
pub struct GoogleTts {
    client: reqwest::Client,
    chunk_budget: usize,
    timeout: Duration,
}

impl GoogleTts {
    pub fn from_config(config: &VoiceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            chunk_budget: config.chunk_budget.max(2),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl Speech for GoogleTts {
    fn name(&self) -> &str {
        "google-tts"
    }

    fn chunk_budget(&self) -> usize {
        self.chunk_budget
    }

    async fn synthesize(
        &self,
        chunk: &str,
        language: &str,
        slow: bool,
    ) -> Result<Vec<u8>, DoppelError> {
        let speed = if slow { "0.24" } else { "1" };
        let resp = self
            .client
            .get(TTS_URL)
            .timeout(self.timeout)
            .query(&[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", language),
                ("ttsspeed", speed),
                ("q", chunk),
            ])
            .send()
            .await
            .map_err(|e| DoppelError::Provider(format!("tts request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(DoppelError::Provider(format!("tts returned {status}")));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| DoppelError::Provider(format!("tts: failed to read audio: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Voice language for a text: `hi` for Devanagari or heavy Romanized Hindi, else `en`.
pub fn tts_language(text: &str) -> &'static str {
    if has_devanagari(text) || hinglish_hits(text) >= 3 {
        "hi"
    } else {
        "en"
    }
}

/// Split text into chunks of at most `budget` characters.
///
/// Each cut lands on the last sentence end, comma, or space at or beyond
/// half the budget; text with no such boundary is cut hard at the budget.
pub fn chunk_text(text: &str, budget: usize) -> Vec<String> {
    let budget = budget.max(2);
    let half = budget / 2;
    let mut chunks = Vec::new();
    let mut rest: Vec<char> = text.trim().chars().collect();

    while rest.len() > budget {
        let window = &rest[..budget];
        let boundary = |pred: &dyn Fn(char) -> bool| {
            (half..budget).rev().find(|&i| pred(window[i]))
        };
        let cut = boundary(&|c: char| matches!(c, '.' | '!' | '?' | '।'))
            .or_else(|| boundary(&|c: char| c == ','))
            .or_else(|| boundary(&|c: char| c == ' '))
            .map(|i| i + 1)
            .unwrap_or(budget);

        let chunk: String = rest[..cut].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }
        rest.drain(..cut);
    }

    let tail: String = rest.into_iter().collect();
    let tail = tail.trim();
    if !tail.is_empty() {
        chunks.push(tail.to_string());
    }
    chunks
}

/// Synthesize a whole reply, chunking as needed and enforcing the size cap.
pub async fn speak(
    speech: &dyn Speech,
    text: &str,
    slow: bool,
    max_bytes: usize,
) -> Result<Vec<u8>, DoppelError> {
    let language = tts_language(text);
    let chunks = chunk_text(text, speech.chunk_budget());
    debug!(
        "tts: {} chunk(s) via {} lang={language}",
        chunks.len(),
        speech.name()
    );

    let mut audio = Vec::new();
    for chunk in &chunks {
        let bytes = speech.synthesize(chunk, language, slow).await?;
        if audio.len() + bytes.len() > max_bytes {
            return Err(DoppelError::Provider(format!(
                "voice clip exceeds {max_bytes} bytes"
            )));
        }
        audio.extend_from_slice(&bytes);
    }

    if audio.is_empty() {
        return Err(DoppelError::Provider("tts produced no audio".into()));
    }
    Ok(audio)
}
