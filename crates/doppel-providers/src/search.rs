//! Web search via a Serper-compatible JSON API.
//!
//! Findings are formatted as a short numbered list with each result's URL
//! on its own line, ready to be woven into a chat reply.

use async_trait::async_trait;
use doppel_core::{config::SearchConfig, error::DoppelError, traits::Lookup};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Web search lookup.
pub struct WebSearch {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    max_results: usize,
    timeout: Duration,
}

impl WebSearch {
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            endpoint: config.endpoint.clone(),
            max_results: config.max_results.max(1),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: usize,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
    #[serde(default, rename = "answerBox")]
    answer_box: Option<AnswerBox>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    snippet: String,
}

#[derive(Debug, Deserialize)]
struct AnswerBox {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
}

/// Strip the explicit trigger words from a search request.
pub fn clean_query(text: &str) -> String {
    let mut words: Vec<&str> = text.split_whitespace().collect();
    while let Some(first) = words.first() {
        let w = first.to_lowercase();
        if matches!(
            w.as_str(),
            "search" | "google" | "for" | "about" | "please" | "pls" | "@bot" | "web"
        ) {
            words.remove(0);
        } else {
            break;
        }
    }
    words.join(" ")
}

/// Render search results as findings text. `None` when nothing usable came back.
fn format_findings(resp: &SearchResponse, limit: usize) -> Option<String> {
    let mut lines = Vec::new();

    if let Some(ref answer) = resp.answer_box {
        if let Some(a) = answer.answer.as_deref().or(answer.snippet.as_deref()) {
            if !a.trim().is_empty() {
                lines.push(format!("Quick answer: {}", a.trim()));
            }
        }
    }

    let results = resp
        .organic
        .iter()
        .filter(|r| !r.link.is_empty())
        .take(limit);
    for (i, r) in results.enumerate() {
        lines.push(format!("{}. {}: {}\n   {}", i + 1, r.title, r.snippet, r.link));
    }

    if resp.organic.iter().all(|r| r.link.is_empty()) {
        return None;
    }
    Some(lines.join("\n"))
}

#[async_trait]
impl Lookup for WebSearch {
    fn name(&self) -> &str {
        "search"
    }

    async fn lookup(&self, query: &str, is_group: bool) -> Result<Option<String>, DoppelError> {
        if self.api_key.is_empty() {
            return Err(DoppelError::Provider("search: no api key configured".into()));
        }
        let q = clean_query(query);
        if q.is_empty() {
            return Ok(None);
        }
        // Groups get a shorter list.
        let limit = if is_group {
            self.max_results.min(2)
        } else {
            self.max_results
        };
        debug!("search: POST {} q={q}", self.endpoint);

        let resp = self
            .client
            .post(&self.endpoint)
            .timeout(self.timeout)
            .header("X-API-KEY", &self.api_key)
            .json(&SearchRequest { q: &q, num: limit })
            .send()
            .await
            .map_err(|e| DoppelError::Provider(format!("search request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(DoppelError::Provider(format!("search returned {status}")));
        }

        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| DoppelError::Provider(format!("search: failed to parse response: {e}")))?;

        Ok(format_findings(&parsed, limit))
    }
}
