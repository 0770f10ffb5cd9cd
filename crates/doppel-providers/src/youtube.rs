//! Video recommendations via the YouTube Data API v3 search endpoint.

use async_trait::async_trait;
use doppel_core::{config::YouTubeConfig, error::DoppelError, traits::Lookup};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const YOUTUBE_SEARCH_URL: &str = "https://www.googleapis.com/youtube/v3/search";

/// YouTube video lookup.
pub struct YouTubeSearch {
    client: reqwest::Client,
    api_key: String,
    max_results: usize,
    timeout: Duration,
}

impl YouTubeSearch {
    pub fn from_config(config: &YouTubeConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            max_results: config.max_results.max(1),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: ItemId,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
}

/// Strip the video trigger words, leaving the topic.
pub fn clean_query(text: &str) -> String {
    const FILLER: &[&str] = &[
        "youtube", "yt", "video", "videos", "recommend", "suggest", "a", "some", "me", "on",
        "for", "about", "please", "pls", "@bot", "any", "good",
    ];
    text.split_whitespace()
        .filter(|w| {
            let word = w.to_lowercase();
            let word = word.trim_matches(|c: char| !c.is_alphanumeric() && c != '@');
            !FILLER.contains(&word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_findings(resp: &SearchListResponse, limit: usize) -> Option<String> {
    let lines: Vec<String> = resp
        .items
        .iter()
        .filter_map(|item| {
            let id = item.id.video_id.as_deref()?;
            let snippet = item.snippet.as_ref()?;
            Some(format!(
                "{} ({})\n   https://www.youtube.com/watch?v={id}",
                snippet.title, snippet.channel_title
            ))
        })
        .take(limit)
        .enumerate()
        .map(|(i, line)| format!("{}. {line}", i + 1))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

#[async_trait]
impl Lookup for YouTubeSearch {
    fn name(&self) -> &str {
        "youtube"
    }

    async fn lookup(&self, query: &str, is_group: bool) -> Result<Option<String>, DoppelError> {
        if self.api_key.is_empty() {
            return Err(DoppelError::Provider("youtube: no api key configured".into()));
        }
        let q = clean_query(query);
        if q.is_empty() {
            return Ok(None);
        }
        let limit = if is_group {
            self.max_results.min(2)
        } else {
            self.max_results
        };
        debug!("youtube: search q={q}");

        let max = limit.to_string();
        let resp = self
            .client
            .get(YOUTUBE_SEARCH_URL)
            .timeout(self.timeout)
            .query(&[
                ("part", "snippet"),
                ("type", "video"),
                ("maxResults", max.as_str()),
                ("q", q.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await
            .map_err(|e| DoppelError::Provider(format!("youtube request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(DoppelError::Provider(format!("youtube returned {status}")));
        }

        let parsed: SearchListResponse = resp.json().await.map_err(|e| {
            DoppelError::Provider(format!("youtube: failed to parse response: {e}"))
        })?;

        Ok(format_findings(&parsed, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_query() {
        assert_eq!(clean_query("recommend a youtube video on rust"), "rust");
        assert_eq!(clean_query("yt chess openings"), "chess openings");
    }

    #[test]
    fn test_format_findings() {
        let json = r#"{"items": [
            {"id": {"kind": "youtube#video", "videoId": "abc123"},
             "snippet": {"title": "Rust in 100 seconds", "channelTitle": "Fireship"}},
            {"id": {"kind": "youtube#channel"}, "snippet": {"title": "A channel", "channelTitle": "X"}}
        ]}"#;
        let resp: SearchListResponse = serde_json::from_str(json).unwrap();
        let findings = format_findings(&resp, 3).unwrap();
        assert!(findings.contains("https://www.youtube.com/watch?v=abc123"));
        assert!(findings.contains("Fireship"));
        assert!(!findings.contains("A channel"));
    }

    #[test]
    fn test_format_findings_empty() {
        let resp: SearchListResponse = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert!(format_findings(&resp, 3).is_none());
    }
}
