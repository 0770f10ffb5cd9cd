//! Link previews: fetch a page and pull out its title and description.

use async_trait::async_trait;
use doppel_core::{error::DoppelError, traits::Lookup};
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;
use std::time::Duration;
use tracing::debug;

/// Longest description kept in a preview, in characters.
const MAX_DESCRIPTION: usize = 280;

static URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)https?://[^\s<>]+").unwrap());

/// First `http(s)://` URL in the text, with trailing punctuation trimmed.
pub fn first_url(text: &str) -> Option<&str> {
    URL_RE
        .find(text)
        .map(|m| m.as_str().trim_end_matches(['.', ',', ')', '!', '?', '"', '\'']))
}

/// Page metadata used for a preview.
#[derive(Debug, Default, PartialEq)]
pub struct PageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Extract `og:title`/`<title>` and `og:description`/`description` from HTML.
pub fn extract_meta(html: &str) -> PageMeta {
    let doc = Html::parse_document(html);

    let meta_content = |selector: &str| -> Option<String> {
        let sel = Selector::parse(selector).ok()?;
        doc.select(&sel)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|s| !s.is_empty())
    };

    let title = meta_content(r#"meta[property="og:title"]"#).or_else(|| {
        let sel = Selector::parse("title").ok()?;
        doc.select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|s| !s.is_empty())
    });

    let description = meta_content(r#"meta[property="og:description"]"#)
        .or_else(|| meta_content(r#"meta[name="description"]"#))
        .map(|d| {
            if d.chars().count() > MAX_DESCRIPTION {
                let cut: String = d.chars().take(MAX_DESCRIPTION).collect();
                format!("{}…", cut.trim_end())
            } else {
                d
            }
        });

    PageMeta { title, description }
}

/// Render a preview. `None` when the page gave us nothing to show.
pub fn format_preview(url: &str, meta: &PageMeta) -> Option<String> {
    if meta.title.is_none() && meta.description.is_none() {
        return None;
    }
    let mut out = String::new();
    if let Some(ref title) = meta.title {
        out.push_str(title);
        out.push('\n');
    }
    if let Some(ref desc) = meta.description {
        out.push_str(desc);
        out.push('\n');
    }
    out.push_str(url);
    Some(out)
}

/// Fetches pages for link previews.
pub struct LinkPreview {
    client: reqwest::Client,
    timeout: Duration,
}

impl LinkPreview {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl Lookup for LinkPreview {
    fn name(&self) -> &str {
        "link"
    }

    async fn lookup(&self, query: &str, _is_group: bool) -> Result<Option<String>, DoppelError> {
        let Some(url) = first_url(query) else {
            return Ok(None);
        };
        debug!("link: GET {url}");

        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header("User-Agent", "Mozilla/5.0 (compatible; doppel-preview/0.1)")
            .send()
            .await
            .map_err(|e| DoppelError::Provider(format!("link fetch failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(DoppelError::Provider(format!("link fetch returned {status}")));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| DoppelError::Provider(format!("link: failed to read body: {e}")))?;

        // Html is not Send; parse only after the last await.
        let meta = extract_meta(&html);
        Ok(format_preview(url, &meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_url() {
        assert_eq!(
            first_url("check this https://example.org/x"),
            Some("https://example.org/x")
        );
        assert_eq!(
            first_url("see (http://a.io/path)."),
            Some("http://a.io/path")
        );
        assert_eq!(
            first_url("look HTTPS://Example.org/A!"),
            Some("HTTPS://Example.org/A")
        );
        assert_eq!(first_url("no links here"), None);
    }

    #[test]
    fn test_extract_meta_prefers_open_graph() {
        let html = r#"<html><head>
            <title>Plain title</title>
            <meta property="og:title" content="OG  title">
            <meta property="og:description" content="An example page.">
            <meta name="description" content="Fallback">
        </head><body></body></html>"#;
        let meta = extract_meta(html);
        assert_eq!(meta.title.as_deref(), Some("OG title"));
        assert_eq!(meta.description.as_deref(), Some("An example page."));
    }

    #[test]
    fn test_extract_meta_falls_back_to_title_tag() {
        let html = r#"<html><head><title> Example Domain </title>
            <meta name="description" content="Used for docs"></head></html>"#;
        let meta = extract_meta(html);
        assert_eq!(meta.title.as_deref(), Some("Example Domain"));
        assert_eq!(meta.description.as_deref(), Some("Used for docs"));
    }

    #[test]
    fn test_extract_meta_truncates_long_description() {
        let long = "word ".repeat(200);
        let html = format!(r#"<meta name="description" content="{long}">"#);
        let desc = extract_meta(&html).description.unwrap();
        assert!(desc.ends_with('…'));
        assert!(desc.chars().count() <= MAX_DESCRIPTION + 1);
    }

    #[test]
    fn test_format_preview() {
        let meta = PageMeta {
            title: Some("Example".into()),
            description: None,
        };
        assert_eq!(
            format_preview("https://example.org/x", &meta).unwrap(),
            "Example\nhttps://example.org/x"
        );
        assert!(format_preview("https://x.io", &PageMeta::default()).is_none());
    }
}
