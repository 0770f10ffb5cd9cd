//! Compressed recaps of long conversation histories.

use super::Store;
use doppel_core::{error::DoppelError, traits::Summarizer};
use tracing::{debug, warn};

impl Store {
    /// Recap of everything but the most recent turns.
    ///
    /// Empty when the history is shorter than the recap threshold or when the
    /// summarizer fails. Successful recaps are cached per `(sender, history_length)`.
    pub async fn get_recap(&self, contact_id: &str, summarizer: &dyn Summarizer) -> String {
        let len = match self.history_len(contact_id).await {
            Ok(len) => len,
            Err(e) => {
                warn!("recap: failed to count history for {contact_id}: {e}");
                return String::new();
            }
        };
        if len < self.recap_threshold {
            return String::new();
        }

        let key = (contact_id.to_string(), len);
        if let Some(cached) = self.cached_recap(&key) {
            debug!("recap: cache hit for {contact_id} at {len} turns");
            return cached;
        }

        match self.compress(contact_id, len, summarizer).await {
            Ok(Some(recap)) if !recap.trim().is_empty() => {
                let recap = recap.trim().to_string();
                self.cache_recap(key, recap.clone());
                recap
            }
            Ok(_) => String::new(),
            Err(e) => {
                warn!("recap: summarization failed for {contact_id}: {e}");
                String::new()
            }
        }
    }

    async fn compress(
        &self,
        contact_id: &str,
        len: usize,
        summarizer: &dyn Summarizer,
    ) -> Result<Option<String>, DoppelError> {
        let older = len.saturating_sub(self.recap_keep_recent);
        let turns = self.oldest_turns(contact_id, older).await?;
        let entries: Vec<_> = turns.iter().map(|t| t.to_entry()).collect();
        summarizer.summarize(&entries).await
    }

    fn cached_recap(&self, key: &(String, usize)) -> Option<String> {
        self.recaps
            .lock()
            .ok()
            .and_then(|cache| cache.get(key).cloned())
    }

    fn cache_recap(&self, key: (String, usize), recap: String) {
        if let Ok(mut cache) = self.recaps.lock() {
            // Older lengths for this sender are stale now.
            cache.retain(|(sender, _), _| sender != &key.0);
            cache.insert(key, recap);
        }
    }
}
