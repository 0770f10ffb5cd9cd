//! Conversation log: turn storage, history windows, retention, stats.

use super::{now_ms, Store};
use doppel_core::{
    annotation::Annotations, context::ContextEntry, error::DoppelError,
};

type TurnRow = (i64, String, String, String, Option<String>, Option<String>, i64, bool);

/// One stored turn of a conversation.
#[derive(Debug, Clone, PartialEq)]
pub struct Turn {
    pub id: i64,
    pub contact_id: String,
    pub role: String,
    pub content: String,
    pub emotion: Option<String>,
    pub intent: Option<String>,
    pub timestamp: i64,
    pub is_group: bool,
}

impl Turn {
    fn from_row(row: TurnRow) -> Self {
        let (id, contact_id, role, content, emotion, intent, timestamp, is_group) = row;
        Self {
            id,
            contact_id,
            role,
            content,
            emotion,
            intent,
            timestamp,
            is_group,
        }
    }

    pub fn to_entry(&self) -> ContextEntry {
        ContextEntry {
            role: self.role.clone(),
            content: self.content.clone(),
        }
    }
}

/// Aggregate counts for `/status` and `/stats`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    pub contacts: i64,
    pub turns: i64,
    pub turns_today: i64,
    pub db_size: u64,
}

impl Store {
    /// Record a user turn with its annotations.
    pub async fn put_user_turn(
        &self,
        contact_id: &str,
        text: &str,
        annotations: &Annotations,
        is_group: bool,
    ) -> Result<i64, DoppelError> {
        self.insert_turn(
            contact_id,
            "user",
            text,
            Some(annotations.emotion.as_str()),
            Some(annotations.intent.as_str()),
            is_group,
        )
        .await
    }

    /// Record an assistant turn.
    pub async fn put_assistant_turn(
        &self,
        contact_id: &str,
        text: &str,
        is_group: bool,
    ) -> Result<i64, DoppelError> {
        self.insert_turn(contact_id, "assistant", text, None, None, is_group)
            .await
    }

    async fn insert_turn(
        &self,
        contact_id: &str,
        role: &str,
        content: &str,
        emotion: Option<&str>,
        intent: Option<&str>,
        is_group: bool,
    ) -> Result<i64, DoppelError> {
        let at = now_ms();
        let result = sqlx::query(
            "INSERT INTO conversation_log \
             (contact_id, role, content, emotion, intent, timestamp, is_group) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(contact_id)
        .bind(role)
        .bind(content)
        .bind(emotion)
        .bind(intent)
        .bind(at)
        .bind(is_group)
        .execute(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("insert failed: {e}")))?;

        self.bump_person(contact_id, at).await?;
        Ok(result.last_insert_rowid())
    }

    /// The most recent `limit` turns for a contact, oldest first.
    pub async fn recent_turns(
        &self,
        contact_id: &str,
        limit: usize,
    ) -> Result<Vec<Turn>, DoppelError> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            "SELECT id, contact_id, role, content, emotion, intent, timestamp, is_group \
             FROM conversation_log WHERE contact_id = ? \
             ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(contact_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("query failed: {e}")))?;

        // Rows come newest-first, reverse for chronological order.
        Ok(rows.into_iter().rev().map(Turn::from_row).collect())
    }

    /// Number of stored turns for a contact.
    pub async fn history_len(&self, contact_id: &str) -> Result<usize, DoppelError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM conversation_log WHERE contact_id = ?")
                .bind(contact_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DoppelError::Memory(format!("query failed: {e}")))?;
        Ok(count as usize)
    }

    /// The oldest `limit` turns for a contact, oldest first.
    pub(super) async fn oldest_turns(
        &self,
        contact_id: &str,
        limit: usize,
    ) -> Result<Vec<Turn>, DoppelError> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            "SELECT id, contact_id, role, content, emotion, intent, timestamp, is_group \
             FROM conversation_log WHERE contact_id = ? \
             ORDER BY timestamp ASC, id ASC LIMIT ?",
        )
        .bind(contact_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("query failed: {e}")))?;

        Ok(rows.into_iter().map(Turn::from_row).collect())
    }

    /// Delete turns older than the retention window. Returns rows removed.
    pub async fn prune_older_than(&self, days: i64) -> Result<u64, DoppelError> {
        let cutoff = now_ms() - days * 24 * 60 * 60 * 1000;
        let result = sqlx::query("DELETE FROM conversation_log WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| DoppelError::Memory(format!("delete failed: {e}")))?;
        Ok(result.rows_affected())
    }

    /// Aggregate counts across all contacts.
    pub async fn stats(&self, since_ms: i64) -> Result<MemoryStats, DoppelError> {
        let (contacts,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM person_memory")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DoppelError::Memory(format!("query failed: {e}")))?;

        let (turns,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversation_log")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DoppelError::Memory(format!("query failed: {e}")))?;

        let (turns_today,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM conversation_log WHERE timestamp >= ?")
                .bind(since_ms)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| DoppelError::Memory(format!("query failed: {e}")))?;

        let db_size = self.db_size().await.unwrap_or(0);

        Ok(MemoryStats {
            contacts,
            turns,
            turns_today,
            db_size,
        })
    }

    /// Per-contact inbound message counts since a timestamp, busiest first.
    pub async fn digest(
        &self,
        since_ms: i64,
        limit: i64,
    ) -> Result<Vec<(String, Option<String>, i64)>, DoppelError> {
        let rows: Vec<(String, Option<String>, i64)> = sqlx::query_as(
            "SELECT c.contact_id, p.display_name, COUNT(*) AS n \
             FROM conversation_log c \
             LEFT JOIN person_memory p ON p.contact_id = c.contact_id \
             WHERE c.role = 'user' AND c.timestamp >= ? \
             GROUP BY c.contact_id ORDER BY n DESC LIMIT ?",
        )
        .bind(since_ms)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("query failed: {e}")))?;

        Ok(rows)
    }
}
