//! Person profiles: creation, patches, style learning, emotion history.

use super::{now_ms, Store};
use crate::style::{detect_style, detect_topics, merge_topics, CommunicationStyle, Topic};
use doppel_core::{annotation::Emotion, error::DoppelError};

/// Most recent distinct topics kept per person.
const MAX_TOPICS: usize = 5;

/// Most recent non-neutral emotions kept per person.
const MAX_EMOTIONS: usize = 10;

type PersonRow = (
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    String,
    String,
    i64,
    i64,
    i64,
    Option<String>,
    bool,
);

const PERSON_COLUMNS: &str = "contact_id, display_name, phone_number, communication_style, \
     relationship, top_topics, emotion_history, total_messages, first_seen, last_seen, \
     notes, is_important";

/// What we remember about one contact.
#[derive(Debug, Clone, PartialEq)]
pub struct PersonProfile {
    pub contact_id: String,
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub style: CommunicationStyle,
    pub relationship: String,
    pub topics: Vec<Topic>,
    pub emotion_history: Vec<Emotion>,
    pub total_messages: i64,
    pub first_seen: i64,
    pub last_seen: i64,
    pub notes: Option<String>,
    pub is_important: bool,
}

impl PersonProfile {
    fn from_row(row: PersonRow) -> Self {
        let (
            contact_id,
            display_name,
            phone_number,
            style,
            relationship,
            topics,
            emotions,
            total_messages,
            first_seen,
            last_seen,
            notes,
            is_important,
        ) = row;
        Self {
            contact_id,
            display_name,
            phone_number,
            style: CommunicationStyle::parse(&style),
            relationship,
            // Corrupt JSON degrades to an empty list rather than failing the read.
            topics: serde_json::from_str(&topics).unwrap_or_default(),
            emotion_history: serde_json::from_str(&emotions).unwrap_or_default(),
            total_messages,
            first_seen,
            last_seen,
            notes,
            is_important,
        }
    }

    /// Short profile block for the system prompt.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "- name: {}",
            self.display_name.as_deref().unwrap_or("unknown")
        )];
        lines.push(format!("- relationship: {}", self.relationship));
        lines.push(format!("- texting style: {}", self.style.as_str()));
        if !self.topics.is_empty() {
            let topics: Vec<&str> = self.topics.iter().map(|t| t.as_str()).collect();
            lines.push(format!("- talks about: {}", topics.join(", ")));
        }
        if let Some(last) = self.emotion_history.last() {
            lines.push(format!("- recent mood: {}", last.as_str()));
        }
        lines.push(format!("- messages so far: {}", self.total_messages));
        if let Some(ref notes) = self.notes {
            lines.push(format!("- notes: {notes}"));
        }
        lines.join("\n")
    }
}

/// Partial update for a person profile. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct PersonPatch {
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub relationship: Option<String>,
    pub notes: Option<String>,
    pub is_important: Option<bool>,
}

impl Store {
    /// Create the profile if missing, refreshing name/phone when provided.
    ///
    /// Returns `true` when the contact was seen for the first time.
    pub async fn touch_person(
        &self,
        contact_id: &str,
        display_name: Option<&str>,
        phone: Option<&str>,
    ) -> Result<bool, DoppelError> {
        let now = now_ms();
        let inserted = sqlx::query(
            "INSERT OR IGNORE INTO person_memory \
             (contact_id, display_name, phone_number, first_seen, last_seen) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(contact_id)
        .bind(display_name)
        .bind(phone)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("insert failed: {e}")))?;

        if inserted.rows_affected() > 0 {
            return Ok(true);
        }

        sqlx::query(
            "UPDATE person_memory SET \
             display_name = COALESCE(?, display_name), \
             phone_number = COALESCE(?, phone_number) \
             WHERE contact_id = ?",
        )
        .bind(display_name)
        .bind(phone)
        .bind(contact_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("update failed: {e}")))?;

        Ok(false)
    }

    /// Fetch a person profile.
    pub async fn get_person(&self, contact_id: &str) -> Result<Option<PersonProfile>, DoppelError> {
        let row: Option<PersonRow> = sqlx::query_as(&format!(
            "SELECT {PERSON_COLUMNS} FROM person_memory WHERE contact_id = ?"
        ))
        .bind(contact_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("query failed: {e}")))?;

        Ok(row.map(PersonProfile::from_row))
    }

    /// Apply a partial update to a profile.
    pub async fn update_person(
        &self,
        contact_id: &str,
        patch: &PersonPatch,
    ) -> Result<(), DoppelError> {
        sqlx::query(
            "UPDATE person_memory SET \
             display_name = COALESCE(?, display_name), \
             phone_number = COALESCE(?, phone_number), \
             relationship = COALESCE(?, relationship), \
             notes = COALESCE(?, notes), \
             is_important = COALESCE(?, is_important) \
             WHERE contact_id = ?",
        )
        .bind(&patch.display_name)
        .bind(&patch.phone_number)
        .bind(&patch.relationship)
        .bind(&patch.notes)
        .bind(patch.is_important)
        .bind(contact_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("update failed: {e}")))?;

        Ok(())
    }

    /// Recompute communication style from the latest text and extend the topic list.
    ///
    /// A neutral reading keeps the previously learned style.
    pub async fn learn_style(&self, contact_id: &str, text: &str) -> Result<(), DoppelError> {
        let Some(person) = self.get_person(contact_id).await? else {
            return Ok(());
        };

        let detected = detect_style(text);
        let style = if detected == CommunicationStyle::Neutral {
            person.style
        } else {
            detected
        };

        let mut topics = person.topics;
        merge_topics(&mut topics, &detect_topics(text), MAX_TOPICS);
        let topics_json = serde_json::to_string(&topics)?;

        sqlx::query(
            "UPDATE person_memory SET communication_style = ?, top_topics = ? WHERE contact_id = ?",
        )
        .bind(style.as_str())
        .bind(&topics_json)
        .bind(contact_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("update failed: {e}")))?;

        Ok(())
    }

    /// Append a non-neutral emotion to the bounded history.
    pub async fn record_emotion(
        &self,
        contact_id: &str,
        emotion: Emotion,
    ) -> Result<(), DoppelError> {
        if emotion == Emotion::Neutral {
            return Ok(());
        }
        let Some(person) = self.get_person(contact_id).await? else {
            return Ok(());
        };

        let mut history = person.emotion_history;
        history.push(emotion);
        if history.len() > MAX_EMOTIONS {
            let excess = history.len() - MAX_EMOTIONS;
            history.drain(..excess);
        }
        let history_json = serde_json::to_string(&history)?;

        sqlx::query("UPDATE person_memory SET emotion_history = ? WHERE contact_id = ?")
            .bind(&history_json)
            .bind(contact_id)
            .execute(&self.pool)
            .await
            .map_err(|e| DoppelError::Memory(format!("update failed: {e}")))?;

        Ok(())
    }

    /// Count one more message and refresh `last_seen`.
    pub(super) async fn bump_person(&self, contact_id: &str, at: i64) -> Result<(), DoppelError> {
        sqlx::query(
            "UPDATE person_memory SET total_messages = total_messages + 1, \
             last_seen = MAX(last_seen, ?) WHERE contact_id = ?",
        )
        .bind(at)
        .bind(contact_id)
        .execute(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("update failed: {e}")))?;
        Ok(())
    }
}
