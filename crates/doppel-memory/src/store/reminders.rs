//! Reminder CRUD and due-reminder polling.

use super::{now_ms, Store};
use doppel_core::error::DoppelError;

type ReminderRow = (i64, String, String, String, String, i64);

/// A pending or delivered reminder.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: i64,
    pub channel: String,
    pub contact_id: String,
    pub chat_id: String,
    pub text: String,
    /// Epoch milliseconds.
    pub due_at: i64,
}

impl Reminder {
    fn from_row(row: ReminderRow) -> Self {
        let (id, channel, contact_id, chat_id, text, due_at) = row;
        Self {
            id,
            channel,
            contact_id,
            chat_id,
            text,
            due_at,
        }
    }
}

impl Store {
    /// Schedule a reminder. Returns its id.
    pub async fn create_reminder(
        &self,
        channel: &str,
        contact_id: &str,
        chat_id: &str,
        text: &str,
        due_at: i64,
    ) -> Result<i64, DoppelError> {
        let result = sqlx::query(
            "INSERT INTO reminders (channel, contact_id, chat_id, text, due_at, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(channel)
        .bind(contact_id)
        .bind(chat_id)
        .bind(text)
        .bind(due_at)
        .bind(now_ms())
        .execute(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("insert failed: {e}")))?;

        Ok(result.last_insert_rowid())
    }

    /// Pending reminders for a contact, soonest first.
    pub async fn pending_reminders(&self, contact_id: &str) -> Result<Vec<Reminder>, DoppelError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(
            "SELECT id, channel, contact_id, chat_id, text, due_at FROM reminders \
             WHERE contact_id = ? AND status = 'pending' ORDER BY due_at, id",
        )
        .bind(contact_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("query failed: {e}")))?;

        Ok(rows.into_iter().map(Reminder::from_row).collect())
    }

    /// Cancel the pending reminder at 1-based `position`.
    pub async fn cancel_reminder(
        &self,
        contact_id: &str,
        position: usize,
    ) -> Result<Option<Reminder>, DoppelError> {
        if position == 0 {
            return Ok(None);
        }
        let Some(reminder) = self
            .pending_reminders(contact_id)
            .await?
            .into_iter()
            .nth(position - 1)
        else {
            return Ok(None);
        };

        sqlx::query("UPDATE reminders SET status = 'cancelled' WHERE id = ?")
            .bind(reminder.id)
            .execute(&self.pool)
            .await
            .map_err(|e| DoppelError::Memory(format!("update failed: {e}")))?;

        Ok(Some(reminder))
    }

    /// Pending reminders whose due time has passed.
    pub async fn due_reminders(&self, now: i64) -> Result<Vec<Reminder>, DoppelError> {
        let rows: Vec<ReminderRow> = sqlx::query_as(
            "SELECT id, channel, contact_id, chat_id, text, due_at FROM reminders \
             WHERE status = 'pending' AND due_at <= ? ORDER BY due_at, id",
        )
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("query failed: {e}")))?;

        Ok(rows.into_iter().map(Reminder::from_row).collect())
    }

    /// Mark a reminder as delivered.
    pub async fn mark_reminder_delivered(&self, id: i64) -> Result<(), DoppelError> {
        sqlx::query("UPDATE reminders SET status = 'delivered' WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| DoppelError::Memory(format!("update failed: {e}")))?;
        Ok(())
    }
}
