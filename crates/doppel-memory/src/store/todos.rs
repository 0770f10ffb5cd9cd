//! Per-contact todo lists. Items are addressed by 1-based position.

use super::{now_ms, Store};
use doppel_core::error::DoppelError;

#[derive(Debug, Clone, PartialEq)]
pub struct TodoItem {
    pub id: i64,
    pub text: String,
    pub done: bool,
}

impl Store {
    /// Add a todo item. Returns its position in the list.
    pub async fn add_todo(&self, contact_id: &str, text: &str) -> Result<usize, DoppelError> {
        sqlx::query("INSERT INTO todos (contact_id, text, created_at) VALUES (?, ?, ?)")
            .bind(contact_id)
            .bind(text)
            .bind(now_ms())
            .execute(&self.pool)
            .await
            .map_err(|e| DoppelError::Memory(format!("insert failed: {e}")))?;

        Ok(self.list_todos(contact_id).await?.len())
    }

    /// All todo items for a contact, oldest first.
    pub async fn list_todos(&self, contact_id: &str) -> Result<Vec<TodoItem>, DoppelError> {
        let rows: Vec<(i64, String, bool)> =
            sqlx::query_as("SELECT id, text, done FROM todos WHERE contact_id = ? ORDER BY id")
                .bind(contact_id)
                .fetch_all(&self.pool)
                .await
                .map_err(|e| DoppelError::Memory(format!("query failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(id, text, done)| TodoItem { id, text, done })
            .collect())
    }

    /// Mark the item at `position` done. Returns the item if it existed.
    pub async fn complete_todo(
        &self,
        contact_id: &str,
        position: usize,
    ) -> Result<Option<TodoItem>, DoppelError> {
        let Some(item) = self.todo_at(contact_id, position).await? else {
            return Ok(None);
        };
        sqlx::query("UPDATE todos SET done = 1, completed_at = ? WHERE id = ?")
            .bind(now_ms())
            .bind(item.id)
            .execute(&self.pool)
            .await
            .map_err(|e| DoppelError::Memory(format!("update failed: {e}")))?;
        Ok(Some(TodoItem { done: true, ..item }))
    }

    /// Delete the item at `position`. Returns the removed item if it existed.
    pub async fn delete_todo(
        &self,
        contact_id: &str,
        position: usize,
    ) -> Result<Option<TodoItem>, DoppelError> {
        let Some(item) = self.todo_at(contact_id, position).await? else {
            return Ok(None);
        };
        sqlx::query("DELETE FROM todos WHERE id = ?")
            .bind(item.id)
            .execute(&self.pool)
            .await
            .map_err(|e| DoppelError::Memory(format!("delete failed: {e}")))?;
        Ok(Some(item))
    }

    async fn todo_at(
        &self,
        contact_id: &str,
        position: usize,
    ) -> Result<Option<TodoItem>, DoppelError> {
        if position == 0 {
            return Ok(None);
        }
        Ok(self
            .list_todos(contact_id)
            .await?
            .into_iter()
            .nth(position - 1))
    }
}
