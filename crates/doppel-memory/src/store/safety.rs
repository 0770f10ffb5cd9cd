//! Stored safety rules, read by the outbound filter.

use super::{now_ms, Store};
use doppel_core::error::DoppelError;

/// One stored safety rule.
#[derive(Debug, Clone, PartialEq)]
pub struct SafetyRule {
    pub id: i64,
    /// "identity", "sensitive", or "commitment".
    pub rule_type: String,
    /// Case-insensitive regex pattern.
    pub pattern: String,
    pub severity: String,
    pub replacement: String,
}

impl Store {
    /// All safety rules in insertion order.
    pub async fn safety_rules(&self) -> Result<Vec<SafetyRule>, DoppelError> {
        let rows: Vec<(i64, String, String, String, String)> = sqlx::query_as(
            "SELECT id, rule_type, rule_text, severity, replacement FROM safety_rules ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("query failed: {e}")))?;

        Ok(rows
            .into_iter()
            .map(|(id, rule_type, pattern, severity, replacement)| SafetyRule {
                id,
                rule_type,
                pattern,
                severity,
                replacement,
            })
            .collect())
    }

    /// Add a safety rule. Returns its id.
    pub async fn add_safety_rule(
        &self,
        rule_type: &str,
        pattern: &str,
        severity: &str,
        replacement: &str,
    ) -> Result<i64, DoppelError> {
        let result = sqlx::query(
            "INSERT INTO safety_rules (rule_type, rule_text, severity, replacement, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(rule_type)
        .bind(pattern)
        .bind(severity)
        .bind(replacement)
        .bind(now_ms())
        .execute(&self.pool)
        .await
        .map_err(|e| DoppelError::Memory(format!("insert failed: {e}")))?;

        Ok(result.last_insert_rowid())
    }
}
