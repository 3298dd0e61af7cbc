//! Operator settings persistence
//!
//! Small key-value store backed by SQLite. Holds the API credential the
//! operator enters through the settings endpoint; the pipeline never reads
//! it directly, it receives the resolved value per run.

use anyhow::Result;
use sqlx::SqlitePool;

/// Settings key under which the extraction API key is stored
pub const API_KEY_SETTING: &str = "api_key";

/// Repository for operator settings
pub struct SettingsStore<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SettingsStore<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Load a setting, `None` when it was never saved
    pub async fn load(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    /// Save a setting, overwriting any previous value
    pub async fn save(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?, ?, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(self.pool)
        .await?;

        Ok(())
    }
}
