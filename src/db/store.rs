use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;

use super::KvStore;
use crate::error::{BotError, Result};

/// Persistent key-value storage using SQLite
#[derive(Clone)]
pub struct SqlKvStore {
    pool: SqlitePool,
}

impl SqlKvStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl KvStore for SqlKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BotError::DatabaseError(format!("Failed to read key {}: {}", key, e)))?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, updated_at)
            VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| BotError::DatabaseError(format!("Failed to write key {}: {}", key, e)))?;

        Ok(())
    }
}
