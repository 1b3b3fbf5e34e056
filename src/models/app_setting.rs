//! Generic key/value application settings (letter-number templates and the
//! like). The workflow core stores and returns these verbatim; it never
//! interprets the values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct AppSetting {
    pub key: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

impl AppSetting {
    pub async fn find(
        executor: impl PgExecutor<'_>,
        key: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "SELECT key, value, updated_at FROM perdin_app_settings WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(executor)
        .await
    }

    pub async fn all(executor: impl PgExecutor<'_>) -> Result<HashMap<String, String>, sqlx::Error> {
        let rows: Vec<Self> =
            sqlx::query_as("SELECT key, value, updated_at FROM perdin_app_settings")
                .fetch_all(executor)
                .await?;
        Ok(rows.into_iter().map(|s| (s.key, s.value)).collect())
    }

    pub async fn upsert(
        executor: impl PgExecutor<'_>,
        key: &str,
        value: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(
            "INSERT INTO perdin_app_settings (key, value, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, updated_at = NOW() \
             RETURNING key, value, updated_at",
        )
        .bind(key)
        .bind(value)
        .fetch_one(executor)
        .await
    }
}
