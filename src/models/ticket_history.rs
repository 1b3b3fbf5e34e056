//! # TicketHistory Model
//!
//! Append-only record that a step was processed for a ticket: by whom,
//! when, with which artifact and notes. At most one row may exist per
//! (ticket, step_number) - the idempotency invariant - enforced both by
//! the state machine and by a unique constraint as a backstop.
//!
//! `processor_name` is a deliberate denormalized snapshot of the actor's
//! display name at processing time; it is never re-derived, so historical
//! attribution survives later changes to the user record.
//!
//! Rows are deleted in exactly one case: a "return to previous step"
//! correction retracts the most recently created row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor};
use uuid::Uuid;

/// One processed-step record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TicketHistory {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub step_number: i32,
    pub processed_by_id: Uuid,
    pub processor_name: String,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub notes: Option<String>,
    pub processed_at: DateTime<Utc>,
}

/// New history row; `processed_at` is stamped at insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTicketHistory {
    pub ticket_id: Uuid,
    pub step_number: i32,
    pub processed_by_id: Uuid,
    pub processor_name: String,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub notes: Option<String>,
}

impl TicketHistory {
    /// Whether this row is a return-correction marker rather than a real
    /// processing record. Marker rows document why a step must be redone
    /// and are replaced when the redo happens.
    pub fn is_return_marker(&self) -> bool {
        self.notes
            .as_deref()
            .and_then(crate::constants::notes::parse_return_note)
            .is_some()
    }
}

const COLUMNS: &str = "id, ticket_id, step_number, processed_by_id, processor_name, \
                       file_url, file_name, notes, processed_at";

impl TicketHistory {
    /// All rows for a ticket, ordered by step number ascending.
    pub async fn list_for_ticket(
        executor: impl PgExecutor<'_>,
        ticket_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM perdin_ticket_histories WHERE ticket_id = $1 \
             ORDER BY step_number ASC"
        ))
        .bind(ticket_id)
        .fetch_all(executor)
        .await
    }

    pub async fn create(
        executor: impl PgExecutor<'_>,
        new_row: &NewTicketHistory,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO perdin_ticket_histories \
             (id, ticket_id, step_number, processed_by_id, processor_name, file_url, file_name, \
              notes, processed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW()) \
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(new_row.ticket_id)
        .bind(new_row.step_number)
        .bind(new_row.processed_by_id)
        .bind(&new_row.processor_name)
        .bind(&new_row.file_url)
        .bind(&new_row.file_name)
        .bind(&new_row.notes)
        .fetch_one(executor)
        .await
    }

    pub async fn delete(executor: impl PgExecutor<'_>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM perdin_ticket_histories WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count rows for a ticket whose step number is in the given set;
    /// drives the parallel-cohort advance check.
    pub async fn count_for_steps(
        executor: impl PgExecutor<'_>,
        ticket_id: Uuid,
        step_numbers: &[i32],
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM perdin_ticket_histories \
             WHERE ticket_id = $1 AND step_number = ANY($2)",
        )
        .bind(ticket_id)
        .bind(step_numbers)
        .fetch_one(executor)
        .await?;
        Ok(count)
    }
}
