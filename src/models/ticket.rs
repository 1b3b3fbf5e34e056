//! # Ticket Model
//!
//! One reimbursement case ("Perjalanan Dinas") moving through the step
//! catalog.
//!
//! ## Overview
//!
//! A ticket carries its branch selector (`is_ls`), the `current_step`
//! pointer into the step-ordinal space, and a status that is kept in
//! lockstep with the pointer by the state machine - the status column is
//! never written outside a transition decision.
//!
//! ## Ticket numbers
//!
//! Generated as `PD-{year}{seq:02}` where the year comes from
//! `start_date` and the sequence is scoped per year, derived from the
//! highest existing number with that year prefix.
//!
//! ## Database Schema
//!
//! Maps to `perdin_tickets`:
//! - `id`: UUID primary key
//! - `ticket_number`: VARCHAR, UNIQUE
//! - `current_step`: INTEGER pointer; `> max applicable` means finished
//! - `status`: VARCHAR (`pending | in_progress | completed`)
//! - `assigned_executor_id_1/2`: optional executor pair for the signing step

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::constants::{TicketStatus, TICKET_NUMBER_PREFIX};

use super::ticket_history::TicketHistory;

/// The two step-catalog branches a ticket can traverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketBranch {
    /// "Langsung" - direct disbursement.
    Ls,
    NonLs,
}

impl TicketBranch {
    pub fn from_is_ls(is_ls: bool) -> Self {
        if is_ls {
            Self::Ls
        } else {
            Self::NonLs
        }
    }
}

/// A reimbursement ticket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Ticket {
    pub id: Uuid,
    pub ticket_number: String,
    pub activity_name: String,
    pub assignment_letter_number: String,
    pub uraian: Option<String>,
    pub start_date: DateTime<Utc>,
    pub is_ls: bool,
    pub current_step: i32,
    #[sqlx(try_from = "String")]
    pub status: TicketStatus,
    pub assigned_executor_id_1: Option<Uuid>,
    pub assigned_executor_id_2: Option<Uuid>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn branch(&self) -> TicketBranch {
        TicketBranch::from_is_ls(self.is_ls)
    }

    /// Whether the signing step of this ticket is restricted to named
    /// executors.
    pub fn has_assigned_executors(&self) -> bool {
        self.assigned_executor_id_1.is_some() || self.assigned_executor_id_2.is_some()
    }

    pub fn is_assigned_executor(&self, user_id: Uuid) -> bool {
        self.assigned_executor_id_1 == Some(user_id)
            || self.assigned_executor_id_2 == Some(user_id)
    }
}

/// New ticket for creation; number, step pointer, and status are decided
/// by the orchestration layer before insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTicket {
    pub ticket_number: String,
    pub activity_name: String,
    pub assignment_letter_number: String,
    pub uraian: Option<String>,
    pub start_date: DateTime<Utc>,
    pub is_ls: bool,
    pub current_step: i32,
    pub status: TicketStatus,
    pub assigned_executor_id_1: Option<Uuid>,
    pub assigned_executor_id_2: Option<Uuid>,
    pub created_by_id: Uuid,
}

/// Progress patch applied when a transition decision commits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TicketPatch {
    pub current_step: i32,
    pub status: TicketStatus,
}

/// Filter for ticket listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketFilter {
    pub status: Option<TicketStatus>,
    pub exclude_completed: bool,
    /// Only tickets with at least one history row by this user.
    pub processed_by: Option<Uuid>,
}

/// A ticket together with its history rows, ordered by step number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketWithHistories {
    pub ticket: Ticket,
    pub histories: Vec<TicketHistory>,
}

/// Dashboard counts per status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TicketCounts {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
}

/// Derive the next ticket number for a year from the highest existing
/// number carrying that year prefix. The sequence is zero-padded to two
/// digits and keeps counting past 99 (`PD-2025100`).
pub fn next_ticket_number(year: i32, latest: Option<&str>) -> String {
    let prefix = format!("{TICKET_NUMBER_PREFIX}-{year}");
    let next = latest
        .and_then(|number| number.strip_prefix(prefix.as_str()))
        .and_then(|seq| seq.parse::<u32>().ok())
        .map_or(1, |seq| seq + 1);
    format!("{prefix}{next:02}")
}

/// Year component of the number scheme, taken from the ticket start date.
pub fn ticket_number_year(start_date: DateTime<Utc>) -> i32 {
    start_date.year()
}

const COLUMNS: &str = "id, ticket_number, activity_name, assignment_letter_number, uraian, \
                       start_date, is_ls, current_step, status, assigned_executor_id_1, \
                       assigned_executor_id_2, created_by_id, created_at, updated_at";

impl Ticket {
    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!("SELECT {COLUMNS} FROM perdin_tickets WHERE id = $1"))
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// Row-locked read used inside transition transactions; serializes
    /// concurrent processing of the same ticket.
    pub async fn find_by_id_for_update(
        executor: impl PgExecutor<'_>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM perdin_tickets WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn create(
        executor: impl PgExecutor<'_>,
        new_ticket: &NewTicket,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO perdin_tickets \
             (id, ticket_number, activity_name, assignment_letter_number, uraian, start_date, \
              is_ls, current_step, status, assigned_executor_id_1, assigned_executor_id_2, \
              created_by_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, NOW(), NOW()) \
             RETURNING {COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&new_ticket.ticket_number)
        .bind(&new_ticket.activity_name)
        .bind(&new_ticket.assignment_letter_number)
        .bind(&new_ticket.uraian)
        .bind(new_ticket.start_date)
        .bind(new_ticket.is_ls)
        .bind(new_ticket.current_step)
        .bind(new_ticket.status.to_string())
        .bind(new_ticket.assigned_executor_id_1)
        .bind(new_ticket.assigned_executor_id_2)
        .bind(new_ticket.created_by_id)
        .fetch_one(executor)
        .await
    }

    /// Apply a transition decision's progress patch.
    pub async fn update_progress(
        executor: impl PgExecutor<'_>,
        id: Uuid,
        patch: TicketPatch,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "UPDATE perdin_tickets SET current_step = $2, status = $3, updated_at = NOW() \
             WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(patch.current_step)
        .bind(patch.status.to_string())
        .fetch_one(executor)
        .await
    }

    /// Histories are removed by the `ON DELETE CASCADE` constraint.
    pub async fn delete(executor: impl PgExecutor<'_>, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM perdin_tickets WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Filtered listing, newest first.
    pub async fn list(
        executor: impl PgExecutor<'_>,
        filter: &TicketFilter,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {COLUMNS} FROM perdin_tickets WHERE TRUE"));

        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.to_string());
        }
        if filter.exclude_completed {
            builder
                .push(" AND status <> ")
                .push_bind(TicketStatus::Completed.to_string());
        }
        if let Some(user_id) = filter.processed_by {
            builder
                .push(" AND EXISTS (SELECT 1 FROM perdin_ticket_histories h WHERE h.ticket_id = perdin_tickets.id AND h.processed_by_id = ")
                .push_bind(user_id)
                .push(")");
        }
        builder.push(" ORDER BY created_at DESC");

        builder.build_query_as::<Self>().fetch_all(executor).await
    }

    /// Highest existing ticket number for a year, by lexicographic order
    /// of the zero-padded sequence.
    pub async fn latest_number_for_year(
        executor: impl PgExecutor<'_>,
        year: i32,
    ) -> Result<Option<String>, sqlx::Error> {
        let pattern = format!("{TICKET_NUMBER_PREFIX}-{year}%");
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT ticket_number FROM perdin_tickets WHERE ticket_number LIKE $1 \
             ORDER BY ticket_number DESC LIMIT 1",
        )
        .bind(pattern)
        .fetch_optional(executor)
        .await?;
        Ok(row.map(|(number,)| number))
    }

    pub async fn counts(executor: impl PgExecutor<'_>) -> Result<TicketCounts, sqlx::Error> {
        sqlx::query_as::<_, TicketCounts>(
            "SELECT COUNT(*) AS total, \
                    COUNT(*) FILTER (WHERE status = 'pending') AS pending, \
                    COUNT(*) FILTER (WHERE status = 'in_progress') AS in_progress, \
                    COUNT(*) FILTER (WHERE status = 'completed') AS completed \
             FROM perdin_tickets",
        )
        .fetch_one(executor)
        .await
    }
}
