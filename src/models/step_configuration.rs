//! # StepConfiguration Model
//!
//! One row per workflow step in the administrator-editable catalog.
//!
//! ## Overview
//!
//! The catalog is the single source of truth for ticket progression: step
//! ordinals, role requirements, branch restrictions, and parallel-cohort
//! membership all live here. Higher layers re-fetch it per operation
//! rather than caching, because administrators may edit it at any time.
//!
//! ## Invariant
//!
//! Ordered by `step_number`, the catalog must be contiguous starting at 1.
//! The progression algorithm relies on ordinal adjacency; renumbering on
//! delete/reorder is owned by `orchestration::StepConfigService`.
//!
//! ## Database Schema
//!
//! Maps to `perdin_step_configurations`:
//! - `id`: surrogate key (SERIAL), stable across renumbering
//! - `step_number`: dense 1..N ordinal (INTEGER, UNIQUE)
//! - `required_employee_role`: role code (VARCHAR)
//! - `is_ls_only` / `is_non_ls_only`: branch-restriction flag pair,
//!   surfaced in Rust as the [`Applicability`] variant
//! - `is_parallel` + `parallel_group`: cohort membership

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgExecutor, Row};

use super::actor::EmployeeRole;
use super::ticket::TicketBranch;

/// Branch restriction of a step, as a tagged variant instead of the raw
/// flag pair, so mutual exclusion is enforced at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Applicability {
    /// The step applies to LS and Non-LS tickets alike.
    Both,
    /// The step only exists on the LS (direct-disbursement) branch.
    LsOnly,
    /// The step only exists on the Non-LS branch.
    NonLsOnly,
}

impl Applicability {
    /// Build from the stored flag pair. Both flags set is a corrupt row.
    pub fn from_flags(is_ls_only: bool, is_non_ls_only: bool) -> Result<Self, String> {
        match (is_ls_only, is_non_ls_only) {
            (false, false) => Ok(Self::Both),
            (true, false) => Ok(Self::LsOnly),
            (false, true) => Ok(Self::NonLsOnly),
            (true, true) => Err("step cannot be both LS-only and Non-LS-only".to_string()),
        }
    }

    pub fn is_ls_only(&self) -> bool {
        matches!(self, Self::LsOnly)
    }

    pub fn is_non_ls_only(&self) -> bool {
        matches!(self, Self::NonLsOnly)
    }

    /// Whether a step with this restriction appears on the given branch.
    pub fn applies_to(&self, branch: TicketBranch) -> bool {
        match branch {
            TicketBranch::Ls => !self.is_non_ls_only(),
            TicketBranch::NonLs => !self.is_ls_only(),
        }
    }
}

/// A workflow step definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfiguration {
    pub id: i32,
    pub step_number: i32,
    pub step_name: String,
    pub description: String,
    pub required_employee_role: EmployeeRole,
    pub applicability: Applicability,
    pub is_parallel: bool,
    pub parallel_group: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StepConfiguration {
    /// The cohort label, present only for steps that are actually parallel.
    pub fn cohort_group(&self) -> Option<&str> {
        if self.is_parallel {
            self.parallel_group.as_deref()
        } else {
            None
        }
    }
}

impl<'r> FromRow<'r, PgRow> for StepConfiguration {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let is_ls_only: bool = row.try_get("is_ls_only")?;
        let is_non_ls_only: bool = row.try_get("is_non_ls_only")?;
        let applicability = Applicability::from_flags(is_ls_only, is_non_ls_only).map_err(|e| {
            sqlx::Error::ColumnDecode {
                index: "is_ls_only".to_string(),
                source: e.into(),
            }
        })?;

        let role: String = row.try_get("required_employee_role")?;
        let required_employee_role =
            role.parse::<EmployeeRole>()
                .map_err(|e| sqlx::Error::ColumnDecode {
                    index: "required_employee_role".to_string(),
                    source: e.into(),
                })?;

        Ok(Self {
            id: row.try_get("id")?,
            step_number: row.try_get("step_number")?,
            step_name: row.try_get("step_name")?,
            description: row.try_get("description")?,
            required_employee_role,
            applicability,
            is_parallel: row.try_get("is_parallel")?,
            parallel_group: row.try_get("parallel_group")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// New step definition for catalog insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStepConfiguration {
    pub step_number: i32,
    pub step_name: String,
    pub description: String,
    pub required_employee_role: EmployeeRole,
    pub applicability: Applicability,
    pub is_parallel: bool,
    pub parallel_group: Option<String>,
}

/// Full-row update, keyed by the surrogate id so renumbering cannot
/// detach it from its target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConfigurationUpdate {
    pub step_number: i32,
    pub step_name: String,
    pub description: String,
    pub required_employee_role: EmployeeRole,
    pub applicability: Applicability,
    pub is_parallel: bool,
    pub parallel_group: Option<String>,
}

const COLUMNS: &str = "id, step_number, step_name, description, required_employee_role, \
                       is_ls_only, is_non_ls_only, is_parallel, parallel_group, created_at, updated_at";

impl StepConfiguration {
    /// The full catalog, ordered by step number ascending.
    pub async fn list_all(executor: impl PgExecutor<'_>) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM perdin_step_configurations ORDER BY step_number ASC"
        ))
        .fetch_all(executor)
        .await
    }

    pub async fn find_by_step_number(
        executor: impl PgExecutor<'_>,
        step_number: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM perdin_step_configurations WHERE step_number = $1"
        ))
        .bind(step_number)
        .fetch_optional(executor)
        .await
    }

    pub async fn find_by_id(
        executor: impl PgExecutor<'_>,
        id: i32,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "SELECT {COLUMNS} FROM perdin_step_configurations WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(executor)
        .await
    }

    pub async fn create(
        executor: impl PgExecutor<'_>,
        new_step: &NewStepConfiguration,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "INSERT INTO perdin_step_configurations \
             (step_number, step_name, description, required_employee_role, \
              is_ls_only, is_non_ls_only, is_parallel, parallel_group, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW()) \
             RETURNING {COLUMNS}"
        ))
        .bind(new_step.step_number)
        .bind(&new_step.step_name)
        .bind(&new_step.description)
        .bind(new_step.required_employee_role.to_string())
        .bind(new_step.applicability.is_ls_only())
        .bind(new_step.applicability.is_non_ls_only())
        .bind(new_step.is_parallel)
        .bind(&new_step.parallel_group)
        .fetch_one(executor)
        .await
    }

    pub async fn update(
        executor: impl PgExecutor<'_>,
        id: i32,
        update: &StepConfigurationUpdate,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Self>(&format!(
            "UPDATE perdin_step_configurations \
             SET step_number = $2, step_name = $3, description = $4, required_employee_role = $5, \
                 is_ls_only = $6, is_non_ls_only = $7, is_parallel = $8, parallel_group = $9, \
                 updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        ))
        .bind(id)
        .bind(update.step_number)
        .bind(&update.step_name)
        .bind(&update.description)
        .bind(update.required_employee_role.to_string())
        .bind(update.applicability.is_ls_only())
        .bind(update.applicability.is_non_ls_only())
        .bind(update.is_parallel)
        .bind(&update.parallel_group)
        .fetch_one(executor)
        .await
    }

    pub async fn delete(executor: impl PgExecutor<'_>, id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM perdin_step_configurations WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Move a single step to a new ordinal. Used by the renumbering sweep,
    /// which shifts through negative ordinals to dodge the uniqueness
    /// constraint mid-transaction.
    pub async fn set_step_number(
        executor: impl PgExecutor<'_>,
        id: i32,
        step_number: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE perdin_step_configurations SET step_number = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(step_number)
        .execute(executor)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applicability_flags_are_mutually_exclusive() {
        assert_eq!(Applicability::from_flags(false, false), Ok(Applicability::Both));
        assert_eq!(Applicability::from_flags(true, false), Ok(Applicability::LsOnly));
        assert_eq!(Applicability::from_flags(false, true), Ok(Applicability::NonLsOnly));
        assert!(Applicability::from_flags(true, true).is_err());
    }

    #[test]
    fn applicability_filters_branches() {
        assert!(Applicability::Both.applies_to(TicketBranch::Ls));
        assert!(Applicability::Both.applies_to(TicketBranch::NonLs));
        assert!(Applicability::LsOnly.applies_to(TicketBranch::Ls));
        assert!(!Applicability::LsOnly.applies_to(TicketBranch::NonLs));
        assert!(!Applicability::NonLsOnly.applies_to(TicketBranch::Ls));
        assert!(Applicability::NonLsOnly.applies_to(TicketBranch::NonLs));
    }

    #[test]
    fn cohort_group_requires_parallel_flag() {
        let step = StepConfiguration {
            id: 1,
            step_number: 1,
            step_name: "Verifikator".to_string(),
            description: String::new(),
            required_employee_role: EmployeeRole::Ver,
            applicability: Applicability::Both,
            is_parallel: false,
            parallel_group: Some("A".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(step.cohort_group(), None);

        let parallel = StepConfiguration {
            is_parallel: true,
            ..step
        };
        assert_eq!(parallel.cohort_group(), Some("A"));
    }
}
