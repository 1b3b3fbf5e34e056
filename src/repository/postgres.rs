//! PostgreSQL implementation of the repository contracts.
//!
//! Thin over the model layer: models own their SQL, this module owns
//! pooling, transactions, and the translation of constraint violations
//! into workflow errors. `SELECT ... FOR UPDATE` on the ticket row is the
//! single concurrency control; see `state_machine` for why decisions are
//! made strictly after that lock is held.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::config::PerdinConfig;
use crate::models::ticket::TicketCounts;
use crate::models::{
    AppSetting, NewStepConfiguration, NewTicket, NewTicketHistory, StepConfiguration,
    StepConfigurationUpdate, Ticket, TicketFilter, TicketHistory, TicketPatch,
    TicketWithHistories,
};
use crate::state_machine::{WorkflowError, WorkflowResult};

use super::{TicketRepository, TicketTx};

#[derive(Debug, Clone)]
pub struct PgTicketRepository {
    pool: PgPool,
}

impl PgTicketRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect a pool according to the runtime configuration.
    pub async fn connect(config: &PerdinConfig) -> WorkflowResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema migrations.
    pub async fn migrate(&self) -> WorkflowResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| WorkflowError::Internal(format!("migration failed: {e}")))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub struct PgTicketTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl TicketRepository for PgTicketRepository {
    type Tx = PgTicketTx;

    async fn begin(&self) -> WorkflowResult<Self::Tx> {
        let tx = self.pool.begin().await?;
        Ok(PgTicketTx { tx })
    }

    async fn get_ticket(&self, id: Uuid) -> WorkflowResult<Option<TicketWithHistories>> {
        let Some(ticket) = Ticket::find_by_id(&self.pool, id).await? else {
            return Ok(None);
        };
        let histories = TicketHistory::list_for_ticket(&self.pool, id).await?;
        Ok(Some(TicketWithHistories { ticket, histories }))
    }

    async fn list_tickets(
        &self,
        filter: &TicketFilter,
    ) -> WorkflowResult<Vec<TicketWithHistories>> {
        let tickets = Ticket::list(&self.pool, filter).await?;
        let mut result = Vec::with_capacity(tickets.len());
        for ticket in tickets {
            let histories = TicketHistory::list_for_ticket(&self.pool, ticket.id).await?;
            result.push(TicketWithHistories { ticket, histories });
        }
        Ok(result)
    }

    async fn delete_ticket(&self, id: Uuid) -> WorkflowResult<bool> {
        Ok(Ticket::delete(&self.pool, id).await?)
    }

    async fn list_step_configurations(&self) -> WorkflowResult<Vec<StepConfiguration>> {
        Ok(StepConfiguration::list_all(&self.pool).await?)
    }

    async fn get_step_configuration(
        &self,
        step_number: i32,
    ) -> WorkflowResult<Option<StepConfiguration>> {
        Ok(StepConfiguration::find_by_step_number(&self.pool, step_number).await?)
    }

    async fn ticket_counts(&self) -> WorkflowResult<TicketCounts> {
        Ok(Ticket::counts(&self.pool).await?)
    }

    async fn get_setting(&self, key: &str) -> WorkflowResult<Option<AppSetting>> {
        Ok(AppSetting::find(&self.pool, key).await?)
    }

    async fn all_settings(&self) -> WorkflowResult<HashMap<String, String>> {
        Ok(AppSetting::all(&self.pool).await?)
    }

    async fn put_setting(&self, key: &str, value: &str) -> WorkflowResult<AppSetting> {
        Ok(AppSetting::upsert(&self.pool, key, value).await?)
    }
}

#[async_trait]
impl TicketTx for PgTicketTx {
    async fn ticket_for_update(&mut self, id: Uuid) -> WorkflowResult<Option<Ticket>> {
        Ok(Ticket::find_by_id_for_update(&mut *self.tx, id).await?)
    }

    async fn histories(&mut self, ticket_id: Uuid) -> WorkflowResult<Vec<TicketHistory>> {
        Ok(TicketHistory::list_for_ticket(&mut *self.tx, ticket_id).await?)
    }

    async fn count_history(
        &mut self,
        ticket_id: Uuid,
        step_numbers: &[i32],
    ) -> WorkflowResult<i64> {
        Ok(TicketHistory::count_for_steps(&mut *self.tx, ticket_id, step_numbers).await?)
    }

    async fn list_step_configurations(&mut self) -> WorkflowResult<Vec<StepConfiguration>> {
        Ok(StepConfiguration::list_all(&mut *self.tx).await?)
    }

    async fn latest_ticket_number(&mut self, year: i32) -> WorkflowResult<Option<String>> {
        Ok(Ticket::latest_number_for_year(&mut *self.tx, year).await?)
    }

    async fn insert_ticket(&mut self, new_ticket: &NewTicket) -> WorkflowResult<Ticket> {
        Ok(Ticket::create(&mut *self.tx, new_ticket).await?)
    }

    async fn insert_history(
        &mut self,
        new_row: &NewTicketHistory,
    ) -> WorkflowResult<TicketHistory> {
        TicketHistory::create(&mut *self.tx, new_row).await.map_err(|e| {
            // Constraint backstop for the idempotency invariant when a
            // concurrent writer slipped in between lock acquisitions.
            if unique_violation(&e) {
                WorkflowError::AlreadyProcessed {
                    ticket: new_row.ticket_id.to_string(),
                    step_number: new_row.step_number,
                }
            } else {
                WorkflowError::Database(e)
            }
        })
    }

    async fn delete_history(&mut self, id: Uuid) -> WorkflowResult<()> {
        if TicketHistory::delete(&mut *self.tx, id).await? {
            Ok(())
        } else {
            Err(WorkflowError::HistoryNotFound(id))
        }
    }

    async fn update_ticket(&mut self, id: Uuid, patch: TicketPatch) -> WorkflowResult<Ticket> {
        Ok(Ticket::update_progress(&mut *self.tx, id, patch).await?)
    }

    async fn find_step_by_id(&mut self, id: i32) -> WorkflowResult<Option<StepConfiguration>> {
        Ok(StepConfiguration::find_by_id(&mut *self.tx, id).await?)
    }

    async fn find_step_by_number(
        &mut self,
        step_number: i32,
    ) -> WorkflowResult<Option<StepConfiguration>> {
        Ok(StepConfiguration::find_by_step_number(&mut *self.tx, step_number).await?)
    }

    async fn insert_step(
        &mut self,
        new_step: &NewStepConfiguration,
    ) -> WorkflowResult<StepConfiguration> {
        Ok(StepConfiguration::create(&mut *self.tx, new_step).await?)
    }

    async fn update_step(
        &mut self,
        id: i32,
        update: &StepConfigurationUpdate,
    ) -> WorkflowResult<StepConfiguration> {
        Ok(StepConfiguration::update(&mut *self.tx, id, update).await?)
    }

    async fn delete_step(&mut self, id: i32) -> WorkflowResult<bool> {
        Ok(StepConfiguration::delete(&mut *self.tx, id).await?)
    }

    async fn set_step_number(&mut self, id: i32, step_number: i32) -> WorkflowResult<()> {
        Ok(StepConfiguration::set_step_number(&mut *self.tx, id, step_number).await?)
    }

    async fn commit(self) -> WorkflowResult<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// PostgreSQL SQLSTATE for a duplicate key (unique constraint) violation.
const PG_UNIQUE_VIOLATION: &str = "23505";

fn unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .and_then(|db| db.code())
        .map(|code| code == PG_UNIQUE_VIOLATION)
        .unwrap_or(false)
}
