//! # Repository Contracts
//!
//! The persistence collaborator the workflow core runs against, split in
//! two: [`TicketRepository`] for plain reads, and [`TicketTx`] for the
//! transaction a transition executes inside.
//!
//! Every transition follows the same shape: `begin()`, read the ticket
//! row-locked plus its histories and the current catalog, let the pure
//! state machine decide, apply the decision, `commit()`. Dropping a
//! transaction without committing rolls everything back, which is what
//! gives rejected operations their no-partial-state guarantee.

pub mod memory;
pub mod postgres;

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    AppSetting, NewStepConfiguration, NewTicket, NewTicketHistory, StepConfiguration,
    StepConfigurationUpdate, Ticket, TicketFilter, TicketHistory, TicketPatch,
    TicketWithHistories,
};
use crate::models::ticket::TicketCounts;
use crate::state_machine::WorkflowResult;

pub use memory::InMemoryTicketRepository;
pub use postgres::PgTicketRepository;

/// Durable storage of tickets, histories, the step catalog, and settings.
#[async_trait]
pub trait TicketRepository: Send + Sync {
    type Tx: TicketTx;

    /// Open the transaction a transition decision will be applied in.
    async fn begin(&self) -> WorkflowResult<Self::Tx>;

    async fn get_ticket(&self, id: Uuid) -> WorkflowResult<Option<TicketWithHistories>>;

    /// Filtered listing, newest first, each ticket with its histories
    /// ordered by step number.
    async fn list_tickets(&self, filter: &TicketFilter)
        -> WorkflowResult<Vec<TicketWithHistories>>;

    /// Histories go with the ticket. Returns whether a row was removed.
    async fn delete_ticket(&self, id: Uuid) -> WorkflowResult<bool>;

    /// The step catalog ordered by step number. Re-fetched per operation;
    /// never cached across requests.
    async fn list_step_configurations(&self) -> WorkflowResult<Vec<StepConfiguration>>;

    async fn get_step_configuration(
        &self,
        step_number: i32,
    ) -> WorkflowResult<Option<StepConfiguration>>;

    async fn ticket_counts(&self) -> WorkflowResult<TicketCounts>;

    async fn get_setting(&self, key: &str) -> WorkflowResult<Option<AppSetting>>;
    async fn all_settings(&self) -> WorkflowResult<HashMap<String, String>>;
    async fn put_setting(&self, key: &str, value: &str) -> WorkflowResult<AppSetting>;
}

/// One atomic unit of workflow work. All reads inside the transaction see
/// a consistent snapshot; `ticket_for_update` additionally serializes
/// concurrent transitions on the same ticket.
#[async_trait]
pub trait TicketTx: Send {
    async fn ticket_for_update(&mut self, id: Uuid) -> WorkflowResult<Option<Ticket>>;

    async fn histories(&mut self, ticket_id: Uuid) -> WorkflowResult<Vec<TicketHistory>>;

    async fn count_history(
        &mut self,
        ticket_id: Uuid,
        step_numbers: &[i32],
    ) -> WorkflowResult<i64>;

    async fn list_step_configurations(&mut self) -> WorkflowResult<Vec<StepConfiguration>>;

    async fn latest_ticket_number(&mut self, year: i32) -> WorkflowResult<Option<String>>;

    async fn insert_ticket(&mut self, new_ticket: &NewTicket) -> WorkflowResult<Ticket>;

    async fn insert_history(&mut self, new_row: &NewTicketHistory)
        -> WorkflowResult<TicketHistory>;

    async fn delete_history(&mut self, id: Uuid) -> WorkflowResult<()>;

    async fn update_ticket(&mut self, id: Uuid, patch: TicketPatch) -> WorkflowResult<Ticket>;

    // Step-catalog administration; renumbering sweeps run inside one
    // transaction so the catalog invariant holds at commit.
    async fn find_step_by_id(&mut self, id: i32) -> WorkflowResult<Option<StepConfiguration>>;
    async fn find_step_by_number(
        &mut self,
        step_number: i32,
    ) -> WorkflowResult<Option<StepConfiguration>>;
    async fn insert_step(
        &mut self,
        new_step: &NewStepConfiguration,
    ) -> WorkflowResult<StepConfiguration>;
    async fn update_step(
        &mut self,
        id: i32,
        update: &StepConfigurationUpdate,
    ) -> WorkflowResult<StepConfiguration>;
    async fn delete_step(&mut self, id: i32) -> WorkflowResult<bool>;
    async fn set_step_number(&mut self, id: i32, step_number: i32) -> WorkflowResult<()>;

    /// Make the unit of work durable. Dropping without committing rolls
    /// back.
    async fn commit(self) -> WorkflowResult<()>;
}
