use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::ticket::{next_ticket_number, ticket_number_year};
use crate::models::{
    Actor, NewTicket, Ticket, TicketBranch, TicketFilter, TicketPatch, TicketWithHistories,
};
use crate::planner;
use crate::state_machine::errors::unauthorized;
use crate::state_machine::{
    actionable_step, FileReference, TicketEvent, TicketState, TicketStateMachine, WorkflowError,
    WorkflowResult,
};

use crate::repository::{TicketRepository, TicketTx};

/// Ticket creation input. Number, start step, and status are derived
/// here, never supplied by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateTicketRequest {
    pub activity_name: String,
    pub assignment_letter_number: String,
    pub uraian: Option<String>,
    /// Defaults to now; the ticket number's year component comes from it.
    pub start_date: Option<DateTime<Utc>>,
    pub is_ls: bool,
    pub assigned_executor_id_1: Option<Uuid>,
    pub assigned_executor_id_2: Option<Uuid>,
}

/// ProcessStep input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessStepRequest {
    /// Explicit step to process; defaults to the ticket's current step.
    /// Parallel cohort members are usually targeted explicitly.
    pub target_step: Option<i32>,
    pub file: Option<FileReference>,
    pub notes: Option<String>,
}

/// Dashboard read model: counts per status plus the latest tickets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub recent_tickets: Vec<Ticket>,
}

/// Orchestrates ticket transitions against the repository.
///
/// The service owns no workflow rules itself: it assembles the snapshot,
/// delegates to [`TicketStateMachine`], and applies the returned decision
/// inside the transaction the snapshot was read under.
#[derive(Debug, Clone)]
pub struct WorkflowService<R: TicketRepository> {
    repo: R,
}

impl<R: TicketRepository> WorkflowService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Create a ticket: next number in the year sequence, positioned at
    /// the first applicable step of its branch, status Pending.
    #[instrument(skip(self, actor, request), fields(actor = %actor.name))]
    pub async fn create_ticket(
        &self,
        actor: &Actor,
        request: CreateTicketRequest,
    ) -> WorkflowResult<Ticket> {
        if !actor.is_admin() {
            return Err(unauthorized("only administrators may create tickets"));
        }

        let mut tx = self.repo.begin().await?;
        let catalog = tx.list_step_configurations().await?;

        let start_date = request.start_date.unwrap_or_else(Utc::now);
        let year = ticket_number_year(start_date);
        let latest = tx.latest_ticket_number(year).await?;
        let ticket_number = next_ticket_number(year, latest.as_deref());

        let branch = TicketBranch::from_is_ls(request.is_ls);
        let current_step = planner::first_applicable_step(&catalog, branch);

        let ticket = tx
            .insert_ticket(&NewTicket {
                ticket_number,
                activity_name: request.activity_name,
                assignment_letter_number: request.assignment_letter_number,
                uraian: request.uraian,
                start_date,
                is_ls: request.is_ls,
                current_step,
                status: TicketState::Pending,
                assigned_executor_id_1: request.assigned_executor_id_1,
                assigned_executor_id_2: request.assigned_executor_id_2,
                created_by_id: actor.id,
            })
            .await?;
        tx.commit().await?;

        info!(
            ticket_number = %ticket.ticket_number,
            current_step = ticket.current_step,
            is_ls = ticket.is_ls,
            "ticket created"
        );
        Ok(ticket)
    }

    /// ProcessStep: record the step and advance per the state machine.
    #[instrument(skip(self, actor, request), fields(actor = %actor.name, %ticket_id))]
    pub async fn process_step(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        request: ProcessStepRequest,
    ) -> WorkflowResult<TicketWithHistories> {
        self.execute_transition(
            actor,
            ticket_id,
            TicketEvent::Process {
                target_step: request.target_step,
                file: request.file,
                notes: request.notes,
            },
        )
        .await
    }

    /// AdminSkipStep: privileged override for operational recovery.
    #[instrument(skip(self, actor), fields(actor = %actor.name, %ticket_id))]
    pub async fn admin_skip_step(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        target_step: Option<i32>,
    ) -> WorkflowResult<TicketWithHistories> {
        if !actor.is_admin() {
            return Err(unauthorized("only administrators may skip steps"));
        }
        self.execute_transition(actor, ticket_id, TicketEvent::AdminSkip { target_step })
            .await
    }

    /// ReturnToPreviousStep: auditable correction, one applicable step back.
    #[instrument(skip(self, actor, reason), fields(actor = %actor.name, %ticket_id))]
    pub async fn return_to_previous_step(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        reason: &str,
    ) -> WorkflowResult<TicketWithHistories> {
        self.execute_transition(
            actor,
            ticket_id,
            TicketEvent::ReturnToPrevious {
                reason: reason.to_string(),
            },
        )
        .await
    }

    pub async fn get_ticket(&self, ticket_id: Uuid) -> WorkflowResult<TicketWithHistories> {
        self.repo
            .get_ticket(ticket_id)
            .await?
            .ok_or(WorkflowError::TicketNotFound(ticket_id))
    }

    pub async fn list_tickets(
        &self,
        filter: &TicketFilter,
    ) -> WorkflowResult<Vec<TicketWithHistories>> {
        self.repo.list_tickets(filter).await
    }

    /// Admin-only removal; history rows go with the ticket.
    #[instrument(skip(self, actor), fields(actor = %actor.name, %ticket_id))]
    pub async fn delete_ticket(&self, actor: &Actor, ticket_id: Uuid) -> WorkflowResult<()> {
        if !actor.is_admin() {
            return Err(unauthorized("only administrators may delete tickets"));
        }
        if !self.repo.delete_ticket(ticket_id).await? {
            return Err(WorkflowError::TicketNotFound(ticket_id));
        }
        info!(%ticket_id, "ticket deleted");
        Ok(())
    }

    /// "My tasks": open tickets the actor's role can act on right now,
    /// honoring parallel cohorts and the assigned-executor gate.
    pub async fn actionable_tickets(
        &self,
        actor: &Actor,
    ) -> WorkflowResult<Vec<TicketWithHistories>> {
        if !actor.is_employee() || actor.employee_role.is_none() {
            return Err(unauthorized("only employees have a task list"));
        }

        let catalog = self.repo.list_step_configurations().await?;
        let filter = TicketFilter {
            exclude_completed: true,
            ..TicketFilter::default()
        };
        let tickets = self.repo.list_tickets(&filter).await?;
        Ok(tickets
            .into_iter()
            .filter(|t| actionable_step(&catalog, &t.ticket, &t.histories, actor).is_some())
            .collect())
    }

    /// "My history": tickets the actor has processed at least one step of.
    pub async fn processed_by(&self, actor: &Actor) -> WorkflowResult<Vec<TicketWithHistories>> {
        if !actor.is_employee() {
            return Err(unauthorized("only employees have a processing history"));
        }
        let filter = TicketFilter {
            processed_by: Some(actor.id),
            ..TicketFilter::default()
        };
        self.repo.list_tickets(&filter).await
    }

    /// Dashboard counts and the five most recent tickets.
    pub async fn ticket_stats(&self) -> WorkflowResult<TicketStats> {
        let counts = self.repo.ticket_counts().await?;
        let recent = self
            .repo
            .list_tickets(&TicketFilter::default())
            .await?
            .into_iter()
            .take(5)
            .map(|t| t.ticket)
            .collect();
        Ok(TicketStats {
            total: counts.total,
            pending: counts.pending,
            in_progress: counts.in_progress,
            completed: counts.completed,
            recent_tickets: recent,
        })
    }

    pub async fn get_setting(&self, key: &str) -> WorkflowResult<Option<String>> {
        Ok(self.repo.get_setting(key).await?.map(|s| s.value))
    }

    pub async fn all_settings(
        &self,
    ) -> WorkflowResult<std::collections::HashMap<String, String>> {
        self.repo.all_settings().await
    }

    pub async fn put_setting(
        &self,
        actor: &Actor,
        key: &str,
        value: &str,
    ) -> WorkflowResult<()> {
        if !actor.is_admin() {
            return Err(unauthorized("only administrators may change settings"));
        }
        self.repo.put_setting(key, value).await?;
        Ok(())
    }

    pub async fn put_settings(
        &self,
        actor: &Actor,
        entries: &[(String, String)],
    ) -> WorkflowResult<()> {
        if !actor.is_admin() {
            return Err(unauthorized("only administrators may change settings"));
        }
        for (key, value) in entries {
            self.repo.put_setting(key, value).await?;
        }
        Ok(())
    }

    /// Shared transition path: snapshot under the row lock, decide
    /// purely, apply atomically. All-or-nothing; a rejection rolls the
    /// transaction back with no partial state.
    async fn execute_transition(
        &self,
        actor: &Actor,
        ticket_id: Uuid,
        event: TicketEvent,
    ) -> WorkflowResult<TicketWithHistories> {
        let mut tx = self.repo.begin().await?;

        let ticket = tx
            .ticket_for_update(ticket_id)
            .await?
            .ok_or(WorkflowError::TicketNotFound(ticket_id))?;
        let histories = tx.histories(ticket_id).await?;
        let catalog = tx.list_step_configurations().await?;

        let machine = TicketStateMachine::new(&catalog, &ticket, &histories);
        let decision = machine.transition(actor, &event)?;

        if let Some(history_id) = decision.delete_history_id {
            tx.delete_history(history_id).await?;
        }
        tx.insert_history(&decision.insert_history).await?;
        let updated = tx
            .update_ticket(
                ticket_id,
                TicketPatch {
                    current_step: decision.current_step,
                    status: decision.status,
                },
            )
            .await?;
        let histories = tx.histories(ticket_id).await?;
        tx.commit().await?;

        info!(
            ticket_number = %updated.ticket_number,
            event = event.event_type(),
            step = decision.insert_history.step_number,
            current_step = updated.current_step,
            status = %updated.status,
            "ticket transition applied"
        );
        Ok(TicketWithHistories {
            ticket: updated,
            histories,
        })
    }
}
