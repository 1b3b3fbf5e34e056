use std::collections::HashSet;

use uuid::Uuid;

use crate::constants::notes;
use crate::models::{Actor, NewTicketHistory, StepConfiguration, Ticket, TicketHistory};
use crate::planner;

use super::errors::{WorkflowError, WorkflowResult};
use super::events::TicketEvent;
use super::guards::{
    AssignedExecutorGuard, GuardContext, NotAtFirstStepGuard, RequiredRoleGuard,
    ReturnReasonGuard, StateGuard, StepNotProcessedGuard, TicketNotCompletedGuard,
};
use super::states::TicketState;

/// The effect of an accepted transition, applied atomically by the
/// repository: one history row in, optionally one out, and the ticket's
/// progress patch. Nothing is mutated until the decision commits.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionDecision {
    pub insert_history: NewTicketHistory,
    pub delete_history_id: Option<Uuid>,
    pub current_step: i32,
    pub status: TicketState,
}

/// Pure decision core for ticket progression.
///
/// Holds a consistent snapshot - catalog, ticket, history rows - read
/// inside the repository transaction that will apply the decision, so
/// the cohort-completion check can never race a concurrent writer.
pub struct TicketStateMachine<'a> {
    catalog: &'a [StepConfiguration],
    ticket: &'a Ticket,
    histories: &'a [TicketHistory],
}

impl<'a> TicketStateMachine<'a> {
    pub fn new(
        catalog: &'a [StepConfiguration],
        ticket: &'a Ticket,
        histories: &'a [TicketHistory],
    ) -> Self {
        Self {
            catalog,
            ticket,
            histories,
        }
    }

    /// Dispatch an event to its transition rule.
    pub fn transition(
        &self,
        actor: &Actor,
        event: &TicketEvent,
    ) -> WorkflowResult<TransitionDecision> {
        match event {
            TicketEvent::Process {
                target_step,
                file,
                notes,
            } => self.process(actor, *target_step, file.as_ref(), notes.as_deref()),
            TicketEvent::AdminSkip { target_step } => self.admin_skip(actor, *target_step),
            TicketEvent::ReturnToPrevious { reason } => self.return_to_previous(actor, reason),
        }
    }

    /// ProcessStep: authorize, record, and advance.
    pub fn process(
        &self,
        actor: &Actor,
        target_step: Option<i32>,
        file: Option<&super::events::FileReference>,
        notes: Option<&str>,
    ) -> WorkflowResult<TransitionDecision> {
        let step_number = target_step.unwrap_or(self.ticket.current_step);
        let ctx = self.guard_context(actor);

        TicketNotCompletedGuard.check(&ctx)?;
        StepNotProcessedGuard { step_number }.check(&ctx)?;

        let step = planner::step_config(self.catalog, step_number)
            .ok_or(WorkflowError::StepNotFound(step_number))?;
        RequiredRoleGuard { step }.check(&ctx)?;
        AssignedExecutorGuard { step }.check(&ctx)?;

        let insert_history = NewTicketHistory {
            ticket_id: self.ticket.id,
            step_number,
            processed_by_id: actor.id,
            processor_name: actor.name.clone(),
            file_url: file.map(|f| f.url.clone()),
            file_name: file.map(|f| f.original_name.clone()),
            notes: notes.map(str::to_string),
        };

        let (current_step, status) = self.advance_from(step);
        Ok(TransitionDecision {
            insert_history,
            delete_history_id: self.replaced_marker(step_number),
            current_step,
            status,
        })
    }

    /// AdminSkipStep: the same algorithm as ProcessStep minus the role
    /// and assignment rules. The history row is tagged so the override
    /// stays visible to auditors.
    pub fn admin_skip(
        &self,
        actor: &Actor,
        target_step: Option<i32>,
    ) -> WorkflowResult<TransitionDecision> {
        let step_number = target_step.unwrap_or(self.ticket.current_step);
        let ctx = self.guard_context(actor);

        TicketNotCompletedGuard.check(&ctx)?;
        StepNotProcessedGuard { step_number }.check(&ctx)?;

        let step = planner::step_config(self.catalog, step_number)
            .ok_or(WorkflowError::StepNotFound(step_number))?;

        let insert_history = NewTicketHistory {
            ticket_id: self.ticket.id,
            step_number,
            processed_by_id: actor.id,
            processor_name: notes::debug_processor_name(&actor.name),
            file_url: None,
            file_name: None,
            notes: Some(notes::ADMIN_SKIP.to_string()),
        };

        let (current_step, status) = self.advance_from(step);
        Ok(TransitionDecision {
            insert_history,
            delete_history_id: self.replaced_marker(step_number),
            current_step,
            status,
        })
    }

    /// ReturnToPreviousStep: retract the most recently created history
    /// row and move the ticket back one applicable step, writing the
    /// correction reason at the step that must be redone.
    pub fn return_to_previous(
        &self,
        actor: &Actor,
        reason: &str,
    ) -> WorkflowResult<TransitionDecision> {
        let ctx = self.guard_context(actor);
        NotAtFirstStepGuard.check(&ctx)?;
        ReturnReasonGuard { reason }.check(&ctx)?;

        let branch = self.ticket.branch();
        let previous_step =
            planner::previous_applicable_before(self.catalog, branch, self.ticket.current_step);

        let delete_history_id = self
            .histories
            .iter()
            .max_by_key(|h| (h.processed_at, h.step_number))
            .map(|h| h.id);

        let insert_history = NewTicketHistory {
            ticket_id: self.ticket.id,
            step_number: previous_step,
            processed_by_id: actor.id,
            processor_name: actor.name.clone(),
            file_url: None,
            file_name: None,
            notes: Some(notes::return_note(self.ticket.current_step, reason.trim())),
        };

        let max = planner::max_applicable_step(self.catalog, branch);
        let history_count =
            self.histories.len() + 1 - usize::from(delete_history_id.is_some());

        Ok(TransitionDecision {
            insert_history,
            delete_history_id,
            // Returning can never directly produce Completed.
            current_step: previous_step,
            status: TicketState::derive(previous_step, max, history_count),
        })
    }

    /// Derived lifecycle state of the snapshot.
    pub fn current_state(&self) -> TicketState {
        let max = planner::max_applicable_step(self.catalog, self.ticket.branch());
        TicketState::derive(self.ticket.current_step, max, self.histories.len())
    }

    fn guard_context<'b>(&'b self, actor: &'b Actor) -> GuardContext<'b> {
        GuardContext {
            ticket: self.ticket,
            histories: self.histories,
            actor,
        }
    }

    /// A return-correction marker occupying the step's history slot.
    /// Processing the step consumes it so the (ticket, step) uniqueness
    /// invariant holds for the real record.
    fn replaced_marker(&self, step_number: i32) -> Option<Uuid> {
        self.histories
            .iter()
            .find(|h| h.step_number == step_number && h.is_return_marker())
            .map(|h| h.id)
    }

    /// Compute the progress patch after recording `step`.
    ///
    /// Parallel step: the pointer leaves the cohort only when every
    /// member has a history row (counting the row being inserted);
    /// until then it stays where it is for the remaining members.
    /// Sequential step: the next applicable step by position, or the
    /// `max + 1` completion sentinel after the last one.
    fn advance_from(&self, step: &StepConfiguration) -> (i32, TicketState) {
        let branch = self.ticket.branch();
        let max = planner::max_applicable_step(self.catalog, branch);
        let history_count = self.histories.len() + 1;

        let next_step = if let Some(group) = step.cohort_group() {
            let cohort = planner::parallel_cohort(self.catalog, group);
            let processed = self
                .histories
                .iter()
                .filter(|h| cohort.contains(&h.step_number) && !h.is_return_marker())
                .count()
                + 1;
            if processed >= cohort.len() {
                let cohort_max = cohort.iter().copied().max().unwrap_or(step.step_number);
                planner::next_applicable_after(self.catalog, branch, cohort_max)
                    .unwrap_or(max + 1)
            } else {
                self.ticket.current_step
            }
        } else {
            planner::next_in_sequence(self.catalog, branch, step.step_number).unwrap_or(max + 1)
        };

        (next_step, TicketState::derive(next_step, max, history_count))
    }
}

/// The step an actor could process right now on this ticket, if any.
///
/// Drives the "my tasks" listing: sequential tickets match when the
/// actor's role owns the current step; tickets sitting in a parallel
/// cohort match while any cohort step of the actor's role lacks a
/// history row; the signing step additionally honors the assigned
/// executor pair.
pub fn actionable_step(
    catalog: &[StepConfiguration],
    ticket: &Ticket,
    histories: &[TicketHistory],
    actor: &Actor,
) -> Option<i32> {
    let role = actor.employee_role?;
    if ticket.status.is_terminal() {
        return None;
    }

    let branch = ticket.branch();
    let applicable = planner::applicable_steps(catalog, branch);
    let role_steps: Vec<i32> = catalog
        .iter()
        .filter(|s| s.required_employee_role == role)
        .map(|s| s.step_number)
        .collect();

    let current = applicable
        .iter()
        .find(|s| s.step_number == ticket.current_step);

    if let Some(group) = current.and_then(|s| s.cohort_group()) {
        let cohort = planner::parallel_cohort(catalog, group);
        let processed: HashSet<i32> = histories
            .iter()
            .filter(|h| !h.is_return_marker())
            .map(|h| h.step_number)
            .collect();
        if let Some(step) = role_steps
            .iter()
            .find(|s| cohort.contains(s) && !processed.contains(s))
        {
            return Some(*step);
        }
    }

    if role_steps.contains(&ticket.current_step) && current.is_some() {
        let step = planner::step_config(catalog, ticket.current_step)?;
        if step.required_employee_role.is_designated_executor()
            && ticket.has_assigned_executors()
            && !ticket.is_assigned_executor(actor.id)
        {
            return None;
        }
        return Some(ticket.current_step);
    }

    None
}
