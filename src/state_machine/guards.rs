use crate::models::{Actor, StepConfiguration, Ticket, TicketHistory};

use super::errors::{unauthorized, validation_failed, WorkflowError, WorkflowResult};

/// Snapshot a guard evaluates against: the ticket, its history rows, and
/// the acting caller. Read under the repository transaction lock, so
/// guards never observe state that is being mutated concurrently.
pub struct GuardContext<'a> {
    pub ticket: &'a Ticket,
    pub histories: &'a [TicketHistory],
    pub actor: &'a Actor,
}

/// Trait for transition guards.
pub trait StateGuard {
    /// Check whether the transition is allowed.
    fn check(&self, ctx: &GuardContext<'_>) -> WorkflowResult<()>;

    /// Description of this guard for logging.
    fn description(&self) -> &'static str;
}

/// Completed is terminal: no processing event is accepted.
pub struct TicketNotCompletedGuard;

impl StateGuard for TicketNotCompletedGuard {
    fn check(&self, ctx: &GuardContext<'_>) -> WorkflowResult<()> {
        if ctx.ticket.status.is_terminal() {
            return Err(WorkflowError::AlreadyCompleted {
                ticket: ctx.ticket.ticket_number.clone(),
            });
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Ticket must not be completed"
    }
}

/// Idempotency: at most one history row per (ticket, step number).
/// Return-correction markers do not count - they document a pending
/// redo and are replaced by it.
pub struct StepNotProcessedGuard {
    pub step_number: i32,
}

impl StateGuard for StepNotProcessedGuard {
    fn check(&self, ctx: &GuardContext<'_>) -> WorkflowResult<()> {
        if ctx
            .histories
            .iter()
            .any(|h| h.step_number == self.step_number && !h.is_return_marker())
        {
            return Err(WorkflowError::AlreadyProcessed {
                ticket: ctx.ticket.ticket_number.clone(),
                step_number: self.step_number,
            });
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Step must not already have a history row"
    }
}

/// The actor's employee role must match the step's required role.
pub struct RequiredRoleGuard<'a> {
    pub step: &'a StepConfiguration,
}

impl StateGuard for RequiredRoleGuard<'_> {
    fn check(&self, ctx: &GuardContext<'_>) -> WorkflowResult<()> {
        if ctx.actor.employee_role != Some(self.step.required_employee_role) {
            return Err(unauthorized(format!(
                "step {} requires role {}",
                self.step.step_number, self.step.required_employee_role
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Actor must hold the step's required role"
    }
}

/// Signing-step gate: when a ticket names assigned executors, only those
/// identities may process the designated-executor step.
pub struct AssignedExecutorGuard<'a> {
    pub step: &'a StepConfiguration,
}

impl StateGuard for AssignedExecutorGuard<'_> {
    fn check(&self, ctx: &GuardContext<'_>) -> WorkflowResult<()> {
        if self.step.required_employee_role.is_designated_executor()
            && ctx.ticket.has_assigned_executors()
            && !ctx.ticket.is_assigned_executor(ctx.actor.id)
        {
            return Err(unauthorized(format!(
                "ticket {} is assigned to other executors for step {}",
                ctx.ticket.ticket_number, self.step.step_number
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Signing step is restricted to the assigned executors"
    }
}

/// Corrections are auditable: the return reason may not be blank.
pub struct ReturnReasonGuard<'a> {
    pub reason: &'a str,
}

impl StateGuard for ReturnReasonGuard<'_> {
    fn check(&self, _ctx: &GuardContext<'_>) -> WorkflowResult<()> {
        if self.reason.trim().is_empty() {
            return Err(validation_failed("return reason is required"));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Return reason must be provided"
    }
}

/// There is nothing to return to from the first step.
pub struct NotAtFirstStepGuard;

impl StateGuard for NotAtFirstStepGuard {
    fn check(&self, ctx: &GuardContext<'_>) -> WorkflowResult<()> {
        if ctx.ticket.current_step <= 1 {
            return Err(validation_failed("cannot return from the first step"));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Ticket must be past the first step"
    }
}
