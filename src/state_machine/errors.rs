use thiserror::Error;
use uuid::Uuid;

/// Error taxonomy for workflow operations.
///
/// Every rule violation is a distinct, reportable condition; none are
/// swallowed and none trigger retries inside the core. "No next
/// applicable step" is deliberately absent - it is the Completed
/// transition, not an error.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("ticket {0} not found")]
    TicketNotFound(Uuid),

    #[error("step {0} is not configured")]
    StepNotFound(i32),

    #[error("history row {0} not found")]
    HistoryNotFound(Uuid),

    #[error("ticket {ticket} is already completed")]
    AlreadyCompleted { ticket: String },

    #[error("step {step_number} of ticket {ticket} has already been processed")]
    AlreadyProcessed { ticket: String, step_number: i32 },

    #[error("unauthorized: {reason}")]
    Unauthorized { reason: String },

    #[error("validation failed: {reason}")]
    ValidationFailed { reason: String },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

/// Helper for authorization failures.
pub fn unauthorized(reason: impl Into<String>) -> WorkflowError {
    WorkflowError::Unauthorized {
        reason: reason.into(),
    }
}

/// Helper for validation failures.
pub fn validation_failed(reason: impl Into<String>) -> WorkflowError {
    WorkflowError::ValidationFailed {
        reason: reason.into(),
    }
}

impl WorkflowError {
    /// Whether the error reports a caller mistake rather than an
    /// infrastructure fault - the distinction embedding layers use to
    /// pick a response class.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::TicketNotFound(_)
                | Self::StepNotFound(_)
                | Self::HistoryNotFound(_)
                | Self::AlreadyCompleted { .. }
                | Self::AlreadyProcessed { .. }
                | Self::Unauthorized { .. }
                | Self::ValidationFailed { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_exclude_infrastructure_faults() {
        assert!(unauthorized("wrong role").is_rejection());
        assert!(validation_failed("empty reason").is_rejection());
        assert!(WorkflowError::AlreadyProcessed {
            ticket: "PD-202501".to_string(),
            step_number: 3
        }
        .is_rejection());
        assert!(!WorkflowError::Internal("boom".to_string()).is_rejection());
    }
}
