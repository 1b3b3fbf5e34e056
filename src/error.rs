use thiserror::Error;

use crate::state_machine::WorkflowError;

/// Top-level error type for embedding the core in binaries and services.
///
/// Workflow-rule violations keep their own taxonomy ([`WorkflowError`]);
/// this type adds the infrastructure failures that surround them.
#[derive(Error, Debug)]
pub enum PerdinError {
    #[error("workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PerdinError>;
