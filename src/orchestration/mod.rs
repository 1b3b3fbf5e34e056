//! # Orchestration Layer
//!
//! Coordinates state-machine decisions against the repository inside
//! transactional boundaries.
//!
//! ## Core Components
//!
//! - **WorkflowService**: ticket lifecycle - create, process, admin-skip,
//!   return-to-previous - plus the read models the dashboard and task
//!   lists consume
//! - **StepConfigService**: administration of the step catalog with the
//!   dense-renumbering sweeps that keep the ordinal invariant intact
//!
//! Every mutation follows the same discipline: open a transaction, read
//! the ticket row-locked together with its histories and a fresh catalog
//! snapshot, run the pure decision, apply it, commit. A rejected decision
//! rolls the transaction back untouched.

pub mod step_config_service;
pub mod workflow_service;

pub use step_config_service::StepConfigService;
pub use workflow_service::{
    CreateTicketRequest, ProcessStepRequest, TicketStats, WorkflowService,
};
