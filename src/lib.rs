#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Perdin Core
//!
//! Rust core of the "Perjalanan Dinas" travel-expense approval workflow:
//! a multi-step, role-gated reimbursement tracker that routes a ticket
//! through a configurable ordered (and partly parallel) sequence of steps
//! until it is complete.
//!
//! ## Overview
//!
//! The engine decides, for any ticket and any processing event, the next
//! step and the next status, while enforcing the authorization and
//! idempotency invariants. HTTP routing, authentication, file upload
//! storage, and rendering are external collaborators: callers hand in an
//! already-authenticated [`models::Actor`] and, optionally, a reference
//! to an already-stored file.
//!
//! ## Architecture
//!
//! - [`models`] - data layer: step catalog, tickets, history rows,
//!   settings, actor context; models own their SQLx queries
//! - [`planner`] - pure derivations over a catalog snapshot: branch
//!   filtering, completion threshold, parallel cohorts, adjacency
//! - [`state_machine`] - the decision core; transitions are pure values
//!   applied atomically by the repository
//! - [`repository`] - persistence contracts with PostgreSQL and
//!   in-memory implementations
//! - [`orchestration`] - `WorkflowService` and `StepConfigService`,
//!   running decisions inside transactional boundaries
//! - [`config`], [`logging`], [`error`], [`constants`] - ambient stack
//!
//! ## Workflow model
//!
//! Steps are dense 1..N ordinals. A ticket traverses the subset its
//! LS/Non-LS branch allows; steps sharing a parallel group may complete
//! in any order, and the ticket only moves past the cohort when every
//! member has a history row. Processing the last applicable step drives
//! the step pointer to `max + 1` and the status to `completed`.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use perdin_core::config::PerdinConfig;
//! use perdin_core::orchestration::WorkflowService;
//! use perdin_core::repository::PgTicketRepository;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PerdinConfig::from_env()?;
//! let repo = PgTicketRepository::connect(&config).await?;
//! repo.migrate().await?;
//!
//! let service = WorkflowService::new(repo);
//! let stats = service.ticket_stats().await?;
//! println!("{} tickets, {} completed", stats.total, stats.completed);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod planner;
pub mod repository;
pub mod seed;
pub mod state_machine;

pub use config::PerdinConfig;
pub use constants::{TicketStatus, VarianceStatus};
pub use error::{PerdinError, Result};
pub use models::{
    Actor, Applicability, EmployeeRole, StepConfiguration, SystemRole, Ticket, TicketBranch,
    TicketHistory,
};
pub use orchestration::{StepConfigService, WorkflowService};
pub use repository::{InMemoryTicketRepository, PgTicketRepository, TicketRepository};
pub use state_machine::{
    FileReference, TicketEvent, TicketState, TicketStateMachine, WorkflowError,
};
