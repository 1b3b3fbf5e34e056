// Ticket state machine for the approval workflow.
//
// Decisions are pure: the machine is handed a consistent snapshot of the
// catalog, the ticket, and its history rows (read under the repository's
// transaction lock) and returns a TransitionDecision value that the
// repository applies atomically.

pub mod errors;
pub mod events;
pub mod guards;
pub mod machine;
pub mod states;

// Re-export main types for convenient access
pub use errors::{WorkflowError, WorkflowResult};
pub use events::{FileReference, TicketEvent};
pub use machine::{actionable_step, TicketStateMachine, TransitionDecision};
pub use states::TicketState;

// Common traits and utilities
pub use guards::{GuardContext, StateGuard};
