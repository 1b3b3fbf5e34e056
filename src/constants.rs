//! # System Constants
//!
//! Ticket-number scheme, structured note tags, and status groupings shared
//! by the state machine, the repositories, and embedding services.
//!
//! The note tags keep the exact wire text used by the deployed system, so
//! history rows written by this core remain readable by the existing
//! presentation layer and by rows written before it.

use serde::{Deserialize, Serialize};

// Re-export the state type under the name the data model uses for it
pub use crate::state_machine::TicketState as TicketStatus;

/// Prefix of every generated ticket number (`PD-{year}{seq:02}`).
pub const TICKET_NUMBER_PREFIX: &str = "PD";

/// Structured note and processor tags carried by [`crate::models::TicketHistory`] rows.
pub mod notes {
    /// Notes text recorded when an administrator skips a step.
    pub const ADMIN_SKIP: &str = "[Admin Skip]";

    /// Prefix applied to the processor name when an administrator bypasses
    /// the role checks, so the override stays visible to auditors.
    pub const DEBUG_PROCESSOR_PREFIX: &str = "[DEBUG]";

    /// Tag a processor name as an administrative override.
    pub fn debug_processor_name(name: &str) -> String {
        format!("{DEBUG_PROCESSOR_PREFIX} {name}")
    }

    /// Build the correction note written at the previous step when a ticket
    /// is returned: `[DIKEMBALIKAN DARI STEP {n}] {reason}`.
    pub fn return_note(from_step: i32, reason: &str) -> String {
        format!("[DIKEMBALIKAN DARI STEP {from_step}] {reason}")
    }

    /// Parse a correction note back into `(originating step, reason)`.
    pub fn parse_return_note(note: &str) -> Option<(i32, &str)> {
        let rest = note.strip_prefix("[DIKEMBALIKAN DARI STEP ")?;
        let (step, reason) = rest.split_once(']')?;
        Some((step.trim().parse().ok()?, reason.trim_start()))
    }
}

/// Budget-variance outcome recorded on the variance-review step of an LS
/// ticket. Serialized into the notes field as a `[Selisih …]` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarianceStatus {
    /// No difference between the advance and the actual expenses.
    Nihil,
    /// Actual expenses exceeded the advance.
    Kurang,
    /// Advance exceeded actual expenses; the difference must be returned.
    Lebih,
}

impl VarianceStatus {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Nihil => "Selisih Nihil",
            Self::Kurang => "Selisih Kurang",
            Self::Lebih => "Selisih Lebih",
        }
    }

    /// Prefix the given notes with this variance tag: `[Selisih Nihil] …`.
    pub fn tag_notes(&self, notes: Option<&str>) -> String {
        match notes {
            Some(text) if !text.is_empty() => format!("[{}] {text}", self.label()),
            _ => format!("[{}]", self.label()),
        }
    }

    /// Extract a variance tag from a notes field, if one is present.
    pub fn parse_notes(notes: &str) -> Option<Self> {
        let rest = notes.strip_prefix("[Selisih ")?;
        let (kind, _) = rest.split_once(']')?;
        match kind {
            "Nihil" => Some(Self::Nihil),
            "Kurang" => Some(Self::Kurang),
            "Lebih" => Some(Self::Lebih),
            _ => None,
        }
    }
}

/// Status groupings used by list filters and dashboard queries.
pub mod status_groups {
    use crate::state_machine::TicketState;

    /// Tickets that still accept processing events.
    pub const ACTIVE_TICKET_STATUSES: [TicketState; 2] =
        [TicketState::Pending, TicketState::InProgress];

    /// Terminal statuses; no ProcessStep/AdminSkipStep is accepted.
    pub const TERMINAL_TICKET_STATUSES: [TicketState; 1] = [TicketState::Completed];
}
