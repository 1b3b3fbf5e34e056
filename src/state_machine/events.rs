use serde::{Deserialize, Serialize};

/// Reference to an already-stored uploaded file. Upload handling itself
/// is an external collaborator; the core only records the reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    pub url: String,
    pub original_name: String,
}

/// Events that drive ticket state transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum TicketEvent {
    /// Process a step: the actor's current step, or an explicit target
    /// (parallel cohort members are usually targeted explicitly).
    Process {
        target_step: Option<i32>,
        file: Option<FileReference>,
        notes: Option<String>,
    },
    /// Administrative override that records a step as done without the
    /// role and assignment checks. Operational recovery only.
    AdminSkip { target_step: Option<i32> },
    /// Correction: retract the most recent processing and move the
    /// ticket back one applicable step. The reason is mandatory.
    ReturnToPrevious { reason: String },
}

impl TicketEvent {
    /// String representation of the event type for logging.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Process { .. } => "process",
            Self::AdminSkip { .. } => "admin_skip",
            Self::ReturnToPrevious { .. } => "return_to_previous",
        }
    }

    /// Whether the event skips the role/assignment authorization rules.
    pub fn bypasses_authorization(&self) -> bool {
        matches!(self, Self::AdminSkip { .. })
    }
}
