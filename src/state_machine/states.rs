use serde::{Deserialize, Serialize};
use std::fmt;

/// Ticket lifecycle states.
///
/// The state is never set from outside the transition functions: it is
/// defined by `(current_step, max applicable step, history count)` and
/// [`TicketState::derive`] is the single place that mapping lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketState {
    /// Created, no step processed yet.
    Pending,
    /// At least one step processed, more remain.
    InProgress,
    /// The step pointer moved past the branch's last applicable step.
    Completed,
}

impl TicketState {
    /// Terminal states accept no further processing events.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Whether the ticket is actively moving through the workflow.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::InProgress)
    }

    /// Status as a pure function of the progress coordinates, keeping the
    /// stored column in lockstep with `current_step` and the history.
    pub fn derive(current_step: i32, max_applicable_step: i32, history_count: usize) -> Self {
        if history_count == 0 {
            Self::Pending
        } else if current_step > max_applicable_step {
            Self::Completed
        } else {
            Self::InProgress
        }
    }
}

impl Default for TicketState {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for TicketState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid ticket status: {s}")),
        }
    }
}

impl TryFrom<String> for TicketState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
