pub mod actor;
pub mod app_setting;
pub mod step_configuration;
pub mod ticket;
pub mod ticket_history;

// Re-export core models for easy access
pub use actor::{Actor, EmployeeRole, SystemRole};
pub use app_setting::AppSetting;
pub use step_configuration::{
    Applicability, NewStepConfiguration, StepConfiguration, StepConfigurationUpdate,
};
pub use ticket::{NewTicket, Ticket, TicketBranch, TicketFilter, TicketPatch, TicketWithHistories};
pub use ticket_history::{NewTicketHistory, TicketHistory};
