//! Apply workflow: the pause → validate → save → resume state machine

pub mod apply;
pub mod phase;

pub use apply::{ApplyReport, ApplyWorkflow, ResumeRetryConfig};
pub use phase::{ApplyPhase, FailurePhase};
