//! Service orchestration: discovery, pause/resume, reload signaling
//!
//! The concrete platform lives behind the [`ServicePlatform`] trait so the
//! rest of the system can be pointed at a different orchestrator (container
//! platform, remote supervisor) without touching the apply workflow.

pub mod controller;
pub mod platform;
pub mod process;
pub mod reload;

pub use controller::{ServiceController, DEFAULT_RESUME_CAPACITY};
pub use platform::{ServiceDescriptor, ServicePlatform, ServiceState};
pub use process::ProcessPlatform;
pub use reload::ReloadSignaler;
