//! Orchestration platform capability trait
//!
//! The concrete platform (process supervisor, container orchestrator, ...)
//! sits behind [`ServicePlatform`] so the controller and the apply workflow
//! never depend on how capacity is actually realized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlatformError;

/// Pause/running state of a managed service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Running,
    Paused,
    Unknown,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Running => "running",
            ServiceState::Paused => "paused",
            ServiceState::Unknown => "unknown",
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ServiceState::Running)
    }
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A managed workload discovered from the orchestration platform.
///
/// Recomputed on demand, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub name: String,
    /// Last observed desired capacity (replicas / worker count)
    pub capacity: u32,
    pub state: ServiceState,
    pub observed_at: DateTime<Utc>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>, capacity: u32, state: ServiceState) -> Self {
        Self {
            name: name.into(),
            capacity,
            state,
            observed_at: Utc::now(),
        }
    }
}

/// Capability interface to the orchestration platform.
///
/// Capacity is the platform's unit of "how much of this service should
/// run": replicas for a container orchestrator, running/stopped for a
/// process supervisor. Capacity zero means paused.
#[async_trait]
pub trait ServicePlatform: Send + Sync {
    /// List services whose name matches the selector (substring match)
    async fn discover(&self, selector: &str) -> Result<Vec<ServiceDescriptor>, PlatformError>;

    /// Current capacity of a named service
    async fn get_capacity(&self, name: &str) -> Result<u32, PlatformError>;

    /// Request a new capacity for a named service
    async fn set_capacity(&self, name: &str, capacity: u32) -> Result<(), PlatformError>;

    /// Ask a service to reload its configuration out-of-band
    async fn signal_reload(&self, name: &str) -> Result<(), PlatformError>;
}
