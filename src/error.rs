use std::collections::BTreeMap;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::validation::Violation;
use crate::workflow::ApplyReport;

/// Main error type for the orchestrator
#[derive(Error, Debug)]
pub enum AdminError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    // Service orchestration errors
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    // Apply workflow errors
    #[error("Apply error: {0}")]
    Apply(#[from] ApplyError),

    // Network errors
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    // Serialization errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // Alert channel errors
    #[error("Unknown alert channel: {0}")]
    UnknownAlertChannel(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Generic errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for AdminError
pub type Result<T> = std::result::Result<T, AdminError>;

/// Errors from loading, validating, and saving the trading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to decode configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("configuration validation failed: {}", format_violations(.0))]
    Validation(Vec<Violation>),

    #[error("configuration IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("backup file does not exist: {0}")]
    BackupNotFound(PathBuf),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from a concrete orchestration platform
#[derive(Error, Debug)]
pub enum PlatformError {
    #[error("service not found: {0}")]
    NotFound(String),

    #[error("stale or invalid pid file for {0}")]
    InvalidPidFile(String),

    #[error("signal delivery failed: {0}")]
    Signal(String),

    #[error("operation timed out")]
    Timeout,

    #[error("operation not supported on this platform: {0}")]
    Unsupported(String),

    #[error("platform IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Aggregate errors from service pause/resume/discovery.
///
/// Pause and Resume carry the full per-service failure map; one service
/// failing never hides the outcome for the rest of the set.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("service discovery failed: {0}")]
    Discovery(String),

    #[error("pause failed for {} service(s): {}", .failures.len(), format_failures(.failures))]
    Pause { failures: BTreeMap<String, String> },

    #[error("resume failed for {} service(s): {}", .failures.len(), format_failures(.failures))]
    Resume { failures: BTreeMap<String, String> },
}

impl ServiceError {
    /// Per-service failure map for pause/resume aggregates
    pub fn failures(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            ServiceError::Pause { failures } | ServiceError::Resume { failures } => Some(failures),
            ServiceError::Discovery(_) => None,
        }
    }
}

fn format_failures(failures: &BTreeMap<String, String>) -> String {
    failures
        .iter()
        .map(|(name, reason)| format!("{}: {}", name, reason))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Errors from the apply workflow
#[derive(Error, Debug)]
pub enum ApplyError {
    /// A concurrent apply was rejected, never queued
    #[error("apply already in progress")]
    InProgress,

    /// A previous resume failure left configuration and running state
    /// diverged; new applies are refused until acknowledged
    #[error("resume failure requires manual intervention and acknowledgement")]
    InterventionRequired,

    #[error("apply failed during {phase}: {}", report.summary())]
    Failed {
        phase: crate::workflow::FailurePhase,
        report: ApplyReport,
    },
}

impl ApplyError {
    /// The apply report, if this error carries one
    pub fn report(&self) -> Option<&ApplyReport> {
        match self {
            ApplyError::Failed { report, .. } => Some(report),
            _ => None,
        }
    }
}
