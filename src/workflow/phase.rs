//! Apply workflow state machine states

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase that produced an apply failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    /// Pausing the managed services failed
    Pause,
    /// The candidate configuration was rejected
    Validation,
    /// Persisting the configuration failed
    Save,
    /// Services could not be resumed after the save; configuration and
    /// running state have diverged
    Resume,
}

impl FailurePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePhase::Pause => "PAUSE_FAILED",
            FailurePhase::Validation => "VALIDATION_FAILED",
            FailurePhase::Save => "SAVE_FAILED",
            FailurePhase::Resume => "RESUME_FAILED",
        }
    }
}

impl fmt::Display for FailurePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Apply workflow state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplyPhase {
    /// No apply in flight
    Idle,
    /// Scaling managed services to zero
    Pausing,
    /// Validating and persisting the candidate configuration
    Saving,
    /// Restoring service capacities and signaling reload
    Resuming,
    /// An apply failed in the tagged phase
    Failed(FailurePhase),
}

impl ApplyPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplyPhase::Idle => "IDLE",
            ApplyPhase::Pausing => "PAUSING",
            ApplyPhase::Saving => "SAVING",
            ApplyPhase::Resuming => "RESUMING",
            ApplyPhase::Failed(phase) => phase.as_str(),
        }
    }

    /// Check if this state can transition to another state
    pub fn can_transition_to(&self, target: ApplyPhase) -> bool {
        use ApplyPhase::*;

        match (self, target) {
            // From Idle
            (Idle, Pausing) => true,

            // From Pausing
            (Pausing, Saving) => true,
            (Pausing, Failed(FailurePhase::Pause)) => true,

            // From Saving (validation and persistence both happen here)
            (Saving, Resuming) => true,
            (Saving, Failed(FailurePhase::Validation)) => true,
            (Saving, Failed(FailurePhase::Save)) => true,

            // From Resuming
            (Resuming, Idle) => true,
            (Resuming, Failed(FailurePhase::Resume)) => true,

            // A failed apply returns to Idle for the next attempt; the
            // Resume case additionally requires acknowledgement, enforced
            // by the workflow, not the state machine
            (Failed(_), Idle) => true,
            (Failed(_), Pausing) => true,

            // All other transitions are invalid
            _ => false,
        }
    }

    /// Is an apply currently executing?
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            ApplyPhase::Pausing | ApplyPhase::Saving | ApplyPhase::Resuming
        )
    }

    /// Did the last apply leave config and running state diverged?
    pub fn is_diverged(&self) -> bool {
        matches!(self, ApplyPhase::Failed(FailurePhase::Resume))
    }
}

impl fmt::Display for ApplyPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
