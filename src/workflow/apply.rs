//! The guarded configuration apply workflow
//!
//! Runs pause → validate → save → resume as one operation. Exactly one
//! apply may execute at a time; a second caller is rejected immediately
//! rather than queued. A resume failure after the save has landed is the
//! worst outcome this system can produce: configuration and running state
//! have diverged, so the workflow latches and refuses further applies
//! until an operator acknowledges the condition.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::config::schema::TraderConfig;
use crate::config::store::ConfigStore;
use crate::config::validation::Violation;
use crate::error::ApplyError;
use crate::orchestrator::controller::ServiceController;
use crate::orchestrator::reload::ReloadSignaler;
use crate::workflow::phase::{ApplyPhase, FailurePhase};

/// Resume retry policy for the post-save resume phase.
///
/// `max_attempts = 0` keeps the baseline behavior: one attempt, no retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumeRetryConfig {
    /// Additional attempts after the first failure
    pub max_attempts: u32,
    /// Base delay for exponential backoff in milliseconds
    pub base_delay_ms: u64,
    /// Maximum delay between attempts in milliseconds
    pub max_delay_ms: u64,
}

impl Default for ResumeRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            base_delay_ms: 500,
            max_delay_ms: 5_000,
        }
    }
}

impl ResumeRetryConfig {
    fn delay(&self, attempt: u32) -> Duration {
        let exp = 2u64.saturating_pow(attempt);
        Duration::from_millis(self.base_delay_ms.saturating_mul(exp).min(self.max_delay_ms))
    }
}

/// Outcome of one apply run, successful or not.
///
/// Every failure states which phase failed, whether services were left
/// paused, and whether the persisted configuration changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    /// `None` on success
    pub failed_phase: Option<FailurePhase>,
    /// Field violations when validation rejected the candidate
    pub violations: Vec<Violation>,
    /// Per-service pause/resume failures
    pub service_failures: BTreeMap<String, String>,
    /// Reload signals that were not delivered (informational only)
    pub signal_failures: BTreeMap<String, String>,
    pub services_left_paused: bool,
    pub config_persisted: bool,
    /// Extra context, e.g. the save error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub completed_at: DateTime<Utc>,
}

impl ApplyReport {
    fn new() -> Self {
        Self {
            failed_phase: None,
            violations: Vec::new(),
            service_failures: BTreeMap::new(),
            signal_failures: BTreeMap::new(),
            services_left_paused: false,
            config_persisted: false,
            message: None,
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed_phase.is_none()
    }

    /// One-line description for logs and error messages
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();
        if let Some(phase) = self.failed_phase {
            parts.push(phase.to_string());
        }
        if !self.violations.is_empty() {
            parts.push(format!("{} violation(s)", self.violations.len()));
        }
        if !self.service_failures.is_empty() {
            parts.push(format!(
                "failed services: {}",
                self.service_failures
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        parts.push(format!("services left paused: {}", self.services_left_paused));
        parts.push(format!("config persisted: {}", self.config_persisted));
        if let Some(msg) = &self.message {
            parts.push(msg.clone());
        }
        parts.join("; ")
    }
}

/// Composes store, controller, and signaler into the guarded apply
pub struct ApplyWorkflow {
    store: ConfigStore,
    controller: Arc<ServiceController>,
    signaler: ReloadSignaler,
    shared: Arc<RwLock<TraderConfig>>,
    /// Names of the services paused and resumed around every apply
    managed: Vec<String>,
    phase: std::sync::RwLock<ApplyPhase>,
    /// Single-flight guard; try_lock failure means an apply is running
    in_flight: Mutex<()>,
    /// Latched after a resume failure until an operator acknowledges
    needs_intervention: AtomicBool,
    resume_retry: ResumeRetryConfig,
}

impl ApplyWorkflow {
    pub fn new(
        store: ConfigStore,
        controller: Arc<ServiceController>,
        signaler: ReloadSignaler,
        shared: Arc<RwLock<TraderConfig>>,
        managed: Vec<String>,
    ) -> Self {
        Self {
            store,
            controller,
            signaler,
            shared,
            managed,
            phase: std::sync::RwLock::new(ApplyPhase::Idle),
            in_flight: Mutex::new(()),
            needs_intervention: AtomicBool::new(false),
            resume_retry: ResumeRetryConfig::default(),
        }
    }

    pub fn with_resume_retry(mut self, retry: ResumeRetryConfig) -> Self {
        self.resume_retry = retry;
        self
    }

    /// Current workflow phase
    pub fn phase(&self) -> ApplyPhase {
        *self.phase.read().unwrap()
    }

    /// Whether a resume failure is awaiting acknowledgement
    pub fn needs_intervention(&self) -> bool {
        self.needs_intervention.load(Ordering::SeqCst)
    }

    /// Clear the resume-failure latch after manual intervention
    pub fn acknowledge_resume_failure(&self) {
        if self.needs_intervention.swap(false, Ordering::SeqCst) {
            self.transition(ApplyPhase::Idle);
            info!("resume failure acknowledged, applies accepted again");
        }
    }

    /// Apply a candidate configuration to the running stack.
    ///
    /// Blocks until the full pause → validate → save → resume sequence
    /// completes or fails. Concurrent calls are rejected with
    /// [`ApplyError::InProgress`].
    pub async fn apply(&self, new_cfg: TraderConfig) -> Result<ApplyReport, ApplyError> {
        if self.needs_intervention() {
            return Err(ApplyError::InterventionRequired);
        }
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| ApplyError::InProgress)?;

        let names = self.managed.clone();
        let mut report = ApplyReport::new();
        info!(services = ?names, "apply started");

        // Phase 1: pause. On failure nothing was validated or written; the
        // services that did pause stay paused for the operator to inspect.
        self.transition(ApplyPhase::Pausing);
        if let Err(e) = self.controller.pause(&names).await {
            if let Some(failures) = e.failures() {
                report.services_left_paused = failures.len() < names.len();
                report.service_failures = failures.clone();
            }
            return Err(self.fail(FailurePhase::Pause, report));
        }

        // Phase 2: validate, then persist
        self.transition(ApplyPhase::Saving);
        let violations = ConfigStore::validate(&new_cfg);
        if !violations.is_empty() {
            report.violations = violations;
            report.service_failures = self.cleanup_resume(&names).await;
            report.services_left_paused = !report.service_failures.is_empty();
            return Err(self.fail(FailurePhase::Validation, report));
        }

        if let Err(e) = self.store.save(&new_cfg) {
            report.message = Some(e.to_string());
            report.service_failures = self.cleanup_resume(&names).await;
            report.services_left_paused = !report.service_failures.is_empty();
            return Err(self.fail(FailurePhase::Save, report));
        }
        report.config_persisted = true;

        // In-memory mirror follows the disk immediately so readers never
        // observe the old config after a successful save
        *self.shared.write().await = new_cfg;

        // Phase 3: resume, then best-effort reload signals
        self.transition(ApplyPhase::Resuming);
        if let Err(failures) = self.resume_with_retry(&names).await {
            report.service_failures = failures;
            report.services_left_paused = true;
            self.needs_intervention.store(true, Ordering::SeqCst);
            error!(
                "resume failed after save: configuration and running state have \
                 diverged; manual intervention required"
            );
            return Err(self.fail(FailurePhase::Resume, report));
        }

        report.signal_failures = self.signaler.signal_all(&names).await;

        self.transition(ApplyPhase::Idle);
        report.completed_at = Utc::now();
        info!("apply completed successfully");
        Ok(report)
    }

    /// Resume once, then up to `max_attempts` retries with backoff
    async fn resume_with_retry(
        &self,
        names: &[String],
    ) -> Result<(), BTreeMap<String, String>> {
        let mut last_failures = BTreeMap::new();

        for attempt in 0..=self.resume_retry.max_attempts {
            match self.controller.resume(names).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    if let Some(failures) = e.failures() {
                        last_failures = failures.clone();
                    }
                    if attempt < self.resume_retry.max_attempts {
                        let delay = self.resume_retry.delay(attempt);
                        warn!(
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            "resume failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Err(last_failures)
    }

    /// Best-effort single resume after a validation or save failure
    async fn cleanup_resume(&self, names: &[String]) -> BTreeMap<String, String> {
        match self.controller.resume(names).await {
            Ok(()) => BTreeMap::new(),
            Err(e) => {
                warn!(error = %e, "cleanup resume failed, services left paused");
                e.failures().cloned().unwrap_or_default()
            }
        }
    }

    fn fail(&self, phase: FailurePhase, mut report: ApplyReport) -> ApplyError {
        self.transition(ApplyPhase::Failed(phase));
        report.failed_phase = Some(phase);
        report.completed_at = Utc::now();
        warn!(phase = %phase, "apply failed: {}", report.summary());
        ApplyError::Failed { phase, report }
    }

    fn transition(&self, to: ApplyPhase) {
        let mut phase = self.phase.write().unwrap();
        if !phase.can_transition_to(to) && *phase != to {
            warn!(from = %*phase, to = %to, "unexpected phase transition");
        }
        *phase = to;
    }
}
