//! Best-effort configuration reload signaling
//!
//! After a resume, each managed service is asked to reload its
//! configuration. A failed or unsupported signal is logged and reported
//! but never fails the apply: services also watch the config file
//! themselves and will converge on their own.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::orchestrator::platform::ServicePlatform;

/// Fans reload signals out to managed services
pub struct ReloadSignaler {
    platform: Arc<dyn ServicePlatform>,
    timeout: Duration,
}

impl ReloadSignaler {
    pub fn new(platform: Arc<dyn ServicePlatform>) -> Self {
        Self {
            platform,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Signal every named service; returns the per-service failures.
    ///
    /// An empty map means every signal was delivered.
    pub async fn signal_all(&self, names: &[String]) -> BTreeMap<String, String> {
        let mut failures = BTreeMap::new();

        for name in names {
            let result = tokio::time::timeout(self.timeout, self.platform.signal_reload(name)).await;
            match result {
                Ok(Ok(())) => debug!(service = %name, "reload signal sent"),
                Ok(Err(e)) => {
                    warn!(service = %name, error = %e, "reload signal failed");
                    failures.insert(name.clone(), e.to_string());
                }
                Err(_) => {
                    warn!(service = %name, "reload signal timed out");
                    failures.insert(name.clone(), "timed out".to_string());
                }
            }
        }

        failures
    }
}
