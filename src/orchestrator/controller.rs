//! Service pause/resume coordination
//!
//! Pausing records each service's current capacity and requests zero;
//! resuming restores the recorded capacity (default 1 when none was
//! recorded). Both operations walk the full service list even when
//! individual services fail and return one aggregate error naming every
//! failure. Pausing an already-paused service, or resuming an
//! already-running one, is a no-op success.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{PlatformError, ServiceError};
use crate::orchestrator::platform::{ServiceDescriptor, ServicePlatform};

/// Capacity requested on resume when no pre-pause value was recorded
pub const DEFAULT_RESUME_CAPACITY: u32 = 1;

/// Coordinates pause/resume of managed services through the platform
pub struct ServiceController {
    platform: Arc<dyn ServicePlatform>,
    selector: String,
    /// Desired capacities recorded at pause time, keyed by service name
    recorded: RwLock<HashMap<String, u32>>,
    op_timeout: Duration,
}

impl ServiceController {
    pub fn new(platform: Arc<dyn ServicePlatform>, selector: impl Into<String>) -> Self {
        Self {
            platform,
            selector: selector.into(),
            recorded: RwLock::new(HashMap::new()),
            op_timeout: Duration::from_secs(10),
        }
    }

    /// Override the per-operation platform timeout
    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    /// Discover managed services matching the configured selector
    pub async fn discover(&self) -> Result<Vec<ServiceDescriptor>, ServiceError> {
        self.bounded(self.platform.discover(&self.selector))
            .await
            .map_err(|e| ServiceError::Discovery(e.to_string()))
    }

    /// Pause the named services by scaling each to zero capacity.
    ///
    /// Failures are collected per service; remaining services are still
    /// attempted.
    pub async fn pause(&self, names: &[String]) -> Result<(), ServiceError> {
        let mut failures = BTreeMap::new();

        for name in names {
            match self.pause_one(name).await {
                Ok(paused) => {
                    if paused {
                        info!(service = %name, "service paused");
                    } else {
                        debug!(service = %name, "service already paused");
                    }
                }
                Err(e) => {
                    warn!(service = %name, error = %e, "failed to pause service");
                    failures.insert(name.clone(), e.to_string());
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Pause { failures })
        }
    }

    /// Resume the named services, restoring recorded capacities.
    ///
    /// Same aggregate-error, idempotent semantics as [`Self::pause`].
    pub async fn resume(&self, names: &[String]) -> Result<(), ServiceError> {
        let mut failures = BTreeMap::new();

        for name in names {
            match self.resume_one(name).await {
                Ok(resumed) => {
                    if resumed {
                        info!(service = %name, "service resumed");
                    } else {
                        debug!(service = %name, "service already running");
                    }
                }
                Err(e) => {
                    warn!(service = %name, error = %e, "failed to resume service");
                    failures.insert(name.clone(), e.to_string());
                }
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ServiceError::Resume { failures })
        }
    }

    /// Returns Ok(false) when the service was already paused
    async fn pause_one(&self, name: &str) -> Result<bool, PlatformError> {
        let current = self.bounded(self.platform.get_capacity(name)).await?;
        if current == 0 {
            return Ok(false);
        }

        self.recorded.write().await.insert(name.to_string(), current);
        self.bounded(self.platform.set_capacity(name, 0)).await?;
        Ok(true)
    }

    /// Returns Ok(false) when the service was already at its target capacity
    async fn resume_one(&self, name: &str) -> Result<bool, PlatformError> {
        let target = self
            .recorded
            .read()
            .await
            .get(name)
            .copied()
            .unwrap_or(DEFAULT_RESUME_CAPACITY);

        let current = self.bounded(self.platform.get_capacity(name)).await?;
        if current == target {
            self.recorded.write().await.remove(name);
            return Ok(false);
        }

        self.bounded(self.platform.set_capacity(name, target)).await?;
        self.recorded.write().await.remove(name);
        Ok(true)
    }

    async fn bounded<T>(
        &self,
        fut: impl std::future::Future<Output = Result<T, PlatformError>>,
    ) -> Result<T, PlatformError> {
        tokio::time::timeout(self.op_timeout, fut)
            .await
            .map_err(|_| PlatformError::Timeout)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::platform::ServiceState;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory platform with injectable per-service failures
    #[derive(Default)]
    struct FakePlatform {
        capacities: Mutex<HashMap<String, u32>>,
        fail_set_capacity: Mutex<HashSet<String>>,
    }

    impl FakePlatform {
        fn with_services(services: &[(&str, u32)]) -> Self {
            let fake = Self::default();
            {
                let mut caps = fake.capacities.lock().unwrap();
                for (name, cap) in services {
                    caps.insert(name.to_string(), *cap);
                }
            }
            fake
        }

        fn fail_set_capacity_for(&self, name: &str) {
            self.fail_set_capacity
                .lock()
                .unwrap()
                .insert(name.to_string());
        }

        fn capacity(&self, name: &str) -> u32 {
            *self.capacities.lock().unwrap().get(name).unwrap()
        }
    }

    #[async_trait]
    impl ServicePlatform for FakePlatform {
        async fn discover(&self, selector: &str) -> Result<Vec<ServiceDescriptor>, PlatformError> {
            let caps = self.capacities.lock().unwrap();
            let mut found: Vec<ServiceDescriptor> = caps
                .iter()
                .filter(|(name, _)| name.contains(selector))
                .map(|(name, cap)| {
                    let state = if *cap > 0 {
                        ServiceState::Running
                    } else {
                        ServiceState::Paused
                    };
                    ServiceDescriptor::new(name.clone(), *cap, state)
                })
                .collect();
            found.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(found)
        }

        async fn get_capacity(&self, name: &str) -> Result<u32, PlatformError> {
            self.capacities
                .lock()
                .unwrap()
                .get(name)
                .copied()
                .ok_or_else(|| PlatformError::NotFound(name.to_string()))
        }

        async fn set_capacity(&self, name: &str, capacity: u32) -> Result<(), PlatformError> {
            if self.fail_set_capacity.lock().unwrap().contains(name) {
                return Err(PlatformError::Signal("injected failure".to_string()));
            }
            self.capacities
                .lock()
                .unwrap()
                .insert(name.to_string(), capacity);
            Ok(())
        }

        async fn signal_reload(&self, _name: &str) -> Result<(), PlatformError> {
            Ok(())
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_pause_records_and_zeroes_capacity() {
        let platform = Arc::new(FakePlatform::with_services(&[
            ("orchestrator", 3),
            ("scanner", 1),
        ]));
        let controller = ServiceController::new(platform.clone(), "");

        controller
            .pause(&names(&["orchestrator", "scanner"]))
            .await
            .unwrap();
        assert_eq!(platform.capacity("orchestrator"), 0);
        assert_eq!(platform.capacity("scanner"), 0);

        controller
            .resume(&names(&["orchestrator", "scanner"]))
            .await
            .unwrap();
        // Recorded capacities restored, not a flat default
        assert_eq!(platform.capacity("orchestrator"), 3);
        assert_eq!(platform.capacity("scanner"), 1);
    }

    #[tokio::test]
    async fn test_pause_twice_is_idempotent() {
        let platform = Arc::new(FakePlatform::with_services(&[("orchestrator", 2)]));
        let controller = ServiceController::new(platform.clone(), "");
        let set = names(&["orchestrator"]);

        controller.pause(&set).await.unwrap();
        controller.pause(&set).await.unwrap();
        assert_eq!(platform.capacity("orchestrator"), 0);

        // Second pause must not have clobbered the recorded capacity
        controller.resume(&set).await.unwrap();
        assert_eq!(platform.capacity("orchestrator"), 2);
    }

    #[tokio::test]
    async fn test_resume_twice_is_idempotent() {
        let platform = Arc::new(FakePlatform::with_services(&[("scanner", 1)]));
        let controller = ServiceController::new(platform.clone(), "");
        let set = names(&["scanner"]);

        controller.pause(&set).await.unwrap();
        controller.resume(&set).await.unwrap();
        controller.resume(&set).await.unwrap();
        assert_eq!(platform.capacity("scanner"), 1);
    }

    #[tokio::test]
    async fn test_resume_without_record_uses_default() {
        let platform = Arc::new(FakePlatform::with_services(&[("scanner", 0)]));
        let controller = ServiceController::new(platform.clone(), "");

        controller.resume(&names(&["scanner"])).await.unwrap();
        assert_eq!(platform.capacity("scanner"), DEFAULT_RESUME_CAPACITY);
    }

    #[tokio::test]
    async fn test_pause_failure_does_not_block_other_services() {
        let platform = Arc::new(FakePlatform::with_services(&[
            ("orchestrator", 1),
            ("scanner", 1),
        ]));
        platform.fail_set_capacity_for("scanner");
        let controller = ServiceController::new(platform.clone(), "");

        let err = controller
            .pause(&names(&["orchestrator", "scanner"]))
            .await
            .unwrap_err();

        match err {
            ServiceError::Pause { failures } => {
                assert_eq!(failures.len(), 1);
                assert!(failures.contains_key("scanner"));
            }
            other => panic!("unexpected error: {other}"),
        }
        // The healthy service was still paused
        assert_eq!(platform.capacity("orchestrator"), 0);
        assert_eq!(platform.capacity("scanner"), 1);
    }

    #[tokio::test]
    async fn test_unknown_service_is_reported_not_fatal() {
        let platform = Arc::new(FakePlatform::with_services(&[("orchestrator", 1)]));
        let controller = ServiceController::new(platform.clone(), "");

        let err = controller
            .pause(&names(&["orchestrator", "ghost"]))
            .await
            .unwrap_err();
        let failures = err.failures().unwrap();
        assert!(failures.contains_key("ghost"));
        assert_eq!(platform.capacity("orchestrator"), 0);
    }

    #[tokio::test]
    async fn test_discover_filters_by_selector() {
        let platform = Arc::new(FakePlatform::with_services(&[
            ("trader-orchestrator", 1),
            ("trader-scanner", 1),
            ("unrelated", 1),
        ]));
        let controller = ServiceController::new(platform, "trader-");

        let found = controller.discover().await.unwrap();
        let found_names: Vec<&str> = found.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(found_names, vec!["trader-orchestrator", "trader-scanner"]);
    }
}
