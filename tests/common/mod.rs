//! Shared test fixtures: an in-memory orchestration platform with
//! injectable failures and builders for a fully wired apply workflow.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use tradmin::config::{ConfigStore, TraderConfig};
use tradmin::error::PlatformError;
use tradmin::orchestrator::{
    ReloadSignaler, ServiceController, ServiceDescriptor, ServicePlatform, ServiceState,
};
use tradmin::workflow::ApplyWorkflow;

/// In-memory platform. Capacity per service, plus switches to make pause
/// (scale to zero) or resume (scale up) fail for chosen services.
#[derive(Default)]
pub struct FakePlatform {
    capacities: Mutex<HashMap<String, u32>>,
    fail_pause_for: Mutex<HashSet<String>>,
    fail_resume_for: Mutex<HashSet<String>>,
    /// Remaining resume failures per service; decremented on each attempt
    fail_resume_times: Mutex<HashMap<String, u32>>,
    signaled: Mutex<Vec<String>>,
    /// Artificial latency per capacity change, for concurrency tests
    pub op_delay: Option<Duration>,
}

impl FakePlatform {
    pub fn with_services(services: &[(&str, u32)]) -> Self {
        let fake = Self::default();
        {
            let mut caps = fake.capacities.lock().unwrap();
            for (name, cap) in services {
                caps.insert(name.to_string(), *cap);
            }
        }
        fake
    }

    pub fn with_op_delay(mut self, delay: Duration) -> Self {
        self.op_delay = Some(delay);
        self
    }

    pub fn fail_pause_for(&self, name: &str) {
        self.fail_pause_for.lock().unwrap().insert(name.to_string());
    }

    pub fn fail_resume_for(&self, name: &str) {
        self.fail_resume_for
            .lock()
            .unwrap()
            .insert(name.to_string());
    }

    /// Fail the next `times` resume attempts for a service, then recover
    pub fn fail_resume_times(&self, name: &str, times: u32) {
        self.fail_resume_times
            .lock()
            .unwrap()
            .insert(name.to_string(), times);
    }

    pub fn clear_failures(&self) {
        self.fail_pause_for.lock().unwrap().clear();
        self.fail_resume_for.lock().unwrap().clear();
        self.fail_resume_times.lock().unwrap().clear();
    }

    pub fn capacity(&self, name: &str) -> u32 {
        *self.capacities.lock().unwrap().get(name).unwrap()
    }

    pub fn signaled(&self) -> Vec<String> {
        self.signaled.lock().unwrap().clone()
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
        if let Some(delay) = self.op_delay {
            tokio::time::sleep(delay).await;
        }
        if capacity == 0 && self.fail_pause_for.lock().unwrap().contains(name) {
            return Err(PlatformError::Signal("injected pause failure".to_string()));
        }
        if capacity > 0 && self.fail_resume_for.lock().unwrap().contains(name) {
            return Err(PlatformError::Signal("injected resume failure".to_string()));
        }
        if capacity > 0 {
            let mut counted = self.fail_resume_times.lock().unwrap();
            if let Some(remaining) = counted.get_mut(name) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(PlatformError::Signal(
                        "injected transient resume failure".to_string(),
                    ));
                }
            }
        }
        self.capacities
            .lock()
            .unwrap()
            .insert(name.to_string(), capacity);
        Ok(())
    }

    async fn signal_reload(&self, name: &str) -> Result<(), PlatformError> {
        self.signaled.lock().unwrap().push(name.to_string());
        Ok(())
    }
}

pub const MANAGED: [&str; 2] = ["orchestrator", "scanner"];

pub fn managed_names() -> Vec<String> {
    MANAGED.iter().map(|s| s.to_string()).collect()
}

/// Wire a workflow over the fake platform and a config store rooted in
/// `dir`, with `initial` already persisted.
pub fn build_workflow(
    platform: Arc<FakePlatform>,
    dir: &tempfile::TempDir,
    initial: &TraderConfig,
) -> (ApplyWorkflow, ConfigStore, Arc<RwLock<TraderConfig>>) {
    let store = ConfigStore::new(dir.path().join("config.toml"));
    store.save(initial).expect("seed config");

    let shared = Arc::new(RwLock::new(initial.clone()));
    let controller = Arc::new(ServiceController::new(platform.clone(), ""));
    let signaler = ReloadSignaler::new(platform);

    let workflow = ApplyWorkflow::new(
        store.clone(),
        controller,
        signaler,
        shared.clone(),
        managed_names(),
    );
    (workflow, store, shared)
}
