//! Composite status aggregation
//!
//! Builds an ephemeral snapshot from the broker probe, service discovery,
//! and the configured trading schedule. A downstream outage degrades the
//! corresponding snapshot fields; it never turns into an error for the
//! caller.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::schema::TraderConfig;
use crate::orchestrator::controller::ServiceController;
use crate::orchestrator::platform::ServiceState;
use crate::status::probe::BrokerProbe;

/// Health of one managed service as seen in a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceHealth {
    Healthy,
    Unhealthy,
    Unknown,
}

impl ServiceHealth {
    pub fn is_healthy(&self) -> bool {
        matches!(self, ServiceHealth::Healthy)
    }
}

/// Per-service entry in a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub name: String,
    pub health: ServiceHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Composite point-in-time status; recomputed on every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub broker_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broker_error: Option<String>,
    pub services: Vec<ServiceStatus>,
    pub in_trading_window: bool,
    pub timestamp: DateTime<Utc>,
}

impl StatusSnapshot {
    /// True when the broker is reachable and every service is healthy
    pub fn all_healthy(&self) -> bool {
        self.broker_connected && self.services.iter().all(|s| s.health.is_healthy())
    }
}

/// Polls the controller and the broker probe into one snapshot
pub struct StatusAggregator {
    controller: Arc<ServiceController>,
    shared: Arc<RwLock<TraderConfig>>,
    probe: BrokerProbe,
    /// Names expected to exist even when discovery fails
    managed: Vec<String>,
}

impl StatusAggregator {
    pub fn new(
        controller: Arc<ServiceController>,
        shared: Arc<RwLock<TraderConfig>>,
        probe: BrokerProbe,
        managed: Vec<String>,
    ) -> Self {
        Self {
            controller,
            shared,
            probe,
            managed,
        }
    }

    /// Produce a snapshot. Infallible: downstream outages populate the
    /// corresponding fields instead of raising.
    pub async fn get_status(&self) -> StatusSnapshot {
        let cfg = self.shared.read().await.clone();

        let probe_result = self
            .probe
            .check(&cfg.connection.host, cfg.connection.port)
            .await;

        let services = self.service_statuses().await;

        let now = Local::now();
        let in_trading_window = cfg.schedule.contains(now.weekday(), now.time());

        debug!(
            broker = probe_result.connected,
            services = services.len(),
            in_window = in_trading_window,
            "status snapshot computed"
        );

        StatusSnapshot {
            broker_connected: probe_result.connected,
            broker_error: probe_result.reason,
            services,
            in_trading_window,
            timestamp: Utc::now(),
        }
    }

    async fn service_statuses(&self) -> Vec<ServiceStatus> {
        let discovered = match self.controller.discover().await {
            Ok(list) => list,
            Err(e) => {
                // Discovery outage: every managed service becomes unknown
                let reason = e.to_string();
                return self
                    .managed
                    .iter()
                    .map(|name| ServiceStatus {
                        name: name.clone(),
                        health: ServiceHealth::Unknown,
                        reason: Some(reason.clone()),
                    })
                    .collect();
            }
        };

        let mut statuses: Vec<ServiceStatus> = discovered
            .iter()
            .map(|d| match d.state {
                ServiceState::Running => ServiceStatus {
                    name: d.name.clone(),
                    health: ServiceHealth::Healthy,
                    reason: None,
                },
                ServiceState::Paused => ServiceStatus {
                    name: d.name.clone(),
                    health: ServiceHealth::Unhealthy,
                    reason: Some("paused".to_string()),
                },
                ServiceState::Unknown => ServiceStatus {
                    name: d.name.clone(),
                    health: ServiceHealth::Unknown,
                    reason: Some("state could not be determined".to_string()),
                },
            })
            .collect();

        // Managed services missing from discovery are reported, not dropped
        for name in &self.managed {
            if !discovered.iter().any(|d| &d.name == name) {
                statuses.push(ServiceStatus {
                    name: name.clone(),
                    health: ServiceHealth::Unknown,
                    reason: Some("not discovered".to_string()),
                });
            }
        }

        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }
}
