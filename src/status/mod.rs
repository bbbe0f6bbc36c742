//! Status aggregation: broker probe, per-service health, trading window
//!
//! Snapshots are ephemeral and recomputed on every request; nothing here
//! is persisted or cached.

pub mod aggregator;
pub mod probe;
pub mod server;

pub use aggregator::{ServiceHealth, ServiceStatus, StatusAggregator, StatusSnapshot};
pub use probe::{BrokerProbe, ProbeResult};
pub use server::StatusServer;
