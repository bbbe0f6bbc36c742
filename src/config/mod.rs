//! Configuration subsystem: schema, validation, persistence, hot reload
//!
//! The on-disk TOML file is the single source of truth; the in-memory
//! `Arc<RwLock<TraderConfig>>` mirror is replaced wholesale by a successful
//! apply or a valid watcher reload, never mutated in place.

pub mod schema;
pub mod store;
pub mod validation;
pub mod watcher;

pub use schema::{
    AlertsConfig, ConnectionConfig, FieldSpec, OptionsConfig, ScheduleConfig, TraderConfig,
    TradingConfig, UniverseConfig, NUMERIC_FIELDS,
};
pub use store::ConfigStore;
pub use validation::{validate, Violation};
pub use watcher::{ConfigWatcher, WatcherConfig};
