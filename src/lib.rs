pub mod alerts;
pub mod cli;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod settings;
pub mod status;
pub mod workflow;

pub use alerts::AlertNotifier;
pub use config::{ConfigStore, ConfigWatcher, TraderConfig, Violation, WatcherConfig};
pub use error::{AdminError, ApplyError, ConfigError, PlatformError, Result, ServiceError};
pub use orchestrator::{
    ProcessPlatform, ReloadSignaler, ServiceController, ServiceDescriptor, ServicePlatform,
    ServiceState,
};
pub use settings::AdminSettings;
pub use status::{BrokerProbe, ServiceHealth, StatusAggregator, StatusServer, StatusSnapshot};
pub use workflow::{ApplyPhase, ApplyReport, ApplyWorkflow, FailurePhase, ResumeRetryConfig};
