//! Orchestrator runtime settings
//!
//! These are the orchestrator's own knobs (which services it manages,
//! timeouts, debounce window), distinct from the trading configuration it
//! administers. Loaded from layered sources: built-in defaults, then
//! `settings/default.toml`, then an environment-specific file, then
//! `TRADMIN`-prefixed environment variables.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::workflow::ResumeRetryConfig;

/// Main settings structure
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSettings {
    /// Path of the managed trading configuration file
    pub config_path: PathBuf,
    pub services: ServiceSettings,
    pub watcher: WatcherSettings,
    pub probe: ProbeSettings,
    pub status: StatusSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    /// Substring selector matched against discovered service names
    pub selector: String,
    /// Services paused and resumed around every apply
    pub managed: Vec<String>,
    /// Pid file directory for the process platform
    pub run_dir: PathBuf,
    /// Per-operation platform timeout in seconds
    #[serde(default = "default_op_timeout_secs")]
    pub op_timeout_secs: u64,
    /// Retry policy for the post-save resume phase
    #[serde(default)]
    pub resume_retry: ResumeRetryConfig,
}

fn default_op_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct WatcherSettings {
    /// Quiet window after the last file event before reloading
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Delay before re-registering a failed watch
    #[serde(default = "default_watch_retry_secs")]
    pub retry_delay_secs: u64,
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_watch_retry_secs() -> u64 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeSettings {
    /// Broker reachability probe timeout in seconds
    #[serde(default = "default_probe_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_probe_timeout_secs() -> u64 {
    2
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusSettings {
    /// Enable the read-only status HTTP server
    pub enabled: bool,
    /// Bind address, e.g. "127.0.0.1:8090"
    pub bind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also append logs to this file
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Emit JSON formatted logs
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            config_path: PathBuf::from("config/config.toml"),
            services: ServiceSettings {
                selector: "trader".to_string(),
                managed: vec!["trader-orchestrator".to_string(), "trader-scanner".to_string()],
                run_dir: PathBuf::from("run"),
                op_timeout_secs: default_op_timeout_secs(),
                resume_retry: ResumeRetryConfig::default(),
            },
            watcher: WatcherSettings {
                debounce_ms: default_debounce_ms(),
                retry_delay_secs: default_watch_retry_secs(),
            },
            probe: ProbeSettings {
                timeout_secs: default_probe_timeout_secs(),
            },
            status: StatusSettings {
                enabled: true,
                bind: "127.0.0.1:8090".to_string(),
            },
            logging: LoggingSettings::default(),
        }
    }
}

impl AdminSettings {
    /// Load settings from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("settings")
    }

    /// Load settings from a specific directory
    pub fn load_from<P: AsRef<Path>>(settings_dir: P) -> Result<Self, ConfigError> {
        let settings_dir = settings_dir.as_ref();

        let builder = Config::builder()
            // Start with default values
            .set_default("config_path", "config/config.toml")?
            .set_default("services.selector", "trader")?
            .set_default(
                "services.managed",
                vec!["trader-orchestrator".to_string(), "trader-scanner".to_string()],
            )?
            .set_default("services.run_dir", "run")?
            .set_default("services.op_timeout_secs", 10)?
            .set_default("services.resume_retry.max_attempts", 0)?
            .set_default("services.resume_retry.base_delay_ms", 500)?
            .set_default("services.resume_retry.max_delay_ms", 5000)?
            .set_default("watcher.debounce_ms", 500)?
            .set_default("watcher.retry_delay_secs", 2)?
            .set_default("probe.timeout_secs", 2)?
            .set_default("status.enabled", true)?
            .set_default("status.bind", "127.0.0.1:8090")?
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default settings file
            .add_source(File::from(settings_dir.join("default.toml")).required(false))
            // Load environment-specific settings (e.g. settings/production.toml)
            .add_source(
                File::from(settings_dir.join(
                    std::env::var("TRADMIN_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (TRADMIN_STATUS__BIND, etc.)
            .add_source(
                Environment::with_prefix("TRADMIN")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Validate settings values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.services.managed.is_empty() {
            errors.push("services.managed must name at least one service".to_string());
        }

        if self.services.op_timeout_secs == 0 {
            errors.push("services.op_timeout_secs must be positive".to_string());
        }

        if self.watcher.debounce_ms == 0 {
            errors.push("watcher.debounce_ms must be positive".to_string());
        }

        if self.status.enabled && self.status.bind.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!(
                "status.bind is not a valid socket address: {}",
                self.status.bind
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
