use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tokio::sync::{broadcast, RwLock};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use tradmin::alerts::AlertNotifier;
use tradmin::cli::{BackupCommands, Cli, Commands};
use tradmin::config::{
    ConfigStore, ConfigWatcher, TraderConfig, TradingConfig, WatcherConfig, NUMERIC_FIELDS,
};
use tradmin::error::AdminError;
use tradmin::orchestrator::{ProcessPlatform, ReloadSignaler, ServiceController};
use tradmin::settings::AdminSettings;
use tradmin::status::{BrokerProbe, StatusAggregator, StatusServer};
use tradmin::workflow::ApplyWorkflow;
use tradmin::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = AdminSettings::load_from(&cli.settings)?;
    let _log_guard = init_logging(&settings);

    if let Err(errors) = settings.validate() {
        for e in &errors {
            error!("settings error: {}", e);
        }
        std::process::exit(1);
    }

    match cli.command {
        Commands::Watch => run_daemon(&settings).await,
        Commands::Apply { file, acknowledge } => run_apply(&settings, &file, acknowledge).await,
        Commands::Status { json } => run_status(&settings, json).await,
        Commands::Validate { file } => run_validate(&settings, file.as_deref()),
        Commands::Schema => run_schema(),
        Commands::Backups { command } => run_backups(&settings, command),
        Commands::AlertTest { channel } => run_alert_test(&settings, &channel).await,
    }
}

/// Long-lived components wired off the settings
struct Stack {
    store: ConfigStore,
    shared: Arc<RwLock<TraderConfig>>,
    platform: Arc<ProcessPlatform>,
    controller: Arc<ServiceController>,
    aggregator: Arc<StatusAggregator>,
}

fn build_stack(settings: &AdminSettings) -> Stack {
    let store = ConfigStore::new(&settings.config_path);

    let initial = match store.load() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(error = %e, "could not load configuration, starting from defaults");
            TraderConfig::default()
        }
    };
    let shared = Arc::new(RwLock::new(initial));

    let platform = Arc::new(ProcessPlatform::new(&settings.services.run_dir));
    let controller = Arc::new(
        ServiceController::new(platform.clone(), settings.services.selector.clone())
            .with_op_timeout(Duration::from_secs(settings.services.op_timeout_secs)),
    );

    let aggregator = Arc::new(StatusAggregator::new(
        controller.clone(),
        shared.clone(),
        BrokerProbe::new(Duration::from_secs(settings.probe.timeout_secs)),
        settings.services.managed.clone(),
    ));

    Stack {
        store,
        shared,
        platform,
        controller,
        aggregator,
    }
}

fn build_workflow(settings: &AdminSettings, stack: &Stack) -> ApplyWorkflow {
    ApplyWorkflow::new(
        stack.store.clone(),
        stack.controller.clone(),
        ReloadSignaler::new(stack.platform.clone()),
        stack.shared.clone(),
        settings.services.managed.clone(),
    )
    .with_resume_retry(settings.services.resume_retry.clone())
}

async fn run_daemon(settings: &AdminSettings) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "tradmin daemon starting");
    let stack = build_stack(settings);

    let (shutdown_tx, _) = broadcast::channel(1);

    let watcher = ConfigWatcher::new(
        stack.store.clone(),
        stack.shared.clone(),
        WatcherConfig {
            debounce: Duration::from_millis(settings.watcher.debounce_ms),
            retry_delay: Duration::from_secs(settings.watcher.retry_delay_secs),
        },
    );
    let watcher_task = tokio::spawn(watcher.run(shutdown_tx.subscribe()));

    let server_task = if settings.status.enabled {
        let addr = settings
            .status
            .bind
            .parse()
            .map_err(|e| AdminError::Internal(format!("invalid status bind address: {}", e)))?;
        let server = StatusServer::new(stack.aggregator.clone(), addr);
        Some(tokio::spawn(server.run(shutdown_tx.subscribe())))
    } else {
        None
    };

    shutdown_signal().await;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(());

    let _ = watcher_task.await;
    if let Some(task) = server_task {
        match task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "status server exited with error"),
            Err(e) => error!(error = %e, "status server task panicked"),
        }
    }

    info!("shutdown complete");
    Ok(())
}

async fn run_apply(settings: &AdminSettings, file: &Path, acknowledge: bool) -> Result<()> {
    let candidate = ConfigStore::new(file).load()?;

    let stack = build_stack(settings);
    let workflow = build_workflow(settings, &stack);

    if acknowledge {
        workflow.acknowledge_resume_failure();
    }

    match workflow.apply(candidate).await {
        Ok(report) => {
            println!("apply succeeded");
            if !report.signal_failures.is_empty() {
                println!(
                    "note: reload signal not delivered to: {}",
                    report
                        .signal_failures
                        .keys()
                        .cloned()
                        .collect::<Vec<_>>()
                        .join(", ")
                );
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("apply failed: {}", e);
            if let Some(report) = e.report() {
                for violation in &report.violations {
                    eprintln!("  violation: {}", violation);
                }
                for (service, reason) in &report.service_failures {
                    eprintln!("  service {}: {}", service, reason);
                }
                eprintln!("  services left paused: {}", report.services_left_paused);
                eprintln!("  config persisted: {}", report.config_persisted);
            }
            std::process::exit(1);
        }
    }
}

async fn run_status(settings: &AdminSettings, json: bool) -> Result<()> {
    let stack = build_stack(settings);
    let snapshot = stack.aggregator.get_status().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    let broker = if snapshot.broker_connected {
        "connected".to_string()
    } else {
        format!(
            "disconnected ({})",
            snapshot.broker_error.as_deref().unwrap_or("unknown")
        )
    };
    println!("broker:         {}", broker);
    println!(
        "trading window: {}",
        if snapshot.in_trading_window {
            "open"
        } else {
            "closed"
        }
    );
    for service in &snapshot.services {
        match &service.reason {
            Some(reason) => println!("service {:<20} {:?} ({})", service.name, service.health, reason),
            None => println!("service {:<20} {:?}", service.name, service.health),
        }
    }
    Ok(())
}

fn run_validate(settings: &AdminSettings, file: Option<&Path>) -> Result<()> {
    let path = file.unwrap_or(&settings.config_path);
    let cfg = ConfigStore::new(path).load()?;

    let violations = ConfigStore::validate(&cfg);
    if violations.is_empty() {
        println!("{} is valid", path.display());
        Ok(())
    } else {
        for violation in &violations {
            eprintln!("{}", violation);
        }
        std::process::exit(1);
    }
}

fn run_schema() -> Result<()> {
    let mut fields: Vec<serde_json::Value> = NUMERIC_FIELDS
        .iter()
        .map(|spec| {
            serde_json::json!({
                "field": spec.path(),
                "type": "number",
                "min": spec.min,
                "max": spec.max,
            })
        })
        .collect();

    fields.push(serde_json::json!({
        "field": "trading.mode",
        "type": "enum",
        "values": TradingConfig::MODES,
    }));
    for field in ["schedule.start", "schedule.stop"] {
        fields.push(serde_json::json!({
            "field": field,
            "type": "time",
            "format": "HH:MM",
        }));
    }

    println!("{}", serde_json::to_string_pretty(&fields)?);
    Ok(())
}

fn run_backups(settings: &AdminSettings, command: BackupCommands) -> Result<()> {
    let store = ConfigStore::new(&settings.config_path);
    match command {
        BackupCommands::List => {
            let backups = store.list_backups()?;
            if backups.is_empty() {
                println!("no backups found");
            }
            for backup in backups {
                println!("{}", backup.display());
            }
            Ok(())
        }
        BackupCommands::Restore { file } => {
            store.restore_backup(&file)?;
            println!("restored {}", file.display());
            Ok(())
        }
    }
}

async fn run_alert_test(settings: &AdminSettings, channel: &str) -> Result<()> {
    let cfg = ConfigStore::new(&settings.config_path).load()?;
    let notifier = AlertNotifier::new()?;
    let outcome = notifier.test_alert(&cfg.alerts, channel).await?;
    println!("{}", outcome);
    Ok(())
}

fn init_logging(settings: &AdminSettings) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("info,tradmin={}", settings.logging.level))
    });

    if let Some(path) = &settings.logging.file {
        let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "tradmin.log".into());
        let appender = tracing_appender::rolling::never(dir, file_name);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(writer)
            .with_ansi(false)
            .init();
        Some(guard)
    } else if settings.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
        None
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
        None
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
