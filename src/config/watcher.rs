//! Configuration file watcher for hot reload
//!
//! Watches the directory holding the config file and reloads the shared
//! in-memory configuration when the file is rewritten outside the apply
//! workflow (manual edit, external tooling). Editors produce bursts of
//! write events for one logical save, so events are debounced and only the
//! last one in a burst triggers a reload. Invalid content never replaces
//! the in-memory value.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, mpsc, RwLock};
use tracing::{info, warn};

use crate::config::schema::TraderConfig;
use crate::config::store::ConfigStore;

/// Internal watch-loop messages bridged from the notify callback thread
enum WatchSignal {
    Changed,
    WatchError(String),
}

/// Configuration for the watcher loop
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Quiet period after the last event before reloading (default: 500ms)
    pub debounce: Duration,
    /// Delay before re-registering the watch after an error (default: 2s)
    pub retry_delay: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            retry_delay: Duration::from_secs(2),
        }
    }
}

/// Watches the config file and swaps the shared in-memory configuration
pub struct ConfigWatcher {
    store: ConfigStore,
    shared: Arc<RwLock<TraderConfig>>,
    config: WatcherConfig,
}

impl ConfigWatcher {
    pub fn new(
        store: ConfigStore,
        shared: Arc<RwLock<TraderConfig>>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            store,
            shared,
            config,
        }
    }

    /// Run the watch loop until the shutdown signal fires.
    ///
    /// Watch registration errors are retried by re-registering; the loop
    /// itself only exits on shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let dir = watch_dir(self.store.path());
        info!(dir = %dir.display(), "config watcher starting");

        loop {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let watcher = match self.register(&dir, tx) {
                Ok(watcher) => watcher,
                Err(e) => {
                    warn!(error = %e, "failed to register config watch, retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.retry_delay) => continue,
                        _ = shutdown.recv() => return,
                    }
                }
            };

            loop {
                tokio::select! {
                    signal = rx.recv() => match signal {
                        Some(WatchSignal::Changed) => {
                            drain_burst(&mut rx, self.config.debounce).await;
                            self.reload().await;
                        }
                        Some(WatchSignal::WatchError(e)) => {
                            warn!(error = %e, "watch error, re-registering");
                            break;
                        }
                        None => break,
                    },
                    _ = shutdown.recv() => {
                        info!("config watcher shutting down");
                        drop(watcher);
                        return;
                    }
                }
            }

            drop(watcher);
            tokio::time::sleep(self.config.retry_delay).await;
        }
    }

    fn register(
        &self,
        dir: &PathBuf,
        tx: mpsc::UnboundedSender<WatchSignal>,
    ) -> Result<RecommendedWatcher, notify::Error> {
        let file_name = self
            .store
            .path()
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let matches_file = event
                        .paths
                        .iter()
                        .any(|p| p.file_name() == Some(file_name.as_os_str()));
                    if matches_file && (event.kind.is_modify() || event.kind.is_create()) {
                        let _ = tx.send(WatchSignal::Changed);
                    }
                }
                Err(e) => {
                    let _ = tx.send(WatchSignal::WatchError(e.to_string()));
                }
            },
            notify::Config::default(),
        )?;

        watcher.watch(dir, RecursiveMode::NonRecursive)?;
        Ok(watcher)
    }

    /// Reload from disk; keep the previous in-memory value on any failure
    async fn reload(&self) {
        let cfg = match self.store.load() {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, "config reload failed, keeping current configuration");
                return;
            }
        };

        let violations = ConfigStore::validate(&cfg);
        if !violations.is_empty() {
            warn!(
                violations = violations.len(),
                detail = %violations
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
                "reloaded config is invalid, keeping current configuration"
            );
            return;
        }

        *self.shared.write().await = cfg;
        info!("configuration reloaded from disk");
    }
}

/// Wait out a burst of change events: keeps consuming events until the
/// channel has been quiet for a full debounce window.
async fn drain_burst(rx: &mut mpsc::UnboundedReceiver<WatchSignal>, debounce: Duration) {
    loop {
        match tokio::time::timeout(debounce, rx.recv()).await {
            Ok(Some(WatchSignal::Changed)) => continue,
            // Errors and closure are handled by the caller's next recv
            Ok(Some(WatchSignal::WatchError(_))) | Ok(None) => return,
            Err(_) => return,
        }
    }
}

fn watch_dir(path: &std::path::Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
