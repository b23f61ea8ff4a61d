//! Configuration file watcher for hot-reload support
//!
//! Reloaded configs are handed to the application, which pushes the
//! `input` section into the listener via `apply_settings`.

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Delay before re-reading, so editors finish writing
const RELOAD_DEBOUNCE: Duration = Duration::from_millis(100);

/// Watches one config file and yields each successfully reloaded config
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<AppConfig>,
}

/// Turns file events into at most one pending reload
struct Reloader {
    path: PathBuf,
    runtime: Handle,
    tx: mpsc::Sender<AppConfig>,
    pending: Arc<AtomicBool>,
}

impl Reloader {
    fn on_event(&self, res: notify::Result<Event>) {
        let event = match res {
            Ok(event) => event,
            Err(e) => {
                error!("Watch error: {}", e);
                return;
            },
        };

        // Editors that save by rename show up as Create
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return;
        }
        debug!("Config file changed: {:?}", event.paths);

        // One write often produces several events; they share one reload
        if self.pending.swap(true, Ordering::SeqCst) {
            return;
        }

        let path = self.path.clone();
        let tx = self.tx.clone();
        let pending = self.pending.clone();

        self.runtime.spawn(async move {
            tokio::time::sleep(RELOAD_DEBOUNCE).await;
            pending.store(false, Ordering::SeqCst);

            match AppConfig::load(&path).await {
                Ok(config) => {
                    info!("🔄 Configuration reloaded");
                    if tx.send(config).await.is_err() {
                        debug!("Config watcher closed; dropping reload");
                    }
                },
                Err(e) => {
                    warn!("⚠️  Failed to reload config (keeping old settings): {:#}", e);
                },
            }
        });
    }
}

impl ConfigWatcher {
    /// Load `path` and start watching it
    ///
    /// Must be called inside a Tokio runtime; notify delivers events on its
    /// own thread, so reloads are spawned onto the captured handle.
    ///
    /// # Returns
    /// The watcher and the initially loaded configuration
    pub async fn new(path: impl Into<PathBuf>) -> Result<(Self, AppConfig)> {
        let path = path.into();
        let initial = AppConfig::load(&path)
            .await
            .context("Failed to load initial config")?;

        let (tx, rx) = mpsc::channel(10);
        let reloader = Reloader {
            path: path.clone(),
            runtime: Handle::current(),
            tx,
            pending: Arc::new(AtomicBool::new(false)),
        };

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| reloader.on_event(res))?;
        watcher
            .watch(&path, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config file: {}", path.display()))?;

        info!("Config file watcher started for: {}", path.display());
        Ok((Self { _watcher: watcher, rx }, initial))
    }

    /// Wait for the next config update
    ///
    /// Returns `None` if the watcher has been closed
    pub async fn next_config(&mut self) -> Option<AppConfig> {
        self.rx.recv().await
    }
}
