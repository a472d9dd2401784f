//! Configuration file watcher for hot reload.
//!
//! File events are coalesced: after the first event the watcher waits
//! `SETTLE` for the burst to finish (editors often truncate, then write),
//! reads the file once, and only forwards configs whose text differs from
//! the last one applied.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::ChaosConfig;

/// Quiet period before a changed file is read.
const SETTLE: Duration = Duration::from_millis(250);

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<ChaosConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<ChaosConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. Must be called inside a Tokio runtime.
    ///
    /// The returned watcher must be kept alive for updates to flow; dropping
    /// it also stops the reload task.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        let _ = event_tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        let path = self.path.clone();
        let update_tx = self.update_tx;
        let mut applied = std::fs::read_to_string(&path).ok();

        tokio::spawn(async move {
            while event_rx.recv().await.is_some() {
                tokio::time::sleep(SETTLE).await;
                while event_rx.try_recv().is_ok() {}

                let content = match tokio::fs::read_to_string(&path).await {
                    Ok(content) => content,
                    Err(e) => {
                        tracing::error!(path = ?path, error = %e, "Failed to read chaos policy");
                        continue;
                    }
                };
                if applied.as_deref() == Some(content.as_str()) {
                    tracing::debug!(path = ?path, "Chaos policy unchanged, skipping reload");
                    continue;
                }

                tracing::info!(path = ?path, "Chaos policy change detected, reloading");
                match parse_config(&content) {
                    Ok(config) => {
                        applied = Some(content);
                        if update_tx.send(config).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            error = %e,
                            "Failed to reload chaos policy, keeping current one"
                        );
                    }
                }
            }
        });

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}
