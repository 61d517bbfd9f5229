//! Catalog Hot-Reload
//!
//! Watches the catalog file and reloads it when it changes on disk. The
//! watcher only produces fresh catalogs; swapping one into a tracker (and
//! revalidating progress against it) is the caller's job.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, error, info, warn};

use super::catalog::QuestCatalog;
use crate::error::CatalogError;

/// Editors tend to write a file in several steps; wait this long for quiet
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Outcome of a reload triggered by a file change
#[derive(Debug)]
pub enum CatalogReloadEvent {
    Reloaded(QuestCatalog),
    /// The file changed but could not be loaded; the old catalog stays in use
    Failed(String),
}

/// Handle to a running catalog watcher; dropping it stops watching
pub struct CatalogWatcher {
    _watcher: RecommendedWatcher,
    events: Receiver<CatalogReloadEvent>,
}

impl CatalogWatcher {
    /// Start watching `catalog_path`
    ///
    /// The parent directory is watched rather than the file itself, so
    /// atomic replace-by-rename saves are picked up too.
    pub fn start(catalog_path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let catalog_path: PathBuf = catalog_path.into();
        let (notify_tx, notify_rx) = mpsc::channel();
        let (tx, rx) = mpsc::channel();

        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = notify_tx.send(event);
                }
                Err(e) => warn!("Catalog watcher error: {}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(1)),
        )?;

        let watch_dir = catalog_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;
        info!("Catalog hot-reload watcher started for {:?}", catalog_path);

        std::thread::spawn(move || {
            // Ends when the watcher (and with it `notify_tx`) is dropped
            while let Ok(event) = notify_rx.recv() {
                if !is_catalog_event(&event, &catalog_path) {
                    continue;
                }
                debug!("Detected change in {:?}", catalog_path);

                loop {
                    match notify_rx.recv_timeout(DEBOUNCE) {
                        Ok(_) => continue,
                        Err(RecvTimeoutError::Timeout) => break,
                        Err(RecvTimeoutError::Disconnected) => return,
                    }
                }

                let reload = match QuestCatalog::load(&catalog_path) {
                    Ok(catalog) => {
                        info!("Reloaded quest catalog from {:?}", catalog_path);
                        CatalogReloadEvent::Reloaded(catalog)
                    }
                    Err(e) => {
                        error!("Failed to reload quest catalog: {}", e);
                        CatalogReloadEvent::Failed(e.to_string())
                    }
                };

                if tx.send(reload).is_err() {
                    break;
                }
            }
            debug!("Catalog watcher thread exiting");
        });

        Ok(Self {
            _watcher: watcher,
            events: rx,
        })
    }

    /// Block until the next reload; `None` once the watcher has stopped
    pub fn recv(&self) -> Option<CatalogReloadEvent> {
        self.events.recv().ok()
    }

    /// Next pending reload, if any
    pub fn try_recv(&self) -> Option<CatalogReloadEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Does this filesystem event touch the catalog file?
pub fn is_catalog_event(event: &Event, catalog_path: &Path) -> bool {
    if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
        return false;
    }

    let Some(target) = catalog_path.file_name() else {
        return false;
    };
    event.paths.iter().any(|p| p.file_name() == Some(target))
}
