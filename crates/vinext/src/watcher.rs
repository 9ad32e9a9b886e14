use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::tables::RouteTables;

/// Kind of file change that invalidated the route tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Removed,
    Renamed,
    Modified,
}

/// Represents a file change event
#[derive(Debug, Clone)]
pub struct RouteChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

/// Watches route directories and invalidates the tables on change
pub struct RouteWatcher {
    tx: broadcast::Sender<RouteChange>,
    _watcher: notify::RecommendedWatcher,
}

impl RouteWatcher {
    /// Watches every directory the tables were scanned from
    pub fn new(tables: Arc<RouteTables>) -> Result<Self> {
        let dirs = tables.dirs().to_vec();
        Self::watch(tables, dirs)
    }

    pub fn watch(tables: Arc<RouteTables>, watch_paths: Vec<PathBuf>) -> Result<Self> {
        let (tx, _) = broadcast::channel(100);
        let tx_clone = tx.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
            Ok(event) => {
                let Some(kind) = change_kind(&event.kind) else {
                    return;
                };
                tables.invalidate();
                for path in event.paths {
                    info!(path = %path.display(), ?kind, "route file changed");
                    // Broadcast change event (ignore if no receivers)
                    let _ = tx_clone.send(RouteChange { path, kind });
                }
            }
            Err(e) => error!("Watch error: {:?}", e),
        })?;

        for path in watch_paths {
            if path.exists() {
                watcher.watch(&path, RecursiveMode::Recursive)?;
                info!("Watching: {:?}", path);
            } else {
                warn!("Path does not exist: {:?}", path);
            }
        }

        Ok(Self { tx, _watcher: watcher })
    }

    /// Subscribe to file change events
    pub fn subscribe(&self) -> broadcast::Receiver<RouteChange> {
        self.tx.subscribe()
    }
}

/// Events that can change the route set; content edits included, since a
/// file's exports decide page vs route handler
fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Create(_) => Some(ChangeKind::Created),
        EventKind::Remove(_) => Some(ChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(_)) => Some(ChangeKind::Renamed),
        EventKind::Modify(ModifyKind::Metadata(_)) => None,
        EventKind::Modify(_) => Some(ChangeKind::Modified),
        other => {
            debug!(kind = ?other, "ignored watch event");
            None
        }
    }
}
