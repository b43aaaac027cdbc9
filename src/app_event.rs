use std::path::PathBuf;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::backend::IndexEvent;
use crate::models::FileReference;
use crate::search::Surface;

/// Completions produced by background tasks, delivered to the owner of the
/// application state. Startup events carry the id of the orchestrator
/// instance that produced them.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    DirectoryLoaded {
        instance: u64,
        path: PathBuf,
        entries: Vec<FileReference>,
    },
    IndexInitialized {
        instance: u64,
        location: String,
    },
    Indexing {
        instance: u64,
        event: IndexEvent,
    },
    StartupFailed {
        instance: u64,
        reason: String,
    },
    /// A search surface has new results, a new error or a new placeholder.
    SearchUpdated(Surface),
}

#[derive(Clone, Debug)]
pub struct AppEventSender {
    tx: UnboundedSender<AppEvent>,
}

impl AppEventSender {
    pub fn new(tx: UnboundedSender<AppEvent>) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: AppEvent) {
        if let Err(err) = self.tx.send(event) {
            debug!("dropping app event, receiver is gone: {:?}", err.0);
        }
    }
}
