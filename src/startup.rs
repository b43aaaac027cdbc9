//! Application startup: resolve the home directory, list it, bring up the
//! search index and kick off background indexing.
//!
//! One orchestrator lives per mount. Its `CancellationToken` is cancelled on
//! teardown and every continuation checks it before touching state, so a
//! remounted app never observes the previous instance's in-flight work.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::app_event::{AppEvent, AppEventSender};
use crate::backend::{FileSystem, IndexEvent, SearchIndex};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartupState {
    Idle,
    ResolvingHome,
    LoadingDirectory,
    InitializingIndex,
    IndexingBackground,
    Ready,
    Failed(String),
}

impl StartupState {
    /// True once index initialization has been acknowledged.
    pub fn index_ready(&self) -> bool {
        matches!(
            self,
            StartupState::IndexingBackground | StartupState::Ready
        )
    }

    pub fn can_start(&self) -> bool {
        matches!(self, StartupState::Idle | StartupState::Failed(_))
    }
}

pub struct StartupOrchestrator {
    instance: u64,
    fs: Arc<dyn FileSystem>,
    index: Arc<dyn SearchIndex>,
    events: AppEventSender,
    state: watch::Sender<StartupState>,
    token: CancellationToken,
}

impl StartupOrchestrator {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        index: Arc<dyn SearchIndex>,
        events: AppEventSender,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(StartupState::Idle);
        Arc::new(Self {
            instance: NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed),
            fs,
            index,
            events,
            state,
            token: CancellationToken::new(),
        })
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    pub fn state(&self) -> StartupState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StartupState> {
        self.state.subscribe()
    }

    pub fn is_alive(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Begin startup. Only proceeds from `Idle` or `Failed`; any other state
    /// means a run is already under way and `None` is returned.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.is_alive() {
            debug!(instance = self.instance, "start ignored after teardown");
            return None;
        }
        let claimed = self.state.send_if_modified(|state| {
            if state.can_start() {
                *state = StartupState::ResolvingHome;
                true
            } else {
                false
            }
        });
        if !claimed {
            debug!(instance = self.instance, state = ?self.state(), "startup already running");
            return None;
        }

        info!(instance = self.instance, "startup begins");
        let this = Arc::clone(self);
        Some(tokio::spawn(async move { this.run().await }))
    }

    /// Stop observing in-flight work. Pending backend calls still finish but
    /// their results are dropped.
    pub fn teardown(&self) {
        debug!(instance = self.instance, "orchestrator torn down");
        self.token.cancel();
    }

    async fn run(self: Arc<Self>) {
        let home = match self.fs.resolve_home_directory().await {
            Ok(home) => home,
            Err(err) => return self.fail("resolve home directory", err),
        };
        if !self.advance(StartupState::LoadingDirectory) {
            return;
        }

        let entries = match self.fs.list_directory(&home).await {
            Ok(entries) => entries,
            Err(err) => return self.fail("load directory", err),
        };
        if !self.is_alive() {
            return;
        }
        debug!(path = %home.display(), count = entries.len(), "home directory loaded");
        self.events.send(AppEvent::DirectoryLoaded {
            instance: self.instance,
            path: home.clone(),
            entries,
        });
        if !self.advance(StartupState::InitializingIndex) {
            return;
        }

        let location = match self.index.initialize_search_index().await {
            Ok(location) => location,
            Err(err) => return self.fail("initialize search index", err),
        };
        if !self.is_alive() {
            return;
        }
        info!(%location, "search index initialized");
        self.events.send(AppEvent::IndexInitialized {
            instance: self.instance,
            location,
        });
        if !self.advance(StartupState::IndexingBackground) {
            return;
        }

        self.spawn_indexing(home);
        self.advance(StartupState::Ready);
    }

    fn spawn_indexing(self: &Arc<Self>, directory: PathBuf) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let event = match this.index.index_directory(&directory).await {
                Ok(count) => {
                    info!(path = %directory.display(), count, "background indexing finished");
                    IndexEvent::Complete(count)
                }
                Err(err) => {
                    warn!(path = %directory.display(), "background indexing failed: {:#}", err);
                    IndexEvent::Error(format!("{:#}", err))
                }
            };
            if this.is_alive() {
                this.events.send(AppEvent::Indexing {
                    instance: this.instance,
                    event,
                });
            }
        });
    }

    /// Relay index notifications pushed by the backend until teardown.
    pub fn forward_index_events(
        self: &Arc<Self>,
        mut rx: mpsc::UnboundedReceiver<IndexEvent>,
    ) -> JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = this.token.cancelled() => break,
                    event = rx.recv() => match event {
                        Some(event) => this.events.send(AppEvent::Indexing {
                            instance: this.instance,
                            event,
                        }),
                        None => break,
                    },
                }
            }
        })
    }

    fn advance(&self, next: StartupState) -> bool {
        if !self.is_alive() {
            return false;
        }
        debug!(instance = self.instance, state = ?next, "startup state");
        self.state.send_replace(next);
        true
    }

    fn fail(&self, step: &str, err: anyhow::Error) {
        if !self.is_alive() {
            return;
        }
        let reason = format!("{:#}", err);
        warn!(instance = self.instance, step, "startup failed: {}", reason);
        self.state.send_replace(StartupState::Failed(reason.clone()));
        self.events.send(AppEvent::StartupFailed {
            instance: self.instance,
            reason,
        });
    }
}

impl Drop for StartupOrchestrator {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

// ---- Tests ----
