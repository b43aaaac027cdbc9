//! Debounced, generation-tagged search for the quick-open palette, the
//! command palette and the search panel.
//!
//! Every keystroke bumps the surface's generation. A debounce task only
//! reaches the backend if its generation is still current when the timer
//! fires, and a backend answer is only shown if its generation is still
//! current when it arrives. In-flight calls are never aborted; their stale
//! results are dropped instead.

pub mod palette;

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::app_event::{AppEvent, AppEventSender};
use crate::backend::SearchIndex;
use crate::config::Settings;
use crate::error::CoreError;
use crate::models::{ContentMatch, FileMatch, FileReference};
use crate::startup::StartupState;

pub use palette::{filter_commands, CommandId, MatchCandidate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    /// File mode of the command palette.
    QuickOpen,
    /// "Files" tab of the search panel.
    FileSearch,
    /// "Content" tab of the search panel.
    ContentSearch,
    /// Command mode of the command palette.
    Commands,
}

impl Surface {
    pub const ALL: [Surface; 4] = [
        Surface::QuickOpen,
        Surface::FileSearch,
        Surface::ContentSearch,
        Surface::Commands,
    ];

    pub fn kind(&self) -> RequestKind {
        match self {
            Surface::QuickOpen | Surface::FileSearch => RequestKind::Files,
            Surface::ContentSearch => RequestKind::Content,
            Surface::Commands => RequestKind::Commands,
        }
    }

    fn slot(self) -> usize {
        match self {
            Surface::QuickOpen => 0,
            Surface::FileSearch => 1,
            Surface::ContentSearch => 2,
            Surface::Commands => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Files,
    Content,
    Commands,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Files => "files",
            RequestKind::Content => "content",
            RequestKind::Commands => "commands",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub generation: u64,
    pub surface: Surface,
}

// What a surface currently displays
#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceView {
    /// Nothing typed yet: "type to search".
    Placeholder,
    /// The index has not acknowledged initialization; shown as no results.
    IndexNotReady,
    Files(Vec<FileMatch>),
    Content(Vec<ContentMatch>),
    Commands(Vec<MatchCandidate>),
}

impl SurfaceView {
    pub fn len(&self) -> usize {
        match self {
            SurfaceView::Placeholder | SurfaceView::IndexNotReady => 0,
            SurfaceView::Files(matches) => matches.len(),
            SurfaceView::Content(matches) => matches.len(),
            SurfaceView::Commands(matches) => matches.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn identity(&self) -> Vec<String> {
        match self {
            SurfaceView::Placeholder | SurfaceView::IndexNotReady => Vec::new(),
            SurfaceView::Files(matches) => matches
                .iter()
                .map(|m| m.path.to_string_lossy().into_owned())
                .collect(),
            SurfaceView::Content(matches) => matches
                .iter()
                .map(|m| m.path.to_string_lossy().into_owned())
                .collect(),
            SurfaceView::Commands(matches) => matches.iter().map(|m| m.id.clone()).collect(),
        }
    }

    fn selection(&self, index: usize) -> Option<Selection> {
        match self {
            SurfaceView::Placeholder | SurfaceView::IndexNotReady => None,
            SurfaceView::Files(matches) => matches.get(index).map(|m| Selection::File(m.path.clone())),
            SurfaceView::Content(matches) => {
                matches.get(index).map(|m| Selection::File(m.path.clone()))
            }
            SurfaceView::Commands(matches) => matches
                .get(index)
                .and_then(|m| CommandId::from_id(&m.id))
                .map(Selection::Command),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceState {
    pub open: bool,
    pub query: String,
    pub generation: u64,
    pub view: SurfaceView,
    pub error: Option<CoreError>,
    pub searching: bool,
    pub selected: usize,
}

impl SurfaceState {
    fn new(view: SurfaceView) -> Self {
        Self {
            open: false,
            query: String::new(),
            generation: 0,
            view,
            error: None,
            searching: false,
            selected: 0,
        }
    }

    fn show(&mut self, view: SurfaceView) {
        if self.view.identity() != view.identity() {
            self.selected = 0;
        }
        self.view = view;
        if self.selected >= self.view.len() {
            self.selected = 0;
        }
    }
}

/// What the user picked. The overlay is already closed when this is returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    File(PathBuf),
    Command(CommandId),
}

struct SearchState {
    surfaces: [SurfaceState; 4],
    listing: Vec<FileReference>,
    startup: watch::Receiver<StartupState>,
}

impl SearchState {
    fn surface(&mut self, surface: Surface) -> &mut SurfaceState {
        &mut self.surfaces[surface.slot()]
    }

    fn index_ready(&self) -> bool {
        self.startup.borrow().index_ready()
    }
}

struct Inner {
    index: Arc<dyn SearchIndex>,
    events: AppEventSender,
    quick_open_debounce: Duration,
    search_debounce: Duration,
    fallback_limit: usize,
    state: Mutex<SearchState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SearchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn debounce(&self, surface: Surface) -> Duration {
        match surface {
            Surface::QuickOpen => self.quick_open_debounce,
            _ => self.search_debounce,
        }
    }

    // View for a blank query: current directory files for quick-open
    fn blank_view(&self, surface: Surface, listing: &[FileReference]) -> SurfaceView {
        match surface {
            Surface::QuickOpen => SurfaceView::Files(
                listing
                    .iter()
                    .filter(|entry| !entry.is_directory)
                    .take(self.fallback_limit)
                    .map(|entry| FileMatch {
                        path: entry.path.clone(),
                        title: Some(entry.name.clone()),
                        score: 0.0,
                    })
                    .collect(),
            ),
            Surface::FileSearch | Surface::ContentSearch => SurfaceView::Placeholder,
            Surface::Commands => SurfaceView::Commands(filter_commands("")),
        }
    }

    fn notify(&self, surface: Surface) {
        self.events.send(AppEvent::SearchUpdated(surface));
    }

    fn deliver(
        &self,
        request: &SearchRequest,
        result: anyhow::Result<SurfaceView>,
    ) {
        {
            let mut state = self.lock();
            let current = state.surface(request.surface);
            if current.generation != request.generation {
                debug!(
                    surface = ?request.surface,
                    generation = request.generation,
                    current = current.generation,
                    "discarding stale search result"
                );
                return;
            }

            current.searching = false;
            match result {
                Ok(view) => {
                    current.show(view);
                    current.error = None;
                }
                Err(err) => {
                    warn!(
                        surface = ?request.surface,
                        query = %request.query,
                        "search failed: {:#}",
                        err
                    );
                    current.error = Some(CoreError::backend(err));
                }
            }
        }
        self.notify(request.surface);
    }
}

/// Owns the state of every search surface. Cheap to clone; clones share
/// state. Must be created inside a tokio runtime.
#[derive(Clone)]
pub struct SearchCoordinator {
    inner: Arc<Inner>,
}

impl SearchCoordinator {
    pub fn new(
        index: Arc<dyn SearchIndex>,
        settings: &Settings,
        events: AppEventSender,
        startup: watch::Receiver<StartupState>,
    ) -> Self {
        let inner = Arc::new(Inner {
            index,
            events,
            quick_open_debounce: settings.quick_open_debounce(),
            search_debounce: settings.search_debounce(),
            fallback_limit: settings.quick_open_fallback_limit,
            state: Mutex::new(SearchState {
                surfaces: Surface::ALL.map(|_| SurfaceState::new(SurfaceView::Placeholder)),
                listing: Vec::new(),
                startup,
            }),
        });
        {
            let mut state = inner.lock();
            for surface in Surface::ALL {
                let view = inner.blank_view(surface, &state.listing);
                state.surface(surface).view = view;
            }
        }
        spawn_readiness_watch(&inner);
        Self { inner }
    }

    /// Follow the readiness of a new orchestrator instance.
    pub fn attach_startup(&self, startup: watch::Receiver<StartupState>) {
        self.inner.lock().startup = startup;
        spawn_readiness_watch(&self.inner);
    }

    /// Replace the directory listing quick-open falls back to.
    pub fn set_listing(&self, entries: Vec<FileReference>) {
        let refreshed = {
            let mut state = self.inner.lock();
            state.listing = entries;
            let view = self.inner.blank_view(Surface::QuickOpen, &state.listing);
            let quick_open = state.surface(Surface::QuickOpen);
            if quick_open.query.trim().is_empty() {
                quick_open.show(view);
                true
            } else {
                false
            }
        };
        if refreshed {
            self.inner.notify(Surface::QuickOpen);
        }
    }

    pub fn surface(&self, surface: Surface) -> SurfaceState {
        self.inner.lock().surfaces[surface.slot()].clone()
    }

    pub fn open(&self, surface: Surface) {
        self.inner.lock().surface(surface).open = true;
        self.inner.notify(surface);
    }

    /// Close the overlay and forget its query. Bumps the generation so any
    /// search still in flight for the old query is dropped.
    pub fn close(&self, surface: Surface) {
        {
            let mut state = self.inner.lock();
            let view = self.inner.blank_view(surface, &state.listing);
            let current = state.surface(surface);
            current.open = false;
            current.query.clear();
            current.generation += 1;
            current.error = None;
            current.searching = false;
            current.show(view);
            current.selected = 0;
        }
        self.inner.notify(surface);
    }

    /// Record a keystroke. Returns the request the keystroke stands for.
    pub fn set_query(&self, surface: Surface, query: impl Into<String>) -> SearchRequest {
        let query = query.into();
        let request = {
            let mut state = self.inner.lock();
            let blank = self.inner.blank_view(surface, &state.listing);
            let current = state.surface(surface);
            current.query = query.clone();
            current.generation += 1;
            let request = SearchRequest {
                query: query.clone(),
                generation: current.generation,
                surface,
            };

            if surface == Surface::Commands {
                current.show(SurfaceView::Commands(filter_commands(&query)));
                current.searching = false;
                current.error = None;
            } else if query.trim().is_empty() {
                current.show(blank);
                current.searching = false;
                current.error = None;
            } else {
                current.searching = true;
            }
            request
        };

        if request.surface.kind() != RequestKind::Commands && !request.query.trim().is_empty() {
            self.spawn_search(request.clone());
        } else {
            self.inner.notify(surface);
        }
        request
    }

    fn spawn_search(&self, request: SearchRequest) {
        let inner = Arc::clone(&self.inner);
        let delay = inner.debounce(request.surface);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            run_search(inner, request).await;
        });
    }

    /// Move the highlighted row, wrapping at both ends.
    pub fn move_selection(&self, surface: Surface, delta: isize) {
        {
            let mut state = self.inner.lock();
            let current = state.surface(surface);
            let len = current.view.len() as isize;
            if len == 0 {
                return;
            }
            current.selected = (current.selected as isize + delta).rem_euclid(len) as usize;
        }
        self.inner.notify(surface);
    }

    /// Pick the highlighted row. Closes the overlay and clears its query
    /// before handing the selection back to the caller for dispatch.
    pub fn select(&self, surface: Surface) -> Option<Selection> {
        let selected = self.inner.lock().surfaces[surface.slot()].selected;
        self.select_at(surface, selected)
    }

    pub fn select_at(&self, surface: Surface, index: usize) -> Option<Selection> {
        let selection = self.inner.lock().surfaces[surface.slot()].view.selection(index)?;
        self.close(surface);
        Some(selection)
    }
}

/// Wait until the attached startup reports the index ready, then re-run the
/// queries that were answered with `IndexNotReady` in the meantime.
fn spawn_readiness_watch(inner: &Arc<Inner>) {
    let mut startup = inner.lock().startup.clone();
    let inner = Arc::downgrade(inner);
    tokio::spawn(async move {
        if startup.wait_for(StartupState::index_ready).await.is_err() {
            return;
        }
        if let Some(inner) = Weak::upgrade(&inner) {
            rerun_pending(inner);
        }
    });
}

fn rerun_pending(inner: Arc<Inner>) {
    let requests: Vec<SearchRequest> = {
        let mut state = inner.lock();
        // The receiver may have been replaced by a newer, not yet ready one
        if !state.index_ready() {
            return;
        }
        Surface::ALL
            .into_iter()
            .filter(|surface| surface.kind() != RequestKind::Commands)
            .filter_map(|surface| {
                let current = state.surface(surface);
                let pending = current.view == SurfaceView::IndexNotReady
                    && !current.searching
                    && !current.query.trim().is_empty();
                if !pending {
                    return None;
                }
                current.generation += 1;
                current.searching = true;
                Some(SearchRequest {
                    query: current.query.clone(),
                    generation: current.generation,
                    surface,
                })
            })
            .collect()
    };

    for request in requests {
        debug!(surface = ?request.surface, query = %request.query, "index ready, re-running search");
        tokio::spawn(run_search(Arc::clone(&inner), request));
    }
}

async fn run_search(inner: Arc<Inner>, request: SearchRequest) {
    {
        let mut state = inner.lock();
        let ready = state.index_ready();
        let current = state.surface(request.surface);
        if current.generation != request.generation {
            return;
        }
        if !ready {
            debug!(surface = ?request.surface, "search index not ready");
            current.searching = false;
            current.show(SurfaceView::IndexNotReady);
            drop(state);
            inner.notify(request.surface);
            return;
        }
    }

    debug!(
        surface = ?request.surface,
        kind = request.surface.kind().as_str(),
        generation = request.generation,
        query = %request.query,
        "searching"
    );
    let result = match request.surface.kind() {
        RequestKind::Files => inner
            .index
            .search_file_names(&request.query)
            .await
            .map(SurfaceView::Files),
        RequestKind::Content => inner
            .index
            .search_file_contents(&request.query)
            .await
            .map(SurfaceView::Content),
        RequestKind::Commands => return,
    };
    inner.deliver(&request, result);
}

// ---- Tests ----
