//! The application state object: file browser, edit session, navigation
//! history, layout flags and the search surfaces, owned by one caller.
//!
//! Background work (startup, search) reports back through `AppEvent`s that
//! the owner feeds into [`Workspace::handle_event`], usually by awaiting
//! [`Workspace::next_event`] in its main loop.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::actions::{ActionBus, MenuAction};
use crate::app_event::{AppEvent, AppEventSender};
use crate::backend::{FileSystem, IndexEvent, SearchIndex};
use crate::config::Settings;
use crate::error::{CoreError, CoreResult};
use crate::history::NavigationHistory;
use crate::models::FileReference;
use crate::search::{CommandId, SearchCoordinator, Selection, Surface};
use crate::session::{DirtyTracker, EditSession};
use crate::startup::{StartupOrchestrator, StartupState};
use crate::wikilink;

const UNTITLED_STEM: &str = "untitled";
const UNTITLED_EXT: &str = "md";
const NEW_FOLDER: &str = "New Folder";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutState {
    pub sidebar_visible: bool,
    pub about_visible: bool,
}

impl Default for LayoutState {
    fn default() -> Self {
        Self {
            sidebar_visible: true,
            about_visible: false,
        }
    }
}

// Progress of the background indexing started at launch
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IndexingStatus {
    #[default]
    Pending,
    Indexed(usize),
    Failed(String),
}

#[derive(Debug, Default)]
struct Browser {
    home: Option<PathBuf>,
    current_directory: Option<PathBuf>,
    entries: Vec<FileReference>,
    selected: Option<PathBuf>,
    error: Option<CoreError>,
}

// Store a failure in its component's error slot, clear the slot on success
fn scoped<T>(slot: &mut Option<CoreError>, result: CoreResult<T>) -> CoreResult<T> {
    match &result {
        Ok(_) => *slot = None,
        Err(err) => *slot = Some(err.clone()),
    }
    result
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Back,
    Forward,
}

fn untitled_name(n: usize) -> String {
    match n {
        0 => format!("{}.{}", UNTITLED_STEM, UNTITLED_EXT),
        n => format!("{}-{}.{}", UNTITLED_STEM, n, UNTITLED_EXT),
    }
}

fn folder_name(n: usize) -> String {
    match n {
        0 => NEW_FOLDER.to_string(),
        n => format!("{} {}", NEW_FOLDER, n),
    }
}

pub struct Workspace {
    fs: Arc<dyn FileSystem>,
    index: Arc<dyn SearchIndex>,
    settings: Settings,
    events_tx: AppEventSender,
    events: mpsc::UnboundedReceiver<AppEvent>,
    actions: ActionBus,
    action_rx: broadcast::Receiver<MenuAction>,
    browser: Browser,
    editor: DirtyTracker,
    editor_error: Option<CoreError>,
    history: NavigationHistory,
    search: SearchCoordinator,
    startup: Arc<StartupOrchestrator>,
    layout: LayoutState,
    indexing: IndexingStatus,
    index_location: Option<String>,
}

impl Workspace {
    pub fn new(fs: Arc<dyn FileSystem>, index: Arc<dyn SearchIndex>, settings: Settings) -> Self {
        let (tx, events) = mpsc::unbounded_channel();
        let events_tx = AppEventSender::new(tx);
        let startup = StartupOrchestrator::new(fs.clone(), index.clone(), events_tx.clone());
        let search = SearchCoordinator::new(
            index.clone(),
            &settings,
            events_tx.clone(),
            startup.subscribe(),
        );
        let actions = ActionBus::new();
        let action_rx = actions.subscribe();

        Self {
            fs,
            index,
            settings,
            events_tx,
            events,
            actions,
            action_rx,
            browser: Browser::default(),
            editor: DirtyTracker::new(),
            editor_error: None,
            history: NavigationHistory::new(),
            search,
            startup,
            layout: LayoutState::default(),
            indexing: IndexingStatus::default(),
            index_location: None,
        }
    }

    // ---- Accessors ----

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn current_directory(&self) -> Option<&Path> {
        self.browser.current_directory.as_deref()
    }

    pub fn home_directory(&self) -> Option<&Path> {
        self.browser.home.as_deref()
    }

    pub fn entries(&self) -> &[FileReference] {
        &self.browser.entries
    }

    pub fn selected(&self) -> Option<&Path> {
        self.browser.selected.as_deref()
    }

    pub fn browser_error(&self) -> Option<&CoreError> {
        self.browser.error.as_ref()
    }

    pub fn editor_error(&self) -> Option<&CoreError> {
        self.editor_error.as_ref()
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.editor.session()
    }

    pub fn is_dirty(&self) -> bool {
        self.editor.is_dirty()
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn layout(&self) -> LayoutState {
        self.layout
    }

    pub fn indexing(&self) -> &IndexingStatus {
        &self.indexing
    }

    pub fn index_location(&self) -> Option<&str> {
        self.index_location.as_deref()
    }

    pub fn startup_state(&self) -> StartupState {
        self.startup.state()
    }

    pub fn search(&self) -> &SearchCoordinator {
        &self.search
    }

    pub fn actions(&self) -> &ActionBus {
        &self.actions
    }

    // ---- Lifecycle ----

    /// Start the launch sequence. A workspace that was unmounted gets a fresh
    /// orchestrator; the old one's late results are ignored.
    pub fn mount(&mut self) -> Option<JoinHandle<()>> {
        if !self.startup.is_alive() {
            self.startup = StartupOrchestrator::new(
                self.fs.clone(),
                self.index.clone(),
                self.events_tx.clone(),
            );
            self.search.attach_startup(self.startup.subscribe());
            debug!(instance = self.startup.instance(), "workspace remounted");
        }
        self.startup.start()
    }

    pub fn unmount(&mut self) {
        self.startup.teardown();
    }

    /// Relay index notifications the backend pushes outside of startup.
    pub fn forward_index_events(&self, rx: mpsc::UnboundedReceiver<IndexEvent>) -> JoinHandle<()> {
        self.startup.forward_index_events(rx)
    }

    /// Apply a background completion. Returns false when the event came from
    /// an orchestrator that has since been replaced.
    pub fn handle_event(&mut self, event: &AppEvent) -> bool {
        let current = self.startup.instance();
        match event {
            AppEvent::DirectoryLoaded {
                instance,
                path,
                entries,
            } if *instance == current => {
                self.browser.home = Some(path.clone());
                if self.browser.current_directory.is_none() {
                    self.apply_listing(path.clone(), entries.clone());
                }
            }
            AppEvent::IndexInitialized { instance, location } if *instance == current => {
                self.index_location = Some(location.clone());
            }
            AppEvent::Indexing { instance, event } if *instance == current => {
                self.indexing = match event {
                    IndexEvent::Complete(count) => IndexingStatus::Indexed(*count),
                    IndexEvent::Error(message) => IndexingStatus::Failed(message.clone()),
                };
            }
            AppEvent::StartupFailed { instance, reason } if *instance == current => {
                self.browser.error = Some(CoreError::Backend(reason.clone()));
            }
            AppEvent::SearchUpdated(surface) => {
                debug!(?surface, "search surface updated");
            }
            stale => {
                debug!(current, event = ?stale, "ignoring event from a previous mount");
                return false;
            }
        }
        true
    }

    /// Wait for the next background completion and apply it.
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        let event = self.events.recv().await?;
        self.handle_event(&event);
        Some(event)
    }

    /// Apply every completion that is already queued. Returns how many were
    /// applied.
    pub fn drain_events(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events.try_recv() {
            if self.handle_event(&event) {
                applied += 1;
            }
        }
        applied
    }

    // ---- File browser ----

    fn apply_listing(&mut self, path: PathBuf, entries: Vec<FileReference>) {
        info!(path = %path.display(), count = entries.len(), "directory loaded");
        self.search.set_listing(entries.clone());
        self.browser.current_directory = Some(path);
        self.browser.entries = entries;
        self.browser.error = None;
    }

    /// Navigate to `path`. Refuses while the open file has unsaved changes;
    /// on success the edit session is closed.
    pub async fn load_directory(&mut self, path: impl Into<PathBuf>) -> CoreResult<()> {
        let path = path.into();
        if let Err(err) = self.editor.ensure_clean() {
            self.editor_error = Some(err.clone());
            return Err(err);
        }

        let listing = self
            .fs
            .list_directory(&path)
            .await
            .map_err(CoreError::backend);
        let entries = scoped(&mut self.browser.error, listing)?;
        self.apply_listing(path, entries);
        self.editor.discard();
        self.browser.selected = None;
        Ok(())
    }

    // Reload the current directory without leaving it
    async fn refresh_listing(&mut self) -> CoreResult<()> {
        let Some(path) = self.browser.current_directory.clone() else {
            return Err(CoreError::NoDirectorySelected);
        };
        let listing = self
            .fs
            .list_directory(&path)
            .await
            .map_err(CoreError::backend);
        let entries = scoped(&mut self.browser.error, listing)?;
        self.apply_listing(path, entries);
        Ok(())
    }

    /// Open a file, or enter a directory.
    pub async fn select_entry(&mut self, entry: &FileReference) -> CoreResult<()> {
        if entry.is_directory {
            self.load_directory(entry.path.clone()).await
        } else {
            self.open_file(entry.path.clone()).await
        }
    }

    pub async fn navigate_to_parent(&mut self) -> CoreResult<()> {
        let Some(current) = self.browser.current_directory.clone() else {
            return scoped(&mut self.browser.error, Err(CoreError::NoDirectorySelected));
        };
        match current.parent() {
            Some(parent) => self.load_directory(parent.to_path_buf()).await,
            None => {
                debug!("already at the filesystem root");
                Ok(())
            }
        }
    }

    pub async fn go_home(&mut self) -> CoreResult<()> {
        let home = match self.browser.home.clone() {
            Some(home) => home,
            None => {
                let resolved = self
                    .fs
                    .resolve_home_directory()
                    .await
                    .map_err(CoreError::backend);
                let home = scoped(&mut self.browser.error, resolved)?;
                self.browser.home = Some(home.clone());
                home
            }
        };
        self.load_directory(home).await
    }

    pub async fn new_file(&mut self) -> CoreResult<PathBuf> {
        let path = self.unique_path(untitled_name)?;
        let created = self
            .fs
            .create_file(&path)
            .await
            .map_err(CoreError::backend);
        scoped(&mut self.browser.error, created)?;
        info!(path = %path.display(), "file created");
        self.refresh_listing().await?;
        Ok(path)
    }

    pub async fn new_folder(&mut self) -> CoreResult<PathBuf> {
        let path = self.unique_path(folder_name)?;
        let created = self
            .fs
            .create_directory(&path)
            .await
            .map_err(CoreError::backend);
        scoped(&mut self.browser.error, created)?;
        info!(path = %path.display(), "folder created");
        self.refresh_listing().await?;
        Ok(path)
    }

    // First candidate name not taken in the loaded listing
    fn unique_path(&mut self, name: fn(usize) -> String) -> CoreResult<PathBuf> {
        let Some(directory) = self.browser.current_directory.as_ref() else {
            return scoped(&mut self.browser.error, Err(CoreError::NoDirectorySelected));
        };
        let taken = |candidate: &str| {
            self.browser
                .entries
                .iter()
                .any(|entry| entry.name == candidate)
        };
        let name = (0..)
            .map(name)
            .find(|candidate| !taken(candidate))
            .unwrap_or_else(|| name(0));
        Ok(directory.join(name))
    }

    // ---- Editor ----

    /// Open `path` in the editor and record it in the history.
    pub async fn open_file(&mut self, path: impl Into<PathBuf>) -> CoreResult<()> {
        self.open_file_inner(path.into(), true).await
    }

    async fn open_file_inner(&mut self, path: PathBuf, record: bool) -> CoreResult<()> {
        // Reopening the file being edited keeps its unsaved text
        if self.editor.path() == Some(path.as_path()) && self.editor.is_dirty() {
            if record {
                self.history.push(path);
            }
            return Ok(());
        }
        if let Err(err) = self.editor.ensure_clean() {
            self.editor_error = Some(err.clone());
            return Err(err);
        }

        self.browser.selected = Some(path.clone());
        match self.fs.read_file(&path).await {
            Ok(content) => {
                self.editor.open(path.clone(), content);
                self.editor_error = None;
                if record {
                    self.history.push(path);
                }
                Ok(())
            }
            Err(err) => {
                warn!(path = %path.display(), "failed to read file: {:#}", err);
                self.editor.open_unreadable(path);
                let err = CoreError::backend(err);
                self.editor_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Record the editor's text. Returns the dirty flag.
    pub fn edit(&mut self, content: impl Into<String>) -> CoreResult<bool> {
        let result = self.editor.edit(content.into());
        scoped(&mut self.editor_error, result)
    }

    pub async fn save(&mut self) -> CoreResult<()> {
        let request = scoped(&mut self.editor_error, self.editor.begin_save())?;
        let written = self.fs.write_file(&request.path, &request.content).await;
        let path = request.path.clone();
        let result = self.editor.complete_save(request, written);
        if result.is_ok() {
            info!(path = %path.display(), "file saved");
        }
        scoped(&mut self.editor_error, result)
    }

    /// Drop unsaved edits and go back to the last saved text.
    pub fn discard_changes(&mut self) -> CoreResult<()> {
        let result = self.editor.revert().map(|_| ());
        scoped(&mut self.editor_error, result)
    }

    pub fn close_file(&mut self) -> CoreResult<()> {
        let result = self.editor.close();
        if result.is_ok() {
            self.browser.selected = None;
        }
        scoped(&mut self.editor_error, result)
    }

    pub async fn go_back(&mut self) -> CoreResult<Option<PathBuf>> {
        self.revisit(Step::Back).await
    }

    pub async fn go_forward(&mut self) -> CoreResult<Option<PathBuf>> {
        self.revisit(Step::Forward).await
    }

    /// Reopen the neighbouring history entry. The cursor only moves once the
    /// file has been read; a failed read leaves history and session as they
    /// were.
    async fn revisit(&mut self, step: Step) -> CoreResult<Option<PathBuf>> {
        let target = match step {
            Step::Back => self.history.peek_back(),
            Step::Forward => self.history.peek_forward(),
        };
        let Some(path) = target.map(Path::to_path_buf) else {
            return Ok(None);
        };
        scoped(&mut self.editor_error, self.editor.ensure_clean())?;

        let content = match self.fs.read_file(&path).await {
            Ok(content) => content,
            Err(err) => {
                warn!(path = %path.display(), "failed to reopen file: {:#}", err);
                return scoped(&mut self.editor_error, Err(CoreError::backend(err)));
            }
        };
        match step {
            Step::Back => self.history.go_back(),
            Step::Forward => self.history.go_forward(),
        };
        self.browser.selected = Some(path.clone());
        self.editor.open(path.clone(), content);
        self.editor_error = None;
        Ok(Some(path))
    }

    // ---- Cross references ----

    /// Open the note a `[[link]]` points at. `Ok(None)` when nothing matches.
    pub async fn follow_link(&mut self, target: &str) -> CoreResult<Option<PathBuf>> {
        let Some(directory) = self.browser.current_directory.clone() else {
            return scoped(&mut self.editor_error, Err(CoreError::NoDirectorySelected));
        };
        let resolved = self
            .index
            .resolve_cross_reference(target, &directory)
            .await
            .map_err(CoreError::backend);
        match scoped(&mut self.editor_error, resolved)? {
            Some(path) => {
                self.open_file(path.clone()).await?;
                Ok(Some(path))
            }
            None => {
                debug!(link = target, "link has no target");
                Ok(None)
            }
        }
    }

    /// Follow the link under a cursor position in the open file.
    pub async fn follow_link_at(&mut self, offset: usize) -> CoreResult<Option<PathBuf>> {
        let Some(content) = self.editor.content() else {
            return Ok(None);
        };
        match wikilink::wikilink_at(content, offset) {
            Some(link) => self.follow_link(&link.target).await,
            None => Ok(None),
        }
    }

    // ---- Search and commands ----

    /// Pick the highlighted result of a search surface and act on it.
    pub async fn choose_result(&mut self, surface: Surface) -> CoreResult<Option<Selection>> {
        let Some(selection) = self.search.select(surface) else {
            return Ok(None);
        };
        match &selection {
            Selection::File(path) => self.open_file(path.clone()).await?,
            Selection::Command(command) => self.run_command(*command).await?,
        }
        Ok(Some(selection))
    }

    async fn run_command(&mut self, command: CommandId) -> CoreResult<()> {
        match command.menu_action() {
            Some(action) => {
                self.actions.publish(action);
                self.process_actions().await
            }
            None => self.save().await,
        }
    }

    /// Handle every menu action published on the bus since the last call.
    /// Returns the first failure; later actions still run.
    pub async fn process_actions(&mut self) -> CoreResult<()> {
        let mut outcome = Ok(());
        loop {
            match self.action_rx.try_recv() {
                Ok(action) => {
                    if let Err(err) = self.handle_action(action).await {
                        warn!(%action, "menu action failed: {}", err);
                        if outcome.is_ok() {
                            outcome = Err(err);
                        }
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "menu actions dropped");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        outcome
    }

    pub async fn handle_action(&mut self, action: MenuAction) -> CoreResult<()> {
        debug!(%action, "menu action");
        match action {
            MenuAction::NewFile => self.new_file().await.map(|_| ()),
            MenuAction::NewFolder => self.new_folder().await.map(|_| ()),
            MenuAction::ToggleSidebar => {
                self.layout.sidebar_visible = !self.layout.sidebar_visible;
                Ok(())
            }
            MenuAction::CloseFile => self.close_file(),
            MenuAction::About => {
                self.layout.about_visible = true;
                Ok(())
            }
        }
    }

    pub fn dismiss_about(&mut self) {
        self.layout.about_visible = false;
    }
}

// ---- Tests ----
