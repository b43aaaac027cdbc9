//! Scriptable in-memory backend for unit tests.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::backend::{FileSystem, SearchIndex};
use crate::models::{ContentMatch, FileMatch, FileReference};

#[derive(Default)]
struct FakeState {
    calls: Vec<String>,
    delays: HashMap<String, Duration>,
    failing_ops: HashSet<String>,
    failing_queries: HashSet<String>,
    gates: HashMap<String, oneshot::Receiver<()>>,
    extra_results: HashMap<String, usize>,
    files: HashMap<PathBuf, String>,
    listings: HashMap<PathBuf, Vec<FileReference>>,
    links: HashMap<String, PathBuf>,
}

/// Implements both backend traits. Every call is recorded as `op` or
/// `op:arg`, can be held on a gate, delayed per query and made to fail.
pub(crate) struct FakeBackend {
    home: PathBuf,
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new(home: impl Into<PathBuf>) -> Self {
        let home = home.into();
        let mut state = FakeState::default();
        state.listings.insert(home.clone(), Vec::new());
        Self {
            home,
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.as_str() == op || call.starts_with(&format!("{}:", op)))
            .count()
    }

    pub fn delay_query(&self, query: &str, delay: Duration) {
        self.lock().delays.insert(query.to_string(), delay);
    }

    pub fn fail_query(&self, query: &str) {
        self.lock().failing_queries.insert(query.to_string());
    }

    pub fn fail(&self, op: &str) {
        self.lock().failing_ops.insert(op.to_string());
    }

    pub fn recover(&self, op: &str) {
        self.lock().failing_ops.remove(op);
    }

    /// Hold the next call to `op` until the returned sender fires or drops.
    pub fn gate(&self, op: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.lock().gates.insert(op.to_string(), rx);
        tx
    }

    /// Return `count` more hits named `<query>-<n>.md` for `query`.
    pub fn extra_results(&self, query: &str, count: usize) {
        self.lock().extra_results.insert(query.to_string(), count);
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, content: &str) {
        let path = path.into();
        let mut state = self.lock();
        state.files.insert(path.clone(), content.to_string());
        add_to_listing(&mut state, FileReference::file(path));
    }

    pub fn add_directory(&self, path: impl Into<PathBuf>) {
        let path = path.into();
        let mut state = self.lock();
        state.listings.entry(path.clone()).or_default();
        add_to_listing(&mut state, FileReference::directory(path));
    }

    pub fn link(&self, target: &str, path: impl Into<PathBuf>) {
        self.lock().links.insert(target.to_string(), path.into());
    }

    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.lock().files.get(path.as_ref()).cloned()
    }

    async fn enter(&self, op: &str, arg: Option<&str>) -> Result<()> {
        let (gate, delay) = {
            let mut state = self.lock();
            state.calls.push(match arg {
                Some(arg) => format!("{}:{}", op, arg),
                None => op.to_string(),
            });
            let delay = arg.and_then(|arg| state.delays.get(arg).copied());
            (state.gates.remove(op), delay)
        };
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.lock();
        if state.failing_ops.contains(op) {
            bail!("{} failed", op);
        }
        if let Some(arg) = arg {
            if state.failing_queries.contains(arg) {
                bail!("query malformed: {}", arg);
            }
        }
        Ok(())
    }

    fn hits(&self, query: &str) -> Vec<PathBuf> {
        let extra = self.lock().extra_results.get(query).copied().unwrap_or(0);
        std::iter::once(PathBuf::from(format!("/notes/{}.md", query)))
            .chain((1..=extra).map(|n| PathBuf::from(format!("/notes/{}-{}.md", query, n))))
            .collect()
    }
}

fn add_to_listing(state: &mut FakeState, entry: FileReference) {
    if let Some(parent) = entry.path.parent() {
        let listing = state.listings.entry(parent.to_path_buf()).or_default();
        listing.retain(|existing| existing.path != entry.path);
        listing.push(entry);
    }
}

fn display(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[async_trait]
impl FileSystem for FakeBackend {
    async fn resolve_home_directory(&self) -> Result<PathBuf> {
        self.enter("resolve_home_directory", None).await?;
        Ok(self.home.clone())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<FileReference>> {
        self.enter("list_directory", Some(&display(path))).await?;
        match self.lock().listings.get(path) {
            Some(entries) => Ok(entries.clone()),
            None => bail!("No such directory: {}", path.display()),
        }
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        self.enter("read_file", Some(&display(path))).await?;
        match self.lock().files.get(path) {
            Some(content) => Ok(content.clone()),
            None => bail!("No such file: {}", path.display()),
        }
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        self.enter("write_file", Some(&display(path))).await?;
        self.lock()
            .files
            .insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    async fn create_file(&self, path: &Path) -> Result<()> {
        self.enter("create_file", Some(&display(path))).await?;
        let mut state = self.lock();
        if state.files.contains_key(path) || state.listings.contains_key(path) {
            bail!("{} already exists", path.display());
        }
        state.files.insert(path.to_path_buf(), String::new());
        add_to_listing(&mut state, FileReference::file(path));
        Ok(())
    }

    async fn create_directory(&self, path: &Path) -> Result<()> {
        self.enter("create_directory", Some(&display(path))).await?;
        let mut state = self.lock();
        if state.files.contains_key(path) || state.listings.contains_key(path) {
            bail!("{} already exists", path.display());
        }
        state.listings.insert(path.to_path_buf(), Vec::new());
        add_to_listing(&mut state, FileReference::directory(path));
        Ok(())
    }
}

#[async_trait]
impl SearchIndex for FakeBackend {
    async fn initialize_search_index(&self) -> Result<String> {
        self.enter("initialize_search_index", None).await?;
        Ok("memory".to_string())
    }

    async fn index_directory(&self, path: &Path) -> Result<usize> {
        self.enter("index_directory", Some(&display(path))).await?;
        Ok(self
            .lock()
            .files
            .keys()
            .filter(|file| file.starts_with(path))
            .count())
    }

    async fn search_file_names(&self, query: &str) -> Result<Vec<FileMatch>> {
        self.enter("search_file_names", Some(query)).await?;
        Ok(self
            .hits(query)
            .into_iter()
            .map(|path| FileMatch {
                path,
                title: None,
                score: 1.0,
            })
            .collect())
    }

    async fn search_file_contents(&self, query: &str) -> Result<Vec<ContentMatch>> {
        self.enter("search_file_contents", Some(query)).await?;
        Ok(self
            .hits(query)
            .into_iter()
            .map(|path| ContentMatch {
                path,
                title: None,
                snippet: format!("...<mark>{}</mark>...", query),
                match_count: 1,
            })
            .collect())
    }

    async fn resolve_cross_reference(
        &self,
        link_target: &str,
        _current_directory: &Path,
    ) -> Result<Option<PathBuf>> {
        self.enter("resolve_cross_reference", Some(link_target))
            .await?;
        Ok(self.lock().links.get(link_target).cloned())
    }
}
