//! Contracts for the native, out-of-process side of the app.
//!
//! Every call is asynchronous and may fail; failures carry a human readable
//! message that is shown to the user as-is.

use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::models::{ContentMatch, FileMatch, FileReference};

#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn resolve_home_directory(&self) -> Result<PathBuf>;

    /// Entries of `path`, in the order the sidebar shows them.
    async fn list_directory(&self, path: &Path) -> Result<Vec<FileReference>>;

    async fn read_file(&self, path: &Path) -> Result<String>;

    async fn write_file(&self, path: &Path, content: &str) -> Result<()>;

    /// Fails if `path` already exists.
    async fn create_file(&self, path: &Path) -> Result<()>;

    /// Fails if `path` already exists.
    async fn create_directory(&self, path: &Path) -> Result<()>;
}

#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// Bring up index storage. Returns where the index lives.
    async fn initialize_search_index(&self) -> Result<String>;

    /// Index the markdown files below `path`. Returns the document count.
    async fn index_directory(&self, path: &Path) -> Result<usize>;

    async fn search_file_names(&self, query: &str) -> Result<Vec<FileMatch>>;

    async fn search_file_contents(&self, query: &str) -> Result<Vec<ContentMatch>>;

    /// `Ok(None)` means the link has no target, which is not an error.
    async fn resolve_cross_reference(
        &self,
        link_target: &str,
        current_directory: &Path,
    ) -> Result<Option<PathBuf>>;
}

// Progress pushed by the backend while it indexes in the background
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexEvent {
    Complete(usize),
    Error(String),
}
