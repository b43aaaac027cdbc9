use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::backend::FileSystem;
use crate::config::Settings;
use crate::models::{file_name, FileReference};

const MIB: u64 = 1024 * 1024;

/// File commands backed by the local disk.
#[derive(Debug, Clone)]
pub struct LocalFileSystem {
    max_file_size: u64,
}

impl Default for LocalFileSystem {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}

impl LocalFileSystem {
    pub fn new(settings: &Settings) -> Self {
        Self {
            max_file_size: settings.max_file_size,
        }
    }
}

fn sort_entries(entries: &mut [FileReference]) {
    entries.sort_by(|a, b| match (a.is_directory, b.is_directory) {
        (true, false) => std::cmp::Ordering::Less,
        (false, true) => std::cmp::Ordering::Greater,
        _ => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
    });
}

/// Resolve `path` to its absolute, symlink-free form.
async fn canonical(path: &Path) -> Result<PathBuf> {
    match fs::canonicalize(path).await {
        Ok(resolved) => Ok(resolved),
        Err(err) if err.kind() == ErrorKind::NotFound => {
            bail!("Path does not exist: {}", path.display())
        }
        Err(err) if err.kind() == ErrorKind::PermissionDenied => {
            bail!("Permission denied: {}", path.display())
        }
        Err(err) => Err(err).with_context(|| format!("Failed to resolve {}", path.display())),
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn resolve_home_directory(&self) -> Result<PathBuf> {
        dirs::home_dir().context("Could not determine home directory")
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<FileReference>> {
        let path = canonical(path).await?;
        let metadata = fs::metadata(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if !metadata.is_dir() {
            bail!("{} is not a directory", path.display());
        }

        let mut reader = fs::read_dir(&path)
            .await
            .with_context(|| format!("Failed to read directory {}", path.display()))?;
        let mut entries = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let entry_path = entry.path();
            // Entries that vanish or can't be stat'ed are skipped
            let Ok(metadata) = fs::metadata(&entry_path).await else {
                debug!(path = %entry_path.display(), "skipping unreadable entry");
                continue;
            };
            let is_directory = metadata.is_dir();
            entries.push(FileReference {
                name: file_name(&entry_path),
                size: (!is_directory).then(|| metadata.len()),
                modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
                path: entry_path,
                is_directory,
            });
        }

        sort_entries(&mut entries);
        Ok(entries)
    }

    async fn read_file(&self, path: &Path) -> Result<String> {
        let path = canonical(path).await?;
        let metadata = fs::metadata(&path)
            .await
            .with_context(|| format!("Failed to read file metadata for {}", path.display()))?;
        if !metadata.is_file() {
            bail!("{} is not a file", path.display());
        }
        if metadata.len() > self.max_file_size {
            bail!(
                "File too large ({}MB). Maximum size is {}MB",
                metadata.len() / MIB,
                self.max_file_size / MIB
            );
        }

        fs::read_to_string(&path)
            .await
            .with_context(|| format!("Failed to read file {}", path.display()))
    }

    async fn write_file(&self, path: &Path, content: &str) -> Result<()> {
        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    async fn create_file(&self, path: &Path) -> Result<()> {
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(())
    }

    async fn create_directory(&self, path: &Path) -> Result<()> {
        fs::create_dir(path)
            .await
            .with_context(|| format!("Failed to create folder {}", path.display()))
    }
}

// ---- Tests ----
