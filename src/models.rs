use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// Directory listing entry. A listing is replaced wholesale on every reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileReference {
    pub name: String,
    pub path: PathBuf,
    pub is_directory: bool,
    pub size: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl FileReference {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::new(path, false)
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::new(path, true)
    }

    fn new(path: impl Into<PathBuf>, is_directory: bool) -> Self {
        let path = path.into();
        Self {
            name: file_name(&path),
            path,
            is_directory,
            size: None,
            modified_at: None,
        }
    }
}

// File name search hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMatch {
    pub path: PathBuf,
    pub title: Option<String>,
    pub score: f64,
}

impl FileMatch {
    /// Title when the index has one, otherwise the file name.
    pub fn display_name(&self) -> String {
        self.title.clone().unwrap_or_else(|| file_name(&self.path))
    }
}

// Full-text search hit. The snippet may contain highlight markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMatch {
    pub path: PathBuf,
    pub title: Option<String>,
    pub snippet: String,
    pub match_count: usize,
}

pub(crate) fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
