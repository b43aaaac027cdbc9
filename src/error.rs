use std::path::PathBuf;

/// Failures surfaced by the coordination core. Every variant is recoverable:
/// the owning component stores it as local error state and keeps its
/// previous valid state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// A native command rejected. The message is shown to the user verbatim.
    #[error("{0}")]
    Backend(String),
    #[error("No directory selected")]
    NoDirectorySelected,
    #[error("No file selected")]
    NoFileSelected,
    #[error("No content to save")]
    NoContentAvailable,
    #[error("Search index is not ready yet")]
    IndexNotReady,
    #[error("{} has unsaved changes", path.display())]
    UnsavedChanges { path: PathBuf },
}

impl CoreError {
    pub fn backend(err: anyhow::Error) -> Self {
        CoreError::Backend(format!("{:#}", err))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CoreError::UnsavedChanges { .. })
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
