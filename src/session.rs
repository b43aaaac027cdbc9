use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{CoreError, CoreResult};

// The file currently attached to the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub file_path: PathBuf,
    pub live_content: Option<String>,
    pub last_saved_snapshot: Option<String>,
}

impl EditSession {
    pub fn is_dirty(&self) -> bool {
        self.live_content != self.last_saved_snapshot
    }
}

/// A write handed to the backend. Carries the content that was captured when
/// the save started so the snapshot advances to exactly what was persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    pub path: PathBuf,
    pub content: String,
    session_id: u64,
}

/// Tracks unsaved edits by comparing live content with the last snapshot that
/// reached disk. Equality based: undoing back to the saved text is clean.
#[derive(Debug, Default)]
pub struct DirtyTracker {
    session: Option<EditSession>,
    session_id: u64,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, path: impl Into<PathBuf>, content: String) {
        self.attach(EditSession {
            file_path: path.into(),
            live_content: Some(content.clone()),
            last_saved_snapshot: Some(content),
        });
    }

    /// Attach a file whose content could not be read. Saving it reports
    /// `NoContentAvailable`.
    pub fn open_unreadable(&mut self, path: impl Into<PathBuf>) {
        self.attach(EditSession {
            file_path: path.into(),
            live_content: None,
            last_saved_snapshot: None,
        });
    }

    fn attach(&mut self, session: EditSession) {
        self.session_id += 1;
        debug!(path = %session.file_path.display(), "edit session opened");
        self.session = Some(session);
    }

    /// Record the editor's current text. Returns the new dirty flag.
    pub fn edit(&mut self, content: String) -> CoreResult<bool> {
        let session = self.session.as_mut().ok_or(CoreError::NoFileSelected)?;
        session.live_content = Some(content);
        Ok(session.is_dirty())
    }

    pub fn is_dirty(&self) -> bool {
        self.session.as_ref().is_some_and(EditSession::is_dirty)
    }

    pub fn session(&self) -> Option<&EditSession> {
        self.session.as_ref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.file_path.as_path())
    }

    pub fn content(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.live_content.as_deref())
    }

    pub fn begin_save(&self) -> CoreResult<SaveRequest> {
        let session = self.session.as_ref().ok_or(CoreError::NoFileSelected)?;
        let content = session
            .live_content
            .clone()
            .ok_or(CoreError::NoContentAvailable)?;
        Ok(SaveRequest {
            path: session.file_path.clone(),
            content,
            session_id: self.session_id,
        })
    }

    /// Apply the backend's answer to a save. A failure leaves the session
    /// untouched. A completion for a session that has since been replaced is
    /// ignored.
    pub fn complete_save(
        &mut self,
        request: SaveRequest,
        result: anyhow::Result<()>,
    ) -> CoreResult<()> {
        if let Err(err) = result {
            return Err(CoreError::backend(err));
        }
        if request.session_id != self.session_id {
            debug!(path = %request.path.display(), "save finished for a closed session");
            return Ok(());
        }
        if let Some(session) = self.session.as_mut() {
            session.last_saved_snapshot = Some(request.content);
        }
        Ok(())
    }

    /// Refuse to drop a dirty session without confirmation.
    pub fn ensure_clean(&self) -> CoreResult<()> {
        match &self.session {
            Some(session) if session.is_dirty() => Err(CoreError::UnsavedChanges {
                path: session.file_path.clone(),
            }),
            _ => Ok(()),
        }
    }

    /// Detach the session if it is clean.
    pub fn close(&mut self) -> CoreResult<()> {
        self.ensure_clean()?;
        self.discard();
        Ok(())
    }

    /// Throw away unsaved edits, keeping the session attached. Returns the
    /// restored content.
    pub fn revert(&mut self) -> CoreResult<Option<&str>> {
        let session = self.session.as_mut().ok_or(CoreError::NoFileSelected)?;
        session.live_content = session.last_saved_snapshot.clone();
        Ok(session.live_content.as_deref())
    }

    /// Detach the session, dropping unsaved edits.
    pub fn discard(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(path = %session.file_path.display(), "edit session closed");
        }
    }
}

// ---- Tests ----
