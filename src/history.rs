use std::path::{Path, PathBuf};

/// Branchable back/forward stack of visited locations.
///
/// Visiting a new location after going back discards the old forward branch,
/// the same way browser history behaves. Session scoped and unbounded.
#[derive(Debug, Clone, Default)]
pub struct NavigationHistory {
    entries: Vec<PathBuf>,
    cursor: Option<usize>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        if self.current() == Some(path.as_path()) {
            return;
        }

        let keep = self.cursor.map_or(0, |cursor| cursor + 1);
        self.entries.truncate(keep);
        self.entries.push(path);
        self.cursor = Some(self.entries.len() - 1);
    }

    pub fn go_back(&mut self) -> Option<PathBuf> {
        if !self.can_go_back() {
            return None;
        }
        let cursor = self.cursor? - 1;
        self.cursor = Some(cursor);
        Some(self.entries[cursor].clone())
    }

    pub fn go_forward(&mut self) -> Option<PathBuf> {
        if !self.can_go_forward() {
            return None;
        }
        let cursor = self.cursor? + 1;
        self.cursor = Some(cursor);
        Some(self.entries[cursor].clone())
    }

    /// The entry `go_back` would move to, without moving.
    pub fn peek_back(&self) -> Option<&Path> {
        let cursor = self.cursor.filter(|cursor| *cursor > 0)?;
        Some(self.entries[cursor - 1].as_path())
    }

    pub fn peek_forward(&self) -> Option<&Path> {
        let cursor = self.cursor?;
        self.entries.get(cursor + 1).map(PathBuf::as_path)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    pub fn can_go_back(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor > 0)
    }

    pub fn can_go_forward(&self) -> bool {
        matches!(self.cursor, Some(cursor) if cursor + 1 < self.entries.len())
    }

    pub fn current(&self) -> Option<&Path> {
        self.cursor.map(|cursor| self.entries[cursor].as_path())
    }

    /// Index of the current entry, `None` while the history is empty.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ---- Tests ----
