//! Command history: capped, most-recent-first, persisted as a JSON array.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

pub const DEFAULT_HISTORY_LIMIT: usize = 80;

/// Submitted lines, newest at index 0.
///
/// Scrolling keeps an index into the entries; `None` means the user is
/// editing a fresh line.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<String>,
    limit: usize,
    path: Option<PathBuf>,
    scroll: Option<usize>,
}

impl Default for History {
    fn default() -> Self {
        Self::in_memory(DEFAULT_HISTORY_LIMIT)
    }
}

impl History {
    /// History that is never written to disk.
    pub fn in_memory(limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            limit: limit.max(1),
            path: None,
            scroll: None,
        }
    }

    /// Load history from `path`.
    ///
    /// A missing file gives an empty history. So does an unreadable or
    /// malformed one, with a warning.
    pub async fn load(path: impl Into<PathBuf>, limit: usize) -> Self {
        let path = path.into();
        let mut history = Self::in_memory(limit);

        match tokio::fs::read_to_string(&path).await {
            Ok(content) => match serde_json::from_str::<Vec<String>>(&content) {
                Ok(mut entries) => {
                    entries.truncate(history.limit);
                    debug!(path = %path.display(), count = entries.len(), "loaded history");
                    history.entries = entries;
                }
                Err(e) => warn!(path = %path.display(), "ignoring malformed history file: {e}"),
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), "cannot read history file: {e}"),
        }

        history.path = Some(path);
        history
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Record `line` in memory. Blank lines and repeats of the newest entry
    /// are ignored. Returns whether the entry was added.
    pub fn push(&mut self, line: &str) -> bool {
        self.scroll = None;
        if line.trim().is_empty() || self.entries.first().map(String::as_str) == Some(line) {
            return false;
        }
        self.entries.insert(0, line.to_string());
        self.entries.truncate(self.limit);
        true
    }

    /// Record `line` and rewrite the history file.
    pub async fn submit(&mut self, line: &str) -> io::Result<()> {
        if self.push(line) {
            self.persist().await?;
        }
        Ok(())
    }

    /// Rewrite the whole file. No-op for in-memory history.
    pub async fn persist(&self) -> io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(&self.entries)?;
        tokio::fs::write(path, json).await
    }

    pub fn scroll_index(&self) -> Option<usize> {
        self.scroll
    }

    pub fn reset_scroll(&mut self) {
        self.scroll = None;
    }

    /// Step to the next older entry. Stays on the oldest one.
    pub fn previous(&mut self) -> Option<&str> {
        if self.entries.is_empty() {
            return None;
        }
        let index = match self.scroll {
            None => 0,
            Some(i) => (i + 1).min(self.entries.len() - 1),
        };
        self.scroll = Some(index);
        self.entries.get(index).map(String::as_str)
    }

    /// Step to the next newer entry. `None` once scrolling leaves the
    /// history, meaning the fresh line should come back.
    pub fn next(&mut self) -> Option<&str> {
        match self.scroll {
            None | Some(0) => {
                self.scroll = None;
                None
            }
            Some(i) => {
                self.scroll = Some(i - 1);
                self.entries.get(i - 1).map(String::as_str)
            }
        }
    }

    /// Continuation of `prefix` taken from the newest entry that extends it.
    pub fn suggestion(&self, prefix: &str) -> Option<String> {
        if prefix.is_empty() {
            return None;
        }
        self.entries
            .iter()
            .find(|entry| entry.len() > prefix.len() && entry.starts_with(prefix))
            .map(|entry| entry[prefix.len()..].to_string())
    }
}
