//! Locally persisted generation history.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Storage key the history list lives under.
pub const HISTORY_KEY: &str = "image_history_v1";

/// Maximum number of entries kept.
pub const HISTORY_MAX: usize = 200;

/// One previously generated image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Unique entry id.
    pub id: String,
    /// Image URL.
    pub url: String,
    /// Unix milliseconds when the image was recorded.
    pub ts: i64,
}

/// Generated images, newest first, unique by URL, at most [`HISTORY_MAX`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from stored entries, dropping blanks, duplicates and overflow.
    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        let mut seen = HashSet::new();
        let mut entries: Vec<HistoryEntry> = entries
            .into_iter()
            .filter(|e| !e.url.trim().is_empty() && seen.insert(e.url.clone()))
            .collect();
        entries.truncate(HISTORY_MAX);
        Self { entries }
    }

    /// Entries, newest first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Prepends URLs not yet present, keeping their order. Returns how many were added.
    pub fn record<I, S>(&mut self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ts = chrono::Utc::now().timestamp_millis();
        let mut seen: HashSet<String> = self.entries.iter().map(|e| e.url.clone()).collect();
        let mut added: Vec<HistoryEntry> = urls
            .into_iter()
            .map(|u| u.as_ref().trim().to_string())
            .filter(|u| !u.is_empty() && seen.insert(u.clone()))
            .map(|url| HistoryEntry {
                id: uuid::Uuid::new_v4().to_string(),
                url,
                ts,
            })
            .collect();
        let count = added.len();

        added.append(&mut self.entries);
        added.truncate(HISTORY_MAX);
        self.entries = added;
        count
    }

    /// Removes one entry by id.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.id != id);
        before != self.entries.len()
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Persistence for [`History`].
pub trait HistoryStore: Send + Sync {
    /// Reads the stored history. A missing entry yields an empty history.
    fn load(&self) -> Result<History>;

    /// Replaces the stored history.
    fn save(&self, history: &History) -> Result<()>;
}

/// Key/value JSON file holding the history list under [`HISTORY_KEY`].
///
/// Other keys in the file are preserved on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Store backed by the file at `path`, created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, serde_json::Value>> {
        match std::fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self) -> Result<History> {
        let mut map = self.read_map()?;
        let entries: Vec<HistoryEntry> = match map.remove(HISTORY_KEY) {
            Some(value) => serde_json::from_value(value)?,
            None => Vec::new(),
        };
        debug!(path = %self.path.display(), entries = entries.len(), "history loaded");
        Ok(History::from_entries(entries))
    }

    fn save(&self, history: &History) -> Result<()> {
        // An unreadable file is replaced rather than blocking every save.
        let mut map = self.read_map().unwrap_or_default();
        map.insert(HISTORY_KEY.to_string(), serde_json::to_value(history.entries())?);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&map)?)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), entries = history.len(), "history saved");
        Ok(())
    }
}
