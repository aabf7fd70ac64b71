//! Append-only record of completed transfers.

use std::sync::{Arc, PoisonError, RwLock};

use crate::model::HistoryEntry;

/// Completed transfers in append order; reads return newest first.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    entries: Arc<RwLock<Vec<HistoryEntry>>>,
}

impl HistoryLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed transfer.
    pub fn append(&self, entry: HistoryEntry) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    /// Entries newest first.
    #[must_use]
    pub fn newest_first(&self) -> Vec<HistoryEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.iter().rev().cloned().collect()
    }

    /// Remove every entry with the given name, returning how many were dropped.
    pub fn remove_by_name(&self, name: &str) -> usize {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|entry| entry.name != name);
        before - entries.len()
    }

    /// Whether any entry carries `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|entry| entry.name == name)
    }

    /// Number of recorded entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the log is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
