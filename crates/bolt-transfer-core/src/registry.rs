//! Process-wide table of in-flight transfers.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use bolt_events::{Event, PausedPayload};

use crate::descriptor::TransferDescriptor;
use crate::model::TransferSnapshot;
use crate::naming::{numbered_filename, sanitize_filename};

/// Concurrency-safe map of transfer id to descriptor.
///
/// Entries are removed on terminal outcomes only; pausing keeps them registered.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    entries: Arc<Mutex<HashMap<Uuid, Arc<TransferDescriptor>>>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor, returning the shared handle.
    pub fn insert(&self, descriptor: TransferDescriptor) -> Arc<TransferDescriptor> {
        let descriptor = Arc::new(descriptor);
        self.lock()
            .insert(descriptor.id(), Arc::clone(&descriptor));
        descriptor
    }

    /// Look up a descriptor.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<Arc<TransferDescriptor>> {
        self.lock().get(&id).cloned()
    }

    /// Remove a descriptor.
    pub fn remove(&self, id: Uuid) -> Option<Arc<TransferDescriptor>> {
        self.lock().remove(&id)
    }

    /// Assign `descriptor` an artifact name derived from `candidate`.
    ///
    /// The first of `candidate`, `candidate (1)`, `candidate (2)`, ... that no
    /// other registered transfer holds and that `taken` does not reject wins.
    /// A descriptor that already has a name keeps it. The table stays locked
    /// for the whole search so two transfers can never claim the same name.
    pub fn claim_name(
        &self,
        descriptor: &TransferDescriptor,
        candidate: &str,
        taken: impl Fn(&str) -> bool,
    ) -> String {
        let entries = self.lock();
        if let Some(name) = descriptor.resolved_name() {
            return name.to_string();
        }
        let base = sanitize_filename(candidate);
        let held: HashSet<&str> = entries
            .values()
            .filter(|other| other.id() != descriptor.id())
            .filter_map(|other| other.resolved_name())
            .collect();
        let name = (0..=u32::MAX)
            .map(|n| numbered_filename(&base, n))
            .find(|name| !held.contains(name.as_str()) && !taken(name))
            .unwrap_or_else(|| format!("{base}.{}", descriptor.id()));
        descriptor.resolve_name_with(|| name).to_string()
    }

    /// Number of registered transfers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Snapshot every registered transfer, oldest first.
    #[must_use]
    pub fn snapshots(&self) -> Vec<TransferSnapshot> {
        let mut snapshots: Vec<_> = self.descriptors().iter().map(|d| d.snapshot()).collect();
        snapshots.sort_by_key(|snapshot| snapshot.created_at);
        snapshots
    }

    /// Events that bring a newly connected subscriber up to date.
    ///
    /// Cancelled entries are skipped. Each entry replays its last progress
    /// snapshot, or a pause notice when paused before any progress was recorded.
    #[must_use]
    pub fn replay_events(&self) -> Vec<Event> {
        self.descriptors()
            .into_iter()
            .filter(|descriptor| !descriptor.is_cancelled())
            .filter_map(|descriptor| {
                descriptor
                    .last_status()
                    .map(Event::DownloadProgress)
                    .or_else(|| {
                        descriptor.is_paused().then(|| {
                            Event::DownloadPaused(PausedPayload {
                                download_id: descriptor.id(),
                            })
                        })
                    })
            })
            .collect()
    }

    fn descriptors(&self) -> Vec<Arc<TransferDescriptor>> {
        self.lock().values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<TransferDescriptor>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FilenamePolicy, TransferRequest};
    use crate::progress::starting_snapshot;

    fn request(source: &str) -> TransferRequest {
        TransferRequest {
            source: source.into(),
            filename_policy: FilenamePolicy::DeriveFromSource,
        }
    }

    #[test]
    fn insert_get_remove() {
        let registry = Registry::new();
        let handle = registry.insert(TransferDescriptor::new(request("https://x/a")));
        assert_eq!(registry.len(), 1);
        assert!(registry.get(handle.id()).is_some());
        assert!(registry.remove(handle.id()).is_some());
        assert!(registry.get(handle.id()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn replay_skips_cancelled_and_reports_paused_without_status() {
        let registry = Registry::new();
        let with_status = registry.insert(TransferDescriptor::new(request("https://x/a")));
        with_status.record_status(starting_snapshot(with_status.id()));
        let paused = registry.insert(TransferDescriptor::new(request("https://x/b")));
        assert!(paused.pause());
        let cancelled = registry.insert(TransferDescriptor::new(request("https://x/c")));
        cancelled.record_status(starting_snapshot(cancelled.id()));
        assert!(cancelled.cancel().is_some());
        let _idle = registry.insert(TransferDescriptor::new(request("https://x/d")));

        let events = registry.replay_events();
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|event| matches!(
            event,
            Event::DownloadProgress(p) if p.download_id == with_status.id()
        )));
        assert!(events.iter().any(|event| matches!(
            event,
            Event::DownloadPaused(p) if p.download_id == paused.id()
        )));
    }

    #[test]
    fn claimed_names_skip_live_transfers_and_taken_names() {
        let registry = Registry::new();
        let first = registry.insert(TransferDescriptor::new(request("https://x/y.bin")));
        let second = registry.insert(TransferDescriptor::new(request("https://x/y.bin")));
        let third = registry.insert(TransferDescriptor::new(request("https://x/y.bin")));

        assert_eq!(registry.claim_name(&first, "y.bin", |_| false), "y.bin");
        assert_eq!(registry.claim_name(&second, "y.bin", |_| false), "y (1).bin");
        assert_eq!(
            registry.claim_name(&third, "y.bin", |name| name == "y (2).bin"),
            "y (3).bin"
        );
        assert_eq!(registry.claim_name(&first, "other.bin", |_| true), "y.bin");

        let _ = registry.remove(first.id());
        let fourth = registry.insert(TransferDescriptor::new(request("https://x/y.bin")));
        assert_eq!(registry.claim_name(&fourth, "y.bin", |_| false), "y.bin");
    }

    #[test]
    fn paused_entries_stay_registered() {
        let registry = Registry::new();
        let handle = registry.insert(TransferDescriptor::new(request("https://x/a")));
        assert!(handle.pause());
        assert_eq!(registry.snapshots().len(), 1);
        assert!(registry.snapshots()[0].paused);
    }
}
