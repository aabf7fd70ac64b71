//! # Design
//!
//! - One descriptor per logical transfer, shared behind an `Arc` between the
//!   registry, the API layer, and any in-flight run.
//! - Interruption is cooperative: pause and resume bump the generation token and
//!   a run stops at the next chunk boundary once its captured generation is stale.
//! - Cancellation is a one-way flag that dominates pause.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use bolt_events::ProgressPayload;

use crate::model::{FilenamePolicy, TransferRequest, TransferSnapshot, TransferState};
use crate::naming::sanitize_filename;

/// Generation token captured by a run when it starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunGeneration(u64);

impl RunGeneration {
    /// Raw token value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Result of a resume request against a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeDecision {
    /// A new run must be launched under the returned generation.
    Relaunch(RunGeneration),
    /// The transfer is already running; nothing to do.
    AlreadyRunning,
    /// The transfer was cancelled and can never run again.
    Cancelled,
}

/// Identity and mutable lifecycle state of one transfer.
#[derive(Debug)]
pub struct TransferDescriptor {
    id: Uuid,
    source: String,
    filename_policy: FilenamePolicy,
    resolved_name: OnceLock<String>,
    paused: AtomicBool,
    cancelled: AtomicBool,
    generation: AtomicU64,
    fetched_total: Mutex<Option<u64>>,
    state: Mutex<TransferState>,
    last_status: Mutex<Option<ProgressPayload>>,
    created_at: DateTime<Utc>,
}

impl TransferDescriptor {
    /// Create a descriptor with a fresh identifier.
    ///
    /// The artifact name stays unassigned until the first run claims one.
    #[must_use]
    pub fn new(request: TransferRequest) -> Self {
        Self::with_id(Uuid::new_v4(), request)
    }

    /// Create a descriptor with a caller supplied identifier.
    #[must_use]
    pub fn with_id(id: Uuid, request: TransferRequest) -> Self {
        Self {
            id,
            source: request.source,
            filename_policy: request.filename_policy,
            resolved_name: OnceLock::new(),
            paused: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            fetched_total: Mutex::new(None),
            state: Mutex::new(TransferState::Created),
            last_status: Mutex::new(None),
            created_at: Utc::now(),
        }
    }

    /// Transfer identifier.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Remote source location.
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Naming policy requested at creation.
    #[must_use]
    pub const fn filename_policy(&self) -> &FilenamePolicy {
        &self.filename_policy
    }

    /// Resolved artifact name, once assigned.
    #[must_use]
    pub fn resolved_name(&self) -> Option<&str> {
        self.resolved_name.get().map(String::as_str)
    }

    /// Resolve the artifact name exactly once.
    ///
    /// `derive` runs only when no name has been assigned yet; later calls return
    /// the first assigned value.
    pub fn resolve_name_with(&self, derive: impl FnOnce() -> String) -> &str {
        self.resolved_name.get_or_init(|| sanitize_filename(&derive()))
    }

    /// Whether the user paused the transfer.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// Whether the transfer was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Capture the current generation for a new run.
    #[must_use]
    pub fn current_generation(&self) -> RunGeneration {
        RunGeneration(self.generation.load(Ordering::Acquire))
    }

    /// Whether a run started under `run` is still the authoritative one.
    #[must_use]
    pub fn is_current(&self, run: RunGeneration) -> bool {
        self.generation.load(Ordering::Acquire) == run.0
    }

    /// Whether a run may keep working: current generation, not paused, not cancelled.
    #[must_use]
    pub fn may_continue(&self, run: RunGeneration) -> bool {
        !self.is_cancelled() && !self.is_paused() && self.is_current(run)
    }

    /// Pause the transfer, invalidating the in-flight run.
    ///
    /// Returns `false` when the descriptor is cancelled or already paused.
    pub fn pause(&self) -> bool {
        let mut state = self.lock_state();
        if self.is_cancelled() || self.is_paused() || state.is_terminal() {
            return false;
        }
        self.paused.store(true, Ordering::Release);
        self.generation.fetch_add(1, Ordering::AcqRel);
        *state = TransferState::Paused;
        true
    }

    /// Resume a paused or errored transfer under a new generation.
    pub fn resume(&self) -> ResumeDecision {
        let mut state = self.lock_state();
        if self.is_cancelled() || *state == TransferState::Cancelled {
            return ResumeDecision::Cancelled;
        }
        let resumable = self.is_paused() || matches!(*state, TransferState::Errored);
        if !resumable || state.is_terminal() {
            return ResumeDecision::AlreadyRunning;
        }
        self.paused.store(false, Ordering::Release);
        let next = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        *state = TransferState::Created;
        ResumeDecision::Relaunch(RunGeneration(next))
    }

    /// Cancel the transfer.
    ///
    /// Returns the state observed at the moment of cancellation for the first
    /// call and `None` afterwards. The state is read under the same lock runs
    /// use for their transitions, so no run can move the descriptor in between.
    pub fn cancel(&self) -> Option<TransferState> {
        let mut state = self.lock_state();
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return None;
        }
        Some(std::mem::replace(&mut *state, TransferState::Cancelled))
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> TransferState {
        *self.lock_state()
    }

    /// Move to `next` if `run` is still authoritative and nothing interrupted it.
    ///
    /// Returns whether the transition was applied.
    pub fn transition(&self, run: RunGeneration, next: TransferState) -> bool {
        let mut state = self.lock_state();
        if !self.may_continue(run) || state.is_terminal() {
            return false;
        }
        *state = next;
        true
    }

    /// Record the total bytes staged locally by a completed fetch.
    pub fn mark_fetched(&self, total: u64) {
        *self
            .fetched_total
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(total);
    }

    /// Total staged bytes if the fetch stage already completed.
    #[must_use]
    pub fn fetched_total(&self) -> Option<u64> {
        *self
            .fetched_total
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the latest progress snapshot.
    pub fn record_status(&self, status: ProgressPayload) {
        *self.lock_status() = Some(status);
    }

    /// Latest progress snapshot.
    #[must_use]
    pub fn last_status(&self) -> Option<ProgressPayload> {
        self.lock_status().clone()
    }

    /// Registration timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Point-in-time view for listings.
    #[must_use]
    pub fn snapshot(&self) -> TransferSnapshot {
        TransferSnapshot {
            id: self.id,
            source: self.source.clone(),
            filename: self.resolved_name().map(str::to_string),
            state: self.state(),
            paused: self.is_paused(),
            cancelled: self.is_cancelled(),
            last_status: self.last_status(),
            created_at: self.created_at,
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, TransferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_status(&self) -> MutexGuard<'_, Option<ProgressPayload>> {
        self.last_status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(policy: FilenamePolicy) -> TransferDescriptor {
        TransferDescriptor::new(TransferRequest {
            source: "https://x/y.bin".into(),
            filename_policy: policy,
        })
    }

    #[test]
    fn override_name_waits_for_resolution_and_is_sanitized() {
        let desc = descriptor(FilenamePolicy::Override("a/b:c.mkv".into()));
        assert_eq!(desc.resolved_name(), None);
        assert_eq!(desc.resolve_name_with(|| "a/b:c.mkv".into()), "a_b_c.mkv");
        assert_eq!(desc.resolve_name_with(|| "other.bin".into()), "a_b_c.mkv");
    }

    #[test]
    fn derived_name_is_assigned_once() {
        let desc = descriptor(FilenamePolicy::DeriveFromSource);
        assert_eq!(desc.resolved_name(), None);
        assert_eq!(desc.resolve_name_with(|| "first?.bin".into()), "first_.bin");
        assert_eq!(desc.resolve_name_with(|| "second.bin".into()), "first_.bin");
    }

    #[test]
    fn pause_and_resume_each_change_generation() {
        let desc = descriptor(FilenamePolicy::DeriveFromSource);
        let first = desc.current_generation();
        assert!(desc.transition(first, TransferState::Fetching));

        assert!(desc.pause());
        assert!(!desc.is_current(first));
        assert!(!desc.may_continue(first));
        assert_eq!(desc.state(), TransferState::Paused);
        assert!(!desc.pause(), "second pause is a no-op");

        let ResumeDecision::Relaunch(second) = desc.resume() else {
            panic!("paused descriptor should relaunch");
        };
        assert_ne!(first, second);
        assert!(desc.may_continue(second));
        assert!(!desc.transition(first, TransferState::Uploading));
        assert!(desc.transition(second, TransferState::Fetching));
    }

    #[test]
    fn resume_of_running_descriptor_is_a_no_op() {
        let desc = descriptor(FilenamePolicy::DeriveFromSource);
        let run = desc.current_generation();
        assert!(desc.transition(run, TransferState::Fetching));
        assert_eq!(desc.resume(), ResumeDecision::AlreadyRunning);
        assert!(desc.is_current(run));
    }

    #[test]
    fn errored_descriptor_can_be_resumed() {
        let desc = descriptor(FilenamePolicy::DeriveFromSource);
        let run = desc.current_generation();
        assert!(desc.transition(run, TransferState::Errored));
        assert!(matches!(desc.resume(), ResumeDecision::Relaunch(_)));
    }

    #[test]
    fn cancellation_dominates_pause_and_is_idempotent() {
        let desc = descriptor(FilenamePolicy::DeriveFromSource);
        assert!(desc.pause());
        assert_eq!(desc.cancel(), Some(TransferState::Paused));
        assert_eq!(desc.cancel(), None);
        assert_eq!(desc.resume(), ResumeDecision::Cancelled);
        assert!(!desc.pause());
        assert_eq!(desc.state(), TransferState::Cancelled);
        let run = desc.current_generation();
        assert!(!desc.may_continue(run));
    }

    #[test]
    fn cancel_reports_the_state_a_failed_run_left_behind() {
        let desc = descriptor(FilenamePolicy::DeriveFromSource);
        let run = desc.current_generation();
        assert!(desc.transition(run, TransferState::Fetching));
        assert!(desc.transition(run, TransferState::Errored));
        assert_eq!(desc.cancel(), Some(TransferState::Errored));
        assert!(!desc.transition(run, TransferState::Fetching));
    }
}
