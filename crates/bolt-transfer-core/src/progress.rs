//! # Design
//!
//! - One meter per stage run; the fetch and relay stages share the same shape.
//! - Emission is throttled to one snapshot per interval, with the first
//!   observation always emitted.
//! - Speed counts only bytes moved by this run, so a resumed fetch does not
//!   report the already staged prefix as throughput.

use std::time::{Duration, Instant};

use uuid::Uuid;

use bolt_events::{ProgressPayload, TransferPhase};

use crate::format::{UNKNOWN_ETA, format_eta, format_speed, percentage};

/// Default minimum spacing between progress snapshots.
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(500);
/// Filename shown before the real name has been resolved.
pub const STARTING_FILENAME: &str = "Starting...";

const MIN_ELAPSED_SECS: f64 = 0.1;

/// Snapshot emitted when a transfer is accepted, before any bytes move.
#[must_use]
pub fn starting_snapshot(download_id: Uuid) -> ProgressPayload {
    ProgressPayload {
        download_id,
        filename: STARTING_FILENAME.to_string(),
        phase: TransferPhase::Downloading,
        percentage: 0.0,
        speed: "0 B/s".to_string(),
        eta: UNKNOWN_ETA.to_string(),
        downloaded: 0,
        total_size: 0,
    }
}

/// Throttled progress snapshot builder for one stage run.
#[derive(Debug, Clone)]
pub struct ProgressMeter {
    download_id: Uuid,
    filename: String,
    phase: TransferPhase,
    baseline: u64,
    total: u64,
    interval: Duration,
    started: Instant,
    last_emit: Option<Instant>,
}

impl ProgressMeter {
    /// Start a meter. `baseline` is the byte count already present when the run began.
    #[must_use]
    pub fn new(
        download_id: Uuid,
        filename: impl Into<String>,
        phase: TransferPhase,
        baseline: u64,
        total: u64,
        interval: Duration,
    ) -> Self {
        Self::started_at(
            download_id,
            filename,
            phase,
            baseline,
            total,
            interval,
            Instant::now(),
        )
    }

    /// Start a meter with an explicit start instant.
    #[must_use]
    pub fn started_at(
        download_id: Uuid,
        filename: impl Into<String>,
        phase: TransferPhase,
        baseline: u64,
        total: u64,
        interval: Duration,
        started: Instant,
    ) -> Self {
        Self {
            download_id,
            filename: filename.into(),
            phase,
            baseline,
            total,
            interval,
            started,
            last_emit: None,
        }
    }

    /// Total bytes expected, zero when unknown.
    #[must_use]
    pub const fn total(&self) -> u64 {
        self.total
    }

    /// Record progress and return a snapshot if the throttle interval elapsed.
    pub fn observe(&mut self, done: u64) -> Option<ProgressPayload> {
        self.observe_at(done, Instant::now())
    }

    /// Record progress at `now`; see [`ProgressMeter::observe`].
    pub fn observe_at(&mut self, done: u64, now: Instant) -> Option<ProgressPayload> {
        if let Some(last) = self.last_emit
            && now.saturating_duration_since(last) < self.interval
        {
            return None;
        }
        self.last_emit = Some(now);
        Some(self.snapshot_at(done, now))
    }

    /// Build a snapshot without touching the throttle.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn snapshot_at(&self, done: u64, now: Instant) -> ProgressPayload {
        let elapsed = now
            .saturating_duration_since(self.started)
            .as_secs_f64()
            .max(MIN_ELAPSED_SECS);
        let speed = done.saturating_sub(self.baseline) as f64 / elapsed;
        ProgressPayload {
            download_id: self.download_id,
            filename: self.filename.clone(),
            phase: self.phase,
            percentage: percentage(done, self.total),
            speed: format_speed(speed),
            eta: format_eta(done, self.total, speed),
            downloaded: done,
            total_size: self.total,
        }
    }
}
