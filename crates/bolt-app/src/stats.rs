//! Periodic host memory broadcast.
//!
//! # Design
//! - Runs for the lifetime of the process; sampling failures are logged and
//!   retried after a fixed back-off rather than ending the task.
//! - Samples are published as `server_stats` events and mirrored into the
//!   host memory gauge.

use std::sync::Arc;
use std::time::Duration;

use bolt_events::{Event, EventBus, ServerStatsPayload};
use bolt_telemetry::{MemorySampler, Metrics};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::warn;

/// Delay before retrying after a failed sample.
pub const SAMPLE_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Background task that samples host memory on a fixed cadence.
pub struct StatsTask {
    sampler: Arc<dyn MemorySampler>,
    events: EventBus,
    telemetry: Metrics,
    interval: Duration,
    backoff: Duration,
}

impl StatsTask {
    /// Build the task with the default error back-off.
    #[must_use]
    pub fn new(
        sampler: Arc<dyn MemorySampler>,
        events: EventBus,
        telemetry: Metrics,
        interval: Duration,
    ) -> Self {
        Self {
            sampler,
            events,
            telemetry,
            interval,
            backoff: SAMPLE_ERROR_BACKOFF,
        }
    }

    /// Override the delay used after a failed sample.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Spawn the sampling loop onto the runtime.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        loop {
            let delay = self.tick();
            sleep(delay).await;
        }
    }

    /// Take and publish one sample, returning how long to wait before the next.
    fn tick(&self) -> Duration {
        match self.sampler.sample() {
            Ok(sample) => {
                self.telemetry.set_host_memory_percent(sample.used_percent);
                let event = Event::ServerStats(ServerStatsPayload {
                    ram: sample.used_percent,
                    ram_used: sample.used_mib,
                    ram_total: sample.total_mib,
                });
                self.telemetry.inc_event(event.kind());
                let _ = self.events.publish(event);
                self.interval
            }
            Err(err) => {
                warn!(error = %err, "host memory sample failed");
                self.backoff
            }
        }
    }
}
