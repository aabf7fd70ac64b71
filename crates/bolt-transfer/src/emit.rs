//! Event publication shared by the stages and the controller.

use bolt_events::{Event, EventBus, ProgressPayload};
use bolt_telemetry::Metrics;
use bolt_transfer_core::TransferDescriptor;

/// Publishes events to the bus and counts them.
#[derive(Clone)]
pub struct Emitter {
    events: EventBus,
    metrics: Metrics,
}

impl Emitter {
    /// Wrap the shared bus and metrics registry.
    #[must_use]
    pub const fn new(events: EventBus, metrics: Metrics) -> Self {
        Self { events, metrics }
    }

    /// Publish an event without waiting for subscribers.
    pub fn publish(&self, event: Event) {
        self.metrics.inc_event(event.kind());
        let _ = self.events.publish(event);
    }

    /// Record `snapshot` as the descriptor's latest status and publish it.
    pub fn progress(&self, descriptor: &TransferDescriptor, snapshot: ProgressPayload) {
        descriptor.record_status(snapshot.clone());
        self.publish(Event::DownloadProgress(snapshot));
    }

    /// Metrics registry used by the engine.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }
}
