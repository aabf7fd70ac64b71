//! Shared application state handed to every handler.

use std::sync::Arc;

use bolt_events::EventBus;
use bolt_telemetry::Metrics;
use bolt_transfer_core::{ArtifactReader, ObjectStore, TransferInspector, TransferWorkflow};

/// Collaborators reachable from request handlers.
#[derive(Clone)]
pub struct ApiState {
    pub(crate) workflow: Arc<dyn TransferWorkflow>,
    pub(crate) inspector: Arc<dyn TransferInspector>,
    pub(crate) artifacts: Arc<dyn ArtifactReader>,
    pub(crate) remote: Option<Arc<dyn ObjectStore>>,
    pub(crate) events: EventBus,
    pub(crate) telemetry: Metrics,
}

impl ApiState {
    /// Bundle the handler dependencies.
    #[must_use]
    pub fn new(
        workflow: Arc<dyn TransferWorkflow>,
        inspector: Arc<dyn TransferInspector>,
        artifacts: Arc<dyn ArtifactReader>,
        remote: Option<Arc<dyn ObjectStore>>,
        events: EventBus,
        telemetry: Metrics,
    ) -> Self {
        Self {
            workflow,
            inspector,
            artifacts,
            remote,
            events,
            telemetry,
        }
    }
}
