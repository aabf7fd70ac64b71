#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]
#![allow(clippy::module_name_repetitions)]

//! Telemetry primitives shared across the Bolt workspace.
//!
//! This crate centralises logging, metrics, host sampling, and request-id
//! layers so the engine and the HTTP surface share one observability story.
//!
//! Layout: init.rs (logging), context.rs (app span), layers.rs (request ids),
//! metrics.rs (Prometheus), host.rs (memory sampling), error.rs.

pub mod context;
pub mod error;
pub mod host;
pub mod init;
pub mod layers;
pub mod metrics;

pub use context::GlobalContextGuard;
pub use error::{TelemetryError, TelemetryResult};
pub use host::{HostMemorySampler, MemorySample, MemorySampler};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
pub use layers::{REQUEST_ID_HEADER, RequestIdLayer, request_id_layer};
pub use metrics::{Metrics, MetricsSnapshot, TransferOutcome};
