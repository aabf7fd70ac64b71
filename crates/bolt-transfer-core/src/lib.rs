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

//! Engine-agnostic transfer domain: descriptors and their generation token,
//! the registry and history log, progress formatting, filename strategies, and
//! the collaborator traits implemented by concrete sources and stores.
//!
//! Layout: descriptor.rs (lifecycle flags), registry.rs/history.rs (shared
//! tables), format.rs/progress.rs (snapshots), naming.rs/links.rs/mime.rs
//! (name handling), range.rs (byte ranges), source.rs/store.rs/service.rs
//! (traits), error.rs.

pub mod descriptor;
pub mod error;
pub mod format;
pub mod history;
pub mod links;
pub mod mime;
pub mod model;
pub mod naming;
pub mod progress;
pub mod range;
pub mod registry;
pub mod service;
pub mod source;
pub mod store;

pub use descriptor::{ResumeDecision, RunGeneration, TransferDescriptor};
pub use error::{TransferError, TransferResult};
pub use history::HistoryLog;
pub use model::{
    FilenamePolicy, HistoryEntry, RemoteMetadata, RemoteReference, TransferRequest,
    TransferSnapshot, TransferState, UploadProgress,
};
pub use progress::{DEFAULT_PROGRESS_INTERVAL, ProgressMeter, starting_snapshot};
pub use range::{ByteRange, RangeRequest, resolve_range};
pub use registry::Registry;
pub use service::{
    DetectionSource, FilenameDetection, HistoryRemoval, TransferInspector, TransferWorkflow,
};
pub use source::{ByteStream, ContentSource, ProbeResponse, SourceResponse};
pub use store::{ArtifactReader, ObjectStore, UploadSession};
