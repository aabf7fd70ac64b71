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

//! Resumable transfer engine.
//!
//! Streams a remote source into a staging directory with byte-range resume,
//! relays the staged file to an object store, and reports throttled progress
//! on the shared event bus. Pause, resume, and cancel act through the
//! descriptor generation token defined in `bolt-transfer-core`.
//!
//! Layout: service.rs (workflow façade), controller.rs (run orchestration),
//! fetch.rs/relay.rs (stages), http.rs (reqwest source), store.rs (filesystem
//! object store), artifact.rs (staging directory), emit.rs, settings.rs.

pub mod artifact;
pub mod controller;
pub mod emit;
pub mod fetch;
pub mod http;
pub mod relay;
pub mod service;
pub mod settings;
pub mod store;

pub use artifact::{LocalArtifacts, validate_artifact_name};
pub use controller::{RunOutcome, TransferController};
pub use emit::Emitter;
pub use fetch::{FetchOutcome, FetchStage};
pub use http::HttpContentSource;
pub use relay::{RelayOutcome, RelayStage};
pub use service::TransferService;
pub use settings::{EngineSettings, HttpSourceSettings};
pub use store::FilesystemObjectStore;
