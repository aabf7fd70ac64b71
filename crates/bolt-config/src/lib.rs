#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Environment-driven configuration for the Bolt service.
//!
//! Layout: `model.rs` (typed config), `loader.rs` (`from_env`/`from_lookup`),
//! `validate.rs` (per-variable parsing), `defaults.rs`, `error.rs`.

mod defaults;
pub mod error;
mod loader;
pub mod model;
mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{AppConfig, HttpConfig, LogFormatName, LoggingSettings, StorageConfig, TransferConfig};
