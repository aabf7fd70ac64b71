#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Bolt application bootstrap wiring.
//!
//! Layout: `bootstrap.rs` (service wiring), `stats.rs` (host telemetry task),
//! `error.rs`.

/// Application bootstrap and environment loading.
pub mod bootstrap;
/// Application error types.
pub mod error;
/// Periodic host statistics broadcast.
pub mod stats;

pub use bootstrap::run_app;
pub use error::{AppError, AppResult};
