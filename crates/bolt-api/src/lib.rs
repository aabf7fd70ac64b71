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

//! HTTP surface for the Bolt transfer service: lifecycle control, history,
//! server-sent events, and byte-range streaming.
//!
//! Layout: http/router.rs (router + middleware), http/{transfers,history,tools}.rs
//! (JSON handlers), http/sse.rs (event stream), http/stream.rs (range serving),
//! http/errors.rs (problem documents), models.rs (wire types), state.rs, error.rs.

pub mod error;
pub mod http;
pub mod models;
pub mod state;

pub use error::{ApiServerError, ApiServerResult};
pub use http::router::ApiServer;
pub use models::ProblemDetails;
pub use state::ApiState;
