//! HTTP surface modules (router, handlers, middleware).

/// Shared constants and header names.
pub(crate) mod constants;
/// Problem response helpers and error types.
pub(crate) mod errors;
/// Health and diagnostics endpoints.
pub(crate) mod health;
/// History log handlers.
pub(crate) mod history;
/// Router construction and server host.
pub mod router;
/// Server-sent events stream.
pub(crate) mod sse;
/// Byte-range file serving.
pub(crate) mod stream;
/// Metrics middleware for HTTP requests.
pub(crate) mod telemetry;
/// Filename detection and link conversion.
pub(crate) mod tools;
/// Transfer lifecycle handlers.
pub(crate) mod transfers;
