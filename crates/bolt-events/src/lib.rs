#![forbid(unsafe_code)]
#![warn(
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Notification transport for the Bolt transfer service.
//!
//! The bus provides a typed event enum, sequential identifiers, and support for
//! replaying recent events when subscribers reconnect (e.g. SSE clients that
//! supply `Last-Event-ID`). Publishing never blocks: the bus is backed by a
//! bounded `tokio::broadcast` channel and slow subscribers lose the oldest
//! events rather than stalling a transfer loop.
//!
//! Layout: `payloads.rs` (event payloads), `routing.rs` (bus and subscriber stream).

pub mod payloads;
pub mod routing;

pub use payloads::{
    CompletePayload, DEFAULT_REPLAY_CAPACITY, ErrorPayload, Event, EventEnvelope, EventId,
    PausedPayload, ProgressPayload, ServerStatsPayload, TransferPhase,
};
pub use routing::{EventBus, EventStream};
