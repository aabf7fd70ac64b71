//! Server-sent event stream of transfer notifications.
//!
//! A (re)connecting subscriber first receives the current state of every
//! registered transfer, then the bus backlog after `Last-Event-ID`, then live
//! events.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::{
    extract::State,
    http::HeaderMap,
    response::sse::{self, KeepAlive, Sse},
};
use bolt_events::{Event, EventId};
use futures_core::Stream;
use tracing::{debug, warn};

use crate::http::constants::{HEADER_LAST_EVENT_ID, SSE_KEEP_ALIVE_SECS};
use crate::state::ApiState;

pub(crate) async fn stream_events(
    State(state): State<Arc<ApiState>>,
    headers: HeaderMap,
) -> Sse<impl Stream<Item = Result<sse::Event, Infallible>> + Send> {
    let last_id = headers
        .get(HEADER_LAST_EVENT_ID)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<EventId>().ok());
    let replay = state.inspector.replay_events().await;
    let mut live = state.events.subscribe(last_id);
    debug!(last_event_id = ?last_id, replayed = replay.len(), "event subscriber connected");

    let stream = stream! {
        for event in replay {
            if let Some(frame) = frame(None, &event) {
                yield Ok(frame);
            }
        }
        while let Some(envelope) = live.next().await {
            if let Some(frame) = frame(Some(envelope.id), &envelope.event) {
                yield Ok(frame);
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(SSE_KEEP_ALIVE_SECS))
            .text("keep-alive"),
    )
}

/// Render one event as `event: <kind>` / `data: <payload>`.
pub(crate) fn frame(id: Option<EventId>, event: &Event) -> Option<sse::Event> {
    let data = match event.data_json() {
        Ok(data) => data,
        Err(err) => {
            warn!(error = %err, kind = event.kind(), "failed to encode event payload");
            return None;
        }
    };
    let frame = sse::Event::default().event(event.kind()).data(data);
    Some(match id {
        Some(id) => frame.id(id.to_string()),
        None => frame,
    })
}
