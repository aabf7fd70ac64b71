//! Event bus routing helpers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::broadcast::{self, Sender};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;

use crate::payloads::{DEFAULT_REPLAY_CAPACITY, Event, EventEnvelope, EventId};

/// Shared event bus built on top of `tokio::broadcast`.
///
/// Delivery is best effort: publishing with no subscribers, or to a subscriber
/// that has fallen behind, silently drops the event for that subscriber.
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<EventEnvelope>,
    replay: Arc<Mutex<VecDeque<EventEnvelope>>>,
    replay_capacity: usize,
    next_id: Arc<Mutex<EventId>>,
}

impl EventBus {
    /// Construct a bus with a custom replay capacity.
    ///
    /// # Panics
    ///
    /// Panics if `replay_capacity` is zero.
    #[must_use]
    pub fn with_capacity(replay_capacity: usize) -> Self {
        assert!(replay_capacity > 0, "event bus capacity must be positive");
        let (sender, _) = broadcast::channel(replay_capacity);
        Self {
            sender,
            replay: Arc::new(Mutex::new(VecDeque::with_capacity(replay_capacity))),
            replay_capacity,
            next_id: Arc::new(Mutex::new(1)),
        }
    }

    /// Construct a bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Publish a new event to all subscribers, returning the assigned id.
    pub fn publish(&self, event: Event) -> EventId {
        let mut next = self
            .next_id
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let id = *next;
        *next = next.saturating_add(1);

        let envelope = EventEnvelope {
            id,
            timestamp: Utc::now(),
            event,
        };
        {
            let mut replay = self.lock_replay();
            if replay.len() == self.replay_capacity {
                let _ = replay.pop_front();
            }
            replay.push_back(envelope.clone());
        }
        // Sent while the id lock is held so ids reach subscribers in order.
        let _ = self.sender.send(envelope);
        drop(next);
        id
    }

    /// Subscribe to the bus, replaying buffered events newer than `since_id`.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let replay = self.lock_replay();
        let receiver = self.sender.subscribe();
        let backlog = since_id.map_or_else(VecDeque::new, |since| {
            replay.iter().filter(|env| env.id > since).cloned().collect()
        });
        drop(replay);
        let replayed_through = backlog.back().map_or(0, |env: &EventEnvelope| env.id);
        EventStream {
            backlog,
            replayed_through,
            live: BroadcastStream::new(receiver),
        }
    }

    /// Last event id observed in the replay buffer.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.lock_replay().back().map(|env| env.id)
    }

    /// Collect a backlog of events emitted after the specified id.
    #[must_use]
    pub fn backlog_since(&self, id: EventId) -> Vec<EventEnvelope> {
        let replay = self.lock_replay();
        replay.iter().filter(|env| env.id > id).cloned().collect()
    }

    fn lock_replay(&self) -> MutexGuard<'_, VecDeque<EventEnvelope>> {
        self.replay
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscriber handle that yields the replay backlog first, then live events.
pub struct EventStream {
    backlog: VecDeque<EventEnvelope>,
    replayed_through: EventId,
    live: BroadcastStream<EventEnvelope>,
}

impl EventStream {
    /// Receive the next event. Returns `None` once the bus is dropped.
    ///
    /// Events skipped because this subscriber lagged are not reported.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(envelope) = self.backlog.pop_front() {
            return Some(envelope);
        }
        loop {
            match self.live.next().await? {
                // Already delivered from the backlog.
                Ok(envelope) if envelope.id <= self.replayed_through => {}
                Ok(envelope) => return Some(envelope),
                Err(_lagged) => {}
            }
        }
    }
}
