//! Snapshot delivery from room actors to subscribers.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use cardroom_protocol::{RoomId, Snapshot};
use tokio::sync::broadcast;

/// Delivers each room's snapshots to whoever is listening on that room's
/// topic.
///
/// Room actors call `publish` after every event, in order. Implementations
/// must not block and must keep per-room order; delivery itself is
/// best-effort. Swapping the implementation (for an external broker, say)
/// does not touch the actors.
pub trait Publisher: Send + Sync + 'static {
    fn publish(&self, room_id: &RoomId, snapshot: Snapshot);
}

/// In-process [`Publisher`]: one `tokio::sync::broadcast` channel per room.
///
/// Every subscriber gets its own bounded view of the channel. One that
/// falls `capacity` snapshots behind sees `RecvError::Lagged`, loses the
/// oldest ones and continues with the newest, so a slow socket never
/// holds up the room. Subscribers see only what is published after they
/// subscribed.
pub struct TopicPublisher {
    topics: Mutex<HashMap<RoomId, broadcast::Sender<Snapshot>>>,
    capacity: usize,
}

impl TopicPublisher {
    /// `capacity` is the per-subscriber buffer, clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Starts receiving snapshots for `room_id`. The room does not need
    /// to exist yet.
    pub fn subscribe(&self, room_id: &RoomId) -> broadcast::Receiver<Snapshot> {
        let mut topics = self.topics();
        topics
            .entry(room_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Drops the channel for `room_id` if nobody listens on it any more.
    /// Call after dropping a receiver; returns `true` if the topic went.
    ///
    /// `publish` prunes too, but only topics that a room publishes to.
    pub fn prune(&self, room_id: &RoomId) -> bool {
        let mut topics = self.topics();
        let idle = topics
            .get(room_id)
            .is_some_and(|sender| sender.receiver_count() == 0);
        if idle {
            topics.remove(room_id);
            tracing::trace!(%room_id, "topic pruned");
        }
        idle
    }

    /// Number of live subscribers on `room_id`.
    pub fn subscriber_count(&self, room_id: &RoomId) -> usize {
        self.topics()
            .get(room_id)
            .map_or(0, broadcast::Sender::receiver_count)
    }

    /// Number of topics with a channel allocated.
    pub fn topic_count(&self) -> usize {
        self.topics().len()
    }

    // The map is only touched by short, non-panicking sections, so a
    // poisoned lock still holds a consistent map.
    fn topics(&self) -> MutexGuard<'_, HashMap<RoomId, broadcast::Sender<Snapshot>>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for TopicPublisher {
    fn default() -> Self {
        Self::new(32)
    }
}

impl Publisher for TopicPublisher {
    fn publish(&self, room_id: &RoomId, snapshot: Snapshot) {
        let mut topics = self.topics();
        let Some(sender) = topics.get(room_id) else {
            tracing::trace!(%room_id, "no subscribers, snapshot dropped");
            return;
        };
        if sender.send(snapshot).is_err() {
            // Every receiver is gone.
            topics.remove(room_id);
            tracing::debug!(%room_id, "topic pruned");
        }
    }
}
