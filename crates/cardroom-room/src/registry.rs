//! Room registry: finds, creates and routes events to room actors.

use std::collections::HashMap;
use std::sync::Arc;

use cardroom_protocol::{InboundEvent, RoomId, Snapshot};
use tokio::sync::Mutex;

use crate::actor::{RoomMap, spawn_room};
use crate::{Publisher, RoomConfig, RoomError, RoomHandle};

/// Owns the mapping room id → running room actor.
///
/// Rooms are created lazily by the first `JOIN` and retire themselves
/// when empty. Cheap to clone; clones share the same rooms.
#[derive(Clone)]
pub struct RoomRegistry {
    rooms: RoomMap,
    publisher: Arc<dyn Publisher>,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Creates an empty registry whose rooms publish through `publisher`.
    pub fn new(config: RoomConfig, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            rooms: Arc::new(Mutex::new(HashMap::new())),
            publisher,
            config,
        }
    }

    /// Returns the live room for `room_id`, spawning an empty one if there
    /// is none. Never fails.
    pub async fn get_or_create(&self, room_id: &RoomId) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        self.live_or_spawn(&mut rooms, room_id).clone()
    }

    /// Asks the room to retire if it has no participants. The room makes
    /// that check itself, under the registry lock.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if no room is running under `room_id`.
    pub async fn remove_if_empty(&self, room_id: &RoomId) -> Result<(), RoomError> {
        let rooms = self.rooms.lock().await;
        rooms
            .get(room_id)
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?
            .retire_if_empty()
    }

    /// Routes an event to its room.
    ///
    /// `JOIN` creates the room if needed. Any other event for a room that
    /// is not running is dropped.
    ///
    /// # Errors
    /// - [`RoomError::NotFound`] for a non-`JOIN` event to an unknown room.
    /// - [`RoomError::Unavailable`] if the room's actor has stopped.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<(), RoomError> {
        let mut rooms = self.rooms.lock().await;
        let room_id = event.room_id().clone();

        let handle = match &event {
            InboundEvent::Join { .. } => self.live_or_spawn(&mut rooms, &room_id),
            _ => match rooms.get(&room_id) {
                Some(handle) => handle,
                None => {
                    tracing::debug!(
                        %room_id,
                        kind = %event.kind(),
                        "event for unknown room dropped"
                    );
                    return Err(RoomError::NotFound(room_id));
                }
            },
        };

        // Sent while the lock is held; see the actor's retirement notes.
        handle.apply(event)
    }

    /// The current state of a room, without publishing anything.
    ///
    /// # Errors
    /// [`RoomError::NotFound`] if the room is not running,
    /// [`RoomError::Unavailable`] if it retired while answering.
    pub async fn snapshot(&self, room_id: &RoomId) -> Result<Snapshot, RoomError> {
        // Clone the handle and release the lock before waiting: the actor
        // may need the lock to retire.
        let handle = self
            .rooms
            .lock()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| RoomError::NotFound(room_id.clone()))?;
        handle.snapshot().await
    }

    /// Returns the number of running rooms.
    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    /// Lists running room ids, sorted.
    pub async fn room_ids(&self) -> Vec<RoomId> {
        let mut ids: Vec<RoomId> =
            self.rooms.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Stops every room. Subscribers receive nothing further.
    pub async fn shutdown(&self) {
        let drained: Vec<(RoomId, RoomHandle)> =
            self.rooms.lock().await.drain().collect();
        for (room_id, handle) in &drained {
            if handle.shutdown().is_err() {
                tracing::debug!(%room_id, "room already stopped");
            }
        }
        tracing::info!(rooms = drained.len(), "room registry shut down");
    }

    fn live_or_spawn<'a>(
        &self,
        rooms: &'a mut HashMap<RoomId, RoomHandle>,
        room_id: &RoomId,
    ) -> &'a RoomHandle {
        if rooms.get(room_id).is_some_and(RoomHandle::is_closed) {
            tracing::warn!(%room_id, "replacing stopped room actor");
            rooms.remove(room_id);
        }
        rooms.entry(room_id.clone()).or_insert_with(|| {
            tracing::info!(%room_id, "room created");
            spawn_room(
                room_id.clone(),
                self.config.clone(),
                Arc::clone(&self.publisher),
                Arc::clone(&self.rooms),
            )
        })
    }
}
