//! Room actor: an isolated Tokio task that owns one [`Room`].
//!
//! Each room runs in its own task and is reached only through its
//! command channel, so events for one room are applied strictly one at a
//! time, in arrival order, while different rooms run in parallel.
//!
//! After every event the actor publishes exactly one snapshot (no-ops
//! included) before it looks at the next command.
//!
//! # Retirement
//!
//! A room stops when it becomes empty or sits idle past
//! [`RoomConfig::idle_ttl`]. Both checks run while holding the registry
//! lock. The registry also holds that lock while it sends commands, so
//! "my queue is empty" and "remove me from the map" happen atomically:
//! no event can be queued in between and then lost.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cardroom_protocol::{InboundEvent, RoomId, Snapshot};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::Instant;

use crate::{Outcome, Publisher, Room, RoomConfig, RoomError};

/// Distinguishes successive actors spawned for the same room id.
static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// The registry's map, shared with every actor so they can remove
/// themselves.
pub(crate) type RoomMap = Arc<Mutex<HashMap<RoomId, RoomHandle>>>;

/// Commands sent to a room actor through its channel.
pub(crate) enum RoomCommand {
    /// Apply an inbound event and publish the resulting snapshot.
    Apply(InboundEvent),

    /// Reply with the current state. Does not publish, and does not
    /// consume the reset flag.
    Snapshot { reply: oneshot::Sender<Snapshot> },

    /// Retire the room if nobody is in it.
    RetireIfEmpty,

    /// Stop without touching the registry map.
    Shutdown,
}

/// Handle to a running room actor.
///
/// Cheap to clone. A handle can outlive its actor; once the room has
/// retired every method returns [`RoomError::Unavailable`]. Route events
/// through [`RoomRegistry::dispatch`](crate::RoomRegistry::dispatch) rather
/// than holding on to handles.
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    generation: u64,
    sender: mpsc::UnboundedSender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Queues an event. Never waits.
    pub fn apply(&self, event: InboundEvent) -> Result<(), RoomError> {
        self.send(RoomCommand::Apply(event))
    }

    /// Asks the actor for its current state.
    pub async fn snapshot(&self) -> Result<Snapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(RoomCommand::Snapshot { reply: reply_tx })?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub(crate) fn retire_if_empty(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::RetireIfEmpty)
    }

    pub(crate) fn shutdown(&self) -> Result<(), RoomError> {
        self.send(RoomCommand::Shutdown)
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender
            .send(cmd)
            .map_err(|_| RoomError::Unavailable(self.room_id.clone()))
    }
}

/// Why the actor should try to leave the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retire {
    /// Only if the room has no participants.
    IfEmpty,
    /// Regardless of membership (idle timeout).
    Idle,
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    room: Room,
    generation: u64,
    config: RoomConfig,
    publisher: Arc<dyn Publisher>,
    rooms: RoomMap,
    receiver: mpsc::UnboundedReceiver<RoomCommand>,
    last_activity: Instant,
}

impl RoomActor {
    /// Runs the actor loop until the room retires or is shut down.
    async fn run(mut self) {
        tracing::info!(room_id = %self.room.id(), "room opened");

        loop {
            let idle_deadline = self.last_activity + self.config.idle_ttl;

            tokio::select! {
                cmd = self.receiver.recv() => match cmd {
                    Some(RoomCommand::Apply(event)) => {
                        self.last_activity = Instant::now();
                        self.handle_event(event);
                        if self.room.is_empty()
                            && self.try_retire(Retire::IfEmpty).await
                        {
                            break;
                        }
                    }
                    Some(RoomCommand::Snapshot { reply }) => {
                        let _ = reply.send(self.room.snapshot());
                    }
                    Some(RoomCommand::RetireIfEmpty) => {
                        if self.try_retire(Retire::IfEmpty).await {
                            break;
                        }
                    }
                    Some(RoomCommand::Shutdown) | None => {
                        tracing::info!(room_id = %self.room.id(), "room shutting down");
                        break;
                    }
                },
                () = tokio::time::sleep_until(idle_deadline) => {
                    if self.try_retire(Retire::Idle).await {
                        tracing::info!(
                            room_id = %self.room.id(),
                            participants = self.room.len(),
                            "room retired after idle timeout"
                        );
                        break;
                    }
                }
            }
        }

        tracing::info!(room_id = %self.room.id(), "room closed");
    }

    fn handle_event(&mut self, event: InboundEvent) {
        let room_id = self.room.id().clone();

        match self.room.apply(&event) {
            Outcome::Applied => tracing::debug!(
                %room_id,
                kind = %event.kind(),
                participant_id = ?event.participant_id(),
                participants = self.room.len(),
                "event applied"
            ),
            Outcome::Ignored(reason) => tracing::debug!(
                %room_id,
                kind = %event.kind(),
                participant_id = ?event.participant_id(),
                %reason,
                "event ignored"
            ),
        }

        if let Err(violation) = self.room.check_invariants() {
            tracing::error!(
                %room_id,
                %violation,
                "room state inconsistent, recreating it empty"
            );
            self.room = Room::new(room_id.clone());
        }

        let snapshot = self.room.take_snapshot();
        self.publisher.publish(&room_id, snapshot);
    }

    /// Removes this actor from the registry if the condition still holds
    /// once the registry lock is held. Returns `true` if the actor must
    /// stop.
    async fn try_retire(&mut self, why: Retire) -> bool {
        let mut rooms = self.rooms.lock().await;

        if !self.receiver.is_empty() {
            return false;
        }
        if why == Retire::IfEmpty && !self.room.is_empty() {
            return false;
        }

        let room_id = self.room.id();
        if rooms
            .get(room_id)
            .is_some_and(|h| h.generation() == self.generation)
        {
            rooms.remove(room_id);
            tracing::info!(%room_id, ?why, "room retired");
        }
        self.receiver.close();
        true
    }
}

/// Spawns a new room actor task and returns a handle to it.
pub(crate) fn spawn_room(
    room_id: RoomId,
    config: RoomConfig,
    publisher: Arc<dyn Publisher>,
    rooms: RoomMap,
) -> RoomHandle {
    let (tx, rx) = mpsc::unbounded_channel();
    let generation = NEXT_GENERATION.fetch_add(1, Ordering::Relaxed);

    let actor = RoomActor {
        room: Room::new(room_id.clone()),
        generation,
        config,
        publisher,
        rooms,
        receiver: rx,
        last_activity: Instant::now(),
    };

    tokio::spawn(actor.run());

    RoomHandle {
        room_id,
        generation,
        sender: tx,
    }
}
