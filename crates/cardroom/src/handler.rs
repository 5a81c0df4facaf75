//! Per-connection handler: frame decoding, subscriptions and routing.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Receive frames until the peer closes, goes silent past the idle
//!      timeout, or sends `DISCONNECT`
//!   2. `SUBSCRIBE` spawns a forwarder that pushes the room's snapshots
//!      to this connection
//!   3. `SEND` validates the inbound message, updates presence for
//!      `JOIN`/`LEAVE`, and dispatches the event to its room
//!   4. On exit, the connection's remaining presences start their grace
//!      period

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cardroom_protocol::{
    ClientFrame, Codec, InboundEvent, InboundMessage, JsonCodec, RoomId,
    ServerFrame, Snapshot,
};
use cardroom_room::TopicPublisher;
use cardroom_session::{PresenceKey, generate_participant_id};
use cardroom_transport::{Connection, ConnectionId, WebSocketConnection};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::CardroomError;
use crate::server::ServerState;

/// Drop guard that starts the grace period for every seat this connection
/// still holds when the handler exits.
///
/// This ensures cleanup happens even if the handler panics. Since `Drop`
/// is synchronous, we spawn a fire-and-forget task for the async lock.
struct PresenceGuard {
    conn_id: ConnectionId,
    state: Arc<ServerState>,
}

impl Drop for PresenceGuard {
    fn drop(&mut self) {
        let conn_id = self.conn_id;
        let state = Arc::clone(&self.state);
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(async move {
                let mut sessions = state.sessions.lock().await;
                sessions.disconnect(conn_id);
            });
        }
    }
}

/// One connection's subscription to one topic.
///
/// Dropping it releases the receiver and then prunes the topic if that
/// was its last listener, whether the forwarder ended or was aborted.
struct TopicLease {
    rx: Option<broadcast::Receiver<Snapshot>>,
    publisher: Arc<TopicPublisher>,
    topic: RoomId,
}

impl TopicLease {
    fn acquire(publisher: Arc<TopicPublisher>, topic: RoomId) -> Self {
        let rx = publisher.subscribe(&topic);
        Self {
            rx: Some(rx),
            publisher,
            topic,
        }
    }

    async fn recv(&mut self) -> Result<Snapshot, RecvError> {
        match self.rx.as_mut() {
            Some(rx) => rx.recv().await,
            None => Err(RecvError::Closed),
        }
    }
}

impl Drop for TopicLease {
    fn drop(&mut self) {
        // The receiver has to be gone before the topic is checked.
        drop(self.rx.take());
        self.publisher.prune(&self.topic);
    }
}

/// The snapshot forwarders of one connection, aborted when it closes.
#[derive(Default)]
struct Subscriptions(HashMap<RoomId, JoinHandle<()>>);

impl Subscriptions {
    fn contains(&self, topic: &RoomId) -> bool {
        self.0.contains_key(topic)
    }

    fn insert(&mut self, topic: RoomId, forwarder: JoinHandle<()>) {
        if let Some(old) = self.0.insert(topic, forwarder) {
            old.abort();
        }
    }

    fn remove(&mut self, topic: &RoomId) -> bool {
        match self.0.remove(topic) {
            Some(forwarder) => {
                forwarder.abort();
                true
            }
            None => false,
        }
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for forwarder in self.0.values() {
            forwarder.abort();
        }
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), CardroomError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::debug!(%conn_id, peer = %conn.peer_addr(), "handling new connection");

    let _guard = PresenceGuard {
        conn_id,
        state: Arc::clone(&state),
    };
    let mut subscriptions = Subscriptions::default();
    let start = Instant::now();

    loop {
        let data = match tokio::time::timeout(
            state.config.idle_timeout,
            conn.recv(),
        )
        .await
        {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => {
                tracing::info!(%conn_id, "connection closed cleanly");
                break;
            }
            Ok(Err(e)) => {
                tracing::debug!(%conn_id, error = %e, "recv error");
                break;
            }
            Err(_) => {
                tracing::info!(%conn_id, "connection timed out");
                break;
            }
        };

        let frame: ClientFrame = match state.codec.decode(&data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%conn_id, error = %e, "failed to decode frame");
                continue;
            }
        };

        match frame {
            ClientFrame::Subscribe { topic } => {
                // Subscribe before acknowledging: nothing published after
                // the ack can be missed.
                let lease = (!subscriptions.contains(&topic)).then(|| {
                    TopicLease::acquire(Arc::clone(&state.publisher), topic.clone())
                });
                send_frame(&conn, &state.codec, &ServerFrame::Subscribed {
                    topic: topic.clone(),
                })
                .await?;
                if let Some(lease) = lease {
                    tracing::debug!(%conn_id, %topic, "subscribed");
                    let forwarder =
                        spawn_forwarder(Arc::clone(&conn), state.codec, lease);
                    subscriptions.insert(topic, forwarder);
                }
            }

            ClientFrame::Unsubscribe { topic } => {
                if subscriptions.remove(&topic) {
                    tracing::debug!(%conn_id, %topic, "unsubscribed");
                }
            }

            ClientFrame::Send { body } => {
                handle_inbound(&conn, &state, body).await?;
            }

            ClientFrame::Heartbeat { client_time } => {
                let ack = ServerFrame::HeartbeatAck {
                    client_time,
                    server_time: millis(start.elapsed()),
                };
                send_frame(&conn, &state.codec, &ack).await?;
            }

            ClientFrame::Disconnect { reason } => {
                tracing::info!(%conn_id, %reason, "client disconnected");
                break;
            }
        }
    }

    drop(subscriptions);
    if let Err(e) = conn.close().await {
        tracing::trace!(%conn_id, error = %e, "close after handler exit");
    }

    // _guard drops here → remaining presences start their grace period.
    Ok(())
}

/// Validates one inbound message and routes it to its room.
///
/// Invalid messages are dropped; nothing is sent back.
async fn handle_inbound(
    conn: &WebSocketConnection,
    state: &ServerState,
    mut body: InboundMessage,
) -> Result<(), CardroomError> {
    let conn_id = conn.id();

    let assigned = if body.needs_player_id() {
        let id = generate_participant_id();
        body.player_id = Some(id.0.clone());
        Some(id)
    } else {
        None
    };

    let kind = body.kind;
    let event = match body.into_event() {
        Ok(event) => event,
        Err(e) => {
            tracing::debug!(%conn_id, %kind, error = %e, "invalid message dropped");
            return Ok(());
        }
    };

    if let Some(participant_id) = assigned {
        tracing::debug!(%conn_id, %participant_id, "participant id assigned");
        send_frame(conn, &state.codec, &ServerFrame::Assigned {
            topic: event.room_id().clone(),
            participant_id,
        })
        .await?;
    }

    match &event {
        InboundEvent::Join {
            room_id,
            participant_id,
            ..
        } => {
            state.sessions.lock().await.attach(
                conn_id,
                room_id.clone(),
                participant_id.clone(),
            );
        }
        InboundEvent::Leave {
            room_id,
            participant_id,
        } => {
            let key = PresenceKey::new(room_id.clone(), participant_id.clone());
            if let Err(e) = state.sessions.lock().await.release(&key) {
                tracing::debug!(%conn_id, error = %e, "leave without presence");
            }
        }
        _ => {}
    }

    if let Err(e) = state.rooms.dispatch(event).await {
        tracing::debug!(%conn_id, error = %e, "event not routed");
    }
    Ok(())
}

/// Pushes every snapshot published on the lease's topic to `conn` until
/// the connection fails or the task is aborted.
fn spawn_forwarder(
    conn: Arc<WebSocketConnection>,
    codec: JsonCodec,
    mut lease: TopicLease,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let conn_id = conn.id();
        let topic = lease.topic.clone();
        loop {
            let snapshot = match lease.recv().await {
                Ok(snapshot) => snapshot,
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(
                        %conn_id,
                        %topic,
                        skipped,
                        "subscriber lagging, oldest snapshots dropped"
                    );
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let frame = ServerFrame::Message {
                topic: topic.clone(),
                body: snapshot,
            };
            if let Err(e) = send_frame(&conn, &codec, &frame).await {
                tracing::debug!(%conn_id, %topic, error = %e, "snapshot delivery failed");
                break;
            }
        }
    })
}

/// Encodes and sends one server frame.
async fn send_frame(
    conn: &WebSocketConnection,
    codec: &impl Codec,
    frame: &ServerFrame,
) -> Result<(), CardroomError> {
    let bytes = codec.encode(frame)?;
    conn.send(&bytes).await?;
    Ok(())
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
