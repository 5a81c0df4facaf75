//! WebSocket client driver for one participant in one room.

use std::collections::VecDeque;
use std::time::Duration;

use cardroom_protocol::{
    ClientFrame, Codec, InboundMessage, JsonCodec, ParticipantId, RoomId,
    ServerFrame, Snapshot,
};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::{ClientError, Reconciler, RoomView, TransitionTiming};

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Default spacing of automatic heartbeats, well inside the server's
/// 30 second idle timeout.
const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// A connected participant.
///
/// Subscribes to the room topic before joining, so the join's own
/// snapshot is the first one [`next_view`](Self::next_view) sees.
/// Snapshots are reconciled strictly in arrival order.
///
/// The server only counts frames it receives as activity, so while
/// waiting for a snapshot the client sends a heartbeat whenever it has
/// sent nothing for the heartbeat interval.
pub struct RoomClient {
    ws: Ws,
    codec: JsonCodec,
    room_id: RoomId,
    participant_id: ParticipantId,
    reconciler: Reconciler,
    /// Snapshots that arrived while waiting for another frame.
    pending: VecDeque<Snapshot>,
    timing: TransitionTiming,
    heartbeat_interval: Duration,
    started: Instant,
    last_sent: Instant,
    last_round_trip: Option<Duration>,
}

impl RoomClient {
    /// Connects to `url`, subscribes to `room_id` and joins it as `name`.
    ///
    /// With `participant_id: None` the server picks the id; this waits for
    /// its `ASSIGNED` answer before returning.
    pub async fn join(
        url: &str,
        room_id: RoomId,
        name: &str,
        participant_id: Option<ParticipantId>,
    ) -> Result<Self, ClientError> {
        let (mut ws, _) = connect_async(url).await?;
        let codec = JsonCodec;
        let mut pending = VecDeque::new();

        send_frame(&mut ws, &codec, &ClientFrame::Subscribe {
            topic: room_id.clone(),
        })
        .await?;

        let participant_id = match participant_id {
            Some(id) => {
                let join = InboundMessage::join(&room_id, &id, name);
                send_frame(&mut ws, &codec, &ClientFrame::Send { body: join })
                    .await?;
                id
            }
            None => {
                let join = InboundMessage::join_unassigned(&room_id, name);
                send_frame(&mut ws, &codec, &ClientFrame::Send { body: join })
                    .await?;
                loop {
                    match recv_frame(&mut ws, &codec).await? {
                        ServerFrame::Assigned {
                            topic,
                            participant_id,
                        } if topic == room_id => break participant_id,
                        ServerFrame::Message { topic, body } if topic == room_id => {
                            pending.push_back(body);
                        }
                        _ => {}
                    }
                }
            }
        };

        tracing::debug!(%room_id, %participant_id, "joined room");

        let now = Instant::now();
        Ok(Self {
            ws,
            codec,
            reconciler: Reconciler::new(Some(participant_id.clone())),
            room_id,
            participant_id,
            pending,
            timing: TransitionTiming::default(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            started: now,
            last_sent: now,
            last_round_trip: None,
        })
    }

    /// Replaces the transition timing used by
    /// [`next_settled_view`](Self::next_settled_view).
    pub fn with_timing(mut self, timing: TransitionTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Replaces the automatic heartbeat spacing (default 10 seconds).
    /// Keep it below the server's idle timeout.
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval.max(Duration::from_millis(1));
        self
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn participant_id(&self) -> &ParticipantId {
        &self.participant_id
    }

    /// Round trip of the most recently acknowledged heartbeat.
    pub fn last_round_trip(&self) -> Option<Duration> {
        self.last_round_trip
    }

    /// Plays `card`; an empty string withdraws the vote.
    pub async fn play_card(&mut self, card: &str) -> Result<(), ClientError> {
        let msg = InboundMessage::card_played(&self.room_id, &self.participant_id, card);
        self.send_message(msg).await
    }

    pub async fn reveal(&mut self) -> Result<(), ClientError> {
        let msg = InboundMessage::reveal(&self.room_id);
        self.send_message(msg).await
    }

    pub async fn reset(&mut self) -> Result<(), ClientError> {
        let msg = InboundMessage::reset(&self.room_id);
        self.send_message(msg).await
    }

    /// Keeps the connection alive. The server closes connections that stay
    /// silent past its idle timeout; waiting in
    /// [`next_snapshot`](Self::next_snapshot) already calls this on schedule.
    pub async fn heartbeat(&mut self) -> Result<(), ClientError> {
        let client_time = millis(self.started.elapsed());
        self.send_frame(&ClientFrame::Heartbeat { client_time }).await
    }

    /// Receives the next snapshot for this room and renders it.
    pub async fn next_view(&mut self) -> Result<RoomView, ClientError> {
        let snapshot = self.next_snapshot().await?;
        Ok(self.reconciler.observe(&snapshot))
    }

    /// Like [`next_view`](Self::next_view), but returns only once the
    /// view's transitions have had time to play.
    pub async fn next_settled_view(&mut self) -> Result<RoomView, ClientError> {
        let view = self.next_view().await?;
        let delay = self.timing.settle_delay(view.animated_count());
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(view)
    }

    /// Receives the next raw snapshot for this room, without reconciling.
    ///
    /// Sends heartbeats while waiting, so a participant can wait for
    /// the rest of the room indefinitely.
    pub async fn next_snapshot(&mut self) -> Result<Snapshot, ClientError> {
        if let Some(snapshot) = self.pending.pop_front() {
            return Ok(snapshot);
        }
        loop {
            let heartbeat_due = self.last_sent + self.heartbeat_interval;
            tokio::select! {
                frame = recv_frame(&mut self.ws, &self.codec) => match frame? {
                    ServerFrame::Message { topic, body } if topic == self.room_id => {
                        return Ok(body);
                    }
                    ServerFrame::HeartbeatAck { client_time, .. } => {
                        let now = millis(self.started.elapsed());
                        self.last_round_trip =
                            Some(Duration::from_millis(now.saturating_sub(client_time)));
                    }
                    other => {
                        tracing::trace!(?other, "frame skipped");
                    }
                },
                () = tokio::time::sleep_until(heartbeat_due) => {
                    tracing::trace!(room_id = %self.room_id, "idle, sending heartbeat");
                    self.heartbeat().await?;
                }
            }
        }
    }

    /// Sends an explicit `LEAVE`, then disconnects.
    pub async fn leave(mut self) -> Result<(), ClientError> {
        let msg = InboundMessage::leave(&self.room_id, &self.participant_id);
        self.send_message(msg).await?;
        self.send_frame(&ClientFrame::Disconnect {
            reason: "left room".to_string(),
        })
        .await?;
        // The server may already have closed its side after DISCONNECT.
        if let Err(e) = self.ws.close(None).await {
            tracing::debug!(error = %e, "close after leave");
        }
        Ok(())
    }

    async fn send_message(&mut self, body: InboundMessage) -> Result<(), ClientError> {
        self.send_frame(&ClientFrame::Send { body }).await
    }

    async fn send_frame(&mut self, frame: &ClientFrame) -> Result<(), ClientError> {
        send_frame(&mut self.ws, &self.codec, frame).await?;
        self.last_sent = Instant::now();
        Ok(())
    }
}

async fn send_frame(
    ws: &mut Ws,
    codec: &JsonCodec,
    frame: &ClientFrame,
) -> Result<(), ClientError> {
    let bytes = codec.encode(frame)?;
    let text = String::from_utf8(bytes).map_err(|e| {
        cardroom_protocol::ProtocolError::InvalidMessage(e.to_string())
    })?;
    ws.send(Message::text(text)).await?;
    Ok(())
}

async fn recv_frame(ws: &mut Ws, codec: &JsonCodec) -> Result<ServerFrame, ClientError> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return Ok(codec.decode(text.as_bytes())?);
            }
            Some(Ok(Message::Binary(data))) => return Ok(codec.decode(&data)?),
            Some(Ok(Message::Close(_))) | None => return Err(ClientError::Closed),
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
