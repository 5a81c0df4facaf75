//! `CardroomServer` builder and server loop.
//!
//! This is the entry point for running a Cardroom server. It ties
//! together all the layers: transport → protocol → session → room.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use cardroom_protocol::{InboundEvent, JsonCodec};
use cardroom_room::{RoomConfig, RoomRegistry, TopicPublisher};
use cardroom_session::{SessionConfig, SessionManager};
use cardroom_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

use crate::handler::handle_connection;
use crate::{CardroomError, ServerConfig};

/// Shared server state passed to each connection handler task.
pub(crate) struct ServerState {
    pub(crate) sessions: Mutex<SessionManager>,
    pub(crate) rooms: RoomRegistry,
    pub(crate) publisher: Arc<TopicPublisher>,
    pub(crate) codec: JsonCodec,
    pub(crate) config: ServerConfig,
}

/// Builder for configuring and starting a Cardroom server.
///
/// # Example
///
/// ```rust,no_run
/// use cardroom::prelude::*;
///
/// # async fn start() -> Result<(), CardroomError> {
/// let server = CardroomServer::builder()
///     .bind("0.0.0.0:8080")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct CardroomServerBuilder {
    bind_addr: String,
    server_config: ServerConfig,
    room_config: RoomConfig,
    session_config: SessionConfig,
}

impl CardroomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            server_config: ServerConfig::default(),
            room_config: RoomConfig::default(),
            session_config: SessionConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets connection timeout and sweep timing.
    pub fn server_config(mut self, config: ServerConfig) -> Self {
        self.server_config = config;
        self
    }

    /// Sets the idle-room timeout and subscriber buffer size.
    pub fn room_config(mut self, config: RoomConfig) -> Self {
        self.room_config = config;
        self
    }

    /// Sets the reconnect grace period.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    /// Binds the listener and assembles the server. Nothing is accepted
    /// until [`CardroomServer::run`].
    pub async fn build(self) -> Result<CardroomServer, CardroomError> {
        let transport = WebSocketTransport::bind(&self.bind_addr).await?;

        let publisher = Arc::new(TopicPublisher::new(self.room_config.snapshot_buffer));
        let rooms = RoomRegistry::new(self.room_config, publisher.clone());

        let state = Arc::new(ServerState {
            sessions: Mutex::new(SessionManager::new(self.session_config)),
            rooms,
            publisher,
            codec: JsonCodec,
            config: self.server_config,
        });

        Ok(CardroomServer { transport, state })
    }
}

impl Default for CardroomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A Cardroom server, bound and ready to accept connections.
pub struct CardroomServer {
    transport: WebSocketTransport,
    state: Arc<ServerState>,
}

impl CardroomServer {
    /// Creates a new builder.
    pub fn builder() -> CardroomServerBuilder {
        CardroomServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The room registry, for diagnostics.
    pub fn rooms(&self) -> RoomRegistry {
        self.state.rooms.clone()
    }

    /// The snapshot publisher, for diagnostics.
    pub fn publisher(&self) -> Arc<TopicPublisher> {
        Arc::clone(&self.state.publisher)
    }

    /// Runs the server until the process is terminated.
    pub async fn run(self) -> Result<(), CardroomError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop and the presence sweep until `shutdown`
    /// completes, then stops every room.
    pub async fn run_until(
        mut self,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), CardroomError> {
        tracing::info!(addr = ?self.local_addr().ok(), "Cardroom server running");

        let sweeper = tokio::spawn(sweep_presences(Arc::clone(&self.state)));
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(
                                    error = %e,
                                    "connection ended with error"
                                );
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
                () = &mut shutdown => break,
            }
        }

        sweeper.abort();
        self.state.rooms.shutdown().await;
        tracing::info!("Cardroom server stopped");
        Ok(())
    }
}

/// Periodically turns presences whose grace period ran out into `LEAVE`
/// events.
///
/// The sessions lock is held while the leaves are dispatched, so a
/// re-join racing with the sweep is always routed after the leave.
async fn sweep_presences(state: Arc<ServerState>) {
    let period = state
        .config
        .presence_sweep_interval
        .max(Duration::from_millis(1));
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        let mut sessions = state.sessions.lock().await;
        let expired = sessions.expire_stale();
        for key in &expired {
            let event = InboundEvent::Leave {
                room_id: key.room_id.clone(),
                participant_id: key.participant_id.clone(),
            };
            if let Err(e) = state.rooms.dispatch(event).await {
                tracing::debug!(%key, error = %e, "expired presence had no room");
            }
        }
        sessions.cleanup_expired();
    }
}
