//! WebSocket Sync Server
//!
//! Async WebSocket endpoint for the room event stream. A client first sends
//! `Join` to bind its socket to a room subscription, then submits `Action`
//! messages; every event the room broadcasts flows back over the socket as
//! JSON, in FIFO order. Room and turn validation all happens in
//! [`RoomManager`] - this layer only moves messages.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, instrument, warn};

use crate::network::protocol::ClientMessage;
use crate::network::room::RoomManager;

/// Sync server configuration.
#[derive(Debug, Clone)]
pub struct SyncServerConfig {
    /// Bind address.
    pub bind_addr: SocketAddr,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for SyncServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8081".parse().expect("static addr"),
            max_connections: 1000,
        }
    }
}

/// Sync server errors.
#[derive(Debug, thiserror::Error)]
pub enum SyncServerError {
    /// Failed to bind to address.
    #[error("failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),
}

/// A connection's binding to one room's event stream.
struct RoomBinding {
    room_id: String,
    subscriber_id: u64,
    forward: JoinHandle<()>,
}

/// The WebSocket sync server.
pub struct SyncServer {
    config: SyncServerConfig,
    rooms: Arc<RoomManager>,
    connections: Arc<AtomicUsize>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SyncServer {
    /// Create a sync server over a shared room manager.
    pub fn new(config: SyncServerConfig, rooms: Arc<RoomManager>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            config,
            rooms,
            connections: Arc::new(AtomicUsize::new(0)),
            shutdown_tx,
        }
    }

    /// Bind and run until shutdown.
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<(), SyncServerError> {
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        info!("sync server listening on {}", self.config.bind_addr);
        self.run_with_listener(listener).await
    }

    /// Run the accept loop on an already-bound listener.
    pub async fn run_with_listener(&self, listener: TcpListener) -> Result<(), SyncServerError> {
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            if self.connections.load(Ordering::Relaxed) >= self.config.max_connections {
                                warn!("connection limit reached, rejecting {}", addr);
                                continue;
                            }
                            debug!("new connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("sync server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Signal the accept loop and all connections to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Active connection count.
    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::Relaxed)
    }

    /// Handle a new WebSocket connection on its own task.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let rooms = self.rooms.clone();
        let connections = self.connections.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        connections.fetch_add(1, Ordering::Relaxed);

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("websocket handshake failed for {}: {}", addr, e);
                    connections.fetch_sub(1, Ordering::Relaxed);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (out_tx, mut out_rx) = mpsc::channel::<Message>(64);

            // Outgoing writer task: everything this connection sends funnels
            // through one channel so subscription forwarding and pongs
            // cannot interleave mid-frame.
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = out_rx.recv().await {
                    if ws_sender.send(msg).await.is_err() {
                        break;
                    }
                }
            });

            let mut binding: Option<RoomBinding> = None;

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                match ClientMessage::from_json(&text) {
                                    Ok(msg) => {
                                        Self::handle_client_message(
                                            addr,
                                            msg,
                                            &rooms,
                                            &out_tx,
                                            &mut binding,
                                        ).await;
                                    }
                                    Err(e) => {
                                        debug!("invalid message from {}: {}", addr, e);
                                    }
                                }
                            }
                            Some(Ok(Message::Ping(data))) => {
                                let _ = out_tx.send(Message::Pong(data)).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                debug!("websocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            // Cleanup
            sender_task.abort();
            if let Some(binding) = binding.take() {
                binding.forward.abort();
                rooms.unsubscribe(&binding.room_id, binding.subscriber_id).await;
            }
            connections.fetch_sub(1, Ordering::Relaxed);
            debug!("client {} cleaned up", addr);
        });
    }

    /// Handle one decoded client message.
    async fn handle_client_message(
        addr: SocketAddr,
        msg: ClientMessage,
        rooms: &Arc<RoomManager>,
        out_tx: &mpsc::Sender<Message>,
        binding: &mut Option<RoomBinding>,
    ) {
        match msg {
            ClientMessage::Join { room_id, player_id } => {
                // Rebinding replaces the previous subscription
                if let Some(old) = binding.take() {
                    old.forward.abort();
                    rooms.unsubscribe(&old.room_id, old.subscriber_id).await;
                }

                match rooms.subscribe(&room_id).await {
                    Ok(mut subscription) => {
                        let subscriber_id = subscription.id();
                        let tx = out_tx.clone();
                        let forward = tokio::spawn(async move {
                            while let Some(event) = subscription.recv().await {
                                match event.to_json() {
                                    Ok(text) => {
                                        if tx.send(Message::Text(text)).await.is_err() {
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        error!("failed to serialize event: {}", e);
                                    }
                                }
                            }
                        });

                        debug!(room = %room_id, player = %player_id, "socket {} bound to room", addr);
                        *binding = Some(RoomBinding { room_id, subscriber_id, forward });
                    }
                    Err(e) => {
                        debug!(room = %room_id, "join from {} rejected: {}", addr, e);
                    }
                }
            }

            ClientMessage::Action { player_id, action, x, y, client_ts } => {
                let Some(bound) = binding.as_ref() else {
                    debug!("action from unbound socket {} dropped", addr);
                    return;
                };
                // Seat and turn validation happens in the room; a rejected
                // move is a silent no-op by design of the protocol.
                if let Err(e) = rooms
                    .submit_player_action(&bound.room_id, &player_id, action, x, y, client_ts)
                    .await
                {
                    debug!(room = %bound.room_id, "action dropped: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::protocol::{ActionKind, Seat, ServerMessage};
    use crate::network::room::RoomConfig;
    use tokio_tungstenite::connect_async;

    fn test_server() -> (Arc<SyncServer>, Arc<RoomManager>) {
        let rooms = Arc::new(RoomManager::new(RoomConfig::default()));
        let server = Arc::new(SyncServer::new(SyncServerConfig::default(), rooms.clone()));
        (server, rooms)
    }

    #[tokio::test]
    async fn test_server_starts_idle() {
        let (server, _rooms) = test_server();
        assert_eq!(server.connection_count(), 0);
        server.shutdown(); // no listeners yet; must not panic
    }

    #[tokio::test]
    async fn test_join_binds_and_streams_room_events() {
        let (server, rooms) = test_server();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let run_server = server.clone();
        let server_task =
            tokio::spawn(async move { run_server.run_with_listener(listener).await });

        let created = rooms.create_room().await.unwrap();
        let joined = rooms.join_room(&created.room_id).await.unwrap();

        let (mut socket, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        let join = ClientMessage::Join {
            room_id: created.room_id.clone(),
            player_id: joined.player_id.clone(),
        };
        socket.send(Message::Text(join.to_json().unwrap())).await.unwrap();

        // Wait for the subscription to land before triggering events
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // Second join starts the match: the socket sees Joined then Start
        rooms.join_room(&created.room_id).await.unwrap();

        let first = socket.next().await.unwrap().unwrap();
        let first = ServerMessage::from_json(first.to_text().unwrap()).unwrap();
        assert!(matches!(first, ServerMessage::Joined { you: Seat::B, .. }));

        let second = socket.next().await.unwrap().unwrap();
        let second = ServerMessage::from_json(second.to_text().unwrap()).unwrap();
        assert!(matches!(second, ServerMessage::Start { seed } if seed == created.seed));

        // An action submitted over the socket comes back as a relay
        let action = ClientMessage::Action {
            player_id: joined.player_id.clone(),
            action: ActionKind::Flag,
            x: 0,
            y: 0,
            client_ts: 5,
        };
        socket.send(Message::Text(action.to_json().unwrap())).await.unwrap();

        let relay = socket.next().await.unwrap().unwrap();
        let relay = ServerMessage::from_json(relay.to_text().unwrap()).unwrap();
        assert!(matches!(
            relay,
            ServerMessage::Action { action: ActionKind::Flag, x: 0, y: 0, client_ts: 5, .. }
        ));

        let state = socket.next().await.unwrap().unwrap();
        let state = ServerMessage::from_json(state.to_text().unwrap()).unwrap();
        assert!(matches!(state, ServerMessage::State { current_seat: Seat::B, .. }));

        server.shutdown();
        let _ = server_task.await;
    }

    #[tokio::test]
    async fn test_action_without_join_is_dropped() {
        let (server, rooms) = test_server();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let run_server = server.clone();
        let server_task =
            tokio::spawn(async move { run_server.run_with_listener(listener).await });

        let created = rooms.create_room().await.unwrap();
        rooms.join_room(&created.room_id).await.unwrap();
        rooms.join_room(&created.room_id).await.unwrap();

        let (mut socket, _) = connect_async(format!("ws://{addr}")).await.unwrap();
        let action = ClientMessage::Action {
            player_id: "nobody".to_string(),
            action: ActionKind::Flag,
            x: 0,
            y: 0,
            client_ts: 0,
        };
        socket.send(Message::Text(action.to_json().unwrap())).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        // Room state untouched
        let status = rooms.room_status(&created.room_id).await.unwrap();
        assert_eq!(status.current_seat, Some(Seat::A));

        server.shutdown();
        let _ = server_task.await;
    }
}
