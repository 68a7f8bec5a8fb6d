//! Websocket front end.
//!
//! Each connection gets an id and an outgoing channel. Incoming text frames
//! are parsed as [`ClientMessage`]s and fed to the shared [`Rooms`]; the
//! resulting deliveries are pushed onto the recipients' channels. A sweep
//! task closes expired grace windows.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use skirmish_protocol::room::{ClientMessage, PlayerId, RelayMessage};
use tokio::net::TcpListener;
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::config::RelayConfig;
use crate::error::Result;
use crate::rooms::{Delivery, Rooms};

/// State shared by every connection.
#[derive(Debug)]
pub struct RelayState {
    rooms: Mutex<Rooms>,
    outboxes: Mutex<HashMap<PlayerId, UnboundedSender<RelayMessage>>>,
    next_player: AtomicU64,
    started: Instant,
}

impl RelayState {
    /// Fresh relay state.
    #[must_use]
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            rooms: Mutex::new(Rooms::new(config.grace_ms)),
            outboxes: Mutex::new(HashMap::new()),
            next_player: AtomicU64::new(1),
            started: Instant::now(),
        }
    }

    fn now_ms(&self) -> u64 {
        u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn rooms(&self) -> MutexGuard<'_, Rooms> {
        self.rooms.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn outboxes(&self) -> MutexGuard<'_, HashMap<PlayerId, UnboundedSender<RelayMessage>>> {
        self.outboxes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, outbox: UnboundedSender<RelayMessage>) -> PlayerId {
        let player = self.next_player.fetch_add(1, Ordering::Relaxed);
        self.outboxes().insert(player, outbox);
        player
    }

    fn deliver(&self, deliveries: Vec<Delivery>) {
        let outboxes = self.outboxes();
        for (player, message) in deliveries {
            match outboxes.get(&player) {
                Some(outbox) => {
                    if outbox.send(message).is_err() {
                        tracing::debug!(player, "Connection closed before delivery");
                    }
                }
                None => tracing::debug!(player, "No connection for delivery"),
            }
        }
    }

    /// Parse and apply one text frame from `player`.
    pub fn on_text(&self, player: PlayerId, text: &str) {
        let now_ms = self.now_ms();
        let outcome = serde_json::from_str::<ClientMessage>(text)
            .map_err(crate::error::RelayError::from)
            .and_then(|message| self.rooms().handle(player, message, now_ms));
        match outcome {
            Ok(deliveries) => self.deliver(deliveries),
            Err(error) => {
                tracing::debug!(player, %error, "Request refused");
                self.deliver(vec![(
                    player,
                    RelayMessage::Error {
                        message: error.to_string(),
                    },
                )]);
            }
        }
    }

    /// Forget a connection and tell its room.
    pub fn on_close(&self, player: PlayerId) {
        self.outboxes().remove(&player);
        let deliveries = self.rooms().disconnect(player, self.now_ms());
        self.deliver(deliveries);
    }

    /// Close grace windows that have run out.
    pub fn sweep(&self) {
        let deliveries = self.rooms().expire(self.now_ms());
        self.deliver(deliveries);
    }
}

/// The relay's HTTP routes.
pub fn router(state: Arc<RelayState>) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

/// Run the relay on an already bound listener until the server stops.
///
/// # Errors
///
/// Returns the server's IO error.
pub async fn serve_on(listener: TcpListener, config: &RelayConfig) -> Result<()> {
    let state = Arc::new(RelayState::new(config));
    let sweeper = Arc::clone(&state);
    let sweep_every = Duration::from_millis(config.sweep_ms.max(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_every);
        loop {
            interval.tick().await;
            sweeper.sweep();
        }
    });

    if let Ok(address) = listener.local_addr() {
        tracing::info!(%address, grace_ms = config.grace_ms, "Relay listening");
    }
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Bind `config.bind` and run the relay.
///
/// # Errors
///
/// Returns bind or server errors.
pub async fn run(config: RelayConfig) -> Result<()> {
    let listener = TcpListener::bind(config.bind).await?;
    serve_on(listener, &config).await
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: Arc<RelayState>) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut inbox) = mpsc::unbounded_channel::<RelayMessage>();
    let player = state.register(outbox);
    state.deliver(vec![(player, RelayMessage::Identity { player_id: player })]);
    tracing::info!(player, "Client connected");

    let writer = tokio::spawn(async move {
        while let Some(message) = inbox.recv().await {
            let text = match serde_json::to_string(&message) {
                Ok(text) => text,
                Err(error) => {
                    tracing::warn!(player, %error, "Failed to encode relay message");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => state.on_text(player, text.as_str()),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(error) => {
                tracing::debug!(player, %error, "Websocket receive error");
                break;
            }
        }
    }

    state.on_close(player);
    writer.abort();
    tracing::info!(player, "Client disconnected");
}
