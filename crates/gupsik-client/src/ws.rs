//! WebSocket Connection Manager for Real-time Board Updates
//!
//! Owns the single live socket to the backend. The server pushes:
//!
//! - `{"type":"connection_count","count":N}` - clients currently connected
//! - `{"type":"reaction","school_code":"...","likes":N}` - new like total
//!
//! The client never sends application messages.
//!
//! # Reconnect Loop
//!
//! ```text
//!            connect()
//!               │
//!               ▼
//!  ┌──────▶ Connecting ──── ok ───▶ Open ── reset backoff, dispatch frames
//!  │            │                    │
//!  │          error                close / error
//!  │            ▼                    ▼
//!  └─ wait ◀── Disconnected ◀────────┘
//!   (backoff: 5s, 10s, 20s, 40s, 60s, 60s, ...)
//! ```
//!
//! The loop runs until [`ConnectionManager::shutdown`]; there is no retry
//! ceiling. Errors are logged and published on [`ConnectionManager::problems`]
//! but never end the loop.

use crate::error::{Error, Result};
use futures::StreamExt;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle of the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No socket; a reconnect may be pending
    Disconnected,
    /// Handshake in progress
    Connecting,
    /// Socket open and receiving
    Open,
}

/// Exponential reconnect delay.
#[derive(Debug, Clone)]
pub struct Backoff {
    floor: Duration,
    ceiling: Duration,
    current: Duration,
}

impl Backoff {
    /// Create a backoff starting at `floor`.
    pub fn new(floor: Duration, ceiling: Duration) -> Self {
        Self {
            floor,
            ceiling: ceiling.max(floor),
            current: floor,
        }
    }

    /// Delay the next reconnect will wait.
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Take the current delay and double it for next time, capped.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.ceiling);
        delay
    }

    /// Back to the floor after a successful open.
    pub fn reset(&mut self) {
        self.current = self.floor;
    }
}

/// Message pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Number of connected clients
    ConnectionCount { count: u64 },
    /// New like total of a school
    Reaction { school_code: String, likes: u32 },
}

impl ServerEvent {
    /// Kind used for subscription.
    pub fn kind(&self) -> EventKind {
        match self {
            ServerEvent::ConnectionCount { .. } => EventKind::ConnectionCount,
            ServerEvent::Reaction { .. } => EventKind::Reaction,
        }
    }
}

/// Recognized message types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ConnectionCount,
    Reaction,
}

impl EventKind {
    /// Map a wire `type` tag to a kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "connection_count" => Some(EventKind::ConnectionCount),
            "reaction" => Some(EventKind::Reaction),
            _ => None,
        }
    }
}

/// Handler invoked for each dispatched event.
pub type Handler = Box<dyn Fn(&ServerEvent) + Send + Sync>;

/// Dispatch table from message type to subscribers.
#[derive(Default)]
pub struct Dispatcher {
    handlers: RwLock<HashMap<EventKind, Vec<Handler>>>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one message type.
    pub fn subscribe(&self, kind: EventKind, handler: Handler) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(kind)
            .or_default()
            .push(handler);
    }

    /// Parse a text frame and invoke the subscribers of its type.
    ///
    /// Returns the kind dispatched, or `None` for an unrecognized type,
    /// which is logged and dropped. Unparseable frames are an
    /// [`Error::MalformedMessage`].
    pub fn dispatch(&self, text: &str) -> Result<Option<EventKind>> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| Error::MalformedMessage(format!("not JSON: {e}")))?;

        let tag = value
            .get("type")
            .and_then(|t| t.as_str())
            .map(str::to_owned)
            .ok_or_else(|| Error::MalformedMessage("missing type tag".into()))?;

        let Some(kind) = EventKind::from_tag(&tag) else {
            warn!(tag = %tag, "Unknown message type, dropping");
            return Ok(None);
        };

        let event: ServerEvent = serde_json::from_value(value)
            .map_err(|e| Error::MalformedMessage(format!("bad {tag} payload: {e}")))?;

        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(subscribers) = handlers.get(&kind) {
            for handler in subscribers {
                handler(&event);
            }
        }
        Ok(Some(kind))
    }
}

/// Observer of a connection's state.
#[derive(Clone)]
pub struct ConnectionHandle {
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionHandle {
    /// State right now.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Wait until the connection reaches `target`.
    pub async fn wait_for(&mut self, target: ConnectionState) {
        let _ = self.state.wait_for(|state| *state == target).await;
    }

    /// Wait for the next state change.
    pub async fn changed(&mut self) -> Option<ConnectionState> {
        self.state.changed().await.ok()?;
        Some(*self.state.borrow())
    }
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Owner of the live socket and its reconnect loop.
pub struct ConnectionManager {
    url: String,
    dispatcher: Arc<Dispatcher>,
    backoff: Mutex<Backoff>,
    state_tx: watch::Sender<ConnectionState>,
    problems: broadcast::Sender<String>,
    wake: Notify,
    shutdown: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Create a manager for `url`; nothing connects until [`connect`](Self::connect).
    pub fn new(url: impl Into<String>, dispatcher: Arc<Dispatcher>, backoff: Backoff) -> Arc<Self> {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (problems, _) = broadcast::channel(16);
        Arc::new(Self {
            url: url.into(),
            dispatcher,
            backoff: Mutex::new(backoff),
            state_tx,
            problems,
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
            task: Mutex::new(None),
        })
    }

    /// Endpoint this manager connects to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Dispatch table of inbound messages.
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Delay the next reconnect would wait.
    pub fn current_backoff(&self) -> Duration {
        self.lock_backoff().current()
    }

    /// Observe state changes.
    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            state: self.state_tx.subscribe(),
        }
    }

    /// Receive a message for every connect failure or dropped connection.
    pub fn problems(&self) -> broadcast::Receiver<String> {
        self.problems.subscribe()
    }

    /// Start the connection if none exists.
    ///
    /// Idempotent: while connecting or open, returns a handle to the
    /// existing connection. While waiting out a backoff, reconnects now.
    pub fn connect(self: &Arc<Self>) -> ConnectionHandle {
        if self.shutdown.is_cancelled() {
            warn!("Connection manager is shut down, not connecting");
            return self.handle();
        }

        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        let running = task.as_ref().is_some_and(|t| !t.is_finished());

        match (running, self.state()) {
            (true, ConnectionState::Connecting | ConnectionState::Open) => {
                debug!("WebSocket already open or connecting");
            }
            (true, ConnectionState::Disconnected) => {
                debug!("Cutting reconnect wait short");
                self.wake.notify_one();
            }
            (false, _) => {
                // Set before spawning so a second call sees the attempt
                self.set_state(ConnectionState::Connecting);
                let manager = Arc::clone(self);
                *task = Some(tokio::spawn(async move { manager.run().await }));
            }
        }

        self.handle()
    }

    /// Close the socket and stop reconnecting.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            let _ = task.await;
        }
        self.set_state(ConnectionState::Disconnected);
        info!("WebSocket connection manager stopped");
    }

    fn lock_backoff(&self) -> std::sync::MutexGuard<'_, Backoff> {
        self.backoff.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    fn report(&self, problem: String) {
        // No receivers is fine
        let _ = self.problems.send(problem);
    }

    async fn run(self: Arc<Self>) {
        loop {
            self.set_state(ConnectionState::Connecting);
            debug!(url = %self.url, "Connecting WebSocket");

            let attempt = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                attempt = connect_async(self.url.as_str()) => attempt,
            };

            match attempt {
                Ok((socket, _)) => {
                    self.lock_backoff().reset();
                    self.set_state(ConnectionState::Open);
                    info!("WebSocket connected");
                    self.read_until_closed(socket).await;
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    self.report(e.to_string());
                }
            }

            self.set_state(ConnectionState::Disconnected);
            if self.shutdown.is_cancelled() {
                break;
            }

            let delay = self.lock_backoff().next_delay();
            info!(?delay, "WebSocket closed, reconnecting");

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
                _ = self.wake.notified() => debug!("Reconnect requested"),
            }
        }

        self.set_state(ConnectionState::Disconnected);
    }

    async fn read_until_closed(&self, mut socket: Socket) {
        loop {
            let frame = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    if let Err(e) = socket.close(None).await {
                        debug!("Close handshake failed: {}", e);
                    }
                    return;
                }
                frame = socket.next() => frame,
            };

            match frame {
                Some(Ok(Message::Text(text))) => {
                    if let Err(e) = self.dispatcher.dispatch(&text) {
                        warn!("Dropping push message: {}", e);
                    }
                }
                Some(Ok(Message::Close(reason))) => {
                    info!(?reason, "WebSocket closed by server");
                    self.report("connection closed by server".to_string());
                    return;
                }
                Some(Ok(Message::Binary(_))) => {
                    warn!("Ignoring binary WebSocket frame");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!("WebSocket error: {}", e);
                    self.report(e.to_string());
                    return;
                }
                None => {
                    info!("WebSocket stream ended");
                    self.report("connection ended".to_string());
                    return;
                }
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
