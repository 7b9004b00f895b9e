//! CDP WebSocket connection implementation
//!
//! This module provides WebSocket-based connection to Chrome DevTools Protocol.

use super::traits::{CdpConnection, CdpError as CdpErrorResponse, CdpEvent, CdpResponse};
use super::types::*;
use crate::Error;
use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type PendingMap = Arc<Mutex<HashMap<u64, PendingCommand>>>;
type Subscribers = Arc<Mutex<Vec<mpsc::UnboundedSender<CdpEvent>>>>;

/// CDP timeout configuration
#[derive(Debug, Clone)]
pub struct CdpTimeoutConfig {
    /// Default timeout for most commands
    pub default_timeout: Duration,
    /// Timeout for screenshot commands
    pub screenshot_timeout: Duration,
    /// Timeout for page navigation commands
    pub navigation_timeout: Duration,
    /// Timeout for JavaScript execution
    pub execution_timeout: Duration,
}

impl Default for CdpTimeoutConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(30),
            screenshot_timeout: Duration::from_secs(90),
            navigation_timeout: Duration::from_secs(60),
            execution_timeout: Duration::from_secs(30),
        }
    }
}

impl CdpTimeoutConfig {
    /// Get timeout duration for a specific command method
    pub fn timeout_for(&self, method: &str) -> Duration {
        match method {
            "Page.captureScreenshot" => self.screenshot_timeout,
            "Page.navigate" | "Page.reload" => self.navigation_timeout,
            "Runtime.evaluate" | "Runtime.callFunctionOn" => self.execution_timeout,
            _ => self.default_timeout,
        }
    }
}

/// Pending command response
#[derive(Debug)]
struct PendingCommand {
    /// Response channel sender
    sender: oneshot::Sender<CdpResponse>,
    /// Command method (for logging)
    method: String,
}

/// CDP WebSocket connection implementation
///
/// Writes go through the sink half behind a mutex; a single reader task owns
/// the stream half and routes responses to their waiters and events to
/// subscribers.
#[derive(Debug)]
pub struct CdpWebSocketConnection {
    /// WebSocket URL
    url: String,
    /// Write half of the socket
    sink: Mutex<WsSink>,
    /// Next command ID
    next_id: AtomicU64,
    /// Pending commands (ID -> response sender)
    pending_commands: PendingMap,
    /// Event subscribers
    event_subscribers: Subscribers,
    /// Cleared when the socket closes or errors
    is_active: Arc<AtomicBool>,
    /// Timeout configuration
    timeout_config: CdpTimeoutConfig,
}

impl CdpWebSocketConnection {
    /// Connect to a CDP WebSocket endpoint
    ///
    /// # Arguments
    /// * `url` - WebSocket URL (e.g., "ws://localhost:9222/devtools/page/ABC123")
    pub async fn new<S: Into<String>>(url: S) -> Result<Arc<Self>, Error> {
        Self::with_timeouts(url, CdpTimeoutConfig::default()).await
    }

    /// Connect with explicit per-method timeouts
    pub async fn with_timeouts<S: Into<String>>(
        url: S,
        timeout_config: CdpTimeoutConfig,
    ) -> Result<Arc<Self>, Error> {
        let url = url.into();
        info!("Connecting to CDP WebSocket: {}", url);

        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| Error::websocket(format!("Failed to connect to {}: {}", url, e)))?;
        let (sink, stream) = ws_stream.split();

        let connection = Arc::new(Self {
            url,
            sink: Mutex::new(sink),
            next_id: AtomicU64::new(1),
            pending_commands: Arc::new(Mutex::new(HashMap::new())),
            event_subscribers: Arc::new(Mutex::new(Vec::new())),
            is_active: Arc::new(AtomicBool::new(true)),
            timeout_config,
        });

        let pending_commands = Arc::clone(&connection.pending_commands);
        let event_subscribers = Arc::clone(&connection.event_subscribers);
        let is_active = Arc::clone(&connection.is_active);
        tokio::spawn(async move {
            Self::message_loop(stream, &pending_commands, &event_subscribers).await;
            is_active.store(false, Ordering::SeqCst);
            // Dropping the senders wakes every waiter with a closed channel.
            pending_commands.lock().await.clear();
            debug!("CDP message loop exited");
        });

        info!("CDP WebSocket connection established");
        Ok(connection)
    }

    /// The endpoint this connection talks to
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn message_loop(
        mut stream: SplitStream<WsStream>,
        pending_commands: &PendingMap,
        event_subscribers: &Subscribers,
    ) {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    Self::handle_message(&text, pending_commands, event_subscribers).await;
                }
                Ok(Message::Close(_)) => {
                    info!("WebSocket close frame received");
                    break;
                }
                // tungstenite answers pings on the next write
                Ok(_) => {}
                Err(e) => {
                    warn!("WebSocket read failed: {}", e);
                    break;
                }
            }
        }
    }

    async fn handle_message(text: &str, pending_commands: &PendingMap, event_subscribers: &Subscribers) {
        // Responses carry an id; events carry only a method
        if let Ok(response) = serde_json::from_str::<CdpRpcResponse>(text) {
            Self::handle_response(response, pending_commands).await;
        } else if let Ok(notification) = serde_json::from_str::<CdpNotification>(text) {
            Self::handle_notification(notification, event_subscribers).await;
        } else {
            warn!("Unknown message format: {}", text);
        }
    }

    async fn handle_response(response: CdpRpcResponse, pending_commands: &PendingMap) {
        let Some(pending_cmd) = pending_commands.lock().await.remove(&response.id) else {
            warn!("Received response for unknown command ID: {}", response.id);
            return;
        };

        debug!("Received response for command {}: {}", response.id, pending_cmd.method);

        let cdp_response = CdpResponse {
            id: response.id,
            result: Some(response.result),
            error: response.error.map(|e| CdpErrorResponse {
                code: e.code,
                message: e.message,
                data: e.data,
            }),
        };

        let _ = pending_cmd.sender.send(cdp_response);
    }

    async fn handle_notification(notification: CdpNotification, event_subscribers: &Subscribers) {
        debug!("Received event: {}", notification.method);

        let event = CdpEvent {
            method: notification.method,
            params: notification.params,
            session_id: notification.session_id,
        };

        event_subscribers
            .lock()
            .await
            .retain(|sender| sender.send(event.clone()).is_ok());
    }
}

#[async_trait]
impl CdpConnection for CdpWebSocketConnection {
    async fn send_command(&self, method: &str, params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active() {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: (!params.is_null()).then_some(params),
        };
        let json = serde_json::to_string(&request)?;

        debug!("Sending CDP command {}: {}", id, method);

        let (sender, receiver) = oneshot::channel();
        self.pending_commands.lock().await.insert(
            id,
            PendingCommand {
                sender,
                method: method.to_string(),
            },
        );

        if let Err(e) = self.sink.lock().await.send(Message::Text(json)).await {
            self.pending_commands.lock().await.remove(&id);
            return Err(Error::websocket(format!("Failed to send {}: {}", method, e)));
        }

        let timeout_duration = self.timeout_config.timeout_for(method);
        match tokio::time::timeout(timeout_duration, receiver).await {
            Ok(Ok(response)) => {
                if let Some(error) = &response.error {
                    return Err(Error::cdp(format!(
                        "{}: {} (code: {})",
                        method, error.message, error.code
                    )));
                }
                Ok(response)
            }
            Ok(Err(_)) => Err(Error::websocket(format!(
                "Connection closed before {} ({}) was answered",
                method, id
            ))),
            Err(_) => {
                self.pending_commands.lock().await.remove(&id);
                error!("CDP command {} ({}) timed out after {:?}", method, id, timeout_duration);
                Err(Error::timeout(format!("CDP command {} timed out", method)))
            }
        }
    }

    async fn listen_events(&self) -> Result<mpsc::Receiver<CdpEvent>, Error> {
        let (sender, receiver) = mpsc::channel(100);
        let (unbounded_sender, mut unbounded_receiver) = mpsc::unbounded_channel();

        self.event_subscribers.lock().await.push(unbounded_sender);

        // Forward events to bounded channel
        tokio::spawn(async move {
            while let Some(event) = unbounded_receiver.recv().await {
                if sender.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(receiver)
    }

    async fn close(&self) -> Result<(), Error> {
        info!("Closing CDP WebSocket connection to {}", self.url);

        if self.is_active.swap(false, Ordering::SeqCst) {
            self.sink
                .lock()
                .await
                .close()
                .await
                .map_err(|e| Error::websocket(format!("Failed to close WebSocket: {}", e)))?;
        }

        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
