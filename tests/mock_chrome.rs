//! Mock Chrome DevTools Protocol server
//!
//! Speaks just enough CDP over a real WebSocket to drive the connection,
//! client and page layers without a browser.

use std::sync::Arc;
use std::time::Duration;

use chaser_actions::cdp::{CdpClient, CdpClientImpl, CdpConnection, CdpWebSocketConnection, ScreenshotFormat};
use chaser_actions::locator::Locator;
use chaser_actions::session::{DialogKind, PageContext, PageContextImpl, SearchContext};
use chaser_actions::Error;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{accept_async, tungstenite::Message};

/// 1x1 transparent PNG
const PIXEL_PNG: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNk+M9QDwADhgGAWjR9awAAAABJRU5ErkJggg==";

/// Mock Chrome server
pub struct MockChromeServer {
    addr: String,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl MockChromeServer {
    /// Start a new mock Chrome server
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let ws_addr = format!("ws://{}/devtools/page/mock-target", addr);

        let (shutdown_tx, mut shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer_addr)) => {
                                tracing::info!("Mock Chrome: Connection from {}", peer_addr);
                                tokio::spawn(Self::handle_connection(stream));
                            }
                            Err(e) => {
                                tracing::error!("Mock Chrome: Accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = &mut shutdown_rx => break,
                }
            }
        });

        Ok(Self {
            addr: ws_addr,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    async fn handle_connection(stream: TcpStream) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws_stream) => ws_stream,
            Err(e) => {
                tracing::error!("Mock Chrome: WebSocket handshake error: {}", e);
                return;
            }
        };
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        while let Some(result) = ws_receiver.next().await {
            match result {
                Ok(Message::Text(text)) => {
                    let Ok(req) = serde_json::from_str::<Value>(&text) else { continue };
                    let (response, events) = Self::create_cdp_response(&req);

                    // Events follow the response, as Chrome orders them
                    for message in std::iter::once(response).chain(events) {
                        if ws_sender.send(Message::Text(message.to_string())).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(Message::Close(_)) | Err(_) => break,
                _ => {}
            }
        }
    }

    /// Registry envelope as `Runtime.evaluate` returns it by value
    fn envelope(id: i64, envelope: Value) -> Value {
        json!({
            "id": id,
            "result": { "result": { "type": "string", "value": envelope.to_string() } }
        })
    }

    fn evaluate(id: i64, expression: &str) -> Value {
        if expression.contains(r#"window.__chaser.find(...[[],null,"id","go"])"#) {
            Self::envelope(id, json!({ "ok": ["el-1"] }))
        } else if expression.contains(r#"window.__chaser.find(...[[],null,"css","[["])"#) {
            Self::envelope(id, json!({ "error": "selector", "message": "'[[' is not a valid selector" }))
        } else if expression.contains("window.__chaser.find(") {
            Self::envelope(id, json!({ "ok": [] }))
        } else {
            match expression {
                "document.readyState" => json!({ "id": id, "result": { "result": { "type": "string", "value": "complete" } } }),
                "document.title" => json!({ "id": id, "result": { "result": { "type": "string", "value": "Mock Chrome" } } }),
                "throw" => json!({
                    "id": id,
                    "result": {
                        "result": { "type": "object", "subtype": "error" },
                        "exceptionDetails": { "text": "Uncaught", "exception": { "description": "Error: boom" } }
                    }
                }),
                _ => json!({ "id": id, "result": { "result": { "type": "undefined" } } }),
            }
        }
    }

    /// Response for a request, plus the events it triggers
    fn create_cdp_response(req: &Value) -> (Value, Vec<Value>) {
        let method = req.get("method").and_then(|m| m.as_str()).unwrap_or("unknown");
        let id = req.get("id").and_then(|i| i.as_i64()).unwrap_or(0);
        let params = req.get("params").cloned().unwrap_or(Value::Null);

        match method {
            "Page.enable" | "Runtime.enable" => (json!({ "id": id, "result": {} }), vec![]),
            "Page.navigate" => {
                let url = params["url"].as_str().unwrap_or_default();
                let events = if url.contains("alert") {
                    vec![json!({
                        "method": "Page.javascriptDialogOpening",
                        "params": { "url": url, "message": "Saved", "type": "alert", "hasBrowserHandler": false }
                    })]
                } else {
                    vec![]
                };
                (json!({ "id": id, "result": { "frameId": "main", "loaderId": "loader-1" } }), events)
            }
            "Page.handleJavaScriptDialog" => (
                json!({ "id": id, "result": {} }),
                vec![json!({ "method": "Page.javascriptDialogClosed", "params": { "result": params["accept"], "userInput": "" } })],
            ),
            "Runtime.evaluate" => (Self::evaluate(id, params["expression"].as_str().unwrap_or_default()), vec![]),
            "Page.captureScreenshot" => (json!({ "id": id, "result": { "data": PIXEL_PNG } }), vec![]),
            _ => (
                json!({
                    "id": id,
                    "error": { "code": -32601, "message": format!("'{}' wasn't found", method) }
                }),
                vec![],
            ),
        }
    }

    /// Get the WebSocket endpoint URL
    pub fn ws_endpoint(&self) -> &str {
        &self.addr
    }
}

impl Drop for MockChromeServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn connect(server: &MockChromeServer) -> (Arc<CdpWebSocketConnection>, Arc<CdpClientImpl>) {
    let connection = CdpWebSocketConnection::new(server.ws_endpoint()).await.unwrap();
    let client = Arc::new(CdpClientImpl::new(connection.clone()));
    (connection, client)
}

#[tokio::test]
async fn test_mock_chrome_startup() {
    let server = MockChromeServer::start().await.unwrap();
    assert!(server.ws_endpoint().starts_with("ws://127.0.0.1:"));
}

#[tokio::test]
async fn test_commands_round_trip() {
    let server = MockChromeServer::start().await.unwrap();
    let (connection, client) = connect(&server).await;
    assert!(connection.is_active());

    client.enable_domain("Page").await.unwrap();

    let navigation = client.navigate("https://search.example/").await.unwrap();
    assert_eq!(navigation.navigation_id.as_deref(), Some("loader-1"));
    assert!(navigation.is_loaded);

    let png = client.screenshot(ScreenshotFormat::Png).await.unwrap();
    assert_eq!(&png[1..4], b"PNG");
}

#[tokio::test]
async fn test_protocol_errors_surface_as_cdp_errors() {
    let server = MockChromeServer::start().await.unwrap();
    let (_connection, client) = connect(&server).await;

    let unknown = client.call_method("Browser.teleport", json!({})).await;
    assert!(matches!(unknown, Err(Error::Cdp(message)) if message.contains("Browser.teleport")));

    let thrown = client.evaluate("throw", false).await;
    assert!(matches!(thrown, Err(Error::ScriptExecutionFailed(message)) if message == "Error: boom"));
}

#[tokio::test]
async fn test_closed_connection_rejects_commands() {
    let server = MockChromeServer::start().await.unwrap();
    let (connection, client) = connect(&server).await;

    connection.close().await.unwrap();
    assert!(!connection.is_active());

    let result = client.evaluate("document.title", false).await;
    assert!(matches!(result, Err(Error::WebSocket(_))));
}

#[tokio::test]
async fn test_page_finds_through_registry() {
    let server = MockChromeServer::start().await.unwrap();
    let (_connection, client) = connect(&server).await;
    let page = PageContextImpl::new("mock-target", client).await.unwrap();

    assert_eq!(page.title().await.unwrap(), "Mock Chrome");

    let button = page.find_element(&Locator::id("go")).await.unwrap();
    assert_eq!(button.id(), "el-1");
    assert_eq!(button.page_id(), "mock-target");

    let missing = page.find_element(&Locator::id("nope")).await;
    assert!(matches!(missing, Err(Error::ElementNotFound(_))));

    let invalid = page.find_elements(&Locator::css("[[")).await;
    assert!(matches!(invalid, Err(Error::InvalidSelector(_))));
}

#[tokio::test]
async fn test_page_tracks_dialog_events() {
    let server = MockChromeServer::start().await.unwrap();
    let (_connection, client) = connect(&server).await;
    let page = PageContextImpl::new("mock-target", client).await.unwrap();

    assert!(page.dialog().await.unwrap().is_none());
    assert!(matches!(page.handle_dialog(true, None).await, Err(Error::NoSuchAlert(_))));

    page.navigate("https://search.example/alert").await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let dialog = page.dialog().await.unwrap().expect("dialog should be open");
    assert_eq!(dialog.kind, DialogKind::Alert);
    assert_eq!(dialog.message, "Saved");

    page.handle_dialog(true, None).await.unwrap();
    assert!(page.dialog().await.unwrap().is_none());
}
