//! Mock CDP implementation for testing
//!
//! Scriptable stand-ins for the CDP traits: the client records every call,
//! answers `Runtime.evaluate` from a queue and can emit events to
//! subscribers; the browser keeps an in-memory target list.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::cdp::traits::*;
use crate::Error;

/// A minimal 1x1 PNG
pub const MOCK_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52, 0x00, 0x00,
    0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x02, 0x00, 0x00, 0x00, 0x90, 0x77, 0x53, 0xDE,
];

/// Mock CDP connection
#[derive(Debug)]
pub struct MockCdpConnection {
    is_active: AtomicBool,
    next_id: AtomicU64,
    responses: Mutex<HashMap<String, serde_json::Value>>,
}

impl MockCdpConnection {
    /// Create a new mock CDP connection
    pub fn new() -> Self {
        Self {
            is_active: AtomicBool::new(true),
            next_id: AtomicU64::new(1),
            responses: Mutex::new(HashMap::new()),
        }
    }

    /// Answer every `method` command with `result`
    pub async fn respond_with(&self, method: &str, result: serde_json::Value) {
        self.responses.lock().await.insert(method.to_string(), result);
    }
}

impl Default for MockCdpConnection {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpConnection for MockCdpConnection {
    async fn send_command(&self, method: &str, _params: serde_json::Value) -> Result<CdpResponse, Error> {
        if !self.is_active() {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let result = self
            .responses
            .lock()
            .await
            .get(method)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({}));

        Ok(CdpResponse {
            id,
            result: Some(result),
            error: None,
        })
    }

    async fn listen_events(&self) -> Result<mpsc::Receiver<CdpEvent>, Error> {
        let (_tx, rx) = mpsc::channel(1);
        Ok(rx)
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::Relaxed)
    }
}

/// A CDP call recorded by [`MockCdpClient`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: String,
    pub params: serde_json::Value,
}

/// Mock CDP client
#[derive(Debug)]
pub struct MockCdpClient {
    calls: Mutex<Vec<RecordedCall>>,
    evaluations: Mutex<VecDeque<Result<EvaluationResult, Error>>>,
    method_results: Mutex<HashMap<String, VecDeque<Result<serde_json::Value, Error>>>>,
    subscribers: Mutex<Vec<mpsc::Sender<CdpEvent>>>,
    url: Mutex<String>,
    closed: AtomicBool,
}

impl MockCdpClient {
    /// Create a new mock CDP client
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            evaluations: Mutex::new(VecDeque::new()),
            method_results: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
            url: Mutex::new("about:blank".to_string()),
            closed: AtomicBool::new(false),
        }
    }

    /// Queue the result of the next `evaluate` call
    pub async fn push_evaluation(&self, result: Result<EvaluationResult, Error>) {
        self.evaluations.lock().await.push_back(result);
    }

    /// Queue a string result; scripts that return JSON envelopes use this
    pub async fn push_json(&self, value: serde_json::Value) {
        self.push_evaluation(Ok(EvaluationResult::String(value.to_string()))).await;
    }

    /// Queue the result of the next `method` call
    pub async fn push_method_result(&self, method: &str, result: Result<serde_json::Value, Error>) {
        self.method_results
            .lock()
            .await
            .entry(method.to_string())
            .or_default()
            .push_back(result);
    }

    /// Deliver an event to every subscriber
    pub async fn emit(&self, method: &str, params: serde_json::Value) {
        let event = CdpEvent {
            method: method.to_string(),
            params,
            session_id: None,
        };
        let subscribers = self.subscribers.lock().await.clone();
        for subscriber in subscribers {
            let _ = subscriber.send(event.clone()).await;
        }
    }

    /// Every call made so far, in order
    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }

    /// Calls of one method, in order
    pub async fn calls_to(&self, method: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|call| call.method == method)
            .cloned()
            .collect()
    }

    /// Scripts passed to `evaluate`, in order
    pub async fn scripts(&self) -> Vec<String> {
        self.calls_to("Runtime.evaluate")
            .await
            .into_iter()
            .filter_map(|call| call.params.get("expression").and_then(|v| v.as_str()).map(str::to_string))
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    async fn record(&self, method: &str, params: serde_json::Value) -> Result<(), Error> {
        if self.is_closed() {
            return Err(Error::websocket("Connection is not active"));
        }
        self.calls.lock().await.push(RecordedCall {
            method: method.to_string(),
            params,
        });
        Ok(())
    }
}

impl Default for MockCdpClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpClient for MockCdpClient {
    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        self.record("Page.navigate", serde_json::json!({ "url": url })).await?;
        *self.url.lock().await = url.to_string();
        Ok(NavigationResult {
            navigation_id: Some(uuid::Uuid::new_v4().to_string()),
            url: url.to_string(),
            is_loaded: true,
        })
    }

    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        self.record(
            "Runtime.evaluate",
            serde_json::json!({ "expression": script, "awaitPromise": await_promise }),
        )
        .await?;

        if let Some(result) = self.evaluations.lock().await.pop_front() {
            return result;
        }

        // Unscripted fallbacks for the handful of page-level reads
        if script.contains("document.title") {
            Ok(EvaluationResult::String("Mock Page".to_string()))
        } else if script.contains("location.href") {
            Ok(EvaluationResult::String(self.url.lock().await.clone()))
        } else {
            Ok(EvaluationResult::Null)
        }
    }

    async fn screenshot(&self, _format: ScreenshotFormat) -> Result<Vec<u8>, Error> {
        self.record("Page.captureScreenshot", serde_json::json!({})).await?;
        Ok(MOCK_PNG.to_vec())
    }

    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        self.record(&format!("{}.enable", domain), serde_json::json!({})).await
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        self.record(method, params).await?;
        self.method_results
            .lock()
            .await
            .get_mut(method)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(serde_json::json!({})))
    }

    async fn subscribe_events(&self, _event_type: &str) -> Result<mpsc::Receiver<CdpEvent>, Error> {
        let (tx, rx) = mpsc::channel(100);
        self.subscribers.lock().await.push(tx);
        Ok(rx)
    }

    async fn close(&self) -> Result<(), Error> {
        self.closed.store(true, Ordering::Relaxed);
        self.subscribers.lock().await.clear();
        Ok(())
    }
}

/// Mock CDP browser
#[derive(Debug)]
pub struct MockCdpBrowser {
    is_active: AtomicBool,
    targets: Mutex<Vec<TargetInfo>>,
    clients: Mutex<HashMap<String, Arc<MockCdpClient>>>,
}

impl MockCdpBrowser {
    /// Create a mock browser with one blank page open
    pub fn new() -> Self {
        let initial = Self::target("about:blank");
        Self {
            is_active: AtomicBool::new(true),
            targets: Mutex::new(vec![initial]),
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn target(url: &str) -> TargetInfo {
        let target_id = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
        TargetInfo {
            web_socket_debugger_url: Some(format!("ws://mock/devtools/page/{}", target_id)),
            target_id,
            target_type: "page".to_string(),
            title: String::new(),
            url: url.to_string(),
        }
    }

    /// The client created for a target, if any
    pub async fn client_for(&self, target_id: &str) -> Option<Arc<MockCdpClient>> {
        let targets = self.targets.lock().await;
        let ws_url = targets
            .iter()
            .find(|t| t.target_id == target_id)?
            .web_socket_debugger_url
            .clone()?;
        self.clients.lock().await.get(&ws_url).cloned()
    }

    /// Rename a target, as a page would by changing `document.title`
    pub async fn set_title(&self, target_id: &str, title: &str) {
        if let Some(target) = self.targets.lock().await.iter_mut().find(|t| t.target_id == target_id) {
            target.title = title.to_string();
        }
    }

    fn ensure_active(&self) -> Result<(), Error> {
        if self.is_active.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(Error::cdp("Browser is closed"))
        }
    }
}

impl Default for MockCdpBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CdpBrowser for MockCdpBrowser {
    async fn create_client(&self, target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        self.ensure_active()?;
        let client = Arc::clone(
            self.clients
                .lock()
                .await
                .entry(target_url.to_string())
                .or_insert_with(|| Arc::new(MockCdpClient::new())),
        );
        Ok(client)
    }

    async fn close(&self) -> Result<(), Error> {
        self.is_active.store(false, Ordering::Relaxed);
        for client in self.clients.lock().await.values() {
            client.close().await?;
        }
        Ok(())
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        Ok(BrowserVersion {
            protocol_version: "1.3".to_string(),
            product: "Chrome/120.0.0.0".to_string(),
            user_agent: "Mock Chrome/120.0.0.0".to_string(),
            js_version: "12.0.0.0".to_string(),
        })
    }

    async fn get_targets(&self) -> Result<Vec<TargetInfo>, Error> {
        self.ensure_active()?;
        Ok(self.targets.lock().await.clone())
    }

    async fn create_target(&self, url: &str) -> Result<TargetInfo, Error> {
        self.ensure_active()?;
        let target = Self::target(url);
        self.targets.lock().await.push(target.clone());
        Ok(target)
    }

    async fn activate_target(&self, target_id: &str) -> Result<(), Error> {
        self.ensure_active()?;
        if self.targets.lock().await.iter().any(|t| t.target_id == target_id) {
            Ok(())
        } else {
            Err(Error::no_such_window(target_id))
        }
    }

    async fn close_target(&self, target_id: &str) -> Result<(), Error> {
        self.ensure_active()?;
        let mut targets = self.targets.lock().await;
        let position = targets
            .iter()
            .position(|t| t.target_id == target_id)
            .ok_or_else(|| Error::no_such_window(target_id))?;
        let target = targets.remove(position);
        if let Some(ws_url) = target.web_socket_debugger_url {
            if let Some(client) = self.clients.lock().await.remove(&ws_url) {
                client.close().await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_connection() {
        let conn = MockCdpConnection::new();
        conn.respond_with("Browser.getVersion", serde_json::json!({ "product": "Mock" }))
            .await;

        let response = conn
            .send_command("Browser.getVersion", serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(response.result.unwrap()["product"], "Mock");

        conn.close().await.unwrap();
        assert!(conn.send_command("Page.enable", serde_json::json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_mock_client_queues_evaluations() {
        let client = MockCdpClient::new();
        client.push_evaluation(Ok(EvaluationResult::Number(2.0))).await;

        assert_eq!(client.evaluate("1 + 1", false).await.unwrap(), EvaluationResult::Number(2.0));
        assert_eq!(client.evaluate("1 + 1", false).await.unwrap(), EvaluationResult::Null);
        assert_eq!(client.scripts().await, vec!["1 + 1", "1 + 1"]);
    }

    #[tokio::test]
    async fn test_mock_client_emits_events() {
        let client = MockCdpClient::new();
        let mut events = client.subscribe_events("*").await.unwrap();

        client
            .emit("Page.javascriptDialogOpening", serde_json::json!({ "message": "hi" }))
            .await;

        let event = events.recv().await.unwrap();
        assert_eq!(event.method, "Page.javascriptDialogOpening");
        assert_eq!(event.params["message"], "hi");
    }

    #[tokio::test]
    async fn test_mock_browser_targets() {
        let browser = MockCdpBrowser::new();
        assert_eq!(browser.get_targets().await.unwrap().len(), 1);

        let target = browser.create_target("https://example.com").await.unwrap();
        assert!(target.is_page());
        assert_eq!(browser.get_targets().await.unwrap().len(), 2);

        browser.close_target(&target.target_id).await.unwrap();
        assert_eq!(browser.get_targets().await.unwrap().len(), 1);
        assert!(matches!(
            browser.activate_target(&target.target_id).await,
            Err(Error::NoSuchWindow(_))
        ));
    }
}
