//! Seams of the CDP layer: a raw connection, a typed client on top of it,
//! and the browser endpoint that hands out clients per target.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Notification pushed by the browser, e.g. `Page.javascriptDialogOpening`
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

/// Answer to one command, matched by `id`
#[derive(Debug, Clone)]
pub struct CdpResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<CdpError>,
}

/// Protocol-level error carried in a response
#[derive(Debug, Clone)]
pub struct CdpError {
    pub code: i32,
    pub message: String,
    pub data: Option<Value>,
}

/// Transport to one DevTools target
#[async_trait]
pub trait CdpConnection: Send + Sync + std::fmt::Debug {
    /// Send a command and wait for its response; protocol errors become `Err`
    async fn send_command(&self, method: &str, params: Value) -> Result<CdpResponse, crate::Error>;

    /// Receive every event from now on
    async fn listen_events(&self) -> Result<tokio::sync::mpsc::Receiver<CdpEvent>, crate::Error>;

    async fn close(&self) -> Result<(), crate::Error>;

    /// False once closed or once the reader task has stopped
    fn is_active(&self) -> bool;
}

/// Typed commands the session layer needs
#[async_trait]
pub trait CdpClient: Send + Sync + std::fmt::Debug {
    /// Navigate to a URL and wait for the document to finish loading
    async fn navigate(&self, url: &str) -> Result<NavigationResult, crate::Error>;

    /// `Runtime.evaluate` by value; a thrown exception becomes
    /// `Error::ScriptExecutionFailed`
    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, crate::Error>;

    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>, crate::Error>;

    async fn enable_domain(&self, domain: &str) -> Result<(), crate::Error>;

    /// Any other method, returning its raw `result`
    async fn call_method(&self, method: &str, params: Value) -> Result<Value, crate::Error>;

    /// Subscribe to events; `"*"` receives every event
    async fn subscribe_events(&self, event_type: &str) -> Result<tokio::sync::mpsc::Receiver<CdpEvent>, crate::Error>;

    /// Close the underlying connection
    async fn close(&self) -> Result<(), crate::Error>;
}

#[derive(Debug, Clone)]
pub struct NavigationResult {
    /// Loader id of the new document
    pub navigation_id: Option<String>,
    pub url: String,
    /// Whether document.readyState reached "complete"
    pub is_loaded: bool,
}

/// Value returned by a script; `undefined` maps to `Null`
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    /// Objects and arrays, as JSON
    Object(Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScreenshotFormat {
    Png,
    /// Quality 0-100
    Jpeg(u8),
}

/// Browser-level operations over the DevTools HTTP endpoint
#[async_trait]
pub trait CdpBrowser: Send + Sync + std::fmt::Debug {
    /// Connect a client to a target's WebSocket URL
    async fn create_client(&self, target_url: &str) -> Result<Arc<dyn CdpClient>, crate::Error>;

    /// Close every client connection opened through this browser
    async fn close(&self) -> Result<(), crate::Error>;

    /// `/json/version`
    async fn get_version(&self) -> Result<BrowserVersion, crate::Error>;

    /// `/json/list`: pages, iframes, workers
    async fn get_targets(&self) -> Result<Vec<TargetInfo>, crate::Error>;

    /// Open a new page target and return its description
    async fn create_target(&self, url: &str) -> Result<TargetInfo, crate::Error>;

    /// Bring a target to the foreground
    async fn activate_target(&self, target_id: &str) -> Result<(), crate::Error>;

    /// Close a target
    async fn close_target(&self, target_id: &str) -> Result<(), crate::Error>;
}

#[derive(Debug, Clone)]
pub struct BrowserVersion {
    pub protocol_version: String,
    /// e.g. `Chrome/120.0.6099.109`
    pub product: String,
    pub user_agent: String,
    pub js_version: String,
}

/// Entry of the DevTools target list
#[derive(Debug, Clone)]
pub struct TargetInfo {
    pub target_id: String,
    /// `page`, `iframe`, `service_worker`, ...
    pub target_type: String,
    pub title: String,
    pub url: String,
    /// WebSocket URL to attach a client to
    pub web_socket_debugger_url: Option<String>,
}

impl TargetInfo {
    /// Whether this target is a top-level page (a "window")
    pub fn is_page(&self) -> bool {
        self.target_type == "page"
    }
}
