//! CDP browser control implementation
//!
//! This module provides browser-level operations over the DevTools HTTP
//! endpoints (`/json/version`, `/json`, `/json/new`, `/json/activate`,
//! `/json/close`).

use super::client::CdpClientImpl;
use super::connection::CdpWebSocketConnection;
use super::traits::*;
use crate::Error;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// CDP browser implementation
#[derive(Debug)]
pub struct CdpBrowserImpl {
    /// Browser endpoint (e.g., "http://localhost:9222" or "ws://localhost:9222")
    endpoint: String,
    /// Shared HTTP client for the DevTools JSON API
    http: reqwest::Client,
    /// Active connections (target_id -> connection)
    connections: Mutex<HashMap<String, Arc<dyn CdpConnection>>>,
}

impl CdpBrowserImpl {
    /// Create a new CDP browser controller
    ///
    /// # Arguments
    /// * `endpoint` - Browser DevTools endpoint (e.g., "http://localhost:9222")
    pub fn new<S: Into<String>>(endpoint: S) -> Self {
        let endpoint = endpoint.into();
        info!("Creating CDP browser controller for endpoint: {}", endpoint);
        Self {
            endpoint,
            http: reqwest::Client::new(),
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// HTTP base URL derived from the configured endpoint
    fn http_endpoint(&self) -> String {
        self.endpoint
            .replacen("ws://", "http://", 1)
            .replacen("wss://", "https://", 1)
            .trim_end_matches('/')
            .to_string()
    }

    /// `/json/new` takes the page URL as the raw query string
    fn new_target_url(&self, url: &str) -> String {
        format!("{}/json/new?{}", self.http_endpoint(), urlencoding::encode(url))
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, Error> {
        let url = format!("{}{}", self.http_endpoint(), path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::cdp(format!("Failed to reach browser at {}: {}", url, e)))?;

        response
            .json()
            .await
            .map_err(|e| Error::cdp(format!("Failed to parse response from {}: {}", url, e)))
    }

    async fn get_text(&self, path: &str) -> Result<String, Error> {
        let url = format!("{}{}", self.http_endpoint(), path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::cdp(format!("Failed to reach browser at {}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(Error::no_such_window(format!("{} returned {}", url, response.status())));
        }

        response
            .text()
            .await
            .map_err(|e| Error::cdp(format!("Failed to read response from {}: {}", url, e)))
    }

    pub(crate) fn parse_target(json: &serde_json::Value) -> Option<TargetInfo> {
        let field = |name: &str| json.get(name).and_then(|v| v.as_str());

        Some(TargetInfo {
            target_id: field("id")?.to_string(),
            target_type: field("type")?.to_string(),
            title: field("title").unwrap_or_default().to_string(),
            url: field("url").unwrap_or_default().to_string(),
            web_socket_debugger_url: field("webSocketDebuggerUrl").map(str::to_string),
        })
    }
}

#[async_trait]
impl CdpBrowser for CdpBrowserImpl {
    async fn create_client(&self, target_url: &str) -> Result<Arc<dyn CdpClient>, Error> {
        info!("Creating CDP client for target: {}", target_url);

        let connection = CdpWebSocketConnection::new(target_url).await?;

        let target_id = target_url.rsplit('/').next().unwrap_or(target_url).to_string();
        self.connections
            .lock()
            .await
            .insert(target_id, Arc::clone(&connection) as Arc<dyn CdpConnection>);

        let client = Arc::new(CdpClientImpl::new(connection));

        // Page for dialogs and screenshots, Runtime for evaluation
        client.enable_domain("Page").await?;
        client.enable_domain("Runtime").await?;

        Ok(client)
    }

    async fn close(&self) -> Result<(), Error> {
        let mut connections = self.connections.lock().await;
        info!("Closing {} CDP connection(s) to {}", connections.len(), self.endpoint);

        for (target_id, connection) in connections.drain() {
            if let Err(e) = connection.close().await {
                warn!("Failed to close connection to {}: {}", target_id, e);
            }
        }

        Ok(())
    }

    async fn get_version(&self) -> Result<BrowserVersion, Error> {
        let json = self.get_json("/json/version").await?;
        let field = |name: &str| {
            json.get(name)
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string()
        };

        Ok(BrowserVersion {
            protocol_version: field("Protocol-Version"),
            product: field("Browser"),
            user_agent: field("User-Agent"),
            js_version: field("V8-Version"),
        })
    }

    async fn get_targets(&self) -> Result<Vec<TargetInfo>, Error> {
        let json = self.get_json("/json").await?;
        let targets = json
            .as_array()
            .map(|items| items.iter().filter_map(Self::parse_target).collect())
            .unwrap_or_default();
        Ok(targets)
    }

    /// Uses the `/json/new` endpoint, which returns the new page's
    /// WebSocket URL directly.
    async fn create_target(&self, url: &str) -> Result<TargetInfo, Error> {
        info!("Creating new target with URL: {}", url);

        let new_url = self.new_target_url(url);
        let response = self
            .http
            .put(&new_url)
            .send()
            .await
            .map_err(|e| {
                Error::cdp(format!(
                    "Failed to reach Chrome DevTools at {} (start Chrome with --remote-debugging-port=9222): {}",
                    self.endpoint, e
                ))
            })?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| Error::cdp(format!("Failed to parse new target response: {}", e)))?;

        Self::parse_target(&json).ok_or_else(|| Error::cdp(format!("Malformed new target response: {}", json)))
    }

    async fn activate_target(&self, target_id: &str) -> Result<(), Error> {
        self.get_text(&format!("/json/activate/{}", target_id)).await.map(|_| ())
    }

    async fn close_target(&self, target_id: &str) -> Result<(), Error> {
        if let Some(connection) = self.connections.lock().await.remove(target_id) {
            let _ = connection.close().await;
        }
        self.get_text(&format!("/json/close/{}", target_id)).await.map(|_| ())
    }
}
