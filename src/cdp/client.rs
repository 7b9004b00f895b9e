//! CDP client implementation
//!
//! This module provides a high-level CDP client with typed methods for the
//! operations the session layer drives.

use super::traits::*;
use super::types::*;
use crate::Error;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use std::sync::Arc;
use tokio::time::Duration;
use tracing::{debug, info};

/// How often, and how many times, navigation polls `document.readyState`
const LOAD_POLL_INTERVAL: Duration = Duration::from_millis(100);
const LOAD_POLL_ATTEMPTS: u32 = 50;

/// CDP client implementation
#[derive(Debug, Clone)]
pub struct CdpClientImpl {
    /// Underlying CDP connection
    connection: Arc<dyn CdpConnection>,
}

impl CdpClientImpl {
    /// Create a new CDP client
    ///
    /// # Arguments
    /// * `connection` - CDP connection instance
    pub fn new(connection: Arc<dyn CdpConnection>) -> Self {
        Self { connection }
    }

    /// Parse remote object value to evaluation result
    pub(crate) fn parse_remote_object(obj: &RemoteObject) -> EvaluationResult {
        match obj.r#type.as_str() {
            "string" => EvaluationResult::String(
                obj.value
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
            ),
            "number" => EvaluationResult::Number(obj.value.as_ref().and_then(|v| v.as_f64()).unwrap_or(0.0)),
            "boolean" => EvaluationResult::Bool(obj.value.as_ref().and_then(|v| v.as_bool()).unwrap_or(false)),
            "object" if obj.subtype.as_deref() == Some("null") => EvaluationResult::Null,
            "object" | "function" | "bigint" | "symbol" => {
                EvaluationResult::Object(obj.value.clone().unwrap_or(serde_json::Value::Null))
            }
            _ => EvaluationResult::Null,
        }
    }

    async fn wait_for_load(&self) -> bool {
        for attempt in 1..=LOAD_POLL_ATTEMPTS {
            tokio::time::sleep(LOAD_POLL_INTERVAL).await;

            match self.evaluate("document.readyState", false).await {
                Ok(EvaluationResult::String(state)) if state == "complete" => {
                    debug!("Page loaded on attempt {}", attempt);
                    return true;
                }
                Ok(state) => debug!("Document ready state on attempt {}: {:?}", attempt, state),
                // The old execution context may be gone mid-navigation
                Err(e) => debug!("Ready state check {} failed: {}", attempt, e),
            }
        }
        false
    }
}

#[async_trait]
impl CdpClient for CdpClientImpl {
    async fn navigate(&self, url: &str) -> Result<NavigationResult, Error> {
        info!("Navigating to {}", url);

        let params = NavigateParams { url: url.to_string() };
        let result = self.call_method("Page.navigate", serde_json::to_value(params)?).await?;

        if let Some(error_text) = result.get("errorText").and_then(|v| v.as_str()) {
            return Err(Error::cdp(format!("Navigation to {} failed: {}", url, error_text)));
        }

        let is_loaded = self.wait_for_load().await;
        if !is_loaded {
            info!("Page load polling timed out for {}, continuing", url);
        }

        Ok(NavigationResult {
            navigation_id: result
                .get("loaderId")
                .and_then(|v| v.as_str())
                .map(str::to_string),
            url: url.to_string(),
            is_loaded,
        })
    }

    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult, Error> {
        let params = EvaluateParams {
            expression: script.to_string(),
            await_promise: Some(await_promise),
            return_by_value: Some(true),
            user_gesture: Some(true),
        };

        let result = self.call_method("Runtime.evaluate", serde_json::to_value(params)?).await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let description = exception
                .get("exception")
                .and_then(|e| e.get("description"))
                .or_else(|| exception.get("text"))
                .and_then(|d| d.as_str())
                .unwrap_or("Unknown error");
            return Err(Error::script_execution_failed(description));
        }

        let response: EvaluateResponse = serde_json::from_value(result)?;
        Ok(Self::parse_remote_object(&response.result))
    }

    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>, Error> {
        debug!("Capturing screenshot");

        let params = match format {
            ScreenshotFormat::Png => serde_json::json!({ "format": "png" }),
            ScreenshotFormat::Jpeg(quality) => serde_json::json!({ "format": "jpeg", "quality": quality }),
        };

        let result = self.call_method("Page.captureScreenshot", params).await?;
        let data = result
            .get("data")
            .and_then(|v| v.as_str())
            .ok_or_else(|| Error::cdp("No data in screenshot result"))?;

        BASE64
            .decode(data)
            .map_err(|e| Error::cdp(format!("Failed to decode screenshot: {}", e)))
    }

    async fn enable_domain(&self, domain: &str) -> Result<(), Error> {
        debug!("Enabling domain: {}", domain);
        self.call_method(&format!("{}.enable", domain), serde_json::json!({}))
            .await
            .map(|_| ())
    }

    async fn call_method(&self, method: &str, params: serde_json::Value) -> Result<serde_json::Value, Error> {
        let response = self.connection.send_command(method, params).await?;
        response.result.ok_or_else(|| Error::cdp(format!("No result in {} response", method)))
    }

    async fn subscribe_events(&self, event_type: &str) -> Result<tokio::sync::mpsc::Receiver<CdpEvent>, Error> {
        debug!("Subscribing to events: {}", event_type);

        let mut event_receiver = self.connection.listen_events().await?;
        let (tx, rx) = tokio::sync::mpsc::channel(100);
        let filter_event_type = event_type.to_string();

        tokio::spawn(async move {
            while let Some(event) = event_receiver.recv().await {
                if (filter_event_type == "*" || event.method == filter_event_type) && tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        Ok(rx)
    }

    async fn close(&self) -> Result<(), Error> {
        self.connection.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(r#type: &str, subtype: Option<&str>, value: Option<serde_json::Value>) -> RemoteObject {
        RemoteObject {
            r#type: r#type.to_string(),
            subtype: subtype.map(str::to_string),
            value,
            description: None,
        }
    }

    #[test]
    fn test_parse_remote_object_string() {
        let result = CdpClientImpl::parse_remote_object(&remote("string", None, Some(serde_json::json!("test"))));
        assert_eq!(result, EvaluationResult::String("test".to_string()));
    }

    #[test]
    fn test_parse_remote_object_number() {
        let result = CdpClientImpl::parse_remote_object(&remote("number", None, Some(serde_json::json!(42.5))));
        assert_eq!(result, EvaluationResult::Number(42.5));
    }

    #[test]
    fn test_parse_remote_object_bool() {
        let result = CdpClientImpl::parse_remote_object(&remote("boolean", None, Some(serde_json::json!(true))));
        assert_eq!(result, EvaluationResult::Bool(true));
    }

    #[test]
    fn test_parse_remote_object_null() {
        assert_eq!(
            CdpClientImpl::parse_remote_object(&remote("undefined", None, None)),
            EvaluationResult::Null
        );
        assert_eq!(
            CdpClientImpl::parse_remote_object(&remote("object", Some("null"), None)),
            EvaluationResult::Null
        );
    }

    #[test]
    fn test_parse_remote_object_array() {
        let result = CdpClientImpl::parse_remote_object(&remote("object", Some("array"), Some(serde_json::json!([1, 2]))));
        assert_eq!(result, EvaluationResult::Object(serde_json::json!([1, 2])));
    }
}
