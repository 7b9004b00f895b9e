//! CDP (Chrome DevTools Protocol) type definitions
//!
//! This module defines the wire structures exchanged with the browser.

use serde::{Deserialize, Serialize};

/// CDP JSON-RPC request
#[derive(Debug, Clone, Serialize)]
pub struct CdpRequest {
    /// Request ID
    pub id: u64,
    /// Method name (e.g., "Page.navigate")
    pub method: String,
    /// Method parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

/// CDP JSON-RPC notification (event)
#[derive(Debug, Clone, Deserialize)]
pub struct CdpNotification {
    /// Event method (e.g., "Page.loadEventFired")
    pub method: String,
    /// Event parameters
    #[serde(default)]
    pub params: serde_json::Value,
    /// Session ID for multi-session targets
    #[serde(default, rename = "sessionId")]
    pub session_id: Option<String>,
}

/// CDP JSON-RPC response
#[derive(Debug, Clone, Deserialize)]
pub struct CdpRpcResponse {
    /// Response ID (matches request ID)
    pub id: u64,
    /// Response result
    #[serde(default)]
    pub result: serde_json::Value,
    /// Error if any
    #[serde(default)]
    pub error: Option<CdpErrorDetail>,
}

/// CDP error detail
#[derive(Debug, Clone, Deserialize)]
pub struct CdpErrorDetail {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Additional error data
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Page navigation parameters
#[derive(Debug, Clone, Serialize)]
pub struct NavigateParams {
    /// URL to navigate to
    pub url: String,
}

/// JavaScript evaluation parameters
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateParams {
    /// JavaScript expression to evaluate
    pub expression: String,
    /// Whether to await promise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub await_promise: Option<bool>,
    /// Whether to return as value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_by_value: Option<bool>,
    /// Let the page see the evaluation as a user gesture
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_gesture: Option<bool>,
}

/// Remote object (result of JavaScript evaluation)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RemoteObject {
    /// Object type
    #[serde(default)]
    pub r#type: String,
    /// Object subtype
    #[serde(default)]
    pub subtype: Option<String>,
    /// Object value
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    /// Object description
    #[serde(default)]
    pub description: Option<String>,
}

/// JavaScript evaluation response
#[derive(Debug, Clone, Deserialize)]
pub struct EvaluateResponse {
    /// Evaluation result
    #[serde(default)]
    pub result: RemoteObject,
}

/// Mouse event parameters for `Input.dispatchMouseEvent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MouseEventParams {
    /// mousePressed, mouseReleased or mouseMoved
    pub r#type: &'static str,
    pub x: f64,
    pub y: f64,
    /// none, left, middle or right
    pub button: &'static str,
    pub click_count: u32,
}

impl MouseEventParams {
    pub fn moved(x: f64, y: f64) -> Self {
        Self { r#type: "mouseMoved", x, y, button: "none", click_count: 0 }
    }

    pub fn pressed(x: f64, y: f64, click_count: u32) -> Self {
        Self { r#type: "mousePressed", x, y, button: "left", click_count }
    }

    pub fn released(x: f64, y: f64, click_count: u32) -> Self {
        Self { r#type: "mouseReleased", x, y, button: "left", click_count }
    }
}

/// Key event parameters for `Input.dispatchKeyEvent`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyEventParams {
    /// keyDown, keyUp or char
    pub r#type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub windows_virtual_key_code: Option<u32>,
}

impl KeyEventParams {
    /// A printable character
    pub fn char(ch: char) -> Self {
        Self {
            r#type: "char",
            text: Some(ch.to_string()),
            key: None,
            code: None,
            windows_virtual_key_code: None,
        }
    }

    /// Enter key, down or up
    pub fn enter(down: bool) -> Self {
        Self {
            r#type: if down { "keyDown" } else { "keyUp" },
            text: down.then(|| "\r".to_string()),
            key: Some("Enter"),
            code: Some("Enter"),
            windows_virtual_key_code: Some(13),
        }
    }
}

/// Parameters of the `Page.javascriptDialogOpening` event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogOpeningParams {
    #[serde(default)]
    pub message: String,
    /// alert, confirm, prompt or beforeunload
    #[serde(default)]
    pub r#type: String,
    #[serde(default)]
    pub default_prompt: Option<String>,
}

/// Parameters of `Page.handleJavaScriptDialog`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleDialogParams {
    pub accept: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_text: Option<String>,
}
