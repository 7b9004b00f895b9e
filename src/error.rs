//! Unified error types for chaser-actions

use thiserror::Error;

/// Unified Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for chaser-actions
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket errors
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// CDP protocol errors
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No element matched the locator
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Element handle no longer attached to the document
    #[error("Stale element reference: {0}")]
    StaleElement(String),

    /// Selector rejected by the page (bad CSS or XPath syntax)
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Frame not found
    #[error("No such frame: {0}")]
    NoSuchFrame(String),

    /// Window not found
    #[error("No such window: {0}")]
    NoSuchWindow(String),

    /// No dialog open
    #[error("No alert present: {0}")]
    NoSuchAlert(String),

    /// Timeout
    #[error("Operation timeout: {0}")]
    Timeout(String),

    /// Script execution failed
    #[error("Script execution failed: {0}")]
    ScriptExecutionFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new WebSocket error
    pub fn websocket<S: Into<String>>(msg: S) -> Self {
        Error::WebSocket(msg.into())
    }

    /// Create a new CDP error
    pub fn cdp<S: Into<String>>(msg: S) -> Self {
        Error::Cdp(msg.into())
    }

    /// Create a new element not found error
    pub fn element_not_found<S: Into<String>>(what: S) -> Self {
        Error::ElementNotFound(what.into())
    }

    /// Create a new stale element error
    pub fn stale_element<S: Into<String>>(id: S) -> Self {
        Error::StaleElement(id.into())
    }

    /// Create a new invalid selector error
    pub fn invalid_selector<S: Into<String>>(msg: S) -> Self {
        Error::InvalidSelector(msg.into())
    }

    /// Create a new no such frame error
    pub fn no_such_frame<S: Into<String>>(what: S) -> Self {
        Error::NoSuchFrame(what.into())
    }

    /// Create a new no such window error
    pub fn no_such_window<S: Into<String>>(what: S) -> Self {
        Error::NoSuchWindow(what.into())
    }

    /// Create a new no such alert error
    pub fn no_such_alert<S: Into<String>>(msg: S) -> Self {
        Error::NoSuchAlert(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        Error::Timeout(msg.into())
    }

    /// Create a new script execution failed error
    pub fn script_execution_failed<S: Into<String>>(msg: S) -> Self {
        Error::ScriptExecutionFailed(msg.into())
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Error::Configuration(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Error::Internal(msg.into())
    }

    /// Whether a polling wait should keep trying after this error.
    ///
    /// A missing or detached element can appear on a later poll; anything
    /// else (broken connection, bad selector) will not fix itself.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::ElementNotFound(_)
                | Error::StaleElement(_)
                | Error::NoSuchFrame(_)
                | Error::NoSuchAlert(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(Error::element_not_found("css~.x").is_transient());
        assert!(Error::stale_element("ref-1").is_transient());
        assert!(Error::no_such_alert("none").is_transient());
        assert!(!Error::invalid_selector("//[").is_transient());
        assert!(!Error::websocket("closed").is_transient());
        assert!(!Error::timeout("30000ms").is_transient());
    }

    #[test]
    fn test_error_display() {
        let err = Error::no_such_window("CDwindow-1");
        assert_eq!(err.to_string(), "No such window: CDwindow-1");
    }
}
