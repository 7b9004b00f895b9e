//! # Chrome DevTools Protocol (CDP) layer
//!
//! WebSocket transport to a Chrome/Chromium browser started with
//! `--remote-debugging-port`.
//!
//! ## Responsibilities
//! - **Connection**: one WebSocket per page target, commands matched to
//!   responses by id, per-method timeouts
//! - **Events**: fan-out of CDP events (dialogs, loads) to subscribers
//! - **Client**: navigation, `Runtime.evaluate`, screenshots, raw methods
//! - **Browser**: target discovery and window lifecycle over the
//!   DevTools HTTP API
//!
//! ## Example
//! ```rust,no_run
//! use chaser_actions::cdp::{CdpBrowser, CdpBrowserImpl};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let browser = CdpBrowserImpl::new("http://localhost:9222");
//! let target = browser.create_target("about:blank").await?;
//! let client = browser
//!     .create_client(target.web_socket_debugger_url.as_deref().unwrap_or_default())
//!     .await?;
//! let result = client.navigate("https://example.com").await?;
//! println!("Navigated to: {}", result.url);
//! # Ok(())
//! # }
//! ```

pub mod browser;
pub mod client;
pub mod connection;
pub mod mock;
pub mod traits;
pub mod types;

#[cfg(test)]
mod tests;

pub use traits::{
    BrowserVersion, CdpBrowser, CdpClient, CdpConnection, CdpError, CdpEvent, CdpResponse, EvaluationResult,
    NavigationResult, ScreenshotFormat, TargetInfo,
};

pub use browser::CdpBrowserImpl;
pub use client::CdpClientImpl;
pub use connection::{CdpTimeoutConfig, CdpWebSocketConnection};

pub use mock::{MockCdpBrowser, MockCdpClient};
