//! # Browser session
//!
//! The browser/page/element contract the locator resolver and the action
//! layer run against, with two implementations: one driving Chrome over the
//! DevTools Protocol and an in-memory one for tests.
//!
//! ## Core concepts
//! - **BrowserContext**: a browser with one or more windows, one of them current
//! - **PageContext**: the page of the current window; lookups run in its selected frame
//! - **ElementRef**: an element found in a page, stale once it leaves the document
//!
//! ## Modules
//! - `traits`: the session traits and their value types
//! - `browser`, `page`, `element`: CDP-backed implementations
//! - `mock`: in-memory implementation
//!
//! ## Example
//! ```rust,no_run
//! use chaser_actions::cdp::CdpBrowserImpl;
//! use chaser_actions::locator::Locator;
//! use chaser_actions::session::{BrowserContext, BrowserContextImpl, SearchContext};
//! use std::sync::Arc;
//!
//! # async fn example() -> chaser_actions::Result<()> {
//! let cdp = Arc::new(CdpBrowserImpl::new("ws://localhost:9222"));
//! let browser = BrowserContextImpl::connect(cdp).await?;
//!
//! let page = browser.current_page().await?;
//! page.navigate("https://example.com").await?;
//! let heading = page.find_element(&Locator::tag_name("h1")).await?;
//! println!("{}", heading.get_text().await?);
//! # Ok(())
//! # }
//! ```

pub mod traits;
pub mod browser;
pub mod page;
pub mod element;
pub mod mock;
pub(crate) mod scripts;

#[cfg(test)]
mod tests;

pub use traits::{
    BoundingBox, BrowserContext, DialogInfo, DialogKind, ElementHandle, ElementRef, EvaluationResult,
    FrameTarget, NavigationResult, PageContext, Point, ScreenshotFormat, SearchContext, SearchRoot, SelectBy,
};

pub use browser::BrowserContextImpl;
pub use element::ElementRefImpl;
pub use page::PageContextImpl;

pub use mock::{MockAction, MockBrowser, MockElement, MockNode, MockPage};
