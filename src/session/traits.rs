//! Session traits
//!
//! The contract the locator resolver and the action layer consume: a
//! browser holding windows, the page of the current window, and elements
//! found in it. Implemented over CDP and by the in-memory mock.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::locator::Locator;
use crate::Result;

pub use crate::cdp::traits::{EvaluationResult, NavigationResult, ScreenshotFormat};

/// A live element reference
pub type ElementHandle = Arc<dyn ElementRef>;

/// Something elements can be looked up in: a page (current frame) or an
/// element (its descendants)
#[async_trait]
pub trait SearchContext: Send + Sync {
    /// First element matching `locator`, `Error::ElementNotFound` when none
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle>;

    /// Every element matching `locator`, in document order
    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>>;
}

/// Element reference trait
///
/// Represents a DOM element in a page. Every operation fails with
/// `Error::StaleElement` once the element has left the document.
#[async_trait]
pub trait ElementRef: SearchContext + std::fmt::Debug {
    /// Get element ID
    fn id(&self) -> &str;

    /// Get parent page ID
    fn page_id(&self) -> &str;

    /// Lower-case tag name
    async fn tag_name(&self) -> Result<String>;

    /// Rendered text
    async fn get_text(&self) -> Result<String>;

    /// Attribute value; `value` falls back to the live property
    async fn get_attribute(&self, name: &str) -> Result<Option<String>>;

    async fn click(&self) -> Result<()>;

    async fn double_click(&self) -> Result<()>;

    /// Type text into element; `\n` presses Enter
    async fn send_keys(&self, text: &str) -> Result<()>;

    /// Empty a text input or textarea
    async fn clear(&self) -> Result<()>;

    async fn focus(&self) -> Result<()>;

    /// Move the mouse over the element
    async fn hover(&self) -> Result<()>;

    async fn scroll_into_view(&self) -> Result<()>;

    async fn is_displayed(&self) -> Result<bool>;

    async fn is_enabled(&self) -> Result<bool>;

    /// Checked checkbox/radio or selected option
    async fn is_selected(&self) -> Result<bool>;

    /// Bounding box in top-level viewport coordinates
    async fn get_bounding_box(&self) -> Result<BoundingBox>;

    /// Choose an option of a `<select>`
    async fn select_option(&self, by: &SelectBy) -> Result<()>;

    /// Text of the selected options of a `<select>`
    async fn selected_options(&self) -> Result<Vec<String>>;
}

/// Page context trait
///
/// The page of the current window. Element lookups run in the currently
/// selected frame.
#[async_trait]
pub trait PageContext: SearchContext + std::fmt::Debug {
    /// Get page ID
    fn id(&self) -> &str;

    /// Navigate to URL
    async fn navigate(&self, url: &str) -> Result<NavigationResult>;

    async fn current_url(&self) -> Result<String>;

    async fn title(&self) -> Result<String>;

    /// Evaluate JavaScript in the top-level document
    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult>;

    /// Capture screenshot
    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>>;

    /// Select a child frame of the current frame
    async fn switch_to_frame(&self, target: FrameTarget) -> Result<()>;

    /// Select the parent of the current frame; a no-op at the top
    async fn switch_to_parent_frame(&self) -> Result<()>;

    /// Select the top-level document
    async fn switch_to_default_content(&self) -> Result<()>;

    /// The open JavaScript dialog, if any
    async fn dialog(&self) -> Result<Option<DialogInfo>>;

    /// Accept or dismiss the open dialog, `Error::NoSuchAlert` when none
    async fn handle_dialog(&self, accept: bool, prompt_text: Option<&str>) -> Result<()>;

    /// Press at `from`, move to `to`, release
    async fn drag(&self, from: Point, to: Point) -> Result<()>;

    /// Close the page
    async fn close(&self) -> Result<()>;

    /// Check if page is active
    fn is_active(&self) -> bool;
}

/// Browser context trait
///
/// Represents a running browser instance with one or more windows.
#[async_trait]
pub trait BrowserContext: Send + Sync + std::fmt::Debug {
    /// Get browser ID
    fn id(&self) -> &str;

    /// Page of the current window, `Error::NoSuchWindow` after the current
    /// window was closed
    async fn current_page(&self) -> Result<Arc<dyn PageContext>>;

    /// Handle of the current window
    async fn window_handle(&self) -> Result<String>;

    /// Handles of every open window
    async fn window_handles(&self) -> Result<Vec<String>>;

    async fn switch_to_window(&self, handle: &str) -> Result<()>;

    /// Open a window and return its handle; the current window is unchanged
    async fn new_window(&self, url: &str) -> Result<String>;

    /// Close the current window; there is no current window until the next
    /// switch
    async fn close_window(&self) -> Result<()>;

    /// Close the browser
    async fn close(&self) -> Result<()>;

    /// Check if browser is active
    fn is_active(&self) -> bool;
}

/// Where a lookup runs
#[derive(Clone, Copy)]
pub enum SearchRoot<'a> {
    Page(&'a dyn PageContext),
    Element(&'a dyn ElementRef),
}

impl SearchRoot<'_> {
    pub async fn find_element(self, locator: &Locator) -> Result<ElementHandle> {
        match self {
            SearchRoot::Page(page) => page.find_element(locator).await,
            SearchRoot::Element(element) => element.find_element(locator).await,
        }
    }

    pub async fn find_elements(self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        match self {
            SearchRoot::Page(page) => page.find_elements(locator).await,
            SearchRoot::Element(element) => element.find_elements(locator).await,
        }
    }
}

/// Frame selector
#[derive(Debug, Clone)]
pub enum FrameTarget {
    /// Zero-based position among the frames of the current document
    Index(usize),
    /// `name` or `id` attribute of the frame element
    NameOrId(String),
    /// A frame element found earlier
    Element(ElementHandle),
}

/// How to pick a `<select>` option
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectBy {
    VisibleText(String),
    Value(String),
    Index(usize),
}

impl std::fmt::Display for SelectBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectBy::VisibleText(text) => write!(f, "text '{}'", text),
            SelectBy::Value(value) => write!(f, "value '{}'", value),
            SelectBy::Index(index) => write!(f, "index {}", index),
        }
    }
}

/// Kind of JavaScript dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialogKind {
    Alert,
    Confirm,
    Prompt,
    BeforeUnload,
}

impl DialogKind {
    pub fn from_cdp(kind: &str) -> Self {
        match kind {
            "confirm" => DialogKind::Confirm,
            "prompt" => DialogKind::Prompt,
            "beforeunload" => DialogKind::BeforeUnload,
            _ => DialogKind::Alert,
        }
    }
}

/// An open JavaScript dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogInfo {
    pub kind: DialogKind,
    pub message: String,
    pub default_prompt: Option<String>,
}

/// Point in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Element bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }
}
