//! In-memory session for tests
//!
//! [`MockBrowser`], [`MockPage`] and [`MockElement`] implement the session
//! traits over a small DOM built from [`MockNode`]s. Lookups support all
//! eight locator strategies (CSS and XPath in a practical subset). Pages
//! count their lookups, record every action and can be told to fail a
//! locator, which makes them suitable for exercising the resolver and the
//! action layer without a browser.

mod dom;
mod selector;

pub use dom::MockNode;

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use self::dom::Dom;
use crate::cdp::mock::MOCK_PNG;
use crate::locator::Locator;
use crate::session::traits::{
    BoundingBox, BrowserContext, DialogInfo, DialogKind, ElementHandle, ElementRef, EvaluationResult,
    FrameTarget, NavigationResult, PageContext, Point, ScreenshotFormat, SearchContext, SelectBy,
};
use crate::{Error, Result};

/// Something done to a mock page, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum MockAction {
    Click(String),
    DoubleClick(String),
    Hover(String),
    Focus(String),
    ScrollIntoView(String),
    SendKeys { element: String, text: String },
    Clear(String),
    Select { element: String, choice: String },
    Drag { from: Point, to: Point },
    Navigate(String),
    HandleDialog { accept: bool, text: Option<String> },
    Screenshot,
}

#[derive(Debug)]
struct PageState {
    dom: Dom,
    /// Frame elements from the top document to the current frame
    frames: Vec<usize>,
    dialog: Option<DialogInfo>,
    url: String,
    title: String,
    routes: HashMap<String, Vec<MockNode>>,
    failures: HashMap<Locator, String>,
    screenshot_error: Option<String>,
    queried: Vec<Locator>,
    actions: Vec<MockAction>,
}

impl PageState {
    /// Document lookups from the page run in
    fn current_document(&self) -> Result<usize> {
        match self.frames.last() {
            None => Ok(0),
            Some(&frame) => self
                .dom
                .node(frame)
                .ok()
                .and_then(|node| node.frame_doc)
                .ok_or_else(|| Error::no_such_frame(format!("node-{}", frame))),
        }
    }

    fn lookup(&mut self, root: usize, locator: &Locator) -> Result<Vec<usize>> {
        self.queried.push(locator.clone());
        if let Some(message) = self.failures.get(locator) {
            return Err(Error::cdp(message.clone()));
        }
        self.dom.query(root, locator)
    }

    fn record(&mut self, action: MockAction) {
        self.actions.push(action);
    }
}

#[derive(Debug)]
struct Shared {
    id: String,
    state: RwLock<PageState>,
    is_active: AtomicBool,
}

impl Shared {
    fn element(self: &Arc<Self>, node: usize) -> ElementHandle {
        Arc::new(MockElement {
            shared: Arc::clone(self),
            node,
            id: format!("node-{}", node),
        })
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::no_such_window(&self.id))
        }
    }
}

/// Mock page context
#[derive(Debug, Clone)]
pub struct MockPage {
    shared: Arc<Shared>,
}

impl MockPage {
    /// A page at `about:blank` holding `content`
    pub fn new(content: impl IntoIterator<Item = MockNode>) -> Self {
        Self::at("about:blank", content)
    }

    /// A page at `url` holding `content`
    pub fn at(url: impl Into<String>, content: impl IntoIterator<Item = MockNode>) -> Self {
        let state = PageState {
            dom: Dom::new(content.into_iter().collect()),
            frames: Vec::new(),
            dialog: None,
            url: url.into(),
            title: "Mock Page".to_string(),
            routes: HashMap::new(),
            failures: HashMap::new(),
            screenshot_error: None,
            queried: Vec::new(),
            actions: Vec::new(),
        };
        Self {
            shared: Arc::new(Shared {
                id: Uuid::new_v4().to_string(),
                state: RwLock::new(state),
                is_active: AtomicBool::new(true),
            }),
        }
    }

    pub async fn set_title(&self, title: impl Into<String>) {
        self.shared.state.write().await.title = title.into();
    }

    /// Content that replaces the document when `url` is navigated to
    pub async fn route(&self, url: impl Into<String>, content: impl IntoIterator<Item = MockNode>) {
        self.shared
            .state
            .write()
            .await
            .routes
            .insert(url.into(), content.into_iter().collect());
    }

    /// Make every lookup with `locator` fail with a CDP error
    pub async fn fail_locator(&self, locator: Locator, message: impl Into<String>) {
        self.shared
            .state
            .write()
            .await
            .failures
            .insert(locator, message.into());
    }

    /// Make screenshots fail with a CDP error
    pub async fn fail_screenshots(&self, message: impl Into<String>) {
        self.shared.state.write().await.screenshot_error = Some(message.into());
    }

    /// Number of lookups made against this page and its elements
    pub async fn query_count(&self) -> usize {
        self.shared.state.read().await.queried.len()
    }

    /// Locators looked up so far, in order
    pub async fn queried(&self) -> Vec<Locator> {
        self.shared.state.read().await.queried.clone()
    }

    pub async fn actions(&self) -> Vec<MockAction> {
        self.shared.state.read().await.actions.clone()
    }

    /// Open a JavaScript dialog as if the page script did
    pub async fn open_dialog(&self, kind: DialogKind, message: impl Into<String>) {
        self.shared.state.write().await.dialog = Some(DialogInfo {
            kind,
            message: message.into(),
            default_prompt: None,
        });
    }

    /// Append `node` to the top-level document
    pub async fn insert(&self, node: MockNode) {
        self.shared.state.write().await.dom.append(0, node);
    }

    /// Append `node` under the first element of the top-level document
    /// matching `parent`
    pub async fn insert_into(&self, parent: &Locator, node: MockNode) -> Result<()> {
        let mut state = self.shared.state.write().await;
        let target = state
            .dom
            .query(0, parent)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::element_not_found(parent.to_string()))?;
        state.dom.append(target, node);
        Ok(())
    }

    /// Detach every matching element of the top-level document
    pub async fn remove_where(&self, locator: &Locator) -> Result<usize> {
        let mut state = self.shared.state.write().await;
        let matches = state.dom.query(0, locator)?;
        for &node in &matches {
            state.dom.remove(node);
        }
        Ok(matches.len())
    }

    pub async fn set_displayed_where(&self, locator: &Locator, displayed: bool) -> Result<usize> {
        self.update_where(locator, |dom, node| {
            dom.node_mut(node)?.displayed = displayed;
            Ok(())
        })
        .await
    }

    pub async fn set_enabled_where(&self, locator: &Locator, enabled: bool) -> Result<usize> {
        self.update_where(locator, |dom, node| {
            dom.node_mut(node)?.enabled = enabled;
            Ok(())
        })
        .await
    }

    pub async fn set_attribute_where(&self, locator: &Locator, name: &str, value: &str) -> Result<usize> {
        self.update_where(locator, |dom, node| {
            dom.set_attr(node, name, value);
            Ok(())
        })
        .await
    }

    async fn update_where<F>(&self, locator: &Locator, mut update: F) -> Result<usize>
    where
        F: FnMut(&mut Dom, usize) -> Result<()>,
    {
        let mut state = self.shared.state.write().await;
        let matches = state.dom.query(0, locator)?;
        for &node in &matches {
            update(&mut state.dom, node)?;
        }
        Ok(matches.len())
    }
}

#[async_trait]
impl SearchContext for MockPage {
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::element_not_found(locator.to_string()))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        self.shared.ensure_active()?;
        let mut state = self.shared.state.write().await;
        let root = state.current_document()?;
        let nodes = state.lookup(root, locator)?;
        Ok(nodes.into_iter().map(|node| self.shared.element(node)).collect())
    }
}

#[async_trait]
impl PageContext for MockPage {
    fn id(&self) -> &str {
        &self.shared.id
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult> {
        self.shared.ensure_active()?;
        let mut state = self.shared.state.write().await;
        if let Some(content) = state.routes.get(url).cloned() {
            state.dom = Dom::new(content);
        }
        state.url = url.to_string();
        state.frames.clear();
        state.dialog = None;
        state.record(MockAction::Navigate(url.to_string()));

        Ok(NavigationResult {
            navigation_id: Some(Uuid::new_v4().to_string()),
            url: url.to_string(),
            is_loaded: true,
        })
    }

    async fn current_url(&self) -> Result<String> {
        self.shared.ensure_active()?;
        Ok(self.shared.state.read().await.url.clone())
    }

    async fn title(&self) -> Result<String> {
        self.shared.ensure_active()?;
        Ok(self.shared.state.read().await.title.clone())
    }

    async fn evaluate(&self, script: &str, _await_promise: bool) -> Result<EvaluationResult> {
        self.shared.ensure_active()?;
        let state = self.shared.state.read().await;
        Ok(match script.trim() {
            "document.title" => EvaluationResult::String(state.title.clone()),
            "window.location.href" | "location.href" => EvaluationResult::String(state.url.clone()),
            _ => EvaluationResult::Null,
        })
    }

    async fn screenshot(&self, _format: ScreenshotFormat) -> Result<Vec<u8>> {
        self.shared.ensure_active()?;
        let mut state = self.shared.state.write().await;
        if let Some(message) = &state.screenshot_error {
            return Err(Error::cdp(message.clone()));
        }
        state.record(MockAction::Screenshot);
        Ok(MOCK_PNG.to_vec())
    }

    async fn switch_to_frame(&self, target: FrameTarget) -> Result<()> {
        self.shared.ensure_active()?;
        let mut state = self.shared.state.write().await;
        let doc = state.current_document()?;
        let frames = state.dom.frames_in(doc);

        let frame = match &target {
            FrameTarget::Index(index) => frames.get(*index).copied(),
            FrameTarget::NameOrId(name) => frames.into_iter().find(|&frame| {
                state.dom.attr(frame, "name") == Some(name.as_str())
                    || state.dom.attr(frame, "id") == Some(name.as_str())
            }),
            FrameTarget::Element(element) => element
                .id()
                .strip_prefix("node-")
                .and_then(|index| index.parse::<usize>().ok())
                .filter(|_| element.page_id() == self.shared.id)
                .filter(|&node| state.dom.node(node).is_ok_and(|data| data.frame_doc.is_some())),
        };

        let frame = frame.ok_or_else(|| match &target {
            FrameTarget::Index(index) => Error::no_such_frame(format!("index {}", index)),
            FrameTarget::NameOrId(name) => Error::no_such_frame(name.clone()),
            FrameTarget::Element(element) => Error::no_such_frame(element.id()),
        })?;
        state.frames.push(frame);
        Ok(())
    }

    async fn switch_to_parent_frame(&self) -> Result<()> {
        self.shared.ensure_active()?;
        self.shared.state.write().await.frames.pop();
        Ok(())
    }

    async fn switch_to_default_content(&self) -> Result<()> {
        self.shared.ensure_active()?;
        self.shared.state.write().await.frames.clear();
        Ok(())
    }

    async fn dialog(&self) -> Result<Option<DialogInfo>> {
        self.shared.ensure_active()?;
        Ok(self.shared.state.read().await.dialog.clone())
    }

    async fn handle_dialog(&self, accept: bool, prompt_text: Option<&str>) -> Result<()> {
        self.shared.ensure_active()?;
        let mut state = self.shared.state.write().await;
        if state.dialog.take().is_none() {
            return Err(Error::no_such_alert("No dialog is open"));
        }
        state.record(MockAction::HandleDialog {
            accept,
            text: prompt_text.map(str::to_string),
        });
        Ok(())
    }

    async fn drag(&self, from: Point, to: Point) -> Result<()> {
        self.shared.ensure_active()?;
        self.shared
            .state
            .write()
            .await
            .record(MockAction::Drag { from, to });
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.shared.is_active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.shared.is_active.load(Ordering::SeqCst)
    }
}

/// Mock element reference, addressed as `node-N`
#[derive(Debug)]
pub struct MockElement {
    shared: Arc<Shared>,
    node: usize,
    id: String,
}

impl MockElement {
    /// Label of a live element that can take input
    fn interactable(&self, state: &PageState) -> Result<String> {
        state.dom.node(self.node)?;
        if !state.dom.is_displayed(self.node) {
            return Err(Error::script_execution_failed(format!(
                "Element {} is not displayed",
                state.dom.label(self.node)
            )));
        }
        Ok(state.dom.label(self.node))
    }

    async fn record_interaction(&self, action: impl FnOnce(String) -> MockAction) -> Result<()> {
        let mut state = self.shared.state.write().await;
        let label = self.interactable(&state)?;
        state.record(action(label));
        Ok(())
    }

    async fn read<T>(&self, read: impl FnOnce(&Dom, usize) -> T) -> Result<T> {
        let state = self.shared.state.read().await;
        state.dom.node(self.node)?;
        Ok(read(&state.dom, self.node))
    }

    fn options(dom: &Dom, select: usize) -> Vec<usize> {
        dom.descendants(select)
            .into_iter()
            .filter(|&node| dom.tag(node) == "option")
            .collect()
    }
}

#[async_trait]
impl SearchContext for MockElement {
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::element_not_found(locator.to_string()))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        let mut state = self.shared.state.write().await;
        let nodes = state.lookup(self.node, locator)?;
        Ok(nodes.into_iter().map(|node| self.shared.element(node)).collect())
    }
}

#[async_trait]
impl ElementRef for MockElement {
    fn id(&self) -> &str {
        &self.id
    }

    fn page_id(&self) -> &str {
        &self.shared.id
    }

    async fn tag_name(&self) -> Result<String> {
        self.read(|dom, node| dom.tag(node).to_string()).await
    }

    async fn get_text(&self) -> Result<String> {
        self.read(|dom, node| dom.rendered_text(node)).await
    }

    async fn get_attribute(&self, name: &str) -> Result<Option<String>> {
        let state = self.shared.state.read().await;
        let data = state.dom.node(self.node)?;
        if name == "value" && data.value.is_some() {
            return Ok(data.value.clone());
        }
        Ok(state.dom.attr(self.node, name).map(str::to_string))
    }

    async fn click(&self) -> Result<()> {
        let mut state = self.shared.state.write().await;
        let label = self.interactable(&state)?;
        state.record(MockAction::Click(label));

        let kind = state.dom.attr(self.node, "type").map(str::to_ascii_lowercase);
        let data = state.dom.node_mut(self.node)?;
        if data.enabled && data.tag == "input" {
            match kind.as_deref() {
                Some("checkbox") => data.selected = !data.selected,
                Some("radio") => data.selected = true,
                _ => {}
            }
        }
        if let Some(dialog) = data.on_click_dialog.clone() {
            state.dialog = Some(dialog);
        }
        Ok(())
    }

    async fn double_click(&self) -> Result<()> {
        self.record_interaction(MockAction::DoubleClick).await
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        let mut state = self.shared.state.write().await;
        let label = self.interactable(&state)?;
        let data = state.dom.node_mut(self.node)?;
        if !data.enabled {
            return Err(Error::script_execution_failed(format!("Element {} is disabled", label)));
        }
        data.value
            .get_or_insert_with(String::new)
            .extend(text.chars().filter(|&ch| ch != '\n'));
        state.record(MockAction::SendKeys {
            element: label,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        let mut state = self.shared.state.write().await;
        let label = self.interactable(&state)?;
        let data = state.dom.node_mut(self.node)?;
        if !data.enabled {
            return Err(Error::script_execution_failed(format!("Element {} is disabled", label)));
        }
        data.value = Some(String::new());
        state.record(MockAction::Clear(label));
        Ok(())
    }

    async fn focus(&self) -> Result<()> {
        self.record_interaction(MockAction::Focus).await
    }

    async fn hover(&self) -> Result<()> {
        self.record_interaction(MockAction::Hover).await
    }

    async fn scroll_into_view(&self) -> Result<()> {
        self.record_interaction(MockAction::ScrollIntoView).await
    }

    async fn is_displayed(&self) -> Result<bool> {
        self.read(|dom, node| dom.is_displayed(node)).await
    }

    async fn is_enabled(&self) -> Result<bool> {
        let state = self.shared.state.read().await;
        Ok(state.dom.node(self.node)?.enabled)
    }

    async fn is_selected(&self) -> Result<bool> {
        let state = self.shared.state.read().await;
        Ok(state.dom.node(self.node)?.selected)
    }

    async fn get_bounding_box(&self) -> Result<BoundingBox> {
        let state = self.shared.state.read().await;
        Ok(state.dom.node(self.node)?.bbox)
    }

    async fn select_option(&self, by: &SelectBy) -> Result<()> {
        let mut state = self.shared.state.write().await;
        let label = self.interactable(&state)?;
        if state.dom.tag(self.node) != "select" {
            return Err(Error::script_execution_failed(format!("Element {} is not a select", label)));
        }

        let options = Self::options(&state.dom, self.node);
        let chosen = match by {
            SelectBy::VisibleText(text) => options
                .iter()
                .copied()
                .find(|&option| state.dom.rendered_text(option).trim() == text.trim()),
            SelectBy::Value(value) => options
                .iter()
                .copied()
                .find(|&option| state.dom.attr(option, "value") == Some(value.as_str())),
            SelectBy::Index(index) => options.get(*index).copied(),
        }
        .ok_or_else(|| Error::element_not_found(format!("option with {} in {}", by, label)))?;

        let multiple = state.dom.attr(self.node, "multiple").is_some();
        for option in options {
            let data = state.dom.node_mut(option)?;
            if option == chosen {
                data.selected = true;
            } else if !multiple {
                data.selected = false;
            }
        }

        state.record(MockAction::Select {
            element: label,
            choice: by.to_string(),
        });
        Ok(())
    }

    async fn selected_options(&self) -> Result<Vec<String>> {
        let state = self.shared.state.read().await;
        state.dom.node(self.node)?;
        Ok(Self::options(&state.dom, self.node)
            .into_iter()
            .filter(|&option| state.dom.node(option).is_ok_and(|data| data.selected))
            .map(|option| state.dom.rendered_text(option).trim().to_string())
            .collect())
    }
}

/// Mock browser context: an ordered set of windows, each holding a page
#[derive(Debug)]
pub struct MockBrowser {
    id: String,
    windows: RwLock<Vec<(String, MockPage)>>,
    current: RwLock<Option<String>>,
    is_active: AtomicBool,
}

impl MockBrowser {
    /// A browser whose only window shows `page`
    pub fn new(page: MockPage) -> Self {
        let handle = page.id().to_string();
        Self {
            id: Uuid::new_v4().to_string(),
            windows: RwLock::new(vec![(handle.clone(), page)]),
            current: RwLock::new(Some(handle)),
            is_active: AtomicBool::new(true),
        }
    }

    /// Open `page` in another window without switching to it, like a popup
    pub async fn open_window(&self, page: MockPage) -> String {
        let handle = page.id().to_string();
        self.windows.write().await.push((handle.clone(), page));
        handle
    }

    /// Page shown in the window `handle`
    pub async fn page(&self, handle: &str) -> Option<MockPage> {
        self.windows
            .read()
            .await
            .iter()
            .find(|(existing, _)| existing == handle)
            .map(|(_, page)| page.clone())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::internal(format!("Browser {} is closed", self.id)))
        }
    }
}

#[async_trait]
impl BrowserContext for MockBrowser {
    fn id(&self) -> &str {
        &self.id
    }

    async fn current_page(&self) -> Result<Arc<dyn PageContext>> {
        let handle = self.window_handle().await?;
        let page = self
            .page(&handle)
            .await
            .ok_or_else(|| Error::no_such_window(&handle))?;
        Ok(Arc::new(page))
    }

    async fn window_handle(&self) -> Result<String> {
        self.ensure_active()?;
        self.current
            .read()
            .await
            .clone()
            .ok_or_else(|| Error::no_such_window("The current window was closed"))
    }

    async fn window_handles(&self) -> Result<Vec<String>> {
        self.ensure_active()?;
        Ok(self
            .windows
            .read()
            .await
            .iter()
            .map(|(handle, _)| handle.clone())
            .collect())
    }

    async fn switch_to_window(&self, handle: &str) -> Result<()> {
        self.ensure_active()?;
        if self.page(handle).await.is_none() {
            return Err(Error::no_such_window(handle));
        }
        *self.current.write().await = Some(handle.to_string());
        Ok(())
    }

    async fn new_window(&self, url: &str) -> Result<String> {
        self.ensure_active()?;
        Ok(self.open_window(MockPage::at(url, Vec::new())).await)
    }

    async fn close_window(&self) -> Result<()> {
        let handle = self.window_handle().await?;
        let mut windows = self.windows.write().await;
        if let Some(position) = windows.iter().position(|(existing, _)| *existing == handle) {
            let (_, page) = windows.remove(position);
            page.close().await?;
        }
        *self.current.write().await = None;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.is_active.store(false, Ordering::SeqCst);
        for (_, page) in self.windows.write().await.drain(..) {
            page.close().await?;
        }
        *self.current.write().await = None;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
