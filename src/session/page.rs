//! Page context implementation
//!
//! A CDP page target: element lookups go through the page-side registry,
//! input goes through `Input.*`, dialogs are tracked from `Page.*` events.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::{watch, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::cdp::traits::CdpClient;
use crate::cdp::types::{DialogOpeningParams, HandleDialogParams, MouseEventParams};
use crate::locator::Locator;
use crate::session::element::ElementRefImpl;
use crate::session::scripts;
use crate::session::traits::{
    DialogInfo, DialogKind, ElementHandle, EvaluationResult, FrameTarget, NavigationResult, PageContext, Point,
    ScreenshotFormat, SearchContext,
};
use crate::{Error, Result};

/// State shared by a page and the elements found in it
#[derive(Debug)]
pub(crate) struct PageSession {
    pub(crate) id: String,
    pub(crate) cdp_client: Arc<dyn CdpClient>,
    dialog: watch::Sender<Option<DialogInfo>>,
    /// Ref ids of the frame elements from the top document to the current frame
    frames: RwLock<Vec<String>>,
}

impl PageSession {
    /// Run a registry operation and decode its result
    pub(crate) async fn call<T: DeserializeOwned>(&self, op: &str, args: &[Value]) -> Result<T> {
        let result = self.cdp_client.evaluate(&scripts::call(op, args), false).await?;
        scripts::decode(result)
    }

    /// Registry lookup; `parent` scopes it to an element's descendants
    pub(crate) async fn find(
        self: &Arc<Self>,
        frames: &[String],
        parent: Option<&str>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>> {
        let ids: Vec<String> = self
            .call(
                "find",
                &[json!(frames), json!(parent), json!(locator.kind().key()), json!(locator.value())],
            )
            .await?;

        debug!("{} matched {} element(s)", locator, ids.len());

        Ok(ids
            .into_iter()
            .map(|ref_id| Arc::new(ElementRefImpl::new(Arc::clone(self), ref_id)) as ElementHandle)
            .collect())
    }

    /// Send one input event; returns early when the event opens a dialog,
    /// since the browser holds the command until the dialog is handled.
    pub(crate) async fn dispatch_input(&self, method: &str, params: Value) -> Result<()> {
        let mut dialog = self.dialog.subscribe();
        let send = self.cdp_client.call_method(method, params);
        tokio::select! {
            result = send => result.map(|_| ()),
            _ = wait_for_dialog(&mut dialog) => {
                debug!("{} opened a dialog", method);
                Ok(())
            }
        }
    }

    pub(crate) async fn mouse(&self, event: MouseEventParams) -> Result<()> {
        self.dispatch_input("Input.dispatchMouseEvent", serde_json::to_value(event)?)
            .await
    }

    pub(crate) async fn click_at(&self, point: Point, click_count: u32) -> Result<()> {
        self.mouse(MouseEventParams::moved(point.x, point.y)).await?;
        for count in 1..=click_count {
            self.mouse(MouseEventParams::pressed(point.x, point.y, count)).await?;
            self.mouse(MouseEventParams::released(point.x, point.y, count)).await?;
        }
        Ok(())
    }

    fn current_dialog(&self) -> Option<DialogInfo> {
        self.dialog.borrow().clone()
    }

    fn set_dialog(&self, dialog: Option<DialogInfo>) {
        self.dialog.send_replace(dialog);
    }
}

async fn wait_for_dialog(dialog: &mut watch::Receiver<Option<DialogInfo>>) {
    loop {
        if dialog.changed().await.is_err() {
            // Sender gone: never resolve, let the command finish on its own
            std::future::pending::<()>().await;
        }
        if dialog.borrow_and_update().is_some() {
            return;
        }
    }
}

/// Page context implementation
#[derive(Debug)]
pub struct PageContextImpl {
    session: Arc<PageSession>,
    is_active: AtomicBool,
}

impl PageContextImpl {
    /// Attach to a page target and start tracking its dialogs
    pub async fn new(id: impl Into<String>, cdp_client: Arc<dyn CdpClient>) -> Result<Self> {
        let (dialog, _) = watch::channel(None);
        let session = Arc::new(PageSession {
            id: id.into(),
            cdp_client,
            dialog,
            frames: RwLock::new(Vec::new()),
        });

        Self::track_dialogs(&session).await?;

        Ok(Self {
            session,
            is_active: AtomicBool::new(true),
        })
    }

    async fn track_dialogs(session: &Arc<PageSession>) -> Result<()> {
        let mut events = session.cdp_client.subscribe_events("*").await?;
        let session: Weak<PageSession> = Arc::downgrade(session);

        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let Some(session) = session.upgrade() else { break };
                match event.method.as_str() {
                    "Page.javascriptDialogOpening" => {
                        match serde_json::from_value::<DialogOpeningParams>(event.params) {
                            Ok(params) => {
                                debug!("Dialog opened on {}: {}", session.id, params.message);
                                session.set_dialog(Some(DialogInfo {
                                    kind: DialogKind::from_cdp(&params.r#type),
                                    message: params.message,
                                    default_prompt: params.default_prompt,
                                }));
                            }
                            Err(e) => warn!("Malformed dialog event: {}", e),
                        }
                    }
                    "Page.javascriptDialogClosed" => session.set_dialog(None),
                    "Page.frameNavigated" if event.params["frame"].get("parentId").is_none() => {
                        // A new top document replaces every frame and dialog
                        session.set_dialog(None);
                        session.frames.write().await.clear();
                    }
                    _ => {}
                }
            }
        });

        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::no_such_window(&self.session.id))
        }
    }

    async fn frame_path(&self) -> Vec<String> {
        self.session.frames.read().await.clone()
    }
}

#[async_trait]
impl SearchContext for PageContextImpl {
    #[instrument(skip(self), fields(page = %self.session.id))]
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::element_not_found(locator.to_string()))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        self.ensure_active()?;
        let frames = self.frame_path().await;
        self.session.find(&frames, None, locator).await
    }
}

#[async_trait]
impl PageContext for PageContextImpl {
    fn id(&self) -> &str {
        &self.session.id
    }

    #[instrument(skip(self), fields(page = %self.session.id))]
    async fn navigate(&self, url: &str) -> Result<NavigationResult> {
        self.ensure_active()?;
        let result = self.session.cdp_client.navigate(url).await?;
        self.session.frames.write().await.clear();
        info!("Navigated to {}", result.url);
        Ok(result)
    }

    async fn current_url(&self) -> Result<String> {
        match self.evaluate("window.location.href", false).await? {
            EvaluationResult::String(url) => Ok(url),
            other => Err(Error::script_execution_failed(format!("Unexpected URL value: {:?}", other))),
        }
    }

    async fn title(&self) -> Result<String> {
        match self.evaluate("document.title", false).await? {
            EvaluationResult::String(title) => Ok(title),
            EvaluationResult::Null => Ok(String::new()),
            other => Err(Error::script_execution_failed(format!("Unexpected title value: {:?}", other))),
        }
    }

    async fn evaluate(&self, script: &str, await_promise: bool) -> Result<EvaluationResult> {
        self.ensure_active()?;
        self.session.cdp_client.evaluate(script, await_promise).await
    }

    async fn screenshot(&self, format: ScreenshotFormat) -> Result<Vec<u8>> {
        self.ensure_active()?;
        self.session.cdp_client.screenshot(format).await
    }

    #[instrument(skip(self), fields(page = %self.session.id))]
    async fn switch_to_frame(&self, target: FrameTarget) -> Result<()> {
        self.ensure_active()?;
        let frames = self.frame_path().await;

        let frame_id: String = match target {
            FrameTarget::Index(index) => self.session.call("frameByIndex", &[json!(frames), json!(index)]).await?,
            FrameTarget::NameOrId(name) => self.session.call("frameByName", &[json!(frames), json!(name)]).await?,
            FrameTarget::Element(element) => self.session.call("frameElement", &[json!(element.id())]).await?,
        };

        self.session.frames.write().await.push(frame_id);
        Ok(())
    }

    async fn switch_to_parent_frame(&self) -> Result<()> {
        self.ensure_active()?;
        self.session.frames.write().await.pop();
        Ok(())
    }

    async fn switch_to_default_content(&self) -> Result<()> {
        self.ensure_active()?;
        self.session.frames.write().await.clear();
        Ok(())
    }

    async fn dialog(&self) -> Result<Option<DialogInfo>> {
        self.ensure_active()?;
        Ok(self.session.current_dialog())
    }

    #[instrument(skip(self), fields(page = %self.session.id))]
    async fn handle_dialog(&self, accept: bool, prompt_text: Option<&str>) -> Result<()> {
        self.ensure_active()?;
        if self.session.current_dialog().is_none() {
            return Err(Error::no_such_alert("No dialog is open"));
        }

        let params = HandleDialogParams {
            accept,
            prompt_text: prompt_text.map(str::to_string),
        };
        self.session
            .cdp_client
            .call_method("Page.handleJavaScriptDialog", serde_json::to_value(params)?)
            .await?;
        self.session.set_dialog(None);
        Ok(())
    }

    async fn drag(&self, from: Point, to: Point) -> Result<()> {
        self.ensure_active()?;
        self.session.mouse(MouseEventParams::moved(from.x, from.y)).await?;
        self.session.mouse(MouseEventParams::pressed(from.x, from.y, 1)).await?;

        // Intermediate moves let pages that track mousemove see a drag
        const STEPS: u32 = 5;
        for step in 1..=STEPS {
            let t = f64::from(step) / f64::from(STEPS);
            let x = from.x + (to.x - from.x) * t;
            let y = from.y + (to.y - from.y) * t;
            self.session.mouse(MouseEventParams::moved(x, y)).await?;
        }

        self.session.mouse(MouseEventParams::released(to.x, to.y, 1)).await
    }

    async fn close(&self) -> Result<()> {
        if self.is_active.swap(false, Ordering::SeqCst) {
            info!("Closing page {}", self.session.id);
            if let Err(e) = self.session.cdp_client.close().await {
                warn!("Failed to close CDP client of page {}: {}", self.session.id, e);
            }
        }
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
