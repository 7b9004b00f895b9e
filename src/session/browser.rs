//! Browser context implementation
//!
//! Windows are CDP page targets; a page is attached lazily the first time
//! its window becomes current.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cdp::traits::{CdpBrowser, TargetInfo};
use crate::session::page::PageContextImpl;
use crate::session::traits::{BrowserContext, PageContext};
use crate::{Error, Result};

/// Browser context implementation
#[derive(Debug)]
pub struct BrowserContextImpl {
    id: String,
    cdp_browser: Arc<dyn CdpBrowser>,
    /// Attached pages by target id
    pages: RwLock<HashMap<String, Arc<PageContextImpl>>>,
    /// Target id of the current window
    current: RwLock<Option<String>>,
    is_active: AtomicBool,
}

impl BrowserContextImpl {
    /// Attach to a running browser. The first open page becomes the current
    /// window; a blank one is opened when there is none.
    pub async fn connect(cdp_browser: Arc<dyn CdpBrowser>) -> Result<Self> {
        let targets = cdp_browser.get_targets().await?;
        let target = match targets.into_iter().find(TargetInfo::is_page) {
            Some(target) => target,
            None => cdp_browser.create_target("about:blank").await?,
        };

        let browser = Self {
            id: Uuid::new_v4().to_string(),
            cdp_browser,
            pages: RwLock::new(HashMap::new()),
            current: RwLock::new(None),
            is_active: AtomicBool::new(true),
        };

        browser.attach(&target).await?;
        *browser.current.write().await = Some(target.target_id.clone());
        info!("Attached to window {}", target.target_id);

        Ok(browser)
    }

    async fn attach(&self, target: &TargetInfo) -> Result<Arc<PageContextImpl>> {
        let ws_url = target
            .web_socket_debugger_url
            .as_deref()
            .ok_or_else(|| Error::cdp(format!("Target {} has no WebSocket URL (already attached elsewhere?)", target.target_id)))?;

        let cdp_client = self.cdp_browser.create_client(ws_url).await?;
        let page = Arc::new(PageContextImpl::new(target.target_id.clone(), cdp_client).await?);

        self.pages
            .write()
            .await
            .insert(target.target_id.clone(), Arc::clone(&page));
        debug!("Attached page {}", target.target_id);

        Ok(page)
    }

    async fn page_target(&self, handle: &str) -> Result<TargetInfo> {
        self.cdp_browser
            .get_targets()
            .await?
            .into_iter()
            .find(|target| target.is_page() && target.target_id == handle)
            .ok_or_else(|| Error::no_such_window(handle))
    }

    async fn page_for(&self, handle: &str) -> Result<Arc<PageContextImpl>> {
        if let Some(page) = self.pages.read().await.get(handle) {
            return Ok(Arc::clone(page));
        }
        let target = self.page_target(handle).await?;
        self.attach(&target).await
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
impl BrowserContext for BrowserContextImpl {
    fn id(&self) -> &str {
        &self.id
    }

    async fn current_page(&self) -> Result<Arc<dyn PageContext>> {
        let handle = self.window_handle().await?;
        let page: Arc<dyn PageContext> = self.page_for(&handle).await?;
        Ok(page)
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
            .cdp_browser
            .get_targets()
            .await?
            .into_iter()
            .filter(TargetInfo::is_page)
            .map(|target| target.target_id)
            .collect())
    }

    #[instrument(skip(self), fields(browser = %self.id))]
    async fn switch_to_window(&self, handle: &str) -> Result<()> {
        self.ensure_active()?;
        self.page_target(handle).await?;
        self.cdp_browser.activate_target(handle).await?;
        self.page_for(handle).await?;
        *self.current.write().await = Some(handle.to_string());
        Ok(())
    }

    async fn new_window(&self, url: &str) -> Result<String> {
        self.ensure_active()?;
        let target = self.cdp_browser.create_target(url).await?;
        info!("Opened window {} at {}", target.target_id, url);
        Ok(target.target_id)
    }

    #[instrument(skip(self), fields(browser = %self.id))]
    async fn close_window(&self) -> Result<()> {
        let handle = self.window_handle().await?;

        let page = self.pages.write().await.remove(&handle);
        if let Some(page) = page {
            page.close().await?;
        }
        self.cdp_browser.close_target(&handle).await?;
        *self.current.write().await = None;

        info!("Closed window {}", handle);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.is_active.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        // Collect first so the lock is not held across awaits
        let pages: Vec<_> = self.pages.write().await.drain().map(|(_, page)| page).collect();
        for page in pages {
            if let Err(e) = page.close().await {
                warn!("Failed to close page {}: {}", page.id(), e);
            }
        }
        *self.current.write().await = None;

        self.cdp_browser.close().await
    }

    fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }
}
