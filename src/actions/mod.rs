//! # Action layer
//!
//! [`ElementActions`] runs one browser step at a time: locate the target,
//! wait for the state the action needs, act. Every public operation is
//! total. Failures are logged (prefixed with the optional step description)
//! and reported, and the caller gets `false`, `None` or an empty list.
//!
//! ## Example
//! ```rust,no_run
//! use chaser_actions::actions::ElementActions;
//! use chaser_actions::report::Reporter;
//! use chaser_actions::session::{BrowserContext, MockBrowser, MockNode, MockPage};
//! use chaser_actions::Config;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let page = MockPage::new(vec![MockNode::new("input").attr("name", "q")]);
//! let browser: Arc<dyn BrowserContext> = Arc::new(MockBrowser::new(page));
//! let actions = ElementActions::new(browser, Reporter::disabled(), &Config::default());
//!
//! assert!(actions.type_text("xpath~//input[@id='q'];name~q", "rust", true, Some("search")).await);
//! # }
//! ```

mod alerts;
mod find;
mod frames;
mod interact;
pub mod target;
mod windows;


pub use target::Target;

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::config::Config;
use crate::locator::{parse_locator_string, resolve_all, resolve_first};
use crate::report::{ReportStatus, Reporter};
use crate::session::traits::{BrowserContext, ElementHandle, PageContext, ScreenshotFormat, SearchRoot};
use crate::wait::{Query, Wait};
use crate::{Error, Result};

/// Browser steps against one session
#[derive(Debug, Clone)]
pub struct ElementActions {
    browser: Arc<dyn BrowserContext>,
    reporter: Reporter,
    wait: Wait,
}

impl ElementActions {
    pub fn new(browser: Arc<dyn BrowserContext>, reporter: Reporter, config: &Config) -> Self {
        Self {
            browser,
            reporter,
            wait: Wait::from_config(config),
        }
    }

    /// Same session and reporter with different wait timing
    pub fn with_wait(self, wait: Wait) -> Self {
        Self { wait, ..self }
    }

    pub fn browser(&self) -> &Arc<dyn BrowserContext> {
        &self.browser
    }

    pub fn wait(&self) -> &Wait {
        &self.wait
    }

    async fn page(&self) -> Result<Arc<dyn PageContext>> {
        self.browser.current_page().await
    }

    /// Element addressed by `target` under `root`, subject to `query`
    pub(crate) async fn locate(&self, root: SearchRoot<'_>, target: &Target, query: Query) -> Result<ElementHandle> {
        let wait = &self.wait;
        match target {
            Target::Locators(locators) => {
                let parsed = parse_locator_string(locators);
                resolve_first(locators, &parsed, move |locator| query.run(root, locator, wait))
                    .await
                    .ok_or_else(|| Error::element_not_found(locators.clone()))
            }
            Target::Locator(locator) => query.run(root, locator, wait).await,
            Target::Element(element) => query.check(element, wait).await,
        }
    }

    /// Every element addressed by `target` under `root`; no waiting
    pub(crate) async fn locate_all(&self, root: SearchRoot<'_>, target: &Target) -> Result<Vec<ElementHandle>> {
        match target {
            Target::Locators(locators) => {
                let parsed = parse_locator_string(locators);
                Ok(resolve_all(locators, &parsed, move |locator| root.find_elements(locator)).await)
            }
            Target::Locator(locator) => root.find_elements(locator).await,
            Target::Element(element) => Ok(vec![element.clone()]),
        }
    }

    /// Run one step: log it, report it, turn a failure into `None`
    async fn perform<T, Fut>(&self, step: Option<&str>, action: String, step_future: Fut) -> Option<T>
    where
        Fut: Future<Output = Result<T>>,
    {
        let prefix = step.map(|s| format!("[{}] ", s)).unwrap_or_default();
        let step = step.unwrap_or_default();

        match step_future.await {
            Ok(value) => {
                info!("{}{}", prefix, action);
                let screenshot = self.screenshot_for(ReportStatus::Pass).await;
                self.reporter.pass(step, &action, screenshot).await;
                Some(value)
            }
            Err(e) => {
                error!("{}{} failed: {}", prefix, action, e);
                let screenshot = self.screenshot_for(ReportStatus::Fail).await;
                self.reporter.fail(step, &action, &e, screenshot).await;
                None
            }
        }
    }

    /// Screenshot for the report, if one is wanted and can be taken
    async fn screenshot_for(&self, status: ReportStatus) -> Option<Vec<u8>> {
        if !self.reporter.options().wants_screenshot(status) {
            return None;
        }
        let shot = match self.page().await {
            Ok(page) => page.screenshot(ScreenshotFormat::Png).await,
            Err(e) => Err(e),
        };
        shot.map_err(|e| warn!("Could not capture screenshot for report: {}", e))
            .ok()
    }
}
