//! Explicit waits
//!
//! [`Wait`] polls an async probe until it yields a value or the timeout
//! passes. The functions in this module are the probes: each checks one DOM
//! condition once. [`Query`] bundles the element probes into the lookup kinds
//! the action layer hands to the locator resolver.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::trace;

use crate::config::Config;
use crate::locator::Locator;
use crate::session::traits::{DialogInfo, ElementHandle, ElementRef, FrameTarget, PageContext, SearchRoot};
use crate::{Error, Result};

/// Interval between probes unless configured otherwise
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Polling wait with a timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wait {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Wait {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Wait {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.default_timeout(),
            poll_interval: config.poll_interval(),
        }
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self { timeout, ..self }
    }

    pub fn with_poll_interval(self, poll_interval: Duration) -> Self {
        Self { poll_interval, ..self }
    }

    /// Poll `probe` until it returns `Ok(Some(_))`.
    ///
    /// `Ok(None)` and transient errors (see [`Error::is_transient`]) keep
    /// polling; any other error is returned at once. The probe always runs at
    /// least once and runs one last time after the deadline has passed.
    /// `what` names the condition in the timeout error.
    pub async fn until<T, F, Fut>(&self, what: &str, mut probe: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        // Timeouts too large for an `Instant` never expire
        let deadline = Instant::now().checked_add(self.timeout);
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match probe().await {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => trace!("Waiting for {} (attempt {})", what, attempts),
                Err(e) if e.is_transient() => trace!("Waiting for {} (attempt {}): {}", what, attempts, e),
                Err(e) => return Err(e),
            }

            let pause = match deadline {
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(Error::timeout(format!(
                            "Timed out after {}ms waiting for {}",
                            self.timeout.as_millis(),
                            what
                        )));
                    }
                    self.poll_interval.min(deadline - now)
                }
                None => self.poll_interval,
            };
            sleep(pause).await;
        }
    }
}

/// How the action layer looks up an element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Query {
    /// Look once, no waiting
    #[default]
    Immediate,
    /// Wait until the element is in the DOM
    Presence,
    /// Wait until the element is in the DOM and displayed
    Visibility,
    /// Wait until the element is displayed and enabled
    Clickable,
}

impl Query {
    /// Look `locator` up under `root`
    pub async fn run(self, root: SearchRoot<'_>, locator: &Locator, wait: &Wait) -> Result<ElementHandle> {
        match self {
            Query::Immediate => root.find_element(locator).await,
            Query::Presence => {
                wait.until(&format!("presence of {}", locator), move || presence_of(root, locator))
                    .await
            }
            Query::Visibility => {
                wait.until(&format!("visibility of {}", locator), move || visibility_of(root, locator))
                    .await
            }
            Query::Clickable => {
                wait.until(&format!("{} to be clickable", locator), move || clickability_of(root, locator))
                    .await
            }
        }
    }

    /// Apply the same condition to an element found earlier
    pub async fn check(self, element: &ElementHandle, wait: &Wait) -> Result<ElementHandle> {
        let target: &dyn ElementRef = element.as_ref();
        match self {
            Query::Immediate | Query::Presence => {
                // Touch the element so a detached one is reported
                target.tag_name().await?;
            }
            Query::Visibility => {
                wait.until(&format!("visibility of {}", target.id()), move || element_visible(target))
                    .await?;
            }
            Query::Clickable => {
                wait.until(&format!("{} to be clickable", target.id()), move || element_clickable(target))
                    .await?;
            }
        }
        Ok(element.clone())
    }
}

/// First matching element
pub async fn presence_of(root: SearchRoot<'_>, locator: &Locator) -> Result<Option<ElementHandle>> {
    Ok(root.find_elements(locator).await?.into_iter().next())
}

/// First matching element that is displayed
pub async fn visibility_of(root: SearchRoot<'_>, locator: &Locator) -> Result<Option<ElementHandle>> {
    for element in root.find_elements(locator).await? {
        if element.is_displayed().await? {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

/// First matching element that is displayed and enabled
pub async fn clickability_of(root: SearchRoot<'_>, locator: &Locator) -> Result<Option<ElementHandle>> {
    for element in root.find_elements(locator).await? {
        if element_clickable(element.as_ref()).await?.is_some() {
            return Ok(Some(element));
        }
    }
    Ok(None)
}

/// `Some(true)` once no matching element is displayed; absence counts
pub async fn invisibility_of(root: SearchRoot<'_>, locator: &Locator) -> Result<Option<bool>> {
    for element in root.find_elements(locator).await? {
        match element.is_displayed().await {
            Ok(true) => return Ok(None),
            Ok(false) | Err(Error::StaleElement(_)) => {}
            Err(e) => return Err(e),
        }
    }
    Ok(Some(true))
}

pub async fn element_visible(element: &dyn ElementRef) -> Result<Option<()>> {
    Ok(element.is_displayed().await?.then_some(()))
}

pub async fn element_clickable(element: &dyn ElementRef) -> Result<Option<()>> {
    let clickable = element.is_displayed().await? && element.is_enabled().await?;
    Ok(clickable.then_some(()))
}

/// `Some(true)` once the element is hidden or gone from the document
pub async fn element_invisible(element: &dyn ElementRef) -> Result<Option<bool>> {
    match element.is_displayed().await {
        Ok(true) => Ok(None),
        Ok(false) | Err(Error::StaleElement(_)) => Ok(Some(true)),
        Err(e) => Err(e),
    }
}

/// Attribute equals `expected`
pub async fn attribute_is(element: &dyn ElementRef, name: &str, expected: &str) -> Result<Option<String>> {
    Ok(element
        .get_attribute(name)
        .await?
        .filter(|value| value == expected))
}

/// Attribute contains `fragment`
pub async fn attribute_contains(element: &dyn ElementRef, name: &str, fragment: &str) -> Result<Option<String>> {
    Ok(element
        .get_attribute(name)
        .await?
        .filter(|value| value.contains(fragment)))
}

/// Rendered text contains `text`
pub async fn text_present(element: &dyn ElementRef, text: &str) -> Result<Option<String>> {
    let rendered = element.get_text().await?;
    Ok(rendered.contains(text).then_some(rendered))
}

/// The open dialog
pub async fn alert_present(page: &dyn PageContext) -> Result<Option<DialogInfo>> {
    page.dialog().await
}

/// Switch into the frame as soon as it exists
pub async fn frame_available_and_switch(page: &dyn PageContext, target: &FrameTarget) -> Result<Option<()>> {
    page.switch_to_frame(target.clone()).await.map(Some)
}
