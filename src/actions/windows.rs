//! Window switching

use tracing::{debug, warn};

use super::ElementActions;
use crate::{Error, Result};

impl ElementActions {
    /// Handles of every open window; empty on failure
    pub async fn window_handles(&self, step: Option<&str>) -> Vec<String> {
        self.perform(step, "List windows".to_string(), self.browser.window_handles())
            .await
            .unwrap_or_default()
    }

    pub async fn switch_to_window(&self, handle: &str, step: Option<&str>) -> bool {
        self.perform(step, format!("Switch to window {}", handle), self.browser.switch_to_window(handle))
            .await
            .is_some()
    }

    /// First window whose title is `title`. The current window stays
    /// selected when none matches.
    pub async fn switch_to_window_by_title(&self, title: &str, step: Option<&str>) -> bool {
        self.perform(step, format!("Switch to window titled '{}'", title), self.find_window_titled(title))
            .await
            .is_some()
    }

    async fn find_window_titled(&self, title: &str) -> Result<()> {
        let original = self.browser.window_handle().await.ok();

        let outcome = async {
            for handle in self.browser.window_handles().await? {
                self.browser.switch_to_window(&handle).await?;
                let current = self.browser.current_page().await?.title().await?;
                if current == title {
                    return Ok(true);
                }
                debug!("Window {} is titled '{}'", handle, current);
            }
            Ok::<_, Error>(false)
        }
        .await;

        if let Ok(true) = outcome {
            return Ok(());
        }
        if let Some(original) = original {
            if let Err(e) = self.browser.switch_to_window(&original).await {
                warn!("Could not switch back to window {}: {}", original, e);
            }
        }
        outcome.and(Err(Error::no_such_window(format!("titled '{}'", title))))
    }

    /// Wait for a window not in `known_handles` and switch to it
    pub async fn switch_to_new_window(&self, known_handles: &[String], step: Option<&str>) -> Option<String> {
        let wait = &self.wait;
        let browser = &self.browser;
        self.perform(step, "Switch to new window".to_string(), async {
            let handle = wait
                .until("a new window", move || async move {
                    let handles = browser.window_handles().await?;
                    Ok(handles.into_iter().find(|handle| !known_handles.contains(handle)))
                })
                .await?;
            browser.switch_to_window(&handle).await?;
            Ok(handle)
        })
        .await
    }

    /// Close the current window. Switch to another window before the next
    /// page step.
    pub async fn close_current_window(&self, step: Option<&str>) -> bool {
        self.perform(step, "Close current window".to_string(), self.browser.close_window())
            .await
            .is_some()
    }
}
