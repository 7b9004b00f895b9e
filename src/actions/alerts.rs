//! JavaScript dialogs

use std::time::Duration;

use super::ElementActions;
use crate::session::traits::{DialogInfo, PageContext};
use crate::wait::{alert_present, Wait};
use crate::Result;

impl ElementActions {
    async fn await_alert(&self, page: &dyn PageContext, wait: &Wait) -> Result<DialogInfo> {
        wait.until("an alert", move || alert_present(page)).await
    }

    /// Whether a dialog opens within `timeout`
    pub async fn is_alert_present(&self, timeout: Duration, step: Option<&str>) -> bool {
        let wait = self.wait.with_timeout(timeout);
        self.perform(step, "Check for alert".to_string(), async {
            let page = self.page().await?;
            self.await_alert(page.as_ref(), &wait).await
        })
        .await
        .is_some()
    }

    pub async fn accept_alert(&self, step: Option<&str>) -> bool {
        self.perform(step, "Accept alert".to_string(), async {
            let page = self.page().await?;
            self.await_alert(page.as_ref(), &self.wait).await?;
            page.handle_dialog(true, None).await
        })
        .await
        .is_some()
    }

    pub async fn dismiss_alert(&self, step: Option<&str>) -> bool {
        self.perform(step, "Dismiss alert".to_string(), async {
            let page = self.page().await?;
            self.await_alert(page.as_ref(), &self.wait).await?;
            page.handle_dialog(false, None).await
        })
        .await
        .is_some()
    }

    /// Message of the open dialog
    pub async fn get_alert_text(&self, step: Option<&str>) -> Option<String> {
        self.perform(step, "Read alert text".to_string(), async {
            let page = self.page().await?;
            Ok(self.await_alert(page.as_ref(), &self.wait).await?.message)
        })
        .await
    }

    /// Answer a prompt with `text`. Prompt text can only be delivered with
    /// the answer, so this also accepts the dialog.
    pub async fn send_keys_to_alert(&self, text: &str, step: Option<&str>) -> bool {
        self.perform(step, format!("Answer alert with '{}'", text), async {
            let page = self.page().await?;
            self.await_alert(page.as_ref(), &self.wait).await?;
            page.handle_dialog(true, Some(text)).await
        })
        .await
        .is_some()
    }
}
