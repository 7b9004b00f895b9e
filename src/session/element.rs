//! Element reference implementation
//!
//! An element held in the page-side registry, addressed by ref id.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use crate::cdp::types::KeyEventParams;
use crate::locator::Locator;
use crate::session::page::PageSession;
use crate::session::traits::{BoundingBox, ElementHandle, ElementRef, SearchContext, SelectBy};
use crate::{Error, Result};

/// Element reference implementation
#[derive(Debug)]
pub struct ElementRefImpl {
    session: Arc<PageSession>,
    ref_id: String,
}

impl ElementRefImpl {
    pub(crate) fn new(session: Arc<PageSession>, ref_id: String) -> Self {
        Self { session, ref_id }
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, op: &str) -> Result<T> {
        self.session.call(op, &[json!(self.ref_id)]).await
    }

    async fn press_enter(&self) -> Result<()> {
        for down in [true, false] {
            self.session
                .dispatch_input("Input.dispatchKeyEvent", serde_json::to_value(KeyEventParams::enter(down))?)
                .await?;
        }
        Ok(())
    }

    async fn clickable_center(&self) -> Result<crate::session::traits::Point> {
        self.scroll_into_view().await?;
        let bbox = self.get_bounding_box().await?;
        if bbox.width <= 0.0 || bbox.height <= 0.0 {
            return Err(Error::script_execution_failed(format!(
                "Element {} has no size and cannot be clicked",
                self.ref_id
            )));
        }
        Ok(bbox.center())
    }
}

#[async_trait]
impl SearchContext for ElementRefImpl {
    async fn find_element(&self, locator: &Locator) -> Result<ElementHandle> {
        self.find_elements(locator)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::element_not_found(locator.to_string()))
    }

    async fn find_elements(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        self.session.find(&[], Some(&self.ref_id), locator).await
    }
}

#[async_trait]
impl ElementRef for ElementRefImpl {
    fn id(&self) -> &str {
        &self.ref_id
    }

    fn page_id(&self) -> &str {
        &self.session.id
    }

    async fn tag_name(&self) -> Result<String> {
        self.call("tag").await
    }

    async fn get_text(&self) -> Result<String> {
        self.call("text").await
    }

    async fn get_attribute(&self, name: &str) -> Result<Option<String>> {
        self.session.call("attr", &[json!(self.ref_id), json!(name)]).await
    }

    async fn click(&self) -> Result<()> {
        let center = self.clickable_center().await?;
        self.session.click_at(center, 1).await
    }

    async fn double_click(&self) -> Result<()> {
        let center = self.clickable_center().await?;
        self.session.click_at(center, 2).await
    }

    async fn send_keys(&self, text: &str) -> Result<()> {
        self.focus().await?;

        for ch in text.chars() {
            if ch == '\n' {
                self.press_enter().await?;
            } else {
                self.session
                    .dispatch_input("Input.dispatchKeyEvent", serde_json::to_value(KeyEventParams::char(ch))?)
                    .await?;
            }
        }

        Ok(())
    }

    async fn clear(&self) -> Result<()> {
        self.call("clear").await
    }

    async fn focus(&self) -> Result<()> {
        self.call("focus").await
    }

    async fn hover(&self) -> Result<()> {
        let center = self.clickable_center().await?;
        self.session
            .mouse(crate::cdp::types::MouseEventParams::moved(center.x, center.y))
            .await
    }

    async fn scroll_into_view(&self) -> Result<()> {
        self.call("scroll").await
    }

    async fn is_displayed(&self) -> Result<bool> {
        self.call("displayed").await
    }

    async fn is_enabled(&self) -> Result<bool> {
        self.call("enabled").await
    }

    async fn is_selected(&self) -> Result<bool> {
        self.call("selected").await
    }

    async fn get_bounding_box(&self) -> Result<BoundingBox> {
        self.call("box").await
    }

    async fn select_option(&self, by: &SelectBy) -> Result<()> {
        let (kind, value) = match by {
            SelectBy::VisibleText(text) => ("text", json!(text)),
            SelectBy::Value(value) => ("value", json!(value)),
            SelectBy::Index(index) => ("index", json!(index)),
        };
        self.session
            .call("select", &[json!(self.ref_id), json!(kind), value])
            .await
    }

    async fn selected_options(&self) -> Result<Vec<String>> {
        self.call("selectedOptions").await
    }
}
