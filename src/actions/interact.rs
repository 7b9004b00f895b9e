//! Element interaction, element reads and page-level steps

use super::{ElementActions, Target};
use crate::session::traits::{ElementHandle, ScreenshotFormat, SearchRoot, SelectBy};
use crate::wait::Query;
use crate::{Error, Result};

impl ElementActions {
    /// Element addressed by `target` in the current page
    async fn element(&self, target: &Target, query: Query) -> Result<ElementHandle> {
        let page = self.page().await?;
        self.locate(SearchRoot::Page(page.as_ref()), target, query).await
    }

    pub async fn click(&self, target: impl Into<Target>, step: Option<&str>) -> bool {
        let target = target.into();
        self.perform(step, format!("Click {}", target), async {
            self.element(&target, Query::Clickable).await?.click().await
        })
        .await
        .is_some()
    }

    pub async fn double_click(&self, target: impl Into<Target>, step: Option<&str>) -> bool {
        let target = target.into();
        self.perform(step, format!("Double-click {}", target), async {
            self.element(&target, Query::Clickable).await?.double_click().await
        })
        .await
        .is_some()
    }

    pub async fn hover(&self, target: impl Into<Target>, step: Option<&str>) -> bool {
        let target = target.into();
        self.perform(step, format!("Hover over {}", target), async {
            self.element(&target, Query::Visibility).await?.hover().await
        })
        .await
        .is_some()
    }

    /// Type `text` into the element, emptying it first when `clear_first`
    pub async fn type_text(&self, target: impl Into<Target>, text: &str, clear_first: bool, step: Option<&str>) -> bool {
        let target = target.into();
        self.perform(step, format!("Type '{}' into {}", text, target), async {
            let element = self.element(&target, Query::Visibility).await?;
            if clear_first {
                element.clear().await?;
            }
            element.send_keys(text).await
        })
        .await
        .is_some()
    }

    pub async fn clear(&self, target: impl Into<Target>, step: Option<&str>) -> bool {
        let target = target.into();
        self.perform(step, format!("Clear {}", target), async {
            self.element(&target, Query::Visibility).await?.clear().await
        })
        .await
        .is_some()
    }

    pub async fn select_by_visible_text(&self, target: impl Into<Target>, text: &str, step: Option<&str>) -> bool {
        self.select(target.into(), SelectBy::VisibleText(text.to_string()), step).await
    }

    pub async fn select_by_value(&self, target: impl Into<Target>, value: &str, step: Option<&str>) -> bool {
        self.select(target.into(), SelectBy::Value(value.to_string()), step).await
    }

    pub async fn select_by_index(&self, target: impl Into<Target>, index: usize, step: Option<&str>) -> bool {
        self.select(target.into(), SelectBy::Index(index), step).await
    }

    async fn select(&self, target: Target, by: SelectBy, step: Option<&str>) -> bool {
        self.perform(step, format!("Select option with {} in {}", by, target), async {
            self.element(&target, Query::Visibility).await?.select_option(&by).await
        })
        .await
        .is_some()
    }

    /// Press on `source`, move to `destination`, release
    pub async fn drag_and_drop(
        &self,
        source: impl Into<Target>,
        destination: impl Into<Target>,
        step: Option<&str>,
    ) -> bool {
        let source = source.into();
        let destination = destination.into();
        self.perform(step, format!("Drag {} onto {}", source, destination), async {
            let page = self.page().await?;
            let root = SearchRoot::Page(page.as_ref());
            let from = self.locate(root, &source, Query::Visibility).await?;
            let to = self.locate(root, &destination, Query::Visibility).await?;

            from.scroll_into_view().await?;
            let start = from.get_bounding_box().await?.center();
            let end = to.get_bounding_box().await?.center();
            page.drag(start, end).await
        })
        .await
        .is_some()
    }

    pub async fn scroll_into_view(&self, target: impl Into<Target>, step: Option<&str>) -> bool {
        let target = target.into();
        self.perform(step, format!("Scroll {} into view", target), async {
            self.element(&target, Query::Presence).await?.scroll_into_view().await
        })
        .await
        .is_some()
    }

    /// Rendered text of the element
    pub async fn get_text(&self, target: impl Into<Target>, step: Option<&str>) -> Option<String> {
        let target = target.into();
        self.perform(step, format!("Read text of {}", target), async {
            self.element(&target, Query::Presence).await?.get_text().await
        })
        .await
    }

    /// Attribute of the element; `None` also when it is not set
    pub async fn get_attribute(&self, target: impl Into<Target>, name: &str, step: Option<&str>) -> Option<String> {
        let target = target.into();
        self.perform(step, format!("Read {} of {}", name, target), async {
            self.element(&target, Query::Presence).await?.get_attribute(name).await
        })
        .await
        .flatten()
    }

    /// Whether the element is displayed right now; `false` when absent
    pub async fn is_displayed(&self, target: impl Into<Target>, step: Option<&str>) -> bool {
        let target = target.into();
        self.perform(step, format!("Check that {} is displayed", target), async {
            self.element(&target, Query::Immediate).await?.is_displayed().await
        })
        .await
        .unwrap_or(false)
    }

    /// Text of the first selected option of a `<select>`
    pub async fn selected_option_text(&self, target: impl Into<Target>, step: Option<&str>) -> Option<String> {
        let target = target.into();
        self.perform(step, format!("Read selected option of {}", target), async {
            self.element(&target, Query::Presence)
                .await?
                .selected_options()
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| Error::element_not_found(format!("selected option in {}", target)))
        })
        .await
    }

    pub async fn navigate(&self, url: &str, step: Option<&str>) -> bool {
        self.perform(step, format!("Open {}", url), async {
            let page = self.page().await?;
            page.navigate(url).await
        })
        .await
        .is_some()
    }

    /// PNG screenshot of the current page
    pub async fn take_screenshot(&self, step: Option<&str>) -> Option<Vec<u8>> {
        self.perform(step, "Take screenshot".to_string(), async {
            let page = self.page().await?;
            page.screenshot(ScreenshotFormat::Png).await
        })
        .await
    }
}
