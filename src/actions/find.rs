//! Lookups and waits

use super::{ElementActions, Target};
use crate::locator::{parse_locator_string, resolve_first};
use crate::session::traits::{ElementHandle, SearchRoot};
use crate::wait::{attribute_contains, attribute_is, element_invisible, invisibility_of, text_present, Query};
use crate::Error;

impl ElementActions {
    /// Element addressed by `target`, located with `query`
    pub async fn find_element(
        &self,
        target: impl Into<Target>,
        query: Query,
        step: Option<&str>,
    ) -> Option<ElementHandle> {
        let target = target.into();
        self.perform(step, format!("Find {}", target), async {
            let page = self.page().await?;
            self.locate(SearchRoot::Page(page.as_ref()), &target, query).await
        })
        .await
    }

    /// Every element addressed by `target`; empty when none matched
    pub async fn find_elements(&self, target: impl Into<Target>, step: Option<&str>) -> Vec<ElementHandle> {
        let target = target.into();
        self.perform(step, format!("Find all {}", target), async {
            let page = self.page().await?;
            let elements = self.locate_all(SearchRoot::Page(page.as_ref()), &target).await?;
            if elements.is_empty() {
                return Err(Error::element_not_found(target.to_string()));
            }
            Ok(elements)
        })
        .await
        .unwrap_or_default()
    }

    /// Descendant of `parent` addressed by `target`
    pub async fn find_child(
        &self,
        parent: &ElementHandle,
        target: impl Into<Target>,
        step: Option<&str>,
    ) -> Option<ElementHandle> {
        let target = target.into();
        self.perform(step, format!("Find {} in {}", target, parent.id()), async {
            self.locate(SearchRoot::Element(parent.as_ref()), &target, Query::Immediate)
                .await
        })
        .await
    }

    /// Descendants of `parent` addressed by `target`
    pub async fn find_children(
        &self,
        parent: &ElementHandle,
        target: impl Into<Target>,
        step: Option<&str>,
    ) -> Vec<ElementHandle> {
        let target = target.into();
        self.perform(step, format!("Find all {} in {}", target, parent.id()), async {
            let elements = self.locate_all(SearchRoot::Element(parent.as_ref()), &target).await?;
            if elements.is_empty() {
                return Err(Error::element_not_found(target.to_string()));
            }
            Ok(elements)
        })
        .await
        .unwrap_or_default()
    }

    pub async fn wait_for_presence(&self, target: impl Into<Target>, step: Option<&str>) -> Option<ElementHandle> {
        self.wait_for(target.into(), Query::Presence, "present", step).await
    }

    pub async fn wait_for_visibility(&self, target: impl Into<Target>, step: Option<&str>) -> Option<ElementHandle> {
        self.wait_for(target.into(), Query::Visibility, "visible", step).await
    }

    pub async fn wait_for_clickable(&self, target: impl Into<Target>, step: Option<&str>) -> Option<ElementHandle> {
        self.wait_for(target.into(), Query::Clickable, "clickable", step).await
    }

    async fn wait_for(&self, target: Target, query: Query, state: &str, step: Option<&str>) -> Option<ElementHandle> {
        self.perform(step, format!("Wait for {} to be {}", target, state), async {
            let page = self.page().await?;
            self.locate(SearchRoot::Page(page.as_ref()), &target, query).await
        })
        .await
    }

    /// Wait until no element addressed by `target` is displayed
    pub async fn wait_for_invisibility(&self, target: impl Into<Target>, step: Option<&str>) -> bool {
        let target = target.into();
        let wait = &self.wait;
        self.perform(step, format!("Wait for {} to be invisible", target), async {
            let page = self.page().await?;
            let root = SearchRoot::Page(page.as_ref());
            match &target {
                Target::Locators(locators) => {
                    let parsed = parse_locator_string(locators);
                    resolve_first(locators, &parsed, move |locator| async move {
                        wait.until(&format!("invisibility of {}", locator), move || invisibility_of(root, locator))
                            .await
                    })
                    .await
                    .ok_or_else(|| Error::timeout(format!("{} is still displayed", locators)))
                }
                Target::Locator(locator) => {
                    wait.until(&format!("invisibility of {}", locator), move || invisibility_of(root, locator))
                        .await
                }
                Target::Element(element) => {
                    let element = element.as_ref();
                    wait.until(&format!("invisibility of {}", element.id()), move || {
                        element_invisible(element)
                    })
                    .await
                }
            }
        })
        .await
        .unwrap_or(false)
    }

    /// Wait until attribute `name` of the element equals `value`
    pub async fn wait_for_attribute(
        &self,
        target: impl Into<Target>,
        name: &str,
        value: &str,
        step: Option<&str>,
    ) -> bool {
        let target = target.into();
        let wait = &self.wait;
        self.perform(step, format!("Wait for {} of {} to be '{}'", name, target, value), async {
            let page = self.page().await?;
            let element = self.locate(SearchRoot::Page(page.as_ref()), &target, Query::Presence).await?;
            let element = element.as_ref();
            wait.until(&format!("{} of {} to be '{}'", name, element.id(), value), move || {
                attribute_is(element, name, value)
            })
            .await
        })
        .await
        .is_some()
    }

    /// Wait until attribute `name` of the element contains `fragment`
    pub async fn wait_for_attribute_contains(
        &self,
        target: impl Into<Target>,
        name: &str,
        fragment: &str,
        step: Option<&str>,
    ) -> bool {
        let target = target.into();
        let wait = &self.wait;
        self.perform(step, format!("Wait for {} of {} to contain '{}'", name, target, fragment), async {
            let page = self.page().await?;
            let element = self.locate(SearchRoot::Page(page.as_ref()), &target, Query::Presence).await?;
            let element = element.as_ref();
            wait.until(&format!("{} of {} to contain '{}'", name, element.id(), fragment), move || {
                attribute_contains(element, name, fragment)
            })
            .await
        })
        .await
        .is_some()
    }

    /// Wait until the rendered text of the element contains `text`
    pub async fn wait_for_text(&self, target: impl Into<Target>, text: &str, step: Option<&str>) -> bool {
        let target = target.into();
        let wait = &self.wait;
        self.perform(step, format!("Wait for text '{}' in {}", text, target), async {
            let page = self.page().await?;
            let element = self.locate(SearchRoot::Page(page.as_ref()), &target, Query::Presence).await?;
            let element = element.as_ref();
            wait.until(&format!("text '{}' in {}", text, element.id()), move || {
                text_present(element, text)
            })
            .await
        })
        .await
        .is_some()
    }
}
