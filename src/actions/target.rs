//! What an action operates on

use std::fmt;

use crate::locator::Locator;
use crate::session::traits::ElementHandle;

/// Element addressing accepted by every element action
#[derive(Debug, Clone)]
pub enum Target {
    /// Locator string (`key~value;key~value`), resolved first-match-wins
    Locators(String),
    /// A single typed locator
    Locator(Locator),
    /// An element found earlier
    Element(ElementHandle),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Locators(locators) => write!(f, "{}", locators),
            Target::Locator(locator) => write!(f, "{}", locator),
            Target::Element(element) => write!(f, "element {}", element.id()),
        }
    }
}

impl From<&str> for Target {
    fn from(locators: &str) -> Self {
        Target::Locators(locators.to_string())
    }
}

impl From<String> for Target {
    fn from(locators: String) -> Self {
        Target::Locators(locators)
    }
}

impl From<Locator> for Target {
    fn from(locator: Locator) -> Self {
        Target::Locator(locator)
    }
}

impl From<ElementHandle> for Target {
    fn from(element: ElementHandle) -> Self {
        Target::Element(element)
    }
}

impl From<&ElementHandle> for Target {
    fn from(element: &ElementHandle) -> Self {
        Target::Element(element.clone())
    }
}
