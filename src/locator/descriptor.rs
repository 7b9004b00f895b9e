//! Typed locator descriptors

use phf::phf_map;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Location strategy without its selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocatorKind {
    XPath,
    ClassName,
    Name,
    Id,
    Css,
    TagName,
    LinkText,
    PartialLinkText,
}

/// Locator-string keys, matched exactly
static LOCATOR_KEYS: phf::Map<&'static str, LocatorKind> = phf_map! {
    "xpath" => LocatorKind::XPath,
    "className" => LocatorKind::ClassName,
    "name" => LocatorKind::Name,
    "id" => LocatorKind::Id,
    "css" => LocatorKind::Css,
    "tagName" => LocatorKind::TagName,
    "linkText" => LocatorKind::LinkText,
    "partialLinkText" => LocatorKind::PartialLinkText,
};

impl LocatorKind {
    /// Look up a strategy by its locator-string key
    pub fn from_key(key: &str) -> Option<Self> {
        LOCATOR_KEYS.get(key).copied()
    }

    /// Key used in the locator-string form
    pub const fn key(self) -> &'static str {
        match self {
            LocatorKind::XPath => "xpath",
            LocatorKind::ClassName => "className",
            LocatorKind::Name => "name",
            LocatorKind::Id => "id",
            LocatorKind::Css => "css",
            LocatorKind::TagName => "tagName",
            LocatorKind::LinkText => "linkText",
            LocatorKind::PartialLinkText => "partialLinkText",
        }
    }

    /// Attach a selector to this strategy
    pub fn with<S: Into<String>>(self, selector: S) -> Locator {
        let selector = selector.into();
        match self {
            LocatorKind::XPath => Locator::XPath(selector),
            LocatorKind::ClassName => Locator::ClassName(selector),
            LocatorKind::Name => Locator::Name(selector),
            LocatorKind::Id => Locator::Id(selector),
            LocatorKind::Css => Locator::Css(selector),
            LocatorKind::TagName => Locator::TagName(selector),
            LocatorKind::LinkText => Locator::LinkText(selector),
            LocatorKind::PartialLinkText => Locator::PartialLinkText(selector),
        }
    }
}

/// A single way of finding DOM nodes: a strategy plus its selector
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "using", content = "value", rename_all = "camelCase")]
pub enum Locator {
    #[serde(rename = "xpath")]
    XPath(String),
    ClassName(String),
    Name(String),
    Id(String),
    Css(String),
    TagName(String),
    LinkText(String),
    PartialLinkText(String),
}

impl Locator {
    pub fn xpath<S: Into<String>>(selector: S) -> Self {
        Locator::XPath(selector.into())
    }

    pub fn class_name<S: Into<String>>(selector: S) -> Self {
        Locator::ClassName(selector.into())
    }

    pub fn name<S: Into<String>>(selector: S) -> Self {
        Locator::Name(selector.into())
    }

    pub fn id<S: Into<String>>(selector: S) -> Self {
        Locator::Id(selector.into())
    }

    pub fn css<S: Into<String>>(selector: S) -> Self {
        Locator::Css(selector.into())
    }

    pub fn tag_name<S: Into<String>>(selector: S) -> Self {
        Locator::TagName(selector.into())
    }

    pub fn link_text<S: Into<String>>(selector: S) -> Self {
        Locator::LinkText(selector.into())
    }

    pub fn partial_link_text<S: Into<String>>(selector: S) -> Self {
        Locator::PartialLinkText(selector.into())
    }

    /// Strategy of this locator
    pub fn kind(&self) -> LocatorKind {
        match self {
            Locator::XPath(_) => LocatorKind::XPath,
            Locator::ClassName(_) => LocatorKind::ClassName,
            Locator::Name(_) => LocatorKind::Name,
            Locator::Id(_) => LocatorKind::Id,
            Locator::Css(_) => LocatorKind::Css,
            Locator::TagName(_) => LocatorKind::TagName,
            Locator::LinkText(_) => LocatorKind::LinkText,
            Locator::PartialLinkText(_) => LocatorKind::PartialLinkText,
        }
    }

    /// Selector expression
    pub fn value(&self) -> &str {
        match self {
            Locator::XPath(v)
            | Locator::ClassName(v)
            | Locator::Name(v)
            | Locator::Id(v)
            | Locator::Css(v)
            | Locator::TagName(v)
            | Locator::LinkText(v)
            | Locator::PartialLinkText(v) => v,
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}~{}", self.kind().key(), self.value())
    }
}

/// Strict parse of one `key~value` pair.
///
/// Unlike [`parse_locator_string`](super::parse_locator_string) this reports
/// the problem instead of dropping the pair.
impl FromStr for Locator {
    type Err = Error;

    fn from_str(pair: &str) -> Result<Self, Self::Err> {
        let (key, value) = pair
            .split_once('~')
            .filter(|(_, value)| !value.is_empty())
            .ok_or_else(|| {
                Error::invalid_selector(format!("malformed locator '{}': expected key~value", pair))
            })?;

        LocatorKind::from_key(key)
            .map(|kind| kind.with(value))
            .ok_or_else(|| {
                Error::invalid_selector(format!("unknown locator key '{}' in '{}'", key, pair))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_round_trips_through_kind() {
        for key in [
            "xpath",
            "className",
            "name",
            "id",
            "css",
            "tagName",
            "linkText",
            "partialLinkText",
        ] {
            let kind = LocatorKind::from_key(key).unwrap();
            assert_eq!(kind.key(), key);
        }
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        assert_eq!(LocatorKind::from_key("XPath"), None);
        assert_eq!(LocatorKind::from_key("classname"), None);
        assert_eq!(LocatorKind::from_key("cssSelector"), None);
        assert_eq!(LocatorKind::from_key(" id"), None);
    }

    #[test]
    fn test_display_uses_locator_string_form() {
        let locator = Locator::xpath("//div[@id='x']");
        assert_eq!(locator.to_string(), "xpath~//div[@id='x']");
        assert_eq!(Locator::class_name("btn").to_string(), "className~btn");
    }

    #[test]
    fn test_from_str_splits_on_first_tilde_only() {
        let locator: Locator = "css~a[title~='x']".parse().unwrap();
        assert_eq!(locator, Locator::css("a[title~='x']"));
    }

    #[test]
    fn test_from_str_rejects_bad_pairs() {
        assert!("bogus".parse::<Locator>().is_err());
        assert!("id~".parse::<Locator>().is_err());
        assert!("foo~bar".parse::<Locator>().is_err());
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_value(Locator::partial_link_text("More")).unwrap();
        assert_eq!(json, serde_json::json!({ "using": "partialLinkText", "value": "More" }));

        let locator: Locator =
            serde_json::from_value(serde_json::json!({ "using": "xpath", "value": "//a" })).unwrap();
        assert_eq!(locator, Locator::xpath("//a"));
    }
}
