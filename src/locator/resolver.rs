//! First-match-wins resolution over ordered locators

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::descriptor::Locator;
use crate::Result;

/// Whether a query result counts as a match
pub trait Found {
    fn is_found(&self) -> bool;
}

impl Found for bool {
    fn is_found(&self) -> bool {
        *self
    }
}

impl<T> Found for Vec<T> {
    fn is_found(&self) -> bool {
        !self.is_empty()
    }
}

impl<T: Found> Found for Option<T> {
    fn is_found(&self) -> bool {
        self.as_ref().is_some_and(Found::is_found)
    }
}

impl<T: ?Sized> Found for Arc<T> {
    fn is_found(&self) -> bool {
        true
    }
}

/// Try each locator in order and return the first result that is found.
///
/// `query` runs lazily, one locator at a time; later locators are never
/// queried once one succeeds. An error from a single locator is logged and
/// treated as a miss for that locator only. When nothing matches, one
/// aggregate error naming `locator_string` is logged and `None` returned.
/// An empty `locators` slice never invokes `query`.
pub async fn resolve_first<'a, T, F, Fut>(
    locator_string: &str,
    locators: &'a [Locator],
    mut query: F,
) -> Option<T>
where
    T: Found,
    F: FnMut(&'a Locator) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for locator in locators {
        match query(locator).await {
            Ok(result) if result.is_found() => {
                debug!("Resolved '{}' using {}", locator_string, locator);
                return Some(result);
            }
            Ok(_) => debug!("No match for {}", locator),
            Err(e) if e.is_transient() => debug!("No match for {}: {}", locator, e),
            Err(e) => warn!("Query with {} failed: {}", locator, e),
        }
    }

    error!("Unable to resolve locator '{}'", locator_string);
    None
}

/// List form of [`resolve_first`]: the first locator yielding a non-empty
/// list wins outright. Results of different locators are never merged.
pub async fn resolve_all<'a, T, F, Fut>(
    locator_string: &str,
    locators: &'a [Locator],
    query: F,
) -> Vec<T>
where
    F: FnMut(&'a Locator) -> Fut,
    Fut: Future<Output = Result<Vec<T>>>,
{
    resolve_first(locator_string, locators, query)
        .await
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::parse_locator_string;
    use crate::Error;
    use std::cell::RefCell;

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let locators = parse_locator_string("id~a;css~b;xpath~c");
        let seen = RefCell::new(Vec::new());

        let result = resolve_first("id~a;css~b;xpath~c", &locators, |locator| {
            seen.borrow_mut().push(locator.clone());
            let hit = matches!(locator, Locator::Css(_));
            async move { Ok(hit) }
        })
        .await;

        assert_eq!(result, Some(true));
        assert_eq!(*seen.borrow(), vec![Locator::id("a"), Locator::css("b")]);
    }

    #[tokio::test]
    async fn test_error_falls_through_to_next_locator() {
        let locators = vec![Locator::id("a"), Locator::css("b")];

        let result = resolve_first("id~a;css~b", &locators, |locator| {
            let outcome = match locator {
                Locator::Id(_) => Err(Error::cdp("session dropped")),
                _ => Ok(vec!["b-element"]),
            };
            async move { outcome }
        })
        .await;

        assert_eq!(result, Some(vec!["b-element"]));
    }

    #[tokio::test]
    async fn test_empty_locators_never_query() {
        let calls = RefCell::new(0);

        let result = resolve_first("", &[], |_| {
            *calls.borrow_mut() += 1;
            async { Ok(true) }
        })
        .await;

        assert_eq!(result, None);
        assert_eq!(*calls.borrow(), 0);
    }

    #[tokio::test]
    async fn test_resolve_all_does_not_union() {
        let locators = vec![Locator::id("none"), Locator::css("b"), Locator::xpath("c")];

        let result = resolve_all("id~none;css~b;xpath~c", &locators, |locator| {
            let list = match locator {
                Locator::Id(_) => vec![],
                Locator::Css(_) => vec!["b1", "b2"],
                _ => vec!["c1"],
            };
            async move { Ok(list) }
        })
        .await;

        assert_eq!(result, vec!["b1", "b2"]);
    }

    #[tokio::test]
    async fn test_total_miss_returns_sentinel() {
        let locators = vec![Locator::id("a")];
        let result: Vec<u8> = resolve_all("id~a", &locators, |_| async {
            Err(Error::element_not_found("id~a"))
        })
        .await;
        assert!(result.is_empty());
    }

    #[test]
    fn test_found_impls() {
        assert!(true.is_found());
        assert!(!false.is_found());
        assert!(!Vec::<u8>::new().is_found());
        assert!(Some(vec![1]).is_found());
        assert!(!Some(Vec::<u8>::new()).is_found());
        assert!(!None::<bool>.is_found());
        assert!(Arc::new(()).is_found());
    }
}
