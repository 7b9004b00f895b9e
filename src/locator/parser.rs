//! Locator-string parsing
//!
//! A locator string is an ordered, `;`-separated list of `key~value` pairs:
//! `xpath~//div[@id='x'];css~.some-class`. Order is fallback priority.

use tracing::{debug, error};

use super::descriptor::{Locator, LocatorKind};

/// Parse a locator string into descriptors, keeping input order.
///
/// Blank segments are skipped. A segment without `~` (or with an empty
/// selector) and a segment with an unknown key are logged and dropped on
/// their own; the remaining pairs still parse. An empty result is logged
/// against the whole input and callers treat it as "not found".
pub fn parse_locator_string(input: &str) -> Vec<Locator> {
    let locators: Vec<Locator> = input
        .split(';')
        .filter(|segment| !segment.trim().is_empty())
        .filter_map(parse_segment)
        .collect();

    if locators.is_empty() {
        error!("No valid locator in locator string '{}'", input);
    } else {
        debug!("Parsed {} locator(s) from '{}'", locators.len(), input);
    }

    locators
}

/// Render descriptors back into locator-string form
pub fn to_locator_string(locators: &[Locator]) -> String {
    locators
        .iter()
        .map(Locator::to_string)
        .collect::<Vec<_>>()
        .join(";")
}

fn parse_segment(segment: &str) -> Option<Locator> {
    let Some((key, value)) = segment.split_once('~').filter(|(_, value)| !value.is_empty()) else {
        error!("Malformed locator segment '{}': expected key~value", segment);
        return None;
    };

    match LocatorKind::from_key(key) {
        Some(kind) => Some(kind.with(value)),
        None => {
            error!("Unknown locator key '{}' in segment '{}'", key, segment);
            None
        }
    }
}
