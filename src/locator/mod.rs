//! Locator resolution
//!
//! Parses the compact locator-string mini-language (`key~value;key~value`)
//! into typed [`Locator`]s and resolves them first-match-wins.
//!
//! ## Example
//! ```rust
//! use chaser_actions::locator::{parse_locator_string, Locator};
//!
//! let locators = parse_locator_string("xpath~//input[@id='q'];css~input[name='q']");
//! assert_eq!(locators[1], Locator::css("input[name='q']"));
//! ```

pub mod descriptor;
pub mod parser;
pub mod resolver;

pub use descriptor::{Locator, LocatorKind};
pub use parser::{parse_locator_string, to_locator_string};
pub use resolver::{resolve_all, resolve_first, Found};
