//! Chaser-Actions: locator-driven browser automation over the Chrome DevTools Protocol
//!
//! Elements are addressed with locator strings such as
//! `id~login;css~form button[type='submit']`. Each descriptor is tried in
//! order and the first one that yields an element wins. The action layer
//! never propagates errors: every step logs, reports and returns a
//! sentinel (`false`, `None` or an empty list).

pub mod error;
pub mod config;

pub mod cdp;
pub mod session;
pub mod locator;
pub mod wait;
pub mod report;
pub mod actions;

// Re-exports
pub use actions::{ElementActions, Target};
pub use config::Config;
pub use error::{Error, Result};
pub use locator::Locator;

/// Chaser-Actions library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
