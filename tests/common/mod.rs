//! Common test utilities
//!
//! Shared fixtures for the integration tests: an in-memory login page and an
//! action layer wired to a memory report sink.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chaser_actions::report::{MemoryReportSink, ReportOptions, Reporter};
use chaser_actions::session::{DialogKind, MockBrowser, MockNode, MockPage};
use chaser_actions::wait::Wait;
use chaser_actions::{Config, ElementActions};

pub const LOGIN_URL: &str = "https://app.example/login";
pub const HOME_URL: &str = "https://app.example/home";

/// Short waits so timeouts resolve quickly
pub fn quick_wait() -> Wait {
    Wait::new(Duration::from_millis(300)).with_poll_interval(Duration::from_millis(20))
}

/// Login form with a remember-me checkbox and a terms dialog
pub fn login_page() -> MockPage {
    MockPage::at(
        LOGIN_URL,
        vec![
            MockNode::new("h1").text("Sign in"),
            MockNode::new("form").id("login").children([
                MockNode::new("input").attr("name", "user").attr("type", "text"),
                MockNode::new("input").attr("name", "password").attr("type", "password"),
                MockNode::new("input").id("remember").attr("type", "checkbox"),
                MockNode::new("select").id("region").children([
                    MockNode::new("option").attr("value", "eu").text("Europe").selected(),
                    MockNode::new("option").attr("value", "us").text("United States"),
                ]),
                MockNode::new("button").attr("type", "submit").text("Sign in"),
            ]),
            MockNode::new("a")
                .id("terms")
                .text("Terms of use")
                .opens_dialog(DialogKind::Confirm, "Open the terms in a new window?"),
            MockNode::new("div").id("flash").text("Session expired").hidden(),
        ],
    )
}

/// Landing page reached after signing in
pub fn home_page() -> Vec<MockNode> {
    vec![
        MockNode::new("nav").children([
            MockNode::new("a").class("menu").text("Dashboard"),
            MockNode::new("a").class("menu").text("Reports"),
            MockNode::new("a").class("menu").text("Settings"),
        ]),
        MockNode::new("iframe")
            .attr("name", "inbox")
            .frame_content([MockNode::new("p").id("unread").text("3 unread")]),
    ]
}

pub struct Session {
    pub page: MockPage,
    pub browser: Arc<MockBrowser>,
    pub sink: Arc<MemoryReportSink>,
    pub actions: ElementActions,
}

/// Action layer over `page`, reporting into memory without screenshots
pub fn session_on(page: MockPage) -> Session {
    let browser = Arc::new(MockBrowser::new(page.clone()));
    let sink = Arc::new(MemoryReportSink::new());
    let options = ReportOptions {
        enabled: true,
        screenshot_on_success: false,
        screenshot_on_failure: false,
    };
    let actions = ElementActions::new(browser.clone(), Reporter::new(sink.clone(), options), &Config::default())
        .with_wait(quick_wait());

    Session {
        page,
        browser,
        sink,
        actions,
    }
}
