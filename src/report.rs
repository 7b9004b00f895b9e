//! Step reporting
//!
//! The action layer reports the outcome of every step through a
//! [`Reporter`]. Where the events end up is decided by the [`ReportSink`]:
//! the tracing log, an in-memory list, or a sink of the caller's own.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::config::Config;

/// Outcome of a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportStatus {
    Pass,
    Fail,
    Info,
}

impl std::fmt::Display for ReportStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReportStatus::Pass => write!(f, "PASS"),
            ReportStatus::Fail => write!(f, "FAIL"),
            ReportStatus::Info => write!(f, "INFO"),
        }
    }
}

/// One reported step
#[derive(Debug, Clone)]
pub struct ReportEvent {
    pub status: ReportStatus,
    /// Step description given by the caller, empty when none was
    pub step: String,
    pub message: String,
    /// PNG screenshot taken when the step finished
    pub screenshot: Option<Vec<u8>>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ReportEvent {
    pub fn new(status: ReportStatus, step: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            step: step.into(),
            message: message.into(),
            screenshot: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_screenshot(mut self, screenshot: Vec<u8>) -> Self {
        self.screenshot = Some(screenshot);
        self
    }

    /// Screenshot encoded for embedding, e.g. as a `data:image/png` URL
    pub fn screenshot_base64(&self) -> Option<String> {
        self.screenshot.as_ref().map(|png| STANDARD.encode(png))
    }
}

/// Destination of report events
#[async_trait]
pub trait ReportSink: Send + Sync + std::fmt::Debug {
    async fn record(&self, event: ReportEvent);
}

/// Which events are reported and when screenshots are attached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub enabled: bool,
    pub screenshot_on_success: bool,
    pub screenshot_on_failure: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl ReportOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            enabled: config.reporting_enabled,
            screenshot_on_success: config.screenshot_on_success,
            screenshot_on_failure: config.screenshot_on_failure,
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            screenshot_on_success: false,
            screenshot_on_failure: false,
        }
    }

    /// Whether a step with this outcome wants a screenshot
    pub fn wants_screenshot(&self, status: ReportStatus) -> bool {
        self.enabled
            && match status {
                ReportStatus::Pass => self.screenshot_on_success,
                ReportStatus::Fail => self.screenshot_on_failure,
                ReportStatus::Info => false,
            }
    }
}

/// Sink plus options
#[derive(Debug, Clone)]
pub struct Reporter {
    sink: Arc<dyn ReportSink>,
    options: ReportOptions,
}

impl Reporter {
    pub fn new(sink: Arc<dyn ReportSink>, options: ReportOptions) -> Self {
        Self { sink, options }
    }

    /// Reporter that records nothing
    pub fn disabled() -> Self {
        Self::new(Arc::new(NoopReportSink), ReportOptions::disabled())
    }

    pub fn options(&self) -> &ReportOptions {
        &self.options
    }

    pub async fn pass(&self, step: &str, message: &str, screenshot: Option<Vec<u8>>) {
        let mut event = ReportEvent::new(ReportStatus::Pass, step, message);
        event.screenshot = screenshot;
        self.report(event).await;
    }

    pub async fn fail(&self, step: &str, message: &str, error: &crate::Error, screenshot: Option<Vec<u8>>) {
        let mut event = ReportEvent::new(ReportStatus::Fail, step, message).with_error(error.to_string());
        event.screenshot = screenshot;
        self.report(event).await;
    }

    pub async fn info(&self, step: &str, message: &str) {
        self.report(ReportEvent::new(ReportStatus::Info, step, message)).await;
    }

    async fn report(&self, event: ReportEvent) {
        if self.options.enabled {
            self.sink.record(event).await;
        }
    }
}

/// Writes events to the tracing log
#[derive(Debug, Default)]
pub struct TracingReportSink;

#[async_trait]
impl ReportSink for TracingReportSink {
    async fn record(&self, event: ReportEvent) {
        let screenshot = event.screenshot.as_ref().map_or(0, Vec::len);
        match event.status {
            ReportStatus::Fail => error!(
                step = %event.step,
                screenshot_bytes = screenshot,
                "{} {}: {}",
                event.status,
                event.message,
                event.error.as_deref().unwrap_or("unknown error")
            ),
            _ => info!(step = %event.step, screenshot_bytes = screenshot, "{} {}", event.status, event.message),
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct MemoryReportSink {
    events: Mutex<Vec<ReportEvent>>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<ReportEvent> {
        self.events.lock().await.clone()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

#[async_trait]
impl ReportSink for MemoryReportSink {
    async fn record(&self, event: ReportEvent) {
        self.events.lock().await.push(event);
    }
}

/// Drops every event
#[derive(Debug, Default)]
pub struct NoopReportSink;

#[async_trait]
impl ReportSink for NoopReportSink {
    async fn record(&self, _event: ReportEvent) {}
}
