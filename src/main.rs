//! # Chaser-Actions command line
//!
//! Runs a single locator-driven step against a Chrome/Chromium started with
//! `--remote-debugging-port`:
//!
//! ```text
//! chaser-actions <url> <locator-string> [click]
//! ```
//!
//! ## Environment
//! - `CHASER_CDP_ENDPOINT`: DevTools endpoint (default: ws://localhost:9222)
//! - `CHASER_DEFAULT_TIMEOUT`, `CHASER_POLL_INTERVAL`: wait tuning in milliseconds
//! - `CHASER_CONFIG`: TOML file used instead of the variables above
//! - `RUST_LOG`: tracing filter; falls back to `CHASER_LOG_LEVEL`

use std::sync::Arc;

use anyhow::{bail, Context};
use chaser_actions::{
    cdp::{CdpBrowser, CdpBrowserImpl},
    report::{ReportOptions, Reporter, TracingReportSink},
    session::{BrowserContext, BrowserContextImpl},
    wait::Query,
    Config, ElementActions,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::var("CHASER_CONFIG") {
        Ok(path) => Config::from_file(&path).with_context(|| format!("loading {}", path))?,
        Err(_) => Config::from_env()?,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Chaser-Actions v{}", chaser_actions::VERSION);

    let mut args = std::env::args().skip(1);
    let (Some(url), Some(locators)) = (args.next(), args.next()) else {
        bail!("usage: chaser-actions <url> <locator-string> [click]");
    };
    let click = args.next().is_some_and(|arg| arg == "click");

    let cdp: Arc<dyn CdpBrowser> = Arc::new(CdpBrowserImpl::new(config.cdp_endpoint.clone()));
    let browser: Arc<dyn BrowserContext> = Arc::new(
        BrowserContextImpl::connect(cdp)
            .await
            .with_context(|| format!("connecting to {}", config.cdp_endpoint))?,
    );
    info!("Connected to browser at {}", config.cdp_endpoint);

    let reporter = Reporter::new(Arc::new(TracingReportSink), ReportOptions::from_config(&config));
    let actions = ElementActions::new(browser, reporter, &config);

    if !actions.navigate(&url, Some("open")).await {
        bail!("could not open {}", url);
    }

    let Some(element) = actions.find_element(locators.as_str(), Query::Presence, Some("locate")).await else {
        error!("No element matched '{}'", locators);
        std::process::exit(1);
    };
    info!("Found element {}", element.id());

    if click && !actions.click(&element, Some("click")).await {
        std::process::exit(1);
    }

    Ok(())
}
