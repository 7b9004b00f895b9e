//! CDP layer integration tests
//!
//! These tests require a running Chrome/Chromium instance with remote
//! debugging enabled and skip themselves otherwise.
//! Start Chrome with: chrome --remote-debugging-port=9222

use super::browser::CdpBrowserImpl;
use super::traits::*;

/// Test helper: Get Chrome debugging URL from environment or use default
fn get_chrome_url() -> String {
    std::env::var("CHROME_DEBUG_URL").unwrap_or_else(|_| "http://localhost:9222".to_string())
}

/// Test helper: Get test page URL
fn get_test_page_url() -> String {
    std::env::var("TEST_PAGE_URL").unwrap_or_else(|_| "https://example.com".to_string())
}

/// Test helper: Check if Chrome is available
async fn is_chrome_available() -> bool {
    CdpBrowserImpl::new(get_chrome_url()).get_version().await.is_ok()
}

/// Test helper: Open a fresh page and connect a client to it
async fn open_page(browser: &CdpBrowserImpl) -> (TargetInfo, std::sync::Arc<dyn CdpClient>) {
    let target = browser.create_target("about:blank").await.expect("Failed to create target");
    let ws_url = target
        .web_socket_debugger_url
        .clone()
        .expect("No WebSocket URL for new target");
    let client = browser.create_client(&ws_url).await.expect("Failed to connect");
    (target, client)
}

#[tokio::test]
async fn test_browser_get_version() {
    if !is_chrome_available().await {
        eprintln!("Skipping test: Chrome not available");
        return;
    }

    let version = CdpBrowserImpl::new(get_chrome_url()).get_version().await.unwrap();
    assert!(!version.protocol_version.is_empty());
    assert!(!version.product.is_empty());
    assert!(!version.user_agent.is_empty());
}

#[tokio::test]
async fn test_target_lifecycle() {
    if !is_chrome_available().await {
        eprintln!("Skipping test: Chrome not available");
        return;
    }

    let browser = CdpBrowserImpl::new(get_chrome_url());
    let (target, client) = open_page(&browser).await;

    let targets = browser.get_targets().await.unwrap();
    assert!(targets.iter().any(|t| t.target_id == target.target_id && t.is_page()));

    browser.activate_target(&target.target_id).await.unwrap();
    browser.close_target(&target.target_id).await.unwrap();
    drop(client);

    let targets = browser.get_targets().await.unwrap();
    assert!(!targets.iter().any(|t| t.target_id == target.target_id));
}

#[tokio::test]
async fn test_evaluate_and_navigate() {
    if !is_chrome_available().await {
        eprintln!("Skipping test: Chrome not available");
        return;
    }

    let browser = CdpBrowserImpl::new(get_chrome_url());
    let (target, client) = open_page(&browser).await;

    let eval_result = client.evaluate("1 + 1", false).await.expect("Failed to evaluate");
    assert_eq!(eval_result, EvaluationResult::Number(2.0));

    let error = client.evaluate("throw new Error('boom')", false).await.unwrap_err();
    assert!(matches!(error, crate::Error::ScriptExecutionFailed(_)));

    let nav_result = client.navigate(&get_test_page_url()).await.expect("Failed to navigate");
    assert_eq!(nav_result.url, get_test_page_url());

    browser.close_target(&target.target_id).await.unwrap();
}

#[tokio::test]
async fn test_dialog_events() {
    if !is_chrome_available().await {
        eprintln!("Skipping test: Chrome not available");
        return;
    }

    let browser = CdpBrowserImpl::new(get_chrome_url());
    let (target, client) = open_page(&browser).await;

    let mut events = client
        .subscribe_events("Page.javascriptDialogOpening")
        .await
        .expect("Failed to subscribe to events");

    // alert() blocks evaluation until the dialog is handled
    let opener = std::sync::Arc::clone(&client);
    let pending = tokio::spawn(async move { opener.evaluate("alert('hello')", false).await });

    let event = tokio::time::timeout(tokio::time::Duration::from_secs(5), events.recv())
        .await
        .expect("Timeout waiting for dialog")
        .expect("No event received");
    assert_eq!(event.params["message"], "hello");

    client
        .call_method("Page.handleJavaScriptDialog", serde_json::json!({ "accept": true }))
        .await
        .unwrap();
    let _ = pending.await;

    browser.close_target(&target.target_id).await.unwrap();
}

#[tokio::test]
async fn test_cdp_screenshot() {
    if !is_chrome_available().await {
        eprintln!("Skipping test: Chrome not available");
        return;
    }

    let browser = CdpBrowserImpl::new(get_chrome_url());
    let (target, client) = open_page(&browser).await;

    let screenshot = client
        .screenshot(ScreenshotFormat::Png)
        .await
        .expect("Failed to capture screenshot");

    // PNG signature
    assert_eq!(&screenshot[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);

    browser.close_target(&target.target_id).await.unwrap();
}
