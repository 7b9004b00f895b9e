//! Tests of the CDP-backed session over the mock CDP browser

use serde_json::json;
use std::sync::Arc;
use tokio::time::{sleep, Duration};

use crate::cdp::mock::{MockCdpBrowser, MockCdpClient};
use crate::locator::Locator;
use crate::session::browser::BrowserContextImpl;
use crate::session::traits::{BrowserContext, DialogKind, FrameTarget, PageContext, SearchContext, SelectBy};
use crate::Error;

struct Fixture {
    cdp: Arc<MockCdpBrowser>,
    browser: BrowserContextImpl,
}

impl Fixture {
    async fn new() -> Self {
        let cdp = Arc::new(MockCdpBrowser::new());
        let browser = BrowserContextImpl::connect(cdp.clone())
            .await
            .expect("Failed to connect");
        Self { cdp, browser }
    }

    async fn client(&self) -> Arc<MockCdpClient> {
        let handle = self.browser.window_handle().await.unwrap();
        self.cdp.client_for(&handle).await.expect("No client for current window")
    }

    async fn page(&self) -> Arc<dyn PageContext> {
        self.browser.current_page().await.unwrap()
    }
}

#[tokio::test]
async fn test_connect_attaches_first_window() {
    let fixture = Fixture::new().await;

    let handles = fixture.browser.window_handles().await.unwrap();
    assert_eq!(handles.len(), 1);
    assert_eq!(fixture.browser.window_handle().await.unwrap(), handles[0]);
    assert_eq!(fixture.page().await.id(), handles[0]);
}

#[tokio::test]
async fn test_find_elements_uses_registry() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client.push_json(json!({ "ok": ["el-1", "el-2"] })).await;
    let elements = page.find_elements(&Locator::css("li.item")).await.unwrap();

    let ids: Vec<&str> = elements.iter().map(|e| e.id()).collect();
    assert_eq!(ids, vec!["el-1", "el-2"]);
    assert_eq!(elements[0].page_id(), page.id());

    let scripts = client.scripts().await;
    assert!(scripts
        .last()
        .unwrap()
        .contains(r#"window.__chaser.find(...[[],null,"css","li.item"])"#));
}

#[tokio::test]
async fn test_find_element_without_match() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client.push_json(json!({ "ok": [] })).await;
    let result = page.find_element(&Locator::id("missing")).await;
    assert!(matches!(result, Err(Error::ElementNotFound(_))));
}

#[tokio::test]
async fn test_invalid_selector_is_reported() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client
        .push_json(json!({ "error": "selector", "message": "//[ is not a valid XPath" }))
        .await;
    let result = page.find_elements(&Locator::xpath("//[")).await;
    assert!(matches!(result, Err(Error::InvalidSelector(_))));
}

#[tokio::test]
async fn test_stale_element() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client.push_json(json!({ "ok": ["el-1"] })).await;
    let element = page.find_element(&Locator::id("gone")).await.unwrap();

    client.push_json(json!({ "error": "stale", "message": "el-1" })).await;
    assert!(matches!(element.get_text().await, Err(Error::StaleElement(_))));
}

#[tokio::test]
async fn test_click_dispatches_mouse_events_at_center() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client.push_json(json!({ "ok": ["el-1"] })).await;
    let button = page.find_element(&Locator::id("go")).await.unwrap();

    client.push_json(json!({ "ok": null })).await;
    client
        .push_json(json!({ "ok": { "x": 10.0, "y": 20.0, "width": 100.0, "height": 40.0 } }))
        .await;
    button.click().await.unwrap();

    let events = client.calls_to("Input.dispatchMouseEvent").await;
    let types: Vec<&str> = events.iter().map(|c| c.params["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["mouseMoved", "mousePressed", "mouseReleased"]);
    assert_eq!(events[1].params["x"], json!(60.0));
    assert_eq!(events[1].params["y"], json!(40.0));
    assert_eq!(events[1].params["clickCount"], json!(1));
}

#[tokio::test]
async fn test_click_on_zero_size_element_fails() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client.push_json(json!({ "ok": ["el-1"] })).await;
    let hidden = page.find_element(&Locator::id("hidden")).await.unwrap();

    client.push_json(json!({ "ok": null })).await;
    client
        .push_json(json!({ "ok": { "x": 0.0, "y": 0.0, "width": 0.0, "height": 0.0 } }))
        .await;
    assert!(matches!(hidden.click().await, Err(Error::ScriptExecutionFailed(_))));
    assert!(client.calls_to("Input.dispatchMouseEvent").await.is_empty());
}

#[tokio::test]
async fn test_send_keys_types_each_character() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client.push_json(json!({ "ok": ["el-1"] })).await;
    let input = page.find_element(&Locator::name("q")).await.unwrap();

    client.push_json(json!({ "ok": null })).await;
    input.send_keys("ab\n").await.unwrap();

    let keys = client.calls_to("Input.dispatchKeyEvent").await;
    let types: Vec<&str> = keys.iter().map(|c| c.params["type"].as_str().unwrap()).collect();
    assert_eq!(types, vec!["char", "char", "keyDown", "keyUp"]);
    assert_eq!(keys[0].params["text"], json!("a"));
    assert_eq!(keys[2].params["key"], json!("Enter"));
}

#[tokio::test]
async fn test_select_option_passes_strategy() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client.push_json(json!({ "ok": ["el-4"] })).await;
    let select = page.find_element(&Locator::id("lang")).await.unwrap();

    client.push_json(json!({ "ok": null })).await;
    select.select_option(&SelectBy::Index(2)).await.unwrap();
    assert!(client
        .scripts()
        .await
        .last()
        .unwrap()
        .contains(r#"window.__chaser.select(...["el-4","index",2])"#));

    client.push_json(json!({ "ok": ["Deutsch"] })).await;
    assert_eq!(select.selected_options().await.unwrap(), vec!["Deutsch"]);
}

#[tokio::test]
async fn test_frame_path_scopes_lookups() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client.push_json(json!({ "ok": "el-9" })).await;
    page.switch_to_frame(FrameTarget::Index(0)).await.unwrap();

    client.push_json(json!({ "ok": [] })).await;
    page.find_elements(&Locator::id("inner")).await.unwrap();
    assert!(client
        .scripts()
        .await
        .last()
        .unwrap()
        .contains(r#"find(...[["el-9"],null,"id","inner"])"#));

    page.switch_to_parent_frame().await.unwrap();
    client.push_json(json!({ "ok": [] })).await;
    page.find_elements(&Locator::id("inner")).await.unwrap();
    assert!(client
        .scripts()
        .await
        .last()
        .unwrap()
        .contains(r#"find(...[[],null,"id","inner"])"#));
}

#[tokio::test]
async fn test_top_level_navigation_leaves_frame() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client.push_json(json!({ "ok": "el-9" })).await;
    page.switch_to_frame(FrameTarget::Index(0)).await.unwrap();

    // Child frames navigating keep the current frame
    client
        .emit("Page.frameNavigated", json!({ "frame": { "id": "CHILD", "parentId": "MAIN" } }))
        .await;
    sleep(Duration::from_millis(50)).await;
    client.push_json(json!({ "ok": [] })).await;
    page.find_elements(&Locator::id("inner")).await.unwrap();
    assert!(client
        .scripts()
        .await
        .last()
        .unwrap()
        .contains(r#"find(...[["el-9"],null,"id","inner"])"#));

    client
        .emit("Page.frameNavigated", json!({ "frame": { "id": "MAIN", "url": "https://example.com/next" } }))
        .await;
    sleep(Duration::from_millis(50)).await;
    client.push_json(json!({ "ok": [] })).await;
    page.find_elements(&Locator::id("inner")).await.unwrap();
    assert!(client
        .scripts()
        .await
        .last()
        .unwrap()
        .contains(r#"find(...[[],null,"id","inner"])"#));
}

#[tokio::test]
async fn test_missing_frame() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client.push_json(json!({ "error": "frame", "message": "name 'ads'" })).await;
    let result = page.switch_to_frame(FrameTarget::NameOrId("ads".into())).await;
    assert!(matches!(result, Err(Error::NoSuchFrame(_))));
}

#[tokio::test]
async fn test_dialog_tracking_and_handling() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client
        .emit(
            "Page.javascriptDialogOpening",
            json!({ "message": "Delete?", "type": "confirm", "defaultPrompt": "" }),
        )
        .await;
    sleep(Duration::from_millis(50)).await;

    let dialog = page.dialog().await.unwrap().expect("dialog should be open");
    assert_eq!(dialog.kind, DialogKind::Confirm);
    assert_eq!(dialog.message, "Delete?");

    page.handle_dialog(false, None).await.unwrap();
    let calls = client.calls_to("Page.handleJavaScriptDialog").await;
    assert_eq!(calls[0].params, json!({ "accept": false }));
    assert!(page.dialog().await.unwrap().is_none());

    assert!(matches!(page.handle_dialog(true, None).await, Err(Error::NoSuchAlert(_))));
}

#[tokio::test]
async fn test_prompt_text_is_sent() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client
        .emit("Page.javascriptDialogOpening", json!({ "message": "Name?", "type": "prompt" }))
        .await;
    sleep(Duration::from_millis(50)).await;

    page.handle_dialog(true, Some("Ada")).await.unwrap();
    let calls = client.calls_to("Page.handleJavaScriptDialog").await;
    assert_eq!(calls[0].params, json!({ "accept": true, "promptText": "Ada" }));
}

#[tokio::test]
async fn test_dialog_closed_event_clears_dialog() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    client
        .emit("Page.javascriptDialogOpening", json!({ "message": "Hi", "type": "alert" }))
        .await;
    client
        .emit("Page.javascriptDialogClosed", json!({ "result": true, "userInput": "" }))
        .await;
    sleep(Duration::from_millis(50)).await;

    assert!(page.dialog().await.unwrap().is_none());
}

#[tokio::test]
async fn test_drag_moves_in_steps() {
    let fixture = Fixture::new().await;
    let client = fixture.client().await;
    let page = fixture.page().await;

    page.drag(
        crate::session::traits::Point { x: 0.0, y: 0.0 },
        crate::session::traits::Point { x: 100.0, y: 50.0 },
    )
    .await
    .unwrap();

    let events = client.calls_to("Input.dispatchMouseEvent").await;
    assert_eq!(events.first().unwrap().params["type"], json!("mouseMoved"));
    assert_eq!(events[1].params["type"], json!("mousePressed"));
    let last = events.last().unwrap();
    assert_eq!(last.params["type"], json!("mouseReleased"));
    assert_eq!(last.params["x"], json!(100.0));
    assert_eq!(events.len(), 8);
}

#[tokio::test]
async fn test_navigate_and_page_reads() {
    let fixture = Fixture::new().await;
    let page = fixture.page().await;

    let result = page.navigate("https://example.com/").await.unwrap();
    assert_eq!(result.url, "https://example.com/");
    assert_eq!(page.current_url().await.unwrap(), "https://example.com/");
    assert_eq!(page.title().await.unwrap(), "Mock Page");
}

#[tokio::test]
async fn test_window_lifecycle() {
    let fixture = Fixture::new().await;
    let first = fixture.browser.window_handle().await.unwrap();

    let second = fixture.browser.new_window("https://example.com/").await.unwrap();
    assert_eq!(fixture.browser.window_handle().await.unwrap(), first);
    assert_eq!(fixture.browser.window_handles().await.unwrap().len(), 2);

    fixture.browser.switch_to_window(&second).await.unwrap();
    assert_eq!(fixture.browser.window_handle().await.unwrap(), second);
    assert_eq!(fixture.page().await.id(), second);

    fixture.browser.close_window().await.unwrap();
    assert!(matches!(
        fixture.browser.current_page().await,
        Err(Error::NoSuchWindow(_))
    ));
    assert_eq!(fixture.browser.window_handles().await.unwrap(), vec![first.clone()]);

    fixture.browser.switch_to_window(&first).await.unwrap();
    assert_eq!(fixture.page().await.id(), first);
}

#[tokio::test]
async fn test_switch_to_unknown_window() {
    let fixture = Fixture::new().await;
    let result = fixture.browser.switch_to_window("no-such-target").await;
    assert!(matches!(result, Err(Error::NoSuchWindow(_))));
}

#[tokio::test]
async fn test_closed_page_rejects_operations() {
    let fixture = Fixture::new().await;
    let page = fixture.page().await;

    page.close().await.unwrap();
    assert!(!page.is_active());
    assert!(matches!(
        page.find_elements(&Locator::id("x")).await,
        Err(Error::NoSuchWindow(_))
    ));
}

#[tokio::test]
async fn test_browser_close() {
    let fixture = Fixture::new().await;
    fixture.browser.close().await.unwrap();
    assert!(!fixture.browser.is_active());
    assert!(fixture.browser.window_handle().await.is_err());
}
