//! Integration tests for the browser session controller.
//!
//! These tests require Chrome to be installed and are ignored by default.
//! Run with: cargo test -p shoppilot-browser --test integration_test -- --ignored --nocapture

use std::path::PathBuf;

use shoppilot_browser::{find_chrome, MouseButton, SessionConfig, SessionManager};

/// Test-specific config on a separate debug port to avoid conflicts.
fn test_config() -> SessionConfig {
    SessionConfig {
        headless: true,
        start_url: "https://example.com/".to_string(),
        screenshot_dir: PathBuf::from("/tmp/shoppilot-test-screenshots"),
        debug_port: 9333,
        profile_dir: Some(PathBuf::from("/tmp/shoppilot-test-profile")),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore] // Requires Chrome
async fn test_chrome_detection() {
    let chrome_path = find_chrome();
    assert!(chrome_path.is_some(), "Chrome should be installed");
    assert!(chrome_path.unwrap().exists());
}

#[tokio::test]
#[ignore] // Requires Chrome
async fn test_session_lifecycle() {
    let manager = SessionManager::new();

    let driver = manager
        .get_or_create(test_config())
        .await
        .expect("session creation should succeed");

    // Idempotent: a second call with different parameters returns the
    // same driver.
    let again = manager
        .get_or_create(SessionConfig {
            start_url: "https://ignored.invalid/".to_string(),
            ..test_config()
        })
        .await
        .unwrap();
    assert!(std::sync::Arc::ptr_eq(&driver, &again));

    let url = driver.current_url().await.unwrap();
    assert!(url.contains("example.com"));

    // Reset keeps the driver warm and lands back on the start page.
    manager.reset().await.unwrap();
    let url = driver.current_url().await.unwrap();
    assert!(url.contains("example.com"));

    // Close twice in a row must not fail.
    manager.close().await;
    manager.close().await;
    assert!(manager.current().await.is_none());
}

#[tokio::test]
#[ignore] // Requires Chrome
async fn test_click_produces_screenshot() {
    let manager = SessionManager::new();
    let driver = manager.get_or_create(test_config()).await.unwrap();

    let shot = driver
        .click(500.0, 500.0, MouseButton::Left, 1)
        .await
        .expect("click should succeed");

    assert!(shot.exists(), "screenshot file should exist");
    let len = std::fs::metadata(&shot).unwrap().len();
    assert!(len > 0, "screenshot should be non-empty");
    assert_eq!(shot.extension().unwrap(), "png");

    manager.close().await;
}

#[tokio::test]
#[ignore] // Requires Chrome
async fn test_zoom_reverts_transform() {
    let manager = SessionManager::new();
    let driver = manager.get_or_create(test_config()).await.unwrap();

    let first = driver.zoom_region(100.0, 100.0, 200.0, 200.0).await.unwrap();
    assert!(first.exists());

    // The transform must be identity again: a second zoom over the same
    // region behaves like the first.
    let second = driver.zoom_region(100.0, 100.0, 200.0, 200.0).await.unwrap();
    assert!(second.exists());

    manager.close().await;
}
