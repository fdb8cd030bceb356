use http::Method;
use routedoc::config::{DocsConfig, OpenApiSetting};
use routedoc::{ApiDocs, DocEntry, ReloadState, RouteTree};
use std::time::Duration;

mod common;
use common::wait;

fn spec(description: &str) -> String {
    format!(
        "openapi: 3.0.3\ninfo:\n  title: Reload\n  version: '1'\npaths:\n  /foo:\n    get:\n      description: {description}\n      responses:\n        '200':\n          description: OK\n"
    )
}

fn host() -> RouteTree {
    RouteTree::new().route("/foo", ["GET"])
}

fn hot_config(debounce_ms: u64) -> DocsConfig {
    let mut config = DocsConfig::default();
    config.require_docs.hot_reload = true;
    config.require_docs.debounce_ms = debounce_ms;
    config
}

#[test]
fn test_burst_of_changes_reloads_once() {
    let docs = ApiDocs::new(Some(&host()), hot_config(100)).unwrap();
    docs.require_docs_all("/foo", DocEntry::new("manual"));

    docs.notify_change();
    docs.notify_change();
    docs.notify_change();
    assert_eq!(docs.watcher_state(), Some(ReloadState::ReloadPending));

    assert!(docs.wait_reload_idle(Duration::from_secs(3)));
    assert_eq!(docs.reload_count(), 1);
    assert_eq!(
        docs.doc_for("/foo", &Method::GET).map(|e| e.description).as_deref(),
        Some("manual")
    );
}

#[test]
fn test_change_during_reload_schedules_one_follow_up() {
    let docs = ApiDocs::new(Some(&host()), hot_config(20)).unwrap();
    docs.require_docs_with(|r| {
        std::thread::sleep(Duration::from_millis(150));
        r.require_docs_all("/foo", DocEntry::new("slow source"));
        Ok(())
    })
    .unwrap();

    docs.notify_change();
    assert!(wait::until(Duration::from_secs(2), || {
        docs.watcher_state() == Some(ReloadState::Reloading)
    }));
    docs.notify_change();
    docs.notify_change();

    assert!(docs.wait_reload_idle(Duration::from_secs(3)));
    assert_eq!(docs.reload_count(), 2);
}

#[test]
fn test_disabled_hot_reload_has_no_watcher() {
    let docs = ApiDocs::new(Some(&host()), DocsConfig::default()).unwrap();
    assert_eq!(docs.watcher_state(), None);
    docs.notify_change();
    assert_eq!(docs.reload_count(), 0);
}

#[test]
fn test_editing_openapi_document_reloads_documentation() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("openapi.yaml");
    std::fs::write(&path, spec("first version")).unwrap();

    let mut config = hot_config(50);
    config.openapi = OpenApiSetting::Path(path.clone());
    let docs = ApiDocs::new(Some(&host()), config).unwrap();
    docs.require_docs("/foo", Some(Method::POST), DocEntry::new("manual post"));

    let description = || docs.doc_for("/foo", &Method::GET).map(|e| e.description);
    assert_eq!(description().as_deref(), Some("first version"));

    // give the watcher a moment to attach
    std::thread::sleep(Duration::from_millis(100));
    std::fs::write(&path, spec("second version")).unwrap();

    assert!(wait::until(Duration::from_secs(5), || {
        description().as_deref() == Some("second version")
    }));
    assert!(docs.wait_reload_idle(Duration::from_secs(3)));
    assert!(docs.reload_count() >= 1);
    // manual registrations survive the rebuild
    assert_eq!(
        docs.doc_for("/foo", &Method::POST).map(|e| e.description).as_deref(),
        Some("manual post")
    );
}

#[test]
fn test_deleted_openapi_document_drops_imported_entries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("openapi.yaml");
    std::fs::write(&path, spec("imported")).unwrap();

    let mut config = hot_config(50);
    config.openapi = OpenApiSetting::Path(path.clone());
    let docs = ApiDocs::new(Some(&host()), config).unwrap();
    assert!(docs.doc_for("/foo", &Method::GET).is_some());

    std::thread::sleep(Duration::from_millis(100));
    std::fs::remove_file(&path).unwrap();

    assert!(wait::until(Duration::from_secs(5), || {
        docs.doc_for("/foo", &Method::GET).is_none()
    }));
    assert!(docs.render().contains("No documentation provided."));
}

#[test]
fn test_watched_reload_with_reentrant_callback_completes() {
    let docs = ApiDocs::new(Some(&host()), hot_config(20)).unwrap();
    let engine = docs.clone();
    docs.require_docs_with(move |_| {
        engine.require_docs_all("/foo", DocEntry::new("from callback"));
        Ok(())
    })
    .unwrap();

    docs.notify_change();
    assert!(docs.wait_reload_idle(Duration::from_secs(2)));
    assert_eq!(docs.reload_count(), 1);

    docs.notify_change();
    assert!(docs.wait_reload_idle(Duration::from_secs(2)));
    assert_eq!(docs.reload_count(), 2);
    assert_eq!(
        docs.doc_for("/foo", &Method::GET).map(|e| e.description).as_deref(),
        Some("from callback")
    );
}
