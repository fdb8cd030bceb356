use http::Method;
use routedoc::config::{DocsConfig, MergeOrder, OpenApiSetting};
use routedoc::{ApiDocs, DocEntry, DocsError, RouteTree};
use std::path::PathBuf;

mod common;
use common::temp_files;

const OPENAPI: &str = r#"openapi: 3.0.3
info:
  title: Users
  version: '1.0'
paths:
  /user:
    get:
      summary: Imported list
      responses:
        '200':
          description: OK
    post:
      description: Imported create
      responses:
        '201':
          description: Created
"#;

fn host() -> RouteTree {
    RouteTree::new().route("/user", ["GET", "POST", "DELETE"])
}

fn config_with(openapi: PathBuf, order: MergeOrder) -> DocsConfig {
    let mut config = DocsConfig {
        openapi: OpenApiSetting::Path(openapi),
        ..Default::default()
    };
    config.require_docs.merge_order = order;
    config
}

fn description(docs: &ApiDocs, method: Method) -> Option<String> {
    docs.doc_for("/user", &method).map(|e| e.description)
}

#[test]
fn test_missing_host_fails_construction() {
    assert!(matches!(
        ApiDocs::new(None, DocsConfig::default()),
        Err(DocsError::MissingHost)
    ));
}

#[test]
fn test_last_write_wins_per_path_and_method() {
    let docs = ApiDocs::new(Some(&host()), DocsConfig::default()).unwrap();
    docs.require_docs("/user", Some(Method::GET), DocEntry::new("first"));
    docs.require_docs("/user/", Some(Method::GET), DocEntry::new("second"));
    assert_eq!(description(&docs, Method::GET).as_deref(), Some("second"));
    assert_eq!(docs.snapshot().len(), 1);
}

#[test]
fn test_all_entry_is_fallback_only() {
    let docs = ApiDocs::new(Some(&host()), DocsConfig::default()).unwrap();
    docs.require_docs_all("/user", DocEntry::new("any method"));
    docs.require_docs("/user", Some(Method::POST), DocEntry::new("create"));
    assert_eq!(description(&docs, Method::GET).as_deref(), Some("any method"));
    assert_eq!(description(&docs, Method::POST).as_deref(), Some("create"));
    assert_eq!(description(&docs, Method::DELETE).as_deref(), Some("any method"));
}

#[test]
fn test_manual_wins_over_import_by_default() {
    let spec = temp_files::create_temp_yaml(OPENAPI);
    let docs = ApiDocs::new(Some(&host()), config_with(spec.clone(), MergeOrder::OpenapiFirst)).unwrap();
    assert_eq!(description(&docs, Method::GET).as_deref(), Some("Imported list"));

    docs.require_docs("/user", Some(Method::GET), DocEntry::new("Manual list"));
    assert_eq!(description(&docs, Method::GET).as_deref(), Some("Manual list"));
    assert_eq!(description(&docs, Method::POST).as_deref(), Some("Imported create"));

    docs.reload();
    assert_eq!(description(&docs, Method::GET).as_deref(), Some("Manual list"));
    temp_files::cleanup_temp_files(&[spec]);
}

#[test]
fn test_manual_first_lets_import_win() {
    let spec = temp_files::create_temp_yaml(OPENAPI);
    let docs = ApiDocs::new(Some(&host()), config_with(spec.clone(), MergeOrder::ManualFirst)).unwrap();
    docs.require_docs("/user", Some(Method::GET), DocEntry::new("Manual list"));
    docs.require_docs("/user", Some(Method::DELETE), DocEntry::new("Manual delete"));
    assert_eq!(description(&docs, Method::GET).as_deref(), Some("Imported list"));
    assert_eq!(description(&docs, Method::DELETE).as_deref(), Some("Manual delete"));
    temp_files::cleanup_temp_files(&[spec]);
}

#[test]
fn test_reload_replays_registrations_in_order() {
    let docs = ApiDocs::new(Some(&host()), DocsConfig::default()).unwrap();
    docs.require_docs_all("/user", DocEntry::new("v1"));
    docs.require_docs_with(|r| {
        r.require_docs_all("/user", DocEntry::new("v2"));
        Ok(())
    })
    .unwrap();
    docs.reload();
    docs.reload();
    assert_eq!(description(&docs, Method::GET).as_deref(), Some("v2"));
    assert_eq!(docs.snapshot().len(), 1);
    assert_eq!(docs.reload_count(), 2);
}

#[test]
fn test_failing_callback_does_not_block_others_on_reload() {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    let docs = ApiDocs::new(Some(&host()), DocsConfig::default()).unwrap();
    let fail = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&fail);
    docs.require_docs_with(move |r| {
        if flag.load(Ordering::SeqCst) {
            anyhow::bail!("source went away");
        }
        r.require_docs("/user", Some(Method::GET), DocEntry::new("from callback"));
        Ok(())
    })
    .unwrap();
    docs.require_docs("/user", Some(Method::POST), DocEntry::new("direct"));

    fail.store(true, Ordering::SeqCst);
    docs.reload();
    assert_eq!(description(&docs, Method::GET), None);
    assert_eq!(description(&docs, Method::POST).as_deref(), Some("direct"));
}

#[test]
fn test_manifest_source_is_loaded_and_reloaded() {
    let manifest = temp_files::create_temp_yaml(
        "/user:\n  get:\n    description: From manifest\n    parameters:\n      - name: limit\n        type: integer\n",
    );
    let mut config = DocsConfig::default();
    config.require_docs.sources = vec![manifest.clone()];
    let docs = ApiDocs::new(Some(&host()), config).unwrap();
    let entry = docs.doc_for("/user", &Method::GET).unwrap();
    assert_eq!(entry.description, "From manifest");
    assert_eq!(entry.parameters[0].ty, "integer");

    std::fs::write(&manifest, "/user:\n  description: Rewritten\n").unwrap();
    docs.reload();
    assert_eq!(description(&docs, Method::GET).as_deref(), Some("Rewritten"));
    assert_eq!(docs.snapshot().len(), 1);
    temp_files::cleanup_temp_files(&[manifest]);
}

#[test]
fn test_render_uses_snapshot() {
    let docs = ApiDocs::new(Some(&host()), DocsConfig::default()).unwrap();
    docs.require_docs("/user", Some(Method::POST), DocEntry::new("Creates a user"));
    let html = docs.render();
    assert!(html.contains("Creates a user"));
    assert_eq!(html.matches("No documentation provided.").count(), 2);
}

#[test]
fn test_relative_endpoint_does_not_abort_construction() {
    let config = DocsConfig {
        endpoint: "api-docs".to_string(),
        ..Default::default()
    };
    let docs = ApiDocs::new(Some(&host()), config).unwrap();
    assert_eq!(docs.config().endpoint, "/api-docs");
    assert!(docs.render().contains("href=\"/api-docs/style.css\""));

    let config = DocsConfig {
        endpoint: "/docs?page=1".to_string(),
        ..Default::default()
    };
    let docs = ApiDocs::new(Some(&host()), config).unwrap();
    assert_eq!(docs.config().endpoint, "/docs");
}

#[test]
fn test_callback_registering_through_engine_survives_reloads() {
    let docs = ApiDocs::new(Some(&host()), DocsConfig::default()).unwrap();
    let engine = docs.clone();
    let (tx, rx) = std::sync::mpsc::channel();
    let worker = docs.clone();
    std::thread::spawn(move || {
        let outcome = worker.require_docs_with(move |_| {
            engine.require_docs("/user", Some(Method::DELETE), DocEntry::new("Removes a user"));
            Ok(())
        });
        worker.reload();
        worker.reload();
        tx.send(outcome.is_ok()).ok();
    });

    assert_eq!(rx.recv_timeout(std::time::Duration::from_secs(2)), Ok(true));
    assert_eq!(docs.reload_count(), 2);
    assert_eq!(
        docs.doc_for("/user", &Method::DELETE).map(|e| e.description).as_deref(),
        Some("Removes a user")
    );
    assert_eq!(docs.snapshot().len(), 1);
}
