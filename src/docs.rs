//! # Documentation Engine
//!
//! [`ApiDocs`] ties the pieces together: it walks the host routing table once,
//! collects documentation from manual registrations and OpenAPI documents, and
//! publishes a merged [`Registry`] snapshot that the renderer reads.
//!
//! ## Sources and merge order
//!
//! Manual registrations and imported entries live in two separate layers. The
//! published snapshot is the two layers overlaid in the configured
//! [`MergeOrder`]: with the default `openapi_first` a manual registration beats
//! an imported entry for the same `(path, method)`; `manual_first` flips that.
//!
//! Every manual registration (single entries, callbacks, manifest files) is
//! recorded. A reload clears both layers, re-imports the OpenAPI documents and
//! replays the recorded registrations in their original order.
//!
//! ## Consistency
//!
//! Layer updates are serialized by one mutex and the merged registry is
//! published with a single atomic swap, so a reader never observes a
//! half-built registry. Callbacks and file imports run outside the lock, so a
//! callback may call back into the engine; such nested registrations belong
//! to the callback and are replayed with it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use routedoc::{ApiDocs, DocEntry, DocsConfig, RouteTree};
//! use http::Method;
//!
//! let tree = RouteTree::new()
//!     .route("/hello", ["GET"])
//!     .mount("/api", RouteTree::new().route("/user", ["POST"]));
//! let docs = ApiDocs::new(Some(&tree), DocsConfig::default())?;
//!
//! docs.require_docs("/hello", None, DocEntry::new("Returns a greeting.").response("200", "{\"message\": \"hi\"}"));
//! docs.require_docs("/api/user", Some(Method::POST), DocEntry::new("Creates a user.").param("name", "string", "User name"));
//!
//! let html = docs.render();
//! ```

use crate::config::{DocsConfig, MergeOrder};
use crate::error::DocsError;
use crate::hot_reload::{ChangeWatcher, ReloadState};
use crate::openapi;
use crate::registry::{parse_method, DocEntry, Registry};
use crate::render;
use crate::tree::{discover, Route, RouteSource};
use arc_swap::ArcSwap;
use http::Method;
use serde_json::Value;
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// A recorded registration closure, replayed on every reload.
pub type DocsCallback = Arc<dyn Fn(&mut Registrar<'_>) -> anyhow::Result<()> + Send + Sync>;

/// Write access to the manual layer handed to registration callbacks.
pub struct Registrar<'a> {
    registry: &'a mut Registry,
}

impl<'a> Registrar<'a> {
    pub fn new(registry: &'a mut Registry) -> Self {
        Self { registry }
    }

    /// Register `entry` for `path`, scoped to `method` or to every method.
    pub fn require_docs(&mut self, path: &str, method: Option<Method>, entry: DocEntry) {
        self.registry.register(path, method, entry);
    }

    pub fn require_docs_all(&mut self, path: &str, entry: DocEntry) {
        self.registry.register(path, None, entry);
    }

    /// Register every entry of a documentation manifest.
    ///
    /// A manifest maps paths either directly to an entry (all methods) or to a
    /// mapping of method (or `ALL`) to entry. A missing file registers nothing.
    pub fn load_manifest(&mut self, path: &Path) -> Result<usize, DocsError> {
        let Some(doc) = openapi::load_document(path)? else {
            debug!(path = %path.display(), "documentation manifest not found");
            return Ok(0);
        };
        let entries = manifest_entries(&doc).map_err(|message| DocsError::Parse {
            path: path.to_path_buf(),
            message,
        })?;
        let count = entries.len();
        for (route, method, entry) in entries {
            self.registry.register(&route, method, entry);
        }
        Ok(count)
    }
}

fn method_token(key: &str) -> Option<Option<Method>> {
    match key.trim() {
        "ALL" | "all" | "*" => Some(None),
        k if matches!(
            k.to_ascii_uppercase().as_str(),
            "GET" | "POST" | "PUT" | "DELETE" | "PATCH" | "OPTIONS" | "HEAD" | "TRACE"
        ) =>
        {
            parse_method(k).map(Some)
        }
        _ => None,
    }
}

type ManifestEntry = (String, Option<Method>, DocEntry);

fn manifest_entries(doc: &Value) -> Result<Vec<ManifestEntry>, String> {
    let map = doc
        .as_object()
        .ok_or_else(|| "manifest root is not a mapping".to_string())?;
    let mut out = Vec::new();
    for (path, value) in map {
        let by_method = value
            .as_object()
            .filter(|obj| !obj.is_empty() && obj.keys().all(|k| method_token(k).is_some()));
        match by_method {
            Some(obj) => {
                for (key, raw) in obj {
                    let method = method_token(key).flatten();
                    let entry: DocEntry = serde_json::from_value(raw.clone())
                        .map_err(|e| format!("{path} {key}: {e}"))?;
                    out.push((path.clone(), method, entry));
                }
            }
            None => {
                let entry: DocEntry =
                    serde_json::from_value(value.clone()).map_err(|e| format!("{path}: {e}"))?;
                out.push((path.clone(), None, entry));
            }
        }
    }
    Ok(out)
}

thread_local! {
    /// One frame per running callback: the engine it belongs to and the
    /// engine-level registrations it made.
    static CAPTURED: RefCell<Vec<(usize, Vec<Registration>)>> = const { RefCell::new(Vec::new()) };
}

/// Run `f` with registrations on `owner` redirected into a buffer.
fn capturing<T>(owner: usize, f: impl FnOnce() -> T) -> (T, Vec<Registration>) {
    CAPTURED.with(|c| c.borrow_mut().push((owner, Vec::new())));
    let out = f();
    let nested = CAPTURED
        .with(|c| c.borrow_mut().pop())
        .map(|(_, buf)| buf)
        .unwrap_or_default();
    (out, nested)
}

/// Hand `registration` to the innermost running callback of `owner`, if any.
fn capture(owner: usize, registration: Registration) -> Option<Registration> {
    CAPTURED.with(|c| match c.borrow_mut().last_mut() {
        Some((frame, buf)) if *frame == owner => {
            buf.push(registration);
            None
        }
        _ => Some(registration),
    })
}

#[derive(Clone)]
enum Registration {
    Entry {
        path: String,
        method: Option<Method>,
        entry: DocEntry,
    },
    Callback(DocsCallback),
    Manifest(PathBuf),
}

impl Registration {
    fn describe(&self) -> String {
        match self {
            Registration::Entry { path, .. } => format!("entry {path}"),
            Registration::Callback(_) => "callback".to_string(),
            Registration::Manifest(p) => format!("manifest {}", p.display()),
        }
    }

    /// Apply into `registry`. Callbacks and manifests are all-or-nothing.
    ///
    /// Engine calls a callback makes on `owner` land in the same scratch
    /// registry, after the entries it wrote through its [`Registrar`].
    fn apply(&self, registry: &mut Registry, owner: usize) -> anyhow::Result<()> {
        match self {
            Registration::Entry {
                path,
                method,
                entry,
            } => {
                registry.register(path, method.clone(), entry.clone());
                Ok(())
            }
            Registration::Callback(cb) => {
                let mut scratch = Registry::new();
                let (outcome, nested) = capturing(owner, || {
                    std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        cb(&mut Registrar::new(&mut scratch))
                    }))
                });
                match outcome {
                    Ok(Ok(())) => {
                        for registration in &nested {
                            registration.apply(&mut scratch, owner)?;
                        }
                        registry.overlay(&scratch);
                        Ok(())
                    }
                    Ok(Err(e)) => Err(e),
                    Err(_) => Err(anyhow::anyhow!("registration callback panicked")),
                }
            }
            Registration::Manifest(path) => {
                let mut scratch = Registry::new();
                Registrar::new(&mut scratch).load_manifest(path)?;
                registry.overlay(&scratch);
                Ok(())
            }
        }
    }
}

#[derive(Default)]
struct Layers {
    manual: Registry,
    imported: Registry,
    log: Vec<Registration>,
    openapi_sources: Vec<PathBuf>,
}

impl Layers {
    fn merged(&self, order: MergeOrder) -> Registry {
        let (base, top) = match order {
            MergeOrder::OpenapiFirst => (&self.imported, &self.manual),
            MergeOrder::ManualFirst => (&self.manual, &self.imported),
        };
        let mut merged = base.clone();
        merged.overlay(top);
        merged
    }
}

struct DocsInner {
    config: DocsConfig,
    routes: Vec<Route>,
    layers: Mutex<Layers>,
    snapshot: ArcSwap<Registry>,
    reloads: AtomicU64,
    watcher: Mutex<Option<ChangeWatcher>>,
}

impl DocsInner {
    fn layers(&self) -> MutexGuard<'_, Layers> {
        self.layers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn watcher(&self) -> MutexGuard<'_, Option<ChangeWatcher>> {
        self.watcher.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn owner(&self) -> usize {
        self as *const DocsInner as usize
    }

    fn publish(&self, layers: &Layers) {
        self.snapshot
            .store(Arc::new(layers.merged(self.config.require_docs.merge_order)));
    }
}

/// The documentation engine. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ApiDocs {
    inner: Arc<DocsInner>,
}

impl ApiDocs {
    /// Build the engine for `host`.
    ///
    /// Fails only when `host` is `None`. An uninspectable host, a missing or
    /// broken OpenAPI document, or a watcher that cannot start are logged and
    /// leave the engine running with less documentation.
    pub fn new(host: Option<&dyn RouteSource>, config: DocsConfig) -> Result<Self, DocsError> {
        let host = host.ok_or(DocsError::MissingHost)?;
        let config = config.sanitized();
        let routes = discover(host);

        let docs = ApiDocs {
            inner: Arc::new(DocsInner {
                routes,
                layers: Mutex::new(Layers::default()),
                snapshot: ArcSwap::from_pointee(Registry::new()),
                reloads: AtomicU64::new(0),
                watcher: Mutex::new(None),
                config,
            }),
        };

        let config = &docs.inner.config;
        if config.require_docs.autoload {
            if let Some(path) = config.openapi_path() {
                docs.import_from(&path);
            }
        }
        for source in &config.require_docs.sources {
            if let Err(e) = docs.record(Registration::Manifest(source.clone())) {
                warn!(source = %source.display(), error = %e, "documentation manifest skipped");
            }
        }
        if config.require_docs.hot_reload {
            docs.start_watching();
        }

        info!(
            routes = docs.inner.routes.len(),
            endpoint = %config.endpoint,
            "API documentation initialised"
        );
        Ok(docs)
    }

    /// Register documentation for `path`, for one method or (`None`) all methods.
    ///
    /// The registration is recorded and replayed on reload.
    pub fn require_docs(&self, path: &str, method: Option<Method>, entry: DocEntry) {
        let registration = Registration::Entry {
            path: path.to_string(),
            method,
            entry,
        };
        if let Err(e) = self.record(registration) {
            warn!(path, error = %e, "documentation registration failed");
        }
    }

    pub fn require_docs_all(&self, path: &str, entry: DocEntry) {
        self.require_docs(path, None, entry);
    }

    /// Run `callback` now and again on every reload.
    ///
    /// Entries from a callback apply only if it returns `Ok`. The callback is
    /// recorded even when its first run fails.
    pub fn require_docs_with<F>(&self, callback: F) -> anyhow::Result<()>
    where
        F: Fn(&mut Registrar<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.record(Registration::Callback(Arc::new(callback)))
    }

    /// Load a documentation manifest now and again on every reload.
    pub fn require_docs_from(&self, manifest: impl Into<PathBuf>) -> anyhow::Result<()> {
        self.record(Registration::Manifest(manifest.into()))
    }

    fn record(&self, registration: Registration) -> anyhow::Result<()> {
        let owner = self.inner.owner();
        // called from inside a running callback: that callback owns the entry
        let Some(registration) = capture(owner, registration) else {
            return Ok(());
        };
        // user code runs without the lock held
        let mut scratch = Registry::new();
        let outcome = registration.apply(&mut scratch, owner);

        let mut layers = self.inner.layers();
        layers.manual.overlay(&scratch);
        layers.log.push(registration);
        self.inner.publish(&layers);
        outcome
    }

    /// Import an OpenAPI document into the imported layer.
    ///
    /// The document is re-imported on every reload. Never fails; returns the
    /// number of entries imported.
    pub fn import_from(&self, path: &Path) -> usize {
        let mut scratch = Registry::new();
        let count = openapi::import_from(path, &mut scratch);

        let mut layers = self.inner.layers();
        if !layers.openapi_sources.iter().any(|p| p == path) {
            layers.openapi_sources.push(path.to_path_buf());
        }
        layers.imported.overlay(&scratch);
        self.inner.publish(&layers);
        count
    }

    /// Clear and rebuild both layers from their sources.
    ///
    /// Sources and registrations are read under the lock, rebuilt without it,
    /// and swapped in once no registration arrived in the meantime.
    pub fn reload(&self) {
        let owner = self.inner.owner();
        let mut imported = Registry::new();
        let mut manual = Registry::new();
        let (mut seen_sources, mut seen_log) = (0, 0);

        loop {
            let (sources, log) = {
                let mut layers = self.inner.layers();
                if layers.openapi_sources.len() == seen_sources && layers.log.len() == seen_log {
                    layers.imported = std::mem::take(&mut imported);
                    layers.manual = std::mem::take(&mut manual);
                    self.inner.publish(&layers);
                    break;
                }
                (
                    layers.openapi_sources[seen_sources..].to_vec(),
                    layers.log[seen_log..].to_vec(),
                )
            };
            seen_sources += sources.len();
            seen_log += log.len();

            for source in &sources {
                openapi::import_from(source, &mut imported);
            }
            for registration in &log {
                if let Err(e) = registration.apply(&mut manual, owner) {
                    error!(
                        registration = %registration.describe(),
                        error = %e,
                        "registration failed during reload, continuing"
                    );
                }
            }
        }

        let cycle = self.inner.reloads.fetch_add(1, Ordering::SeqCst) + 1;
        info!(cycle, entries = self.inner.snapshot.load().len(), "documentation reloaded");
    }

    fn start_watching(&self) {
        let weak = Arc::downgrade(&self.inner);
        let mut watcher = ChangeWatcher::new(self.inner.config.require_docs.debounce(), move || {
            if let Some(inner) = weak.upgrade() {
                ApiDocs { inner }.reload();
            }
        });
        let paths = self.inner.config.watched_paths();
        if paths.is_empty() {
            warn!("hot reload enabled but no documentation sources to watch");
        } else if let Err(e) = watcher.watch_paths(&paths) {
            error!(error = %e, "hot-reload: cannot watch documentation sources");
        }
        *self.inner.watcher() = Some(watcher);
    }

    /// Report a change of a documentation source to the watcher.
    ///
    /// No-op when hot reload is disabled.
    pub fn notify_change(&self) {
        match self.inner.watcher().as_ref() {
            Some(w) => w.trigger(),
            None => debug!("change ignored, hot reload disabled"),
        }
    }

    pub fn watcher_state(&self) -> Option<ReloadState> {
        self.inner.watcher().as_ref().map(ChangeWatcher::state)
    }

    /// Wait for a pending or running reload to finish.
    pub fn wait_reload_idle(&self, timeout: Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            match self.watcher_state() {
                None | Some(ReloadState::Idle) => return true,
                Some(_) if std::time::Instant::now() >= deadline => return false,
                Some(_) => std::thread::sleep(Duration::from_millis(5)),
            }
        }
    }

    /// Completed reload cycles.
    pub fn reload_count(&self) -> u64 {
        self.inner.reloads.load(Ordering::SeqCst)
    }

    pub fn routes(&self) -> &[Route] {
        &self.inner.routes
    }

    pub fn config(&self) -> &DocsConfig {
        &self.inner.config
    }

    /// The current merged registry.
    pub fn snapshot(&self) -> Arc<Registry> {
        self.inner.snapshot.load_full()
    }

    /// Entry for `method` on `path`, falling back to the all-methods entry.
    pub fn doc_for(&self, path: &str, method: &Method) -> Option<DocEntry> {
        self.snapshot().lookup(path, method).cloned()
    }

    /// Render the documentation page from the current snapshot.
    pub fn render(&self) -> String {
        let config = &self.inner.config;
        render::render_page(
            &config.name,
            &config.endpoint,
            &self.inner.routes,
            &self.snapshot(),
        )
    }
}
