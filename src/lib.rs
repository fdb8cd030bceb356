//! # routedoc
//!
//! **routedoc** adds a browsable documentation page to an HTTP application. It
//! discovers the routes the application registered, merges them with
//! hand-written and OpenAPI-imported descriptions, and renders the result at a
//! configurable endpoint (default `/docs`).
//!
//! ## Architecture
//!
//! - **[`path`]** - Path normalization shared by every component
//! - **[`tree`]** - Route tree model and the walker that flattens it into routes
//! - **[`registry`]** - Documentation entries keyed by path and method, with an `ALL` wildcard
//! - **[`openapi`]** - Lenient OpenAPI / Swagger importer
//! - **[`docs`]** - The [`ApiDocs`] engine: layered registries, replayable registrations, snapshots
//! - **[`hot_reload`]** - Debounced change watcher driving reloads
//! - **[`render`]** - HTML page rendering (minijinja)
//! - **[`static_files`]** - Stylesheet and script served next to the page
//! - **[`router`]** - Small host router that exposes its topology for discovery
//! - **[`server`]** - `may_minihttp` service and server handle
//! - **[`config`]** - Configuration file and environment handling
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ### Request flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Service as server::DocsService
//!     participant Docs as docs::ApiDocs
//!     participant Render as render
//!     participant Router as router::Router
//!
//!     Client->>Service: GET /docs
//!     Service->>Docs: render()
//!     Docs->>Docs: load snapshot (ArcSwap)
//!     Docs->>Render: routes + registry snapshot
//!     Render-->>Service: HTML
//!     Service-->>Client: 200 text/html
//!
//!     Client->>Service: POST /api/user
//!     Service->>Router: dispatch(request)
//!     Router-->>Service: HandlerResponse
//!     Service-->>Client: 201 application/json
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use routedoc::router::{HandlerResponse, Router};
//! use routedoc::server::{DocsService, HttpServer};
//! use routedoc::{ApiDocs, DocEntry, DocsConfig};
//! use serde_json::json;
//!
//! let app = Router::new()
//!     .get("/hello", |_| HandlerResponse::json(200, json!({"message": "Hello, world!"})));
//!
//! let docs = ApiDocs::new(Some(&app), DocsConfig::default())?;
//! docs.require_docs_all("/hello", DocEntry::new("Returns a welcome message."));
//!
//! let handle = HttpServer(DocsService::new(docs, app)).start("127.0.0.1:8080")?;
//! handle.join().ok();
//! ```
//!
//! ## Runtime
//!
//! The HTTP layer runs on the `may` coroutine runtime through `may_minihttp`.
//! Documentation state is shared across coroutines: mutation is serialized and
//! readers always see a complete snapshot.

pub mod cli;
pub mod config;
pub mod docs;
pub mod error;
pub mod hot_reload;
pub mod logging;
pub mod openapi;
pub mod path;
pub mod registry;
pub mod render;
pub mod router;
pub mod server;
pub mod static_files;
pub mod tree;

pub use config::{DocsConfig, MergeOrder, OpenApiSetting, RequireDocsConfig};
pub use docs::{ApiDocs, Registrar};
pub use error::DocsError;
pub use hot_reload::{ChangeWatcher, ReloadState};
pub use registry::{DocEntry, DocParameter, MethodToken, Registry};
pub use tree::{walk, MountPrefix, Route, RouteNode, RouteSource, RouteTree};
