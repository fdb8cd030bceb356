//! # Router Module
//!
//! A small host router used to serve an application next to its documentation.
//! Paths are compiled to regular expressions at registration time; requests
//! are matched against registered layers in order.
//!
//! Besides dispatching, the router exposes its topology through
//! [`RouteSource`](crate::tree::RouteSource): each nested router becomes a
//! mount with a literal prefix, so the documentation walker can recover full
//! paths without parsing any matcher.
//!
//! ## Example
//!
//! ```rust,ignore
//! use routedoc::router::{HandlerResponse, Router};
//! use serde_json::json;
//!
//! let api = Router::new().post("/user", |req| {
//!     HandlerResponse::json(201, json!({"created": req.body.clone()}))
//! });
//! let app = Router::new()
//!     .get("/hello", |_| HandlerResponse::json(200, json!({"message": "Hello, world!"})))
//!     .nest("/api", api);
//! ```

mod core;

pub use core::{
    Handler, HandlerRequest, HandlerResponse, ParamVec, RouteRequest, Router, MAX_INLINE_PARAMS,
};
