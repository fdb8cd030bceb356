use crate::path::normalize;
use crate::tree::{RouteNode, RouteSource, RouteTree};
use http::Method;
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Value};
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, error};

/// Maximum number of path/query parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Name/value pairs, inline for the common case.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A request as seen by the host router.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    pub method: Method,
    /// Path without query string
    pub path: String,
    pub query_params: ParamVec,
    /// Parsed JSON body, if any
    pub body: Option<Value>,
}

impl RouteRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query_params: ParamVec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query_params.push((Arc::from(name), value.into()));
        self
    }
}

/// What a handler receives: the request plus captured path parameters.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    pub method: Method,
    pub path: String,
    pub path_params: ParamVec,
    pub query_params: ParamVec,
    pub body: Option<Value>,
}

impl HandlerRequest {
    /// Path parameter by name. The last occurrence wins.
    #[must_use]
    pub fn get_path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Query parameter by name. The last occurrence wins.
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Handler output. A string body is sent as text, anything else as JSON.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    pub body: Value,
}

impl HandlerResponse {
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: Value::String(body.into()),
        }
    }
}

pub type Handler = Arc<dyn Fn(&HandlerRequest) -> HandlerResponse + Send + Sync>;

#[derive(Clone)]
struct Endpoint {
    /// Methods served by this one registration
    methods: Vec<Method>,
    /// Path as declared, used for route discovery
    declared: String,
    regex: Regex,
    param_names: Vec<Arc<str>>,
    handler: Handler,
}

#[derive(Clone)]
enum Layer {
    Endpoint(Endpoint),
    Nested { prefix: String, router: Router },
}

/// Minimal host router: method + path handlers and nested sub-routers.
///
/// Layers are matched in registration order; the first match wins.
#[derive(Clone, Default)]
pub struct Router {
    layers: Vec<Layer>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` on `path`.
    ///
    /// Path parameters are written `{name}` or `:name`.
    #[must_use]
    pub fn route<F>(self, method: Method, path: &str, handler: F) -> Self
    where
        F: Fn(&HandlerRequest) -> HandlerResponse + Send + Sync + 'static,
    {
        self.route_multi([method], path, handler)
    }

    /// Register one `handler` for several methods on `path`.
    ///
    /// Discovery reports this as a single route carrying all of `methods`;
    /// separate `route` calls on the same path stay separate routes.
    #[must_use]
    pub fn route_multi<F>(
        mut self,
        methods: impl IntoIterator<Item = Method>,
        path: &str,
        handler: F,
    ) -> Self
    where
        F: Fn(&HandlerRequest) -> HandlerResponse + Send + Sync + 'static,
    {
        let (regex, param_names) = Self::path_to_regex(&normalize(path));
        self.layers.push(Layer::Endpoint(Endpoint {
            methods: methods.into_iter().collect(),
            declared: path.to_string(),
            regex,
            param_names,
            handler: Arc::new(handler),
        }));
        self
    }

    #[must_use]
    pub fn get<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&HandlerRequest) -> HandlerResponse + Send + Sync + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    #[must_use]
    pub fn post<F>(self, path: &str, handler: F) -> Self
    where
        F: Fn(&HandlerRequest) -> HandlerResponse + Send + Sync + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    /// Mount `router` below `prefix`.
    #[must_use]
    pub fn nest(mut self, prefix: &str, router: Router) -> Self {
        self.layers.push(Layer::Nested {
            prefix: normalize(prefix),
            router,
        });
        self
    }

    /// Dispatch `req` to the first matching handler.
    ///
    /// `None` when nothing matches. A panicking handler yields a 500.
    pub fn dispatch(&self, req: &RouteRequest) -> Option<HandlerResponse> {
        self.dispatch_at(&normalize(&req.path), req)
    }

    fn dispatch_at(&self, path: &str, req: &RouteRequest) -> Option<HandlerResponse> {
        for layer in &self.layers {
            match layer {
                Layer::Endpoint(ep) => {
                    if !ep.methods.contains(&req.method) {
                        continue;
                    }
                    let Some(caps) = ep.regex.captures(path) else {
                        continue;
                    };
                    let path_params: ParamVec = ep
                        .param_names
                        .iter()
                        .zip(caps.iter().skip(1))
                        .filter_map(|(name, m)| m.map(|m| (Arc::clone(name), m.as_str().to_string())))
                        .collect();
                    debug!(method = %req.method, path = %req.path, route = %ep.declared, "route matched");
                    let handler_req = HandlerRequest {
                        method: req.method.clone(),
                        path: req.path.clone(),
                        path_params,
                        query_params: req.query_params.clone(),
                        body: req.body.clone(),
                    };
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        (ep.handler)(&handler_req)
                    }));
                    return Some(outcome.unwrap_or_else(|_| {
                        error!(route = %ep.declared, "handler panicked");
                        HandlerResponse::json(500, json!({"error": "Handler panicked"}))
                    }));
                }
                Layer::Nested { prefix, router } => {
                    if let Some(rest) = strip_mount(path, prefix) {
                        if let Some(res) = router.dispatch_at(&rest, req) {
                            return Some(res);
                        }
                    }
                }
            }
        }
        None
    }

    pub(crate) fn path_to_regex(path: &str) -> (Regex, Vec<Arc<str>>) {
        let mut pattern = String::with_capacity(path.len() + 5);
        pattern.push('^');
        let mut param_names = Vec::new();

        for segment in path.split('/') {
            let param = if segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2 {
                Some(&segment[1..segment.len() - 1])
            } else {
                segment.strip_prefix(':').filter(|name| !name.is_empty())
            };
            if let Some(name) = param {
                pattern.push_str("/([^/]+)");
                param_names.push(Arc::from(name));
            } else if !segment.is_empty() {
                pattern.push('/');
                pattern.push_str(&regex::escape(segment));
            }
        }
        if pattern.len() == 1 {
            pattern.push('/');
        }
        pattern.push('$');

        // literals are escaped, so the pattern always compiles
        let regex = Regex::new(&pattern).expect("Failed to compile path regex");
        (regex, param_names)
    }

    /// One node per registration, in registration order.
    fn tree_nodes(&self) -> Vec<RouteNode> {
        self.layers
            .iter()
            .map(|layer| match layer {
                Layer::Endpoint(ep) => {
                    RouteNode::route(ep.declared.clone(), ep.methods.iter().map(Method::as_str))
                }
                Layer::Nested { prefix, router } => {
                    RouteNode::mount(prefix.clone(), router.tree_nodes())
                }
            })
            .collect()
    }
}

/// Remainder of `path` below `prefix`, at a segment boundary.
fn strip_mount(path: &str, prefix: &str) -> Option<String> {
    if prefix == "/" {
        return Some(path.to_string());
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some("/".to_string())
    } else if rest.starts_with('/') {
        Some(rest.to_string())
    } else {
        None
    }
}

impl RouteSource for Router {
    fn route_tree(&self) -> Option<RouteTree> {
        Some(RouteTree::from_nodes(self.tree_nodes()))
    }
}
