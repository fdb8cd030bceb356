//! # Route Tree Module
//!
//! The host application's routing table is captured once, at a defined boundary,
//! as an immutable [`RouteTree`]. The walker flattens that tree into the ordered
//! list of [`Route`]s shown on the documentation page.
//!
//! ## Mount prefixes
//!
//! A sub-router is mounted under a [`MountPrefix`]. Hosts that know the literal
//! mount path supply it directly ([`MountPrefix::Literal`]). Hosts that only keep
//! a compiled matcher hand over its source ([`MountPrefix::Pattern`]) and the
//! walker recovers the static literal portion of it:
//!
//! ```text
//! ^\/api\/?(?=\/|$)                   -> /api
//! ^\/users\/(?:([^\/]+?))\/?(?=\/|$)  -> /users
//! ^(.*)                               -> (empty, walk continues)
//! ```
//!
//! ## Ordering
//!
//! Traversal is pre-order and follows registration order within each level. The
//! resulting order is the display order of the rendered page.
//!
//! Two independently registered routes that normalize to the same path (for
//! example `/user/` and `/user`) stay two separate [`Route`]s.

use crate::path::{join, normalize};
use crate::registry::parse_method;
use http::Method;
use once_cell::sync::Lazy;
use regex::Regex;
use smallvec::SmallVec;
use tracing::{debug, warn};

/// Methods of one route, inline for the common case of a handful of verbs.
pub type Methods = SmallVec<[Method; 4]>;

/// A discovered endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Normalized, fully prefixed path
    pub path: String,
    /// Allowed methods, uppercase, never empty
    pub methods: Methods,
}

impl Route {
    /// Methods joined for display, e.g. `GET | POST`.
    #[must_use]
    pub fn methods_label(&self) -> String {
        self.methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// How a sub-router declares where it is mounted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MountPrefix {
    /// Literal mount path supplied by the host
    Literal(String),
    /// Source of a compiled matcher; only its leading static literal is used
    Pattern(String),
}

impl MountPrefix {
    /// The literal prefix contributed by this mount, if one can be recovered.
    #[must_use]
    pub fn literal(&self) -> Option<String> {
        match self {
            MountPrefix::Literal(p) => Some(normalize(p)),
            MountPrefix::Pattern(p) => literal_prefix(p),
        }
    }
}

/// One node of a host routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteNode {
    /// Terminal route with its path template and allowed methods
    Route { path: String, methods: Methods },
    /// Sub-router mounted under a prefix
    Mount {
        prefix: MountPrefix,
        children: Vec<RouteNode>,
    },
}

impl RouteNode {
    /// Terminal route. Methods are uppercased and de-duplicated, first occurrence kept.
    pub fn route<I, M>(path: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>,
    {
        let mut set = Methods::new();
        for m in methods {
            match parse_method(m.as_ref()) {
                Some(method) if !set.contains(&method) => set.push(method),
                Some(_) => {}
                None => debug!(method = m.as_ref(), "ignoring invalid HTTP method"),
            }
        }
        RouteNode::Route {
            path: path.into(),
            methods: set,
        }
    }

    /// Sub-router mounted at a literal prefix.
    pub fn mount(prefix: impl Into<String>, children: Vec<RouteNode>) -> Self {
        RouteNode::Mount {
            prefix: MountPrefix::Literal(prefix.into()),
            children,
        }
    }

    /// Sub-router mounted behind a compiled matcher.
    pub fn mount_pattern(pattern: impl Into<String>, children: Vec<RouteNode>) -> Self {
        RouteNode::Mount {
            prefix: MountPrefix::Pattern(pattern.into()),
            children,
        }
    }
}

/// Immutable snapshot of a host routing table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteTree {
    nodes: Vec<RouteNode>,
}

impl RouteTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<RouteNode>) -> Self {
        Self { nodes }
    }

    /// Append a terminal route.
    #[must_use]
    pub fn route<I, M>(mut self, path: impl Into<String>, methods: I) -> Self
    where
        I: IntoIterator<Item = M>,
        M: AsRef<str>,
    {
        self.nodes.push(RouteNode::route(path, methods));
        self
    }

    /// Append a sub-tree mounted at a literal prefix.
    #[must_use]
    pub fn mount(mut self, prefix: impl Into<String>, child: RouteTree) -> Self {
        self.nodes.push(RouteNode::mount(prefix, child.nodes));
        self
    }

    pub fn push(&mut self, node: RouteNode) {
        self.nodes.push(node);
    }

    pub fn nodes(&self) -> &[RouteNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Anything that can hand its routing table to the documentation engine.
///
/// Returning `None` means the host exposes no introspectable structure.
pub trait RouteSource {
    fn route_tree(&self) -> Option<RouteTree>;
}

impl RouteSource for RouteTree {
    fn route_tree(&self) -> Option<RouteTree> {
        Some(self.clone())
    }
}

// `\/`, `\.`, `\-` escapes, unreserved path characters and bare slashes.
static LITERAL_RUN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\^?((?:\\[/.\-]|[A-Za-z0-9_~%@:\-]|/)*)").expect("literal-run regex is valid")
});

/// Extract the static literal prefix of a matcher source.
///
/// Returns `None` when the matcher has no literal segment at all.
#[must_use]
pub fn literal_prefix(pattern: &str) -> Option<String> {
    let caps = LITERAL_RUN.captures(pattern)?;
    let run = caps.get(1)?;
    let mut literal = run
        .as_str()
        .replace("\\/", "/")
        .replace("\\.", ".")
        .replace("\\-", "-");

    let mut rest = &pattern[run.end()..];
    if let Some(q) = rest.chars().next().filter(|c| matches!(c, '?' | '*' | '+' | '{')) {
        // the quantifier makes the last literal character optional or repeated
        literal.pop();
        rest = &rest[q.len_utf8()..];
    }

    let at_boundary = rest.is_empty()
        || rest.starts_with("(?=")
        || rest.starts_with('$')
        || literal.ends_with('/');
    if !at_boundary {
        match literal.rfind('/') {
            Some(i) => literal.truncate(i + 1),
            None => literal.clear(),
        }
    }

    let literal = normalize(&literal);
    if literal.trim_matches('/').is_empty() {
        None
    } else {
        Some(literal)
    }
}

/// Flatten a route tree into display-ordered routes.
#[must_use]
pub fn walk(tree: &RouteTree) -> Vec<Route> {
    let mut out = Vec::new();
    walk_nodes(tree.nodes(), "", &mut out);
    out
}

fn walk_nodes(nodes: &[RouteNode], prefix: &str, out: &mut Vec<Route>) {
    for node in nodes {
        match node {
            RouteNode::Route { path, methods } => {
                if methods.is_empty() {
                    debug!(path = %path, "skipping route without methods");
                    continue;
                }
                out.push(Route {
                    path: join(prefix, path),
                    methods: methods.clone(),
                });
            }
            RouteNode::Mount { prefix: mount, children } => {
                let segment = mount.literal().unwrap_or_else(|| {
                    debug!(mount = ?mount, "no literal prefix recoverable, mounting at parent");
                    String::new()
                });
                let child_prefix = join(prefix, &segment);
                walk_nodes(children, &child_prefix, out);
            }
        }
    }
}

/// Walk whatever the host exposes; never fails.
///
/// An uninspectable or empty host yields no routes and a warning.
pub fn discover(source: &dyn RouteSource) -> Vec<Route> {
    match source.route_tree() {
        Some(tree) => {
            let routes = walk(&tree);
            if routes.is_empty() {
                warn!("no routes defined on the host application at initialisation");
            } else {
                debug!(count = routes.len(), "discovered routes");
            }
            routes
        }
        None => {
            warn!("host application exposes no introspectable route structure");
            Vec::new()
        }
    }
}
