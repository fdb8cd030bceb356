//! Documentation page rendering.
//!
//! The page is a minijinja template compiled into the binary. Output is HTML
//! auto-escaped. If the template cannot be rendered a bare fallback page is
//! produced instead, so the docs endpoint always answers with a page.

use crate::registry::{DocEntry, DocParameter, Registry};
use crate::tree::Route;
use minijinja::{AutoEscape, Environment, Error, Output, State, Value};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::fmt::Write;
use tracing::error;

/// Description shown for a route method without documentation.
pub const PLACEHOLDER: &str = "No documentation provided.";

const PAGE: &str = "docs.html";
const PAGE_TEMPLATE: &str = include_str!("../templates/docs.html");

static TEMPLATES: Lazy<Result<Environment<'static>, String>> = Lazy::new(|| {
    let mut env = Environment::new();
    // paths stay readable: `/` is not entity-encoded
    env.set_formatter(|out: &mut Output<'_>, state: &State<'_, '_>, value: &Value| {
        if matches!(state.auto_escape(), AutoEscape::Html) && !value.is_safe() {
            if let Some(s) = value.as_str() {
                return out.write_str(&escape(s)).map_err(Error::from);
            }
        }
        minijinja::escape_formatter(out, state, value)
    });
    env.add_template(PAGE, PAGE_TEMPLATE)
        .map_err(|e| e.to_string())?;
    Ok(env)
});

#[derive(Debug, Serialize)]
struct PageView<'a> {
    name: &'a str,
    asset_base: &'a str,
    routes: Vec<RouteView>,
}

#[derive(Debug, Serialize)]
struct RouteView {
    path: String,
    anchor: String,
    methods: String,
    operations: Vec<OperationView>,
}

#[derive(Debug, Serialize)]
struct OperationView {
    method: String,
    anchor: String,
    documented: bool,
    description: String,
    parameters: Vec<DocParameter>,
    responses: Vec<ResponseView>,
}

#[derive(Debug, Serialize)]
struct ResponseView {
    status: String,
    body: String,
}

/// HTML id for a route path: `/` and `:` become `_`.
pub fn anchor_id(path: &str) -> String {
    path.replace(['/', ':'], "_")
}

/// Id of the route at `index` in the route list. Unique even when two routes
/// share a path.
fn route_anchor(index: usize, path: &str) -> String {
    format!("route{index}{}", anchor_id(path))
}

fn operation(route: &Route, anchor: &str, method: &http::Method, registry: &Registry) -> OperationView {
    let entry = registry.lookup(&route.path, method);
    let DocEntry {
        description,
        parameters,
        responses,
    } = entry.cloned().unwrap_or_default();
    let description = if entry.is_none() || description.trim().is_empty() {
        PLACEHOLDER.to_string()
    } else {
        description
    };
    OperationView {
        method: method.as_str().to_string(),
        anchor: format!("{anchor}_{}", method.as_str()),
        documented: entry.is_some(),
        description,
        parameters,
        responses: responses
            .into_iter()
            .map(|(status, body)| ResponseView { status, body })
            .collect(),
    }
}

fn page_view<'a>(name: &'a str, endpoint: &'a str, routes: &[Route], registry: &Registry) -> PageView<'a> {
    PageView {
        name,
        asset_base: endpoint.trim_end_matches('/'),
        routes: routes
            .iter()
            .enumerate()
            .map(|(index, route)| {
                let anchor = route_anchor(index, &route.path);
                RouteView {
                    path: route.path.clone(),
                    methods: route.methods_label(),
                    operations: route
                        .methods
                        .iter()
                        .map(|m| operation(route, &anchor, m, registry))
                        .collect(),
                    anchor,
                }
            })
            .collect(),
    }
}

/// Render the documentation page for `routes` against `registry`.
///
/// Route order is the order of `routes`; registry entries for paths that are
/// not routes are not shown.
pub fn render_page(name: &str, endpoint: &str, routes: &[Route], registry: &Registry) -> String {
    let view = page_view(name, endpoint, routes, registry);
    let rendered = match &*TEMPLATES {
        Ok(env) => env
            .get_template(PAGE)
            .and_then(|tpl| tpl.render(&view))
            .map_err(|e| e.to_string()),
        Err(e) => Err(e.clone()),
    };
    match rendered {
        Ok(html) => html,
        Err(e) => {
            error!(error = %e, "documentation template failed, serving fallback page");
            fallback_page(&view)
        }
    }
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

fn fallback_page(view: &PageView<'_>) -> String {
    let mut html = format!(
        "<!DOCTYPE html>\n<html lang=\"en\"><head><meta charset=\"utf-8\"/><title>{0}</title></head><body><h1>{0}</h1><ul>",
        escape(view.name)
    );
    for route in &view.routes {
        html.push_str(&format!(
            "<li><code>{}</code> {}</li>",
            escape(&route.methods),
            escape(&route.path)
        ));
    }
    html.push_str("</ul></body></html>\n");
    html
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{walk, RouteTree};
    use http::Method;

    fn routes() -> Vec<Route> {
        walk(
            &RouteTree::new()
                .route("/hello", ["GET"])
                .mount("/api", RouteTree::new().route("/user/:id", ["GET", "DELETE"])),
        )
    }

    #[test]
    fn test_anchor_id() {
        assert_eq!(anchor_id("/api/user/:id"), "_api_user__id");
    }

    #[test]
    fn test_placeholder_for_undocumented_routes() {
        let html = render_page("Docs", "/docs", &routes(), &Registry::new());
        assert_eq!(html.matches(PLACEHOLDER).count(), 3);
        assert!(html.contains("<title>Docs</title>"));
        assert!(html.contains("href=\"/docs/style.css\""));
        assert!(html.contains("src=\"/docs/script.js\""));
    }

    #[test]
    fn test_method_entry_and_all_fallback() {
        let mut reg = Registry::new();
        reg.register("/api/user/:id", None, DocEntry::new("Any user operation"));
        reg.register(
            "/api/user/:id",
            Some(Method::DELETE),
            DocEntry::new("Deletes a user").response("204", "gone"),
        );
        let html = render_page("Docs", "/docs", &routes(), &reg);
        assert!(html.contains("Any user operation"));
        assert!(html.contains("Deletes a user"));
        assert!(html.contains("<pre><code>gone</code></pre>"));
        assert_eq!(html.matches(PLACEHOLDER).count(), 1);
    }

    #[test]
    fn test_route_order_follows_route_list() {
        let html = render_page("Docs", "/docs", &routes(), &Registry::new());
        let hello = html.find("data-path=\"/hello\"").unwrap();
        let user = html.find("data-path=\"/api/user/:id\"").unwrap();
        assert!(hello < user);
    }

    #[test]
    fn test_content_is_escaped() {
        let mut reg = Registry::new();
        reg.register(
            "/hello",
            None,
            DocEntry::new("<script>alert(1)</script>").response("200", "{\"a\": \"<b>\"}"),
        );
        let html = render_page("A & B", "/docs", &routes(), &reg);
        assert!(!html.contains("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("A &amp; B"));
    }

    #[test]
    fn test_routes_sharing_a_path_get_distinct_anchors() {
        let routes = walk(
            &RouteTree::new()
                .route("/user/", ["GET"])
                .route("/user", ["GET"]),
        );
        assert_eq!(routes[0].path, routes[1].path);
        let html = render_page("Docs", "/docs", &routes, &Registry::new());
        assert!(html.contains("id=\"route0_user\""));
        assert!(html.contains("id=\"route1_user\""));
        assert!(html.contains("data-target=\"route1_user\""));
        assert!(html.contains("id=\"route0_user_GET\""));
        assert!(html.contains("id=\"route1_user_GET\""));
    }

    #[test]
    fn test_empty_route_list_still_renders() {
        let html = render_page("Docs", "/", &[], &Registry::new());
        assert!(html.contains("No routes registered."));
        assert!(html.contains("href=\"/style.css\""));
    }

    #[test]
    fn test_fallback_page_escapes() {
        let view = page_view("<x>", "/docs", &routes(), &Registry::new());
        let html = fallback_page(&view);
        assert!(html.contains("&lt;x&gt;"));
        assert!(html.contains("/api/user/:id"));
    }
}
