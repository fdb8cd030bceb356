use crate::router::{ParamVec, RouteRequest};
use http::Method;
use may_minihttp::Request;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Request data extracted from a `may_minihttp::Request`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    /// Method as sent by the client
    pub method: String,
    /// Path without query string
    pub path: String,
    /// Lowercase header names
    pub headers: HashMap<String, String>,
    pub query_params: ParamVec,
    /// Body parsed as JSON, if it is JSON
    pub body: Option<serde_json::Value>,
}

impl ParsedRequest {
    /// Router view of this request, or `None` for an unusable method.
    pub fn to_route_request(&self) -> Option<RouteRequest> {
        let method = crate::registry::parse_method(&self.method)?;
        Some(RouteRequest {
            method,
            path: self.path.clone(),
            query_params: self.query_params.clone(),
            body: self.body.clone(),
        })
    }

    pub fn is_read(&self) -> bool {
        matches!(
            crate::registry::parse_method(&self.method),
            Some(Method::GET) | Some(Method::HEAD)
        )
    }
}

/// Parse the query string of `path` (everything after `?`), URL-decoded.
pub fn parse_query_params(path: &str) -> ParamVec {
    match path.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect(),
        None => ParamVec::new(),
    }
}

/// Split a raw request target into path and query parameters.
pub fn split_target(raw: &str) -> (String, ParamVec) {
    let path = raw.split(['?', '#']).next().unwrap_or("/");
    let path = if path.is_empty() { "/" } else { path };
    (path.to_string(), parse_query_params(raw))
}

pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let (path, query_params) = split_target(req.path());

    let headers: HashMap<String, String> = req
        .headers()
        .iter()
        .map(|h| {
            (
                h.name.to_ascii_lowercase(),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let mut raw_body = String::new();
    let body = match req.body().read_to_string(&mut raw_body) {
        Ok(size) if size > 0 => {
            let parsed = serde_json::from_str(&raw_body).ok();
            debug!(size, json = parsed.is_some(), "request body read");
            parsed
        }
        _ => None,
    };

    debug!(method = %method, path = %path, params = query_params.len(), "HTTP request parsed");

    ParsedRequest {
        method,
        path,
        headers,
        query_params,
        body,
    }
}
