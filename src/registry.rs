//! # Documentation Registry
//!
//! In-memory store of [`DocEntry`] records keyed by normalized path and
//! [`MethodToken`]. At most one entry exists per `(path, token)` pair; a later
//! registration for the same key replaces the earlier one.
//!
//! An entry registered without a method lands under [`MethodToken::All`] and
//! is what [`Registry::lookup`] falls back to when a route's method has no
//! specific entry.

use crate::path::normalize;
use http::Method;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Parse an HTTP verb case-insensitively.
#[must_use]
pub fn parse_method(raw: &str) -> Option<Method> {
    let upper = raw.trim().to_ascii_uppercase();
    if upper.is_empty() {
        return None;
    }
    Method::from_bytes(upper.as_bytes()).ok()
}

/// One documented parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocParameter {
    pub name: String,
    #[serde(rename = "type", default = "default_param_type")]
    pub ty: String,
    #[serde(default)]
    pub description: String,
}

fn default_param_type() -> String {
    "string".to_string()
}

/// Documentation attached to a route, optionally for one method only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocEntry {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<DocParameter>,
    /// Status code to example body or textual summary
    #[serde(default)]
    pub responses: BTreeMap<String, String>,
}

impl DocEntry {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn param(
        mut self,
        name: impl Into<String>,
        ty: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.parameters.push(DocParameter {
            name: name.into(),
            ty: ty.into(),
            description: description.into(),
        });
        self
    }

    #[must_use]
    pub fn response(mut self, status: impl Into<String>, body: impl Into<String>) -> Self {
        self.responses.insert(status.into(), body.into());
        self
    }
}

/// Method scope of a registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MethodToken {
    /// Applies to every method of the route
    All,
    Method(Method),
}

impl From<Option<Method>> for MethodToken {
    fn from(method: Option<Method>) -> Self {
        match method {
            Some(m) => MethodToken::Method(m),
            None => MethodToken::All,
        }
    }
}

impl fmt::Display for MethodToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodToken::All => write!(f, "ALL"),
            MethodToken::Method(m) => write!(f, "{}", m.as_str()),
        }
    }
}

/// Path -> method token -> entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    entries: HashMap<String, HashMap<MethodToken, DocEntry>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `entry` for `path`, scoped to `method` or to all methods.
    ///
    /// Last write wins at `(normalized path, token)` granularity.
    pub fn register(&mut self, path: &str, method: Option<Method>, entry: DocEntry) {
        self.insert(normalize(path), MethodToken::from(method), entry);
    }

    fn insert(&mut self, path: String, token: MethodToken, entry: DocEntry) {
        self.entries.entry(path).or_default().insert(token, entry);
    }

    /// Exact lookup without wildcard fallback.
    pub fn get(&self, path: &str, token: &MethodToken) -> Option<&DocEntry> {
        self.entries.get(&normalize(path))?.get(token)
    }

    /// Entry for `method` on `path`, falling back to the `ALL` entry.
    pub fn lookup(&self, path: &str, method: &Method) -> Option<&DocEntry> {
        let by_method = self.entries.get(&normalize(path))?;
        by_method
            .get(&MethodToken::Method(method.clone()))
            .or_else(|| by_method.get(&MethodToken::All))
    }

    /// Apply every entry of `other` on top of this registry.
    pub fn overlay(&mut self, other: &Registry) {
        for (path, by_method) in &other.entries {
            for (token, entry) in by_method {
                self.insert(path.clone(), token.clone(), entry.clone());
            }
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of `(path, token)` entries.
    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Documented paths, sorted.
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        paths.sort_unstable();
        paths
    }

    /// Tokens registered for `path`.
    pub fn tokens(&self, path: &str) -> Vec<MethodToken> {
        self.entries
            .get(&normalize(path))
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}
