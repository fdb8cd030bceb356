//! # Configuration Module
//!
//! [`DocsConfig`] is the whole configuration surface of the documentation
//! engine. It deserializes from YAML, TOML or JSON and can be adjusted from the
//! environment after loading.
//!
//! ## Example (`routedoc.yaml`)
//!
//! ```yaml
//! name: Pet Store API
//! endpoint: /docs
//! openapi: doc/openapi.yaml
//! require_docs:
//!   hot_reload: true
//!   autoload: true
//!   openapi: true
//!   sources:
//!     - doc/manual.yaml
//!   debounce_ms: 100
//!   merge_order: openapi_first
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |---|---|
//! | `ROUTEDOC_NAME` | `name` |
//! | `ROUTEDOC_ENDPOINT` | `endpoint` |
//! | `ROUTEDOC_OPENAPI` | `openapi` (`false` disables) |
//! | `ROUTEDOC_HOT_RELOAD` | `require_docs.hot_reload` |
//! | `ROUTEDOC_DEBOUNCE_MS` | `require_docs.debounce_ms` |

use crate::error::DocsError;
use crate::path::normalize;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_ENDPOINT: &str = "/docs";
pub const DEFAULT_NAME: &str = "API Documentation";
pub const DEFAULT_OPENAPI_FILE: &str = "openapi.yaml";
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// Where the OpenAPI document lives, or `false` to disable importing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OpenApiSetting {
    Toggle(bool),
    Path(PathBuf),
}

impl Default for OpenApiSetting {
    fn default() -> Self {
        OpenApiSetting::Toggle(false)
    }
}

impl OpenApiSetting {
    /// Contract path when importing is enabled.
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            OpenApiSetting::Toggle(false) => None,
            OpenApiSetting::Toggle(true) => Some(PathBuf::from(DEFAULT_OPENAPI_FILE)),
            OpenApiSetting::Path(p) => Some(p.clone()),
        }
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "false" | "off" | "" => OpenApiSetting::Toggle(false),
            "true" | "on" => OpenApiSetting::Toggle(true),
            _ => OpenApiSetting::Path(PathBuf::from(raw.trim())),
        }
    }
}

/// Which source wins when manual and imported documentation share a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOrder {
    /// Import first, manual registrations applied on top (manual wins)
    #[default]
    OpenapiFirst,
    /// Manual registrations first, imported entries applied on top (OpenAPI wins)
    ManualFirst,
}

/// Registration and reload behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequireDocsConfig {
    /// Watch documentation sources and rebuild on change
    pub hot_reload: bool,
    /// Import the OpenAPI document when the engine is constructed
    pub autoload: bool,
    /// Include the OpenAPI document in the watched set
    pub openapi: bool,
    /// Documentation manifests (path -> method -> entry) loaded as manual registrations
    pub sources: Vec<PathBuf>,
    pub debounce_ms: u64,
    pub merge_order: MergeOrder,
}

impl Default for RequireDocsConfig {
    fn default() -> Self {
        Self {
            hot_reload: false,
            autoload: true,
            openapi: true,
            sources: Vec::new(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            merge_order: MergeOrder::default(),
        }
    }
}

impl RequireDocsConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Documentation engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocsConfig {
    /// Page title
    pub name: String,
    /// Mount path of the documentation page and its assets
    pub endpoint: String,
    pub openapi: OpenApiSetting,
    pub require_docs: RequireDocsConfig,
    /// Directory overriding the embedded `style.css` / `script.js`
    pub assets_dir: Option<PathBuf>,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            openapi: OpenApiSetting::default(),
            require_docs: RequireDocsConfig::default(),
            assets_dir: None,
        }
    }
}

impl DocsConfig {
    /// Load from a YAML, TOML or JSON file (by extension).
    pub fn from_file(path: &Path) -> Result<Self, DocsError> {
        let content = std::fs::read_to_string(path).map_err(|source| DocsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_err = |message: String| DocsError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let config: DocsConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| parse_err(e.to_string()))?
            }
            Some("toml") => toml::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
            _ => serde_json::from_str(&content).map_err(|e| parse_err(e.to_string()))?,
        };
        config.validated()
    }

    /// Apply `ROUTEDOC_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(name) = env::var("ROUTEDOC_NAME") {
            self.name = name;
        }
        if let Ok(endpoint) = env::var("ROUTEDOC_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Ok(openapi) = env::var("ROUTEDOC_OPENAPI") {
            self.openapi = OpenApiSetting::parse(&openapi);
        }
        if let Some(hot) = env::var("ROUTEDOC_HOT_RELOAD")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.require_docs.hot_reload = hot;
        }
        if let Some(ms) = env::var("ROUTEDOC_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.require_docs.debounce_ms = ms;
        }
        self
    }

    /// Normalize the endpoint and reject values the server cannot mount.
    pub fn validated(mut self) -> Result<Self, DocsError> {
        let endpoint = normalize(self.endpoint.trim());
        if !endpoint.starts_with('/') {
            return Err(DocsError::Config(format!(
                "endpoint must start with '/': {:?}",
                self.endpoint
            )));
        }
        if endpoint.contains(['?', '#']) {
            return Err(DocsError::Config(format!(
                "endpoint must be a plain path: {:?}",
                self.endpoint
            )));
        }
        self.endpoint = endpoint;
        Ok(self)
    }

    /// Lenient counterpart of [`validated`](Self::validated), used when the
    /// engine is constructed.
    ///
    /// A missing leading `/` is added. An endpoint that still cannot be
    /// mounted falls back to [`DEFAULT_ENDPOINT`].
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let raw = self.endpoint.trim();
        let rooted = if raw.starts_with('/') {
            raw.to_string()
        } else {
            warn!(endpoint = %self.endpoint, "documentation endpoint is relative, mounting at root");
            format!("/{raw}")
        };
        let endpoint = normalize(&rooted);
        if endpoint.contains(['?', '#']) || endpoint.chars().any(char::is_whitespace) {
            warn!(
                endpoint = %self.endpoint,
                fallback = DEFAULT_ENDPOINT,
                "documentation endpoint cannot be mounted, using default"
            );
            self.endpoint = DEFAULT_ENDPOINT.to_string();
        } else {
            self.endpoint = endpoint;
        }
        self
    }

    /// OpenAPI path when importing is enabled.
    pub fn openapi_path(&self) -> Option<PathBuf> {
        self.openapi.path()
    }

    /// Files whose modification triggers a reload.
    pub fn watched_paths(&self) -> Vec<PathBuf> {
        let mut paths = self.require_docs.sources.clone();
        if self.require_docs.openapi {
            if let Some(p) = self.openapi_path() {
                paths.push(p);
            }
        }
        paths
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = DocsConfig::default();
        assert_eq!(cfg.endpoint, "/docs");
        assert_eq!(cfg.openapi_path(), None);
        assert!(cfg.require_docs.autoload);
        assert!(!cfg.require_docs.hot_reload);
        assert_eq!(cfg.require_docs.debounce(), Duration::from_millis(100));
        assert_eq!(cfg.require_docs.merge_order, MergeOrder::OpenapiFirst);
    }

    #[test]
    fn test_openapi_setting_forms() {
        let cfg: DocsConfig = serde_yaml::from_str("openapi: false").unwrap();
        assert_eq!(cfg.openapi_path(), None);
        let cfg: DocsConfig = serde_yaml::from_str("openapi: true").unwrap();
        assert_eq!(cfg.openapi_path(), Some(PathBuf::from("openapi.yaml")));
        let cfg: DocsConfig = serde_yaml::from_str("openapi: spec/api.json").unwrap();
        assert_eq!(cfg.openapi_path(), Some(PathBuf::from("spec/api.json")));
    }

    #[test]
    fn test_from_yaml_file_normalizes_endpoint() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            "name: Shop\nendpoint: /api-docs/\nrequire_docs:\n  hot_reload: true\n  merge_order: manual_first"
        )
        .unwrap();
        let cfg = DocsConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.name, "Shop");
        assert_eq!(cfg.endpoint, "/api-docs");
        assert!(cfg.require_docs.hot_reload);
        assert!(cfg.require_docs.autoload);
        assert_eq!(cfg.require_docs.merge_order, MergeOrder::ManualFirst);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "endpoint = \"/reference\"\nopenapi = \"openapi.json\"").unwrap();
        let cfg = DocsConfig::from_file(file.path()).unwrap();
        assert_eq!(cfg.endpoint, "/reference");
        assert_eq!(cfg.openapi_path(), Some(PathBuf::from("openapi.json")));
    }

    #[test]
    fn test_relative_endpoint_rejected() {
        let cfg = DocsConfig {
            endpoint: "docs".to_string(),
            ..Default::default()
        };
        assert!(matches!(cfg.validated(), Err(DocsError::Config(_))));
    }

    #[test]
    fn test_sanitized_endpoint_is_lenient() {
        let with = |endpoint: &str| {
            DocsConfig {
                endpoint: endpoint.to_string(),
                ..Default::default()
            }
            .sanitized()
            .endpoint
        };
        assert_eq!(with("api-docs"), "/api-docs");
        assert_eq!(with(" //guide// "), "/guide");
        assert_eq!(with(""), "/");
        assert_eq!(with("/docs?x=1"), DEFAULT_ENDPOINT);
        assert_eq!(with("my docs"), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_watched_paths() {
        let mut cfg = DocsConfig {
            openapi: OpenApiSetting::Path(PathBuf::from("api.yaml")),
            ..Default::default()
        };
        cfg.require_docs.sources = vec![PathBuf::from("manual.yaml")];
        assert_eq!(
            cfg.watched_paths(),
            vec![PathBuf::from("manual.yaml"), PathBuf::from("api.yaml")]
        );
        cfg.require_docs.openapi = false;
        assert_eq!(cfg.watched_paths(), vec![PathBuf::from("manual.yaml")]);
    }

    #[test]
    fn test_openapi_setting_parse() {
        assert_eq!(OpenApiSetting::parse("false"), OpenApiSetting::Toggle(false));
        assert_eq!(
            OpenApiSetting::parse("x.yaml"),
            OpenApiSetting::Path(PathBuf::from("x.yaml"))
        );
    }
}
