//! # OpenAPI Importer
//!
//! Converts an OpenAPI (or Swagger 2, or a bare path mapping) document into
//! [`DocEntry`] records and registers them through [`Registry::register`], the
//! same entry point manual registrations use.
//!
//! The importer is deliberately lenient: documents are walked as untyped JSON so
//! hand-written contracts such as
//!
//! ```yaml
//! paths:
//!   /widgets:
//!     get:
//!       description: list
//!       responses:
//!         "200": ok
//! ```
//!
//! import cleanly even though they are not strictly valid OpenAPI.
//!
//! ## Failure handling
//!
//! A missing file is a no-op. Unreadable or malformed files are logged and the
//! import is abandoned for that cycle; [`import_from`] never returns an error.

use crate::error::DocsError;
use crate::path::normalize;
use crate::registry::{parse_method, DocEntry, DocParameter, Registry};
use http::Method;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, error, info};

const METHODS: [&str; 8] = ["get", "post", "put", "delete", "patch", "options", "head", "trace"];

/// One `(path, method, entry)` triple read from a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedOperation {
    pub path: String,
    pub method: Method,
    pub entry: DocEntry,
}

/// Read and parse a contract file.
///
/// `Ok(None)` when the file does not exist. YAML for `.yaml`/`.yml`, JSON otherwise.
pub fn load_document(path: &Path) -> Result<Option<Value>, DocsError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| DocsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let value: Value = if is_yaml {
        serde_yaml::from_str(&content).map_err(|e| DocsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    } else {
        serde_json::from_str(&content).map_err(|e| DocsError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    };
    if !value.is_object() {
        return Err(DocsError::Parse {
            path: path.to_path_buf(),
            message: "document root is not a mapping".to_string(),
        });
    }
    Ok(Some(value))
}

/// Import `path` into `registry`. Returns the number of entries registered.
pub fn import_from(path: &Path, registry: &mut Registry) -> usize {
    match load_document(path) {
        Ok(None) => {
            debug!(path = %path.display(), "no OpenAPI document, skipping import");
            0
        }
        Ok(Some(doc)) => {
            let ops = entries_from_document(&doc);
            let count = ops.len();
            for op in ops {
                registry.register(&op.path, Some(op.method), op.entry);
            }
            info!(path = %path.display(), entries = count, "imported OpenAPI documentation");
            count
        }
        Err(e) => {
            error!(error = %e, "OpenAPI import failed, keeping manual documentation only");
            0
        }
    }
}

/// Every operation of a parsed document, ordered by path template.
pub fn entries_from_document(doc: &Value) -> Vec<ImportedOperation> {
    let paths = match doc.get("paths").and_then(Value::as_object) {
        Some(p) => p,
        None => match doc.as_object() {
            Some(bare) if doc.get("openapi").is_none() && doc.get("swagger").is_none() => bare,
            _ => return Vec::new(),
        },
    };

    let mut out = Vec::new();
    for (template, item) in paths {
        let Some(item) = resolve(doc, item).as_object() else {
            continue;
        };
        let shared = item.get("parameters").and_then(Value::as_array);
        for (key, operation) in item {
            if !METHODS.contains(&key.to_ascii_lowercase().as_str()) {
                continue;
            }
            let Some(method) = parse_method(key) else {
                continue;
            };
            let operation = resolve(doc, operation);
            out.push(ImportedOperation {
                path: normalize(template),
                method,
                entry: operation_entry(doc, operation, shared),
            });
        }
    }
    out
}

fn operation_entry(doc: &Value, op: &Value, shared: Option<&Vec<Value>>) -> DocEntry {
    let description = op
        .get("description")
        .and_then(Value::as_str)
        .or_else(|| op.get("summary").and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    let own: Vec<DocParameter> = op
        .get("parameters")
        .and_then(Value::as_array)
        .map(|params| params.iter().filter_map(|p| parameter(doc, p)).collect())
        .unwrap_or_default();

    // path-level parameters apply unless the operation redeclares them
    let mut parameters: Vec<DocParameter> = shared
        .map(|params| {
            params
                .iter()
                .filter_map(|p| parameter(doc, p))
                .filter(|p| !own.iter().any(|o| o.name == p.name))
                .collect()
        })
        .unwrap_or_default();
    parameters.extend(own);

    let responses = op
        .get("responses")
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .map(|(code, resp)| (code.clone(), response_text(resolve(doc, resp))))
                .collect::<BTreeMap<_, _>>()
        })
        .unwrap_or_default();

    DocEntry {
        description,
        parameters,
        responses,
    }
}

fn parameter(doc: &Value, raw: &Value) -> Option<DocParameter> {
    let p = resolve(doc, raw);
    let name = p.get("name")?.as_str()?.to_string();
    let ty = p
        .get("type")
        .and_then(Value::as_str)
        .or_else(|| {
            p.get("schema")
                .map(|s| resolve(doc, s))
                .and_then(|s| s.get("type"))
                .and_then(Value::as_str)
        })
        .unwrap_or("string")
        .to_string();
    let description = p
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Some(DocParameter {
        name,
        ty,
        description,
    })
}

/// Example body, else description, else a dump of the content schema.
fn response_text(resp: &Value) -> String {
    let obj = match resp {
        Value::String(s) => return s.clone(),
        Value::Object(obj) => obj,
        Value::Null => return String::new(),
        other => return other.to_string(),
    };

    if let Some(example) = example_of(obj) {
        return display(example);
    }
    if let Some(desc) = obj.get("description").and_then(Value::as_str) {
        return desc.to_string();
    }
    let schema = obj
        .get("content")
        .and_then(Value::as_object)
        .and_then(|content| content.values().find_map(|media| media.get("schema")))
        .or_else(|| obj.get("schema"));
    match schema.or_else(|| obj.get("content")) {
        Some(v) => serde_json::to_string_pretty(v).unwrap_or_default(),
        None => String::new(),
    }
}

fn example_of(obj: &Map<String, Value>) -> Option<&Value> {
    if let Some(content) = obj.get("content").and_then(Value::as_object) {
        for media in content.values() {
            if let Some(example) = media.get("example") {
                return Some(example);
            }
            if let Some(value) = media
                .get("examples")
                .and_then(Value::as_object)
                .and_then(|examples| examples.values().find_map(|ex| ex.get("value")))
            {
                return Some(value);
            }
        }
    }
    // Swagger 2: examples keyed by mime type
    if let Some(example) = obj
        .get("examples")
        .and_then(Value::as_object)
        .and_then(|examples| examples.values().next())
    {
        return Some(example);
    }
    obj.get("example")
}

fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

/// Follow a local `$ref` (`#/...`) once; anything else is returned unchanged.
fn resolve<'a>(doc: &'a Value, v: &'a Value) -> &'a Value {
    let Some(reference) = v.get("$ref").and_then(Value::as_str) else {
        return v;
    };
    match reference.strip_prefix('#') {
        Some(pointer) => doc.pointer(pointer).unwrap_or(v),
        None => v,
    }
}
