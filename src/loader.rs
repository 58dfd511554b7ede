//! Schema document loading from files, strings, and HTTP URLs.
//!
//! Documents are YAML (or JSON) files whose `$graph` lists node descriptors.
//! The loader flattens documents into the raw descriptor sequence the
//! resolver consumes.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::LoadError;
use crate::types::{resolve_token, GenerateOptions, DOCUMENTATION_TYPE};

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a schema document from a file path.
///
/// `.json` files are parsed as JSON, everything else as YAML.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, or a parse
/// error if the content is malformed.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_document_str(&content, &path.display().to_string())
}

/// Parse a schema document from a string.
///
/// `origin` names the document in errors and selects the format: JSON when it
/// ends in `.json`, YAML otherwise (YAML also accepts JSON input).
pub fn load_document_str(content: &str, origin: &str) -> Result<Value, LoadError> {
    if origin.ends_with(".json") {
        serde_json::from_str(content).map_err(|source| LoadError::InvalidJson {
            origin: origin.to_string(),
            source,
        })
    } else {
        serde_yaml::from_str(content).map_err(|source| LoadError::InvalidYaml {
            origin: origin.to_string(),
            source,
        })
    }
}

/// Load a schema document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails, or a parse error
/// if the body is malformed.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let network = |source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    };

    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(network)?;

    let body = client
        .get(url)
        .send()
        .and_then(|response| response.error_for_status())
        .and_then(|response| response.text())
        .map_err(network)?;

    load_document_str(&body, url)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Load a document from a file path or URL (auto-detected).
pub fn load_document_auto(source: &str) -> Result<Value, LoadError> {
    if is_url(source) {
        #[cfg(feature = "remote")]
        {
            load_document_url(source)
        }
        #[cfg(not(feature = "remote"))]
        {
            Err(LoadError::FileNotFound {
                path: std::path::PathBuf::from(source),
            })
        }
    } else {
        load_document(Path::new(source))
    }
}

/// Node descriptors of a document.
///
/// Takes the `$graph` sequence when present, a top-level sequence, or a
/// single top-level mapping. Documentation entries and entries without a
/// `name` (such as `$import` stubs) are dropped.
///
/// # Errors
///
/// Returns `LoadError::InvalidDocument` for any other document shape.
pub fn graph_entries(document: Value, origin: &str) -> Result<Vec<Value>, LoadError> {
    let entries = match document {
        Value::Object(mut map) => match map.remove("$graph") {
            Some(Value::Array(entries)) => entries,
            Some(_) => {
                return Err(LoadError::InvalidDocument {
                    origin: origin.to_string(),
                    message: "$graph must be a sequence".to_string(),
                })
            }
            None => vec![Value::Object(map)],
        },
        Value::Array(entries) => entries,
        _ => {
            return Err(LoadError::InvalidDocument {
                origin: origin.to_string(),
                message: "expected a mapping or sequence".to_string(),
            })
        }
    };

    Ok(entries
        .into_iter()
        .filter(|entry| {
            let keep = entry.get("name").map_or(false, Value::is_string)
                && entry.get("type").and_then(Value::as_str) != Some(DOCUMENTATION_TYPE);
            if !keep {
                debug!(origin, "skipping non-node graph entry");
            }
            keep
        })
        .collect())
}

/// Load and merge the documents of one document set.
///
/// Documents are read from `<source>/<draft>/<file>` in `files` order. A later
/// document defining a name that already exists replaces the earlier entry
/// in place.
pub fn load_document_set(source: &str, draft: &str, files: &[String]) -> Result<Vec<Value>, LoadError> {
    let mut merged: Vec<Value> = Vec::new();

    for file in files {
        let location = document_location(source, draft, file);
        let document = load_document_auto(&location)?;
        for entry in graph_entries(document, &location)? {
            let name = node_name(&entry).map(String::from);
            match merged
                .iter_mut()
                .find(|existing| node_name(existing) == name.as_deref())
            {
                Some(existing) => {
                    debug!(location = %location, name = ?name, "document redefines node");
                    *existing = entry;
                }
                None => merged.push(entry),
            }
        }
    }

    Ok(merged)
}

/// Load every document set named in `options`.
pub fn load_document_sets(
    source: &str,
    options: &GenerateOptions,
) -> Result<BTreeMap<String, Vec<Value>>, LoadError> {
    options
        .drafts
        .iter()
        .map(|draft| -> Result<(String, Vec<Value>), LoadError> {
            Ok((draft.clone(), load_document_set(source, draft, &options.files)?))
        })
        .collect()
}

/// Entry name with its namespace prefix stripped.
fn node_name(entry: &Value) -> Option<&str> {
    entry.get("name").and_then(Value::as_str).map(resolve_token)
}

fn document_location(source: &str, draft: &str, file: &str) -> String {
    if is_url(source) {
        format!("{}/{}/{}", source.trim_end_matches('/'), draft, file)
    } else {
        Path::new(source).join(draft).join(file).display().to_string()
    }
}
