//! Error types for schema loading and graph resolution.

use std::path::PathBuf;
use thiserror::Error;

/// A raw type value that the type-expression parser cannot interpret.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unrecognized type descriptor at {path}: {message}")]
pub struct TypeParseError {
    /// Position inside the raw type value (e.g. "/items/1").
    pub path: String,
    pub message: String,
}

impl TypeParseError {
    pub(crate) fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Structural errors in a schema graph.
///
/// Any of these aborts resolution of the document set it occurred in.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("node '{name}' is defined more than once")]
    DuplicateNode { name: String },

    #[error("invalid node {node}: {message}")]
    InvalidNode { node: String, message: String },

    #[error("node '{node}' extends unknown node '{parent}'")]
    DanglingExtends { node: String, parent: String },

    #[error("invalid type for field '{field}' of '{node}': {source}")]
    InvalidFieldType {
        node: String,
        field: String,
        #[source]
        source: TypeParseError,
    },

    #[error("invalid specialize directive on '{node}': {message}")]
    InvalidSpecialize { node: String, message: String },

    #[error(
        "cannot specialize '{from}' in field '{field}' of '{node}': \
         only references and arrays of references can be specialized"
    )]
    UnsupportedSpecialization {
        node: String,
        field: String,
        from: String,
    },
}

impl SchemaError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        2
    }
}

/// Errors while reading schema documents.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors (exit code 2)
    #[error("invalid YAML in {origin}: {source}")]
    InvalidYaml {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid JSON in {origin}: {source}")]
    InvalidJson {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid schema document {origin}: {message}")]
    InvalidDocument { origin: String, message: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}
