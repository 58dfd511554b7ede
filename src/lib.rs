//! CWL Schema Resolver
//!
//! Resolves CWL schema-salad graphs into flat, renderer-ready declarations.
//!
//! Schema documents describe record and enum nodes that inherit from each
//! other (`extends`) and specialize generic placeholder types declared by
//! their ancestors (`specialize`). This library parses field types into
//! [`TypeExpr`] trees, links every node to its parents, applies
//! specializations until nothing more resolves, and produces one
//! [`Declaration`] per node. [`render_declaration`] turns a declaration into
//! TypeScript.
//!
//! # Example
//!
//! ```
//! use cwl_schema_ts::{resolve_graph, TypeExpr};
//! use serde_json::json;
//!
//! let graph = resolve_graph(&[
//!     json!({
//!         "name": "Parent",
//!         "type": "record",
//!         "fields": [{ "name": "y", "type": ["null", "GenericType"] }]
//!     }),
//!     json!({
//!         "name": "Child",
//!         "type": "record",
//!         "extends": "sld:Parent",
//!         "specialize": { "GenericType": "ConcreteType" }
//!     }),
//! ])
//! .unwrap();
//!
//! let child = graph.get("Child").unwrap();
//! assert_eq!(child.fields[0].type_expr, TypeExpr::reference("ConcreteType"));
//! assert!(child.fields[0].is_optional);
//! assert!(graph.is_complete());
//! ```
//!
//! # Type Forms
//!
//! | Raw type | Expression | Optional |
//! |----------|------------|----------|
//! | `"int"`, `"long"`, `"float"`, `"double"` | `Primitive(Number)` | no |
//! | `"sld:Foo"`, `"#Foo"` | `Reference("Foo")` | no |
//! | `"Foo?"`, `["null", "Foo"]`, `{"type": ["null", "Foo"]}` | `Reference("Foo")` | yes |
//! | `{"type": "array", "items": "Foo"}`, `"Foo[]"` | `Array(Reference("Foo"))` | no |
//! | `{"type": "enum", "symbols": ["a"]}` | `InlineEnum(["a"])` | no |
//! | `["string", "Foo"]` | `Union([...])` | no |

mod error;
mod graph;
mod linter;
mod loader;
mod normalize;
mod parser;
mod render;
mod resolver;
mod specialize;
mod types;

pub use error::{LoadError, SchemaError, TypeParseError};
pub use graph::{normalize_fields, parent_tokens, resolve_parents, Node, NodeId, NodeTable};
pub use linter::{check_document_set, lint, Diagnostic, LintResult, SetResult, SetStatus, Severity};
pub use loader::{
    graph_entries, is_url, load_document, load_document_auto, load_document_set,
    load_document_sets, load_document_str,
};
pub use normalize::{cross_references, folded_symbols, normalize_field, normalize_node};
pub use parser::{parse_type, ParsedType};
pub use render::{render_declaration, render_file_name, type_text};
pub use resolver::{resolve_document_sets, resolve_graph, ResolvedGraph};
pub use specialize::{
    parse_directives, resolve_specializations, specialize_one, substitute, FixedPoint, Outcome,
};
pub use types::{
    resolve_token, Declaration, Field, GenerateOptions, NodeKind, Primitive, Specialization,
    TypeExpr, UnresolvedSpecialization, NAMESPACE_PREFIXES,
};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
