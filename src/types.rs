//! Core types for schema graph resolution.

use serde::Serialize;
use serde_json::Value;

/// Namespace prefixes stripped from type and node tokens.
pub const NAMESPACE_PREFIXES: &[&str] = &["#", "sld:", "cwl:", "xsd:"];

/// Raw node `type` values the resolver accepts.
pub const NODE_TYPES: &[&str] = &["record", "enum"];

/// Raw node `type` value for documentation-only entries.
pub const DOCUMENTATION_TYPE: &str = "documentation";

/// Document sets processed when none are requested.
pub const DEFAULT_DRAFTS: &[&str] = &["draft-3", "draft-4"];

/// Schema documents read from each document set when none are requested.
pub const DEFAULT_FILES: &[&str] = &["CommandLineTool.yml", "Process.yml", "Workflow.yml"];

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strip a recognized namespace prefix from a token.
///
/// `resolve_token("sld:Foo") == resolve_token("#Foo") == "Foo"`. Only one
/// prefix is removed; unknown prefixes are kept as part of the token.
pub fn resolve_token(token: &str) -> &str {
    NAMESPACE_PREFIXES
        .iter()
        .find_map(|prefix| token.strip_prefix(prefix))
        .unwrap_or(token)
}

/// Primitive type kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Primitive {
    Number,
    String,
    Boolean,
    Any,
    Null,
}

impl Primitive {
    /// Map a bare (prefix-stripped, suffix-stripped) token to a primitive.
    ///
    /// Returns `None` for tokens that name other nodes.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "int" | "float" | "double" | "long" => Some(Primitive::Number),
            "string" => Some(Primitive::String),
            "boolean" => Some(Primitive::Boolean),
            "Any" => Some(Primitive::Any),
            "null" => Some(Primitive::Null),
            _ => None,
        }
    }
}

/// A parsed type expression.
///
/// Optionality is not part of the expression; it lives on [`Field`] so that
/// equal types compare equal regardless of nullability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TypeExpr {
    Primitive(Primitive),
    Reference(String),
    Array(Box<TypeExpr>),
    InlineEnum(Vec<String>),
    /// Never contains a nested `Union`.
    Union(Vec<TypeExpr>),
}

impl TypeExpr {
    pub fn reference(token: impl Into<String>) -> Self {
        TypeExpr::Reference(token.into())
    }

    pub fn array(inner: TypeExpr) -> Self {
        TypeExpr::Array(Box::new(inner))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, TypeExpr::Primitive(Primitive::Null))
    }

    /// Whether this type mentions `token` as a reference, an array of it, or
    /// a union member of either.
    pub fn declares(&self, token: &str) -> bool {
        match self {
            TypeExpr::Reference(name) => name == token,
            TypeExpr::Array(inner) => inner.declares(token),
            TypeExpr::Union(members) => members.iter().any(|m| m.declares(token)),
            TypeExpr::Primitive(_) | TypeExpr::InlineEnum(_) => false,
        }
    }

    /// Append every referenced token, in order of appearance.
    pub fn collect_references<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeExpr::Reference(name) => out.push(name),
            TypeExpr::Array(inner) => inner.collect_references(out),
            TypeExpr::Union(members) => {
                for member in members {
                    member.collect_references(out);
                }
            }
            TypeExpr::Primitive(_) | TypeExpr::InlineEnum(_) => {}
        }
    }
}

/// A record field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    #[serde(rename = "type")]
    pub type_expr: TypeExpr,
    pub is_optional: bool,
}

/// Kind of a graph node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Record,
    Enum,
}

impl NodeKind {
    /// Parse a raw node `type` value.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "record" => Some(NodeKind::Record),
            "enum" => Some(NodeKind::Enum),
            _ => None,
        }
    }
}

/// A pending `specialize` directive: use `to` wherever an ancestor field
/// references `from`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Specialization {
    pub from: String,
    pub to: String,
}

impl Specialization {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl std::fmt::Display for Specialization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// Renderer-ready view of a resolved node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_abstract: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub symbols: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extension_tokens: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cross_references: Vec<String>,
}

/// Specializations left pending on a node once resolution reached a fixed point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedSpecialization {
    pub node: String,
    pub pending: Vec<Specialization>,
}

impl std::fmt::Display for UnresolvedSpecialization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pairs: Vec<String> = self.pending.iter().map(ToString::to_string).collect();
        write!(
            f,
            "{}: unresolved specialization {}",
            self.node,
            pairs.join(", ")
        )
    }
}

/// Which document sets to load and which documents make up each set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Document set labels, each a directory under the source.
    pub drafts: Vec<String>,
    /// Document file names inside each set, merged in this order.
    pub files: Vec<String>,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            drafts: DEFAULT_DRAFTS.iter().map(|s| s.to_string()).collect(),
            files: DEFAULT_FILES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl GenerateOptions {
    /// Options for the default drafts and documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the drafts to process. An empty list keeps the current ones.
    pub fn drafts<I, S>(mut self, drafts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let drafts: Vec<String> = drafts.into_iter().map(Into::into).collect();
        if !drafts.is_empty() {
            self.drafts = drafts;
        }
        self
    }

    /// Replace the documents read per draft. An empty list keeps the current ones.
    pub fn files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files: Vec<String> = files.into_iter().map(Into::into).collect();
        if !files.is_empty() {
            self.files = files;
        }
        self
    }
}
