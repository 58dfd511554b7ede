//! Node table and inheritance resolution.
//!
//! Raw node descriptors are normalized into [`Node`]s stored in a flat
//! [`NodeTable`]. Parent links are looked up once at build time and kept as
//! [`NodeId`] indices into the table.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::SchemaError;
use crate::parser::parse_type;
use crate::specialize::parse_directives;
use crate::types::{
    json_type_name, resolve_token, Field, NodeKind, Specialization, DOCUMENTATION_TYPE, NODE_TYPES,
};

/// Index of a node in its [`NodeTable`].
pub type NodeId = usize;

/// A record or enum definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    pub kind: NodeKind,
    pub doc: Option<String>,
    pub is_abstract: bool,
    /// Record fields in source order.
    pub fields: Vec<Field>,
    /// Enum symbols in source order.
    pub symbols: Vec<String>,
    /// Parent tokens with namespace prefixes stripped.
    pub extends: Vec<String>,
    /// Parents resolved against the owning table, same order as `extends`.
    pub parents: Vec<NodeId>,
    /// Pending specializations. `None` once fully specialized.
    pub specializations: Option<Vec<Specialization>>,
}

impl Node {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Replace the field with the same name, or append it.
    pub fn set_field(&mut self, field: Field) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// Number of pending specialization pairs.
    pub fn pending(&self) -> usize {
        self.specializations.as_ref().map_or(0, Vec::len)
    }
}

/// Arena of nodes for one document set, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct NodeTable {
    nodes: Vec<Node>,
    index: HashMap<String, NodeId>,
}

impl NodeTable {
    /// Build a table from raw node descriptors.
    ///
    /// Entries whose `type` is `documentation` are skipped.
    ///
    /// # Errors
    ///
    /// Returns `SchemaError` for malformed descriptors, duplicate names and
    /// `extends` tokens that name no node in the set.
    pub fn build(descriptors: &[Value]) -> Result<Self, SchemaError> {
        let mut table = NodeTable::default();

        for (position, descriptor) in descriptors.iter().enumerate() {
            let Some(node) = build_node(descriptor, position)? else {
                continue;
            };
            if table.index.contains_key(&node.name) {
                return Err(SchemaError::DuplicateNode { name: node.name });
            }
            table.index.insert(node.name.clone(), table.nodes.len());
            table.nodes.push(node);
        }

        for id in 0..table.nodes.len() {
            let parents = resolve_parents(&table.nodes[id], &table)?;
            table.nodes[id].parents = parents;
        }

        debug!(nodes = table.nodes.len(), "built node table");
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }

    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.index.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Node> {
        self.id_of(name).map(|id| &self.nodes[id])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate()
    }

    /// All ancestors of `id`, pre-order over the parent graph.
    ///
    /// Each ancestor appears once even under diamond inheritance, and cyclic
    /// `extends` chains terminate.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut seen = HashSet::from([id]);
        let mut order = Vec::new();
        self.visit_parents(id, &mut seen, &mut order);
        order
    }

    fn visit_parents(&self, id: NodeId, seen: &mut HashSet<NodeId>, order: &mut Vec<NodeId>) {
        for &parent in &self.nodes[id].parents {
            if seen.insert(parent) {
                order.push(parent);
                self.visit_parents(parent, seen, order);
            }
        }
    }
}

/// Normalize a node's `extends` value to an ordered list of bare tokens.
///
/// Absent, a single token and a sequence of tokens are all accepted.
pub fn parent_tokens(node: &str, extends: Option<&Value>) -> Result<Vec<String>, SchemaError> {
    let token = |value: &Value| {
        value
            .as_str()
            .map(|s| resolve_token(s).to_string())
            .ok_or_else(|| SchemaError::InvalidNode {
                node: node.to_string(),
                message: format!(
                    "extends must be a string or sequence of strings, got {}",
                    json_type_name(value)
                ),
            })
    };

    match extends {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(tokens)) => tokens.iter().map(token).collect(),
        Some(single) => Ok(vec![token(single)?]),
    }
}

/// Look up each parent token of `node` in `table`.
///
/// # Errors
///
/// Returns `SchemaError::DanglingExtends` for a token with no matching node.
pub fn resolve_parents(node: &Node, table: &NodeTable) -> Result<Vec<NodeId>, SchemaError> {
    node.extends
        .iter()
        .map(|parent| {
            table
                .id_of(parent)
                .ok_or_else(|| SchemaError::DanglingExtends {
                    node: node.name.clone(),
                    parent: parent.clone(),
                })
        })
        .collect()
}

/// Normalize map-form and sequence-form `fields` into one ordered list.
///
/// Map form uses the field name as key; the value is either a field
/// descriptor or the field's type. Sequence form carries an explicit `name`.
pub fn normalize_fields(node: &str, raw: Option<&Value>) -> Result<Vec<Field>, SchemaError> {
    match raw {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let descriptor = entry.as_object().ok_or_else(|| SchemaError::InvalidNode {
                    node: node.to_string(),
                    message: format!("field {} must be an object, got {}", i, json_type_name(entry)),
                })?;
                let name = descriptor
                    .get("name")
                    .and_then(Value::as_str)
                    .ok_or_else(|| SchemaError::InvalidNode {
                        node: node.to_string(),
                        message: format!("field {} has no name", i),
                    })?;
                build_field(node, name, descriptor)
            })
            .collect(),
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(name, value)| match value {
                Value::Object(descriptor) if !is_type_descriptor(descriptor) => {
                    build_field(node, name, descriptor)
                }
                type_only => field_from_type(node, name, type_only, None),
            })
            .collect(),
        Some(other) => Err(SchemaError::InvalidNode {
            node: node.to_string(),
            message: format!(
                "fields must be a sequence or mapping, got {}",
                json_type_name(other)
            ),
        }),
    }
}

/// `doc` may be a string or a sequence of lines.
pub(crate) fn doc_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) => Some(text.clone()),
        Value::Array(lines) => {
            let lines: Vec<&str> = lines.iter().filter_map(Value::as_str).collect();
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        _ => None,
    }
}

fn build_node(descriptor: &Value, position: usize) -> Result<Option<Node>, SchemaError> {
    let Some(map) = descriptor.as_object() else {
        return Err(SchemaError::InvalidNode {
            node: format!("#{}", position),
            message: format!("expected object, got {}", json_type_name(descriptor)),
        });
    };

    let raw_type = map.get("type").and_then(Value::as_str).unwrap_or_default();
    if raw_type == DOCUMENTATION_TYPE {
        return Ok(None);
    }

    let name = map
        .get("name")
        .and_then(Value::as_str)
        .map(|s| resolve_token(s).to_string())
        .ok_or_else(|| SchemaError::InvalidNode {
            node: format!("#{}", position),
            message: "missing name".to_string(),
        })?;

    let kind = NodeKind::parse(raw_type).ok_or_else(|| SchemaError::InvalidNode {
        node: name.clone(),
        message: format!(
            "unsupported type '{}', expected one of: {}",
            raw_type,
            NODE_TYPES.join(", ")
        ),
    })?;

    let (fields, symbols) = match kind {
        NodeKind::Record => (normalize_fields(&name, map.get("fields"))?, Vec::new()),
        NodeKind::Enum => (Vec::new(), enum_symbols(&name, map.get("symbols"))?),
    };

    let specializations = match map.get("specialize") {
        None | Some(Value::Null) => None,
        Some(raw) => {
            let pairs = parse_directives(&name, raw)?;
            (!pairs.is_empty()).then_some(pairs)
        }
    };

    Ok(Some(Node {
        extends: parent_tokens(&name, map.get("extends"))?,
        doc: doc_text(map.get("doc")),
        is_abstract: map.get("abstract").and_then(Value::as_bool).unwrap_or(false),
        name,
        kind,
        fields,
        symbols,
        parents: Vec::new(),
        specializations,
    }))
}

fn enum_symbols(node: &str, raw: Option<&Value>) -> Result<Vec<String>, SchemaError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    let invalid = |actual: &Value| SchemaError::InvalidNode {
        node: node.to_string(),
        message: format!("symbols must be a sequence of strings, got {}", json_type_name(actual)),
    };
    raw.as_array()
        .ok_or_else(|| invalid(raw))?
        .iter()
        .map(|symbol| symbol.as_str().map(String::from).ok_or_else(|| invalid(symbol)))
        .collect()
}

fn build_field(node: &str, name: &str, descriptor: &Map<String, Value>) -> Result<Field, SchemaError> {
    // legacy `types` wins over `type`
    let raw_type = descriptor
        .get("types")
        .or_else(|| descriptor.get("type"))
        .ok_or_else(|| SchemaError::InvalidNode {
            node: node.to_string(),
            message: format!("field '{}' has no type", name),
        })?;
    field_from_type(node, name, raw_type, doc_text(descriptor.get("doc")))
}

fn field_from_type(
    node: &str,
    name: &str,
    raw_type: &Value,
    doc: Option<String>,
) -> Result<Field, SchemaError> {
    let parsed = parse_type(raw_type, None).map_err(|source| SchemaError::InvalidFieldType {
        node: node.to_string(),
        field: name.to_string(),
        source,
    })?;
    Ok(Field {
        name: name.to_string(),
        doc,
        type_expr: parsed.expr,
        is_optional: parsed.optional,
    })
}

/// A map-form field value that is itself an array or enum type.
fn is_type_descriptor(value: &Map<String, Value>) -> bool {
    matches!(
        value.get("type").and_then(Value::as_str),
        Some("array") | Some("enum")
    ) && (value.contains_key("items") || value.contains_key("symbols"))
}
