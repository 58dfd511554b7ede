//! Declaration normalization - the last pass before rendering.

use std::collections::HashSet;

use crate::graph::{NodeId, NodeTable};
use crate::types::{Declaration, Field, NodeKind, TypeExpr};

/// Build the renderer-ready declaration of a node.
///
/// Call after specialization has run; fields are taken as they are.
pub fn normalize_node(table: &NodeTable, id: NodeId) -> Declaration {
    let node = table.get(id);

    let (fields, symbols): (Vec<Field>, Vec<String>) = match node.kind {
        NodeKind::Record => (node.fields.iter().map(normalize_field).collect(), Vec::new()),
        NodeKind::Enum => (Vec::new(), folded_symbols(table, id)),
    };
    let cross_references = cross_references(&node.name, &fields, table);

    Declaration {
        name: node.name.clone(),
        doc: node.doc.clone(),
        kind: node.kind,
        is_abstract: node.is_abstract,
        fields,
        symbols,
        extension_tokens: node.extends.clone(),
        cross_references,
    }
}

/// Recompute optionality from the field's type.
///
/// A union led by `null` loses the `null` and marks the field optional, so
/// the rendered type never repeats what the optional flag says.
pub fn normalize_field(field: &Field) -> Field {
    let mut field = field.clone();
    if let TypeExpr::Union(members) = &mut field.type_expr {
        if members.len() > 1 && members[0].is_null() {
            members.remove(0);
            field.is_optional = true;
        }
        if members.len() == 1 {
            field.type_expr = members.remove(0);
        }
    }
    field
}

/// Local node names referenced by `fields`, in order of first appearance.
///
/// Self-references and names not defined in `table` are left out.
pub fn cross_references(name: &str, fields: &[Field], table: &NodeTable) -> Vec<String> {
    let mut tokens = Vec::new();
    for field in fields {
        field.type_expr.collect_references(&mut tokens);
    }

    let mut seen = HashSet::new();
    tokens
        .into_iter()
        .filter(|token| *token != name && table.contains(token))
        .filter(|token| seen.insert(*token))
        .map(String::from)
        .collect()
}

/// An enum's own symbols followed by those of its base enums.
///
/// Bases are folded transitively and concatenated without deduplication.
pub fn folded_symbols(table: &NodeTable, id: NodeId) -> Vec<String> {
    let mut symbols = Vec::new();
    let mut visiting = HashSet::new();
    fold_symbols(table, id, &mut visiting, &mut symbols);
    symbols
}

fn fold_symbols(table: &NodeTable, id: NodeId, visiting: &mut HashSet<NodeId>, out: &mut Vec<String>) {
    if !visiting.insert(id) {
        return;
    }
    let node = table.get(id);
    out.extend(node.symbols.iter().cloned());
    for &parent in &node.parents {
        if table.get(parent).kind == NodeKind::Enum {
            fold_symbols(table, parent, visiting, out);
        }
    }
    visiting.remove(&id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;
    use serde_json::json;

    #[test]
    fn field_optionality_is_recomputed() {
        let field = Field {
            name: "x".into(),
            doc: None,
            type_expr: TypeExpr::Union(vec![
                TypeExpr::Primitive(Primitive::Null),
                TypeExpr::reference("Bar"),
            ]),
            is_optional: false,
        };
        let normalized = normalize_field(&field);
        assert!(normalized.is_optional);
        assert_eq!(normalized.type_expr, TypeExpr::reference("Bar"));
        assert_eq!(normalize_field(&normalized), normalized);
    }

    #[test]
    fn cross_references_skip_self_and_external() {
        let table = NodeTable::build(&[
            json!({"name": "Foo", "type": "record", "fields": {
                "a": "Bar",
                "b": {"type": "array", "items": ["Bar", "Baz"]},
                "c": "Foo",
                "d": "ExternalThing",
                "e": "string"
            }}),
            json!({"name": "Bar", "type": "record"}),
            json!({"name": "Baz", "type": "enum", "symbols": ["x"]}),
        ])
        .unwrap();
        let decl = normalize_node(&table, table.id_of("Foo").unwrap());
        assert_eq!(decl.cross_references, vec!["Bar", "Baz"]);
    }

    #[test]
    fn enum_symbols_fold_bases_in_order() {
        let table = NodeTable::build(&[
            json!({"name": "Status", "type": "enum", "symbols": ["a", "b"], "extends": "BaseStatus"}),
            json!({"name": "BaseStatus", "type": "enum", "symbols": ["z"], "extends": "Root"}),
            json!({"name": "Root", "type": "enum", "symbols": ["a"]}),
        ])
        .unwrap();
        let decl = normalize_node(&table, table.id_of("Status").unwrap());
        assert_eq!(decl.symbols, vec!["a", "b", "z", "a"]);
        assert_eq!(decl.extension_tokens, vec!["BaseStatus"]);
        assert!(decl.fields.is_empty());
    }

    #[test]
    fn enum_fold_survives_cycles() {
        let table = NodeTable::build(&[
            json!({"name": "A", "type": "enum", "symbols": ["a"], "extends": "B"}),
            json!({"name": "B", "type": "enum", "symbols": ["b"], "extends": "A"}),
        ])
        .unwrap();
        assert_eq!(folded_symbols(&table, 0), vec!["a", "b"]);
    }

    #[test]
    fn record_declaration_carries_metadata() {
        let table = NodeTable::build(&[
            json!({"name": "Process", "type": "record", "abstract": true, "doc": ["line one", "line two"]}),
            json!({"name": "Tool", "type": "record", "extends": "sld:Process"}),
        ])
        .unwrap();
        let process = normalize_node(&table, 0);
        assert!(process.is_abstract);
        assert_eq!(process.doc.as_deref(), Some("line one\nline two"));

        let tool = normalize_node(&table, 1);
        assert_eq!(tool.extension_tokens, vec!["Process"]);
        assert!(!tool.is_abstract);
    }
}
