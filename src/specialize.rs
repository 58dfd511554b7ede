//! Generic type specialization.
//!
//! A node may carry `specialize` directives: wherever a field inherited from
//! an ancestor references the placeholder `from`, the node uses `to` instead.
//! The affected field is copied into the node with the substituted type.
//!
//! A directive can only be applied once the field it targets exists somewhere
//! in the node's ancestry, which may itself depend on an ancestor's
//! directives being applied first. [`resolve_specializations`] therefore
//! iterates over all pending nodes until a round makes no progress.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::graph::{NodeId, NodeTable};
use crate::types::{json_type_name, resolve_token, Field, Specialization, TypeExpr, UnresolvedSpecialization};

/// Result of one specialization attempt on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every pending directive was applied; the node has none left.
    FullyResolved,
    /// Some directives are still pending.
    PartiallyResolved,
    /// The node had nothing to specialize.
    NoSpecializationPresent,
}

/// Result of running specialization to a fixed point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixedPoint {
    /// Rounds executed, including a final round without progress.
    pub rounds: usize,
    /// Nodes left with pending directives, in table order.
    pub unresolved: Vec<UnresolvedSpecialization>,
}

/// Normalize a raw `specialize` value into directive pairs.
///
/// Accepts a mapping `{from: to, ...}` or a sequence of
/// `{specializeFrom, specializeTo}` objects. Tokens are prefix-stripped.
pub fn parse_directives(node: &str, raw: &Value) -> Result<Vec<Specialization>, SchemaError> {
    let invalid = |message: String| SchemaError::InvalidSpecialize {
        node: node.to_string(),
        message,
    };
    let token = |value: Option<&Value>, what: &str| {
        value
            .and_then(Value::as_str)
            .map(|s| resolve_token(s).to_string())
            .ok_or_else(|| invalid(format!("{} must be a string", what)))
    };

    match raw {
        Value::Object(map) => map
            .iter()
            .map(|(from, to)| -> Result<Specialization, SchemaError> {
                Ok(Specialization::new(resolve_token(from), token(Some(to), from.as_str())?))
            })
            .collect(),
        Value::Array(pairs) => pairs
            .iter()
            .map(|pair| -> Result<Specialization, SchemaError> {
                Ok(Specialization {
                    from: token(pair.get("specializeFrom"), "specializeFrom")?,
                    to: token(pair.get("specializeTo"), "specializeTo")?,
                })
            })
            .collect(),
        other => Err(invalid(format!(
            "expected mapping or sequence, got {}",
            json_type_name(other)
        ))),
    }
}

/// Apply as many of a node's pending directives as currently possible.
///
/// Each directive is located against the node's own fields first, then its
/// ancestors in pre-order. Directives are applied one after another, so a
/// later directive sees fields installed by an earlier one. When nothing is
/// left pending the node's `specializations` becomes `None`.
///
/// # Errors
///
/// Returns `SchemaError::UnsupportedSpecialization` when the located field's
/// type has a shape other than references and arrays of references. The
/// node is left as it was.
pub fn specialize_one(table: &mut NodeTable, id: NodeId) -> Result<Outcome, SchemaError> {
    let Some(pending) = table.get(id).specializations.clone() else {
        return Ok(Outcome::NoSpecializationPresent);
    };

    // Rewrites go to a staged copy; the table only changes once every pair succeeded.
    let mut staged = table.get(id).clone();
    let mut remaining = Vec::new();
    for pair in pending {
        let Some(field) = locate_field(table, id, &staged.fields, &pair.from) else {
            remaining.push(pair);
            continue;
        };
        let rewritten = specialize_field(&staged.name, field, &pair)?;
        debug!(
            node = %staged.name,
            field = %rewritten.name,
            from = %pair.from,
            to = %pair.to,
            "applied specialization"
        );
        staged.set_field(rewritten);
    }

    let outcome = if remaining.is_empty() {
        staged.specializations = None;
        Outcome::FullyResolved
    } else {
        staged.specializations = Some(remaining);
        Outcome::PartiallyResolved
    };
    *table.get_mut(id) = staged;
    Ok(outcome)
}

/// Resolve every pending directive in the table to a fixed point.
///
/// Nodes still pending once a round resolves nothing are returned as
/// unresolved; all other nodes are fully specialized.
///
/// # Errors
///
/// Propagates structural errors from [`specialize_one`].
pub fn resolve_specializations(table: &mut NodeTable) -> Result<FixedPoint, SchemaError> {
    let mut worklist: Vec<NodeId> = table
        .iter()
        .filter(|(_, node)| node.pending() > 0)
        .map(|(id, _)| id)
        .collect();
    let mut rounds = 0;

    while !worklist.is_empty() {
        rounds += 1;
        let before = pending_total(table, &worklist);

        let mut next = Vec::with_capacity(worklist.len());
        for id in worklist {
            if specialize_one(table, id)? == Outcome::PartiallyResolved {
                next.push(id);
            }
        }

        let after = pending_total(table, &next);
        debug!(round = rounds, resolved = before - after, remaining = after, "specialization round");
        worklist = next;
        if after == before {
            break;
        }
    }

    let unresolved: Vec<UnresolvedSpecialization> = worklist
        .into_iter()
        .map(|id| {
            let node = table.get(id);
            UnresolvedSpecialization {
                node: node.name.clone(),
                pending: node.specializations.clone().unwrap_or_default(),
            }
        })
        .collect();
    for entry in &unresolved {
        warn!(node = %entry.node, pending = entry.pending.len(), "{}", entry);
    }

    Ok(FixedPoint { rounds, unresolved })
}

/// Replace `from` with `to` in a type expression.
///
/// Only references, primitives, arrays of those and unions of those are
/// supported. Returns `None` for inline enums and nested arrays.
pub fn substitute(expr: &TypeExpr, from: &str, to: &str) -> Option<TypeExpr> {
    substitute_in(expr, from, to, false)
}

fn substitute_in(expr: &TypeExpr, from: &str, to: &str, in_array: bool) -> Option<TypeExpr> {
    match expr {
        TypeExpr::Reference(name) if name == from => Some(TypeExpr::reference(to)),
        TypeExpr::Reference(_) | TypeExpr::Primitive(_) => Some(expr.clone()),
        TypeExpr::Array(inner) if !in_array => {
            substitute_in(inner, from, to, true).map(TypeExpr::array)
        }
        TypeExpr::Union(members) => members
            .iter()
            .map(|member| substitute_in(member, from, to, in_array))
            .collect::<Option<Vec<_>>>()
            .map(TypeExpr::Union),
        TypeExpr::Array(_) | TypeExpr::InlineEnum(_) => None,
    }
}

fn locate_field(table: &NodeTable, id: NodeId, own: &[Field], token: &str) -> Option<Field> {
    let declares = |field: &&Field| field.type_expr.declares(token);
    own.iter()
        .find(declares)
        .or_else(|| {
            table
                .ancestors(id)
                .into_iter()
                .find_map(|scope| table.get(scope).fields.iter().find(declares))
        })
        .cloned()
}

fn specialize_field(node: &str, field: Field, pair: &Specialization) -> Result<Field, SchemaError> {
    let type_expr = substitute(&field.type_expr, &pair.from, &pair.to).ok_or_else(|| {
        SchemaError::UnsupportedSpecialization {
            node: node.to_string(),
            field: field.name.clone(),
            from: pair.from.clone(),
        }
    })?;
    Ok(Field { type_expr, ..field })
}

fn pending_total(table: &NodeTable, ids: &[NodeId]) -> usize {
    ids.iter().map(|&id| table.get(id).pending()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Primitive;
    use serde_json::json;

    fn table(descriptors: Vec<Value>) -> NodeTable {
        NodeTable::build(&descriptors).unwrap()
    }

    #[test]
    fn directives_from_mapping() {
        let pairs = parse_directives("N", &json!({"sld:T": "#U", "V": "W"})).unwrap();
        assert_eq!(
            pairs,
            vec![Specialization::new("T", "U"), Specialization::new("V", "W")]
        );
    }

    #[test]
    fn directives_from_pair_list() {
        let pairs = parse_directives(
            "N",
            &json!([{"specializeFrom": "T", "specializeTo": "U"}]),
        )
        .unwrap();
        assert_eq!(pairs, vec![Specialization::new("T", "U")]);
    }

    #[test]
    fn invalid_directives() {
        assert!(parse_directives("N", &json!("T")).is_err());
        assert!(parse_directives("N", &json!({"T": 1})).is_err());
        assert!(parse_directives("N", &json!([{"specializeFrom": "T"}])).is_err());
    }

    #[test]
    fn inherited_field_is_specialized() {
        let mut table = table(vec![
            json!({"name": "Parent", "type": "record",
                   "fields": [{"name": "y", "type": "GenericType", "doc": "why"}]}),
            json!({"name": "Child", "type": "record", "extends": "Parent",
                   "specialize": {"GenericType": "ConcreteType"}}),
        ]);
        let child = table.id_of("Child").unwrap();

        assert_eq!(specialize_one(&mut table, child).unwrap(), Outcome::FullyResolved);

        let node = table.get(child);
        assert!(node.specializations.is_none());
        let y = node.field("y").unwrap();
        assert_eq!(y.type_expr, TypeExpr::reference("ConcreteType"));
        assert_eq!(y.doc.as_deref(), Some("why"));
        // ancestor untouched
        assert_eq!(
            table.by_name("Parent").unwrap().field("y").unwrap().type_expr,
            TypeExpr::reference("GenericType")
        );
    }

    #[test]
    fn wrapped_forms_are_specialized_alike() {
        let mut table = table(vec![
            json!({"name": "Parent", "type": "record", "fields": [
                {"name": "bare", "type": "A"},
                {"name": "list", "type": {"type": "array", "items": "B"}},
                {"name": "opt", "type": ["null", "C"]},
                {"name": "opt_list", "type": ["null", {"type": "array", "items": "D"}]}
            ]}),
            json!({"name": "Child", "type": "record", "extends": "Parent",
                   "specialize": {"A": "A2", "B": "B2", "C": "C2", "D": "D2"}}),
        ]);
        let child = table.id_of("Child").unwrap();
        assert_eq!(specialize_one(&mut table, child).unwrap(), Outcome::FullyResolved);

        let node = table.get(child);
        assert_eq!(node.field("bare").unwrap().type_expr, TypeExpr::reference("A2"));
        assert_eq!(
            node.field("list").unwrap().type_expr,
            TypeExpr::array(TypeExpr::reference("B2"))
        );
        let opt = node.field("opt").unwrap();
        assert!(opt.is_optional);
        assert_eq!(opt.type_expr, TypeExpr::reference("C2"));
        let opt_list = node.field("opt_list").unwrap();
        assert!(opt_list.is_optional);
        assert_eq!(opt_list.type_expr, TypeExpr::array(TypeExpr::reference("D2")));
    }

    #[test]
    fn own_field_shadows_ancestor() {
        let mut table = table(vec![
            json!({"name": "Parent", "type": "record", "fields": {"y": "T"}}),
            json!({"name": "Child", "type": "record", "extends": "Parent",
                   "fields": {"y": "T", "z": "string"}, "specialize": {"T": "U"}}),
        ]);
        let child = table.id_of("Child").unwrap();
        specialize_one(&mut table, child).unwrap();
        let node = table.get(child);
        assert_eq!(node.fields.len(), 2);
        assert_eq!(node.fields[0].name, "y");
        assert_eq!(node.fields[0].type_expr, TypeExpr::reference("U"));
    }

    #[test]
    fn substitution_matches_whole_tokens_only() {
        let expr = TypeExpr::Union(vec![
            TypeExpr::reference("TypeT"),
            TypeExpr::reference("T"),
            TypeExpr::Primitive(Primitive::String),
        ]);
        assert_eq!(
            substitute(&expr, "T", "U").unwrap(),
            TypeExpr::Union(vec![
                TypeExpr::reference("TypeT"),
                TypeExpr::reference("U"),
                TypeExpr::Primitive(Primitive::String),
            ])
        );
    }

    #[test]
    fn unsupported_shape_fails_fast() {
        let mut table = table(vec![
            json!({"name": "Parent", "type": "record", "fields": [
                {"name": "y", "type": ["T", {"type": "enum", "symbols": ["a"]}]}
            ]}),
            json!({"name": "Child", "type": "record", "extends": "Parent",
                   "specialize": {"T": "U"}}),
        ]);
        let child = table.id_of("Child").unwrap();
        let err = specialize_one(&mut table, child).unwrap_err();
        assert!(matches!(err, SchemaError::UnsupportedSpecialization { ref field, .. } if field == "y"));
    }

    #[test]
    fn failed_pair_leaves_node_untouched() {
        let mut table = table(vec![
            json!({"name": "Parent", "type": "record", "fields": [
                {"name": "ok", "type": "S"},
                {"name": "bad", "type": ["T", {"type": "enum", "symbols": ["a"]}]}
            ]}),
            json!({"name": "Child", "type": "record", "extends": "Parent",
                   "specialize": [
                       {"specializeFrom": "S", "specializeTo": "S2"},
                       {"specializeFrom": "T", "specializeTo": "T2"}
                   ]}),
        ]);
        let child = table.id_of("Child").unwrap();
        let before = table.get(child).clone();

        assert!(specialize_one(&mut table, child).is_err());
        assert_eq!(table.get(child), &before);
        assert!(table.get(child).fields.is_empty());
    }

    #[test]
    fn idempotent_when_resolved() {
        let mut table = table(vec![json!({"name": "A", "type": "record", "fields": {"x": "T"}})]);
        let before = table.get(0).clone();
        assert_eq!(
            specialize_one(&mut table, 0).unwrap(),
            Outcome::NoSpecializationPresent
        );
        assert_eq!(table.get(0), &before);
    }

    #[test]
    fn pair_order_does_not_matter() {
        let build = |specialize: Value| {
            let mut table = table(vec![
                json!({"name": "P", "type": "record", "fields": {"a": "T", "b": ["null", "S"], "c": ["T", "S"]}}),
                json!({"name": "C", "type": "record", "extends": "P", "specialize": specialize}),
            ]);
            let id = table.id_of("C").unwrap();
            specialize_one(&mut table, id).unwrap();
            let mut fields = table.get(id).fields.clone();
            fields.sort_by(|x, y| x.name.cmp(&y.name));
            fields
        };
        let forward = build(json!([
            {"specializeFrom": "T", "specializeTo": "X"},
            {"specializeFrom": "S", "specializeTo": "Y"}
        ]));
        let backward = build(json!([
            {"specializeFrom": "S", "specializeTo": "Y"},
            {"specializeFrom": "T", "specializeTo": "X"}
        ]));
        assert_eq!(forward, backward);
    }

    #[test]
    fn chain_resolves_within_depth_rounds() {
        // Listed leaf-first so each level needs its own round.
        let mut table = table(vec![
            json!({"name": "D", "type": "record", "extends": "C", "specialize": {"V": "W"}}),
            json!({"name": "C", "type": "record", "extends": "B", "specialize": {"U": "V"}}),
            json!({"name": "B", "type": "record", "extends": "A", "specialize": {"T": "U"}}),
            json!({"name": "A", "type": "record", "fields": {"y": "T"}}),
        ]);
        let result = resolve_specializations(&mut table).unwrap();
        assert!(result.unresolved.is_empty());
        assert!(result.rounds <= 3);
        assert_eq!(
            table.by_name("D").unwrap().field("y").unwrap().type_expr,
            TypeExpr::reference("W")
        );
        assert!(table.iter().all(|(_, node)| node.specializations.is_none()));
    }

    #[test]
    fn unresolvable_directive_is_reported() {
        let mut table = table(vec![
            json!({"name": "A", "type": "record", "fields": {"x": "T"}}),
            json!({"name": "B", "type": "record", "extends": "A", "specialize": {"T": "U"}}),
            json!({"name": "Lost", "type": "record", "extends": "A",
                   "specialize": {"Missing": "X", "T": "V"}}),
        ]);
        let result = resolve_specializations(&mut table).unwrap();
        assert_eq!(
            result.unresolved,
            vec![UnresolvedSpecialization {
                node: "Lost".into(),
                pending: vec![Specialization::new("Missing", "X")],
            }]
        );
        // the resolvable pair on the same node still applied
        assert_eq!(
            table.by_name("Lost").unwrap().field("x").unwrap().type_expr,
            TypeExpr::reference("V")
        );
        assert!(table.by_name("B").unwrap().specializations.is_none());
    }
}
