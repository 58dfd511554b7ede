//! Graph resolution - turns raw node descriptors into declarations.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info_span};

use crate::error::SchemaError;
use crate::graph::NodeTable;
use crate::normalize::normalize_node;
use crate::specialize::resolve_specializations;
use crate::types::{Declaration, UnresolvedSpecialization};

/// Declarations of one document set plus the specializations that could not
/// be resolved.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedGraph {
    pub declarations: BTreeMap<String, Declaration>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<UnresolvedSpecialization>,
}

impl ResolvedGraph {
    /// Returns true if every specialization was resolved.
    pub fn is_complete(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.declarations.get(name)
    }
}

/// Resolve one document set.
///
/// Builds the node table, runs specialization to a fixed point and
/// normalizes every node. Nodes with unresolved specializations are still
/// emitted (with the fields resolved so far) and listed in `diagnostics`.
///
/// # Errors
///
/// Returns `SchemaError` if the set is structurally malformed.
pub fn resolve_graph(descriptors: &[Value]) -> Result<ResolvedGraph, SchemaError> {
    let mut table = NodeTable::build(descriptors)?;
    let fixed_point = resolve_specializations(&mut table)?;
    debug!(rounds = fixed_point.rounds, "specialization finished");

    let declarations = table
        .iter()
        .map(|(id, node)| (node.name.clone(), normalize_node(&table, id)))
        .collect();

    Ok(ResolvedGraph {
        declarations,
        diagnostics: fixed_point.unresolved,
    })
}

/// Resolve several independent document sets (e.g. one per draft).
///
/// A failure in one set does not affect the others.
pub fn resolve_document_sets(
    sets: &BTreeMap<String, Vec<Value>>,
) -> BTreeMap<String, Result<ResolvedGraph, SchemaError>> {
    sets.iter()
        .map(|(label, descriptors)| {
            let _span = info_span!("document_set", %label).entered();
            (label.clone(), resolve_graph(descriptors))
        })
        .collect()
}
