//! Schema checking - static analysis of CWL schema document sets.
//!
//! Reports, per document set:
//! - documents that cannot be read or parsed (E001)
//! - structural errors: duplicate names, dangling `extends`, bad type
//!   descriptors, unsupported specialization targets (E002)
//! - specializations that never resolve (W001)
//! - field types naming nodes outside the set (W002)

use serde::Serialize;
use serde_json::Value;

use crate::loader::load_document_set;
use crate::resolver::{resolve_graph, ResolvedGraph};
use crate::types::GenerateOptions;

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic message from checking.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    /// Node the issue belongs to, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    pub message: String,
}

impl Diagnostic {
    fn error(code: &str, node: Option<String>, message: String) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            node,
            message,
        }
    }

    fn warning(code: &str, node: Option<String>, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            code: code.to_string(),
            node,
            message,
        }
    }
}

/// Result of checking one document set.
#[derive(Debug, Clone, Serialize)]
pub struct SetResult {
    pub draft: String,
    pub status: SetStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a checked document set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SetStatus {
    Ok,
    Error,
    Warning,
}

/// Result of checking several document sets.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub source: String,
    pub sets_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<SetResult>,
}

impl LintResult {
    /// Returns true if all sets passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Check every document set named in `options` under `source`.
///
/// If `strict` is true, sets with warnings count as failed.
pub fn lint(source: &str, options: &GenerateOptions, strict: bool) -> LintResult {
    let mut results = Vec::new();

    for draft in &options.drafts {
        let diagnostics = match load_document_set(source, draft, &options.files) {
            Ok(descriptors) => check_document_set(&descriptors),
            Err(e) => vec![Diagnostic::error("E001", None, e.to_string())],
        };
        results.push(SetResult {
            draft: draft.clone(),
            status: status_of(&diagnostics),
            diagnostics,
        });
    }

    let count = |severity: Severity| {
        results
            .iter()
            .flat_map(|r| &r.diagnostics)
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != SetStatus::Ok
            } else {
                r.status == SetStatus::Error
            }
        })
        .count();

    LintResult {
        source: source.to_string(),
        sets_checked: results.len(),
        passed: results.len() - failed,
        failed,
        errors,
        warnings,
        results,
    }
}

/// Check one set of raw node descriptors.
pub fn check_document_set(descriptors: &[Value]) -> Vec<Diagnostic> {
    match resolve_graph(descriptors) {
        Ok(graph) => graph_diagnostics(&graph),
        Err(e) => vec![Diagnostic::error("E002", None, e.to_string())],
    }
}

fn graph_diagnostics(graph: &ResolvedGraph) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = graph
        .diagnostics
        .iter()
        .map(|unresolved| {
            let pairs: Vec<String> = unresolved.pending.iter().map(ToString::to_string).collect();
            Diagnostic::warning(
                "W001",
                Some(unresolved.node.clone()),
                format!("unresolved specialization: {}", pairs.join(", ")),
            )
        })
        .collect();

    for decl in graph.declarations.values() {
        for field in &decl.fields {
            let mut references = Vec::new();
            field.type_expr.collect_references(&mut references);
            for name in references {
                if name != decl.name && !graph.declarations.contains_key(name) {
                    diagnostics.push(Diagnostic::warning(
                        "W002",
                        Some(decl.name.clone()),
                        format!("field '{}' references '{}' which is not defined in this set", field.name, name),
                    ));
                }
            }
        }
    }

    diagnostics
}

fn status_of(diagnostics: &[Diagnostic]) -> SetStatus {
    if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        SetStatus::Error
    } else if diagnostics.is_empty() {
        SetStatus::Ok
    } else {
        SetStatus::Warning
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn clean_set_has_no_diagnostics() {
        let diagnostics = check_document_set(&[
            json!({"name": "A", "type": "record", "fields": {"b": "B"}}),
            json!({"name": "B", "type": "enum", "symbols": ["x"]}),
        ]);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn structural_error() {
        let diagnostics =
            check_document_set(&[json!({"name": "A", "type": "record", "extends": "Missing"})]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "E002");
        assert_eq!(diagnostics[0].severity, Severity::Error);
    }

    #[test]
    fn unresolved_specialization_warning() {
        let diagnostics = check_document_set(&[
            json!({"name": "A", "type": "record", "specialize": {"Missing": "X"}}),
        ]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "W001");
        assert_eq!(diagnostics[0].node.as_deref(), Some("A"));
        assert!(diagnostics[0].message.contains("Missing -> X"));
    }

    #[test]
    fn external_reference_warning() {
        let diagnostics = check_document_set(&[
            json!({"name": "A", "type": "record", "fields": {"self": "A", "ext": "PrimitiveType"}}),
        ]);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, "W002");
        assert!(diagnostics[0].message.contains("PrimitiveType"));
    }

    #[test]
    fn lint_sets_and_strict_mode() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("draft-3")).unwrap();
        fs::write(
            dir.path().join("draft-3/Process.yml"),
            "$graph:\n  - {name: A, type: record, fields: {x: Elsewhere}}\n",
        )
        .unwrap();
        let options = GenerateOptions::new()
            .drafts(["draft-3", "draft-4"])
            .files(["Process.yml"]);
        let source = dir.path().to_str().unwrap();

        let result = lint(source, &options, false);
        assert_eq!(result.sets_checked, 2);
        assert_eq!(result.results[0].status, SetStatus::Warning);
        assert_eq!(result.results[1].status, SetStatus::Error);
        assert_eq!(result.results[1].diagnostics[0].code, "E001");
        assert_eq!(result.failed, 1);
        assert!(!result.is_ok());

        let strict = lint(source, &options, true);
        assert_eq!(strict.failed, 2);
        assert_eq!(strict.passed, 0);
    }
}
