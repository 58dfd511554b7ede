//! TypeScript rendering of resolved declarations.

use crate::types::{Declaration, Field, NodeKind, Primitive, TypeExpr};

const INDENT: &str = "    ";

/// Render a declaration as a TypeScript module.
///
/// Records become interfaces importing every local type they mention;
/// enums become string-literal union types.
pub fn render_declaration(decl: &Declaration) -> String {
    match decl.kind {
        NodeKind::Record => render_interface(decl),
        NodeKind::Enum => render_enum(decl),
    }
}

/// File name for a rendered declaration.
pub fn render_file_name(decl: &Declaration) -> String {
    format!("{}.ts", decl.name)
}

/// TypeScript type text for an expression.
pub fn type_text(expr: &TypeExpr) -> String {
    match expr {
        TypeExpr::Primitive(primitive) => primitive_text(*primitive).to_string(),
        TypeExpr::Reference(name) => name.clone(),
        TypeExpr::Array(inner) => format!("Array<{}>", type_text(inner)),
        TypeExpr::InlineEnum(symbols) => symbols
            .iter()
            .map(|s| quote(s))
            .collect::<Vec<_>>()
            .join(" | "),
        TypeExpr::Union(members) => members.iter().map(type_text).collect::<Vec<_>>().join(" | "),
    }
}

fn primitive_text(primitive: Primitive) -> &'static str {
    match primitive {
        Primitive::Number => "number",
        Primitive::String => "string",
        Primitive::Boolean => "boolean",
        Primitive::Any => "any",
        Primitive::Null => "null",
    }
}

fn render_interface(decl: &Declaration) -> String {
    let mut out = String::new();

    let mut imports: Vec<&str> = Vec::new();
    for name in decl.extension_tokens.iter().chain(&decl.cross_references) {
        if name != &decl.name && !imports.contains(&name.as_str()) {
            imports.push(name);
        }
    }
    for name in &imports {
        out.push_str(&format!("import {{{0}}} from \"./{0}\";\n", name));
    }
    if !imports.is_empty() {
        out.push('\n');
    }

    write_doc(&mut out, decl.doc.as_deref(), "");
    out.push_str(&format!("export interface {}", decl.name));
    if !decl.extension_tokens.is_empty() {
        out.push_str(&format!(" extends {}", decl.extension_tokens.join(", ")));
    }
    out.push_str(" {\n");

    for (i, field) in decl.fields.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        write_field(&mut out, field);
    }

    out.push_str("}\n");
    out
}

fn write_field(out: &mut String, field: &Field) {
    write_doc(out, field.doc.as_deref(), INDENT);
    out.push_str(&format!(
        "{}{}{}: {};\n",
        INDENT,
        property_name(&field.name),
        if field.is_optional { "?" } else { "" },
        type_text(&field.type_expr)
    ));
}

fn render_enum(decl: &Declaration) -> String {
    let mut out = String::new();
    write_doc(&mut out, decl.doc.as_deref(), "");
    let symbols = if decl.symbols.is_empty() {
        "never".to_string()
    } else {
        decl.symbols.iter().map(|s| quote(s)).collect::<Vec<_>>().join(" | ")
    };
    out.push_str(&format!("export type {} = {};\n", decl.name, symbols));
    out
}

fn write_doc(out: &mut String, doc: Option<&str>, indent: &str) {
    let Some(doc) = doc.map(str::trim_end).filter(|d| !d.is_empty()) else {
        return;
    };
    out.push_str(&format!("{}/**\n", indent));
    for line in doc.lines() {
        let line = line.replace("*/", "*\\/");
        if line.is_empty() {
            out.push_str(&format!("{} *\n", indent));
        } else {
            out.push_str(&format!("{} * {}\n", indent, line));
        }
    }
    out.push_str(&format!("{} */\n", indent));
}

/// Quote property names that are not plain identifiers.
fn property_name(name: &str) -> String {
    let mut chars = name.chars();
    let is_identifier = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if is_identifier {
        name.to_string()
    } else {
        quote(name)
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
