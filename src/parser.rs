//! Type-expression parsing.
//!
//! Turns the raw `type` value of a field into a [`TypeExpr`]. A raw type is
//! one of:
//!
//! - a token: `"string"`, `"sld:Foo"`, `"File?"`, `"Directory[]"`
//! - an array descriptor: `{"type": "array", "items": <raw> | [<raw>, ...]}`
//! - an enum descriptor: `{"type": "enum", "symbols": ["a", "b"]}`
//! - a wrapper: `{"type": <raw>}`
//! - a sequence of any of the above (a union)
//!
//! A trailing `?` on a token is shorthand for a union with `null`. Inside a
//! union it becomes a `null` member at that position. Only a `null` leading
//! the flattened union marks the field optional; optionality is reported next
//! to the expression rather than inside it.

use serde_json::{Map, Value};

use crate::error::TypeParseError;
use crate::types::{json_type_name, resolve_token, Primitive, TypeExpr};

/// Result of parsing a raw field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedType {
    pub expr: TypeExpr,
    pub optional: bool,
}

/// Parse a raw type value.
///
/// Every node reference encountered is appended to `references` when given,
/// after namespace-prefix stripping.
///
/// # Errors
///
/// Returns `TypeParseError` for values that are not a token, a sequence or a
/// recognized descriptor.
pub fn parse_type(
    raw: &Value,
    references: Option<&mut Vec<String>>,
) -> Result<ParsedType, TypeParseError> {
    let mut parser = Parser { references };
    let (expr, optional) = parser.parse_value(raw, "")?;
    Ok(ParsedType { expr, optional })
}

struct Parser<'a> {
    references: Option<&'a mut Vec<String>>,
}

impl Parser<'_> {
    fn parse_value(&mut self, raw: &Value, path: &str) -> Result<(TypeExpr, bool), TypeParseError> {
        match raw {
            Value::String(token) => Ok(self.parse_token(token)),
            Value::Array(members) => self.parse_union(members, path),
            Value::Object(descriptor) => self.parse_descriptor(descriptor, path),
            other => Err(TypeParseError::new(
                display_path(path),
                format!(
                    "expected string, sequence or object, got {}",
                    json_type_name(other)
                ),
            )),
        }
    }

    fn parse_token(&mut self, token: &str) -> (TypeExpr, bool) {
        let (token, optional) = match token.strip_suffix('?') {
            Some(rest) => (rest, true),
            None => (token, false),
        };
        let (token, is_array) = match token.strip_suffix("[]") {
            Some(rest) => (rest, true),
            None => (token, false),
        };

        let bare = resolve_token(token);
        let expr = match Primitive::from_token(bare) {
            Some(primitive) => TypeExpr::Primitive(primitive),
            None => {
                if let Some(references) = self.references.as_mut() {
                    references.push(bare.to_string());
                }
                TypeExpr::Reference(bare.to_string())
            }
        };

        let expr = if is_array { TypeExpr::array(expr) } else { expr };
        (expr, optional)
    }

    fn parse_union(
        &mut self,
        members: &[Value],
        path: &str,
    ) -> Result<(TypeExpr, bool), TypeParseError> {
        if members.is_empty() {
            return Err(TypeParseError::new(display_path(path), "empty type union"));
        }

        let mut flat = Vec::with_capacity(members.len());
        for (i, member) in members.iter().enumerate() {
            let (expr, member_optional) = self.parse_value(member, &format!("{}/{}", path, i))?;
            // `X?` and a nested `["null", X]` flatten to `null, X` in place
            if member_optional && !flat.iter().any(TypeExpr::is_null) {
                flat.push(TypeExpr::Primitive(Primitive::Null));
            }
            match expr {
                TypeExpr::Union(nested) => flat.extend(nested),
                other => flat.push(other),
            }
        }

        let mut optional = false;
        if flat.len() > 1 && flat[0].is_null() {
            flat.remove(0);
            optional = true;
        }

        let expr = if flat.len() == 1 {
            flat.remove(0)
        } else {
            TypeExpr::Union(flat)
        };
        Ok((expr, optional))
    }

    fn parse_descriptor(
        &mut self,
        descriptor: &Map<String, Value>,
        path: &str,
    ) -> Result<(TypeExpr, bool), TypeParseError> {
        let type_path = format!("{}/type", path);
        match descriptor.get("type") {
            Some(Value::String(kind)) if kind == "array" => {
                let items_path = format!("{}/items", path);
                let items = descriptor.get("items").ok_or_else(|| {
                    TypeParseError::new(display_path(path), "array descriptor without items")
                })?;
                let (inner, items_optional) = self.parse_value(items, &items_path)?;
                let inner = if items_optional { nullable(inner) } else { inner };
                Ok((TypeExpr::array(inner), false))
            }
            Some(Value::String(kind)) if kind == "enum" => {
                let symbols = descriptor
                    .get("symbols")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        TypeParseError::new(
                            display_path(path),
                            "enum descriptor without a symbols sequence",
                        )
                    })?;
                let symbols = symbols
                    .iter()
                    .enumerate()
                    .map(|(i, symbol)| {
                        symbol.as_str().map(String::from).ok_or_else(|| {
                            TypeParseError::new(
                                format!("{}/symbols/{}", path, i),
                                format!("expected string symbol, got {}", json_type_name(symbol)),
                            )
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok((TypeExpr::InlineEnum(symbols), false))
            }
            Some(Value::String(kind)) if kind == "record" || kind == "map" => {
                Err(TypeParseError::new(
                    display_path(path),
                    format!("inline {} types are not supported", kind),
                ))
            }
            // Wrapper: {"type": "X"} or {"type": ["null", "X"]}
            Some(inner @ (Value::String(_) | Value::Array(_))) => {
                self.parse_value(inner, &type_path)
            }
            Some(other) => Err(TypeParseError::new(
                display_path(&type_path),
                format!("expected string or sequence, got {}", json_type_name(other)),
            )),
            None => Err(TypeParseError::new(
                display_path(path),
                "descriptor has no type",
            )),
        }
    }
}

/// Re-attach optionality to an expression nested where it cannot be lifted
/// onto the field (array items).
fn nullable(expr: TypeExpr) -> TypeExpr {
    let mut members = vec![TypeExpr::Primitive(Primitive::Null)];
    match expr {
        TypeExpr::Union(rest) => members.extend(rest),
        other => members.push(other),
    }
    TypeExpr::Union(members)
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "/".to_string()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(raw: Value) -> ParsedType {
        parse_type(&raw, None).unwrap()
    }

    #[test]
    fn plain_reference() {
        let parsed = parse(json!("Bar"));
        assert_eq!(parsed.expr, TypeExpr::reference("Bar"));
        assert!(!parsed.optional);
    }

    #[test]
    fn numeric_tokens_become_number() {
        for token in ["int", "float", "double", "long", "xsd:int", "long?"] {
            let parsed = parse(json!(token));
            assert_eq!(parsed.expr, TypeExpr::Primitive(Primitive::Number), "{}", token);
        }
    }

    #[test]
    fn any_with_suffix() {
        let parsed = parse(json!("Any?"));
        assert_eq!(parsed.expr, TypeExpr::Primitive(Primitive::Any));
        assert!(parsed.optional);
    }

    #[test]
    fn namespace_prefix_is_stripped() {
        assert_eq!(parse(json!("sld:Foo")).expr, TypeExpr::reference("Foo"));
        assert_eq!(parse(json!("#Foo")).expr, TypeExpr::reference("Foo"));
        assert_eq!(parse(json!("cwl:Foo")).expr, TypeExpr::reference("Foo"));
    }

    #[test]
    fn optionality_forms_agree() {
        let leading_null = parse(json!(["null", "Bar"]));
        let suffix = parse(json!("Bar?"));
        let wrapper = parse(json!({"type": ["null", "Bar"]}));

        for parsed in [&leading_null, &suffix, &wrapper] {
            assert!(parsed.optional);
            assert_eq!(parsed.expr, TypeExpr::reference("Bar"));
        }
    }

    #[test]
    fn trailing_null_is_kept() {
        let parsed = parse(json!(["Bar", "null"]));
        assert!(!parsed.optional);
        assert_eq!(
            parsed.expr,
            TypeExpr::Union(vec![
                TypeExpr::reference("Bar"),
                TypeExpr::Primitive(Primitive::Null)
            ])
        );
    }

    #[test]
    fn lone_null_is_not_optional() {
        let parsed = parse(json!(["null"]));
        assert!(!parsed.optional);
        assert!(parsed.expr.is_null());
    }

    #[test]
    fn array_descriptor_with_union_items() {
        let parsed = parse(json!({"type": "array", "items": ["File", "Directory"]}));
        assert_eq!(
            parsed.expr,
            TypeExpr::array(TypeExpr::Union(vec![
                TypeExpr::reference("File"),
                TypeExpr::reference("Directory"),
            ]))
        );
    }

    #[test]
    fn array_shorthand_suffix() {
        let parsed = parse(json!("sld:File[]?"));
        assert!(parsed.optional);
        assert_eq!(parsed.expr, TypeExpr::array(TypeExpr::reference("File")));
    }

    #[test]
    fn nullable_array_items_stay_inside() {
        let parsed = parse(json!({"type": "array", "items": "File?"}));
        assert!(!parsed.optional);
        assert_eq!(
            parsed.expr,
            TypeExpr::array(TypeExpr::Union(vec![
                TypeExpr::Primitive(Primitive::Null),
                TypeExpr::reference("File"),
            ]))
        );
    }

    #[test]
    fn optional_member_keeps_its_position() {
        let expected = TypeExpr::Union(vec![
            TypeExpr::Primitive(Primitive::String),
            TypeExpr::Primitive(Primitive::Null),
            TypeExpr::reference("File"),
        ]);
        for raw in [json!(["string", "File?"]), json!(["string", ["null", "File"]])] {
            let parsed = parse(raw.clone());
            assert!(!parsed.optional, "{}", raw);
            assert_eq!(parsed.expr, expected, "{}", raw);
        }
    }

    #[test]
    fn leading_optional_member_marks_field_optional() {
        let parsed = parse(json!(["File?", "string"]));
        assert!(parsed.optional);
        assert_eq!(
            parsed.expr,
            TypeExpr::Union(vec![
                TypeExpr::reference("File"),
                TypeExpr::Primitive(Primitive::String),
            ])
        );

        let parsed = parse(json!(["null", "File?"]));
        assert!(parsed.optional);
        assert_eq!(parsed.expr, TypeExpr::reference("File"));
    }

    #[test]
    fn array_item_union_order_is_preserved() {
        let parsed = parse(json!({"type": "array", "items": ["string", "File?"]}));
        assert!(!parsed.optional);
        assert_eq!(
            parsed.expr,
            TypeExpr::array(TypeExpr::Union(vec![
                TypeExpr::Primitive(Primitive::String),
                TypeExpr::Primitive(Primitive::Null),
                TypeExpr::reference("File"),
            ]))
        );
    }

    #[test]
    fn inline_enum() {
        let parsed = parse(json!({"type": "enum", "symbols": ["a", "b"]}));
        assert_eq!(
            parsed.expr,
            TypeExpr::InlineEnum(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn nested_unions_are_flattened() {
        let parsed = parse(json!(["null", ["string", "File"], {"type": ["int"]}]));
        assert!(parsed.optional);
        assert_eq!(
            parsed.expr,
            TypeExpr::Union(vec![
                TypeExpr::Primitive(Primitive::String),
                TypeExpr::reference("File"),
                TypeExpr::Primitive(Primitive::Number),
            ])
        );
    }

    #[test]
    fn references_are_collected() {
        let mut refs = Vec::new();
        parse_type(
            &json!(["null", "sld:File", {"type": "array", "items": "#Dirent"}, "string"]),
            Some(&mut refs),
        )
        .unwrap();
        assert_eq!(refs, vec!["File", "Dirent"]);
    }

    #[test]
    fn unrecognized_shapes_are_errors() {
        let err = parse_type(&json!(42), None).unwrap_err();
        assert_eq!(err.path, "/");

        let err = parse_type(&json!({"type": "array"}), None).unwrap_err();
        assert!(err.message.contains("without items"));

        let err = parse_type(&json!(["string", {"type": "record", "fields": []}]), None)
            .unwrap_err();
        assert_eq!(err.path, "/1");

        let err = parse_type(&json!({"type": "enum", "symbols": ["a", 1]}), None).unwrap_err();
        assert_eq!(err.path, "/symbols/1");

        assert!(parse_type(&json!({"items": "File"}), None).is_err());
        assert!(parse_type(&json!([]), None).is_err());
    }
}
