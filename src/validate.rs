//! Small interpreter over resolved records: check a JSON value against a
//! record and build the fully-defaulted instance.
use std::fmt;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::ir::{Primitive, RecordDef, ResolvedSchema, Ty};

#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    /// JSON-pointer-ish location inside the checked value (`""` is the root).
    pub path: String,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViolationKind {
    MissingField(String),
    TypeMismatch { expected: String, found: &'static str },
    NotALiteral { expected: String },
    NoUnionMatch { expected: String },
    UnknownRecord(String),
}

/// Every violation found, in visit order.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{} violation(s): {}", .0.len(), summary(.0))]
pub struct ValidationErrors(pub Vec<Violation>);

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

impl ResolvedSchema {
    /// Validate against the root record and return the constructed instance.
    pub fn construct(&self, value: &Value) -> Result<Value, ValidationErrors> {
        let root = self.root.clone();
        self.construct_with(&root, value)
    }

    /// Same as [`ResolvedSchema::construct`] for any record by name.
    pub fn construct_record(&self, name: &str, value: &Value) -> Result<Value, ValidationErrors> {
        match self.record(name) {
            Some(rec) => {
                let rec = rec.clone();
                self.construct_with(&rec, value)
            }
            None => Err(ValidationErrors(vec![Violation {
                path: String::new(),
                kind: ViolationKind::UnknownRecord(name.to_string()),
            }])),
        }
    }

    pub fn validate(&self, value: &Value) -> Result<(), ValidationErrors> {
        self.construct(value).map(|_| ())
    }

    fn construct_with(&self, rec: &RecordDef, value: &Value) -> Result<Value, ValidationErrors> {
        let mut errs = Vec::new();
        let out = Interp { schema: self }.record(rec, value, "", &mut errs);
        if errs.is_empty() { Ok(out) } else { Err(ValidationErrors(errs)) }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERPRETER
// ————————————————————————————————————————————————————————————————————————————

struct Interp<'s> {
    schema: &'s ResolvedSchema,
}

impl Interp<'_> {
    fn record(&self, rec: &RecordDef, value: &Value, path: &str, errs: &mut Vec<Violation>) -> Value {
        let Some(obj) = value.as_object() else {
            errs.push(mismatch(path, &rec.name, value));
            return Value::Null;
        };

        let mut out = Map::new();
        for field in &rec.fields {
            let field_path = format!("{path}/{}", field.name);
            match (obj.get(&field.name), field.default_value()) {
                (Some(v), _) => {
                    let v = self.check(&field.ty, v, &field_path, errs);
                    out.insert(field.name.clone(), v);
                }
                (None, Some(default)) => {
                    out.insert(field.name.clone(), default.clone());
                }
                (None, None) => errs.push(Violation {
                    path: path.to_string(),
                    kind: ViolationKind::MissingField(field.name.clone()),
                }),
            }
        }
        Value::Object(out)
    }

    fn check(&self, ty: &Ty, value: &Value, path: &str, errs: &mut Vec<Violation>) -> Value {
        match ty {
            Ty::Primitive(p) => {
                if !primitive_accepts(*p, value) {
                    errs.push(mismatch(path, ty, value));
                }
                value.clone()
            }
            Ty::Null => {
                if !value.is_null() {
                    errs.push(mismatch(path, ty, value));
                }
                Value::Null
            }
            Ty::Literals(lits) => {
                if !lits.iter().any(|l| l.matches(value)) {
                    errs.push(Violation {
                        path: path.to_string(),
                        kind: ViolationKind::NotALiteral { expected: ty.to_string() },
                    });
                }
                value.clone()
            }
            Ty::Optional(inner) => {
                if value.is_null() { Value::Null } else { self.check(inner, value, path, errs) }
            }
            Ty::List(item) => match value.as_array() {
                Some(xs) => Value::Array(
                    xs.iter()
                        .enumerate()
                        .map(|(i, x)| self.check(item, x, &format!("{path}/{i}"), errs))
                        .collect(),
                ),
                None => {
                    errs.push(mismatch(path, ty, value));
                    value.clone()
                }
            },
            Ty::Map(inner) => match value.as_object() {
                Some(m) => Value::Object(
                    m.iter()
                        .map(|(k, v)| (k.clone(), self.check(inner, v, &format!("{path}/{k}"), errs)))
                        .collect(),
                ),
                None => {
                    errs.push(mismatch(path, ty, value));
                    value.clone()
                }
            },
            Ty::Record(name) => match self.schema.record(name) {
                Some(rec) => self.record(rec, value, path, errs),
                None => {
                    errs.push(Violation {
                        path: path.to_string(),
                        kind: ViolationKind::UnknownRecord(name.clone()),
                    });
                    value.clone()
                }
            },
            Ty::Union(arms) => {
                // first arm that accepts the value wins
                for arm in arms {
                    let mut scratch = Vec::new();
                    let v = self.check(arm, value, path, &mut scratch);
                    if scratch.is_empty() {
                        return v;
                    }
                }
                errs.push(Violation {
                    path: path.to_string(),
                    kind: ViolationKind::NoUnionMatch { expected: ty.to_string() },
                });
                value.clone()
            }
        }
    }
}

fn primitive_accepts(p: Primitive, value: &Value) -> bool {
    match p {
        Primitive::Text => value.is_string(),
        Primitive::Integer => value.is_i64() || value.is_u64(),
        Primitive::Real => value.is_number(),
        Primitive::Boolean => value.is_boolean(),
        Primitive::Any => true,
    }
}

fn mismatch(path: &str, expected: impl fmt::Display, found: &Value) -> Violation {
    Violation {
        path: path.to_string(),
        kind: ViolationKind::TypeMismatch {
            expected: expected.to_string(),
            found: json_kind(found),
        },
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ————————————————————————————————————————————————————————————————————————————
// DISPLAY
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.path.is_empty() { "/" } else { self.path.as_str() };
        match &self.kind {
            ViolationKind::MissingField(name) => write!(f, "{at}: missing required field `{name}`"),
            ViolationKind::TypeMismatch { expected, found } => {
                write!(f, "{at}: expected {expected}, found {found}")
            }
            ViolationKind::NotALiteral { expected } => write!(f, "{at}: expected one of {expected}"),
            ViolationKind::NoUnionMatch { expected } => write!(f, "{at}: no alternative of {expected} matches"),
            ViolationKind::UnknownRecord(name) => write!(f, "{at}: unknown record `{name}`"),
        }
    }
}

fn summary(vs: &[Violation]) -> String {
    vs.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::resolve_schema;
    use crate::options::ResolveOptions;
    use serde_json::json;

    fn schema() -> ResolvedSchema {
        resolve_schema(
            &json!({
                "$defs": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "value": { "type": "integer" },
                            "next": { "$ref": "#/$defs/Node" }
                        },
                        "required": ["value"]
                    },
                    "Mode": { "enum": ["fast", "slow"], "title": "Mode" }
                },
                "type": "object",
                "properties": {
                    "head": { "$ref": "#/$defs/Node" },
                    "mode": { "enum": ["fast", "slow"], "default": "fast" },
                    "tags": { "type": "array", "items": { "type": "string" } },
                    "limits": { "type": "object", "additionalProperties": { "type": "number" } },
                    "id": { "anyOf": [{ "type": "integer" }, { "type": "string" }] }
                },
                "required": ["head"]
            }),
            "Query",
            &ResolveOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn fills_defaults_in_declared_order() {
        let s = schema();
        let out = s.construct(&json!({ "head": { "value": 1 }, "extra": true })).unwrap();
        assert_eq!(
            out,
            json!({
                "head": { "value": 1, "next": null },
                "mode": "fast",
                "tags": null,
                "limits": null,
                "id": null
            })
        );
        let keys: Vec<_> = out.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["head", "mode", "tags", "limits", "id"]);
    }

    #[test]
    fn recursive_values() {
        let s = schema();
        let v = json!({ "head": { "value": 1, "next": { "value": 2, "next": { "value": "x" } } } });
        let errs = s.construct(&v).unwrap_err();
        assert_eq!(errs.0.len(), 1);
        assert_eq!(errs.0[0].path, "/head/next/next/value");
        assert!(matches!(errs.0[0].kind, ViolationKind::TypeMismatch { found: "string", .. }));
    }

    #[test]
    fn collects_every_violation() {
        let s = schema();
        let errs = s
            .construct(&json!({ "mode": "medium", "tags": ["a", 1], "limits": { "x": "y" } }))
            .unwrap_err();
        let paths: Vec<_> = errs.0.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(paths, ["", "/mode", "/tags/1", "/limits/x"]);
        assert!(matches!(&errs.0[0].kind, ViolationKind::MissingField(f) if f == "head"));
        assert!(matches!(errs.0[1].kind, ViolationKind::NotALiteral { .. }));
    }

    #[test]
    fn unions_take_first_match() {
        let s = schema();
        assert!(s.validate(&json!({ "head": { "value": 0 }, "id": 7 })).is_ok());
        assert!(s.validate(&json!({ "head": { "value": 0 }, "id": "seven" })).is_ok());
        let errs = s.validate(&json!({ "head": { "value": 0 }, "id": 1.5 })).unwrap_err();
        assert!(matches!(errs.0[0].kind, ViolationKind::NoUnionMatch { .. }));
    }

    #[test]
    fn promoted_enum_record() {
        let s = schema();
        assert_eq!(
            s.construct_record("Mode", &json!({ "Mode": "slow" })).unwrap(),
            json!({ "Mode": "slow" })
        );
        assert!(s.construct_record("Mode", &json!({ "Mode": "other" })).is_err());
        assert!(s.construct_record("Nope", &json!({})).is_err());
    }

    #[test]
    fn error_message_lists_violations() {
        let s = schema();
        let err = s.validate(&json!({})).unwrap_err();
        assert_eq!(err.to_string(), "1 violation(s): /: missing required field `head`");
    }
}
