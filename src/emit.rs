//! Re-emit a normalized JSON Schema from resolved records.
//!
//! Every record lands in `$defs`; the document itself is a bare `$ref` to the
//! root. Resolving the output again yields the same records.
use serde_json::{json, Map, Value};

use crate::ir::{FieldDefault, Primitive, RecordDef, ResolvedSchema, Ty};

pub fn to_json_schema(schema: &ResolvedSchema) -> Value {
    let defs: Map<String, Value> = schema
        .records
        .iter()
        .map(|(name, rec)| (name.clone(), record_schema(rec)))
        .collect();
    json!({
        "$ref": ref_path(&schema.root.name),
        "$defs": defs,
    })
}

pub fn record_schema(rec: &RecordDef) -> Value {
    let mut props = Map::new();
    let mut required = Vec::new();
    for field in &rec.fields {
        let mut prop = ty_schema(&field.ty);
        if let Some(desc) = &field.description {
            prop["description"] = Value::from(desc.clone());
        }
        match &field.default {
            FieldDefault::Required => required.push(Value::from(field.name.clone())),
            FieldDefault::Value(Value::Null) => {}
            FieldDefault::Value(v) => prop["default"] = v.clone(),
        }
        props.insert(field.name.clone(), prop);
    }

    let mut o = json!({ "type": "object", "properties": props });
    if !required.is_empty() {
        o["required"] = Value::Array(required);
    }
    if let Some(desc) = &rec.description {
        o["description"] = Value::from(desc.clone());
    }
    o
}

pub fn ty_schema(ty: &Ty) -> Value {
    match ty {
        Ty::Primitive(p) => match p {
            Primitive::Text => json!({ "type": "string" }),
            Primitive::Integer => json!({ "type": "integer" }),
            Primitive::Real => json!({ "type": "number" }),
            Primitive::Boolean => json!({ "type": "boolean" }),
            Primitive::Any => json!({}),
        },
        Ty::Null => json!({ "type": "null" }),
        Ty::Literals(lits) => json!({ "enum": lits.iter().map(|l| l.to_value()).collect::<Vec<_>>() }),
        Ty::Optional(inner) => {
            // flatten so `(A | B)?` stays one anyOf
            let mut arms: Vec<Value> = match &**inner {
                Ty::Union(xs) => xs.iter().map(ty_schema).collect(),
                other => vec![ty_schema(other)],
            };
            arms.push(json!({ "type": "null" }));
            json!({ "anyOf": arms })
        }
        Ty::List(item) if **item == Ty::ANY => json!({ "type": "array" }),
        Ty::List(item) => json!({ "type": "array", "items": ty_schema(item) }),
        Ty::Map(value) if **value == Ty::ANY => json!({ "type": "object" }),
        Ty::Map(value) => json!({ "type": "object", "additionalProperties": ty_schema(value) }),
        Ty::Record(name) => json!({ "$ref": ref_path(name) }),
        Ty::Union(arms) => json!({ "anyOf": arms.iter().map(ty_schema).collect::<Vec<_>>() }),
    }
}

fn ref_path(name: &str) -> String {
    format!("#/$defs/{}", name.replace('~', "~0").replace('/', "~1"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::resolve_schema;
    use crate::options::ResolveOptions;

    #[test]
    fn optional_union_flattens() {
        let t = Ty::Union(vec![Ty::TEXT, Ty::Primitive(Primitive::Integer)]).optional();
        assert_eq!(
            ty_schema(&t),
            json!({ "anyOf": [{ "type": "string" }, { "type": "integer" }, { "type": "null" }] })
        );
    }

    #[test]
    fn ref_paths_escape() {
        assert_eq!(ty_schema(&Ty::Record("a/b~c".into())), json!({ "$ref": "#/$defs/a~1b~0c" }));
    }

    #[test]
    fn emitted_schema_is_a_fixed_point() {
        let src = json!({
            "$defs": {
                "Node": {
                    "type": "object",
                    "description": "linked list cell",
                    "properties": {
                        "value": { "type": "integer" },
                        "next": { "$ref": "#/$defs/Node" }
                    },
                    "required": ["value"]
                },
                "Ids": { "type": "array", "items": { "anyOf": [{ "type": "string" }, { "type": "integer" }] } },
                "Kind": { "title": "Kind", "enum": ["a", "b"] }
            },
            "type": "object",
            "properties": {
                "list": { "$ref": "#/$defs/Node" },
                "ids": { "$ref": "#/$defs/Ids", "description": "ids" },
                "kind": { "$ref": "#/$defs/Kind" },
                "meta": { "type": "object" },
                "raw": { "type": "array" },
                "scores": { "type": "object", "additionalProperties": { "type": "number" }, "default": {} },
                "inner": { "type": "object", "properties": { "flag": { "type": "boolean", "default": true } } }
            },
            "required": ["list"]
        });
        let options = ResolveOptions::default();
        let first = resolve_schema(&src, "Root", &options).unwrap();
        let emitted = to_json_schema(&first);
        let second = resolve_schema(&emitted, "Ignored", &options).unwrap();

        assert_eq!(second.root.name, "Root");
        assert_eq!(first.records, second.records);
    }
}
