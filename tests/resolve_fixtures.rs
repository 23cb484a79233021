use std::sync::Arc;

use schema_records::{
    resolve_schema, FieldDefault, Literal, Primitive, ResolveError, ResolveOptions, ResolvedSchema, Ty,
};
use serde_json::{json, Value};

fn fixture(name: &str) -> Value {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    let src = std::fs::read_to_string(&path).unwrap();
    serde_json::from_str(&src).unwrap()
}

fn resolve(schema: &Value, root: &str) -> Result<ResolvedSchema, ResolveError> {
    resolve_schema(schema, root, &ResolveOptions::default())
}

fn text() -> Ty {
    Ty::Primitive(Primitive::Text)
}

#[test]
fn search_tool_shapes() {
    let out = resolve(&fixture("search_tool.json"), "SearchArgs").unwrap();

    let keys: Vec<_> = out.records.keys().map(String::as_str).collect();
    assert_eq!(keys, ["SortOrder", "DateRange", "Filters", "Filter", "SearchArgs"]);
    assert_eq!(
        out.alias("Filters"),
        Some(&Ty::List(Box::new(Ty::Record("Filter".into()))))
    );

    let root = &out.root;
    assert_eq!(root.name, "SearchArgs");
    let f = |n: &str| root.field(n).unwrap();

    assert_eq!(f("query").ty, text());
    assert_eq!(f("query").description.as_deref(), Some("Full-text query"));
    assert!(f("query").is_required());

    assert_eq!(f("limit").ty, Ty::Primitive(Primitive::Integer).optional());
    assert_eq!(f("limit").default, FieldDefault::Value(json!(20)));

    assert_eq!(f("order").ty, Ty::Record("SortOrder".into()).optional());
    assert_eq!(f("range").ty, Ty::Record("DateRange".into()).optional());
    assert_eq!(f("range").default, FieldDefault::Value(Value::Null));
    assert_eq!(
        f("filters").ty,
        Ty::List(Box::new(Ty::Record("Filter".into()))).optional()
    );
    assert_eq!(
        f("boosts").ty,
        Ty::Map(Box::new(Ty::Primitive(Primitive::Real))).optional()
    );
    assert_eq!(
        f("mode").ty,
        Ty::Literals(vec![Literal::Str("fast".into()), Literal::Str("exact".into())]).optional()
    );
    assert_eq!(f("mode").default, FieldDefault::Value(json!("fast")));

    let filter = out.record("Filter").unwrap();
    assert_eq!(
        filter.field("value").unwrap().ty,
        Ty::Union(vec![
            text(),
            Ty::Primitive(Primitive::Real),
            Ty::Primitive(Primitive::Boolean),
        ])
    );
}

#[test]
fn one_record_per_definition_plus_root() {
    let schema = fixture("search_tool.json");
    let out = resolve(&schema, "SearchArgs").unwrap();
    let defs = schema["$defs"].as_object().unwrap();
    assert_eq!(out.records.len(), defs.len() + 1);
    for name in defs.keys() {
        assert!(out.record(name).is_some(), "{name} missing");
    }
}

#[test]
fn resolution_is_idempotent() {
    let schema = fixture("search_tool.json");
    let a = resolve(&schema, "SearchArgs").unwrap();
    let b = resolve(&schema, "SearchArgs").unwrap();
    assert_eq!(a, b);
    assert!(!Arc::ptr_eq(&a.root, &b.root));
}

#[test]
fn required_fields_have_no_default() {
    let schema = fixture("search_tool.json");
    let out = resolve(&schema, "SearchArgs").unwrap();

    let mut sources: Vec<(&str, &Value)> = vec![("SearchArgs", &schema)];
    for (name, def) in schema["$defs"].as_object().unwrap() {
        if def.get("properties").is_some() {
            sources.push((name, def));
        }
    }

    for (name, src) in sources {
        let rec = out.record(name).unwrap();
        let required: Vec<&str> = src["required"]
            .as_array()
            .map(|xs| xs.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        for field in &rec.fields {
            let declared = &src["properties"][&field.name];
            if required.contains(&field.name.as_str()) {
                assert_eq!(field.default, FieldDefault::Required, "{name}.{}", field.name);
            } else {
                assert!(field.ty.is_optional(), "{name}.{} should be optional", field.name);
                let expected = declared.get("default").cloned().unwrap_or(Value::Null);
                assert_eq!(field.default, FieldDefault::Value(expected), "{name}.{}", field.name);
            }
        }
    }
}

#[test]
fn enum_promotion() {
    let out = resolve(&fixture("color.json"), "Color").unwrap();
    assert_eq!(out.root.name, "Color");
    assert_eq!(out.root.fields.len(), 1);
    let field = &out.root.fields[0];
    assert_eq!(field.name, "Color");
    assert!(field.is_required());
    assert_eq!(
        field.ty,
        Ty::Literals(vec![
            Literal::Str("red".into()),
            Literal::Str("green".into()),
            Literal::Str("blue".into()),
        ])
    );
}

#[test]
fn self_reference_shares_identity() {
    let out = resolve(&fixture("linked_list.json"), "Root").unwrap();
    assert_eq!(out.root.name, "Node");
    assert_eq!(out.root.field("next").unwrap().ty, Ty::Record("Node".into()).optional());
    assert!(Arc::ptr_eq(&out.root, out.record("Node").unwrap()));

    let value = out
        .construct(&json!({ "value": 1, "next": { "value": 2 } }))
        .unwrap();
    assert_eq!(value, json!({ "value": 1, "next": { "value": 2, "next": null } }));
}

#[test]
fn union_with_null_collapses() {
    let out = resolve(
        &json!({
            "type": "object",
            "properties": { "a": { "anyOf": [{ "type": "string" }, { "type": "null" }] } },
            "required": ["a"]
        }),
        "Root",
    )
    .unwrap();
    assert_eq!(out.root.field("a").unwrap().ty, Ty::Optional(Box::new(text())));
}

#[test]
fn open_map_is_never_a_record() {
    let out = resolve(
        &json!({
            "type": "object",
            "properties": { "m": { "type": "object", "additionalProperties": { "type": "integer" } } },
            "required": ["m"]
        }),
        "Root",
    )
    .unwrap();
    assert_eq!(
        out.root.field("m").unwrap().ty,
        Ty::Map(Box::new(Ty::Primitive(Primitive::Integer)))
    );
    assert_eq!(out.records.len(), 1);
}

#[test]
fn unknown_reference_returns_nothing() {
    let err = resolve(&fixture("bad_unknown_ref.json"), "Root").unwrap_err();
    assert_eq!(err, ResolveError::UnknownReference("B".into()));
}

#[test]
fn strict_mode_catches_missing_type() {
    let schema = json!({ "type": "object", "properties": { "x": { "description": "no type" } } });
    assert!(resolve(&schema, "Root").is_ok());
    let err = resolve_schema(&schema, "Root", &ResolveOptions::strict()).unwrap_err();
    assert_eq!(
        err,
        ResolveError::UnrecognizedType { path: "#/properties/x".into(), kind: None }
    );
}

#[test]
fn parse_errors_carry_a_path() {
    let err = resolve(&json!({ "properties": { "a": { "anyOf": {} } } }), "Root").unwrap_err();
    match err {
        ResolveError::Schema(schema_records::SchemaError::Parse { path, .. }) => {
            assert_eq!(path, "properties.a.anyOf");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn construct_search_args() {
    let out = resolve(&fixture("search_tool.json"), "SearchArgs").unwrap();
    let value = out
        .construct(&json!({
            "query": "rust",
            "order": { "SortOrder": "desc" },
            "filters": [{ "field": "lang", "value": "en" }]
        }))
        .unwrap();
    assert_eq!(value["limit"], 20);
    assert_eq!(value["mode"], "fast");
    assert_eq!(value["order"], json!({ "SortOrder": "desc" }));
    assert_eq!(value["range"], Value::Null);

    let errs = out
        .construct(&json!({ "query": "rust", "filters": [{ "field": "lang" }] }))
        .unwrap_err();
    assert_eq!(errs.0.len(), 1);
    assert_eq!(errs.0[0].path, "/filters/0");
}
