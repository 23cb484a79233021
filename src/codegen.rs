//! Rust source emission: one serde struct per record.
//!
//! - optional types → `Option<T>` (with `#[serde(default)]` when not required)
//! - string literal sets → a generated enum with `#[serde(rename = ..)]`
//! - other literal sets and multi-arm unions → `serde_json::Value`
//! - a record reference that closes a cycle without a `Vec`/map in between is boxed
use std::collections::{HashMap, HashSet};

use crate::ir::{Literal, Primitive, RecordDef, ResolvedSchema, Ty};
use crate::resolve::pascal;

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern", "false",
    "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
    "ref", "return", "static", "struct", "trait", "true", "type", "unsafe", "use", "where",
    "while", "abstract", "become", "box", "do", "final", "macro", "override", "priv", "try",
    "typeof", "unsized", "virtual", "yield",
];

pub struct Codegen {
    out: String,
    /// Record name → records it contains by value (through `Option` at most).
    inline_edges: HashMap<String, Vec<String>>,
    /// Record name → Rust type name.
    idents: HashMap<String, String>,
    /// Every Rust type name emitted so far (structs, enums, the `Root` alias).
    taken: HashSet<String>,
    enums: Vec<String>,
}

impl Codegen {
    pub fn new() -> Self {
        Self {
            out: String::new(),
            inline_edges: HashMap::new(),
            idents: HashMap::new(),
            taken: HashSet::new(),
            enums: Vec::new(),
        }
    }

    pub fn emit(&mut self, schema: &ResolvedSchema) {
        self.inline_edges = schema
            .records
            .values()
            .map(|rec| {
                let mut to = Vec::new();
                for f in &rec.fields {
                    inline_refs(&f.ty, &mut to);
                }
                (rec.name.clone(), to)
            })
            .collect();
        for name in schema.records.keys() {
            let ident = unique(type_ident(name), &mut self.taken);
            self.idents.insert(name.clone(), ident);
        }
        let root_ident = self.ident(&schema.root.name);
        let root_alias = root_ident != "Root" && self.taken.insert("Root".to_string());

        self.out.push_str("// Generated from a JSON schema. Do not edit by hand.\n");
        self.out.push_str("#![allow(dead_code)]\n\n");
        self.out.push_str("use serde::{Deserialize, Serialize};\n");
        self.out.push_str("#[allow(unused_imports)]\nuse std::collections::BTreeMap;\n\n");

        for rec in schema.records.values() {
            self.emit_record(rec);
        }
        if root_alias {
            self.out.push_str(&format!("pub type Root = {root_ident};\n\n"));
        }
        for e in std::mem::take(&mut self.enums) {
            self.out.push_str(&e);
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn ident(&self, record: &str) -> String {
        self.idents.get(record).cloned().unwrap_or_else(|| type_ident(record))
    }

    fn emit_record(&mut self, rec: &RecordDef) {
        let struct_name = self.ident(&rec.name);
        if let Some(desc) = &rec.description {
            push_doc(&mut self.out, desc, "");
        }
        self.out.push_str("#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]\n");
        self.out.push_str(&format!("pub struct {struct_name} {{\n"));

        let mut used = HashSet::new();
        for field in &rec.fields {
            if let Some(desc) = &field.description {
                push_doc(&mut self.out, desc, "    ");
            }
            let ident = unique(field_ident(&field.name), &mut used);
            if ident.trim_start_matches("r#") != field.name {
                self.out.push_str(&format!("    #[serde(rename = {:?})]\n", field.name));
            }
            if !field.is_required() {
                self.out.push_str("    #[serde(default)]\n");
            }
            let hint = format!("{struct_name}{}", pascal(&field.name));
            let ty = self.rust_type(&field.ty, &rec.name, &hint, false);
            self.out.push_str(&format!("    pub {ident}: {ty},\n"));
        }
        self.out.push_str("}\n\n");
    }

    /// `behind_container`: a `Vec`/map already provides indirection.
    fn rust_type(&mut self, ty: &Ty, owner: &str, hint: &str, behind_container: bool) -> String {
        match ty {
            Ty::Primitive(p) => match p {
                Primitive::Text => "String".into(),
                Primitive::Integer => "i64".into(),
                Primitive::Real => "f64".into(),
                Primitive::Boolean => "bool".into(),
                Primitive::Any => "serde_json::Value".into(),
            },
            Ty::Null => "()".into(),
            Ty::Literals(lits) => match string_literals(lits) {
                Some(strs) => self.literal_enum(hint, &strs),
                None => "serde_json::Value".into(),
            },
            Ty::Optional(inner) => format!("Option<{}>", self.rust_type(inner, owner, hint, behind_container)),
            Ty::List(item) => format!("Vec<{}>", self.rust_type(item, owner, hint, true)),
            Ty::Map(value) => format!("BTreeMap<String, {}>", self.rust_type(value, owner, hint, true)),
            Ty::Record(name) => {
                let ident = self.ident(name);
                if !behind_container && self.reaches(name, owner) {
                    format!("Box<{ident}>")
                } else {
                    ident
                }
            }
            Ty::Union(_) => "serde_json::Value".into(),
        }
    }

    fn literal_enum(&mut self, hint: &str, values: &[&str]) -> String {
        let name = unique(type_ident(hint), &mut self.taken);
        let mut src = String::new();
        src.push_str("#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]\n");
        src.push_str(&format!("pub enum {name} {{\n"));
        let mut used = HashSet::new();
        for (i, v) in values.iter().enumerate() {
            let mut variant = pascal(v);
            if variant.is_empty() || variant.starts_with(|c: char| c.is_ascii_digit()) {
                variant = format!("V{i}{variant}");
            }
            let variant = unique(variant, &mut used);
            src.push_str(&format!("    #[serde(rename = {v:?})]\n    {variant},\n"));
        }
        src.push_str("}\n\n");
        self.enums.push(src);
        name
    }

    /// Is `to` reachable from `from` through by-value containment?
    fn reaches(&self, from: &str, to: &str) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(cur) = stack.pop() {
            if cur == to {
                return true;
            }
            if !seen.insert(cur) {
                continue;
            }
            if let Some(next) = self.inline_edges.get(cur) {
                stack.extend(next.iter().map(String::as_str));
            }
        }
        false
    }
}

impl Default for Codegen {
    fn default() -> Self {
        Self::new()
    }
}

fn inline_refs(ty: &Ty, out: &mut Vec<String>) {
    match ty {
        Ty::Record(name) => out.push(name.clone()),
        Ty::Optional(inner) => inline_refs(inner, out),
        _ => {}
    }
}

fn string_literals(lits: &[Literal]) -> Option<Vec<&str>> {
    lits.iter().map(Literal::as_str).collect()
}

fn type_ident(name: &str) -> String {
    let ident = pascal(name);
    if ident.is_empty() || ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("T{ident}")
    } else {
        ident
    }
}

/// `userId` → `user_id`, `x-y` → `x_y`, `type` → `r#type`.
fn field_ident(name: &str) -> String {
    let mut s = String::with_capacity(name.len());
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() {
                if prev_lower {
                    s.push('_');
                }
                s.push(c.to_ascii_lowercase());
                prev_lower = false;
            } else {
                s.push(c);
                prev_lower = true;
            }
        } else if !s.ends_with('_') {
            s.push('_');
            prev_lower = false;
        }
    }
    let s = s.trim_matches('_').to_string();
    if s.is_empty() || s.starts_with(|c: char| c.is_ascii_digit()) {
        return format!("_{s}");
    }
    match s.as_str() {
        "self" | "super" | "crate" => format!("{s}_"),
        kw if KEYWORDS.contains(&kw) => format!("r#{s}"),
        _ => s,
    }
}

fn unique(base: String, used: &mut HashSet<String>) -> String {
    let mut name = base.clone();
    let mut i = 2;
    while !used.insert(name.clone()) {
        name = format!("{base}{i}");
        i += 1;
    }
    name
}

fn push_doc(out: &mut String, text: &str, indent: &str) {
    for line in text.lines() {
        out.push_str(&format!("{indent}/// {line}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::resolve_schema;
    use crate::options::ResolveOptions;
    use serde_json::json;

    fn generate(schema: serde_json::Value, root: &str) -> String {
        let resolved = resolve_schema(&schema, root, &ResolveOptions::default()).unwrap();
        let mut cg = Codegen::new();
        cg.emit(&resolved);
        cg.into_string()
    }

    #[test]
    fn field_idents() {
        assert_eq!(field_ident("userId"), "user_id");
        assert_eq!(field_ident("x-y"), "x_y");
        assert_eq!(field_ident("type"), "r#type");
        assert_eq!(field_ident("self"), "self_");
        assert_eq!(field_ident("2fa"), "_2fa");
        assert_eq!(field_ident("HTTPCode"), "httpcode");
    }

    #[test]
    fn self_reference_is_boxed() {
        let src = generate(
            json!({
                "$defs": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "value": { "type": "integer" },
                            "next": { "$ref": "#/$defs/Node" },
                            "children": { "type": "array", "items": { "$ref": "#/$defs/Node" } }
                        },
                        "required": ["value"]
                    }
                },
                "$ref": "#/$defs/Node"
            }),
            "Root",
        );
        assert!(src.contains("pub struct Node {"));
        assert!(src.contains("    pub value: i64,\n"));
        assert!(src.contains("    pub next: Option<Box<Node>>,\n"));
        assert!(src.contains("    pub children: Option<Vec<Node>>,\n"));
        assert!(src.contains("pub type Root = Node;"));
    }

    #[test]
    fn type_names_never_collide() {
        let src = generate(
            json!({
                "$defs": {
                    "QueryMode": { "type": "object", "properties": { "x": { "type": "string" } } },
                    "Root": { "type": "object", "properties": { "y": { "type": "string" } } }
                },
                "type": "object",
                "properties": {
                    "mode": { "enum": ["a", "b"] },
                    "saved": { "$ref": "#/$defs/QueryMode" }
                },
                "required": ["mode"]
            }),
            "Query",
        );
        assert!(src.contains("pub struct QueryMode {"));
        assert!(src.contains("pub struct Root {"));
        assert!(src.contains("pub enum QueryMode2 {"));
        assert!(src.contains("    pub mode: QueryMode2,\n"));
        assert!(src.contains("    pub saved: Option<QueryMode>,\n"));
        assert!(!src.contains("pub type Root"));
    }

    #[test]
    fn string_enums_and_renames() {
        let src = generate(
            json!({
                "type": "object",
                "properties": {
                    "sortOrder": { "enum": ["asc", "desc"] },
                    "type": { "type": "string", "description": "kind of thing" },
                    "mixed": { "enum": ["a", 1] }
                },
                "required": ["sortOrder", "type"]
            }),
            "Query",
        );
        assert!(src.contains("    #[serde(rename = \"sortOrder\")]\n    pub sort_order: QuerySortOrder,\n"));
        assert!(src.contains("pub enum QuerySortOrder {"));
        assert!(src.contains("    #[serde(rename = \"asc\")]\n    Asc,\n"));
        assert!(src.contains("    /// kind of thing\n    pub r#type: String,\n"));
        assert!(src.contains("    #[serde(default)]\n    pub mixed: Option<serde_json::Value>,\n"));
    }
}
