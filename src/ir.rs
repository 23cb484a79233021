// Semantic types produced by resolution. No `Fragment` here.
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde::{Serialize, Serializer};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "of", rename_all = "snake_case")]
pub enum Ty {
    Primitive(Primitive),
    Null,                    // absence
    Literals(Vec<Literal>),  // declared order, no duplicates
    Optional(Box<Ty>),       // never nested, never wraps Null
    List(Box<Ty>),
    Map(Box<Ty>),            // string keys
    Record(String),          // by name within one ResolvedSchema
    Union(Vec<Ty>),          // ≥ 2 arms, no Null arm
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Primitive {
    Text,
    Integer,
    Real,
    Boolean,
    Any,
}

/// One `enum` entry. Arrays and objects are not literals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(OrderedFloat<f64>),
    Str(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDef {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: Vec<Field>, // declared order
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub ty: Ty,
    pub default: FieldDefault,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldDefault {
    /// No default: the caller must supply a value.
    Required,
    /// Declared default, or `Value::Null` for absence.
    Value(Value),
}

/// Output of one `resolve_schema` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSchema {
    #[serde(serialize_with = "record_name")]
    pub root: Arc<RecordDef>,
    /// Every record built during the call, in build order.
    pub records: IndexMap<String, Arc<RecordDef>>,
    /// What each inline definition (container, union, forwarding `$ref`) expands to.
    pub aliases: IndexMap<String, Ty>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl Ty {
    pub const TEXT: Ty = Ty::Primitive(Primitive::Text);
    pub const ANY: Ty = Ty::Primitive(Primitive::Any);

    /// Fixed mapping for declared `type` names.
    pub fn from_kind(kind: &str) -> Option<Ty> {
        let ty = match kind {
            "string" => Ty::TEXT,
            "integer" => Ty::Primitive(Primitive::Integer),
            "number" => Ty::Primitive(Primitive::Real),
            "boolean" => Ty::Primitive(Primitive::Boolean),
            "array" => Ty::List(Box::new(Ty::ANY)),
            "object" => Ty::Map(Box::new(Ty::ANY)),
            "null" => Ty::Null,
            _ => return None,
        };
        Some(ty)
    }

    /// `T | null`. Idempotent; `null | null` stays `Null`.
    pub fn optional(self) -> Ty {
        match self {
            Ty::Optional(_) | Ty::Null => self,
            other => Ty::Optional(Box::new(other)),
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Ty::Optional(_) | Ty::Null)
    }
}

/// Collapse union arms: drop duplicates, fold `null` into `Optional`.
pub fn simplify_union(arms: Vec<Ty>) -> Ty {
    let mut had_null = false;
    let mut kept: Vec<Ty> = Vec::with_capacity(arms.len());
    for arm in arms {
        let arm = match arm {
            Ty::Null => {
                had_null = true;
                continue;
            }
            Ty::Optional(inner) => {
                had_null = true;
                *inner
            }
            other => other,
        };
        if !kept.contains(&arm) {
            kept.push(arm);
        }
    }

    let core = match kept.len() {
        0 => return Ty::Null,
        1 => kept.remove(0),
        _ => Ty::Union(kept),
    };
    if had_null { core.optional() } else { core }
}

impl Literal {
    pub fn from_value(v: &Value) -> Option<Literal> {
        let lit = match v {
            Value::Null => Literal::Null,
            Value::Bool(b) => Literal::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Literal::Int(i),
                None => Literal::Float(OrderedFloat(n.as_f64()?)),
            },
            Value::String(s) => Literal::Str(s.clone()),
            Value::Array(_) | Value::Object(_) => return None,
        };
        Some(lit)
    }

    pub fn to_value(&self) -> Value {
        match self {
            Literal::Null => Value::Null,
            Literal::Bool(b) => Value::Bool(*b),
            Literal::Int(i) => Value::from(*i),
            Literal::Float(f) => Value::from(f.0),
            Literal::Str(s) => Value::String(s.clone()),
        }
    }

    /// Numbers compare by value, so `1` matches `1.0`.
    pub fn matches(&self, v: &Value) -> bool {
        match (self, v) {
            (Literal::Null, Value::Null) => true,
            (Literal::Bool(a), Value::Bool(b)) => a == b,
            (Literal::Int(a), Value::Number(n)) => {
                n.as_i64() == Some(*a) || n.as_f64() == Some(*a as f64)
            }
            (Literal::Float(a), Value::Number(n)) => n.as_f64() == Some(a.0),
            (Literal::Str(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl Serialize for Literal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl Field {
    pub fn is_required(&self) -> bool {
        matches!(self.default, FieldDefault::Required)
    }

    pub fn default_value(&self) -> Option<&Value> {
        match &self.default {
            FieldDefault::Required => None,
            FieldDefault::Value(v) => Some(v),
        }
    }
}

impl RecordDef {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl ResolvedSchema {
    pub fn record(&self, name: &str) -> Option<&Arc<RecordDef>> {
        self.records.get(name)
    }

    pub fn alias(&self, name: &str) -> Option<&Ty> {
        self.aliases.get(name)
    }
}

fn record_name<S: Serializer>(rec: &Arc<RecordDef>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&rec.name)
}

// ————————————————————————————————————————————————————————————————————————————
// DISPLAY
// ————————————————————————————————————————————————————————————————————————————

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Primitive::Text => "text",
            Primitive::Integer => "integer",
            Primitive::Real => "real",
            Primitive::Boolean => "boolean",
            Primitive::Any => "any",
        };
        f.write_str(s)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Primitive(p) => write!(f, "{p}"),
            Ty::Null => f.write_str("null"),
            Ty::Literals(lits) => join(f, lits, " | "),
            Ty::Optional(inner) => match **inner {
                Ty::Union(_) | Ty::Literals(_) => write!(f, "({inner})?"),
                _ => write!(f, "{inner}?"),
            },
            Ty::List(inner) => write!(f, "[{inner}]"),
            Ty::Map(inner) => write!(f, "{{string: {inner}}}"),
            Ty::Record(name) => f.write_str(name),
            Ty::Union(arms) => join(f, arms, " | "),
        }
    }
}

impl fmt::Display for RecordDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} {{", self.name)?;
        for field in &self.fields {
            match &field.default {
                FieldDefault::Required => writeln!(f, "    {}: {}", field.name, field.ty)?,
                FieldDefault::Value(v) => writeln!(f, "    {}: {} = {}", field.name, field.ty, v)?,
            }
        }
        write!(f, "}}")
    }
}

fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, xs: &[T], sep: &str) -> fmt::Result {
    for (i, x) in xs.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{x}")?;
    }
    Ok(())
}
