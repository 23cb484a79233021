//! Typed view over the JSON-Schema subset we resolve.
//!
//! Only the keywords that influence the resolved type are kept:
//! `$ref`, `type`, `title`, `description`, `properties`, `required`, `items`,
//! `additionalProperties`, `enum`, `anyOf`, `default`, `$defs`/`definitions`.
//! Anything else (`pattern`, `minimum`, `oneOf`, ...) is ignored on read.
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SchemaError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    #[serde(rename = "$ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TypeDecl>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Declared order is kept; it becomes the record's field order.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, Fragment>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Fragment>>,

    #[serde(rename = "additionalProperties", default, skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Additional>,

    #[serde(rename = "enum", default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,

    #[serde(rename = "anyOf", default, skip_serializing_if = "Option::is_none")]
    pub any_of: Option<Vec<Fragment>>,

    /// `null` and absent are the same thing here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    #[serde(rename = "$defs", alias = "definitions", default, skip_serializing_if = "IndexMap::is_empty")]
    pub defs: IndexMap<String, Fragment>,
}

/// `type` is either one kind name or a list of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeDecl {
    One(String),
    Many(Vec<String>),
}

/// `additionalProperties` is either a flag or a value schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Additional {
    Flag(bool),
    Schema(Box<Fragment>),
}

/// The named, reusable fragments of one schema document.
pub type Definitions = IndexMap<String, Fragment>;

/// Homogeneous containers with no fixed property set.
#[derive(Debug, Clone, Copy)]
pub enum Container<'a> {
    List(&'a Fragment),
    Map(&'a Fragment),
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl TypeDecl {
    /// Lists use their first entry.
    pub fn primary(&self) -> Option<&str> {
        match self {
            TypeDecl::One(s) => Some(s.as_str()),
            TypeDecl::Many(xs) => xs.first().map(|s| s.as_str()),
        }
    }
}

impl Fragment {
    pub fn parse(value: &Value) -> Result<Self, SchemaError> {
        crate::path_de::from_value_with_path(value)
    }

    pub fn kind_name(&self) -> Option<&str> {
        self.kind.as_ref().and_then(TypeDecl::primary)
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind_name() == Some(kind)
    }

    pub fn is_enum(&self) -> bool {
        self.enum_values.is_some()
    }

    pub fn is_null(&self) -> bool {
        self.is_kind("null")
    }

    /// Array with declared items, or object with a value schema for unlisted keys.
    pub fn container(&self) -> Option<Container<'_>> {
        if self.is_kind("array") {
            if let Some(items) = self.items.as_deref() {
                return Some(Container::List(items));
            }
        }
        if self.is_kind("object") {
            if let Some(Additional::Schema(values)) = &self.additional_properties {
                return Some(Container::Map(values));
            }
        }
        None
    }

    /// A container that declares no properties of its own.
    pub fn is_pure_container(&self) -> bool {
        self.container().is_some() && self.properties.is_empty()
    }

    /// A definition that a `$ref` expands in place: a pure container, a union,
    /// or a bare reference to another definition. Every other definition is
    /// referred to as `Record(name)`.
    pub fn resolves_inline(&self) -> bool {
        if self.reference.is_some() {
            return self.properties.is_empty();
        }
        if self.is_enum() {
            return false;
        }
        self.any_of.is_some() || self.is_pure_container()
    }

    /// Field-level check: an inline object with its own property set.
    pub fn has_inline_properties(&self) -> bool {
        !self.properties.is_empty() && (self.kind.is_none() || self.is_kind("object"))
    }

    pub fn is_required(&self, field: &str) -> bool {
        self.required.iter().any(|r| r == field)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// REFERENCES
// ————————————————————————————————————————————————————————————————————————————

static REF_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#/(?:\$defs|definitions)/([^/]+)$").expect("static regex"));

/// Extract the definition name from a `#/$defs/<name>` pointer.
pub fn ref_name(path: &str) -> Option<String> {
    let caps = REF_PATH.captures(path)?;
    let raw = caps.get(1)?.as_str();
    // JSON pointer escapes; order matters.
    Some(raw.replace("~1", "/").replace("~0", "~"))
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
