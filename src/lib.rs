//! Schema-driven type resolution.
//!
//! Feed a JSON-Schema-like document (`$defs`, `$ref`, `anyOf`, `enum`, arrays,
//! objects) and get back a set of named [`RecordDef`]s whose fields carry
//! purely semantic [`Ty`]s:
//!
//! ```
//! use schema_records::{resolve_schema, ResolveOptions, Ty};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": { "query": { "type": "string" }, "limit": { "type": "integer", "default": 10 } },
//!     "required": ["query"]
//! });
//! let resolved = resolve_schema(&schema, "Search", &ResolveOptions::default()).unwrap();
//! assert_eq!(resolved.root.field("query").unwrap().ty, Ty::TEXT);
//! assert!(!resolved.root.field("limit").unwrap().is_required());
//! ```
pub mod builder;
pub mod cli;
pub mod codegen;
pub mod emit;
pub mod error;
pub mod ir;
pub mod jq_exec;
pub mod options;
pub mod path_de;
pub mod resolve;
pub mod schema;
pub mod validate;

pub use builder::{resolve_schema, RecordResolver, ResolutionCache, SchemaResolver};
pub use error::{ResolveError, SchemaError};
pub use ir::{Field, FieldDefault, Literal, Primitive, RecordDef, ResolvedSchema, Ty};
pub use options::{ResolveOptions, Strictness};
pub use resolve::Resolver;
pub use schema::{Definitions, Fragment};
pub use validate::{ValidationErrors, Violation, ViolationKind};
