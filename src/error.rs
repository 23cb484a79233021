//! Error types for schema parsing and resolution.
use thiserror::Error;

/// Failure to read a schema document into a [`crate::schema::Fragment`] tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("at JSON path {path} → {message}")]
    Parse { path: String, message: String },
}

/// Resolution failures. Any of these aborts the whole `resolve_schema` call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error("unknown reference `{0}`: no such entry in $defs")]
    UnknownReference(String),

    #[error("malformed fragment at {path}: {reason}")]
    MalformedFragment { path: String, reason: String },

    #[error("unrecognized type {kind:?} at {path}")]
    UnrecognizedType { path: String, kind: Option<String> },

    #[error("definition `{0}` refers to itself without passing through an object")]
    CyclicAlias(String),

    #[error("root name `{0}` collides with a definition of the same name")]
    NameCollision(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

impl ResolveError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        ResolveError::MalformedFragment {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
