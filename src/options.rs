use serde::{Deserialize, Serialize};

/// What to do with a fragment whose `type` is absent or not one we know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Degrade to `Text` and log a warning.
    #[default]
    Lenient,
    /// Fail with `ResolveError::UnrecognizedType`.
    Strict,
}

/// Knobs for one resolution session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolveOptions {
    pub strictness: Strictness,
    /// Field name used when promoting an untitled enum to a record.
    pub enum_field_name: String,
    /// Record name for the top-level schema when the caller does not pick one.
    pub root_name: String,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            strictness: Strictness::Lenient,
            enum_field_name: "enum_field".to_string(),
            root_name: "DynamicModel".to_string(),
        }
    }
}

impl ResolveOptions {
    pub fn strict() -> Self {
        Self { strictness: Strictness::Strict, ..Self::default() }
    }

    pub fn is_strict(&self) -> bool {
        self.strictness == Strictness::Strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_options_fill_defaults() {
        let o: ResolveOptions = serde_json::from_value(serde_json::json!({
            "strictness": "strict"
        }))
        .unwrap();
        assert!(o.is_strict());
        assert_eq!(o.enum_field_name, "enum_field");
        assert_eq!(o.root_name, "DynamicModel");
    }

    #[test]
    fn unknown_option_rejected() {
        let r = serde_json::from_value::<ResolveOptions>(serde_json::json!({ "loose": true }));
        assert!(r.is_err());
    }
}
