//! Type resolution: one schema fragment → one [`Ty`].
//!
//! Dispatch order is `$ref`, `enum`, `anyOf`, then the basic kinds. The
//! resolver never builds a record's fields itself; object-like fragments are
//! handed to the builder (see `builder.rs`), which may call back in here for
//! each field. The [`ResolutionCache`] is what stops that recursion on cyclic
//! schemas.
use serde_json::Value;
use tracing::warn;

use crate::builder::ResolutionCache;
use crate::error::ResolveError;
use crate::ir::{simplify_union, Literal, Ty};
use crate::options::ResolveOptions;
use crate::schema::{ref_name, Container, Definitions, Fragment};

/// One resolution session over a fixed definitions table.
pub struct Resolver<'d> {
    pub(crate) defs: &'d Definitions,
    pub(crate) options: ResolveOptions,
    pub(crate) cache: ResolutionCache,
    /// Inline definitions being expanded since the innermost record build.
    pub(crate) inlining: Vec<String>,
    /// Record name held back for the root while definitions are built.
    pub(crate) reserved: Option<String>,
}

impl<'d> Resolver<'d> {
    pub fn new(defs: &'d Definitions, options: ResolveOptions) -> Self {
        Self::with_cache(defs, options, ResolutionCache::default())
    }

    /// Continue from a cache retained from an earlier session.
    pub fn with_cache(defs: &'d Definitions, options: ResolveOptions, cache: ResolutionCache) -> Self {
        Self { defs, options, cache, inlining: Vec::new(), reserved: None }
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn into_cache(self) -> ResolutionCache {
        self.cache
    }

    /// Resolve `frag` found at `path`. `hint` names any inline record it builds.
    pub fn resolve_type(&mut self, frag: &Fragment, path: &str, hint: &str) -> Result<Ty, ResolveError> {
        if let Some(reference) = &frag.reference {
            return self.resolve_reference(reference, path);
        }
        if let Some(values) = &frag.enum_values {
            return literal_set(values, path);
        }
        if let Some(arms) = &frag.any_of {
            return self.resolve_union(arms, path, hint);
        }
        self.resolve_basic(frag, path, hint)
    }

    pub(crate) fn resolve_reference(&mut self, reference: &str, path: &str) -> Result<Ty, ResolveError> {
        let name = ref_name(reference).ok_or_else(|| {
            ResolveError::malformed(path, format!("unsupported $ref `{reference}`"))
        })?;

        let defs = self.defs;
        match defs.get(&name) {
            Some(def) if def.resolves_inline() => self.resolve_alias(&name, def),
            Some(def) => {
                if !self.cache.contains(&name) {
                    let def_path = def_path(&name);
                    self.build_record_at(def, &name, &def_path)?;
                }
                Ok(Ty::Record(name))
            }
            None if self.cache.contains(&name) => Ok(Ty::Record(name)),
            None => Err(ResolveError::UnknownReference(name)),
        }
    }

    /// Expand a definition in place instead of naming its record.
    pub(crate) fn resolve_alias(&mut self, name: &str, def: &Fragment) -> Result<Ty, ResolveError> {
        if let Some(ty) = self.cache.alias(name) {
            return Ok(ty.clone());
        }
        if self.inlining.iter().any(|n| n == name) {
            return Err(ResolveError::CyclicAlias(name.to_string()));
        }
        self.inlining.push(name.to_string());
        let resolved = self.resolve_type(def, &def_path(name), name);
        self.inlining.pop();

        let ty = resolved?;
        self.cache.insert_alias(name, ty.clone());
        Ok(ty)
    }

    fn resolve_union(&mut self, arms: &[Fragment], path: &str, hint: &str) -> Result<Ty, ResolveError> {
        if arms.is_empty() {
            return Err(ResolveError::malformed(path, "anyOf has no alternatives"));
        }
        // More than one non-null arm: give inline records distinct names.
        let several = arms.iter().filter(|a| !a.is_null()).count() > 1;

        let mut out = Vec::with_capacity(arms.len());
        for (i, arm) in arms.iter().enumerate() {
            if arm.is_null() && arm.reference.is_none() {
                out.push(Ty::Null);
                continue;
            }
            let arm_path = format!("{path}/anyOf/{i}");
            let arm_hint = if several { format!("{hint}Variant{i}") } else { hint.to_string() };
            out.push(self.resolve_type(arm, &arm_path, &arm_hint)?);
        }
        Ok(simplify_union(out))
    }

    fn resolve_basic(&mut self, frag: &Fragment, path: &str, hint: &str) -> Result<Ty, ResolveError> {
        // Open containers win over property sets.
        match frag.container() {
            Some(Container::List(items)) => {
                let item_path = format!("{path}/items");
                let item = self.resolve_type(items, &item_path, &format!("{hint}Item"))?;
                return Ok(Ty::List(Box::new(item)));
            }
            Some(Container::Map(values)) => {
                let value_path = format!("{path}/additionalProperties");
                let value = self.resolve_type(values, &value_path, &format!("{hint}Value"))?;
                return Ok(Ty::Map(Box::new(value)));
            }
            None => {}
        }

        if frag.has_inline_properties() {
            let name = self.unique_record_name(hint);
            self.build_record_at(frag, &name, path)?;
            return Ok(Ty::Record(name));
        }

        match frag.kind_name() {
            Some(kind) => match Ty::from_kind(kind) {
                Some(ty) => Ok(ty),
                None => self.fallback(path, Some(kind)),
            },
            None => self.fallback(path, None),
        }
    }

    fn fallback(&self, path: &str, kind: Option<&str>) -> Result<Ty, ResolveError> {
        if self.options.is_strict() {
            return Err(ResolveError::UnrecognizedType {
                path: path.to_string(),
                kind: kind.map(str::to_string),
            });
        }
        match kind {
            Some(kind) => warn!(%path, kind, "unrecognized type, using text"),
            None => warn!(%path, "no type declared, using text"),
        }
        Ok(Ty::TEXT)
    }

    fn unique_record_name(&self, hint: &str) -> String {
        let taken = |n: &str| {
            self.defs.contains_key(n) || self.cache.contains(n) || self.reserved.as_deref() == Some(n)
        };
        if !taken(hint) {
            return hint.to_string();
        }
        (2..)
            .map(|i| format!("{hint}{i}"))
            .find(|n| !taken(n))
            .unwrap_or_else(|| hint.to_string())
    }
}

/// `enum` → literal set, declared order, duplicates dropped (`1` and `1.0` are one value).
pub(crate) fn literal_set(values: &[Value], path: &str) -> Result<Ty, ResolveError> {
    if values.is_empty() {
        return Err(ResolveError::malformed(path, "enum has no values"));
    }
    let mut lits: Vec<Literal> = Vec::with_capacity(values.len());
    for v in values {
        let lit = Literal::from_value(v).ok_or_else(|| {
            ResolveError::malformed(path, format!("enum value {v} is not a scalar"))
        })?;
        if !lits.iter().any(|seen| seen.matches(v)) {
            lits.push(lit);
        }
    }
    Ok(Ty::Literals(lits))
}

pub(crate) fn def_path(name: &str) -> String {
    format!("#/$defs/{name}")
}

/// `next_node` → `NextNode`.
pub fn pascal(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(|s| {
            let mut cs = s.chars();
            match cs.next() {
                Some(first) => first.to_uppercase().chain(cs).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
