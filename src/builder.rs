//! Record construction and the top-level entry points.
//!
//! A record's name is registered in the [`ResolutionCache`] as *pending*
//! before any of its fields are resolved. A field that refers back to a
//! pending record resolves to `Ty::Record(name)` without re-entering the
//! build, so self- and mutually-referential definitions terminate. Records
//! refer to each other by name only, so nothing needs patching afterwards.
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::ResolveError;
use crate::ir::{Field, FieldDefault, RecordDef, ResolvedSchema, Ty};
use crate::options::ResolveOptions;
use crate::resolve::{def_path, literal_set, pascal, Resolver};
use crate::schema::{ref_name, Fragment};

// ————————————————————————————————————————————————————————————————————————————
// CACHE
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
enum Slot {
    Pending,
    Ready(Arc<RecordDef>),
}

/// Per-session memo: record name → record, plus inlined definitions.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    slots: IndexMap<String, Slot>,
    aliases: IndexMap<String, Ty>,
}

/// Cache sizes at some point in time, for rolling back a failed call.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CacheMark {
    slots: usize,
    aliases: usize,
}

impl ResolutionCache {
    /// Pending or finished.
    pub fn contains(&self, name: &str) -> bool {
        self.slots.contains_key(name)
    }

    pub fn is_pending(&self, name: &str) -> bool {
        matches!(self.slots.get(name), Some(Slot::Pending))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RecordDef>> {
        match self.slots.get(name) {
            Some(Slot::Ready(rec)) => Some(rec),
            _ => None,
        }
    }

    pub fn alias(&self, name: &str) -> Option<&Ty> {
        self.aliases.get(name)
    }

    /// Finished records in build order.
    pub fn records(&self) -> impl Iterator<Item = &Arc<RecordDef>> {
        self.slots.values().filter_map(|slot| match slot {
            Slot::Ready(rec) => Some(rec),
            Slot::Pending => None,
        })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn begin(&mut self, name: &str) {
        self.slots.insert(name.to_string(), Slot::Pending);
    }

    fn finish(&mut self, record: RecordDef) -> Arc<RecordDef> {
        let record = Arc::new(record);
        self.slots.insert(record.name.clone(), Slot::Ready(record.clone()));
        record
    }

    pub(crate) fn insert_alias(&mut self, name: &str, ty: Ty) {
        self.aliases.insert(name.to_string(), ty);
    }

    pub(crate) fn mark(&self) -> CacheMark {
        CacheMark { slots: self.slots.len(), aliases: self.aliases.len() }
    }

    /// Drop everything added since `mark`. Entries are only ever appended.
    pub(crate) fn rollback(&mut self, mark: CacheMark) {
        self.slots.truncate(mark.slots);
        self.aliases.truncate(mark.aliases);
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BUILDER
// ————————————————————————————————————————————————————————————————————————————

impl<'d> Resolver<'d> {
    /// Build (or fetch) the record `name` from `frag`.
    pub fn build_record(&mut self, frag: &Fragment, name: &str) -> Result<Arc<RecordDef>, ResolveError> {
        let path = if self.defs.contains_key(name) { def_path(name) } else { "#".to_string() };
        self.build_record_at(frag, name, &path)
    }

    pub(crate) fn build_record_at(
        &mut self,
        frag: &Fragment,
        name: &str,
        path: &str,
    ) -> Result<Arc<RecordDef>, ResolveError> {
        if let Some(done) = self.cache.get(name) {
            return Ok(done.clone());
        }
        if self.cache.is_pending(name) {
            return Err(ResolveError::malformed(path, format!("record `{name}` is still being built")));
        }

        self.cache.begin(name);
        debug!(record = name, %path, "building record");

        // Alias cycles are only detected between record boundaries.
        let outer = std::mem::take(&mut self.inlining);
        let fields = match &frag.enum_values {
            Some(values) => self.enum_field(frag, values, path).map(|f| vec![f]),
            None => self.object_fields(frag, name, path),
        };
        self.inlining = outer;
        let fields = fields?;

        debug!(record = name, fields = fields.len(), "built record");
        Ok(self.cache.finish(RecordDef {
            name: name.to_string(),
            description: frag.description.clone(),
            fields,
        }))
    }

    /// A bare enum becomes one required field named after the schema title.
    fn enum_field(&mut self, frag: &Fragment, values: &[Value], path: &str) -> Result<Field, ResolveError> {
        let name = frag
            .title
            .clone()
            .unwrap_or_else(|| self.options.enum_field_name.clone());
        Ok(Field {
            name,
            ty: literal_set(values, path)?,
            default: FieldDefault::Required,
            description: frag.description.clone(),
        })
    }

    fn object_fields(&mut self, frag: &Fragment, record: &str, path: &str) -> Result<Vec<Field>, ResolveError> {
        for req in &frag.required {
            if !frag.properties.contains_key(req) {
                debug!(record, field = %req, "required field is not declared, ignoring");
            }
        }

        let mut fields = Vec::with_capacity(frag.properties.len());
        for (name, child) in &frag.properties {
            let child_path = format!("{path}/properties/{name}");
            let hint = format!("{record}{}", pascal(name));
            let ty = self.resolve_type(child, &child_path, &hint)?;
            trace!(record, field = %name, ty = %ty, "resolved field");

            let (ty, default) = if frag.is_required(name) {
                (ty, FieldDefault::Required)
            } else {
                let value = child.default.clone().unwrap_or(Value::Null);
                (ty.optional(), FieldDefault::Value(value))
            };
            fields.push(Field {
                name: name.clone(),
                ty,
                default,
                description: child.description.clone(),
            });
        }
        Ok(fields)
    }

    /// Top-level entry: every definition first, then the root.
    ///
    /// On failure nothing added during this call stays in the cache.
    pub fn resolve_root(&mut self, root: &Fragment, root_name: &str) -> Result<ResolvedSchema, ResolveError> {
        let mark = self.cache.mark();
        let result = self.resolve_root_inner(root, root_name);
        if result.is_err() {
            self.cache.rollback(mark);
        }
        result
    }

    fn resolve_root_inner(&mut self, root: &Fragment, root_name: &str) -> Result<ResolvedSchema, ResolveError> {
        let forward = root.reference.as_deref().filter(|_| root.properties.is_empty());
        if forward.is_none() {
            if self.defs.contains_key(root_name) || self.cache.contains(root_name) {
                return Err(ResolveError::NameCollision(root_name.to_string()));
            }
            self.reserved = Some(root_name.to_string());
        }
        let built = self.build_definitions();
        self.reserved = None;
        built?;

        let root_record = match forward {
            Some(reference) => self.root_reference(reference)?,
            None => self.build_record_at(root, root_name, "#")?,
        };

        Ok(ResolvedSchema {
            root: root_record,
            records: self
                .cache
                .records()
                .map(|rec| (rec.name.clone(), rec.clone()))
                .collect(),
            aliases: self.cache.aliases.clone(),
        })
    }

    /// One record per definition. Inline definitions are also expanded so
    /// their errors surface here.
    fn build_definitions(&mut self) -> Result<(), ResolveError> {
        let defs = self.defs;
        for (name, def) in defs {
            self.build_record_at(def, name, &def_path(name))?;
            if def.resolves_inline() {
                self.resolve_alias(name, def)?;
            }
        }
        Ok(())
    }

    /// A root that is only a `$ref` is the referenced definition's record.
    fn root_reference(&self, reference: &str) -> Result<Arc<RecordDef>, ResolveError> {
        let name = ref_name(reference)
            .ok_or_else(|| ResolveError::malformed("#", format!("unsupported $ref `{reference}`")))?;
        match self.cache.get(&name) {
            Some(rec) => Ok(rec.clone()),
            None => Err(ResolveError::UnknownReference(name)),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// ENTRY POINTS
// ————————————————————————————————————————————————————————————————————————————

/// Resolve one schema document with a fresh cache.
pub fn resolve_schema(
    schema: &Value,
    root_name: &str,
    options: &ResolveOptions,
) -> Result<ResolvedSchema, ResolveError> {
    let root = Fragment::parse(schema)?;
    let mut resolver = Resolver::new(&root.defs, options.clone());
    resolver.resolve_root(&root, root_name)
}

/// Pluggable resolution strategy for pipelines that turn tool schemas into types.
pub trait RecordResolver {
    fn resolve_schema(&self, schema: &Value, root_name: &str) -> Result<ResolvedSchema, ResolveError>;
}

/// The default strategy: a fresh [`ResolutionCache`] per call.
#[derive(Debug, Clone, Default)]
pub struct SchemaResolver {
    options: ResolveOptions,
}

impl SchemaResolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }
}

impl RecordResolver for SchemaResolver {
    fn resolve_schema(&self, schema: &Value, root_name: &str) -> Result<ResolvedSchema, ResolveError> {
        resolve_schema(schema, root_name, &self.options)
    }
}
