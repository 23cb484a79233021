//! CLI: schema → (resolved records | normalized schema | rust | instance check)
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;
use tracing::{debug, info};

use crate::builder::SchemaResolver;
use crate::codegen::Codegen;
use crate::ir::ResolvedSchema;
use crate::options::{ResolveOptions, Strictness};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// resolve JSON schemas (with $defs, $ref, anyOf, enum) into typed record definitions
#[derive(Parser, Debug)]
#[command(name = "schema-records", version)]
pub struct CommandLineInterface {
    /// more logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// print the resolved record definitions as JSON
    Resolve(PlainOut),
    /// print a normalized JSON schema rebuilt from the resolved records
    Schema(PlainOut),
    /// emit a Rust data model for the resolved records
    Rust(PlainOut),
    /// validate instance documents against the resolved root record
    Check(CheckOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to select the schema inside each document (e.g. /params/inputSchema)
    #[arg(long)]
    json_pointer: Option<String>,

    /// jq filter selecting one or more schemas inside each document (e.g. '.tools[] | .inputSchema')
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more schema files. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,

    /// name of the root record (defaults to the schema title, then to the configured root name)
    #[arg(long)]
    root_name: Option<String>,

    /// fail on absent or unrecognized `type` instead of falling back to text
    #[arg(long, default_value_t = false)]
    strict: bool,

    /// field name used when an untitled enum is promoted to a record
    #[arg(long)]
    enum_field_name: Option<String>,

    /// JSON file with resolver options; flags override it
    #[arg(long)]
    options: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct PlainOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// instance documents to validate. Literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    data: Vec<String>,

    /// print the constructed (defaulted) instance for every valid document
    #[arg(long, default_value_t = false)]
    show: bool,
}

/// One schema pulled out of an input file.
struct SchemaDoc {
    origin: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn resolve_options(&self) -> Result<ResolveOptions> {
        let mut options = match &self.options {
            Some(path) => {
                let src = std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read options file {}", path.display()))?;
                crate::path_de::from_str_with_path::<ResolveOptions>(&src)
                    .with_context(|| format!("invalid options file {}", path.display()))?
            }
            None => ResolveOptions::default(),
        };
        if self.strict {
            options.strictness = Strictness::Strict;
        }
        if let Some(name) = &self.enum_field_name {
            options.enum_field_name = name.clone();
        }
        Ok(options)
    }

    fn load_schemas(&self) -> Result<Vec<SchemaDoc>> {
        let mut out = Vec::new();
        for source_path in expand_inputs(&self.input)? {
            let origin = source_path.to_string_lossy().to_string();
            let mut json_value = read_json(&source_path)?;

            if let Some(pointer) = &self.json_pointer {
                json_value = json_value
                    .pointer(pointer)
                    .cloned()
                    .with_context(|| format!("JSON pointer {pointer} matches nothing in {origin}"))?;
            }

            match &self.jq_expr {
                None => out.push(SchemaDoc { origin, value: json_value }),
                Some(jq_expr) => {
                    let selected = crate::jq_exec::select(jq_expr, &json_value)
                        .with_context(|| format!("failed to apply jq expression to {origin}"))?;
                    debug!(%origin, count = selected.len(), "jq selected schemas");
                    for (i, value) in selected.into_iter().enumerate() {
                        out.push(SchemaDoc { origin: format!("{origin}[{i}]"), value });
                    }
                }
            }
        }
        Ok(out)
    }

    fn root_name_for(&self, options: &ResolveOptions, schema: &Value) -> String {
        if let Some(name) = &self.root_name {
            return name.clone();
        }
        match schema.get("title").and_then(Value::as_str) {
            Some(title) if !crate::resolve::pascal(title).is_empty() => crate::resolve::pascal(title),
            _ => options.root_name.clone(),
        }
    }

    /// Load, select and resolve every schema. Any failure aborts.
    fn resolve_all(&self) -> Result<Vec<(String, ResolvedSchema)>> {
        let options = self.resolve_options()?;
        let resolver = SchemaResolver::new(options.clone());
        let mut out = Vec::new();
        for doc in self.load_schemas()? {
            let root_name = self.root_name_for(&options, &doc.value);
            let resolved = crate::builder::RecordResolver::resolve_schema(&resolver, &doc.value, &root_name)
                .with_context(|| format!("failed to resolve schema {}", doc.origin))?;
            info!(origin = %doc.origin, root = %resolved.root.name, records = resolved.records.len(), "resolved");
            out.push((doc.origin, resolved));
        }
        if out.is_empty() {
            bail!("no schemas selected from the given inputs");
        }
        Ok(out)
    }

    fn resolve_one(&self) -> Result<ResolvedSchema> {
        let mut all = self.resolve_all()?;
        if all.len() > 1 {
            bail!("expected exactly one schema, got {} (narrow the selection with --jq-expr)", all.len());
        }
        Ok(all.remove(0).1)
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Resolve(target) => {
                let all = target.input_settings.resolve_all()?;
                let text = if all.len() == 1 {
                    serde_json::to_string_pretty(&all[0].1)?
                } else {
                    let list: Vec<&ResolvedSchema> = all.iter().map(|(_, r)| r).collect();
                    serde_json::to_string_pretty(&list)?
                };
                write_output(target.out.as_deref(), &text)
            }
            Command::Schema(target) => {
                let all = target.input_settings.resolve_all()?;
                let schemas: Vec<Value> = all.iter().map(|(_, r)| crate::emit::to_json_schema(r)).collect();
                let text = if schemas.len() == 1 {
                    serde_json::to_string_pretty(&schemas[0])?
                } else {
                    serde_json::to_string_pretty(&schemas)?
                };
                write_output(target.out.as_deref(), &text)
            }
            Command::Rust(target) => {
                let resolved = target.input_settings.resolve_one()?;
                let mut cg = Codegen::new();
                cg.emit(&resolved);
                write_output(target.out.as_deref(), &cg.into_string())
            }
            Command::Check(target) => run_check(target),
        }
    }
}

fn run_check(target: &CheckOut) -> Result<()> {
    let resolved = target.input_settings.resolve_one()?;
    let paths = expand_inputs(&target.data)?;

    // the resolved schema is immutable, so every file can share it
    let outcomes: Vec<(String, Result<Value>)> = paths
        .par_iter()
        .map(|path| {
            let origin = path.to_string_lossy().to_string();
            let outcome = read_json(path).and_then(|v| resolved.construct(&v).map_err(anyhow::Error::from));
            (origin, outcome)
        })
        .collect();

    let mut failed = 0usize;
    for (origin, outcome) in &outcomes {
        match outcome {
            Ok(value) => {
                println!("{} {}", "✅".green(), origin);
                if target.show {
                    println!("{}", serde_json::to_string_pretty(value)?);
                }
            }
            Err(error) => {
                failed += 1;
                println!("{} {}: {}", "❌".red(), origin.bold(), error);
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} inputs failed validation", outcomes.len());
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn read_json(path: &Path) -> Result<Value> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read source file {}", path.display()))?;
    serde_json::from_str::<Value>(&source)
        .with_context(|| format!("failed to parse JSON source file {}", path.display()))
}

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            println!("{text}");
            Ok(())
        }
    }
}

/// Literal paths pass through; anything with glob syntax must match at least one file.
fn expand_inputs(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for pattern in patterns {
        if !pattern.contains(['*', '?', '[', '{']) {
            out.push(PathBuf::from(pattern));
            continue;
        }
        let matches = glob::glob(pattern)
            .with_context(|| format!("bad glob pattern {pattern}"))?
            .collect::<Result<Vec<_>, _>>()?;
        if matches.is_empty() {
            bail!("glob pattern matched no files: {pattern}");
        }
        out.extend(matches);
    }
    Ok(out)
}
