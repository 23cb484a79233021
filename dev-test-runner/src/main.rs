//! Resolve every fixture under `tests/fixtures` and print a one-line summary
//! per file. Files named `bad_*` must fail to resolve. Documents carrying a
//! `tools` array are treated as tool listings and each `inputSchema` is
//! resolved on its own.
//!
//! ```text
//! cargo run -p dev-test-runner -- [NAME_REGEX] [FIXTURE_DIR]
//! ```
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use regex::Regex;
use schema_records::{ResolveError, ResolveOptions, ResolvedSchema, SchemaResolver};
use serde::Serialize;
use serde_json::Value;

#[derive(Serialize)]
struct Summary {
    fixture: String,
    root: String,
    records: Vec<String>,
    aliases: Vec<String>,
}

impl Summary {
    fn new(fixture: String, resolved: &ResolvedSchema) -> Self {
        Self {
            fixture,
            root: resolved.root.name.clone(),
            records: resolved.records.keys().cloned().collect(),
            aliases: resolved.aliases.keys().cloned().collect(),
        }
    }
}

enum Outcome {
    Pass(Vec<Summary>),
    ExpectedFailure(ResolveError),
    Fail(String),
}

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let filter = match args.next().map(|p| Regex::new(&p)) {
        Some(Ok(re)) => Some(re),
        Some(Err(e)) => {
            eprintln!("bad filter: {e}");
            return ExitCode::FAILURE;
        }
        None => None,
    };
    let dir = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(env!("CARGO_MANIFEST_DIR")).join("../tests/fixtures"));

    let mut fixtures = match std::fs::read_dir(&dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.extension().is_some_and(|x| x == "json"))
            .collect::<Vec<_>>(),
        Err(e) => {
            eprintln!("cannot read {}: {e}", dir.display());
            return ExitCode::FAILURE;
        }
    };
    fixtures.sort();

    let resolver = SchemaResolver::new(ResolveOptions::default());
    let mut failures = 0;
    for path in fixtures {
        let stem = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        if filter.as_ref().is_some_and(|re| !re.is_match(&stem)) {
            continue;
        }
        match run_fixture(&resolver, &path, &stem) {
            Outcome::Pass(summaries) => {
                for s in summaries {
                    match serde_json::to_string(&s) {
                        Ok(line) => println!("ok   {line}"),
                        Err(e) => println!("ok   {} ({e})", s.fixture),
                    }
                }
            }
            Outcome::ExpectedFailure(err) => println!("ok   {stem}: rejected ({err})"),
            Outcome::Fail(why) => {
                failures += 1;
                println!("FAIL {stem}: {why}");
            }
        }
    }

    if failures > 0 {
        eprintln!("{failures} fixture(s) failed");
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run_fixture(resolver: &SchemaResolver, path: &Path, stem: &str) -> Outcome {
    let doc = match std::fs::read_to_string(path).map_err(|e| e.to_string()).and_then(|src| {
        serde_json::from_str::<Value>(&src).map_err(|e| e.to_string())
    }) {
        Ok(doc) => doc,
        Err(e) => return Outcome::Fail(e),
    };

    let schemas: Vec<(String, &Value)> = match doc.get("tools").and_then(Value::as_array) {
        Some(tools) => tools
            .iter()
            .enumerate()
            .filter_map(|(i, tool)| {
                let name = tool.get("name").and_then(Value::as_str).map_or_else(|| i.to_string(), str::to_string);
                tool.get("inputSchema").map(|s| (format!("{stem}/{name}"), s))
            })
            .collect(),
        None => vec![(stem.to_string(), &doc)],
    };

    let expect_failure = stem.starts_with("bad_");
    let mut summaries = Vec::new();
    for (label, schema) in schemas {
        let root_name = schema
            .get("title")
            .and_then(Value::as_str)
            .map(schema_records::resolve::pascal)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| resolver.options().root_name.clone());
        match (schema_records::RecordResolver::resolve_schema(resolver, schema, &root_name), expect_failure) {
            (Ok(resolved), false) => summaries.push(Summary::new(label, &resolved)),
            (Ok(_), true) => return Outcome::Fail(format!("{label} resolved but should have been rejected")),
            (Err(err), true) => return Outcome::ExpectedFailure(err),
            (Err(err), false) => return Outcome::Fail(format!("{label}: {err}")),
        }
    }
    Outcome::Pass(summaries)
}
