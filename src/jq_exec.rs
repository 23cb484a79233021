//! jq selection over wrapper documents, e.g. pulling every `inputSchema` out
//! of a tool listing with `.tools[] | .inputSchema`.
use anyhow::{anyhow, Context, Result};
use jaq_core::{load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Run `filter_src` on `input` and return every output as JSON.
pub fn select(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader.load(&arena, program).map_err(|errs| {
        describe(
            "cannot parse jq filter",
            errs.into_iter().map(|(file, err)| (file.code, format!("{err:?}"))),
        )
    })?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| {
            describe(
                "jq filter uses an undefined name",
                errs.into_iter().flat_map(|(file, names)| {
                    let code = file.code;
                    names.into_iter().map(move |(name, undef)| (code, format!("`{name}` ({undef:?})")))
                }),
            )
        })?;

    let inputs = RcIter::new(core::iter::empty());
    filter
        .run((Ctx::new([], &inputs), Val::from(input.clone())))
        .map(|item| {
            let val = item.map_err(|e| anyhow!("jq filter `{filter_src}` failed: {e:?}"))?;
            // Val's Display is JSON text
            let text = val.to_string();
            serde_json::from_str::<Value>(&text).with_context(|| format!("jq produced non-JSON output `{text}`"))
        })
        .collect()
}

/// One line per problem: `<what> in `<filter>`: <detail>`.
fn describe<'a>(what: &str, problems: impl IntoIterator<Item = (&'a str, String)>) -> anyhow::Error {
    let lines: Vec<String> = problems
        .into_iter()
        .map(|(code, detail)| format!("{what} in `{code}`: {detail}"))
        .collect();
    anyhow!(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn selects_tool_input_schemas() {
        let listing = json!({
            "tools": [
                { "name": "a", "inputSchema": { "type": "object", "title": "A" } },
                { "name": "b", "inputSchema": { "type": "object", "title": "B" } }
            ]
        });
        let out = select(".tools[] | .inputSchema", &listing).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[1]["title"], "B");
    }

    #[test]
    fn errors_name_the_filter() {
        let err = select(".tools[", &json!({})).unwrap_err();
        assert!(err.to_string().starts_with("cannot parse jq filter in `.tools[`"));

        let err = select("no_such_fn", &json!({})).unwrap_err();
        assert!(err.to_string().contains("undefined name"));
    }
}
