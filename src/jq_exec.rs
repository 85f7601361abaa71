use anyhow::{anyhow, Result};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, RcIter};
use jaq_json::Val;
use serde_json::Value;

/// Runs a jq filter over one document; a filter may yield any number of outputs.
pub fn run_jaq(filter_src: &str, input: &Value) -> Result<Vec<Value>> {
    let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
    let arena = load::Arena::default();
    let program = load::File { code: filter_src, path: () };

    let modules = loader
        .load(&arena, program)
        .map_err(|errs| filter_errors("parse error", errs, |err| [format!("{err:?}")]))?;

    let filter = Compiler::default()
        .with_funs(jaq_std::funs().chain(jaq_json::funs()))
        .compile(modules)
        .map_err(|errs| {
            filter_errors("compile error", errs, |undefined: Vec<(&str, Undefined)>| {
                undefined.into_iter().map(|(name, what)| format!("undefined `{name}` ({what:?})"))
            })
        })?;

    let inputs = RcIter::new(core::iter::empty());
    let outputs = filter.run((Ctx::new([], &inputs), Val::from(input.clone())));

    let mut out = Vec::new();
    for item in outputs {
        let v = item.map_err(|e| anyhow!("jq: {e:?}"))?;
        // Val displays as JSON text
        out.push(serde_json::from_str(&v.to_string())?);
    }
    Ok(out)
}

/// One line per failure, each naming the filter it came from.
fn filter_errors<E, I>(kind: &str, errs: Vec<(load::File<&str, ()>, E)>, describe: impl Fn(E) -> I) -> anyhow::Error
where
    I: IntoIterator<Item = String>,
{
    let lines: Vec<String> = errs
        .into_iter()
        .flat_map(|(file, err)| {
            describe(err).into_iter().map(move |msg| format!("jq {kind}: {msg} in `{}`", file.code))
        })
        .collect();
    anyhow!(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_can_fan_out() {
        let doc = json!({"steps": [{"id": "a"}, {"id": "b"}]});
        let out = run_jaq(".steps[]", &doc).unwrap();
        assert_eq!(out, [json!({"id": "a"}), json!({"id": "b"})]);
    }

    #[test]
    fn undefined_function_is_an_error() {
        let err = run_jaq("no_such_fn", &json!(null)).unwrap_err().to_string();
        assert!(err.starts_with("jq compile error: undefined `no_such_fn`"), "{err}");
    }

    #[test]
    fn parse_errors_name_the_filter() {
        let err = run_jaq(".steps[", &json!(null)).unwrap_err().to_string();
        assert!(err.starts_with("jq parse error: "), "{err}");
        assert!(err.ends_with("in `.steps[`"), "{err}");
    }
}
