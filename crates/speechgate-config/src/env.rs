use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Expand `{{ env.VAR }}` placeholders in raw config text
///
/// `{{ env.VAR | default("fallback") }}` substitutes the fallback when the
/// variable is unset. Comment lines are left untouched so commented-out
/// secrets never need to exist in the environment.
pub fn expand_env(input: &str) -> Result<String, String> {
    let expanded = input
        .lines()
        .map(expand_line)
        .collect::<Result<Vec<_>, _>>()?
        .join("\n");

    if input.ends_with('\n') {
        Ok(expanded + "\n")
    } else {
        Ok(expanded)
    }
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // 1: scoped key, 2: optional default
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([a-zA-Z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#).expect("must be valid regex")
    })
}

fn expand_line(line: &str) -> Result<String, String> {
    if line.trim_start().starts_with('#') {
        return Ok(line.to_string());
    }

    let mut output = String::with_capacity(line.len());
    let mut cursor = 0;

    for captures in placeholder().captures_iter(line) {
        let Some(whole) = captures.get(0) else {
            continue;
        };

        output.push_str(&line[cursor..whole.start()]);
        output.push_str(&resolve(&captures)?);
        cursor = whole.end();
    }

    output.push_str(&line[cursor..]);
    Ok(output)
}

fn resolve(captures: &Captures<'_>) -> Result<String, String> {
    let key = captures.get(1).map_or("", |m| m.as_str());
    let fallback = captures.get(2).map(|m| m.as_str());

    let Some(var_name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
        return Err(format!("only variables scoped with 'env.' are supported: `{key}`"));
    };

    match (std::env::var(var_name), fallback) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(fallback)) => Ok(fallback.to_string()),
        (Err(_), None) => Err(format!("environment variable not found: `{var_name}`")),
    }
}
