//! Jinja filters available to artifact templates.
//!
//! ```jinja2
//! {{ instance.network | regex_replace('^.*/', '') }}
//! {{ instance.zone | regex_search('^[a-z]+-[a-z]+[0-9]+') }}
//! {{ instance.settings | to_json }}
//! ```

use minijinja::{Environment, Error, ErrorKind, Value};
use once_cell::sync::Lazy;
use regex::Regex;

static PYTHON_BACKREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\\(\d)").expect("Invalid backreference regex"));

/// Register the artifact filters with an environment.
pub fn register_filters(env: &mut Environment<'_>) {
    env.add_filter("regex_replace", regex_replace);
    env.add_filter("regex_search", regex_search);
    env.add_filter("to_json", to_json);
}

fn compile(pattern: &str, ignorecase: bool) -> Result<Regex, Error> {
    let pattern = if ignorecase {
        format!("(?i){}", pattern)
    } else {
        pattern.to_string()
    };
    Regex::new(&pattern).map_err(|e| {
        Error::new(ErrorKind::InvalidOperation, format!("invalid regex '{}'", pattern)).with_source(e)
    })
}

/// Replace every match of `pattern`.
///
/// Backreferences may be written `\1` or `$1`. An invalid pattern is a
/// render error rather than a silent no-op.
fn regex_replace(
    input: String,
    pattern: String,
    replacement: String,
    ignorecase: Option<bool>,
) -> Result<String, Error> {
    let re = compile(&pattern, ignorecase.unwrap_or(false))?;
    let replacement = PYTHON_BACKREF.replace_all(&replacement, "$${$1}");
    Ok(re.replace_all(&input, replacement.as_ref()).into_owned())
}

/// First match of `pattern` (or its first group), else an empty string.
fn regex_search(input: String, pattern: String, ignorecase: Option<bool>) -> Result<String, Error> {
    let re = compile(&pattern, ignorecase.unwrap_or(false))?;
    let found = re.captures(&input).and_then(|caps| {
        caps.get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
    });
    Ok(found.unwrap_or_default())
}

/// Serialize a value as compact JSON.
fn to_json(value: Value) -> Result<String, Error> {
    serde_json::to_string(&value)
        .map_err(|e| Error::new(ErrorKind::InvalidOperation, "value is not JSON-serializable").with_source(e))
}
