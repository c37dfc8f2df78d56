//! Placeholder and token resolution inside configuration strings.
//!
//! Substitutions run in this order:
//! 1. `{PL}` - the current value's JSON text (skipped for the empty string)
//! 2. `{INDEX}` - zero-based array index
//! 3. `{HUMAN_INDEX}` - one-based array index
//! 4. `{{{...}}}` tokens, left to right:
//!    - `FromEnv=NAME` - environment variable, empty when unset
//!    - `FromExp=EXPR` - `EXPR` is rendered first, then evaluated
//!    - `RefName=name [raw]` - a published reference value
//!    - anything else - path query against the current value
//!
//! Malformed input never fails: an unterminated `{{{` leaves the rest of
//! the string as it is.

mod expression;

pub use expression::evaluate;

use tracing::warn;

use crate::backends::json_query;
use crate::references::RefStore;
use crate::value::{json_text, Value};

const OPEN: &str = "{{{";
const CLOSE: &str = "}}}";

/// Everything a template can refer to.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope<'a> {
    pub value: Option<&'a Value>,
    pub index: Option<u32>,
    pub references: Option<&'a RefStore>,
}

impl<'a> Scope<'a> {
    pub fn new(value: Option<&'a Value>, index: Option<u32>) -> Self {
        Self {
            value,
            index,
            references: None,
        }
    }

    pub fn with_references(mut self, references: &'a RefStore) -> Self {
        self.references = Some(references);
        self
    }
}

/// Resolve every placeholder and token in `input`.
pub fn render(input: &str, scope: &Scope<'_>) -> String {
    let mut text = input.to_string();

    if let Some(value) = scope.value {
        let json = value.to_json();
        if json != "\"\"" {
            text = text.replace("{PL}", &json);
        }
    }
    if let Some(index) = scope.index {
        text = text
            .replace("{INDEX}", &index.to_string())
            .replace("{HUMAN_INDEX}", &(u64::from(index) + 1).to_string());
    }

    if text.contains(OPEN) {
        text = render_tokens(&text, scope);
    }
    text
}

fn render_tokens(text: &str, scope: &Scope<'_>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];
        match token_end(after_open) {
            Some(end) => {
                out.push_str(&resolve_token(&after_open[..end], scope));
                rest = &after_open[end + CLOSE.len()..];
            }
            None => {
                out.push_str(&rest[start..]);
                return out;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Offset of the `}}}` balancing an already consumed `{{{`.
fn token_end(text: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = 0;
    while i < text.len() {
        let tail = &text[i..];
        if tail.starts_with(OPEN) {
            depth += 1;
            i += OPEN.len();
        } else if tail.starts_with(CLOSE) {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
            i += CLOSE.len();
        } else {
            i += tail.chars().next().map_or(1, char::len_utf8);
        }
    }
    None
}

fn resolve_token(body: &str, scope: &Scope<'_>) -> String {
    if let Some(name) = body.strip_prefix("FromEnv=") {
        return std::env::var(name.trim()).unwrap_or_default();
    }

    if let Some(expression) = body.strip_prefix("FromExp=") {
        let expression = render(expression, scope);
        return match evaluate(&expression, scope.value, scope.index) {
            Ok(result) => json_text(&result),
            Err(e) => {
                warn!(expression = %expression, error = %e, "Template expression failed");
                String::new()
            }
        };
    }

    if let Some(reference) = body.strip_prefix("RefName=") {
        let mut parts = reference.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let raw = parts.next() == Some("raw");
        let Some(value) = scope.references.and_then(|store| store.get(name)) else {
            warn!(reference = %name, "Reference not published");
            return String::new();
        };
        return if raw {
            value.raw().to_string()
        } else {
            value.text()
        };
    }

    scope
        .value
        .and_then(|value| json_query(&value.raw(), body.trim()))
        .map(|found| json_text(&found))
        .unwrap_or_default()
}
