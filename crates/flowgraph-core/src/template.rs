// Placeholder resolution shared by every action handler.
//
// Three modes share one resolver (`resolve_placeholder`): String mode for
// prompts and URLs, JSON-template mode for structured request/row bodies,
// and SQL-parameterisation mode for `database_query`. The single
// whole-placeholder exception (a template that, trimmed, is nothing but
// one placeholder) is what lets a `prompt_template` feed a list or object
// straight through to a handler that expects structured input.

use std::sync::OnceLock;

use flowgraph_contracts::ExecutionEnvelope;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::{CoreError, Result};

const PLACEHOLDER_ALTS: &str =
    r"query|context\.[A-Za-z0-9_.]+|input\.[A-Za-z0-9_.]+|state\.[A-Za-z0-9_.]+|env\.[A-Za-z0-9_.]+";

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"\{{({PLACEHOLDER_ALTS})\}}")).unwrap())
}

fn whole_placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r"^\{{({PLACEHOLDER_ALTS})\}}$")).unwrap())
}

fn sql_placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(&format!(r#"['"]?\{{({PLACEHOLDER_ALTS})\}}['"]?"#)).unwrap())
}

/// Resolve a single `{prefix.key}` or `{query}` name against the envelope.
/// Returns `None` if the name has no value (undefined key, unset env var).
pub fn resolve_placeholder(name: &str, envelope: &ExecutionEnvelope) -> Option<Value> {
    if name == "query" {
        return Some(Value::String(envelope.query.clone()));
    }
    if let Some(key) = name.strip_prefix("context.") {
        return dotted_get(&envelope.initial_context, key);
    }
    if let Some(key) = name.strip_prefix("input.") {
        let mut parts = key.split('.');
        let first = parts.next()?;
        let root = envelope.collected_inputs.get(first)?;
        dotted_get_parts(root, parts)
    } else if let Some(key) = name.strip_prefix("state.") {
        return envelope.get_state_field(key);
    } else if let Some(key) = name.strip_prefix("env.") {
        std::env::var(key).ok().map(Value::String)
    } else {
        None
    }
}

fn dotted_get(value: &Value, path: &str) -> Option<Value> {
    dotted_get_parts(value, path.split('.'))
}

fn dotted_get_parts<'a>(value: &Value, parts: impl Iterator<Item = &'a str>) -> Option<Value> {
    let mut current = value.clone();
    for part in parts {
        current = current.get(part)?.clone();
    }
    Some(current)
}

fn to_display_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Resolve `s` in `json_mode` semantics for its missing-value fallback
/// (empty string for String mode, `null` for JSON-template mode), honoring
/// the whole-placeholder type-preservation exception either way.
fn resolve_leaf(s: &str, envelope: &ExecutionEnvelope, json_mode: bool) -> Value {
    let trimmed = s.trim();
    if whole_placeholder_re().is_match(trimmed) {
        let name = &trimmed[1..trimmed.len() - 1];
        return match resolve_placeholder(name, envelope) {
            Some(v) => v,
            None if json_mode => Value::Null,
            None => Value::String(String::new()),
        };
    }
    let filled = placeholder_re().replace_all(s, |caps: &Captures| match resolve_placeholder(&caps[1], envelope) {
        Some(v) => to_display_string(&v),
        None => String::new(),
    });
    Value::String(filled.into_owned())
}

/// String mode: fill every placeholder in a text template. If the whole
/// (trimmed) template is a single placeholder, the resolved value keeps
/// its original JSON type instead of being stringified.
pub fn resolve_string_mode(template: &str, envelope: &ExecutionEnvelope) -> Value {
    resolve_leaf(template, envelope, false)
}

/// Convenience wrapper for call sites that only ever want text (prompts, URLs).
pub fn resolve_string(template: &str, envelope: &ExecutionEnvelope) -> String {
    match resolve_string_mode(template, envelope) {
        Value::String(s) => s,
        other => to_display_string(&other),
    }
}

/// JSON-template mode: recursively resolve placeholders inside every string
/// leaf of an already-parsed template value.
pub fn resolve_json_template(template: &Value, envelope: &ExecutionEnvelope) -> Value {
    match template {
        Value::String(s) => resolve_leaf(s, envelope, true),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve_json_template(v, envelope)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_json_template(v, envelope)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// JSON-template mode starting from a raw (unparsed) template string, for
/// templates stored as plain text rather than already-structured JSON.
/// Falls back to the whole-placeholder rule when the raw text isn't valid JSON.
pub fn resolve_json_template_str(raw: &str, envelope: &ExecutionEnvelope) -> Result<Value> {
    match serde_json::from_str::<Value>(raw) {
        Ok(parsed) => Ok(resolve_json_template(&parsed, envelope)),
        Err(_) => {
            let trimmed = raw.trim();
            if whole_placeholder_re().is_match(trimmed) {
                Ok(resolve_leaf(trimmed, envelope, true))
            } else {
                Err(CoreError::template(format!(
                    "template is not valid JSON and not a single placeholder: {raw}"
                )))
            }
        }
    }
}

/// SQL-parameterisation mode: replace every placeholder (optionally quoted)
/// with `?`, returning the sanitised SQL plus the resolved values in order.
pub fn resolve_sql_mode(template: &str, envelope: &ExecutionEnvelope) -> (String, Vec<Value>) {
    let mut params = Vec::new();
    let sql = sql_placeholder_re().replace_all(template, |caps: &Captures| {
        let value = resolve_placeholder(&caps[1], envelope).unwrap_or(Value::Null);
        params.push(value);
        "?"
    });
    (sql.into_owned(), params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn envelope_with(inputs: HashMap<String, Value>, context: Value) -> ExecutionEnvelope {
        ExecutionEnvelope::new("exec-1".into(), 1, "hello world".into(), context, "s1".into()).tap(|e| e.collected_inputs = inputs)
    }

    trait Tap: Sized {
        fn tap(mut self, f: impl FnOnce(&mut Self)) -> Self {
            f(&mut self);
            self
        }
    }
    impl Tap for ExecutionEnvelope {}

    #[test]
    fn whole_placeholder_preserves_type() {
        let mut inputs = HashMap::new();
        inputs.insert("docs".to_string(), json!(["a", "b"]));
        let envelope = envelope_with(inputs, json!({}));
        let resolved = resolve_string_mode("{input.docs}", &envelope);
        assert_eq!(resolved, json!(["a", "b"]));
    }

    #[test]
    fn mixed_text_always_returns_string() {
        let mut inputs = HashMap::new();
        inputs.insert("name".to_string(), json!("Ada"));
        let envelope = envelope_with(inputs, json!({}));
        let resolved = resolve_string_mode("Hello {input.name}!", &envelope);
        assert_eq!(resolved, json!("Hello Ada!"));
    }

    #[test]
    fn missing_key_is_empty_string_in_string_mode() {
        let envelope = envelope_with(HashMap::new(), json!({}));
        let resolved = resolve_string_mode("{input.missing}", &envelope);
        assert_eq!(resolved, json!(""));
    }

    #[test]
    fn missing_key_is_null_in_json_mode() {
        let envelope = envelope_with(HashMap::new(), json!({}));
        let template = json!({"value": "{input.missing}"});
        let resolved = resolve_json_template(&template, &envelope);
        assert_eq!(resolved, json!({"value": Value::Null}));
    }

    #[test]
    fn sql_mode_extracts_positional_params() {
        let mut inputs = HashMap::new();
        inputs.insert("id".to_string(), json!(42));
        let envelope = envelope_with(inputs, json!({}));
        let (sql, params) = resolve_sql_mode("SELECT * FROM t WHERE id = '{input.id}'", &envelope);
        assert_eq!(sql, "SELECT * FROM t WHERE id = ?");
        assert_eq!(params, vec![json!(42)]);
    }

    #[test]
    fn query_placeholder_resolves() {
        let envelope = envelope_with(HashMap::new(), json!({}));
        assert_eq!(resolve_string("{query}", &envelope), "hello world");
    }
}
