//! Placeholder substitution engine for PostKid
//!
//! Requests are resolved by serializing them to a JSON document and
//! replacing `{{name}}` tokens in that text. Substitution is literal:
//! each environment pass replaces exactly the tokens whose names it
//! defines, and anything left over survives for the next pass. A final
//! pass resolves dynamic `{{$...}}` system variables.

use crate::variables::system::{resolve_system_variable, VarError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;

/// Cached pattern matching `{{token}}` occurrences, compiled once.
static VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^}]+)\}\}").expect("Failed to compile variable regex"));

/// Converts a variable value to the text that replaces its placeholder.
///
/// Null and empty strings yield `None`: such variables are treated as
/// unset so they never consume a placeholder that a later environment
/// layer could still fill. Strings substitute as-is (the surrounding
/// document supplies any quoting), numbers and booleans use their
/// canonical JSON form, and compound values substitute as compact JSON.
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Replaces every `{{name}}` token defined by `variables` in `text`.
///
/// Tokens whose names are not in the map (or whose values are unset per
/// [`value_to_text`]) are left untouched. Token matching is literal;
/// `{{ name }}` with interior whitespace is a different token than
/// `{{name}}`.
pub fn apply_variables(text: &str, variables: &BTreeMap<String, Value>) -> String {
    // Fast path: no variable markers at all
    if !text.contains("{{") {
        return text.to_string();
    }

    let mut resolved = text.to_string();
    for (name, value) in variables {
        let replacement = match value_to_text(value) {
            Some(text) => text,
            None => continue,
        };
        let token = format!("{{{{{}}}}}", name);
        resolved = resolved.replace(&token, &replacement);
    }
    resolved
}

/// Resolves every `{{$name args...}}` system token in `text`.
///
/// Plain `{{name}}` tokens are copied through unchanged; the `$` prefix
/// is reserved for system variables and can never collide with user
/// variables. Each occurrence is resolved independently, so repeated
/// `{{$uuid}}` tokens produce distinct values.
pub fn resolve_system_tokens(text: &str) -> Result<String, VarError> {
    if !text.contains("{{$") {
        return Ok(text.to_string());
    }

    let mut result = String::with_capacity(text.len());
    let mut last_match_end = 0;

    for cap in VARIABLE_REGEX.captures_iter(text) {
        let full_match = cap.get(0).unwrap();
        let inner = cap.get(1).unwrap().as_str().trim();

        result.push_str(&text[last_match_end..full_match.start()]);

        if let Some(spec) = inner.strip_prefix('$') {
            let parts: Vec<&str> = spec.split_whitespace().collect();
            if parts.is_empty() {
                return Err(VarError::InvalidSyntax(
                    "Empty system variable name".to_string(),
                ));
            }
            let value = resolve_system_variable(parts[0], &parts[1..])?;
            result.push_str(&value);
        } else {
            result.push_str(full_match.as_str());
        }

        last_match_end = full_match.end();
    }

    result.push_str(&text[last_match_end..]);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vars(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_value_to_text_forms() {
        assert_eq!(value_to_text(&json!("plain")), Some("plain".to_string()));
        assert_eq!(value_to_text(&json!(8080)), Some("8080".to_string()));
        assert_eq!(value_to_text(&json!(2.5)), Some("2.5".to_string()));
        assert_eq!(value_to_text(&json!(true)), Some("true".to_string()));
        assert_eq!(value_to_text(&json!(false)), Some("false".to_string()));
    }

    #[test]
    fn test_value_to_text_unset() {
        assert_eq!(value_to_text(&Value::Null), None);
        assert_eq!(value_to_text(&json!("")), None);
    }

    #[test]
    fn test_value_to_text_compound() {
        assert_eq!(
            value_to_text(&json!({"a": 1})),
            Some("{\"a\":1}".to_string())
        );
        assert_eq!(value_to_text(&json!([1, 2])), Some("[1,2]".to_string()));
    }

    #[test]
    fn test_apply_replaces_defined_tokens() {
        let variables = vars(&[("host", json!("api.example.com")), ("port", json!(8080))]);
        let resolved = apply_variables("https://{{host}}:{{port}}/users", &variables);
        assert_eq!(resolved, "https://api.example.com:8080/users");
    }

    #[test]
    fn test_apply_replaces_every_occurrence() {
        let variables = vars(&[("id", json!("42"))]);
        let resolved = apply_variables("{{id}}/{{id}}/{{id}}", &variables);
        assert_eq!(resolved, "42/42/42");
    }

    #[test]
    fn test_apply_leaves_unknown_tokens() {
        let variables = vars(&[("known", json!("yes"))]);
        let resolved = apply_variables("{{known}} and {{unknown}}", &variables);
        assert_eq!(resolved, "yes and {{unknown}}");
    }

    #[test]
    fn test_apply_skips_null_and_empty_values() {
        let variables = vars(&[("a", Value::Null), ("b", json!(""))]);
        let resolved = apply_variables("{{a}}-{{b}}", &variables);
        assert_eq!(resolved, "{{a}}-{{b}}");
    }

    #[test]
    fn test_apply_is_literal_about_whitespace() {
        let variables = vars(&[("x", json!("v"))]);
        assert_eq!(apply_variables("{{ x }}", &variables), "{{ x }}");
        assert_eq!(apply_variables("{{x}}", &variables), "v");
    }

    #[test]
    fn test_apply_fast_path_without_markers() {
        let variables = vars(&[("x", json!("v"))]);
        assert_eq!(apply_variables("no tokens here", &variables), "no tokens here");
    }

    #[test]
    fn test_system_tokens_uuid() {
        let resolved = resolve_system_tokens("id={{$uuid}}").unwrap();
        assert!(!resolved.contains("{{"));
        assert_eq!(resolved.len(), "id=".len() + 36);
    }

    #[test]
    fn test_system_tokens_each_occurrence_independent() {
        let resolved = resolve_system_tokens("{{$uuid}} {{$uuid}}").unwrap();
        let parts: Vec<&str> = resolved.split(' ').collect();
        assert_eq!(parts.len(), 2);
        assert_ne!(parts[0], parts[1]);
    }

    #[test]
    fn test_system_tokens_leave_plain_tokens() {
        let resolved = resolve_system_tokens("{{plain}} {{$timestamp}}").unwrap();
        assert!(resolved.starts_with("{{plain}} "));
        let ts: i64 = resolved["{{plain}} ".len()..].parse().unwrap();
        assert!(ts > 1_577_836_800);
    }

    #[test]
    fn test_system_tokens_fast_path() {
        let text = "nothing dynamic {{user}}";
        assert_eq!(resolve_system_tokens(text).unwrap(), text);
    }

    #[test]
    fn test_system_tokens_random_int_range() {
        let resolved = resolve_system_tokens("{{$randomInt 5 6}}").unwrap();
        assert_eq!(resolved, "5");
    }

    #[test]
    fn test_system_tokens_unknown_name_fails() {
        let result = resolve_system_tokens("{{$nope}}");
        assert!(matches!(result, Err(VarError::UndefinedVariable(_))));
    }

    #[test]
    fn test_system_tokens_empty_name_fails() {
        let result = resolve_system_tokens("{{$}}");
        assert!(matches!(result, Err(VarError::InvalidSyntax(_))));
    }
}
