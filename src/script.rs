//! Bounded post-response script execution.
//!
//! A post-script is a line-oriented list of directives whose only
//! capability is writing response-derived values into tmp environments:
//!
//! ```text
//! setenv <env> <var> = <source>
//! setcurenv <var> = <source>
//! ```
//!
//! `<source>` is `status`, `url`, `headers.<Name>`, a JSONPath into the
//! response body (`$`, `$.token`, `$.items[0].id`), or a `"quoted"`
//! literal. Each directive edits the tmp environment list and rewrites
//! the tmp file immediately, so a failing directive leaves the earlier
//! ones durably applied.

use crate::collection::{Collection, LoadError};
use crate::models::response::HttpResponse;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Matches `setenv <env> <var> = <source>`.
static SETENV_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^setenv\s+(\S+)\s+([a-zA-Z_][a-zA-Z0-9_]*)\s*=\s*(.+?)\s*$")
        .expect("Failed to compile setenv regex")
});

/// Matches `setcurenv <var> = <source>`.
static SETCURENV_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^setcurenv\s+([a-zA-Z_][a-zA-Z0-9_]*)\s*=\s*(.+?)\s*$")
        .expect("Failed to compile setcurenv regex")
});

/// Errors raised while running a post-script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// A line is not a valid directive
    Syntax { line: usize, message: String },

    /// A source failed to extract from the response
    Extraction { line: usize, message: String },

    /// The tmp file could not be rewritten
    Persist(String),
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptError::Syntax { line, message } => {
                write!(f, "Post-script syntax error on line {}: {}", line, message)
            }
            ScriptError::Extraction { line, message } => {
                write!(f, "Post-script extraction failed on line {}: {}", line, message)
            }
            ScriptError::Persist(msg) => write!(f, "Failed to persist tmp environments: {}", msg),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<LoadError> for ScriptError {
    fn from(err: LoadError) -> Self {
        ScriptError::Persist(err.to_string())
    }
}

/// Where a directive's value comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Response status code as decimal text
    Status,

    /// Final response URL
    Url,

    /// A response header, matched case-insensitively
    Header(String),

    /// A JSONPath into the response body
    JsonPath(String),

    /// A quoted literal
    Literal(String),
}

impl ValueSource {
    /// Classifies a directive source expression.
    pub fn parse(source: &str) -> Result<Self, String> {
        let trimmed = source.trim();

        if let Some(stripped) = trimmed.strip_prefix('"') {
            return match stripped.strip_suffix('"') {
                Some(inner) => Ok(ValueSource::Literal(inner.to_string())),
                None => Err(format!("Unterminated string literal: {}", trimmed)),
            };
        }

        if trimmed == "status" {
            return Ok(ValueSource::Status);
        }
        if trimmed == "url" {
            return Ok(ValueSource::Url);
        }
        if let Some(header) = trimmed.strip_prefix("headers.") {
            if header.is_empty() {
                return Err("Missing header name after 'headers.'".to_string());
            }
            return Ok(ValueSource::Header(header.to_string()));
        }
        if trimmed == "$" || trimmed.starts_with("$.") || trimmed.starts_with("$[") {
            return Ok(ValueSource::JsonPath(trimmed.to_string()));
        }

        Err(format!("Unknown value source: {}", trimmed))
    }

    /// Extracts the source's value from a response.
    pub fn extract(&self, response: &HttpResponse) -> Result<String, String> {
        match self {
            ValueSource::Status => Ok(response.status_code.to_string()),
            ValueSource::Url => Ok(response.url.clone()),
            ValueSource::Literal(text) => Ok(text.clone()),
            ValueSource::Header(name) => response
                .header(name)
                .map(|v| v.to_string())
                .ok_or_else(|| format!("Header '{}' not found in response", name)),
            ValueSource::JsonPath(path) => {
                let body = response
                    .body_json()
                    .ok_or_else(|| "Response body is not valid JSON".to_string())?;
                let value = evaluate_json_path(&body, path)?;
                Ok(json_value_to_string(&value))
            }
        }
    }
}

/// One parsed directive: which environment, which variable, which source.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Directive {
    /// Target environment; `None` means the currently selected one
    env: Option<String>,
    var: String,
    source: ValueSource,
}

fn parse_directive(line: &str, line_number: usize) -> Result<Directive, ScriptError> {
    if let Some(cap) = SETENV_REGEX.captures(line) {
        let source = ValueSource::parse(&cap[3])
            .map_err(|message| ScriptError::Syntax { line: line_number, message })?;
        return Ok(Directive {
            env: Some(cap[1].to_string()),
            var: cap[2].to_string(),
            source,
        });
    }

    if let Some(cap) = SETCURENV_REGEX.captures(line) {
        let source = ValueSource::parse(&cap[2])
            .map_err(|message| ScriptError::Syntax { line: line_number, message })?;
        return Ok(Directive {
            env: None,
            var: cap[1].to_string(),
            source,
        });
    }

    Err(ScriptError::Syntax {
        line: line_number,
        message: format!("Unrecognized directive: {}", line.trim()),
    })
}

/// Runs a post-script against the response.
///
/// `selected_env` is the `-e` argument; `setcurenv` directives target it
/// (or the default sentinel when none was given). Every edit goes into
/// the tmp list and the tmp file is rewritten after each one.
pub fn run_post_script(
    script: &str,
    collection: &mut Collection,
    selected_env: Option<&str>,
    response: &HttpResponse,
) -> Result<(), ScriptError> {
    for (index, line) in script.lines().enumerate() {
        let line_number = index + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let directive = parse_directive(trimmed, line_number)?;
        let value = directive
            .source
            .extract(response)
            .map_err(|message| ScriptError::Extraction { line: line_number, message })?;

        let target = directive.env.as_deref().or(selected_env);
        collection.edit_environment(target, directive.var, Value::String(value), true);
        collection.persist_tmp()?;
    }
    Ok(())
}

/// Walks a JSONPath of object fields and `[index]` steps.
fn evaluate_json_path(json: &Value, path: &str) -> Result<Value, String> {
    let path = path.trim();
    if path == "$" {
        return Ok(json.clone());
    }

    let rest = path.strip_prefix('$').unwrap_or(path);
    let rest = rest.strip_prefix('.').unwrap_or(rest);

    let mut current = json;
    for segment in parse_path_segments(rest)? {
        current = match segment {
            PathSegment::Field(name) => current
                .get(&name)
                .ok_or_else(|| format!("Field '{}' not found in response body", name))?,
            PathSegment::Index(index) => current
                .get(index)
                .ok_or_else(|| format!("Array index {} out of bounds", index))?,
        };
    }
    Ok(current.clone())
}

#[derive(Debug, PartialEq, Eq)]
enum PathSegment {
    Field(String),
    Index(usize),
}

fn parse_path_segments(path: &str) -> Result<Vec<PathSegment>, String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Field(std::mem::take(&mut current)));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(PathSegment::Field(std::mem::take(&mut current)));
                }
                let mut index = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(c) => index.push(c),
                        None => return Err(format!("Unclosed '[' in path: {}", path)),
                    }
                }
                let parsed = index
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid array index: [{}]", index))?;
                segments.push(PathSegment::Index(parsed));
            }
            _ => current.push(ch),
        }
    }

    if !current.is_empty() {
        segments.push(PathSegment::Field(current));
    }
    Ok(segments)
}

/// Stringifies an extracted JSON value for storage in an environment.
fn json_value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
