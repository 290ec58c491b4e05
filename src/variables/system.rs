//! System variable resolution for PostKid
//!
//! Implements the dynamic `{{$uuid}}`, `{{$timestamp}}`, `{{$datetime}}`,
//! `{{$randomInt}}` and `{{$env}}` tokens that are resolved fresh on
//! every invocation, after all environment layers have been applied.

use chrono::{SecondsFormat, Utc};
use rand::Rng;
use std::env;
use uuid::Uuid;

/// Errors that can occur while resolving a system variable
#[derive(Debug, Clone, PartialEq)]
pub enum VarError {
    /// Variable name is not recognized
    UndefinedVariable(String),
    /// Variable arguments are malformed
    InvalidSyntax(String),
    /// Process environment variable not found
    EnvVarNotFound(String),
}

impl std::fmt::Display for VarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VarError::UndefinedVariable(name) => write!(f, "Undefined variable: {}", name),
            VarError::InvalidSyntax(msg) => write!(f, "Invalid syntax: {}", msg),
            VarError::EnvVarNotFound(name) => {
                write!(f, "Environment variable not found: {}", name)
            }
        }
    }
}

impl std::error::Error for VarError {}

/// Resolves a system variable by name and arguments
///
/// # Arguments
/// * `name` - The variable name without its `$` prefix (e.g. "uuid")
/// * `args` - Whitespace-separated arguments from the token
///
/// # Examples
/// ```
/// use postkid::variables::system::resolve_system_variable;
///
/// // {{$uuid}}
/// resolve_system_variable("uuid", &[]).unwrap();
///
/// // {{$timestamp}}
/// resolve_system_variable("timestamp", &[]).unwrap();
///
/// // {{$datetime iso8601}}
/// resolve_system_variable("datetime", &["iso8601"]).unwrap();
///
/// // {{$randomInt 1 100}}
/// resolve_system_variable("randomInt", &["1", "100"]).unwrap();
/// ```
pub fn resolve_system_variable(name: &str, args: &[&str]) -> Result<String, VarError> {
    match name {
        "uuid" => resolve_uuid(),
        "timestamp" => resolve_timestamp(),
        "datetime" => resolve_datetime(args),
        "randomInt" => resolve_random_int(args),
        "env" => resolve_process_env(args),
        _ => Err(VarError::UndefinedVariable(format!("${}", name))),
    }
}

/// Generates a new UUID v4
fn resolve_uuid() -> Result<String, VarError> {
    Ok(Uuid::new_v4().to_string())
}

/// Current Unix timestamp in seconds
fn resolve_timestamp() -> Result<String, VarError> {
    Ok(Utc::now().timestamp().to_string())
}

/// Current UTC time, formatted
///
/// Formats:
/// - {{$datetime iso8601}} - ISO 8601 / RFC 3339 with millisecond precision
/// - {{$datetime rfc1123}} - RFC 1123 style date line
fn resolve_datetime(args: &[&str]) -> Result<String, VarError> {
    if args.is_empty() {
        return Err(VarError::InvalidSyntax(
            "datetime requires format argument (rfc1123 or iso8601)".to_string(),
        ));
    }

    let now = Utc::now();
    match args[0] {
        "iso8601" => Ok(now.to_rfc3339_opts(SecondsFormat::Millis, true)),
        "rfc1123" => Ok(now.to_rfc2822()),
        other => Err(VarError::InvalidSyntax(format!(
            "Unknown datetime format: {}. Use 'rfc1123' or 'iso8601'",
            other
        ))),
    }
}

/// Random integer in `[min, max)`
///
/// Format: {{$randomInt min max}}
fn resolve_random_int(args: &[&str]) -> Result<String, VarError> {
    if args.len() < 2 {
        return Err(VarError::InvalidSyntax(
            "randomInt requires min and max arguments".to_string(),
        ));
    }

    let min: i64 = args[0]
        .parse()
        .map_err(|_| VarError::InvalidSyntax(format!("Invalid min value: {}", args[0])))?;
    let max: i64 = args[1]
        .parse()
        .map_err(|_| VarError::InvalidSyntax(format!("Invalid max value: {}", args[1])))?;

    if min >= max {
        return Err(VarError::InvalidSyntax(format!(
            "min ({}) must be less than max ({})",
            min, max
        )));
    }

    let mut rng = rand::thread_rng();
    Ok(rng.gen_range(min..max).to_string())
}

/// Reads a process environment variable
///
/// Format: {{$env VAR_NAME}}
fn resolve_process_env(args: &[&str]) -> Result<String, VarError> {
    if args.is_empty() {
        return Err(VarError::InvalidSyntax(
            "env requires variable name".to_string(),
        ));
    }

    env::var(args[0]).map_err(|_| VarError::EnvVarNotFound(args[0].to_string()))
}
