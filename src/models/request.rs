//! Request data model and the environment override engine.
//!
//! A request is a named HTTP call template loaded from a collection file.
//! Its fields may contain `{{name}}` placeholders anywhere inside string
//! values. Applying an environment serializes the whole request to a JSON
//! document, replaces the placeholders that environment defines, and
//! reparses the document into a fresh request. Unresolved placeholders
//! survive the rebuild, so successive passes with different environments
//! compose: each pass is a partial resolution over whatever is left.

use crate::environment::Environment;
use crate::variables::substitution::{apply_variables, resolve_system_tokens};
use crate::variables::system::VarError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Fallback request timeout in seconds.
pub const DEFAULT_TIMEOUT: u64 = 65536;

/// Errors that can occur while resolving a request's placeholders.
#[derive(Debug, Clone, PartialEq)]
pub enum SubstituteError {
    /// The request could not be serialized into a substitution document
    Serialize(String),

    /// The substituted document is no longer a valid request.
    ///
    /// Happens when a replacement value breaks the document syntax, for
    /// example a raw quote inside a string-valued field.
    Reparse(String),

    /// A `{{$...}}` system variable failed to resolve
    Variable(VarError),
}

impl fmt::Display for SubstituteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubstituteError::Serialize(msg) => {
                write!(f, "Failed to serialize request for substitution: {}", msg)
            }
            SubstituteError::Reparse(msg) => {
                write!(f, "Substituted request is not valid: {}", msg)
            }
            SubstituteError::Variable(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for SubstituteError {}

impl From<VarError> for SubstituteError {
    fn from(err: VarError) -> Self {
        SubstituteError::Variable(err)
    }
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT
}

fn default_true() -> bool {
    true
}

/// A named HTTP call template.
///
/// Unspecified fields take their documented defaults when a collection is
/// parsed, and again every time an override pass rebuilds the request.
/// Unknown keys from the collection file are captured in `extra` so they
/// survive rebuilds; they are never sent on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Request {
    /// Request name, unique within its collection
    pub name: String,

    /// Target URL, may contain placeholders
    pub url: String,

    /// HTTP method, e.g. "GET", "POST"
    #[serde(default = "default_method")]
    pub method: String,

    /// Query parameters
    #[serde(default)]
    pub params: BTreeMap<String, Value>,

    /// Request headers
    #[serde(default)]
    pub headers: BTreeMap<String, Value>,

    /// Request body: a string is sent raw, a mapping is form-encoded,
    /// anything else is sent as its JSON text
    #[serde(default)]
    pub body: Option<Value>,

    /// Cookies, assembled into a single `Cookie` header
    #[serde(default)]
    pub cookies: BTreeMap<String, Value>,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Whether redirects are followed
    #[serde(default = "default_true")]
    pub allow_redirects: bool,

    /// Whether TLS certificates are verified
    #[serde(default)]
    pub verify: bool,

    /// Post-response script, run after the response is displayed
    #[serde(default)]
    pub post_script: Option<String>,

    /// Passthrough fields not understood by the runner
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Request {
    /// Creates a minimal request with default fields, mainly for tests.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: default_method(),
            params: BTreeMap::new(),
            headers: BTreeMap::new(),
            body: None,
            cookies: BTreeMap::new(),
            timeout: default_timeout(),
            allow_redirects: true,
            verify: false,
            post_script: None,
            extra: BTreeMap::new(),
        }
    }

    /// Applies one environment layer to this request.
    ///
    /// No-op when `environment` is `None`. Otherwise the request is
    /// serialized to a JSON document, every `{{name}}` token defined by
    /// the environment (with a non-null, non-empty value) is replaced by
    /// its text form, and the document is reparsed into a fresh request
    /// that replaces `self`. Placeholders the environment does not define
    /// are left in place for later layers.
    pub fn override_variables(
        &mut self,
        environment: Option<&Environment>,
    ) -> Result<(), SubstituteError> {
        let environment = match environment {
            Some(env) => env,
            None => return Ok(()),
        };
        if environment.as_map().is_empty() {
            return Ok(());
        }

        let document = serde_json::to_string(self)
            .map_err(|e| SubstituteError::Serialize(e.to_string()))?;
        let resolved = apply_variables(&document, environment.as_map());
        if resolved == document {
            return Ok(());
        }

        *self = serde_json::from_str(&resolved)
            .map_err(|e| SubstituteError::Reparse(e.to_string()))?;
        Ok(())
    }

    /// Resolves dynamic `{{$...}}` tokens across the whole request.
    ///
    /// Runs after all environment layers; each token occurrence is
    /// resolved independently, so repeated `{{$uuid}}` tokens produce
    /// distinct values.
    pub fn resolve_system_variables(&mut self) -> Result<(), SubstituteError> {
        let document = serde_json::to_string(self)
            .map_err(|e| SubstituteError::Serialize(e.to_string()))?;
        let resolved = resolve_system_tokens(&document)?;
        if resolved == document {
            return Ok(());
        }

        *self = serde_json::from_str(&resolved)
            .map_err(|e| SubstituteError::Reparse(e.to_string()))?;
        Ok(())
    }
}
