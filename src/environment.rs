//! Environment data model for PostKid
//!
//! An environment is a named bag of variables used to fill `{{name}}`
//! placeholders in requests. Collections declare static environments, a
//! `variables` block synthesizes the default one, and a sibling tmp file
//! holds environments that post-scripts write back at runtime.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Reserved name of the always-present fallback environment.
///
/// Both the static and the tmp environment lists contain an environment
/// with this name after a collection is loaded, synthesized empty when
/// the source files do not define one.
pub const DEFAULT_ENVIRONMENT: &str = "__default__";

/// A named set of variables.
///
/// Values are kept as raw YAML/JSON values (strings, numbers, booleans,
/// nested structures) and stringified only at substitution time. The map
/// is ordered so serializing an environment is deterministic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Environment {
    /// Environment name (e.g. "staging", "production", "__default__")
    pub name: String,

    /// Variable name → value pairs
    #[serde(default)]
    pub variables: BTreeMap<String, Value>,
}

impl Environment {
    /// Creates a new environment with no variables
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: BTreeMap::new(),
        }
    }

    /// Creates a new environment with name and variables
    pub fn with_variables(name: impl Into<String>, variables: BTreeMap<String, Value>) -> Self {
        Self {
            name: name.into(),
            variables,
        }
    }

    /// Gets a variable value by name
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    /// Adds or overwrites a single variable in place
    pub fn edit(&mut self, key: impl Into<String>, value: Value) {
        self.variables.insert(key.into(), value);
    }

    /// Returns the variable map without the name, the substitution source
    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    /// Checks if a variable exists
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    /// Checks if the environment has no variables
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}
