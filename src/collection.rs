//! Collection loading, lookup, and tmp-environment persistence.
//!
//! A collection is a YAML file declaring named requests, named variable
//! environments (under the `enviroments` key, spelled exactly so for
//! compatibility with existing files), and collection-wide defaults
//! (`variables`). A sibling tmp file holds environments that post-scripts
//! write back at runtime; it is rewritten in full after every edit.

use crate::environment::{Environment, DEFAULT_ENVIRONMENT};
use crate::models::request::Request;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Errors that can occur while loading or persisting collection files.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    /// Collection file does not exist
    FileNotFound(String),

    /// Failed to read or write a file
    IoError(String),

    /// Failed to parse YAML content
    ParseError(String),

    /// File parsed but its shape is not usable
    InvalidFormat(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::FileNotFound(path) => write!(f, "Collection file not found: {}", path),
            LoadError::IoError(msg) => write!(f, "IO error: {}", msg),
            LoadError::ParseError(msg) => write!(f, "Failed to parse collection file: {}", msg),
            LoadError::InvalidFormat(msg) => write!(f, "Invalid collection format: {}", msg),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<io::Error> for LoadError {
    fn from(err: io::Error) -> Self {
        LoadError::IoError(err.to_string())
    }
}

impl From<serde_yaml::Error> for LoadError {
    fn from(err: serde_yaml::Error) -> Self {
        LoadError::ParseError(err.to_string())
    }
}

/// A request or environment name that is not present in the collection.
#[derive(Debug, Clone, PartialEq)]
pub enum NotFoundError {
    /// No request with this name
    Request(String),

    /// No environment with this name; the flag tells which list was searched
    Environment { name: String, tmp: bool },
}

impl fmt::Display for NotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotFoundError::Request(name) => write!(f, "Request not found: {}", name),
            NotFoundError::Environment { name, tmp: true } => {
                write!(f, "Tmp environment not found: {}", name)
            }
            NotFoundError::Environment { name, tmp: false } => {
                write!(f, "Environment not found: {}", name)
            }
        }
    }
}

impl std::error::Error for NotFoundError {}

/// A loaded collection file plus its sibling tmp environments.
#[derive(Debug, Clone)]
pub struct Collection {
    /// Path the collection was loaded from
    pub path: PathBuf,

    /// Declared requests, in file order where the format preserves it
    pub requests: Vec<Request>,

    /// Static environments, `__default__` always present exactly once
    pub environments: Vec<Environment>,

    /// Tmp environments, `__default__` always present exactly once
    pub tmp_environments: Vec<Environment>,

    /// Top-level keys other than `requests`/`enviroments`/`variables`
    pub metadata: BTreeMap<String, Value>,
}

impl Collection {
    /// Loads a collection and its sibling tmp file.
    ///
    /// Fails when the collection file is missing, unparsable, or parses
    /// to an empty or non-mapping document. A missing tmp file is fine
    /// (empty list); a present but malformed one is a [`LoadError`].
    pub fn load(path: &Path) -> Result<Self, LoadError> {
        if !path.exists() {
            return Err(LoadError::FileNotFound(path.display().to_string()));
        }

        let content = fs::read_to_string(path)?;
        let document: Value = serde_yaml::from_str(&content)?;

        let mut root = match document {
            Value::Object(map) => map,
            Value::Null => {
                return Err(LoadError::InvalidFormat(format!(
                    "Collection file is empty: {}",
                    path.display()
                )))
            }
            other => {
                return Err(LoadError::InvalidFormat(format!(
                    "Collection root must be a mapping, got {}",
                    value_kind(&other)
                )))
            }
        };

        let requests = parse_requests(root.remove("requests"))?;
        let mut environments = parse_environments(root.remove("enviroments"))?;
        merge_default_environment(&mut environments, root.remove("variables"))?;

        let mut tmp_environments = load_tmp_environments(&tmp_path(path))?;
        if !tmp_environments
            .iter()
            .any(|e| e.name == DEFAULT_ENVIRONMENT)
        {
            tmp_environments.push(Environment::new(DEFAULT_ENVIRONMENT));
        }

        let metadata = root.into_iter().collect();

        Ok(Self {
            path: path.to_path_buf(),
            requests,
            environments,
            tmp_environments,
            metadata,
        })
    }

    /// Looks up a request by name, first match wins.
    pub fn get_request(&self, name: &str) -> Result<&Request, NotFoundError> {
        self.requests
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| NotFoundError::Request(name.to_string()))
    }

    /// Looks up an environment by name in the static or tmp list.
    ///
    /// `None` or an empty name selects the default sentinel.
    pub fn get_environment(
        &self,
        name: Option<&str>,
        tmp: bool,
    ) -> Result<&Environment, NotFoundError> {
        let name = effective_name(name);
        self.environment_list(tmp)
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| NotFoundError::Environment {
                name: name.to_string(),
                tmp,
            })
    }

    /// All environments of one list as a name → variables mapping.
    ///
    /// This is the shape the tmp file is serialized from.
    pub fn environments_as_map(&self, tmp: bool) -> BTreeMap<String, BTreeMap<String, Value>> {
        self.environment_list(tmp)
            .iter()
            .map(|e| (e.name.clone(), e.variables.clone()))
            .collect()
    }

    /// Upserts one variable in the named environment of the chosen list.
    ///
    /// A missing environment is created with that single variable and
    /// appended; this operation never fails.
    pub fn edit_environment(
        &mut self,
        env_name: Option<&str>,
        var_name: impl Into<String>,
        var_value: Value,
        tmp: bool,
    ) {
        let name = effective_name(env_name).to_string();
        let list = self.environment_list_mut(tmp);

        match list.iter_mut().find(|e| e.name == name) {
            Some(environment) => environment.edit(var_name, var_value),
            None => {
                let mut environment = Environment::new(name);
                environment.edit(var_name, var_value);
                list.push(environment);
            }
        }
    }

    /// Rewrites the tmp file from the current tmp environment list.
    ///
    /// Full overwrite, sorted keys, block style.
    pub fn persist_tmp(&self) -> Result<(), LoadError> {
        let map = self.environments_as_map(true);
        let content = serde_yaml::to_string(&map)?;
        fs::write(self.tmp_file_path(), content)?;
        Ok(())
    }

    /// The sibling tmp file path for this collection.
    pub fn tmp_file_path(&self) -> PathBuf {
        tmp_path(&self.path)
    }

    fn environment_list(&self, tmp: bool) -> &[Environment] {
        if tmp {
            &self.tmp_environments
        } else {
            &self.environments
        }
    }

    fn environment_list_mut(&mut self, tmp: bool) -> &mut Vec<Environment> {
        if tmp {
            &mut self.tmp_environments
        } else {
            &mut self.environments
        }
    }
}

/// Substitutes the default sentinel for a missing or empty name.
fn effective_name(name: Option<&str>) -> &str {
    match name {
        Some(n) if !n.is_empty() => n,
        _ => DEFAULT_ENVIRONMENT,
    }
}

/// Derives the tmp file path from a collection path.
///
/// The first `.yaml` occurrence in the file name becomes `.tmp.yaml`
/// (`api.yaml` → `api.tmp.yaml`). A name without `.yaml` gets the marker
/// appended.
fn tmp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let tmp_name = if file_name.contains(".yaml") {
        file_name.replacen(".yaml", ".tmp.yaml", 1)
    } else {
        format!("{}.tmp.yaml", file_name)
    };

    path.with_file_name(tmp_name)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

fn parse_requests(value: Option<Value>) -> Result<Vec<Request>, LoadError> {
    let entries = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(entries)) => entries,
        Some(other) => {
            return Err(LoadError::InvalidFormat(format!(
                "'requests' must be a list, got {}",
                value_kind(&other)
            )))
        }
    };

    entries
        .into_iter()
        .map(|entry| {
            serde_json::from_value(entry)
                .map_err(|e| LoadError::InvalidFormat(format!("Invalid request entry: {}", e)))
        })
        .collect()
}

fn parse_environments(value: Option<Value>) -> Result<Vec<Environment>, LoadError> {
    let entries = match value {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(other) => {
            return Err(LoadError::InvalidFormat(format!(
                "'enviroments' must be a mapping, got {}",
                value_kind(&other)
            )))
        }
    };

    entries
        .into_iter()
        .map(|(name, vars)| build_environment(name, vars))
        .collect()
}

fn build_environment(name: String, vars: Value) -> Result<Environment, LoadError> {
    let variables = match vars {
        Value::Null => BTreeMap::new(),
        Value::Object(map) => map.into_iter().collect(),
        other => {
            return Err(LoadError::InvalidFormat(format!(
                "Environment '{}' must be a mapping, got {}",
                name,
                value_kind(&other)
            )))
        }
    };
    Ok(Environment::with_variables(name, variables))
}

/// Synthesizes the default-sentinel environment from the `variables` block.
///
/// When the collection also declares `enviroments.__default__`, the block
/// merges into it with declared entries winning, so the list holds the
/// sentinel exactly once.
fn merge_default_environment(
    environments: &mut Vec<Environment>,
    variables: Option<Value>,
) -> Result<(), LoadError> {
    let block = match variables {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(map)) => map.into_iter().collect(),
        Some(other) => {
            return Err(LoadError::InvalidFormat(format!(
                "'variables' must be a mapping, got {}",
                value_kind(&other)
            )))
        }
    };

    match environments
        .iter_mut()
        .find(|e| e.name == DEFAULT_ENVIRONMENT)
    {
        Some(declared) => {
            for (name, value) in block {
                declared.variables.entry(name).or_insert(value);
            }
        }
        None => environments.push(Environment::with_variables(DEFAULT_ENVIRONMENT, block)),
    }
    Ok(())
}

fn load_tmp_environments(path: &Path) -> Result<Vec<Environment>, LoadError> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let document: Value = serde_yaml::from_str(&content)?;

    match document {
        Value::Null => Ok(Vec::new()),
        Value::Object(map) => map
            .into_iter()
            .map(|(name, vars)| build_environment(name, vars))
            .collect(),
        other => Err(LoadError::InvalidFormat(format!(
            "Tmp file must be a mapping of environments, got {}",
            value_kind(&other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_collection(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    const BASIC: &str = r#"
requests:
  - name: get-user
    url: http://{{host}}/users/{{id}}
  - name: ping
    url: http://{{host}}/ping
    method: HEAD
enviroments:
  staging:
    host: staging.example.com
  production:
    host: api.example.com
variables:
  id: 1
"#;

    #[test]
    fn test_load_basic_collection() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "api.yaml", BASIC);

        let collection = Collection::load(&path).unwrap();

        assert_eq!(collection.requests.len(), 2);
        assert_eq!(collection.requests[0].name, "get-user");
        assert_eq!(collection.requests[1].method, "HEAD");

        // staging + production + synthesized __default__
        assert_eq!(collection.environments.len(), 3);
        let default = collection.get_environment(None, false).unwrap();
        assert_eq!(default.get("id").unwrap(), &json!(1));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new().unwrap();
        let result = Collection::load(&dir.path().join("absent.yaml"));
        assert!(matches!(result, Err(LoadError::FileNotFound(_))));
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "bad.yaml", "requests: [unclosed");
        let result = Collection::load(&path);
        assert!(matches!(result, Err(LoadError::ParseError(_))));
    }

    #[test]
    fn test_load_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "empty.yaml", "");
        let result = Collection::load(&path);
        assert!(matches!(result, Err(LoadError::InvalidFormat(_))));
    }

    #[test]
    fn test_load_non_mapping_root() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "list.yaml", "- just\n- a\n- list\n");
        let result = Collection::load(&path);
        assert!(matches!(result, Err(LoadError::InvalidFormat(_))));
    }

    #[test]
    fn test_variables_only_synthesizes_single_default() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "api.yaml", "variables:\n  host: example.com\n");

        let collection = Collection::load(&path).unwrap();

        assert_eq!(collection.environments.len(), 1);
        assert_eq!(collection.environments[0].name, DEFAULT_ENVIRONMENT);
        assert_eq!(
            collection.environments[0].get("host").unwrap(),
            &json!("example.com")
        );
    }

    #[test]
    fn test_declared_default_merges_with_variables_block() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(
            &dir,
            "api.yaml",
            r#"
enviroments:
  __default__:
    host: declared.example.com
variables:
  host: block.example.com
  port: 8080
"#,
        );

        let collection = Collection::load(&path).unwrap();

        let defaults: Vec<_> = collection
            .environments
            .iter()
            .filter(|e| e.name == DEFAULT_ENVIRONMENT)
            .collect();
        assert_eq!(defaults.len(), 1);
        // Declared entry wins, block fills the gap
        assert_eq!(defaults[0].get("host").unwrap(), &json!("declared.example.com"));
        assert_eq!(defaults[0].get("port").unwrap(), &json!(8080));
    }

    #[test]
    fn test_passthrough_metadata_is_retained() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(
            &dir,
            "api.yaml",
            "description: my api\nowner: platform\nrequests:\n",
        );

        let collection = Collection::load(&path).unwrap();

        assert_eq!(collection.metadata.get("description").unwrap(), "my api");
        assert_eq!(collection.metadata.get("owner").unwrap(), "platform");
        assert!(!collection.metadata.contains_key("requests"));
    }

    #[test]
    fn test_get_request_not_found() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "api.yaml", BASIC);
        let collection = Collection::load(&path).unwrap();

        let result = collection.get_request("nope");
        assert_eq!(result.unwrap_err(), NotFoundError::Request("nope".to_string()));
    }

    #[test]
    fn test_get_environment_not_found() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "api.yaml", BASIC);
        let collection = Collection::load(&path).unwrap();

        let result = collection.get_environment(Some("qa"), false);
        assert!(matches!(
            result,
            Err(NotFoundError::Environment { tmp: false, .. })
        ));
    }

    #[test]
    fn test_get_environment_empty_name_selects_default() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "api.yaml", BASIC);
        let collection = Collection::load(&path).unwrap();

        assert_eq!(
            collection.get_environment(Some(""), false).unwrap().name,
            DEFAULT_ENVIRONMENT
        );
        assert_eq!(
            collection.get_environment(None, true).unwrap().name,
            DEFAULT_ENVIRONMENT
        );
    }

    #[test]
    fn test_tmp_path_derivation() {
        assert_eq!(
            tmp_path(Path::new("api.yaml")),
            PathBuf::from("api.tmp.yaml")
        );
        assert_eq!(
            tmp_path(Path::new("collections/api.yaml")),
            PathBuf::from("collections/api.tmp.yaml")
        );
        assert_eq!(
            tmp_path(Path::new("api.yaml.bak")),
            PathBuf::from("api.tmp.yaml.bak")
        );
        assert_eq!(tmp_path(Path::new("api")), PathBuf::from("api.tmp.yaml"));
    }

    #[test]
    fn test_missing_tmp_file_yields_default_only() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "api.yaml", BASIC);

        let collection = Collection::load(&path).unwrap();

        assert_eq!(collection.tmp_environments.len(), 1);
        assert_eq!(collection.tmp_environments[0].name, DEFAULT_ENVIRONMENT);
        assert!(collection.tmp_environments[0].is_empty());
    }

    #[test]
    fn test_tmp_file_is_loaded_and_default_appended() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "api.yaml", BASIC);
        write_collection(&dir, "api.tmp.yaml", "staging:\n  token: abc\n");

        let collection = Collection::load(&path).unwrap();

        assert_eq!(collection.tmp_environments.len(), 2);
        let staging = collection.get_environment(Some("staging"), true).unwrap();
        assert_eq!(staging.get("token").unwrap(), &json!("abc"));
        assert!(collection.get_environment(None, true).is_ok());
    }

    #[test]
    fn test_malformed_tmp_file_is_load_error() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "api.yaml", BASIC);
        write_collection(&dir, "api.tmp.yaml", "- not\n- a mapping\n");

        let result = Collection::load(&path);
        assert!(matches!(result, Err(LoadError::InvalidFormat(_))));
    }

    #[test]
    fn test_edit_environment_upserts_in_place() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "api.yaml", BASIC);
        let mut collection = Collection::load(&path).unwrap();

        collection.edit_environment(Some("staging"), "token", json!("xyz"), false);
        let staging = collection.get_environment(Some("staging"), false).unwrap();
        assert_eq!(staging.get("token").unwrap(), &json!("xyz"));
        assert_eq!(collection.environments.len(), 3);
    }

    #[test]
    fn test_edit_environment_creates_missing() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "api.yaml", BASIC);
        let mut collection = Collection::load(&path).unwrap();

        collection.edit_environment(Some("qa"), "token", json!("xyz"), true);
        let qa = collection.get_environment(Some("qa"), true).unwrap();
        assert_eq!(qa.get("token").unwrap(), &json!("xyz"));
    }

    #[test]
    fn test_tmp_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "api.yaml", BASIC);
        let mut collection = Collection::load(&path).unwrap();

        collection.edit_environment(Some("staging"), "token", json!("abc"), true);
        collection.persist_tmp().unwrap();

        // Second edit must not disturb the first
        collection.edit_environment(Some("staging"), "session", json!("s1"), true);
        collection.persist_tmp().unwrap();

        let reloaded = Collection::load(&path).unwrap();
        let staging = reloaded.get_environment(Some("staging"), true).unwrap();
        assert_eq!(staging.get("token").unwrap(), &json!("abc"));
        assert_eq!(staging.get("session").unwrap(), &json!("s1"));
        assert!(reloaded.get_environment(None, true).is_ok());
    }

    #[test]
    fn test_persist_tmp_writes_expected_shape() {
        let dir = TempDir::new().unwrap();
        let path = write_collection(&dir, "api.yaml", "requests:\n");
        let mut collection = Collection::load(&path).unwrap();

        collection.edit_environment(Some("staging"), "token", json!("abc"), true);
        collection.persist_tmp().unwrap();

        let content = fs::read_to_string(collection.tmp_file_path()).unwrap();
        let parsed: BTreeMap<String, BTreeMap<String, Value>> =
            serde_yaml::from_str(&content).unwrap();

        let mut expected = BTreeMap::new();
        expected.insert(DEFAULT_ENVIRONMENT.to_string(), BTreeMap::new());
        expected.insert(
            "staging".to_string(),
            [("token".to_string(), json!("abc"))].into_iter().collect(),
        );
        assert_eq!(parsed, expected);
    }
}
