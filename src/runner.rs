//! The driver: load, resolve, send, display, post-script.
//!
//! Resolution applies up to four environment layers in priority order,
//! each pass resolving only the placeholders still present:
//!
//! 1. ad-hoc CLI `name=value` variables,
//! 2. the tmp environment for the selected name (default sentinel when
//!    no `-e` was given),
//! 3. the static environment for the selected name,
//! 4. the static default-sentinel environment.
//!
//! A final pass resolves `{{$...}}` system variables, then `-q` replaces
//! the query parameters outright before dispatch.

use crate::cli::Parameters;
use crate::collection::{Collection, LoadError, NotFoundError};
use crate::display::render_response;
use crate::environment::Environment;
use crate::executor::{self, RequestError};
use crate::models::request::SubstituteError;
use crate::models::response::HttpResponse;
use crate::script::{run_post_script, ScriptError};
use log::debug;
use serde_json::Value;
use std::fmt;

/// Umbrella over every failure the driver can surface.
#[derive(Debug)]
pub enum RunError {
    Load(LoadError),
    NotFound(NotFoundError),
    Substitute(SubstituteError),
    Transport(RequestError),
    Script(ScriptError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Load(err) => write!(f, "{}", err),
            RunError::NotFound(err) => write!(f, "{}", err),
            RunError::Substitute(err) => write!(f, "{}", err),
            RunError::Transport(err) => write!(f, "{}", err),
            RunError::Script(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Load(err) => Some(err),
            RunError::NotFound(err) => Some(err),
            RunError::Substitute(err) => Some(err),
            RunError::Transport(err) => Some(err),
            RunError::Script(err) => Some(err),
        }
    }
}

impl From<LoadError> for RunError {
    fn from(err: LoadError) -> Self {
        RunError::Load(err)
    }
}

impl From<NotFoundError> for RunError {
    fn from(err: NotFoundError) -> Self {
        RunError::NotFound(err)
    }
}

impl From<SubstituteError> for RunError {
    fn from(err: SubstituteError) -> Self {
        RunError::Substitute(err)
    }
}

impl From<RequestError> for RunError {
    fn from(err: RequestError) -> Self {
        RunError::Transport(err)
    }
}

impl From<ScriptError> for RunError {
    fn from(err: ScriptError) -> Self {
        RunError::Script(err)
    }
}

/// Runs one invocation end to end and prints the rendered response.
///
/// The response is printed as soon as it arrives; a post-script failure
/// afterwards still surfaces as an error, but never hides the output.
pub async fn run(params: &Parameters) -> Result<(), RunError> {
    let mode = params.display_mode();
    execute_with(params, |response| {
        println!("{}", render_response(response, mode));
    })
    .await?;
    Ok(())
}

/// Runs one invocation and returns the response instead of printing it.
///
/// The post-script still executes (it persists tmp edits), so this is
/// the whole observable pipeline minus stdout.
pub async fn execute(params: &Parameters) -> Result<HttpResponse, RunError> {
    execute_with(params, |_| {}).await
}

/// Core pipeline with a response hook.
///
/// `on_response` fires once the response has been captured, before the
/// post-script runs, so display happens even when a directive fails.
pub async fn execute_with<F>(params: &Parameters, on_response: F) -> Result<HttpResponse, RunError>
where
    F: FnOnce(&HttpResponse),
{
    let path = params.collection_path();
    debug!("Loading collection from {}", path.display());
    let mut collection = Collection::load(&path)?;

    let mut request = collection.get_request(&params.request)?.clone();
    let env_name = params.environment.as_deref();

    // Layer 1: ad-hoc CLI variables
    let adhoc = adhoc_environment(params);
    request.override_variables(adhoc.as_ref())?;

    // Layer 2: tmp environment
    let tmp = collection.get_environment(env_name, true)?;
    request.override_variables(Some(tmp))?;

    // Layer 3: static named environment
    let named = collection.get_environment(env_name, false)?;
    request.override_variables(Some(named))?;

    // Layer 4: static default sentinel
    let default = collection.get_environment(None, false)?;
    request.override_variables(Some(default))?;

    request.resolve_system_variables()?;

    // -q replaces params outright, it does not merge
    if let Some(query) = &params.query {
        request.params = query
            .0
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
    }

    let response = executor::send(&request).await?;
    on_response(&response);

    if let Some(script) = request.post_script.clone() {
        debug!("Running post-script ({} bytes)", script.len());
        run_post_script(&script, &mut collection, env_name, &response)?;
    }

    Ok(response)
}

/// Builds the ephemeral top-priority environment from CLI variables.
fn adhoc_environment(params: &Parameters) -> Option<Environment> {
    if params.variables.is_empty() {
        return None;
    }
    let mut environment = Environment::new("cli");
    for (name, value) in &params.variables {
        environment.edit(name.clone(), Value::String(value.clone()));
    }
    Some(environment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn params(args: &[&str]) -> Parameters {
        Parameters::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_adhoc_environment_empty() {
        let params = params(&["postkid", "api", "r"]);
        assert!(adhoc_environment(&params).is_none());
    }

    #[test]
    fn test_adhoc_environment_built_from_pairs() {
        let params = params(&["postkid", "api", "r", "host=example.com"]);
        let env = adhoc_environment(&params).unwrap();
        assert_eq!(env.get("host").unwrap(), "example.com");
    }

    #[tokio::test]
    async fn test_missing_collection_is_load_error() {
        let params = params(&["postkid", "/nonexistent/api.yaml", "r"]);
        let result = execute(&params).await;
        assert!(matches!(result, Err(RunError::Load(LoadError::FileNotFound(_)))));
    }
}
