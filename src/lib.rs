//! PostKid: a collection-driven HTTP request runner for the terminal.
//!
//! A collection is a YAML file declaring named requests, named variable
//! environments, and collection-wide defaults. One invocation selects a
//! collection, a request, and optionally an environment; the request's
//! `{{name}}` placeholders are resolved through four layered variable
//! sources, the call is made, the response is printed, and an optional
//! post-script writes captured values back into a persisted tmp
//! environment file.
//!
//! # Modules
//!
//! - **models**: request template and response descriptor
//! - **environment**: named variable bags
//! - **collection**: collection/tmp file loading, lookup, persistence
//! - **variables**: placeholder substitution and `{{$...}}` system variables
//! - **executor**: HTTP dispatch over reqwest
//! - **display**: terminal rendering of responses
//! - **script**: the bounded post-response directive language
//! - **cli** / **runner**: argument surface and the driver pipeline
//!
//! The binary is a thin shell over [`runner::run`]; integration tests
//! drive the same pipeline in-process.

pub mod cli;
pub mod collection;
pub mod display;
pub mod environment;
pub mod executor;
pub mod models;
pub mod runner;
pub mod script;
pub mod variables;

pub use collection::{Collection, LoadError, NotFoundError};
pub use environment::{Environment, DEFAULT_ENVIRONMENT};
pub use models::{HttpResponse, Request};
