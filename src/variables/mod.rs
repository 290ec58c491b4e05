//! Variable resolution for PostKid
//!
//! This module provides the substitution engine that fills `{{name}}`
//! placeholders from environment variable maps, plus dynamic system
//! variables (`{{$uuid}}`, `{{$timestamp}}`, ...) resolved right before
//! a request is sent.

pub mod substitution;
pub mod system;

pub use substitution::{apply_variables, resolve_system_tokens, value_to_text};
pub use system::{resolve_system_variable, VarError};
