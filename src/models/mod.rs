//! Core data models for requests and responses.

pub mod request;
pub mod response;

pub use request::{Request, SubstituteError, DEFAULT_TIMEOUT};
pub use response::HttpResponse;
