//! # openapi-parser
//!
//! Swagger 2 / OpenAPI 3 loader for openapi-crawler.
//! Loads spec documents, enumerates GET endpoints and infers field schemas
//! from declared response schemas or sampled payloads.

mod types;
mod parser;
mod auth;
mod loader;
mod endpoints;
mod resolver;
mod schema;
mod error;

pub use types::*;
pub use parser::OpenApiParser;
pub use auth::{Credentials, SecretString, TokenMethod, TokenRequest};
pub use loader::{clean_url, join_url, SpecLoader, SpecSource};
pub use endpoints::{
    dataset_name, placeholders, substitute, EndpointDescriptor, EndpointEnumerator, Enumeration,
    EnumerationWarning, Placeholder,
};
pub use resolver::RefResolver;
pub use schema::{SampleInference, SchemaInferencer};
pub use error::{SpecError, SpecResult};
