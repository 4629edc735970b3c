#![deny(missing_docs)]

//! # roas core
//!
//! Core library for the OpenAPI 3.0 document generator: scans a Rust module
//! for annotated types and handler directives, interns the resulting type
//! graph cycle-safely, and renders one deterministic JSON document.

/// Shared error types.
pub mod error;

/// OpenAPI value model.
pub mod oas;

/// Source scanning and the descriptor model.
pub mod scan;

/// Cycle-safe schema interning.
pub mod registry;

/// Document assembly.
pub mod assembler;

/// Serialization and output publishing.
pub mod output;

pub use assembler::assemble;
pub use error::{AppError, AppResult};
pub use oas::{
    Components, Contact, Header, Headers, HttpMethod, Info, License, MediaType, OAuthFlow,
    OAuthFlows, OpenApiDocument, Operation, Parameter, ParameterLocation, ParameterObject,
    PathItem, Properties, Reference, RequestBody, RequestBodyObject, Response, ResponseObject,
    Schema, SchemaObject, SecurityScheme, Server, OPENAPI_VERSION,
};
pub use output::{render_document, write_document, OutputTarget};
pub use registry::{SchemaRegistry, Warning};
pub use scan::{
    ApiMetadata, FieldDescriptor, FieldType, ModuleScanner, RouteDescriptor, ScanResult,
    SourceScanner, TypeDescriptor, TypeGraph,
};

/// Runs the full pipeline against a scanner: scan, intern, assemble.
///
/// Returns the finished document plus the recoverable warnings collected
/// along the way.
pub fn generate(
    scanner: &mut dyn SourceScanner,
) -> AppResult<(OpenApiDocument, Vec<Warning>)> {
    let scan = scanner.scan()?;
    assemble(&scan)
}
