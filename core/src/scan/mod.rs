#![deny(missing_docs)]

//! # Scanner Seam
//!
//! The descriptor model the pipeline consumes, plus the bundled source
//! scanner. The registry and assembler never touch source code; everything
//! they need arrives as a [`ScanResult`], so an alternative scanner only has
//! to implement [`SourceScanner`].

pub mod directives;
pub mod source;

use crate::error::{AppError, AppResult};
use crate::oas::{HttpMethod, Info, ParameterLocation, SecurityScheme, Server};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Everything a scan produces: document metadata, the type graph, and the
/// discovered routes.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    /// Document-level metadata from the main file's directives.
    pub metadata: ApiMetadata,
    /// All discovered type descriptors.
    pub graph: TypeGraph,
    /// All discovered routes, in file order.
    pub routes: Vec<RouteDescriptor>,
}

/// Document-level metadata.
#[derive(Debug, Clone, Default)]
pub struct ApiMetadata {
    /// The `info` block.
    pub info: Info,
    /// Servers declared via `@Server`.
    pub servers: Vec<Server>,
    /// Security schemes declared via `@SecurityScheme`, keyed by name.
    pub security_schemes: BTreeMap<String, SecurityScheme>,
    /// Scope mappings declared via `@SecurityScope`, broadcast to every
    /// present flow variant of the named scheme during assembly.
    pub security_scopes: BTreeMap<String, BTreeMap<String, String>>,
    /// Document-level security requirements declared via `@Security`.
    pub security: Vec<BTreeMap<String, Vec<String>>>,
}

/// The shape of a field's value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    /// A string, optionally with a format qualifier (`uuid`, `date-time`).
    String {
        /// Format qualifier.
        format: Option<String>,
    },
    /// An integer, optionally with a format qualifier (`int32`, `int64`).
    Integer {
        /// Format qualifier.
        format: Option<String>,
    },
    /// A floating-point number, optionally with a format qualifier.
    Number {
        /// Format qualifier.
        format: Option<String>,
    },
    /// A boolean.
    Boolean,
    /// An arbitrary JSON value.
    Any,
    /// An array of a single element shape.
    Array(Box<FieldType>),
    /// A reference to another type descriptor, by (possibly qualified) name.
    Named(String),
    /// An anonymous inline object shape.
    Object(Vec<FieldDescriptor>),
}

impl FieldType {
    /// A plain string.
    pub fn string() -> Self {
        FieldType::String { format: None }
    }

    /// An integer with the given format qualifier.
    pub fn integer(format: Option<&str>) -> Self {
        FieldType::Integer {
            format: format.map(str::to_string),
        }
    }

    /// A number with the given format qualifier.
    pub fn number(format: Option<&str>) -> Self {
        FieldType::Number {
            format: format.map(str::to_string),
        }
    }
}

/// Constraint annotations attached to a field.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldConstraints {
    /// Inclusive lower bound.
    pub minimum: Option<i64>,
    /// Inclusive upper bound.
    pub maximum: Option<i64>,
    /// Minimum string length.
    pub min_length: Option<i64>,
    /// Maximum string length.
    pub max_length: Option<i64>,
    /// Minimum item count.
    pub min_items: Option<i64>,
    /// Maximum item count.
    pub max_items: Option<i64>,
    /// Nullability marker.
    pub nullable: bool,
    /// Deprecation marker.
    pub deprecated: bool,
    /// Format override.
    pub format: Option<String>,
    /// Example value.
    pub example: Option<Value>,
    /// Fixed set of admissible values.
    pub enum_values: Vec<Value>,
}

/// One field of a type descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    /// Field name as it appears on the wire.
    pub name: String,
    /// Value shape.
    pub ty: FieldType,
    /// Whether the field is required.
    pub required: bool,
    /// Doc-comment description.
    pub description: Option<String>,
    /// Constraint annotations.
    pub constraints: FieldConstraints,
}

impl FieldDescriptor {
    /// Creates a required field with no description or constraints.
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            description: None,
            constraints: FieldConstraints::default(),
        }
    }
}

/// One named type discovered in the source tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Originating package (module path).
    pub package: String,
    /// Bare type name.
    pub name: String,
    /// Doc-comment description.
    pub description: Option<String>,
    /// Fields in declaration order.
    pub fields: Vec<FieldDescriptor>,
}

impl TypeDescriptor {
    /// The package-qualified name used as the graph key.
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.package, self.name)
    }
}

/// The (possibly cyclic) graph of type descriptors, keyed by qualified name.
///
/// Every cross-type reference is a [`FieldType::Named`] lookup key, never a
/// direct owner link, so recursive and mutually referential types cannot
/// form ownership cycles.
#[derive(Debug, Clone, Default)]
pub struct TypeGraph {
    types: BTreeMap<String, TypeDescriptor>,
}

impl TypeGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor under its qualified name. A re-registration
    /// of the same qualified name replaces the previous descriptor.
    pub fn insert(&mut self, descriptor: TypeDescriptor) {
        self.types.insert(descriptor.qualified_name(), descriptor);
    }

    /// Looks up a descriptor by exact qualified name.
    pub fn get(&self, qualified_name: &str) -> Option<&TypeDescriptor> {
        self.types.get(qualified_name)
    }

    /// Resolves a (possibly qualified) type name from a referencing package.
    ///
    /// Preference order: a type in the referencing package itself, then a
    /// package matching the qualifier prefix, then the lexicographically
    /// first candidate — deterministic across runs by construction.
    pub fn resolve(&self, name: &str, from_package: &str) -> Option<&TypeDescriptor> {
        let normalized = name.replace('.', "::");
        if let Some(descriptor) = self.types.get(&normalized) {
            return Some(descriptor);
        }

        let (hint, bare) = match normalized.rsplit_once("::") {
            Some((prefix, bare)) => (Some(prefix), bare),
            None => (None, normalized.as_str()),
        };

        let mut candidates: Vec<&TypeDescriptor> = self
            .types
            .values()
            .filter(|descriptor| descriptor.name == bare)
            .collect();
        if let Some(hint) = hint {
            candidates.retain(|descriptor| {
                descriptor.package == hint || descriptor.package.ends_with(&format!("::{}", hint))
            });
        }

        candidates
            .iter()
            .find(|descriptor| descriptor.package == from_package)
            .copied()
            .or_else(|| candidates.first().copied())
    }

    /// Iterates descriptors in qualified-name order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.types.values()
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True when no descriptor is registered.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// One route parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    /// Parameter name.
    pub name: String,
    /// Parameter location.
    pub location: ParameterLocation,
    /// Value shape.
    pub ty: FieldType,
    /// Whether the parameter must be supplied.
    pub required: bool,
    /// Description.
    pub description: Option<String>,
    /// Example value.
    pub example: Option<Value>,
}

/// One route request body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDescriptor {
    /// Payload shape.
    pub ty: FieldType,
    /// MIME type of the payload.
    pub content_type: String,
    /// Description.
    pub description: Option<String>,
    /// Whether a body must be supplied.
    pub required: bool,
}

/// One response header declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderDescriptor {
    /// Header name.
    pub name: String,
    /// Value shape.
    pub ty: FieldType,
    /// Description.
    pub description: Option<String>,
}

/// One declared response.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseDescriptor {
    /// Status-code string or `default`.
    pub status: String,
    /// Response description.
    pub description: String,
    /// MIME type of the payload, when there is one.
    pub content_type: String,
    /// Payload shape; `None` means a bodiless response.
    pub ty: Option<FieldType>,
    /// Response headers in declaration order.
    pub headers: Vec<HeaderDescriptor>,
}

/// One discovered route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteDescriptor {
    /// URL template, e.g. `/items/{id}`.
    pub path: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Handler function name; default `operationId`.
    pub handler: String,
    /// Short summary.
    pub summary: Option<String>,
    /// Longer description.
    pub description: Option<String>,
    /// Explicit `operationId` override.
    pub operation_id: Option<String>,
    /// Grouping tags.
    pub tags: Vec<String>,
    /// Parameters in declaration order.
    pub parameters: Vec<ParamDescriptor>,
    /// Request body, if declared.
    pub request_body: Option<BodyDescriptor>,
    /// Responses in declaration order.
    pub responses: Vec<ResponseDescriptor>,
}

/// The scanner seam: anything able to produce a [`ScanResult`].
pub trait SourceScanner {
    /// Runs the scan.
    fn scan(&mut self) -> AppResult<ScanResult>;
}

/// The bundled scanner: walks a module directory, extracts annotated
/// structs into the type graph, and reads doc-comment directives for
/// routes and document metadata.
#[derive(Debug, Clone)]
pub struct ModuleScanner {
    module_path: PathBuf,
    main_file: PathBuf,
    handler_path: Option<PathBuf>,
    debug: bool,
}

impl ModuleScanner {
    /// Creates a scanner over a module directory and its entry file.
    pub fn new(module_path: impl Into<PathBuf>, main_file: impl Into<PathBuf>) -> Self {
        Self {
            module_path: module_path.into(),
            main_file: main_file.into(),
            handler_path: None,
            debug: false,
        }
    }

    /// Restricts route discovery to files under the given directory.
    /// Type discovery still spans the whole module.
    pub fn with_handler_path(mut self, handler_path: impl Into<PathBuf>) -> Self {
        self.handler_path = Some(handler_path.into());
        self
    }

    /// Enables diagnostic output on stderr.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn in_handler_scope(&self, file: &Path) -> bool {
        match &self.handler_path {
            Some(scope) => file.starts_with(scope),
            None => true,
        }
    }
}

impl SourceScanner for ModuleScanner {
    fn scan(&mut self) -> AppResult<ScanResult> {
        if !self.module_path.is_dir() {
            return Err(AppError::General(format!(
                "module path is not a directory: {:?}",
                self.module_path
            )));
        }

        let main_source = fs::read_to_string(&self.main_file)?;
        let metadata = directives::parse_api_metadata(&main_source)?;

        let mut graph = TypeGraph::new();
        let mut routes = Vec::new();

        // Deterministic traversal: walkdir sorted by file name.
        for entry in WalkDir::new(&self.module_path)
            .sort_by_file_name()
            .into_iter()
            .filter_map(Result::ok)
        {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("rs") {
                continue;
            }

            let code = fs::read_to_string(path)?;
            let package = module_package(&self.module_path, path);

            let types = source::extract_types(&code, &package)?;
            if self.debug && !types.is_empty() {
                eprintln!(
                    "roas: {} type(s) in {} ({})",
                    types.len(),
                    path.display(),
                    package
                );
            }
            for descriptor in types {
                graph.insert(descriptor);
            }

            if self.in_handler_scope(path) {
                let found = source::extract_routes(&code)?;
                if self.debug && !found.is_empty() {
                    eprintln!("roas: {} route(s) in {}", found.len(), path.display());
                }
                routes.extend(found);
            }
        }

        Ok(ScanResult {
            metadata,
            graph,
            routes,
        })
    }
}

/// Derives a module path ("package") from a file's location under the
/// module root, e.g. `src/models/user.rs` -> `models::user`.
fn module_package(root: &Path, file: &Path) -> String {
    let relative = file.strip_prefix(root).unwrap_or(file);
    let mut parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if let Some(last) = parts.last_mut() {
        if let Some(stem) = last.strip_suffix(".rs") {
            *last = stem.to_string();
        }
    }
    parts.retain(|part| !part.is_empty() && part != "src");
    if matches!(
        parts.last().map(String::as_str),
        Some("mod") | Some("lib") | Some("main")
    ) {
        parts.pop();
    }
    if parts.is_empty() {
        "crate".to_string()
    } else {
        parts.join("::")
    }
}
