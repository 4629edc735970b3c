#![deny(missing_docs)]

//! # OpenAPI Value Model
//!
//! Typed nodes for every OpenAPI 3.0 construct the generator emits, with
//! exact optional-vs-required field semantics: a field tagged
//! omit-when-empty is genuinely absent from output when unset, and numeric
//! constraints distinguish "no constraint" from an explicit zero.
//!
//! Unordered unique-key collections (paths, component tables, responses by
//! status) use `BTreeMap` so two runs over the same input produce identical
//! bytes. Order-significant collections (`properties`, `headers`) use the
//! insertion-ordered containers from [`ordered`].

pub mod ordered;
pub mod schema;

pub use ordered::OrderedMap;
pub use schema::{Properties, Reference, Schema, SchemaMeta, SchemaObject};

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// The fixed version string written to the `openapi` member.
pub const OPENAPI_VERSION: &str = "3.0.0";

/// `text/plain`
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
/// `application/json`
pub const CONTENT_TYPE_JSON: &str = "application/json";
/// `application/octet-stream`
pub const CONTENT_TYPE_OCTET_STREAM: &str = "application/octet-stream";
/// `multipart/form-data`
pub const CONTENT_TYPE_FORM: &str = "multipart/form-data";

/// Serde helper: omit boolean flags that are false.
pub(crate) fn is_false(value: &bool) -> bool {
    !*value
}

/// Ordered response-header container: header name -> header, declaration order.
pub type Headers = OrderedMap<Header>;

/// The root document object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenApiDocument {
    /// Fixed format version string. Always present.
    pub openapi: String,
    /// API metadata. Always present.
    pub info: Info,
    /// Server list; omitted when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<Server>,
    /// URL template -> path item. Always present, keys unique.
    pub paths: BTreeMap<String, PathItem>,
    /// Shared component tables; omitted when both are empty.
    #[serde(skip_serializing_if = "Components::is_empty")]
    pub components: Components,
    /// Document-level security requirement sets; omitted when empty.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<BTreeMap<String, Vec<String>>>,
}

impl OpenApiDocument {
    /// Creates a document with the fixed version string and empty collections.
    pub fn new(info: Info) -> Self {
        Self {
            openapi: OPENAPI_VERSION.to_string(),
            info,
            servers: Vec::new(),
            paths: BTreeMap::new(),
            components: Components::default(),
            security: Vec::new(),
        }
    }
}

/// The `info` block. `title` and `version` are required by the format.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Info {
    /// API title.
    pub title: String,
    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Terms-of-service URL.
    #[serde(rename = "termsOfService", skip_serializing_if = "Option::is_none")]
    pub terms_of_service: Option<String>,
    /// Contact information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
    /// License information.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<License>,
    /// API document version.
    pub version: String,
}

/// Contact metadata inside `info`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Contact {
    /// Contact name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Contact URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Contact e-mail address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Contact {
    /// True when no member is set; such a contact block is not emitted.
    pub fn is_unset(&self) -> bool {
        self.name.is_none() && self.url.is_none() && self.email.is_none()
    }
}

/// License metadata inside `info`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct License {
    /// License name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// License URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl License {
    /// True when no member is set; such a license block is not emitted.
    pub fn is_unset(&self) -> bool {
        self.name.is_none() && self.url.is_none()
    }
}

/// A server entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Server {
    /// Server URL.
    pub url: String,
    /// Server description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// An HTTP method slot on a path item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
    /// OPTIONS
    Options,
    /// HEAD
    Head,
    /// TRACE
    Trace,
}

impl HttpMethod {
    /// The lowercase member name used in the output format.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(HttpMethod::Get),
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            "patch" => Ok(HttpMethod::Patch),
            "delete" => Ok(HttpMethod::Delete),
            "options" => Ok(HttpMethod::Options),
            "head" => Ok(HttpMethod::Head),
            "trace" => Ok(HttpMethod::Trace),
            other => Err(format!("unknown HTTP method '{}'", other)),
        }
    }
}

/// One path entry: at most one operation per HTTP method.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PathItem {
    /// GET operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<Operation>,
    /// POST operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<Operation>,
    /// PUT operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<Operation>,
    /// PATCH operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<Operation>,
    /// DELETE operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<Operation>,
    /// OPTIONS operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Operation>,
    /// HEAD operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<Operation>,
    /// TRACE operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Operation>,
}

impl PathItem {
    /// Returns the operation registered for a method, if any.
    pub fn operation(&self, method: HttpMethod) -> Option<&Operation> {
        self.slot(method).as_ref()
    }

    /// Registers an operation under a method slot.
    ///
    /// Returns false (and leaves the item unchanged) when the slot is
    /// already occupied.
    pub fn set_operation(&mut self, method: HttpMethod, operation: Operation) -> bool {
        let slot = self.slot_mut(method);
        if slot.is_some() {
            return false;
        }
        *slot = Some(operation);
        true
    }

    fn slot(&self, method: HttpMethod) -> &Option<Operation> {
        match method {
            HttpMethod::Get => &self.get,
            HttpMethod::Post => &self.post,
            HttpMethod::Put => &self.put,
            HttpMethod::Patch => &self.patch,
            HttpMethod::Delete => &self.delete,
            HttpMethod::Options => &self.options,
            HttpMethod::Head => &self.head,
            HttpMethod::Trace => &self.trace,
        }
    }

    fn slot_mut(&mut self, method: HttpMethod) -> &mut Option<Operation> {
        match method {
            HttpMethod::Get => &mut self.get,
            HttpMethod::Post => &mut self.post,
            HttpMethod::Put => &mut self.put,
            HttpMethod::Patch => &mut self.patch,
            HttpMethod::Delete => &mut self.delete,
            HttpMethod::Options => &mut self.options,
            HttpMethod::Head => &mut self.head,
            HttpMethod::Trace => &mut self.trace,
        }
    }
}

/// A single operation.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Operation {
    /// Status-code string (or `default`) -> response. Required by the format.
    pub responses: BTreeMap<String, Response>,
    /// Grouping tags.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Unique operation identifier.
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Short summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Parameter list in declaration order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    /// Request body.
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBody>,
}

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Query string.
    Query,
    /// HTTP header.
    Header,
    /// URL path template.
    Path,
    /// Cookie.
    Cookie,
}

impl FromStr for ParameterLocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(ParameterLocation::Query),
            "header" => Ok(ParameterLocation::Header),
            "path" => Ok(ParameterLocation::Path),
            "cookie" => Ok(ParameterLocation::Cookie),
            other => Err(format!("unknown parameter location '{}'", other)),
        }
    }
}

/// A parameter: either a reference or a full inline definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Parameter {
    /// A pointer to a shared component. Carries no sibling fields.
    Reference(Reference),
    /// A full inline definition.
    Inline(Box<ParameterObject>),
}

/// An inline parameter definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterObject {
    /// Parameter name. Required.
    pub name: String,
    /// Parameter location. Required.
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the parameter must be supplied. Path parameters always are.
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
    /// Example value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    /// Value schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
}

/// A request body: either a reference or a full inline definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RequestBody {
    /// A pointer to a shared component. Carries no sibling fields.
    Reference(Reference),
    /// A full inline definition.
    Inline(RequestBodyObject),
}

/// An inline request-body definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RequestBodyObject {
    /// MIME type -> media type. Required by the format.
    pub content: BTreeMap<String, MediaType>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether a body must be supplied.
    #[serde(skip_serializing_if = "is_false")]
    pub required: bool,
}

/// One media-type entry mapping a MIME type to a schema.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaType {
    /// The payload schema.
    pub schema: Schema,
}

/// A response: either a reference or a full inline definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    /// A pointer to a shared component. Carries no sibling fields.
    Reference(Reference),
    /// A full inline definition.
    Inline(ResponseObject),
}

/// An inline response definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResponseObject {
    /// Response description. Required by the format.
    pub description: String,
    /// Ordered response headers; absent and empty are distinct states.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    /// MIME type -> media type; omitted when empty.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub content: BTreeMap<String, MediaType>,
}

/// A single response header.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Header {
    /// Value schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Schema>,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The shared component tables, keyed by identity string.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Components {
    /// Named schema table.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, Schema>,
    /// Named security-scheme table.
    #[serde(rename = "securitySchemes", skip_serializing_if = "BTreeMap::is_empty")]
    pub security_schemes: BTreeMap<String, SecurityScheme>,
}

impl Components {
    /// True when both tables are empty; an empty block is not emitted.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.security_schemes.is_empty()
    }
}

/// One security scheme record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityScheme {
    /// Scheme type (`apiKey`, `http`, `oauth2`, `openIdConnect`). Required.
    #[serde(rename = "type")]
    pub scheme_type: String,
    /// Description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// HTTP auth scheme name (`basic`, `bearer`, ...); `http` type only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    /// Key location; `apiKey` type only.
    #[serde(rename = "in", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Key parameter name; `apiKey` type only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Discovery URL; `openIdConnect` type only.
    #[serde(rename = "openIdConnectUrl", skip_serializing_if = "Option::is_none")]
    pub open_id_connect_url: Option<String>,
    /// Flow variants; `oauth2` type only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flows: Option<OAuthFlows>,
}

impl SecurityScheme {
    /// Creates a scheme of the given type with everything else unset.
    pub fn new(scheme_type: impl Into<String>) -> Self {
        Self {
            scheme_type: scheme_type.into(),
            description: None,
            scheme: None,
            location: None,
            name: None,
            open_id_connect_url: None,
            flows: None,
        }
    }
}

/// The up-to-four OAuth flow variants of an `oauth2` scheme.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OAuthFlows {
    /// Implicit flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implicit: Option<OAuthFlow>,
    /// Authorization-code flow.
    #[serde(rename = "authorizationCode", skip_serializing_if = "Option::is_none")]
    pub authorization_code: Option<OAuthFlow>,
    /// Resource-owner password flow.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<OAuthFlow>,
    /// Client-credentials flow.
    #[serde(rename = "clientCredentials", skip_serializing_if = "Option::is_none")]
    pub client_credentials: Option<OAuthFlow>,
}

impl OAuthFlows {
    /// Writes one scope mapping identically into every flow variant that is
    /// present. Absent variants stay untouched.
    pub fn apply_scopes(&mut self, scopes: &BTreeMap<String, String>) {
        if let Some(flow) = self.implicit.as_mut() {
            flow.scopes = scopes.clone();
        }
        if let Some(flow) = self.authorization_code.as_mut() {
            flow.scopes = scopes.clone();
        }
        if let Some(flow) = self.password.as_mut() {
            flow.scopes = scopes.clone();
        }
        if let Some(flow) = self.client_credentials.as_mut() {
            flow.scopes = scopes.clone();
        }
    }
}

/// One OAuth flow variant.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct OAuthFlow {
    /// Authorization endpoint.
    #[serde(rename = "authorizationUrl", skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    /// Token endpoint.
    #[serde(rename = "tokenUrl", skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    /// Scope name -> description. Always emitted, even when empty.
    pub scopes: BTreeMap<String, String>,
}
