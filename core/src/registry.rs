#![deny(missing_docs)]

//! # Schema Registry
//!
//! Converts the (possibly cyclic) descriptor graph into two tiers: schemas
//! inlined where used, and schemas promoted into the shared component table
//! with a `$ref` left at the use site.
//!
//! Every cross-type reference is resolved through an identity-keyed table,
//! never through a direct owner link. Re-visiting an identity that is
//! already registered — including one whose expansion is still in progress —
//! always yields a reference, which is what guarantees termination for
//! self-referential and mutually recursive type graphs.

use crate::oas::{HttpMethod, Properties, Schema, SchemaObject};
use crate::scan::{FieldDescriptor, FieldType, RouteDescriptor, TypeDescriptor, TypeGraph};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A recoverable, locally-scoped condition surfaced to the caller instead
/// of failing the run.
#[derive(Debug, Clone, PartialEq)]
pub enum Warning {
    /// Two structurally different shapes mapped to one identity.
    IdentityCollision {
        /// The colliding identity.
        identity: String,
        /// Package that registered the identity first.
        existing_package: String,
        /// Package whose shape collided.
        incoming_package: String,
        /// Field names dropped from output.
        suppressed: Vec<String>,
    },
    /// A named reference had no descriptor in the scanned module.
    UnknownType {
        /// The unresolved name.
        name: String,
        /// Referencing package; empty for route directives.
        package: String,
    },
    /// A second operation was registered for an occupied path + method slot.
    DuplicateOperation {
        /// URL template.
        path: String,
        /// HTTP method.
        method: HttpMethod,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::IdentityCollision {
                identity,
                existing_package,
                incoming_package,
                suppressed,
            } => {
                write!(
                    f,
                    "schema identity '{}' is declared in both '{}' and '{}' with different shapes",
                    identity, existing_package, incoming_package
                )?;
                if !suppressed.is_empty() {
                    write!(f, "; dropping conflicting fields: {}", suppressed.join(", "))?;
                }
                Ok(())
            }
            Warning::UnknownType { name, package } => {
                let context = if package.is_empty() {
                    "route directives"
                } else {
                    package.as_str()
                };
                write!(
                    f,
                    "type '{}' referenced from {} was not found in the scanned module",
                    name, context
                )
            }
            Warning::DuplicateOperation { path, method } => {
                write!(f, "duplicate operation {} {} ignored", method, path)
            }
        }
    }
}

/// Visit bookkeeping per identity.
enum VisitState {
    /// Expansion is running; a re-entry means the type is self-referential.
    InProgress {
        /// Set when a reference to this identity is emitted mid-expansion.
        reentered: bool,
    },
    /// Registered in the component table; use sites hold references.
    Registered,
    /// Inlined at its (single) use site. The built object is kept so a
    /// late second use site can still promote it.
    Inlined(SchemaObject),
}

/// The cycle-safe interning registry.
///
/// The registry is the sole owner of identity assignment and of the
/// inline-vs-promote decision; nothing else mutates a schema's reference
/// status after registration.
pub struct SchemaRegistry<'g> {
    graph: &'g TypeGraph,
    use_counts: BTreeMap<String, usize>,
    states: BTreeMap<String, VisitState>,
    components: BTreeMap<String, SchemaObject>,
    origins: BTreeMap<String, String>,
    shapes: BTreeMap<String, String>,
    field_shapes: BTreeMap<String, BTreeMap<String, String>>,
    suppressed: BTreeMap<String, BTreeSet<String>>,
    warnings: Vec<Warning>,
}

impl<'g> SchemaRegistry<'g> {
    /// Creates a registry over a descriptor graph.
    ///
    /// Use counts come from a deterministic pre-pass over every field of
    /// the graph plus every schema use in the route set; they drive the
    /// single-use inline decision.
    pub fn new(graph: &'g TypeGraph, routes: &[RouteDescriptor]) -> Self {
        Self {
            graph,
            use_counts: count_uses(graph, routes),
            states: BTreeMap::new(),
            components: BTreeMap::new(),
            origins: BTreeMap::new(),
            shapes: BTreeMap::new(),
            field_shapes: BTreeMap::new(),
            suppressed: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Resolves a field shape to a schema node, interning named types.
    pub fn resolve_field_type(&mut self, ty: &FieldType, from_package: &str) -> Schema {
        match ty {
            FieldType::String { format } => primitive("string", format.as_deref()),
            FieldType::Integer { format } => primitive("integer", format.as_deref()),
            FieldType::Number { format } => primitive("number", format.as_deref()),
            FieldType::Boolean => Schema::inline(SchemaObject::new("boolean")),
            FieldType::Any => Schema::inline(SchemaObject::default()),
            FieldType::Array(element) => {
                // The items node is exclusively owned by this array schema;
                // interned element types are shared through the component
                // table only, as a fresh reference per site.
                let items = self.resolve_field_type(element, from_package);
                Schema::inline(SchemaObject::new("array").with_items(items))
            }
            FieldType::Named(name) => self.resolve_named(name, from_package),
            FieldType::Object(fields) => {
                Schema::inline(self.build_anonymous_object(fields, from_package))
            }
        }
    }

    /// Resolves a field including its annotations (description, example,
    /// numeric constraints, flags).
    ///
    /// Annotations apply to inline nodes only: a reference node must stay
    /// bare, so annotations on an interned type are dropped at the use site.
    pub fn build_field_schema(&mut self, field: &FieldDescriptor, from_package: &str) -> Schema {
        match self.resolve_field_type(&field.ty, from_package) {
            reference @ Schema::Reference(_) => reference,
            Schema::Inline(mut object) => {
                object.meta.field_name = field.name.clone();
                if field.description.is_some() {
                    object.description = field.description.clone();
                }

                let constraints = &field.constraints;
                if constraints.minimum.is_some() {
                    object.minimum = constraints.minimum;
                }
                if constraints.maximum.is_some() {
                    object.maximum = constraints.maximum;
                }
                if constraints.min_length.is_some() {
                    object.min_length = constraints.min_length;
                }
                if constraints.max_length.is_some() {
                    object.max_length = constraints.max_length;
                }
                if constraints.min_items.is_some() {
                    object.min_items = constraints.min_items;
                }
                if constraints.max_items.is_some() {
                    object.max_items = constraints.max_items;
                }
                if let Some(format) = &constraints.format {
                    object.format = Some(format.clone());
                }
                if let Some(example) = &constraints.example {
                    object.example = Some(example.clone());
                }
                if !constraints.enum_values.is_empty() {
                    object.enum_values = constraints.enum_values.clone();
                }
                if constraints.nullable {
                    object.nullable = true;
                }
                if constraints.deprecated {
                    object.deprecated = true;
                }

                Schema::Inline(object)
            }
        }
    }

    /// Resolves a named type, interning it under its identity.
    pub fn resolve_named(&mut self, name: &str, from_package: &str) -> Schema {
        let graph = self.graph;
        let Some(descriptor) = graph.resolve(name, from_package) else {
            self.warnings.push(Warning::UnknownType {
                name: name.to_string(),
                package: from_package.to_string(),
            });
            return Schema::inline(SchemaObject::new("object"));
        };

        let identity = descriptor.name.clone();
        match self.states.get(&identity) {
            Some(VisitState::InProgress { .. }) => {
                // The type is currently being expanded and refers back to
                // itself, directly or through a chain.
                if let Some(VisitState::InProgress { reentered }) = self.states.get_mut(&identity) {
                    *reentered = true;
                }
                return Schema::reference(&identity);
            }
            Some(VisitState::Registered) => {
                self.check_collision(&identity, descriptor);
                return Schema::reference(&identity);
            }
            Some(VisitState::Inlined(_)) => {
                // A second use site surfaced after the inline decision;
                // promote so this site can hold a reference.
                if let Some(VisitState::Inlined(object)) = self.states.remove(&identity) {
                    self.components.insert(identity.clone(), object);
                }
                self.states.insert(identity.clone(), VisitState::Registered);
                return Schema::reference(&identity);
            }
            None => {}
        }

        self.states
            .insert(identity.clone(), VisitState::InProgress { reentered: false });
        let object = self.build_object_schema(descriptor);
        let reentered = matches!(
            self.states.get(&identity),
            Some(VisitState::InProgress { reentered: true })
        );

        self.origins
            .insert(identity.clone(), descriptor.package.clone());
        self.shapes
            .insert(identity.clone(), structural_signature(descriptor));
        self.field_shapes.insert(
            identity.clone(),
            descriptor
                .fields
                .iter()
                .map(|field| (field.name.clone(), field_signature(field)))
                .collect(),
        );

        let use_count = self.use_counts.get(&identity).copied().unwrap_or(0);
        if !reentered && use_count <= 1 {
            self.states
                .insert(identity, VisitState::Inlined(object.clone()));
            Schema::inline(object)
        } else {
            self.components.insert(identity.clone(), object);
            self.states.insert(identity.clone(), VisitState::Registered);
            Schema::reference(&identity)
        }
    }

    /// Consumes the registry: prunes suppressed fields, re-enforces the
    /// required-subset invariant, and returns the component table plus the
    /// collected warnings.
    pub fn finalize(self) -> (BTreeMap<String, Schema>, Vec<Warning>) {
        let mut schemas = BTreeMap::new();

        for (identity, mut object) in self.components {
            if let Some(dropped) = self.suppressed.get(&identity) {
                object.meta.suppressed = dropped.clone();
                if let Some(properties) = object.properties.take() {
                    let kept: Properties = properties
                        .iter()
                        .filter(|(key, _)| !dropped.contains(*key))
                        .map(|(key, value)| (key.clone(), value.clone()))
                        .collect();
                    object.properties = Some(kept);
                }
            }

            match &object.properties {
                Some(properties) => {
                    object.required.retain(|name| properties.contains_key(name));
                }
                None => object.required.clear(),
            }

            schemas.insert(identity, Schema::Inline(Box::new(object)));
        }

        (schemas, self.warnings)
    }

    fn build_object_schema(&mut self, descriptor: &TypeDescriptor) -> SchemaObject {
        let mut object = SchemaObject::new("object");
        object.meta.id = descriptor.name.clone();
        object.meta.package = descriptor.package.clone();
        object.description = descriptor.description.clone();

        let mut properties = Properties::new();
        let mut required = Vec::new();
        for field in &descriptor.fields {
            if field.required {
                required.push(field.name.clone());
            }
            let schema = self.build_field_schema(field, &descriptor.package);
            properties.set(field.name.clone(), schema);
        }
        object.required = required;
        object.properties = Some(properties);
        object
    }

    fn build_anonymous_object(
        &mut self,
        fields: &[FieldDescriptor],
        from_package: &str,
    ) -> SchemaObject {
        let mut object = SchemaObject::new("object");
        object.meta.id = anonymous_identity(fields);

        let mut properties = Properties::new();
        let mut required = Vec::new();
        for field in fields {
            if field.required {
                required.push(field.name.clone());
            }
            let schema = self.build_field_schema(field, from_package);
            properties.set(field.name.clone(), schema);
        }
        object.required = required;
        object.properties = Some(properties);
        object
    }

    fn check_collision(&mut self, identity: &str, descriptor: &TypeDescriptor) {
        if self.origins.get(identity).map(String::as_str) == Some(descriptor.package.as_str()) {
            return;
        }
        let incoming = structural_signature(descriptor);
        if self.shapes.get(identity) == Some(&incoming) {
            // Identical shape from another package; the shared component fits.
            return;
        }

        let mut offending = Vec::new();
        if let Some(registered_fields) = self.field_shapes.get(identity) {
            for field in &descriptor.fields {
                if let Some(expected) = registered_fields.get(&field.name) {
                    if *expected != field_signature(field) {
                        offending.push(field.name.clone());
                    }
                }
            }
        }

        let set = self.suppressed.entry(identity.to_string()).or_default();
        for name in &offending {
            set.insert(name.clone());
        }

        self.warnings.push(Warning::IdentityCollision {
            identity: identity.to_string(),
            existing_package: self.origins.get(identity).cloned().unwrap_or_default(),
            incoming_package: descriptor.package.clone(),
            suppressed: offending,
        });
    }
}

fn primitive(schema_type: &str, format: Option<&str>) -> Schema {
    let mut object = SchemaObject::new(schema_type);
    object.format = format.map(str::to_string);
    Schema::inline(object)
}

/// Counts named-type use sites across the whole graph and route set.
fn count_uses(graph: &TypeGraph, routes: &[RouteDescriptor]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();

    for descriptor in graph.iter() {
        for field in &descriptor.fields {
            count_field_type(&field.ty, &descriptor.package, graph, &mut counts);
        }
    }

    for route in routes {
        for param in &route.parameters {
            count_field_type(&param.ty, "", graph, &mut counts);
        }
        if let Some(body) = &route.request_body {
            count_field_type(&body.ty, "", graph, &mut counts);
        }
        for response in &route.responses {
            if let Some(ty) = &response.ty {
                count_field_type(ty, "", graph, &mut counts);
            }
            for header in &response.headers {
                count_field_type(&header.ty, "", graph, &mut counts);
            }
        }
    }

    counts
}

fn count_field_type(
    ty: &FieldType,
    from_package: &str,
    graph: &TypeGraph,
    counts: &mut BTreeMap<String, usize>,
) {
    match ty {
        FieldType::Array(element) => count_field_type(element, from_package, graph, counts),
        FieldType::Object(fields) => {
            for field in fields {
                count_field_type(&field.ty, from_package, graph, counts);
            }
        }
        FieldType::Named(name) => {
            if let Some(descriptor) = graph.resolve(name, from_package) {
                *counts.entry(descriptor.name.clone()).or_insert(0) += 1;
            }
        }
        _ => {}
    }
}

/// Deterministic per-field shape token, used for collision comparison.
fn field_signature(field: &FieldDescriptor) -> String {
    format!(
        "{}{}:{}",
        field.name,
        if field.required { "*" } else { "" },
        type_token(&field.ty)
    )
}

fn type_token(ty: &FieldType) -> String {
    match ty {
        FieldType::String { format } => format!("string({})", format.as_deref().unwrap_or("")),
        FieldType::Integer { format } => format!("integer({})", format.as_deref().unwrap_or("")),
        FieldType::Number { format } => format!("number({})", format.as_deref().unwrap_or("")),
        FieldType::Boolean => "boolean".to_string(),
        FieldType::Any => "any".to_string(),
        FieldType::Array(element) => format!("array<{}>", type_token(element)),
        FieldType::Named(name) => format!("ref:{}", name),
        FieldType::Object(fields) => anonymous_identity(fields),
    }
}

/// Structural-signature identity for anonymous inline shapes.
fn anonymous_identity(fields: &[FieldDescriptor]) -> String {
    let inner: Vec<String> = fields.iter().map(field_signature).collect();
    format!("object{{{}}}", inner.join(";"))
}

/// Whole-type signature; field order is irrelevant for shape equality.
fn structural_signature(descriptor: &TypeDescriptor) -> String {
    let mut signatures: Vec<String> = descriptor.fields.iter().map(field_signature).collect();
    signatures.sort();
    format!("{}[{}]", descriptor.name, signatures.join(";"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oas::ParameterLocation;
    use crate::scan::{ParamDescriptor, ResponseDescriptor};
    use pretty_assertions::assert_eq;

    fn named_field(name: &str, target: &str) -> FieldDescriptor {
        FieldDescriptor::new(name, FieldType::Named(target.to_string()))
    }

    fn response_route(path: &str, target: &str) -> RouteDescriptor {
        RouteDescriptor {
            path: path.to_string(),
            method: HttpMethod::Get,
            handler: "handler".to_string(),
            summary: None,
            description: None,
            operation_id: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: vec![ResponseDescriptor {
                status: "200".to_string(),
                description: "ok".to_string(),
                content_type: "application/json".to_string(),
                ty: Some(FieldType::Named(target.to_string())),
                headers: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_self_referential_type_terminates_with_ref() {
        let mut graph = TypeGraph::new();
        graph.insert(TypeDescriptor {
            package: "models".to_string(),
            name: "TreeNode".to_string(),
            description: None,
            fields: vec![
                FieldDescriptor::new("id", FieldType::integer(Some("int64"))),
                FieldDescriptor::new(
                    "children",
                    FieldType::Array(Box::new(FieldType::Named("TreeNode".to_string()))),
                ),
            ],
        });
        let routes = vec![response_route("/tree", "TreeNode")];

        let mut registry = SchemaRegistry::new(&graph, &routes);
        let resolved = registry.resolve_named("TreeNode", "");
        assert_eq!(resolved, Schema::reference("TreeNode"));

        let (schemas, warnings) = registry.finalize();
        assert!(warnings.is_empty());

        let node = schemas["TreeNode"].as_inline().unwrap();
        let children = node.properties.as_ref().unwrap().get("children").unwrap();
        let items = children.as_inline().unwrap().items.as_ref().unwrap();
        assert_eq!(**items, Schema::reference("TreeNode"));
    }

    #[test]
    fn test_mutually_recursive_types_terminate() {
        let mut graph = TypeGraph::new();
        graph.insert(TypeDescriptor {
            package: "models".to_string(),
            name: "Author".to_string(),
            description: None,
            fields: vec![named_field("book", "Book")],
        });
        graph.insert(TypeDescriptor {
            package: "models".to_string(),
            name: "Book".to_string(),
            description: None,
            fields: vec![named_field("author", "Author")],
        });
        let routes = vec![response_route("/authors", "Author")];

        let mut registry = SchemaRegistry::new(&graph, &routes);
        let resolved = registry.resolve_named("Author", "");
        // Author is re-entered through Book, so it must be promoted.
        assert_eq!(resolved, Schema::reference("Author"));

        let (schemas, warnings) = registry.finalize();
        assert!(warnings.is_empty());
        assert!(schemas.contains_key("Author"));

        // Book is single-use and not self-referential: inlined inside Author.
        let author = schemas["Author"].as_inline().unwrap();
        let book = author.properties.as_ref().unwrap().get("book").unwrap();
        let book = book.as_inline().unwrap();
        assert_eq!(
            book.properties.as_ref().unwrap().get("author").unwrap(),
            &Schema::reference("Author")
        );
    }

    #[test]
    fn test_single_use_type_is_inlined() {
        let mut graph = TypeGraph::new();
        graph.insert(TypeDescriptor {
            package: "models".to_string(),
            name: "Address".to_string(),
            description: None,
            fields: vec![FieldDescriptor::new("street", FieldType::string())],
        });
        let routes = vec![response_route("/address", "Address")];

        let mut registry = SchemaRegistry::new(&graph, &routes);
        let resolved = registry.resolve_named("Address", "");
        let object = resolved.as_inline().expect("single-use type inlines");
        assert!(object.properties.as_ref().unwrap().contains_key("street"));

        let (schemas, _) = registry.finalize();
        assert!(schemas.is_empty());
    }

    #[test]
    fn test_multi_use_type_is_promoted() {
        let mut graph = TypeGraph::new();
        graph.insert(TypeDescriptor {
            package: "models".to_string(),
            name: "Item".to_string(),
            description: None,
            fields: vec![FieldDescriptor::new("id", FieldType::integer(Some("int64")))],
        });
        let routes = vec![
            response_route("/items", "Item"),
            response_route("/items/{id}", "Item"),
        ];

        let mut registry = SchemaRegistry::new(&graph, &routes);
        assert_eq!(registry.resolve_named("Item", ""), Schema::reference("Item"));
        assert_eq!(registry.resolve_named("Item", ""), Schema::reference("Item"));

        let (schemas, _) = registry.finalize();
        assert!(schemas.contains_key("Item"));
    }

    #[test]
    fn test_identity_collision_suppresses_conflicting_field() {
        let mut graph = TypeGraph::new();
        graph.insert(TypeDescriptor {
            package: "accounts".to_string(),
            name: "User".to_string(),
            description: None,
            fields: vec![
                FieldDescriptor::new("id", FieldType::integer(Some("int64"))),
                FieldDescriptor::new("name", FieldType::string()),
            ],
        });
        graph.insert(TypeDescriptor {
            package: "billing".to_string(),
            name: "User".to_string(),
            description: None,
            fields: vec![
                FieldDescriptor::new("id", FieldType::string()),
                FieldDescriptor::new("name", FieldType::string()),
            ],
        });
        let routes = vec![
            response_route("/accounts", "accounts::User"),
            response_route("/billing", "billing::User"),
        ];

        let mut registry = SchemaRegistry::new(&graph, &routes);
        registry.resolve_named("accounts::User", "");
        registry.resolve_named("billing::User", "");

        let (schemas, warnings) = registry.finalize();
        assert_eq!(warnings.len(), 1);
        match &warnings[0] {
            Warning::IdentityCollision {
                identity,
                suppressed,
                ..
            } => {
                assert_eq!(identity, "User");
                assert_eq!(suppressed, &vec!["id".to_string()]);
            }
            other => panic!("unexpected warning {:?}", other),
        }

        // The conflicting field is dropped from output, and the required
        // list stays a subset of the surviving properties.
        let user = schemas["User"].as_inline().unwrap();
        let properties = user.properties.as_ref().unwrap();
        assert!(!properties.contains_key("id"));
        assert!(properties.contains_key("name"));
        assert_eq!(user.required, vec!["name".to_string()]);
    }

    #[test]
    fn test_unknown_type_degrades_with_warning() {
        let graph = TypeGraph::new();
        let mut registry = SchemaRegistry::new(&graph, &[]);
        let resolved = registry.resolve_named("Ghost", "");
        assert!(resolved.as_inline().is_some());

        let (_, warnings) = registry.finalize();
        assert_eq!(
            warnings,
            vec![Warning::UnknownType {
                name: "Ghost".to_string(),
                package: String::new(),
            }]
        );
    }

    #[test]
    fn test_identical_runs_produce_identical_components() {
        let mut graph = TypeGraph::new();
        graph.insert(TypeDescriptor {
            package: "models".to_string(),
            name: "Node".to_string(),
            description: None,
            fields: vec![named_field("next", "Node")],
        });
        let routes = vec![response_route("/nodes", "Node")];

        let run = || {
            let mut registry = SchemaRegistry::new(&graph, &routes);
            registry.resolve_named("Node", "");
            let (schemas, _) = registry.finalize();
            serde_json::to_string(&schemas).unwrap()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_parameter_uses_count_toward_promotion() {
        let mut graph = TypeGraph::new();
        graph.insert(TypeDescriptor {
            package: "models".to_string(),
            name: "Filter".to_string(),
            description: None,
            fields: vec![FieldDescriptor::new("q", FieldType::string())],
        });

        let mut route = response_route("/search", "Filter");
        route.parameters.push(ParamDescriptor {
            name: "filter".to_string(),
            location: ParameterLocation::Query,
            ty: FieldType::Named("Filter".to_string()),
            required: false,
            description: None,
            example: None,
        });

        let routes = vec![route];
        let mut registry = SchemaRegistry::new(&graph, &routes);
        assert_eq!(
            registry.resolve_named("Filter", ""),
            Schema::reference("Filter")
        );
    }
}
