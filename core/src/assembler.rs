#![deny(missing_docs)]

//! # Document Assembler
//!
//! Merges the scanned routes into path items, resolves every schema use
//! through the registry, builds the security-scheme table, and produces the
//! single top-level document handed to the serializer. Nodes are immutable
//! from that point on.

use crate::error::AppResult;
use crate::oas::{
    Components, Header, Headers, MediaType, OpenApiDocument, Operation, Parameter,
    ParameterLocation, ParameterObject, PathItem, RequestBody, RequestBodyObject, Response,
    ResponseObject,
};
use crate::registry::{SchemaRegistry, Warning};
use crate::scan::{RouteDescriptor, ScanResult};
use std::collections::BTreeMap;

/// Assembles the final document from a scan.
///
/// Warnings report recoverable degradations (identity collisions, duplicate
/// operations, unknown types); the document itself is always produced.
pub fn assemble(scan: &ScanResult) -> AppResult<(OpenApiDocument, Vec<Warning>)> {
    let mut registry = SchemaRegistry::new(&scan.graph, &scan.routes);
    let mut warnings = Vec::new();

    // 1. Routes -> path items. First registration of a path + method wins.
    let mut paths: BTreeMap<String, PathItem> = BTreeMap::new();
    for route in &scan.routes {
        let operation = build_operation(route, &mut registry);
        let item = paths.entry(route.path.clone()).or_default();
        if !item.set_operation(route.method, operation) {
            warnings.push(Warning::DuplicateOperation {
                path: route.path.clone(),
                method: route.method,
            });
        }
    }

    // 2. Promote everything the registry decided to share.
    let (schemas, registry_warnings) = registry.finalize();
    warnings.extend(registry_warnings);

    // 3. Security schemes, with the scope broadcast applied to every flow
    //    variant that is present.
    let mut security_schemes = scan.metadata.security_schemes.clone();
    for (name, scopes) in &scan.metadata.security_scopes {
        if let Some(scheme) = security_schemes.get_mut(name) {
            if let Some(flows) = scheme.flows.as_mut() {
                flows.apply_scopes(scopes);
            }
        }
    }

    let mut document = OpenApiDocument::new(scan.metadata.info.clone());
    document.servers = scan.metadata.servers.clone();
    document.paths = paths;
    document.components = Components {
        schemas,
        security_schemes,
    };
    document.security = scan.metadata.security.clone();

    Ok((document, warnings))
}

fn build_operation(route: &RouteDescriptor, registry: &mut SchemaRegistry<'_>) -> Operation {
    let mut operation = Operation {
        summary: route.summary.clone(),
        description: route.description.clone(),
        tags: route.tags.clone(),
        operation_id: route.operation_id.clone().or_else(|| {
            if route.handler.is_empty() {
                None
            } else {
                Some(route.handler.clone())
            }
        }),
        ..Operation::default()
    };

    for param in &route.parameters {
        let schema = registry.resolve_field_type(&param.ty, "");
        operation
            .parameters
            .push(Parameter::Inline(Box::new(ParameterObject {
                name: param.name.clone(),
                location: param.location,
                description: param.description.clone(),
                // The format requires path parameters to be mandatory.
                required: param.required || param.location == ParameterLocation::Path,
                example: param.example.clone(),
                schema: Some(schema),
            })));
    }

    if let Some(body) = &route.request_body {
        let schema = registry.resolve_field_type(&body.ty, "");
        let mut content = BTreeMap::new();
        content.insert(body.content_type.clone(), MediaType { schema });
        operation.request_body = Some(RequestBody::Inline(RequestBodyObject {
            content,
            description: body.description.clone(),
            required: body.required,
        }));
    }

    for response in &route.responses {
        let mut built = ResponseObject {
            description: response.description.clone(),
            ..ResponseObject::default()
        };
        if let Some(ty) = &response.ty {
            let schema = registry.resolve_field_type(ty, "");
            built
                .content
                .insert(response.content_type.clone(), MediaType { schema });
        }
        if !response.headers.is_empty() {
            let mut headers = Headers::new();
            for header in &response.headers {
                headers.set(
                    header.name.clone(),
                    Header {
                        schema: Some(registry.resolve_field_type(&header.ty, "")),
                        description: header.description.clone(),
                    },
                );
            }
            built.headers = Some(headers);
        }
        operation
            .responses
            .insert(response.status.clone(), Response::Inline(built));
    }

    operation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oas::HttpMethod;
    use crate::scan::{
        ApiMetadata, FieldDescriptor, FieldType, HeaderDescriptor, ParamDescriptor,
        ResponseDescriptor, TypeDescriptor, TypeGraph,
    };
    use pretty_assertions::assert_eq;

    fn route(path: &str, method: HttpMethod) -> RouteDescriptor {
        RouteDescriptor {
            path: path.to_string(),
            method,
            handler: "handler".to_string(),
            summary: None,
            description: None,
            operation_id: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: Vec::new(),
        }
    }

    fn scan_with(graph: TypeGraph, routes: Vec<RouteDescriptor>) -> ScanResult {
        ScanResult {
            metadata: ApiMetadata::default(),
            graph,
            routes,
        }
    }

    #[test]
    fn test_duplicate_operation_keeps_first_and_warns() {
        let mut first = route("/items", HttpMethod::Get);
        first.operation_id = Some("first".to_string());
        let mut second = route("/items", HttpMethod::Get);
        second.operation_id = Some("second".to_string());

        let scan = scan_with(TypeGraph::new(), vec![first, second]);
        let (document, warnings) = assemble(&scan).unwrap();

        let item = &document.paths["/items"];
        assert_eq!(
            item.operation(HttpMethod::Get)
                .unwrap()
                .operation_id
                .as_deref(),
            Some("first")
        );
        assert_eq!(
            warnings,
            vec![Warning::DuplicateOperation {
                path: "/items".to_string(),
                method: HttpMethod::Get,
            }]
        );
    }

    #[test]
    fn test_path_parameters_are_forced_required() {
        let mut r = route("/items/{id}", HttpMethod::Get);
        r.parameters.push(ParamDescriptor {
            name: "id".to_string(),
            location: ParameterLocation::Path,
            ty: FieldType::integer(Some("int64")),
            required: false,
            description: None,
            example: None,
        });

        let scan = scan_with(TypeGraph::new(), vec![r]);
        let (document, _) = assemble(&scan).unwrap();
        let operation = document.paths["/items/{id}"]
            .operation(HttpMethod::Get)
            .unwrap();
        match &operation.parameters[0] {
            Parameter::Inline(param) => assert!(param.required),
            Parameter::Reference(_) => panic!("expected inline parameter"),
        }
    }

    #[test]
    fn test_response_headers_keep_declaration_order() {
        let mut r = route("/items", HttpMethod::Get);
        r.responses.push(ResponseDescriptor {
            status: "200".to_string(),
            description: "ok".to_string(),
            content_type: "application/json".to_string(),
            ty: None,
            headers: vec![
                HeaderDescriptor {
                    name: "X-Rate-Limit".to_string(),
                    ty: FieldType::integer(None),
                    description: None,
                },
                HeaderDescriptor {
                    name: "X-Request-Id".to_string(),
                    ty: FieldType::string(),
                    description: None,
                },
            ],
        });

        let scan = scan_with(TypeGraph::new(), vec![r]);
        let (document, _) = assemble(&scan).unwrap();
        let operation = document.paths["/items"].operation(HttpMethod::Get).unwrap();
        let Response::Inline(response) = &operation.responses["200"] else {
            panic!("expected inline response");
        };
        let keys: Vec<&str> = response
            .headers
            .as_ref()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["X-Rate-Limit", "X-Request-Id"]);
    }

    #[test]
    fn test_scope_broadcast_reaches_present_flows_only() {
        use crate::oas::{OAuthFlow, OAuthFlows, SecurityScheme};
        use std::collections::BTreeMap;

        let mut metadata = ApiMetadata::default();
        let mut scheme = SecurityScheme::new("oauth2");
        scheme.flows = Some(OAuthFlows {
            authorization_code: Some(OAuthFlow {
                authorization_url: Some("https://example.com/auth".into()),
                token_url: Some("https://example.com/token".into()),
                scopes: BTreeMap::new(),
            }),
            ..OAuthFlows::default()
        });
        metadata.security_schemes.insert("OAuth2".to_string(), scheme);
        metadata
            .security_scopes
            .entry("OAuth2".to_string())
            .or_default()
            .insert("read".to_string(), "read access".to_string());

        let scan = ScanResult {
            metadata,
            graph: TypeGraph::new(),
            routes: Vec::new(),
        };
        let (document, _) = assemble(&scan).unwrap();
        let flows = document.components.security_schemes["OAuth2"]
            .flows
            .as_ref()
            .unwrap();
        assert_eq!(
            flows
                .authorization_code
                .as_ref()
                .unwrap()
                .scopes
                .get("read")
                .map(String::as_str),
            Some("read access")
        );
        assert!(flows.implicit.is_none());
        assert!(flows.password.is_none());
        assert!(flows.client_credentials.is_none());
    }

    #[test]
    fn test_schemas_promoted_during_assembly_land_in_components() {
        let mut graph = TypeGraph::new();
        graph.insert(TypeDescriptor {
            package: "models".to_string(),
            name: "Item".to_string(),
            description: None,
            fields: vec![FieldDescriptor::new("id", FieldType::integer(Some("int64")))],
        });

        let mut list = route("/items", HttpMethod::Get);
        list.responses.push(ResponseDescriptor {
            status: "200".to_string(),
            description: "ok".to_string(),
            content_type: "application/json".to_string(),
            ty: Some(FieldType::Array(Box::new(FieldType::Named(
                "Item".to_string(),
            )))),
            headers: Vec::new(),
        });
        let mut get = route("/items/{id}", HttpMethod::Get);
        get.responses.push(ResponseDescriptor {
            status: "200".to_string(),
            description: "ok".to_string(),
            content_type: "application/json".to_string(),
            ty: Some(FieldType::Named("Item".to_string())),
            headers: Vec::new(),
        });

        let scan = scan_with(graph, vec![list, get]);
        let (document, warnings) = assemble(&scan).unwrap();
        assert!(warnings.is_empty());
        assert!(document.components.schemas.contains_key("Item"));
    }
}
