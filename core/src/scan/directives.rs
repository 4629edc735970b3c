#![deny(missing_docs)]

//! # Doc-Comment Directives
//!
//! Parses the `@Directive` dialect out of comments: document-level metadata
//! from the main file (`@Title`, `@Server`, `@SecurityScheme`, ...) and
//! per-handler operation descriptions (`@Router`, `@Param`, `@Success`, ...).

use crate::error::AppResult;
use crate::oas::{
    Contact, HttpMethod, Info, License, OAuthFlow, OAuthFlows, ParameterLocation, SecurityScheme,
    Server, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT,
};
use crate::scan::{
    ApiMetadata, BodyDescriptor, FieldType, HeaderDescriptor, ParamDescriptor, ResponseDescriptor,
    RouteDescriptor,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Splits directive arguments into tokens; a quoted run is one token.
fn tokens(text: &str) -> Vec<String> {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    let re = TOKEN_RE.get_or_init(|| Regex::new(r#""([^"]*)"|(\S+)"#).expect("Invalid regex"));

    re.captures_iter(text)
        .filter_map(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
        })
        .collect()
}

/// Splits one comment line into `(keyword, argument-text)` when it is a
/// directive line.
fn parse_directive_line(text: &str) -> Option<(String, String)> {
    let rest = text.trim().strip_prefix('@')?;
    let (keyword, tail) = match rest.split_once(char::is_whitespace) {
        Some((keyword, tail)) => (keyword, tail),
        None => (rest, ""),
    };
    if keyword.is_empty() {
        return None;
    }
    Some((keyword.to_string(), tail.trim().to_string()))
}

/// Extracts `(keyword, argument-text)` pairs from every comment line of a
/// source file.
fn comment_directives(source: &str) -> Vec<(String, String)> {
    source
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            let body = trimmed
                .strip_prefix("//!")
                .or_else(|| trimmed.strip_prefix("///"))
                .or_else(|| trimmed.strip_prefix("//"))?;
            parse_directive_line(body)
        })
        .collect()
}

/// Maps a directive type token to a field shape.
///
/// `[]T` is an array of `T`; unknown tokens are treated as type-graph
/// references.
pub(crate) fn parse_type_token(token: &str) -> FieldType {
    if let Some(element) = token.strip_prefix("[]") {
        return FieldType::Array(Box::new(parse_type_token(element)));
    }
    match token {
        "string" | "str" => FieldType::string(),
        "int" | "integer" => FieldType::integer(None),
        "int32" => FieldType::integer(Some("int32")),
        "int64" | "long" => FieldType::integer(Some("int64")),
        "number" => FieldType::number(None),
        "float" => FieldType::number(Some("float")),
        "double" => FieldType::number(Some("double")),
        "bool" | "boolean" => FieldType::Boolean,
        "uuid" => FieldType::String {
            format: Some("uuid".to_string()),
        },
        "datetime" | "date-time" => FieldType::String {
            format: Some("date-time".to_string()),
        },
        "date" => FieldType::String {
            format: Some("date".to_string()),
        },
        "file" | "binary" => FieldType::String {
            format: Some("binary".to_string()),
        },
        "any" | "object" => FieldType::Any,
        other => FieldType::Named(other.to_string()),
    }
}

/// Parses the document-level metadata directives out of the main file.
pub fn parse_api_metadata(source: &str) -> AppResult<ApiMetadata> {
    let mut info = Info::default();
    let mut contact = Contact::default();
    let mut license = License::default();
    let mut description_lines: Vec<String> = Vec::new();
    let mut metadata = ApiMetadata::default();

    for (keyword, text) in comment_directives(source) {
        match keyword.as_str() {
            "Title" => info.title = text,
            "Version" => info.version = text,
            "Description" => description_lines.push(text),
            "TermsOfServiceURL" => info.terms_of_service = Some(text),
            "ContactName" => contact.name = Some(text),
            "ContactEmail" => contact.email = Some(text),
            "ContactURL" => contact.url = Some(text),
            "LicenseName" => license.name = Some(text),
            "LicenseURL" => license.url = Some(text),
            "Server" => {
                let args = tokens(&text);
                if let Some(url) = args.first() {
                    metadata.servers.push(Server {
                        url: url.clone(),
                        description: join_description(&args[1..]),
                    });
                }
            }
            "Security" => {
                let args = tokens(&text);
                if let Some(name) = args.first() {
                    let mut requirement = BTreeMap::new();
                    requirement.insert(name.clone(), args[1..].to_vec());
                    metadata.security.push(requirement);
                }
            }
            "SecurityScheme" => parse_security_scheme(&tokens(&text), &mut metadata),
            "SecurityScope" => {
                let args = tokens(&text);
                if args.len() >= 2 {
                    metadata
                        .security_scopes
                        .entry(args[0].clone())
                        .or_default()
                        .insert(args[1].clone(), args[2..].join(" "));
                }
            }
            _ => {}
        }
    }

    if !description_lines.is_empty() {
        info.description = Some(description_lines.join("\n"));
    }
    if !contact.is_unset() {
        info.contact = Some(contact);
    }
    if !license.is_unset() {
        info.license = Some(license);
    }
    metadata.info = info;

    Ok(metadata)
}

/// `@SecurityScheme <name> <kind> <args...> [description...]`
///
/// Kinds: `apiKey <in> <param-name>`, `http <scheme>`, `openIdConnect <url>`,
/// `oauth2Implicit <authorizationUrl>`,
/// `oauth2AuthorizationCode <authorizationUrl> <tokenUrl>`,
/// `oauth2Password <tokenUrl>`, `oauth2ClientCredentials <tokenUrl>`.
/// Several oauth2 directives under one name merge into one scheme.
fn parse_security_scheme(args: &[String], metadata: &mut ApiMetadata) {
    let (Some(name), Some(kind)) = (args.first(), args.get(1)) else {
        return;
    };

    match kind.as_str() {
        "apiKey" => {
            if let (Some(location), Some(param_name)) = (args.get(2), args.get(3)) {
                let mut scheme = SecurityScheme::new("apiKey");
                scheme.location = Some(location.clone());
                scheme.name = Some(param_name.clone());
                scheme.description = join_description(&args[4..]);
                metadata.security_schemes.insert(name.clone(), scheme);
            }
        }
        "http" => {
            if let Some(http_scheme) = args.get(2) {
                let mut scheme = SecurityScheme::new("http");
                scheme.scheme = Some(http_scheme.clone());
                scheme.description = join_description(&args[3..]);
                metadata.security_schemes.insert(name.clone(), scheme);
            }
        }
        "openIdConnect" => {
            if let Some(url) = args.get(2) {
                let mut scheme = SecurityScheme::new("openIdConnect");
                scheme.open_id_connect_url = Some(url.clone());
                scheme.description = join_description(&args[3..]);
                metadata.security_schemes.insert(name.clone(), scheme);
            }
        }
        "oauth2Implicit" => {
            if let Some(url) = args.get(2) {
                let flows = oauth_flows(metadata, name);
                flows.implicit = Some(OAuthFlow {
                    authorization_url: Some(url.clone()),
                    ..OAuthFlow::default()
                });
            }
        }
        "oauth2AuthorizationCode" => {
            if let (Some(auth_url), Some(token_url)) = (args.get(2), args.get(3)) {
                let flows = oauth_flows(metadata, name);
                flows.authorization_code = Some(OAuthFlow {
                    authorization_url: Some(auth_url.clone()),
                    token_url: Some(token_url.clone()),
                    ..OAuthFlow::default()
                });
            }
        }
        "oauth2Password" => {
            if let Some(token_url) = args.get(2) {
                let flows = oauth_flows(metadata, name);
                flows.password = Some(OAuthFlow {
                    token_url: Some(token_url.clone()),
                    ..OAuthFlow::default()
                });
            }
        }
        "oauth2ClientCredentials" => {
            if let Some(token_url) = args.get(2) {
                let flows = oauth_flows(metadata, name);
                flows.client_credentials = Some(OAuthFlow {
                    token_url: Some(token_url.clone()),
                    ..OAuthFlow::default()
                });
            }
        }
        _ => {}
    }
}

/// Returns the flow block of the named oauth2 scheme, creating the scheme
/// on first sight.
fn oauth_flows<'m>(metadata: &'m mut ApiMetadata, name: &str) -> &'m mut OAuthFlows {
    let scheme = metadata
        .security_schemes
        .entry(name.to_string())
        .or_insert_with(|| SecurityScheme::new("oauth2"));
    scheme.flows.get_or_insert_with(OAuthFlows::default)
}

fn join_description(args: &[String]) -> Option<String> {
    if args.is_empty() {
        None
    } else {
        Some(args.join(" "))
    }
}

/// Parses the operation directives of one handler's doc comment.
///
/// Returns `None` when the comment carries no `@Router` line — the function
/// is then not a handler.
pub fn parse_operation(doc: &str, handler: &str) -> AppResult<Option<RouteDescriptor>> {
    let mut route: Option<(String, HttpMethod)> = None;
    let mut summary = None;
    let mut description_lines: Vec<String> = Vec::new();
    let mut tags = Vec::new();
    let mut operation_id = None;
    let mut parameters = Vec::new();
    let mut request_body = None;
    let mut responses: Vec<ResponseDescriptor> = Vec::new();
    let mut pending_headers: Vec<(String, HeaderDescriptor)> = Vec::new();

    for line in doc.lines() {
        let Some((keyword, text)) = parse_directive_line(line) else {
            continue;
        };
        match keyword.as_str() {
            "Title" | "Summary" => summary = Some(text),
            "Description" => description_lines.push(text),
            "Tag" | "Resource" => tags.push(text),
            "OperationId" => operation_id = Some(text),
            "Router" => route = parse_router(&tokens(&text)),
            "Param" => {
                parse_param(&tokens(&text), &mut parameters, &mut request_body);
            }
            "Success" | "Failure" => {
                if let Some(response) = parse_response(&tokens(&text)) {
                    responses.push(response);
                }
            }
            "Header" => {
                if let Some((status, header)) = parse_header(&tokens(&text)) {
                    pending_headers.push((status, header));
                }
            }
            _ => {}
        }
    }

    let Some((path, method)) = route else {
        return Ok(None);
    };

    // Attach headers to their response by status, creating a bodiless
    // response when the status was never declared.
    for (status, header) in pending_headers {
        if let Some(response) = responses.iter_mut().find(|r| r.status == status) {
            response.headers.push(header);
            continue;
        }
        responses.push(ResponseDescriptor {
            status,
            description: String::new(),
            content_type: CONTENT_TYPE_JSON.to_string(),
            ty: None,
            headers: vec![header],
        });
    }

    Ok(Some(RouteDescriptor {
        path,
        method,
        handler: handler.to_string(),
        summary,
        description: if description_lines.is_empty() {
            None
        } else {
            Some(description_lines.join("\n"))
        },
        operation_id,
        tags,
        parameters,
        request_body,
        responses,
    }))
}

/// `@Router /items/{id} [get]`
fn parse_router(args: &[String]) -> Option<(String, HttpMethod)> {
    let path = args.first()?;
    let method_token = args.get(1)?;
    let method = method_token
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .ok()?;
    Some((path.clone(), method))
}

/// `@Param <name> <in> <type> <required> ["description"]`
///
/// `in` values `body` and `formData` describe the request body rather than
/// a parameter.
fn parse_param(
    args: &[String],
    parameters: &mut Vec<ParamDescriptor>,
    request_body: &mut Option<BodyDescriptor>,
) {
    let (Some(name), Some(location), Some(type_token), Some(required_token)) =
        (args.first(), args.get(1), args.get(2), args.get(3))
    else {
        return;
    };

    let ty = parse_type_token(type_token);
    let required = matches!(required_token.as_str(), "true" | "required");
    let description = join_description(&args[4..]);

    match location.as_str() {
        "body" => {
            *request_body = Some(BodyDescriptor {
                ty,
                content_type: CONTENT_TYPE_JSON.to_string(),
                description,
                required,
            });
        }
        "form" | "formData" => {
            *request_body = Some(BodyDescriptor {
                ty,
                content_type: crate::oas::CONTENT_TYPE_FORM.to_string(),
                description,
                required,
            });
        }
        other => {
            let Ok(location) = other.parse::<ParameterLocation>() else {
                return;
            };
            parameters.push(ParamDescriptor {
                name: name.clone(),
                location,
                ty,
                required,
                description,
                example: None,
            });
        }
    }
}

/// `@Success <status> {<kind>} [type] ["description"]`
///
/// Kinds `object` and `array` take a type token; primitive kinds and
/// `empty` do not.
fn parse_response(args: &[String]) -> Option<ResponseDescriptor> {
    let status = args.first()?;
    let kind = args.get(1)?.trim_start_matches('{').trim_end_matches('}');

    let (ty, content_type, rest) = match kind {
        "object" => {
            let ty = parse_type_token(args.get(2)?);
            (Some(ty), CONTENT_TYPE_JSON, &args[3..])
        }
        "array" => {
            let element = parse_type_token(args.get(2)?);
            (
                Some(FieldType::Array(Box::new(element))),
                CONTENT_TYPE_JSON,
                &args[3..],
            )
        }
        "string" => (Some(FieldType::string()), CONTENT_TYPE_TEXT, &args[2..]),
        "integer" | "int" => (
            Some(FieldType::integer(None)),
            CONTENT_TYPE_TEXT,
            &args[2..],
        ),
        "number" => (Some(FieldType::number(None)), CONTENT_TYPE_TEXT, &args[2..]),
        "boolean" | "bool" => (Some(FieldType::Boolean), CONTENT_TYPE_TEXT, &args[2..]),
        "empty" => (None, CONTENT_TYPE_JSON, &args[2..]),
        _ => return None,
    };

    Some(ResponseDescriptor {
        status: status.clone(),
        description: rest.join(" "),
        content_type: content_type.to_string(),
        ty,
        headers: Vec::new(),
    })
}

/// `@Header <status> {<kind>} <name> ["description"]`
fn parse_header(args: &[String]) -> Option<(String, HeaderDescriptor)> {
    let status = args.first()?;
    let kind = args.get(1)?.trim_start_matches('{').trim_end_matches('}');
    let name = args.get(2)?;

    Some((
        status.clone(),
        HeaderDescriptor {
            name: name.clone(),
            ty: parse_type_token(kind),
            description: join_description(&args[3..]),
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokens_keep_quoted_runs_together() {
        let parsed = tokens(r#"id path int true "The item id""#);
        assert_eq!(parsed, vec!["id", "path", "int", "true", "The item id"]);
    }

    #[test]
    fn test_parse_api_metadata() {
        let source = r#"
// @Title Items API
// @Version 1.2.3
// @Description Item catalogue service.
// @ContactName API Team
// @LicenseName MIT
// @Server https://api.example.com production
// @Security OAuth2 read
// @SecurityScheme ApiKeyAuth apiKey header X-API-Key
// @SecurityScheme OAuth2 oauth2AuthorizationCode https://example.com/auth https://example.com/token
// @SecurityScope OAuth2 read read access
fn main() {}
"#;
        let metadata = parse_api_metadata(source).unwrap();
        assert_eq!(metadata.info.title, "Items API");
        assert_eq!(metadata.info.version, "1.2.3");
        assert_eq!(
            metadata.info.description.as_deref(),
            Some("Item catalogue service.")
        );
        assert_eq!(
            metadata.info.contact.as_ref().unwrap().name.as_deref(),
            Some("API Team")
        );
        assert_eq!(metadata.servers.len(), 1);
        assert_eq!(metadata.servers[0].url, "https://api.example.com");
        assert_eq!(metadata.security.len(), 1);
        assert_eq!(metadata.security[0]["OAuth2"], vec!["read"]);

        let api_key = &metadata.security_schemes["ApiKeyAuth"];
        assert_eq!(api_key.scheme_type, "apiKey");
        assert_eq!(api_key.name.as_deref(), Some("X-API-Key"));

        let oauth = &metadata.security_schemes["OAuth2"];
        assert_eq!(oauth.scheme_type, "oauth2");
        assert!(oauth
            .flows
            .as_ref()
            .unwrap()
            .authorization_code
            .is_some());
        assert_eq!(
            metadata.security_scopes["OAuth2"]["read"],
            "read access".to_string()
        );
    }

    #[test]
    fn test_parse_operation_full() {
        let doc = r#"@Title Get item
@Description Returns one item.
@Tag items
@Param id path int true "The item id"
@Success 200 {object} Item "The item"
@Failure 404 {empty} "Not found"
@Header 200 {string} X-Request-Id "Correlation id"
@Router /items/{id} [get]"#;

        let route = parse_operation(doc, "get_item").unwrap().unwrap();
        assert_eq!(route.path, "/items/{id}");
        assert_eq!(route.method, HttpMethod::Get);
        assert_eq!(route.handler, "get_item");
        assert_eq!(route.summary.as_deref(), Some("Get item"));
        assert_eq!(route.tags, vec!["items"]);

        assert_eq!(route.parameters.len(), 1);
        assert_eq!(route.parameters[0].name, "id");
        assert_eq!(route.parameters[0].location, ParameterLocation::Path);
        assert!(route.parameters[0].required);

        assert_eq!(route.responses.len(), 2);
        assert_eq!(route.responses[0].status, "200");
        assert_eq!(route.responses[0].ty, Some(FieldType::Named("Item".into())));
        assert_eq!(route.responses[0].headers.len(), 1);
        assert_eq!(route.responses[0].headers[0].name, "X-Request-Id");
        assert_eq!(route.responses[1].status, "404");
        assert_eq!(route.responses[1].ty, None);
    }

    #[test]
    fn test_parse_operation_without_router_is_not_a_handler() {
        let doc = "@Title Not a route";
        assert!(parse_operation(doc, "helper").unwrap().is_none());
    }

    #[test]
    fn test_body_param_becomes_request_body() {
        let doc = r#"@Param payload body CreateItem true "New item"
@Success 201 {object} Item
@Router /items [post]"#;

        let route = parse_operation(doc, "create_item").unwrap().unwrap();
        assert!(route.parameters.is_empty());
        let body = route.request_body.unwrap();
        assert_eq!(body.ty, FieldType::Named("CreateItem".into()));
        assert_eq!(body.content_type, CONTENT_TYPE_JSON);
        assert!(body.required);
    }

    #[test]
    fn test_array_type_token() {
        assert_eq!(
            parse_type_token("[]int64"),
            FieldType::Array(Box::new(FieldType::integer(Some("int64"))))
        );
    }

    #[test]
    fn test_array_response() {
        let parsed = parse_response(&tokens(r#"200 {array} Item "All items""#)).unwrap();
        assert_eq!(
            parsed.ty,
            Some(FieldType::Array(Box::new(FieldType::Named("Item".into()))))
        );
        assert_eq!(parsed.description, "All items");
    }
}
