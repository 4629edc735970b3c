#![deny(missing_docs)]

//! # Source Extraction
//!
//! Parses Rust source files with the rust-analyzer syntax library. Record
//! structs become type descriptors (fields in declaration order, doc
//! comments, `serde`/`oai` attributes honored); functions whose doc comment
//! carries a `@Router` directive become route descriptors.

use crate::error::{AppError, AppResult};
use crate::scan::{directives, FieldConstraints, FieldDescriptor, FieldType, RouteDescriptor, TypeDescriptor};
use ra_ap_edition::Edition;
use ra_ap_syntax::ast::{self, HasGenericArgs, HasName};
use ra_ap_syntax::{AstNode, SourceFile, SyntaxKind, SyntaxNode};
use regex::Regex;
use std::sync::OnceLock;

/// A field type plus the `Option`-derived optionality marker.
struct MappedType {
    ty: FieldType,
    optional: bool,
}

/// Helper struct for attributes extracted from a single node.
#[derive(Default)]
struct AttrInfo {
    rename: Option<String>,
    is_skipped: bool,
    constraints: FieldConstraints,
}

/// Extracts a type descriptor for every record struct in the source text.
///
/// Tuple and unit structs carry no named fields and are skipped. Fields of
/// unsupported type shapes degrade to the `any` shape instead of failing
/// the whole scan.
pub(crate) fn extract_types(code: &str, package: &str) -> AppResult<Vec<TypeDescriptor>> {
    let parse = SourceFile::parse(code, Edition::Edition2021);
    let file = parse.tree();
    let mut types = Vec::new();

    for node in file.syntax().descendants() {
        let Some(struct_def) = ast::Struct::cast(node) else {
            continue;
        };
        let Some(name) = struct_def.name() else {
            continue;
        };
        let Some(ast::FieldList::RecordFieldList(list)) = struct_def.field_list() else {
            continue;
        };

        let mut fields = Vec::new();
        for field in list.fields() {
            let (Some(field_name), Some(ty)) = (field.name(), field.ty()) else {
                continue;
            };
            let attrs = extract_attributes(field.syntax());
            if attrs.is_skipped {
                continue;
            }

            let mapped = map_ast_type(&ty).unwrap_or(MappedType {
                ty: FieldType::Any,
                optional: false,
            });
            let wire_name = attrs
                .rename
                .clone()
                .unwrap_or_else(|| field_name.text().to_string());

            fields.push(FieldDescriptor {
                name: wire_name,
                ty: mapped.ty,
                required: !mapped.optional,
                description: extract_doc_comment(field.syntax()),
                constraints: attrs.constraints,
            });
        }

        types.push(TypeDescriptor {
            package: package.to_string(),
            name: name.text().to_string(),
            description: extract_doc_comment(struct_def.syntax()),
            fields,
        });
    }

    Ok(types)
}

/// Extracts a route descriptor for every function whose doc comment holds a
/// `@Router` directive.
pub(crate) fn extract_routes(code: &str) -> AppResult<Vec<RouteDescriptor>> {
    let parse = SourceFile::parse(code, Edition::Edition2021);
    let file = parse.tree();
    let mut routes = Vec::new();

    for node in file.syntax().descendants() {
        let Some(fn_def) = ast::Fn::cast(node) else {
            continue;
        };
        let Some(name) = fn_def.name() else {
            continue;
        };
        let Some(doc) = extract_doc_comment(fn_def.syntax()) else {
            continue;
        };
        let handler = name.text().to_string();
        if let Some(route) = directives::parse_operation(&doc, &handler)? {
            routes.push(route);
        }
    }

    Ok(routes)
}

/// Helper to extract `///` comments from a syntax node's trivia children.
fn extract_doc_comment(node: &SyntaxNode) -> Option<String> {
    let mut lines = Vec::new();

    for child in node.children_with_tokens() {
        if child.kind() == SyntaxKind::COMMENT {
            let text = child.to_string();
            if let Some(content) = text.strip_prefix("///") {
                let content = content.strip_prefix(' ').unwrap_or(content);
                lines.push(content.to_string());
            }
        }
    }

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n").trim().to_string())
    }
}

/// Maps an AST type node to a field shape.
fn map_ast_type(ty: &ast::Type) -> AppResult<MappedType> {
    match ty {
        ast::Type::PathType(path_type) => {
            let path = path_type
                .path()
                .ok_or_else(|| AppError::General("Empty path".into()))?;
            let segment = path
                .segment()
                .ok_or_else(|| AppError::General("Empty segment".into()))?;
            let name_ref = segment
                .name_ref()
                .ok_or_else(|| AppError::General("No type name".into()))?;
            let name = name_ref.text();

            let simple = |ty: FieldType| {
                Ok(MappedType {
                    ty,
                    optional: false,
                })
            };

            match name.as_str() {
                // Primitives
                "String" | "str" | "char" => simple(FieldType::string()),
                "bool" => simple(FieldType::Boolean),
                "i8" | "i16" | "i32" | "u8" | "u16" | "u32" => {
                    simple(FieldType::integer(Some("int32")))
                }
                "i64" | "i128" | "isize" | "u64" | "u128" | "usize" => {
                    simple(FieldType::integer(Some("int64")))
                }
                "f32" => simple(FieldType::number(Some("float"))),
                "f64" => simple(FieldType::number(Some("double"))),

                // Format registry
                "Uuid" => simple(FieldType::String {
                    format: Some("uuid".to_string()),
                }),
                "NaiveDateTime" | "DateTime" => simple(FieldType::String {
                    format: Some("date-time".to_string()),
                }),
                "NaiveDate" => simple(FieldType::String {
                    format: Some("date".to_string()),
                }),

                // Untyped JSON
                "Value" => simple(FieldType::Any),

                // Containers
                "Option" => {
                    let inner = generic_inner(&segment)?;
                    Ok(MappedType {
                        ty: inner.ty,
                        optional: true,
                    })
                }
                "Vec" => {
                    let inner = generic_inner(&segment)?;
                    Ok(MappedType {
                        ty: FieldType::Array(Box::new(inner.ty)),
                        optional: false,
                    })
                }

                // User-defined types become graph references
                other => simple(FieldType::Named(other.to_string())),
            }
        }
        // Reference types (e.g. &str) map like their pointee
        ast::Type::RefType(ref_type) => {
            let inner = ref_type
                .ty()
                .ok_or_else(|| AppError::General("Invalid reference".into()))?;
            map_ast_type(&inner)
        }
        _ => Err(AppError::General(format!(
            "Unsupported type structure: {:?}",
            ty
        ))),
    }
}

/// Helper to handle types like `Option<T>` or `Vec<T>`.
fn generic_inner(segment: &ast::PathSegment) -> AppResult<MappedType> {
    let generic_args = segment
        .generic_arg_list()
        .ok_or_else(|| AppError::General("Missing generic arguments for container type".into()))?;

    let first_arg = generic_args
        .generic_args()
        .next()
        .ok_or_else(|| AppError::General("Generic list empty".into()))?;

    match first_arg {
        ast::GenericArg::TypeArg(type_arg) => {
            let inner_ty = type_arg
                .ty()
                .ok_or_else(|| AppError::General("Invalid generic type".into()))?;
            map_ast_type(&inner_ty)
        }
        _ => Err(AppError::General(
            "Unsupported generic argument type".into(),
        )),
    }
}

/// Analyzes attributes on a node: `serde`/`oai` renames and skips, `oai`
/// constraint annotations, and the standalone `#[deprecated]` marker.
fn extract_attributes(node: &SyntaxNode) -> AttrInfo {
    let mut info = AttrInfo::default();

    let attributes = node.children().filter_map(ast::Attr::cast);

    for attr in attributes {
        let Some(meta) = attr.meta() else { continue };
        let Some(path) = meta.path() else { continue };
        let ident = path.to_string();

        if ident == "deprecated" {
            info.constraints.deprecated = true;
            continue;
        }

        if ident == "serde" || ident == "oai" {
            if let Some(tt) = meta.token_tree() {
                parse_attribute_content(&tt.to_string(), &mut info);
            }
        }
    }

    info
}

/// Parses the inner content of an attribute (e.g. `(rename = "foo", skip,
/// minimum = 0)`). Uses regex to find keys safely.
fn parse_attribute_content(content: &str, info: &mut AttrInfo) {
    static RENAME_RE: OnceLock<Regex> = OnceLock::new();
    let rename_re =
        RENAME_RE.get_or_init(|| Regex::new(r#"rename\s*=\s*"([^"]+)""#).expect("Invalid regex"));

    static SKIP_RE: OnceLock<Regex> = OnceLock::new();
    let skip_re = SKIP_RE.get_or_init(|| Regex::new(r"\bskip\b").expect("Invalid regex"));

    static BOUND_RE: OnceLock<Regex> = OnceLock::new();
    let bound_re = BOUND_RE.get_or_init(|| {
        Regex::new(r"\b(minimum|maximum|min_length|max_length|min_items|max_items)\s*=\s*(-?\d+)")
            .expect("Invalid regex")
    });

    static FORMAT_RE: OnceLock<Regex> = OnceLock::new();
    let format_re =
        FORMAT_RE.get_or_init(|| Regex::new(r#"format\s*=\s*"([^"]+)""#).expect("Invalid regex"));

    static EXAMPLE_RE: OnceLock<Regex> = OnceLock::new();
    let example_re = EXAMPLE_RE
        .get_or_init(|| Regex::new(r#"example\s*=\s*"([^"]*)""#).expect("Invalid regex"));

    static NULLABLE_RE: OnceLock<Regex> = OnceLock::new();
    let nullable_re = NULLABLE_RE.get_or_init(|| Regex::new(r"\bnullable\b").expect("Invalid regex"));

    if let Some(caps) = rename_re.captures(content) {
        if let Some(val) = caps.get(1) {
            info.rename = Some(val.as_str().to_string());
        }
    }

    if skip_re.is_match(content) {
        info.is_skipped = true;
    }

    for caps in bound_re.captures_iter(content) {
        let value: i64 = match caps[2].parse() {
            Ok(value) => value,
            Err(_) => continue,
        };
        let slot = match &caps[1] {
            "minimum" => &mut info.constraints.minimum,
            "maximum" => &mut info.constraints.maximum,
            "min_length" => &mut info.constraints.min_length,
            "max_length" => &mut info.constraints.max_length,
            "min_items" => &mut info.constraints.min_items,
            _ => &mut info.constraints.max_items,
        };
        *slot = Some(value);
    }

    if let Some(caps) = format_re.captures(content) {
        info.constraints.format = Some(caps[1].to_string());
    }

    if let Some(caps) = example_re.captures(content) {
        let raw = &caps[1];
        // Attribute examples are strings; JSON-looking ones keep their type
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        info.constraints.example = Some(value);
    }

    if nullable_re.is_match(content) {
        info.constraints.nullable = true;
    }
}
