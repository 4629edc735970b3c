#![deny(missing_docs)]

//! # Schema Nodes
//!
//! The recursive schema node and its reference form. A node is either a
//! bare `$ref` pointer or a full inline definition; the two can never be
//! mixed because the split is a sum type, not a convention.

use crate::oas::ordered::OrderedMap;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

/// Ordered property container: field name -> schema node, in declaration order.
pub type Properties = OrderedMap<Schema>;

/// A `$ref` pointer to a named component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    /// The reference target, e.g. `#/components/schemas/User`.
    #[serde(rename = "$ref")]
    pub target: String,
}

impl Reference {
    /// Builds a reference into the shared schema component table.
    pub fn schema(identity: &str) -> Self {
        Self {
            target: format!("#/components/schemas/{}", identity),
        }
    }
}

/// A schema node: either a reference or an inline definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Schema {
    /// A pointer to a shared component. Carries no sibling fields.
    Reference(Reference),
    /// A full inline definition.
    Inline(Box<SchemaObject>),
}

impl Schema {
    /// Builds a reference node into the component table.
    pub fn reference(identity: &str) -> Self {
        Schema::Reference(Reference::schema(identity))
    }

    /// Wraps an inline definition.
    pub fn inline(object: SchemaObject) -> Self {
        Schema::Inline(Box::new(object))
    }

    /// Returns the inline definition, if this node is not a reference.
    pub fn as_inline(&self) -> Option<&SchemaObject> {
        match self {
            Schema::Inline(object) => Some(object),
            Schema::Reference(_) => None,
        }
    }

    /// Returns the reference, if this node is one.
    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            Schema::Reference(reference) => Some(reference),
            Schema::Inline(_) => None,
        }
    }
}

/// Registry bookkeeping carried by a schema object. Never serialized.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaMeta {
    /// Stable identity under which the schema registers or deduplicates.
    pub id: String,
    /// Originating package (module path) of the source type.
    pub package: String,
    /// Originating field name, for schemas built from a single field.
    pub field_name: String,
    /// Property names to drop from output after an identity collision.
    pub suppressed: BTreeSet<String>,
}

/// An inline schema definition.
///
/// Numeric constraints are `Option<i64>` so an explicit `0` stays
/// distinguishable from "no constraint": the serializer omits a constraint
/// only when it is `None`, never when it is `Some(0)`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SchemaObject {
    /// Internal registry metadata; excluded from output.
    #[serde(skip)]
    pub meta: SchemaMeta,

    /// The JSON type name (`object`, `array`, `string`, ...).
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<String>,
    /// Format qualifier (`int64`, `date-time`, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Names of required properties; always a subset of `properties` keys.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    /// Ordered property container; absent and empty are distinct states.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Array element schema, exclusively owned by this node.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
    /// Example value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    /// Deprecation marker.
    #[serde(skip_serializing_if = "super::is_false")]
    pub deprecated: bool,
    /// Nullability marker.
    #[serde(skip_serializing_if = "super::is_false")]
    pub nullable: bool,
    /// Inclusive lower bound for numeric values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<i64>,
    /// Inclusive upper bound for numeric values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<i64>,
    /// Minimum string length.
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<i64>,
    /// Maximum string length.
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i64>,
    /// Minimum item count for arrays.
    #[serde(rename = "minItems", skip_serializing_if = "Option::is_none")]
    pub min_items: Option<i64>,
    /// Maximum item count for arrays.
    #[serde(rename = "maxItems", skip_serializing_if = "Option::is_none")]
    pub max_items: Option<i64>,
    /// Fixed set of admissible values.
    #[serde(rename = "enum", skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<Value>,
}

impl SchemaObject {
    /// Creates a schema of the given JSON type with everything else unset.
    pub fn new(schema_type: impl Into<String>) -> Self {
        Self {
            schema_type: Some(schema_type.into()),
            ..Self::default()
        }
    }

    /// Sets the format qualifier.
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the example value.
    pub fn with_example(mut self, example: Value) -> Self {
        self.example = Some(example);
        self
    }

    /// Sets the property container.
    pub fn with_properties(mut self, properties: Properties) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Sets the array element schema.
    pub fn with_items(mut self, items: Schema) -> Self {
        self.items = Some(Box::new(items));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_explicit_zero_minimum_is_serialized() {
        let mut schema = SchemaObject::new("integer");
        schema.minimum = Some(0);
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"{"type":"integer","minimum":0}"#);
    }

    #[test]
    fn test_unset_minimum_is_absent() {
        let schema = SchemaObject::new("integer");
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r#"{"type":"integer"}"#);
    }

    #[test]
    fn test_reference_carries_no_sibling_fields() {
        let schema = Schema::reference("User");
        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(json, r##"{"$ref":"#/components/schemas/User"}"##);
    }

    #[test]
    fn test_meta_never_serializes() {
        let mut schema = SchemaObject::new("object");
        schema.meta.id = "User".into();
        schema.meta.package = "models".into();
        let json = serde_json::to_string(&schema).unwrap();
        assert!(!json.contains("User"));
        assert!(!json.contains("models"));
    }

    #[test]
    fn test_false_flags_are_absent() {
        let schema = SchemaObject::new("string");
        let json = serde_json::to_string(&schema).unwrap();
        assert!(!json.contains("deprecated"));
        assert!(!json.contains("nullable"));
    }

    #[test]
    fn test_properties_in_declaration_order() {
        let mut props = Properties::new();
        props.set("id", Schema::inline(SchemaObject::new("integer")));
        props.set("name", Schema::inline(SchemaObject::new("string")));
        let schema = SchemaObject::new("object").with_properties(props);

        let json = serde_json::to_string(&schema).unwrap();
        assert_eq!(
            json,
            r#"{"type":"object","properties":{"id":{"type":"integer"},"name":{"type":"string"}}}"#
        );
    }
}
