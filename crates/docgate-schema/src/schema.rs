//! # Schema Tree
//!
//! Typed view of an OpenAPI v3 structural schema.
//!
//! Only the parts the validation pipeline walks are typed: `type`,
//! `properties`, `items`, the tri-state `additionalProperties`, `allOf`
//! and `default`. Every other keyword (`required`, `enum`, `anyOf`,
//! `description`, ...) and every `x-*` extension attribute lives in the
//! flattened [`Schema::extra`] map, so a schema round-trips through
//! [`Schema::to_value`] without loss.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A structural schema node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// `type`: a type name or a list of them.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<Value>,

    /// Object properties keyed by field name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,

    /// Array item schema(s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<SchemaItems>,

    /// `None` when unset, otherwise an explicit flag or schema.
    #[serde(
        rename = "additionalProperties",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<SchemaOrBool>,

    /// Subschemas the data must match as well.
    #[serde(rename = "allOf", default, skip_serializing_if = "Vec::is_empty")]
    pub all_of: Vec<Schema>,

    /// Value applied to absent fields after successful validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Every other keyword, extension attributes included.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// `additionalProperties`: a boolean or a schema for the extra values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaOrBool {
    /// `true` allows any extra field, `false` none.
    Bool(bool),
    /// Extra fields must match this schema.
    Schema(Box<Schema>),
}

/// `items`: one schema for every element, or one per position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchemaItems {
    /// Positional item schemas.
    Tuple(Vec<Schema>),
    /// One schema for all elements.
    Single(Box<Schema>),
}

impl SchemaItems {
    /// Schema applying to the element at `position`.
    pub fn for_position(&self, position: usize) -> Option<&Schema> {
        match self {
            Self::Single(schema) => Some(schema),
            Self::Tuple(schemas) => schemas.get(position),
        }
    }
}

impl Schema {
    /// Decode a schema from a generic value.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    /// Encode the schema back into a generic value.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Raw value of an extension attribute (or any untyped keyword).
    pub fn extension(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }

    /// Rule names declared under an extension attribute.
    ///
    /// `None` unless the attribute is a list of strings.
    pub fn rule_names(&self, extension: &str) -> Option<Vec<&str>> {
        self.extension(extension)?
            .as_array()?
            .iter()
            .map(Value::as_str)
            .collect()
    }

    /// Returns true when the node describes an object: `type: object` or
    /// declared properties.
    pub fn is_object(&self) -> bool {
        !self.properties.is_empty()
            || match &self.schema_type {
                Some(Value::String(t)) => t == "object",
                Some(Value::Array(types)) => types.iter().any(|t| t == "object"),
                _ => false,
            }
    }

    /// Returns true unless `type` is set and names no object type.
    ///
    /// A node without `type` accepts object data, so it counts.
    pub fn admits_objects(&self) -> bool {
        self.schema_type.is_none() || self.is_object()
    }

    /// Returns true when `additionalProperties` is explicitly `false`.
    pub fn is_closed(&self) -> bool {
        matches!(self.additional_properties, Some(SchemaOrBool::Bool(false)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "type": "object",
            "required": ["key"],
            "properties": {
                "key": {"type": "string", "x-rules": ["passphrase", "length"]},
                "port": {"type": "integer", "default": 22},
                "keys": {
                    "type": "array",
                    "items": {"type": "object", "additionalProperties": false}
                },
                "pair": {"type": "array", "items": [{"type": "string"}, {"type": "integer"}]},
                "labels": {"type": "object", "additionalProperties": {"type": "string"}}
            },
            "allOf": [{"properties": {"zone": {"type": "string", "default": "a"}}}]
        })
    }

    #[test]
    fn round_trips_through_value() {
        let value = sample();
        let schema = Schema::from_value(value.clone()).unwrap();
        assert_eq!(schema.to_value().unwrap(), value);
    }

    #[test]
    fn typed_parts_are_decoded() {
        let schema = Schema::from_value(sample()).unwrap();
        assert!(schema.is_object());
        assert_eq!(schema.additional_properties, None);
        assert_eq!(schema.extension("required"), Some(&json!(["key"])));
        assert_eq!(schema.properties["port"].default, Some(json!(22)));

        let keys = &schema.properties["keys"];
        let item = keys.items.as_ref().and_then(|i| i.for_position(7)).unwrap();
        assert!(item.is_closed());

        let pair = schema.properties["pair"].items.as_ref().unwrap();
        assert!(matches!(pair, SchemaItems::Tuple(v) if v.len() == 2));
        assert!(pair.for_position(2).is_none());

        assert!(matches!(
            schema.properties["labels"].additional_properties,
            Some(SchemaOrBool::Schema(_))
        ));

        assert_eq!(schema.all_of.len(), 1);
        assert_eq!(schema.all_of[0].properties["zone"].default, Some(json!("a")));
        assert!(schema.extension("allOf").is_none());
    }

    #[test]
    fn typeless_nodes_admit_objects() {
        let typeless = Schema::from_value(json!({"description": "anything"})).unwrap();
        assert!(!typeless.is_object());
        assert!(typeless.admits_objects());

        let scalar = Schema::from_value(json!({"type": "string"})).unwrap();
        assert!(!scalar.admits_objects());
        let nullable = Schema::from_value(json!({"type": ["null", "object"]})).unwrap();
        assert!(nullable.admits_objects());
    }

    #[test]
    fn rule_names_require_string_list() {
        let schema = Schema::from_value(json!({
            "x-rules": ["a", "b"],
            "x-bad": ["a", 1],
            "x-scalar": "a"
        }))
        .unwrap();
        assert_eq!(schema.rule_names("x-rules"), Some(vec!["a", "b"]));
        assert_eq!(schema.rule_names("x-bad"), None);
        assert_eq!(schema.rule_names("x-scalar"), None);
        assert_eq!(schema.rule_names("x-missing"), None);
    }
}
