//! # Schema Loader
//!
//! Reads a schema definition document: one `kind` and its per-version
//! inline schemas.
//!
//! ```yaml
//! kind: TestKind
//! apiVersions:
//! - apiVersion: example.io/v1
//!   openAPISpec:
//!     type: object
//!     properties: {...}
//! ```
//!
//! Definitions are authoritative, so they are decoded strictly: unknown
//! fields are rejected. Every inline schema has its local `$ref`s inlined
//! and is then closed with [`AdditionalPropertiesTransformer::new`], so a
//! loaded schema rejects undeclared fields unless a node opts in.

use std::io::Read;

use docgate_core::SchemaIndex;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::schema::Schema;
use crate::transformer::{AdditionalPropertiesTransformer, SchemaTransformer};

/// Errors raised while loading schema definitions.
#[derive(Error, Debug)]
pub enum SchemaLoadError {
    /// The byte source failed.
    #[error("read schema definition: {0}")]
    Read(#[from] std::io::Error),

    /// The definition or one of its inline schemas is malformed.
    #[error("decode schema definition: {reason}")]
    Decode {
        /// Decoder message.
        reason: String,
    },

    /// A `$ref` could not be inlined.
    #[error("expand schema for version {version:?}: {reason}")]
    Expand {
        /// Version whose schema failed.
        version: String,
        /// Expansion failure.
        reason: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaDefinition {
    kind: String,
    #[serde(rename = "apiVersions", default)]
    versions: Vec<VersionedSchema>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VersionedSchema {
    #[serde(rename = "apiVersion")]
    version: String,
    #[serde(rename = "openAPISpec")]
    schema: Value,
}

/// A loaded schema and the index it is registered under.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedSchema {
    /// `(kind, apiVersion)` of the schema.
    pub index: SchemaIndex,
    /// The expanded, closed schema.
    pub schema: Schema,
}

/// Load every version declared by a schema definition.
///
/// # Errors
///
/// - [`SchemaLoadError::Decode`] for malformed definitions or schemas.
/// - [`SchemaLoadError::Expand`] for circular, dangling or non-local `$ref`s.
pub fn load_schemas(content: &[u8]) -> Result<Vec<IndexedSchema>, SchemaLoadError> {
    let definition: SchemaDefinition =
        serde_yaml::from_slice(content).map_err(|e| SchemaLoadError::Decode {
            reason: e.to_string(),
        })?;

    let closer = AdditionalPropertiesTransformer::new();
    definition
        .versions
        .into_iter()
        .map(|versioned| {
            let expanded =
                expand_refs(&versioned.schema).map_err(|reason| SchemaLoadError::Expand {
                    version: versioned.version.clone(),
                    reason,
                })?;
            let mut schema = Schema::from_value(expanded).map_err(|e| SchemaLoadError::Decode {
                reason: format!("schema for version {:?}: {e}", versioned.version),
            })?;
            closer.transform(&mut schema);
            Ok(IndexedSchema {
                index: SchemaIndex::new(definition.kind.clone(), versioned.version),
                schema,
            })
        })
        .collect()
}

/// Read a schema definition from `reader` and load it.
///
/// # Errors
///
/// [`SchemaLoadError::Read`] if the reader fails, otherwise as [`load_schemas`].
pub fn read_schemas(mut reader: impl Read) -> Result<Vec<IndexedSchema>, SchemaLoadError> {
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;
    load_schemas(&content)
}

/// Inline every local `$ref` (`#/...`) of `root`.
///
/// Keywords next to a `$ref` are dropped, as draft 4 ignores them.
pub fn expand_refs(root: &Value) -> Result<Value, String> {
    let mut visiting = Vec::new();
    expand_node(root, root, &mut visiting)
}

fn expand_node(node: &Value, root: &Value, visiting: &mut Vec<String>) -> Result<Value, String> {
    match node {
        Value::Object(fields) => {
            if let Some(Value::String(reference)) = fields.get("$ref") {
                let pointer = reference
                    .strip_prefix('#')
                    .ok_or_else(|| format!("non-local reference {reference:?} is not supported"))?;
                if visiting.contains(reference) {
                    return Err(format!("circular reference {reference:?}"));
                }
                let target = root
                    .pointer(pointer)
                    .ok_or_else(|| format!("unresolved reference {reference:?}"))?;

                visiting.push(reference.clone());
                let expanded = expand_node(target, root, visiting)?;
                visiting.pop();
                return Ok(expanded);
            }

            let mut expanded = Map::with_capacity(fields.len());
            for (key, value) in fields {
                expanded.insert(key.clone(), expand_node(value, root, visiting)?);
            }
            Ok(Value::Object(expanded))
        }
        Value::Array(elements) => elements
            .iter()
            .map(|element| expand_node(element, root, visiting))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        scalar => Ok(scalar.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaOrBool;
    use serde_json::json;

    const DEFINITION: &str = r##"
kind: TestKind
apiVersions:
- apiVersion: example.io/v1
  openAPISpec:
    type: object
    definitions:
      key:
        type: object
        properties:
          key: {type: string}
    properties:
      sshUser:
        type: string
      keys:
        type: array
        items:
          $ref: "#/definitions/key"
- apiVersion: example.io/v1alpha1
  openAPISpec:
    type: object
    additionalProperties: true
"##;

    #[test]
    fn loads_every_version() {
        let schemas = load_schemas(DEFINITION.as_bytes()).unwrap();
        assert_eq!(schemas.len(), 2);
        assert_eq!(schemas[0].index, SchemaIndex::new("TestKind", "example.io/v1"));
        assert_eq!(schemas[1].index, SchemaIndex::new("TestKind", "example.io/v1alpha1"));
    }

    #[test]
    fn refs_are_inlined_and_shapes_closed() {
        let schemas = load_schemas(DEFINITION.as_bytes()).unwrap();
        let schema = &schemas[0].schema;
        assert!(schema.is_closed());

        let item = schema.properties["keys"]
            .items
            .as_ref()
            .and_then(|i| i.for_position(0))
            .unwrap();
        assert!(item.extension("$ref").is_none());
        assert!(item.properties.contains_key("key"));
        assert!(item.is_closed());

        assert_eq!(
            schemas[1].schema.additional_properties,
            Some(SchemaOrBool::Bool(true))
        );
    }

    #[test]
    fn typeless_properties_are_closed_on_load() {
        let definition = b"kind: A\napiVersions:\n- apiVersion: v1\n  openAPISpec:\n    type: object\n    properties:\n      settings: {description: no type}\n      port: {type: integer}\n";
        let schemas = load_schemas(definition).unwrap();
        let schema = &schemas[0].schema;
        assert!(schema.properties["settings"].is_closed());
        assert_eq!(schema.properties["port"].additional_properties, None);
    }

    #[test]
    fn unknown_definition_field_is_decode_error() {
        let err = load_schemas(b"kind: A\napiVersions: []\nextra: 1\n").unwrap_err();
        assert!(matches!(err, SchemaLoadError::Decode { .. }), "{err}");

        let err = load_schemas(b"kind: A\napiVersions:\n- apiVersion: v1\n  openAPISpec: {}\n  schema: {}\n")
            .unwrap_err();
        assert!(matches!(err, SchemaLoadError::Decode { .. }), "{err}");
    }

    #[test]
    fn malformed_inline_schema_is_decode_error() {
        let err = load_schemas(b"kind: A\napiVersions:\n- apiVersion: v1\n  openAPISpec: {properties: 5}\n")
            .unwrap_err();
        assert!(err.to_string().contains("schema for version \"v1\""), "{err}");
    }

    #[test]
    fn circular_reference_is_expand_error() {
        let root = json!({
            "definitions": {"a": {"$ref": "#/definitions/b"}, "b": {"$ref": "#/definitions/a"}},
            "properties": {"x": {"$ref": "#/definitions/a"}}
        });
        let err = expand_refs(&root).unwrap_err();
        assert!(err.contains("circular reference"), "{err}");

        let definition = b"kind: A\napiVersions:\n- apiVersion: v1\n  openAPISpec:\n    properties:\n      self: {$ref: '#'}\n";
        let err = load_schemas(definition).unwrap_err();
        assert!(matches!(err, SchemaLoadError::Expand { ref version, .. } if version == "v1"), "{err}");
    }

    #[test]
    fn remote_and_dangling_references_fail() {
        let err = expand_refs(&json!({"$ref": "https://example.io/schema.json"})).unwrap_err();
        assert!(err.contains("non-local"), "{err}");
        let err = expand_refs(&json!({"items": {"$ref": "#/definitions/missing"}})).unwrap_err();
        assert!(err.contains("unresolved"), "{err}");
    }

    #[test]
    fn shared_reference_expands_twice() {
        let root = json!({
            "definitions": {"s": {"type": "string"}},
            "properties": {"a": {"$ref": "#/definitions/s"}, "b": {"$ref": "#/definitions/s"}}
        });
        let expanded = expand_refs(&root).unwrap();
        assert_eq!(expanded["properties"]["a"], json!({"type": "string"}));
        assert_eq!(expanded["properties"]["b"], json!({"type": "string"}));
    }

    #[test]
    fn property_named_ref_is_not_a_reference() {
        let root = json!({"properties": {"$ref": {"type": "string"}}});
        assert_eq!(expand_refs(&root).unwrap(), root);
    }

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
        }
    }

    #[test]
    fn read_failure_is_distinct() {
        let err = read_schemas(FailingReader).unwrap_err();
        assert!(matches!(err, SchemaLoadError::Read(_)));
        assert!(read_schemas(DEFINITION.as_bytes()).is_ok());
    }
}
