//! # Schema Transformers
//!
//! Rewrites of a schema tree applied before it validates data.
//!
//! The built-in transformer closes open object shapes by setting
//! `additionalProperties: false`. It has two variants:
//!
//! - [`AdditionalPropertiesTransformer::new`] closes every node whose flag is
//!   unset, except nodes typed as non-objects. A property that sets the flag explicitly is left alone
//!   together with its whole subtree.
//! - [`AdditionalPropertiesTransformer::disallow_full`] closes every such
//!   node regardless of what the schema declares.
//!
//! Array item schemas are always visited.
//!
//! ## Sharing
//!
//! Registered schemas are shared between validation calls, so
//! [`transform_schema`] never touches them: it returns the schema borrowed
//! when there is nothing to apply and a transformed copy otherwise.
//!
//! ## Audit
//!
//! [`audit_open_shapes`] reports the nodes that still accept
//! undeclared fields, for operators reviewing a schema bundle.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::{Schema, SchemaItems, SchemaOrBool};

/// A rewrite of a schema tree.
pub trait SchemaTransformer: fmt::Debug + Send + Sync {
    /// Rewrite `schema` in place.
    fn transform(&self, schema: &mut Schema);
}

/// Closes open object shapes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdditionalPropertiesTransformer {
    disallow_full: bool,
}

impl AdditionalPropertiesTransformer {
    /// Close nodes that leave `additionalProperties` unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Close every node, overriding explicit `additionalProperties`.
    pub fn disallow_full() -> Self {
        Self {
            disallow_full: true,
        }
    }

    fn should_close(&self, schema: &Schema) -> bool {
        self.disallow_full || schema.additional_properties.is_none()
    }
}

impl SchemaTransformer for AdditionalPropertiesTransformer {
    fn transform(&self, schema: &mut Schema) {
        if schema.admits_objects() && self.should_close(schema) {
            schema.additional_properties = Some(SchemaOrBool::Bool(false));
        }

        for property in schema.properties.values_mut() {
            if self.should_close(property) {
                self.transform(property);
            }
        }

        match &mut schema.items {
            Some(SchemaItems::Single(item)) => self.transform(item),
            Some(SchemaItems::Tuple(items)) => {
                for item in items {
                    self.transform(item);
                }
            }
            None => {}
        }
    }
}

/// Transformers selectable from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TransformerKind {
    /// [`AdditionalPropertiesTransformer::new`].
    CloseUnset,
    /// [`AdditionalPropertiesTransformer::disallow_full`].
    CloseAll,
}

impl TransformerKind {
    /// Instantiate the transformer.
    pub fn transformer(self) -> Arc<dyn SchemaTransformer> {
        match self {
            Self::CloseUnset => Arc::new(AdditionalPropertiesTransformer::new()),
            Self::CloseAll => Arc::new(AdditionalPropertiesTransformer::disallow_full()),
        }
    }
}

/// Apply `transformers` in order to a copy of `schema`.
///
/// Returns `schema` itself, uncopied, when the list is empty.
pub fn transform_schema<'a>(
    schema: &'a Schema,
    transformers: &[Arc<dyn SchemaTransformer>],
) -> Cow<'a, Schema> {
    if transformers.is_empty() {
        return Cow::Borrowed(schema);
    }

    let mut transformed = schema.clone();
    for transformer in transformers {
        tracing::trace!(?transformer, "applying schema transformer");
        transformer.transform(&mut transformed);
    }
    Cow::Owned(transformed)
}

/// A node that accepts undeclared fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenShapeFinding {
    /// JSON Pointer to the node's `additionalProperties`.
    pub json_path: String,
    /// Current value of `additionalProperties`.
    pub current_value: String,
}

impl fmt::Display for OpenShapeFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.json_path, self.current_value)
    }
}

/// List every node admitting objects whose `additionalProperties` is unset
/// or `true`.
///
/// Nodes whose extra fields are constrained by a schema are not reported,
/// but that schema is walked too.
pub fn audit_open_shapes(schema: &Schema) -> Vec<OpenShapeFinding> {
    let mut findings = Vec::new();
    audit_node(schema, "", &mut findings);
    findings
}

fn audit_node(schema: &Schema, path: &str, findings: &mut Vec<OpenShapeFinding>) {
    if schema.admits_objects() {
        let current_value = match &schema.additional_properties {
            None => Some("(absent, defaults to true)"),
            Some(SchemaOrBool::Bool(true)) => Some("true"),
            Some(_) => None,
        };
        if let Some(current_value) = current_value {
            findings.push(OpenShapeFinding {
                json_path: format!("{path}/additionalProperties"),
                current_value: current_value.to_string(),
            });
        }
    }

    if let Some(SchemaOrBool::Schema(extra)) = &schema.additional_properties {
        audit_node(extra, &format!("{path}/additionalProperties"), findings);
    }

    for (name, property) in &schema.properties {
        let escaped = name.replace('~', "~0").replace('/', "~1");
        audit_node(property, &format!("{path}/properties/{escaped}"), findings);
    }

    match &schema.items {
        Some(SchemaItems::Single(item)) => audit_node(item, &format!("{path}/items"), findings),
        Some(SchemaItems::Tuple(items)) => {
            for (i, item) in items.iter().enumerate() {
                audit_node(item, &format!("{path}/items/{i}"), findings);
            }
        }
        None => {}
    }
}
