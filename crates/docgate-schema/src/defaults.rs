//! # Defaulting
//!
//! Applies schema-declared `default` values to a validated document.
//!
//! For every declared property absent from an object, a copy of the
//! property's default is inserted (and itself defaulted, so nested defaults
//! inside an inserted object are filled too). Present values are descended
//! into; array elements are descended into through their item schema.
//! Fields not declared under `properties` are descended into through a
//! schema-valued `additionalProperties`. Every `allOf` member contributes
//! its defaults too.
//!
//! Present values are never replaced, so applying defaults twice is the
//! same as applying them once.

use serde_json::Value;

use crate::schema::{Schema, SchemaOrBool};

/// Fill absent fields of `value` with the defaults declared by `schema`.
pub fn apply_defaults(value: &mut Value, schema: &Schema) {
    match value {
        Value::Object(fields) => {
            for (name, property) in &schema.properties {
                match fields.get_mut(name) {
                    Some(present) => apply_defaults(present, property),
                    None => {
                        if let Some(default) = &property.default {
                            let mut inserted = default.clone();
                            apply_defaults(&mut inserted, property);
                            fields.insert(name.clone(), inserted);
                        }
                    }
                }
            }

            if let Some(SchemaOrBool::Schema(extra)) = &schema.additional_properties {
                for (name, field) in fields.iter_mut() {
                    if !schema.properties.contains_key(name) {
                        apply_defaults(field, extra);
                    }
                }
            }
        }
        Value::Array(elements) => {
            if let Some(items) = &schema.items {
                for (position, element) in elements.iter_mut().enumerate() {
                    if let Some(item_schema) = items.for_position(position) {
                        apply_defaults(element, item_schema);
                    }
                }
            }
        }
        _ => {}
    }

    for member in &schema.all_of {
        apply_defaults(value, member);
    }
}
