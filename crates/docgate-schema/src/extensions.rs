//! # Extension Rules
//!
//! Semantic checks a structural schema cannot express, attached to schema
//! nodes as a list of rule names under an extension attribute:
//!
//! ```yaml
//! sshAgentPrivateKeys:
//!   type: array
//!   items:
//!     type: object
//!     x-rules: [passphrase]
//! ```
//!
//! An [`ExtensionsValidator`] binds rule names to handlers and walks the
//! schema and the document together:
//!
//! 1. The node's own rules run against the node's data. Absent data is
//!    passed as `null`.
//! 2. When the node declares item schemas, every array element is checked
//!    against its item schema. A missing or `null` array is skipped.
//! 3. Every declared property is checked against the field of the same name.
//!
//! The first failing rule stops the walk. Rule names with no registered
//! handler are ignored.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use docgate_core::{BoxError, FieldPath, PathSegment, RuleViolation};
use serde_json::Value;

use crate::schema::{Schema, SchemaItems};

/// Default extension attribute.
pub const X_RULES_EXTENSION: &str = "x-rules";

/// Handler for one rule: receives the data fragment the rule is attached to.
pub type RuleHandler = Arc<dyn Fn(&Value) -> Result<(), BoxError> + Send + Sync>;

static NULL: Value = Value::Null;

/// Rule handlers bound to one extension attribute.
#[derive(Clone)]
pub struct ExtensionsValidator {
    name: String,
    handlers: BTreeMap<String, RuleHandler>,
}

impl fmt::Debug for ExtensionsValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionsValidator")
            .field("name", &self.name)
            .field("rules", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExtensionsValidator {
    /// A validator reading rule names from `extension_name`.
    pub fn new(extension_name: impl Into<String>) -> Self {
        Self {
            name: extension_name.into(),
            handlers: BTreeMap::new(),
        }
    }

    /// A validator reading rule names from `x-rules`.
    pub fn x_rules() -> Self {
        Self::new(X_RULES_EXTENSION)
    }

    /// Bind `handler` to `rule`, replacing any earlier binding.
    pub fn with_rule<F>(mut self, rule: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.handlers.insert(rule.into(), Arc::new(handler));
        self
    }

    /// The extension attribute this validator reads.
    pub fn extension_name(&self) -> &str {
        &self.name
    }

    /// Run every bound rule declared in `schema` against `data`.
    ///
    /// # Errors
    ///
    /// The first [`RuleViolation`], located by field path.
    pub fn validate(&self, data: &Value, schema: &Schema) -> Result<(), RuleViolation> {
        let mut path = FieldPath::root();
        self.check_node(data, schema, &mut path)
    }

    fn check_node(
        &self,
        data: &Value,
        schema: &Schema,
        path: &mut FieldPath,
    ) -> Result<(), RuleViolation> {
        self.run_rules(schema, data, path)?;

        if let Some(items) = &schema.items {
            self.check_items(data, items, path)?;
        }

        for (name, property) in &schema.properties {
            let field = data.get(name).unwrap_or(&NULL);
            path.push(PathSegment::Field(name.clone()));
            self.check_node(field, property, path)?;
            path.pop();
        }

        Ok(())
    }

    fn check_items(
        &self,
        data: &Value,
        items: &SchemaItems,
        path: &mut FieldPath,
    ) -> Result<(), RuleViolation> {
        match data {
            Value::Null => Ok(()),
            Value::Array(elements) => {
                for (position, element) in elements.iter().enumerate() {
                    let Some(item_schema) = items.for_position(position) else {
                        continue;
                    };
                    path.push(PathSegment::Index(position));
                    self.check_node(element, item_schema, path)?;
                    path.pop();
                }
                Ok(())
            }
            other => match self.first_bound_item_rule(items) {
                Some(rule) => Err(RuleViolation {
                    extension: self.name.clone(),
                    rule: rule.to_string(),
                    path: path.clone(),
                    source: format!("expected an array, got {}", value_type(other)).into(),
                }),
                None => Ok(()),
            },
        }
    }

    fn run_rules(
        &self,
        schema: &Schema,
        data: &Value,
        path: &FieldPath,
    ) -> Result<(), RuleViolation> {
        let Some(rules) = schema.rule_names(&self.name) else {
            return Ok(());
        };
        for rule in rules {
            let Some(handler) = self.handlers.get(rule) else {
                continue;
            };
            handler(data).map_err(|source| RuleViolation {
                extension: self.name.clone(),
                rule: rule.to_string(),
                path: path.clone(),
                source,
            })?;
        }
        Ok(())
    }

    fn first_bound_item_rule<'s>(&self, items: &'s SchemaItems) -> Option<&'s str> {
        let schemas: Vec<&Schema> = match items {
            SchemaItems::Single(item) => vec![&**item],
            SchemaItems::Tuple(items) => items.iter().collect(),
        };
        schemas
            .into_iter()
            .filter_map(|s| s.rule_names(&self.name))
            .flatten()
            .find(|rule| self.handlers.contains_key(*rule))
    }
}

fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn schema() -> Schema {
        Schema::from_value(json!({
            "type": "object",
            "properties": {
                "sshUser": {"type": "string", "x-rules": ["notRoot"]},
                "sshAgentPrivateKeys": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "x-rules": ["passphrase"],
                        "properties": {
                            "key": {"type": "string", "x-rules": ["nonEmpty", "unknownRule"]},
                            "passphrase": {"type": "string"}
                        }
                    }
                }
            }
        }))
        .unwrap()
    }

    fn validator() -> ExtensionsValidator {
        ExtensionsValidator::x_rules()
            .with_rule("passphrase", |item| {
                let passphrase = item.get("passphrase").and_then(Value::as_str).unwrap_or_default();
                if passphrase.contains(['.', '!', '@']) {
                    Ok(())
                } else {
                    Err("invalid passphrase: should contain .!@".into())
                }
            })
            .with_rule("notRoot", |user| match user.as_str() {
                Some("root") => Err("root login is not allowed".into()),
                _ => Ok(()),
            })
            .with_rule("nonEmpty", |value| match value.as_str() {
                Some("") => Err("must not be empty".into()),
                _ => Ok(()),
            })
    }

    #[test]
    fn passing_document() {
        let doc = json!({
            "sshUser": "ubuntu",
            "sshAgentPrivateKeys": [{"key": "k", "passphrase": "!not@secret."}]
        });
        validator().validate(&doc, &schema()).unwrap();
    }

    #[test]
    fn item_rule_failure_names_the_element() {
        let doc = json!({
            "sshAgentPrivateKeys": [
                {"key": "a", "passphrase": "ok!"},
                {"key": "b", "passphrase": "not secret"}
            ]
        });
        let violation = validator().validate(&doc, &schema()).unwrap_err();
        assert_eq!(violation.rule, "passphrase");
        assert_eq!(violation.extension, "x-rules");
        assert_eq!(violation.path.to_string(), "sshAgentPrivateKeys[1]");
        assert_eq!(
            violation.to_string(),
            "sshAgentPrivateKeys[1]: invalid passphrase: should contain .!@"
        );
    }

    #[test]
    fn nested_property_rules_run_per_element() {
        let doc = json!({"sshAgentPrivateKeys": [{"key": "", "passphrase": "ok!"}]});
        let violation = validator().validate(&doc, &schema()).unwrap_err();
        assert_eq!(violation.rule, "nonEmpty");
        assert_eq!(violation.path.to_string(), "sshAgentPrivateKeys[0].key");
    }

    #[test]
    fn top_level_rule_failure() {
        let doc = json!({"sshUser": "root"});
        let violation = validator().validate(&doc, &schema()).unwrap_err();
        assert_eq!(violation.to_string(), "sshUser: root login is not allowed");
    }

    #[test]
    fn absent_array_is_skipped() {
        validator().validate(&json!({"sshUser": "ubuntu"}), &schema()).unwrap();
        validator()
            .validate(&json!({"sshAgentPrivateKeys": null}), &schema())
            .unwrap();
    }

    #[test]
    fn non_array_for_rule_carrying_items_fails() {
        let doc = json!({"sshAgentPrivateKeys": {"a": "b"}});
        let violation = validator().validate(&doc, &schema()).unwrap_err();
        assert_eq!(violation.rule, "passphrase");
        assert!(violation.to_string().contains("expected an array, got object"));
    }

    #[test]
    fn absent_field_rules_receive_null() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let validator = ExtensionsValidator::x_rules().with_rule("notRoot", move |value| {
            assert!(value.is_null());
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        validator.validate(&json!({}), &schema()).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn other_extension_names_are_ignored() {
        let validator = ExtensionsValidator::new("x-other")
            .with_rule("notRoot", |_| Err("never called".into()));
        assert_eq!(validator.extension_name(), "x-other");
        validator.validate(&json!({"sshUser": "root"}), &schema()).unwrap();
    }
}
