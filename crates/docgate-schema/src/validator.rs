//! # Validator
//!
//! Registry of schemas and hooks, and the validation pipeline run against
//! every document.
//!
//! ## Pipeline
//!
//! 1. Require a complete index.
//! 2. Resolve the schema: direct lookup, then one version fallback hop.
//!    A fallback rewrites the caller's index.
//! 3. Run the pre-validator registered for the index. It may keep, replace
//!    or supply the schema, or reject the document.
//! 4. Fail with [`ValidationError::SchemaNotFound`] if there is still no schema.
//! 5. Apply the index's transformers, or the default ones.
//! 6. Decode the document and collect every structural violation.
//! 7. Run the extension validators in registration order.
//! 8. Apply defaults and write the re-encoded document back.
//!
//! The caller's buffer is only written in the last step, so a failed
//! validation leaves it byte-identical.
//!
//! ## Concurrency
//!
//! Registration takes `&mut self` and validation `&self`: populate the
//! validator first, then share it (behind an `Arc` if needed) between
//! threads. Registered schemas and hooks are `Send + Sync`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use docgate_core::{
    decode_value, encode_value, parse_index, BoxError, DecodeMode, FailureContext,
    ParseIndexOptions, SchemaIndex, ValidationError, ValidationViolations, Violation,
};
use serde_json::Value;
use tracing::debug;

use crate::config::ValidatorConfig;
use crate::defaults::apply_defaults;
use crate::extensions::ExtensionsValidator;
use crate::loader::{load_schemas, SchemaLoadError};
use crate::schema::Schema;
use crate::transformer::{transform_schema, SchemaTransformer};

/// Per-index hook run before structural validation.
pub trait PreValidator: Send + Sync {
    /// Inspect the raw document and choose the schema to validate it with.
    ///
    /// `current` is the resolved schema, if any. Return it to keep it,
    /// another schema to replace it, or an error to reject the document.
    /// Errors reach the caller unchanged.
    fn validate(
        &self,
        document: &[u8],
        current: Option<Arc<Schema>>,
    ) -> Result<Option<Arc<Schema>>, BoxError>;
}

impl<F> PreValidator for F
where
    F: Fn(&[u8], Option<Arc<Schema>>) -> Result<Option<Arc<Schema>>, BoxError> + Send + Sync,
{
    fn validate(
        &self,
        document: &[u8],
        current: Option<Arc<Schema>>,
    ) -> Result<Option<Arc<Schema>>, BoxError> {
        self(document, current)
    }
}

/// Per-call validation switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidateOptions {
    /// Keep the document text out of error messages.
    pub omit_doc_in_error: bool,
    /// Reject repeated keys and undeclared top-level fields.
    pub strict_decode: bool,
    /// Render failures on one line.
    pub no_pretty_error: bool,
}

impl ValidateOptions {
    /// Keep the document text out of error messages.
    pub fn omit_document(mut self) -> Self {
        self.omit_doc_in_error = true;
        self
    }

    /// Decode strictly.
    pub fn strict(mut self) -> Self {
        self.strict_decode = true;
        self
    }

    /// One-line error messages.
    pub fn compact(mut self) -> Self {
        self.no_pretty_error = true;
        self
    }

    fn failure_context(&self, index: &SchemaIndex, document: &[u8]) -> FailureContext {
        FailureContext {
            index: index.clone(),
            document: (!self.omit_doc_in_error && !self.no_pretty_error)
                .then(|| String::from_utf8_lossy(document).into_owned()),
        }
    }
}

/// Schema registry and validation pipeline.
pub struct Validator {
    schemas: HashMap<SchemaIndex, Arc<Schema>>,
    pre_validators: HashMap<SchemaIndex, Arc<dyn PreValidator>>,
    version_fallbacks: HashMap<String, String>,
    transformers: HashMap<SchemaIndex, Vec<Arc<dyn SchemaTransformer>>>,
    default_transformers: Vec<Arc<dyn SchemaTransformer>>,
    extensions_validators: Vec<ExtensionsValidator>,
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Validator")
            .field("schemas", &self.schema_indices())
            .field("pre_validators", &self.pre_validators.keys().collect::<Vec<_>>())
            .field("version_fallbacks", &self.version_fallbacks)
            .field("transformers", &self.transformers)
            .field("default_transformers", &self.default_transformers)
            .field("extensions_validators", &self.extensions_validators)
            .finish()
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl Validator {
    /// An empty registry set up from `config`.
    pub fn new(config: ValidatorConfig) -> Self {
        let mut validator = Self {
            schemas: HashMap::new(),
            pre_validators: HashMap::new(),
            version_fallbacks: config.version_fallbacks.into_iter().collect(),
            transformers: HashMap::new(),
            default_transformers: Vec::new(),
            extensions_validators: Vec::new(),
        };

        validator.set_default_transformers(
            config
                .default_transformers
                .iter()
                .map(|kind| kind.transformer()),
        );
        for entry in &config.transformers {
            validator.add_transformers(
                entry.index(),
                entry.transformers.iter().map(|kind| kind.transformer()),
            );
        }
        validator
    }

    /// Register `schema` under `index`, replacing any earlier one.
    pub fn add_schema(&mut self, index: SchemaIndex, schema: impl Into<Arc<Schema>>) -> &mut Self {
        self.schemas.insert(index, schema.into());
        self
    }

    /// Load a schema definition and register every version it declares.
    ///
    /// # Errors
    ///
    /// Any [`SchemaLoadError`]; nothing is registered in that case.
    pub fn load_schemas(&mut self, content: &[u8]) -> Result<&mut Self, SchemaLoadError> {
        for loaded in load_schemas(content)? {
            self.add_schema(loaded.index, loaded.schema);
        }
        Ok(self)
    }

    /// Register the pre-validator for `index`, replacing any earlier one.
    pub fn add_pre_validator(
        &mut self,
        index: SchemaIndex,
        pre_validator: impl PreValidator + 'static,
    ) -> &mut Self {
        self.pre_validators.insert(index, Arc::new(pre_validator));
        self
    }

    /// Map version `from` to `to` for lookups that miss.
    pub fn add_version_fallback(&mut self, from: impl Into<String>, to: impl Into<String>) -> &mut Self {
        self.version_fallbacks.insert(from.into(), to.into());
        self
    }

    /// Set the transformers applied to documents of `index`.
    ///
    /// An empty list makes the index use the default transformers.
    pub fn add_transformers<I>(&mut self, index: SchemaIndex, transformers: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn SchemaTransformer>>,
    {
        self.transformers
            .insert(index, transformers.into_iter().collect());
        self
    }

    /// Set the transformers applied to indices without their own list.
    pub fn set_default_transformers<I>(&mut self, transformers: I) -> &mut Self
    where
        I: IntoIterator<Item = Arc<dyn SchemaTransformer>>,
    {
        self.default_transformers = transformers.into_iter().collect();
        self
    }

    /// Append extension validators; they run in registration order.
    pub fn add_extensions_validators<I>(&mut self, validators: I) -> &mut Self
    where
        I: IntoIterator<Item = ExtensionsValidator>,
    {
        self.extensions_validators.extend(validators);
        self
    }

    /// The schema registered under exactly `index`.
    pub fn get(&self, index: &SchemaIndex) -> Option<Arc<Schema>> {
        self.schemas.get(index).cloned()
    }

    /// Registered indices, sorted.
    pub fn schema_indices(&self) -> Vec<&SchemaIndex> {
        let mut indices: Vec<&SchemaIndex> = self.schemas.keys().collect();
        indices.sort();
        indices
    }

    /// Parse the document's index and validate it.
    ///
    /// On success `document` holds the defaulted document, re-encoded.
    ///
    /// # Errors
    ///
    /// As [`parse_index`] and [`Validator::validate_with_index`].
    pub fn validate(
        &self,
        document: &mut Vec<u8>,
        options: ValidateOptions,
    ) -> Result<SchemaIndex, ValidationError> {
        let parse_options = ParseIndexOptions {
            skip_completeness_check: true,
            omit_doc_in_error: options.omit_doc_in_error,
        };
        let mut index = parse_index(document, &parse_options)?;
        self.validate_with_index(&mut index, document, options)?;
        Ok(index)
    }

    /// Validate `document` as a document of `index`.
    ///
    /// A version fallback rewrites `index`. On success `document` holds the
    /// defaulted document, re-encoded; on failure it is untouched.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::IncompleteIndex`] when `index` lacks kind or version.
    /// - The pre-validator's error, verbatim, as [`ValidationError::PreValidation`].
    /// - [`ValidationError::SchemaNotFound`] when no schema applies.
    /// - [`ValidationError::InvalidEncoding`] when the document cannot be decoded.
    /// - [`ValidationError::Structural`] with every structural violation.
    /// - [`ValidationError::Extension`] with the first failing rule.
    pub fn validate_with_index(
        &self,
        index: &mut SchemaIndex,
        document: &mut Vec<u8>,
        options: ValidateOptions,
    ) -> Result<(), ValidationError> {
        if !index.is_complete() {
            return Err(ValidationError::IncompleteIndex {
                index: index.clone(),
                document: (!options.omit_doc_in_error)
                    .then(|| String::from_utf8_lossy(document).into_owned()),
            });
        }

        let mut schema = self.resolve_schema(index);

        if let Some(pre_validator) = self.pre_validators.get(&*index) {
            schema = pre_validator
                .validate(document, schema)
                .map_err(ValidationError::PreValidation)?;
        }

        let Some(schema) = schema else {
            debug!(%index, "no schema for index, skip it");
            return Err(ValidationError::SchemaNotFound {
                index: index.clone(),
            });
        };

        let schema = transform_schema(&schema, self.transformers_for(index));

        let mode = if options.strict_decode {
            DecodeMode::Strict
        } else {
            DecodeMode::Lenient
        };
        let mut data = decode_value(document, mode)?;

        let violations = structural_violations(&schema, &data, index, options.strict_decode)?;
        if !violations.is_empty() {
            return Err(ValidationError::Structural {
                context: options.failure_context(index, document),
                violations: ValidationViolations::new(violations, options.no_pretty_error),
            });
        }

        for extensions in &self.extensions_validators {
            extensions
                .validate(&data, &schema)
                .map_err(|violation| ValidationError::Extension {
                    context: options.failure_context(index, document),
                    violation,
                })?;
        }

        apply_defaults(&mut data, &schema);
        *document = encode_value(&data)?;
        Ok(())
    }

    fn resolve_schema(&self, index: &mut SchemaIndex) -> Option<Arc<Schema>> {
        if let Some(schema) = self.get(index) {
            return Some(schema);
        }

        let fallback = self
            .version_fallbacks
            .get(index.version())
            .filter(|fallback| !fallback.is_empty())
            .cloned();
        match fallback {
            Some(fallback) => {
                debug!(from = index.version(), to = %fallback, "applying version fallback");
                index.set_version(fallback);
                self.get(index)
            }
            None => {
                debug!(%index, version = index.version(), "no fallback schema for version");
                None
            }
        }
    }

    fn transformers_for(&self, index: &SchemaIndex) -> &[Arc<dyn SchemaTransformer>] {
        match self.transformers.get(index) {
            Some(transformers) if !transformers.is_empty() => transformers,
            _ => &self.default_transformers,
        }
    }
}

/// Every structural violation of `data` against `schema`.
fn structural_violations(
    schema: &Schema,
    data: &Value,
    index: &SchemaIndex,
    strict: bool,
) -> Result<Vec<Violation>, ValidationError> {
    let compile_error = |reason: String| ValidationError::SchemaCompile {
        index: index.clone(),
        reason,
    };

    let schema_value = schema.to_value().map_err(|e| compile_error(e.to_string()))?;
    let mut opts = jsonschema::options();
    opts.with_draft(jsonschema::Draft::Draft4);
    let compiled = opts
        .build(&schema_value)
        .map_err(|e| compile_error(e.to_string()))?;

    let mut violations = Vec::new();

    if strict && !schema.properties.is_empty() {
        if let Value::Object(fields) = data {
            violations.extend(
                fields
                    .keys()
                    .filter(|field| !schema.properties.contains_key(*field))
                    .map(|field| Violation {
                        instance_path: String::new(),
                        schema_path: "/properties".to_string(),
                        message: format!("unknown field {field:?}"),
                    }),
            );
        }
    }

    violations.extend(compiled.iter_errors(data).map(|e| Violation {
        instance_path: e.instance_path.to_string(),
        schema_path: e.schema_path.to_string(),
        message: e.to_string(),
    }));

    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformer::TransformerKind;
    use docgate_core::ErrorKind;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::from_value(json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "apiVersion": {"type": "string"},
                "kind": {"type": "string"},
                "name": {"type": "string"},
                "replicas": {"type": "integer", "default": 1}
            }
        }))
        .unwrap()
    }

    fn index() -> SchemaIndex {
        SchemaIndex::new("App", "example.io/v1")
    }

    fn validator() -> Validator {
        let mut validator = Validator::default();
        validator.add_schema(index(), schema());
        validator
    }

    #[test]
    fn fallback_is_one_hop() {
        let mut validator = validator();
        validator
            .add_version_fallback("example.io/v1beta1", "example.io/v1alpha1")
            .add_version_fallback("example.io/v1alpha1", "example.io/v1");

        let mut index = SchemaIndex::new("App", "example.io/v1beta1");
        assert!(validator.resolve_schema(&mut index).is_none());
        assert_eq!(index.version(), "example.io/v1alpha1");

        let mut index = SchemaIndex::new("App", "example.io/v1alpha1");
        assert!(validator.resolve_schema(&mut index).is_some());
        assert_eq!(index, self::index());
    }

    #[test]
    fn empty_fallback_is_ignored() {
        let mut validator = validator();
        validator.add_version_fallback("example.io/v2", "");
        let mut index = SchemaIndex::new("App", "example.io/v2");
        assert!(validator.resolve_schema(&mut index).is_none());
        assert_eq!(index.version(), "example.io/v2");
    }

    #[test]
    fn empty_index_list_uses_defaults() {
        let mut validator = validator();
        validator
            .set_default_transformers([TransformerKind::CloseAll.transformer()])
            .add_transformers(index(), []);
        assert_eq!(validator.transformers_for(&index()).len(), 1);

        validator.add_transformers(index(), [
            TransformerKind::CloseUnset.transformer(),
            TransformerKind::CloseAll.transformer(),
        ]);
        assert_eq!(validator.transformers_for(&index()).len(), 2);
    }

    #[test]
    fn config_transformers_are_registered() {
        let config = ValidatorConfig::from_yaml(
            b"defaultTransformers: [closeUnset]\ntransformers:\n- {kind: App, apiVersion: example.io/v1, use: [closeAll, closeAll]}\n",
        )
        .unwrap();
        let validator = Validator::new(config);
        assert_eq!(validator.transformers_for(&index()).len(), 2);
        assert_eq!(
            validator
                .transformers_for(&SchemaIndex::new("Other", "v1"))
                .len(),
            1
        );
    }

    #[test]
    fn strict_mode_reports_undeclared_top_level_fields() {
        let validator = validator();
        let mut doc = b"apiVersion: example.io/v1\nkind: App\nname: web\nextra: 1\n".to_vec();
        validator.validate(&mut doc.clone(), ValidateOptions::default()).unwrap();

        let err = validator
            .validate(&mut doc, ValidateOptions::default().strict().compact())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert!(err.to_string().contains("unknown field \"extra\""), "{err}");
    }

    #[test]
    fn uncompilable_schema_is_reported() {
        let mut validator = Validator::default();
        validator.add_schema(
            index(),
            Schema::from_value(json!({"type": "object", "minProperties": "many"})).unwrap(),
        );
        let mut doc = b"apiVersion: example.io/v1\nkind: App\n".to_vec();
        let err = validator.validate(&mut doc, ValidateOptions::default()).unwrap_err();
        assert!(matches!(err, ValidationError::SchemaCompile { .. }), "{err}");
    }

    #[test]
    fn debug_lists_registered_indices() {
        let rendered = format!("{:?}", validator());
        assert!(rendered.contains("App"), "{rendered}");
    }
}
