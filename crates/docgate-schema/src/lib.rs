//! # docgate-schema: Schema Registry & Validation Pipeline
//!
//! Validates documents against schemas selected by their
//! `(kind, apiVersion)` identity.
//!
//! ## Loading (`loader`)
//!
//! [`load_schemas`] turns a schema definition (one kind, several versions
//! with inline OpenAPI schemas) into [`IndexedSchema`] records. Local
//! `$ref`s are inlined and open object shapes are closed.
//!
//! ## Validating (`validator`)
//!
//! [`Validator`] holds the registries (schemas, pre-validators, version
//! fallbacks, transformers, extension validators) and runs the pipeline:
//! resolve, pre-validate, transform, structural check, extension rules,
//! defaulting. Structural checks use the `jsonschema` crate with draft 4
//! semantics, the dialect OpenAPI v3 schemas are written in.
//!
//! ## Extending
//!
//! - [`SchemaTransformer`] rewrites schemas before use.
//! - [`PreValidator`] supplies or overrides a schema per index.
//! - [`ExtensionsValidator`] runs named rules declared under `x-rules`.
//!
//! ## Crate Policy
//!
//! - Depends only on `docgate-core` internally.
//! - Registered schemas are never mutated after registration; transformers
//!   work on copies.
//! - No `.unwrap()` outside tests.

pub mod config;
pub mod defaults;
pub mod extensions;
pub mod loader;
pub mod schema;
pub mod transformer;
pub mod validator;

pub use config::{default_version_fallbacks, ConfigError, IndexTransformers, ValidatorConfig};
pub use defaults::apply_defaults;
pub use extensions::{ExtensionsValidator, RuleHandler, X_RULES_EXTENSION};
pub use loader::{expand_refs, load_schemas, read_schemas, IndexedSchema, SchemaLoadError};
pub use schema::{Schema, SchemaItems, SchemaOrBool};
pub use transformer::{
    audit_open_shapes, transform_schema, AdditionalPropertiesTransformer, OpenShapeFinding,
    SchemaTransformer, TransformerKind,
};
pub use validator::{PreValidator, ValidateOptions, Validator};
