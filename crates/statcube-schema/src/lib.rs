//! # statcube-schema — Schema Validation & Document Loading
//!
//! Provides the schema-validation service used by `statcube-core` before
//! any structural check runs on a stat-document.
//!
//! ## Runtime Validation (`validate`)
//!
//! [`SchemaValidator`] holds the built-in `dataset.schema.json` plus any
//! `*.schema.json` files from a caller-supplied directory, and compiles
//! them into reusable [`CompiledSchema`]s. Failures carry one structured
//! [`Violation`] per problem (instance path, schema path, message).
//!
//! ## Document I/O (`document`)
//!
//! Stat-documents are read from and written to JSON or YAML files; the
//! format follows the file extension.
//!
//! ## Crate Policy
//!
//! - Depends on no other `statcube-*` crate (leaf of the workspace DAG).
//! - No network access during `$ref` resolution.

pub mod document;
pub mod validate;

pub use document::{
    load_document, parse_document, render_document, write_document, yaml_to_json_value,
    DocumentFormat,
};
pub use validate::{
    CompiledSchema, SchemaValidationError, SchemaValidator, ValidationViolations, Violation,
    DATASET_SCHEMA,
};
