//! # Schema Validation
//!
//! Runtime validation of stat-documents against JSON Schema definitions
//! (Draft 7).
//!
//! ## Invariant
//!
//! Schema validation is the first gate every document passes before the
//! structural checks in `statcube-core` run. Documents that fail validation
//! are rejected with structured error information: the instance path, the
//! schema path, and a human-readable message per violation.
//!
//! ## Schema Resolution
//!
//! The built-in schemas (currently `dataset.schema.json`) are compiled into
//! the binary. A validator created from a directory loads every
//! `*.schema.json` file there on top of the built-ins, so callers can ship
//! per-dataset schemas that restrict allowed categories or sources.
//!
//! Cross-schema `$ref`s of the form
//! `https://schemas.statcube.org/<filename>` resolve against the loaded set
//! without touching the network.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use jsonschema::{Retrieve, Uri, ValidationOptions, Validator};
use serde_json::Value;
use thiserror::Error;

use crate::document::load_document;

/// Filename of the built-in stat-document dataset schema.
pub const DATASET_SCHEMA: &str = "dataset.schema.json";

/// URI prefix used by `$id` and `$ref` in statcube schemas.
const SCHEMA_URI_PREFIX: &str = "https://schemas.statcube.org/";

/// Schemas compiled into the crate, by filename.
const BUILTIN_SCHEMAS: &[(&str, &str)] = &[(
    DATASET_SCHEMA,
    include_str!("../schemas/dataset.schema.json"),
)];

/// Local retriever that resolves `$ref` URIs to schemas loaded in memory.
///
/// Unknown URIs resolve to a permissive schema instead of triggering a
/// network request.
struct LocalSchemaRetriever {
    schemas_by_uri: HashMap<String, Value>,
}

impl Retrieve for LocalSchemaRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri_str = uri.as_str();

        if let Some(value) = self.schemas_by_uri.get(uri_str) {
            return Ok(value.clone());
        }

        let filename = uri_str.rsplit('/').next().unwrap_or(uri_str);
        if let Some(value) = self.schemas_by_uri.get(filename) {
            return Ok(value.clone());
        }

        Ok(serde_json::json!({}))
    }
}

/// Error during schema validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The document did not conform to the schema.
    #[error("validation failed against schema '{schema_name}':\n{violations}")]
    ValidationFailed {
        /// Name of the schema that was validated against.
        schema_name: String,
        /// Structured list of individual violations.
        violations: ValidationViolations,
    },

    /// The schema file could not be loaded.
    #[error("schema load error for '{schema_name}': {reason}")]
    SchemaLoadError {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the schema could not be loaded.
        reason: String,
    },

    /// The document file could not be loaded or parsed.
    #[error("document load error for '{path}': {reason}")]
    DocumentLoadError {
        /// Path to the document that failed to load.
        path: String,
        /// Reason the document could not be loaded.
        reason: String,
    },

    /// The document could not be rendered or written.
    #[error("document write error for '{path}': {reason}")]
    DocumentWriteError {
        /// Destination path.
        path: String,
        /// Reason the write failed.
        reason: String,
    },

    /// The compiled validator could not be built (e.g., invalid schema).
    #[error("validator build error for schema '{schema_name}': {reason}")]
    ValidatorBuildError {
        /// Schema filename or identifier.
        schema_name: String,
        /// Reason the validator could not be built.
        reason: String,
    },

    /// IO error reading schema or document.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single validation violation with structured context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "  (root): {}", self.message)
        } else {
            write!(f, "  {}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of validation violations.
#[derive(Debug, Clone)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
}

impl ValidationViolations {
    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{v}")?;
        }
        Ok(())
    }
}

/// A schema compiled once and reusable for any number of documents.
pub struct CompiledSchema {
    name: String,
    validator: Validator,
}

impl CompiledSchema {
    /// The schema filename this validator was compiled from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true if the instance conforms to the schema.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Validate an instance, collecting every violation.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::ValidationFailed` with structured
    /// violation details if the document is invalid.
    pub fn validate(&self, instance: &Value) -> Result<(), SchemaValidationError> {
        let errors: Vec<Violation> = self
            .validator
            .iter_errors(instance)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            tracing::debug!(
                schema = %self.name,
                violations = errors.len(),
                "document rejected by schema"
            );
            Err(SchemaValidationError::ValidationFailed {
                schema_name: self.name.clone(),
                violations: ValidationViolations { violations: errors },
            })
        }
    }
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// A schema registry backed by the `jsonschema` crate.
///
/// Holds the built-in schemas plus, optionally, every `*.schema.json` file
/// from a directory. Schemas loaded from disk override built-ins with the
/// same filename.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    /// Directory the extra schemas were loaded from, if any.
    schema_dir: Option<PathBuf>,
    /// Map from schema filename (e.g., "dataset.schema.json") to parsed JSON value.
    schemas: HashMap<String, Value>,
}

impl SchemaValidator {
    /// Create a validator holding only the built-in schemas.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::SchemaLoadError` if a built-in schema
    /// is not valid JSON.
    pub fn builtin() -> Result<Self, SchemaValidationError> {
        let mut schemas = HashMap::new();
        for (name, source) in BUILTIN_SCHEMAS {
            let value: Value = serde_json::from_str(source).map_err(|e| {
                SchemaValidationError::SchemaLoadError {
                    schema_name: (*name).to_string(),
                    reason: format!("invalid JSON: {e}"),
                }
            })?;
            schemas.insert((*name).to_string(), value);
        }
        Ok(Self {
            schema_dir: None,
            schemas,
        })
    }

    /// Create a validator with the built-ins plus every schema in `schema_dir`.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::SchemaLoadError` if the directory or
    /// any schema file in it cannot be read or parsed as JSON.
    pub fn new(schema_dir: impl AsRef<Path>) -> Result<Self, SchemaValidationError> {
        let schema_dir = schema_dir.as_ref().to_path_buf();
        let mut validator = Self::builtin()?;

        let entries = std::fs::read_dir(&schema_dir).map_err(|e| {
            SchemaValidationError::SchemaLoadError {
                schema_name: schema_dir.display().to_string(),
                reason: format!("cannot read schema directory: {e}"),
            }
        })?;

        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.ends_with(".schema.json") {
                    let content = std::fs::read_to_string(&path)?;
                    let value: Value = serde_json::from_str(&content).map_err(|e| {
                        SchemaValidationError::SchemaLoadError {
                            schema_name: name.to_string(),
                            reason: format!("invalid JSON: {e}"),
                        }
                    })?;
                    validator.schemas.insert(name.to_string(), value);
                }
            }
        }

        tracing::debug!(
            dir = %schema_dir.display(),
            schemas = validator.schemas.len(),
            "loaded schema directory"
        );
        validator.schema_dir = Some(schema_dir);
        Ok(validator)
    }

    /// Returns the schema directory path, if schemas were loaded from disk.
    pub fn schema_dir(&self) -> Option<&Path> {
        self.schema_dir.as_deref()
    }

    /// Returns the number of loaded schemas.
    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }

    /// Returns the names of all loaded schemas, sorted alphabetically.
    pub fn schema_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemas.keys().map(|s| s.as_str()).collect();
        names.sort();
        names
    }

    /// Build `ValidationOptions` with every loaded schema reachable through
    /// the local retriever, under its prefixed URI, its own `$id`, and its
    /// bare filename.
    fn build_options(&self) -> ValidationOptions {
        let mut opts = jsonschema::options();
        opts.with_draft(jsonschema::Draft::Draft7);

        let mut schemas_by_uri: HashMap<String, Value> = HashMap::new();
        for (filename, value) in &self.schemas {
            schemas_by_uri.insert(format!("{SCHEMA_URI_PREFIX}{filename}"), value.clone());
            if let Some(id_str) = value.get("$id").and_then(|v| v.as_str()) {
                schemas_by_uri.insert(id_str.to_string(), value.clone());
            }
            schemas_by_uri.insert(filename.clone(), value.clone());
        }

        opts.with_retriever(LocalSchemaRetriever { schemas_by_uri });
        opts
    }

    /// Compile a named schema.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::SchemaLoadError` if the schema is not
    /// loaded, or `SchemaValidationError::ValidatorBuildError` if it does
    /// not compile.
    pub fn compile(&self, schema_name: &str) -> Result<CompiledSchema, SchemaValidationError> {
        let schema_value = self.schemas.get(schema_name).ok_or_else(|| {
            SchemaValidationError::SchemaLoadError {
                schema_name: schema_name.to_string(),
                reason: match &self.schema_dir {
                    Some(dir) => format!("schema not found in {}", dir.display()),
                    None => "schema not found among built-in schemas".to_string(),
                },
            }
        })?;

        let validator = self.build_options().build(schema_value).map_err(|e| {
            SchemaValidationError::ValidatorBuildError {
                schema_name: schema_name.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(CompiledSchema {
            name: schema_name.to_string(),
            validator,
        })
    }

    /// Validate a parsed JSON value against a named schema.
    ///
    /// Compiles the schema on every call; hold a [`CompiledSchema`] when
    /// validating many documents.
    pub fn validate_document(
        &self,
        instance: &Value,
        schema_name: &str,
    ) -> Result<(), SchemaValidationError> {
        self.compile(schema_name)?.validate(instance)
    }

    /// Load a JSON or YAML document from disk and validate it.
    ///
    /// The format is chosen from the file extension (`.yaml`/`.yml` for
    /// YAML, anything else for JSON). Violations are reported under the
    /// schema name suffixed with the document path.
    pub fn validate_file(
        &self,
        document_path: &Path,
        schema_name: &str,
    ) -> Result<(), SchemaValidationError> {
        let document = load_document(document_path)?;
        self.validate_document(&document, schema_name)
            .map_err(|e| match e {
                SchemaValidationError::ValidationFailed { violations, .. } => {
                    SchemaValidationError::ValidationFailed {
                        schema_name: format!("{schema_name} ({})", document_path.display()),
                        violations,
                    }
                }
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal_dataset() -> Value {
        json!({
            "id": ["gender"],
            "size": [2],
            "value": [1, 2],
            "dimension": {
                "gender": { "category": { "index": ["M", "F"] } }
            }
        })
    }

    #[test]
    fn test_builtin_contains_dataset_schema() {
        let validator = SchemaValidator::builtin().unwrap();
        assert!(validator.schema_names().contains(&DATASET_SCHEMA));
        assert!(validator.schema_dir().is_none());
    }

    #[test]
    fn test_valid_dataset_passes() {
        let validator = SchemaValidator::builtin().unwrap();
        validator
            .validate_document(&minimal_dataset(), DATASET_SCHEMA)
            .unwrap();
    }

    #[test]
    fn test_sparse_value_and_status_pass() {
        let validator = SchemaValidator::builtin().unwrap();
        let mut doc = minimal_dataset();
        doc["value"] = json!({ "1": 4 });
        doc["status"] = json!({ "0": "x" });
        validator.validate_document(&doc, DATASET_SCHEMA).unwrap();
    }

    #[test]
    fn test_missing_required_fields_rejected() {
        let validator = SchemaValidator::builtin().unwrap();
        let faulty = [
            json!({ "value": "foo", "size": "bar" }),
            json!({ "value": [], "size": [] }),
            json!({ "id": [], "size": [] }),
            json!({ "value": [], "id": [] }),
        ];
        for doc in &faulty {
            let err = validator.validate_document(doc, DATASET_SCHEMA).unwrap_err();
            assert!(
                matches!(err, SchemaValidationError::ValidationFailed { .. }),
                "Expected ValidationFailed for {doc}, got: {err}"
            );
        }
    }

    #[test]
    fn test_violation_mentions_missing_field() {
        let validator = SchemaValidator::builtin().unwrap();
        let doc = json!({ "id": [], "size": [], "value": [] });
        match validator.validate_document(&doc, DATASET_SCHEMA) {
            Err(SchemaValidationError::ValidationFailed { violations, .. }) => {
                let messages: Vec<&str> = violations
                    .violations()
                    .iter()
                    .map(|v| v.message.as_str())
                    .collect();
                assert!(
                    messages.iter().any(|m| m.contains("dimension")),
                    "Expected violation mentioning 'dimension', got: {messages:?}"
                );
            }
            other => panic!("Expected ValidationFailed, got: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_class_rejected() {
        let validator = SchemaValidator::builtin().unwrap();
        let mut doc = minimal_dataset();
        doc["class"] = json!("collection");
        assert!(validator.validate_document(&doc, DATASET_SCHEMA).is_err());
    }

    #[test]
    fn test_negative_size_rejected() {
        let validator = SchemaValidator::builtin().unwrap();
        let mut doc = minimal_dataset();
        doc["size"] = json!([-2]);
        assert!(validator.validate_document(&doc, DATASET_SCHEMA).is_err());
    }

    #[test]
    fn test_compiled_schema_reusable() {
        let validator = SchemaValidator::builtin().unwrap();
        let compiled = validator.compile(DATASET_SCHEMA).unwrap();
        assert_eq!(compiled.name(), DATASET_SCHEMA);
        assert!(compiled.is_valid(&minimal_dataset()));
        assert!(!compiled.is_valid(&json!({})));
        assert!(compiled.validate(&minimal_dataset()).is_ok());
    }

    #[test]
    fn test_schema_not_found() {
        let validator = SchemaValidator::builtin().unwrap();
        let err = validator
            .validate_document(&json!({}), "nonexistent.schema.json")
            .unwrap_err();
        assert!(
            matches!(err, SchemaValidationError::SchemaLoadError { .. }),
            "Expected SchemaLoadError, got: {err}"
        );
    }

    #[test]
    fn test_violation_display_format() {
        let v = Violation {
            instance_path: "/size/0".to_string(),
            schema_path: "/properties/size/items/minimum".to_string(),
            message: "-2 is less than the minimum of 0".to_string(),
        };
        let display = v.to_string();
        assert!(display.contains("/size/0"));
        assert!(display.contains("minimum"));
    }

    #[test]
    fn test_violation_display_root() {
        let v = Violation {
            instance_path: String::new(),
            schema_path: "/required".to_string(),
            message: r#""dimension" is a required property"#.to_string(),
        };
        assert!(v.to_string().contains("(root)"));
    }
}
