//! # Document Loading
//!
//! Reads and writes stat-documents as JSON or YAML. YAML input is converted
//! to the equivalent `serde_json::Value` tree so every downstream consumer
//! works on one representation.

use std::path::Path;

use serde_json::Value;

use crate::validate::SchemaValidationError;

/// Serialized form of a document on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// JSON text.
    Json,
    /// YAML text (JSON-compatible subset).
    Yaml,
}

impl DocumentFormat {
    /// Pick a format from a file extension; anything but `yaml`/`yml` is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }
}

/// Parse document text in the given format.
pub fn parse_document(content: &str, format: DocumentFormat) -> Result<Value, String> {
    match format {
        DocumentFormat::Json => {
            serde_json::from_str(content).map_err(|e| format!("invalid JSON: {e}"))
        }
        DocumentFormat::Yaml => {
            let yaml_value: serde_yaml::Value =
                serde_yaml::from_str(content).map_err(|e| format!("invalid YAML: {e}"))?;
            yaml_to_json_value(&yaml_value)
                .map_err(|e| format!("YAML-to-JSON conversion failed: {e}"))
        }
    }
}

/// Load a JSON or YAML document from disk.
///
/// # Errors
///
/// Returns `SchemaValidationError::DocumentLoadError` if the file cannot be
/// read or parsed.
pub fn load_document(path: &Path) -> Result<Value, SchemaValidationError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        SchemaValidationError::DocumentLoadError {
            path: path.display().to_string(),
            reason: format!("cannot read file: {e}"),
        }
    })?;

    parse_document(&content, DocumentFormat::from_path(path)).map_err(|reason| {
        SchemaValidationError::DocumentLoadError {
            path: path.display().to_string(),
            reason,
        }
    })
}

/// Render a document as text in the given format.
pub fn render_document(document: &Value, format: DocumentFormat) -> Result<String, String> {
    match format {
        DocumentFormat::Json => serde_json::to_string_pretty(document).map_err(|e| e.to_string()),
        DocumentFormat::Yaml => serde_yaml::to_string(document).map_err(|e| e.to_string()),
    }
}

/// Write a document to disk, choosing the format from the extension.
///
/// # Errors
///
/// Returns `SchemaValidationError::DocumentWriteError` if rendering or
/// writing fails.
pub fn write_document(path: &Path, document: &Value) -> Result<(), SchemaValidationError> {
    let write_error = |reason: String| SchemaValidationError::DocumentWriteError {
        path: path.display().to_string(),
        reason,
    };
    let text = render_document(document, DocumentFormat::from_path(path)).map_err(write_error)?;
    std::fs::write(path, text).map_err(|e| write_error(e.to_string()))
}

/// Convert a `serde_yaml::Value` to a `serde_json::Value`.
///
/// Stat-documents use only the JSON-compatible subset of YAML. Tags are
/// dropped; non-string map keys are stringified.
pub fn yaml_to_json_value(yaml: &serde_yaml::Value) -> Result<Value, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Value::Null),
        serde_yaml::Value::Bool(b) => Ok(Value::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Number(serde_json::Number::from(i)))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::Number(serde_json::Number::from(u)))
            } else if let Some(f) = n.as_f64() {
                serde_json::Number::from_f64(f)
                    .map(Value::Number)
                    .ok_or_else(|| format!("cannot represent float {f} in JSON"))
            } else {
                Err(format!("unsupported YAML number: {n:?}"))
            }
        }
        serde_yaml::Value::String(s) => Ok(Value::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Value>, String> = seq.iter().map(yaml_to_json_value).collect();
            Ok(Value::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut json_map = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    other => return Err(format!("unsupported YAML map key type: {other:?}")),
                };
                json_map.insert(key, yaml_to_json_value(v)?);
            }
            Ok(Value::Object(json_map))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json_value(&tagged.value),
    }
}
