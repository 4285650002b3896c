//! # Structural Validation
//!
//! Every dataset construction and rebuild runs the document through
//! [`validate_document`] before anything is stored. Checks are fail-fast and
//! run in a fixed order:
//!
//! 1. Schema shape, against the built-in `dataset.schema.json`.
//! 2. `id` entries and `dimension` keys are in bijection.
//! 3. `size` and `id` have the same length.
//! 4. Every category index is well formed and `size[i]` equals the
//!    category count of dimension `id[i]`.
//! 5. `value` has `product(size)` cells; sparse keys are in range and a
//!    dense `status` array matches `value` in length. A sparse `value` may
//!    expand to at most [`MAX_SPARSE_CELLS`] cells.
//!
//! The built-in schema is compiled once per process.

use std::collections::HashSet;
use std::sync::OnceLock;

use serde_json::{Map, Value};
use statcube_schema::{CompiledSchema, SchemaValidationError, SchemaValidator, DATASET_SCHEMA};

use crate::dimension::Dimension;
use crate::error::{DatasetError, MalformedStructure};

/// Largest cross-product a sparse `value` object is expanded to.
pub const MAX_SPARSE_CELLS: usize = 1 << 24;

/// A document that passed validation, with its cells normalized to dense
/// arrays in row-major order.
#[derive(Debug, Clone)]
pub(crate) struct Structure {
    pub(crate) dimensions: Vec<Dimension>,
    pub(crate) values: Vec<Value>,
    pub(crate) statuses: Vec<String>,
}

/// Check a stat-document for schema conformance and structural consistency.
///
/// # Errors
///
/// Returns the first failure found: [`DatasetError::Schema`] for schema
/// violations, [`DatasetError::Malformed`] for structural ones.
pub fn validate_document(document: &Value) -> Result<(), DatasetError> {
    check(document).map(|_| ())
}

/// Validate and parse a document in one pass.
pub(crate) fn check(document: &Value) -> Result<Structure, DatasetError> {
    builtin_schema()?.validate(document)?;
    let root = document.as_object().ok_or(MalformedStructure::NotAnObject)?;

    let ids = string_list(root.get("id"));
    let dimension_objects = root
        .get("dimension")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    check_bijection(&ids, &dimension_objects)?;

    let sizes: Vec<usize> = root
        .get("size")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|s| s.as_u64().and_then(|n| usize::try_from(n).ok()).unwrap_or(usize::MAX))
                .collect()
        })
        .unwrap_or_default();
    if sizes.len() != ids.len() {
        return Err(MalformedStructure::SizeIdLength {
            size: sizes.len(),
            id: ids.len(),
        }
        .into());
    }

    let mut dimensions = Vec::with_capacity(ids.len());
    for (id, &declared) in ids.iter().zip(&sizes) {
        let object = dimension_objects
            .get(id)
            .ok_or_else(|| MalformedStructure::MissingDimension(id.clone()))?;
        let dimension = Dimension::from_json(id, object)?;
        if dimension.len() != declared {
            return Err(MalformedStructure::SizeMismatch {
                dimension: id.clone(),
                declared,
                actual: dimension.len(),
            }
            .into());
        }
        dimensions.push(dimension);
    }

    // A dense array bounds the cell count by its own length; a sparse one does not.
    let sparse_values = matches!(root.get("value"), Some(Value::Object(_)));
    let total = sizes
        .iter()
        .try_fold(1usize, |acc, &size| acc.checked_mul(size))
        .filter(|&total| !sparse_values || total <= MAX_SPARSE_CELLS)
        .ok_or_else(|| MalformedStructure::CellCount {
            sizes: sizes.clone(),
            limit: MAX_SPARSE_CELLS,
        })?;
    let values = dense_values(root.get("value"), total)?;
    let statuses = dense_statuses(root.get("status"), total)?;

    tracing::debug!(
        dimensions = dimensions.len(),
        cells = values.len(),
        "stat-document validated"
    );

    Ok(Structure {
        dimensions,
        values,
        statuses,
    })
}

fn builtin_schema() -> Result<&'static CompiledSchema, DatasetError> {
    static SCHEMA: OnceLock<Result<CompiledSchema, SchemaValidationError>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| SchemaValidator::builtin()?.compile(DATASET_SCHEMA))
        .as_ref()
        .map_err(|e| DatasetError::SchemaUnavailable(e.to_string()))
}

fn check_bijection(ids: &[String], dimensions: &Map<String, Value>) -> Result<(), MalformedStructure> {
    if let Some(missing) = ids.iter().find(|id| !dimensions.contains_key(*id)) {
        return Err(MalformedStructure::MissingDimension(missing.clone()));
    }
    if let Some(unlisted) = dimensions.keys().find(|key| !ids.contains(key)) {
        return Err(MalformedStructure::UnlistedDimension(unlisted.clone()));
    }
    let mut seen = HashSet::new();
    if let Some(repeated) = ids.iter().find(|id| !seen.insert(id.as_str())) {
        return Err(MalformedStructure::DuplicateDimension(repeated.clone()));
    }
    Ok(())
}

fn dense_values(value: Option<&Value>, total: usize) -> Result<Vec<Value>, MalformedStructure> {
    match value {
        Some(Value::Array(items)) => {
            if items.len() != total {
                return Err(MalformedStructure::ValueLength {
                    expected: total,
                    actual: items.len(),
                });
            }
            Ok(items.clone())
        }
        Some(Value::Object(sparse)) => {
            let mut dense = vec![Value::Null; total];
            for (key, cell) in sparse {
                dense[sparse_index("value", key, total)?] = cell.clone();
            }
            Ok(dense)
        }
        _ => Err(MalformedStructure::ValueLength {
            expected: total,
            actual: 0,
        }),
    }
}

fn dense_statuses(status: Option<&Value>, total: usize) -> Result<Vec<String>, MalformedStructure> {
    match status {
        None | Some(Value::Null) => Ok(vec![String::new(); total]),
        Some(Value::String(single)) => Ok(vec![single.clone(); total]),
        Some(Value::Array(items)) => {
            if items.len() != total {
                return Err(MalformedStructure::StatusLength {
                    status: items.len(),
                    value: total,
                });
            }
            Ok(items.iter().map(status_text).collect())
        }
        Some(Value::Object(sparse)) => {
            let mut dense = vec![String::new(); total];
            for (key, cell) in sparse {
                dense[sparse_index("status", key, total)?] = status_text(cell);
            }
            Ok(dense)
        }
        Some(other) => Err(MalformedStructure::SparseIndex {
            field: "status",
            index: other.to_string(),
        }),
    }
}

fn sparse_index(field: &'static str, key: &str, total: usize) -> Result<usize, MalformedStructure> {
    key.parse::<usize>()
        .ok()
        .filter(|&index| index < total)
        .ok_or_else(|| MalformedStructure::SparseIndex {
            field,
            index: key.to_string(),
        })
}

fn status_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "class": "dataset",
            "version": "2.0",
            "id": ["region", "gender"],
            "size": [2, 2],
            "value": [1, 2, 3, 4],
            "dimension": {
                "region": { "category": { "index": { "Stockholm": 0, "Solna": 1 } } },
                "gender": { "category": { "index": ["M", "F"] } }
            }
        })
    }

    fn malformed(document: &Value) -> MalformedStructure {
        match validate_document(document) {
            Err(DatasetError::Malformed(m)) => m,
            other => panic!("expected malformed-structure failure, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_document() {
        let structure = check(&document()).unwrap();
        assert_eq!(structure.dimensions.len(), 2);
        assert_eq!(structure.values, vec![json!(1), json!(2), json!(3), json!(4)]);
        assert_eq!(structure.statuses, vec![String::new(); 4]);
    }

    #[test]
    fn test_schema_violation_comes_first() {
        let mut doc = document();
        doc["size"] = json!("two");
        doc["id"] = json!(["region"]);
        assert!(matches!(validate_document(&doc), Err(DatasetError::Schema(_))));
    }

    #[test]
    fn test_missing_dimension() {
        let mut doc = document();
        doc["id"] = json!(["region", "gender", "age"]);
        assert_eq!(malformed(&doc), MalformedStructure::MissingDimension("age".into()));
    }

    #[test]
    fn test_unlisted_dimension() {
        let mut doc = document();
        doc["id"] = json!(["region"]);
        assert_eq!(malformed(&doc), MalformedStructure::UnlistedDimension("gender".into()));
    }

    #[test]
    fn test_repeated_dimension() {
        let mut doc = document();
        doc["id"] = json!(["region", "gender", "region"]);
        assert_eq!(malformed(&doc), MalformedStructure::DuplicateDimension("region".into()));
    }

    #[test]
    fn test_size_id_length() {
        let mut doc = document();
        doc["size"] = json!([2, 2, 1]);
        assert_eq!(malformed(&doc), MalformedStructure::SizeIdLength { size: 3, id: 2 });
    }

    #[test]
    fn test_size_mismatch_names_dimension() {
        let mut doc = document();
        doc["size"] = json!([1, 1]);
        doc["value"] = json!([1]);
        assert_eq!(
            malformed(&doc),
            MalformedStructure::SizeMismatch {
                dimension: "region".into(),
                declared: 1,
                actual: 2
            }
        );
    }

    #[test]
    fn test_value_length() {
        let mut doc = document();
        doc["value"] = json!([1, 2, 3]);
        assert_eq!(
            malformed(&doc),
            MalformedStructure::ValueLength {
                expected: 4,
                actual: 3
            }
        );
    }

    #[test]
    fn test_sparse_value_normalized() {
        let mut doc = document();
        doc["value"] = json!({ "0": 1, "3": 4 });
        doc["status"] = json!({ "3": "p" });
        let structure = check(&doc).unwrap();
        assert_eq!(structure.values, vec![json!(1), Value::Null, Value::Null, json!(4)]);
        assert_eq!(structure.statuses, vec!["", "", "", "p"]);
    }

    #[test]
    fn test_sparse_index_out_of_range() {
        let mut doc = document();
        doc["value"] = json!({ "4": 1 });
        assert_eq!(
            malformed(&doc),
            MalformedStructure::SparseIndex {
                field: "value",
                index: "4".into()
            }
        );
    }

    #[test]
    fn test_single_status_broadcast() {
        let mut doc = document();
        doc["status"] = json!("e");
        assert_eq!(check(&doc).unwrap().statuses, vec!["e"; 4]);
    }

    #[test]
    fn test_status_length() {
        let mut doc = document();
        doc["status"] = json!(["a", "b"]);
        assert_eq!(malformed(&doc), MalformedStructure::StatusLength { status: 2, value: 4 });
    }

    #[test]
    fn test_broken_category_index() {
        let mut doc = document();
        doc["dimension"]["region"]["category"]["index"] = json!({ "Stockholm": 0, "Solna": 5 });
        assert!(matches!(malformed(&doc), MalformedStructure::CategoryIndex { .. }));
    }

    fn wide_sparse_document(dimensions: usize, categories: usize) -> Value {
        let index: Vec<String> = (0..categories).map(|c| format!("c{c}")).collect();
        let ids: Vec<String> = (0..dimensions).map(|d| format!("d{d}")).collect();
        let mut objects = Map::new();
        for id in &ids {
            objects.insert(id.clone(), json!({ "category": { "index": index } }));
        }
        json!({
            "id": ids,
            "size": vec![categories; dimensions],
            "value": { "0": 1 },
            "dimension": objects
        })
    }

    #[test]
    fn test_overflowing_cell_count() {
        let doc = wide_sparse_document(8, 300);
        assert_eq!(
            malformed(&doc),
            MalformedStructure::CellCount {
                sizes: vec![300; 8],
                limit: MAX_SPARSE_CELLS
            }
        );

        let mut dense = doc;
        dense["value"] = json!([1]);
        assert!(matches!(malformed(&dense), MalformedStructure::CellCount { .. }));
    }

    #[test]
    fn test_sparse_cell_limit() {
        // 300^3 cells fit in usize but exceed the sparse expansion limit.
        let doc = wide_sparse_document(3, 300);
        assert!(matches!(malformed(&doc), MalformedStructure::CellCount { .. }));

        let small = wide_sparse_document(2, 300);
        let structure = check(&small).unwrap();
        assert_eq!(structure.values.len(), 90_000);
        assert_eq!(structure.values[0], json!(1));
        assert_eq!(structure.values[1], Value::Null);
    }
}
