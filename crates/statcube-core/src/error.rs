//! # Error Types
//!
//! Every fallible operation in this crate returns [`DatasetError`]. All
//! failures are synchronous and leave the input datasets untouched.
//!
//! ## Taxonomy
//!
//! - Schema violations come from `statcube-schema` and carry per-field
//!   violations.
//! - Structural violations ([`MalformedStructure`]) name the invariant that
//!   failed together with the conflicting ids or counts.
//! - Lookup failures carry the missing id.
//! - Merge failures are all-or-nothing: the base dataset is unchanged.

use statcube_schema::SchemaValidationError;
use thiserror::Error;

/// Top-level error type for dataset operations.
#[derive(Error, Debug)]
pub enum DatasetError {
    /// The document failed the JSON schema check.
    #[error("schema violation: {0}")]
    Schema(#[from] SchemaValidationError),

    /// The built-in schema could not be compiled.
    #[error("dataset schema unavailable: {0}")]
    SchemaUnavailable(String),

    /// A structural invariant of the document is violated.
    #[error("malformed stat-document: {0}")]
    Malformed(#[from] MalformedStructure),

    /// No dimension with this id.
    #[error("no dimension with id '{0}'")]
    DimensionNotFound(String),

    /// No category with this id or label in the dimension.
    #[error("no category with id or label '{category}' in dimension '{dimension}'")]
    CategoryNotFound {
        /// Dimension that was searched.
        dimension: String,
        /// The id or label that did not match.
        category: String,
    },

    /// A cell coordinate does not pick a category of this dimension.
    #[error("coordinate does not name a category of dimension '{0}'")]
    IncompleteCoordinate(String),

    /// A required table column is missing.
    #[error("there is no column named '{0}' in the table")]
    ColumnNotFound(String),

    /// A table row does not have one cell per header column.
    #[error("row {row} has {actual} cells, header has {expected} columns")]
    RaggedRow {
        /// Zero-based row number.
        row: usize,
        /// Number of header columns.
        expected: usize,
        /// Number of cells in the row.
        actual: usize,
    },

    /// The table lists the same coordinate more than once.
    #[error("table contains {count} duplicated coordinate(s), first: {first:?}")]
    DuplicateCoordinates {
        /// Number of coordinates that occur more than once.
        count: usize,
        /// The first duplicated coordinate, as category ids in column order.
        first: Vec<String>,
    },

    /// A table passed to the dense converter does not cover the cross-product.
    #[error("table is not complete: expected {expected} rows, got {actual}")]
    IncompleteTable {
        /// Rows required by the cross-product of categories.
        expected: usize,
        /// Rows present.
        actual: usize,
    },

    /// The two datasets of a merge do not share the same dimensions.
    #[error(
        "can't merge datasets with unidentical dimensions: {base:?} in original dataset, {incoming:?} in appended dataset"
    )]
    MergeIncompatibleDimensions {
        /// Dimension ids of the base dataset.
        base: Vec<String>,
        /// Dimension ids of the appended dataset.
        incoming: Vec<String>,
    },

    /// Duplicate coordinates found while merging with the `break` policy.
    #[error("failed to merge datasets: {count} duplicated coordinate(s), first: {first:?}")]
    MergeDuplicates {
        /// Number of coordinates present in both datasets.
        count: usize,
        /// The first duplicated coordinate, as category ids in base order.
        first: Vec<String>,
    },

    /// An unrecognized policy string.
    #[error("unsupported {kind} policy '{value}'")]
    UnsupportedPolicy {
        /// Which policy was being parsed.
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A category id could not be read as a timepoint.
    #[error("invalid timepoint '{value}': {reason}")]
    InvalidTimepoint {
        /// The offending category id.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// JSON (de)serialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading or writing failed.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A violated structural invariant of a stat-document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedStructure {
    /// The document root is not an object.
    #[error("document root must be an object")]
    NotAnObject,

    /// An entry of `id` has no `dimension` object.
    #[error("'{0}' missing under the dimension property")]
    MissingDimension(String),

    /// A dimension id is listed more than once in `id`.
    #[error("'{0}' listed more than once in id property")]
    DuplicateDimension(String),

    /// A `dimension` key is not listed in `id`.
    #[error("'{0}' missing in id property")]
    UnlistedDimension(String),

    /// `size` and `id` differ in length.
    #[error("'size' and 'id' must have same length, got {size} and {id}")]
    SizeIdLength {
        /// Length of `size`.
        size: usize,
        /// Length of `id`.
        id: usize,
    },

    /// A dimension's category index is unusable.
    #[error("category index of '{dimension}' is invalid: {reason}")]
    CategoryIndex {
        /// The dimension id.
        dimension: String,
        /// What is wrong with the index.
        reason: String,
    },

    /// `size[i]` does not match the category count of dimension `id[i]`.
    #[error("'size' property does not match length of '{dimension}', got {declared}, expected {actual}")]
    SizeMismatch {
        /// The dimension id.
        dimension: String,
        /// The value in `size`.
        declared: usize,
        /// The number of categories.
        actual: usize,
    },

    /// `value` length differs from the product of `size`.
    #[error("size factors don't match length of values, got {actual}, expected {expected}")]
    ValueLength {
        /// Product of `size`.
        expected: usize,
        /// Length of `value`.
        actual: usize,
    },

    /// A sparse `value`/`status` key is not a valid linear coordinate.
    #[error("error in {field} property: index '{index}' is out of range or not a number")]
    SparseIndex {
        /// `value` or `status`.
        field: &'static str,
        /// The offending key.
        index: String,
    },

    /// The product of `size` overflows, or a sparse `value` would expand to
    /// more cells than can be held densely.
    #[error("size factors {sizes:?} give more than {limit} cells")]
    CellCount {
        /// The `size` property.
        sizes: Vec<usize>,
        /// Largest cell count a sparse document may expand to.
        limit: usize,
    },

    /// A dense `status` array differs in length from `value`.
    #[error("'status' and 'value' must have same length, got {status} and {value}")]
    StatusLength {
        /// Length of `status`.
        status: usize,
        /// Length of `value`.
        value: usize,
    },
}
