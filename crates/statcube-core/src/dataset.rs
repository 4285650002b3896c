//! # Datasets
//!
//! A [`Dataset`] is one validated stat-document: dimension ids, sizes, a
//! flat row-major value array, a parallel status array, and metadata.
//!
//! ## Construction
//!
//! | Input | Constructor |
//! |---|---|
//! | parsed document | [`Dataset::from_document`] |
//! | row-per-coordinate table | [`Dataset::from_table`] |
//! | JSON text | [`Dataset::from_text`] |
//! | JSON or YAML file | [`Dataset::from_file`] |
//! | any of the above | [`Dataset::from_input`] |
//!
//! Every constructor ends in [`Dataset::from_document`], which runs the
//! structural checks in [`crate::validate`]. The document is kept as given,
//! so `from_document(d).to_document() == d` once `class` and `version`
//! are filled in. Sparse `value`/`status` maps are additionally normalized
//! to dense arrays for cell access.
//!
//! ## Structural Changes
//!
//! Filtering and merging never edit the flat arrays in place. They project
//! the dataset to a [`Table`], transform the rows, build a new dataset from
//! the result, and then thread the metadata of the old one forward.

use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value};
use statcube_schema::{load_document, write_document, SchemaValidator};

use crate::dimension::Dimension;
use crate::error::{DatasetError, MalformedStructure};
use crate::meta::{self, OnMetadataConflict, DATASET_META};
use crate::notes::{notes_from_csv, NoteRow, NoteTarget, OnMissing};
use crate::table::{Row, Table, TableContent, TableOptions};
use crate::timepoint::{timepoint_label, Periodicity};
use crate::validate;

/// Top-level keys that encode structure rather than metadata.
const STRUCTURE_KEYS: &[&str] = &["id", "size", "value", "status", "dimension"];

/// How `value` and `status` are written when exporting a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueEncoding {
    /// Arrays with one entry per cell.
    #[default]
    Dense,
    /// Maps from linear coordinate to cell, omitting `null` values and
    /// empty statuses.
    Sparse,
}

/// The input shapes a dataset can be built from.
#[derive(Debug, Clone)]
pub enum DatasetInput {
    /// A parsed stat-document.
    Document(Value),
    /// A row-per-coordinate table.
    Table {
        /// The rows.
        table: Table,
        /// Value and status column names.
        options: TableOptions,
    },
    /// Stat-document JSON text.
    Text(String),
    /// Path to a JSON or YAML stat-document.
    File(PathBuf),
}

impl From<Value> for DatasetInput {
    fn from(document: Value) -> Self {
        Self::Document(document)
    }
}

impl From<Table> for DatasetInput {
    fn from(table: Table) -> Self {
        Self::Table {
            table,
            options: TableOptions::ids(),
        }
    }
}

impl From<PathBuf> for DatasetInput {
    fn from(path: PathBuf) -> Self {
        Self::File(path)
    }
}

/// A validated stat-document.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// The document without its `dimension` member.
    document: Map<String, Value>,
    dimensions: Vec<Dimension>,
    values: Vec<Value>,
    statuses: Vec<String>,
}

impl Dataset {
    // ─── Construction ───────────────────────────────────────────────

    /// Build a dataset from a parsed stat-document.
    ///
    /// `class` and `version` default to `"dataset"` and `"2.0"`.
    ///
    /// # Errors
    ///
    /// [`DatasetError::Schema`] if the document does not have the
    /// stat-document shape, [`DatasetError::Malformed`] if its parts are
    /// inconsistent.
    pub fn from_document(document: Value) -> Result<Self, DatasetError> {
        let mut root = match document {
            Value::Object(root) => root,
            _ => return Err(MalformedStructure::NotAnObject.into()),
        };
        root.entry("class")
            .or_insert_with(|| Value::String("dataset".to_string()));
        root.entry("version")
            .or_insert_with(|| Value::String("2.0".to_string()));

        let document = Value::Object(root);
        let structure = validate::check(&document)?;
        let mut document = match document {
            Value::Object(root) => root,
            _ => return Err(MalformedStructure::NotAnObject.into()),
        };
        document.remove("dimension");

        tracing::debug!(
            dimensions = structure.dimensions.len(),
            cells = structure.values.len(),
            "dataset built"
        );
        Ok(Self {
            document,
            dimensions: structure.dimensions,
            values: structure.values,
            statuses: structure.statuses,
        })
    }

    /// Build a dataset from a row-per-coordinate table.
    ///
    /// Every column other than the value and status columns is a
    /// dimension, keyed by raw category ids. The table is completed to the
    /// full cross-product first; categories get positions in first-seen
    /// order. The status column is optional.
    ///
    /// # Errors
    ///
    /// [`DatasetError::ColumnNotFound`] without a value column,
    /// [`DatasetError::DuplicateCoordinates`] if a coordinate repeats.
    pub fn from_table(table: &Table, options: &TableOptions) -> Result<Self, DatasetError> {
        let completed = table.complete(&options.value_column, &options.status_column)?;
        let dense = completed.to_dense(&options.value_column, &options.status_column)?;

        let mut dimension = Map::new();
        let mut ids = Vec::with_capacity(dense.dimensions.len());
        let mut sizes = Vec::with_capacity(dense.dimensions.len());
        for (id, categories) in dense.dimensions {
            sizes.push(Value::from(categories.len()));
            dimension.insert(id.clone(), Dimension::from_categories(&id, categories).to_json());
            ids.push(Value::String(id));
        }

        let mut document = Map::new();
        document.insert("id".to_string(), Value::Array(ids));
        document.insert("size".to_string(), Value::Array(sizes));
        document.insert("value".to_string(), Value::Array(dense.values));
        if let Some(statuses) = dense.statuses.filter(|s| s.iter().any(|x| !x.is_empty())) {
            document.insert(
                "status".to_string(),
                Value::Array(statuses.into_iter().map(Value::String).collect()),
            );
        }
        document.insert("dimension".to_string(), Value::Object(dimension));

        tracing::debug!(
            rows = table.len(),
            completed = completed.len(),
            "dataset built from table"
        );
        Self::from_document(Value::Object(document))
    }

    /// Build a dataset from stat-document JSON text.
    pub fn from_text(text: &str) -> Result<Self, DatasetError> {
        let document: Value = serde_json::from_str(text)?;
        Self::from_document(document)
    }

    /// Build a dataset from a JSON or YAML file (by extension).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let document = load_document(path.as_ref())?;
        Self::from_document(document)
    }

    /// Parse `input` as JSON text, or read it as a file path when it is
    /// not JSON and names an existing file.
    pub fn from_text_or_path(input: &str) -> Result<Self, DatasetError> {
        match serde_json::from_str::<Value>(input) {
            Ok(document) => Self::from_document(document),
            Err(parse_error) => {
                let path = Path::new(input);
                if path.is_file() {
                    Self::from_file(path)
                } else {
                    Err(parse_error.into())
                }
            }
        }
    }

    /// Build a dataset from any supported input shape.
    pub fn from_input(input: DatasetInput) -> Result<Self, DatasetError> {
        match input {
            DatasetInput::Document(document) => Self::from_document(document),
            DatasetInput::Table { table, options } => Self::from_table(&table, &options),
            DatasetInput::Text(text) => Self::from_text(&text),
            DatasetInput::File(path) => Self::from_file(path),
        }
    }

    // ─── Export ─────────────────────────────────────────────────────

    /// The stat-document, with `value` and `status` as they were given.
    pub fn to_document(&self) -> Value {
        let mut document = self.document.clone();
        let dimension: Map<String, Value> = self
            .dimensions
            .iter()
            .map(|d| (d.id().to_string(), d.to_json()))
            .collect();
        document.insert("dimension".to_string(), Value::Object(dimension));
        Value::Object(document)
    }

    /// The stat-document with `value` and `status` re-encoded.
    ///
    /// `status` is omitted when every status is empty.
    pub fn to_document_with(&self, encoding: ValueEncoding) -> Value {
        let mut document = match self.to_document() {
            Value::Object(document) => document,
            other => return other,
        };
        let any_status = self.statuses.iter().any(|s| !s.is_empty());
        let (value, status) = match encoding {
            ValueEncoding::Dense => (
                Value::Array(self.values.clone()),
                Value::Array(self.statuses.iter().cloned().map(Value::String).collect()),
            ),
            ValueEncoding::Sparse => (
                Value::Object(
                    self.values
                        .iter()
                        .enumerate()
                        .filter(|(_, v)| !v.is_null())
                        .map(|(i, v)| (i.to_string(), v.clone()))
                        .collect(),
                ),
                Value::Object(
                    self.statuses
                        .iter()
                        .enumerate()
                        .filter(|(_, s)| !s.is_empty())
                        .map(|(i, s)| (i.to_string(), Value::String(s.clone())))
                        .collect(),
                ),
            ),
        };
        document.insert("value".to_string(), value);
        if any_status {
            document.insert("status".to_string(), status);
        } else {
            document.remove("status");
        }
        Value::Object(document)
    }

    /// The stat-document as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, DatasetError> {
        Ok(serde_json::to_string_pretty(&self.to_document())?)
    }

    /// Write the stat-document as JSON, or YAML for `.yaml`/`.yml` paths.
    pub fn to_file(&self, path: impl AsRef<Path>) -> Result<(), DatasetError> {
        write_document(path.as_ref(), &self.to_document())?;
        Ok(())
    }

    /// One row per coordinate, in row-major order.
    ///
    /// The header holds dimension labels (or ids, with
    /// [`TableContent::Id`]), then the value column and optionally the
    /// status column.
    pub fn to_table(&self, options: &TableOptions) -> Table {
        let mut header: Vec<String> = self
            .dimensions
            .iter()
            .map(|d| match options.content {
                TableContent::Label => d.label().to_string(),
                TableContent::Id => d.id().to_string(),
            })
            .collect();
        header.push(options.value_column.clone());
        if options.include_status {
            header.push(options.status_column.clone());
        }

        let cells: Vec<Vec<String>> = self
            .dimensions
            .iter()
            .map(|d| match options.content {
                TableContent::Label => d.categories().iter().map(|c| c.label().to_string()).collect(),
                TableContent::Id => d.category_ids().to_vec(),
            })
            .collect();
        let strides = self.strides();

        let rows = (0..self.values.len())
            .map(|linear| {
                let mut row: Vec<Value> = cells
                    .iter()
                    .zip(&strides)
                    .map(|(categories, &stride)| {
                        Value::String(categories[(linear / stride) % categories.len()].clone())
                    })
                    .collect();
                row.push(self.values[linear].clone());
                if options.include_status {
                    row.push(Value::String(self.statuses[linear].clone()));
                }
                row
            })
            .collect();
        Table::from_parts(header, rows)
    }

    // ─── Accessors ──────────────────────────────────────────────────

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the dataset has no cells.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Dimension ids in `id` order.
    pub fn dimension_ids(&self) -> Vec<&str> {
        self.dimensions.iter().map(Dimension::id).collect()
    }

    /// Category count per dimension.
    pub fn sizes(&self) -> Vec<usize> {
        self.dimensions.iter().map(Dimension::len).collect()
    }

    /// Dimensions in `id` order.
    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    /// Dense values in row-major order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Dense statuses, empty where none is set.
    pub fn statuses(&self) -> &[String] {
        &self.statuses
    }

    /// Look up a dimension by id.
    pub fn dimension(&self, id: &str) -> Result<&Dimension, DatasetError> {
        self.dimensions
            .iter()
            .find(|d| d.id() == id)
            .ok_or_else(|| DatasetError::DimensionNotFound(id.to_string()))
    }

    /// Look up a dimension by id for metadata edits.
    pub fn dimension_mut(&mut self, id: &str) -> Result<&mut Dimension, DatasetError> {
        self.dimensions
            .iter_mut()
            .find(|d| d.id() == id)
            .ok_or_else(|| DatasetError::DimensionNotFound(id.to_string()))
    }

    /// The value at a coordinate of `(dimension id, category id or label)` pairs.
    pub fn value_at(&self, coordinate: &[(&str, &str)]) -> Result<&Value, DatasetError> {
        let linear = self.linear_index(coordinate)?;
        Ok(&self.values[linear])
    }

    /// The status at a coordinate; empty when none is set.
    pub fn status_at(&self, coordinate: &[(&str, &str)]) -> Result<&str, DatasetError> {
        let linear = self.linear_index(coordinate)?;
        Ok(&self.statuses[linear])
    }

    // ─── Metadata ───────────────────────────────────────────────────

    /// Where the data comes from.
    pub fn source(&self) -> Option<&str> {
        self.document.get("source").and_then(Value::as_str)
    }

    /// Set the data source.
    pub fn set_source(&mut self, source: impl Into<String>) {
        self.document
            .insert("source".to_string(), Value::String(source.into()));
    }

    /// The dataset label.
    pub fn label(&self) -> Option<&str> {
        self.document.get("label").and_then(Value::as_str)
    }

    /// Set the dataset label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.document
            .insert("label".to_string(), Value::String(label.into()));
    }

    /// Free-form extension data.
    pub fn extension(&self) -> Option<&Value> {
        self.document.get("extension")
    }

    /// Replace the extension data.
    pub fn set_extension(&mut self, extension: Value) {
        self.document.insert("extension".to_string(), extension);
    }

    /// When the data was last updated, as written in the document.
    pub fn updated(&self) -> Option<&str> {
        self.document.get("updated").and_then(Value::as_str)
    }

    /// Set the update timestamp text.
    pub fn set_updated(&mut self, updated: impl Into<String>) {
        self.document
            .insert("updated".to_string(), Value::String(updated.into()));
    }

    /// Set the update timestamp as ISO 8601 UTC.
    pub fn set_updated_at(&mut self, updated: DateTime<Utc>) {
        self.set_updated(updated.to_rfc3339_opts(SecondsFormat::Secs, true));
    }

    /// Dataset-level notes.
    pub fn note(&self) -> Vec<String> {
        meta::notes_of(self.document.get("note"))
    }

    /// Append a dataset note unless the identical string is present.
    pub fn add_note(&mut self, note: impl Into<String>) -> bool {
        meta::append_notes(&mut self.document, "note", [note.into()]) > 0
    }

    /// Attach notes to the dataset, its dimensions, or categories.
    ///
    /// Returns the number of notes added; exact duplicates are not added
    /// again. With [`OnMissing::Skip`] a row whose dimension or category
    /// does not exist is logged and skipped; with [`OnMissing::Break`] it
    /// fails the call and no note is added.
    pub fn add_notes(&mut self, rows: &[NoteRow], on_missing: OnMissing) -> Result<usize, DatasetError> {
        let mut next = self.clone();
        let mut added = 0;
        for row in rows {
            match next.attach_note(row) {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(error) => match on_missing {
                    OnMissing::Break => return Err(error),
                    OnMissing::Skip => {
                        tracing::warn!(
                            dimension = %row.dimension,
                            category = %row.category,
                            error = %error,
                            "skipping note with unknown target"
                        );
                    }
                },
            }
        }
        *self = next;
        Ok(added)
    }

    /// Read note rows from CSV and attach them, as in [`Dataset::add_notes`].
    pub fn add_notes_from_csv<R: Read>(
        &mut self,
        reader: R,
        on_missing: OnMissing,
    ) -> Result<usize, DatasetError> {
        let rows = notes_from_csv(reader)?;
        self.add_notes(&rows, on_missing)
    }

    /// Set category labels of one dimension from an id → label map.
    ///
    /// Ids that are not categories of the dimension are ignored.
    pub fn add_labels(
        &mut self,
        dimension: &str,
        labels: &HashMap<String, String>,
    ) -> Result<usize, DatasetError> {
        Ok(self.dimension_mut(dimension)?.set_labels(labels))
    }

    /// Label every category of a time dimension from its ISO date id.
    ///
    /// Nothing is changed if any category id is not a date.
    pub fn label_timepoints(
        &mut self,
        dimension: &str,
        periodicity: Periodicity,
    ) -> Result<(), DatasetError> {
        let labels = self
            .dimension(dimension)?
            .category_ids()
            .iter()
            .map(|id| timepoint_label(id, periodicity).map(|label| (id.clone(), label)))
            .collect::<Result<HashMap<_, _>, DatasetError>>()?;
        self.add_labels(dimension, &labels)?;
        Ok(())
    }

    /// Validate the document against a named schema of `validator`.
    pub fn check_schema(
        &self,
        validator: &SchemaValidator,
        schema_name: &str,
    ) -> Result<(), DatasetError> {
        validator.validate_document(&self.to_document(), schema_name)?;
        Ok(())
    }

    // ─── Filtering ──────────────────────────────────────────────────

    /// Keep the cells whose row satisfies `predicate`.
    ///
    /// Rows are keyed by dimension ids and raw category ids, with `value`
    /// and `status` columns. The result is rebuilt from the kept rows, so
    /// categories that no longer occur are dropped; all metadata of this
    /// dataset carries over.
    pub fn filter<F>(&self, predicate: F) -> Result<Dataset, DatasetError>
    where
        F: FnMut(&Row<'_>) -> bool,
    {
        let options = TableOptions::ids().with_status();
        let mut table = self.to_table(&options);
        table.retain(predicate);

        let mut filtered = Dataset::from_table(&table, &options)?;
        filtered.inherit_metadata(self, OnMetadataConflict::Update);
        tracing::info!(
            before = self.len(),
            after = filtered.len(),
            "dataset filtered"
        );
        Ok(filtered)
    }

    /// Keep the cells whose category, for each listed dimension, is one of
    /// the given category ids or labels.
    pub fn filter_by_query(
        &self,
        query: &HashMap<String, Vec<String>>,
    ) -> Result<Dataset, DatasetError> {
        let mut allowed: Vec<(&str, Vec<String>)> = Vec::with_capacity(query.len());
        for (dimension, categories) in query {
            let dim = self.dimension(dimension)?;
            let ids = categories
                .iter()
                .map(|c| dim.category(c).map(|category| category.id().to_string()))
                .collect::<Result<Vec<_>, _>>()?;
            allowed.push((dim.id(), ids));
        }
        self.filter(|row| {
            allowed
                .iter()
                .all(|(dimension, ids)| row.str(dimension).is_some_and(|id| ids.iter().any(|i| i == id)))
        })
    }

    // ─── Internals ──────────────────────────────────────────────────

    /// Thread metadata of `source` into this dataset.
    ///
    /// Applies dataset, dimension and category meta-fields under `policy`
    /// and copies unknown keys this dataset lacks. Dimensions and
    /// categories are matched by id.
    pub(crate) fn inherit_metadata(&mut self, source: &Dataset, policy: OnMetadataConflict) {
        meta::apply_fields(&mut self.document, &source.document, DATASET_META, policy);
        meta::fill_absent(&mut self.document, &source.document, STRUCTURE_KEYS);

        for dimension in &mut self.dimensions {
            let Ok(original) = source.dimension(dimension.id()) else {
                continue;
            };
            dimension.apply_metadata(original, policy);
            dimension.fill_absent_keys(original);
            let shared: Vec<String> = {
                let present: HashSet<&str> =
                    dimension.category_ids().iter().map(String::as_str).collect();
                original
                    .category_ids()
                    .iter()
                    .filter(|id| present.contains(id.as_str()))
                    .cloned()
                    .collect()
            };
            for id in &shared {
                dimension.apply_category_metadata(original, id, policy);
            }
        }
    }

    /// Apply only the dataset-level meta-fields of `source`.
    pub(crate) fn apply_dataset_metadata(&mut self, source: &Dataset, policy: OnMetadataConflict) {
        meta::apply_fields(&mut self.document, &source.document, DATASET_META, policy);
    }

    pub(crate) fn dimensions_mut(&mut self) -> &mut [Dimension] {
        &mut self.dimensions
    }

    fn attach_note(&mut self, row: &NoteRow) -> Result<bool, DatasetError> {
        match row.target() {
            NoteTarget::Dataset => Ok(self.add_note(row.note.clone())),
            NoteTarget::Dimension(dimension) => {
                Ok(self.dimension_mut(dimension)?.add_note(row.note.clone()))
            }
            NoteTarget::Category {
                dimension,
                category,
            } => Ok(self
                .dimension_mut(dimension)?
                .category_mut(category)?
                .add_note(row.note.clone())),
        }
    }

    /// Row-major stride of each dimension.
    fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.dimensions.len()];
        for d in (0..self.dimensions.len().saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * self.dimensions[d + 1].len();
        }
        strides
    }

    fn linear_index(&self, coordinate: &[(&str, &str)]) -> Result<usize, DatasetError> {
        if let Some((unknown, _)) = coordinate
            .iter()
            .find(|(dimension, _)| self.dimension(dimension).is_err())
        {
            return Err(DatasetError::DimensionNotFound(unknown.to_string()));
        }

        let mut linear = 0;
        for (dimension, stride) in self.dimensions.iter().zip(self.strides()) {
            let position = match coordinate.iter().find(|(id, _)| *id == dimension.id()) {
                Some((_, category)) => dimension.resolve(category)?,
                None if dimension.len() == 1 => 0,
                None => return Err(DatasetError::IncompleteCoordinate(dimension.id().to_string())),
            };
            linear += position * stride;
        }
        Ok(linear)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn complete_dataset() -> Value {
        json!({
            "version": "2.0",
            "class": "dataset",
            "label": "Population by region and gender",
            "source": "SCB",
            "note": ["My dataset note"],
            "id": ["region", "gender"],
            "size": [2, 2],
            "value": [1, 2, 3, 4],
            "dimension": {
                "region": {
                    "label": "Region",
                    "note": ["My region note"],
                    "category": {
                        "index": { "Stockholm": 0, "Solna": 1 },
                        "label": { "Stockholm": "Stockholm kommun", "Solna": "Solna kommun" },
                        "note": { "Solna": ["My Solna note"] }
                    }
                },
                "gender": {
                    "label": "Gender",
                    "category": {
                        "index": ["M", "F"],
                        "label": { "M": "Male", "F": "Female" }
                    }
                }
            }
        })
    }

    fn dataset() -> Dataset {
        Dataset::from_document(complete_dataset()).unwrap()
    }

    #[test]
    fn test_round_trip() {
        assert_eq!(dataset().to_document(), complete_dataset());
    }

    #[test]
    fn test_class_and_version_injected() {
        let mut doc = complete_dataset();
        let root = doc.as_object_mut().unwrap();
        root.remove("class");
        root.remove("version");
        let ds = Dataset::from_document(doc).unwrap();
        assert_eq!(ds.to_document()["class"], "dataset");
        assert_eq!(ds.to_document()["version"], "2.0");
    }

    #[test]
    fn test_not_an_object() {
        let err = Dataset::from_document(json!([1, 2])).unwrap_err();
        assert!(matches!(err, DatasetError::Malformed(MalformedStructure::NotAnObject)));
    }

    #[test]
    fn test_accessors() {
        let ds = dataset();
        assert_eq!(ds.len(), 4);
        assert!(!ds.is_empty());
        assert_eq!(ds.dimension_ids(), vec!["region", "gender"]);
        assert_eq!(ds.sizes(), vec![2, 2]);
        assert_eq!(ds.label(), Some("Population by region and gender"));
        assert_eq!(ds.source(), Some("SCB"));
        assert_eq!(ds.note(), vec!["My dataset note".to_string()]);
        assert!(ds.extension().is_none());
        assert!(matches!(
            ds.dimension("age"),
            Err(DatasetError::DimensionNotFound(ref id)) if id == "age"
        ));
    }

    #[test]
    fn test_setters() {
        let mut ds = dataset();
        ds.set_label("Befolkning");
        ds.set_source("Statistics Sweden");
        ds.set_extension(json!({ "contact": "data@example.org" }));
        ds.set_updated_at(DateTime::parse_from_rfc3339("2017-03-01T08:00:00Z").unwrap().with_timezone(&Utc));
        assert_eq!(ds.label(), Some("Befolkning"));
        assert_eq!(ds.source(), Some("Statistics Sweden"));
        assert_eq!(ds.extension().unwrap()["contact"], "data@example.org");
        assert_eq!(ds.updated(), Some("2017-03-01T08:00:00Z"));
    }

    #[test]
    fn test_to_table_labels() {
        let table = dataset().to_table(&TableOptions::default());
        assert_eq!(table.header(), ["Region", "Gender", "value"]);
        assert_eq!(table.len(), 4);
        assert_eq!(
            table.rows()[1],
            vec![json!("Stockholm kommun"), json!("Female"), json!(2)]
        );
    }

    #[test]
    fn test_to_table_ids_with_status() {
        let mut doc = complete_dataset();
        doc["status"] = json!({ "2": "p" });
        let table = Dataset::from_document(doc)
            .unwrap()
            .to_table(&TableOptions::ids().with_status());
        assert_eq!(table.header(), ["region", "gender", "value", "status"]);
        assert_eq!(table.rows()[2], vec![json!("Solna"), json!("M"), json!(3), json!("p")]);
        assert_eq!(table.rows()[0][3], json!(""));
    }

    #[test]
    fn test_from_table() {
        let table = Table::new(
            vec!["region".into(), "gender".into(), "value".into()],
            vec![
                vec![json!("Stockholm"), json!("M"), json!(1)],
                vec![json!("Solna"), json!("F"), json!(4)],
            ],
        )
        .unwrap();
        let ds = Dataset::from_table(&table, &TableOptions::ids()).unwrap();
        assert_eq!(ds.sizes(), vec![2, 2]);
        assert_eq!(ds.values(), &[json!(1), Value::Null, Value::Null, json!(4)]);
        assert!(ds.to_document().get("status").is_none());
        assert_eq!(ds.dimension("gender").unwrap().category_ids(), ["M", "F"]);
    }

    #[test]
    fn test_from_table_custom_value_column() {
        let table = Table::new(
            vec!["year".into(), "amount".into()],
            vec![vec![json!(2016), json!(10)]],
        )
        .unwrap();
        let options = TableOptions {
            value_column: "amount".into(),
            ..TableOptions::ids()
        };
        let ds = Dataset::from_table(&table, &options).unwrap();
        assert_eq!(ds.dimension_ids(), vec!["year"]);
        assert!(matches!(
            Dataset::from_table(&table, &TableOptions::ids()),
            Err(DatasetError::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_from_text_and_input() {
        let text = complete_dataset().to_string();
        let ds = Dataset::from_text(&text).unwrap();
        assert_eq!(ds, dataset());
        assert_eq!(Dataset::from_input(DatasetInput::Text(text)).unwrap(), ds);
        assert_eq!(Dataset::from_input(complete_dataset().into()).unwrap(), ds);
        assert!(matches!(Dataset::from_text("{ not json"), Err(DatasetError::Json(_))));
    }

    #[test]
    fn test_from_text_or_path_falls_back_to_error() {
        let err = Dataset::from_text_or_path("/no/such/dataset.json").unwrap_err();
        assert!(matches!(err, DatasetError::Json(_)));
    }

    #[test]
    fn test_sparse_export() {
        let mut doc = complete_dataset();
        doc["value"] = json!({ "0": 1, "3": 4 });
        let ds = Dataset::from_document(doc.clone()).unwrap();
        assert_eq!(ds.to_document(), doc);

        let dense = ds.to_document_with(ValueEncoding::Dense);
        assert_eq!(dense["value"], json!([1, null, null, 4]));
        assert!(dense.get("status").is_none());

        let sparse = dataset().to_document_with(ValueEncoding::Sparse);
        assert_eq!(sparse["value"], json!({ "0": 1, "1": 2, "2": 3, "3": 4 }));
    }

    #[test]
    fn test_value_and_status_at() {
        let mut doc = complete_dataset();
        doc["status"] = json!(["", "", "p", ""]);
        let ds = Dataset::from_document(doc).unwrap();
        assert_eq!(ds.value_at(&[("region", "Solna"), ("gender", "M")]).unwrap(), &json!(3));
        assert_eq!(
            ds.value_at(&[("gender", "Female"), ("region", "Stockholm kommun")]).unwrap(),
            &json!(2)
        );
        assert_eq!(ds.status_at(&[("region", "Solna"), ("gender", "M")]).unwrap(), "p");
        assert!(matches!(
            ds.value_at(&[("region", "Solna")]),
            Err(DatasetError::IncompleteCoordinate(ref d)) if d == "gender"
        ));
        assert!(matches!(
            ds.value_at(&[("region", "Solna"), ("gender", "M"), ("age", "0")]),
            Err(DatasetError::DimensionNotFound(_))
        ));
    }

    #[test]
    fn test_filter_keeps_metadata() {
        let ds = dataset();
        let filtered = ds.filter(|row| row.str("region") == Some("Solna")).unwrap();
        assert_eq!(filtered.sizes(), vec![1, 2]);
        assert_eq!(filtered.values(), &[json!(3), json!(4)]);
        assert_eq!(filtered.label(), ds.label());
        assert_eq!(filtered.note(), ds.note());
        let region = filtered.dimension("region").unwrap();
        assert_eq!(region.label(), "Region");
        assert_eq!(region.note(), vec!["My region note".to_string()]);
        let solna = region.category("Solna").unwrap();
        assert_eq!(solna.label(), "Solna kommun");
        assert_eq!(solna.note(), ["My Solna note".to_string()]);
        assert!(filtered.to_document().get("status").is_none());
    }

    #[test]
    fn test_filter_by_query() {
        let query: HashMap<String, Vec<String>> =
            [("gender".to_string(), vec!["Female".to_string()])].into_iter().collect();
        let filtered = dataset().filter_by_query(&query).unwrap();
        assert_eq!(filtered.values(), &[json!(2), json!(4)]);

        let unknown: HashMap<String, Vec<String>> =
            [("age".to_string(), vec!["0".to_string()])].into_iter().collect();
        assert!(matches!(
            dataset().filter_by_query(&unknown),
            Err(DatasetError::DimensionNotFound(_))
        ));
    }

    #[test]
    fn test_add_notes_targets_and_idempotence() {
        let mut ds = dataset();
        let rows = vec![
            NoteRow::dataset("My dataset note"),
            NoteRow::dataset("Second dataset note"),
            NoteRow::dimension("gender", "Gender note"),
            NoteRow::category("region", "Stockholm kommun", "Stockholm note"),
        ];
        assert_eq!(ds.add_notes(&rows, OnMissing::Break).unwrap(), 3);
        assert_eq!(ds.add_notes(&rows, OnMissing::Break).unwrap(), 0);
        assert_eq!(ds.note().len(), 2);
        assert_eq!(ds.dimension("gender").unwrap().note(), vec!["Gender note".to_string()]);
        assert_eq!(
            ds.dimension("region").unwrap().category("Stockholm").unwrap().note(),
            ["Stockholm note".to_string()]
        );
    }

    #[test]
    fn test_add_notes_on_missing() {
        let rows = vec![
            NoteRow::dataset("Kept"),
            NoteRow::category("region", "Uppsala", "Lost"),
        ];
        let mut skipping = dataset();
        assert_eq!(skipping.add_notes(&rows, OnMissing::Skip).unwrap(), 1);
        assert!(skipping.note().contains(&"Kept".to_string()));

        let mut breaking = dataset();
        let err = breaking.add_notes(&rows, OnMissing::Break).unwrap_err();
        assert!(matches!(err, DatasetError::CategoryNotFound { .. }));
        assert_eq!(breaking, dataset());
    }

    #[test]
    fn test_add_labels() {
        let mut ds = dataset();
        let labels: HashMap<String, String> =
            [("M".to_string(), "Män".to_string()), ("X".to_string(), "?".to_string())]
                .into_iter()
                .collect();
        assert_eq!(ds.add_labels("gender", &labels).unwrap(), 1);
        assert_eq!(ds.dimension("gender").unwrap().category("M").unwrap().label(), "Män");
        assert!(ds.add_labels("age", &labels).is_err());
    }

    #[test]
    fn test_label_timepoints() {
        let table = Table::new(
            vec!["period".into(), "value".into()],
            vec![vec![json!("2016-01-01"), json!(1)], vec![json!("2016-04-01"), json!(2)]],
        )
        .unwrap();
        let mut ds = Dataset::from_table(&table, &TableOptions::ids()).unwrap();
        ds.label_timepoints("period", Periodicity::Quarterly).unwrap();
        let labels: Vec<String> = ds
            .dimension("period")
            .unwrap()
            .categories()
            .iter()
            .map(|c| c.label().to_string())
            .collect();
        assert_eq!(labels, vec!["Q1 2016", "Q2 2016"]);

        let mut regions = dataset();
        assert!(matches!(
            regions.label_timepoints("region", Periodicity::Monthly),
            Err(DatasetError::InvalidTimepoint { .. })
        ));
        assert_eq!(regions, dataset());
    }

    #[test]
    fn test_check_schema_with_builtin_validator() {
        let validator = SchemaValidator::builtin().unwrap();
        dataset()
            .check_schema(&validator, statcube_schema::DATASET_SCHEMA)
            .unwrap();
        assert!(matches!(
            dataset().check_schema(&validator, "missing.schema.json"),
            Err(DatasetError::Schema(_))
        ));
    }
}
