//! # Tabular Projection
//!
//! A [`Table`] is the row-per-coordinate form of a dataset: one column per
//! dimension, a value column, and optionally a status column. Filtering and
//! merging both work on this form and rebuild the flat encoding from it.
//!
//! ## Completeness
//!
//! The dense encoding needs one row for every combination of categories.
//! [`Table::complete`] fills the missing combinations with a `null` value
//! and an empty status; converting an incomplete table to dense arrays
//! fails with [`DatasetError::IncompleteTable`].
//!
//! Categories of a dimension column are taken in first-seen row order.
//! Non-string cells in dimension columns are stringified.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DatasetError;

/// Which text fills the dimension columns of an exported table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableContent {
    /// Category labels, with dimension labels in the header.
    #[default]
    Label,
    /// Raw category ids, with dimension ids in the header.
    Id,
}

/// Column naming and content for table import and export.
///
/// `content` and `include_status` only affect export; import reads
/// dimension cells as category ids and uses the status column whenever the
/// header has one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// Labels or ids in dimension columns.
    pub content: TableContent,
    /// Name of the value column.
    pub value_column: String,
    /// Name of the status column.
    pub status_column: String,
    /// Export the status column.
    pub include_status: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            content: TableContent::Label,
            value_column: "value".to_string(),
            status_column: "status".to_string(),
            include_status: false,
        }
    }
}

impl TableOptions {
    /// Options for a table keyed by raw category ids.
    pub fn ids() -> Self {
        Self {
            content: TableContent::Id,
            ..Self::default()
        }
    }

    /// The same options with the status column exported.
    pub fn with_status(mut self) -> Self {
        self.include_status = true;
        self
    }
}

/// A header plus rows of JSON cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<Value>>,
}

/// One table row, addressable by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    header: &'a [String],
    cells: &'a [Value],
}

impl<'a> Row<'a> {
    /// The cell under `column`, if the column exists.
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        let index = self.header.iter().position(|name| name == column)?;
        self.cells.get(index)
    }

    /// The cell under `column` as a string slice, if it is a string.
    pub fn str(&self, column: &str) -> Option<&'a str> {
        self.get(column).and_then(Value::as_str)
    }
}

impl Table {
    /// Create a table, checking that every row has one cell per column.
    pub fn new(header: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, DatasetError> {
        let mut table = Self {
            header,
            rows: Vec::with_capacity(rows.len()),
        };
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Assemble a table whose rows are known to match the header.
    pub(crate) fn from_parts(header: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { header, rows }
    }

    /// Append a row.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), DatasetError> {
        if row.len() != self.header.len() {
            return Err(DatasetError::RaggedRow {
                row: self.rows.len(),
                expected: self.header.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Rows of cells in header order.
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the table has no data rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by name.
    pub fn column_index(&self, column: &str) -> Result<usize, DatasetError> {
        self.header
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| DatasetError::ColumnNotFound(column.to_string()))
    }

    /// Iterate over rows as [`Row`] views.
    pub fn iter(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row {
            header: &self.header,
            cells,
        })
    }

    /// Keep only the rows satisfying `predicate`.
    pub fn retain<F>(&mut self, mut predicate: F)
    where
        F: FnMut(&Row<'_>) -> bool,
    {
        let header = &self.header;
        self.rows.retain(|cells| predicate(&Row { header, cells }));
    }

    /// Project onto the named columns, in the given order.
    pub fn select(&self, columns: &[&str]) -> Result<Table, DatasetError> {
        let indices = columns
            .iter()
            .map(|column| self.column_index(column))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Table {
            header: columns.iter().map(|c| c.to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// Fill in every missing combination of categories.
    ///
    /// The result lists one row per coordinate in row-major order over the
    /// dimension columns (all columns except the value and status columns).
    /// Added rows carry a `null` value and an empty status.
    ///
    /// # Errors
    ///
    /// [`DatasetError::ColumnNotFound`] without a value column,
    /// [`DatasetError::DuplicateCoordinates`] if a coordinate occurs twice.
    pub fn complete(&self, value_column: &str, status_column: &str) -> Result<Table, DatasetError> {
        let layout = Layout::new(self, value_column, status_column)?;
        let slots = layout.place(self)?;

        let mut rows = Vec::with_capacity(slots.len());
        for (linear, slot) in slots.iter().enumerate() {
            let mut row = vec![Value::Null; self.header.len()];
            for (d, &column) in layout.dimension_columns.iter().enumerate() {
                row[column] = Value::String(layout.category_at(linear, d).to_string());
            }
            match slot {
                Some(source) => {
                    let source = &self.rows[*source];
                    row[layout.value_column] = source[layout.value_column].clone();
                    if let Some(status) = layout.status_column {
                        row[status] = source[status].clone();
                    }
                }
                None => {
                    if let Some(status) = layout.status_column {
                        row[status] = Value::String(String::new());
                    }
                }
            }
            rows.push(row);
        }

        tracing::debug!(
            rows = self.rows.len(),
            completed = rows.len(),
            "table completed to full cross-product"
        );
        Ok(Table {
            header: self.header.clone(),
            rows,
        })
    }

    /// Convert a complete table to dense arrays.
    pub(crate) fn to_dense(
        &self,
        value_column: &str,
        status_column: &str,
    ) -> Result<DenseTable, DatasetError> {
        let layout = Layout::new(self, value_column, status_column)?;
        let slots = layout.place(self)?;
        if self.rows.len() != slots.len() {
            return Err(DatasetError::IncompleteTable {
                expected: slots.len(),
                actual: self.rows.len(),
            });
        }

        let mut values = Vec::with_capacity(slots.len());
        let mut statuses = layout.status_column.map(|_| Vec::with_capacity(slots.len()));
        for source in slots.into_iter().flatten() {
            let row = &self.rows[source];
            values.push(row[layout.value_column].clone());
            if let (Some(list), Some(status)) = (statuses.as_mut(), layout.status_column) {
                list.push(cell_text(&row[status]));
            }
        }

        let dimensions = layout
            .dimension_columns
            .iter()
            .map(|&column| self.header[column].clone())
            .zip(layout.categories)
            .collect();
        Ok(DenseTable {
            dimensions,
            values,
            statuses,
        })
    }

    /// Read a table from CSV with a header record.
    ///
    /// Cells of `value_column` become JSON numbers when they parse as one
    /// and `null` when empty; every other cell is read as a string.
    pub fn from_csv_reader<R: Read>(reader: R, value_column: &str) -> Result<Self, DatasetError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let header: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let value_index = header.iter().position(|name| name == value_column);

        let mut table = Table {
            header,
            rows: Vec::new(),
        };
        for record in reader.records() {
            let record = record?;
            let row = record
                .iter()
                .enumerate()
                .map(|(i, field)| {
                    if Some(i) == value_index {
                        numeric_cell(field)
                    } else {
                        Value::String(field.to_string())
                    }
                })
                .collect();
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Write the table as CSV with a header record. `null` cells are empty.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), DatasetError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(cell_text))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Dense arrays recovered from a complete table.
#[derive(Debug, Clone)]
pub(crate) struct DenseTable {
    /// Dimension column names with their categories in first-seen order.
    pub(crate) dimensions: Vec<(String, Vec<String>)>,
    pub(crate) values: Vec<Value>,
    /// Present when the table has a status column.
    pub(crate) statuses: Option<Vec<String>>,
}

/// Column roles and category positions of a table.
struct Layout {
    dimension_columns: Vec<usize>,
    value_column: usize,
    status_column: Option<usize>,
    categories: Vec<Vec<String>>,
    positions: Vec<HashMap<String, usize>>,
    strides: Vec<usize>,
    total: usize,
}

impl Layout {
    fn new(table: &Table, value_column: &str, status_column: &str) -> Result<Self, DatasetError> {
        let value_column = table.column_index(value_column)?;
        let status_column = table.header.iter().position(|name| name == status_column);
        let dimension_columns: Vec<usize> = (0..table.header.len())
            .filter(|&i| i != value_column && Some(i) != status_column)
            .collect();

        let mut categories = vec![Vec::new(); dimension_columns.len()];
        let mut positions = vec![HashMap::new(); dimension_columns.len()];
        for row in &table.rows {
            for (d, &column) in dimension_columns.iter().enumerate() {
                let id = cell_text(&row[column]);
                if !positions[d].contains_key(&id) {
                    positions[d].insert(id.clone(), categories[d].len());
                    categories[d].push(id);
                }
            }
        }

        let mut strides = vec![1usize; dimension_columns.len()];
        let mut total = 1usize;
        for d in (0..dimension_columns.len()).rev() {
            strides[d] = total;
            total = total.saturating_mul(categories[d].len());
        }

        Ok(Self {
            dimension_columns,
            value_column,
            status_column,
            categories,
            positions,
            strides,
            total,
        })
    }

    fn linear(&self, row: &[Value]) -> usize {
        self.dimension_columns
            .iter()
            .enumerate()
            .map(|(d, &column)| {
                let position = self.positions[d].get(&cell_text(&row[column])).copied().unwrap_or(0);
                position * self.strides[d]
            })
            .sum()
    }

    fn category_at(&self, linear: usize, dimension: usize) -> &str {
        let position = (linear / self.strides[dimension]) % self.categories[dimension].len();
        &self.categories[dimension][position]
    }

    /// Map each linear coordinate to the row holding it.
    fn place(&self, table: &Table) -> Result<Vec<Option<usize>>, DatasetError> {
        let mut slots = vec![None; self.total];
        let mut duplicates = HashSet::new();
        let mut first_duplicate = None;
        for (index, row) in table.rows.iter().enumerate() {
            let linear = self.linear(row);
            match slots[linear] {
                None => slots[linear] = Some(index),
                Some(_) => {
                    if duplicates.insert(linear) && first_duplicate.is_none() {
                        first_duplicate = Some(self.coordinate(row));
                    }
                }
            }
        }
        match first_duplicate {
            Some(first) => Err(DatasetError::DuplicateCoordinates {
                count: duplicates.len(),
                first,
            }),
            None => Ok(slots),
        }
    }

    fn coordinate(&self, row: &[Value]) -> Vec<String> {
        self.dimension_columns
            .iter()
            .map(|&column| cell_text(&row[column]))
            .collect()
    }
}

/// Text of a cell as used for category ids, statuses and CSV output.
pub(crate) fn cell_text(cell: &Value) -> String {
    match cell {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn numeric_cell(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    match serde_json::from_str::<serde_json::Number>(field) {
        Ok(number) => Value::Number(number),
        Err(_) => Value::String(field.to_string()),
    }
}
