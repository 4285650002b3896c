//! # Notes Ingestion
//!
//! Curated notes arrive as `(dimension, category, note)` rows, typically a
//! CSV file maintained next to the data. The target of a row depends on
//! which coordinates are filled in:
//!
//! | `dimension` | `category` | Target |
//! |---|---|---|
//! | empty | (ignored) | the dataset |
//! | set | empty | the dimension |
//! | set | set | the category (matched by id, then label) |

use std::io::Read;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DatasetError;

/// One note and where it belongs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NoteRow {
    /// Dimension id, or empty for a dataset note.
    #[serde(default)]
    pub dimension: String,
    /// Category id or label, or empty for a dimension note.
    #[serde(default)]
    pub category: String,
    /// The note text.
    pub note: String,
}

impl NoteRow {
    /// A note on the dataset itself.
    pub fn dataset(note: impl Into<String>) -> Self {
        Self {
            note: note.into(),
            ..Self::default()
        }
    }

    /// A note on a dimension.
    pub fn dimension(dimension: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            dimension: dimension.into(),
            note: note.into(),
            ..Self::default()
        }
    }

    /// A note on one category of a dimension.
    pub fn category(
        dimension: impl Into<String>,
        category: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        Self {
            dimension: dimension.into(),
            category: category.into(),
            note: note.into(),
        }
    }

    /// Where the note goes.
    pub fn target(&self) -> NoteTarget<'_> {
        match (self.dimension.as_str(), self.category.as_str()) {
            ("", _) => NoteTarget::Dataset,
            (dimension, "") => NoteTarget::Dimension(dimension),
            (dimension, category) => NoteTarget::Category {
                dimension,
                category,
            },
        }
    }
}

/// Resolved destination of a [`NoteRow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteTarget<'a> {
    Dataset,
    Dimension(&'a str),
    Category {
        dimension: &'a str,
        category: &'a str,
    },
}

/// What to do with a note whose dimension or category does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnMissing {
    /// Log a warning and continue.
    #[default]
    Skip,
    /// Stop with a lookup error.
    Break,
}

impl FromStr for OnMissing {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "break" => Ok(Self::Break),
            other => Err(DatasetError::UnsupportedPolicy {
                kind: "missing note target",
                value: other.to_string(),
            }),
        }
    }
}

/// Read note rows from CSV with a `dimension,category,note` header.
///
/// The `dimension` and `category` columns may be omitted or left empty.
pub fn notes_from_csv<R: Read>(reader: R) -> Result<Vec<NoteRow>, DatasetError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::Fields)
        .from_reader(reader);
    let mut rows = Vec::new();
    for record in reader.deserialize::<NoteRow>() {
        rows.push(record?);
    }
    tracing::debug!(rows = rows.len(), "note rows read");
    Ok(rows)
}
