//! # Categories
//!
//! A category is one addressable value on a dimension's axis. It has no
//! storage of its own: its label, notes and unit live in per-category
//! sub-maps of the owning dimension's `category` object, keyed by category
//! id:
//!
//! ```text
//! "category": {
//!     "index": { "Stockholm": 0, "Solna": 1 },
//!     "label": { "Solna": "Solna kommun" },
//!     "note":  { "Solna": ["Boundary changed 2019"] },
//!     "unit":  { "Solna": { "label": "persons" } }
//! }
//! ```
//!
//! [`Category`] is a read-only snapshot of those entries; [`CategoryMut`]
//! writes through to them.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::meta::{append_notes, notes_of, with_subtable};

/// Snapshot of one category and its meta-fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Category {
    id: String,
    position: usize,
    label: Option<String>,
    note: Vec<String>,
    unit: Option<Value>,
}

impl Category {
    /// Read category `id` at `position` out of a dimension's `category` object.
    pub(crate) fn read(id: &str, position: usize, category: &Map<String, Value>) -> Self {
        let entry = |key: &str| category.get(key).and_then(|sub| sub.get(id));
        Self {
            id: id.to_string(),
            position,
            label: entry("label").and_then(Value::as_str).map(str::to_string),
            note: notes_of(entry("note")),
            unit: entry("unit").cloned(),
        }
    }

    /// The category id, used as key in the dimension's index.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Zero-based coordinate of this category within its dimension.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The category label if one is set, otherwise the id.
    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.id)
    }

    /// Whether an explicit label is set.
    pub fn has_label(&self) -> bool {
        self.label.is_some()
    }

    /// Notes attached to this category.
    pub fn note(&self) -> &[String] {
        &self.note
    }

    /// The measurement unit, if any.
    pub fn unit(&self) -> Option<&Value> {
        self.unit.as_ref()
    }
}

/// Write handle for one category's meta-fields.
#[derive(Debug)]
pub struct CategoryMut<'a> {
    id: String,
    category: &'a mut Map<String, Value>,
}

impl<'a> CategoryMut<'a> {
    pub(crate) fn new(id: String, category: &'a mut Map<String, Value>) -> Self {
        Self { id, category }
    }

    /// The category id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set the category label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        let id = self.id.clone();
        with_subtable(self.category, "label", |labels| {
            labels.insert(id, Value::String(label.into()))
        });
    }

    /// Append a note unless the identical string is already attached.
    ///
    /// Returns `true` if the note was added.
    pub fn add_note(&mut self, note: impl Into<String>) -> bool {
        self.add_notes([note.into()]) > 0
    }

    /// Append several notes, skipping exact duplicates. Returns how many were added.
    pub fn add_notes<I, S>(&mut self, notes: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let id = self.id.clone();
        with_subtable(self.category, "note", |all| append_notes(all, &id, notes))
    }

    /// Set the measurement unit (an opaque structured value).
    pub fn set_unit(&mut self, unit: Value) {
        let id = self.id.clone();
        with_subtable(self.category, "unit", |units| units.insert(id, unit));
    }
}
