//! # Metadata Propagation
//!
//! Meta-fields are the human-curated parts of a stat-document (labels,
//! notes, units, source, ...) as opposed to its structure. Every rebuild
//! of a dataset threads them forward from a snapshot, and every merge
//! reconciles them against the incoming dataset.
//!
//! Each entity type has a fixed, enumerated list of meta-fields
//! ([`DATASET_META`], [`DIMENSION_META`], [`CATEGORY_META`]). Copying
//! metadata from one instance to another is a loop over that list.
//!
//! ## Conflict rules
//!
//! | Field kind | `Update` | `Preserve` |
//! |---|---|---|
//! | scalar (`label`, `source`, `unit`, ...) | incoming overwrites | only fills an absent field |
//! | notes (`note`) | union by exact string | union by exact string |

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::DatasetError;

/// How a merge resolves a meta-field present on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnMetadataConflict {
    /// The incoming value overwrites the existing one.
    Update,
    /// The existing value is kept; incoming values only fill gaps.
    #[default]
    Preserve,
}

impl FromStr for OnMetadataConflict {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "update" => Ok(Self::Update),
            "preserve" => Ok(Self::Preserve),
            other => Err(DatasetError::UnsupportedPolicy {
                kind: "metadata conflict",
                value: other.to_string(),
            }),
        }
    }
}

/// Shape of a meta-field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKind {
    /// A single value replaced as a whole.
    Scalar,
    /// An ordered list of note strings, merged by union.
    Notes,
}

/// One enumerated meta-field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetaField {
    /// Key in the stat-document.
    pub key: &'static str,
    /// How the value is reconciled.
    pub kind: MetaKind,
}

impl MetaField {
    const fn scalar(key: &'static str) -> Self {
        Self {
            key,
            kind: MetaKind::Scalar,
        }
    }

    const fn notes(key: &'static str) -> Self {
        Self {
            key,
            kind: MetaKind::Notes,
        }
    }
}

/// Meta-fields of a dataset, top-level keys of the document.
pub const DATASET_META: &[MetaField] = &[
    MetaField::scalar("source"),
    MetaField::scalar("label"),
    MetaField::scalar("extension"),
    MetaField::scalar("updated"),
    MetaField::notes("note"),
];

/// Meta-fields of a dimension, keys of the dimension object.
pub const DIMENSION_META: &[MetaField] = &[MetaField::scalar("label"), MetaField::notes("note")];

/// Meta-fields of a category, per-category sub-maps of `category`.
pub const CATEGORY_META: &[MetaField] = &[
    MetaField::scalar("label"),
    MetaField::notes("note"),
    MetaField::scalar("unit"),
];

/// Compute the new value of one field, or `None` when the target stays as is.
fn reconcile(
    current: Option<&Value>,
    incoming: Option<&Value>,
    kind: MetaKind,
    policy: OnMetadataConflict,
) -> Option<Value> {
    let incoming = incoming?;
    match kind {
        MetaKind::Scalar => match (current, policy) {
            (None, _) | (Some(_), OnMetadataConflict::Update) => Some(incoming.clone()),
            (Some(_), OnMetadataConflict::Preserve) => None,
        },
        MetaKind::Notes => {
            let mut merged = notes_of(current);
            let added = push_unique(&mut merged, notes_of(Some(incoming)));
            if added == 0 && current.is_some() {
                None
            } else {
                Some(notes_value(merged))
            }
        }
    }
}

/// Apply `fields` from `source` onto `target` (dataset or dimension objects).
pub(crate) fn apply_fields(
    target: &mut Map<String, Value>,
    source: &Map<String, Value>,
    fields: &[MetaField],
    policy: OnMetadataConflict,
) {
    for field in fields {
        if let Some(value) = reconcile(target.get(field.key), source.get(field.key), field.kind, policy)
        {
            target.insert(field.key.to_string(), value);
        }
    }
}

/// Apply category meta-fields of `category_id` from one `category` object
/// onto another.
pub(crate) fn apply_category_fields(
    target: &mut Map<String, Value>,
    source: &Map<String, Value>,
    category_id: &str,
    policy: OnMetadataConflict,
) {
    for field in CATEGORY_META {
        let incoming = source.get(field.key).and_then(|sub| sub.get(category_id));
        let current = target.get(field.key).and_then(|sub| sub.get(category_id));
        if let Some(value) = reconcile(current, incoming, field.kind, policy) {
            with_subtable(target, field.key, |sub| sub.insert(category_id.to_string(), value));
        }
    }
}

/// Copy every key of `source` that `target` lacks, except those in `skip`.
pub(crate) fn fill_absent(target: &mut Map<String, Value>, source: &Map<String, Value>, skip: &[&str]) {
    for (key, value) in source {
        if !skip.contains(&key.as_str()) && !target.contains_key(key) {
            target.insert(key.clone(), value.clone());
        }
    }
}

/// Run `f` on the object stored under `key`, creating it (or replacing a
/// non-object) first.
pub(crate) fn with_subtable<R>(
    parent: &mut Map<String, Value>,
    key: &str,
    f: impl FnOnce(&mut Map<String, Value>) -> R,
) -> R {
    let mut table = match parent.remove(key) {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let result = f(&mut table);
    parent.insert(key.to_string(), Value::Object(table));
    result
}

/// Append notes under `key` of `container`, skipping exact duplicates.
///
/// Returns the number of notes actually added.
pub(crate) fn append_notes<I, S>(container: &mut Map<String, Value>, key: &str, notes: I) -> usize
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut current = notes_of(container.get(key));
    let added = push_unique(&mut current, notes.into_iter().map(Into::into));
    if added > 0 {
        container.insert(key.to_string(), notes_value(current));
    }
    added
}

/// Read a note list; anything that is not an array of strings reads as empty.
pub(crate) fn notes_of(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => vec![s.clone()],
        _ => Vec::new(),
    }
}

fn push_unique(list: &mut Vec<String>, notes: impl IntoIterator<Item = String>) -> usize {
    let mut added = 0;
    for note in notes {
        if !list.contains(&note) {
            list.push(note);
            added += 1;
        }
    }
    added
}

fn notes_value(notes: Vec<String>) -> Value {
    Value::Array(notes.into_iter().map(Value::String).collect())
}
