//! # Dimensions
//!
//! A dimension is one named axis of a dataset: an ordered set of
//! categories plus axis-level metadata. The dimension object is kept as
//! it appeared in the document (so unknown keys such as `role` survive a
//! round trip); the category order is parsed once, when the owning
//! dataset is built.
//!
//! ## Category index
//!
//! The `category.index` may be an array (position = array index) or a map
//! from id to position. Positions must form a dense `0..N-1` permutation.
//! When the index is absent the dimension must hold exactly one category,
//! named by the only key of `category.label`.

use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::category::{Category, CategoryMut};
use crate::error::{DatasetError, MalformedStructure};
use crate::meta::{self, OnMetadataConflict, DIMENSION_META};

/// One axis of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dimension {
    id: String,
    /// The dimension object without its `category` member.
    json: Map<String, Value>,
    /// The `category` object: index plus per-category meta sub-maps.
    category: Map<String, Value>,
    /// Category ids sorted by position.
    order: Vec<String>,
}

impl Dimension {
    /// Parse the dimension object stored under `dimension[id]`.
    pub(crate) fn from_json(id: &str, value: &Value) -> Result<Self, MalformedStructure> {
        let invalid = |reason: &str| MalformedStructure::CategoryIndex {
            dimension: id.to_string(),
            reason: reason.to_string(),
        };

        let mut json = value
            .as_object()
            .cloned()
            .ok_or_else(|| invalid("dimension must be an object"))?;
        let category = match json.remove("category") {
            Some(Value::Object(category)) => category,
            _ => return Err(invalid("missing category object")),
        };
        let order = parse_index(&category).map_err(|reason| invalid(&reason))?;

        Ok(Self {
            id: id.to_string(),
            json,
            category,
            order,
        })
    }

    /// Build a fresh dimension from category ids in position order.
    ///
    /// The dimension carries no metadata; callers thread it in afterwards.
    pub(crate) fn from_categories(id: &str, categories: Vec<String>) -> Self {
        let index: Map<String, Value> = categories
            .iter()
            .enumerate()
            .map(|(position, category)| (category.clone(), Value::from(position)))
            .collect();
        let mut category = Map::new();
        category.insert("index".to_string(), Value::Object(index));

        Self {
            id: id.to_string(),
            json: Map::new(),
            category,
            order: categories,
        }
    }

    /// The dimension object as it belongs under `dimension[id]`.
    pub(crate) fn to_json(&self) -> Value {
        let mut json = self.json.clone();
        json.insert("category".to_string(), Value::Object(self.category.clone()));
        Value::Object(json)
    }

    /// The id of the dimension.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The label of the dimension if one is set, otherwise the id.
    pub fn label(&self) -> &str {
        self.json
            .get("label")
            .and_then(Value::as_str)
            .unwrap_or(&self.id)
    }

    /// Set the dimension label.
    pub fn set_label(&mut self, label: impl Into<String>) {
        self.json
            .insert("label".to_string(), Value::String(label.into()));
    }

    /// Notes attached to the dimension.
    pub fn note(&self) -> Vec<String> {
        meta::notes_of(self.json.get("note"))
    }

    /// Append a note unless the identical string is already attached.
    pub fn add_note(&mut self, note: impl Into<String>) -> bool {
        self.add_notes([note.into()]) > 0
    }

    /// Append several notes, skipping exact duplicates. Returns how many were added.
    pub fn add_notes<I, S>(&mut self, notes: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        meta::append_notes(&mut self.json, "note", notes)
    }

    /// Number of categories.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if the dimension has no categories.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Category ids sorted by position.
    pub fn category_ids(&self) -> &[String] {
        &self.order
    }

    /// All categories sorted by position.
    pub fn categories(&self) -> Vec<Category> {
        self.order
            .iter()
            .enumerate()
            .map(|(position, id)| Category::read(id, position, &self.category))
            .collect()
    }

    /// Position of the category with exactly this id.
    pub fn position_of(&self, category_id: &str) -> Option<usize> {
        self.order.iter().position(|id| id == category_id)
    }

    /// Position of a category matched by id first, then by label.
    pub fn resolve(&self, id_or_label: &str) -> Result<usize, DatasetError> {
        if let Some(position) = self.position_of(id_or_label) {
            return Ok(position);
        }
        self.categories()
            .iter()
            .position(|category| category.label() == id_or_label)
            .ok_or_else(|| DatasetError::CategoryNotFound {
                dimension: self.id.clone(),
                category: id_or_label.to_string(),
            })
    }

    /// Get a category by id or label.
    pub fn category(&self, id_or_label: &str) -> Result<Category, DatasetError> {
        let position = self.resolve(id_or_label)?;
        Ok(Category::read(&self.order[position], position, &self.category))
    }

    /// Get a write handle for a category matched by id or label.
    pub fn category_mut(&mut self, id_or_label: &str) -> Result<CategoryMut<'_>, DatasetError> {
        let position = self.resolve(id_or_label)?;
        let id = self.order[position].clone();
        Ok(CategoryMut::new(id, &mut self.category))
    }

    /// Category labels that are explicitly set, by category id.
    pub fn labels(&self) -> BTreeMap<String, String> {
        self.category_strings("label")
    }

    /// Set labels for categories of this dimension.
    ///
    /// Entries whose key is not a category id of this dimension are ignored.
    /// Returns the number of labels written.
    pub fn set_labels(&mut self, labels: &HashMap<String, String>) -> usize {
        let mut written = 0;
        for id in self.order.clone() {
            if let Some(label) = labels.get(&id) {
                CategoryMut::new(id, &mut self.category).set_label(label.clone());
                written += 1;
            }
        }
        written
    }

    /// Category notes, by category id.
    pub fn notes(&self) -> BTreeMap<String, Vec<String>> {
        self.category
            .get("note")
            .and_then(Value::as_object)
            .map(|notes| {
                notes
                    .iter()
                    .map(|(id, list)| (id.clone(), meta::notes_of(Some(list))))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Category units, by category id.
    pub fn units(&self) -> BTreeMap<String, Value> {
        self.category
            .get("unit")
            .and_then(Value::as_object)
            .map(|units| units.iter().map(|(id, u)| (id.clone(), u.clone())).collect())
            .unwrap_or_default()
    }

    /// Reconcile dimension-level meta-fields against `other`.
    pub(crate) fn apply_metadata(&mut self, other: &Dimension, policy: OnMetadataConflict) {
        meta::apply_fields(&mut self.json, &other.json, DIMENSION_META, policy);
    }

    /// Copy keys of `other`'s dimension object that this one lacks.
    pub(crate) fn fill_absent_keys(&mut self, other: &Dimension) {
        meta::fill_absent(&mut self.json, &other.json, &[]);
    }

    /// Reconcile the meta-fields of one category against the same category in `other`.
    pub(crate) fn apply_category_metadata(
        &mut self,
        other: &Dimension,
        category_id: &str,
        policy: OnMetadataConflict,
    ) {
        meta::apply_category_fields(&mut self.category, &other.category, category_id, policy);
    }

    fn category_strings(&self, key: &str) -> BTreeMap<String, String> {
        self.category
            .get(key)
            .and_then(Value::as_object)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|(id, v)| v.as_str().map(|s| (id.clone(), s.to_string())))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Category ids sorted by position, from a `category` object.
fn parse_index(category: &Map<String, Value>) -> Result<Vec<String>, String> {
    let order = match category.get("index") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| {
                item.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| format!("index entry {item} is not a string"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(Value::Object(index)) => {
            let mut slots: Vec<Option<String>> = vec![None; index.len()];
            for (id, position) in index {
                let position = position
                    .as_u64()
                    .and_then(|p| usize::try_from(p).ok())
                    .ok_or_else(|| format!("position of '{id}' is not a non-negative integer"))?;
                let slot = slots.get_mut(position).ok_or_else(|| {
                    format!("position {position} of '{id}' is outside 0..{}", index.len())
                })?;
                if let Some(other) = slot.as_ref() {
                    return Err(format!("'{id}' and '{other}' share position {position}"));
                }
                *slot = Some(id.clone());
            }
            // Every slot is filled: index.len() distinct positions below index.len().
            slots.into_iter().flatten().collect()
        }
        Some(other) => return Err(format!("index must be an array or an object, got {other}")),
        None => match category.get("label").and_then(Value::as_object) {
            Some(labels) if labels.len() == 1 => labels.keys().cloned().collect(),
            _ => return Err("index is required unless exactly one category is labelled".to_string()),
        },
    };

    let mut seen = std::collections::HashSet::new();
    for id in &order {
        if !seen.insert(id.as_str()) {
            return Err(format!("duplicate category id '{id}'"));
        }
    }
    Ok(order)
}
