//! # Merge Engine
//!
//! Appends one dataset to another with the same set of dimensions. Both
//! datasets are projected to tables keyed by raw category ids, the incoming
//! table is reordered to the base's columns, the rows are concatenated
//! (base first) and the result is rebuilt. Category sets become the union
//! of both sides, so sizes may grow.
//!
//! ## Duplicate Coordinates
//!
//! A coordinate present in both datasets is resolved by [`OnDuplicates`].
//! The kept row stays where the base row was, so base category order is
//! unchanged.
//!
//! ## Metadata
//!
//! The base's metadata is threaded onto the rebuilt dataset first. The
//! incoming dataset's meta-fields are then reconciled under
//! [`OnMetadataConflict`]; notes are always unioned. Categories that only
//! the incoming dataset has take its metadata as is.
//!
//! Merging is all-or-nothing: on error neither dataset changes.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dataset::Dataset;
use crate::error::DatasetError;
use crate::meta::OnMetadataConflict;
use crate::table::{cell_text, Table, TableOptions};

/// How a merge resolves a coordinate present in both datasets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnDuplicates {
    /// Fail the merge.
    #[default]
    Break,
    /// The incoming row wins.
    Update,
    /// The base row wins.
    Preserve,
}

impl FromStr for OnDuplicates {
    type Err = DatasetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "break" => Ok(Self::Break),
            "update" => Ok(Self::Update),
            "preserve" => Ok(Self::Preserve),
            other => Err(DatasetError::UnsupportedPolicy {
                kind: "duplicates",
                value: other.to_string(),
            }),
        }
    }
}

/// Conflict policies for [`Dataset::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Duplicate coordinate handling.
    pub on_duplicates: OnDuplicates,
    /// Meta-field conflict handling.
    pub on_metadata_conflict: OnMetadataConflict,
}

impl MergeOptions {
    /// Options with the given policies.
    pub fn new(on_duplicates: OnDuplicates, on_metadata_conflict: OnMetadataConflict) -> Self {
        Self {
            on_duplicates,
            on_metadata_conflict,
        }
    }
}

impl Dataset {
    /// Append `incoming` to this dataset, returning the merged dataset.
    ///
    /// # Errors
    ///
    /// - [`DatasetError::MergeIncompatibleDimensions`] if the datasets do
    ///   not have the same set of dimension ids.
    /// - [`DatasetError::MergeDuplicates`] if a coordinate occurs in both
    ///   and `on_duplicates` is [`OnDuplicates::Break`].
    pub fn append(&self, incoming: &Dataset, options: &MergeOptions) -> Result<Dataset, DatasetError> {
        let base_ids: BTreeSet<&str> = self.dimension_ids().into_iter().collect();
        let incoming_ids: BTreeSet<&str> = incoming.dimension_ids().into_iter().collect();
        if base_ids != incoming_ids {
            return Err(DatasetError::MergeIncompatibleDimensions {
                base: self.dimension_ids().iter().map(|s| s.to_string()).collect(),
                incoming: incoming.dimension_ids().iter().map(|s| s.to_string()).collect(),
            });
        }

        let table_options = TableOptions::ids().with_status();
        let base = self.to_table(&table_options);
        let columns: Vec<&str> = base.header().iter().map(String::as_str).collect();
        let appended = incoming.to_table(&table_options).select(&columns)?;

        let rows = deduplicate(&base, &appended, self.dimensions().len(), options.on_duplicates)?;
        let table = Table::new(base.header().to_vec(), rows)?;
        let mut merged = Dataset::from_table(&table, &table_options)?;

        let policy = options.on_metadata_conflict;
        merged.inherit_metadata(self, OnMetadataConflict::Update);
        merged.apply_dataset_metadata(incoming, policy);
        for dimension in merged.dimensions_mut() {
            let base_dimension = self.dimension(dimension.id())?;
            let incoming_dimension = incoming.dimension(dimension.id())?;
            dimension.apply_metadata(incoming_dimension, policy);
            let base_categories: HashSet<&str> =
                base_dimension.category_ids().iter().map(String::as_str).collect();
            // Every incoming category is in the merged dimension.
            for id in incoming_dimension.category_ids() {
                let category_policy = if base_categories.contains(id.as_str()) {
                    policy
                } else {
                    OnMetadataConflict::Update
                };
                dimension.apply_category_metadata(incoming_dimension, id, category_policy);
            }
        }

        tracing::info!(
            base = self.len(),
            incoming = incoming.len(),
            merged = merged.len(),
            "datasets merged"
        );
        Ok(merged)
    }

    /// Append `incoming` and replace this dataset with the result.
    ///
    /// On error this dataset is left unchanged.
    pub fn append_in_place(&mut self, incoming: &Dataset, options: &MergeOptions) -> Result<(), DatasetError> {
        *self = self.append(incoming, options)?;
        Ok(())
    }
}

/// Concatenate base and appended rows, resolving repeated coordinates.
///
/// The first `dimensions` cells of a row form its coordinate.
fn deduplicate(
    base: &Table,
    appended: &Table,
    dimensions: usize,
    policy: OnDuplicates,
) -> Result<Vec<Vec<Value>>, DatasetError> {
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(base.len() + appended.len());
    let mut seen: HashMap<Vec<String>, usize> = HashMap::with_capacity(rows.capacity());
    let mut duplicates: Vec<Vec<String>> = Vec::new();

    for row in base.rows().iter().chain(appended.rows()) {
        let coordinate: Vec<String> = row[..dimensions].iter().map(cell_text).collect();
        match seen.get(&coordinate) {
            None => {
                seen.insert(coordinate, rows.len());
                rows.push(row.clone());
            }
            Some(&kept) => {
                if policy == OnDuplicates::Update {
                    rows[kept] = row.clone();
                }
                duplicates.push(coordinate);
            }
        }
    }

    if let Some(first) = duplicates.first() {
        if policy == OnDuplicates::Break {
            return Err(DatasetError::MergeDuplicates {
                count: duplicates.len(),
                first: first.clone(),
            });
        }
        tracing::warn!(
            count = duplicates.len(),
            policy = ?policy,
            "duplicate coordinates resolved during merge"
        );
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_policy_parsing() {
        assert_eq!("break".parse::<OnDuplicates>().unwrap(), OnDuplicates::Break);
        assert_eq!("update".parse::<OnDuplicates>().unwrap(), OnDuplicates::Update);
        assert_eq!("preserve".parse::<OnDuplicates>().unwrap(), OnDuplicates::Preserve);
        let err = "overwrite".parse::<OnDuplicates>().unwrap_err();
        assert!(matches!(
            err,
            DatasetError::UnsupportedPolicy { kind: "duplicates", ref value } if value == "overwrite"
        ));
    }

    #[test]
    fn test_default_options() {
        let options = MergeOptions::default();
        assert_eq!(options.on_duplicates, OnDuplicates::Break);
        assert_eq!(options.on_metadata_conflict, OnMetadataConflict::Preserve);
    }

    #[test]
    fn test_options_deserialize() {
        let options: MergeOptions =
            serde_json::from_value(json!({ "on_duplicates": "update" })).unwrap();
        assert_eq!(options, MergeOptions::new(OnDuplicates::Update, OnMetadataConflict::Preserve));
        assert!(serde_json::from_value::<MergeOptions>(json!({ "on_duplicates": "merge" })).is_err());
    }

    fn table(rows: Vec<Vec<Value>>) -> Table {
        Table::new(vec!["region".into(), "value".into()], rows).unwrap()
    }

    #[test]
    fn test_deduplicate_keeps_first_position() {
        let base = table(vec![vec![json!("a"), json!(1)], vec![json!("b"), json!(2)]]);
        let appended = table(vec![vec![json!("c"), json!(3)], vec![json!("a"), json!(9)]]);

        let updated = deduplicate(&base, &appended, 1, OnDuplicates::Update).unwrap();
        assert_eq!(
            updated,
            vec![
                vec![json!("a"), json!(9)],
                vec![json!("b"), json!(2)],
                vec![json!("c"), json!(3)],
            ]
        );

        let preserved = deduplicate(&base, &appended, 1, OnDuplicates::Preserve).unwrap();
        assert_eq!(preserved[0], vec![json!("a"), json!(1)]);
        assert_eq!(preserved.len(), 3);

        let err = deduplicate(&base, &appended, 1, OnDuplicates::Break).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::MergeDuplicates { count: 1, ref first } if first == &vec!["a".to_string()]
        ));
    }
}
