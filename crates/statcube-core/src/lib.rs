//! # statcube-core — Dataset Model for Stat-Documents
//!
//! A stat-document stores a statistical cube as one flat array of values
//! addressed by the cross-product of named dimensions. This crate parses,
//! validates, reshapes and merges such documents while keeping the curated
//! metadata (labels, notes, units) attached to them.
//!
//! ## Key Design Principles
//!
//! 1. **Validate on every build.** Each constructor ends in the structural
//!    checks of [`validate`]; a [`Dataset`] value is always consistent.
//!
//! 2. **Rebuild, don't patch.** Filtering and merging go through a
//!    [`Table`] and build a new dataset, then thread metadata forward.
//!    Operations return new values and leave their inputs untouched.
//!
//! 3. **Enumerated meta-fields.** Which fields count as metadata is a fixed
//!    list per entity in [`meta`], and one rule engine reconciles them.
//!
//! ## Crate Policy
//!
//! - Depends only on `statcube-schema` inside the workspace.
//! - No `unsafe` code.
//! - No `.unwrap()` outside tests.
//! - Logs through `tracing`; never installs a subscriber.

pub mod category;
pub mod dataset;
pub mod dimension;
pub mod error;
pub mod merge;
pub mod meta;
pub mod notes;
pub mod table;
pub mod timepoint;
pub mod validate;

// Re-export primary types for ergonomic imports.
pub use category::{Category, CategoryMut};
pub use dataset::{Dataset, DatasetInput, ValueEncoding};
pub use dimension::Dimension;
pub use error::{DatasetError, MalformedStructure};
pub use merge::{MergeOptions, OnDuplicates};
pub use meta::{MetaField, MetaKind, OnMetadataConflict, CATEGORY_META, DATASET_META, DIMENSION_META};
pub use notes::{notes_from_csv, NoteRow, NoteTarget, OnMissing};
pub use statcube_schema::SchemaValidator;
pub use table::{Row, Table, TableContent, TableOptions};
pub use timepoint::{timepoint_label, Periodicity};
pub use validate::{validate_document, MAX_SPARSE_CELLS};
