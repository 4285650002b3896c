//! Shared stat-document fixtures for the integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use statcube_core::Dataset;

/// Region × gender × measure, 2 × 2 × 1, with metadata on every level.
pub fn complete_dataset() -> Value {
    json!({
        "version": "2.0",
        "class": "dataset",
        "id": ["region", "gender", "measure"],
        "value": [1, 2, 3, 4],
        "status": { "1": "x" },
        "size": [2, 2, 1],
        "updated": "2016-10-10",
        "label": "Test dataset with åäö",
        "source": "My source",
        "note": ["My dataset note"],
        "dimension": {
            "region": {
                "category": {
                    "index": { "Solna": 1, "Stockholm": 0 },
                    "label": { "Solna": "Solna kommun", "Stockholm": "Stockholm kommun" },
                    "note": { "Solna": ["My Solna note"] }
                },
                "note": ["My region note"],
                "label": "Region"
            },
            "gender": {
                "category": { "index": ["M", "F"] },
                "label": "Kön"
            },
            "measure": {
                "category": {
                    "index": ["share"],
                    "label": { "share": "Antal" },
                    "unit": { "share": { "decimals": 1, "label": "%" } }
                }
            }
        },
        "extension": { "description": "An example description" }
    })
}

/// One new region (Malmö) with two values.
pub fn dataset_to_append() -> Value {
    json!({
        "version": "2.0",
        "class": "dataset",
        "id": ["region", "gender", "measure"],
        "value": [5, 6],
        "size": [1, 2, 1],
        "label": "Test dataset",
        "source": "My source",
        "dimension": {
            "region": {
                "category": {
                    "index": { "Malmö": 0 },
                    "label": { "Malmö": "Malmö kommun" }
                }
            },
            "gender": { "category": { "index": ["M", "F"] } },
            "measure": {
                "category": {
                    "index": ["share"],
                    "label": { "share": "Andel" },
                    "unit": { "share": { "decimals": 1, "label": "%" } }
                }
            }
        }
    })
}

/// Solna again, with conflicting values and notes.
pub fn dataset_to_append_with_overlap() -> Value {
    json!({
        "version": "2.0",
        "class": "dataset",
        "id": ["region", "gender", "measure"],
        "value": [50, 60],
        "size": [1, 2, 1],
        "label": "Test dataset",
        "source": "My source",
        "note": ["This is a conflicting dataset note"],
        "dimension": {
            "region": {
                "category": {
                    "index": { "Solna": 0 },
                    "label": { "Solna": "Solna stad" },
                    "note": { "Solna": ["Conflicting Solna note"] }
                },
                "note": ["This is conflicting note"]
            },
            "gender": { "category": { "index": ["M", "F"] } },
            "measure": {
                "category": {
                    "index": ["share"],
                    "label": { "share": "Antal" },
                    "unit": { "share": { "decimals": 1, "label": "%" } }
                }
            }
        }
    })
}

pub fn load(document: Value) -> Dataset {
    Dataset::from_document(document).expect("fixture should be a valid dataset")
}
