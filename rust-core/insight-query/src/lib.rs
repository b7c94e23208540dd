// SPDX-License-Identifier: PMPL-1.0-or-later
//! Insight Query
//!
//! Structured JSON queries over registered course-section and room datasets.
//! A query filters a single dataset, optionally groups and aggregates the
//! surviving rows, then orders and projects the result under a hard row cap.
//!
//! The engine is synchronous and pure: it is handed an immutable dataset
//! snapshot and never mutates or locks it.

pub mod calc;
pub mod catalog;
pub mod config;
pub mod dataset;
pub mod engine;
pub mod error;
pub mod filter;
pub mod key;
pub mod options;
pub mod record;
pub mod transform;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use catalog::{CatalogSnapshot, DatasetCatalog, DatasetLookup};
pub use config::QueryConfig;
pub use dataset::{validate_dataset_id, Dataset, DatasetRecords, DatasetSummary};
pub use engine::{QueryEngine, ResultRow};
pub use error::{CatalogError, QueryError, QueryResult};
pub use filter::{FilterNode, WildcardPattern};
pub use key::{Field, FieldKind, QualifiedKey};
pub use options::{Column, Direction, OptionsSpec, OrderSpec};
pub use record::{FieldValue, Record, Room, Section, ValueKey};
pub use transform::{ApplyRule, ApplyToken, TransformationSpec};

/// The two record shapes a dataset can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    Sections,
    Rooms,
}

impl DatasetKind {
    /// Both kinds in canonical order.
    pub const ALL: [DatasetKind; 2] = [DatasetKind::Sections, DatasetKind::Rooms];
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetKind::Sections => write!(f, "sections"),
            DatasetKind::Rooms => write!(f, "rooms"),
        }
    }
}

impl FromStr for DatasetKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sections" => Ok(DatasetKind::Sections),
            "rooms" => Ok(DatasetKind::Rooms),
            other => Err(format!(
                "unknown dataset kind '{other}'. Valid kinds: sections, rooms"
            )),
        }
    }
}
