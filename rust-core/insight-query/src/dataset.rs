// SPDX-License-Identifier: PMPL-1.0-or-later
//! Datasets: an identifier plus records of a single shape.

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::record::{Room, Section};
use crate::DatasetKind;

/// Records of one shape. The enum makes a mixed-shape dataset unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "records", rename_all = "lowercase")]
pub enum DatasetRecords {
    Sections(Vec<Section>),
    Rooms(Vec<Room>),
}

impl DatasetRecords {
    pub fn kind(&self) -> DatasetKind {
        match self {
            DatasetRecords::Sections(_) => DatasetKind::Sections,
            DatasetRecords::Rooms(_) => DatasetKind::Rooms,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DatasetRecords::Sections(rows) => rows.len(),
            DatasetRecords::Rooms(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A registered dataset. Immutable once handed to the query engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: String,
    pub records: DatasetRecords,
}

impl Dataset {
    pub fn new(id: impl Into<String>, records: DatasetRecords) -> Self {
        Self {
            id: id.into(),
            records,
        }
    }

    pub fn sections(id: impl Into<String>, rows: Vec<Section>) -> Self {
        Self::new(id, DatasetRecords::Sections(rows))
    }

    pub fn rooms(id: impl Into<String>, rows: Vec<Room>) -> Self {
        Self::new(id, DatasetRecords::Rooms(rows))
    }

    pub fn kind(&self) -> DatasetKind {
        self.records.kind()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary {
            id: self.id.clone(),
            kind: self.kind(),
            num_rows: self.len(),
        }
    }
}

/// Listing entry for a registered dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub id: String,
    pub kind: DatasetKind,
    pub num_rows: usize,
}

/// A dataset id must be non-blank and must not contain `_`.
pub fn validate_dataset_id(id: &str) -> Result<(), CatalogError> {
    if id.trim().is_empty() || id.contains('_') {
        return Err(CatalogError::InvalidId(id.to_string()));
    }
    Ok(())
}
