// SPDX-License-Identifier: PMPL-1.0-or-later
//! In-memory dataset catalog.
//!
//! The catalog owns registered datasets and is the only place they change.
//! Queries never see the catalog itself: they are handed a [`CatalogSnapshot`]
//! of shared `Arc<Dataset>`s, so adding or removing a dataset while a query
//! runs leaves that query's view untouched.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::info;

use crate::dataset::{validate_dataset_id, Dataset, DatasetSummary};
use crate::error::CatalogError;

/// Lookup from dataset id to dataset, as consumed by the query engine.
pub trait DatasetLookup {
    fn find_dataset(&self, id: &str) -> Option<&Dataset>;
}

impl DatasetLookup for HashMap<String, Dataset> {
    fn find_dataset(&self, id: &str) -> Option<&Dataset> {
        self.get(id)
    }
}

impl DatasetLookup for [Dataset] {
    fn find_dataset(&self, id: &str) -> Option<&Dataset> {
        self.iter().find(|d| d.id == id)
    }
}

impl DatasetLookup for Vec<Dataset> {
    fn find_dataset(&self, id: &str) -> Option<&Dataset> {
        self.as_slice().find_dataset(id)
    }
}

/// Immutable point-in-time view of a catalog.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    datasets: HashMap<String, Arc<Dataset>>,
}

impl CatalogSnapshot {
    pub fn len(&self) -> usize {
        self.datasets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }
}

impl DatasetLookup for CatalogSnapshot {
    fn find_dataset(&self, id: &str) -> Option<&Dataset> {
        self.datasets.get(id).map(Arc::as_ref)
    }
}

/// Thread-safe registry of datasets.
#[derive(Debug, Clone, Default)]
pub struct DatasetCatalog {
    datasets: Arc<RwLock<HashMap<String, Arc<Dataset>>>>,
}

impl DatasetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a dataset and return the ids of all registered datasets.
    ///
    /// # Errors
    ///
    /// `InvalidId` for a blank or underscored id, `DuplicateId` if the id is
    /// taken, `EmptyDataset` if it carries no records. A rejected add leaves
    /// the catalog unchanged.
    pub fn add_dataset(&self, dataset: Dataset) -> Result<Vec<String>, CatalogError> {
        validate_dataset_id(&dataset.id)?;
        if dataset.is_empty() {
            return Err(CatalogError::EmptyDataset(dataset.id));
        }

        let mut store = self.datasets.write().map_err(|_| CatalogError::LockPoisoned)?;
        if store.contains_key(&dataset.id) {
            return Err(CatalogError::DuplicateId(dataset.id));
        }
        info!(
            dataset = %dataset.id,
            kind = %dataset.kind(),
            rows = dataset.len(),
            "Registered dataset"
        );
        store.insert(dataset.id.clone(), Arc::new(dataset));

        let mut ids: Vec<String> = store.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    /// Remove a dataset, returning its id.
    pub fn remove_dataset(&self, id: &str) -> Result<String, CatalogError> {
        validate_dataset_id(id)?;
        let mut store = self.datasets.write().map_err(|_| CatalogError::LockPoisoned)?;
        match store.remove(id) {
            Some(_) => {
                info!(dataset = %id, "Removed dataset");
                Ok(id.to_string())
            }
            None => Err(CatalogError::NotFound(id.to_string())),
        }
    }

    /// Summaries of every registered dataset, sorted by id.
    pub fn list_datasets(&self) -> Result<Vec<DatasetSummary>, CatalogError> {
        let store = self.datasets.read().map_err(|_| CatalogError::LockPoisoned)?;
        let mut list: Vec<DatasetSummary> = store.values().map(|d| d.summary()).collect();
        list.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(list)
    }

    pub fn contains(&self, id: &str) -> Result<bool, CatalogError> {
        let store = self.datasets.read().map_err(|_| CatalogError::LockPoisoned)?;
        Ok(store.contains_key(id))
    }

    /// Take a consistent read-only view for one query.
    pub fn snapshot(&self) -> Result<CatalogSnapshot, CatalogError> {
        let store = self.datasets.read().map_err(|_| CatalogError::LockPoisoned)?;
        Ok(CatalogSnapshot {
            datasets: store.clone(),
        })
    }
}
