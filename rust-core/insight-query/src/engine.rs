// SPDX-License-Identifier: PMPL-1.0-or-later
//! Query orchestration.
//!
//! A query moves through a fixed sequence with no branching back:
//! 1. Check the root shape and split out WHERE / OPTIONS / TRANSFORMATIONS.
//! 2. Collect APPLY names, then validate OPTIONS against them.
//! 3. Resolve the target dataset (from COLUMNS, else the first GROUP key).
//! 4. Build the filter tree and the transformation against that dataset.
//! 5. Filter, then group and aggregate if a transformation is present.
//! 6. Enforce the row cap on the post-transformation result.
//! 7. Stable-sort by the ORDER keys.
//! 8. Project the selected columns.
//!
//! Steps 1-4 happen in [`QueryEngine::prepare`]; no record is read until the
//! whole query has validated.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::catalog::DatasetLookup;
use crate::config::QueryConfig;
use crate::dataset::{Dataset, DatasetRecords};
use crate::error::{QueryError, QueryResult};
use crate::filter::FilterNode;
use crate::key::KeyScope;
use crate::options::{Column, Direction, OptionsSpec, OrderSpec};
use crate::record::{FieldValue, Record};
use crate::transform::TransformationSpec;

pub const WHERE: &str = "WHERE";
pub const OPTIONS: &str = "OPTIONS";
pub const TRANSFORMATIONS: &str = "TRANSFORMATIONS";

/// One output row: selected column name to value.
pub type ResultRow = Map<String, Value>;

/// A fully validated query bound to its target dataset.
#[derive(Debug)]
pub struct PreparedQuery<'d> {
    pub dataset: &'d Dataset,
    pub filter: FilterNode,
    pub transformation: Option<TransformationSpec>,
    pub options: OptionsSpec,
}

/// The query interpreter.
#[derive(Debug, Clone, Default)]
pub struct QueryEngine {
    config: QueryConfig,
}

impl QueryEngine {
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    /// Run `raw` against a read-only dataset snapshot.
    ///
    /// # Errors
    ///
    /// `QueryError::Structure` for any malformed or inconsistent query,
    /// including an unknown dataset; `QueryError::ResultTooLarge` when the
    /// post-transformation result exceeds the configured cap.
    pub fn perform_query<L>(&self, datasets: &L, raw: &Value) -> QueryResult<Vec<ResultRow>>
    where
        L: DatasetLookup + ?Sized,
    {
        let prepared = self.prepare(datasets, raw)?;
        self.execute(&prepared)
    }

    /// Validate `raw` and bind it to its dataset without reading any record.
    pub fn prepare<'d, L>(&self, datasets: &'d L, raw: &Value) -> QueryResult<PreparedQuery<'d>>
    where
        L: DatasetLookup + ?Sized,
    {
        let root = raw
            .as_object()
            .ok_or_else(|| QueryError::structure("query must be a JSON object"))?;
        if let Some(unknown) = root
            .keys()
            .find(|k| ![WHERE, OPTIONS, TRANSFORMATIONS].contains(&k.as_str()))
        {
            return Err(QueryError::structure(format!(
                "unexpected top-level key \"{unknown}\""
            )));
        }
        let raw_where = root
            .get(WHERE)
            .ok_or_else(|| QueryError::structure("query missing WHERE"))?;
        let raw_options = root
            .get(OPTIONS)
            .ok_or_else(|| QueryError::structure("query missing OPTIONS"))?;
        let raw_transformations = root.get(TRANSFORMATIONS);

        let aggregate_keys = match raw_transformations {
            Some(t) => TransformationSpec::aggregate_keys(t)?,
            None => Vec::new(),
        };
        let options = OptionsSpec::process(raw_options, &aggregate_keys)?;

        let dataset_id = match (&options.dataset_id, raw_transformations) {
            (Some(id), _) => id.clone(),
            (None, Some(t)) => TransformationSpec::group_dataset_id(t)?,
            (None, None) => {
                return Err(QueryError::structure(
                    "COLUMNS must reference at least one dataset key",
                ))
            }
        };
        let dataset = datasets.find_dataset(&dataset_id).ok_or_else(|| {
            QueryError::structure(format!("dataset \"{dataset_id}\" has not been added"))
        })?;

        let scope = KeyScope::new(&dataset.id, dataset.kind());
        options.check_scope(&scope)?;
        let filter = FilterNode::build(raw_where, &scope)?;
        let transformation = raw_transformations
            .map(|t| TransformationSpec::parse(t, &scope))
            .transpose()?;
        if let Some(t) = &transformation {
            options.ensure_grouped(&t.group)?;
        }

        debug!(
            dataset = %dataset.id,
            kind = %dataset.kind(),
            filter_nodes = filter.size(),
            columns = options.columns.len(),
            grouped = transformation.is_some(),
            "Prepared query"
        );

        Ok(PreparedQuery {
            dataset,
            filter,
            transformation,
            options,
        })
    }

    /// Evaluate a prepared query.
    pub fn execute(&self, query: &PreparedQuery<'_>) -> QueryResult<Vec<ResultRow>> {
        match &query.dataset.records {
            DatasetRecords::Sections(rows) => self.run(rows, query),
            DatasetRecords::Rooms(rows) => self.run(rows, query),
        }
    }

    fn run<R: Record>(&self, records: &[R], query: &PreparedQuery<'_>) -> QueryResult<Vec<ResultRow>> {
        debug_assert_eq!(R::KIND, query.dataset.kind());
        let filtered = query.filter.evaluate(records);
        debug!(
            kind = %R::KIND,
            scanned = records.len(),
            matched = filtered.len(),
            "Filtered records"
        );

        let mut rows: Vec<Row<'_, R>> = match &query.transformation {
            None => filtered.into_iter().map(Row::Record).collect(),
            Some(t) => {
                let groups = t.group(&filtered);
                debug!(groups = groups.len(), rules = t.apply.len(), "Grouped records");
                groups
                    .into_iter()
                    .map(|g| Row::Group {
                        first: g.rows[0],
                        aggregates: t
                            .apply
                            .iter()
                            .map(|rule| (rule.name.clone(), rule.apply(&g.rows)))
                            .collect(),
                    })
                    .collect()
            }
        };

        if rows.len() > self.config.max_results {
            warn!(
                rows = rows.len(),
                limit = self.config.max_results,
                "Result too large"
            );
            return Err(QueryError::ResultTooLarge {
                rows: rows.len(),
                limit: self.config.max_results,
            });
        }

        if let Some(order) = &query.options.order {
            rows.sort_by(|a, b| compare_rows(a, b, order));
        }

        Ok(rows
            .iter()
            .map(|row| project(row, &query.options.columns))
            .collect())
    }
}

/// A filtered record or a synthetic group row.
enum Row<'a, R> {
    Record(&'a R),
    /// Group-by values are read from the group's first record.
    Group {
        first: &'a R,
        aggregates: HashMap<String, f64>,
    },
}

impl<'a, R: Record> Row<'a, R> {
    fn value(&self, column: &Column) -> FieldValue<'a> {
        match (self, column) {
            (Row::Record(record), Column::Field(key)) => (*record).value(key.field),
            (Row::Group { first, .. }, Column::Field(key)) => (*first).value(key.field),
            (Row::Group { aggregates, .. }, Column::Aggregate(name)) => match aggregates.get(name) {
                Some(v) => FieldValue::Number(*v),
                None => unreachable!("aggregate {name} was not computed"),
            },
            (Row::Record(_), Column::Aggregate(name)) => {
                unreachable!("aggregate {name} selected without a transformation")
            }
        }
    }
}

/// Compare by each sort key in turn; direction applies to every key.
///
/// # Panics
///
/// If one row holds a number and the other text under the same key.
fn compare_rows<R: Record>(a: &Row<'_, R>, b: &Row<'_, R>, order: &OrderSpec) -> Ordering {
    for key in &order.keys {
        let ord = match (a.value(key), b.value(key)) {
            (FieldValue::Number(x), FieldValue::Number(y)) => {
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            }
            (FieldValue::Text(x), FieldValue::Text(y)) => x.cmp(y),
            _ => panic!(
                "incompatible types while ordering by {}",
                key.output_name()
            ),
        };
        let ord = match order.direction {
            Direction::Up => ord,
            Direction::Down => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

fn project<R: Record>(row: &Row<'_, R>, columns: &[Column]) -> ResultRow {
    columns
        .iter()
        .map(|column| (column.output_name(), row.value(column).to_json()))
        .collect()
}
