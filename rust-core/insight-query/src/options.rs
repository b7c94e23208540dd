// SPDX-License-Identifier: PMPL-1.0-or-later
//! OPTIONS clause: selected columns and sort order.
//!
//! Column keys are parsed before the target dataset is known; the first
//! dataset id seen among them becomes the query's target. Shape checks against
//! the resolved dataset happen later through [`OptionsSpec::check_scope`].

use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};
use crate::key::{KeyScope, QualifiedKey};

pub const COLUMNS: &str = "COLUMNS";
pub const ORDER: &str = "ORDER";
pub const DIR: &str = "dir";
pub const KEYS: &str = "keys";
pub const UP: &str = "UP";
pub const DOWN: &str = "DOWN";

/// A selected output column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Column {
    /// A dataset field, emitted as `<datasetId>_<field>`.
    Field(QualifiedKey),
    /// An APPLY output, emitted under its bare name.
    Aggregate(String),
}

impl Column {
    /// Name of this column in an output row.
    pub fn output_name(&self) -> String {
        match self {
            Column::Field(key) => key.to_string(),
            Column::Aggregate(name) => name.clone(),
        }
    }

    /// Parse a column reference, preferring a declared aggregate name.
    fn parse(raw: &str, aggregate_keys: &[String]) -> QueryResult<Self> {
        if aggregate_keys.iter().any(|k| k == raw) {
            Ok(Column::Aggregate(raw.to_string()))
        } else {
            QualifiedKey::parse(raw).map(Column::Field)
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ascending (`"UP"`).
    Up,
    /// Descending (`"DOWN"`).
    Down,
}

/// Validated ORDER clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub direction: Direction,
    /// Sort keys in priority order; each is one of the selected columns.
    pub keys: Vec<Column>,
}

/// Validated OPTIONS clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsSpec {
    pub columns: Vec<Column>,
    pub order: Option<OrderSpec>,
    /// Dataset id shared by every field column; `None` when only aggregate
    /// columns are selected.
    pub dataset_id: Option<String>,
}

impl OptionsSpec {
    /// Validate a raw OPTIONS object.
    ///
    /// `aggregate_keys` are the APPLY output names declared by the query's
    /// transformation (empty when there is none).
    pub fn process(raw: &Value, aggregate_keys: &[String]) -> QueryResult<Self> {
        let options = raw
            .as_object()
            .ok_or_else(|| QueryError::structure("OPTIONS must be an object"))?;
        if let Some(unknown) = options.keys().find(|k| *k != COLUMNS && *k != ORDER) {
            return Err(QueryError::structure(format!(
                "unexpected key \"{unknown}\" in OPTIONS"
            )));
        }

        let raw_columns = options
            .get(COLUMNS)
            .ok_or_else(|| QueryError::structure("OPTIONS missing COLUMNS"))?
            .as_array()
            .ok_or_else(|| QueryError::structure("COLUMNS must be an array"))?;
        if raw_columns.is_empty() {
            return Err(QueryError::structure("COLUMNS must not be empty"));
        }

        let mut columns = Vec::with_capacity(raw_columns.len());
        let mut dataset_id: Option<String> = None;
        for raw_column in raw_columns {
            let name = raw_column
                .as_str()
                .ok_or_else(|| QueryError::structure("COLUMNS entries must be strings"))?;
            let column = Column::parse(name, aggregate_keys)?;
            if let Column::Field(key) = &column {
                match &dataset_id {
                    Some(id) if *id != key.dataset_id => {
                        return Err(QueryError::structure(format!(
                            "multiple datasets referenced: \"{id}\" and \"{}\"",
                            key.dataset_id
                        )));
                    }
                    Some(_) => {}
                    None => dataset_id = Some(key.dataset_id.clone()),
                }
            }
            columns.push(column);
        }

        let order = match options.get(ORDER) {
            None => None,
            Some(raw_order) => Some(parse_order(raw_order, &columns, aggregate_keys)?),
        };

        Ok(Self {
            columns,
            order,
            dataset_id,
        })
    }

    /// Field columns that are not aggregates.
    pub fn field_columns(&self) -> impl Iterator<Item = &QualifiedKey> {
        self.columns.iter().filter_map(|c| match c {
            Column::Field(key) => Some(key),
            Column::Aggregate(_) => None,
        })
    }

    /// Require every field column to belong to the resolved dataset.
    pub fn check_scope(&self, scope: &KeyScope<'_>) -> QueryResult<()> {
        self.field_columns().try_for_each(|key| scope.check(key))
    }

    /// With a transformation present, every field column must be grouped on.
    pub fn ensure_grouped(&self, group_keys: &[QualifiedKey]) -> QueryResult<()> {
        match self.field_columns().find(|key| !group_keys.contains(key)) {
            Some(key) => Err(QueryError::structure(format!(
                "column \"{key}\" is neither grouped nor aggregated"
            ))),
            None => Ok(()),
        }
    }
}

/// ORDER is either a bare key (ascending) or `{ "dir": ..., "keys": [...] }`.
fn parse_order(raw: &Value, columns: &[Column], aggregate_keys: &[String]) -> QueryResult<OrderSpec> {
    match raw {
        Value::String(name) => Ok(OrderSpec {
            direction: Direction::Up,
            keys: vec![order_key(name, columns, aggregate_keys)?],
        }),
        Value::Object(body) => parse_order_object(body, columns, aggregate_keys),
        _ => Err(QueryError::structure("ORDER must be a string or an object")),
    }
}

fn parse_order_object(
    body: &Map<String, Value>,
    columns: &[Column],
    aggregate_keys: &[String],
) -> QueryResult<OrderSpec> {
    if let Some(unknown) = body.keys().find(|k| *k != DIR && *k != KEYS) {
        return Err(QueryError::structure(format!(
            "unexpected key \"{unknown}\" in ORDER"
        )));
    }
    let direction = match body.get(DIR).and_then(Value::as_str) {
        Some(UP) => Direction::Up,
        Some(DOWN) => Direction::Down,
        Some(other) => {
            return Err(QueryError::structure(format!(
                "ORDER dir must be \"UP\" or \"DOWN\", got \"{other}\""
            )))
        }
        None => return Err(QueryError::structure("ORDER missing string dir")),
    };
    let raw_keys = body
        .get(KEYS)
        .and_then(Value::as_array)
        .ok_or_else(|| QueryError::structure("ORDER missing keys array"))?;
    if raw_keys.is_empty() {
        return Err(QueryError::structure("ORDER keys must not be empty"));
    }
    let keys = raw_keys
        .iter()
        .map(|k| {
            let name = k
                .as_str()
                .ok_or_else(|| QueryError::structure("ORDER keys must be strings"))?;
            order_key(name, columns, aggregate_keys)
        })
        .collect::<QueryResult<Vec<_>>>()?;
    Ok(OrderSpec { direction, keys })
}

fn order_key(name: &str, columns: &[Column], aggregate_keys: &[String]) -> QueryResult<Column> {
    let column = Column::parse(name, aggregate_keys)?;
    if !columns.contains(&column) {
        return Err(QueryError::structure(format!(
            "ORDER key \"{name}\" is not in COLUMNS"
        )));
    }
    Ok(column)
}
