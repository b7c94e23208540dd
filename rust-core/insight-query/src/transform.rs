// SPDX-License-Identifier: PMPL-1.0-or-later
//! TRANSFORMATIONS clause: GROUP + APPLY.
//!
//! ```json
//! {
//!   "GROUP": ["sections_dept"],
//!   "APPLY": [{ "avgMark": { "AVG": "sections_avg" } }]
//! }
//! ```
//!
//! Groups are identified by the typed tuple of their group-by values, so two
//! different tuples can never merge, and are emitted in first-seen order.

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde_json::{Map, Value};

use crate::calc;
use crate::error::{QueryError, QueryResult};
use crate::key::{KeyScope, QualifiedKey};
use crate::record::{FieldValue, Record, ValueKey};

pub const GROUP: &str = "GROUP";
pub const APPLY: &str = "APPLY";

/// Aggregate operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApplyToken {
    Max,
    Min,
    Avg,
    Count,
    Sum,
}

impl ApplyToken {
    /// Whether the operator requires a numeric field. COUNT accepts any.
    pub fn requires_numeric(self) -> bool {
        !matches!(self, ApplyToken::Count)
    }
}

impl fmt::Display for ApplyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyToken::Max => write!(f, "MAX"),
            ApplyToken::Min => write!(f, "MIN"),
            ApplyToken::Avg => write!(f, "AVG"),
            ApplyToken::Count => write!(f, "COUNT"),
            ApplyToken::Sum => write!(f, "SUM"),
        }
    }
}

impl FromStr for ApplyToken {
    type Err = QueryError;

    /// Tokens are case-sensitive on the wire.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MAX" => Ok(ApplyToken::Max),
            "MIN" => Ok(ApplyToken::Min),
            "AVG" => Ok(ApplyToken::Avg),
            "COUNT" => Ok(ApplyToken::Count),
            "SUM" => Ok(ApplyToken::Sum),
            other => Err(QueryError::structure(format!(
                "unknown APPLY token \"{other}\""
            ))),
        }
    }
}

/// One APPLY entry: `{ name: { TOKEN: key } }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyRule {
    /// Output column name. Non-empty, no underscore.
    pub name: String,
    pub token: ApplyToken,
    pub key: QualifiedKey,
}

impl ApplyRule {
    /// Compute this rule over one group's rows.
    pub fn apply<R: Record>(&self, rows: &[&R]) -> f64 {
        let values: Vec<FieldValue<'_>> = rows.iter().map(|r| r.value(self.key.field)).collect();
        if self.token == ApplyToken::Count {
            return calc::count_distinct(&values) as f64;
        }
        let numbers: Vec<f64> = values
            .iter()
            .map(|v| {
                v.as_number()
                    .unwrap_or_else(|| unreachable!("{} validated as numeric", self.key))
            })
            .collect();
        match self.token {
            ApplyToken::Max => calc::max(&numbers),
            ApplyToken::Min => calc::min(&numbers),
            ApplyToken::Sum => calc::sum(&numbers),
            ApplyToken::Avg => calc::avg(&numbers),
            ApplyToken::Count => unreachable!("handled above"),
        }
    }
}

/// A validated TRANSFORMATIONS clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformationSpec {
    /// Group-by keys, at least one.
    pub group: Vec<QualifiedKey>,
    pub apply: Vec<ApplyRule>,
}

/// Rows sharing one tuple of group-by values, in dataset order. Never empty.
#[derive(Debug)]
pub struct Group<'a, R> {
    pub rows: Vec<&'a R>,
}

impl TransformationSpec {
    /// Validate a raw TRANSFORMATIONS object against the resolved dataset.
    pub fn parse(raw: &Value, scope: &KeyScope<'_>) -> QueryResult<Self> {
        let body = clause_body(raw)?;

        let group = group_entries(body)?
            .iter()
            .map(|entry| {
                let name = entry
                    .as_str()
                    .ok_or_else(|| QueryError::structure("GROUP entries must be strings"))?;
                scope.resolve(name)
            })
            .collect::<QueryResult<Vec<_>>>()?;

        let mut seen = HashSet::new();
        let mut apply = Vec::new();
        for raw_rule in apply_entries(body)? {
            let (name, rule_body) = rule_entry(raw_rule)?;
            if !seen.insert(name) {
                return Err(QueryError::structure(format!(
                    "duplicate APPLY key \"{name}\""
                )));
            }
            apply.push(parse_rule(name, rule_body, scope)?);
        }

        Ok(Self { group, apply })
    }

    /// Names of the aggregate outputs declared in a raw TRANSFORMATIONS
    /// object, in declaration order.
    ///
    /// Runs before the target dataset is known, so only the rule names are
    /// checked here: shape, validity and uniqueness.
    pub fn aggregate_keys(raw: &Value) -> QueryResult<Vec<String>> {
        let body = clause_body(raw)?;
        let mut names: Vec<String> = Vec::new();
        for raw_rule in apply_entries(body)? {
            let (name, _) = rule_entry(raw_rule)?;
            if names.iter().any(|n| n == name) {
                return Err(QueryError::structure(format!(
                    "duplicate APPLY key \"{name}\""
                )));
            }
            names.push(name.to_string());
        }
        Ok(names)
    }

    /// Dataset id of the first GROUP key, used to resolve the target when
    /// COLUMNS selects only aggregates.
    pub fn group_dataset_id(raw: &Value) -> QueryResult<String> {
        let body = clause_body(raw)?;
        let first = group_entries(body)?
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| QueryError::structure("GROUP entries must be strings"))?;
        Ok(QualifiedKey::parse(first)?.dataset_id)
    }

    /// Partition rows by their group-by values.
    pub fn group<'a, R: Record>(&self, rows: &[&'a R]) -> Vec<Group<'a, R>> {
        let mut index: HashMap<Vec<ValueKey<'a>>, usize> = HashMap::new();
        let mut groups: Vec<Group<'a, R>> = Vec::new();
        for &row in rows {
            let key: Vec<ValueKey<'a>> = self
                .group
                .iter()
                .map(|k| row.value(k.field).key())
                .collect();
            match index.entry(key) {
                Entry::Occupied(slot) => groups[*slot.get()].rows.push(row),
                Entry::Vacant(slot) => {
                    slot.insert(groups.len());
                    groups.push(Group { rows: vec![row] });
                }
            }
        }
        groups
    }
}

fn clause_body(raw: &Value) -> QueryResult<&Map<String, Value>> {
    let body = raw
        .as_object()
        .ok_or_else(|| QueryError::structure("TRANSFORMATIONS must be an object"))?;
    if let Some(unknown) = body.keys().find(|k| *k != GROUP && *k != APPLY) {
        return Err(QueryError::structure(format!(
            "unexpected key \"{unknown}\" in TRANSFORMATIONS"
        )));
    }
    Ok(body)
}

fn group_entries(body: &Map<String, Value>) -> QueryResult<&Vec<Value>> {
    let entries = body
        .get(GROUP)
        .ok_or_else(|| QueryError::structure("TRANSFORMATIONS missing GROUP"))?
        .as_array()
        .ok_or_else(|| QueryError::structure("GROUP must be an array"))?;
    if entries.is_empty() {
        return Err(QueryError::structure("GROUP must not be empty"));
    }
    Ok(entries)
}

fn apply_entries(body: &Map<String, Value>) -> QueryResult<&Vec<Value>> {
    body.get(APPLY)
        .ok_or_else(|| QueryError::structure("TRANSFORMATIONS missing APPLY"))?
        .as_array()
        .ok_or_else(|| QueryError::structure("APPLY must be an array"))
}

/// Split `{ name: body }`, validating the name.
fn rule_entry(raw: &Value) -> QueryResult<(&str, &Value)> {
    let rule = raw
        .as_object()
        .ok_or_else(|| QueryError::structure("APPLY rules must be objects"))?;
    if rule.len() != 1 {
        return Err(QueryError::structure(format!(
            "an APPLY rule takes exactly one key, found {}",
            rule.len()
        )));
    }
    let (name, body) = rule
        .iter()
        .next()
        .ok_or_else(|| QueryError::structure("an APPLY rule takes exactly one key"))?;
    if name.is_empty() || name.contains('_') {
        return Err(QueryError::structure(format!(
            "invalid APPLY key \"{name}\": must be non-empty without underscores"
        )));
    }
    Ok((name.as_str(), body))
}

fn parse_rule(name: &str, body: &Value, scope: &KeyScope<'_>) -> QueryResult<ApplyRule> {
    let body = body
        .as_object()
        .ok_or_else(|| QueryError::structure(format!("APPLY rule \"{name}\" must be an object")))?;
    if body.len() != 1 {
        return Err(QueryError::structure(format!(
            "APPLY rule \"{name}\" takes exactly one token, found {}",
            body.len()
        )));
    }
    let (raw_token, target) = body
        .iter()
        .next()
        .ok_or_else(|| QueryError::structure(format!("APPLY rule \"{name}\" has no token")))?;
    let token: ApplyToken = raw_token.parse()?;
    let target = target.as_str().ok_or_else(|| {
        QueryError::structure(format!("APPLY rule \"{name}\" target must be a string"))
    })?;
    let key = scope.resolve(target)?;
    if token.requires_numeric() && !key.is_numeric() {
        return Err(QueryError::structure(format!(
            "{token} requires a numeric key, got \"{key}\""
        )));
    }
    Ok(ApplyRule {
        name: name.to_string(),
        token,
        key,
    })
}
