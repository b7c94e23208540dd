// SPDX-License-Identifier: PMPL-1.0-or-later
//! WHERE clause: predicate tree construction and evaluation.
//!
//! The raw filter object is validated into a [`FilterNode`] before any record
//! is touched. A malformed clause anywhere in the tree aborts the whole query.
//!
//! ```json
//! { "AND": [ { "GT": { "sections_avg": 90 } }, { "IS": { "sections_dept": "cp*" } } ] }
//! ```

use serde_json::{Map, Value};

use crate::error::{QueryError, QueryResult};
use crate::key::{KeyScope, QualifiedKey};
use crate::record::Record;

pub const AND: &str = "AND";
pub const OR: &str = "OR";
pub const NOT: &str = "NOT";
pub const EQ: &str = "EQ";
pub const GT: &str = "GT";
pub const LT: &str = "LT";
pub const IS: &str = "IS";

/// Operator names recognised in a filter object.
pub const OPERATORS: [&str; 7] = [AND, OR, EQ, GT, LT, NOT, IS];

const WILDCARD: char = '*';

/// A validated filter tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    /// Empty WHERE: every record passes.
    All,
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
    Equals { key: QualifiedKey, value: f64 },
    GreaterThan { key: QualifiedKey, value: f64 },
    LessThan { key: QualifiedKey, value: f64 },
    Is { key: QualifiedKey, pattern: WildcardPattern },
}

/// An IS pattern. `*` may appear only as the first and/or last character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WildcardPattern {
    /// No wildcard.
    Exact(String),
    /// Trailing `*`.
    Prefix(String),
    /// Leading `*`.
    Suffix(String),
    /// Leading and trailing `*`.
    Contains(String),
}

impl WildcardPattern {
    /// # Errors
    ///
    /// Returns `QueryError::Structure` if `*` appears anywhere other than the
    /// first or last character.
    pub fn parse(raw: &str) -> QueryResult<Self> {
        let mut body = raw;
        let leading = body.starts_with(WILDCARD);
        if leading {
            body = &body[WILDCARD.len_utf8()..];
        }
        let trailing = body.ends_with(WILDCARD);
        if trailing {
            body = &body[..body.len() - WILDCARD.len_utf8()];
        }
        if body.contains(WILDCARD) {
            return Err(QueryError::structure(format!(
                "IS pattern \"{raw}\": wildcard only allowed at start or end"
            )));
        }
        let body = body.to_string();
        Ok(match (leading, trailing) {
            (false, false) => WildcardPattern::Exact(body),
            (false, true) => WildcardPattern::Prefix(body),
            (true, false) => WildcardPattern::Suffix(body),
            (true, true) => WildcardPattern::Contains(body),
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        match self {
            WildcardPattern::Exact(s) => value == s,
            WildcardPattern::Prefix(s) => value.starts_with(s.as_str()),
            WildcardPattern::Suffix(s) => value.ends_with(s.as_str()),
            WildcardPattern::Contains(s) => value.contains(s.as_str()),
        }
    }
}

impl FilterNode {
    /// Build a filter tree from a raw WHERE object.
    ///
    /// Every key in the tree is resolved through `scope`, so keys of another
    /// dataset or of the wrong record shape are rejected here.
    pub fn build(raw: &Value, scope: &KeyScope<'_>) -> QueryResult<Self> {
        let body = raw
            .as_object()
            .ok_or_else(|| QueryError::structure("WHERE clause must be an object"))?;

        if let Some(unknown) = body.keys().find(|k| !OPERATORS.contains(&k.as_str())) {
            return Err(QueryError::structure(format!(
                "unknown filter operator \"{unknown}\""
            )));
        }

        let mut entries = body.iter();
        let Some((op, value)) = entries.next() else {
            return Ok(FilterNode::All);
        };
        if entries.next().is_some() {
            return Err(QueryError::structure(format!(
                "a filter object takes exactly one operator, found {}",
                body.len()
            )));
        }
        Self::build_operator(op, value, scope)
    }

    fn build_operator(op: &str, value: &Value, scope: &KeyScope<'_>) -> QueryResult<Self> {
        match op {
            AND | OR => {
                let items = value
                    .as_array()
                    .ok_or_else(|| QueryError::structure(format!("{op} must be an array")))?;
                if items.is_empty() {
                    return Err(QueryError::structure(format!(
                        "{op} must have at least one child"
                    )));
                }
                let children = items
                    .iter()
                    .map(|child| Self::build(child, scope))
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(if op == AND {
                    FilterNode::And(children)
                } else {
                    FilterNode::Or(children)
                })
            }
            NOT => Ok(FilterNode::Not(Box::new(Self::build(value, scope)?))),
            EQ | GT | LT => {
                let (key, literal) = comparator_entry(op, value, scope)?;
                if !key.is_numeric() {
                    return Err(QueryError::structure(format!(
                        "{op} requires a numeric key, got \"{key}\""
                    )));
                }
                let value = literal.as_f64().ok_or_else(|| {
                    QueryError::structure(format!("{op} value for \"{key}\" must be a number"))
                })?;
                Ok(match op {
                    EQ => FilterNode::Equals { key, value },
                    GT => FilterNode::GreaterThan { key, value },
                    _ => FilterNode::LessThan { key, value },
                })
            }
            IS => {
                let (key, literal) = comparator_entry(op, value, scope)?;
                if !key.is_textual() {
                    return Err(QueryError::structure(format!(
                        "IS requires a string key, got \"{key}\""
                    )));
                }
                let raw = literal.as_str().ok_or_else(|| {
                    QueryError::structure(format!("IS value for \"{key}\" must be a string"))
                })?;
                Ok(FilterNode::Is {
                    key,
                    pattern: WildcardPattern::parse(raw)?,
                })
            }
            other => Err(QueryError::structure(format!(
                "unknown filter operator \"{other}\""
            ))),
        }
    }

    /// Test a single record. AND/OR short-circuit.
    pub fn matches<R: Record>(&self, record: &R) -> bool {
        match self {
            FilterNode::All => true,
            FilterNode::And(children) => children.iter().all(|c| c.matches(record)),
            FilterNode::Or(children) => children.iter().any(|c| c.matches(record)),
            FilterNode::Not(child) => !child.matches(record),
            FilterNode::Equals { key, value } => numeric(record, key) == *value,
            FilterNode::GreaterThan { key, value } => numeric(record, key) > *value,
            FilterNode::LessThan { key, value } => numeric(record, key) < *value,
            FilterNode::Is { key, pattern } => pattern.matches(textual(record, key)),
        }
    }

    /// Single linear scan returning the matching records in dataset order.
    pub fn evaluate<'a, R: Record>(&self, records: &'a [R]) -> Vec<&'a R> {
        records.iter().filter(|r| self.matches(*r)).collect()
    }

    /// Number of nodes in the tree.
    pub fn size(&self) -> usize {
        match self {
            FilterNode::And(children) | FilterNode::Or(children) => {
                1 + children.iter().map(FilterNode::size).sum::<usize>()
            }
            FilterNode::Not(child) => 1 + child.size(),
            _ => 1,
        }
    }
}

/// Extract the single `{ key: literal }` entry of a comparator.
fn comparator_entry<'v>(
    op: &str,
    value: &'v Value,
    scope: &KeyScope<'_>,
) -> QueryResult<(QualifiedKey, &'v Value)> {
    let body: &Map<String, Value> = value
        .as_object()
        .ok_or_else(|| QueryError::structure(format!("{op} must be an object")))?;
    if body.len() != 1 {
        return Err(QueryError::structure(format!(
            "{op} takes exactly one key, found {}",
            body.len()
        )));
    }
    let (raw_key, literal) = body
        .iter()
        .next()
        .ok_or_else(|| QueryError::structure(format!("{op} takes exactly one key")))?;
    Ok((scope.resolve(raw_key)?, literal))
}

fn numeric<R: Record>(record: &R, key: &QualifiedKey) -> f64 {
    record
        .value(key.field)
        .as_number()
        .unwrap_or_else(|| unreachable!("{key} validated as numeric"))
}

fn textual<'r, R: Record>(record: &'r R, key: &QualifiedKey) -> &'r str {
    record
        .value(key.field)
        .as_text()
        .unwrap_or_else(|| unreachable!("{key} validated as textual"))
}
