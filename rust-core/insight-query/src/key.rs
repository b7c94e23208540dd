// SPDX-License-Identifier: PMPL-1.0-or-later
//! Field references of the form `<datasetId>_<field>`.
//!
//! Fields are statically partitioned into numeric (M) and textual (S) sets per
//! record shape. The partition is fixed here and never inferred from data.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{QueryError, QueryResult};
use crate::DatasetKind;

/// Whether a field holds numbers or strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Compared with EQ/GT/LT, aggregated with MAX/MIN/SUM/AVG.
    Numeric,
    /// Compared with IS.
    Textual,
}

/// Every field of every record shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    // sections
    Dept,
    Id,
    Instructor,
    Title,
    Uuid,
    Avg,
    Pass,
    Fail,
    Audit,
    Year,
    // rooms
    Fullname,
    Shortname,
    Number,
    Name,
    Address,
    Type,
    Furniture,
    Href,
    Lat,
    Lon,
    Seats,
}

const SECTION_FIELDS: [Field; 10] = [
    Field::Dept,
    Field::Id,
    Field::Instructor,
    Field::Title,
    Field::Uuid,
    Field::Avg,
    Field::Pass,
    Field::Fail,
    Field::Audit,
    Field::Year,
];

const ROOM_FIELDS: [Field; 11] = [
    Field::Fullname,
    Field::Shortname,
    Field::Number,
    Field::Name,
    Field::Address,
    Field::Type,
    Field::Furniture,
    Field::Href,
    Field::Lat,
    Field::Lon,
    Field::Seats,
];

impl Field {
    /// All fields belonging to one record shape.
    pub fn for_shape(kind: DatasetKind) -> &'static [Field] {
        match kind {
            DatasetKind::Sections => &SECTION_FIELDS,
            DatasetKind::Rooms => &ROOM_FIELDS,
        }
    }

    /// Look up a field by its wire name across both shapes.
    pub fn parse(name: &str) -> Option<Field> {
        SECTION_FIELDS
            .iter()
            .chain(ROOM_FIELDS.iter())
            .copied()
            .find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Field::Dept => "dept",
            Field::Id => "id",
            Field::Instructor => "instructor",
            Field::Title => "title",
            Field::Uuid => "uuid",
            Field::Avg => "avg",
            Field::Pass => "pass",
            Field::Fail => "fail",
            Field::Audit => "audit",
            Field::Year => "year",
            Field::Fullname => "fullname",
            Field::Shortname => "shortname",
            Field::Number => "number",
            Field::Name => "name",
            Field::Address => "address",
            Field::Type => "type",
            Field::Furniture => "furniture",
            Field::Href => "href",
            Field::Lat => "lat",
            Field::Lon => "lon",
            Field::Seats => "seats",
        }
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::Avg
            | Field::Pass
            | Field::Fail
            | Field::Audit
            | Field::Year
            | Field::Lat
            | Field::Lon
            | Field::Seats => FieldKind::Numeric,
            _ => FieldKind::Textual,
        }
    }

    /// The record shape this field belongs to.
    pub fn shape(self) -> DatasetKind {
        if SECTION_FIELDS.contains(&self) {
            DatasetKind::Sections
        } else {
            DatasetKind::Rooms
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated `(datasetId, field)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QualifiedKey {
    pub dataset_id: String,
    pub field: Field,
}

impl QualifiedKey {
    /// Split `raw` on its single underscore and recognise the field in either
    /// record shape.
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Structure` if the split does not yield exactly two
    /// parts, the dataset id is blank, or the field is unknown.
    pub fn parse(raw: &str) -> QueryResult<Self> {
        let mut parts = raw.split('_');
        let (Some(id), Some(field), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(QueryError::structure(format!(
                "invalid key \"{raw}\": expected \"<dataset>_<field>\""
            )));
        };
        if id.trim().is_empty() {
            return Err(QueryError::structure(format!(
                "invalid key \"{raw}\": empty dataset id"
            )));
        }
        let field = Field::parse(field).ok_or_else(|| {
            QueryError::structure(format!("invalid key \"{raw}\": unknown field \"{field}\""))
        })?;
        Ok(Self {
            dataset_id: id.to_string(),
            field,
        })
    }

    /// Parse `raw` and require its field to belong to the `kind` record shape.
    pub fn classify(raw: &str, kind: DatasetKind) -> QueryResult<Self> {
        let key = Self::parse(raw)?;
        if key.field.shape() != kind {
            return Err(QueryError::structure(format!(
                "invalid key \"{raw}\": {} is not a {kind} field",
                key.field
            )));
        }
        Ok(key)
    }

    pub fn kind(&self) -> FieldKind {
        self.field.kind()
    }

    pub fn is_numeric(&self) -> bool {
        self.kind() == FieldKind::Numeric
    }

    pub fn is_textual(&self) -> bool {
        self.kind() == FieldKind::Textual
    }
}

impl fmt::Display for QualifiedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.dataset_id, self.field)
    }
}

/// The dataset a query is bound to once its target has been resolved.
///
/// Every key seen after resolution goes through [`KeyScope::resolve`] so that
/// a second dataset id or a foreign-shape field is rejected wherever it occurs.
#[derive(Debug, Clone, Copy)]
pub struct KeyScope<'a> {
    pub dataset_id: &'a str,
    pub kind: DatasetKind,
}

impl<'a> KeyScope<'a> {
    pub fn new(dataset_id: &'a str, kind: DatasetKind) -> Self {
        Self { dataset_id, kind }
    }

    /// Classify `raw` against this scope's shape and dataset id.
    pub fn resolve(&self, raw: &str) -> QueryResult<QualifiedKey> {
        let key = QualifiedKey::classify(raw, self.kind)?;
        self.check(&key)?;
        Ok(key)
    }

    /// Verify an already-parsed key belongs to this scope.
    pub fn check(&self, key: &QualifiedKey) -> QueryResult<()> {
        if key.dataset_id != self.dataset_id {
            return Err(QueryError::structure(format!(
                "multiple datasets referenced: \"{}\" and \"{}\"",
                self.dataset_id, key.dataset_id
            )));
        }
        if key.field.shape() != self.kind {
            return Err(QueryError::structure(format!(
                "key \"{key}\" is not a {} field",
                self.kind
            )));
        }
        Ok(())
    }
}
