// SPDX-License-Identifier: PMPL-1.0-or-later
//! Typed records and field access.
//!
//! Records arrive already typed from the ingestion collaborator; the engine
//! only reads them through [`Record::value`], which is total over the fields
//! of the record's own shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::key::Field;
use crate::DatasetKind;

/// A course section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub uuid: String,
    pub id: String,
    pub title: String,
    pub instructor: String,
    pub dept: String,
    pub year: f64,
    pub avg: f64,
    pub pass: f64,
    pub fail: f64,
    pub audit: f64,
}

/// A campus room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub fullname: String,
    pub shortname: String,
    pub number: String,
    pub name: String,
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    pub seats: f64,
    #[serde(rename = "type")]
    pub room_type: String,
    pub furniture: String,
    pub href: String,
}

/// A single field value borrowed from a record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl<'a> FieldValue<'a> {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&'a str> {
        match self {
            FieldValue::Text(s) => Some(s),
            FieldValue::Number(_) => None,
        }
    }

    /// Hashable identity of this value.
    pub fn key(&self) -> ValueKey<'a> {
        match *self {
            FieldValue::Number(n) => ValueKey::Number(normalize_bits(n)),
            FieldValue::Text(s) => ValueKey::Text(s),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Number(n) => number_to_json(*n),
            FieldValue::Text(s) => Value::String((*s).to_string()),
        }
    }
}

/// Hash/Eq identity of a [`FieldValue`], used for group keys and COUNT.
///
/// Numbers compare by bit pattern with `-0.0` folded into `0.0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKey<'a> {
    Number(u64),
    Text(&'a str),
}

fn normalize_bits(n: f64) -> u64 {
    if n == 0.0 {
        0.0f64.to_bits()
    } else {
        n.to_bits()
    }
}

/// Render a number as JSON, emitting integral values as JSON integers.
pub fn number_to_json(n: f64) -> Value {
    const MAX_SAFE: f64 = 9_007_199_254_740_991.0;
    if n.fract() == 0.0 && n.abs() <= MAX_SAFE {
        Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Read access to a typed record.
pub trait Record {
    /// The record shape.
    const KIND: DatasetKind;

    /// Value of `field`.
    ///
    /// # Panics
    ///
    /// If `field` does not belong to [`Record::KIND`]. Keys are classified
    /// against the dataset's shape before evaluation, so reaching this is a
    /// defect.
    fn value(&self, field: Field) -> FieldValue<'_>;
}

impl Record for Section {
    const KIND: DatasetKind = DatasetKind::Sections;

    fn value(&self, field: Field) -> FieldValue<'_> {
        match field {
            Field::Uuid => FieldValue::Text(&self.uuid),
            Field::Id => FieldValue::Text(&self.id),
            Field::Title => FieldValue::Text(&self.title),
            Field::Instructor => FieldValue::Text(&self.instructor),
            Field::Dept => FieldValue::Text(&self.dept),
            Field::Year => FieldValue::Number(self.year),
            Field::Avg => FieldValue::Number(self.avg),
            Field::Pass => FieldValue::Number(self.pass),
            Field::Fail => FieldValue::Number(self.fail),
            Field::Audit => FieldValue::Number(self.audit),
            other => unreachable!("{other} is not a section field"),
        }
    }
}

impl Record for Room {
    const KIND: DatasetKind = DatasetKind::Rooms;

    fn value(&self, field: Field) -> FieldValue<'_> {
        match field {
            Field::Fullname => FieldValue::Text(&self.fullname),
            Field::Shortname => FieldValue::Text(&self.shortname),
            Field::Number => FieldValue::Text(&self.number),
            Field::Name => FieldValue::Text(&self.name),
            Field::Address => FieldValue::Text(&self.address),
            Field::Type => FieldValue::Text(&self.room_type),
            Field::Furniture => FieldValue::Text(&self.furniture),
            Field::Href => FieldValue::Text(&self.href),
            Field::Lat => FieldValue::Number(self.lat),
            Field::Lon => FieldValue::Number(self.lon),
            Field::Seats => FieldValue::Number(self.seats),
            other => unreachable!("{other} is not a room field"),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn section(dept: &str, id: &str, avg: f64) -> Section {
        Section {
            uuid: format!("{dept}-{id}-{avg}"),
            id: id.to_string(),
            title: format!("{dept} {id}"),
            instructor: "smith, jane".to_string(),
            dept: dept.to_string(),
            year: 2015.0,
            avg,
            pass: 100.0,
            fail: 5.0,
            audit: 0.0,
        }
    }

    pub fn room(shortname: &str, number: &str, seats: f64) -> Room {
        Room {
            fullname: format!("{shortname} Building"),
            shortname: shortname.to_string(),
            number: number.to_string(),
            name: format!("{shortname}_{number}"),
            address: "2329 West Mall".to_string(),
            lat: 49.26,
            lon: -123.25,
            seats,
            room_type: "Small Group".to_string(),
            furniture: "Classroom-Movable Tables & Chairs".to_string(),
            href: format!("http://rooms.example/{shortname}-{number}"),
        }
    }
}
