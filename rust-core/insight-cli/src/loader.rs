// SPDX-License-Identifier: PMPL-1.0-or-later
//! Dataset sources given on the command line.
//!
//! A source is written `<id>=<kind>:<path>`, e.g. `sections=sections:data/sections.json`.
//! The file holds a JSON array of records already in the named shape.

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use insight_query::{Dataset, DatasetKind, DatasetRecords, Room, Section};
use tracing::debug;

/// One `--dataset` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetSource {
    pub id: String,
    pub kind: DatasetKind,
    pub path: PathBuf,
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}:{}", self.id, self.kind, self.path.display())
    }
}

impl FromStr for DatasetSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id, rest) = s
            .split_once('=')
            .ok_or_else(|| format!("expected <id>=<kind>:<path>, got '{s}'"))?;
        let (kind, path) = rest
            .split_once(':')
            .ok_or_else(|| format!("expected <kind>:<path> after '=', got '{rest}'"))?;
        if path.is_empty() {
            return Err(format!("missing path for dataset '{id}'"));
        }
        Ok(Self {
            id: id.to_string(),
            kind: kind.parse()?,
            path: PathBuf::from(path),
        })
    }
}

impl DatasetSource {
    /// Read and decode the source file.
    pub fn load(&self) -> Result<Dataset> {
        let text = fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        let records = decode(&text, self.kind)
            .with_context(|| format!("decoding {} as {}", self.path.display(), self.kind))?;
        debug!(id = %self.id, kind = %self.kind, rows = records.len(), "Loaded dataset file");
        Ok(Dataset::new(self.id.clone(), records))
    }
}

fn decode(text: &str, kind: DatasetKind) -> Result<DatasetRecords> {
    Ok(match kind {
        DatasetKind::Sections => DatasetRecords::Sections(serde_json::from_str::<Vec<Section>>(text)?),
        DatasetKind::Rooms => DatasetRecords::Rooms(serde_json::from_str::<Vec<Room>>(text)?),
    })
}
