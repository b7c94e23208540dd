// SPDX-License-Identifier: PMPL-1.0-or-later
//!
//! Output formatters for query result rows.
//!
//! Supports three output modes:
//! - **Table**: Human-readable columnar output using `comfy-table`.
//! - **JSON**: Pretty-printed array of row objects.
//! - **CSV**: Comma-separated values for pipeline consumption.
//!
//! Table and CSV follow the query's COLUMNS order; JSON rows are objects and
//! carry no order.

use comfy_table::{Cell, ContentArrangement, Table};
use insight_query::ResultRow;
use serde_json::Value;
use std::fmt;

/// Available output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(format!(
                "Unknown format '{other}'. Valid formats: table, json, csv"
            )),
        }
    }
}

/// Render `rows` with `columns` as the column order.
pub fn format_rows(columns: &[String], rows: &[ResultRow], format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => format_json(rows),
        OutputFormat::Table => format_table(columns, rows),
        OutputFormat::Csv => format_csv(columns, rows),
    }
}

/// Pretty-print the rows as a JSON array with 2-space indentation.
fn format_json(rows: &[ResultRow]) -> String {
    let value = Value::Array(rows.iter().cloned().map(Value::Object).collect());
    serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
}

fn format_table(columns: &[String], rows: &[ResultRow]) -> String {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(columns.iter().map(Cell::new));

    for row in rows {
        let cells: Vec<Cell> = columns
            .iter()
            .map(|col| Cell::new(value_to_cell(row.get(col).unwrap_or(&Value::Null))))
            .collect();
        table.add_row(cells);
    }

    let row_count = rows.len();
    format!("{table}\n({row_count} row{})", if row_count == 1 { "" } else { "s" })
}

/// Cell text for a result value. Rows only ever hold numbers and strings.
fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_csv(columns: &[String], rows: &[ResultRow]) -> String {
    let mut output = String::new();

    let header: Vec<String> = columns.iter().map(|c| csv_escape_str(c)).collect();
    output.push_str(&header.join(","));
    output.push('\n');

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .map(|col| csv_escape(row.get(col).unwrap_or(&Value::Null)))
            .collect();
        output.push_str(&cells.join(","));
        output.push('\n');
    }

    output
}

fn csv_escape(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => csv_escape_str(s),
        other => csv_escape_str(&other.to_string()),
    }
}

/// Escape a string for CSV output per RFC 4180.
fn csv_escape_str(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
