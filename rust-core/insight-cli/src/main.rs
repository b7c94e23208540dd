// SPDX-License-Identifier: PMPL-1.0-or-later
//!
//! insight: run one JSON query over typed dataset files.
//!
//! ```text
//! insight --dataset sections=sections:sections.json --query q.json --format csv
//! ```
//!
//! Each `--dataset` file is loaded into a fresh catalog, the query is read
//! from `--query` (or stdin) and the result rows are printed to stdout.

mod formatter;
mod loader;

use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use insight_query::config::MAX_RESULTS;
use insight_query::{DatasetCatalog, QueryConfig, QueryEngine};
use serde_json::Value;
use tracing::info;

use formatter::{format_rows, OutputFormat};
use loader::DatasetSource;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// insight: query course-section and room datasets.
#[derive(Parser, Debug)]
#[command(name = "insight", version = VERSION, about = "Run Insight queries over section and room datasets")]
struct Cli {
    /// Dataset to load, as <id>=<kind>:<path>. Repeatable.
    #[arg(long = "dataset", value_name = "ID=KIND:PATH", required = true)]
    datasets: Vec<DatasetSource>,

    /// File holding the JSON query. Reads stdin when omitted.
    #[arg(long)]
    query: Option<String>,

    /// Output format: table, json or csv.
    #[arg(long, default_value = "table")]
    format: OutputFormat,

    /// Largest result a query may return.
    #[arg(long, default_value_t = MAX_RESULTS)]
    max_results: usize,

    /// Print query timing to stderr.
    #[arg(long)]
    timing: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "Error:".red().bold());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let catalog = DatasetCatalog::new();
    for source in &cli.datasets {
        let dataset = source.load()?;
        catalog
            .add_dataset(dataset)
            .with_context(|| format!("registering {source}"))?;
    }

    let raw = read_query(cli.query.as_deref())?;
    let snapshot = catalog.snapshot()?;
    let engine = QueryEngine::new(QueryConfig::default().with_max_results(cli.max_results));

    let start = Instant::now();
    let prepared = engine.prepare(&snapshot, &raw)?;
    let mut columns: Vec<String> = Vec::new();
    for name in prepared.options.columns.iter().map(|c| c.output_name()) {
        if !columns.contains(&name) {
            columns.push(name);
        }
    }
    let rows = engine.execute(&prepared)?;
    let elapsed = start.elapsed();

    info!(dataset = %prepared.dataset.id, rows = rows.len(), "Query complete");
    println!("{}", format_rows(&columns, &rows, cli.format));
    if cli.timing {
        eprintln!(
            "{}",
            format!("Time: {:.3}ms", elapsed.as_secs_f64() * 1000.0).dimmed()
        );
    }
    Ok(())
}

fn read_query(path: Option<&str>) -> Result<Value> {
    let text = match path {
        Some(p) => fs::read_to_string(Path::new(p)).with_context(|| format!("reading query {p}"))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("reading query from stdin")?;
            buf
        }
    };
    serde_json::from_str(&text).context("query is not valid JSON")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_sources_and_defaults() {
        let cli = Cli::try_parse_from([
            "insight",
            "--dataset",
            "sections=sections:s.json",
            "--dataset",
            "rooms=rooms:r.json",
        ])
        .unwrap();
        assert_eq!(cli.datasets.len(), 2);
        assert_eq!(cli.format, OutputFormat::Table);
        assert_eq!(cli.max_results, MAX_RESULTS);
        assert!(cli.query.is_none());
    }

    #[test]
    fn test_cli_requires_dataset() {
        assert!(Cli::try_parse_from(["insight"]).is_err());
    }

    #[test]
    fn test_cli_rejects_bad_format() {
        assert!(Cli::try_parse_from(["insight", "--dataset", "s=sections:s.json", "--format", "xml"]).is_err());
    }
}
