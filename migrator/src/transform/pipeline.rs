//! High-level pipeline API for order export migration.
//!
//! Combines all steps: parsing, expansion, normalization and packaging.
//!
//! # Example
//!
//! ```rust,ignore
//! use order_migrate::{migrate_file, MigrateOptions};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = migrate_file(Path::new("orders.csv"), &MigrateOptions::default())?;
//!     println!("Wrote {} rows to {}", report.stats.output_rows(), report.archive.display());
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{info, warn};

use super::expander::{ExpansionStats, RowExpander};
use super::normalize::normalize;
use super::schema::{profiles, MigrationSchema};
use crate::error::{PipelineResult, SchemaResult};
use crate::models::{OutputRow, SourceRow};
use crate::package::{package_rows, ChunkInfo, PackageOptions, RowLimit};
use crate::parser::{parse_file, ParseResult};

/// Where the mapping schema comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaSource {
    /// One of the built-in schemas, by name
    Builtin(String),
    /// A JSON schema file
    File(PathBuf),
}

impl SchemaSource {
    pub fn load(&self) -> SchemaResult<MigrationSchema> {
        match self {
            Self::Builtin(name) => profiles::builtin(name).cloned(),
            Self::File(path) => MigrationSchema::from_file(path),
        }
    }
}

impl Default for SchemaSource {
    fn default() -> Self {
        Self::Builtin("extended".to_string())
    }
}

/// Options for the migration pipeline
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    pub schema: SchemaSource,

    /// Maximum rows per output chunk
    pub row_limit: RowLimit,

    /// Directory receiving the archive
    pub output_dir: PathBuf,

    /// Explicit input delimiter (auto-detected when `None`)
    pub delimiter: Option<char>,

    /// Show a progress bar while expanding rows
    pub show_progress: bool,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            schema: SchemaSource::default(),
            row_limit: RowLimit::default(),
            output_dir: PathBuf::from("."),
            delimiter: None,
            show_progress: true,
        }
    }
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub skipped: usize,
}

impl From<&ParseResult> for CsvInfo {
    fn from(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.headers.clone(),
            row_count: parsed.rows.len(),
            skipped: parsed.skipped,
        }
    }
}

/// Expanded and normalized rows
#[derive(Debug, Clone)]
pub struct Conversion {
    pub rows: Vec<OutputRow>,
    pub stats: ExpansionStats,
    /// Non-empty cells emptied by normalization
    pub cleared_cells: usize,
}

/// Summary of a completed migration run
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    pub input: PathBuf,
    pub schema: String,
    pub csv_info: CsvInfo,
    pub stats: ExpansionStats,
    pub cleared_cells: usize,
    pub row_limit: String,
    pub chunks: Vec<ChunkInfo>,
    pub archive: PathBuf,
    pub finished_at: DateTime<Utc>,
}

/// Expand and normalize source rows. Pure: no I/O, no progress output.
pub fn convert_rows(rows: &[SourceRow], schema: &MigrationSchema) -> Conversion {
    convert_with_progress(rows, schema, &ProgressBar::hidden())
}

/// Same as [`convert_rows`], advancing `progress` once per source row.
pub fn convert_with_progress(
    rows: &[SourceRow],
    schema: &MigrationSchema,
    progress: &ProgressBar,
) -> Conversion {
    let mut expander = RowExpander::new(schema);
    for row in rows {
        expander.expand(row);
        progress.inc(1);
    }
    progress.finish_and_clear();

    let (mut rows, stats) = expander.finish();
    let cleared_cells = normalize(&mut rows, schema);

    Conversion {
        rows,
        stats,
        cleared_cells,
    }
}

/// Migrate an order export file.
///
/// This is the main entry point for the pipeline. It:
/// 1. Loads the schema
/// 2. Parses the CSV with auto-detection
/// 3. Expands and normalizes the rows
/// 4. Writes the chunks and the archive
pub fn migrate_file(path: &Path, options: &MigrateOptions) -> PipelineResult<MigrationReport> {
    let schema = options.schema.load()?;
    info!(schema = %schema.name, rules = schema.rules.len(), "loaded schema");

    info!(input = %path.display(), "reading order export");
    let parsed = parse_file(path, options.delimiter)?;
    let csv_info = CsvInfo::from(&parsed);
    info!(
        encoding = %csv_info.encoding,
        delimiter = %format_delimiter(csv_info.delimiter),
        rows = csv_info.row_count,
        "parsed CSV"
    );
    if csv_info.skipped > 0 {
        warn!(skipped = csv_info.skipped, "some records could not be read");
    }

    let missing: Vec<String> = schema
        .source_columns()
        .into_iter()
        .filter(|column| !parsed.headers.contains(column))
        .collect();
    if !missing.is_empty() {
        warn!(columns = ?missing, "input lacks columns; they read as empty");
    }

    let progress = progress_bar(parsed.rows.len(), options.show_progress);
    let conversion = convert_with_progress(&parsed.rows, &schema, &progress);
    info!(
        line_items = conversion.stats.line_items,
        fulfillment = conversion.stats.fulfillment_lines,
        shipping = conversion.stats.shipping_lines,
        transactions = conversion.stats.transactions,
        "expanded rows"
    );

    let package = package_rows(
        &schema.destinations(),
        &conversion.rows,
        &PackageOptions {
            output_dir: options.output_dir.clone(),
            row_limit: options.row_limit,
            ..PackageOptions::default()
        },
    )?;

    Ok(MigrationReport {
        input: path.to_path_buf(),
        schema: schema.name.clone(),
        csv_info,
        stats: conversion.stats,
        cleared_cells: conversion.cleared_cells,
        row_limit: options.row_limit.to_string(),
        chunks: package.chunks,
        archive: package.archive,
        finished_at: Utc::now(),
    })
}

fn progress_bar(len: usize, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let bar = ProgressBar::new(len as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} rows ({eta})")
    {
        bar.set_style(style.progress_chars("=> "));
    }
    bar
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        other => other.to_string(),
    }
}
