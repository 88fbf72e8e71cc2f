//! Output packaging: size-bounded CSV chunks bundled into a zip archive.
//!
//! ```text
//! rows ──▶ chunk_rows(limit) ──▶ migrated_orders_part{i}.csv ──▶ migrated_orders_{ts}.zip
//! ```
//!
//! Chunk files are intermediates: they are removed once archived, and every
//! file written so far is removed when packaging fails.

use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{PackageResult, RowLimitError};
use crate::models::OutputRow;

/// Default rows per chunk
pub const DEFAULT_ROW_LIMIT: usize = 900;

// =============================================================================
// Row Limit
// =============================================================================

/// Maximum rows per output chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLimit {
    Unlimited,
    PerChunk(usize),
}

impl RowLimit {
    /// `0` means unlimited.
    pub fn per_chunk(rows: usize) -> Self {
        if rows == 0 {
            Self::Unlimited
        } else {
            Self::PerChunk(rows)
        }
    }
}

impl Default for RowLimit {
    fn default() -> Self {
        Self::PerChunk(DEFAULT_ROW_LIMIT)
    }
}

impl FromStr for RowLimit {
    type Err = RowLimitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("unlimited") {
            return Ok(Self::Unlimited);
        }
        value
            .parse::<usize>()
            .map(Self::per_chunk)
            .map_err(|_| RowLimitError(s.to_string()))
    }
}

impl fmt::Display for RowLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => f.write_str("unlimited"),
            Self::PerChunk(rows) => write!(f, "{}", rows),
        }
    }
}

// =============================================================================
// Chunking
// =============================================================================

/// Split rows into chunks of at most `limit` rows.
///
/// Unlimited always yields exactly one chunk, even for no rows.
pub fn chunk_rows(rows: &[OutputRow], limit: RowLimit) -> Vec<&[OutputRow]> {
    match limit {
        RowLimit::Unlimited => vec![rows],
        RowLimit::PerChunk(size) => rows.chunks(size).collect(),
    }
}

/// File name of the chunk at `index` (0-based).
pub fn chunk_file_name(stem: &str, limit: RowLimit, index: usize) -> String {
    match limit {
        RowLimit::Unlimited => format!("{}.csv", stem),
        RowLimit::PerChunk(_) => format!("{}_part{}.csv", stem, index + 1),
    }
}

// =============================================================================
// Packaging
// =============================================================================

/// Where and how to write the output.
#[derive(Debug, Clone)]
pub struct PackageOptions {
    pub output_dir: PathBuf,
    pub row_limit: RowLimit,
    pub file_stem: String,
    pub delimiter: u8,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            row_limit: RowLimit::default(),
            file_stem: "migrated_orders".to_string(),
            delimiter: b',',
        }
    }
}

/// One chunk that went into the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkInfo {
    pub name: String,
    pub rows: usize,
}

/// Outcome of a packaging run.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    pub archive: PathBuf,
    pub chunks: Vec<ChunkInfo>,
}

/// Write `rows` as CSV chunks under `header` and bundle them into a zip archive.
///
/// On error, every file written so far is removed before returning.
pub fn package_rows(
    header: &[String],
    rows: &[OutputRow],
    options: &PackageOptions,
) -> PackageResult<PackageReport> {
    let mut written = Vec::new();

    match write_package(header, rows, options, &mut written) {
        Ok(report) => Ok(report),
        Err(e) => {
            warn!(files = written.len(), "packaging failed, removing partial output");
            remove_all(&written);
            Err(e)
        }
    }
}

fn write_package(
    header: &[String],
    rows: &[OutputRow],
    options: &PackageOptions,
    written: &mut Vec<PathBuf>,
) -> PackageResult<PackageReport> {
    std::fs::create_dir_all(&options.output_dir)?;

    let mut chunks = Vec::new();
    let mut chunk_paths = Vec::new();

    for (index, chunk) in chunk_rows(rows, options.row_limit).into_iter().enumerate() {
        let name = chunk_file_name(&options.file_stem, options.row_limit, index);
        let path = options.output_dir.join(&name);
        written.push(path.clone());

        write_chunk(&path, header, chunk, options.delimiter)?;
        debug!(file = %name, rows = chunk.len(), "wrote chunk");

        chunks.push(ChunkInfo {
            name,
            rows: chunk.len(),
        });
        chunk_paths.push(path);
    }

    let archive = options.output_dir.join(format!(
        "{}_{}.zip",
        options.file_stem,
        Utc::now().timestamp()
    ));
    written.push(archive.clone());
    write_archive(&archive, &chunk_paths)?;

    // intermediates are no longer needed once archived
    for path in &chunk_paths {
        std::fs::remove_file(path)?;
    }

    info!(archive = %archive.display(), chunks = chunks.len(), "created archive");
    Ok(PackageReport { archive, chunks })
}

fn write_chunk(path: &Path, header: &[String], rows: &[OutputRow], delimiter: u8) -> PackageResult<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;

    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row.values())?;
    }
    writer.flush()?;
    Ok(())
}

fn write_archive(archive: &Path, files: &[PathBuf]) -> PackageResult<()> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(archive)?));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        zip.start_file(name, options)?;
        let mut source = File::open(path)?;
        io::copy(&mut source, &mut zip)?;
    }

    zip.finish()?.flush()?;
    Ok(())
}

fn remove_all(paths: &[PathBuf]) {
    for path in paths {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "could not remove partial output");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn rows(n: usize) -> Vec<OutputRow> {
        (0..n)
            .map(|i| {
                let mut row = OutputRow::with_capacity(2);
                row.push("Name", format!("#{}", 100000 + i));
                row.push("Line: Title", "Widget, large");
                row
            })
            .collect()
    }

    fn header() -> Vec<String> {
        vec!["Name".to_string(), "Line: Title".to_string()]
    }

    fn options(dir: &TempDir, limit: RowLimit) -> PackageOptions {
        PackageOptions {
            output_dir: dir.path().to_path_buf(),
            row_limit: limit,
            ..PackageOptions::default()
        }
    }

    fn archive_entries(path: &Path) -> Vec<String> {
        let archive = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(String::from).collect();
        names.sort();
        names
    }

    #[test]
    fn test_row_limit_parsing() {
        assert_eq!("unlimited".parse::<RowLimit>(), Ok(RowLimit::Unlimited));
        assert_eq!("UNLIMITED".parse::<RowLimit>(), Ok(RowLimit::Unlimited));
        assert_eq!("0".parse::<RowLimit>(), Ok(RowLimit::Unlimited));
        assert_eq!("250".parse::<RowLimit>(), Ok(RowLimit::PerChunk(250)));
        assert_eq!(" 12 ".parse::<RowLimit>(), Ok(RowLimit::PerChunk(12)));
        assert_eq!("-3".parse::<RowLimit>(), Err(RowLimitError("-3".to_string())));
        assert!("abc".parse::<RowLimit>().is_err());
        assert!("".parse::<RowLimit>().is_err());
        assert_eq!(RowLimit::default(), RowLimit::PerChunk(900));
    }

    #[test]
    fn test_chunk_sizes() {
        let data = rows(5);
        let sizes: Vec<usize> = chunk_rows(&data, RowLimit::PerChunk(2))
            .iter()
            .map(|c| c.len())
            .collect();
        assert_eq!(sizes, vec![2, 2, 1]);

        assert_eq!(chunk_rows(&data, RowLimit::Unlimited).len(), 1);
        assert_eq!(chunk_rows(&[], RowLimit::Unlimited).len(), 1);
        assert!(chunk_rows(&[], RowLimit::PerChunk(2)).is_empty());
    }

    #[test]
    fn test_chunk_file_names() {
        let stem = "migrated_orders";
        assert_eq!(chunk_file_name(stem, RowLimit::Unlimited, 0), "migrated_orders.csv");
        assert_eq!(
            chunk_file_name(stem, RowLimit::PerChunk(900), 0),
            "migrated_orders_part1.csv"
        );
        assert_eq!(
            chunk_file_name(stem, RowLimit::PerChunk(900), 2),
            "migrated_orders_part3.csv"
        );
    }

    #[test]
    fn test_package_chunked() {
        let dir = TempDir::new().unwrap();
        let report = package_rows(&header(), &rows(5), &options(&dir, RowLimit::PerChunk(2))).unwrap();

        let names: Vec<&str> = report.chunks.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "migrated_orders_part1.csv",
                "migrated_orders_part2.csv",
                "migrated_orders_part3.csv"
            ]
        );
        assert_eq!(report.chunks.iter().map(|c| c.rows).sum::<usize>(), 5);

        assert!(report.archive.exists());
        let file_name = report.archive.file_name().unwrap().to_string_lossy().into_owned();
        assert!(file_name.starts_with("migrated_orders_") && file_name.ends_with(".zip"));
        assert_eq!(archive_entries(&report.archive), names);

        // only the archive is left behind
        let left: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(left.len(), 1);
    }

    #[test]
    fn test_package_unlimited_contents() {
        let dir = TempDir::new().unwrap();
        let report = package_rows(&header(), &rows(3), &options(&dir, RowLimit::Unlimited)).unwrap();
        assert_eq!(report.chunks.len(), 1);
        assert_eq!(report.chunks[0].name, "migrated_orders.csv");

        let mut archive = zip::ZipArchive::new(File::open(&report.archive).unwrap()).unwrap();
        let mut content = String::new();
        archive
            .by_name("migrated_orders.csv")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();

        let mut lines = content.lines();
        assert_eq!(lines.next(), Some("Name,Line: Title"));
        assert_eq!(lines.next(), Some("#100000,\"Widget, large\""));
        assert_eq!(content.lines().count(), 4);
    }

    #[test]
    fn test_failure_removes_partial_output() {
        let dir = TempDir::new().unwrap();
        // a file where the output directory should be
        let blocker = dir.path().join("out");
        std::fs::write(&blocker, "x").unwrap();

        let opts = PackageOptions {
            output_dir: blocker.clone(),
            ..PackageOptions::default()
        };
        assert!(package_rows(&header(), &rows(2), &opts).is_err());
        assert_eq!(std::fs::read_to_string(&blocker).unwrap(), "x");
    }
}
