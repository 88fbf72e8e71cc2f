//! Error types for the order migration pipeline.
//!
//! Only the I/O boundary can fail. Per-row transformation never returns an
//! error: malformed values degrade to field defaults instead.
//!
//! - [`CsvError`] - Input file reading and parsing
//! - [`SchemaError`] - Mapping schema loading and validation
//! - [`PackageError`] - Chunk writing and archiving
//! - [`RowLimitError`] - Invalid chunk size argument
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors while reading the source order export.
#[derive(Debug, Error)]
pub enum CsvError {
    /// Failed to read file.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// Header row has no named columns.
    #[error("No headers found in CSV")]
    NoHeaders,

    /// Delimiter must be a single ASCII character.
    #[error("Delimiter '{0}' is not an ASCII character")]
    InvalidDelimiter(char),

    /// The csv reader rejected the header row.
    #[error("Invalid CSV format: {0}")]
    Parse(#[from] csv::Error),
}

// =============================================================================
// Schema Errors
// =============================================================================

/// Errors while loading or validating a [`crate::MigrationSchema`].
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Failed to read a schema file.
    #[error("Failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    /// Schema JSON could not be decoded.
    #[error("Invalid schema JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Two rules write the same destination column.
    #[error("Destination column '{0}' is declared more than once")]
    DuplicateDestination(String),

    /// A hook names a column the mapping table never writes.
    #[error("{context} refers to unknown destination column '{column}'")]
    UnknownColumn { column: String, context: String },

    /// The mapping table has no rules.
    #[error("Mapping table is empty")]
    EmptyTable,

    /// No built-in schema with this name.
    #[error("Unknown built-in schema '{0}' (expected 'simple' or 'extended')")]
    UnknownBuiltin(String),
}

// =============================================================================
// Packaging Errors
// =============================================================================

/// Errors while writing chunk files or the archive.
#[derive(Debug, Error)]
pub enum PackageError {
    /// Filesystem error.
    #[error("Output IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV writer error.
    #[error("Failed to write CSV chunk: {0}")]
    Csv(#[from] csv::Error),

    /// Archive error.
    #[error("Failed to build archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

// =============================================================================
// Row Limit Errors
// =============================================================================

/// Invalid per-chunk row limit argument.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid row limit '{0}': expected 'unlimited' or a non-negative integer")]
pub struct RowLimitError(pub String);

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::migrate_file`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// CSV parsing error.
    #[error("CSV error: {0}")]
    Csv(#[from] CsvError),

    /// Schema error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Packaging error.
    #[error("Packaging error: {0}")]
    Package(#[from] PackageError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for CSV operations.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for packaging operations.
pub type PackageResult<T> = Result<T, PackageError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion_chain() {
        let csv_err = CsvError::EmptyFile;
        let pipeline_err: PipelineError = csv_err.into();
        assert!(pipeline_err.to_string().contains("empty"));

        let schema_err = SchemaError::DuplicateDestination("Line: SKU".into());
        let pipeline_err: PipelineError = schema_err.into();
        assert!(pipeline_err.to_string().contains("Line: SKU"));
    }

    #[test]
    fn test_unknown_column_format() {
        let err = SchemaError::UnknownColumn {
            column: "Line: Gift".into(),
            context: "blank line fields".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("blank line fields"));
        assert!(msg.contains("Line: Gift"));
    }

    #[test]
    fn test_row_limit_error_message() {
        let err = RowLimitError("-3".into());
        assert!(err.to_string().contains("'-3'"));
    }
}
