//! # Order Migrate - Magento order export to Shopify order import
//!
//! Order Migrate reads a Magento order export (one row per ordered item) and
//! expands it into Shopify import rows: one line item per source row plus, once
//! per order, fulfillment, shipping and transaction lines.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Transform  │────▶│  Zip of CSV │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ (expand +   │     │   chunks    │
//! └─────────────┘     └─────────────┘     │  normalize) │     └─────────────┘
//!                                         └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use order_migrate::{migrate_file, MigrateOptions};
//!
//! let report = migrate_file("orders.csv".as_ref(), &MigrateOptions::default())?;
//! println!("Wrote {} rows", report.stats.output_rows());
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Source/output rows, line kinds, dedup context
//! - [`parser`] - CSV parsing with auto-detection
//! - [`transform`] - Schemas, expansion, normalization and the pipeline
//! - [`package`] - Chunked CSV output and zip archive
//! - [`logging`] - `tracing` subscriber setup for the binary

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Output
pub mod package;

// Observability
pub mod logging;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    CsvError, PackageError, PipelineError, PipelineResult, RowLimitError, SchemaError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{LineKind, OrderContext, OutputRow, SourceRow};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    csv_to_rows, decode_content, detect_delimiter, detect_encoding, parse_bytes, parse_file,
    ParseResult,
};

// =============================================================================
// Re-exports - Schema
// =============================================================================

pub use transform::schema::{
    builtin, project_row, MappingRule, MigrationSchema, SplitMode, StatusMap, TransformKind,
    BUILTIN_NAMES,
};

// =============================================================================
// Re-exports - Expansion
// =============================================================================

pub use transform::{expand_rows, normalize, ExpansionStats, RowExpander};

// =============================================================================
// Re-exports - Packaging
// =============================================================================

pub use package::{package_rows, ChunkInfo, PackageOptions, PackageReport, RowLimit};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{
    convert_rows, migrate_file, Conversion, CsvInfo, MigrateOptions, MigrationReport,
    SchemaSource,
};
