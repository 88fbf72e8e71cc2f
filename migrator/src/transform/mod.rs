//! Transformation module.
//!
//! This module turns source order rows into import rows:
//! - Schema: Mapping table, value rules and built-in profiles
//! - Expander: One line item plus auxiliary rows per source row
//! - Normalize: Column/line-kind exclusivity sweep
//! - Pipeline: Parse, convert and package a whole file

pub mod expander;
pub mod normalize;
pub mod pipeline;
pub mod schema;

pub use expander::{expand_rows, ExpansionStats, RowExpander};
pub use normalize::normalize;
pub use pipeline::*;
