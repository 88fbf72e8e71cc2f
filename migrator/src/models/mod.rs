//! Domain models for the order migration pipeline.
//!
//! This module contains the row types that flow through the engine:
//!
//! - [`SourceRow`] - One record of the Magento order export
//! - [`OutputRow`] - One record of the Shopify order import, in table order
//! - [`LineKind`] - Discriminator stored in the line type column
//! - [`OrderContext`] - Per-run dedup sets for auxiliary rows

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

// =============================================================================
// Source Row
// =============================================================================

/// A single source order row.
///
/// Every value is a string; a column that is not present reads as `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRow(BTreeMap<String, String>);

impl SourceRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of `column`, or `""` when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.0.get(column).map(String::as_str).unwrap_or("")
    }

    /// Whether the export has this column at all (even if empty).
    pub fn has_column(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.0.insert(column.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SourceRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

// =============================================================================
// Line Kind
// =============================================================================

/// Kind of an output row, carried in the line type column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LineKind {
    #[serde(rename = "Line Item")]
    LineItem,
    #[serde(rename = "Fulfillment Line")]
    Fulfillment,
    #[serde(rename = "Shipping Line")]
    Shipping,
    #[serde(rename = "Transaction")]
    Transaction,
}

impl LineKind {
    pub const ALL: [LineKind; 4] = [
        LineKind::LineItem,
        LineKind::Fulfillment,
        LineKind::Shipping,
        LineKind::Transaction,
    ];

    /// Display string written to the line type column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LineItem => "Line Item",
            Self::Fulfillment => "Fulfillment Line",
            Self::Shipping => "Shipping Line",
            Self::Transaction => "Transaction",
        }
    }

    /// Parse a line type column value. Unknown strings yield `None`.
    pub fn from_column(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == value)
    }
}

impl fmt::Display for LineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Output Row
// =============================================================================

/// A destination row: ordered `(column, value)` pairs.
///
/// Columns are fixed when the row is projected from the mapping table.
/// [`OutputRow::set`] never adds a column, so every row keeps exactly the
/// table's header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputRow {
    fields: Vec<(String, String)>,
}

impl OutputRow {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    /// Append a column. An existing column is overwritten in place.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        let column = column.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(c, _)| *c == column) {
            Some((_, v)) => *v = value,
            None => self.fields.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `column`, or `""` when the row has no such column.
    pub fn value(&self, column: &str) -> &str {
        self.get(column).unwrap_or("")
    }

    /// Overwrite an existing column. Returns `false` if the column is unknown.
    pub fn set(&mut self, column: &str, value: impl Into<String>) -> bool {
        match self.fields.iter_mut().find(|(c, _)| c == column) {
            Some((_, v)) => {
                *v = value.into();
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self, column: &str) -> bool {
        self.set(column, String::new())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// =============================================================================
// Order Context
// =============================================================================

/// Order identifiers that already produced each kind of auxiliary row.
///
/// Owned by one [`crate::RowExpander`] for the duration of a run.
#[derive(Debug, Clone, Default)]
pub struct OrderContext {
    fulfilled: HashSet<String>,
    shipped: HashSet<String>,
    transacted: HashSet<String>,
}

impl OrderContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `order_id` got an auxiliary row of `kind`.
    ///
    /// Returns `true` the first time for a given pair, `false` afterwards.
    /// Line items are never deduplicated.
    pub fn claim(&mut self, kind: LineKind, order_id: &str) -> bool {
        let seen = match kind {
            LineKind::LineItem => return true,
            LineKind::Fulfillment => &mut self.fulfilled,
            LineKind::Shipping => &mut self.shipped,
            LineKind::Transaction => &mut self.transacted,
        };
        seen.insert(order_id.to_string())
    }
}

// =============================================================================
// Tests
// =============================================================================
