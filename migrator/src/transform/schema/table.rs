//! Mapping schema definition
//!
//! A [`MigrationSchema`] is one configuration of the conversion engine: the
//! ordered mapping table plus the row hooks and auxiliary row specs that the
//! expander and normalizer read. Schemas are plain data and round-trip
//! through JSON.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use super::rules::{StatusMap, TransformKind};
use crate::error::{SchemaError, SchemaResult};
use crate::models::LineKind;

/// How a direct copy splits its source value on spaces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitMode {
    /// Use the whole value
    #[default]
    None,
    /// Token before the first space
    First,
    /// Everything after the first space
    Last,
}

/// One entry of the mapping table: how a single destination column is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingRule {
    /// Source column in the order export. `None` means a literal column.
    #[serde(default)]
    pub source: Option<String>,

    /// Destination column in the import file (unique per table)
    pub destination: String,

    /// Literal value used when `source` is unset
    #[serde(default)]
    pub value: Option<String>,

    /// Split applied by [`TransformKind::Direct`]
    #[serde(default)]
    pub split: SplitMode,

    /// Value rule for this column
    #[serde(default)]
    pub transform: TransformKind,
}

impl MappingRule {
    /// Copy `source` into `destination` unchanged.
    pub fn from_source(source: &str, destination: &str) -> Self {
        Self {
            source: Some(source.to_string()),
            destination: destination.to_string(),
            value: None,
            split: SplitMode::None,
            transform: TransformKind::Direct,
        }
    }

    /// Always write `value` into `destination`.
    pub fn constant(destination: &str, value: &str) -> Self {
        Self {
            source: None,
            destination: destination.to_string(),
            value: Some(value.to_string()),
            split: SplitMode::None,
            transform: TransformKind::Direct,
        }
    }

    pub fn with_split(mut self, split: SplitMode) -> Self {
        self.split = split;
        self
    }

    pub fn with_transform(mut self, transform: TransformKind) -> Self {
        self.transform = transform;
        self
    }
}

/// When the SKU column is cut at its first separator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SkuPolicy {
    /// Every SKU containing the separator is truncated
    Always,
    /// Only items whose product options JSON has a selected option value
    WhenOptionsSelected { options_field: String },
}

/// Post-projection rule for the SKU column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuRule {
    pub column: String,
    #[serde(default = "default_sku_separator")]
    pub separator: String,
    pub policy: SkuPolicy,
}

fn default_sku_separator() -> String {
    "-".to_string()
}

/// Address columns that must be either all empty or all filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressGroup {
    pub name: String,
    pub fields: Vec<String>,
}

/// A status column derived from a source code through a [`StatusMap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedStatus {
    pub source: String,
    pub destination: String,
    pub map: StatusMap,
}

/// Fulfillment line creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FulfillmentSpec {
    /// Source column holding the seller / pickup location name
    pub seller_field: String,
    /// Destination location column
    pub location_field: String,
    /// Locations known to the target store
    pub allowed_locations: Vec<String>,
    /// Location used for sellers not on the allow-list
    pub fallback_location: String,
    #[serde(default)]
    pub status: Option<DerivedStatus>,
}

/// Shipping line creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSpec {
    pub amount_field: String,
    pub description_field: String,
    pub title_column: String,
    pub price_column: String,
    #[serde(default = "default_shipping_title")]
    pub default_title: String,
    /// Columns emptied on the shipping line
    #[serde(default)]
    pub clear: Vec<String>,
}

fn default_shipping_title() -> String {
    "Shipping".to_string()
}

/// Transaction line creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSpec {
    pub amount_field: String,
    pub currency_field: String,
    pub amount_column: String,
    pub currency_column: String,
    pub status: DerivedStatus,
    /// Columns emptied on the transaction line
    #[serde(default)]
    pub clear: Vec<String>,
}

/// Columns that only rows of `kind` may carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExclusiveColumns {
    pub kind: LineKind,
    pub columns: Vec<String>,
}

/// A complete conversion schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationSchema {
    /// Short identifier (`simple`, `extended`, ...)
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Destination column holding the [`LineKind`]
    #[serde(default = "default_line_kind_field")]
    pub line_kind_field: String,

    /// Source column identifying the order, used to dedup auxiliary rows
    pub order_id_field: String,

    /// Ordered mapping table
    pub rules: Vec<MappingRule>,

    /// Line-item columns emptied on every auxiliary row
    #[serde(default)]
    pub blank_line_fields: Vec<String>,

    #[serde(default)]
    pub sku: Option<SkuRule>,

    #[serde(default)]
    pub address_groups: Vec<AddressGroup>,

    /// Placeholder written into the empty fields of a partial address
    #[serde(default = "default_address_filler")]
    pub address_filler: String,

    #[serde(default)]
    pub fulfillment: Option<FulfillmentSpec>,

    #[serde(default)]
    pub shipping: Option<ShippingSpec>,

    #[serde(default)]
    pub transaction: Option<TransactionSpec>,

    /// Post-pass column exclusivity
    #[serde(default)]
    pub exclusive_columns: Vec<ExclusiveColumns>,
}

fn default_line_kind_field() -> String {
    "Line: Type".to_string()
}

fn default_address_filler() -> String {
    ".".to_string()
}

impl MigrationSchema {
    /// Parse and validate a schema from a JSON string
    pub fn from_json(json: &str) -> SchemaResult<Self> {
        let schema: Self = serde_json::from_str(json)?;
        schema.validate()?;
        Ok(schema)
    }

    /// Read, parse and validate a schema file
    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&content)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> SchemaResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Destination header, in table order
    pub fn destinations(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.destination.clone()).collect()
    }

    /// Every source column the schema reads
    pub fn source_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();

        for rule in &self.rules {
            columns.extend(rule.source.iter().cloned());
            if let TransformKind::FallbackOnEmpty { fallback, .. } = &rule.transform {
                columns.push(fallback.clone());
            }
        }

        columns.push(self.order_id_field.clone());

        if let Some(SkuRule {
            policy: SkuPolicy::WhenOptionsSelected { options_field },
            ..
        }) = &self.sku
        {
            columns.push(options_field.clone());
        }
        if let Some(f) = &self.fulfillment {
            columns.push(f.seller_field.clone());
            columns.extend(f.status.iter().map(|s| s.source.clone()));
        }
        if let Some(s) = &self.shipping {
            columns.push(s.amount_field.clone());
            columns.push(s.description_field.clone());
        }
        if let Some(t) = &self.transaction {
            columns.push(t.amount_field.clone());
            columns.push(t.currency_field.clone());
            columns.push(t.status.source.clone());
        }

        columns.sort();
        columns.dedup();
        columns
    }

    /// Check the table invariants.
    ///
    /// Destinations are unique and every hook only names columns the table
    /// writes, so no later stage can add or miss a column.
    pub fn validate(&self) -> SchemaResult<()> {
        if self.rules.is_empty() {
            return Err(SchemaError::EmptyTable);
        }

        let mut columns: HashSet<&str> = HashSet::with_capacity(self.rules.len());
        for rule in &self.rules {
            if !columns.insert(rule.destination.as_str()) {
                return Err(SchemaError::DuplicateDestination(rule.destination.clone()));
            }
        }

        let require = |column: &str, context: &str| -> SchemaResult<()> {
            if columns.contains(column) {
                Ok(())
            } else {
                Err(SchemaError::UnknownColumn {
                    column: column.to_string(),
                    context: context.to_string(),
                })
            }
        };

        require(&self.line_kind_field, "line kind field")?;
        for field in &self.blank_line_fields {
            require(field, "blank line fields")?;
        }
        if let Some(sku) = &self.sku {
            require(&sku.column, "SKU rule")?;
        }
        for group in &self.address_groups {
            for field in &group.fields {
                require(field, &format!("address group '{}'", group.name))?;
            }
        }
        if let Some(f) = &self.fulfillment {
            require(&f.location_field, "fulfillment location")?;
            if let Some(status) = &f.status {
                require(&status.destination, "fulfillment status")?;
            }
        }
        if let Some(s) = &self.shipping {
            require(&s.title_column, "shipping title")?;
            require(&s.price_column, "shipping price")?;
            for field in &s.clear {
                require(field, "shipping clear list")?;
            }
        }
        if let Some(t) = &self.transaction {
            require(&t.amount_column, "transaction amount")?;
            require(&t.currency_column, "transaction currency")?;
            require(&t.status.destination, "transaction status")?;
            for field in &t.clear {
                require(field, "transaction clear list")?;
            }
        }
        for exclusive in &self.exclusive_columns {
            for field in &exclusive.columns {
                require(field, &format!("{} exclusive columns", exclusive.kind))?;
            }
        }

        Ok(())
    }
}
