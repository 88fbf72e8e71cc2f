//! Mapping schemas for Magento to Shopify order conversion
//!
//! This module provides:
//! - `table`: Schema definition (mapping rules and row hooks)
//! - `rules`: Value rules applied per mapping rule
//! - `executor`: Project a source row through a schema
//! - `profiles`: The built-in `simple` and `extended` schemas
//!
//! ## Example
//!
//! ```rust,ignore
//! use order_migrate::transform::schema::{profiles, project_row};
//!
//! let schema = profiles::builtin("extended")?;
//! let line_item = project_row(schema, &source_row);
//! assert_eq!(line_item.value("Line: Type"), "Line Item");
//! ```

pub mod executor;
pub mod profiles;
pub mod rules;
pub mod table;

pub use executor::project_row;
pub use profiles::{builtin, BUILTIN_NAMES};
pub use rules::{is_numeric, StatusMap, TransformKind};
pub use table::{
    AddressGroup, DerivedStatus, ExclusiveColumns, FulfillmentSpec, MappingRule, MigrationSchema,
    ShippingSpec, SkuPolicy, SkuRule, SplitMode, TransactionSpec,
};
