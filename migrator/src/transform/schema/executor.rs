//! Row projection
//!
//! Projects one source row through a schema's mapping table, then runs the
//! row-level hooks (SKU truncation, address completeness).

use super::rules::options_selected;
use super::table::{AddressGroup, MigrationSchema, SkuPolicy, SkuRule};
use crate::models::{OutputRow, SourceRow};

/// Build the primary output row for `row`.
///
/// The result has exactly the schema's destination columns, in table order.
pub fn project_row(schema: &MigrationSchema, row: &SourceRow) -> OutputRow {
    let mut output = OutputRow::with_capacity(schema.rules.len());

    for rule in &schema.rules {
        let value = rule.transform.apply(rule, row);
        output.push(rule.destination.clone(), value);
    }

    if let Some(sku) = &schema.sku {
        apply_sku_rule(&mut output, sku, row);
    }

    for group in &schema.address_groups {
        fill_address_group(&mut output, group, &schema.address_filler);
    }

    output
}

/// Cut the SKU at its first separator when the policy allows it
fn apply_sku_rule(output: &mut OutputRow, rule: &SkuRule, row: &SourceRow) {
    if rule.separator.is_empty() {
        return;
    }

    let sku = output.value(&rule.column);
    if !sku.contains(rule.separator.as_str()) {
        return;
    }

    let truncate = match &rule.policy {
        SkuPolicy::Always => true,
        SkuPolicy::WhenOptionsSelected { options_field } => options_selected(row.get(options_field)),
    };

    if truncate {
        let base = sku.split(rule.separator.as_str()).next().unwrap_or("").to_string();
        output.set(&rule.column, base);
    }
}

/// Fill the empty fields of a partially filled address with `filler`
fn fill_address_group(output: &mut OutputRow, group: &AddressGroup, filler: &str) {
    let filled = group
        .fields
        .iter()
        .filter(|field| !output.value(field).is_empty())
        .count();

    if filled == 0 || filled == group.fields.len() {
        return;
    }

    for field in &group.fields {
        if output.value(field).is_empty() {
            output.set(field, filler);
        }
    }
}
