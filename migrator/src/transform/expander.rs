//! Fan out source order rows into Shopify import rows.
//!
//! Every source row yields its line item. The first row of each order can
//! also yield auxiliary rows, at most one of each kind per order:
//!
//! ```text
//! Source rows (one per item)        →  Output rows
//! ┌─────────────────────────────┐     ┌──────────────────────────────┐
//! │ #100001, item A, seller X   │     │ Line Item   #100001 item A   │
//! │ #100001, item B, seller X   │  →  │ Fulfillment #100001 X        │
//! └─────────────────────────────┘     │ Shipping    #100001          │
//!                                     │ Transaction #100001          │
//!                                     │ Line Item   #100001 item B   │
//!                                     └──────────────────────────────┘
//! ```
//!
//! Auxiliary rows start as a copy of the line item with the schema's blank
//! line fields emptied.

use serde::Serialize;
use tracing::debug;

use super::schema::rules::is_numeric;
use super::schema::{project_row, FulfillmentSpec, MigrationSchema, ShippingSpec, TransactionSpec};
use crate::models::{LineKind, OrderContext, OutputRow, SourceRow};

/// Row counts for one expansion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionStats {
    pub source_rows: usize,
    pub line_items: usize,
    pub fulfillment_lines: usize,
    pub shipping_lines: usize,
    pub transactions: usize,
}

impl ExpansionStats {
    pub fn count(&self, kind: LineKind) -> usize {
        match kind {
            LineKind::LineItem => self.line_items,
            LineKind::Fulfillment => self.fulfillment_lines,
            LineKind::Shipping => self.shipping_lines,
            LineKind::Transaction => self.transactions,
        }
    }

    /// Total rows emitted
    pub fn output_rows(&self) -> usize {
        LineKind::ALL.iter().map(|k| self.count(*k)).sum()
    }

    fn record(&mut self, kind: LineKind) {
        match kind {
            LineKind::LineItem => self.line_items += 1,
            LineKind::Fulfillment => self.fulfillment_lines += 1,
            LineKind::Shipping => self.shipping_lines += 1,
            LineKind::Transaction => self.transactions += 1,
        }
    }
}

/// Expands source rows one at a time, owning the dedup state and output.
pub struct RowExpander<'s> {
    schema: &'s MigrationSchema,
    context: OrderContext,
    rows: Vec<OutputRow>,
    stats: ExpansionStats,
}

impl<'s> RowExpander<'s> {
    pub fn new(schema: &'s MigrationSchema) -> Self {
        Self {
            schema,
            context: OrderContext::new(),
            rows: Vec::new(),
            stats: ExpansionStats::default(),
        }
    }

    /// Expand one source row. Returns the number of rows appended.
    pub fn expand(&mut self, row: &SourceRow) -> usize {
        let schema = self.schema;
        let primary = project_row(schema, row);
        let order_id = row.get(&schema.order_id_field);
        let before = self.rows.len();
        self.stats.source_rows += 1;

        let mut auxiliary = Vec::new();
        if let Some(spec) = &schema.fulfillment {
            auxiliary.extend(self.fulfillment_line(spec, &primary, row, order_id));
        }
        if let Some(spec) = &schema.shipping {
            auxiliary.extend(self.shipping_line(spec, &primary, row, order_id));
        }
        if let Some(spec) = &schema.transaction {
            auxiliary.extend(self.transaction_line(spec, &primary, row, order_id));
        }

        self.push(LineKind::LineItem, primary);
        for (kind, line) in auxiliary {
            debug!(order_id, kind = %kind, "added auxiliary row");
            self.push(kind, line);
        }

        self.rows.len() - before
    }

    pub fn stats(&self) -> &ExpansionStats {
        &self.stats
    }

    /// Hand over the rows produced so far.
    pub fn finish(self) -> (Vec<OutputRow>, ExpansionStats) {
        (self.rows, self.stats)
    }

    fn push(&mut self, kind: LineKind, row: OutputRow) {
        self.stats.record(kind);
        self.rows.push(row);
    }

    /// Copy of the line item with line-specific columns emptied
    fn blank_copy(&self, primary: &OutputRow, kind: LineKind) -> OutputRow {
        let mut line = primary.clone();
        for field in &self.schema.blank_line_fields {
            line.clear(field);
        }
        line.set(&self.schema.line_kind_field, kind.as_str());
        line
    }

    fn fulfillment_line(
        &mut self,
        spec: &FulfillmentSpec,
        primary: &OutputRow,
        row: &SourceRow,
        order_id: &str,
    ) -> Option<(LineKind, OutputRow)> {
        let seller = row.get(&spec.seller_field).trim();
        if seller.is_empty() || !self.context.claim(LineKind::Fulfillment, order_id) {
            return None;
        }

        let mut line = self.blank_copy(primary, LineKind::Fulfillment);
        let location = if spec.allowed_locations.iter().any(|l| l == seller) {
            seller
        } else {
            spec.fallback_location.as_str()
        };
        line.set(&spec.location_field, location);

        if let Some(status) = &spec.status {
            line.set(&status.destination, status.map.lookup(row.get(&status.source)));
        }

        Some((LineKind::Fulfillment, line))
    }

    fn shipping_line(
        &mut self,
        spec: &ShippingSpec,
        primary: &OutputRow,
        row: &SourceRow,
        order_id: &str,
    ) -> Option<(LineKind, OutputRow)> {
        let amount = row.get(&spec.amount_field);
        if !is_numeric(amount) || !self.context.claim(LineKind::Shipping, order_id) {
            return None;
        }

        let mut line = self.blank_copy(primary, LineKind::Shipping);
        let description = row.get(&spec.description_field).trim();
        let title = if description.is_empty() {
            spec.default_title.as_str()
        } else {
            description
        };
        line.set(&spec.title_column, title);
        line.set(&spec.price_column, amount);
        for field in &spec.clear {
            line.clear(field);
        }

        Some((LineKind::Shipping, line))
    }

    fn transaction_line(
        &mut self,
        spec: &TransactionSpec,
        primary: &OutputRow,
        row: &SourceRow,
        order_id: &str,
    ) -> Option<(LineKind, OutputRow)> {
        let amount = row.get(&spec.amount_field);
        if !is_numeric(amount) || !self.context.claim(LineKind::Transaction, order_id) {
            return None;
        }

        let mut line = self.blank_copy(primary, LineKind::Transaction);
        line.set(&spec.amount_column, amount);
        line.set(&spec.currency_column, row.get(&spec.currency_field));
        line.set(
            &spec.status.destination,
            spec.status.map.lookup(row.get(&spec.status.source)),
        );
        for field in &spec.clear {
            line.clear(field);
        }

        Some((LineKind::Transaction, line))
    }
}

/// Expand every row with a fresh [`RowExpander`].
pub fn expand_rows(rows: &[SourceRow], schema: &MigrationSchema) -> (Vec<OutputRow>, ExpansionStats) {
    let mut expander = RowExpander::new(schema);
    for row in rows {
        expander.expand(row);
    }
    expander.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::schema::profiles;

    fn row(pairs: &[(&str, &str)]) -> SourceRow {
        pairs.iter().copied().collect()
    }

    fn kinds(rows: &[OutputRow]) -> Vec<&str> {
        rows.iter().map(|r| r.value("Line: Type")).collect()
    }

    fn order_item(order: &str, sku: &str) -> SourceRow {
        row(&[
            ("IncrementId", order),
            ("ItemName", "Widget"),
            ("ItemSku", sku),
            ("ItemPrice", "19.95"),
            ("ItemQtyOrdered", "1"),
            ("SellerName", "Stan Cash Keilor"),
            ("ShippingAmount", "9.95"),
            ("ShippingDescription", "Express Post"),
            ("PaymentAmountOrdered", "49.85"),
            ("TransactionOrderCurrencyCode", "AUD"),
            ("TransactionStatus", "complete"),
            ("Status", "processing"),
        ])
    }

    #[test]
    fn test_simple_fulfillment_once_per_order() {
        let schema = profiles::simple();
        let rows = vec![
            order_item("100001", "A-1"),
            order_item("100001", "B-2"),
            order_item("100002", "C-3"),
        ];
        let (output, stats) = expand_rows(&rows, &schema);

        assert_eq!(
            kinds(&output),
            vec!["Line Item", "Fulfillment Line", "Line Item", "Line Item", "Fulfillment Line"]
        );
        assert_eq!(stats.source_rows, 3);
        assert_eq!(stats.fulfillment_lines, 2);
        assert_eq!(stats.shipping_lines, 0);
        assert_eq!(stats.output_rows(), output.len());
    }

    #[test]
    fn test_fulfillment_line_blanks_item_fields() {
        let schema = profiles::simple();
        let (output, _) = expand_rows(&[order_item("100001", "A-1")], &schema);
        let fulfillment = &output[1];

        assert_eq!(fulfillment.value("Name"), "#100001");
        assert_eq!(fulfillment.value("Line: Title"), "");
        assert_eq!(fulfillment.value("Line: SKU"), "");
        assert_eq!(fulfillment.value("Line: Price"), "");
        assert_eq!(fulfillment.value("Line: Taxable"), "");
        assert_eq!(fulfillment.value("Transaction: Amount"), "");
        assert_eq!(fulfillment.value("Fulfillment: Location"), "Stan Cash Keilor");
    }

    #[test]
    fn test_unknown_seller_falls_back() {
        let schema = profiles::simple();
        let mut item = order_item("100001", "A-1");
        item.insert("SellerName", "Random Depot");
        let (output, _) = expand_rows(&[item], &schema);
        assert_eq!(
            output[1].value("Fulfillment: Location"),
            "Tottenham Pickup Location"
        );
    }

    #[test]
    fn test_blank_seller_skips_fulfillment() {
        let schema = profiles::simple();
        let mut item = order_item("100001", "A-1");
        item.insert("SellerName", "   ");
        let mut expander = RowExpander::new(&schema);
        assert_eq!(expander.expand(&item), 1);

        // a later row of the same order with a seller still gets one
        assert_eq!(expander.expand(&order_item("100001", "B-2")), 2);
        assert_eq!(expander.stats().fulfillment_lines, 1);
    }

    #[test]
    fn test_extended_emits_all_auxiliary_rows_once() {
        let schema = profiles::extended();
        let rows = vec![order_item("100001", "A-1"), order_item("100001", "B-2")];
        let (output, stats) = expand_rows(&rows, &schema);

        assert_eq!(
            kinds(&output),
            vec![
                "Line Item",
                "Fulfillment Line",
                "Shipping Line",
                "Transaction",
                "Line Item"
            ]
        );
        assert_eq!(stats.output_rows(), 5);

        let fulfillment = &output[1];
        assert_eq!(fulfillment.value("Fulfillment: Status"), "success");

        let shipping = &output[2];
        assert_eq!(shipping.value("Line: Title"), "Express Post");
        assert_eq!(shipping.value("Line: Price"), "9.95");
        assert_eq!(shipping.value("Line: Quantity"), "");
        assert_eq!(shipping.value("Fulfillment: Location"), "");

        let transaction = &output[3];
        assert_eq!(transaction.value("Transaction: Amount"), "49.85");
        assert_eq!(transaction.value("Transaction: Currency"), "AUD");
        assert_eq!(transaction.value("Transaction: Status"), "success");
        assert_eq!(transaction.value("Fulfillment: Location"), "");
        assert_eq!(transaction.value("Line: Title"), "");
    }

    #[test]
    fn test_shipping_title_defaults_and_numeric_gate() {
        let schema = profiles::extended();

        let mut blank_description = order_item("100001", "A-1");
        blank_description.insert("ShippingDescription", "");
        let (output, _) = expand_rows(&[blank_description], &schema);
        let shipping = output
            .iter()
            .find(|r| r.value("Line: Type") == "Shipping Line")
            .unwrap();
        assert_eq!(shipping.value("Line: Title"), "Shipping");

        let mut bad_amounts = order_item("100002", "A-1");
        bad_amounts.insert("ShippingAmount", "free");
        bad_amounts.insert("PaymentAmountOrdered", "");
        let (output, stats) = expand_rows(&[bad_amounts], &schema);
        assert_eq!(stats.shipping_lines, 0);
        assert_eq!(stats.transactions, 0);
        assert_eq!(kinds(&output), vec!["Line Item", "Fulfillment Line"]);
    }

    #[test]
    fn test_transaction_status_map() {
        let schema = profiles::extended();
        for (code, expected) in [
            ("pending", "pending"),
            ("afterpay_exception_review", "pending"),
            ("humm_processed", "success"),
            ("closed", "success"),
            ("canceled", "failure"),
            ("fraud", "unknown"),
        ] {
            let mut item = order_item("100001", "A-1");
            item.insert("Status", code);
            let (output, _) = expand_rows(&[item], &schema);
            let transaction = output
                .iter()
                .find(|r| r.value("Line: Type") == "Transaction")
                .unwrap();
            assert_eq!(transaction.value("Transaction: Status"), expected, "{code}");
        }
    }

    #[test]
    fn test_fulfillment_status_map() {
        let schema = profiles::extended();
        for (code, expected) in [
            ("complete", "success"),
            ("closed", "success"),
            ("canceled", "failure"),
            ("processing", "unknown"),
            ("fraud", "unknown"),
            ("", "unknown"),
        ] {
            let mut item = order_item("100001", "A-1");
            item.insert("TransactionStatus", code);
            let (output, _) = expand_rows(&[item], &schema);
            let fulfillment = output
                .iter()
                .find(|r| r.value("Line: Type") == "Fulfillment Line")
                .unwrap();
            assert_eq!(fulfillment.value("Fulfillment: Status"), expected, "{code}");
        }
    }

    #[test]
    fn test_missing_order_id_still_dedups() {
        let schema = profiles::simple();
        let mut first = order_item("", "A-1");
        first.insert("IncrementId", "");
        let second = first.clone();
        let (_, stats) = expand_rows(&[first, second], &schema);
        assert_eq!(stats.fulfillment_lines, 1);
    }
}
