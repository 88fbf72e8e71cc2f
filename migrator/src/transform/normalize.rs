//! Post-expansion sweep enforcing column/line-kind exclusivity.

use tracing::debug;

use super::schema::MigrationSchema;
use crate::models::{LineKind, OutputRow};

/// Empty every exclusive column on rows of a different line kind.
///
/// Returns the number of non-empty cells that were cleared.
pub fn normalize(rows: &mut [OutputRow], schema: &MigrationSchema) -> usize {
    let mut cleared = 0;

    for row in rows.iter_mut() {
        let kind = LineKind::from_column(row.value(&schema.line_kind_field));

        for exclusive in &schema.exclusive_columns {
            if kind == Some(exclusive.kind) {
                continue;
            }
            for column in &exclusive.columns {
                if !row.value(column).is_empty() {
                    row.clear(column);
                    cleared += 1;
                }
            }
        }
    }

    debug!(cleared, rows = rows.len(), "normalized exclusive columns");
    cleared
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceRow;
    use crate::transform::expander::expand_rows;
    use crate::transform::schema::profiles;

    fn sample_rows() -> Vec<SourceRow> {
        let item = |order: &str, seller: &str| -> SourceRow {
            [
                ("IncrementId", order),
                ("ItemSku", "A-1"),
                ("SellerName", seller),
                ("ShippingAmount", "5"),
                ("PaymentAmountOrdered", "20.00"),
                ("TransactionOrderCurrencyCode", "AUD"),
                ("TransactionStatus", "complete"),
                ("Status", "complete"),
            ]
            .into_iter()
            .collect()
        };
        vec![
            item("1", "Stan Cash Brooklyn"),
            item("1", "Stan Cash Brooklyn"),
            item("2", ""),
            item("3", "Nowhere"),
        ]
    }

    fn assert_exclusive(rows: &[OutputRow], extended: bool) {
        for row in rows {
            let kind = row.value("Line: Type");
            if kind != "Fulfillment Line" {
                assert_eq!(row.value("Fulfillment: Location"), "", "{kind}");
                if extended {
                    assert_eq!(row.value("Fulfillment: Status"), "", "{kind}");
                }
            }
            if kind != "Transaction" {
                for column in [
                    "Transaction: Amount",
                    "Transaction: Currency",
                    "Transaction: Status",
                ] {
                    assert_eq!(row.value(column), "", "{kind} {column}");
                }
            }
        }
    }

    #[test]
    fn test_simple_line_items_lose_location_and_transaction() {
        let schema = profiles::simple();
        let (mut rows, _) = expand_rows(&sample_rows(), &schema);

        // line items carry the raw seller and payment values before the sweep
        assert_eq!(rows[0].value("Fulfillment: Location"), "Stan Cash Brooklyn");
        assert_eq!(rows[0].value("Transaction: Amount"), "20.00");

        let cleared = normalize(&mut rows, &schema);
        assert!(cleared > 0);
        assert_exclusive(&rows, false);

        let fulfillment: Vec<&str> = rows
            .iter()
            .filter(|r| r.value("Line: Type") == "Fulfillment Line")
            .map(|r| r.value("Fulfillment: Location"))
            .collect();
        assert_eq!(
            fulfillment,
            vec!["Stan Cash Brooklyn", "Tottenham Pickup Location"]
        );
    }

    #[test]
    fn test_extended_exclusivity_and_counts() {
        let schema = profiles::extended();
        let (mut rows, stats) = expand_rows(&sample_rows(), &schema);
        normalize(&mut rows, &schema);
        assert_exclusive(&rows, true);

        assert_eq!(stats.line_items, 4);
        assert_eq!(stats.fulfillment_lines, 2);
        assert_eq!(stats.shipping_lines, 3);
        assert_eq!(stats.transactions, 3);
        assert_eq!(rows.len(), 12);

        let transaction = rows
            .iter()
            .find(|r| r.value("Line: Type") == "Transaction")
            .unwrap();
        assert_eq!(transaction.value("Transaction: Amount"), "20.00");
        assert_eq!(transaction.value("Transaction: Status"), "success");
    }

    #[test]
    fn test_unknown_line_kind_is_cleared() {
        let schema = profiles::simple();
        let mut row = OutputRow::with_capacity(3);
        row.push("Line: Type", "Gift Wrap");
        row.push("Fulfillment: Location", "Shop location");
        row.push("Transaction: Amount", "1");

        let mut rows = vec![row];
        assert_eq!(normalize(&mut rows, &schema), 2);
        assert_eq!(rows[0].value("Fulfillment: Location"), "");
        assert_eq!(rows[0].len(), 3);
    }

    #[test]
    fn test_second_pass_is_a_no_op() {
        let schema = profiles::extended();
        let (mut rows, _) = expand_rows(&sample_rows(), &schema);
        normalize(&mut rows, &schema);
        let snapshot = rows.clone();
        assert_eq!(normalize(&mut rows, &schema), 0);
        assert_eq!(rows, snapshot);
    }
}
