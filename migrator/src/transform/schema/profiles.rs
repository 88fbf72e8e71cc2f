//! Built-in schemas
//!
//! Two configurations of the same engine:
//!
//! - `simple`: line items plus one fulfillment line per order
//! - `extended`: adds gift card properties, a processed-at fallback,
//!   address completeness, shipping lines and transaction lines

use once_cell::sync::Lazy;

use super::rules::{StatusMap, TransformKind};
use super::table::{
    AddressGroup, DerivedStatus, ExclusiveColumns, FulfillmentSpec, MappingRule, MigrationSchema,
    ShippingSpec, SkuPolicy, SkuRule, TransactionSpec,
};
use crate::error::{SchemaError, SchemaResult};
use crate::models::LineKind;

/// Names accepted by [`builtin`]
pub const BUILTIN_NAMES: [&str; 2] = ["simple", "extended"];

static SIMPLE: Lazy<MigrationSchema> = Lazy::new(simple);
static EXTENDED: Lazy<MigrationSchema> = Lazy::new(extended);

/// Look up a built-in schema by name
pub fn builtin(name: &str) -> SchemaResult<&'static MigrationSchema> {
    match name.trim().to_lowercase().as_str() {
        "simple" => Ok(&*SIMPLE),
        "extended" => Ok(&*EXTENDED),
        _ => Err(SchemaError::UnknownBuiltin(name.to_string())),
    }
}

impl MigrationSchema {
    /// See [`simple`](fn@simple).
    pub fn simple() -> Self {
        simple()
    }

    /// See [`extended`](fn@extended).
    pub fn extended() -> Self {
        extended()
    }
}

/// Pickup and warehouse locations known to the store
pub const ALLOWED_LOCATIONS: [&str; 13] = [
    "Minchinbury Pickup Location",
    "Stan Cash Brooklyn",
    "Tottenham Pickup Location",
    "Stan Cash Keilor",
    "Camberwell Pickup Location",
    "Stan Cash Warehouse - NT",
    "Stan Cash Warehouse - NSW",
    "Stan Cash Warehouse - QLD",
    "Stan Cash Warehouse - SA",
    "Pack and Send Stepney",
    "Stan Cash Warehouse - WA",
    "Stan Cash Warehouse - TAS",
    "Shop location",
];

pub const FALLBACK_LOCATION: &str = "Tottenham Pickup Location";

/// Gift card keys rendered into `Line: Properties`
pub const GIFT_CARD_KEYS: [&str; 7] = [
    "giftcard_sender_name",
    "giftcard_sender_email",
    "giftcard_recipient_name",
    "giftcard_recipient_email",
    "giftcard_message",
    "giftcard_created_codes",
    "giftcard_is_redeemable",
];

const LOCATION: &str = "Fulfillment: Location";
const FULFILLMENT_STATUS: &str = "Fulfillment: Status";
const TRANSACTION_COLUMNS: [&str; 3] = [
    "Transaction: Amount",
    "Transaction: Currency",
    "Transaction: Status",
];

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn payment_status() -> TransformKind {
    TransformKind::Map(StatusMap::from_pairs(&[
        ("pending", "pending"),
        ("afterpay_exception_review", "pending"),
        ("processing", "paid"),
        ("complete", "paid"),
        ("closed", "refunded"),
        ("canceled", "voided"),
        ("humm_processed", "authorized"),
    ]))
}

fn fulfillment_status_map() -> StatusMap {
    StatusMap::from_pairs(&[
        ("complete", "success"),
        ("closed", "success"),
        ("canceled", "failure"),
    ])
}

fn transaction_status_map() -> StatusMap {
    StatusMap::from_pairs(&[
        ("pending", "pending"),
        ("afterpay_exception_review", "pending"),
        ("processing", "success"),
        ("complete", "success"),
        ("closed", "success"),
        ("humm_processed", "success"),
        ("canceled", "failure"),
    ])
}

/// Customer, billing and shipping columns shared by both tables
fn address_rules() -> Vec<MappingRule> {
    [
        ("CustomerEmail", "Customer: Email"),
        ("CustomerFirstname", "Customer: First Name"),
        ("CustomerLastname", "Customer: Last Name"),
        ("BillingFirstname", "Billing: First Name"),
        ("BillingLastname", "Billing: Last Name"),
        ("BillingTelephone", "Billing: Phone"),
        ("BillingStreet", "Billing: Address 1"),
        ("BillingPostcode", "Billing: Zip"),
        ("BillingCity", "Billing: City"),
        ("BillingRegion", "Billing: Province"),
        ("BillingCountryId", "Billing: Country Code"),
        ("ShippingFirstname", "Shipping: First Name"),
        ("ShippingLastname", "Shipping: Last Name"),
        ("ShippingTelephone", "Shipping: Phone"),
        ("ShippingStreet", "Shipping: Address 1"),
        ("ShippingPostcode", "Shipping: Zip"),
        ("ShippingCity", "Shipping: City"),
        ("ShippingRegion", "Shipping: Province"),
        ("ShippingCountryId", "Shipping: Country Code"),
    ]
    .iter()
    .map(|(source, destination)| MappingRule::from_source(source, destination))
    .collect()
}

fn name_rule() -> MappingRule {
    MappingRule::from_source("IncrementId", "Name").with_transform(TransformKind::Prefix {
        value: "#".to_string(),
    })
}

fn transaction_exclusive() -> ExclusiveColumns {
    ExclusiveColumns {
        kind: LineKind::Transaction,
        columns: strings(&TRANSACTION_COLUMNS),
    }
}

fn fulfillment_spec(status: Option<DerivedStatus>) -> FulfillmentSpec {
    FulfillmentSpec {
        seller_field: "SellerName".to_string(),
        location_field: LOCATION.to_string(),
        allowed_locations: strings(&ALLOWED_LOCATIONS),
        fallback_location: FALLBACK_LOCATION.to_string(),
        status,
    }
}

/// The base column set: line items plus fulfillment lines.
pub fn simple() -> MigrationSchema {
    let mut rules = vec![
        name_rule(),
        MappingRule::constant("Command", "NEW"),
        MappingRule::from_source("Email", "Email"),
        MappingRule::from_source("CustomerNote", "Note"),
        MappingRule::from_source("CustomerIsGuest", "Tags").with_transform(TransformKind::GuestTag {
            guest: "Guest, TestStg-2".to_string(),
            other: String::new(),
        }),
        MappingRule::from_source("CreatedAt", "Processed At"),
        MappingRule::from_source("OrderCurrencyCode", "Currency"),
        MappingRule::from_source("Weight", "Weight Total"),
        MappingRule::from_source("TaxAmount", "Tax: Total"),
        MappingRule::from_source("Status", "Payment: Status").with_transform(payment_status()),
    ];
    rules.extend(address_rules());
    rules.extend([
        MappingRule::constant("Line: Type", LineKind::LineItem.as_str()),
        MappingRule::from_source("ItemName", "Line: Title"),
        MappingRule::from_source("ItemSku", "Line: SKU"),
        MappingRule::from_source("ItemQtyOrdered", "Line: Quantity"),
        MappingRule::from_source("ItemPrice", "Line: Price"),
        MappingRule::from_source("ItemDiscountAmount", "Line: Discount")
            .with_transform(TransformKind::NegatedAmount),
        MappingRule::from_source("ItemWeight", "Line: Grams"),
        MappingRule::from_source("ItemTaxAmount", "Line: Taxable").with_transform(TransformKind::Taxable),
        MappingRule::from_source("PaymentAmountOrdered", "Transaction: Amount"),
        MappingRule::from_source("TransactionOrderCurrencyCode", "Transaction: Currency"),
        MappingRule::from_source("TransactionStatus", "Transaction: Status"),
        MappingRule::from_source("SellerName", LOCATION),
    ]);

    MigrationSchema {
        name: "simple".to_string(),
        description: "Line items with one fulfillment line per order".to_string(),
        line_kind_field: "Line: Type".to_string(),
        order_id_field: "IncrementId".to_string(),
        rules,
        blank_line_fields: strings(&[
            "Line: Title",
            "Line: SKU",
            "Line: Quantity",
            "Line: Price",
            "Line: Discount",
            "Line: Grams",
            "Line: Taxable",
            "Transaction: Amount",
            "Transaction: Currency",
            "Transaction: Status",
        ]),
        sku: Some(SkuRule {
            column: "Line: SKU".to_string(),
            separator: "-".to_string(),
            policy: SkuPolicy::Always,
        }),
        address_groups: Vec::new(),
        address_filler: ".".to_string(),
        fulfillment: Some(fulfillment_spec(None)),
        shipping: None,
        transaction: None,
        exclusive_columns: vec![
            ExclusiveColumns {
                kind: LineKind::Fulfillment,
                columns: strings(&[LOCATION]),
            },
            transaction_exclusive(),
        ],
    }
}

/// The extended column set with gift cards, shipping and transaction lines.
pub fn extended() -> MigrationSchema {
    let mut rules = vec![
        name_rule(),
        MappingRule::constant("Command", "NEW"),
        MappingRule::from_source("Email", "Email"),
        MappingRule::from_source("CustomerNote", "Note"),
        MappingRule::from_source("CustomerIsGuest", "Tags").with_transform(TransformKind::GuestTag {
            guest: "Guest".to_string(),
            other: String::new(),
        }),
        MappingRule::from_source("CreatedAt", "Processed At").with_transform(
            TransformKind::FallbackOnEmpty {
                fallback: "UpdatedAt".to_string(),
                sentinels: strings(&["0000-00-00 00:00:00"]),
            },
        ),
        MappingRule::from_source("OrderCurrencyCode", "Currency"),
        MappingRule::from_source("Weight", "Weight Total"),
        MappingRule::from_source("TaxAmount", "Tax: Total"),
        MappingRule::from_source("Status", "Payment: Status").with_transform(payment_status()),
    ];
    rules.extend(address_rules());
    rules.extend([
        MappingRule::constant("Line: Type", LineKind::LineItem.as_str()),
        MappingRule::from_source("ItemName", "Line: Title"),
        MappingRule::from_source("ItemSku", "Line: SKU"),
        MappingRule::from_source("ItemProductOptions", "Line: Properties").with_transform(
            TransformKind::GiftCardProperties {
                keys: strings(&GIFT_CARD_KEYS),
                flag_keys: strings(&["giftcard_is_redeemable"]),
            },
        ),
        MappingRule::from_source("ItemQtyOrdered", "Line: Quantity"),
        MappingRule::from_source("ItemPrice", "Line: Price"),
        MappingRule::from_source("ItemDiscountAmount", "Line: Discount")
            .with_transform(TransformKind::NegatedAmount),
        MappingRule::from_source("ItemWeight", "Line: Grams"),
        MappingRule::from_source("ItemTaxAmount", "Line: Taxable").with_transform(TransformKind::Taxable),
        MappingRule::from_source("PaymentAmountOrdered", "Transaction: Amount"),
        MappingRule::from_source("TransactionOrderCurrencyCode", "Transaction: Currency"),
        MappingRule::from_source("TransactionStatus", "Transaction: Status"),
        MappingRule::from_source("SellerName", LOCATION),
        MappingRule::constant(FULFILLMENT_STATUS, ""),
    ]);

    let address_group = |name: &str, prefix: &str| AddressGroup {
        name: name.to_string(),
        fields: ["First Name", "Last Name", "Address 1", "City", "Country Code"]
            .iter()
            .map(|field| format!("{}: {}", prefix, field))
            .collect(),
    };

    MigrationSchema {
        name: "extended".to_string(),
        description: "Line items, gift card properties, fulfillment, shipping and transaction lines"
            .to_string(),
        line_kind_field: "Line: Type".to_string(),
        order_id_field: "IncrementId".to_string(),
        rules,
        blank_line_fields: strings(&[
            "Line: Title",
            "Line: SKU",
            "Line: Properties",
            "Line: Quantity",
            "Line: Price",
            "Line: Discount",
            "Line: Grams",
            "Line: Taxable",
            "Transaction: Amount",
            "Transaction: Currency",
            "Transaction: Status",
        ]),
        sku: Some(SkuRule {
            column: "Line: SKU".to_string(),
            separator: "-".to_string(),
            policy: SkuPolicy::WhenOptionsSelected {
                options_field: "ItemProductOptions".to_string(),
            },
        }),
        address_groups: vec![
            address_group("billing", "Billing"),
            address_group("shipping", "Shipping"),
        ],
        address_filler: ".".to_string(),
        fulfillment: Some(fulfillment_spec(Some(DerivedStatus {
            source: "TransactionStatus".to_string(),
            destination: FULFILLMENT_STATUS.to_string(),
            map: fulfillment_status_map(),
        }))),
        shipping: Some(ShippingSpec {
            amount_field: "ShippingAmount".to_string(),
            description_field: "ShippingDescription".to_string(),
            title_column: "Line: Title".to_string(),
            price_column: "Line: Price".to_string(),
            default_title: "Shipping".to_string(),
            clear: strings(&[LOCATION]),
        }),
        transaction: Some(TransactionSpec {
            amount_field: "PaymentAmountOrdered".to_string(),
            currency_field: "TransactionOrderCurrencyCode".to_string(),
            amount_column: TRANSACTION_COLUMNS[0].to_string(),
            currency_column: TRANSACTION_COLUMNS[1].to_string(),
            status: DerivedStatus {
                source: "Status".to_string(),
                destination: TRANSACTION_COLUMNS[2].to_string(),
                map: transaction_status_map(),
            },
            clear: strings(&[LOCATION]),
        }),
        exclusive_columns: vec![
            ExclusiveColumns {
                kind: LineKind::Fulfillment,
                columns: strings(&[LOCATION, FULFILLMENT_STATUS]),
            },
            transaction_exclusive(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceRow;

    #[test]
    fn test_builtins_validate() {
        simple().validate().unwrap();
        extended().validate().unwrap();
    }

    #[test]
    fn test_associated_constructors_match() {
        assert_eq!(MigrationSchema::simple(), simple());
        assert_eq!(MigrationSchema::extended(), *builtin("extended").unwrap());
    }

    #[test]
    fn test_builtin_lookup() {
        assert_eq!(builtin("simple").unwrap().name, "simple");
        assert_eq!(builtin(" Extended ").unwrap().name, "extended");
        assert!(matches!(builtin("fancy"), Err(SchemaError::UnknownBuiltin(_))));
    }

    #[test]
    fn test_payment_status_vocabulary() {
        let schema = extended();
        let rule = schema
            .rules
            .iter()
            .find(|r| r.destination == "Payment: Status")
            .unwrap();
        let status = |code: &str| {
            let row: SourceRow = [("Status", code)].into_iter().collect();
            rule.transform.apply(rule, &row)
        };
        assert_eq!(status("pending"), "pending");
        assert_eq!(status("afterpay_exception_review"), "pending");
        assert_eq!(status("processing"), "paid");
        assert_eq!(status("complete"), "paid");
        assert_eq!(status("closed"), "refunded");
        assert_eq!(status("canceled"), "voided");
        assert_eq!(status("humm_processed"), "authorized");
        assert_eq!(status("unknownvalue"), "unknown");
        assert_eq!(status("processing"), status("processing"));
    }

    #[test]
    fn test_guest_tags_differ_per_schema() {
        let tag = |schema: &MigrationSchema, flag: &str| {
            let rule = schema.rules.iter().find(|r| r.destination == "Tags").unwrap();
            let row: SourceRow = [("CustomerIsGuest", flag)].into_iter().collect();
            rule.transform.apply(rule, &row)
        };
        assert_eq!(tag(&extended(), "1"), "Guest");
        assert_eq!(tag(&extended(), "0"), "");
        assert_eq!(tag(&simple(), "1"), "Guest, TestStg-2");
        assert_eq!(tag(&simple(), "0"), "");
    }

    #[test]
    fn test_extended_is_superset_of_simple() {
        let extended = extended().destinations();
        for column in simple().destinations() {
            assert!(extended.contains(&column), "{column}");
        }
    }
}
