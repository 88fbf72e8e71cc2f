//! Value rules for mapping table entries
//!
//! Each [`MappingRule`] carries a [`TransformKind`] that turns one source row
//! into the string written to its destination column. Rules never fail:
//! malformed numbers, JSON or codes fall back to a field default.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::table::{MappingRule, SplitMode};
use crate::models::SourceRow;

/// All available value rules
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformKind {
    /// Copy the source value (honouring the rule's split), or the literal
    #[default]
    Direct,

    /// Translate a status code through a lookup table
    Map(StatusMap),

    /// `True` when the source amount is numeric and above zero
    Taxable,

    /// Prepend a fixed string
    Prefix { value: String },

    /// Negated absolute value of a numeric amount, `0` otherwise
    NegatedAmount,

    /// Tag customers whose guest flag is `1`
    GuestTag {
        guest: String,
        #[serde(default)]
        other: String,
    },

    /// Use another column when the source is empty or a sentinel
    FallbackOnEmpty {
        fallback: String,
        #[serde(default)]
        sentinels: Vec<String>,
    },

    /// Render allow-listed keys of a product options JSON blob
    GiftCardProperties {
        keys: Vec<String>,
        /// Keys rendered only as `Label: Yes` when truthy
        #[serde(default)]
        flag_keys: Vec<String>,
    },
}

/// Exact, case-sensitive code translation with a fallback value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMap {
    pub mapping: BTreeMap<String, String>,
    #[serde(default = "default_unmapped")]
    pub default_unmapped: String,
}

fn default_unmapped() -> String {
    "unknown".to_string()
}

impl StatusMap {
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            mapping: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            default_unmapped: default_unmapped(),
        }
    }

    pub fn lookup(&self, code: &str) -> &str {
        self.mapping
            .get(code)
            .map(String::as_str)
            .unwrap_or(&self.default_unmapped)
    }
}

impl TransformKind {
    /// Produce the destination value for `rule` from `row`
    pub fn apply(&self, rule: &MappingRule, row: &SourceRow) -> String {
        match self {
            TransformKind::Direct => direct_value(rule, row),
            TransformKind::Map(map) => map.lookup(source_value(rule, row)).to_string(),
            TransformKind::Taxable => taxable(source_value(rule, row)).to_string(),
            TransformKind::Prefix { value } => format!("{}{}", value, source_value(rule, row)),
            TransformKind::NegatedAmount => negated_amount(source_value(rule, row)),
            TransformKind::GuestTag { guest, other } => {
                if source_value(rule, row).trim() == "1" {
                    guest.clone()
                } else {
                    other.clone()
                }
            }
            TransformKind::FallbackOnEmpty { fallback, sentinels } => {
                let primary = source_value(rule, row);
                if primary.trim().is_empty() || sentinels.iter().any(|s| s == primary) {
                    row.get(fallback).to_string()
                } else {
                    primary.to_string()
                }
            }
            TransformKind::GiftCardProperties { keys, flag_keys } => {
                gift_card_properties(source_value(rule, row), keys, flag_keys)
            }
        }
    }
}

fn source_value<'r>(rule: &MappingRule, row: &'r SourceRow) -> &'r str {
    rule.source.as_deref().map(|s| row.get(s)).unwrap_or("")
}

fn direct_value(rule: &MappingRule, row: &SourceRow) -> String {
    match &rule.source {
        None => rule.value.clone().unwrap_or_default(),
        Some(column) if !row.has_column(column) => String::new(),
        Some(column) => split_value(row.get(column), rule.split),
    }
}

/// Apply a [`SplitMode`] to a raw value. Splits on single spaces only.
pub fn split_value(value: &str, split: SplitMode) -> String {
    match split {
        SplitMode::None => value.to_string(),
        SplitMode::First => value.split(' ').next().unwrap_or("").to_string(),
        SplitMode::Last => value.split(' ').skip(1).collect::<Vec<_>>().join(" "),
    }
}

/// Numeric gate shared by every amount rule.
///
/// After removing at most one `.`, the string must be non-empty ASCII digits.
/// Signs, exponents and whitespace are rejected.
pub fn is_numeric(value: &str) -> bool {
    let stripped = value.replacen('.', "", 1);
    !stripped.is_empty() && stripped.bytes().all(|b| b.is_ascii_digit())
}

fn gated_decimal(value: &str) -> Option<f64> {
    if is_numeric(value) {
        value.parse::<f64>().ok()
    } else {
        None
    }
}

fn taxable(value: &str) -> &'static str {
    if gated_decimal(value).is_some_and(|amount| amount > 0.0) {
        "True"
    } else {
        "False"
    }
}

fn negated_amount(value: &str) -> String {
    gated_decimal(value)
        .map(|amount| shortest_float(-amount.abs()))
        .unwrap_or_else(|| "0".to_string())
}

/// Shortest round-trip rendering in the export's float style.
///
/// Plain decimals always carry a fraction (`-5.0`). Exponents below -4 or
/// from 16 up switch to scientific form with a signed two-digit exponent
/// (`-1e+16`, `-1e-05`).
pub fn shortest_float(value: f64) -> String {
    let scientific = format!("{:e}", value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (scientific.as_str(), 0),
    };

    if value != 0.0 && (exponent < -4 || exponent >= 16) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", mantissa, sign, exponent.abs());
    }

    let plain = value.to_string();
    if plain.contains('.') {
        plain
    } else {
        format!("{}.0", plain)
    }
}

/// Title-case a JSON key for display: `giftcard_sender_name` → `Giftcard Sender Name`
pub fn property_label(key: &str) -> String {
    let mut label = String::with_capacity(key.len());
    let mut prev_alpha = false;
    for c in key.replace('_', " ").chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                label.extend(c.to_lowercase());
            } else {
                label.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            label.push(c);
            prev_alpha = false;
        }
    }
    label
}

fn gift_card_properties(raw: &str, keys: &[String], flag_keys: &[String]) -> String {
    let Ok(Value::Object(options)) = serde_json::from_str::<Value>(raw) else {
        return String::new();
    };

    keys.iter()
        .filter_map(|key| {
            let value = options.get(key)?;
            let label = property_label(key);
            if flag_keys.contains(key) {
                return is_truthy(value).then(|| format!("{}: Yes", label));
            }
            render_property(value).map(|rendered| format!("{}: {}", label, rendered))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn render_property(value: &Value) -> Option<String> {
    match value {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(render_scalar).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        other => render_scalar(other),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "1" | "true" | "yes"),
        _ => false,
    }
}

/// Whether a product options blob has at least one selected option value.
///
/// Looks at the `options` and `attributes_info` arrays of the root object.
/// Unparseable input counts as "no options".
pub fn options_selected(raw: &str) -> bool {
    let Ok(Value::Object(root)) = serde_json::from_str::<Value>(raw) else {
        return false;
    };

    ["options", "attributes_info"]
        .iter()
        .filter_map(|key| root.get(*key).and_then(Value::as_array))
        .flatten()
        .filter_map(|option| option.get("value"))
        .any(|value| match value {
            Value::Null => false,
            Value::String(s) => !s.trim().is_empty(),
            Value::Array(items) => !items.is_empty(),
            Value::Object(map) => !map.is_empty(),
            _ => true,
        })
}
