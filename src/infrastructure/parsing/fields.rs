//! Field-name synonym resolution for structured product entries.
//!
//! Sites rename fields between page variants (`sp`, `sale_price`,
//! `selling_price` ...). Each logical field carries an ordered list of key
//! paths; the first path holding a meaningful value wins. Paths may be dotted
//! (`pricing.discount.prim_price.sp`) and may index arrays (`images.0.s`).

use serde_json::Value;

use crate::domain::pricing::{discount_label, parse_price};

/// Ordered key paths per logical product field.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldSynonyms {
    pub name: &'static [&'static str],
    pub price: &'static [&'static str],
    pub original_price: &'static [&'static str],
    pub discount: &'static [&'static str],
    pub id: &'static [&'static str],
    pub slug: &'static [&'static str],
    pub image: &'static [&'static str],
    pub rating: &'static [&'static str],
    pub available: &'static [&'static str],
}

/// Walk a dotted path through objects and arrays.
pub fn lookup_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// First value under `paths` that carries information.
///
/// `null`, `false`, `0`, empty strings and empty containers count as absent,
/// so a later synonym can still supply the field.
pub fn first_meaningful<'a>(entry: &'a Value, paths: &[&str]) -> Option<&'a Value> {
    paths
        .iter()
        .filter_map(|path| lookup_path(entry, path))
        .find(|value| is_meaningful(value))
}

fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.trim().is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub fn text_field(entry: &Value, paths: &[&str]) -> Option<String> {
    first_meaningful(entry, paths).and_then(|value| match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Numeric field that may arrive as a number or as price text.
pub fn amount_field(entry: &Value, paths: &[&str]) -> Option<f64> {
    first_meaningful(entry, paths).and_then(|value| match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_price(s),
        _ => None,
    })
}

/// Discount label: numbers become `"<n>% off"`, text is kept as supplied.
pub fn discount_field(entry: &Value, paths: &[&str]) -> Option<String> {
    first_meaningful(entry, paths).and_then(|value| match value {
        Value::Number(n) => n
            .as_f64()
            .filter(|pct| *pct > 0.0)
            .map(|pct| discount_label(pct.round() as u32)),
        Value::String(s) => Some(s.trim().to_string()),
        _ => None,
    })
}

/// Availability flag. Unlike the other lookups an explicit `false` counts.
pub fn flag_field(entry: &Value, paths: &[&str]) -> Option<bool> {
    paths
        .iter()
        .filter_map(|path| lookup_path(entry, path))
        .find_map(|value| match value {
            Value::Bool(flag) => Some(*flag),
            Value::Number(n) => n.as_f64().map(|f| f != 0.0),
            Value::String(s) => {
                let lowered = s.trim().to_ascii_lowercase();
                if lowered.is_empty() {
                    None
                } else {
                    Some(!matches!(
                        lowered.as_str(),
                        "false" | "0" | "no" | "out_of_stock" | "out of stock" | "unavailable" | "sold_out"
                    ))
                }
            }
            _ => None,
        })
}
