//! Price and discount normalization shared by every source adapter.
//!
//! Sources render amounts in many shapes (`₹1,299`, `Rs. 99.50`, `"275"`,
//! `275.0`); everything funnels through [`parse_price`] before it reaches a
//! [`ProductRecord`](super::product::ProductRecord).

use once_cell::sync::Lazy;
use regex::Regex;

static AMOUNT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("amount pattern is valid"));

static CURRENCY_TEXT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:₹|Rs\.?|INR)\s*\d[\d,]*(?:\.\d+)?").expect("currency pattern is valid")
});

static PERCENT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("percent pattern is valid"));

/// Parse a currency amount out of free-form text.
///
/// Currency symbols, whitespace and thousands separators are ignored and the
/// first decimal number wins. Returns `None` when no finite amount is present;
/// positivity is checked later, during record validation.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    AMOUNT_PATTERN
        .find(&cleaned)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|amount| amount.is_finite())
}

/// True when `text` contains something that reads like a rupee amount.
pub fn contains_currency_amount(text: &str) -> bool {
    CURRENCY_TEXT_PATTERN.is_match(text)
}

/// First rupee amount found inside `text`, e.g. `"MRP: ₹300 only"` → `300.0`.
pub fn find_currency_amount(text: &str) -> Option<f64> {
    CURRENCY_TEXT_PATTERN
        .find(text)
        .and_then(|m| parse_price(m.as_str()))
}

/// Whole-number discount percentage, present only when `original > price`.
pub fn discount_percent(price: f64, original: f64) -> Option<u32> {
    if !(price > 0.0 && original.is_finite() && original > price) {
        return None;
    }
    Some(((original - price) / original * 100.0).round() as u32)
}

pub fn discount_label(percent: u32) -> String {
    format!("{percent}% off")
}

/// Normalize a discount label supplied by a source.
///
/// Labels carrying a percentage are rewritten to the canonical `"<n>% off"`
/// form; anything else non-empty is kept verbatim.
pub fn normalize_discount_label(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match PERCENT_PATTERN
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        Some(pct) if pct > 0.0 => Some(format!("{}% off", pct.round() as u32)),
        Some(_) => None,
        None => Some(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("₹299", Some(299.0))]
    #[case("₹1,299", Some(1299.0))]
    #[case("₹99.50", Some(99.5))]
    #[case("₹ 299", Some(299.0))]
    #[case("₹  1,299", Some(1299.0))]
    #[case("Rs. 45", Some(45.0))]
    #[case("275", Some(275.0))]
    #[case("", None)]
    #[case("Not a price", None)]
    #[case("Free", None)]
    fn parses_price_text(#[case] input: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_price(input), expected);
    }

    #[test]
    fn finds_currency_amount_inside_text() {
        assert_eq!(find_currency_amount("MRP: ₹1,050 (incl. taxes)"), Some(1050.0));
        assert_eq!(find_currency_amount("Out of stock"), None);
        assert!(contains_currency_amount("only ₹ 49"));
        assert!(!contains_currency_amount("49 items"));
    }

    #[test]
    fn discount_is_rounded_percentage() {
        assert_eq!(discount_percent(275.0, 300.0), Some(8));
        assert_eq!(discount_percent(90.0, 120.0), Some(25));
        assert_eq!(discount_percent(50.0, 100.0), Some(50));
    }

    #[test]
    fn no_discount_when_original_not_higher() {
        assert_eq!(discount_percent(100.0, 100.0), None);
        assert_eq!(discount_percent(100.0, 90.0), None);
        assert_eq!(discount_percent(0.0, 90.0), None);
    }

    #[test]
    fn source_labels_are_normalized() {
        assert_eq!(normalize_discount_label("17% OFF").as_deref(), Some("17% off"));
        assert_eq!(normalize_discount_label(" 12.6 % ").as_deref(), Some("13% off"));
        assert_eq!(normalize_discount_label("Buy 1 Get 1").as_deref(), Some("Buy 1 Get 1"));
        assert_eq!(normalize_discount_label("0%"), None);
        assert_eq!(normalize_discount_label("  "), None);
    }
}
