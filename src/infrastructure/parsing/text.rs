//! Tier 3: line patterns over the visible text of a rendered page

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{ExtractionStrategy, ParsingError, ParsingResult, Payload};
use crate::domain::ProductCandidate;
use crate::domain::pricing::parse_price;

static PRICE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^₹\s*\d[\d,]*(?:\.\d+)?$").expect("price line pattern is valid"));

static RATING_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-5]\.\d$").expect("rating line pattern is valid"));

static REVIEW_COUNT_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\([\d.]+k?\)$").expect("review count pattern is valid"));

static QUANTITY_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d+(?:\.\d+)?\s*(?:x\s*\d+\s*)?(?:pack|ml|g|gm|kg|l|ltr|pc|pcs)\b")
        .expect("quantity pattern is valid")
});

/// Lines shorter than this are never taken as a product name.
const MIN_NAME_CHARS: usize = 6;

#[derive(Debug, PartialEq)]
enum Line<'a> {
    Price(f64),
    Rating(f64),
    ReviewCount,
    PercentOff(&'a str),
    Quantity(&'a str),
    Other(&'a str),
}

fn classify(line: &str) -> Line<'_> {
    if PRICE_LINE.is_match(line) {
        if let Some(amount) = parse_price(line) {
            return Line::Price(amount);
        }
    }
    if RATING_LINE.is_match(line) {
        if let Ok(rating) = line.parse::<f64>() {
            return Line::Rating(rating);
        }
    }
    if REVIEW_COUNT_LINE.is_match(line) {
        return Line::ReviewCount;
    }
    if line.to_ascii_uppercase().contains("OFF") && line.contains('%') {
        return Line::PercentOff(line);
    }
    if QUANTITY_LINE.is_match(line) {
        return Line::Quantity(line);
    }
    Line::Other(line)
}

/// Splits page text into product blocks on a marker line (the add-to-cart
/// button label) and classifies each block's lines.
pub struct TextPatternStrategy {
    boundary: &'static str,
}

impl TextPatternStrategy {
    pub fn new(boundary: &'static str) -> Self {
        Self { boundary }
    }

    fn blocks<'a>(&self, text: &'a str) -> Vec<Vec<&'a str>> {
        let mut blocks = Vec::new();
        let mut current = Vec::new();
        for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
            if line == self.boundary {
                blocks.push(std::mem::take(&mut current));
            } else {
                current.push(line);
            }
        }
        blocks.push(current);
        blocks.retain(|block| block.len() >= 2);
        blocks
    }

    fn parse_block(block: &[&str]) -> ParsingResult<ProductCandidate> {
        let mut candidate = ProductCandidate::default();
        let mut name: Option<&str> = None;
        let mut quantity: Option<&str> = None;

        for &line in block {
            match classify(line) {
                Line::Price(amount) => match candidate.price {
                    None => candidate.price = Some(amount),
                    // A second, higher amount in the same card is the MRP.
                    Some(price) if amount > price && candidate.original_price.is_none() => {
                        candidate.original_price = Some(amount);
                    }
                    Some(_) => {}
                },
                Line::Rating(rating) => candidate.rating = Some(rating),
                Line::ReviewCount => {}
                Line::PercentOff(label) => {
                    candidate.discount.get_or_insert_with(|| label.to_string());
                }
                Line::Quantity(label) => {
                    quantity.get_or_insert(label);
                }
                Line::Other(text) => {
                    if name.is_none() && text.chars().count() >= MIN_NAME_CHARS && !text.starts_with('₹') {
                        name = Some(text);
                    }
                }
            }
        }

        let name = name.ok_or_else(|| ParsingError::required_field_missing("name", block.first().copied()))?;
        candidate.name = Some(match quantity {
            Some(quantity) => format!("{name} ({quantity})"),
            None => name.to_string(),
        });
        if candidate.price.is_none() {
            return Err(ParsingError::required_field_missing("price", Some(name)));
        }
        Ok(candidate)
    }
}

impl ExtractionStrategy for TextPatternStrategy {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extract(&self, payload: &Payload) -> ParsingResult<Vec<ParsingResult<ProductCandidate>>> {
        let Payload::Text(text) = payload else {
            return Err(ParsingError::UnsupportedPayload {
                strategy: self.name(),
                payload: payload.kind(),
            });
        };

        let blocks = self.blocks(text);
        if blocks.is_empty() {
            return Err(ParsingError::NoProductsFound { tried_selectors: 0 });
        }
        debug!("Split rendered text into {} candidate blocks", blocks.len());
        Ok(blocks.iter().map(|block| Self::parse_block(block)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "₹64\n₹70\n9% OFF\nAmul Taaza Toned Milk\n500 ml\n4.6\n(12.3k)\nADD\n\
        ₹29\nMother Dairy Curd Cup\n200 g\nADD\n\
        Free delivery on first order\nADD\n\
        Footer links\nAbout us\n";

    fn extract(text: &str) -> Vec<ParsingResult<ProductCandidate>> {
        TextPatternStrategy::new("ADD")
            .extract(&Payload::Text(text.to_string()))
            .unwrap()
    }

    #[test]
    fn classifies_card_lines() {
        let items = extract(PAGE);
        let milk = items[0].as_ref().unwrap();
        assert_eq!(milk.name.as_deref(), Some("Amul Taaza Toned Milk (500 ml)"));
        assert_eq!(milk.price, Some(64.0));
        assert_eq!(milk.original_price, Some(70.0));
        assert_eq!(milk.discount.as_deref(), Some("9% OFF"));
        assert_eq!(milk.rating, Some(4.6));

        let curd = items[1].as_ref().unwrap();
        assert_eq!(curd.name.as_deref(), Some("Mother Dairy Curd Cup (200 g)"));
        assert_eq!(curd.price, Some(29.0));
    }

    #[test]
    fn blocks_without_a_price_fail_individually() {
        let items = extract(PAGE);
        assert!(items.iter().filter(|item| item.is_ok()).count() == 2);
        assert!(items.iter().any(|item| matches!(
            item,
            Err(ParsingError::RequiredFieldMissing { field, .. }) if field == "price"
        )));
    }

    #[test]
    fn classify_recognises_each_line_kind() {
        assert_eq!(classify("₹1,299"), Line::Price(1299.0));
        assert_eq!(classify("4.2"), Line::Rating(4.2));
        assert_eq!(classify("(2.1k)"), Line::ReviewCount);
        assert_eq!(classify("12% Off"), Line::PercentOff("12% Off"));
        assert_eq!(classify("2 x 500 g"), Line::Quantity("2 x 500 g"));
        assert_eq!(classify("Brown Bread"), Line::Other("Brown Bread"));
    }

    #[test]
    fn html_payload_is_not_supported() {
        let err = TextPatternStrategy::new("ADD")
            .extract(&Payload::Html("<p>x</p>".to_string()))
            .unwrap_err();
        assert!(matches!(err, ParsingError::UnsupportedPayload { .. }));
    }
}
