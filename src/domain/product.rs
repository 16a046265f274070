//! Normalized product schema produced by every source adapter.

use serde::Serialize;

use super::pricing::{discount_label, discount_percent, normalize_discount_label};

/// Maximum number of characters kept from a product name.
pub const MAX_NAME_CHARS: usize = 120;

/// Loosely-typed product data as pulled out of a page, before validation.
///
/// Every extraction strategy produces candidates; only
/// [`ProductRecord::try_from_candidate`] turns them into records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductCandidate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub original_price: Option<f64>,
    pub discount: Option<String>,
    pub url: Option<String>,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
    pub available: Option<bool>,
}

/// Product record validation errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("Product name cannot be empty (source '{source_id}')")]
    MissingName { source_id: String },
    #[error("Price missing for '{item}'")]
    MissingPrice { item: String },
    #[error("Price must be positive, got {price} for '{item}'")]
    InvalidPrice { price: f64, item: String },
    #[error("No product link for '{item}'")]
    MissingUrl { item: String },
}

/// Per-adapter values stamped onto every record it emits.
#[derive(Debug, Clone)]
pub struct RecordContext {
    pub source_id: String,
    pub delivery_estimate: Option<String>,
    /// Used when the payload carries no product link (usually the search URL).
    pub fallback_url: String,
}

/// A validated product listing. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    name: String,
    price: f64,
    original_price: Option<f64>,
    discount: Option<String>,
    source_id: String,
    url: String,
    image_url: Option<String>,
    rating: Option<f64>,
    available: bool,
    delivery_estimate: Option<String>,
}

impl ProductRecord {
    /// Validate a candidate and fill derived fields.
    ///
    /// Fails when the name is empty or the price is missing or not positive.
    /// Out-of-range optional fields (rating outside `[0, 5]`, an original
    /// price below the selling price) are dropped rather than failing.
    pub fn try_from_candidate(
        candidate: ProductCandidate,
        context: &RecordContext,
    ) -> Result<Self, RecordError> {
        let name = candidate
            .name
            .as_deref()
            .map(normalize_name)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| RecordError::MissingName {
                source_id: context.source_id.clone(),
            })?;

        let Some(price) = candidate.price else {
            return Err(RecordError::MissingPrice { item: name });
        };
        if !price.is_finite() || price <= 0.0 {
            return Err(RecordError::InvalidPrice { price, item: name });
        }

        let original_price = candidate
            .original_price
            .filter(|original| original.is_finite() && *original >= price);

        let discount = candidate
            .discount
            .as_deref()
            .and_then(normalize_discount_label)
            .or_else(|| {
                original_price
                    .and_then(|original| discount_percent(price, original))
                    .map(discount_label)
            });

        let url = non_empty(candidate.url)
            .or_else(|| non_empty(Some(context.fallback_url.clone())))
            .ok_or_else(|| RecordError::MissingUrl { item: name.clone() })?;

        let rating = candidate
            .rating
            .filter(|rating| rating.is_finite() && (0.0..=5.0).contains(rating));

        Ok(Self {
            name,
            price,
            original_price,
            discount,
            source_id: context.source_id.clone(),
            url,
            image_url: non_empty(candidate.image_url),
            rating,
            available: candidate.available.unwrap_or(true),
            delivery_estimate: context.delivery_estimate.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn original_price(&self) -> Option<f64> {
        self.original_price
    }

    pub fn discount(&self) -> Option<&str> {
        self.discount.as_deref()
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn rating(&self) -> Option<f64> {
        self.rating
    }

    pub fn available(&self) -> bool {
        self.available
    }

    pub fn delivery_estimate(&self) -> Option<&str> {
        self.delivery_estimate.as_deref()
    }
}

/// Collapse whitespace and cut to [`MAX_NAME_CHARS`] characters.
fn normalize_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed
        .chars()
        .take(MAX_NAME_CHARS)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RecordContext {
        RecordContext {
            source_id: "test".to_string(),
            delivery_estimate: Some("10-15 mins".to_string()),
            fallback_url: "https://example.com/search?q=butter".to_string(),
        }
    }

    fn candidate(name: &str, price: f64) -> ProductCandidate {
        ProductCandidate {
            name: Some(name.to_string()),
            price: Some(price),
            ..ProductCandidate::default()
        }
    }

    #[test]
    fn builds_record_with_defaults() {
        let record = ProductRecord::try_from_candidate(candidate("Amul Butter 500g", 275.0), &context()).unwrap();

        assert_eq!(record.name(), "Amul Butter 500g");
        assert_eq!(record.price(), 275.0);
        assert!(record.available());
        assert_eq!(record.source_id(), "test");
        assert_eq!(record.url(), "https://example.com/search?q=butter");
        assert_eq!(record.delivery_estimate(), Some("10-15 mins"));
        assert_eq!(record.discount(), None);
    }

    #[test]
    fn rejects_non_positive_or_missing_price() {
        assert_eq!(
            ProductRecord::try_from_candidate(candidate("Milk", 0.0), &context()),
            Err(RecordError::InvalidPrice {
                price: 0.0,
                item: "Milk".to_string()
            })
        );
        assert!(ProductRecord::try_from_candidate(candidate("Milk", -4.0), &context()).is_err());
        assert!(ProductRecord::try_from_candidate(candidate("Milk", f64::NAN), &context()).is_err());

        let mut no_price = candidate("Milk", 1.0);
        no_price.price = None;
        assert_eq!(
            ProductRecord::try_from_candidate(no_price, &context()),
            Err(RecordError::MissingPrice {
                item: "Milk".to_string()
            })
        );
    }

    #[test]
    fn rejects_blank_name() {
        assert!(matches!(
            ProductRecord::try_from_candidate(candidate("   ", 10.0), &context()),
            Err(RecordError::MissingName { .. })
        ));
    }

    #[test]
    fn truncates_long_names() {
        let long = "x".repeat(300);
        let record = ProductRecord::try_from_candidate(candidate(&long, 10.0), &context()).unwrap();
        assert_eq!(record.name().chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn computes_discount_from_original_price() {
        let mut c = candidate("Ghee 1L", 600.0);
        c.original_price = Some(750.0);
        let record = ProductRecord::try_from_candidate(c, &context()).unwrap();
        assert_eq!(record.original_price(), Some(750.0));
        assert_eq!(record.discount(), Some("20% off"));
    }

    #[test]
    fn source_discount_label_takes_precedence() {
        let mut c = candidate("Ghee 1L", 600.0);
        c.original_price = Some(750.0);
        c.discount = Some("22% OFF".to_string());
        let record = ProductRecord::try_from_candidate(c, &context()).unwrap();
        assert_eq!(record.discount(), Some("22% off"));
    }

    #[test]
    fn equal_original_price_has_no_discount() {
        let mut c = candidate("Bread", 40.0);
        c.original_price = Some(40.0);
        let record = ProductRecord::try_from_candidate(c, &context()).unwrap();
        assert_eq!(record.original_price(), Some(40.0));
        assert_eq!(record.discount(), None);
    }

    #[test]
    fn drops_original_price_below_selling_price() {
        let mut c = candidate("Bread", 40.0);
        c.original_price = Some(35.0);
        let record = ProductRecord::try_from_candidate(c, &context()).unwrap();
        assert_eq!(record.original_price(), None);
        assert_eq!(record.discount(), None);
    }

    #[test]
    fn drops_out_of_range_rating() {
        let mut c = candidate("Eggs", 80.0);
        c.rating = Some(7.5);
        let record = ProductRecord::try_from_candidate(c, &context()).unwrap();
        assert_eq!(record.rating(), None);
    }
}
