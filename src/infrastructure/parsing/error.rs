//! Parsing error types for the extraction pipeline
//!
//! Errors are split by the boundary that absorbs them: item-level errors drop
//! one product, tier-level errors make the pipeline fall through to the next
//! strategy. None of them ever reach the aggregation caller.

use thiserror::Error;

use crate::domain::RecordError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParsingError {
    #[error("Required field '{field}' not found")]
    RequiredFieldMissing {
        field: String,
        context: Option<String>,
    },

    #[error("Invalid price '{raw}' for '{item}'")]
    InvalidPrice { raw: String, item: String },

    #[error("Invalid CSS selector: {selector} - {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("No structured data block found in payload")]
    NoStructuredData,

    #[error("Structured data could not be decoded: {message}")]
    MalformedStructuredData { message: String },

    #[error("No product collection at any known path (tried {tried_paths:?})")]
    ProductCollectionMissing { tried_paths: Vec<String> },

    #[error("No product containers matched (tried {tried_selectors} selectors)")]
    NoProductsFound { tried_selectors: usize },

    #[error("Strategy '{strategy}' cannot read a {payload} payload")]
    UnsupportedPayload {
        strategy: &'static str,
        payload: &'static str,
    },

    #[error("Product entry is not an object")]
    NotAnObject,

    #[error(transparent)]
    InvalidRecord(#[from] RecordError),
}

impl ParsingError {
    pub fn required_field_missing(field: &str, context: Option<&str>) -> Self {
        Self::RequiredFieldMissing {
            field: field.to_string(),
            context: context.map(ToString::to_string),
        }
    }

    pub fn invalid_selector(selector: &str, reason: &str) -> Self {
        Self::InvalidSelector {
            selector: selector.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Item-level errors skip one product; the rest end the current tier.
    pub fn is_item_level(&self) -> bool {
        matches!(
            self,
            Self::RequiredFieldMissing { .. }
                | Self::InvalidPrice { .. }
                | Self::NotAnObject
                | Self::InvalidRecord(_)
        )
    }
}

pub type ParsingResult<T> = Result<T, ParsingError>;
