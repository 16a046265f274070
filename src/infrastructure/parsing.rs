//! Tiered product extraction
//!
//! Each source adapter owns an [`ExtractionPipeline`]: an ordered list of
//! [`ExtractionStrategy`] tiers (structured payload, DOM selectors, plain
//! text patterns). The first tier that yields at least one valid record wins.

pub mod error;
pub mod fields;
pub mod pipeline;
pub mod selectors;
pub mod structured;
pub mod text;

pub use error::{ParsingError, ParsingResult};
pub use fields::FieldSynonyms;
pub use pipeline::ExtractionPipeline;
pub use selectors::{DomSelectorStrategy, SelectorConfig};
pub use structured::{StructuredDataStrategy, UrlTemplate};
pub use text::TextPatternStrategy;

use crate::domain::ProductCandidate;

/// Raw page content handed to the extraction tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Html(String),
    Json(String),
    /// Visible text of a rendered page (`document.body.innerText`).
    Text(String),
}

impl Payload {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Html(body) | Self::Json(body) | Self::Text(body) => body,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Html(_) => "html",
            Self::Json(_) => "json",
            Self::Text(_) => "text",
        }
    }

    pub fn is_blank(&self) -> bool {
        self.as_str().trim().is_empty()
    }
}

/// One extraction tier.
///
/// The outer `Err` means the tier could not read the payload at all (the
/// pipeline moves on); inner `Err`s are single items that failed and are
/// skipped.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, payload: &Payload) -> ParsingResult<Vec<ParsingResult<ProductCandidate>>>;
}
