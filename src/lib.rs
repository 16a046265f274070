//! PriceHunt - multi-source grocery price comparison
//!
//! Searches several e-commerce sites concurrently for one query and region,
//! normalizes every listing into a [`domain::ProductRecord`], and reports the
//! merged list together with the cheapest offer.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod sources;

pub use application::{Aggregator, CompareError};
pub use domain::{ComparisonResult, ProductRecord, RegionKey};
pub use sources::{ProductSource, SourceInfo, SourceRegistry, list_sources};
