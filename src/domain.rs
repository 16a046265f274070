//! Domain module - product schema, pricing rules and comparison results
//!
//! Everything here is plain data plus pure functions; no I/O.

pub mod comparison;
pub mod pricing;
pub mod product;
pub mod region;

pub use comparison::{ComparisonResult, SourceContribution, SourceReport, SourceStatus, lowest_price};
pub use product::{ProductCandidate, ProductRecord, RecordContext, RecordError};
pub use region::{RegionError, RegionKey};
