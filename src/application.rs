//! Application layer module
//!
//! Orchestrates one comparison: fan out to sources, bound each one, merge.

pub mod aggregator;

pub use aggregator::{Aggregator, CompareError};
