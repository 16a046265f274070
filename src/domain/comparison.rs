//! The value returned for one comparison request.

use serde::Serialize;

use super::product::ProductRecord;
use super::region::RegionKey;

/// Terminal state of one source task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum SourceStatus {
    /// The task finished; it may still have found nothing.
    Completed,
    TimedOut,
    Failed(String),
}

/// What one source contributed to a comparison.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub source_id: String,
    #[serde(flatten)]
    pub status: SourceStatus,
    pub product_count: usize,
    pub elapsed_ms: u64,
}

/// One source's finished task, as handed to [`ComparisonResult::assemble`].
#[derive(Debug, Clone)]
pub struct SourceContribution {
    pub report: SourceReport,
    pub products: Vec<ProductRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ComparisonResult {
    pub query: String,
    pub region: RegionKey,
    /// Source configuration order, then extraction order. Not price-sorted.
    pub products: Vec<ProductRecord>,
    pub lowest: Option<ProductRecord>,
    pub contributing_sources: usize,
    pub sources: Vec<SourceReport>,
}

impl ComparisonResult {
    /// Merge per-source contributions (already in configuration order).
    pub fn assemble(query: &str, region: RegionKey, contributions: Vec<SourceContribution>) -> Self {
        let contributing_sources = contributions
            .iter()
            .filter(|c| !c.products.is_empty())
            .count();

        let mut products = Vec::new();
        let mut sources = Vec::with_capacity(contributions.len());
        for contribution in contributions {
            products.extend(contribution.products);
            sources.push(contribution.report);
        }

        let lowest = lowest_price(&products).cloned();

        Self {
            query: query.to_string(),
            region,
            products,
            lowest,
            contributing_sources,
            sources,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

/// Cheapest record; the first one seen wins a tie.
pub fn lowest_price(products: &[ProductRecord]) -> Option<&ProductRecord> {
    products.iter().fold(None, |best, candidate| match best {
        Some(current) if current.price() <= candidate.price() => Some(current),
        _ => Some(candidate),
    })
}
