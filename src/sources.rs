//! Source adapters: one per e-commerce site
//!
//! A source is a static profile (request shape, extraction tiers, metadata)
//! plus a [`FetchPort`]. [`SourceAdapter`] ties the two together; the
//! [`registry`] decides which adapters take part in a comparison.

pub mod bigbasket;
pub mod jiomart_quick;
pub mod registry;
pub mod zepto;

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::domain::{ProductRecord, RecordContext, RegionKey};
use crate::infrastructure::parsing::{ExtractionPipeline, ParsingResult};
use crate::infrastructure::{FetchError, FetchKind, FetchPort, FetchRequest};

pub use registry::{SourceRegistry, catalog, list_sources};

/// Static, read-only metadata about a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    pub delivery_window: &'static str,
    pub base_url: &'static str,
    pub fetch_kind: FetchKind,
}

/// Anything the aggregator can ask for products.
#[async_trait]
pub trait ProductSource: Send + Sync {
    fn info(&self) -> &SourceInfo;

    /// Products for `query` in `region`.
    ///
    /// Only transport failures are errors; a page without usable products
    /// (or a non-success status) is an empty vector.
    async fn search(&self, query: &str, region: &RegionKey) -> Result<Vec<ProductRecord>, FetchError>;
}

/// How a source builds its request for one search.
pub type RequestBuilder = fn(&str, &RegionKey) -> FetchRequest;

/// Static description from which adapters are built.
pub struct SourceDefinition {
    pub info: SourceInfo,
    pub build_request: RequestBuilder,
    pub build_pipeline: fn(usize) -> ParsingResult<ExtractionPipeline>,
}

/// Generic adapter: fetch, then run the extraction tiers.
pub struct SourceAdapter {
    info: SourceInfo,
    build_request: RequestBuilder,
    pipeline: ExtractionPipeline,
    fetcher: Arc<dyn FetchPort>,
}

impl SourceAdapter {
    pub fn new(definition: &SourceDefinition, fetcher: Arc<dyn FetchPort>, max_results: usize) -> ParsingResult<Self> {
        Ok(Self {
            info: definition.info.clone(),
            build_request: definition.build_request,
            pipeline: (definition.build_pipeline)(max_results)?,
            fetcher,
        })
    }

    fn record_context(&self, request: &FetchRequest) -> RecordContext {
        RecordContext {
            source_id: self.info.id.to_string(),
            delivery_estimate: Some(self.info.delivery_window.to_string()),
            fallback_url: request.url.clone(),
        }
    }
}

#[async_trait]
impl ProductSource for SourceAdapter {
    fn info(&self) -> &SourceInfo {
        &self.info
    }

    async fn search(&self, query: &str, region: &RegionKey) -> Result<Vec<ProductRecord>, FetchError> {
        let request = (self.build_request)(query, region);
        let started = Instant::now();
        info!(source = self.info.id, %region, "🔎 Searching: {}", request.url);

        let response = self.fetcher.fetch(&request).await?;
        if !response.is_success() {
            warn!(source = self.info.id, status = response.status, "Non-success status, treating as no data");
            return Ok(Vec::new());
        }

        let context = self.record_context(&request);
        let payload = response.into_payload(request.kind);
        let records = self.pipeline.run(&payload, &context);

        info!(
            source = self.info.id,
            count = records.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Found {} products",
            records.len()
        );
        Ok(records)
    }
}

/// Percent-encode a query for a path segment or query value (spaces as `%20`).
pub fn encode_query(query: &str) -> String {
    url::form_urlencoded::byte_serialize(query.trim().as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_spaces_and_reserved_characters() {
        assert_eq!(encode_query(" atta 5kg "), "atta%205kg");
        assert_eq!(encode_query("a+b/c"), "a%2Bb%2Fc");
    }
}
