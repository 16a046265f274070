//! Builds the adapters taking part in a comparison.
//!
//! Every HTTP source gets its own [`HttpFetcher`]; sources that need a
//! rendered page share the configured renderer and are skipped without one.

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use super::{ProductSource, SourceAdapter, SourceDefinition, SourceInfo, bigbasket, jiomart_quick, zepto};
use crate::infrastructure::{AppConfig, FetchKind, FetchPort, HttpClientConfig, HttpFetcher};

static CATALOG: [SourceDefinition; 3] = [bigbasket::DEFINITION, jiomart_quick::DEFINITION, zepto::DEFINITION];

/// Every shipped source definition, in default comparison order.
pub fn catalog() -> &'static [SourceDefinition] {
    &CATALOG
}

/// Read-only metadata for every shipped source.
pub fn list_sources() -> Vec<SourceInfo> {
    catalog().iter().map(|definition| definition.info.clone()).collect()
}

pub struct SourceRegistry {
    http: HttpClientConfig,
    max_results: usize,
    enabled: Vec<String>,
    renderer: Option<Arc<dyn FetchPort>>,
    http_override: Option<Arc<dyn FetchPort>>,
}

impl SourceRegistry {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            http: config.http.clone(),
            max_results: config.aggregator.max_results_per_source,
            enabled: config.sources.enabled.clone(),
            renderer: None,
            http_override: None,
        }
    }

    /// Restrict to these source ids, in this order.
    #[must_use]
    pub fn with_enabled(mut self, ids: Vec<String>) -> Self {
        self.enabled = ids;
        self
    }

    /// Fetch port for sources that read rendered page text.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn FetchPort>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Route every HTTP source through one port instead of per-source fetchers.
    #[must_use]
    pub fn with_http_port(mut self, port: Arc<dyn FetchPort>) -> Self {
        self.http_override = Some(port);
        self
    }

    fn fetcher_for(&self, info: &SourceInfo) -> Result<Option<Arc<dyn FetchPort>>> {
        match info.fetch_kind {
            FetchKind::Http => {
                if let Some(port) = &self.http_override {
                    return Ok(Some(Arc::clone(port)));
                }
                let fetcher = HttpFetcher::new(self.http.clone())
                    .with_context(|| format!("Failed to create HTTP fetcher for {}", info.id))?
                    .with_context_label(info.id);
                Ok(Some(Arc::new(fetcher)))
            }
            FetchKind::RenderedText => Ok(self.renderer.clone()),
        }
    }

    /// Adapters for the enabled sources, in configuration order.
    ///
    /// Unknown ids, repeated ids and sources without a usable fetch port are
    /// skipped; a repeated id keeps its first position.
    pub fn build(&self) -> Result<Vec<Arc<dyn ProductSource>>> {
        let mut sources: Vec<Arc<dyn ProductSource>> = Vec::with_capacity(self.enabled.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(self.enabled.len());

        for id in &self.enabled {
            if !seen.insert(id.as_str()) {
                warn!("Source '{}' listed more than once, keeping the first entry", id);
                continue;
            }

            let Some(definition) = catalog().iter().find(|definition| definition.info.id == id.as_str()) else {
                warn!("Unknown source '{}' in configuration, skipping", id);
                continue;
            };

            let Some(fetcher) = self.fetcher_for(&definition.info)? else {
                info!("Source '{}' needs a page renderer and none is configured, skipping", id);
                continue;
            };

            let adapter = SourceAdapter::new(definition, fetcher, self.max_results)
                .with_context(|| format!("Invalid extraction profile for {id}"))?;
            sources.push(Arc::new(adapter));
        }

        Ok(sources)
    }
}
