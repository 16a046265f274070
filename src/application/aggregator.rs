//! Concurrent fan-out over sources with per-task deadlines.
//!
//! Each source runs in its own tokio task bounded by its own timeout. Every
//! failure mode of a task (fetch error, timeout, panic) is turned into an
//! empty contribution at the join point, so a comparison only fails on bad
//! input. Dropping the comparison future aborts the tasks still running.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tokio::task::{AbortHandle, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::domain::{ComparisonResult, ProductRecord, RegionKey, SourceContribution, SourceReport, SourceStatus};
use crate::infrastructure::config::AggregatorConfig;
use crate::infrastructure::FetchError;
use crate::sources::ProductSource;

/// Caller-facing contract violations. Source failures never surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompareError {
    #[error("Search query must not be empty")]
    EmptyQuery,

    #[error("Invalid region key '{region}'")]
    InvalidRegion { region: String },
}

/// Aborts the source tasks when dropped. Aborting a finished task is a no-op.
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

/// Result of one source task before it is folded into a report.
enum TaskOutcome {
    Finished(Result<Vec<ProductRecord>, FetchError>),
    TimedOut,
}

pub struct Aggregator {
    task_timeout: Duration,
}

impl Aggregator {
    pub const fn new(config: &AggregatorConfig) -> Self {
        Self::with_timeout(config.task_timeout())
    }

    pub const fn with_timeout(task_timeout: Duration) -> Self {
        Self { task_timeout }
    }

    /// Compare `query` across `sources` for `region`.
    ///
    /// Products are merged in source order, then extraction order. Fails only
    /// for an empty query or a malformed region key.
    pub async fn compare(
        &self,
        query: &str,
        region: &str,
        sources: &[Arc<dyn ProductSource>],
    ) -> Result<ComparisonResult, CompareError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CompareError::EmptyQuery);
        }
        let region = RegionKey::parse(region).map_err(|e| {
            debug!("Rejecting region: {}", e);
            CompareError::InvalidRegion {
                region: region.to_string(),
            }
        })?;

        info!(query, %region, sources = sources.len(), "🚀 Starting comparison");
        let started = Instant::now();

        let handles: Vec<_> = sources
            .iter()
            .map(|source| {
                let source = Arc::clone(source);
                let query = query.to_string();
                let region = region.clone();
                let task_timeout = self.task_timeout;
                tokio::spawn(async move {
                    let task_started = Instant::now();
                    let outcome = match tokio::time::timeout(task_timeout, source.search(&query, &region)).await {
                        Ok(result) => TaskOutcome::Finished(result),
                        Err(_) => TaskOutcome::TimedOut,
                    };
                    (outcome, task_started.elapsed())
                })
            })
            .collect();

        let _guard = AbortOnDrop(handles.iter().map(JoinHandle::abort_handle).collect());
        let joined = join_all(handles).await;

        let contributions: Vec<SourceContribution> = sources
            .iter()
            .zip(joined)
            .map(|(source, joined)| {
                let source_id = source.info().id;
                let (status, products, elapsed) = match joined {
                    Ok((TaskOutcome::Finished(Ok(products)), elapsed)) => (SourceStatus::Completed, products, elapsed),
                    Ok((TaskOutcome::Finished(Err(e)), elapsed)) => {
                        warn!(source = source_id, "❌ Fetch failed: {}", e);
                        (SourceStatus::Failed(e.to_string()), Vec::new(), elapsed)
                    }
                    Ok((TaskOutcome::TimedOut, elapsed)) => {
                        warn!(source = source_id, timeout_s = self.task_timeout.as_secs_f64(), "⚠️ Timed out");
                        (SourceStatus::TimedOut, Vec::new(), elapsed)
                    }
                    Err(join_error) => {
                        error!(source = source_id, "Source task aborted: {}", join_error);
                        (
                            SourceStatus::Failed(format!("task aborted: {join_error}")),
                            Vec::new(),
                            started.elapsed(),
                        )
                    }
                };

                SourceContribution {
                    report: SourceReport {
                        source_id: source_id.to_string(),
                        status,
                        product_count: products.len(),
                        elapsed_ms: elapsed.as_millis() as u64,
                    },
                    products,
                }
            })
            .collect();

        let result = ComparisonResult::assemble(query, region, contributions);
        info!(
            query,
            products = result.products.len(),
            contributing = result.contributing_sources,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "✅ Comparison finished"
        );
        Ok(result)
    }
}
