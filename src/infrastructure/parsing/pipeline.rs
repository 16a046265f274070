//! Ordered extraction tiers with per-item validation and the result cap.

use tracing::{debug, trace};

use super::{ExtractionStrategy, ParsingError, ParsingResult, Payload};
use crate::domain::{ProductRecord, RecordContext};

pub struct ExtractionPipeline {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    max_results: usize,
}

impl ExtractionPipeline {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>, max_results: usize) -> Self {
        Self {
            strategies,
            max_results,
        }
    }

    /// Run tiers in order until one yields at least one valid record.
    ///
    /// Never fails: an item-level error skips that item, any other error
    /// abandons the tier. An empty vector means nothing usable was found.
    pub fn run(&self, payload: &Payload, context: &RecordContext) -> Vec<ProductRecord> {
        if payload.is_blank() {
            debug!(source = %context.source_id, "Empty payload, nothing to extract");
            return Vec::new();
        }

        for strategy in &self.strategies {
            let records = match Self::run_tier(strategy.as_ref(), payload, context) {
                Ok(records) => records,
                Err(e) => {
                    debug!(source = %context.source_id, tier = strategy.name(), "Tier produced nothing: {}", e);
                    continue;
                }
            };

            if !records.is_empty() {
                debug!(
                    source = %context.source_id,
                    tier = strategy.name(),
                    "Extracted {} valid records",
                    records.len()
                );
                return cap_cheapest(records, self.max_results);
            }
        }

        debug!(source = %context.source_id, "No tier produced valid records");
        Vec::new()
    }

    fn run_tier(
        strategy: &dyn ExtractionStrategy,
        payload: &Payload,
        context: &RecordContext,
    ) -> ParsingResult<Vec<ProductRecord>> {
        let mut records = Vec::new();
        for item in strategy.extract(payload)? {
            let record = item.and_then(|candidate| {
                ProductRecord::try_from_candidate(candidate, context).map_err(ParsingError::from)
            });
            match record {
                Ok(record) => records.push(record),
                Err(e) if e.is_item_level() => {
                    trace!(source = %context.source_id, tier = strategy.name(), "Skipping item: {}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }
}

/// Keep the `limit` cheapest records, preserving their extraction order.
pub fn cap_cheapest(records: Vec<ProductRecord>, limit: usize) -> Vec<ProductRecord> {
    if records.len() <= limit {
        return records;
    }

    let mut by_price: Vec<usize> = (0..records.len()).collect();
    by_price.sort_by(|&a, &b| records[a].price().total_cmp(&records[b].price()));
    let mut keep = vec![false; records.len()];
    for &index in by_price.iter().take(limit) {
        keep[index] = true;
    }

    records
        .into_iter()
        .zip(keep)
        .filter_map(|(record, kept)| kept.then_some(record))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProductCandidate;

    struct Fixed {
        name: &'static str,
        outcome: Result<Vec<(&'static str, f64)>, ParsingError>,
    }

    impl ExtractionStrategy for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn extract(&self, _payload: &Payload) -> ParsingResult<Vec<ParsingResult<ProductCandidate>>> {
            self.outcome.clone().map(|items| {
                items
                    .into_iter()
                    .map(|(name, price)| {
                        Ok(ProductCandidate {
                            name: Some(name.to_string()),
                            price: Some(price),
                            ..ProductCandidate::default()
                        })
                    })
                    .collect()
            })
        }
    }

    fn context() -> RecordContext {
        RecordContext {
            source_id: "test".to_string(),
            delivery_estimate: None,
            fallback_url: "https://shop.example/search?q=milk".to_string(),
        }
    }

    fn tier(name: &'static str, outcome: Result<Vec<(&'static str, f64)>, ParsingError>) -> Box<dyn ExtractionStrategy> {
        Box::new(Fixed { name, outcome })
    }

    fn names(records: &[ProductRecord]) -> Vec<&str> {
        records.iter().map(ProductRecord::name).collect()
    }

    #[test]
    fn falls_through_failed_and_invalid_tiers() {
        let pipeline = ExtractionPipeline::new(
            vec![
                tier("broken", Err(ParsingError::NoStructuredData)),
                tier("invalid", Ok(vec![("Zero priced", 0.0)])),
                tier("good", Ok(vec![("Milk 1 L", 62.0)])),
                tier("unused", Ok(vec![("Never", 1.0)])),
            ],
            5,
        );

        let records = pipeline.run(&Payload::Html("<html/>".to_string()), &context());
        assert_eq!(names(&records), vec!["Milk 1 L"]);
        assert_eq!(records[0].url(), "https://shop.example/search?q=milk");
    }

    /// Yields a good item, then an error that means the payload is unreadable.
    struct Garbled;

    impl ExtractionStrategy for Garbled {
        fn name(&self) -> &'static str {
            "garbled"
        }

        fn extract(&self, _payload: &Payload) -> ParsingResult<Vec<ParsingResult<ProductCandidate>>> {
            Ok(vec![
                Ok(ProductCandidate {
                    name: Some("Half read".to_string()),
                    price: Some(1.0),
                    ..ProductCandidate::default()
                }),
                Err(ParsingError::MalformedStructuredData {
                    message: "truncated".to_string(),
                }),
            ])
        }
    }

    #[test]
    fn tier_level_item_error_abandons_the_tier() {
        let pipeline = ExtractionPipeline::new(
            vec![Box::new(Garbled), tier("good", Ok(vec![("Curd 400 g", 45.0)]))],
            5,
        );

        let records = pipeline.run(&Payload::Html("<html/>".to_string()), &context());
        assert_eq!(names(&records), vec!["Curd 400 g"]);
    }

    #[test]
    fn cap_keeps_cheapest_in_extraction_order() {
        let pipeline = ExtractionPipeline::new(
            vec![tier(
                "only",
                Ok(vec![("A", 90.0), ("B", 10.0), ("C", 50.0), ("D", 5.0), ("E", 70.0)]),
            )],
            3,
        );

        let records = pipeline.run(&Payload::Text("x".to_string()), &context());
        assert_eq!(names(&records), vec!["B", "C", "D"]);
    }

    #[test]
    fn extraction_is_idempotent() {
        let pipeline = ExtractionPipeline::new(vec![tier("only", Ok(vec![("A", 3.0), ("B", 1.0)]))], 5);
        let payload = Payload::Json("{}".to_string());
        assert_eq!(pipeline.run(&payload, &context()), pipeline.run(&payload, &context()));
    }

    #[test]
    fn blank_payload_yields_nothing() {
        let pipeline = ExtractionPipeline::new(vec![tier("only", Ok(vec![("A", 3.0)]))], 5);
        assert!(pipeline.run(&Payload::Html("   ".to_string()), &context()).is_empty());
    }
}
