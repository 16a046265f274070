//! Zepto: client-rendered, read from the page's visible text

use std::time::Duration;

use crate::domain::RegionKey;
use crate::infrastructure::parsing::{ExtractionPipeline, ParsingResult, TextPatternStrategy};
use crate::infrastructure::{FetchKind, FetchRequest};

use super::{SourceDefinition, SourceInfo, encode_query};

pub const BASE_URL: &str = "https://www.zeptonow.com";

/// Product cards end with this add-to-cart button label.
const CARD_BOUNDARY: &str = "ADD";

const SETTLE_DELAY: Duration = Duration::from_secs(2);

pub const DEFINITION: SourceDefinition = SourceDefinition {
    info: SourceInfo {
        id: "zepto",
        display_name: "Zepto",
        delivery_window: "10-15 mins",
        base_url: BASE_URL,
        fetch_kind: FetchKind::RenderedText,
    },
    build_request,
    build_pipeline,
};

pub fn search_url(query: &str) -> String {
    format!("{BASE_URL}/search?query={}", encode_query(query))
}

fn build_request(query: &str, _region: &RegionKey) -> FetchRequest {
    FetchRequest::new(search_url(query), FetchKind::RenderedText)
        .with_header("Accept-Language", "en-IN")
        .with_settle_delay(SETTLE_DELAY)
}

fn build_pipeline(max_results: usize) -> ParsingResult<ExtractionPipeline> {
    Ok(ExtractionPipeline::new(
        vec![Box::new(TextPatternStrategy::new(CARD_BOUNDARY))],
        max_results,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordContext;
    use crate::infrastructure::Payload;

    #[test]
    fn rendered_request_waits_for_the_page() {
        let request = build_request("milk", &RegionKey::parse("560087").unwrap());
        assert_eq!(request.kind, FetchKind::RenderedText);
        assert_eq!(request.settle_delay, Some(Duration::from_secs(2)));
        assert_eq!(request.url, "https://www.zeptonow.com/search?query=milk");
    }

    #[test]
    fn records_link_back_to_search() {
        let context = RecordContext {
            source_id: "zepto".to_string(),
            delivery_estimate: Some("10-15 mins".to_string()),
            fallback_url: search_url("bread"),
        };
        let text = "₹45\nHarvest Gold White Bread\n400 g\n4.3\nADD\n₹55\n₹60\nBritannia Brown Bread\n400 g\nADD\n";

        let records = build_pipeline(5).unwrap().run(&Payload::Text(text.to_string()), &context);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name(), "Harvest Gold White Bread (400 g)");
        assert_eq!(records[1].discount(), Some("8% off"));
        assert!(records.iter().all(|r| r.url() == "https://www.zeptonow.com/search?query=bread"));
    }
}
