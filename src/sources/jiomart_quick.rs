//! JioMart Quick: grocery tab of the JioMart search page

use crate::domain::RegionKey;
use crate::infrastructure::parsing::{
    DomSelectorStrategy, ExtractionPipeline, FieldSynonyms, ParsingResult, SelectorConfig, StructuredDataStrategy,
    UrlTemplate,
};
use crate::infrastructure::{FetchKind, FetchRequest};

use super::{SourceDefinition, SourceInfo, encode_query};

pub const BASE_URL: &str = "https://www.jiomart.com";

/// City bucket sent alongside the pincode.
const DEFAULT_CITY_ID: &str = "3";

pub const DEFINITION: SourceDefinition = SourceDefinition {
    info: SourceInfo {
        id: "jiomart_quick",
        display_name: "JioMart Quick",
        delivery_window: "10-30 mins",
        base_url: BASE_URL,
        fetch_kind: FetchKind::Http,
    },
    build_request,
    build_pipeline,
};

const COLLECTION_PATHS: &[&str] = &[
    "props.pageProps.searchData.products",
    "props.pageProps.initialData.products",
    "props.pageProps.data.products",
    "products",
];

const SYNONYMS: FieldSynonyms = FieldSynonyms {
    name: &["name", "productName", "title"],
    price: &["selling_price", "sellingPrice", "sp", "price"],
    original_price: &["mrp", "maximum_retail_price", "originalPrice"],
    discount: &["discount", "discountPercent"],
    id: &["id"],
    slug: &["slug", "url", "id"],
    image: &["image", "imageUrl", "image_url", "thumbnail"],
    rating: &["rating", "averageRating"],
    available: &["inStock"],
};

fn selectors() -> SelectorConfig {
    SelectorConfig {
        product_container: SelectorConfig::strings(&[
            "[data-testid=\"product-card\"]",
            ".product-card",
            "[class*=\"ProductCard\"]",
            "[class*=\"product-item\"]",
            ".plp-card",
        ]),
        name: SelectorConfig::strings(&["h3", ".product-name", "[class*=\"name\"]", "a[title]"]),
        price: SelectorConfig::strings(&[".selling-price", ".sp", "[class*=\"price\"]"]),
        original_price: SelectorConfig::strings(&[".mrp", "del", "s", "[class*=\"original\"]"]),
        rating: Vec::new(),
        link: SelectorConfig::strings(&["a[href]"]),
        image: SelectorConfig::strings(&["img[src]", "img[data-src]"]),
    }
}

pub fn search_url(query: &str) -> String {
    format!("{BASE_URL}/search/{}?tab=groceries", encode_query(query))
}

fn build_request(query: &str, region: &RegionKey) -> FetchRequest {
    FetchRequest::new(search_url(query), FetchKind::Http)
        .with_header("Referer", "https://www.jiomart.com/")
        .with_header("Accept", "application/json, text/plain, */*")
        .with_cookie("pincode", region.as_str())
        .with_cookie("city_id", DEFAULT_CITY_ID)
}

fn build_pipeline(max_results: usize) -> ParsingResult<ExtractionPipeline> {
    Ok(ExtractionPipeline::new(
        vec![
            Box::new(StructuredDataStrategy::new(
                BASE_URL,
                COLLECTION_PATHS,
                SYNONYMS,
                UrlTemplate::Slug { prefix: "/p/" },
            )),
            Box::new(DomSelectorStrategy::new(BASE_URL, &selectors())?),
        ],
        max_results,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordContext;
    use crate::infrastructure::Payload;

    fn context() -> RecordContext {
        RecordContext {
            source_id: "jiomart_quick".to_string(),
            delivery_estimate: Some("10-30 mins".to_string()),
            fallback_url: search_url("atta"),
        }
    }

    #[test]
    fn request_targets_grocery_tab() {
        let region = RegionKey::parse("560087").unwrap();
        let request = build_request("atta 5kg", &region);
        assert_eq!(request.url, "https://www.jiomart.com/search/atta%205kg?tab=groceries");
        assert_eq!(request.cookie_header().as_deref(), Some("pincode=560087; city_id=3"));
    }

    #[test]
    fn source_discount_label_is_kept() {
        let html = r#"<script id="__NEXT_DATA__">{"props":{"pageProps":{"initialData":{"products":[
            {"name": "Aashirvaad Atta 5 kg", "sellingPrice": "245.00", "mrp": 300, "discount": 18, "slug": "aashirvaad-atta/590001", "inStock": true},
            {"productName": "Fortune Atta 5 kg", "sp": 230, "mrp": 230, "inStock": "false"}
        ]}}}}</script>"#;

        let records = build_pipeline(5).unwrap().run(&Payload::Html(html.to_string()), &context());
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].price(), 245.0);
        assert_eq!(records[0].discount(), Some("18% off"));
        assert_eq!(records[0].url(), "https://www.jiomart.com/p/aashirvaad-atta/590001");

        assert_eq!(records[1].discount(), None);
        assert_eq!(records[1].original_price(), Some(230.0));
        assert!(!records[1].available());
        assert_eq!(records[1].url(), search_url("atta"));
    }
}
