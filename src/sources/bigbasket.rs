//! BigBasket: server-rendered search page with embedded Next.js state

use crate::domain::RegionKey;
use crate::infrastructure::parsing::{
    DomSelectorStrategy, ExtractionPipeline, FieldSynonyms, ParsingResult, SelectorConfig, StructuredDataStrategy,
    UrlTemplate,
};
use crate::infrastructure::{FetchKind, FetchRequest};

use super::{SourceDefinition, SourceInfo, encode_query};

pub const BASE_URL: &str = "https://www.bigbasket.com";

pub const DEFINITION: SourceDefinition = SourceDefinition {
    info: SourceInfo {
        id: "bigbasket",
        display_name: "BigBasket",
        delivery_window: "2-4 hours",
        base_url: BASE_URL,
        fetch_kind: FetchKind::Http,
    },
    build_request,
    build_pipeline,
};

const COLLECTION_PATHS: &[&str] = &["props.pageProps.products", "props.pageProps.tabData.products", "products"];

const SYNONYMS: FieldSynonyms = FieldSynonyms {
    name: &["p_desc", "name", "product_name"],
    price: &["sp", "sale_price", "price", "selling_price", "pricing.discount.prim_price.sp"],
    original_price: &["mrp", "original_price", "pricing.discount.mrp"],
    discount: &["discount_text", "pricing.discount.d_text"],
    id: &["p_id", "id", "product_id"],
    slug: &["slug", "url_key"],
    image: &["p_img_url", "image", "image_url", "images.0.s"],
    rating: &["rating", "rating_info.avg_rating"],
    available: &["availability", "availability.avail_status"],
};

fn selectors() -> SelectorConfig {
    SelectorConfig {
        product_container: SelectorConfig::strings(&[
            "[data-qa=\"product\"]",
            ".PaginateItems___StyledLi-sc-1yrbjdr-0",
            ".product-card",
            "[class*=\"ProductCard\"]",
            "li[class*=\"product\"]",
            ".prod-deck",
        ]),
        name: SelectorConfig::strings(&[
            "[data-qa=\"product-title\"]",
            ".PaginateItems___StyledH3-sc-1yrbjdr-1",
            ".product-name",
            "h3",
            "[class*=\"ProductName\"]",
            "a[title]",
        ]),
        price: SelectorConfig::strings(&[
            "[data-qa=\"product-price\"]",
            ".discnt-price",
            ".sale-price",
            "[class*=\"Price\"]",
            "span[class*=\"price\"]",
        ]),
        original_price: SelectorConfig::strings(&[".mrp-price", "[class*=\"MRP\"]", ".original-price", "del", "s"]),
        rating: SelectorConfig::strings(&["[class*=\"rating\"]"]),
        link: SelectorConfig::strings(&["a[href*=\"/pd/\"]", "a[href]"]),
        image: SelectorConfig::strings(&["img[src]", "img[data-src]"]),
    }
}

pub fn search_url(query: &str) -> String {
    format!("{BASE_URL}/ps/?q={}", encode_query(query))
}

fn build_request(query: &str, region: &RegionKey) -> FetchRequest {
    FetchRequest::new(search_url(query), FetchKind::Http)
        .with_header("Referer", "https://www.bigbasket.com/")
        .with_cookie("x-entry-context-id", "100")
        .with_cookie("x-channel", "web")
        .with_cookie("_bb_locSrc", "default")
        .with_cookie("bb2_enabled", "true")
        .with_cookie("_bb_pin_code", region.as_str())
}

fn build_pipeline(max_results: usize) -> ParsingResult<ExtractionPipeline> {
    Ok(ExtractionPipeline::new(
        vec![
            Box::new(StructuredDataStrategy::new(
                BASE_URL,
                COLLECTION_PATHS,
                SYNONYMS,
                UrlTemplate::IdAndSlug { prefix: "/pd/" },
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
            source_id: "bigbasket".to_string(),
            delivery_estimate: Some("2-4 hours".to_string()),
            fallback_url: search_url("butter"),
        }
    }

    #[test]
    fn request_carries_pincode_cookie() {
        let region = RegionKey::parse("560034").unwrap();
        let request = build_request("amul butter", &region);
        assert_eq!(request.url, "https://www.bigbasket.com/ps/?q=amul%20butter");
        assert!(request.cookie_header().unwrap().contains("_bb_pin_code=560034"));
    }

    #[test]
    fn next_data_products_become_records() {
        let html = r#"<script id="__NEXT_DATA__" type="application/json">{"props":{"pageProps":{"products":[
            {"p_id": 40001, "slug": "amul-butter", "p_desc": "Amul Butter 500 g", "sp": "275.00", "mrp": "300.00", "availability": "A"},
            {"p_id": 40002, "p_desc": "Out of stock butter", "sp": "0"}
        ]}}}</script>"#;

        let records = build_pipeline(5).unwrap().run(&Payload::Html(html.to_string()), &context());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price(), 275.0);
        assert_eq!(records[0].discount(), Some("8% off"));
        assert_eq!(records[0].url(), "https://www.bigbasket.com/pd/40001/amul-butter");
        assert_eq!(records[0].delivery_estimate(), Some("2-4 hours"));
    }

    #[test]
    fn broken_state_falls_back_to_product_cards() {
        let html = r#"
            <script id="__NEXT_DATA__">{"props": {"pageProps": </script>
            <ul>
              <li class="product-card"><h3>Amul Butter 500 g</h3><span class="sale-price">₹1,299</span></li>
              <li class="product-card"><h3>Butter Sample Pack</h3><span class="sale-price">Free</span></li>
            </ul>"#;

        let records = build_pipeline(5).unwrap().run(&Payload::Html(html.to_string()), &context());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price(), 1299.0);
        assert_eq!(records[0].url(), search_url("butter"));
    }
}
