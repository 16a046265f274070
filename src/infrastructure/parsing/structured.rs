//! Tier 1: embedded structured data (`__NEXT_DATA__` and inline product blobs)

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::debug;

use super::fields::{self, FieldSynonyms};
use super::{ExtractionStrategy, ParsingError, ParsingResult, Payload};
use crate::domain::ProductCandidate;

static NEXT_DATA_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script#__NEXT_DATA__").expect("static selector is valid"));

static SCRIPT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("static selector is valid"));

/// A flat object literal holding a `"products": [...]` array.
static INLINE_PRODUCTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\{[^{}]*"products"\s*:\s*\[[^\]]*\][^{}]*\}"#).expect("inline products pattern is valid")
});

/// How a product link is rebuilt from entry fields.
#[derive(Debug, Clone, Copy)]
pub enum UrlTemplate {
    /// `{base}{prefix}{id}/{slug}`; no link without an id.
    IdAndSlug { prefix: &'static str },
    /// `{base}{prefix}{slug}`; absolute or rooted slugs are used as-is.
    Slug { prefix: &'static str },
}

impl UrlTemplate {
    pub fn resolve(&self, base_url: &str, entry: &Value, synonyms: &FieldSynonyms) -> Option<String> {
        let base = base_url.trim_end_matches('/');
        match *self {
            Self::IdAndSlug { prefix } => {
                let id = fields::text_field(entry, synonyms.id)?;
                let slug = fields::text_field(entry, synonyms.slug).unwrap_or_default();
                Some(format!("{base}{prefix}{id}/{slug}"))
            }
            Self::Slug { prefix } => {
                let slug = fields::text_field(entry, synonyms.slug)?;
                if slug.starts_with("http://") || slug.starts_with("https://") {
                    Some(slug)
                } else if slug.starts_with('/') {
                    Some(format!("{base}{slug}"))
                } else {
                    Some(format!("{base}{prefix}{slug}"))
                }
            }
        }
    }
}

/// Reads server-rendered state and maps product entries through synonyms.
pub struct StructuredDataStrategy {
    base_url: String,
    collection_paths: &'static [&'static str],
    synonyms: FieldSynonyms,
    url_template: UrlTemplate,
}

impl StructuredDataStrategy {
    pub fn new(
        base_url: impl Into<String>,
        collection_paths: &'static [&'static str],
        synonyms: FieldSynonyms,
        url_template: UrlTemplate,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            collection_paths,
            synonyms,
            url_template,
        }
    }

    /// Every structured block the payload carries, in document order.
    fn locate_blocks(&self, payload: &Payload) -> ParsingResult<Vec<Value>> {
        match payload {
            Payload::Json(body) => serde_json::from_str(body)
                .map(|value| vec![value])
                .map_err(|e| ParsingError::MalformedStructuredData { message: e.to_string() }),
            Payload::Html(body) => Self::blocks_from_html(body),
            Payload::Text(_) => Err(ParsingError::UnsupportedPayload {
                strategy: self.name(),
                payload: payload.kind(),
            }),
        }
    }

    fn blocks_from_html(body: &str) -> ParsingResult<Vec<Value>> {
        let document = Html::parse_document(body);
        let mut blocks = Vec::new();
        let mut last_error = None;

        for script in document.select(&NEXT_DATA_SELECTOR) {
            let text = script.text().collect::<String>();
            match serde_json::from_str::<Value>(text.trim()) {
                Ok(value) => blocks.push(value),
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        for script in document.select(&SCRIPT_SELECTOR) {
            if script.value().id() == Some("__NEXT_DATA__") {
                continue;
            }
            let text = script.text().collect::<String>();
            if !text.contains("\"products\"") {
                continue;
            }
            if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
                blocks.push(value);
                continue;
            }
            for blob in INLINE_PRODUCTS.find_iter(&text) {
                match serde_json::from_str::<Value>(blob.as_str()) {
                    Ok(value) => blocks.push(value),
                    Err(e) => last_error = Some(e.to_string()),
                }
            }
        }

        if blocks.is_empty() {
            return Err(last_error.map_or(ParsingError::NoStructuredData, |message| {
                ParsingError::MalformedStructuredData { message }
            }));
        }
        Ok(blocks)
    }

    fn find_collection<'a>(&self, blocks: &'a [Value]) -> Option<(&'static str, &'a [Value])> {
        blocks.iter().find_map(|block| {
            self.collection_paths.iter().find_map(|path| match fields::lookup_path(block, path) {
                Some(Value::Array(items)) if !items.is_empty() => Some((*path, items.as_slice())),
                _ => None,
            })
        })
    }

    fn map_entry(&self, entry: &Value) -> ParsingResult<ProductCandidate> {
        if !entry.is_object() {
            return Err(ParsingError::NotAnObject);
        }
        let s = &self.synonyms;
        let name = fields::text_field(entry, s.name)
            .ok_or_else(|| ParsingError::required_field_missing("name", Some("structured entry")))?;

        Ok(ProductCandidate {
            price: fields::amount_field(entry, s.price),
            original_price: fields::amount_field(entry, s.original_price),
            discount: fields::discount_field(entry, s.discount),
            url: self.url_template.resolve(&self.base_url, entry, s),
            image_url: fields::text_field(entry, s.image),
            rating: fields::amount_field(entry, s.rating),
            available: fields::flag_field(entry, s.available),
            name: Some(name),
        })
    }
}

impl ExtractionStrategy for StructuredDataStrategy {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn extract(&self, payload: &Payload) -> ParsingResult<Vec<ParsingResult<ProductCandidate>>> {
        let blocks = self.locate_blocks(payload)?;
        let (path, entries) = self.find_collection(&blocks).ok_or_else(|| {
            ParsingError::ProductCollectionMissing {
                tried_paths: self.collection_paths.iter().map(ToString::to_string).collect(),
            }
        })?;

        debug!("Found {} structured entries at '{}'", entries.len(), path);
        Ok(entries.iter().map(|entry| self.map_entry(entry)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SYNONYMS: FieldSynonyms = FieldSynonyms {
        name: &["p_desc", "name"],
        price: &["sp", "sale_price", "price", "selling_price"],
        original_price: &["mrp"],
        discount: &["discount"],
        id: &["p_id", "id"],
        slug: &["slug"],
        image: &["image"],
        rating: &["rating"],
        available: &["availability"],
    };

    fn strategy() -> StructuredDataStrategy {
        StructuredDataStrategy::new(
            "https://shop.example",
            &["props.pageProps.products", "props.pageProps.tabData.products", "products"],
            SYNONYMS,
            UrlTemplate::IdAndSlug { prefix: "/pd/" },
        )
    }

    fn ok_items(result: ParsingResult<Vec<ParsingResult<ProductCandidate>>>) -> Vec<ProductCandidate> {
        result.unwrap().into_iter().filter_map(Result::ok).collect()
    }

    #[test]
    fn reads_next_data_alternate_path() {
        let html = r#"<html><body><script id="__NEXT_DATA__" type="application/json">
            {"props":{"pageProps":{"tabData":{"products":[
                {"p_id": 1204, "slug": "amul-butter", "p_desc": "Amul Butter 500 g", "sp": "275", "mrp": "300", "image": "https://img/1.jpg"},
                {"id": 9, "name": "Mother Dairy Butter", "selling_price": 260}
            ]}}}}
        </script></body></html>"#;

        let items = ok_items(strategy().extract(&Payload::Html(html.to_string())));
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name.as_deref(), Some("Amul Butter 500 g"));
        assert_eq!(items[0].price, Some(275.0));
        assert_eq!(items[0].original_price, Some(300.0));
        assert_eq!(items[0].url.as_deref(), Some("https://shop.example/pd/1204/amul-butter"));
        assert_eq!(items[1].price, Some(260.0));
    }

    #[test]
    fn reads_inline_products_blob() {
        let html = r#"<script>window.__STATE__ = {"page": 1, "products": [{"name": "Eggs 6 pc", "price": "54"}]};</script>"#;
        let items = ok_items(strategy().extract(&Payload::Html(html.to_string())));
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name.as_deref(), Some("Eggs 6 pc"));
        assert_eq!(items[0].url, None);
    }

    #[test]
    fn reads_raw_json_payload() {
        let body = r#"{"products": [{"name": "Atta 5kg", "sp": 245.5}, "garbage"]}"#;
        let result = strategy().extract(&Payload::Json(body.to_string())).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result[0].is_ok());
        assert_eq!(result[1], Err(ParsingError::NotAnObject));
    }

    #[test]
    fn missing_collection_is_a_tier_failure() {
        let html = r#"<script id="__NEXT_DATA__">{"props":{"pageProps":{"banner":"sale"}}}</script>"#;
        let err = strategy().extract(&Payload::Html(html.to_string())).unwrap_err();
        assert!(matches!(err, ParsingError::ProductCollectionMissing { .. }));
    }

    #[test]
    fn broken_json_is_reported_as_malformed() {
        let html = r#"<script id="__NEXT_DATA__">{"props": {</script>"#;
        let err = strategy().extract(&Payload::Html(html.to_string())).unwrap_err();
        assert!(matches!(err, ParsingError::MalformedStructuredData { .. }));
    }

    #[test]
    fn page_without_scripts_has_no_structured_data() {
        let err = strategy()
            .extract(&Payload::Html("<div>plain</div>".to_string()))
            .unwrap_err();
        assert_eq!(err, ParsingError::NoStructuredData);
    }

    #[test]
    fn slug_template_handles_rooted_and_absolute_links() {
        let synonyms = FieldSynonyms { slug: &["slug"], ..FieldSynonyms::default() };
        let template = UrlTemplate::Slug { prefix: "/p/" };
        let base = "https://www.jiomart.com/";

        let plain = serde_json::json!({ "slug": "amul-butter-500-g/590001" });
        let rooted = serde_json::json!({ "slug": "/p/groceries/amul/1" });
        let absolute = serde_json::json!({ "slug": "https://cdn.example/p/1" });

        assert_eq!(
            template.resolve(base, &plain, &synonyms).as_deref(),
            Some("https://www.jiomart.com/p/amul-butter-500-g/590001")
        );
        assert_eq!(
            template.resolve(base, &rooted, &synonyms).as_deref(),
            Some("https://www.jiomart.com/p/groceries/amul/1")
        );
        assert_eq!(template.resolve(base, &absolute, &synonyms).as_deref(), Some("https://cdn.example/p/1"));
    }
}
