//! Tier 2: CSS selector extraction with per-field fallbacks
//!
//! Robust HTML parsing for listing pages: every logical field has an ordered
//! list of selectors, and the first one that matches non-empty content wins.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use url::Url;

use super::{ExtractionStrategy, ParsingError, ParsingResult, Payload};
use crate::domain::ProductCandidate;
use crate::domain::pricing::{contains_currency_amount, find_currency_amount, parse_price};

/// Used when no configured container selector matches anything.
static FALLBACK_CONTAINER: Lazy<Selector> =
    Lazy::new(|| Selector::parse("article, li, div").expect("static selector is valid"));

static RATING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)").expect("rating pattern is valid"));

const MIN_NAME_CHARS: usize = 4;

/// CSS selectors for listing pages - multiple fallbacks per field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorConfig {
    pub product_container: Vec<String>,
    pub name: Vec<String>,
    pub price: Vec<String>,
    pub original_price: Vec<String>,
    pub rating: Vec<String>,
    pub link: Vec<String>,
    pub image: Vec<String>,
}

impl SelectorConfig {
    pub fn strings(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }
}

/// Parser for product cards on a rendered listing page.
pub struct DomSelectorStrategy {
    base_url: String,
    container_selectors: Vec<Selector>,
    name_selectors: Vec<Selector>,
    price_selectors: Vec<Selector>,
    original_price_selectors: Vec<Selector>,
    rating_selectors: Vec<Selector>,
    link_selectors: Vec<Selector>,
    image_selectors: Vec<Selector>,
}

impl DomSelectorStrategy {
    pub fn new(base_url: impl Into<String>, selectors: &SelectorConfig) -> ParsingResult<Self> {
        Ok(Self {
            base_url: base_url.into(),
            container_selectors: Self::compile_selectors(&selectors.product_container, true)?,
            name_selectors: Self::compile_selectors(&selectors.name, true)?,
            price_selectors: Self::compile_selectors(&selectors.price, false)?,
            original_price_selectors: Self::compile_selectors(&selectors.original_price, false)?,
            rating_selectors: Self::compile_selectors(&selectors.rating, false)?,
            link_selectors: Self::compile_selectors(&selectors.link, false)?,
            image_selectors: Self::compile_selectors(&selectors.image, false)?,
        })
    }

    /// Compile selector strings, skipping invalid ones.
    ///
    /// Fails only when `required` and nothing compiled.
    fn compile_selectors(selector_strings: &[String], required: bool) -> ParsingResult<Vec<Selector>> {
        let mut selectors = Vec::with_capacity(selector_strings.len());
        let mut last_error = None;

        for selector_str in selector_strings {
            match Selector::parse(selector_str) {
                Ok(selector) => selectors.push(selector),
                Err(e) => {
                    warn!("Failed to compile selector '{}': {}", selector_str, e);
                    last_error = Some(ParsingError::invalid_selector(selector_str, &e.to_string()));
                }
            }
        }

        if required && selectors.is_empty() {
            return Err(last_error.unwrap_or_else(|| ParsingError::invalid_selector("", "empty selector list")));
        }
        Ok(selectors)
    }

    /// Product cards from the first container selector that matches.
    ///
    /// When none does, any element holding both a name and a currency amount
    /// is a card, and only the innermost such elements are kept: a wrapper
    /// around several cards would mix one card's name with another's link.
    fn find_containers<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for (i, selector) in self.container_selectors.iter().enumerate() {
            let elements: Vec<ElementRef> = document.select(selector).collect();
            if !elements.is_empty() {
                debug!("Found {} product containers using selector #{}", elements.len(), i);
                return elements;
            }
        }

        let candidates: Vec<ElementRef> = document
            .select(&FALLBACK_CONTAINER)
            .filter(|element| {
                contains_currency_amount(&element.text().collect::<String>())
                    && self.extract_name(element).is_some()
            })
            .collect();
        let candidate_ids: HashSet<_> = candidates.iter().map(|element| element.id()).collect();

        let innermost: Vec<ElementRef> = candidates
            .into_iter()
            .filter(|element| {
                !element
                    .descendants()
                    .skip(1)
                    .any(|node| candidate_ids.contains(&node.id()))
            })
            .collect();
        debug!("Fallback found {} innermost product cards", innermost.len());
        innermost
    }

    fn extract_product_from_element(&self, element: &ElementRef) -> ParsingResult<ProductCandidate> {
        let name = self
            .extract_name(element)
            .ok_or_else(|| ParsingError::required_field_missing("name", Some("product card")))?;

        let price = self.extract_price(element).ok_or_else(|| ParsingError::InvalidPrice {
            raw: first_text(element, &self.price_selectors).unwrap_or_default(),
            item: name.clone(),
        })?;

        let original_price = self
            .price_selectors_text(element, &self.original_price_selectors)
            .find(|original| *original > price);

        let rating = self.rating_selectors.iter().find_map(|selector| {
            let text = text_of(&element.select(selector).next()?);
            RATING_NUMBER.captures(&text)?.get(1)?.as_str().parse::<f64>().ok()
        });

        Ok(ProductCandidate {
            name: Some(name),
            price: Some(price),
            original_price,
            discount: None,
            url: self.extract_link(element),
            image_url: self.extract_image(element),
            rating,
            available: None,
        })
    }

    fn extract_name(&self, element: &ElementRef) -> Option<String> {
        self.name_selectors.iter().find_map(|selector| {
            let found = element.select(selector).next()?;
            let text = text_of(&found);
            let name = if text.is_empty() {
                found.value().attr("title").map(str::trim).unwrap_or_default().to_string()
            } else {
                text
            };
            (name.chars().count() >= MIN_NAME_CHARS).then_some(name)
        })
    }

    /// Configured price selectors first, then any currency-looking text node.
    fn extract_price(&self, element: &ElementRef) -> Option<f64> {
        self.price_selectors_text(element, &self.price_selectors)
            .find(|price| *price > 0.0)
            .or_else(|| {
                element
                    .text()
                    .filter_map(find_currency_amount)
                    .find(|price| *price > 0.0)
            })
    }

    fn price_selectors_text<'s>(
        &'s self,
        element: &'s ElementRef,
        selectors: &'s [Selector],
    ) -> impl Iterator<Item = f64> + 's {
        selectors.iter().filter_map(move |selector| {
            let found = element.select(selector).next()?;
            parse_price(&text_of(&found))
        })
    }

    fn extract_link(&self, element: &ElementRef) -> Option<String> {
        self.link_selectors.iter().find_map(|selector| {
            let href = element.select(selector).next()?.value().attr("href")?;
            match resolve_url(href, &self.base_url) {
                Ok(url) => Some(url),
                Err(e) => {
                    debug!("Skipping product link: {}", e);
                    None
                }
            }
        })
    }

    fn extract_image(&self, element: &ElementRef) -> Option<String> {
        self.image_selectors.iter().find_map(|selector| {
            let image = element.select(selector).next()?;
            image
                .value()
                .attr("src")
                .or_else(|| image.value().attr("data-src"))
                .map(str::trim)
                .filter(|src| !src.is_empty())
                .map(ToString::to_string)
        })
    }
}

impl ExtractionStrategy for DomSelectorStrategy {
    fn name(&self) -> &'static str {
        "selectors"
    }

    fn extract(&self, payload: &Payload) -> ParsingResult<Vec<ParsingResult<ProductCandidate>>> {
        let Payload::Html(body) = payload else {
            return Err(ParsingError::UnsupportedPayload {
                strategy: self.name(),
                payload: payload.kind(),
            });
        };

        let document = Html::parse_document(body);
        let containers = self.find_containers(&document);
        if containers.is_empty() {
            return Err(ParsingError::NoProductsFound {
                tried_selectors: self.container_selectors.len(),
            });
        }

        Ok(containers
            .iter()
            .map(|element| self.extract_product_from_element(element))
            .collect())
    }
}

fn text_of(element: &ElementRef) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_text(element: &ElementRef, selectors: &[Selector]) -> Option<String> {
    selectors
        .iter()
        .find_map(|selector| element.select(selector).next().map(|found| text_of(&found)))
}

/// Resolve relative links against the source's base URL.
pub fn resolve_url(href: &str, base_url: &str) -> ParsingResult<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return Err(ParsingError::required_field_missing("href", Some(base_url)));
    }
    if href.starts_with("http://") || href.starts_with("https://") {
        return Ok(href.to_string());
    }

    let base = Url::parse(base_url)
        .map_err(|e| ParsingError::invalid_selector(base_url, &format!("Invalid base URL: {e}")))?;
    base.join(href)
        .map(String::from)
        .map_err(|e| ParsingError::invalid_selector(href, &format!("Failed to join URL: {e}")))
}
