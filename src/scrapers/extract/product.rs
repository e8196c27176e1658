//! Product card extraction.

use std::sync::LazyLock;

use rust_decimal::Decimal;
use scraper::{ElementRef, Html};
use tracing::debug;

use super::select::{
    ancestor_anchor, closest_ancestor, element_text, first_attr, first_success, has_class,
    SelectorChain, Strategy,
};
use super::{parse_base, ExtractionError};
use crate::models::ProductRecord;
use crate::scrapers::price::{is_valid_price, parse_price};
use crate::utils::{external_id_from_link, normalize_whitespace, resolve_url, sanitize_text};

/// Class of the site's product cards.
const PAGING_CARD_CLASS: &str = "b-paging-product";

/// Attribute holding a pre-rendered price value.
const PRICE_ATTR: &str = "event-viewitem-price";

/// Product containers, as groups: the first group that matches anything on
/// the page is used.
static PRODUCT_NODES: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&[
        r#".b-paging-product, .product.b-paging-product, [class*="b-paging-product--vertical"]"#,
        ".product-item, .product",
        r#"[class*="product"]"#,
    ])
    .unwrap()
});

static NAME: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&[
        ".product-name",
        ".product-title",
        "h2",
        "h3",
        r#"[class*="name"]"#,
        r#"[class*="title"]"#,
    ])
    .unwrap()
});

static PRICE_ATTR_NODES: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&["[event-viewitem-price]"]).unwrap());

static PRICE_ELEMENT: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&[
        ".b-paging-product__price",
        r#"[class*="b-paging-product__price"]"#,
        ".price",
        ".product-price",
        r#"[class*="price"]"#,
    ])
    .unwrap()
});

static IMAGE: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&[
        "img.lazy",
        r#"img[class*="lazy"]"#,
        r#"[class*="lazy"] img"#,
        ".product-image img",
        r#"[class*="image"] img"#,
        "img",
    ])
    .unwrap()
});

static LINK: LazyLock<SelectorChain> =
    LazyLock::new(|| SelectorChain::new(&["a[href]"]).unwrap());

static SPECS: LazyLock<SelectorChain> = LazyLock::new(|| {
    SelectorChain::new(&[".specs", ".product-specs", r#"[class*="spec"]"#]).unwrap()
});

/// Image attributes in preference order; lazy loaders keep the real URL
/// out of `src` until the image scrolls into view.
const IMAGE_ATTRS: &[&str] = &["data-src", "data-lazy-src", "data-original", "src"];

const PRICE_DATA_ATTRS: &[&str] = &["data-price", "data-price-value", "content"];

/// Product containers on a page.
pub fn product_nodes(document: &Html) -> Vec<ElementRef<'_>> {
    PRODUCT_NODES.outermost_in(document)
}

fn name_from_chain(node: ElementRef<'_>, _base_url: &str) -> Option<String> {
    NAME.first_text(node).and_then(|text| sanitize_text(&text))
}

fn image_from_lazy_attrs(node: ElementRef<'_>, base_url: &str) -> Option<String> {
    IMAGE.find_map(node, |img| {
        IMAGE_ATTRS
            .iter()
            .filter_map(|attr| img.value().attr(attr))
            .map(str::trim)
            .filter(|value| !value.is_empty() && !value.starts_with("data:"))
            .find_map(|value| resolve_url(base_url, value))
    })
}

fn link_within(node: ElementRef<'_>, base_url: &str) -> Option<String> {
    LINK.find_map(node, |a| {
        a.value()
            .attr("href")
            .and_then(|href| resolve_url(base_url, href))
    })
}

fn link_from_ancestor(node: ElementRef<'_>, base_url: &str) -> Option<String> {
    ancestor_anchor(node)
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| resolve_url(base_url, href))
}

fn specs_text(node: ElementRef<'_>, _base_url: &str) -> Option<String> {
    SPECS.first_text(node).and_then(|text| sanitize_text(&text))
}

const NAME_STRATEGIES: &[Strategy<String>] = &[name_from_chain];
const IMAGE_STRATEGIES: &[Strategy<String>] = &[image_from_lazy_attrs];
const LINK_STRATEGIES: &[Strategy<String>] = &[link_within, link_from_ancestor];
const SPECS_STRATEGIES: &[Strategy<String>] = &[specs_text];

/// Where price candidates are searched: the enclosing product card when the
/// node sits inside one.
fn price_scope(node: ElementRef<'_>) -> ElementRef<'_> {
    if has_class(node, PAGING_CARD_CLASS) {
        return node;
    }
    closest_ancestor(node, |e| has_class(e, PAGING_CARD_CLASS)).unwrap_or(node)
}

/// Raw price texts in preference order.
fn price_candidates(node: ElementRef<'_>) -> Vec<String> {
    let scope = price_scope(node);
    let mut candidates = Vec::new();

    if let Some(value) = scope.value().attr(PRICE_ATTR) {
        candidates.push(value.trim().to_string());
    }
    for selector in PRICE_ATTR_NODES.selectors() {
        for element in scope.select(selector) {
            if let Some(value) = element.value().attr(PRICE_ATTR) {
                candidates.push(value.trim().to_string());
            }
        }
    }

    if let Some(element) = PRICE_ELEMENT.first(scope) {
        candidates.push(element_text(element));
        if let Some(value) = first_attr(element, PRICE_DATA_ATTRS) {
            candidates.push(normalize_whitespace(value));
        }
    }

    candidates.retain(|text| !text.is_empty());
    candidates
}

enum PriceOutcome {
    Accepted(Decimal),
    Rejected { value: Decimal, text: String },
    Absent,
}

/// First plausible price among the candidates. Implausible values are only
/// reported when no candidate was plausible.
fn resolve_price(candidates: &[String]) -> PriceOutcome {
    let mut rejected = None;
    for text in candidates {
        let Some(value) = parse_price(text) else {
            continue;
        };
        if is_valid_price(value, text) {
            return PriceOutcome::Accepted(value);
        }
        debug!("Price candidate {} from '{}' rejected", value, text);
        rejected.get_or_insert((value, text.clone()));
    }
    match rejected {
        Some((value, text)) => PriceOutcome::Rejected { value, text },
        None => PriceOutcome::Absent,
    }
}

/// Extract a product from its container node.
///
/// Returns `Ok(None)` when the node has no name. A node whose price
/// candidates all parse to implausible values is refused with
/// [`ExtractionError::ImplausiblePrice`]; a node with no parsable price
/// candidate is kept with no price.
pub fn extract_product(
    node: ElementRef<'_>,
    base_url: &str,
) -> Result<Option<ProductRecord>, ExtractionError> {
    parse_base(base_url)?;

    let Some(name) = first_success(node, base_url, NAME_STRATEGIES) else {
        return Ok(None);
    };

    let price = match resolve_price(&price_candidates(node)) {
        PriceOutcome::Accepted(value) => Some(value),
        PriceOutcome::Absent => None,
        PriceOutcome::Rejected { value, text } => {
            return Err(ExtractionError::ImplausiblePrice { name, value, text });
        }
    };

    let link = first_success(node, base_url, LINK_STRATEGIES);
    let external_id = link.as_deref().map(external_id_from_link);

    Ok(Some(ProductRecord {
        name,
        price,
        image: first_success(node, base_url, IMAGE_STRATEGIES),
        link,
        specs: first_success(node, base_url, SPECS_STRATEGIES),
        external_id,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const BASE: &str = "https://www.shoptok.si/televizorji/cene/206";

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn extract_all(html: &str) -> Vec<Result<Option<ProductRecord>, ExtractionError>> {
        let document = Html::parse_document(html);
        product_nodes(&document)
            .into_iter()
            .map(|node| extract_product(node, BASE))
            .collect()
    }

    #[test]
    fn test_builtin_selectors_compile() {
        for chain in [
            &PRODUCT_NODES,
            &NAME,
            &PRICE_ATTR_NODES,
            &PRICE_ELEMENT,
            &IMAGE,
            &LINK,
            &SPECS,
        ] {
            assert!(!LazyLock::force(chain).selectors().is_empty());
        }
    }

    #[test]
    fn test_full_paging_card() {
        let html = r#"
            <div class="b-paging-product b-paging-product--vertical">
              <a href="/televizorji/samsung-qe55q60/cena/123456">
                <img class="lazy" src="data:image/gif;base64,R0lGOD" data-src="/img/qe55.webp">
              </a>
              <h3 class="l3-product-title">Samsung   QE55Q60 &amp; more</h3>
              <div class="b-paging-product__price">599,99 €</div>
              <div class="specs">55" <b>QLED</b></div>
            </div>"#;
        let results = extract_all(html);
        assert_eq!(results.len(), 1);
        let product = results.into_iter().next().unwrap().unwrap().unwrap();
        assert_eq!(product.name, "Samsung QE55Q60 &amp; more");
        assert_eq!(product.price, Some(dec("599.99")));
        assert_eq!(
            product.image.as_deref(),
            Some("https://www.shoptok.si/img/qe55.webp")
        );
        assert_eq!(
            product.link.as_deref(),
            Some("https://www.shoptok.si/televizorji/samsung-qe55q60/cena/123456")
        );
        assert_eq!(product.external_id.as_deref(), Some("123456"));
        assert_eq!(product.specs.as_deref(), Some("55&quot; QLED"));
    }

    #[test]
    fn test_price_attribute_preferred() {
        let html = r#"
            <div class="b-paging-product">
              <h3>LG OLED55</h3>
              <span event-viewitem-price="1099.00"></span>
              <div class="b-paging-product__price">od 999,00 €</div>
            </div>"#;
        let product = extract_all(html).remove(0).unwrap().unwrap();
        assert_eq!(product.price, Some(dec("1099.00")));
    }

    #[test]
    fn test_price_data_attribute_fallback() {
        let html = r#"
            <div class="product-item">
              <h2>Philips 43PUS</h2>
              <span class="price" data-price="449.90"></span>
            </div>"#;
        let product = extract_all(html).remove(0).unwrap().unwrap();
        assert_eq!(product.price, Some(dec("449.90")));
    }

    #[test]
    fn test_implausible_price_rejects_node() {
        let html = r#"
            <div class="product-item"><h2>TV A</h2><span class="price">599,99 €</span></div>
            <div class="product-item"><h2>TV B</h2><span class="price">model 4302</span></div>"#;
        let results = extract_all(html);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().as_ref().unwrap().name, "TV A");
        assert!(matches!(
            results[1],
            Err(ExtractionError::ImplausiblePrice { ref name, .. }) if name == "TV B"
        ));
    }

    #[test]
    fn test_missing_price_kept_without_price() {
        let html = r#"<div class="product-item"><h2>Sony Bravia</h2><span class="price">Pokliči</span></div>"#;
        let product = extract_all(html).remove(0).unwrap().unwrap();
        assert_eq!(product.price, None);
        assert_eq!(product.link, None);
        assert_eq!(product.external_id, None);
    }

    #[test]
    fn test_missing_name_yields_none() {
        let html = r#"<div class="product-item"><span class="price">599,99 €</span></div>"#;
        assert!(extract_all(html).remove(0).unwrap().is_none());
    }

    #[test]
    fn test_link_from_wrapping_anchor() {
        let html = r#"
            <a href="/p/tcl-55c805/77881">
              <div class="product-item"><h2>TCL 55C805</h2></div>
            </a>"#;
        let product = extract_all(html).remove(0).unwrap().unwrap();
        assert_eq!(
            product.link.as_deref(),
            Some("https://www.shoptok.si/p/tcl-55c805/77881")
        );
        assert_eq!(product.external_id.as_deref(), Some("77881"));
    }

    #[test]
    fn test_price_scope_is_enclosing_card() {
        let document = Html::parse_document(
            r#"<div class="b-paging-product">
                 <div class="inner"><h3>Hisense</h3></div>
                 <div class="b-paging-product__price">349,00 €</div>
               </div>"#,
        );
        let inner = document
            .select(&scraper::Selector::parse(".inner").unwrap())
            .next()
            .unwrap();
        let product = extract_product(inner, BASE).unwrap().unwrap();
        assert_eq!(product.price, Some(dec("349.00")));
    }

    #[test]
    fn test_generic_product_fallback_group() {
        let html = r#"<ul><li class="tv-product-card"><h3>Generic</h3></li></ul>"#;
        let results = extract_all(html);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap().as_ref().unwrap().name, "Generic");
    }

    #[test]
    fn test_invalid_base_url() {
        let document = Html::parse_document(r#"<div class="product"><h2>X</h2></div>"#);
        let node = product_nodes(&document).remove(0);
        assert!(matches!(
            extract_product(node, "not a url"),
            Err(ExtractionError::BaseUrl { .. })
        ));
    }
}
