//! Ordered selector chains over parsed HTML.
//!
//! Listing markup changes shape between pages and redesigns, so every field
//! is located by a list of selectors from most to least specific. The first
//! selector that yields a usable value wins.

use std::collections::HashSet;

use scraper::error::SelectorErrorKind;
use scraper::{ElementRef, Html, Selector};

use crate::utils::normalize_whitespace;

/// Selectors tried in order.
#[derive(Debug, Clone)]
pub struct SelectorChain {
    selectors: Vec<Selector>,
}

impl SelectorChain {
    pub fn new(selectors: &[&'static str]) -> Result<Self, SelectorErrorKind<'static>> {
        let selectors = selectors
            .iter()
            .copied()
            .map(Selector::parse)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { selectors })
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    /// First element matched by the earliest selector that matches anything.
    pub fn first<'a>(&self, scope: ElementRef<'a>) -> Option<ElementRef<'a>> {
        self.selectors
            .iter()
            .find_map(|selector| scope.select(selector).next())
    }

    /// Text of the first element per selector, skipping selectors whose
    /// first match has no visible text.
    pub fn first_text(&self, scope: ElementRef<'_>) -> Option<String> {
        self.selectors.iter().find_map(|selector| {
            scope
                .select(selector)
                .next()
                .map(element_text)
                .filter(|text| !text.is_empty())
        })
    }

    /// Apply `f` to every match of every selector in order and return the
    /// first `Some`.
    pub fn find_map<'a, T>(
        &self,
        scope: ElementRef<'a>,
        mut f: impl FnMut(ElementRef<'a>) -> Option<T>,
    ) -> Option<T> {
        for selector in &self.selectors {
            for element in scope.select(selector) {
                if let Some(value) = f(element) {
                    return Some(value);
                }
            }
        }
        None
    }

    /// Document-wide matches of the earliest selector group that matches
    /// anything, reduced to outermost elements.
    pub fn outermost_in<'a>(&self, document: &'a Html) -> Vec<ElementRef<'a>> {
        for selector in &self.selectors {
            let matches: Vec<ElementRef<'a>> = document.select(selector).collect();
            if !matches.is_empty() {
                return outermost(matches);
            }
        }
        Vec::new()
    }
}

/// A field extraction step: node and page URL in, value out.
pub type Strategy<T> = fn(ElementRef<'_>, &str) -> Option<T>;

/// Run strategies in order and return the first value produced.
pub fn first_success<T>(node: ElementRef<'_>, base_url: &str, strategies: &[Strategy<T>]) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(node, base_url))
}

/// Visible text of an element with whitespace collapsed.
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<String>())
}

/// First attribute from `names` that is present and non-blank.
pub fn first_attr<'a>(element: ElementRef<'a>, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .filter_map(|name| element.value().attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

/// Whether the element carries the given class.
pub fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Closest enclosing element satisfying `predicate` (the element itself excluded).
pub fn closest_ancestor<'a>(
    element: ElementRef<'a>,
    predicate: impl Fn(ElementRef<'a>) -> bool,
) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| predicate(*ancestor))
}

/// Closest enclosing anchor with an `href`.
pub fn ancestor_anchor(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    closest_ancestor(element, |e| {
        e.value().name() == "a" && e.value().attr("href").is_some()
    })
}

/// Drop elements nested inside another element of the same set.
pub fn outermost(elements: Vec<ElementRef<'_>>) -> Vec<ElementRef<'_>> {
    let ids: HashSet<_> = elements.iter().map(|e| e.id()).collect();
    elements
        .into_iter()
        .filter(|element| !element.ancestors().any(|ancestor| ids.contains(&ancestor.id())))
        .collect()
}
