//! Thin helpers over the `scraper` crate used by every source profile.
//!
//! All helpers are total: a selector that matches nothing yields `None` or an
//! empty `Vec`, never a panic.

use scraper::{ElementRef, Selector};

use crate::error::ScraperError;

/// Fallback for missing information sections.
pub const FALLBACK_SECTION: &str = "Informação não disponível";
/// Fallback for product cards without a name element.
pub const FALLBACK_PRODUCT_NAME: &str = "Nome não disponível";
/// Fallback for detail pages without a manufacturer element.
pub const FALLBACK_MANUFACTURER: &str = "Não informado";

/// Compiles a CSS selector taken from a source profile.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidSelector`] when `selector` is not valid CSS.
pub fn compile_selector(selector: &str) -> Result<Selector, ScraperError> {
    Selector::parse(selector).map_err(|e| ScraperError::InvalidSelector {
        selector: selector.to_owned(),
        reason: e.to_string(),
    })
}

/// Concatenated text of `element` and its descendants, trimmed.
#[must_use]
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_owned()
}

/// Trimmed text of the first element under `root` matching `selector`.
#[must_use]
pub fn select_text(root: ElementRef<'_>, selector: &Selector) -> Option<String> {
    root.select(selector).next().map(element_text)
}

/// Attribute value of the first element under `root` matching `selector`.
///
/// Only the first match is consulted: if it lacks `attr` the result is `None`.
#[must_use]
pub fn select_attr(root: ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    root.select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(|v| v.trim().to_owned())
}

/// Every element under `root` matching `selector`, in document order.
#[must_use]
pub fn select_all<'a>(root: ElementRef<'a>, selector: &Selector) -> Vec<ElementRef<'a>> {
    root.select(selector).collect()
}

/// `value` when present, otherwise the literal `fallback` copy.
#[must_use]
pub fn text_or(value: Option<String>, fallback: &str) -> String {
    value.unwrap_or_else(|| fallback.to_owned())
}

/// Resolves a possibly relative `href` against a site's base URL.
///
/// Anything already starting with `http` is returned unchanged.
#[must_use]
pub fn resolve_url(base_url: &str, href: &str) -> String {
    if href.starts_with("http") {
        return href.to_owned();
    }
    let base = base_url.trim_end_matches('/');
    if href.starts_with('/') {
        format!("{base}{href}")
    } else {
        format!("{base}/{href}")
    }
}
