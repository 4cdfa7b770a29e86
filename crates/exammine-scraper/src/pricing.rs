//! Price lookups: one pharmacy search page, first few product cards.

use scraper::{ElementRef, Html, Selector};

use crate::client::PageFetcher;
use crate::error::ScraperError;
use crate::extract::{
    compile_selector, resolve_url, select_all, select_attr, select_text, text_or,
    FALLBACK_PRODUCT_NAME,
};
use crate::price::parse_price;
use crate::profile::PriceSourceProfile;
use crate::types::{Product, SourcePrices};

/// Looks `query` up on one pharmacy, reading at most `max_cards` cards.
///
/// Returns `Ok(None)` when no card yields a named product with a parseable
/// price.
///
/// # Errors
///
/// Propagates fetch failures and invalid profile selectors.
pub async fn lookup_prices(
    fetcher: &PageFetcher,
    profile: &PriceSourceProfile,
    query: &str,
    max_cards: usize,
) -> Result<Option<SourcePrices>, ScraperError> {
    let search_url = profile.search_url_for(query);
    tracing::debug!(source = %profile.name, url = %search_url, "searching price source");

    let html = fetcher.fetch_html(&search_url).await?;
    let products = parse_product_cards(&html, profile, max_cards)?;

    if products.is_empty() {
        tracing::info!(source = %profile.name, query, "no priced products found");
        return Ok(None);
    }

    tracing::info!(
        source = %profile.name,
        query,
        products = products.len(),
        "parsed priced products"
    );
    Ok(Some(SourcePrices {
        source_name: profile.name.clone(),
        source_url: search_url,
        products,
    }))
}

struct CardSelectors {
    card: Selector,
    name: Selector,
    price: Selector,
    link: Selector,
}

impl CardSelectors {
    fn compile(profile: &PriceSourceProfile) -> Result<Self, ScraperError> {
        Ok(Self {
            card: compile_selector(&profile.card)?,
            name: compile_selector(&profile.card_name)?,
            price: compile_selector(&profile.card_price)?,
            link: compile_selector(&profile.card_link)?,
        })
    }
}

/// Parses the first `max_cards` product cards of a search page.
///
/// Cards whose name element is missing get the fallback name; cards with an
/// empty name or an unparseable price are dropped.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidSelector`] for malformed profile selectors.
pub fn parse_product_cards(
    html: &str,
    profile: &PriceSourceProfile,
    max_cards: usize,
) -> Result<Vec<Product>, ScraperError> {
    let selectors = CardSelectors::compile(profile)?;
    let document = Html::parse_document(html);
    let cards = select_all(document.root_element(), &selectors.card);
    tracing::debug!(source = %profile.name, cards = cards.len(), "found product cards");

    Ok(cards
        .into_iter()
        .take(max_cards)
        .filter_map(|card| parse_card(card, &selectors, profile))
        .collect())
}

fn parse_card(
    card: ElementRef<'_>,
    selectors: &CardSelectors,
    profile: &PriceSourceProfile,
) -> Option<Product> {
    let name = text_or(select_text(card, &selectors.name), FALLBACK_PRODUCT_NAME);
    if name.is_empty() {
        return None;
    }

    let price_text = select_text(card, &selectors.price).unwrap_or_default();
    let Some(price) = parse_price(&price_text) else {
        tracing::debug!(source = %profile.name, price_text = %price_text, "skipping card without a price");
        return None;
    };

    let url = select_attr(card, &selectors.link, "href")
        .filter(|href| !href.is_empty())
        .map(|href| resolve_url(&profile.base_url, &href));

    Some(Product {
        name,
        price,
        price_text,
        source: profile.name.clone(),
        url,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::profile::default_price_sources;

    fn drogasil() -> PriceSourceProfile {
        default_price_sources()
            .into_iter()
            .find(|p| p.name == "Drogasil")
            .unwrap()
    }

    fn card(name: Option<&str>, price: &str, href: Option<&str>) -> String {
        let name = name
            .map(|n| format!(r#"<h2 class="ProductCard__title">{n}</h2>"#))
            .unwrap_or_default();
        let link = href
            .map(|h| format!(r#"<a class="ProductCard__link" href="{h}">ver</a>"#))
            .unwrap_or_default();
        format!(
            r#"<div class="ProductCard">{name}<span class="ProductPrice__value">{price}</span>{link}</div>"#
        )
    }

    #[test]
    fn parses_name_price_and_resolved_link() {
        let html = card(Some("Dipirona 500mg"), "R$ 12,90", Some("/dipirona-500mg.html"));
        let products = parse_product_cards(&html, &drogasil(), 5).unwrap();
        assert_eq!(products.len(), 1);
        let p = &products[0];
        assert_eq!(p.name, "Dipirona 500mg");
        assert_eq!(p.price, Decimal::new(1290, 2));
        assert_eq!(p.price_text, "R$ 12,90");
        assert_eq!(p.source, "Drogasil");
        assert_eq!(
            p.url.as_deref(),
            Some("https://www.drogasil.com.br/dipirona-500mg.html")
        );
    }

    #[test]
    fn drops_cards_with_unparseable_price() {
        let html = [
            card(Some("A"), "Indisponível", None),
            card(Some("B"), "R$ 3,50", None),
        ]
        .concat();
        let products = parse_product_cards(&html, &drogasil(), 5).unwrap();
        let names: Vec<&str> = products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B"]);
        assert!(products[0].url.is_none());
    }

    #[test]
    fn missing_name_element_uses_fallback() {
        let html = card(None, "R$ 7,00", None);
        let products = parse_product_cards(&html, &drogasil(), 5).unwrap();
        assert_eq!(products[0].name, "Nome não disponível");
    }

    #[test]
    fn empty_name_is_dropped() {
        let html = card(Some("   "), "R$ 7,00", None);
        assert!(parse_product_cards(&html, &drogasil(), 5)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn only_first_max_cards_are_read() {
        let html: String = (1..=8)
            .map(|i| card(Some(&format!("P{i}")), &format!("R$ {i},00"), None))
            .collect();
        let products = parse_product_cards(&html, &drogasil(), 5).unwrap();
        assert_eq!(products.len(), 5);
        assert_eq!(products[4].name, "P5");
    }

    #[test]
    fn zero_max_cards_yields_nothing() {
        let html = card(Some("A"), "R$ 1,00", None);
        assert!(parse_product_cards(&html, &drogasil(), 0).unwrap().is_empty());
    }
}
