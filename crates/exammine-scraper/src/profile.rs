//! Source profiles: where to search and which selectors to read.
//!
//! The built-in profiles cover the sites the service scrapes by default. An
//! operator can replace them with a YAML file (see `config/sources.yaml`).

use std::collections::HashSet;
use std::path::Path;

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};

use crate::error::ScraperError;
use crate::extract::compile_selector;

/// Placeholder substituted with the URL-encoded query in `search_url`.
pub const QUERY_PLACEHOLDER: &str = "{query}";

/// A drug-information site: search page, then first result's detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoSourceProfile {
    pub name: String,
    pub search_url: String,
    pub base_url: String,
    /// Selector for the first search result link; its `href` is followed.
    pub result_link: String,
    pub layout: InfoLayout,
}

/// How a detail page is laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InfoLayout {
    /// Bula pages made of headed blocks, keyed by lower-cased heading.
    SectionBlocks {
        title: String,
        manufacturer: String,
        block: String,
        block_title: String,
        block_content: String,
    },
    /// Product pages with a description and a label/value specification list.
    Specifications {
        title: String,
        manufacturer: String,
        description: String,
        spec_item: String,
        spec_label: String,
        spec_value: String,
    },
}

/// A pharmacy whose search page lists product cards with prices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceSourceProfile {
    pub name: String,
    pub search_url: String,
    pub base_url: String,
    pub card: String,
    pub card_name: String,
    pub card_price: String,
    pub card_link: String,
}

impl InfoSourceProfile {
    #[must_use]
    pub fn search_url_for(&self, query: &str) -> String {
        build_search_url(&self.search_url, query)
    }

    fn selectors(&self) -> Vec<&str> {
        let mut selectors = vec![self.result_link.as_str()];
        match &self.layout {
            InfoLayout::SectionBlocks {
                title,
                manufacturer,
                block,
                block_title,
                block_content,
            } => selectors.extend([
                title.as_str(),
                manufacturer.as_str(),
                block.as_str(),
                block_title.as_str(),
                block_content.as_str(),
            ]),
            InfoLayout::Specifications {
                title,
                manufacturer,
                description,
                spec_item,
                spec_label,
                spec_value,
            } => selectors.extend([
                title.as_str(),
                manufacturer.as_str(),
                description.as_str(),
                spec_item.as_str(),
                spec_label.as_str(),
                spec_value.as_str(),
            ]),
        }
        selectors
    }
}

impl PriceSourceProfile {
    #[must_use]
    pub fn search_url_for(&self, query: &str) -> String {
        build_search_url(&self.search_url, query)
    }

    fn selectors(&self) -> [&str; 4] {
        [
            self.card.as_str(),
            self.card_name.as_str(),
            self.card_price.as_str(),
            self.card_link.as_str(),
        ]
    }
}

/// Substitutes the URL-encoded `query` into a search URL template.
#[must_use]
pub fn build_search_url(template: &str, query: &str) -> String {
    let encoded = utf8_percent_encode(query.trim(), NON_ALPHANUMERIC).to_string();
    template.replace(QUERY_PLACEHOLDER, &encoded)
}

/// Information sources in priority order.
#[must_use]
pub fn default_info_sources() -> Vec<InfoSourceProfile> {
    vec![
        InfoSourceProfile {
            name: "bulas.med.br".to_owned(),
            search_url: "https://bulas.med.br/search?q={query}".to_owned(),
            base_url: "https://bulas.med.br".to_owned(),
            result_link: "div.col-lg-9 ul.search-results li a[href]".to_owned(),
            layout: InfoLayout::SectionBlocks {
                title: "h1.product-title".to_owned(),
                manufacturer: "span.manufacturer".to_owned(),
                block: "div.info-block".to_owned(),
                block_title: "h2.info-title".to_owned(),
                block_content: "div.info-content".to_owned(),
            },
        },
        InfoSourceProfile {
            name: "remedios.com.br".to_owned(),
            search_url: "https://remedios.com.br/busca?termo={query}".to_owned(),
            base_url: "https://remedios.com.br".to_owned(),
            result_link: "a.ProductCard_container__j43SM".to_owned(),
            layout: InfoLayout::Specifications {
                title: "h1.ProductInfo_name__qA56Y".to_owned(),
                manufacturer: "div.ProductInfo_manufacturer__l_FRc".to_owned(),
                description: "div.ProductDescription_content__BwrMt".to_owned(),
                spec_item: "li.ProductSpecification_item__xJO4M".to_owned(),
                spec_label: "span.ProductSpecification_label__aDQsa".to_owned(),
                spec_value: "span.ProductSpecification_value__sLXCJ".to_owned(),
            },
        },
    ]
}

/// Pharmacy price sources in reporting order.
#[must_use]
pub fn default_price_sources() -> Vec<PriceSourceProfile> {
    vec![
        PriceSourceProfile {
            name: "Consulta Remédios".to_owned(),
            search_url: "https://consultaremedios.com.br/busca?termo={query}".to_owned(),
            base_url: "https://consultaremedios.com.br".to_owned(),
            card: r#"div[data-testid="product-card"]"#.to_owned(),
            card_name: r#"h2[data-testid="product-card-title"]"#.to_owned(),
            card_price: r#"span[data-testid="product-card-price-value"]"#.to_owned(),
            card_link: "a[href]".to_owned(),
        },
        PriceSourceProfile {
            name: "Drogasil".to_owned(),
            search_url: "https://www.drogasil.com.br/search?w={query}".to_owned(),
            base_url: "https://www.drogasil.com.br".to_owned(),
            card: "div.ProductCard".to_owned(),
            card_name: "h2.ProductCard__title".to_owned(),
            card_price: "span.ProductPrice__value".to_owned(),
            card_link: "a.ProductCard__link".to_owned(),
        },
        PriceSourceProfile {
            name: "Ultrafarma".to_owned(),
            search_url: "https://www.ultrafarma.com.br/busca?t={query}".to_owned(),
            base_url: "https://www.ultrafarma.com.br".to_owned(),
            card: "div.boxProduto".to_owned(),
            card_name: "a.prodTitle".to_owned(),
            card_price: "span.boxPreco".to_owned(),
            card_link: "a.prodTitle".to_owned(),
        },
        PriceSourceProfile {
            name: "Panvel".to_owned(),
            search_url: "https://www.panvel.com/panvel/buscarProduto.do?termoPesquisa={query}"
                .to_owned(),
            base_url: "https://www.panvel.com".to_owned(),
            card: "div.boxProdutos".to_owned(),
            card_name: "a.nomeLink".to_owned(),
            card_price: "div.preco".to_owned(),
            card_link: "a.nomeLink".to_owned(),
        },
    ]
}

/// The full set of profiles the aggregator runs with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcesFile {
    #[serde(default = "default_info_sources")]
    pub info: Vec<InfoSourceProfile>,
    #[serde(default = "default_price_sources")]
    pub prices: Vec<PriceSourceProfile>,
}

impl Default for SourcesFile {
    fn default() -> Self {
        Self {
            info: default_info_sources(),
            prices: default_price_sources(),
        }
    }
}

/// Load and validate source profiles from a YAML file.
///
/// A section omitted from the file keeps the built-in profiles.
///
/// # Errors
///
/// Returns `ScraperError` if the file cannot be read, parsed, or fails validation.
pub fn load_sources(path: &Path) -> Result<SourcesFile, ScraperError> {
    let content = std::fs::read_to_string(path).map_err(|e| ScraperError::SourcesFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let sources: SourcesFile = serde_yaml::from_str(&content)?;

    validate_sources(&sources)?;

    Ok(sources)
}

/// Checks names, search URL templates and selectors of every profile.
///
/// # Errors
///
/// Returns [`ScraperError::Validation`] for structural problems and
/// [`ScraperError::InvalidSelector`] for malformed CSS.
pub fn validate_sources(sources: &SourcesFile) -> Result<(), ScraperError> {
    let mut seen_info = HashSet::new();
    for profile in &sources.info {
        validate_common(&profile.name, &profile.search_url, &profile.base_url)?;
        if !seen_info.insert(profile.name.to_lowercase()) {
            return Err(ScraperError::Validation(format!(
                "duplicate info source name: '{}'",
                profile.name
            )));
        }
        for selector in profile.selectors() {
            compile_selector(selector)?;
        }
    }

    let mut seen_prices = HashSet::new();
    for profile in &sources.prices {
        validate_common(&profile.name, &profile.search_url, &profile.base_url)?;
        if !seen_prices.insert(profile.name.to_lowercase()) {
            return Err(ScraperError::Validation(format!(
                "duplicate price source name: '{}'",
                profile.name
            )));
        }
        for selector in profile.selectors() {
            compile_selector(selector)?;
        }
    }

    Ok(())
}

fn validate_common(name: &str, search_url: &str, base_url: &str) -> Result<(), ScraperError> {
    if name.trim().is_empty() {
        return Err(ScraperError::Validation(
            "source name must be non-empty".to_string(),
        ));
    }
    if !search_url.contains(QUERY_PLACEHOLDER) {
        return Err(ScraperError::Validation(format!(
            "source '{name}' search_url must contain {QUERY_PLACEHOLDER}"
        )));
    }
    if !base_url.starts_with("http") {
        return Err(ScraperError::Validation(format!(
            "source '{name}' base_url must be an absolute http(s) URL"
        )));
    }
    Ok(())
}
