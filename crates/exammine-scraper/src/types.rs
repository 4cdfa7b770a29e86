use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Rendered medication information and the page it was scraped from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfoRecord {
    /// Markdown-ish text: `# Name`, a `Fabricante:` line and `##` sections.
    pub content: String,
    /// Absolute URL of the detail page.
    pub source: String,
}

impl InfoRecord {
    /// The "nothing found" record: empty content and empty source.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            content: String::new(),
            source: String::new(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// One product listing scraped from a pharmacy search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    /// Parsed BRL amount. Serialized as a string to keep the exact cents.
    pub price: Decimal,
    /// Price exactly as displayed by the site, e.g. `"R$ 12,90"`.
    pub price_text: String,
    /// Profile name of the site the listing came from.
    pub source: String,
    pub url: Option<String>,
}

/// Products parsed from a single source's search page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePrices {
    pub source_name: String,
    pub source_url: String,
    pub products: Vec<Product>,
}

/// Merged price listings for one query across every source that answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQueryResult {
    pub query: String,
    pub sources: Vec<String>,
    /// Sorted ascending by price; ties keep source order.
    pub products: Vec<Product>,
}

impl PriceQueryResult {
    #[must_use]
    pub fn empty(query: &str) -> Self {
        Self {
            query: query.to_owned(),
            sources: Vec::new(),
            products: Vec::new(),
        }
    }
}
