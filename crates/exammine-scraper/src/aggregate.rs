use futures::future::join_all;

use crate::client::PageFetcher;
use crate::info::lookup_info;
use crate::pricing::lookup_prices;
use crate::profile::{InfoSourceProfile, PriceSourceProfile, SourcesFile};
use crate::types::{InfoRecord, PriceQueryResult, SourcePrices};

/// Runs lookups across every configured source.
///
/// Failures of individual sources are logged and skipped; they never reach
/// the caller.
#[derive(Debug, Clone)]
pub struct MedicationSearch {
    fetcher: PageFetcher,
    info_sources: Vec<InfoSourceProfile>,
    price_sources: Vec<PriceSourceProfile>,
    max_cards: usize,
}

impl MedicationSearch {
    #[must_use]
    pub fn new(fetcher: PageFetcher, sources: SourcesFile, max_cards: usize) -> Self {
        Self {
            fetcher,
            info_sources: sources.info,
            price_sources: sources.prices,
            max_cards,
        }
    }

    #[must_use]
    pub fn info_sources(&self) -> &[InfoSourceProfile] {
        &self.info_sources
    }

    #[must_use]
    pub fn price_sources(&self) -> &[PriceSourceProfile] {
        &self.price_sources
    }

    /// First information source, in priority order, that yields content.
    pub async fn search_info(&self, query: &str) -> Option<InfoRecord> {
        for profile in &self.info_sources {
            match lookup_info(&self.fetcher, profile, query).await {
                Ok(Some(record)) if !record.is_empty() => {
                    tracing::info!(source = %profile.name, query, url = %record.source, "found medication information");
                    return Some(record);
                }
                Ok(_) => {
                    tracing::info!(source = %profile.name, query, "no information from source");
                }
                Err(e) => {
                    tracing::warn!(source = %profile.name, query, error = %e, "information lookup failed");
                }
            }
        }
        tracing::info!(query, "no information source had results");
        None
    }

    /// Price listings from every source, merged and sorted by price.
    pub async fn search_prices(&self, query: &str) -> PriceQueryResult {
        let lookups = self.price_sources.iter().map(|profile| async move {
            match lookup_prices(&self.fetcher, profile, query, self.max_cards).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!(source = %profile.name, query, error = %e, "price lookup failed");
                    None
                }
            }
        });

        let results: Vec<SourcePrices> = join_all(lookups).await.into_iter().flatten().collect();
        let merged = merge_source_prices(query, results);
        tracing::info!(
            query,
            sources = merged.sources.len(),
            products = merged.products.len(),
            "price search complete"
        );
        merged
    }
}

/// Unions per-source listings into one result sorted ascending by price.
///
/// The sort is stable, so equal prices keep source order. Sources with no
/// products are not listed as contributors.
#[must_use]
pub fn merge_source_prices(query: &str, results: Vec<SourcePrices>) -> PriceQueryResult {
    let mut merged = PriceQueryResult::empty(query);
    for result in results {
        if result.products.is_empty() {
            continue;
        }
        if !merged.sources.contains(&result.source_name) {
            merged.sources.push(result.source_name);
        }
        merged.products.extend(result.products);
    }
    merged.products.sort_by(|a, b| a.price.cmp(&b.price));
    merged
}
