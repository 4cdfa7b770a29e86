//! Medication lookups scraped from Brazilian drug-information and pharmacy sites.
//!
//! Each site is described by a source profile (search URL template plus CSS
//! selectors). Single-source lookups fetch and parse one site; the
//! [`MedicationSearch`] aggregator walks the configured sources, picking the
//! first information hit or merging every price listing.

pub mod aggregate;
pub mod client;
pub mod error;
pub mod extract;
pub mod info;
pub mod price;
pub mod pricing;
pub mod profile;
pub mod types;

pub use aggregate::{merge_source_prices, MedicationSearch};
pub use client::PageFetcher;
pub use error::ScraperError;
pub use price::parse_price;
pub use profile::{
    default_info_sources, default_price_sources, load_sources, InfoLayout, InfoSourceProfile,
    PriceSourceProfile, SourcesFile,
};
pub use types::{InfoRecord, PriceQueryResult, Product, SourcePrices};
