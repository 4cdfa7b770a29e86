//! Medication lookup command handlers for the CLI.
//!
//! These run the same scrapers the server uses, without the LLM step, so an
//! operator can check what each source returns.

use anyhow::Context;
use exammine_core::AppConfig;
use exammine_llm::{GeminiClient, TextGenerator};
use exammine_scraper::{load_sources, MedicationSearch, PageFetcher, PriceQueryResult, SourcesFile};

/// Longest product name shown in the price table.
const MAX_NAME_CHARS: usize = 50;

fn load_sources_for(config: &AppConfig) -> anyhow::Result<SourcesFile> {
    match &config.sources_path {
        Some(path) => load_sources(path)
            .with_context(|| format!("loading source profiles from {}", path.display())),
        None => Ok(SourcesFile::default()),
    }
}

fn build_search(config: &AppConfig) -> anyhow::Result<MedicationSearch> {
    let sources = load_sources_for(config)?;
    let fetcher = PageFetcher::new(
        config.scraper_request_timeout_secs,
        &config.scraper_user_agent,
    )?;
    Ok(MedicationSearch::new(
        fetcher,
        sources,
        config.scraper_max_cards,
    ))
}

pub(crate) fn require_name(name: &str) -> anyhow::Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("medication name must not be empty");
    }
    Ok(name)
}

/// Print the first information record found for `name`.
///
/// # Errors
///
/// Returns an error if the sources cannot be loaded or the HTTP client cannot
/// be built. Individual source failures are logged and skipped.
pub(crate) async fn run_info(config: &AppConfig, name: &str, json: bool) -> anyhow::Result<()> {
    let name = require_name(name)?;
    let search = build_search(config)?;

    let Some(record) = search.search_info(name).await else {
        println!("no information found for '{name}'");
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("{}", record.content);
        println!();
        println!("Fonte: {}", record.source);
    }
    Ok(())
}

/// Print merged price listings for `name`, cheapest first.
///
/// # Errors
///
/// Returns an error if the sources cannot be loaded or the HTTP client cannot
/// be built.
pub(crate) async fn run_prices(config: &AppConfig, name: &str, json: bool) -> anyhow::Result<()> {
    let name = require_name(name)?;
    let search = build_search(config)?;
    let result = search.search_prices(name).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.products.is_empty() {
        println!("no prices found for '{name}'");
    } else {
        print!("{}", format_price_table(&result));
    }
    Ok(())
}

/// Print the profiles the server would scrape with.
///
/// # Errors
///
/// Returns an error if `EXAMMINE_SOURCES_PATH` points at an unreadable or
/// invalid file.
pub(crate) fn run_sources(config: &AppConfig) -> anyhow::Result<()> {
    let sources = load_sources_for(config)?;
    let origin = config
        .sources_path
        .as_ref()
        .map_or_else(|| "built-in".to_string(), |p| p.display().to_string());
    println!("sources: {origin}");
    println!();
    println!("INFO (priority order)");
    for (i, profile) in sources.info.iter().enumerate() {
        println!("{:>3}. {:<20}{}", i + 1, profile.name, profile.search_url);
    }
    println!();
    println!("PRICES");
    for profile in &sources.prices {
        println!("     {:<20}{}", profile.name, profile.search_url);
    }
    Ok(())
}

/// Print the model names the configured key can use.
///
/// # Errors
///
/// Returns an error if the Gemini client cannot be built or the listing fails.
pub(crate) async fn run_models(config: &AppConfig) -> anyhow::Result<()> {
    let client = GeminiClient::with_base_url(
        config.require_gemini_api_key()?,
        &config.gemini_model,
        config.llm_timeout_secs,
        &config.gemini_base_url,
    )?;
    let models = client.list_models().await?;
    println!("configured: {}", client.model());
    for model in &models {
        let marker = if model == client.model() { "*" } else { " " };
        println!("{marker} {model}");
    }
    Ok(())
}

/// Renders products as an aligned table followed by the sources consulted.
pub(crate) fn format_price_table(result: &PriceQueryResult) -> String {
    let mut out = format!("{:<12}{:<22}PRODUCT\n", "PRICE", "SOURCE");
    for product in &result.products {
        let name = if product.name.chars().count() > MAX_NAME_CHARS {
            format!(
                "{}...",
                product.name.chars().take(MAX_NAME_CHARS).collect::<String>()
            )
        } else {
            product.name.clone()
        };
        out.push_str(&format!(
            "{:<12}{:<22}{}\n",
            product.price_text, product.source, name
        ));
    }
    out.push_str(&format!("\nsources: {}\n", result.sources.join(", ")));
    out
}
