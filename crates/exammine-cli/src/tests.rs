use clap::Parser;
use exammine_core::{AppConfig, Environment};
use exammine_scraper::{PriceQueryResult, Product};

use super::*;

fn product(name: &str, price: &str, price_text: &str, source: &str) -> Product {
    Product {
        name: name.to_string(),
        price: price.parse().expect("decimal"),
        price_text: price_text.to_string(),
        source: source.to_string(),
        url: None,
    }
}

/// Config as loaded from an environment without `GEMINI_API_KEY`.
fn config_without_gemini_key() -> AppConfig {
    AppConfig {
        env: Environment::Development,
        bind_addr: "127.0.0.1:8000".parse().expect("addr"),
        log_level: "info".to_string(),
        gemini_api_key: None,
        gemini_model: "models/gemini-1.5-pro".to_string(),
        gemini_base_url: "http://127.0.0.1:9".to_string(),
        llm_timeout_secs: 5,
        scraper_request_timeout_secs: 5,
        scraper_user_agent: "exammine-test/0.1".to_string(),
        scraper_max_cards: 5,
        sources_path: None,
        max_upload_bytes: 1024,
        session_ttl_secs: 60,
        session_max_entries: 10,
        cors_origin: "http://localhost:5173".to_string(),
        api_keys: Vec::new(),
    }
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["exammine-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_info_command() {
    let cli = Cli::try_parse_from(["exammine-cli", "info", "dipirona"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Info { ref name, json: false }) if name == "dipirona"
    ));
}

#[test]
fn parses_prices_command_with_json_flag() {
    let cli = Cli::try_parse_from(["exammine-cli", "prices", "paracetamol", "--json"]).unwrap();
    assert!(matches!(
        cli.command,
        Some(Commands::Prices { ref name, json: true }) if name == "paracetamol"
    ));
}

#[test]
fn prices_requires_a_name() {
    assert!(Cli::try_parse_from(["exammine-cli", "prices"]).is_err());
}

#[test]
fn parses_sources_and_models_commands() {
    let cli = Cli::try_parse_from(["exammine-cli", "sources"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Sources)));
    let cli = Cli::try_parse_from(["exammine-cli", "models"]).unwrap();
    assert!(matches!(cli.command, Some(Commands::Models)));
}

#[test]
fn require_name_rejects_blank_input() {
    assert!(lookup::require_name("   ").is_err());
    assert_eq!(lookup::require_name(" dipirona ").unwrap(), "dipirona");
}

#[test]
fn price_table_lists_products_in_order_and_sources() {
    let result = PriceQueryResult {
        query: "dipirona".to_string(),
        sources: vec!["Drogasil".to_string(), "Panvel".to_string()],
        products: vec![
            product("Dipirona 500mg 10cp", "4.99", "R$ 4,99", "Panvel"),
            product("Dipirona 1g 20cp", "12.90", "R$ 12,90", "Drogasil"),
        ],
    };

    let table = lookup::format_price_table(&result);
    let lines: Vec<&str> = table.lines().collect();

    assert!(lines[0].starts_with("PRICE"));
    assert!(lines[1].starts_with("R$ 4,99"));
    assert!(lines[1].ends_with("Dipirona 500mg 10cp"));
    assert!(lines[2].contains("Drogasil"));
    assert_eq!(lines.last().copied(), Some("sources: Drogasil, Panvel"));
}

#[test]
fn price_table_truncates_long_names() {
    let long = "x".repeat(80);
    let result = PriceQueryResult {
        query: "x".to_string(),
        sources: vec!["Ultrafarma".to_string()],
        products: vec![product(&long, "1", "R$ 1,00", "Ultrafarma")],
    };

    let table = lookup::format_price_table(&result);

    assert!(table.contains(&format!("{}...", "x".repeat(50))));
    assert!(!table.contains(&"x".repeat(51)));
}

#[test]
fn sources_command_runs_without_gemini_key() {
    lookup::run_sources(&config_without_gemini_key()).expect("sources without a Gemini key");
}

#[tokio::test]
async fn models_command_requires_gemini_key() {
    let err = lookup::run_models(&config_without_gemini_key())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("GEMINI_API_KEY"), "got: {err}");
}
