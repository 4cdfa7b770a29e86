use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// User-Agent sent to scraped sites. Several of them serve an empty shell to
/// non-browser agents.
pub const DEFAULT_SCRAPER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can feed a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_positive_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let value = parse_u64(var, default)?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(value)
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let gemini_api_key = optional("GEMINI_API_KEY");

    let env = parse_environment(&or_default("EXAMMINE_ENV", "development"))?;
    let bind_addr = parse_addr("EXAMMINE_BIND_ADDR", "0.0.0.0:8000")?;
    let log_level = or_default("EXAMMINE_LOG_LEVEL", "info");

    let gemini_model = or_default("EXAMMINE_GEMINI_MODEL", "models/gemini-1.5-pro");
    let gemini_base_url = or_default(
        "EXAMMINE_GEMINI_BASE_URL",
        "https://generativelanguage.googleapis.com",
    );
    let llm_timeout_secs = parse_positive_u64("EXAMMINE_LLM_TIMEOUT_SECS", "120")?;

    let scraper_request_timeout_secs = parse_positive_u64("EXAMMINE_SCRAPER_TIMEOUT_SECS", "10")?;
    let scraper_user_agent = or_default("EXAMMINE_SCRAPER_USER_AGENT", DEFAULT_SCRAPER_USER_AGENT);
    let scraper_max_cards = parse_usize("EXAMMINE_SCRAPER_MAX_CARDS", "5")?;
    let sources_path = optional("EXAMMINE_SOURCES_PATH").map(PathBuf::from);

    let max_upload_bytes = parse_usize("EXAMMINE_MAX_UPLOAD_BYTES", "5242880")?;
    let session_ttl_secs = parse_positive_u64("EXAMMINE_SESSION_TTL_SECS", "86400")?;
    let session_max_entries = parse_usize("EXAMMINE_SESSION_MAX_ENTRIES", "1000")?;
    if session_max_entries == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "EXAMMINE_SESSION_MAX_ENTRIES".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }

    let cors_origin = or_default("EXAMMINE_CORS_ORIGIN", "http://localhost:5173");
    let api_keys = parse_api_keys(&or_default("EXAMMINE_API_KEYS", ""));

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        gemini_api_key,
        gemini_model,
        gemini_base_url,
        llm_timeout_secs,
        scraper_request_timeout_secs,
        scraper_user_agent,
        scraper_max_cards,
        sources_path,
        max_upload_bytes,
        session_ttl_secs,
        session_max_entries,
        cors_origin,
        api_keys,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "EXAMMINE_ENV".to_string(),
            reason: format!("expected development, test or production, got '{other}'"),
        }),
    }
}

fn parse_api_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
