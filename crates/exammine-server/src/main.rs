mod agents;
mod api;
mod middleware;
mod pdf;
mod prompts;
mod session;

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use axum::http::HeaderValue;
use exammine_llm::GeminiClient;
use exammine_scraper::{load_sources, MedicationSearch, PageFetcher, SourcesFile};
use tracing_subscriber::EnvFilter;

use crate::{
    agents::Agents,
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
    session::SessionCache,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = exammine_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, model = %config.gemini_model, "starting exammine server");

    let sources = match &config.sources_path {
        Some(path) => load_sources(path)
            .with_context(|| format!("loading source profiles from {}", path.display()))?,
        None => SourcesFile::default(),
    };
    tracing::info!(
        info_sources = sources.info.len(),
        price_sources = sources.prices.len(),
        "scraping sources configured"
    );

    let fetcher = PageFetcher::new(
        config.scraper_request_timeout_secs,
        &config.scraper_user_agent,
    )?;
    let search = MedicationSearch::new(fetcher, sources, config.scraper_max_cards);

    let llm = GeminiClient::with_base_url(
        config.require_gemini_api_key()?,
        &config.gemini_model,
        config.llm_timeout_secs,
        &config.gemini_base_url,
    )?;

    let sessions = SessionCache::new(
        Duration::from_secs(config.session_ttl_secs),
        config.session_max_entries,
    );
    let agents = Agents::new(Arc::new(llm), Arc::new(search), sessions);

    let auth = AuthState::new(&config.api_keys, config.is_development())?;
    let cors_origin = HeaderValue::from_str(&config.cors_origin)
        .with_context(|| format!("invalid EXAMMINE_CORS_ORIGIN '{}'", config.cors_origin))?;
    let app = build_app(
        AppState {
            agents,
            max_upload_bytes: config.max_upload_bytes,
        },
        auth,
        default_rate_limit_state(),
        cors_origin,
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
