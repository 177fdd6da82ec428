//! event-chat-gateway server entry point.
//!
//! Starts the Axum HTTP server with the REST endpoints.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use event_chat_gateway::api;
use event_chat_gateway::app_state::{AppState, ServiceSettings};
use event_chat_gateway::config::GatewayConfig;
use event_chat_gateway::upstream::{
    CompletionClient, EventSource, HttpCompletionClient, HttpEventSource, InMemoryEventSource,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting event-chat-gateway");

    // Build upstream collaborators
    let client = reqwest::Client::builder()
        .user_agent(concat!("event-chat-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let source: Arc<dyn EventSource> = if config.demo_mode {
        tracing::warn!("DEMO_MODE enabled; serving from an empty in-memory source");
        Arc::new(InMemoryEventSource::new(Vec::new()))
    } else {
        tracing::info!(base = %config.inventory_api_base, "using inventory API");
        Arc::new(HttpEventSource::new(
            client.clone(),
            config.inventory_api_base.clone(),
            config.inventory_retry(),
        ))
    };

    let llm: Option<Arc<dyn CompletionClient>> = match &config.llm_endpoint {
        Some(endpoint) => {
            tracing::info!(%endpoint, model = %config.llm_model, "LLM enabled");
            let llm: Arc<dyn CompletionClient> = Arc::new(HttpCompletionClient::new(
                client,
                endpoint.clone(),
                config.llm_model.clone(),
                config.llm_api_key.clone(),
                config.llm_retry(),
            ));
            Some(llm)
        }
        None => {
            tracing::info!("LLM_ENDPOINT not set; chat uses keyword rules only");
            None
        }
    };

    // Build application state
    let app_state = AppState::new(
        source,
        llm,
        ServiceSettings {
            timezone: config.report_timezone,
            default_per_page: config.default_per_page,
            analytics_fetch_limit: config.analytics_fetch_limit,
        },
    );

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.request_timeout_secs,
        )))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}
