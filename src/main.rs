use anyhow::Context;
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use pix_gateway::app::config::Config;
use pix_gateway::handlers::{self, AppState};
use pix_gateway::services::{
    ChargeBuilder, ChargeOrchestrator, MerchantInfo, PixProvider, ProviderClient, TokenManager,
    WebhookProcessor,
};
use pix_gateway::storage::MemoryStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    info!(
        mode = %config.mode,
        "Starting PIX gateway on port {}",
        config.server_port
    );

    let store = Arc::new(MemoryStore::new());
    let tokens = Arc::new(TokenManager::new(Duration::from_secs(
        config.token_safety_margin_secs,
    )));

    let providers: Vec<Arc<dyn PixProvider>> = config
        .strategies()
        .into_iter()
        .map(|strategy| Arc::new(ProviderClient::new(strategy)) as Arc<dyn PixProvider>)
        .collect();

    let orchestrator = Arc::new(ChargeOrchestrator::new(
        providers,
        tokens,
        ChargeBuilder::new(config.pix_key.clone(), config.financial_settings()),
        store.clone(),
        MerchantInfo {
            pix_key: config.pix_key.clone(),
            name: config.merchant_name.clone(),
            city: config.merchant_city.clone(),
        },
    ));

    let webhooks = Arc::new(WebhookProcessor::new(
        store.clone(),
        store,
        config.financial_settings(),
        config.webhook_secret.clone(),
        config.mode,
    ));

    let app = Router::new()
        .route("/health", get(health_handler))
        .route("/pix/charges", post(handlers::charges::create_charge))
        .route("/webhooks/pix", post(handlers::webhooks::receive_pix))
        .with_state(AppState {
            orchestrator,
            webhooks,
        });

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on {addr}");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

async fn health_handler() -> StatusCode {
    StatusCode::OK
}
