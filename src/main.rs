//! Armora Backend Server
//!
//! Serves the booking API: officer search, payment intents and confirmation,
//! and the payment provider webhook.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use armora_server::app_state::AppState;
use armora_server::config::AppConfig;
use armora_server::payments::{PaymentService, StripeProvider};
use armora_server::reconcile::{self, Reconciler};
use armora_server::routes;
use armora_server::store::{BookingStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("armora_server=info,tower_http=info")),
        )
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;

    let store: Arc<dyn BookingStore> = match &config.database_url {
        Some(url) => Arc::new(
            PgStore::connect(url, config.database_max_connections)
                .await
                .context("failed to connect to database")?,
        ),
        None => {
            warn!("DATABASE_URL not set - using in-memory store, data will not persist");
            Arc::new(MemoryStore::new())
        }
    };

    let provider = Arc::new(
        StripeProvider::new(
            &config.stripe_api_base,
            &config.stripe_secret_key,
            config.provider_timeout,
        )
        .context("failed to build payment provider client")?,
    );
    let payment_service = Arc::new(PaymentService::new(
        store.clone(),
        provider,
        config.charge_basis,
        config.default_currency.clone(),
    ));

    if config.stripe_webhook_secret.is_none() {
        warn!("STRIPE_WEBHOOK_SECRET not set - webhook endpoint will reject all requests");
    }
    let state = AppState::new(
        store.clone(),
        payment_service,
        config.stripe_webhook_secret.clone(),
        config.webhook_tolerance_seconds,
        &config.jwt_secret,
    );

    // Start and supervise the background reconciliation sweep.
    reconcile::spawn_supervised(Arc::new(Reconciler::new(
        store,
        config.reconcile_interval,
        config.reconcile_pending_after,
    )));

    let app = routes::app(state)
        .layer(TraceLayer::new_for_http())
        .layer(build_cors_layer(&config.cors_allowed_origins));

    let addr = SocketAddr::from((config.host, config.port));
    info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allowed_origins = origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(false)
}
