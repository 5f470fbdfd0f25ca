//! Fashion Commerce - cart and VNPay checkout backend

use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fashion_commerce::config::AppConfig;
use fashion_commerce::events::EventPublisher;
use fashion_commerce::http::{build_app, AppState};
use fashion_commerce::store::{InMemoryStore, PgStore, Stores};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;

    let stores = match &config.database_url {
        Some(url) => Stores::shared(Arc::new(PgStore::connect(url, config.database_max_connections).await?)),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Stores::shared(Arc::new(InMemoryStore::new()))
        }
    };

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, events will only be logged");
                None
            }
        },
        None => None,
    };

    let app = build_app(AppState::new(stores, &config, EventPublisher::new(nats)));

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("fashion-commerce listening on {}", addr);
    axum::serve(tokio::net::TcpListener::bind(&addr).await?, app).await?;
    Ok(())
}
