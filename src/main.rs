use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod maghrib;
mod routes;

use config::Config;
use maghrib::cache::{MaghribCache, SystemClock};
use maghrib::manar::ManarClient;
use routes::{create_router, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maghrib_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let fetcher = Arc::new(ManarClient::new(&config));
    let cache = Arc::new(MaghribCache::new(
        fetcher,
        Arc::new(SystemClock),
        config.cache_ttl,
    ));

    let state = AppState {
        cache: cache.clone(),
    };
    let app = create_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("🌙 Server starting on http://{}", addr);

    tokio::spawn(async move { cache.warm_up().await });

    axum::serve(listener, app).await?;

    Ok(())
}
