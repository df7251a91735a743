mod ad;
mod auth;
mod category;
mod conversation;
mod db;
mod dto;
mod error;
mod message;
mod middleware;
mod routes;
mod slug;
mod state;
mod storage;
mod user;

#[cfg(test)]
mod test_support;

use db::{create_pool, run_migrations};
use routes::create_router;
use state::{AppState, Config};
use std::sync::Arc;
use storage::LocalBlobStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,marketplace=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    tracing::info!("Connecting to database...");
    let db = create_pool(&config.database_url, config.database_max_connections).await?;

    tracing::info!("Running migrations...");
    run_migrations(&db).await?;

    if config.seed_categories {
        let seeded = category::category_seed::seed_categories(&db).await?;
        tracing::info!("Seeded category tree ({} categories)", seeded);
    }

    let blob_store = Arc::new(LocalBlobStore::new(config.storage_root.clone()));
    tracing::info!("Storing uploads under {}", config.storage_root.display());

    let state = AppState::new(db, config.clone(), blob_store);
    let app = create_router(state);

    let addr = config.addr();
    tracing::info!("Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
