use anyhow::Context;
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dictionary_api_server::{
    config::{Config, StoreBackend},
    create_app,
    database::Database,
    handlers::AppState,
    services::redis::RedisService,
    store::Stores,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dictionary_api_server=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let state = match config.store_backend {
        StoreBackend::Postgres => {
            let database = Database::new(&config.database_url, config.store_timeout)
                .await
                .context("failed to connect to database")?;
            database.migrate().await.context("failed to run migrations")?;

            let redis = RedisService::new(&config.redis_url)
                .await
                .context("failed to connect to redis")?;

            let stores = Stores::connected(database.clone(), redis.clone());
            AppState::new(&config.tokens, stores, config.store_timeout)?
                .with_connections(database, redis)
        }
        StoreBackend::Memory => {
            tracing::warn!(
                "using in-memory stores with a small sample dictionary; nothing survives a restart"
            );
            AppState::new(&config.tokens, Stores::memory(), config.store_timeout)?
        }
    };

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("shutting down");
}
