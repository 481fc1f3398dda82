//! SERP rank tracker - server entry point
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Search Provider**: Serper, through a pool of rotating API keys
//! - **Format**: JSON requests/responses
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool and run migrations
//! 3. Seed API keys from the environment and apply the quota baseline
//! 4. Wire services and build the HTTP router
//! 5. Start server on configured port

use std::sync::Arc;

use serp_rank_tracker::{
    config::Config,
    db,
    handlers::{self, AppState},
    models::api_key::parse_env_keys,
    repositories::{
        activity_repo::PgActivityLog, catalog_repo::PgCatalogRepository, key_repo::PgKeyStore,
        run_repo::PgRunRepository,
    },
    services::{
        key_rotation::KeyRotationService,
        run_service::RunService,
        serp_client::SerperClient,
        sweep::{SweepController, SweepSource},
    },
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Reads RUST_LOG (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let catalog = Arc::new(PgCatalogRepository::new(pool.clone()));
    let activity = Arc::new(PgActivityLog::new(pool.clone()));
    let keys = Arc::new(KeyRotationService::new(Arc::new(PgKeyStore::new(pool.clone()))));

    if let Some(raw) = config.serper_api_keys.as_deref() {
        let seeded = keys.seed_keys(parse_env_keys(raw)).await?;
        if seeded > 0 {
            tracing::info!(count = seeded, "Seeded API keys from environment");
        }
    }
    if let Some(remaining) = config.serper_baseline_remaining {
        keys.apply_baseline(config.serper_baseline_key_name.as_deref(), remaining)
            .await?;
    }

    let provider = Arc::new(SerperClient::new(
        config.serper_api_url.clone(),
        config.serper_timeout(),
    )?);
    let runs = Arc::new(RunService::new(
        catalog,
        Arc::new(PgRunRepository::new(pool.clone())),
        keys.clone(),
        provider,
        config.run_settings(),
    ));
    let sweeps = Arc::new(SweepController::new(runs.clone(), activity));

    if config.auto_check_on_startup {
        sweeps.start_detached(SweepSource::Startup)?;
    }

    let app = handlers::router(AppState {
        pool,
        runs,
        sweeps,
        keys,
        monthly_limit: config.serper_monthly_limit,
    })
    .layer(TraceLayer::new_for_http())
    .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
