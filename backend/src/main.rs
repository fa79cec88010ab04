use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fraud_scoring_backend::{
    config::Config,
    db::connection::{create_pool, run_migrations, DbPool},
    router,
    scoring::{FeatureConfig, LogisticModel, ScoringAdapter},
    state::AppState,
};

fn mask_database_url(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{}?<redacted>", base),
        None => url.to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraud_scoring_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    tracing::info!(
        database_url = %mask_database_url(&config.database_url),
        bind_addr = %config.bind_addr,
        model_path = %config.model_path,
        features_path = %config.features_path,
        max_request_body_bytes = config.max_request_body_bytes,
        stats_window_hours = config.stats_window_hours,
        history_retention_days = config.history_retention_days,
        "Loaded configuration from environment/.env"
    );

    // Model artifacts are loaded once and shared read-only for the process lifetime.
    let features = FeatureConfig::load(&config.features_path)
        .with_context(|| format!("loading feature list from {}", config.features_path))?;
    let model = LogisticModel::load(&config.model_path, &features)
        .with_context(|| format!("loading model from {}", config.model_path))?;
    tracing::info!(
        feature_count = features.len(),
        model_version = %fraud_scoring_backend::scoring::Classifier::version(&model),
        "Loaded scoring model"
    );
    let scorer = ScoringAdapter::new(features, Arc::new(model));

    let pool: DbPool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let addr = config.bind_addr;
    let app = router::app(AppState::new(pool.clone(), config, scorer));

    tracing::info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.close().await;
    tracing::info!("Database pool closed, shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
