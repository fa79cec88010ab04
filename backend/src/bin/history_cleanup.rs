use anyhow::Context;
use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fraud_scoring_backend::{
    config::Config,
    db::connection::{create_pool, run_migrations},
    services::prediction_history::{HistoryStore, PredictionHistoryService},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fraud_scoring_backend=info,history_cleanup=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let Some(retention) = config.history_retention() else {
        tracing::info!("HISTORY_RETENTION_DAYS is 0, purge disabled");
        return Ok(());
    };

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let cutoff = Utc::now() - retention;
    let deleted = PredictionHistoryService::new(pool.clone())
        .purge(cutoff)
        .await
        .context("purge prediction history")?;

    tracing::info!(
        deleted,
        cutoff = %cutoff,
        retention_days = config.history_retention_days,
        "Purged prediction history"
    );

    sqlx::query("VACUUM")
        .execute(&pool)
        .await
        .context("vacuum prediction_history")?;

    pool.close().await;
    Ok(())
}
