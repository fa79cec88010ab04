//! History store abstraction used by the interception pipeline and the query
//! handlers.
//!
//! The trait is mockable with mockall so persistence failures can be
//! simulated without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::{
    models::prediction_history::{HistoryStats, NewPredictionHistory, PredictionHistory},
    repositories::prediction_history::{self, HistoryFilters},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends one record and returns its id.
    async fn insert(&self, record: NewPredictionHistory) -> Result<i64, sqlx::Error>;

    async fn fetch(&self, id: i64) -> Result<Option<PredictionHistory>, sqlx::Error>;

    async fn count(&self, filters: &HistoryFilters) -> Result<i64, sqlx::Error>;

    /// Returns one page (1-based) ordered newest first, plus the filtered total.
    async fn page(
        &self,
        filters: &HistoryFilters,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<PredictionHistory>, i64), sqlx::Error>;

    async fn stats(&self, window_start: DateTime<Utc>) -> Result<HistoryStats, sqlx::Error>;

    /// Deletes records older than `cutoff`.
    async fn purge(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error>;
}

#[derive(Debug, Clone)]
pub struct PredictionHistoryService {
    pool: SqlitePool,
}

impl PredictionHistoryService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PredictionHistoryService {
    async fn insert(&self, record: NewPredictionHistory) -> Result<i64, sqlx::Error> {
        let record = record.normalized();
        let mut tx = self.pool.begin().await?;
        match prediction_history::insert_prediction_history(&mut *tx, &record).await {
            Ok(id) => {
                tx.commit().await?;
                Ok(id)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = ?rollback_err, "Failed to roll back history insert");
                }
                Err(err)
            }
        }
    }

    async fn fetch(&self, id: i64) -> Result<Option<PredictionHistory>, sqlx::Error> {
        prediction_history::fetch_prediction_history(&self.pool, id).await
    }

    async fn count(&self, filters: &HistoryFilters) -> Result<i64, sqlx::Error> {
        prediction_history::count_prediction_history(&self.pool, filters).await
    }

    async fn page(
        &self,
        filters: &HistoryFilters,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<PredictionHistory>, i64), sqlx::Error> {
        let limit = limit.max(1);
        let offset = (page.max(1) - 1).saturating_mul(limit);
        prediction_history::list_prediction_history(&self.pool, filters, limit, offset).await
    }

    async fn stats(&self, window_start: DateTime<Utc>) -> Result<HistoryStats, sqlx::Error> {
        prediction_history::prediction_history_stats(&self.pool, window_start).await
    }

    async fn purge(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        prediction_history::delete_prediction_history_before(&self.pool, cutoff).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_history_store_can_be_created() {
        let _mock = MockHistoryStore::new();
    }

    #[test]
    fn history_store_trait_bounds() {
        fn check_send_sync<T: Send + Sync>() {}
        check_send_sync::<MockHistoryStore>();
        check_send_sync::<PredictionHistoryService>();
    }
}
