use std::sync::Arc;

use crate::{
    config::Config,
    db::connection::DbPool,
    scoring::ScoringAdapter,
    services::prediction_history::{HistoryStore, PredictionHistoryService},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub history: Arc<dyn HistoryStore>,
    pub scorer: ScoringAdapter,
}

impl AppState {
    /// State backed by the SQLite history store on `pool`.
    pub fn new(pool: DbPool, config: Config, scorer: ScoringAdapter) -> Self {
        let history: Arc<dyn HistoryStore> = Arc::new(PredictionHistoryService::new(pool));
        Self::with_history(config, scorer, history)
    }

    /// State with an explicit history store, used to swap in failing or
    /// mocked stores.
    pub fn with_history(
        config: Config,
        scorer: ScoringAdapter,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            config,
            history,
            scorer,
        }
    }

    pub fn model_version(&self) -> &str {
        self.scorer.model_version()
    }
}
