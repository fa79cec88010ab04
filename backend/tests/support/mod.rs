#![allow(dead_code)]
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use fraud_scoring_backend::{
    config::Config,
    db::connection::{create_pool, run_migrations, DbPool},
    models::prediction_history::{HistoryStats, NewPredictionHistory, PredictionHistory},
    repositories::prediction_history::HistoryFilters,
    router,
    scoring::{Classifier, FeatureConfig, ModelError, Prediction, ScoringAdapter},
    services::prediction_history::{HistoryStore, PredictionHistoryService},
    state::AppState,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const MODEL_VERSION: &str = "test-1.0.0";

/// Always predicts fraud with probability 0.87.
pub struct FixedClassifier;

impl Classifier for FixedClassifier {
    fn predict(&self, _row: &[Value]) -> Result<Prediction, ModelError> {
        Ok(Prediction {
            label: 1,
            probability: 0.87,
        })
    }

    fn version(&self) -> &str {
        MODEL_VERSION
    }
}

/// Fails every inference, like a model that chokes on its input.
pub struct BrokenClassifier;

impl Classifier for BrokenClassifier {
    fn predict(&self, _row: &[Value]) -> Result<Prediction, ModelError> {
        Err(ModelError::new("could not convert string to float"))
    }

    fn version(&self) -> &str {
        MODEL_VERSION
    }
}

/// Rejects writes but serves reads from the wrapped store.
pub struct FailingInsertStore {
    inner: PredictionHistoryService,
}

#[async_trait]
impl HistoryStore for FailingInsertStore {
    async fn insert(&self, _record: NewPredictionHistory) -> Result<i64, sqlx::Error> {
        Err(sqlx::Error::PoolTimedOut)
    }

    async fn fetch(&self, id: i64) -> Result<Option<PredictionHistory>, sqlx::Error> {
        self.inner.fetch(id).await
    }

    async fn count(&self, filters: &HistoryFilters) -> Result<i64, sqlx::Error> {
        self.inner.count(filters).await
    }

    async fn page(
        &self,
        filters: &HistoryFilters,
        page: i64,
        limit: i64,
    ) -> Result<(Vec<PredictionHistory>, i64), sqlx::Error> {
        self.inner.page(filters, page, limit).await
    }

    async fn stats(&self, window_start: DateTime<Utc>) -> Result<HistoryStats, sqlx::Error> {
        self.inner.stats(window_start).await
    }

    async fn purge(&self, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        self.inner.purge(cutoff).await
    }
}

pub fn test_features() -> FeatureConfig {
    FeatureConfig::new(["A", "B", "C"]).expect("valid feature list")
}

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        bind_addr: "127.0.0.1:0".parse().expect("addr"),
        model_path: "unused".into(),
        features_path: "unused".into(),
        max_request_body_bytes: 64 * 1024,
        stats_window_hours: 24,
        history_retention_days: 90,
        cors_allow_origins: vec!["*".into()],
    }
}

/// A router over a fresh on-disk SQLite database. The database lives as long
/// as the value.
pub struct TestApp {
    pub router: Router,
    pub pool: DbPool,
    pub store: PredictionHistoryService,
    _dir: TempDir,
}

pub enum StoreKind {
    Working,
    FailingInsert,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(Arc::new(FixedClassifier), StoreKind::Working).await
    }

    pub async fn with_classifier(classifier: Arc<dyn Classifier>) -> Self {
        Self::build(classifier, StoreKind::Working).await
    }

    pub async fn with_failing_store() -> Self {
        Self::build(Arc::new(FixedClassifier), StoreKind::FailingInsert).await
    }

    async fn build(classifier: Arc<dyn Classifier>, kind: StoreKind) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("history.db").display()
        );
        let pool = create_pool(&url).await.expect("create pool");
        run_migrations(&pool).await.expect("migrate");

        let store = PredictionHistoryService::new(pool.clone());
        let history: Arc<dyn HistoryStore> = match kind {
            StoreKind::Working => Arc::new(store.clone()),
            StoreKind::FailingInsert => Arc::new(FailingInsertStore {
                inner: store.clone(),
            }),
        };
        let scorer = ScoringAdapter::new(test_features(), classifier);
        let state = AppState::with_history(test_config(&url), scorer, history);

        Self {
            router: router::app(state),
            pool,
            store,
            _dir: dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn forward(&self, payload: Value) -> (StatusCode, Value) {
        self.forward_raw(payload.to_string()).await
    }

    pub async fn forward_raw(&self, body: impl Into<Body>) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri("/api/forward")
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap(),
        )
        .await
    }
}

pub fn complete_features() -> Value {
    json!({ "data": { "A": 1.0, "B": 2.5, "C": 0 } })
}

pub fn history_record(
    timestamp: DateTime<Utc>,
    status_code: i64,
    processing_time: Option<f64>,
) -> NewPredictionHistory {
    let success = status_code == 200;
    NewPredictionHistory {
        timestamp,
        request_data: json!({ "data": { "A": 1 } }),
        prediction: success.then_some(0),
        probability: success.then_some(0.12),
        status_code,
        error_message: (!success).then(|| format!("HTTP {status_code}")),
        client_ip: Some("127.0.0.1".into()),
        model_version: MODEL_VERSION.into(),
        processing_time,
        request_id: None,
    }
}
