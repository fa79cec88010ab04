use axum::Json;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use utoipa::ToSchema;

pub const SERVICE_NAME: &str = "fraud-scoring-service";

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EndpointInfo {
    pub method: String,
    pub path: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DatabaseInfo {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfoResponse {
    pub message: String,
    pub version: String,
    pub endpoints: BTreeMap<String, EndpointInfo>,
    pub database: DatabaseInfo,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        service: SERVICE_NAME.into(),
    })
}

/// Discovery document listing the public endpoints.
pub async fn root() -> Json<ServiceInfoResponse> {
    let endpoints = [
        ("prediction", "POST", "/api/forward", "Score one transaction"),
        ("history_all", "GET", "/api/history", "List recorded scoring calls"),
        (
            "history_item",
            "GET",
            "/api/history/{id}",
            "Fetch one recorded scoring call",
        ),
        (
            "history_stats",
            "GET",
            "/api/history/stats",
            "Aggregate statistics over recorded calls",
        ),
        ("health", "GET", "/health", "Liveness check"),
        ("docs", "GET", "/api/docs", "Interactive API documentation"),
    ]
    .into_iter()
    .map(|(name, method, path, description)| {
        (
            name.to_string(),
            EndpointInfo {
                method: method.into(),
                path: path.into(),
                description: description.into(),
            },
        )
    })
    .collect();

    Json(ServiceInfoResponse {
        message: "Fraud Scoring Service".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        endpoints,
        database: DatabaseInfo {
            kind: "SQLite".into(),
        },
    })
}
