#![allow(dead_code)] // OpenAPI doc stubs are only referenced by utoipa macros.

use crate::{
    error::ErrorResponse,
    handlers::{
        history::HistoryListQuery,
        system::{DatabaseInfo, EndpointInfo, HealthResponse, ServiceInfoResponse},
    },
    models::{
        prediction::{ForwardRequest, ForwardResponse},
        prediction_history::{HistoryItemResponse, HistoryListResponse, HistoryStatsResponse},
    },
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Fraud Scoring Service",
        description = "Transaction fraud-probability scoring with an auditable call history"
    ),
    paths(
        root_doc,
        health_doc,
        forward_doc,
        list_history_doc,
        history_stats_doc,
        get_history_item_doc
    ),
    components(
        schemas(
            ForwardRequest,
            ForwardResponse,
            ErrorResponse,
            HistoryListQuery,
            HistoryItemResponse,
            HistoryListResponse,
            HistoryStatsResponse,
            HealthResponse,
            ServiceInfoResponse,
            EndpointInfo,
            DatabaseInfo
        )
    ),
    tags(
        (name = "Scoring", description = "Fraud-probability scoring"),
        (name = "History", description = "Recorded scoring calls"),
        (name = "System", description = "Health and discovery")
    )
)]
pub struct ApiDoc;

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service metadata", body = ServiceInfoResponse)),
    tag = "System"
)]
fn root_doc() {}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, body = HealthResponse)),
    tag = "System"
)]
fn health_doc() {}

#[utoipa::path(
    post,
    path = "/api/forward",
    request_body = ForwardRequest,
    responses(
        (status = 200, description = "Scored", body = ForwardResponse),
        (status = 400, description = "Missing features or malformed data", body = ErrorResponse),
        (status = 403, description = "Model rejected the input", body = ErrorResponse),
        (status = 500, body = ErrorResponse)
    ),
    tag = "Scoring"
)]
fn forward_doc() {}

#[utoipa::path(
    get,
    path = "/api/history",
    params(HistoryListQuery),
    responses(
        (status = 200, description = "Newest first", body = HistoryListResponse),
        (status = 400, body = ErrorResponse),
        (status = 500, body = ErrorResponse)
    ),
    tag = "History"
)]
fn list_history_doc() {}

#[utoipa::path(
    get,
    path = "/api/history/stats",
    responses(
        (status = 200, body = HistoryStatsResponse),
        (status = 500, body = ErrorResponse)
    ),
    tag = "History"
)]
fn history_stats_doc() {}

#[utoipa::path(
    get,
    path = "/api/history/{id}",
    params(("id" = i64, Path, description = "History record id")),
    responses(
        (status = 200, body = HistoryItemResponse),
        (status = 404, body = ErrorResponse)
    ),
    tag = "History"
)]
fn get_history_item_doc() {}
