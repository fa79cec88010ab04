use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppError,
    models::{
        prediction_history::{HistoryItemResponse, HistoryListResponse, HistoryStatsResponse},
        total_pages,
    },
    repositories::prediction_history::HistoryFilters,
    state::AppState,
};

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Default, Deserialize, Serialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct HistoryListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub status_code: Option<i64>,
    /// RFC3339, `YYYY-MM-DDTHH:MM:SS`, or `YYYY-MM-DD` (start of day).
    pub start_date: Option<String>,
    /// Same formats as `start_date`; a bare date means the end of that day.
    pub end_date: Option<String>,
}

pub async fn list_history(
    State(state): State<AppState>,
    Query(q): Query<HistoryListQuery>,
) -> Result<Json<HistoryListResponse>, AppError> {
    let (page, limit, filters) = validate_list_query(q)?;

    let (items, total) = state
        .history
        .page(&filters, page, limit)
        .await
        .map_err(storage_error)?;

    Ok(Json(HistoryListResponse {
        items: items.into_iter().map(HistoryItemResponse::from).collect(),
        total,
        page,
        limit,
        total_pages: total_pages(total, limit),
    }))
}

pub async fn history_stats(
    State(state): State<AppState>,
) -> Result<Json<HistoryStatsResponse>, AppError> {
    let window_start = Utc::now() - state.config.stats_window();
    let stats = state
        .history
        .stats(window_start)
        .await
        .map_err(storage_error)?;
    Ok(Json(HistoryStatsResponse::from(stats)))
}

pub async fn get_history_item(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<HistoryItemResponse>, AppError> {
    let record = state
        .history
        .fetch(id)
        .await
        .map_err(storage_error)?
        .ok_or_else(|| AppError::NotFound(format!("History record {id} not found")))?;
    Ok(Json(HistoryItemResponse::from(record)))
}

fn storage_error(err: sqlx::Error) -> AppError {
    AppError::Storage(format!("Error fetching history: {err}"))
}

fn validate_list_query(q: HistoryListQuery) -> Result<(i64, i64, HistoryFilters), AppError> {
    let page = q.page.unwrap_or(DEFAULT_PAGE).max(1);
    let limit = q.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

    let start_date = parse_date_param("start_date", q.start_date.as_deref(), true)?;
    let end_date = parse_date_param("end_date", q.end_date.as_deref(), false)?;
    if let (Some(start), Some(end)) = (start_date, end_date) {
        if start > end {
            return Err(AppError::BadRequest(
                "`start_date` must be before or equal to `end_date`".into(),
            ));
        }
    }

    Ok((
        page,
        limit,
        HistoryFilters {
            status_code: q.status_code,
            start_date,
            end_date,
        },
    ))
}

fn parse_date_param(
    name: &str,
    raw: Option<&str>,
    is_start: bool,
) -> Result<Option<DateTime<Utc>>, AppError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => parse_datetime_value(value, is_start).map(Some).ok_or_else(|| {
            AppError::BadRequest(format!(
                "`{name}` must be a valid datetime (RFC3339 or YYYY-MM-DD)"
            ))
        }),
        None => Ok(None),
    }
}

fn parse_datetime_value(value: &str, is_start: bool) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        let time = if is_start {
            NaiveTime::from_hms_opt(0, 0, 0)
        } else {
            NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999)
        }?;
        return Some(DateTime::<Utc>::from_naive_utc_and_offset(
            NaiveDateTime::new(date, time),
            Utc,
        ));
    }
    None
}
