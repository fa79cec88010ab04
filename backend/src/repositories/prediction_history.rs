use chrono::{DateTime, Utc};
use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};

use crate::models::prediction_history::{HistoryStats, NewPredictionHistory, PredictionHistory};

const SELECT_COLUMNS: &str = "SELECT id, timestamp, request_data, prediction, probability, \
     status_code, error_message, client_ip, model_version, processing_time, request_id \
     FROM prediction_history";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilters {
    pub status_code: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

pub async fn insert_prediction_history(
    conn: &mut SqliteConnection,
    record: &NewPredictionHistory,
) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO prediction_history \
         (timestamp, request_data, prediction, probability, status_code, error_message, \
         client_ip, model_version, processing_time, request_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.timestamp)
    .bind(Json(&record.request_data))
    .bind(record.prediction)
    .bind(record.probability)
    .bind(record.status_code)
    .bind(&record.error_message)
    .bind(&record.client_ip)
    .bind(&record.model_version)
    .bind(record.processing_time)
    .bind(&record.request_id)
    .execute(conn)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn fetch_prediction_history(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<PredictionHistory>, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
    builder.push(" WHERE id = ").push_bind(id);
    builder
        .build_query_as::<PredictionHistory>()
        .fetch_optional(pool)
        .await
}

pub async fn count_prediction_history(
    pool: &SqlitePool,
    filters: &HistoryFilters,
) -> Result<i64, sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT COUNT(*) FROM prediction_history");
    let mut has_clause = false;
    apply_history_filters(&mut builder, &mut has_clause, filters);
    builder.build_query_scalar::<i64>().fetch_one(pool).await
}

pub async fn list_prediction_history(
    pool: &SqlitePool,
    filters: &HistoryFilters,
    limit: i64,
    offset: i64,
) -> Result<(Vec<PredictionHistory>, i64), sqlx::Error> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_COLUMNS);
    let mut has_clause = false;
    apply_history_filters(&mut builder, &mut has_clause, filters);
    builder
        .push(" ORDER BY timestamp DESC, id DESC")
        .push(" LIMIT ")
        .push_bind(limit)
        .push(" OFFSET ")
        .push_bind(offset);
    let items = builder
        .build_query_as::<PredictionHistory>()
        .fetch_all(pool)
        .await?;

    let total = count_prediction_history(pool, filters).await?;
    Ok((items, total))
}

pub async fn prediction_history_stats(
    pool: &SqlitePool,
    window_start: DateTime<Utc>,
) -> Result<HistoryStats, sqlx::Error> {
    let (total, successful, avg_processing_time, count_in_window): (
        i64,
        Option<i64>,
        Option<f64>,
        Option<i64>,
    ) = sqlx::query_as(
        "SELECT COUNT(*), \
         SUM(CASE WHEN status_code = 200 THEN 1 ELSE 0 END), \
         AVG(processing_time), \
         SUM(CASE WHEN timestamp >= ? THEN 1 ELSE 0 END) \
         FROM prediction_history",
    )
    .bind(window_start)
    .fetch_one(pool)
    .await?;

    Ok(HistoryStats::from_counts(
        total,
        successful.unwrap_or(0),
        avg_processing_time,
        count_in_window.unwrap_or(0),
    ))
}

pub async fn delete_prediction_history_before(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM prediction_history WHERE timestamp < ?")
        .bind(cutoff)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

fn apply_history_filters(
    builder: &mut QueryBuilder<'_, Sqlite>,
    has_clause: &mut bool,
    filters: &HistoryFilters,
) {
    if let Some(status_code) = filters.status_code {
        push_clause(builder, has_clause);
        builder.push("status_code = ").push_bind(status_code);
    }
    if let Some(start_date) = filters.start_date {
        push_clause(builder, has_clause);
        builder.push("timestamp >= ").push_bind(start_date);
    }
    if let Some(end_date) = filters.end_date {
        push_clause(builder, has_clause);
        builder.push("timestamp <= ").push_bind(end_date);
    }
}

fn push_clause(builder: &mut QueryBuilder<'_, Sqlite>, has_clause: &mut bool) {
    if *has_clause {
        builder.push(" AND ");
    } else {
        builder.push(" WHERE ");
        *has_clause = true;
    }
}
