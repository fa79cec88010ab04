use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{types::Json, FromRow};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PredictionHistory {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub request_data: Json<Value>,
    pub prediction: Option<i64>,
    pub probability: Option<f64>,
    pub status_code: i64,
    pub error_message: Option<String>,
    pub client_ip: Option<String>,
    pub model_version: String,
    pub processing_time: Option<f64>,
    pub request_id: Option<String>,
}

/// A history record before the store assigns its id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPredictionHistory {
    pub timestamp: DateTime<Utc>,
    pub request_data: Value,
    pub prediction: Option<i64>,
    pub probability: Option<f64>,
    pub status_code: i64,
    pub error_message: Option<String>,
    pub client_ip: Option<String>,
    pub model_version: String,
    pub processing_time: Option<f64>,
    pub request_id: Option<String>,
}

impl NewPredictionHistory {
    /// Drops a half-populated outcome so prediction and probability are
    /// either both present or both null.
    pub fn normalized(mut self) -> Self {
        let valid_prediction = matches!(self.prediction, Some(0) | Some(1));
        let valid_probability = self
            .probability
            .map(|p| p.is_finite() && (0.0..=1.0).contains(&p))
            .unwrap_or(false);
        if !(valid_prediction && valid_probability) {
            if self.prediction.is_some() || self.probability.is_some() {
                self.error_message
                    .get_or_insert_with(|| "Prediction outcome incomplete".to_string());
            }
            self.prediction = None;
            self.probability = None;
        }
        self
    }
}

/// Aggregates over the whole history table.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryStats {
    pub total: i64,
    pub successful: i64,
    pub failed: i64,
    pub success_rate: f64,
    pub avg_processing_time: Option<f64>,
    pub count_in_window: i64,
}

impl HistoryStats {
    pub fn from_counts(
        total: i64,
        successful: i64,
        avg_processing_time: Option<f64>,
        count_in_window: i64,
    ) -> Self {
        let success_rate = if total > 0 {
            successful as f64 / total as f64
        } else {
            0.0
        };
        Self {
            total,
            successful,
            failed: total - successful,
            success_rate,
            avg_processing_time,
            count_in_window,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryItemResponse {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub request_data: Value,
    pub prediction: Option<i64>,
    pub probability: Option<f64>,
    pub status_code: i64,
    pub error_message: Option<String>,
    pub client_ip: Option<String>,
    pub model_version: String,
    pub processing_time: Option<f64>,
    pub request_id: Option<String>,
}

impl From<PredictionHistory> for HistoryItemResponse {
    fn from(record: PredictionHistory) -> Self {
        Self {
            id: record.id,
            timestamp: record.timestamp,
            request_data: record.request_data.0,
            prediction: record.prediction,
            probability: record.probability,
            status_code: record.status_code,
            error_message: record.error_message,
            client_ip: record.client_ip,
            model_version: record.model_version,
            processing_time: record.processing_time,
            request_id: record.request_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryListResponse {
    pub items: Vec<HistoryItemResponse>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HistoryStatsResponse {
    pub total_requests: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub success_rate: f64,
    pub average_processing_time: Option<f64>,
    pub last_24_hours: i64,
}

impl From<HistoryStats> for HistoryStatsResponse {
    fn from(stats: HistoryStats) -> Self {
        Self {
            total_requests: stats.total,
            successful_requests: stats.successful,
            failed_requests: stats.failed,
            success_rate: stats.success_rate,
            average_processing_time: stats.avg_processing_time,
            last_24_hours: stats.count_in_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(prediction: Option<i64>, probability: Option<f64>) -> NewPredictionHistory {
        NewPredictionHistory {
            timestamp: Utc::now(),
            request_data: json!({}),
            prediction,
            probability,
            status_code: 200,
            error_message: None,
            client_ip: None,
            model_version: "1.0.0".into(),
            processing_time: Some(0.01),
            request_id: None,
        }
    }

    #[test]
    fn normalized_keeps_complete_outcome() {
        let normalized = record(Some(1), Some(0.87)).normalized();
        assert_eq!(normalized.prediction, Some(1));
        assert_eq!(normalized.probability, Some(0.87));
        assert!(normalized.error_message.is_none());
    }

    #[test]
    fn normalized_clears_half_outcome() {
        let normalized = record(Some(1), None).normalized();
        assert!(normalized.prediction.is_none());
        assert!(normalized.probability.is_none());
        assert!(normalized.error_message.is_some());
    }

    #[test]
    fn normalized_rejects_out_of_range_values() {
        let normalized = record(Some(2), Some(1.5)).normalized();
        assert!(normalized.prediction.is_none());
        assert!(normalized.probability.is_none());
    }

    #[test]
    fn normalized_leaves_empty_outcome_untouched() {
        let normalized = record(None, None).normalized();
        assert!(normalized.error_message.is_none());
    }

    #[test]
    fn stats_success_rate_is_zero_without_records() {
        let stats = HistoryStats::from_counts(0, 0, None, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.failed, 0);
    }

    #[test]
    fn stats_success_rate_divides_exactly() {
        let stats = HistoryStats::from_counts(4, 3, Some(0.2), 2);
        assert_eq!(stats.successful + stats.failed, stats.total);
        assert_eq!(stats.success_rate, 3.0 / 4.0);
    }
}
