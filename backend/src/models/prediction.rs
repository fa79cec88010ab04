use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Body of `POST /api/forward`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ForwardRequest {
    /// Feature name to value mapping for one transaction.
    #[schema(value_type = Object)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ForwardResponse {
    pub success: bool,
    /// Predicted class, 0 or 1.
    pub prediction: u8,
    /// Probability of the positive (fraud) class.
    pub probability: f64,
}

impl ForwardResponse {
    pub fn new(prediction: u8, probability: f64) -> Self {
        Self {
            success: true,
            prediction,
            probability,
        }
    }
}
