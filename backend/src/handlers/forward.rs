use axum::{body::Bytes, extract::State, Json};

use crate::{
    error::AppError,
    models::prediction::{ForwardRequest, ForwardResponse},
    state::AppState,
};

/// `POST /api/forward`: scores one feature mapping.
///
/// The body is decoded here rather than through the `Json` extractor so
/// malformed payloads answer with the same `{"detail"}` shape as every other
/// client error.
pub async fn forward(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ForwardResponse>, AppError> {
    let request = parse_forward_request(&body)?;

    let prediction = state.scorer.score(&request.data).await.map_err(|err| {
        tracing::info!(error = %err, "Scoring request rejected");
        AppError::from(err)
    })?;

    tracing::debug!(
        prediction = prediction.label,
        probability = prediction.probability,
        "Scored transaction"
    );
    Ok(Json(ForwardResponse::new(
        prediction.label,
        prediction.probability,
    )))
}

fn parse_forward_request(body: &[u8]) -> Result<ForwardRequest, AppError> {
    if body.is_empty() {
        return Err(AppError::BadRequest("Request body is required".into()));
    }
    serde_json::from_slice::<ForwardRequest>(body)
        .map_err(|err| AppError::BadRequest(format!("Invalid request body: {err}")))
}
