//! Interception pipeline for scoring calls.
//!
//! Every `POST .../api/forward` passes through these stages:
//!
//! 1. capture: buffer the request body, decode it, and hand the handler a
//!    replay of the same bytes;
//! 2. delegate: run the handler chain and time it;
//! 3. drain: collect the streamed response into one buffer and rebuild an
//!    equivalent response;
//! 4. derive: read the outcome fields (prediction, probability, error
//!    message) out of the buffered response;
//! 5. persist: write one history record; failures are logged and dropped.
//!
//! The stages run in a spawned task so the record is still written when the
//! client goes away mid-request.

use axum::{
    body::{Body, Bytes},
    extract::{ConnectInfo, Request, State},
    http::{header::CONTENT_LENGTH, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use http_body::{Body as HttpBody, Frame};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::{
    collections::VecDeque,
    net::SocketAddr,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use tracing::Instrument;

use crate::{
    error::AppError,
    middleware::request_id::RequestId,
    models::prediction_history::NewPredictionHistory,
    services::prediction_history::HistoryStore,
    state::AppState,
};

const SCORING_PATH_SUFFIX: &str = "/api/forward";
const UNKNOWN_CLIENT: &str = "unknown";
const INVALID_JSON: &str = "Invalid JSON";
const REQUEST_BODY_TOO_LARGE: &str = "Request body too large";
const REQUEST_BODY_UNREADABLE: &str = "Failed to read request body";
const RESPONSE_PARSE_FAILED: &str = "Failed to parse successful response";
const RESPONSE_BODY_UNREADABLE: &str = "Failed to read response body";

pub async fn record_prediction_history(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !is_scoring_call(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let span = tracing::info_span!("scoring_call", path = %request.uri().path());
    let pipeline = async move {
        let (request, mut exchange) =
            ScoringExchange::capture(request, state.config.max_request_body_bytes).await;

        let response = next.run(request).await;
        exchange.processing_time = exchange.started.elapsed().as_secs_f64();

        let response = exchange.drain(response).await;
        let record = exchange.into_record(state.model_version());
        persist(state.history.as_ref(), record).await;
        response
    };

    match tokio::spawn(pipeline.instrument(span)).await {
        Ok(response) => response,
        Err(err) => {
            AppError::InternalServerError(anyhow::anyhow!("scoring pipeline failed: {err}"))
                .into_response()
        }
    }
}

fn is_scoring_call(method: &Method, path: &str) -> bool {
    method == Method::POST && path.trim_end_matches('/').ends_with(SCORING_PATH_SUFFIX)
}

/// Per-request state threaded through the pipeline stages.
#[derive(Debug)]
struct ScoringExchange {
    timestamp: DateTime<Utc>,
    started: Instant,
    client_ip: String,
    request_id: Option<String>,
    request_payload: Value,
    processing_time: f64,
    status: StatusCode,
    response_body: Option<Bytes>,
}

impl ScoringExchange {
    async fn capture(request: Request, max_body_bytes: usize) -> (Request, Self) {
        let timestamp = Utc::now();
        let started = Instant::now();
        let client_ip = extract_client_ip(&request);
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.clone())
            .or_else(|| header_value(request.headers(), "x-request-id"));

        let (request, captured) = buffer_request_body(request, max_body_bytes).await;
        let request_payload = decode_request_payload(&captured);

        let exchange = Self {
            timestamp,
            started,
            client_ip,
            request_id,
            request_payload,
            processing_time: 0.0,
            status: StatusCode::OK,
            response_body: None,
        };
        (request, exchange)
    }

    /// Buffers the whole response body and rebuilds the response around it.
    async fn drain(&mut self, response: Response) -> Response {
        let (mut parts, body) = response.into_parts();
        self.status = parts.status;
        match body.collect().await {
            Ok(collected) => {
                let bytes = collected.to_bytes();
                self.response_body = Some(bytes.clone());
                Response::from_parts(parts, Body::from(bytes))
            }
            Err(err) => {
                tracing::warn!(
                    error = ?err,
                    status = parts.status.as_u16(),
                    "Failed to drain scoring response body"
                );
                parts.headers.remove(CONTENT_LENGTH);
                Response::from_parts(parts, Body::empty())
            }
        }
    }

    fn into_record(self, model_version: &str) -> NewPredictionHistory {
        let outcome = match self.response_body.as_ref() {
            Some(body) => derive_outcome(self.status, body),
            None => ScoringOutcome::failed(RESPONSE_BODY_UNREADABLE.to_string()),
        };
        NewPredictionHistory {
            timestamp: self.timestamp,
            request_data: self.request_payload,
            prediction: outcome.prediction,
            probability: outcome.probability,
            status_code: i64::from(self.status.as_u16()),
            error_message: outcome.error_message,
            client_ip: Some(self.client_ip),
            model_version: model_version.to_string(),
            processing_time: Some(self.processing_time),
            request_id: self.request_id,
        }
    }
}

#[derive(Debug, Default, PartialEq)]
struct ScoringOutcome {
    prediction: Option<i64>,
    probability: Option<f64>,
    error_message: Option<String>,
}

impl ScoringOutcome {
    fn failed(message: String) -> Self {
        Self {
            error_message: Some(message),
            ..Self::default()
        }
    }
}

fn derive_outcome(status: StatusCode, body: &[u8]) -> ScoringOutcome {
    let parsed = serde_json::from_slice::<Value>(body).ok();

    if status == StatusCode::OK {
        return match parsed {
            Some(Value::Object(map)) => ScoringOutcome {
                prediction: map.get("prediction").and_then(Value::as_i64),
                probability: map.get("probability").and_then(Value::as_f64),
                error_message: None,
            },
            _ => ScoringOutcome::failed(RESPONSE_PARSE_FAILED.to_string()),
        };
    }

    let message = match parsed {
        Some(Value::Object(map)) => {
            let detail = map.get("detail").map(|detail| match detail {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            });
            detail.unwrap_or_else(|| Value::Object(map).to_string())
        }
        Some(other) => other.to_string(),
        None => format!("HTTP {}", status.as_u16()),
    };
    ScoringOutcome::failed(message)
}

async fn persist(store: &dyn HistoryStore, record: NewPredictionHistory) {
    let status_code = record.status_code;
    match store.insert(record).await {
        Ok(id) => tracing::debug!(history_id = id, status_code, "Recorded scoring call"),
        Err(err) => tracing::warn!(
            error = ?err,
            status_code,
            "Failed to save prediction history"
        ),
    }
}

#[derive(Debug)]
enum CapturedBody {
    Complete(Bytes),
    TooLarge,
    Unreadable,
}

fn decode_request_payload(captured: &CapturedBody) -> Value {
    match captured {
        CapturedBody::Complete(bytes) if bytes.is_empty() => json!({}),
        CapturedBody::Complete(bytes) => match serde_json::from_slice::<Value>(bytes) {
            Ok(value @ Value::Object(_)) => value,
            _ => json!({ "error": INVALID_JSON }),
        },
        CapturedBody::TooLarge => json!({ "error": REQUEST_BODY_TOO_LARGE }),
        CapturedBody::Unreadable => json!({ "error": REQUEST_BODY_UNREADABLE }),
    }
}

/// Replays frames read by the pipeline, then continues with whatever is left
/// of the original body.
struct BufferedBody {
    buffered: VecDeque<Frame<Bytes>>,
    inner: Body,
    pending_error: Option<axum::Error>,
}

impl BufferedBody {
    fn new(
        buffered: VecDeque<Frame<Bytes>>,
        inner: Body,
        pending_error: Option<axum::Error>,
    ) -> Self {
        Self {
            buffered,
            inner,
            pending_error,
        }
    }

    fn buffered_len(&self) -> u64 {
        self.buffered
            .iter()
            .filter_map(|frame| frame.data_ref().map(|data| data.len() as u64))
            .sum()
    }
}

impl HttpBody for BufferedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if let Some(frame) = this.buffered.pop_front() {
            return Poll::Ready(Some(Ok(frame)));
        }
        if let Some(err) = this.pending_error.take() {
            this.inner = Body::empty();
            return Poll::Ready(Some(Err(err)));
        }
        Pin::new(&mut this.inner).poll_frame(cx)
    }

    fn size_hint(&self) -> http_body::SizeHint {
        let buffered_len = self.buffered_len();
        let inner = self.inner.size_hint();
        // Built from scratch: the lower bound must never exceed the upper one.
        let mut hint = http_body::SizeHint::new();
        hint.set_lower(inner.lower().saturating_add(buffered_len));
        if let Some(upper) = inner.upper() {
            hint.set_upper(upper.saturating_add(buffered_len));
        }
        hint
    }

    fn is_end_stream(&self) -> bool {
        if !self.buffered.is_empty() || self.pending_error.is_some() {
            return false;
        }
        self.inner.is_end_stream()
    }
}

/// Reads up to `max_bytes` of the body for inspection. Reading stops at the
/// limit; the handler still receives every byte.
async fn buffer_request_body(request: Request, max_bytes: usize) -> (Request, CapturedBody) {
    let (parts, mut body) = request.into_parts();
    let mut buffered_frames = VecDeque::new();
    let mut buffered_bytes = Vec::new();
    let mut overflowed = false;
    let mut pending_error = None;

    while let Some(frame_result) = body.frame().await {
        match frame_result {
            Ok(frame) => {
                if let Some(data) = frame.data_ref() {
                    if buffered_bytes.len() + data.len() > max_bytes {
                        overflowed = true;
                    } else {
                        buffered_bytes.extend_from_slice(data);
                    }
                }
                buffered_frames.push_back(frame);
                if overflowed {
                    break;
                }
            }
            Err(err) => {
                pending_error = Some(err);
                break;
            }
        }
    }

    let captured = if pending_error.is_some() {
        CapturedBody::Unreadable
    } else if overflowed {
        CapturedBody::TooLarge
    } else {
        CapturedBody::Complete(Bytes::from(buffered_bytes))
    };
    let replay_body = BufferedBody::new(buffered_frames, body, pending_error);
    let request = Request::from_parts(parts, Body::new(replay_body));
    (request, captured)
}

fn extract_client_ip(request: &Request) -> String {
    let headers = request.headers();
    headers
        .get("x-forwarded-for")
        .or_else(|| headers.get("x-real-ip"))
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| {
            request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
