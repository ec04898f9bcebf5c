//! HTTP request handlers for the Social Presence API

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Path, RawQuery, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Json, Response},
    Json as JsonExtractor,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use social_presence_core::system::metrics::collect_metrics;
use social_presence_core::{PresenceError, StatusRecord, StatusStore};

use crate::core::SharedState;

/// Standard API response wrapper for all endpoints
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    /// Whether the operation was successful
    pub success: bool,
    /// Response data (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Optional message describing the result
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Create a successful API response with data
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    /// Create a successful API response with data and message
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

/// Error body returned for every failed request
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Error message
    pub error: String,
    /// Machine-readable error code
    pub code: &'static str,
}

/// Errors a handler can return
#[derive(Debug)]
pub enum ApiError {
    /// Error from the presence service
    Presence(PresenceError),
    /// The request itself was malformed
    BadRequest(String),
}

impl From<PresenceError> for ApiError {
    fn from(err: PresenceError) -> Self {
        ApiError::Presence(err)
    }
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Presence(err) => match err {
                PresenceError::InvalidUserId(_) => (StatusCode::BAD_REQUEST, "INVALID_USER_ID"),
                PresenceError::InvalidStatus(_) => (StatusCode::BAD_REQUEST, "INVALID_STATUS"),
                PresenceError::EmptyBatchRequest => (StatusCode::BAD_REQUEST, "EMPTY_BATCH_REQUEST"),
                PresenceError::StoreUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE")
                }
                PresenceError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let error = match self {
            ApiError::BadRequest(msg) => msg,
            ApiError::Presence(err) => {
                if status.is_server_error() {
                    tracing::error!("Request failed: {}", err);
                }
                err.to_string()
            }
        };

        (
            status,
            Json(ErrorResponse {
                success: false,
                error,
                code,
            }),
        )
            .into_response()
    }
}

/// Custom JSON extractor that returns proper JSON error responses
pub struct JsonRequest<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for JsonRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match JsonExtractor::<T>::from_request(req, state).await {
            Ok(JsonExtractor(value)) => Ok(JsonRequest(value)),
            Err(rejection) => {
                let error_message = match rejection {
                    JsonRejection::JsonDataError(err) => format!("Invalid request body: {}", err.body_text()),
                    JsonRejection::JsonSyntaxError(_) => "Malformed JSON".to_string(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing or invalid Content-Type header. Expected 'application/json'".to_string()
                    }
                    JsonRejection::BytesRejection(_) => "Failed to read request body".to_string(),
                    _ => "Invalid JSON request".to_string(),
                };

                tracing::warn!("JSON parsing error: {}", error_message);
                Err(ApiError::BadRequest(error_message))
            }
        }
    }
}

/// Body of `POST /api/v1/users/:id/status`
#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    /// Wire name of the new status
    pub status: String,
}

/// Heartbeat response
#[derive(Debug, Serialize)]
pub struct HeartbeatResponse {
    /// Whether the operation was successful
    pub success: bool,
    /// What the heartbeat did: promoted, refreshed, lapsed or ignored
    pub outcome: &'static str,
    /// Human-readable result
    pub message: String,
    /// Seconds until the client should heartbeat again
    pub next_heartbeat_seconds: u64,
}

/// Bulk status response
#[derive(Debug, Serialize)]
pub struct MultipleStatusResponse {
    /// Whether the operation was successful
    pub success: bool,
    /// Status per requested user
    pub data: HashMap<String, StatusRecord>,
    /// Number of users in `data`
    pub count: usize,
}

/// System health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` or `degraded`
    pub status: &'static str,
    /// Seconds since startup
    pub uptime_seconds: u64,
    /// Service version
    pub version: &'static str,
    /// Store error, when the store did not answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_error: Option<String>,
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// `POST /api/v1/users/:id/status`
pub async fn set_status<S: StatusStore>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
    JsonRequest(req): JsonRequest<SetStatusRequest>,
) -> ApiResult<StatusRecord> {
    let record = state.service.set_status(&id, &req.status).await?;
    let message = format!("Status set to {}", record.status);
    Ok(Json(ApiResponse::success_with_message(record, message)))
}

/// `GET /api/v1/users/:id/status`
pub async fn get_status<S: StatusStore>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> ApiResult<StatusRecord> {
    let record = state.service.get_status(&id).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// `GET /api/v1/users/:id/status/public`
pub async fn get_public_status<S: StatusStore>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> ApiResult<StatusRecord> {
    let mut record = state.service.get_public_status(&id).await?;
    // Other users must not learn the true status
    record.actual_status = None;
    Ok(Json(ApiResponse::success(record)))
}

/// `POST /api/v1/users/:id/heartbeat`
pub async fn heartbeat<S: StatusStore>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> Result<Json<HeartbeatResponse>, ApiError> {
    let report = state.service.heartbeat(&id).await?;
    Ok(Json(HeartbeatResponse {
        success: true,
        outcome: report.outcome.label(),
        message: "Heartbeat received successfully".to_string(),
        next_heartbeat_seconds: report.next_heartbeat.as_secs(),
    }))
}

/// `PUT /api/v1/users/:id/status/away`
pub async fn set_away<S: StatusStore>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> ApiResult<StatusRecord> {
    let record = state.service.set_away(&id).await?;
    Ok(Json(ApiResponse::success_with_message(record, "User set to away status")))
}

/// `PUT /api/v1/users/:id/status/offline`
pub async fn set_offline<S: StatusStore>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> ApiResult<StatusRecord> {
    let record = state.service.set_offline(&id).await?;
    Ok(Json(ApiResponse::success_with_message(record, "User set to offline status")))
}

/// `PUT /api/v1/users/:id/status/invisible`
pub async fn set_invisible<S: StatusStore>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> ApiResult<StatusRecord> {
    let record = state.service.set_invisible(&id).await?;
    Ok(Json(ApiResponse::success_with_message(record, "User set to invisible status")))
}

/// `PUT /api/v1/users/:id/status/dnd`
pub async fn set_dnd<S: StatusStore>(
    State(state): State<SharedState<S>>,
    Path(id): Path<String>,
) -> ApiResult<StatusRecord> {
    let record = state.service.set_dnd(&id).await?;
    Ok(Json(ApiResponse::success_with_message(record, "User set to do not disturb status")))
}

/// `GET /api/v1/users/status?user_ids=a,b&user_ids=c`
///
/// Other users' statuses are shown the way the public route shows them:
/// `invisible` reads as `offline`.
pub async fn get_multiple<S: StatusStore>(
    State(state): State<SharedState<S>>,
    RawQuery(query): RawQuery,
) -> Result<Json<MultipleStatusResponse>, ApiError> {
    let user_ids = parse_user_ids(query.as_deref().unwrap_or_default())?;
    let statuses = state.service.get_multiple(&user_ids).await?;

    let data: HashMap<String, StatusRecord> = statuses
        .into_iter()
        .map(|(id, status)| {
            let record = StatusRecord::new(id.clone(), status.public_view());
            (id, record)
        })
        .collect();

    Ok(Json(MultipleStatusResponse {
        success: true,
        count: data.len(),
        data,
    }))
}

/// Collect `user_ids` from a query string
///
/// Accepts both repeated keys and comma-separated values; blank entries
/// are dropped.
pub fn parse_user_ids(query: &str) -> Result<Vec<String>, ApiError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_str(query)
        .map_err(|e| ApiError::BadRequest(format!("Invalid query string: {}", e)))?;

    Ok(pairs
        .into_iter()
        .filter(|(key, _)| key == "user_ids")
        .flat_map(|(_, value)| {
            value
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect())
}

/// Health check endpoint
pub async fn health_check<S: StatusStore>(State(state): State<SharedState<S>>) -> Response {
    let (code, status, store_error) = match state.service.ping().await {
        Ok(()) => (StatusCode::OK, "ok", None),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, "degraded", Some(e.to_string())),
    };

    (
        code,
        Json(HealthResponse {
            status,
            uptime_seconds: state.uptime_secs(),
            version: env!("CARGO_PKG_VERSION"),
            store_error,
        }),
    )
        .into_response()
}

/// Prometheus metrics endpoint
pub async fn metrics_handler() -> Response {
    (
        [(CONTENT_TYPE, "text/plain; version=0.0.4")],
        collect_metrics(),
    )
        .into_response()
}

/// Root API endpoint
pub async fn root_handler() -> Json<Value> {
    Json(json!({
        "service": "Social Presence API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "GET /health",
            "metrics": "GET /metrics",
            "user_status": {
                "set_status": "POST /api/v1/users/:id/status",
                "get_status": "GET /api/v1/users/:id/status",
                "get_public_status": "GET /api/v1/users/:id/status/public",
                "send_heartbeat": "POST /api/v1/users/:id/heartbeat",
                "set_away": "PUT /api/v1/users/:id/status/away",
                "set_offline": "PUT /api/v1/users/:id/status/offline",
                "set_invisible": "PUT /api/v1/users/:id/status/invisible",
                "set_dnd": "PUT /api/v1/users/:id/status/dnd",
                "get_multiple": "GET /api/v1/users/status?user_ids=user_1,user_2"
            }
        }
    }))
}
