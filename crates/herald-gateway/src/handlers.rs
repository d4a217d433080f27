// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the admin REST API.
//!
//! Dispatch endpoints return 200 even when some deliveries failed;
//! partial failure is a report, not an HTTP error. Only structural
//! problems (unknown id, storage failure) map to error statuses.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use herald_core::error::HeraldError;
use herald_core::types::{DispatchReport, Notification, NotificationStatus, RecipientStatus};

use crate::server::GatewayState;

/// Previews longer than this many characters are truncated in list views.
const PREVIEW_LEN: usize = 100;

/// Request body for POST /api/notifications/send.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub notification_id: i64,
}

/// Response body for POST /api/notifications/send.
#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub message: String,
    pub notification_id: i64,
    pub sent_count: usize,
    pub error_count: usize,
    pub total_users: usize,
}

impl SendResponse {
    fn from_report(notification_id: i64, report: &DispatchReport) -> Self {
        let message = if report.failed == 0 {
            format!("Notification delivered to {} recipients", report.sent)
        } else {
            format!("{} delivered, {} failed", report.sent, report.failed)
        };
        Self {
            message,
            notification_id,
            sent_count: report.sent,
            error_count: report.failed,
            total_users: report.total,
        }
    }
}

/// Response body for POST /api/notifications/retry/{id}.
#[derive(Debug, Serialize)]
pub struct RetryResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sent_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<usize>,
}

/// One row of GET /api/notifications/recent.
#[derive(Debug, Serialize)]
pub struct NotificationPreview {
    pub id: i64,
    pub text: String,
    pub status: NotificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sent_at: Option<String>,
    pub created_at: String,
}

impl NotificationPreview {
    fn from_notification(n: Notification) -> Self {
        Self {
            id: n.id,
            text: truncate_preview(&n.text),
            status: n.status,
            error: n.error,
            sent_at: n.sent_at,
            created_at: n.created_at,
        }
    }
}

/// Query parameters for GET /api/notifications/recent.
#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    #[serde(default = "default_recent_limit")]
    pub limit: i64,
}

fn default_recent_limit() -> i64 {
    10
}

/// Request body for POST /notifications.
#[derive(Debug, Deserialize)]
pub struct CreateNotificationRequest {
    pub text: String,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Request body for PUT /notifications/{id}.
#[derive(Debug, Deserialize)]
pub struct UpdateNotificationRequest {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Query parameters for GET /recipients.
#[derive(Debug, Deserialize)]
pub struct RecipientsQuery {
    #[serde(default = "default_recipient_status")]
    pub status: RecipientStatus,
}

fn default_recipient_status() -> RecipientStatus {
    RecipientStatus::Active
}

/// Request body for PUT /recipients/{id}.
#[derive(Debug, Deserialize)]
pub struct UpsertRecipientRequest {
    pub name: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub language_code: Option<String>,
}

fn default_language() -> String {
    "en".to_string()
}

/// Response body for GET /recipients/count.
#[derive(Debug, Serialize)]
pub struct RecipientCountResponse {
    pub count: i64,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn truncate_preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_LEN {
        let head: String = text.chars().take(PREVIEW_LEN).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn error_to_response(err: HeraldError) -> Response {
    let status = match &err {
        HeraldError::NotificationNotFound(_) | HeraldError::RecipientNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        _ => {
            error!(error = %err, "request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
        .into_response()
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// POST /api/notifications/send
///
/// Runs a broadcast and reports the counts. Partial failure is still 200.
pub async fn post_send(
    State(state): State<GatewayState>,
    Json(body): Json<SendRequest>,
) -> Response {
    match state.dispatcher.dispatch(body.notification_id).await {
        Ok(report) => {
            Json(SendResponse::from_report(body.notification_id, &report)).into_response()
        }
        Err(err) => error_to_response(err),
    }
}

/// GET /api/notifications/{id}/status
pub async fn get_status(State(state): State<GatewayState>, Path(id): Path<i64>) -> Response {
    match state.notifications.get(id).await {
        Ok(Some(notification)) => Json(notification).into_response(),
        Ok(None) => error_to_response(HeraldError::NotificationNotFound(id)),
        Err(err) => error_to_response(err),
    }
}

/// GET /api/notifications/recent?limit=
pub async fn get_recent(
    State(state): State<GatewayState>,
    Query(query): Query<RecentQuery>,
) -> Response {
    match state.notifications.list_recent(query.limit).await {
        Ok(rows) => Json(
            rows.into_iter()
                .map(NotificationPreview::from_notification)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(err) => error_to_response(err),
    }
}

/// POST /api/notifications/retry/{id}
///
/// An already-delivered notification is not re-sent; the response says so
/// instead of erroring, matching what an admin UI expects to display.
pub async fn post_retry(State(state): State<GatewayState>, Path(id): Path<i64>) -> Response {
    match state.dispatcher.retry(id).await {
        Ok(report) => Json(RetryResponse {
            status: "retried".to_string(),
            sent_count: Some(report.sent),
            error_count: Some(report.failed),
        })
        .into_response(),
        Err(HeraldError::InvalidTransition {
            from: NotificationStatus::Sent,
            ..
        }) => Json(RetryResponse {
            status: "already_sent".to_string(),
            sent_count: None,
            error_count: None,
        })
        .into_response(),
        Err(err) => error_to_response(err),
    }
}

/// GET /notifications
pub async fn list_notifications(State(state): State<GatewayState>) -> Response {
    match state.notifications.list_all().await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => error_to_response(err),
    }
}

/// GET /notifications/{id}
pub async fn get_notification(State(state): State<GatewayState>, Path(id): Path<i64>) -> Response {
    match state.notifications.get(id).await {
        Ok(Some(notification)) => Json(notification).into_response(),
        Ok(None) => error_to_response(HeraldError::NotificationNotFound(id)),
        Err(err) => error_to_response(err),
    }
}

/// POST /notifications
pub async fn create_notification(
    State(state): State<GatewayState>,
    Json(body): Json<CreateNotificationRequest>,
) -> Response {
    match state
        .notifications
        .create(&body.text, body.comment.as_deref())
        .await
    {
        Ok(notification) => (StatusCode::CREATED, Json(notification)).into_response(),
        Err(err) => error_to_response(err),
    }
}

/// PUT /notifications/{id}
pub async fn update_notification(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateNotificationRequest>,
) -> Response {
    match state
        .notifications
        .update_content(id, body.text.as_deref(), body.comment.as_deref())
        .await
    {
        Ok(Some(notification)) => Json(notification).into_response(),
        Ok(None) => error_to_response(HeraldError::NotificationNotFound(id)),
        Err(err) => error_to_response(err),
    }
}

/// DELETE /notifications/{id}
pub async fn delete_notification(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Response {
    match state.notifications.delete(id).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => error_to_response(HeraldError::NotificationNotFound(id)),
        Err(err) => error_to_response(err),
    }
}

/// GET /recipients?status=
pub async fn list_recipients(
    State(state): State<GatewayState>,
    Query(query): Query<RecipientsQuery>,
) -> Response {
    match state.recipients.list_by_status(query.status).await {
        Ok(rows) => Json(rows).into_response(),
        Err(err) => error_to_response(err),
    }
}

/// GET /recipients/count
pub async fn count_recipients(State(state): State<GatewayState>) -> Response {
    match state.recipients.count().await {
        Ok(count) => Json(RecipientCountResponse { count }).into_response(),
        Err(err) => error_to_response(err),
    }
}

/// GET /recipients/{id}
pub async fn get_recipient(State(state): State<GatewayState>, Path(id): Path<i64>) -> Response {
    match state.recipients.get(id).await {
        Ok(Some(recipient)) => Json(recipient).into_response(),
        Ok(None) => error_to_response(HeraldError::RecipientNotFound(id)),
        Err(err) => error_to_response(err),
    }
}

/// PUT /recipients/{id}
///
/// Registers a recipient or refreshes an existing profile. The id is the
/// messaging-platform chat id, so the client chooses it.
pub async fn upsert_recipient(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
    Json(body): Json<UpsertRecipientRequest>,
) -> Response {
    match state
        .recipients
        .upsert(id, &body.name, &body.language, body.language_code.as_deref())
        .await
    {
        Ok(recipient) => Json(recipient).into_response(),
        Err(err) => error_to_response(err),
    }
}
