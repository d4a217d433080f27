// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the herald workspace.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Default number of retry attempts for a queued delivery task.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Lifecycle state of a notification.
///
/// The reference data contained two competing vocabularies (`"Send"`/`"Error"`
/// and the lowercase set below). This enum is the single canonical one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Draft,
    Pending,
    Sending,
    Sent,
    Failed,
}

/// Delivery eligibility state of a recipient.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecipientStatus {
    Active,
    Blocked,
    Inactive,
    Deleted,
}

/// Category assigned to a failed delivery attempt by the classifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    UserBlocked,
    ChatNotFound,
    UserDeactivated,
    RateLimit,
    ServerError,
    UnknownError,
}

/// A raw error returned by the messaging transport.
///
/// Tagged record instead of an exception hierarchy: the `forbidden` flag
/// replaces the platform SDK's dedicated forbidden-error type, and `code`
/// carries the numeric API error code when one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// Numeric API error code, if the platform reported one.
    pub code: Option<u16>,
    /// Free-text error description from the platform.
    pub description: String,
    /// Whether the platform signalled this as a forbidden-class error
    /// (bot blocked by the recipient).
    pub forbidden: bool,
}

impl TransportError {
    /// A forbidden-class error (recipient blocked the bot).
    pub fn forbidden(description: impl Into<String>) -> Self {
        Self {
            code: Some(403),
            description: description.into(),
            forbidden: true,
        }
    }

    /// A generic API error with a numeric code.
    pub fn api(code: u16, description: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            description: description.into(),
            forbidden: false,
        }
    }

    /// An error with no usable code (network failure, malformed response).
    pub fn other(description: impl Into<String>) -> Self {
        Self {
            code: None,
            description: description.into(),
            forbidden: false,
        }
    }
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "[{code}] {}", self.description),
            None => write!(f, "{}", self.description),
        }
    }
}

impl std::error::Error for TransportError {}

/// A stored broadcast notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub text: String,
    pub status: NotificationStatus,
    /// Aggregated human-readable error summary from the last dispatch run.
    pub error: Option<String>,
    /// ISO 8601 timestamp of the last completed dispatch.
    pub sent_at: Option<String>,
    pub comment: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A registered recipient. `id` is the messaging-platform chat id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: i64,
    pub name: String,
    pub language: String,
    pub language_code: Option<String>,
    pub status: RecipientStatus,
    /// Set if and only if `status` is [`RecipientStatus::Blocked`];
    /// the store writes the pair in a single statement.
    pub blocked_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// An ephemeral per-recipient send task for the queue path.
///
/// Never persisted; lives only inside the process until it reaches a
/// terminal outcome or exhausts its retries.
#[derive(Debug, Clone)]
pub struct DeliveryTask {
    pub notification_id: i64,
    pub recipient_id: i64,
    pub text: String,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: DateTime<Utc>,
}

impl DeliveryTask {
    pub fn new(notification_id: i64, recipient_id: i64, text: impl Into<String>) -> Self {
        Self {
            notification_id,
            recipient_id,
            text: text.into(),
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
            created_at: Utc::now(),
        }
    }
}

/// Outcome of a single delivery attempt to one recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub recipient_id: i64,
    /// Classified category; `None` on success.
    pub category: Option<ErrorCategory>,
    pub message: String,
    pub should_retry: bool,
}

impl DeliveryOutcome {
    pub fn delivered(recipient_id: i64) -> Self {
        Self {
            success: true,
            recipient_id,
            category: None,
            message: "notification delivered".to_string(),
            should_retry: false,
        }
    }
}

/// Detail record for one failed recipient in a dispatch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryFailure {
    pub recipient_id: i64,
    pub category: ErrorCategory,
    pub message: String,
}

/// Aggregate result of one dispatch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchReport {
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    pub failures: Vec<DeliveryFailure>,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl DispatchReport {
    /// Report for a run with no eligible recipients.
    pub fn empty(duration: Duration) -> Self {
        Self {
            total: 0,
            sent: 0,
            failed: 0,
            failures: Vec::new(),
            duration,
        }
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_enums_round_trip_through_strings() {
        for status in [
            NotificationStatus::Draft,
            NotificationStatus::Pending,
            NotificationStatus::Sending,
            NotificationStatus::Sent,
            NotificationStatus::Failed,
        ] {
            let s = status.to_string();
            assert_eq!(NotificationStatus::from_str(&s).unwrap(), status);
        }

        for status in [
            RecipientStatus::Active,
            RecipientStatus::Blocked,
            RecipientStatus::Inactive,
            RecipientStatus::Deleted,
        ] {
            let s = status.to_string();
            assert_eq!(RecipientStatus::from_str(&s).unwrap(), status);
        }
    }

    #[test]
    fn statuses_serialize_lowercase() {
        assert_eq!(NotificationStatus::Sending.to_string(), "sending");
        assert_eq!(RecipientStatus::Blocked.to_string(), "blocked");
    }

    #[test]
    fn error_categories_serialize_snake_case() {
        assert_eq!(ErrorCategory::UserBlocked.to_string(), "user_blocked");
        assert_eq!(ErrorCategory::ChatNotFound.to_string(), "chat_not_found");
        assert_eq!(ErrorCategory::RateLimit.to_string(), "rate_limit");
        assert_eq!(
            serde_json::to_string(&ErrorCategory::ServerError).unwrap(),
            "\"server_error\""
        );
    }

    #[test]
    fn transport_error_constructors() {
        let err = TransportError::forbidden("Forbidden: bot was blocked by the user");
        assert!(err.forbidden);
        assert_eq!(err.code, Some(403));

        let err = TransportError::api(400, "Bad Request: chat not found");
        assert!(!err.forbidden);
        assert_eq!(err.to_string(), "[400] Bad Request: chat not found");

        let err = TransportError::other("connection reset");
        assert_eq!(err.code, None);
        assert_eq!(err.to_string(), "connection reset");
    }

    #[test]
    fn delivery_task_defaults() {
        let task = DeliveryTask::new(1, 100, "hello");
        assert_eq!(task.retry_count, 0);
        assert_eq!(task.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn empty_report_has_zero_counts() {
        let report = DispatchReport::empty(Duration::from_millis(5));
        assert_eq!(report.total, 0);
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 0);
        assert!(report.failures.is_empty());
    }
}
