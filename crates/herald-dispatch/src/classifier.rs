// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery error classifier.
//!
//! Pure function from a [`TransportError`] to a delivery verdict. All
//! platform string matching is confined to this module; the engine and
//! queue act only on the structured [`Classification`].

use herald_core::types::{ErrorCategory, RecipientStatus, TransportError};

/// Verdict for a single failed delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: ErrorCategory,
    /// Whether the retry queue may attempt this delivery again.
    pub should_retry: bool,
    /// New recipient status to persist, when the failure proves the
    /// recipient is permanently unreachable.
    pub recipient_status_update: Option<RecipientStatus>,
    /// Operator-facing description used in failure records and logs.
    pub human_message: String,
}

/// Classifies a transport failure for one recipient.
///
/// Rules are checked in priority order; the first match wins:
///
/// 1. forbidden flag or code 403: the recipient blocked the bot
/// 2. code 400 with "chat not found": the chat no longer exists
/// 3. code 400 with "user is deactivated": the account was deactivated
/// 4. code 429: rate limited, retryable
/// 5. code 500/502/503/504: platform outage, retryable
/// 6. anything else: unknown, retryable
///
/// Substring checks are case-insensitive.
pub fn classify(err: &TransportError, recipient_id: i64) -> Classification {
    let description = err.description.to_lowercase();

    if err.forbidden || err.code == Some(403) {
        return Classification {
            category: ErrorCategory::UserBlocked,
            should_retry: false,
            recipient_status_update: Some(RecipientStatus::Blocked),
            human_message: format!("User {recipient_id} blocked the bot"),
        };
    }

    if err.code == Some(400) && description.contains("chat not found") {
        return Classification {
            category: ErrorCategory::ChatNotFound,
            should_retry: false,
            recipient_status_update: Some(RecipientStatus::Deleted),
            human_message: format!("Chat not found for user {recipient_id}"),
        };
    }

    if err.code == Some(400) && description.contains("user is deactivated") {
        return Classification {
            category: ErrorCategory::UserDeactivated,
            should_retry: false,
            recipient_status_update: Some(RecipientStatus::Inactive),
            human_message: format!("User {recipient_id} is deactivated"),
        };
    }

    if err.code == Some(429) {
        return Classification {
            category: ErrorCategory::RateLimit,
            should_retry: true,
            recipient_status_update: None,
            human_message: format!("Rate limited while sending to user {recipient_id}"),
        };
    }

    if matches!(err.code, Some(500 | 502 | 503 | 504)) {
        return Classification {
            category: ErrorCategory::ServerError,
            should_retry: true,
            recipient_status_update: None,
            human_message: format!("Server error while sending to user {recipient_id}"),
        };
    }

    Classification {
        category: ErrorCategory::UnknownError,
        should_retry: true,
        recipient_status_update: None,
        human_message: format!(
            "Failed to send to user {recipient_id}: {}",
            err.description
        ),
    }
}
