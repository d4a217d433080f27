// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the herald broadcast service.

use thiserror::Error;

/// The primary error type used across all herald crates.
///
/// Classified per-recipient delivery errors are NOT represented here; they
/// are data ([`crate::types::DeliveryOutcome`]) aggregated into the dispatch
/// report. Only structural failures surface as `HeraldError`.
#[derive(Debug, Error)]
pub enum HeraldError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging transport errors outside the classified per-recipient set
    /// (connection setup, malformed token, serialization).
    #[error("transport error: {message}")]
    Transport {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Referenced notification does not exist.
    #[error("notification {0} not found")]
    NotificationNotFound(i64),

    /// Referenced recipient does not exist.
    #[error("recipient {0} not found")]
    RecipientNotFound(i64),

    /// A notification lifecycle transition that is not allowed,
    /// e.g. re-dispatching an already sent notification without a reset.
    #[error("invalid status transition for notification {id}: {from} -> {to}")]
    InvalidTransition {
        id: i64,
        from: crate::types::NotificationStatus,
        to: crate::types::NotificationStatus,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::NotificationStatus;

    #[test]
    fn not_found_messages_carry_the_id() {
        let err = HeraldError::NotificationNotFound(42);
        assert_eq!(err.to_string(), "notification 42 not found");

        let err = HeraldError::RecipientNotFound(7);
        assert_eq!(err.to_string(), "recipient 7 not found");
    }

    #[test]
    fn invalid_transition_renders_states() {
        let err = HeraldError::InvalidTransition {
            id: 1,
            from: NotificationStatus::Sent,
            to: NotificationStatus::Sending,
        };
        assert!(err.to_string().contains("sent -> sending"));
    }
}
