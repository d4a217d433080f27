// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging transport trait for the external send-message RPC.

use async_trait::async_trait;

use crate::types::TransportError;

/// Outbound messaging transport (Telegram Bot API in production).
///
/// Errors are the tagged [`TransportError`] record, never a panic or an
/// opaque error type; the classifier inspects code, description, and the
/// forbidden flag to decide retry policy.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `text` to the chat identified by `recipient_id`.
    ///
    /// The call has no idempotency guarantee; a retried send may deliver
    /// the same message twice.
    async fn send_text(&self, recipient_id: i64, text: &str) -> Result<(), TransportError>;
}
