// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transport for deterministic delivery testing.
//!
//! `MockTransport` implements `Transport` with scripted per-recipient
//! failures and captured sent messages for assertion in tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use herald_core::traits::Transport;
use herald_core::types::TransportError;

/// A message captured by the mock transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient_id: i64,
    pub text: String,
}

/// A mock messaging transport for testing.
///
/// Sends succeed by default. `fail_for()` scripts a persistent failure for
/// a recipient; `fail_once_for()` scripts a failure that is consumed by the
/// first attempt, so a retry succeeds. Successful sends are captured and
/// retrievable via `sent_messages()`.
pub struct MockTransport {
    failures: Arc<Mutex<HashMap<i64, TransportError>>>,
    one_shot_failures: Arc<Mutex<HashMap<i64, TransportError>>>,
    sent: Arc<Mutex<Vec<SentMessage>>>,
    attempts: Arc<Mutex<HashMap<i64, usize>>>,
}

impl MockTransport {
    /// Create a new mock transport where every send succeeds.
    pub fn new() -> Self {
        Self {
            failures: Arc::new(Mutex::new(HashMap::new())),
            one_shot_failures: Arc::new(Mutex::new(HashMap::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            attempts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Script a persistent failure for a recipient.
    pub async fn fail_for(&self, recipient_id: i64, err: TransportError) {
        self.failures.lock().await.insert(recipient_id, err);
    }

    /// Script a failure consumed by the first attempt for a recipient.
    pub async fn fail_once_for(&self, recipient_id: i64, err: TransportError) {
        self.one_shot_failures.lock().await.insert(recipient_id, err);
    }

    /// Remove any scripted failure for a recipient.
    pub async fn clear_failure(&self, recipient_id: i64) {
        self.failures.lock().await.remove(&recipient_id);
        self.one_shot_failures.lock().await.remove(&recipient_id);
    }

    /// All messages that were delivered successfully.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Count of successfully delivered messages.
    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Number of send attempts made for a recipient, scripted failures
    /// included.
    pub async fn attempts_for(&self, recipient_id: i64) -> usize {
        self.attempts
            .lock()
            .await
            .get(&recipient_id)
            .copied()
            .unwrap_or(0)
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send_text(&self, recipient_id: i64, text: &str) -> Result<(), TransportError> {
        *self.attempts.lock().await.entry(recipient_id).or_insert(0) += 1;

        if let Some(err) = self.one_shot_failures.lock().await.remove(&recipient_id) {
            return Err(err);
        }
        if let Some(err) = self.failures.lock().await.get(&recipient_id) {
            return Err(err.clone());
        }

        self.sent.lock().await.push(SentMessage {
            recipient_id,
            text: text.to_string(),
        });
        Ok(())
    }
}
