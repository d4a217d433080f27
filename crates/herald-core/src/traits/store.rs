// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence traits for notifications and recipients.

use async_trait::async_trait;

use crate::error::HeraldError;
use crate::types::{Notification, NotificationStatus, Recipient, RecipientStatus};

/// Access to stored notifications.
///
/// Update methods return `Ok(None)` when the id does not exist; callers
/// decide whether that is a [`HeraldError::NotificationNotFound`].
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Notification>, HeraldError>;

    async fn create(
        &self,
        text: &str,
        comment: Option<&str>,
    ) -> Result<Notification, HeraldError>;

    async fn list_all(&self) -> Result<Vec<Notification>, HeraldError>;

    /// Most recently created notifications, newest first.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Notification>, HeraldError>;

    /// Updates only the lifecycle status (the best-effort `sending` mark).
    async fn set_status(
        &self,
        id: i64,
        status: NotificationStatus,
    ) -> Result<Option<Notification>, HeraldError>;

    /// Final update after a dispatch run: status, error summary (cleared
    /// when `None`), and `sent_at = now`.
    async fn mark_finished(
        &self,
        id: i64,
        status: NotificationStatus,
        error: Option<&str>,
    ) -> Result<Option<Notification>, HeraldError>;

    /// Status + error summary without touching `sent_at`. Used by the
    /// top-level failure path.
    async fn set_status_error(
        &self,
        id: i64,
        status: NotificationStatus,
        error: &str,
    ) -> Result<Option<Notification>, HeraldError>;

    /// Re-dispatch reset: error and `sent_at` to NULL, status to `pending`.
    async fn reset_for_retry(&self, id: i64) -> Result<Option<Notification>, HeraldError>;

    async fn update_content(
        &self,
        id: i64,
        text: Option<&str>,
        comment: Option<&str>,
    ) -> Result<Option<Notification>, HeraldError>;

    /// Returns whether a row was deleted.
    async fn delete(&self, id: i64) -> Result<bool, HeraldError>;
}

/// Access to stored recipients.
#[async_trait]
pub trait RecipientStore: Send + Sync {
    async fn get(&self, id: i64) -> Result<Option<Recipient>, HeraldError>;

    /// Recipients eligible for broadcast: status `active` and no
    /// blocked timestamp.
    async fn list_eligible(&self) -> Result<Vec<Recipient>, HeraldError>;

    /// Updates status in a single atomic write. Transitioning to `blocked`
    /// sets `blocked_at`; any other status clears it.
    async fn update_status(
        &self,
        id: i64,
        status: RecipientStatus,
    ) -> Result<Option<Recipient>, HeraldError>;

    /// Registers or refreshes a recipient keyed by chat id. Profile
    /// fields are overwritten; status and `blocked_at` are preserved for
    /// an existing row.
    async fn upsert(
        &self,
        id: i64,
        name: &str,
        language: &str,
        language_code: Option<&str>,
    ) -> Result<Recipient, HeraldError>;

    /// Total number of registered recipients.
    async fn count(&self) -> Result<i64, HeraldError>;

    /// Recipients in a given status, for operator inspection.
    async fn list_by_status(
        &self,
        status: RecipientStatus,
    ) -> Result<Vec<Recipient>, HeraldError>;
}
