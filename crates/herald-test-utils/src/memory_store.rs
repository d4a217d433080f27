// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory store implementing the persistence traits.
//!
//! Backs dispatch-engine tests without an on-disk database. Rows live in
//! tokio mutexes; ids are assigned sequentially. `fail_recipient_updates()`
//! switches the recipient-status write path into an error mode so tests can
//! verify that dispatch keeps going when bookkeeping writes fail.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use herald_core::error::HeraldError;
use herald_core::traits::{NotificationStore, RecipientStore};
use herald_core::types::{Notification, NotificationStatus, Recipient, RecipientStatus};

fn now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// In-memory notification and recipient store for tests.
pub struct MemoryStore {
    notifications: Mutex<BTreeMap<i64, Notification>>,
    recipients: Mutex<BTreeMap<i64, Recipient>>,
    next_id: AtomicI64,
    fail_recipient_updates: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            notifications: Mutex::new(BTreeMap::new()),
            recipients: Mutex::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
            fail_recipient_updates: AtomicBool::new(false),
        }
    }

    /// Make every subsequent `update_status` call fail.
    pub fn fail_recipient_updates(&self) {
        self.fail_recipient_updates.store(true, Ordering::SeqCst);
    }

    /// Insert a recipient row directly.
    pub async fn add_recipient(&self, id: i64, status: RecipientStatus) {
        let ts = now();
        self.recipients.lock().await.insert(
            id,
            Recipient {
                id,
                name: format!("user-{id}"),
                language: "en".to_string(),
                language_code: None,
                status,
                blocked_at: if status == RecipientStatus::Blocked {
                    Some(ts.clone())
                } else {
                    None
                },
                created_at: ts.clone(),
                updated_at: ts,
            },
        );
    }

    /// Snapshot of a recipient row, bypassing the trait.
    pub async fn recipient(&self, id: i64) -> Option<Recipient> {
        self.recipients.lock().await.get(&id).cloned()
    }

    /// Snapshot of a notification row, bypassing the trait.
    pub async fn notification(&self, id: i64) -> Option<Notification> {
        self.notifications.lock().await.get(&id).cloned()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<Notification>, HeraldError> {
        Ok(self.notifications.lock().await.get(&id).cloned())
    }

    async fn create(
        &self,
        text: &str,
        comment: Option<&str>,
    ) -> Result<Notification, HeraldError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let ts = now();
        let notification = Notification {
            id,
            text: text.to_string(),
            status: NotificationStatus::Draft,
            error: None,
            sent_at: None,
            comment: comment.map(str::to_string),
            created_at: ts.clone(),
            updated_at: ts,
        };
        self.notifications
            .lock()
            .await
            .insert(id, notification.clone());
        Ok(notification)
    }

    async fn list_all(&self) -> Result<Vec<Notification>, HeraldError> {
        let mut rows: Vec<_> = self.notifications.lock().await.values().cloned().collect();
        rows.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(rows)
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Notification>, HeraldError> {
        let mut rows = self.list_all().await?;
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }

    async fn set_status(
        &self,
        id: i64,
        status: NotificationStatus,
    ) -> Result<Option<Notification>, HeraldError> {
        let mut rows = self.notifications.lock().await;
        Ok(rows.get_mut(&id).map(|n| {
            n.status = status;
            n.updated_at = now();
            n.clone()
        }))
    }

    async fn mark_finished(
        &self,
        id: i64,
        status: NotificationStatus,
        error: Option<&str>,
    ) -> Result<Option<Notification>, HeraldError> {
        let mut rows = self.notifications.lock().await;
        Ok(rows.get_mut(&id).map(|n| {
            let ts = now();
            n.status = status;
            n.error = error.map(str::to_string);
            n.sent_at = Some(ts.clone());
            n.updated_at = ts;
            n.clone()
        }))
    }

    async fn set_status_error(
        &self,
        id: i64,
        status: NotificationStatus,
        error: &str,
    ) -> Result<Option<Notification>, HeraldError> {
        let mut rows = self.notifications.lock().await;
        Ok(rows.get_mut(&id).map(|n| {
            n.status = status;
            n.error = Some(error.to_string());
            n.updated_at = now();
            n.clone()
        }))
    }

    async fn reset_for_retry(&self, id: i64) -> Result<Option<Notification>, HeraldError> {
        let mut rows = self.notifications.lock().await;
        Ok(rows.get_mut(&id).map(|n| {
            n.status = NotificationStatus::Pending;
            n.error = None;
            n.sent_at = None;
            n.updated_at = now();
            n.clone()
        }))
    }

    async fn update_content(
        &self,
        id: i64,
        text: Option<&str>,
        comment: Option<&str>,
    ) -> Result<Option<Notification>, HeraldError> {
        let mut rows = self.notifications.lock().await;
        Ok(rows.get_mut(&id).map(|n| {
            if let Some(text) = text {
                n.text = text.to_string();
            }
            if let Some(comment) = comment {
                n.comment = Some(comment.to_string());
            }
            n.updated_at = now();
            n.clone()
        }))
    }

    async fn delete(&self, id: i64) -> Result<bool, HeraldError> {
        Ok(self.notifications.lock().await.remove(&id).is_some())
    }
}

#[async_trait]
impl RecipientStore for MemoryStore {
    async fn get(&self, id: i64) -> Result<Option<Recipient>, HeraldError> {
        Ok(self.recipients.lock().await.get(&id).cloned())
    }

    async fn list_eligible(&self) -> Result<Vec<Recipient>, HeraldError> {
        Ok(self
            .recipients
            .lock()
            .await
            .values()
            .filter(|r| r.status == RecipientStatus::Active && r.blocked_at.is_none())
            .cloned()
            .collect())
    }

    async fn update_status(
        &self,
        id: i64,
        status: RecipientStatus,
    ) -> Result<Option<Recipient>, HeraldError> {
        if self.fail_recipient_updates.load(Ordering::SeqCst) {
            return Err(HeraldError::Internal(
                "recipient update failure injected".to_string(),
            ));
        }
        let mut rows = self.recipients.lock().await;
        Ok(rows.get_mut(&id).map(|r| {
            let ts = now();
            r.status = status;
            r.blocked_at = if status == RecipientStatus::Blocked {
                Some(ts.clone())
            } else {
                None
            };
            r.updated_at = ts;
            r.clone()
        }))
    }

    async fn upsert(
        &self,
        id: i64,
        name: &str,
        language: &str,
        language_code: Option<&str>,
    ) -> Result<Recipient, HeraldError> {
        let mut rows = self.recipients.lock().await;
        let ts = now();
        let recipient = match rows.get_mut(&id) {
            // Profile refresh; status and blocked_at stay untouched.
            Some(existing) => {
                existing.name = name.to_string();
                existing.language = language.to_string();
                existing.language_code = language_code.map(str::to_string);
                existing.updated_at = ts;
                existing.clone()
            }
            None => {
                let recipient = Recipient {
                    id,
                    name: name.to_string(),
                    language: language.to_string(),
                    language_code: language_code.map(str::to_string),
                    status: RecipientStatus::Active,
                    blocked_at: None,
                    created_at: ts.clone(),
                    updated_at: ts,
                };
                rows.insert(id, recipient.clone());
                recipient
            }
        };
        Ok(recipient)
    }

    async fn count(&self) -> Result<i64, HeraldError> {
        Ok(self.recipients.lock().await.len() as i64)
    }

    async fn list_by_status(
        &self,
        status: RecipientStatus,
    ) -> Result<Vec<Recipient>, HeraldError> {
        Ok(self
            .recipients
            .lock()
            .await
            .values()
            .filter(|r| r.status == status)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = NotificationStore::create(&store, "one", None).await.unwrap();
        let b = NotificationStore::create(&store, "two", None).await.unwrap();
        assert_eq!(a.id + 1, b.id);
        assert_eq!(a.status, NotificationStatus::Draft);
    }

    #[tokio::test]
    async fn eligibility_excludes_blocked_rows() {
        let store = MemoryStore::new();
        store.add_recipient(1, RecipientStatus::Active).await;
        store.add_recipient(2, RecipientStatus::Blocked).await;
        store.add_recipient(3, RecipientStatus::Inactive).await;

        let eligible = store.list_eligible().await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, 1);
    }

    #[tokio::test]
    async fn upsert_preserves_blocked_state() {
        let store = MemoryStore::new();
        let created = store.upsert(9, "erin", "en", None).await.unwrap();
        assert_eq!(created.status, RecipientStatus::Active);

        store.update_status(9, RecipientStatus::Blocked).await.unwrap();
        let refreshed = store.upsert(9, "erin2", "de", Some("de")).await.unwrap();
        assert_eq!(refreshed.name, "erin2");
        assert_eq!(refreshed.status, RecipientStatus::Blocked);
        assert!(refreshed.blocked_at.is_some());
        assert_eq!(RecipientStore::count(&store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn injected_failure_breaks_status_updates() {
        let store = MemoryStore::new();
        store.add_recipient(1, RecipientStatus::Active).await;
        store.fail_recipient_updates();
        assert!(store.update_status(1, RecipientStatus::Blocked).await.is_err());
        assert_eq!(
            store.recipient(1).await.unwrap().status,
            RecipientStatus::Active
        );
    }
}
