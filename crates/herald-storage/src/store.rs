// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the core store traits.

use async_trait::async_trait;
use tracing::debug;

use herald_config::model::StorageConfig;
use herald_core::types::{Notification, NotificationStatus, Recipient, RecipientStatus};
use herald_core::{HeraldError, NotificationStore, RecipientStore};

use crate::database::Database;
use crate::queries;

/// SQLite-backed store for notifications and recipients.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. One instance serves both store traits; the engine
/// and gateway share it behind an `Arc`.
pub struct SqliteStore {
    db: Database,
}

impl SqliteStore {
    /// Open the database at the configured path and run migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, HeraldError> {
        let db = Database::open_with_options(&config.database_path, config.wal_mode).await?;
        debug!(path = %config.database_path, "SQLite store opened");
        Ok(Self { db })
    }

    /// Checkpoint and release the connection.
    pub async fn close(&self) -> Result<(), HeraldError> {
        self.db.close().await
    }

    /// Direct access to the database handle, for maintenance tooling.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl NotificationStore for SqliteStore {
    async fn get(&self, id: i64) -> Result<Option<Notification>, HeraldError> {
        queries::notifications::get(&self.db, id).await
    }

    async fn create(
        &self,
        text: &str,
        comment: Option<&str>,
    ) -> Result<Notification, HeraldError> {
        queries::notifications::create(&self.db, text, comment).await
    }

    async fn list_all(&self) -> Result<Vec<Notification>, HeraldError> {
        queries::notifications::list_all(&self.db).await
    }

    async fn list_recent(&self, limit: i64) -> Result<Vec<Notification>, HeraldError> {
        queries::notifications::list_recent(&self.db, limit).await
    }

    async fn set_status(
        &self,
        id: i64,
        status: NotificationStatus,
    ) -> Result<Option<Notification>, HeraldError> {
        queries::notifications::set_status(&self.db, id, status).await
    }

    async fn mark_finished(
        &self,
        id: i64,
        status: NotificationStatus,
        error: Option<&str>,
    ) -> Result<Option<Notification>, HeraldError> {
        queries::notifications::mark_finished(&self.db, id, status, error).await
    }

    async fn set_status_error(
        &self,
        id: i64,
        status: NotificationStatus,
        error: &str,
    ) -> Result<Option<Notification>, HeraldError> {
        queries::notifications::set_status_error(&self.db, id, status, error).await
    }

    async fn reset_for_retry(&self, id: i64) -> Result<Option<Notification>, HeraldError> {
        queries::notifications::reset_for_retry(&self.db, id).await
    }

    async fn update_content(
        &self,
        id: i64,
        text: Option<&str>,
        comment: Option<&str>,
    ) -> Result<Option<Notification>, HeraldError> {
        queries::notifications::update_content(&self.db, id, text, comment).await
    }

    async fn delete(&self, id: i64) -> Result<bool, HeraldError> {
        queries::notifications::delete(&self.db, id).await
    }
}

#[async_trait]
impl RecipientStore for SqliteStore {
    async fn get(&self, id: i64) -> Result<Option<Recipient>, HeraldError> {
        queries::recipients::get(&self.db, id).await
    }

    async fn list_eligible(&self) -> Result<Vec<Recipient>, HeraldError> {
        queries::recipients::list_eligible(&self.db).await
    }

    async fn update_status(
        &self,
        id: i64,
        status: RecipientStatus,
    ) -> Result<Option<Recipient>, HeraldError> {
        queries::recipients::update_status(&self.db, id, status).await
    }

    async fn upsert(
        &self,
        id: i64,
        name: &str,
        language: &str,
        language_code: Option<&str>,
    ) -> Result<Recipient, HeraldError> {
        queries::recipients::upsert(&self.db, id, name, language, language_code).await
    }

    async fn count(&self) -> Result<i64, HeraldError> {
        queries::recipients::count(&self.db).await
    }

    async fn list_by_status(
        &self,
        status: RecipientStatus,
    ) -> Result<Vec<Recipient>, HeraldError> {
        queries::recipients::list_by_status(&self.db, status).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    #[tokio::test]
    async fn full_notification_lifecycle_through_store() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("lifecycle.db");
        let store = SqliteStore::open(&make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();

        let n = NotificationStore::create(&store, "release notes", None)
            .await
            .unwrap();
        assert_eq!(n.status, NotificationStatus::Draft);

        NotificationStore::set_status(&store, n.id, NotificationStatus::Sending)
            .await
            .unwrap()
            .unwrap();

        let finished = store
            .mark_finished(n.id, NotificationStatus::Sent, None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(finished.status, NotificationStatus::Sent);
        assert!(finished.sent_at.is_some());

        let fetched = NotificationStore::get(&store, n.id).await.unwrap().unwrap();
        assert_eq!(fetched, finished);

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn recipient_traits_and_registry_share_one_table() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("recipients.db");
        let store = SqliteStore::open(&make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();

        store.upsert(500, "carol", "en", None).await.unwrap();
        store.upsert(501, "dave", "en", None).await.unwrap();

        let eligible = RecipientStore::list_eligible(&store).await.unwrap();
        assert_eq!(eligible.len(), 2);

        RecipientStore::update_status(&store, 500, RecipientStatus::Blocked)
            .await
            .unwrap()
            .unwrap();

        let eligible = RecipientStore::list_eligible(&store).await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, 501);

        assert_eq!(RecipientStore::count(&store).await.unwrap(), 2);
        let blocked = store.list_by_status(RecipientStatus::Blocked).await.unwrap();
        assert_eq!(blocked.len(), 1);

        store.close().await.unwrap();
    }
}
