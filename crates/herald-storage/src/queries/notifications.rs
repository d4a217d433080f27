// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query operations for stored notifications.

use rusqlite::params;

use herald_core::HeraldError;
use herald_core::types::{Notification, NotificationStatus};

use crate::database::{Database, map_tr_err};

const COLUMNS: &str = "id, text, status, error, sent_at, comment, created_at, updated_at";

fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    let status: String = row.get(2)?;
    Ok(Notification {
        id: row.get(0)?,
        text: row.get(1)?,
        status: status.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
        error: row.get(3)?,
        sent_at: row.get(4)?,
        comment: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Insert a new notification in `draft` status. Returns the stored row.
pub async fn create(
    db: &Database,
    text: &str,
    comment: Option<&str>,
) -> Result<Notification, HeraldError> {
    let text = text.to_string();
    let comment = comment.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO notifications (text, comment) VALUES (?1, ?2)",
                params![text, comment],
            )?;
            let id = conn.last_insert_rowid();
            let notification = conn.query_row(
                &format!("SELECT {COLUMNS} FROM notifications WHERE id = ?1"),
                params![id],
                row_to_notification,
            )?;
            Ok(notification)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one notification by id.
pub async fn get(db: &Database, id: i64) -> Result<Option<Notification>, HeraldError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {COLUMNS} FROM notifications WHERE id = ?1"),
                params![id],
                row_to_notification,
            );
            match result {
                Ok(notification) => Ok(Some(notification)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// All notifications, newest first.
pub async fn list_all(db: &Database) -> Result<Vec<Notification>, HeraldError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM notifications ORDER BY created_at DESC, id DESC"
            ))?;
            let rows = stmt.query_map([], row_to_notification)?;
            let mut notifications = Vec::new();
            for row in rows {
                notifications.push(row?);
            }
            Ok(notifications)
        })
        .await
        .map_err(map_tr_err)
}

/// The `limit` most recently created notifications, newest first.
pub async fn list_recent(db: &Database, limit: i64) -> Result<Vec<Notification>, HeraldError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM notifications ORDER BY created_at DESC, id DESC LIMIT ?1"
            ))?;
            let rows = stmt.query_map(params![limit], row_to_notification)?;
            let mut notifications = Vec::new();
            for row in rows {
                notifications.push(row?);
            }
            Ok(notifications)
        })
        .await
        .map_err(map_tr_err)
}

/// Update only the lifecycle status. Returns `None` for an unknown id.
pub async fn set_status(
    db: &Database,
    id: i64,
    status: NotificationStatus,
) -> Result<Option<Notification>, HeraldError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE notifications SET status = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2",
                params![status, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let notification = conn.query_row(
                &format!("SELECT {COLUMNS} FROM notifications WHERE id = ?1"),
                params![id],
                row_to_notification,
            )?;
            Ok(Some(notification))
        })
        .await
        .map_err(map_tr_err)
}

/// Final update after a dispatch run: status, error summary (NULL when
/// `None`), and `sent_at = now` in one statement.
pub async fn mark_finished(
    db: &Database,
    id: i64,
    status: NotificationStatus,
    error: Option<&str>,
) -> Result<Option<Notification>, HeraldError> {
    let status = status.to_string();
    let error = error.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE notifications SET status = ?1, error = ?2,
                 sent_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![status, error, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let notification = conn.query_row(
                &format!("SELECT {COLUMNS} FROM notifications WHERE id = ?1"),
                params![id],
                row_to_notification,
            )?;
            Ok(Some(notification))
        })
        .await
        .map_err(map_tr_err)
}

/// Status + error summary without touching `sent_at`.
pub async fn set_status_error(
    db: &Database,
    id: i64,
    status: NotificationStatus,
    error: &str,
) -> Result<Option<Notification>, HeraldError> {
    let status = status.to_string();
    let error = error.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE notifications SET status = ?1, error = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![status, error, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let notification = conn.query_row(
                &format!("SELECT {COLUMNS} FROM notifications WHERE id = ?1"),
                params![id],
                row_to_notification,
            )?;
            Ok(Some(notification))
        })
        .await
        .map_err(map_tr_err)
}

/// Re-dispatch reset: error and sent_at cleared, status back to `pending`.
pub async fn reset_for_retry(db: &Database, id: i64) -> Result<Option<Notification>, HeraldError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE notifications SET status = 'pending', error = NULL, sent_at = NULL,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let notification = conn.query_row(
                &format!("SELECT {COLUMNS} FROM notifications WHERE id = ?1"),
                params![id],
                row_to_notification,
            )?;
            Ok(Some(notification))
        })
        .await
        .map_err(map_tr_err)
}

/// Update user-editable fields. Absent fields are left untouched.
pub async fn update_content(
    db: &Database,
    id: i64,
    text: Option<&str>,
    comment: Option<&str>,
) -> Result<Option<Notification>, HeraldError> {
    let text = text.map(str::to_string);
    let comment = comment.map(str::to_string);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE notifications SET
                 text = COALESCE(?1, text),
                 comment = COALESCE(?2, comment),
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?3",
                params![text, comment, id],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            let notification = conn.query_row(
                &format!("SELECT {COLUMNS} FROM notifications WHERE id = ?1"),
                params![id],
                row_to_notification,
            )?;
            Ok(Some(notification))
        })
        .await
        .map_err(map_tr_err)
}

/// Delete one notification. Returns whether a row was removed.
pub async fn delete(db: &Database, id: i64) -> Result<bool, HeraldError> {
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM notifications WHERE id = ?1", params![id])?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}
