// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query operations for registered recipients.

use rusqlite::params;

use herald_core::HeraldError;
use herald_core::types::{Recipient, RecipientStatus};

use crate::database::{Database, map_tr_err};

const COLUMNS: &str =
    "id, name, language, language_code, status, blocked_at, created_at, updated_at";

fn row_to_recipient(row: &rusqlite::Row<'_>) -> rusqlite::Result<Recipient> {
    let status: String = row.get(4)?;
    Ok(Recipient {
        id: row.get(0)?,
        name: row.get(1)?,
        language: row.get(2)?,
        language_code: row.get(3)?,
        status: status.parse().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
        blocked_at: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Insert or refresh a recipient keyed by chat id. Status and blocked
/// timestamp are preserved on conflict; profile fields are refreshed.
pub async fn upsert(
    db: &Database,
    id: i64,
    name: &str,
    language: &str,
    language_code: Option<&str>,
) -> Result<Recipient, HeraldError> {
    let name = name.to_string();
    let language = language.to_string();
    let language_code = language_code.map(str::to_string);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO recipients (id, name, language, language_code)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(id) DO UPDATE SET
                   name = excluded.name,
                   language = excluded.language,
                   language_code = excluded.language_code,
                   updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![id, name, language, language_code],
            )?;
            let recipient = conn.query_row(
                &format!("SELECT {COLUMNS} FROM recipients WHERE id = ?1"),
                params![id],
                row_to_recipient,
            )?;
            Ok(recipient)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch one recipient by chat id.
pub async fn get(db: &Database, id: i64) -> Result<Option<Recipient>, HeraldError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("SELECT {COLUMNS} FROM recipients WHERE id = ?1"),
                params![id],
                row_to_recipient,
            );
            match result {
                Ok(recipient) => Ok(Some(recipient)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Recipients eligible for broadcast: status `active` AND no blocked
/// timestamp.
pub async fn list_eligible(db: &Database) -> Result<Vec<Recipient>, HeraldError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM recipients
                 WHERE status = 'active' AND blocked_at IS NULL
                 ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map([], row_to_recipient)?;
            let mut recipients = Vec::new();
            for row in rows {
                recipients.push(row?);
            }
            Ok(recipients)
        })
        .await
        .map_err(map_tr_err)
}

/// Recipients in a given status.
pub async fn list_by_status(
    db: &Database,
    status: RecipientStatus,
) -> Result<Vec<Recipient>, HeraldError> {
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM recipients WHERE status = ?1 ORDER BY id ASC"
            ))?;
            let rows = stmt.query_map(params![status], row_to_recipient)?;
            let mut recipients = Vec::new();
            for row in rows {
                recipients.push(row?);
            }
            Ok(recipients)
        })
        .await
        .map_err(map_tr_err)
}

/// Total number of registered recipients.
pub async fn count(db: &Database) -> Result<i64, HeraldError> {
    db.connection()
        .call(|conn| {
            let count = conn.query_row("SELECT COUNT(*) FROM recipients", [], |row| row.get(0))?;
            Ok(count)
        })
        .await
        .map_err(map_tr_err)
}

/// Update status in one atomic write.
///
/// Transitioning to `blocked` stamps `blocked_at`; any other status clears
/// it, preserving the invariant that the pair always agrees.
pub async fn update_status(
    db: &Database,
    id: i64,
    status: RecipientStatus,
) -> Result<Option<Recipient>, HeraldError> {
    let blocked = status == RecipientStatus::Blocked;
    let status = status.to_string();
    db.connection()
        .call(move |conn| {
            let changed = if blocked {
                conn.execute(
                    "UPDATE recipients SET status = ?1,
                     blocked_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now'),
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![status, id],
                )?
            } else {
                conn.execute(
                    "UPDATE recipients SET status = ?1, blocked_at = NULL,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?2",
                    params![status, id],
                )?
            };
            if changed == 0 {
                return Ok(None);
            }
            let recipient = conn.query_row(
                &format!("SELECT {COLUMNS} FROM recipients WHERE id = ?1"),
                params![id],
                row_to_recipient,
            )?;
            Ok(Some(recipient))
        })
        .await
        .map_err(map_tr_err)
}
