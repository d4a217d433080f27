// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification lifecycle transitions.
//!
//! The lifecycle is `draft`/`pending` -> `sending` -> `sent` | `failed`.
//! Terminal states are left only through [`reset_for_retry`], which puts a
//! failed notification back to `pending` with its error and sent timestamp
//! cleared. An already-sent notification is never reset.

use herald_core::error::HeraldError;
use herald_core::traits::NotificationStore;
use herald_core::types::{Notification, NotificationStatus};
use tracing::info;

/// Whether `from -> to` is a legal lifecycle transition.
pub fn can_transition(from: NotificationStatus, to: NotificationStatus) -> bool {
    use NotificationStatus::*;
    matches!(
        (from, to),
        (Draft, Pending)
            | (Draft, Sending)
            | (Pending, Sending)
            | (Sending, Sent)
            | (Sending, Failed)
            | (Failed, Pending)
    )
}

/// Checks a transition, returning [`HeraldError::InvalidTransition`] when
/// it is not legal.
pub fn check_transition(
    id: i64,
    from: NotificationStatus,
    to: NotificationStatus,
) -> Result<(), HeraldError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(HeraldError::InvalidTransition { id, from, to })
    }
}

/// Resets a notification for re-dispatch.
///
/// Loads the row, rejects already-sent notifications, then clears the
/// error and sent timestamp and moves the status to `pending`.
pub async fn reset_for_retry(
    store: &dyn NotificationStore,
    id: i64,
) -> Result<Notification, HeraldError> {
    let notification = store
        .get(id)
        .await?
        .ok_or(HeraldError::NotificationNotFound(id))?;

    // Only delivered notifications are protected; anything else may be
    // reset, including a run stuck in `sending`.
    if notification.status == NotificationStatus::Sent {
        return Err(HeraldError::InvalidTransition {
            id,
            from: NotificationStatus::Sent,
            to: NotificationStatus::Pending,
        });
    }

    let reset = store
        .reset_for_retry(id)
        .await?
        .ok_or(HeraldError::NotificationNotFound(id))?;
    info!(notification_id = id, "notification reset for re-dispatch");
    Ok(reset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_test_utils::MemoryStore;

    #[test]
    fn sending_reaches_only_terminal_states() {
        use NotificationStatus::*;
        assert!(can_transition(Sending, Sent));
        assert!(can_transition(Sending, Failed));
        assert!(!can_transition(Sending, Pending));
        assert!(!can_transition(Sending, Draft));
    }

    #[test]
    fn terminal_states_do_not_transition_forward() {
        use NotificationStatus::*;
        assert!(!can_transition(Sent, Sending));
        assert!(!can_transition(Sent, Pending));
        assert!(!can_transition(Failed, Sending));
        // The one legal exit from a terminal state is the retry reset.
        assert!(can_transition(Failed, Pending));
    }

    #[tokio::test]
    async fn reset_clears_error_and_sent_timestamp() {
        let store = MemoryStore::new();
        let n = NotificationStore::create(&store, "hello", None).await.unwrap();
        store
            .mark_finished(n.id, NotificationStatus::Failed, Some("0 delivered out of 3"))
            .await
            .unwrap();

        let reset = reset_for_retry(&store, n.id).await.unwrap();
        assert_eq!(reset.status, NotificationStatus::Pending);
        assert_eq!(reset.error, None);
        assert_eq!(reset.sent_at, None);
    }

    #[tokio::test]
    async fn reset_rejects_already_sent() {
        let store = MemoryStore::new();
        let n = NotificationStore::create(&store, "hello", None).await.unwrap();
        store
            .mark_finished(n.id, NotificationStatus::Sent, None)
            .await
            .unwrap();

        let err = reset_for_retry(&store, n.id).await.unwrap_err();
        assert!(matches!(
            err,
            HeraldError::InvalidTransition {
                from: NotificationStatus::Sent,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn reset_allows_stuck_sending_run() {
        let store = MemoryStore::new();
        let n = NotificationStore::create(&store, "hello", None).await.unwrap();
        store
            .set_status(n.id, NotificationStatus::Sending)
            .await
            .unwrap();

        let reset = reset_for_retry(&store, n.id).await.unwrap();
        assert_eq!(reset.status, NotificationStatus::Pending);
    }

    #[tokio::test]
    async fn reset_unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let err = reset_for_retry(&store, 99).await.unwrap_err();
        assert!(matches!(err, HeraldError::NotificationNotFound(99)));
    }
}
