// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch engine: one notification to every eligible recipient.
//!
//! Deliveries run sequentially, one send in flight at a time. Per-recipient
//! failures are classified and recorded, never propagated; only structural
//! failures (the notification missing, storage unreachable) surface as
//! `Err`. A failed bookkeeping write is logged and the run keeps going, so
//! one bad row cannot sink a broadcast.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use herald_core::error::HeraldError;
use herald_core::traits::{NotificationStore, RecipientStore, Transport};
use herald_core::types::{
    DeliveryFailure, DeliveryOutcome, DeliveryTask, DispatchReport, NotificationStatus,
    DEFAULT_MAX_RETRIES,
};

use crate::classifier::classify;
use crate::queue::{DeliveryQueue, SendFn};

/// Drives broadcast runs against a store pair and a transport.
///
/// All three collaborators are trait objects so the engine is equally at
/// home behind the HTTP gateway and inside tests with mocks.
pub struct Dispatcher {
    notifications: Arc<dyn NotificationStore>,
    recipients: Arc<dyn RecipientStore>,
    transport: Arc<dyn Transport>,
    /// Retry budget stamped onto queued delivery tasks
    /// (`dispatch.max_retries`).
    max_retries: u32,
}

impl Dispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        recipients: Arc<dyn RecipientStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            notifications,
            recipients,
            transport,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Overrides the retry budget for queued deliveries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sends a notification to every eligible recipient and persists the
    /// final status.
    ///
    /// Returns the report even when some deliveries failed; partial
    /// failure is a normal outcome. An unknown id returns
    /// [`HeraldError::NotificationNotFound`] without touching any row.
    /// Any other failure mid-run forces the notification to `failed`
    /// before the error is returned.
    pub async fn dispatch(&self, id: i64) -> Result<DispatchReport, HeraldError> {
        match self.run(id).await {
            Ok(report) => Ok(report),
            Err(err @ HeraldError::NotificationNotFound(_)) => Err(err),
            Err(err) => {
                error!(notification_id = id, error = %err, "dispatch run failed");
                if let Err(persist) = self
                    .notifications
                    .set_status_error(id, NotificationStatus::Failed, &err.to_string())
                    .await
                {
                    warn!(
                        notification_id = id,
                        error = %persist,
                        "could not record dispatch failure"
                    );
                }
                Err(err)
            }
        }
    }

    async fn run(&self, id: i64) -> Result<DispatchReport, HeraldError> {
        let notification = self
            .notifications
            .get(id)
            .await?
            .ok_or(HeraldError::NotificationNotFound(id))?;

        let started = Instant::now();

        // Best effort; a run proceeds even if the mark is lost.
        if let Err(err) = self
            .notifications
            .set_status(id, NotificationStatus::Sending)
            .await
        {
            warn!(notification_id = id, error = %err, "could not mark notification sending");
        }

        let recipients = self.recipients.list_eligible().await?;
        if recipients.is_empty() {
            info!(notification_id = id, "no eligible recipients");
            self.notifications
                .mark_finished(id, NotificationStatus::Sent, None)
                .await?;
            return Ok(DispatchReport::empty(started.elapsed()));
        }

        let total = recipients.len();
        let mut sent = 0usize;
        let mut failures = Vec::new();

        for recipient in &recipients {
            let outcome = self.send_to_recipient(recipient.id, &notification.text).await;
            if outcome.success {
                sent += 1;
            } else {
                failures.push(DeliveryFailure {
                    recipient_id: outcome.recipient_id,
                    // A failed outcome always carries its category.
                    category: outcome
                        .category
                        .unwrap_or(herald_core::types::ErrorCategory::UnknownError),
                    message: outcome.message,
                });
            }
        }

        let failed = failures.len();
        let (status, summary) = if failed == 0 {
            (NotificationStatus::Sent, None)
        } else if sent == 0 {
            (
                NotificationStatus::Failed,
                Some(format!("0 delivered out of {total}")),
            )
        } else {
            (
                NotificationStatus::Sent,
                Some(format!("{sent} delivered, {failed} failed")),
            )
        };

        if let Err(err) = self
            .notifications
            .mark_finished(id, status, summary.as_deref())
            .await
        {
            warn!(notification_id = id, error = %err, "could not persist final status");
        }

        info!(
            notification_id = id,
            total,
            sent,
            failed,
            status = %status,
            "dispatch finished"
        );

        Ok(DispatchReport {
            total,
            sent,
            failed,
            failures,
            duration: started.elapsed(),
        })
    }

    /// Delivers one message and applies the classifier's verdict.
    ///
    /// Never returns `Err`; the outcome records success or a classified
    /// failure. Recipient status updates are best effort.
    pub async fn send_to_recipient(&self, recipient_id: i64, text: &str) -> DeliveryOutcome {
        match self.transport.send_text(recipient_id, text).await {
            Ok(()) => DeliveryOutcome::delivered(recipient_id),
            Err(err) => {
                let verdict = classify(&err, recipient_id);
                warn!(
                    recipient_id,
                    category = %verdict.category,
                    retryable = verdict.should_retry,
                    "delivery failed"
                );
                if let Some(status) = verdict.recipient_status_update {
                    if let Err(persist) =
                        self.recipients.update_status(recipient_id, status).await
                    {
                        warn!(
                            recipient_id,
                            error = %persist,
                            "could not update recipient status"
                        );
                    }
                }
                DeliveryOutcome {
                    success: false,
                    recipient_id,
                    category: Some(verdict.category),
                    message: verdict.human_message,
                    should_retry: verdict.should_retry,
                }
            }
        }
    }

    /// Enqueues one delivery task per eligible recipient on `queue`.
    ///
    /// The notification is marked `sending`; final status bookkeeping is
    /// up to the caller once the queue drains. Returns the number of tasks
    /// queued.
    pub async fn enqueue_dispatch(
        &self,
        queue: &DeliveryQueue,
        id: i64,
    ) -> Result<usize, HeraldError> {
        let notification = self
            .notifications
            .get(id)
            .await?
            .ok_or(HeraldError::NotificationNotFound(id))?;

        let recipients = self.recipients.list_eligible().await?;
        if let Err(err) = self
            .notifications
            .set_status(id, NotificationStatus::Sending)
            .await
        {
            warn!(notification_id = id, error = %err, "could not mark notification sending");
        }

        for recipient in &recipients {
            let mut task = DeliveryTask::new(id, recipient.id, notification.text.clone());
            task.max_retries = self.max_retries;
            queue.push(task).await;
        }
        info!(notification_id = id, tasks = recipients.len(), "dispatch queued");
        Ok(recipients.len())
    }

    /// Resets a failed notification and dispatches it again.
    pub async fn retry(&self, id: i64) -> Result<DispatchReport, HeraldError> {
        crate::tracker::reset_for_retry(self.notifications.as_ref(), id).await?;
        self.dispatch(id).await
    }

    /// A queue send function that delivers through this dispatcher.
    pub fn queue_send_fn(self: &Arc<Self>) -> SendFn {
        let dispatcher = Arc::clone(self);
        Arc::new(move |task: DeliveryTask| {
            let dispatcher = Arc::clone(&dispatcher);
            Box::pin(async move {
                dispatcher
                    .send_to_recipient(task.recipient_id, &task.text)
                    .await
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_core::traits::NotificationStore;
    use herald_core::types::{ErrorCategory, RecipientStatus, TransportError};
    use herald_test_utils::{MemoryStore, MockTransport};

    fn dispatcher(store: Arc<MemoryStore>, transport: Arc<MockTransport>) -> Dispatcher {
        Dispatcher::new(store.clone(), store, transport)
    }

    async fn notification(store: &MemoryStore, text: &str) -> i64 {
        NotificationStore::create(store, text, None).await.unwrap().id
    }

    #[tokio::test]
    async fn zero_recipients_is_a_clean_sent() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MockTransport::new());
        let id = notification(&store, "hello").await;

        let report = dispatcher(store.clone(), transport).dispatch(id).await.unwrap();
        assert_eq!(report.total, 0);
        assert_eq!(report.sent, 0);
        assert_eq!(report.failed, 0);

        let n = store.notification(id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Sent);
        assert_eq!(n.error, None);
        assert!(n.sent_at.is_some());
    }

    #[tokio::test]
    async fn all_deliveries_succeed() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MockTransport::new());
        for id in 1..=5 {
            store.add_recipient(id, RecipientStatus::Active).await;
        }
        let id = notification(&store, "hello").await;

        let report = dispatcher(store.clone(), transport.clone())
            .dispatch(id)
            .await
            .unwrap();
        assert_eq!((report.total, report.sent, report.failed), (5, 5, 0));
        assert_eq!(transport.sent_count().await, 5);

        let n = store.notification(id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Sent);
        assert_eq!(n.error, None);
    }

    #[tokio::test]
    async fn all_blocked_is_a_failed_run_with_status_updates() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MockTransport::new());
        for id in 1..=4 {
            store.add_recipient(id, RecipientStatus::Active).await;
            transport
                .fail_for(id, TransportError::forbidden("Forbidden: bot was blocked by the user"))
                .await;
        }
        let id = notification(&store, "hello").await;

        let report = dispatcher(store.clone(), transport)
            .dispatch(id)
            .await
            .unwrap();
        assert_eq!((report.total, report.sent, report.failed), (4, 0, 4));

        let n = store.notification(id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Failed);
        assert_eq!(n.error.as_deref(), Some("0 delivered out of 4"));
        for rid in 1..=4 {
            let r = store.recipient(rid).await.unwrap();
            assert_eq!(r.status, RecipientStatus::Blocked);
            assert!(r.blocked_at.is_some());
        }
    }

    #[tokio::test]
    async fn partial_failure_still_counts_as_sent() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MockTransport::new());
        for id in 1..=10 {
            store.add_recipient(id, RecipientStatus::Active).await;
        }
        transport
            .fail_for(2, TransportError::forbidden("Forbidden: bot was blocked by the user"))
            .await;
        transport
            .fail_for(5, TransportError::api(400, "Bad Request: chat not found"))
            .await;
        transport
            .fail_for(8, TransportError::api(503, "Service Unavailable"))
            .await;
        let id = notification(&store, "hello").await;

        let report = dispatcher(store.clone(), transport)
            .dispatch(id)
            .await
            .unwrap();
        assert_eq!((report.total, report.sent, report.failed), (10, 7, 3));
        assert_eq!(report.failures.len(), 3);

        let categories: Vec<_> = report.failures.iter().map(|f| f.category).collect();
        assert!(categories.contains(&ErrorCategory::UserBlocked));
        assert!(categories.contains(&ErrorCategory::ChatNotFound));
        assert!(categories.contains(&ErrorCategory::ServerError));

        let n = store.notification(id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Sent);
        assert_eq!(n.error.as_deref(), Some("7 delivered, 3 failed"));

        assert_eq!(
            store.recipient(2).await.unwrap().status,
            RecipientStatus::Blocked
        );
        assert_eq!(
            store.recipient(5).await.unwrap().status,
            RecipientStatus::Deleted
        );
        // Retryable server errors leave the recipient untouched.
        assert_eq!(
            store.recipient(8).await.unwrap().status,
            RecipientStatus::Active
        );
    }

    #[tokio::test]
    async fn unknown_notification_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MockTransport::new());
        store.add_recipient(1, RecipientStatus::Active).await;

        let err = dispatcher(store.clone(), transport.clone())
            .dispatch(404)
            .await
            .unwrap_err();
        assert!(matches!(err, HeraldError::NotificationNotFound(404)));
        assert_eq!(transport.sent_count().await, 0);
        assert_eq!(
            store.recipient(1).await.unwrap().status,
            RecipientStatus::Active
        );
    }

    #[tokio::test]
    async fn broken_recipient_bookkeeping_does_not_stop_the_run() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MockTransport::new());
        for id in 1..=3 {
            store.add_recipient(id, RecipientStatus::Active).await;
        }
        transport
            .fail_for(2, TransportError::forbidden("Forbidden: bot was blocked by the user"))
            .await;
        store.fail_recipient_updates();
        let id = notification(&store, "hello").await;

        let report = dispatcher(store.clone(), transport)
            .dispatch(id)
            .await
            .unwrap();
        assert_eq!((report.total, report.sent, report.failed), (3, 2, 1));

        let n = store.notification(id).await.unwrap();
        assert_eq!(n.status, NotificationStatus::Sent);
        assert_eq!(n.error.as_deref(), Some("2 delivered, 1 failed"));
    }

    #[tokio::test]
    async fn retry_resets_then_redispatches() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MockTransport::new());
        store.add_recipient(1, RecipientStatus::Active).await;
        transport
            .fail_once_for(1, TransportError::api(500, "Internal Server Error"))
            .await;
        let id = notification(&store, "hello").await;

        let engine = dispatcher(store.clone(), transport.clone());
        let first = engine.dispatch(id).await.unwrap();
        assert_eq!(first.failed, 1);
        assert_eq!(
            store.notification(id).await.unwrap().status,
            NotificationStatus::Failed
        );

        let second = engine.retry(id).await.unwrap();
        assert_eq!((second.sent, second.failed), (1, 0));
        assert_eq!(
            store.notification(id).await.unwrap().status,
            NotificationStatus::Sent
        );
    }

    #[tokio::test(start_paused = true)]
    async fn queued_deliveries_respect_configured_retry_budget() {
        use crate::queue::DeliveryQueue;

        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MockTransport::new());
        store.add_recipient(1, RecipientStatus::Active).await;
        transport
            .fail_for(1, TransportError::api(500, "Internal Server Error"))
            .await;
        let id = notification(&store, "hello").await;

        let engine = Arc::new(
            Dispatcher::new(store.clone(), store.clone(), transport.clone())
                .with_max_retries(1),
        );
        let queue = DeliveryQueue::new();
        queue.start(1, engine.queue_send_fn());
        engine.enqueue_dispatch(&queue, id).await.unwrap();
        queue.stop().await;

        // Initial attempt plus the single configured retry.
        assert_eq!(transport.attempts_for(1).await, 2);
    }

    #[tokio::test]
    async fn retry_of_delivered_notification_is_rejected() {
        let store = Arc::new(MemoryStore::new());
        let transport = Arc::new(MockTransport::new());
        store.add_recipient(1, RecipientStatus::Active).await;
        let id = notification(&store, "hello").await;

        let engine = dispatcher(store.clone(), transport.clone());
        engine.dispatch(id).await.unwrap();
        let err = engine.retry(id).await.unwrap_err();
        assert!(matches!(err, HeraldError::InvalidTransition { .. }));
        // No second delivery went out.
        assert_eq!(transport.sent_count().await, 1);
    }
}
