//! Notification poller and subscriber registry
//!
//! Periodically fetches a notification summary from the backend and fans it
//! out to registered subscribers. Polling degrades gracefully: a failed fetch
//! cycle broadcasts an empty summary instead of surfacing an error, and the
//! next tick is the only retry mechanism.

use crate::api::{HttpNotificationApi, NotificationApi};
use crate::config::Config;
use crate::errors::SyncResult;
use crate::model::{NotificationId, NotificationItem, NotificationSummary, DEFAULT_RECENT_LIMIT};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// De-registration token returned by [`NotificationPoller::subscribe`].
pub type SubscriberId = u64;

type SubscriberFn = dyn Fn(&NotificationSummary) + Send + Sync;

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

struct PollerInner {
    api: Arc<dyn NotificationApi>,
    recent_limit: usize,
    subscribers: Mutex<Vec<(SubscriberId, Arc<SubscriberFn>)>>,
    next_subscriber_id: AtomicU64,
    // Checked before broadcasting so a cycle that was in flight when
    // stop_polling ran cannot deliver a stale summary.
    active: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollerInner {
    async fn poll_once(&self) {
        let summary = self.fetch_summary().await;
        if !self.active.load(Ordering::SeqCst) {
            debug!("polling stopped during fetch, dropping summary");
            return;
        }
        self.notify_all(&summary);
    }

    /// One fetch cycle: both requests issued concurrently, joined before
    /// broadcast. Any failure degrades to an empty summary.
    async fn fetch_summary(&self) -> NotificationSummary {
        let (count, recent) = tokio::join!(
            self.api.unread_count(),
            self.api.recent(self.recent_limit)
        );
        match (count, recent) {
            (Ok(unread_count), Ok(recent)) => NotificationSummary {
                unread_count,
                recent,
            },
            (count, recent) => {
                if let Err(e) = count {
                    warn!("unread-count fetch failed ({}): {e}", e.category());
                }
                if let Err(e) = recent {
                    warn!("recent-notifications fetch failed ({}): {e}", e.category());
                }
                NotificationSummary::empty()
            }
        }
    }

    /// Deliver a summary to every subscriber in registration order.
    ///
    /// The set is snapshotted before delivery, so subscribing from inside a
    /// callback neither deadlocks nor joins the in-progress pass. A panicking
    /// callback is isolated and does not block delivery to later subscribers.
    fn notify_all(&self, summary: &NotificationSummary) {
        let snapshot: Vec<(SubscriberId, Arc<SubscriberFn>)> =
            lock_unpoisoned(&self.subscribers).clone();
        debug!(
            "broadcasting summary (unread={}, recent={}) to {} subscriber(s)",
            summary.unread_count,
            summary.recent.len(),
            snapshot.len()
        );
        for (id, callback) in snapshot {
            if catch_unwind(AssertUnwindSafe(|| (callback.as_ref())(summary))).is_err() {
                warn!("subscriber {id} panicked while handling a summary");
            }
        }
    }
}

impl Drop for PollerInner {
    fn drop(&mut self) {
        if let Some(handle) = lock_unpoisoned(&self.task).take() {
            handle.abort();
        }
    }
}

/// Fetches notification summaries on a timer and fans them out.
///
/// Cloning is cheap and every clone drives the same underlying poller, which
/// mirrors the process-wide singleton the UI layer treats this as while
/// staying an explicitly constructed object for test isolation.
#[derive(Clone)]
pub struct NotificationPoller {
    inner: Arc<PollerInner>,
}

impl NotificationPoller {
    pub fn new(api: Arc<dyn NotificationApi>) -> Self {
        Self::with_recent_limit(api, DEFAULT_RECENT_LIMIT)
    }

    pub fn with_recent_limit(api: Arc<dyn NotificationApi>, recent_limit: usize) -> Self {
        NotificationPoller {
            inner: Arc::new(PollerInner {
                api,
                recent_limit,
                subscribers: Mutex::new(Vec::new()),
                next_subscriber_id: AtomicU64::new(1),
                active: AtomicBool::new(false),
                task: Mutex::new(None),
            }),
        }
    }

    /// Build a poller over the HTTP backend described by `config`.
    pub fn from_config(config: &Config) -> SyncResult<Self> {
        let api = HttpNotificationApi::new(&config.api)?;
        Ok(Self::with_recent_limit(
            Arc::new(api),
            config.poller.recent_limit,
        ))
    }

    /// Start the polling loop. Idempotent: if polling is already active this
    /// is a no-op. The first fetch-and-broadcast cycle runs immediately, not
    /// after the first interval.
    pub fn start_polling(&self, interval: Duration) {
        let mut task = lock_unpoisoned(&self.inner.task);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("start_polling called while already polling, ignoring");
            return;
        }

        // tokio::time::interval panics on a zero period; a zero interval
        // means "poll as fast as possible", so clamp instead of rejecting.
        let interval = interval.max(Duration::from_millis(1));

        self.inner.active.store(true, Ordering::SeqCst);
        let inner = Arc::clone(&self.inner);
        debug!("starting notification polling every {interval:?}");
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                // The first tick completes immediately.
                ticker.tick().await;
                inner.poll_once().await;
            }
        }));
    }

    /// Cancel future poll ticks. Idempotent: a no-op when not polling. An
    /// in-flight fetch is aborted rather than allowed to broadcast late.
    pub fn stop_polling(&self) {
        self.inner.active.store(false, Ordering::SeqCst);
        if let Some(handle) = lock_unpoisoned(&self.inner.task).take() {
            debug!("stopping notification polling");
            handle.abort();
        }
    }

    /// Whether the polling loop is currently running.
    pub fn is_polling(&self) -> bool {
        lock_unpoisoned(&self.inner.task)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Register a callback invoked with every broadcast summary, and get a
    /// token for de-registration. Delivery order follows registration order.
    pub fn subscribe<F>(&self, callback: F) -> SubscriberId
    where
        F: Fn(&NotificationSummary) + Send + Sync + 'static,
    {
        let id = self.inner.next_subscriber_id.fetch_add(1, Ordering::SeqCst);
        lock_unpoisoned(&self.inner.subscribers).push((id, Arc::new(callback)));
        id
    }

    /// Remove a subscriber. Unknown tokens are ignored.
    pub fn unsubscribe(&self, id: SubscriberId) {
        lock_unpoisoned(&self.inner.subscribers).retain(|(sub_id, _)| *sub_id != id);
    }

    pub fn subscriber_count(&self) -> usize {
        lock_unpoisoned(&self.inner.subscribers).len()
    }

    /// One-shot fetch of recent notifications, independent of polling.
    pub async fn get_recent(&self, limit: Option<usize>) -> SyncResult<Vec<NotificationItem>> {
        self.inner
            .api
            .recent(limit.unwrap_or(self.inner.recent_limit))
            .await
    }

    /// Mark a single notification read on the server.
    pub async fn mark_read(&self, id: &NotificationId) -> SyncResult<NotificationItem> {
        self.inner.api.mark_read(id).await
    }

    /// Mark every notification read on the server.
    pub async fn mark_all_read(&self) -> SyncResult<u64> {
        self.inner.api.mark_all_read().await
    }

    /// Stop polling and drop all subscribers. Intended for test isolation.
    pub fn reset(&self) {
        self.stop_polling();
        lock_unpoisoned(&self.inner.subscribers).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SyncError;
    use async_trait::async_trait;

    struct NullApi;

    #[async_trait]
    impl NotificationApi for NullApi {
        async fn unread_count(&self) -> SyncResult<u64> {
            Ok(0)
        }

        async fn recent(&self, _limit: usize) -> SyncResult<Vec<NotificationItem>> {
            Ok(Vec::new())
        }

        async fn mark_read(&self, _id: &NotificationId) -> SyncResult<NotificationItem> {
            Err(SyncError::internal("not implemented"))
        }

        async fn mark_all_read(&self) -> SyncResult<u64> {
            Ok(0)
        }
    }

    fn poller() -> NotificationPoller {
        NotificationPoller::new(Arc::new(NullApi))
    }

    #[test]
    fn test_subscribe_unsubscribe_counts() {
        let poller = poller();
        let a = poller.subscribe(|_| {});
        let b = poller.subscribe(|_| {});
        assert_eq!(poller.subscriber_count(), 2);
        assert_ne!(a, b);

        poller.unsubscribe(a);
        assert_eq!(poller.subscriber_count(), 1);

        // Removing an unknown or already removed token is a no-op.
        poller.unsubscribe(a);
        poller.unsubscribe(9999);
        assert_eq!(poller.subscriber_count(), 1);

        poller.unsubscribe(b);
        assert_eq!(poller.subscriber_count(), 0);
    }

    #[test]
    fn test_reset_clears_subscribers() {
        let poller = poller();
        poller.subscribe(|_| {});
        poller.subscribe(|_| {});
        poller.reset();
        assert_eq!(poller.subscriber_count(), 0);
        assert!(!poller.is_polling());
    }

    #[tokio::test]
    async fn test_stop_without_start_is_noop() {
        let poller = poller();
        poller.stop_polling();
        poller.stop_polling();
        assert!(!poller.is_polling());
    }
}
