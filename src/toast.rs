//! In-memory toast queue with auto-expiry
//!
//! Holds ephemeral user-facing messages and notifies observers of every queue
//! change. Each entry schedules a one-shot expiry timer on push; manual
//! dismissal and expiry race harmlessly because removal is idempotent.
//!
//! Pushing requires a Tokio runtime, since expiry timers are spawned tasks.

use crate::model::{ToastEntry, ToastId, ToastRequest, DEFAULT_TOAST_DURATION};
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tracing::debug;

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

struct ToastInner {
    queue: Mutex<Vec<ToastEntry>>,
    observers: Mutex<Vec<flume::Sender<Vec<ToastEntry>>>>,
    next_id: AtomicU64,
    default_duration: Duration,
}

impl ToastInner {
    fn snapshot(&self) -> Vec<ToastEntry> {
        lock_unpoisoned(&self.queue).clone()
    }

    fn dismiss(&self, id: ToastId) {
        let removed = {
            let mut queue = lock_unpoisoned(&self.queue);
            match queue.iter().position(|entry| entry.id == id) {
                Some(index) => {
                    queue.remove(index);
                    true
                }
                None => false,
            }
        };
        if removed {
            debug!("dismissed toast {id}");
            self.notify_observers();
        }
    }

    fn notify_observers(&self) {
        let snapshot = self.snapshot();
        let mut observers = lock_unpoisoned(&self.observers);
        // A failed send means the receiver is gone; prune it.
        observers.retain(|tx| tx.send(snapshot.clone()).is_ok());
    }
}

/// Queue of currently visible toasts.
///
/// Clones share the same underlying queue. The queue contents are the sole
/// source of truth for visibility: an entry exists exactly while its toast
/// should be on screen.
#[derive(Clone)]
pub struct ToastQueue {
    inner: Arc<ToastInner>,
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::with_default_duration(DEFAULT_TOAST_DURATION)
    }

    /// A queue whose entries fall back to `default_duration` when the push
    /// request does not carry one.
    pub fn with_default_duration(default_duration: Duration) -> Self {
        ToastQueue {
            inner: Arc::new(ToastInner {
                queue: Mutex::new(Vec::new()),
                observers: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                default_duration,
            }),
        }
    }

    /// Append a toast, notify observers, and schedule its expiry. Returns the
    /// assigned id so the caller may dismiss it early, or `None` when the
    /// message is empty (an empty toast is dropped rather than enqueued).
    pub fn push(&self, request: ToastRequest) -> Option<ToastId> {
        if request.message.trim().is_empty() {
            debug!("dropping toast with empty message");
            return None;
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        let duration = request.duration.unwrap_or(self.inner.default_duration);
        let entry = ToastEntry {
            id,
            kind: request.kind,
            message: request.message,
            created_at: Utc::now(),
            duration,
        };

        debug!("pushed {} toast {id} (expires in {duration:?})", entry.kind);
        lock_unpoisoned(&self.inner.queue).push(entry);
        self.inner.notify_observers();

        // Weak handle so a leftover timer cannot keep a dropped queue alive.
        let inner: Weak<ToastInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = inner.upgrade() {
                inner.dismiss(id);
            }
        });

        Some(id)
    }

    /// Remove a toast by id. Unknown ids are ignored, which covers the race
    /// between the expiry timer and a manual dismiss.
    pub fn dismiss(&self, id: ToastId) {
        self.inner.dismiss(id);
    }

    /// Current queue contents, in push order.
    pub fn snapshot(&self) -> Vec<ToastEntry> {
        self.inner.snapshot()
    }

    /// Subscribe to queue changes as a stream of snapshots. The receiver is
    /// seeded with the current contents; dropping it unsubscribes.
    pub fn observe(&self) -> flume::Receiver<Vec<ToastEntry>> {
        let (tx, rx) = flume::unbounded();
        let _ = tx.send(self.snapshot());
        lock_unpoisoned(&self.inner.observers).push(tx);
        rx
    }

    pub fn len(&self) -> usize {
        lock_unpoisoned(&self.inner.queue).len()
    }

    pub fn is_empty(&self) -> bool {
        lock_unpoisoned(&self.inner.queue).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ToastKind;

    #[tokio::test]
    async fn test_push_assigns_monotonic_ids() {
        let queue = ToastQueue::new();
        let a = queue.push(ToastRequest::info("a")).unwrap();
        let b = queue.push(ToastRequest::info("b")).unwrap();
        assert!(b > a);
    }

    #[tokio::test]
    async fn test_empty_message_is_noop() {
        let queue = ToastQueue::new();
        assert_eq!(queue.push(ToastRequest::info("")), None);
        assert_eq!(queue.push(ToastRequest::info("   ")), None);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn test_kind_and_duration_defaults() {
        let queue = ToastQueue::with_default_duration(Duration::from_millis(1234));
        queue.push(ToastRequest::info("hello")).unwrap();
        let snapshot = queue.snapshot();
        assert_eq!(snapshot[0].kind, ToastKind::Info);
        assert_eq!(snapshot[0].duration, Duration::from_millis(1234));
    }

    #[tokio::test]
    async fn test_dismiss_unknown_id_is_noop() {
        let queue = ToastQueue::new();
        queue.dismiss(42);
        let id = queue.push(ToastRequest::info("x")).unwrap();
        queue.dismiss(id);
        queue.dismiss(id);
        assert!(queue.is_empty());
    }
}
