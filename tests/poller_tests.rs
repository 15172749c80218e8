//! Poller behavior tests against a scripted in-process API.
//!
//! Time is paused so interval ticks and timers are deterministic.

use async_trait::async_trait;
use skillsync_notify::api::NotificationApi;
use skillsync_notify::errors::{SyncError, SyncResult};
use skillsync_notify::model::{NotificationId, NotificationItem, NotificationSummary};
use skillsync_notify::poller::NotificationPoller;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn item(id: i64, title: &str) -> NotificationItem {
    NotificationItem {
        id: NotificationId::Int(id),
        kind: None,
        title: title.to_string(),
        message: String::new(),
        read: false,
        related_gig_id: None,
        related_application_id: None,
        created_at: None,
    }
}

/// Fake backend with scripted responses. With `fail` set every call errors;
/// with `hang` set every call parks on a channel that never delivers.
struct ScriptedApi {
    unread: u64,
    items: Vec<NotificationItem>,
    fail: bool,
    hang: Option<flume::Receiver<()>>,
}

impl ScriptedApi {
    fn ok(unread: u64, items: Vec<NotificationItem>) -> Self {
        ScriptedApi {
            unread,
            items,
            fail: false,
            hang: None,
        }
    }

    fn failing() -> Self {
        ScriptedApi {
            unread: 0,
            items: Vec::new(),
            fail: true,
            hang: None,
        }
    }

    async fn gate(&self) -> SyncResult<()> {
        if let Some(rx) = &self.hang {
            let _ = rx.recv_async().await;
        }
        if self.fail {
            return Err(SyncError::NetworkTimeout);
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationApi for ScriptedApi {
    async fn unread_count(&self) -> SyncResult<u64> {
        self.gate().await?;
        Ok(self.unread)
    }

    async fn recent(&self, limit: usize) -> SyncResult<Vec<NotificationItem>> {
        self.gate().await?;
        Ok(self.items.iter().take(limit).cloned().collect())
    }

    async fn mark_read(&self, id: &NotificationId) -> SyncResult<NotificationItem> {
        self.gate().await?;
        self.items
            .iter()
            .find(|item| &item.id == id)
            .cloned()
            .map(|mut item| {
                item.read = true;
                item
            })
            .ok_or_else(|| SyncError::HttpStatus {
                status_code: 404,
                reason: "notification not found".to_string(),
            })
    }

    async fn mark_all_read(&self) -> SyncResult<u64> {
        self.gate().await?;
        Ok(self.unread)
    }
}

fn recording_subscriber(
    poller: &NotificationPoller,
    log: &Arc<Mutex<Vec<NotificationSummary>>>,
) -> skillsync_notify::poller::SubscriberId {
    let log = Arc::clone(log);
    poller.subscribe(move |summary| {
        log.lock().unwrap().push(summary.clone());
    })
}

#[tokio::test(start_paused = true)]
async fn first_tick_runs_immediately() {
    let poller = NotificationPoller::new(Arc::new(ScriptedApi::ok(2, vec![item(1, "hi")])));
    let log = Arc::new(Mutex::new(Vec::new()));
    recording_subscriber(&poller, &log);

    poller.start_polling(Duration::from_secs(5));
    tokio::time::sleep(Duration::from_millis(10)).await;

    // One broadcast before the first interval elapses.
    assert_eq!(log.lock().unwrap().len(), 1);
    assert_eq!(log.lock().unwrap()[0].unread_count, 2);
}

#[tokio::test(start_paused = true)]
async fn start_polling_is_idempotent() {
    let poller = NotificationPoller::new(Arc::new(ScriptedApi::ok(0, Vec::new())));
    let log = Arc::new(Mutex::new(Vec::new()));
    recording_subscriber(&poller, &log);

    poller.start_polling(Duration::from_secs(5));
    poller.start_polling(Duration::from_secs(5));
    assert!(poller.is_polling());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(log.lock().unwrap().len(), 1, "duplicate start doubled the timer");

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(log.lock().unwrap().len(), 2);

    poller.stop_polling();
    assert!(!poller.is_polling());
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(log.lock().unwrap().len(), 2, "broadcast after stop_polling");

    // Stopping again is a no-op.
    poller.stop_polling();
}

#[tokio::test(start_paused = true)]
async fn zero_interval_polls_instead_of_panicking() {
    let poller = NotificationPoller::new(Arc::new(ScriptedApi::ok(1, Vec::new())));
    let log = Arc::new(Mutex::new(Vec::new()));
    recording_subscriber(&poller, &log);

    // "As fast as possible" is a legal interval and must keep polling.
    poller.start_polling(Duration::ZERO);
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(poller.is_polling(), "zero-interval poll task died");
    assert!(log.lock().unwrap().len() >= 2);
    assert_eq!(log.lock().unwrap()[0].unread_count, 1);

    poller.stop_polling();
}

#[tokio::test(start_paused = true)]
async fn failed_fetch_degrades_to_empty_summary() {
    let poller = NotificationPoller::new(Arc::new(ScriptedApi::failing()));
    let log = Arc::new(Mutex::new(Vec::new()));
    recording_subscriber(&poller, &log);

    poller.start_polling(Duration::from_secs(5));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0], NotificationSummary::empty());
}

#[tokio::test(start_paused = true)]
async fn failure_does_not_halt_the_timer() {
    let poller = NotificationPoller::new(Arc::new(ScriptedApi::failing()));
    let log = Arc::new(Mutex::new(Vec::new()));
    recording_subscriber(&poller, &log);

    poller.start_polling(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(3500)).await;

    // Immediate tick plus three interval ticks, all degraded.
    assert_eq!(log.lock().unwrap().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn panicking_subscriber_does_not_block_later_ones() {
    let poller = NotificationPoller::new(Arc::new(ScriptedApi::ok(1, Vec::new())));

    poller.subscribe(|_| panic!("listener bug"));
    let log = Arc::new(Mutex::new(Vec::new()));
    recording_subscriber(&poller, &log);

    poller.start_polling(Duration::from_secs(5));
    tokio::time::sleep(Duration::from_millis(10)).await;

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].unread_count, 1);
}

#[tokio::test(start_paused = true)]
async fn subscribers_receive_summary_in_registration_order() {
    let poller = NotificationPoller::new(Arc::new(ScriptedApi::ok(3, vec![item(1, "gig")])));

    let order = Arc::new(Mutex::new(Vec::new()));
    let payloads = Arc::new(Mutex::new(Vec::new()));

    for name in ["cb1", "cb2"] {
        let order = Arc::clone(&order);
        let payloads = Arc::clone(&payloads);
        poller.subscribe(move |summary| {
            order.lock().unwrap().push(name);
            payloads.lock().unwrap().push(summary.clone());
        });
    }

    poller.start_polling(Duration::from_secs(5));
    tokio::time::sleep(Duration::from_millis(10)).await;
    poller.stop_polling();

    assert_eq!(*order.lock().unwrap(), vec!["cb1", "cb2"]);
    let payloads = payloads.lock().unwrap();
    assert_eq!(payloads.len(), 2);
    for summary in payloads.iter() {
        assert_eq!(summary.unread_count, 3);
        assert_eq!(summary.recent, vec![item(1, "gig")]);
    }
}

#[tokio::test(start_paused = true)]
async fn unsubscribed_callback_misses_later_ticks() {
    let poller = NotificationPoller::new(Arc::new(ScriptedApi::ok(0, Vec::new())));

    let cb1_log = Arc::new(Mutex::new(Vec::new()));
    let cb2_log = Arc::new(Mutex::new(Vec::new()));
    let cb1 = recording_subscriber(&poller, &cb1_log);
    recording_subscriber(&poller, &cb2_log);

    poller.start_polling(Duration::from_secs(1));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(cb1_log.lock().unwrap().len(), 1);
    assert_eq!(cb2_log.lock().unwrap().len(), 1);

    poller.unsubscribe(cb1);
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(cb1_log.lock().unwrap().len(), 1);
    assert_eq!(cb2_log.lock().unwrap().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn stop_during_in_flight_fetch_drops_the_broadcast() {
    // Channel with a live sender and no messages: the fetch parks forever.
    let (_gate_tx, gate_rx) = flume::bounded::<()>(1);
    let api = ScriptedApi {
        unread: 9,
        items: Vec::new(),
        fail: false,
        hang: Some(gate_rx),
    };
    let poller = NotificationPoller::new(Arc::new(api));
    let log = Arc::new(Mutex::new(Vec::new()));
    recording_subscriber(&poller, &log);

    poller.start_polling(Duration::from_secs(5));
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(log.lock().unwrap().is_empty(), "fetch should still be parked");

    poller.stop_polling();
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert!(log.lock().unwrap().is_empty(), "stale broadcast escaped stop");
}

#[tokio::test(start_paused = true)]
async fn one_shot_operations_work_without_polling() {
    let poller =
        NotificationPoller::new(Arc::new(ScriptedApi::ok(2, vec![item(1, "a"), item(2, "b")])));
    let log = Arc::new(Mutex::new(Vec::new()));
    recording_subscriber(&poller, &log);

    let recent = poller.get_recent(Some(1)).await.unwrap();
    assert_eq!(recent, vec![item(1, "a")]);

    let marked = poller.mark_read(&NotificationId::Int(2)).await.unwrap();
    assert!(marked.read);

    assert_eq!(poller.mark_all_read().await.unwrap(), 2);

    // None of the one-shot calls broadcast to subscribers.
    assert!(log.lock().unwrap().is_empty());
    assert!(!poller.is_polling());
}
