//! Notification broadcaster
//!
//! Holds the toast slot and the confirmation slot. Every transition takes
//! the slot lock for one short, non-suspending critical section, so calls
//! from any producer are applied whole and in lock order. Caller actions
//! never run under the lock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use moodcast_common::config::NotificationSettings;
use moodcast_common::events::{
    ClearReason, ConfirmationSnapshot, NotificationEvent, NotificationSnapshot, Severity,
    ToastSnapshot,
};
use moodcast_common::Result;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::confirmation::{ConfirmationRequest, PendingConfirmation, Resolution};

/// Shared toast/confirmation service
///
/// Cloning yields another handle to the same slots. Call
/// [`shutdown`](Self::shutdown) at process end: a pending action that
/// captured a handle keeps the slots alive until the slot is emptied.
#[derive(Clone)]
pub struct NotificationBroadcaster {
    inner: Arc<Inner>,
}

struct Inner {
    settings: NotificationSettings,
    runtime: Handle,
    slots: Mutex<Slots>,
    event_tx: broadcast::Sender<NotificationEvent>,
}

#[derive(Default)]
struct Slots {
    toast: Option<ActiveToast>,
    confirmation: Option<PendingConfirmation>,
}

struct ActiveToast {
    snapshot: ToastSnapshot,
    expiry: AbortHandle,
}

impl NotificationBroadcaster {
    /// Create a broadcaster bound to the current Tokio runtime
    ///
    /// Fails with `Error::Runtime` outside a runtime context.
    pub fn new(settings: NotificationSettings) -> Result<Self> {
        let runtime = Handle::try_current()?;
        Self::with_runtime(settings, runtime)
    }

    /// Create a broadcaster whose toast timers run on `runtime`
    pub fn with_runtime(settings: NotificationSettings, runtime: Handle) -> Result<Self> {
        settings.validate()?;

        let (event_tx, _) = broadcast::channel(settings.event_capacity);
        info!(
            "Notification broadcaster initialized (toast duration {} ms)",
            settings.toast_duration_ms
        );

        Ok(Self {
            inner: Arc::new(Inner {
                settings,
                runtime,
                slots: Mutex::new(Slots::default()),
                event_tx,
            }),
        })
    }

    // ========================================================================
    // Producer interface
    // ========================================================================

    /// Show `message` as the toast, replacing any current toast
    ///
    /// The new toast gets a fresh expiry timer. The replaced toast's timer
    /// is aborted. Empty messages are shown as-is.
    pub fn notify(&self, message: impl Into<String>, severity: Severity) -> Uuid {
        let snapshot = ToastSnapshot {
            id: Uuid::new_v4(),
            message: message.into(),
            severity,
        };
        let id = snapshot.id;

        let mut slots = self.inner.lock_slots();

        // Spawned under the lock: the timer cannot observe the slot before
        // this toast occupies it.
        let expiry = self.spawn_expiry(id);
        let replaced = slots.toast.replace(ActiveToast {
            snapshot: snapshot.clone(),
            expiry,
        });

        if let Some(previous) = replaced {
            previous.expiry.abort();
            debug!("Toast {} replaced by {}", previous.snapshot.id, id);
        }
        debug!("Toast {} shown ({})", id, severity);

        self.inner.publish(NotificationEvent::ToastShown {
            toast: snapshot,
            timestamp: chrono::Utc::now(),
        });

        id
    }

    pub fn info(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Severity::Info)
    }

    pub fn success(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Severity::Success)
    }

    pub fn error(&self, message: impl Into<String>) -> Uuid {
        self.notify(message, Severity::Error)
    }

    /// Ask the user to confirm before running `on_confirm`
    ///
    /// Uses the configured label, style and heading. See
    /// [`confirm_request`](Self::confirm_request).
    pub fn confirm<F>(&self, message: impl Into<String>, on_confirm: F) -> Uuid
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        self.confirm_request(ConfirmationRequest::new(message, on_confirm))
    }

    /// Make `request` the pending confirmation
    ///
    /// A request that is already pending is discarded and its action is
    /// dropped without running. Its creator is not told.
    pub fn confirm_request(&self, request: ConfirmationRequest) -> Uuid {
        let pending = request.into_pending(&self.inner.settings);
        let snapshot = pending.snapshot.clone();
        let id = snapshot.id;

        let replaced = {
            let mut slots = self.inner.lock_slots();
            let replaced = slots.confirmation.replace(pending);

            if let Some(previous) = &replaced {
                debug!(
                    "Confirmation {} replaced by {}; its action will not run",
                    previous.snapshot.id, id
                );
            }
            debug!("Confirmation {} pending: {:?}", id, snapshot.message);

            self.inner.publish(NotificationEvent::ConfirmationRequested {
                confirmation: snapshot,
                timestamp: chrono::Utc::now(),
            });
            replaced
        };

        // Captured state of the discarded action is dropped outside the lock
        drop(replaced);
        id
    }

    // ========================================================================
    // Consumer interface
    // ========================================================================

    /// Resolve the pending confirmation
    ///
    /// When `accepted`, the slot is cleared first and then the action runs,
    /// so a failing action never leaves a stale request behind. A request
    /// the action itself creates stays pending. An error (or panic) from the
    /// action propagates unchanged. With nothing pending this is a no-op.
    pub fn resolve_confirm(&self, accepted: bool) -> anyhow::Result<Resolution> {
        let pending = {
            let mut slots = self.inner.lock_slots();
            let Some(pending) = slots.confirmation.take() else {
                debug!("resolve_confirm({}) with nothing pending", accepted);
                return Ok(Resolution::NoPending);
            };

            self.inner.publish(NotificationEvent::ConfirmationResolved {
                id: pending.snapshot.id,
                accepted,
                timestamp: chrono::Utc::now(),
            });
            pending
        };

        let PendingConfirmation { snapshot, action } = pending;
        if !accepted {
            debug!("Confirmation {} cancelled", snapshot.id);
            return Ok(Resolution::Cancelled);
        }

        debug!("Confirmation {} accepted, running action", snapshot.id);
        action()?;
        Ok(Resolution::Confirmed)
    }

    /// Remove the toast before it expires
    ///
    /// Returns `false` when no toast was showing.
    pub fn dismiss_toast(&self) -> bool {
        let mut slots = self.inner.lock_slots();
        match slots.toast.take() {
            Some(active) => {
                active.expiry.abort();
                debug!("Toast {} dismissed", active.snapshot.id);
                self.inner.publish(NotificationEvent::ToastCleared {
                    id: active.snapshot.id,
                    reason: ClearReason::Dismissed,
                    timestamp: chrono::Utc::now(),
                });
                true
            }
            None => false,
        }
    }

    /// Empty both slots and stop the toast timer
    ///
    /// The pending action is dropped without running and no events are
    /// sent. Dropping the action releases any handle it captured, so the
    /// broadcaster can be freed once the remaining handles go away.
    pub fn shutdown(&self) {
        let (toast, confirmation) = {
            let mut slots = self.inner.lock_slots();
            (slots.toast.take(), slots.confirmation.take())
        };

        if let Some(active) = &toast {
            active.expiry.abort();
        }
        info!(
            "Notification broadcaster shut down (toast: {}, confirmation: {})",
            toast.is_some(),
            confirmation.is_some()
        );
        drop(confirmation);
    }

    /// Both slots as the rendering surface should show them
    pub fn snapshot(&self) -> NotificationSnapshot {
        let slots = self.inner.lock_slots();
        NotificationSnapshot {
            toast: slots.toast.as_ref().map(|t| t.snapshot.clone()),
            confirmation: slots.confirmation.as_ref().map(|c| c.snapshot.clone()),
        }
    }

    pub fn toast(&self) -> Option<ToastSnapshot> {
        self.inner
            .lock_slots()
            .toast
            .as_ref()
            .map(|t| t.snapshot.clone())
    }

    pub fn confirmation(&self) -> Option<ConfirmationSnapshot> {
        self.inner
            .lock_slots()
            .confirmation
            .as_ref()
            .map(|c| c.snapshot.clone())
    }

    /// Subscribe to slot transitions
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Number of live event subscribers
    pub fn subscriber_count(&self) -> usize {
        self.inner.event_tx.receiver_count()
    }

    fn spawn_expiry(&self, id: Uuid) -> AbortHandle {
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let duration = self.inner.settings.toast_duration();

        self.inner
            .runtime
            .spawn(async move {
                tokio::time::sleep(duration).await;
                if let Some(inner) = inner.upgrade() {
                    inner.expire_toast(id);
                }
            })
            .abort_handle()
    }
}

impl Inner {
    fn lock_slots(&self) -> MutexGuard<'_, Slots> {
        // Caller code never runs under this lock, so poisoning leaves the
        // slots consistent.
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, event: NotificationEvent) {
        // Ignore send errors (no subscribers is OK)
        let _ = self.event_tx.send(event);
    }

    /// Clear the toast if `id` still occupies the slot
    fn expire_toast(&self, id: Uuid) {
        let mut slots = self.lock_slots();
        match &slots.toast {
            Some(active) if active.snapshot.id == id => {
                slots.toast = None;
                debug!("Toast {} expired", id);
                self.publish(NotificationEvent::ToastCleared {
                    id,
                    reason: ClearReason::Expired,
                    timestamp: chrono::Utc::now(),
                });
            }
            _ => debug!("Stale expiry for toast {} ignored", id),
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let slots = self.slots.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(active) = slots.toast.take() {
            active.expiry.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    fn broadcaster() -> NotificationBroadcaster {
        NotificationBroadcaster::new(NotificationSettings::default()).unwrap()
    }

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() -> anyhow::Result<()> + Send + 'static) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&count);
        (count, move || {
            handle.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let result = NotificationBroadcaster::new(NotificationSettings::default());
        assert!(matches!(result, Err(moodcast_common::Error::Runtime(_))));
    }

    #[tokio::test]
    async fn test_zero_capacity_rejected() {
        let settings = NotificationSettings {
            event_capacity: 0,
            ..NotificationSettings::default()
        };
        assert!(NotificationBroadcaster::new(settings).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_initial_state_is_empty() {
        let notices = broadcaster();
        assert!(notices.snapshot().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_toast_expires_after_4000ms() {
        let notices = broadcaster();
        notices.notify("Login successful!", Severity::Success);

        let toast = notices.toast().expect("toast should be showing");
        assert_eq!(toast.message, "Login successful!");
        assert_eq!(toast.severity, Severity::Success);

        sleep(Duration::from_millis(3999)).await;
        assert!(notices.toast().is_some(), "toast cleared too early");

        sleep(Duration::from_millis(2)).await;
        assert!(notices.toast().is_none(), "toast should have expired");
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_toast_replaces_older() {
        let notices = broadcaster();
        notices.info("A");
        sleep(Duration::from_millis(500)).await;
        let b = notices.info("B");

        // A's deadline (t=4000) passes while B is still within its window
        sleep(Duration::from_millis(3600)).await;
        let toast = notices.toast().expect("B should still be visible");
        assert_eq!(toast.id, b);
        assert_eq!(toast.message, "B");

        // B expires at t=4500
        sleep(Duration::from_millis(401)).await;
        assert!(notices.toast().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_toasts_only_last_visible() {
        let notices = broadcaster();
        let mut last = Uuid::nil();
        for i in 0..10 {
            last = notices.info(format!("message {}", i));
            sleep(Duration::from_millis(100)).await;
        }

        let toast = notices.toast().unwrap();
        assert_eq!(toast.id, last);
        assert_eq!(toast.message, "message 9");
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_expiry_does_not_clear_newer_toast() {
        let notices = broadcaster();
        let a = notices.info("A");
        let b = notices.info("B");

        // Simulate A's timer firing after replacement
        notices.inner.expire_toast(a);
        assert_eq!(notices.toast().map(|t| t.id), Some(b));

        notices.inner.expire_toast(b);
        assert!(notices.toast().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_message_is_shown() {
        let notices = broadcaster();
        notices.info("");
        assert_eq!(notices.toast().unwrap().message, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dismiss_toast() {
        let notices = broadcaster();
        assert!(!notices.dismiss_toast());

        notices.error("Failed to fetch history");
        assert!(notices.dismiss_toast());
        assert!(notices.toast().is_none());

        // A later toast still gets its full window
        sleep(Duration::from_millis(1000)).await;
        notices.info("next");
        sleep(Duration::from_millis(3500)).await;
        assert!(notices.toast().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_duration() {
        let settings = NotificationSettings {
            toast_duration_ms: 250,
            ..NotificationSettings::default()
        };
        let notices = NotificationBroadcaster::new(settings).unwrap();
        notices.info("quick");

        sleep(Duration::from_millis(251)).await;
        assert!(notices.toast().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_confirmation_runs_once() {
        let notices = broadcaster();
        let (count, do_logout) = counter();

        notices.confirm_request(
            ConfirmationRequest::new("Do you want to sign out?", do_logout)
                .confirm_label("Logout")
                .confirm_style("danger-btn"),
        );

        let pending = notices.confirmation().expect("request should be pending");
        assert_eq!(pending.message, "Do you want to sign out?");
        assert_eq!(pending.confirm_label, "Logout");
        assert_eq!(pending.confirm_style, "danger-btn");
        assert_eq!(count.load(Ordering::SeqCst), 0, "action must not run early");

        assert_eq!(notices.resolve_confirm(true).unwrap(), Resolution::Confirmed);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(notices.confirmation().is_none());

        // A second resolve is a no-op
        assert_eq!(notices.resolve_confirm(true).unwrap(), Resolution::NoPending);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirmation_uses_defaults() {
        let notices = broadcaster();
        notices.confirm("Delete this song?", || Ok(()));

        let pending = notices.confirmation().unwrap();
        assert_eq!(pending.confirm_label, "Confirm");
        assert_eq!(pending.confirm_style, "destructive");
        assert_eq!(pending.heading, "Are you sure?");
    }

    #[tokio::test(start_paused = true)]
    async fn test_newer_confirmation_replaces_older() {
        let notices = broadcaster();
        let (first, fn1) = counter();
        let (second, fn2) = counter();

        notices.confirm("msg1", fn1);
        let id2 = notices.confirm("msg2", fn2);

        let pending = notices.confirmation().unwrap();
        assert_eq!(pending.id, id2);
        assert_eq!(pending.message, "msg2");

        notices.resolve_confirm(true).unwrap();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_does_not_run_action() {
        let notices = broadcaster();
        let (count, action) = counter();

        notices.confirm("Remove from library?", action);
        assert_eq!(notices.resolve_confirm(false).unwrap(), Resolution::Cancelled);

        assert!(notices.confirmation().is_none());
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolve_without_pending_is_noop() {
        let notices = broadcaster();
        notices.info("unrelated");
        let mut events = notices.subscribe();

        assert_eq!(notices.resolve_confirm(true).unwrap(), Resolution::NoPending);
        assert_eq!(notices.resolve_confirm(false).unwrap(), Resolution::NoPending);

        assert!(notices.toast().is_some());
        assert!(events.try_recv().is_err(), "no-op must not emit events");
    }

    #[tokio::test(start_paused = true)]
    async fn test_toast_and_confirmation_are_independent() {
        let notices = broadcaster();
        notices.confirm("Delete this song?", || Ok(()));
        notices.success("Song added to your library");

        // Toast expiry leaves the confirmation pending
        sleep(Duration::from_millis(4001)).await;
        assert!(notices.toast().is_none());
        assert!(notices.confirmation().is_some());

        // Resolving the confirmation leaves a new toast alone
        notices.info("still here");
        notices.resolve_confirm(false).unwrap();
        assert!(notices.toast().is_some());
        assert!(notices.confirmation().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_action_propagates_and_clears_slot() {
        let notices = broadcaster();
        notices.confirm("Delete this song?", || anyhow::bail!("Delete failed: 500"));

        let err = notices.resolve_confirm(true).unwrap_err();
        assert_eq!(err.to_string(), "Delete failed: 500");
        assert!(notices.confirmation().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_action_still_clears_slot() {
        let notices = broadcaster();
        notices.confirm("Do you want to sign out?", || panic!("logout exploded"));

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            notices.resolve_confirm(true)
        }));
        assert!(result.is_err());
        assert!(notices.confirmation().is_none());

        // Broadcaster remains usable
        notices.info("after panic");
        assert!(notices.toast().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_may_notify() {
        let notices = broadcaster();
        let producer = notices.clone();

        notices.confirm("Delete this song?", move || {
            producer.success("Song deleted");
            Ok(())
        });
        notices.resolve_confirm(true).unwrap();

        assert_eq!(notices.toast().unwrap().message, "Song deleted");
    }

    #[tokio::test(start_paused = true)]
    async fn test_replaced_action_is_dropped_not_run() {
        let notices = broadcaster();
        let captured = Arc::new(());
        let witness = Arc::clone(&captured);

        notices.confirm("first", move || {
            let _keep = witness;
            Ok(())
        });
        assert_eq!(Arc::strong_count(&captured), 2);

        notices.confirm("second", || Ok(()));
        assert_eq!(Arc::strong_count(&captured), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_follow_transitions() {
        let notices = broadcaster();
        let mut events = notices.subscribe();

        let toast_id = notices.success("Login successful!");
        let confirm_id = notices.confirm("Do you want to sign out?", || Ok(()));
        notices.resolve_confirm(true).unwrap();
        sleep(Duration::from_millis(4001)).await;

        match events.recv().await.unwrap() {
            NotificationEvent::ToastShown { toast, .. } => assert_eq!(toast.id, toast_id),
            other => panic!("unexpected event: {:?}", other),
        }
        match events.recv().await.unwrap() {
            NotificationEvent::ConfirmationRequested { confirmation, .. } => {
                assert_eq!(confirmation.id, confirm_id)
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match events.recv().await.unwrap() {
            NotificationEvent::ConfirmationResolved { id, accepted, .. } => {
                assert_eq!(id, confirm_id);
                assert!(accepted);
            }
            other => panic!("unexpected event: {:?}", other),
        }
        match events.recv().await.unwrap() {
            NotificationEvent::ToastCleared { id, reason, .. } => {
                assert_eq!(id, toast_id);
                assert_eq!(reason, ClearReason::Expired);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    fn expiry_handle(notices: &NotificationBroadcaster) -> AbortHandle {
        notices
            .inner
            .lock_slots()
            .toast
            .as_ref()
            .expect("toast should be showing")
            .expiry
            .clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_last_handle_aborts_timer() {
        let notices = broadcaster();
        notices.info("bye");
        let expiry = expiry_handle(&notices);

        drop(notices);
        sleep(Duration::from_millis(1)).await;

        // Long before the 4000 ms deadline the timer task is gone
        assert!(expiry.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_action_may_confirm_again() {
        let notices = broadcaster();
        let producer = notices.clone();
        let (cleared, clear_history) = counter();

        notices.confirm("Delete this song?", move || {
            producer.confirm("Also clear history?", clear_history);
            Ok(())
        });
        assert_eq!(notices.resolve_confirm(true).unwrap(), Resolution::Confirmed);

        // The slot was emptied before the action ran, so the follow-up stays
        let pending = notices.confirmation().expect("follow-up should be pending");
        assert_eq!(pending.message, "Also clear history?");
        assert_eq!(cleared.load(Ordering::SeqCst), 0);

        notices.resolve_confirm(true).unwrap();
        assert_eq!(cleared.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_releases_handle_held_by_action() {
        let notices = broadcaster();
        let mut events = notices.subscribe();
        let producer = notices.clone();

        notices.success("Song added to your library");
        let expiry = expiry_handle(&notices);
        notices.confirm("Delete this song?", move || {
            producer.success("Song deleted");
            Ok(())
        });
        assert_eq!(Arc::strong_count(&notices.inner), 2);

        notices.shutdown();
        assert!(notices.snapshot().is_empty());
        assert_eq!(Arc::strong_count(&notices.inner), 1);

        sleep(Duration::from_millis(1)).await;
        assert!(expiry.is_finished());

        let _shown = events.recv().await.unwrap();
        let _requested = events.recv().await.unwrap();

        drop(notices);
        sleep(Duration::from_millis(5000)).await;

        // No expiry fired and the sender went away with the broadcaster
        assert!(matches!(
            events.recv().await,
            Err(broadcast::error::RecvError::Closed)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_when_empty_is_harmless() {
        let notices = broadcaster();
        notices.shutdown();
        assert!(notices.snapshot().is_empty());

        // Still usable afterwards
        notices.info("after shutdown");
        assert!(notices.toast().is_some());
    }
}
