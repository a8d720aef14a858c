//! The polling reminder loop.
//!
//! Once per minute the scheduler snapshots every user with a complete
//! reminder configuration, converts the tick instant into each user's
//! timezone, and sends a direct message to those whose reminder minute has
//! arrived and who have no activity in the trailing 24 hours. One bad row
//! or one failed delivery never takes down the loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use solvelog_store::ActivityStore;
use solvelog_types::ReminderSetting;

use crate::Notifier;
use crate::checker::ActivityChecker;
use crate::matcher;

/// One evaluation per wall-clock minute.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(60);

const REMINDER_TEXT: &str = "Reminder: you haven't logged a solved problem in \
the last 24 hours. How about touching some code today, even just a little? 💪";

/// Owns the periodic reminder evaluation.
///
/// `start` spawns the loop once the application signals readiness; `stop`
/// cancels cooperatively, letting an in-flight tick finish. Tick evaluation
/// itself takes the instant as a parameter, so tests drive it with a fixed
/// clock instead of waiting on a timer.
pub struct ReminderScheduler {
    store: Arc<ActivityStore>,
    checker: ActivityChecker,
    notifier: Arc<dyn Notifier>,
    period: Duration,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ReminderScheduler {
    pub fn new(store: Arc<ActivityStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self::with_period(store, notifier, DEFAULT_TICK_PERIOD)
    }

    pub fn with_period(
        store: Arc<ActivityStore>,
        notifier: Arc<dyn Notifier>,
        period: Duration,
    ) -> Self {
        Self {
            checker: ActivityChecker::new(store.clone()),
            store,
            notifier,
            period,
            cancel: CancellationToken::new(),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the loop. Ticking begins only after `ready` turns true.
    pub async fn start(self: &Arc<Self>, ready: watch::Receiver<bool>) -> anyhow::Result<()> {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            anyhow::bail!("reminder scheduler is already running");
        }
        let this = self.clone();
        *handle = Some(tokio::spawn(this.run(ready)));
        Ok(())
    }

    /// Cancel the loop and wait for any in-flight tick to finish.
    pub async fn stop(&self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.lock().await.take() {
            let _ = handle.await;
            info!("Reminder scheduler stopped");
        }
    }

    async fn run(self: Arc<Self>, mut ready: watch::Receiver<bool>) {
        // Hold ticking until the surrounding application reports ready.
        while !*ready.borrow() {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                changed = ready.changed() => {
                    if changed.is_err() {
                        warn!("Readiness signal dropped before becoming ready, scheduler exiting");
                        return;
                    }
                }
            }
        }

        info!(period_secs = self.period.as_secs(), "Reminder scheduler started");

        let mut interval = tokio::time::interval(self.period);
        // A stalled tick must not burst into the same minute twice.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => self.tick(Utc::now()).await,
            }
        }
    }

    /// One evaluation pass over all configured users, against a single
    /// captured instant.
    async fn tick(&self, now: DateTime<Utc>) {
        let settings = match self.store.list_users_with_reminder().await {
            Ok(settings) => settings,
            Err(e) => {
                // Abandoned tick; the next timer fire retries naturally.
                warn!("Skipping reminder tick, could not load user snapshot: {e}");
                return;
            }
        };

        debug!(users = settings.len(), %now, "Reminder tick");

        for setting in &settings {
            if let Err(e) = self.process_user(setting, now).await {
                warn!(user_id = setting.user_id, "Reminder check failed: {e}");
            }
        }
    }

    async fn process_user(
        &self,
        setting: &ReminderSetting,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        if !matcher::evaluate(now, setting)? {
            return Ok(());
        }
        if self.checker.is_active(setting.user_id, now).await? {
            debug!(
                user_id = setting.user_id,
                "Reminder moment reached but user has recent activity"
            );
            return Ok(());
        }
        self.notifier
            .send_direct_message(setting.user_id, REMINDER_TEXT)
            .await?;
        info!(user_id = setting.user_id, "Sent reminder");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solvelog_types::Platform;

    /// Notifier that records deliveries, optionally failing for chosen users.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<i64>>,
        fail_for: Vec<i64>,
    }

    #[async_trait::async_trait]
    impl Notifier for RecordingNotifier {
        async fn send_direct_message(&self, user_id: i64, _text: &str) -> anyhow::Result<()> {
            if self.fail_for.contains(&user_id) {
                anyhow::bail!("user unreachable");
            }
            self.sent.lock().await.push(user_id);
            Ok(())
        }
    }

    fn utc(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn scheduler(
        store: &Arc<ActivityStore>,
        notifier: &Arc<RecordingNotifier>,
    ) -> ReminderScheduler {
        ReminderScheduler::new(store.clone(), notifier.clone())
    }

    #[tokio::test]
    async fn test_tick_notifies_inactive_user_at_moment() {
        let store = Arc::new(ActivityStore::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        store.set_reminder(10, "07:30", "UTC").await.unwrap();

        scheduler(&store, &notifier).tick(utc("2025-06-02T07:30:00Z")).await;

        assert_eq!(*notifier.sent.lock().await, vec![10]);
    }

    #[tokio::test]
    async fn test_tick_skips_user_with_recent_activity() {
        let store = Arc::new(ActivityStore::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        store.set_reminder(10, "07:30", "UTC").await.unwrap();
        // Solved earlier the same morning
        store
            .record_solved_at(10, Platform::Paiza, "A001", None, utc("2025-06-02T07:15:00Z"))
            .await
            .unwrap();

        scheduler(&store, &notifier).tick(utc("2025-06-02T07:30:00Z")).await;

        assert!(notifier.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_tick_ignores_non_matching_minute() {
        let store = Arc::new(ActivityStore::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        store.set_reminder(10, "07:30", "UTC").await.unwrap();

        scheduler(&store, &notifier).tick(utc("2025-06-02T07:31:00Z")).await;

        assert!(notifier.sent.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_tick_converts_timezone() {
        let store = Arc::new(ActivityStore::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        store.set_reminder(10, "21:00", "Asia/Tokyo").await.unwrap();

        // 12:00:30 UTC is inside the 21:00 minute in Tokyo
        scheduler(&store, &notifier).tick(utc("2025-06-01T12:00:30Z")).await;

        assert_eq!(*notifier.sent.lock().await, vec![10]);
    }

    #[tokio::test]
    async fn test_bad_row_does_not_stop_the_tick() {
        let store = Arc::new(ActivityStore::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        // The store does not validate; a bogus zone reaches the tick as-is.
        store.set_reminder(9, "07:30", "Atlantis/Lost").await.unwrap();
        store.set_reminder(10, "07:30", "UTC").await.unwrap();

        scheduler(&store, &notifier).tick(utc("2025-06-02T07:30:00Z")).await;

        assert_eq!(*notifier.sent.lock().await, vec![10]);
    }

    #[tokio::test]
    async fn test_delivery_failure_is_isolated() {
        let store = Arc::new(ActivityStore::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier {
            sent: Mutex::new(Vec::new()),
            fail_for: vec![9],
        });
        store.set_reminder(9, "07:30", "UTC").await.unwrap();
        store.set_reminder(10, "07:30", "UTC").await.unwrap();

        scheduler(&store, &notifier).tick(utc("2025-06-02T07:30:00Z")).await;

        // The unreachable user is logged and skipped; the other still gets one
        assert_eq!(*notifier.sent.lock().await, vec![10]);
    }

    #[tokio::test]
    async fn test_each_tick_is_memoryless() {
        // Firing semantics across a matching minute are governed by tick
        // cadence alone; two ticks inside the minute both fire.
        let store = Arc::new(ActivityStore::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        store.set_reminder(10, "07:30", "UTC").await.unwrap();

        let sched = scheduler(&store, &notifier);
        sched.tick(utc("2025-06-02T07:30:00Z")).await;
        sched.tick(utc("2025-06-02T07:30:45Z")).await;

        assert_eq!(*notifier.sent.lock().await, vec![10, 10]);
    }

    #[tokio::test]
    async fn test_start_and_stop_lifecycle() {
        let store = Arc::new(ActivityStore::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let sched = Arc::new(ReminderScheduler::with_period(
            store,
            notifier,
            Duration::from_millis(10),
        ));

        let (ready_tx, ready_rx) = watch::channel(false);
        sched.start(ready_rx).await.unwrap();
        // Double start is rejected while running
        let (_tx2, rx2) = watch::channel(true);
        assert!(sched.start(rx2).await.is_err());

        ready_tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        sched.stop().await;
    }

    #[tokio::test]
    async fn test_stop_before_ready() {
        let store = Arc::new(ActivityStore::open_in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let sched = Arc::new(ReminderScheduler::new(store, notifier));

        let (_ready_tx, ready_rx) = watch::channel(false);
        sched.start(ready_rx).await.unwrap();
        // Never became ready; stop must still return promptly
        sched.stop().await;
    }
}
