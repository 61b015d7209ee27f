use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use acm_balance::AccountBalance;
use acm_store::{SharedStore, WidgetSnapshot};

use crate::notify::Notifier;
use crate::policy::AlertPolicy;
use crate::reload::TimelineReloader;
use crate::source::BalanceSource;

#[derive(Debug)]
pub enum RefreshOutcome {
    Updated(AccountBalance),
    Failed(String),
    /// A refresh was already in flight; this trigger did nothing.
    Skipped,
}

/// Drives periodic balance fetches and fans the result out to the
/// shared store, the widget host, and the alert policy.
///
/// Only one fetch runs at a time: triggers that arrive while one is in
/// flight are dropped, and an in-flight fetch always runs to completion
/// before the flag resets.
pub struct RefreshScheduler {
    source: Arc<dyn BalanceSource>,
    store: Arc<SharedStore>,
    notifier: Arc<dyn Notifier>,
    reloader: Arc<dyn TimelineReloader>,
    policy: AlertPolicy,
    fetching: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl RefreshScheduler {
    pub fn new(
        source: Arc<dyn BalanceSource>,
        store: Arc<SharedStore>,
        notifier: Arc<dyn Notifier>,
        reloader: Arc<dyn TimelineReloader>,
    ) -> Self {
        Self {
            source,
            store,
            notifier,
            reloader,
            policy: AlertPolicy::new(),
            fetching: AtomicBool::new(false),
            last_error: Mutex::new(None),
        }
    }

    /// Tick loop. The interval is re-read from settings on every
    /// iteration, so changes take effect at the next tick.
    pub async fn run(&self) {
        loop {
            let interval = self.store.get_settings().refresh_interval();
            tokio::time::sleep(interval).await;
            self.refresh().await;
        }
    }

    /// Trigger one refresh. A no-op when a fetch is already in flight.
    pub async fn refresh(&self) -> RefreshOutcome {
        if self
            .fetching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("refresh already in flight; ignoring trigger");
            return RefreshOutcome::Skipped;
        }
        let outcome = self.do_refresh().await;
        self.fetching.store(false, Ordering::SeqCst);
        outcome
    }

    /// Foreground hook: refresh only when the cached snapshot is older
    /// than the configured interval (or missing entirely). Returns
    /// `None` when the cache is still fresh.
    pub async fn refresh_if_stale(&self, now: DateTime<Utc>) -> Option<RefreshOutcome> {
        let last_update = match self.store.get_last_update() {
            Some(last) => last,
            None => return Some(self.refresh().await),
        };
        let interval = chrono::Duration::from_std(self.store.get_settings().refresh_interval())
            .unwrap_or_else(|_| chrono::Duration::minutes(1));
        if now - last_update > interval {
            Some(self.refresh().await)
        } else {
            None
        }
    }

    /// The most recent fetch error, for in-process observers. The
    /// shared store never holds errors: a failed refresh leaves the
    /// prior good snapshot in place.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap().clone()
    }

    async fn do_refresh(&self) -> RefreshOutcome {
        match self.source.fetch().await {
            Ok(balance) => {
                let now = Utc::now();
                if let Err(e) = self.store.put_balance(&balance) {
                    tracing::warn!("failed to cache balance: {e}");
                }
                if let Err(e) = self.store.put_last_update(now) {
                    tracing::warn!("failed to record update time: {e}");
                }
                let widget = WidgetSnapshot::new(now, balance.clone());
                if let Err(e) = self.store.put_widget_snapshot(&widget) {
                    tracing::warn!("failed to cache widget entry: {e}");
                }
                self.reloader.reload_all_timelines();
                self.dispatch_alerts(&balance, now);
                *self.last_error.lock().unwrap() = None;
                tracing::info!("balance refreshed via {:?}", balance.fetched_via);
                RefreshOutcome::Updated(balance)
            }
            Err(err) => {
                tracing::warn!("balance refresh failed: {err}");
                let detail = err.to_string();
                *self.last_error.lock().unwrap() = Some(detail.clone());
                RefreshOutcome::Failed(detail)
            }
        }
    }

    fn dispatch_alerts(&self, balance: &AccountBalance, now: DateTime<Utc>) {
        let settings = self.store.get_settings();
        let last_alert = self.store.get_last_alert();
        let alerts = self.policy.evaluate(balance, &settings, last_alert, now);
        if alerts.is_empty() {
            return;
        }
        for alert in &alerts {
            self.notifier.send(alert.title(), &alert.body(), alert.category());
        }
        // One shared timestamp covers every alert of this evaluation
        if let Err(e) = self.store.put_last_alert(now) {
            tracing::warn!("failed to record alert time: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Alert;
    use acm_balance::{BalanceError, FetchStrategy, PayAsYouGoBalance};
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn sample_balance(paygo: f64) -> AccountBalance {
        AccountBalance {
            subscription: None,
            pay_as_you_go: Some(PayAsYouGoBalance {
                current_balance: paygo,
                currency: "CNY".to_string(),
                monthly_spent: None,
            }),
            last_updated: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            user_identifier: None,
            fetched_via: FetchStrategy::Lightweight,
        }
    }

    struct FakeSource {
        balance: Option<AccountBalance>,
        delay: Duration,
        fetches: AtomicUsize,
        fail_first: AtomicBool,
    }

    impl FakeSource {
        fn returning(balance: AccountBalance) -> Self {
            Self {
                balance: Some(balance),
                delay: Duration::ZERO,
                fetches: AtomicUsize::new(0),
                fail_first: AtomicBool::new(false),
            }
        }

        fn failing() -> Self {
            Self {
                balance: None,
                delay: Duration::ZERO,
                fetches: AtomicUsize::new(0),
                fail_first: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl BalanceSource for FakeSource {
        async fn fetch(&self) -> Result<AccountBalance, BalanceError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail_first.swap(false, Ordering::SeqCst) {
                return Err(BalanceError::RequestFailed("boom".to_string()));
            }
            match &self.balance {
                Some(balance) => Ok(balance.clone()),
                None => Err(BalanceError::RequestFailed("boom".to_string())),
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn request_permission(&self) -> bool {
            true
        }
        fn send(&self, title: &str, _body: &str, category: &str) {
            self.sent
                .lock()
                .unwrap()
                .push((title.to_string(), category.to_string()));
        }
        fn clear_pending(&self) {}
        fn clear_delivered(&self) {}
    }

    #[derive(Default)]
    struct CountingReloader {
        reloads: AtomicUsize,
    }

    impl TimelineReloader for CountingReloader {
        fn reload_all_timelines(&self) {
            self.reloads.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Harness {
        scheduler: Arc<RefreshScheduler>,
        source: Arc<FakeSource>,
        store: Arc<SharedStore>,
        notifier: Arc<RecordingNotifier>,
        reloader: Arc<CountingReloader>,
    }

    fn harness(source: FakeSource) -> Harness {
        let source = Arc::new(source);
        let store = Arc::new(SharedStore::in_memory().unwrap());
        let notifier = Arc::new(RecordingNotifier::default());
        let reloader = Arc::new(CountingReloader::default());
        let scheduler = Arc::new(RefreshScheduler::new(
            source.clone(),
            store.clone(),
            notifier.clone(),
            reloader.clone(),
        ));
        Harness {
            scheduler,
            source,
            store,
            notifier,
            reloader,
        }
    }

    #[tokio::test]
    async fn successful_refresh_updates_store_and_widget() {
        let h = harness(FakeSource::returning(sample_balance(50.0)));
        let outcome = h.scheduler.refresh().await;

        assert!(matches!(outcome, RefreshOutcome::Updated(_)));
        assert_eq!(h.store.get_balance().unwrap(), sample_balance(50.0));
        assert!(h.store.get_last_update().is_some());
        let widget = h.store.get_widget_snapshot().unwrap();
        assert!(widget.is_logged_in);
        assert_eq!(h.reloader.reloads.load(Ordering::SeqCst), 1);
        assert!(h.scheduler.last_error().is_none());
    }

    #[tokio::test]
    async fn overlapping_trigger_is_noop() {
        let h = harness(FakeSource {
            delay: Duration::from_millis(50),
            ..FakeSource::returning(sample_balance(50.0))
        });

        let first = h.scheduler.clone();
        let second = h.scheduler.clone();
        let (a, b) = tokio::join!(
            tokio::spawn(async move { first.refresh().await }),
            async move {
                // Give the first trigger time to take the flag
                tokio::time::sleep(Duration::from_millis(10)).await;
                second.refresh().await
            }
        );
        let a = a.unwrap();

        let outcomes = [a, b];
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, RefreshOutcome::Skipped))
                .count(),
            1
        );
        assert_eq!(h.source.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn flag_resets_after_completion() {
        let h = harness(FakeSource::returning(sample_balance(50.0)));
        h.scheduler.refresh().await;
        let outcome = h.scheduler.refresh().await;
        assert!(matches!(outcome, RefreshOutcome::Updated(_)));
        assert_eq!(h.source.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_prior_snapshot() {
        let h = harness(FakeSource::failing());
        let good = sample_balance(42.0);
        h.store.put_balance(&good).unwrap();
        let before_update = Utc::now();
        h.store.put_last_update(before_update).unwrap();

        let outcome = h.scheduler.refresh().await;

        assert!(matches!(outcome, RefreshOutcome::Failed(_)));
        // Staleness beats blanking: the cache still holds the good data
        assert_eq!(h.store.get_balance().unwrap(), good);
        assert_eq!(h.store.get_last_update(), Some(before_update));
        assert!(h.scheduler.last_error().unwrap().contains("boom"));
        assert_eq!(h.reloader.reloads.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn error_clears_after_next_success() {
        let h = harness(FakeSource {
            fail_first: AtomicBool::new(true),
            ..FakeSource::returning(sample_balance(50.0))
        });
        h.scheduler.refresh().await;
        assert!(h.scheduler.last_error().is_some());

        h.scheduler.refresh().await;
        assert!(h.scheduler.last_error().is_none());
        assert_eq!(h.store.get_balance().unwrap(), sample_balance(50.0));
    }

    #[tokio::test]
    async fn low_balance_refresh_notifies_once_within_cooldown() {
        let h = harness(FakeSource::returning(sample_balance(0.5)));

        h.scheduler.refresh().await;
        assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
        assert!(h.store.get_last_alert().is_some());

        // Second refresh lands well within the 24h cooldown
        h.scheduler.refresh().await;
        assert_eq!(h.notifier.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn healthy_balance_never_notifies() {
        let h = harness(FakeSource::returning(sample_balance(500.0)));
        h.scheduler.refresh().await;
        assert!(h.notifier.sent.lock().unwrap().is_empty());
        assert!(h.store.get_last_alert().is_none());
    }

    #[tokio::test]
    async fn expired_cooldown_notifies_again() {
        let h = harness(FakeSource::returning(sample_balance(0.5)));
        h.scheduler.refresh().await;
        // Backdate the shared alert timestamp past the cooldown window
        h.store
            .put_last_alert(Utc::now() - chrono::Duration::hours(25))
            .unwrap();
        h.scheduler.refresh().await;
        assert_eq!(h.notifier.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn refresh_if_stale_fetches_when_never_updated() {
        let h = harness(FakeSource::returning(sample_balance(50.0)));
        let outcome = h.scheduler.refresh_if_stale(Utc::now()).await;
        assert!(matches!(outcome, Some(RefreshOutcome::Updated(_))));
    }

    #[tokio::test]
    async fn refresh_if_stale_skips_fresh_cache() {
        let h = harness(FakeSource::returning(sample_balance(50.0)));
        h.store.put_last_update(Utc::now()).unwrap();
        let outcome = h.scheduler.refresh_if_stale(Utc::now()).await;
        assert!(outcome.is_none());
        assert_eq!(h.source.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn refresh_if_stale_fetches_old_cache() {
        let h = harness(FakeSource::returning(sample_balance(50.0)));
        h.store
            .put_last_update(Utc::now() - chrono::Duration::minutes(10))
            .unwrap();
        let outcome = h.scheduler.refresh_if_stale(Utc::now()).await;
        assert!(matches!(outcome, Some(RefreshOutcome::Updated(_))));
    }

    #[test]
    fn alert_accessors_are_consistent() {
        let alert = Alert::LowBalance {
            balance: 1.0,
            threshold: 10.0,
        };
        assert_eq!(alert.category(), "LOW_BALANCE");
        assert!(!alert.title().is_empty());
    }
}
