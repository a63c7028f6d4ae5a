//! Timer-driven scheduler: turns poll deltas into platform notifications
//! and keeps the unread badge honest.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::EngineConfig;
use crate::models::{NotificationKind, NotificationRecord};
use crate::present::{grouped_payload, notification_payload, DeepLink, NotificationPayload};
use crate::store::PreferencesStore;
use crate::sync::SyncDriver;
use crate::util::unix_timestamp_ms;
use crate::Result;

/// Platform notification sink; the platform draws the actual toast.
#[async_trait]
pub trait PlatformNotifier: Send + Sync {
    async fn create(&self, id: &str, payload: &NotificationPayload) -> Result<()>;
    async fn clear(&self, id: &str) -> Result<()>;
}

/// Unread counter surface (e.g. the extension action badge).
#[async_trait]
pub trait BadgeSink: Send + Sync {
    async fn set_count(&self, count: usize) -> Result<()>;
}

/// Resolves a deep-link request to a concrete URL according to the user's
/// chosen third-party front end.
#[async_trait]
pub trait LinkResolver: Send + Sync {
    async fn resolve(&self, link: &DeepLink) -> Result<String>;
}

/// Observable scheduler state; purely informational.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Polling,
}

/// Drives one poll cycle per timer fire.
///
/// Deliberately takes no lock of its own: a reentrant fire interleaves at
/// await points only, and the one real critical section lives inside the
/// cache merge. The `Polling` flag exists for observability, not exclusion.
#[derive(Clone)]
pub struct Scheduler {
    driver: SyncDriver,
    prefs: PreferencesStore,
    notifier: Arc<dyn PlatformNotifier>,
    badge: Arc<dyn BadgeSink>,
    links: Arc<dyn LinkResolver>,
    muted_toast_kinds: Vec<NotificationKind>,
    polling: Arc<AtomicBool>,
}

impl Scheduler {
    #[must_use]
    pub fn new(
        driver: SyncDriver,
        prefs: PreferencesStore,
        notifier: Arc<dyn PlatformNotifier>,
        badge: Arc<dyn BadgeSink>,
        links: Arc<dyn LinkResolver>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            driver,
            prefs,
            notifier,
            badge,
            links,
            muted_toast_kinds: config.muted_toast_kinds.clone(),
            polling: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn state(&self) -> SchedulerState {
        if self.polling.load(Ordering::SeqCst) {
            SchedulerState::Polling
        } else {
            SchedulerState::Idle
        }
    }

    /// Handle one timer fire: poll, synthesize notifications, refresh badge.
    ///
    /// The badge refresh always runs, whatever the poll outcome — badge
    /// accuracy is prioritized over toast delivery. Recoverable failures
    /// (not authenticated, remote down) are logged and swallowed so the next
    /// fire retries; cache failures propagate.
    pub async fn handle_alarm(&self) -> Result<()> {
        self.polling.store(true, Ordering::SeqCst);
        let poll_result = self.poll_and_notify().await;
        let badge_result = self.refresh_badge().await;
        self.polling.store(false, Ordering::SeqCst);

        match poll_result {
            Ok(()) => badge_result,
            Err(error) if error.is_recoverable() => {
                tracing::warn!("Poll cycle skipped: {error}");
                badge_result
            }
            Err(error) => Err(error),
        }
    }

    async fn poll_and_notify(&self) -> Result<()> {
        let outcome = self.driver.poll_for_new(true).await?;
        if outcome.items.is_empty() {
            return Ok(());
        }

        let prefs = self.prefs.load().await?;
        if prefs.grouping_enabled {
            let payload = grouped_payload(&outcome.items);
            let id = format!("grouped:{}", unix_timestamp_ms());
            self.create_notification(&id, &payload).await;
        } else {
            for record in &outcome.items {
                if self.is_muted_toast(record) {
                    tracing::debug!("Skipping muted {} notification", record.kind);
                    continue;
                }
                let payload = notification_payload(record);
                self.create_notification(&record.identity, &payload).await;
            }
        }
        Ok(())
    }

    /// Plain (non-batched) occurrences of muted kinds get no toast; batches
    /// are loud enough to warrant one.
    fn is_muted_toast(&self, record: &NotificationRecord) -> bool {
        self.muted_toast_kinds.contains(&record.kind) && !record.is_grouped()
    }

    async fn create_notification(&self, id: &str, payload: &NotificationPayload) {
        // Toast failures never abort the cycle; the badge still updates
        if let Err(error) = self.notifier.create(id, payload).await {
            tracing::warn!("Failed to create platform notification {id}: {error}");
        }
    }

    /// Recompute and push the unread count since the last-seen watermark.
    pub async fn refresh_badge(&self) -> Result<()> {
        let since = self.driver.cache().last_seen_at().await?.unwrap_or(0);
        let count = self.driver.unread_count_since(since).await?;
        if let Err(error) = self.badge.set_count(count).await {
            tracing::warn!("Failed to update badge counter: {error}");
        }
        Ok(())
    }

    /// The user opened the inbox: move the watermark and zero the badge.
    pub async fn mark_seen(&self) -> Result<()> {
        self.driver.cache().mark_seen_now().await?;
        self.badge.set_count(0).await
    }

    /// Route a notification click to a URL via the link resolver.
    ///
    /// Grouped summary ids resolve to the inbox; per-item ids resolve from
    /// the cached record. Returns `None` for ids no longer in the cache.
    pub async fn resolve_click(&self, notification_id: &str) -> Result<Option<String>> {
        let link = if notification_id.starts_with("grouped:") {
            DeepLink::Inbox
        } else {
            match self.driver.cache().find(notification_id).await? {
                Some(record) => notification_payload(&record).deep_link,
                None => return Ok(None),
            }
        };

        let url = self.links.resolve(&link).await?;
        if let Err(error) = self.notifier.clear(notification_id).await {
            tracing::warn!("Failed to clear platform notification {notification_id}: {error}");
        }
        Ok(Some(url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{CredentialProvider, NotificationApi, NotificationPage};
    use crate::models::{CursorPair, NotificationPreferences, PageCursor};
    use crate::store::{CacheStore, KeyValueStore, MemoryKeyValueStore};
    use crate::Error;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};
    use std::sync::Mutex;

    struct AlwaysAuthenticated;

    #[async_trait]
    impl CredentialProvider for AlwaysAuthenticated {
        async fn is_authenticated(&self) -> bool {
            true
        }

        async fn bearer_token(&self) -> Option<String> {
            Some("token".to_string())
        }
    }

    struct FakeApi {
        pages: Mutex<Vec<Result<NotificationPage>>>,
    }

    #[async_trait]
    impl NotificationApi for FakeApi {
        async fn fetch_page(
            &self,
            _cursor: Option<&PageCursor>,
            _high_signal: bool,
        ) -> Result<NotificationPage> {
            self.pages.lock().unwrap().remove(0)
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        created: Mutex<Vec<(String, NotificationPayload)>>,
        cleared: Mutex<Vec<String>>,
        fail_clear: AtomicBool,
    }

    #[async_trait]
    impl PlatformNotifier for RecordingNotifier {
        async fn create(&self, id: &str, payload: &NotificationPayload) -> Result<()> {
            self.created
                .lock()
                .unwrap()
                .push((id.to_string(), payload.clone()));
            Ok(())
        }

        async fn clear(&self, id: &str) -> Result<()> {
            if self.fail_clear.load(Ordering::SeqCst) {
                return Err(Error::RemoteUnavailable(
                    "platform notifier unavailable".to_string(),
                ));
            }
            self.cleared.lock().unwrap().push(id.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingBadge {
        counts: Mutex<Vec<usize>>,
    }

    #[async_trait]
    impl BadgeSink for RecordingBadge {
        async fn set_count(&self, count: usize) -> Result<()> {
            self.counts.lock().unwrap().push(count);
            Ok(())
        }
    }

    struct FrontEndResolver;

    #[async_trait]
    impl LinkResolver for FrontEndResolver {
        async fn resolve(&self, link: &DeepLink) -> Result<String> {
            Ok(match link {
                DeepLink::Content { id, .. } => format!("https://front.end/posts/{id}"),
                DeepLink::Account { handle } => format!("https://front.end/u/{handle}"),
                DeepLink::Inbox => "https://front.end/notifications".to_string(),
            })
        }
    }

    fn raw_comment(id: &str, timestamp: i64) -> Value {
        json!({
            "type": "comment",
            "id": id,
            "timestamp": timestamp,
            "by": { "address": "0xa", "username": "alice" },
            "post": "post-1"
        })
    }

    fn raw_follow(id: &str, timestamp: i64) -> Value {
        json!({
            "type": "follow",
            "id": id,
            "timestamp": timestamp,
            "followed_by": [ { "account": { "address": "0xf" } } ]
        })
    }

    fn page(items: Vec<Value>, prev: &str) -> NotificationPage {
        NotificationPage {
            items,
            page_info: CursorPair {
                prev: Some(PageCursor::from(prev)),
                next: None,
            },
        }
    }

    struct Harness {
        scheduler: Scheduler,
        notifier: Arc<RecordingNotifier>,
        badge: Arc<RecordingBadge>,
        prefs: PreferencesStore,
    }

    async fn harness(
        pages: Vec<Result<NotificationPage>>,
        prefs_setup: NotificationPreferences,
    ) -> Harness {
        let store = Arc::new(MemoryKeyValueStore::new());
        let cache = CacheStore::new(store.clone());
        let prefs = PreferencesStore::new(store);
        prefs.save(&prefs_setup).await.unwrap();

        let config = EngineConfig::new("https://api.example.com");
        let driver = SyncDriver::new(
            Arc::new(AlwaysAuthenticated),
            Arc::new(FakeApi {
                pages: Mutex::new(pages),
            }),
            cache,
            prefs.clone(),
            &config,
        );
        let notifier = Arc::new(RecordingNotifier::default());
        let badge = Arc::new(RecordingBadge::default());
        // Default config mutes plain follows for per-item toasts
        let scheduler = Scheduler::new(
            driver,
            prefs.clone(),
            notifier.clone(),
            badge.clone(),
            Arc::new(FrontEndResolver),
            &config,
        );
        Harness {
            scheduler,
            notifier,
            badge,
            prefs,
        }
    }

    fn grouping(enabled: bool) -> NotificationPreferences {
        NotificationPreferences {
            grouping_enabled: enabled,
            ..NotificationPreferences::default()
        }
    }

    #[tokio::test]
    async fn grouped_delta_becomes_one_summary_notification() {
        let h = harness(
            vec![
                Ok(page(vec![raw_comment("seed", 1)], "p1")),
                Ok(page(
                    vec![raw_comment("a", 100), raw_comment("b", 101)],
                    "p2",
                )),
            ],
            grouping(true),
        )
        .await;

        h.scheduler.handle_alarm().await.unwrap(); // bootstrap, no delta
        h.scheduler.handle_alarm().await.unwrap();

        let created = h.notifier.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert!(created[0].0.starts_with("grouped:"));
        assert_eq!(created[0].1.title, "2 new notifications");
    }

    #[tokio::test]
    async fn per_item_mode_skips_plain_follows() {
        let h = harness(
            vec![
                Ok(page(vec![raw_comment("seed", 1)], "p1")),
                Ok(page(
                    vec![raw_comment("c", 100), raw_follow("f", 101)],
                    "p2",
                )),
            ],
            grouping(false),
        )
        .await;

        h.scheduler.handle_alarm().await.unwrap();
        h.scheduler.handle_alarm().await.unwrap();

        let created = h.notifier.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].0, "c:100");
        assert_eq!(created[0].1.title, "@alice commented on your post");
    }

    #[tokio::test]
    async fn badge_refreshes_even_when_remote_is_down() {
        let h = harness(
            vec![Err(Error::RemoteUnavailable("boom".to_string()))],
            grouping(true),
        )
        .await;

        // Recoverable failure is swallowed; badge still attempted
        h.scheduler.handle_alarm().await.unwrap();
        assert_eq!(h.badge.counts.lock().unwrap().as_slice(), &[0]);
    }

    #[tokio::test]
    async fn badge_counts_unread_since_last_seen() {
        let h = harness(
            vec![
                Ok(page(vec![raw_comment("seed", 1)], "p1")),
                Ok(page(vec![raw_comment("a", 100)], "p2")),
            ],
            grouping(true),
        )
        .await;

        h.scheduler.handle_alarm().await.unwrap();
        h.scheduler.handle_alarm().await.unwrap();

        // Never marked seen: both cached comments are unread
        assert_eq!(h.badge.counts.lock().unwrap().last(), Some(&2));

        h.scheduler.mark_seen().await.unwrap();
        assert_eq!(h.badge.counts.lock().unwrap().last(), Some(&0));
    }

    #[tokio::test]
    async fn disabled_kind_never_reaches_the_notifier() {
        let mut prefs = grouping(false);
        prefs.set_enabled(NotificationKind::Comment, false);
        let h = harness(
            vec![
                Ok(page(vec![raw_comment("seed", 1)], "p1")),
                Ok(page(vec![raw_comment("a", 100)], "p2")),
            ],
            prefs,
        )
        .await;

        h.scheduler.handle_alarm().await.unwrap();
        h.scheduler.handle_alarm().await.unwrap();

        assert!(h.notifier.created.lock().unwrap().is_empty());
        // Suppressed, but retroactively countable once re-enabled
        let mut prefs = h.prefs.load().await.unwrap();
        prefs.set_enabled(NotificationKind::Comment, true);
        h.prefs.save(&prefs).await.unwrap();
        h.scheduler.refresh_badge().await.unwrap();
        assert_eq!(h.badge.counts.lock().unwrap().last(), Some(&2));
    }

    #[tokio::test]
    async fn click_resolves_to_front_end_url_and_clears_the_toast() {
        let h = harness(
            vec![
                Ok(page(vec![raw_comment("seed", 1)], "p1")),
                Ok(page(vec![raw_comment("a", 100)], "p2")),
            ],
            grouping(false),
        )
        .await;

        h.scheduler.handle_alarm().await.unwrap();
        h.scheduler.handle_alarm().await.unwrap();

        let url = h.scheduler.resolve_click("a:100").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://front.end/posts/post-1"));
        assert_eq!(h.notifier.cleared.lock().unwrap().as_slice(), &["a:100"]);

        let grouped = h.scheduler.resolve_click("grouped:123").await.unwrap();
        assert_eq!(grouped.as_deref(), Some("https://front.end/notifications"));

        let gone = h.scheduler.resolve_click("missing:1").await.unwrap();
        assert_eq!(gone, None);
    }

    #[tokio::test]
    async fn click_still_resolves_when_clear_fails() {
        let h = harness(
            vec![
                Ok(page(vec![raw_comment("seed", 1)], "p1")),
                Ok(page(vec![raw_comment("a", 100)], "p2")),
            ],
            grouping(false),
        )
        .await;

        h.scheduler.handle_alarm().await.unwrap();
        h.scheduler.handle_alarm().await.unwrap();

        h.notifier.fail_clear.store(true, Ordering::SeqCst);
        let url = h.scheduler.resolve_click("a:100").await.unwrap();
        assert_eq!(url.as_deref(), Some("https://front.end/posts/post-1"));
        assert!(h.notifier.cleared.lock().unwrap().is_empty());
    }

    /// Every operation fails the way a detached host store would.
    struct FailingKeyValueStore;

    #[async_trait]
    impl KeyValueStore for FailingKeyValueStore {
        async fn get(&self, _key: &str) -> Result<Option<Value>> {
            Err(Error::CacheUnavailable("storage detached".to_string()))
        }

        async fn set(&self, _key: &str, _value: Value) -> Result<()> {
            Err(Error::CacheUnavailable("storage detached".to_string()))
        }

        async fn remove(&self, _key: &str) -> Result<()> {
            Err(Error::CacheUnavailable("storage detached".to_string()))
        }
    }

    #[tokio::test]
    async fn cache_failure_propagates_out_of_handle_alarm() {
        let store: Arc<dyn KeyValueStore> = Arc::new(FailingKeyValueStore);
        let cache = CacheStore::new(store.clone());
        let prefs = PreferencesStore::new(store);
        let config = EngineConfig::new("https://api.example.com");
        let driver = SyncDriver::new(
            Arc::new(AlwaysAuthenticated),
            Arc::new(FakeApi {
                pages: Mutex::new(Vec::new()),
            }),
            cache,
            prefs.clone(),
            &config,
        );
        let scheduler = Scheduler::new(
            driver,
            prefs,
            Arc::new(RecordingNotifier::default()),
            Arc::new(RecordingBadge::default()),
            Arc::new(FrontEndResolver),
            &config,
        );

        // Not recoverable: the caller must see it, not a silent skip
        let error = scheduler.handle_alarm().await.unwrap_err();
        assert!(matches!(error, Error::CacheUnavailable(_)));
    }

    #[tokio::test]
    async fn scheduler_reports_idle_between_fires() {
        let h = harness(
            vec![Ok(page(vec![raw_comment("seed", 1)], "p1"))],
            grouping(true),
        )
        .await;

        assert_eq!(h.scheduler.state(), SchedulerState::Idle);
        h.scheduler.handle_alarm().await.unwrap();
        assert_eq!(h.scheduler.state(), SchedulerState::Idle);
    }
}
