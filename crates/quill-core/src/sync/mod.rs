//! Sync driver: orchestrates cursor reads, remote fetches, and cache merges.

use std::sync::Arc;

use crate::api::{CredentialProvider, NotificationApi};
use crate::classify::classify;
use crate::config::EngineConfig;
use crate::models::{MergeDirection, NotificationRecord, PageCursor};
use crate::store::{CacheStore, PreferencesStore};
use crate::{Error, Result};

/// Result of a poll or backfill cycle: the genuinely new records and the
/// cursor the cache advanced to in the fetched direction.
#[derive(Debug, Clone, Default)]
pub struct PollOutcome {
    pub items: Vec<NotificationRecord>,
    pub cursor: Option<PageCursor>,
}

/// Drives one sync cycle at a time against the remote feed.
///
/// A cycle either completes, advancing exactly one cursor half, or fails
/// outright leaving cursors unchanged. There is no internal retry; the next
/// scheduled fire retries naturally.
#[derive(Clone)]
pub struct SyncDriver {
    credentials: Arc<dyn CredentialProvider>,
    api: Arc<dyn NotificationApi>,
    cache: CacheStore,
    prefs: PreferencesStore,
    high_signal_filter: bool,
}

impl SyncDriver {
    #[must_use]
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        api: Arc<dyn NotificationApi>,
        cache: CacheStore,
        prefs: PreferencesStore,
        config: &EngineConfig,
    ) -> Self {
        Self {
            credentials,
            api,
            cache,
            prefs,
            high_signal_filter: config.high_signal_filter,
        }
    }

    /// Poll the newer direction of the feed and return the merge delta.
    ///
    /// Fails safe: cursors are read before anything else so a broken cache
    /// aborts the cycle without a remote call, and the auth check runs
    /// before the fetch. When `apply_filter` is set, records whose kind the
    /// user disabled are dropped from the returned delta — strictly after
    /// the merge, so the cache stays complete regardless of preferences.
    /// The first poll against an empty cache bootstraps cursors and records
    /// but returns an empty delta; there is no baseline to diff against.
    pub async fn poll_for_new(&self, apply_filter: bool) -> Result<PollOutcome> {
        let cursors = self.cache.cursors().await?;
        let bootstrap = self.cache.is_empty().await?;

        if !self.credentials.is_authenticated().await {
            return Err(Error::NotAuthenticated);
        }

        let page = self
            .api
            .fetch_page(cursors.prev.as_ref(), self.high_signal_filter)
            .await?;
        let classified: Vec<NotificationRecord> = page.items.iter().map(classify).collect();
        tracing::debug!(
            "Poll fetched {} item(s) ({} classified unknown)",
            classified.len(),
            classified
                .iter()
                .filter(|record| !record.kind.is_presentable())
                .count(),
        );

        let cursor = page.page_info.prev.clone();
        let mut delta = self
            .cache
            .merge(classified, page.page_info, MergeDirection::Prev)
            .await?;

        if bootstrap {
            tracing::info!("First poll bootstrapped {} cached record(s)", delta.len());
            return Ok(PollOutcome {
                items: Vec::new(),
                cursor,
            });
        }

        if apply_filter {
            let prefs = self.prefs.load().await?;
            delta.retain(|record| prefs.is_enabled(record.kind));
        }

        Ok(PollOutcome {
            items: delta,
            cursor,
        })
    }

    /// Fetch one older page of history and return the merge delta.
    ///
    /// Scroll-driven; never called by the scheduler and never filtered.
    pub async fn backfill(&self) -> Result<PollOutcome> {
        let cursors = self.cache.cursors().await?;

        if !self.credentials.is_authenticated().await {
            return Err(Error::NotAuthenticated);
        }

        let page = self
            .api
            .fetch_page(cursors.next.as_ref(), self.high_signal_filter)
            .await?;
        let classified: Vec<NotificationRecord> = page.items.iter().map(classify).collect();

        let cursor = page.page_info.next.clone();
        let delta = self
            .cache
            .merge(classified, page.page_info, MergeDirection::Next)
            .await?;

        Ok(PollOutcome {
            items: delta,
            cursor,
        })
    }

    /// Count cached records newer than `since` under current preferences.
    pub async fn unread_count_since(&self, since: i64) -> Result<usize> {
        let prefs = self.prefs.load().await?;
        self.cache.unread_count_since(since, &prefs).await
    }

    /// Clear all cached state; called on logout or account switch.
    pub async fn reset(&self) -> Result<()> {
        self.cache.reset().await
    }

    /// The cache this driver merges into.
    #[must_use]
    pub const fn cache(&self) -> &CacheStore {
        &self.cache
    }
}
