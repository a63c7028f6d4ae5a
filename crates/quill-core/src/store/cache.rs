//! Persisted notification cache: records, pagination cursors, last-seen.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::{
    CursorPair, MergeDirection, NotificationPreferences, NotificationRecord, PageCursor,
};
use crate::util::unix_timestamp_ms;
use crate::Result;

use super::KeyValueStore;

const KEY_RECORDS: &str = "cache.records";
const KEY_CURSOR_PREV: &str = "cache.cursor_prev";
const KEY_CURSOR_NEXT: &str = "cache.cursor_next";
const KEY_LAST_SEEN: &str = "cache.last_seen_at";

/// Thread-safe store owning the merge/de-dup invariants of the cache.
///
/// The host runs callbacks cooperatively, so a second timer fire can begin
/// before the first one's merge has persisted. The whole read-modify-write
/// of a merge is therefore one critical section under an in-process mutex;
/// there is exactly one cache instance, so a single lock suffices.
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KeyValueStore>,
    merge_lock: Arc<Mutex<()>>,
}

impl CacheStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            merge_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Read the persisted cursor pair; empty on first run.
    pub async fn cursors(&self) -> Result<CursorPair> {
        Ok(CursorPair {
            prev: self.read_cursor(KEY_CURSOR_PREV).await?,
            next: self.read_cursor(KEY_CURSOR_NEXT).await?,
        })
    }

    /// All cached records, polled pages first (prepend order).
    pub async fn records(&self) -> Result<Vec<NotificationRecord>> {
        let Some(value) = self.store.get(KEY_RECORDS).await? else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_value(value)?)
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.records().await?.is_empty())
    }

    /// Merge fetched items into the cache and advance one cursor half.
    ///
    /// Set-union by identity: items already present are dropped, the rest
    /// are prepended (`Prev`) or appended (`Next`). Only the cursor half
    /// matching `direction` is updated, except on bootstrap (empty cache)
    /// where the fetched pair is accepted wholesale. Returns the delta —
    /// exactly the records that were actually inserted.
    pub async fn merge(
        &self,
        items: Vec<NotificationRecord>,
        fetched: CursorPair,
        direction: MergeDirection,
    ) -> Result<Vec<NotificationRecord>> {
        let _guard = self.merge_lock.lock().await;

        let existing = self.records().await?;
        let bootstrap = existing.is_empty();

        let mut known: HashSet<String> = existing
            .iter()
            .map(|record| record.identity.clone())
            .collect();
        let mut delta: Vec<NotificationRecord> = Vec::new();
        for record in items {
            // `insert` also guards against duplicates within the same page
            if known.insert(record.identity.clone()) {
                delta.push(record);
            }
        }

        if !delta.is_empty() {
            let merged: Vec<&NotificationRecord> = match direction {
                MergeDirection::Prev => delta.iter().chain(existing.iter()).collect(),
                MergeDirection::Next => existing.iter().chain(delta.iter()).collect(),
            };
            self.store
                .set(KEY_RECORDS, serde_json::to_value(&merged)?)
                .await?;
        }

        if bootstrap {
            self.write_cursor(KEY_CURSOR_PREV, fetched.prev.as_ref())
                .await?;
            self.write_cursor(KEY_CURSOR_NEXT, fetched.next.as_ref())
                .await?;
        } else {
            match direction {
                MergeDirection::Prev => {
                    self.write_cursor(KEY_CURSOR_PREV, fetched.prev.as_ref())
                        .await?;
                }
                MergeDirection::Next => {
                    self.write_cursor(KEY_CURSOR_NEXT, fetched.next.as_ref())
                        .await?;
                }
            }
        }

        tracing::debug!(
            "Merged {} new notification(s) ({direction} direction, bootstrap: {bootstrap})",
            delta.len(),
        );
        Ok(delta)
    }

    /// Clear records, both cursors, and the last-seen watermark.
    ///
    /// Called on logout or account switch.
    pub async fn reset(&self) -> Result<()> {
        let _guard = self.merge_lock.lock().await;
        self.store.remove(KEY_RECORDS).await?;
        self.store.remove(KEY_CURSOR_PREV).await?;
        self.store.remove(KEY_CURSOR_NEXT).await?;
        self.store.remove(KEY_LAST_SEEN).await?;
        tracing::info!("Notification cache reset");
        Ok(())
    }

    /// Count records newer than `since` whose kind the user has enabled.
    ///
    /// Consults the current preferences at call time, so re-enabling a kind
    /// retroactively surfaces records that were cached while it was off.
    pub async fn unread_count_since(
        &self,
        since: i64,
        prefs: &NotificationPreferences,
    ) -> Result<usize> {
        let records = self.records().await?;
        Ok(records
            .iter()
            .filter(|record| record.occurred_at > since && prefs.is_enabled(record.kind))
            .count())
    }

    /// Find a cached record by identity.
    pub async fn find(&self, identity: &str) -> Result<Option<NotificationRecord>> {
        let records = self.records().await?;
        Ok(records
            .into_iter()
            .find(|record| record.identity == identity))
    }

    /// The persisted "last seen" watermark, if the user ever opened the inbox.
    pub async fn last_seen_at(&self) -> Result<Option<i64>> {
        let Some(value) = self.store.get(KEY_LAST_SEEN).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_value(value)?)
    }

    /// Move the "last seen" watermark to now.
    pub async fn mark_seen_now(&self) -> Result<()> {
        self.store
            .set(KEY_LAST_SEEN, serde_json::to_value(unix_timestamp_ms())?)
            .await
    }

    async fn read_cursor(&self, key: &str) -> Result<Option<PageCursor>> {
        let Some(value) = self.store.get(key).await? else {
            return Ok(None);
        };
        Ok(serde_json::from_value(value)?)
    }

    async fn write_cursor(&self, key: &str, cursor: Option<&PageCursor>) -> Result<()> {
        self.store.set(key, serde_json::to_value(cursor)?).await
    }
}
