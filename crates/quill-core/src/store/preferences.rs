//! Persisted user notification preferences.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::{NotificationKind, NotificationPreferences};
use crate::Result;

use super::KeyValueStore;

const KEY_ENABLED_KINDS: &str = "prefs.enabled_kinds";
const KEY_GROUPING: &str = "prefs.grouping_enabled";

/// Loads and saves `NotificationPreferences` through the host's store.
#[derive(Clone)]
pub struct PreferencesStore {
    store: Arc<dyn KeyValueStore>,
}

impl PreferencesStore {
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Load preferences, defaulting anything unset.
    pub async fn load(&self) -> Result<NotificationPreferences> {
        let enabled_kinds: HashMap<NotificationKind, bool> =
            match self.store.get(KEY_ENABLED_KINDS).await? {
                Some(value) => serde_json::from_value(value)?,
                None => HashMap::new(),
            };
        let grouping_enabled = match self.store.get(KEY_GROUPING).await? {
            Some(value) => serde_json::from_value(value)?,
            None => NotificationPreferences::default().grouping_enabled,
        };

        Ok(NotificationPreferences {
            enabled_kinds,
            grouping_enabled,
        })
    }

    pub async fn save(&self, prefs: &NotificationPreferences) -> Result<()> {
        self.store
            .set(KEY_ENABLED_KINDS, serde_json::to_value(&prefs.enabled_kinds)?)
            .await?;
        self.store
            .set(KEY_GROUPING, serde_json::to_value(prefs.grouping_enabled)?)
            .await
    }
}
