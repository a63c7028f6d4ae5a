//! User notification preferences

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::NotificationKind;

/// Per-kind delivery preferences, consulted only at presentation time.
///
/// The cache always stores everything observed regardless of these values,
/// so a later preference change retroactively surfaces suppressed items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Kinds missing from the map are enabled
    #[serde(default)]
    pub enabled_kinds: HashMap<NotificationKind, bool>,
    /// One grouped summary per poll instead of per-item notifications
    #[serde(default = "default_grouping")]
    pub grouping_enabled: bool,
}

const fn default_grouping() -> bool {
    true
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            enabled_kinds: HashMap::new(),
            grouping_enabled: default_grouping(),
        }
    }
}

impl NotificationPreferences {
    /// Whether records of `kind` should be delivered to the user.
    ///
    /// Defaults to enabled for every kind the user can see; `Unknown` is
    /// never deliverable.
    #[must_use]
    pub fn is_enabled(&self, kind: NotificationKind) -> bool {
        if !kind.is_presentable() {
            return false;
        }
        self.enabled_kinds.get(&kind).copied().unwrap_or(true)
    }

    pub fn set_enabled(&mut self, kind: NotificationKind, enabled: bool) {
        self.enabled_kinds.insert(kind, enabled);
    }
}
