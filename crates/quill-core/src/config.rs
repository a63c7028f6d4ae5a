//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::models::NotificationKind;
use crate::util::{is_http_url, normalize_text_option};
use crate::{Error, Result};

/// Browser alarm APIs round anything shorter up; polling faster is wasted.
const MIN_POLL_INTERVAL_SECS: u64 = 30;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Host-provided engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Notification feed endpoint of the social-graph API
    pub api_endpoint: String,
    /// Seconds between scheduled polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Ask the remote to restrict the feed to high-signal kinds
    #[serde(default)]
    pub high_signal_filter: bool,
    /// Kinds that get no per-item toast when they arrive un-batched
    #[serde(default = "default_muted_toast_kinds")]
    pub muted_toast_kinds: Vec<NotificationKind>,
}

const fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}

fn default_muted_toast_kinds() -> Vec<NotificationKind> {
    vec![NotificationKind::Follow]
}

impl EngineConfig {
    #[must_use]
    pub fn new(api_endpoint: impl Into<String>) -> Self {
        Self {
            api_endpoint: api_endpoint.into(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            high_signal_filter: false,
            muted_toast_kinds: default_muted_toast_kinds(),
        }
    }

    /// Validate endpoint and tunables before wiring the engine up.
    pub fn validate(&self) -> Result<()> {
        let endpoint = normalize_text_option(Some(self.api_endpoint.clone())).ok_or_else(|| {
            Error::InvalidConfiguration("api_endpoint must not be empty".to_string())
        })?;
        if !is_http_url(&endpoint) {
            return Err(Error::InvalidConfiguration(
                "api_endpoint must include http:// or https://".to_string(),
            ));
        }
        if self.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
            return Err(Error::InvalidConfiguration(format!(
                "poll_interval_secs must be at least {MIN_POLL_INTERVAL_SECS}"
            )));
        }
        Ok(())
    }

    /// Poll interval for the host's alarm registration.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}
