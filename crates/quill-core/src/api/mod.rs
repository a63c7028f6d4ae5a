//! Remote collaborator contracts: credentials and the paginated feed fetch.

mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{CursorPair, PageCursor};
use crate::Result;

pub use http::HttpNotificationApi;

/// One fetched page of raw notification payloads plus its cursor pair.
#[derive(Debug, Clone, Default)]
pub struct NotificationPage {
    pub items: Vec<Value>,
    pub page_info: CursorPair,
}

/// Supplies the bearer credential produced by the wallet/auth flow.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Whether a usable credential is currently available.
    async fn is_authenticated(&self) -> bool;

    /// The bearer token for authenticated API calls, if any.
    async fn bearer_token(&self) -> Option<String>;
}

/// Paginated notification feed fetch.
///
/// Transport errors surface unchanged as `Error::RemoteUnavailable`; retry
/// and timeout policy belong to the implementation, not the engine.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn fetch_page(
        &self,
        cursor: Option<&PageCursor>,
        high_signal: bool,
    ) -> Result<NotificationPage>;
}
