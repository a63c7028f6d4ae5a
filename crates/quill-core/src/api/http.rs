//! HTTP implementation of the notification feed fetch.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::models::{CursorPair, PageCursor};
use crate::util::{compact_text, is_http_url, normalize_text_option};
use crate::{Error, Result};

use super::{CredentialProvider, NotificationApi, NotificationPage};

/// Reqwest-backed `NotificationApi` talking to the social-graph API.
#[derive(Clone)]
pub struct HttpNotificationApi {
    endpoint: String,
    client: reqwest::Client,
    credentials: Arc<dyn CredentialProvider>,
}

impl std::fmt::Debug for HttpNotificationApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNotificationApi")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl HttpNotificationApi {
    pub fn new(config: &EngineConfig, credentials: Arc<dyn CredentialProvider>) -> Result<Self> {
        config.validate()?;
        let endpoint = normalize_endpoint(config.api_endpoint.clone())?;
        Ok(Self {
            endpoint,
            client: reqwest::Client::builder()
                .build()
                .map_err(|error| Error::RemoteUnavailable(error.to_string()))?,
            credentials,
        })
    }
}

#[async_trait]
impl NotificationApi for HttpNotificationApi {
    async fn fetch_page(
        &self,
        cursor: Option<&PageCursor>,
        high_signal: bool,
    ) -> Result<NotificationPage> {
        let token = self
            .credentials
            .bearer_token()
            .await
            .ok_or(Error::NotAuthenticated)?;

        let request = FetchRequest {
            cursor: cursor.map(PageCursor::as_str),
            high_signal_filter: high_signal,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|error| Error::RemoteUnavailable(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::RemoteUnavailable(parse_api_error(status, &body)));
        }

        let payload = response
            .json::<FetchResponse>()
            .await
            .map_err(|error| Error::RemoteUnavailable(error.to_string()))?;

        Ok(NotificationPage {
            items: payload.items,
            page_info: CursorPair {
                prev: payload.page_info.prev.map(PageCursor::new),
                next: payload.page_info.next.map(PageCursor::new),
            },
        })
    }
}

#[derive(Debug, Serialize)]
struct FetchRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    cursor: Option<&'a str>,
    high_signal_filter: bool,
}

#[derive(Debug, Deserialize)]
struct FetchResponse {
    #[serde(default)]
    items: Vec<Value>,
    #[serde(default)]
    page_info: RawPageInfo,
}

#[derive(Debug, Default, Deserialize)]
struct RawPageInfo {
    #[serde(default)]
    prev: Option<String>,
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = compact_text(body);
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", trimmed, status.as_u16())
    }
}

fn normalize_endpoint(raw: String) -> Result<String> {
    let endpoint = normalize_text_option(Some(raw)).ok_or_else(|| {
        Error::InvalidConfiguration("API endpoint must not be empty".to_string())
    })?;
    if is_http_url(&endpoint) {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidConfiguration(
            "API endpoint must include http:// or https://".to_string(),
        ))
    }
}
