//! elba REST client.
//!
//! Thin reqwest wrapper over the three platform operations the connectors
//! need: bulk user upsert, watermark-based stale-user deletion, and the
//! connection-status flag org admins see when a credential dies.

use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use async_trait::async_trait;
use elba_connector::error::{ConnectorError, ConnectorResult};
use elba_connector::rate_limit::classify_response;
use elba_connector::traits::GovernancePlatform;
use elba_connector::user::ConnectorUser;

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client for the elba platform API, scoped to one integration's
/// API key.
#[derive(Debug, Clone)]
pub struct ElbaClient {
    base_url: String,
    api_key: String,
    http_client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateUsersBody<'a> {
    organisation_id: Uuid,
    users: &'a [ConnectorUser],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteUsersBody {
    organisation_id: Uuid,
    synced_before: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectionStatusBody {
    organisation_id: Uuid,
    has_error: bool,
}

impl ElbaClient {
    /// Create a new client.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> ConnectorResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent("elba-connectors/0.4")
            .build()
            .map_err(|e| {
                ConnectorError::invalid_configuration(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self::with_http_client(base_url, api_key, http_client))
    }

    /// Create a client with a pre-built `reqwest::Client` (for testing).
    #[must_use]
    pub fn with_http_client(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        http_client: Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http_client,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send<B: Serialize>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> ConnectorResult<()> {
        let url = format!("{}{path}", self.base_url);
        let response = self
            .http_client
            .request(method, &url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("elba request failed", e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();
        Err(classify_response("elba", status, &headers, body, Utc::now()))
    }
}

#[async_trait]
impl GovernancePlatform for ElbaClient {
    #[instrument(skip(self, users), fields(count = users.len()))]
    async fn update_users(
        &self,
        organisation_id: Uuid,
        users: &[ConnectorUser],
    ) -> ConnectorResult<()> {
        debug!("pushing user batch");
        self.send(
            reqwest::Method::POST,
            "/api/rest/users",
            &UpdateUsersBody {
                organisation_id,
                users,
            },
        )
        .await
    }

    #[instrument(skip(self))]
    async fn delete_users_synced_before(
        &self,
        organisation_id: Uuid,
        synced_before: DateTime<Utc>,
    ) -> ConnectorResult<()> {
        self.send(
            reqwest::Method::DELETE,
            "/api/rest/users",
            &DeleteUsersBody {
                organisation_id,
                synced_before: synced_before.to_rfc3339_opts(SecondsFormat::Millis, true),
            },
        )
        .await
    }

    #[instrument(skip(self))]
    async fn update_connection_status(
        &self,
        organisation_id: Uuid,
        has_error: bool,
    ) -> ConnectorResult<()> {
        self.send(
            reqwest::Method::POST,
            "/api/rest/connection-status",
            &ConnectionStatusBody {
                organisation_id,
                has_error,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_normalized() {
        let client =
            ElbaClient::with_http_client("https://api.elba.io/", "key", Client::new());
        assert_eq!(client.base_url(), "https://api.elba.io");
    }

    #[test]
    fn delete_body_uses_iso_8601_watermark() {
        use chrono::TimeZone;
        let body = DeleteUsersBody {
            organisation_id: Uuid::nil(),
            synced_before: Utc
                .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
                .unwrap()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["syncedBefore"], "2024-06-01T12:00:00.000Z");
    }
}
