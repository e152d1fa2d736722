//! GitLab HTTP client.
//!
//! Users are enumerated with keyset pagination: the continuation lives in
//! the `Link` response header (`rel="next"`), from which the `id_after`
//! query parameter becomes the opaque cursor.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use async_trait::async_trait;
use elba_connector::cursor::{next_from_link_header, Cursor};
use elba_connector::error::{ConnectorError, ConnectorResult};
use elba_connector::rate_limit::classify_response;
use elba_connector::traits::{Connector, UserSource};
use elba_connector::user::UserPage;

use crate::schema::{map_user, parse_users};

const VENDOR: &str = "gitlab";

/// OAuth application settings for the install flow.
#[derive(Debug, Clone)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Connector configuration, shared by every organisation on a deployment.
#[derive(Debug, Clone)]
pub struct GitLabConfig {
    /// Instance base URL; self-managed instances override the default.
    pub base_url: String,
    pub page_size: u32,
    pub timeout_secs: u64,
    pub oauth: Option<OAuthApp>,
}

impl Default for GitLabConfig {
    fn default() -> Self {
        Self {
            base_url: "https://gitlab.com".to_string(),
            page_size: 100,
            timeout_secs: 30,
            oauth: None,
        }
    }
}

/// OAuth token pair stored (encrypted) per organisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitLabCredentials {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

/// Credential-scoped GitLab client for one organisation.
pub struct GitLabClient {
    config: GitLabConfig,
    credentials: GitLabCredentials,
    /// Vendor id of the user who installed the integration.
    auth_user_id: Option<String>,
    http_client: Client,
}

impl GitLabClient {
    pub fn new(
        config: GitLabConfig,
        credentials: GitLabCredentials,
        auth_user_id: Option<String>,
    ) -> ConnectorResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ConnectorError::invalid_configuration(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            config,
            credentials,
            auth_user_id,
            http_client,
        })
    }

    fn users_url(&self, cursor: Option<&Cursor>) -> String {
        let mut url = format!(
            "{}/api/v4/users?pagination=keyset&order_by=id&sort=asc&per_page={}",
            self.config.base_url, self.config.page_size
        );
        if let Some(cursor) = cursor {
            url.push_str("&id_after=");
            url.push_str(&urlencoding::encode(cursor.as_str()));
        }
        url
    }
}

async fn error_from_response(response: reqwest::Response) -> ConnectorError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    classify_response(VENDOR, status, &headers, body, Utc::now())
}

#[async_trait]
impl Connector for GitLabClient {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        let url = format!("{}/api/v4/user", self.config.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("gitlab request failed", e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

#[async_trait]
impl UserSource for GitLabClient {
    #[instrument(skip(self))]
    async fn list_users_page(&self, cursor: Option<&Cursor>) -> ConnectorResult<UserPage> {
        let url = self.users_url(cursor);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("gitlab request failed", e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let link_header = response
            .headers()
            .get(reqwest::header::LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ConnectorError::malformed(format!("gitlab users response: {e}")))?;
        let records = body
            .as_array()
            .ok_or_else(|| ConnectorError::malformed("gitlab users response is not an array"))?;

        let (users, invalid_records) = parse_users(records);
        debug!(valid = users.len(), invalid = invalid_records.len(), "fetched users page");

        let valid_users = users
            .iter()
            .filter(|user| !user.is_bot())
            .map(|user| map_user(user, self.auth_user_id.as_deref()))
            .collect();

        Ok(UserPage {
            valid_users,
            invalid_records,
            next_cursor: next_from_link_header(link_header.as_deref(), "id_after"),
        })
    }

    async fn delete_user(&self, user_id: &str) -> ConnectorResult<()> {
        let url = format!("{}/api/v4/users/{user_id}", self.config.base_url);
        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("gitlab request failed", e))?;

        // Already gone counts as deleted.
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Exchange an OAuth authorization code for a token pair.
pub async fn authenticate(config: &GitLabConfig, code: &str) -> ConnectorResult<GitLabCredentials> {
    oauth_token_request(
        config,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
        ],
    )
    .await
}

/// Trade a refresh token for a fresh token pair.
pub async fn refresh_credentials(
    config: &GitLabConfig,
    refresh_token: &str,
) -> ConnectorResult<GitLabCredentials> {
    oauth_token_request(
        config,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ],
    )
    .await
}

async fn oauth_token_request(
    config: &GitLabConfig,
    grant: &[(&str, &str)],
) -> ConnectorResult<GitLabCredentials> {
    let oauth = config.oauth.as_ref().ok_or_else(|| {
        ConnectorError::invalid_configuration("gitlab OAuth application is not configured")
    })?;

    let mut form: Vec<(&str, &str)> = vec![
        ("client_id", &oauth.client_id),
        ("client_secret", &oauth.client_secret),
        ("redirect_uri", &oauth.redirect_uri),
    ];
    form.extend_from_slice(grant);

    let response = reqwest::Client::new()
        .post(format!("{}/oauth/token", config.base_url))
        .form(&form)
        .send()
        .await
        .map_err(|e| ConnectorError::transient_with_source("gitlab token request failed", e))?;

    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| ConnectorError::malformed(format!("gitlab token response: {e}")))?;
    Ok(GitLabCredentials {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(cfg: GitLabConfig) -> GitLabClient {
        GitLabClient::new(
            cfg,
            GitLabCredentials {
                access_token: "at".into(),
                refresh_token: "rt".into(),
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn first_page_url_has_no_cursor() {
        let client = client(GitLabConfig::default());
        assert_eq!(
            client.users_url(None),
            "https://gitlab.com/api/v4/users?pagination=keyset&order_by=id&sort=asc&per_page=100"
        );
    }

    #[test]
    fn continuation_url_carries_id_after() {
        let client = client(GitLabConfig {
            page_size: 2,
            ..GitLabConfig::default()
        });
        assert_eq!(
            client.users_url(Some(&Cursor::new("42"))),
            "https://gitlab.com/api/v4/users?pagination=keyset&order_by=id&sort=asc&per_page=2&id_after=42"
        );
    }
}
