//! HubSpot HTTP client.
//!
//! Pagination uses an opaque continuation token: the response's
//! `paging.next.after` field is carried verbatim into the next request's
//! `after` query parameter; its absence terminates the traversal.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use async_trait::async_trait;
use elba_connector::cursor::{next_from_token, Cursor};
use elba_connector::error::{ConnectorError, ConnectorResult};
use elba_connector::rate_limit::classify_response;
use elba_connector::traits::{Connector, UserSource};
use elba_connector::user::UserPage;

use crate::schema::{map_user, parse_users, UserListResponse};

const VENDOR: &str = "hubspot";

/// OAuth application settings for the install flow.
#[derive(Debug, Clone)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct HubSpotConfig {
    pub base_url: String,
    pub page_size: u32,
    pub timeout_secs: u64,
    pub oauth: Option<OAuthApp>,
}

impl Default for HubSpotConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.hubapi.com".to_string(),
            page_size: 100,
            timeout_secs: 30,
            oauth: None,
        }
    }
}

/// OAuth token pair stored (encrypted) per organisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubSpotCredentials {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

/// Subset of `GET /oauth/v1/access-tokens/{token}` used at install time to
/// resolve the portal id routing attribute.
#[derive(Debug, Deserialize)]
pub struct TokenInfo {
    pub hub_id: u64,
}

/// Credential-scoped HubSpot client for one organisation.
pub struct HubSpotClient {
    config: HubSpotConfig,
    credentials: HubSpotCredentials,
    /// Account (portal) id, for profile URLs.
    portal_id: Option<String>,
    http_client: Client,
}

impl HubSpotClient {
    pub fn new(
        config: HubSpotConfig,
        credentials: HubSpotCredentials,
        portal_id: Option<String>,
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
            portal_id,
            http_client,
        })
    }

    fn users_url(&self, cursor: Option<&Cursor>) -> String {
        let mut url = format!(
            "{}/settings/v3/users?limit={}",
            self.config.base_url, self.config.page_size
        );
        if let Some(cursor) = cursor {
            url.push_str("&after=");
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
impl Connector for HubSpotClient {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        let url = format!("{}/settings/v3/users?limit=1", self.config.base_url);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("hubspot request failed", e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

#[async_trait]
impl UserSource for HubSpotClient {
    #[instrument(skip(self))]
    async fn list_users_page(&self, cursor: Option<&Cursor>) -> ConnectorResult<UserPage> {
        let url = self.users_url(cursor);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("hubspot request failed", e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: UserListResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::malformed(format!("hubspot users response: {e}")))?;

        let (users, invalid_records) = parse_users(&body.results);
        debug!(valid = users.len(), invalid = invalid_records.len(), "fetched users page");

        Ok(UserPage {
            valid_users: users
                .iter()
                .map(|user| map_user(user, self.portal_id.as_deref()))
                .collect(),
            invalid_records,
            next_cursor: next_from_token(body.next_token()),
        })
    }

    async fn delete_user(&self, user_id: &str) -> ConnectorResult<()> {
        let url = format!("{}/settings/v3/users/{user_id}", self.config.base_url);
        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("hubspot request failed", e))?;

        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Exchange an OAuth authorization code for a token pair.
pub async fn authenticate(
    config: &HubSpotConfig,
    code: &str,
) -> ConnectorResult<HubSpotCredentials> {
    oauth_token_request(config, &[("grant_type", "authorization_code"), ("code", code)]).await
}

/// Trade a refresh token for a fresh token pair.
pub async fn refresh_credentials(
    config: &HubSpotConfig,
    refresh_token: &str,
) -> ConnectorResult<HubSpotCredentials> {
    oauth_token_request(
        config,
        &[("grant_type", "refresh_token"), ("refresh_token", refresh_token)],
    )
    .await
}

/// Resolve the portal (hub) id for an access token, stored as a routing
/// attribute at install time.
pub async fn token_info(config: &HubSpotConfig, access_token: &str) -> ConnectorResult<TokenInfo> {
    let url = format!("{}/oauth/v1/access-tokens/{access_token}", config.base_url);
    let response = reqwest::Client::new()
        .get(&url)
        .send()
        .await
        .map_err(|e| ConnectorError::transient_with_source("hubspot token info failed", e))?;
    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    response
        .json()
        .await
        .map_err(|e| ConnectorError::malformed(format!("hubspot token info response: {e}")))
}

async fn oauth_token_request(
    config: &HubSpotConfig,
    grant: &[(&str, &str)],
) -> ConnectorResult<HubSpotCredentials> {
    let oauth = config.oauth.as_ref().ok_or_else(|| {
        ConnectorError::invalid_configuration("hubspot OAuth application is not configured")
    })?;

    let mut form: Vec<(&str, &str)> = vec![
        ("client_id", &oauth.client_id),
        ("client_secret", &oauth.client_secret),
        ("redirect_uri", &oauth.redirect_uri),
    ];
    form.extend_from_slice(grant);

    let response = reqwest::Client::new()
        .post(format!("{}/oauth/v1/token", config.base_url))
        .form(&form)
        .send()
        .await
        .map_err(|e| ConnectorError::transient_with_source("hubspot token request failed", e))?;

    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| ConnectorError::malformed(format!("hubspot token response: {e}")))?;
    Ok(HubSpotCredentials {
        access_token: token.access_token,
        refresh_token: token.refresh_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn users_url_carries_opaque_after_token() {
        let client = HubSpotClient::new(
            HubSpotConfig {
                page_size: 50,
                ..HubSpotConfig::default()
            },
            HubSpotCredentials {
                access_token: "at".into(),
                refresh_token: "rt".into(),
            },
            None,
        )
        .unwrap();
        assert_eq!(
            client.users_url(None),
            "https://api.hubapi.com/settings/v3/users?limit=50"
        );
        assert_eq!(
            client.users_url(Some(&Cursor::new("a b/c"))),
            "https://api.hubapi.com/settings/v3/users?limit=50&after=a%20b%2Fc"
        );
    }
}
