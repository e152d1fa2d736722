//! airSlate HTTP client.
//!
//! Pagination is page-number based: the cursor is the page counter, and a
//! page shorter than `per_page` terminates the traversal.

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use async_trait::async_trait;
use elba_connector::cursor::{next_from_page, page_from_request, Cursor};
use elba_connector::error::{ConnectorError, ConnectorResult};
use elba_connector::rate_limit::classify_response;
use elba_connector::traits::{Connector, UserSource};
use elba_connector::user::UserPage;

use crate::schema::{map_user, parse_users, UserListResponse};

const VENDOR: &str = "airslate";

/// OAuth application settings for the install flow.
#[derive(Debug, Clone)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct AirSlateConfig {
    pub base_url: String,
    pub token_url: String,
    pub page_size: u32,
    pub timeout_secs: u64,
    pub oauth: Option<OAuthApp>,
}

impl Default for AirSlateConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.airslate.io".to_string(),
            token_url: "https://oauth.airslate.com/public/oauth/token".to_string(),
            page_size: 100,
            timeout_secs: 30,
            oauth: None,
        }
    }
}

/// Access token stored (encrypted) per organisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AirSlateCredentials {
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Credential-scoped airSlate client for one organisation.
pub struct AirSlateClient {
    config: AirSlateConfig,
    credentials: AirSlateCredentials,
    /// Vendor-side organization id (routing attribute).
    organization_id: String,
    http_client: Client,
}

impl AirSlateClient {
    pub fn new(
        config: AirSlateConfig,
        credentials: AirSlateCredentials,
        organization_id: String,
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
            organization_id,
            http_client,
        })
    }

    fn users_url(&self, page: u32) -> String {
        format!(
            "{}/v1/organizations/{}/users?per_page={}&page={page}",
            self.config.base_url, self.organization_id, self.config.page_size
        )
    }
}

async fn error_from_response(response: reqwest::Response) -> ConnectorError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    classify_response(VENDOR, status, &headers, body, Utc::now())
}

#[async_trait]
impl Connector for AirSlateClient {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        let url = format!(
            "{}/v1/organizations/{}/users?per_page=1&page=1",
            self.config.base_url, self.organization_id
        );
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("airslate request failed", e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

#[async_trait]
impl UserSource for AirSlateClient {
    #[instrument(skip(self))]
    async fn list_users_page(&self, cursor: Option<&Cursor>) -> ConnectorResult<UserPage> {
        let page = page_from_request(cursor)?;
        let url = self.users_url(page);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("airslate request failed", e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: UserListResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::malformed(format!("airslate users response: {e}")))?;

        let (users, invalid_records) = parse_users(&body.data);
        debug!(valid = users.len(), invalid = invalid_records.len(), "fetched users page");

        // Termination is count-based: the invalid bucket still occupied a
        // slot in the vendor's page.
        let returned = body.data.len();

        Ok(UserPage {
            valid_users: users
                .iter()
                .map(|user| map_user(user, &self.organization_id))
                .collect(),
            invalid_records,
            next_cursor: next_from_page(page, self.config.page_size, returned),
        })
    }

    async fn delete_user(&self, user_id: &str) -> ConnectorResult<()> {
        let url = format!(
            "{}/v1/organizations/{}/users/{user_id}",
            self.config.base_url, self.organization_id
        );
        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("airslate request failed", e))?;

        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Exchange an OAuth authorization code for an access token.
pub async fn authenticate(
    config: &AirSlateConfig,
    code: &str,
) -> ConnectorResult<AirSlateCredentials> {
    let oauth = config.oauth.as_ref().ok_or_else(|| {
        ConnectorError::invalid_configuration("airslate OAuth application is not configured")
    })?;

    let response = reqwest::Client::new()
        .post(&config.token_url)
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &oauth.client_id),
            ("client_secret", &oauth.client_secret),
            ("redirect_uri", &oauth.redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| ConnectorError::transient_with_source("airslate token request failed", e))?;

    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| ConnectorError::malformed(format!("airslate token response: {e}")))?;
    Ok(AirSlateCredentials {
        access_token: token.access_token,
    })
}
