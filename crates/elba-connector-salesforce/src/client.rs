//! Salesforce HTTP client.
//!
//! Pagination degenerates to "fetch this URL verbatim": the SOQL query
//! response embeds a ready-to-fetch `nextRecordsUrl`, carried opaquely as the
//! cursor. Salesforce cannot hard-delete users, so deprovisioning is a
//! deactivation (`IsActive = false`).

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use async_trait::async_trait;
use elba_connector::cursor::{next_from_url, Cursor};
use elba_connector::error::{ConnectorError, ConnectorResult};
use elba_connector::rate_limit::classify_response;
use elba_connector::traits::{Connector, UserSource};
use elba_connector::user::UserPage;

use crate::schema::{map_user, parse_users, QueryResponse};

const VENDOR: &str = "salesforce";

const USER_QUERY: &str = "SELECT Id, Name, Email, Username, Profile.Name FROM User \
     WHERE IsActive = true AND UserType = 'Standard'";

/// OAuth application (connected app) settings for the install flow.
#[derive(Debug, Clone)]
pub struct OAuthApp {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct SalesforceConfig {
    /// Token endpoint host; sandboxes use `test.salesforce.com`.
    pub login_url: String,
    pub api_version: String,
    pub timeout_secs: u64,
    pub oauth: Option<OAuthApp>,
}

impl Default for SalesforceConfig {
    fn default() -> Self {
        Self {
            login_url: "https://login.salesforce.com".to_string(),
            api_version: "v60.0".to_string(),
            timeout_secs: 30,
            oauth: None,
        }
    }
}

/// OAuth token pair stored (encrypted) per organisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SalesforceCredentials {
    pub access_token: String,
    pub refresh_token: String,
}

/// Token exchange result; `instance_url` becomes a routing attribute.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatedInstance {
    pub access_token: String,
    pub refresh_token: String,
    pub instance_url: String,
}

/// Credential-scoped Salesforce client for one organisation's instance.
pub struct SalesforceClient {
    config: SalesforceConfig,
    credentials: SalesforceCredentials,
    instance_url: String,
    auth_user_id: Option<String>,
    http_client: Client,
}

impl SalesforceClient {
    pub fn new(
        config: SalesforceConfig,
        credentials: SalesforceCredentials,
        instance_url: String,
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
            instance_url: instance_url.trim_end_matches('/').to_string(),
            auth_user_id,
            http_client,
        })
    }

    /// First page runs the SOQL query; continuations fetch the vendor-built
    /// URL verbatim.
    fn page_url(&self, cursor: Option<&Cursor>) -> String {
        match cursor {
            Some(cursor) => format!("{}{}", self.instance_url, cursor.as_str()),
            None => format!(
                "{}/services/data/{}/query?q={}",
                self.instance_url,
                self.config.api_version,
                urlencoding::encode(USER_QUERY)
            ),
        }
    }
}

async fn error_from_response(response: reqwest::Response) -> ConnectorError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();
    classify_response(VENDOR, status, &headers, body, Utc::now())
}

#[async_trait]
impl Connector for SalesforceClient {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        let url = format!(
            "{}/services/data/{}/limits",
            self.instance_url, self.config.api_version
        );
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("salesforce request failed", e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

#[async_trait]
impl UserSource for SalesforceClient {
    #[instrument(skip(self))]
    async fn list_users_page(&self, cursor: Option<&Cursor>) -> ConnectorResult<UserPage> {
        let url = self.page_url(cursor);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.credentials.access_token)
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("salesforce request failed", e))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| ConnectorError::malformed(format!("salesforce query response: {e}")))?;

        let (users, invalid_records) = parse_users(&body.records);
        debug!(valid = users.len(), invalid = invalid_records.len(), "fetched users page");

        Ok(UserPage {
            valid_users: users
                .iter()
                .map(|user| map_user(user, &self.instance_url, self.auth_user_id.as_deref()))
                .collect(),
            invalid_records,
            next_cursor: next_from_url(body.next_url()),
        })
    }

    /// Deactivate the user; Salesforce has no hard delete for users.
    async fn delete_user(&self, user_id: &str) -> ConnectorResult<()> {
        let url = format!(
            "{}/services/data/{}/sobjects/User/{user_id}",
            self.instance_url, self.config.api_version
        );
        let response = self
            .http_client
            .patch(&url)
            .bearer_auth(&self.credentials.access_token)
            .json(&json!({ "IsActive": false }))
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("salesforce request failed", e))?;

        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}

/// Exchange an OAuth authorization code for tokens plus the org's instance
/// URL.
pub async fn authenticate(
    config: &SalesforceConfig,
    code: &str,
) -> ConnectorResult<AuthenticatedInstance> {
    let oauth = config.oauth.as_ref().ok_or_else(|| {
        ConnectorError::invalid_configuration("salesforce connected app is not configured")
    })?;

    let response = reqwest::Client::new()
        .post(format!("{}/services/oauth2/token", config.login_url))
        .form(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", &oauth.client_id),
            ("client_secret", &oauth.client_secret),
            ("redirect_uri", &oauth.redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| ConnectorError::transient_with_source("salesforce token request failed", e))?;

    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    response
        .json()
        .await
        .map_err(|e| ConnectorError::malformed(format!("salesforce token response: {e}")))
}

/// Trade a refresh token for a fresh access token. The refresh token itself
/// does not rotate.
pub async fn refresh_credentials(
    config: &SalesforceConfig,
    refresh_token: &str,
) -> ConnectorResult<SalesforceCredentials> {
    let oauth = config.oauth.as_ref().ok_or_else(|| {
        ConnectorError::invalid_configuration("salesforce connected app is not configured")
    })?;

    #[derive(Deserialize)]
    struct RefreshResponse {
        access_token: String,
    }

    let response = reqwest::Client::new()
        .post(format!("{}/services/oauth2/token", config.login_url))
        .form(&[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", &oauth.client_id),
            ("client_secret", &oauth.client_secret),
        ])
        .send()
        .await
        .map_err(|e| ConnectorError::transient_with_source("salesforce token request failed", e))?;

    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }
    let refreshed: RefreshResponse = response
        .json()
        .await
        .map_err(|e| ConnectorError::malformed(format!("salesforce token response: {e}")))?;
    Ok(SalesforceCredentials {
        access_token: refreshed.access_token,
        refresh_token: refresh_token.to_string(),
    })
}
