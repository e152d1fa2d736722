//! monday.com GraphQL client.
//!
//! Pagination embeds a page counter in the query body; the vendor gives no
//! explicit termination signal, so an empty result array is the end. The API
//! has no hard user delete; deprovisioning uses the `deactivate_users`
//! mutation.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use async_trait::async_trait;
use elba_connector::cursor::{next_from_page_until_empty, page_from_request, Cursor};
use elba_connector::error::{ConnectorError, ConnectorResult};
use elba_connector::rate_limit::classify_response;
use elba_connector::traits::{Connector, UserSource};
use elba_connector::user::UserPage;

use crate::schema::{map_user, parse_users, GraphQlResponse};

const VENDOR: &str = "monday";

const USERS_QUERY: &str = "query ($limit: Int, $page: Int) {
    users (limit: $limit, page: $page) {
        id name email url is_admin is_guest is_view_only
    }
}";

const DEACTIVATE_MUTATION: &str = "mutation ($ids: [ID!]!) {
    deactivate_users (user_ids: $ids) { id }
}";

const ME_QUERY: &str = "query { me { id } }";

/// Vendor error code for an unknown user id; deletion treats it as
/// already-gone.
const USER_NOT_FOUND_CODE: &str = "InvalidUserIdException";

#[derive(Debug, Clone)]
pub struct MondayConfig {
    pub base_url: String,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for MondayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.monday.com".to_string(),
            page_size: 100,
            timeout_secs: 30,
        }
    }
}

/// Personal API token stored (encrypted) per organisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MondayCredentials {
    pub api_token: String,
}

/// Credential-scoped monday client for one organisation.
pub struct MondayClient {
    config: MondayConfig,
    credentials: MondayCredentials,
    http_client: Client,
}

impl MondayClient {
    pub fn new(config: MondayConfig, credentials: MondayCredentials) -> ConnectorResult<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ConnectorError::invalid_configuration(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            config,
            credentials,
            http_client,
        })
    }

    /// Run one GraphQL request; HTTP-level failures go through the shared
    /// classification, GraphQL-level errors are returned for the caller to
    /// interpret.
    async fn execute(
        &self,
        query: &str,
        variables: serde_json::Value,
    ) -> ConnectorResult<GraphQlResponse> {
        let response = self
            .http_client
            .post(format!("{}/v2", self.config.base_url))
            .header(reqwest::header::AUTHORIZATION, &self.credentials.api_token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| ConnectorError::transient_with_source("monday request failed", e))?;

        if !response.status().is_success() {
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_response(VENDOR, status, &headers, body, Utc::now()));
        }

        response
            .json()
            .await
            .map_err(|e| ConnectorError::malformed(format!("monday graphql response: {e}")))
    }
}

fn graphql_errors_to_error(errors: &[crate::schema::GraphQlError]) -> ConnectorError {
    ConnectorError::VendorApi {
        vendor: VENDOR,
        status: 200,
        body: errors
            .iter()
            .map(|error| error.message.clone())
            .collect::<Vec<_>>()
            .join("; "),
    }
}

#[async_trait]
impl Connector for MondayClient {
    fn vendor(&self) -> &'static str {
        VENDOR
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        let response = self.execute(ME_QUERY, json!({})).await?;
        if response.errors.is_empty() {
            Ok(())
        } else {
            Err(graphql_errors_to_error(&response.errors))
        }
    }
}

#[async_trait]
impl UserSource for MondayClient {
    #[instrument(skip(self))]
    async fn list_users_page(&self, cursor: Option<&Cursor>) -> ConnectorResult<UserPage> {
        let page = page_from_request(cursor)?;
        let response = self
            .execute(
                USERS_QUERY,
                json!({ "limit": self.config.page_size, "page": page }),
            )
            .await?;

        if !response.errors.is_empty() {
            return Err(graphql_errors_to_error(&response.errors));
        }

        let records = response
            .data
            .as_ref()
            .and_then(|data| data.get("users"))
            .and_then(|users| users.as_array())
            .ok_or_else(|| ConnectorError::malformed("monday response is missing data.users"))?;

        let (users, invalid_records) = parse_users(records);
        debug!(valid = users.len(), invalid = invalid_records.len(), "fetched users page");

        Ok(UserPage {
            valid_users: users.iter().map(map_user).collect(),
            invalid_records,
            next_cursor: next_from_page_until_empty(page, records.len()),
        })
    }

    /// Deactivate the user; an unknown id means it is already gone.
    async fn delete_user(&self, user_id: &str) -> ConnectorResult<()> {
        let response = self
            .execute(DEACTIVATE_MUTATION, json!({ "ids": [user_id] }))
            .await?;

        if response.errors.is_empty()
            || response
                .errors
                .iter()
                .all(|error| error.code() == Some(USER_NOT_FOUND_CODE))
        {
            Ok(())
        } else {
            Err(graphql_errors_to_error(&response.errors))
        }
    }
}

/// Validate a personal API token by resolving the calling user.
pub async fn validate_token(
    config: &MondayConfig,
    api_token: &str,
) -> ConnectorResult<MondayCredentials> {
    let credentials = MondayCredentials {
        api_token: api_token.to_string(),
    };
    let client = MondayClient::new(config.clone(), credentials.clone())?;
    client.test_connection().await?;
    Ok(credentials)
}
