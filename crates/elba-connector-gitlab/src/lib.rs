//! GitLab connector.
//!
//! Enumerates instance users with keyset pagination (`Link` header cursor),
//! maps them to canonical records, and hard-deletes deprovisioned users.

pub mod client;
pub mod schema;

pub use client::{authenticate, refresh_credentials, GitLabClient, GitLabConfig, GitLabCredentials, OAuthApp};
pub use schema::GitLabUser;

use async_trait::async_trait;
use elba_connector::error::{ConnectorError, ConnectorResult};
use elba_connector::organisation::Organisation;
use elba_connector::traits::{BoxedUserSource, SourceFactory};

/// Opens credential-scoped GitLab clients for the sync driver.
#[derive(Debug, Clone, Default)]
pub struct GitLabSourceFactory {
    pub config: GitLabConfig,
}

#[async_trait]
impl SourceFactory for GitLabSourceFactory {
    async fn open(
        &self,
        organisation: &Organisation,
        credentials: serde_json::Value,
    ) -> ConnectorResult<BoxedUserSource> {
        let credentials: GitLabCredentials =
            serde_json::from_value(credentials).map_err(|e| {
                ConnectorError::invalid_configuration(format!("gitlab credentials: {e}"))
            })?;
        let client = GitLabClient::new(
            self.config.clone(),
            credentials,
            organisation.routing_str("auth_user_id"),
        )?;
        Ok(Box::new(client))
    }
}
