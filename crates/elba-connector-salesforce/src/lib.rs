//! Salesforce connector.
//!
//! Enumerates active standard users via SOQL with `nextRecordsUrl`
//! continuation, maps them to canonical records, and deactivates
//! deprovisioned users.

pub mod client;
pub mod schema;

pub use client::{
    authenticate, refresh_credentials, AuthenticatedInstance, OAuthApp, SalesforceClient,
    SalesforceConfig, SalesforceCredentials,
};
pub use schema::SalesforceUser;

use async_trait::async_trait;
use elba_connector::error::{ConnectorError, ConnectorResult};
use elba_connector::organisation::Organisation;
use elba_connector::traits::{BoxedUserSource, SourceFactory};

/// Opens credential-scoped Salesforce clients for the sync driver.
#[derive(Debug, Clone, Default)]
pub struct SalesforceSourceFactory {
    pub config: SalesforceConfig,
}

#[async_trait]
impl SourceFactory for SalesforceSourceFactory {
    async fn open(
        &self,
        organisation: &Organisation,
        credentials: serde_json::Value,
    ) -> ConnectorResult<BoxedUserSource> {
        let credentials: SalesforceCredentials =
            serde_json::from_value(credentials).map_err(|e| {
                ConnectorError::invalid_configuration(format!("salesforce credentials: {e}"))
            })?;
        let instance_url = organisation.require_routing_str("instance_url")?;
        let client = SalesforceClient::new(
            self.config.clone(),
            credentials,
            instance_url,
            organisation.routing_str("auth_user_id"),
        )?;
        Ok(Box::new(client))
    }
}
