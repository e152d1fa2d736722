//! HubSpot connector.
//!
//! Enumerates account users through the settings API with opaque
//! continuation tokens, maps them to canonical records, and removes
//! deprovisioned users.

pub mod client;
pub mod schema;

pub use client::{
    authenticate, refresh_credentials, token_info, HubSpotClient, HubSpotConfig,
    HubSpotCredentials, OAuthApp, TokenInfo,
};
pub use schema::HubSpotUser;

use async_trait::async_trait;
use elba_connector::error::{ConnectorError, ConnectorResult};
use elba_connector::organisation::Organisation;
use elba_connector::traits::{BoxedUserSource, SourceFactory};

/// Opens credential-scoped HubSpot clients for the sync driver.
#[derive(Debug, Clone, Default)]
pub struct HubSpotSourceFactory {
    pub config: HubSpotConfig,
}

#[async_trait]
impl SourceFactory for HubSpotSourceFactory {
    async fn open(
        &self,
        organisation: &Organisation,
        credentials: serde_json::Value,
    ) -> ConnectorResult<BoxedUserSource> {
        let credentials: HubSpotCredentials =
            serde_json::from_value(credentials).map_err(|e| {
                ConnectorError::invalid_configuration(format!("hubspot credentials: {e}"))
            })?;
        let client = HubSpotClient::new(
            self.config.clone(),
            credentials,
            organisation.routing_str("portal_id"),
        )?;
        Ok(Box::new(client))
    }
}
