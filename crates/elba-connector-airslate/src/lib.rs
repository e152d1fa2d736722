//! airSlate connector.
//!
//! Enumerates organization users with page-number pagination, ranks their
//! role lists into a single canonical role, and removes deprovisioned users.

pub mod client;
pub mod schema;

pub use client::{authenticate, AirSlateClient, AirSlateConfig, AirSlateCredentials, OAuthApp};
pub use schema::{AirSlateUser, ROLE_PRIORITY};

use async_trait::async_trait;
use elba_connector::error::{ConnectorError, ConnectorResult};
use elba_connector::organisation::Organisation;
use elba_connector::traits::{BoxedUserSource, SourceFactory};

/// Opens credential-scoped airSlate clients for the sync driver.
#[derive(Debug, Clone, Default)]
pub struct AirSlateSourceFactory {
    pub config: AirSlateConfig,
}

#[async_trait]
impl SourceFactory for AirSlateSourceFactory {
    async fn open(
        &self,
        organisation: &Organisation,
        credentials: serde_json::Value,
    ) -> ConnectorResult<BoxedUserSource> {
        let credentials: AirSlateCredentials =
            serde_json::from_value(credentials).map_err(|e| {
                ConnectorError::invalid_configuration(format!("airslate credentials: {e}"))
            })?;
        let organization_id = organisation.require_routing_str("organization_id")?;
        let client = AirSlateClient::new(self.config.clone(), credentials, organization_id)?;
        Ok(Box::new(client))
    }
}
