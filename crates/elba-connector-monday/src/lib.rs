//! monday.com connector.
//!
//! Enumerates account users through the GraphQL API with a page counter,
//! maps account flags to canonical roles, and deactivates deprovisioned
//! users.

pub mod client;
pub mod schema;

pub use client::{validate_token, MondayClient, MondayConfig, MondayCredentials};
pub use schema::MondayUser;

use async_trait::async_trait;
use elba_connector::error::{ConnectorError, ConnectorResult};
use elba_connector::organisation::Organisation;
use elba_connector::traits::{BoxedUserSource, SourceFactory};

/// Opens credential-scoped monday clients for the sync driver.
#[derive(Debug, Clone, Default)]
pub struct MondaySourceFactory {
    pub config: MondayConfig,
}

#[async_trait]
impl SourceFactory for MondaySourceFactory {
    async fn open(
        &self,
        _organisation: &Organisation,
        credentials: serde_json::Value,
    ) -> ConnectorResult<BoxedUserSource> {
        let credentials: MondayCredentials =
            serde_json::from_value(credentials).map_err(|e| {
                ConnectorError::invalid_configuration(format!("monday credentials: {e}"))
            })?;
        let client = MondayClient::new(self.config.clone(), credentials)?;
        Ok(Box::new(client))
    }
}
