//! Event contracts shared with the durable workflow engine.
//!
//! Wire payloads are camelCase JSON; `syncStartedAt` travels as epoch
//! milliseconds exactly as the engine emits it, and is converted at the edge
//! to the driver's `DateTime<Utc>`.

use chrono::{TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use elba_connector::cursor::Cursor;
use elba_connector::driver::SyncRequest;
use elba_connector::error::{ConnectorError, ConnectorResult};

/// Trait for types published to and consumed from the workflow engine.
///
/// The event type name is stored in the envelope for routing. Convention:
/// `elba.connector.<entity>.<action>`.
pub trait Event: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The fully qualified event type name.
    const EVENT_TYPE: &'static str;
}

/// Triggers one page iteration of a sync traversal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequested {
    pub organisation_id: Uuid,
    pub is_first_sync: bool,
    /// Watermark, epoch milliseconds.
    pub sync_started_at: i64,
    /// Opaque continuation value; absent on the first page. Vendors with
    /// numeric cursors carry them as their decimal string form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

impl Event for SyncRequested {
    const EVENT_TYPE: &'static str = "elba.connector.sync.requested";
}

impl SyncRequested {
    /// The opening event of a traversal: no cursor, fresh watermark.
    #[must_use]
    pub fn initial(organisation_id: Uuid, is_first_sync: bool, sync_started_at: i64) -> Self {
        Self {
            organisation_id,
            is_first_sync,
            sync_started_at,
            cursor: None,
        }
    }

    /// Convert into the driver's request, validating the watermark.
    pub fn into_request(self) -> ConnectorResult<SyncRequest> {
        let sync_started_at = Utc
            .timestamp_millis_opt(self.sync_started_at)
            .single()
            .ok_or_else(|| ConnectorError::Serialization {
                message: format!("syncStartedAt out of range: {}", self.sync_started_at),
            })?;
        Ok(SyncRequest {
            organisation_id: self.organisation_id,
            is_first_sync: self.is_first_sync,
            sync_started_at,
            cursor: self.cursor.map(Cursor::new),
        })
    }

    /// Build the wire event for a driver request (the continuation hop).
    #[must_use]
    pub fn from_request(request: &SyncRequest) -> Self {
        Self {
            organisation_id: request.organisation_id,
            is_first_sync: request.is_first_sync,
            sync_started_at: request.sync_started_at.timestamp_millis(),
            cursor: request.cursor.as_ref().map(|c| c.as_str().to_string()),
        }
    }
}

/// Emitted when an organisation installs (or re-installs) the integration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInstalled {
    pub organisation_id: Uuid,
}

impl Event for AppInstalled {
    const EVENT_TYPE: &'static str = "elba.connector.app.installed";
}

/// Emitted when the vendor revokes access or the integration is removed.
/// Cancels any in-flight continuation chain for the organisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppUninstalled {
    pub organisation_id: Uuid,
}

impl Event for AppUninstalled {
    const EVENT_TYPE: &'static str = "elba.connector.app.uninstalled";
}
