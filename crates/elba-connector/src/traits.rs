//! Connector capability traits and collaborator seams.
//!
//! Vendor crates implement [`Connector`] + [`UserSource`] and expose a
//! [`SourceFactory`] that opens a credential-scoped instance per
//! organisation: explicit dependency injection, no process-wide singletons.
//! [`OrganisationStore`] and [`GovernancePlatform`] are the narrow interfaces
//! to the relational store and the canonical platform.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::cursor::Cursor;
use crate::error::ConnectorResult;
use crate::organisation::Organisation;
use crate::user::{ConnectorUser, UserPage};

/// Base trait for all vendor connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Vendor slug, used for error tagging and logging.
    fn vendor(&self) -> &'static str;

    /// Validate that the credential still works against the vendor.
    async fn test_connection(&self) -> ConnectorResult<()>;
}

/// Capability for enumerating and deprovisioning the vendor's users.
#[async_trait]
pub trait UserSource: Connector {
    /// Fetch one page of users.
    ///
    /// `cursor` must be `None` (first page) or a cursor previously returned
    /// by this same connector. Records failing per-record validation are
    /// shunted to `invalid_records`, never raised.
    async fn list_users_page(&self, cursor: Option<&Cursor>) -> ConnectorResult<UserPage>;

    /// Delete (or deactivate, where the vendor cannot delete) one user.
    ///
    /// Idempotent: a 404 from the vendor means "already gone" and is success.
    async fn delete_user(&self, user_id: &str) -> ConnectorResult<()>;
}

/// A vendor connector behind a trait object.
pub type BoxedUserSource = Box<dyn UserSource>;

/// Opens a credential-scoped [`UserSource`] for one organisation.
#[async_trait]
pub trait SourceFactory: Send + Sync {
    /// Build a connector from the organisation row and its decrypted
    /// credential JSON.
    async fn open(
        &self,
        organisation: &Organisation,
        credentials: serde_json::Value,
    ) -> ConnectorResult<BoxedUserSource>;
}

/// Read seam over the organisation credential rows.
#[async_trait]
pub trait OrganisationStore: Send + Sync {
    /// Fetch one organisation; `None` when it was uninstalled.
    async fn get(&self, organisation_id: Uuid) -> ConnectorResult<Option<Organisation>>;
}

/// Outbound seam to the canonical identity-governance platform.
#[async_trait]
pub trait GovernancePlatform: Send + Sync {
    /// Upsert a batch of canonical users.
    async fn update_users(
        &self,
        organisation_id: Uuid,
        users: &[ConnectorUser],
    ) -> ConnectorResult<()>;

    /// Delete every canonical user not refreshed since the watermark.
    async fn delete_users_synced_before(
        &self,
        organisation_id: Uuid,
        synced_before: DateTime<Utc>,
    ) -> ConnectorResult<()>;

    /// Flag the connection as broken (or healthy again) for org admins.
    async fn update_connection_status(
        &self,
        organisation_id: Uuid,
        has_error: bool,
    ) -> ConnectorResult<()>;
}
