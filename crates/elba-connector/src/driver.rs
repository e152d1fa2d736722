//! Sync continuation driver.
//!
//! One call to [`SyncDriver::step`] processes exactly one vendor page: load
//! the organisation row, decrypt credentials, fetch, upsert, then either hand
//! back an [`SyncTransition::Ongoing`] continuation for the host engine to
//! re-enqueue, or run the finalization sweep. The driver is scheduling-free:
//! retries, delays, per-organisation serialization and cron triggers all
//! belong to the host engine, which simply invokes `step` again with the
//! carried-over request.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::crypto::CredentialCipher;
use crate::cursor::Cursor;
use crate::error::{ConnectorError, ConnectorResult};
use crate::traits::{GovernancePlatform, OrganisationStore, SourceFactory};

/// One page iteration of a sync traversal, as carried by a `sync.requested`
/// event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub organisation_id: Uuid,
    /// First-time syncs are scheduled ahead of routine resyncs.
    pub is_first_sync: bool,
    /// Watermark captured once at the start of the traversal and carried
    /// unchanged through every continuation hop.
    pub sync_started_at: DateTime<Utc>,
    /// `None` on the first page; otherwise the cursor the previous page
    /// produced.
    pub cursor: Option<Cursor>,
}

impl SyncRequest {
    /// The opening request of a traversal.
    #[must_use]
    pub fn start(organisation_id: Uuid, is_first_sync: bool, sync_started_at: DateTime<Utc>) -> Self {
        Self {
            organisation_id,
            is_first_sync,
            sync_started_at,
            cursor: None,
        }
    }

    /// The continuation for the next page. Everything but the cursor is
    /// carried unchanged.
    #[must_use]
    fn continued(&self, cursor: Cursor) -> Self {
        Self {
            organisation_id: self.organisation_id,
            is_first_sync: self.is_first_sync,
            sync_started_at: self.sync_started_at,
            cursor: Some(cursor),
        }
    }
}

/// Outcome of one page iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTransition {
    /// More pages remain; the host engine re-enqueues this request.
    Ongoing(SyncRequest),
    /// Last page processed and stale users swept.
    Completed { swept_before: DateTime<Utc> },
    /// The chain observed that it is stale and must stop without sweeping.
    Abandoned(AbandonReason),
}

/// Why a chain stopped re-enqueuing itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbandonReason {
    /// The organisation was re-installed after this traversal started; its
    /// credentials and cursors no longer describe the current install.
    Reinstalled,
}

/// The vendor-agnostic sync continuation driver.
pub struct SyncDriver {
    store: Arc<dyn OrganisationStore>,
    platform: Arc<dyn GovernancePlatform>,
    factory: Arc<dyn SourceFactory>,
    cipher: CredentialCipher,
}

impl SyncDriver {
    #[must_use]
    pub fn new(
        store: Arc<dyn OrganisationStore>,
        platform: Arc<dyn GovernancePlatform>,
        factory: Arc<dyn SourceFactory>,
        cipher: CredentialCipher,
    ) -> Self {
        Self {
            store,
            platform,
            factory,
            cipher,
        }
    }

    /// Process one page of the traversal.
    ///
    /// Terminal failures: the organisation row is gone
    /// ([`ConnectorError::OrganisationNotFound`], expected under concurrent
    /// uninstall) or the vendor rejected the credential
    /// ([`ConnectorError::Unauthorized`], paired with exactly one
    /// connection-error signal to the platform). Retriable failures propagate
    /// untouched for the host engine's backoff.
    #[instrument(
        skip(self, request),
        fields(
            organisation_id = %request.organisation_id,
            is_first_sync = request.is_first_sync,
        )
    )]
    pub async fn step(&self, request: &SyncRequest) -> ConnectorResult<SyncTransition> {
        let Some(organisation) = self.store.get(request.organisation_id).await? else {
            return Err(ConnectorError::OrganisationNotFound {
                organisation_id: request.organisation_id,
            });
        };

        // Cancellation guard: a re-install rewrites the row and refreshes its
        // timestamp, invalidating any chain started before it.
        if organisation.created_at > request.sync_started_at {
            info!(
                installed_at = %organisation.created_at,
                sync_started_at = %request.sync_started_at,
                "organisation reinstalled mid-traversal, abandoning chain"
            );
            return Ok(SyncTransition::Abandoned(AbandonReason::Reinstalled));
        }

        let credentials = self
            .cipher
            .open_json(organisation.id, &organisation.credentials_encrypted)?;
        let source = self.factory.open(&organisation, credentials).await?;

        let page = match source.list_users_page(request.cursor.as_ref()).await {
            Ok(page) => page,
            Err(err @ ConnectorError::Unauthorized { .. }) => {
                // Dead credential: tell the platform the connection is broken
                // before surfacing the terminal error.
                self.platform
                    .update_connection_status(request.organisation_id, true)
                    .await?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        if !page.invalid_records.is_empty() {
            warn!(
                vendor = source.vendor(),
                invalid = page.invalid_records.len(),
                "skipping records that failed validation"
            );
        }

        // Empty pages happen on vendors that only signal termination with an
        // empty response; skip the no-op upsert.
        if !page.valid_users.is_empty() {
            self.platform
                .update_users(request.organisation_id, &page.valid_users)
                .await?;
        }

        match page.next_cursor {
            Some(cursor) => Ok(SyncTransition::Ongoing(request.continued(cursor))),
            None => {
                self.platform
                    .delete_users_synced_before(request.organisation_id, request.sync_started_at)
                    .await?;
                info!(synced_before = %request.sync_started_at, "sync completed, stale users swept");
                Ok(SyncTransition::Completed {
                    swept_before: request.sync_started_at,
                })
            }
        }
    }

    /// Drive a traversal to its terminal transition in-process.
    ///
    /// Production chains hop through the host engine between pages; this is
    /// for tests and one-off backfills.
    pub async fn run_to_completion(&self, request: SyncRequest) -> ConnectorResult<SyncTransition> {
        let mut request = request;
        loop {
            match self.step(&request).await? {
                SyncTransition::Ongoing(next) => request = next,
                terminal => return Ok(terminal),
            }
        }
    }
}
