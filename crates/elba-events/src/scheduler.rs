//! Scheduling seam to the durable workflow engine.
//!
//! The engine owns steps, retries, backoff and cron; the connectors only
//! express two policies through this seam: first-time syncs jump the queue,
//! and at most one sync chain runs per organisation at any time.

use async_trait::async_trait;
use uuid::Uuid;

use elba_connector::error::ConnectorResult;

use crate::event::SyncRequested;

/// At most one in-flight sync per organisation: pages for one organisation
/// are strictly sequential, cross-organisation ordering is unspecified.
pub const PER_ORGANISATION_CONCURRENCY: u32 = 1;

/// Scheduling priority for a sync request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulePriority {
    /// Freshly installed organisation backfilling for the first time.
    Backfill,
    /// Routine cron-triggered resync.
    Routine,
}

impl SchedulePriority {
    /// First-time syncs are scheduled ahead of steady-state resyncs.
    #[must_use]
    pub fn for_sync(is_first_sync: bool) -> Self {
        if is_first_sync {
            SchedulePriority::Backfill
        } else {
            SchedulePriority::Routine
        }
    }
}

/// Serialization key the engine uses to enforce
/// [`PER_ORGANISATION_CONCURRENCY`].
#[must_use]
pub fn concurrency_key(organisation_id: Uuid) -> String {
    format!("sync:{organisation_id}")
}

/// Outbound seam: enqueue the next page iteration with the engine.
#[async_trait]
pub trait SyncScheduler: Send + Sync {
    async fn enqueue(
        &self,
        event: SyncRequested,
        priority: SchedulePriority,
    ) -> ConnectorResult<()>;
}

/// Cron fan-out: open one routine traversal per known organisation.
///
/// `sync_started_at` (epoch ms) is captured once and shared by the whole
/// batch; each organisation's chain carries it unchanged as its watermark.
pub async fn enqueue_routine_syncs(
    scheduler: &dyn SyncScheduler,
    organisation_ids: &[Uuid],
    sync_started_at: i64,
) -> ConnectorResult<()> {
    for organisation_id in organisation_ids {
        scheduler
            .enqueue(
                SyncRequested::initial(*organisation_id, false, sync_started_at),
                SchedulePriority::Routine,
            )
            .await?;
    }
    Ok(())
}
