//! Event contracts and the scheduling seam between the connectors and the
//! durable workflow engine.

pub mod event;
pub mod scheduler;

pub use event::{AppInstalled, AppUninstalled, Event, SyncRequested};
pub use scheduler::{
    concurrency_key, enqueue_routine_syncs, SchedulePriority, SyncScheduler,
    PER_ORGANISATION_CONCURRENCY,
};
