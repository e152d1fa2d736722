//! # Connector Framework
//!
//! Vendor-agnostic core for the elba SaaS connectors: the pieces every
//! connector shares, so a vendor crate only contributes its HTTP surface,
//! schema validation and field mapping.
//!
//! ## Architecture
//!
//! - [`cursor`]: normalizes heterogeneous vendor pagination (offsets, opaque
//!   tokens, `Link` headers, next URLs, GraphQL page counters) into one
//!   "cursor or done" contract.
//! - [`driver`]: the sync continuation driver: one call, one page, then
//!   either a continuation for the host workflow engine to re-enqueue or the
//!   finalization sweep that reconciles vendor-side deletions.
//! - [`error`] / [`rate_limit`]: the tagged error taxonomy and the
//!   429/401-to-signal translation consumed by the host engine's retry
//!   policy.
//! - [`traits`]: capability traits for vendor connectors and the narrow
//!   seams to the organisation store and the governance platform.
//! - [`user`]: the canonical user record and mapper conventions.
//! - [`crypto`]: credential encryption at rest.
//!
//! The host workflow engine (durable steps, retries, cron, per-organisation
//! concurrency) is an external collaborator: nothing in this crate schedules,
//! sleeps or retries.

pub mod crypto;
pub mod cursor;
pub mod driver;
pub mod error;
pub mod organisation;
pub mod rate_limit;
pub mod traits;
pub mod user;

/// Prelude module for convenient imports.
///
/// ```
/// use elba_connector::prelude::*;
/// ```
pub mod prelude {
    pub use crate::crypto::CredentialCipher;
    pub use crate::cursor::Cursor;
    pub use crate::driver::{AbandonReason, SyncDriver, SyncRequest, SyncTransition};
    pub use crate::error::{ConnectorError, ConnectorResult};
    pub use crate::organisation::Organisation;
    pub use crate::traits::{
        BoxedUserSource, Connector, GovernancePlatform, OrganisationStore, SourceFactory,
        UserSource,
    };
    pub use crate::user::{AuthMethod, ConnectorUser, RolePriority, UserPage};
}

// Re-export async_trait for connector implementors
pub use async_trait::async_trait;
