//! Relational persistence for the connectors: one credential row per
//! installed organisation, nothing else. Canonical users are never stored
//! locally; they flow straight through to the governance platform.

pub mod store;

pub use store::{NewOrganisation, PgOrganisationStore};
