//! HTTP client for the elba identity-governance platform.
//!
//! Implements the framework's `GovernancePlatform` seam: user upsert,
//! watermark sweep, connection status.

pub mod client;

pub use client::ElbaClient;
