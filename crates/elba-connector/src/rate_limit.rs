//! Rate-limit and auth-failure translation.
//!
//! Classifies failed vendor responses into the tagged error taxonomy. This
//! module is pure: it computes retry delays but never sleeps; scheduling a
//! delayed retry is the host engine's job.

use chrono::{DateTime, Utc};
use http::{HeaderMap, StatusCode};

use crate::error::ConnectorError;

/// Retry delay used when a 429 carries no usable rate-limit header.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Cap on header-derived retry delays. Vendors occasionally return reset
/// timestamps hours in the future; the chain survives a capped wait.
const MAX_RETRY_AFTER_SECS: u64 = 3600;

/// Classify a non-2xx vendor response into the error taxonomy.
///
/// - 429 becomes [`ConnectorError::RateLimited`] with a delay derived from
///   `Retry-After`, `X-RateLimit-Reset`, or `X-RateLimit-Interval`, falling
///   back to [`DEFAULT_RETRY_AFTER_SECS`].
/// - 401 becomes [`ConnectorError::Unauthorized`] (terminal; the driver pairs
///   it with a connection-status signal).
/// - 5xx becomes [`ConnectorError::Transient`].
/// - Anything else becomes [`ConnectorError::VendorApi`] carrying the raw
///   status and body.
///
/// `now` is explicit so epoch-based reset headers stay testable.
#[must_use]
pub fn classify_response(
    vendor: &'static str,
    status: StatusCode,
    headers: &HeaderMap,
    body: String,
    now: DateTime<Utc>,
) -> ConnectorError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return ConnectorError::RateLimited {
            retry_after_secs: retry_after_from_headers(headers, now)
                .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
                .min(MAX_RETRY_AFTER_SECS),
        };
    }
    if status == StatusCode::UNAUTHORIZED {
        let message = if body.trim().is_empty() {
            "credential rejected".to_string()
        } else {
            body
        };
        return ConnectorError::Unauthorized { message };
    }
    if status.is_server_error() {
        return ConnectorError::transient(format!("{vendor} returned {status}"));
    }
    ConnectorError::VendorApi {
        vendor,
        status: status.as_u16(),
        body,
    }
}

/// Extract a retry delay in seconds from vendor rate-limit headers.
///
/// Checks, in order: `Retry-After` (delta seconds), `X-RateLimit-Reset`
/// (epoch seconds, or a plain interval when the value predates `now`), and
/// `X-RateLimit-Interval` (delta seconds).
#[must_use]
pub fn retry_after_from_headers(headers: &HeaderMap, now: DateTime<Utc>) -> Option<u64> {
    if let Some(secs) = header_u64(headers, "Retry-After") {
        return Some(secs);
    }
    if let Some(reset) = header_u64(headers, "X-RateLimit-Reset") {
        let now_epoch = now.timestamp().max(0) as u64;
        // Epoch timestamps are converted to a delta; anything at or before
        // `now` is already an interval (or expired, in which case 0 lets the
        // engine retry immediately).
        return Some(if reset > now_epoch {
            reset - now_epoch
        } else {
            reset.min(MAX_RETRY_AFTER_SECS)
        });
    }
    header_u64(headers, "X-RateLimit-Interval")
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}
