//! Connector error taxonomy.
//!
//! Tagged error kinds with a retriable/terminal split. The host workflow
//! engine consumes the tag through [`ConnectorError::is_retriable`] and
//! [`ConnectorError::retry_after`] to decide between immediate retry, delayed
//! retry, and permanent failure. Drivers and vendor clients never branch on
//! concrete error subtypes beyond the tag.

use thiserror::Error;
use uuid::Uuid;

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Error that can occur during connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Transient vendor failure (5xx, network, timeout). Retried by the host
    /// engine with its default backoff.
    #[error("transient vendor error: {message}")]
    Transient {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Vendor rate limit (429), translated into an explicit retry delay.
    #[error("rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Credential rejected by the vendor (401). Terminal for this credential
    /// until the organisation re-authenticates.
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Non-2xx vendor response outside the 401/429/5xx taxonomy, carrying the
    /// raw status and body for inspection.
    #[error("{vendor} api error: {status} {body}")]
    VendorApi {
        vendor: &'static str,
        status: u16,
        body: String,
    },

    /// Top-level response shape failed validation. Fatal for the page:
    /// pagination cannot proceed without a trustworthy cursor.
    #[error("malformed vendor response: {message}")]
    MalformedResponse { message: String },

    /// A continuation cursor that this client never produced.
    #[error("invalid cursor: {value}")]
    InvalidCursor { value: String },

    /// Organisation row vanished between scheduling and execution. Expected
    /// under concurrent uninstall; terminal, never retried.
    #[error("organisation not found: {organisation_id}")]
    OrganisationNotFound { organisation_id: Uuid },

    /// Credential encryption failed.
    #[error("encryption failed: {message}")]
    EncryptionFailed { message: String },

    /// Credential decryption failed.
    #[error("decryption failed: {message}")]
    DecryptionFailed { message: String },

    /// Connector or organisation configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Database error from the organisation store.
    #[error("database error: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Serialization error.
    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl ConnectorError {
    /// Whether the host engine should retry the failed step.
    ///
    /// Rate-limited errors are retriable with the delay from
    /// [`ConnectorError::retry_after`]; everything else retriable uses the
    /// engine's default backoff.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ConnectorError::Transient { .. } | ConnectorError::RateLimited { .. }
        )
    }

    /// Explicit retry delay in seconds, if this error carries one.
    #[must_use]
    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ConnectorError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        }
    }

    /// Stable code for classification and logging.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            ConnectorError::Transient { .. } => "TRANSIENT",
            ConnectorError::RateLimited { .. } => "RATE_LIMITED",
            ConnectorError::Unauthorized { .. } => "UNAUTHORIZED",
            ConnectorError::VendorApi { .. } => "VENDOR_API",
            ConnectorError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            ConnectorError::InvalidCursor { .. } => "INVALID_CURSOR",
            ConnectorError::OrganisationNotFound { .. } => "ORGANISATION_NOT_FOUND",
            ConnectorError::EncryptionFailed { .. } => "ENCRYPTION_FAILED",
            ConnectorError::DecryptionFailed { .. } => "DECRYPTION_FAILED",
            ConnectorError::InvalidConfiguration { .. } => "INVALID_CONFIG",
            ConnectorError::Database { .. } => "DATABASE_ERROR",
            ConnectorError::Serialization { .. } => "SERIALIZATION_ERROR",
        }
    }

    // Convenience constructors

    /// Create a transient error.
    pub fn transient(message: impl Into<String>) -> Self {
        ConnectorError::Transient {
            message: message.into(),
            source: None,
        }
    }

    /// Create a transient error with source.
    pub fn transient_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Transient {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        ConnectorError::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        ConnectorError::MalformedResponse {
            message: message.into(),
        }
    }

    /// Create an invalid-configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Create a database error with source.
    pub fn database_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Database {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<serde_json::Error> for ConnectorError {
    fn from(err: serde_json::Error) -> Self {
        ConnectorError::Serialization {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retriable_errors() {
        let retriable = vec![
            ConnectorError::transient("socket closed"),
            ConnectorError::RateLimited {
                retry_after_secs: 30,
            },
        ];
        for err in retriable {
            assert!(err.is_retriable(), "expected {} retriable", err.error_code());
        }
    }

    #[test]
    fn terminal_errors() {
        let terminal = vec![
            ConnectorError::unauthorized("token revoked"),
            ConnectorError::OrganisationNotFound {
                organisation_id: Uuid::new_v4(),
            },
            ConnectorError::malformed("missing results field"),
            ConnectorError::VendorApi {
                vendor: "gitlab",
                status: 403,
                body: "forbidden".into(),
            },
            ConnectorError::InvalidCursor {
                value: "not-a-number".into(),
            },
        ];
        for err in terminal {
            assert!(!err.is_retriable(), "expected {} terminal", err.error_code());
        }
    }

    #[test]
    fn retry_after_only_on_rate_limit() {
        assert_eq!(
            ConnectorError::RateLimited {
                retry_after_secs: 30
            }
            .retry_after(),
            Some(30)
        );
        assert_eq!(ConnectorError::transient("x").retry_after(), None);
        assert_eq!(ConnectorError::unauthorized("x").retry_after(), None);
    }

    #[test]
    fn display_carries_context() {
        let err = ConnectorError::VendorApi {
            vendor: "hubspot",
            status: 403,
            body: "insufficient scope".into(),
        };
        assert_eq!(err.to_string(), "hubspot api error: 403 insufficient scope");

        let err = ConnectorError::RateLimited {
            retry_after_secs: 60,
        };
        assert_eq!(err.to_string(), "rate limited, retry after 60 seconds");
    }
}
