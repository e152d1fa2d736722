//! Organisation credential record.
//!
//! One row per installed integration instance, loaded from the store at the
//! start of every page iteration. Credentials stay encrypted until the driver
//! opens them; routing attributes are the vendor-dependent grab bag
//! (subdomain, workspace id, instance URL, auth user id) mappers need to
//! build profile URLs and suspendability rules.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::{ConnectorError, ConnectorResult};

/// An installed integration instance for one tenant.
#[derive(Debug, Clone)]
pub struct Organisation {
    /// Opaque organisation identifier.
    pub id: Uuid,
    /// Vendor slug ("gitlab", "hubspot", ...).
    pub vendor: String,
    /// Data-residency region tag.
    pub region: String,
    /// AEAD ciphertext of the vendor credential set (JSON).
    pub credentials_encrypted: Vec<u8>,
    /// Cipher key version, for master-key rotation.
    pub credentials_key_version: i32,
    /// Vendor-specific routing attributes.
    pub routing: serde_json::Value,
    /// Install (or re-install) timestamp. A re-install refreshes this, which
    /// is what invalidates stale continuation chains.
    pub created_at: DateTime<Utc>,
}

impl Organisation {
    /// A routing attribute as a string, tolerating numeric JSON values.
    #[must_use]
    pub fn routing_str(&self, key: &str) -> Option<String> {
        match self.routing.get(key)? {
            serde_json::Value::String(value) => Some(value.clone()),
            serde_json::Value::Number(value) => Some(value.to_string()),
            _ => None,
        }
    }

    /// A routing attribute that the connector cannot run without.
    pub fn require_routing_str(&self, key: &str) -> ConnectorResult<String> {
        self.routing_str(key).ok_or_else(|| {
            ConnectorError::invalid_configuration(format!(
                "organisation {} is missing routing attribute '{key}'",
                self.id
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn organisation(routing: serde_json::Value) -> Organisation {
        Organisation {
            id: Uuid::new_v4(),
            vendor: "gitlab".into(),
            region: "eu".into(),
            credentials_encrypted: Vec::new(),
            credentials_key_version: 1,
            routing,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn routing_reads_strings_and_numbers() {
        let org = organisation(serde_json::json!({
            "subdomain": "acme",
            "auth_user_id": 42,
        }));
        assert_eq!(org.routing_str("subdomain").as_deref(), Some("acme"));
        assert_eq!(org.routing_str("auth_user_id").as_deref(), Some("42"));
        assert_eq!(org.routing_str("missing"), None);
    }

    #[test]
    fn required_routing_failure_names_the_attribute() {
        let org = organisation(serde_json::json!({}));
        let err = org.require_routing_str("instance_url").unwrap_err();
        assert!(err.to_string().contains("instance_url"));
        assert!(!err.is_retriable());
    }
}
