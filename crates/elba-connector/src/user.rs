//! Canonical user records pushed to the governance platform.
//!
//! Produced transiently per page by the vendor mappers and never persisted
//! locally. Mappers must be pure: same vendor record in, byte-identical
//! canonical record out.

use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;

/// How the user authenticates at the vendor, when the vendor exposes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    Sso,
    Password,
    Mfa,
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthMethod::Sso => write!(f, "sso"),
            AuthMethod::Password => write!(f, "password"),
            AuthMethod::Mfa => write!(f, "mfa"),
        }
    }
}

/// The platform-neutral user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorUser {
    /// Vendor-native identifier.
    pub id: String,

    /// Human-readable name, derived by the mapper's fallback chain.
    pub display_name: String,

    /// Primary email. Nullable: some vendors expose none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Secondary emails, when the vendor exposes them.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_emails: Vec<String>,

    /// Vendor role, normalized per connector.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Authentication method tag.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authentication_method: Option<AuthMethod>,

    /// Whether the platform may propose this account for deactivation.
    /// Owners, admins and the installing auth user must carry `Some(false)`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_suspendable: Option<bool>,

    /// Link to the user's profile at the vendor, built from the
    /// organisation's routing attributes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ConnectorUser {
    /// Minimal record with the derived display name; optional fields are
    /// filled in by the vendor mapper.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            email: None,
            additional_emails: Vec::new(),
            role: None,
            authentication_method: None,
            is_suspendable: None,
            url: None,
        }
    }
}

/// Pick the first usable display-name candidate, in order of preference
/// (explicit full name, then username, then email), falling back to the
/// vendor id.
#[must_use]
pub fn display_name_from(candidates: &[Option<&str>], fallback: &str) -> String {
    candidates
        .iter()
        .flatten()
        .map(|candidate| candidate.trim())
        .find(|candidate| !candidate.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Fixed role ranking for vendors that attach a role list to each user.
///
/// `highest` returns the first ranked role present in the user's list,
/// compared case-insensitively.
#[derive(Debug, Clone, Copy)]
pub struct RolePriority {
    ranking: &'static [&'static str],
}

impl RolePriority {
    #[must_use]
    pub const fn new(ranking: &'static [&'static str]) -> Self {
        Self { ranking }
    }

    /// The highest-priority role present in `roles`, if any.
    pub fn highest<'a, I>(&self, roles: I) -> Option<&'static str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let roles: Vec<&str> = roles.into_iter().collect();
        self.ranking
            .iter()
            .find(|ranked| roles.iter().any(|role| role.eq_ignore_ascii_case(ranked)))
            .copied()
    }
}

/// One fetched, validated and mapped page of vendor users.
///
/// Records that failed per-record validation are retained raw in
/// `invalid_records`; a single malformed record never aborts a page.
#[derive(Debug, Clone, Default)]
pub struct UserPage {
    /// Users that passed validation, already mapped to the canonical shape.
    pub valid_users: Vec<ConnectorUser>,
    /// Raw records that failed validation, kept for logging.
    pub invalid_records: Vec<serde_json::Value>,
    /// Continuation cursor; `None` means this was the last page.
    pub next_cursor: Option<Cursor>,
}
