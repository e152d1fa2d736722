//! GitLab user records and their mapping to the canonical shape.

use serde::Deserialize;

use elba_connector::user::{display_name_from, ConnectorUser};

/// A user as returned by `GET /api/v4/users`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitLabUser {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub public_email: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub bot: Option<bool>,
    #[serde(default)]
    pub web_url: Option<String>,
}

impl GitLabUser {
    /// Bot accounts are service principals, not workforce users.
    #[must_use]
    pub fn is_bot(&self) -> bool {
        self.bot.unwrap_or(false)
    }
}

/// Validate raw records one by one. Records that fail the schema land in the
/// invalid bucket; they never abort the page.
#[must_use]
pub fn parse_users(records: &[serde_json::Value]) -> (Vec<GitLabUser>, Vec<serde_json::Value>) {
    let mut valid = Vec::with_capacity(records.len());
    let mut invalid = Vec::new();
    for record in records {
        match serde_json::from_value::<GitLabUser>(record.clone()) {
            Ok(user) => valid.push(user),
            Err(_) => invalid.push(record.clone()),
        }
    }
    (valid, invalid)
}

/// Map one validated GitLab user to the canonical record.
///
/// `auth_user_id` is the account that installed the integration; it must
/// never be proposed for deactivation, and neither must instance admins.
#[must_use]
pub fn map_user(user: &GitLabUser, auth_user_id: Option<&str>) -> ConnectorUser {
    let id = user.id.to_string();
    let is_admin = user.is_admin.unwrap_or(false);
    let is_auth_user = auth_user_id == Some(id.as_str());
    let role = if is_admin { "admin" } else { "member" };
    ConnectorUser {
        display_name: display_name_from(&[user.name.as_deref(), Some(&user.username)], &id),
        email: user.email.clone().or_else(|| user.public_email.clone()),
        role: Some(role.to_string()),
        is_suspendable: Some(!is_admin && !is_auth_user),
        url: user.web_url.clone(),
        ..ConnectorUser::new(id, String::new())
    }
}
