//! airSlate user records and their mapping to the canonical shape.

use serde::Deserialize;

use elba_connector::user::{display_name_from, ConnectorUser, RolePriority};

/// Fixed ranking used to pick one role from a user's role list.
pub const ROLE_PRIORITY: RolePriority = RolePriority::new(&[
    "Admin",
    "RestrictedAdmin",
    "Adjudicator",
    "Billing",
    "Requester",
    "LimitedUser",
]);

/// Top-level JSON:API shape of the organisation users listing.
#[derive(Debug, Deserialize)]
pub struct UserListResponse {
    pub data: Vec<serde_json::Value>,
}

/// A JSON:API user resource.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AirSlateUser {
    pub id: String,
    pub attributes: UserAttributes,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserAttributes {
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Validate raw resources one by one; failures go to the invalid bucket.
#[must_use]
pub fn parse_users(records: &[serde_json::Value]) -> (Vec<AirSlateUser>, Vec<serde_json::Value>) {
    let mut valid = Vec::with_capacity(records.len());
    let mut invalid = Vec::new();
    for record in records {
        match serde_json::from_value::<AirSlateUser>(record.clone()) {
            Ok(user) => valid.push(user),
            Err(_) => invalid.push(record.clone()),
        }
    }
    (valid, invalid)
}

/// Map one validated airSlate user to the canonical record.
///
/// The role is the highest-ranked entry of the user's role list; admins are
/// never proposed for deactivation.
#[must_use]
pub fn map_user(user: &AirSlateUser, organization_id: &str) -> ConnectorUser {
    let attributes = &user.attributes;
    let full_name = match (attributes.first_name.as_deref(), attributes.last_name.as_deref()) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(first), None) => Some(first.to_string()),
        (None, Some(last)) => Some(last.to_string()),
        (None, None) => None,
    };
    let role = ROLE_PRIORITY.highest(attributes.roles.iter().map(String::as_str));
    ConnectorUser {
        display_name: display_name_from(
            &[full_name.as_deref(), Some(&attributes.email)],
            &user.id,
        ),
        email: Some(attributes.email.clone()),
        role: role.map(str::to_string),
        is_suspendable: Some(role != Some("Admin")),
        url: Some(format!(
            "https://app.airslate.com/organizations/{organization_id}/users/{}",
            user.id
        )),
        ..ConnectorUser::new(user.id.clone(), String::new())
    }
}
