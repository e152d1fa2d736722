//! HubSpot user records and their mapping to the canonical shape.

use serde::Deserialize;

use elba_connector::user::{display_name_from, ConnectorUser};

/// Top-level shape of `GET /settings/v3/users`.
#[derive(Debug, Deserialize)]
pub struct UserListResponse {
    pub results: Vec<serde_json::Value>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub next: Option<PagingNext>,
}

#[derive(Debug, Deserialize)]
pub struct PagingNext {
    pub after: String,
}

impl UserListResponse {
    /// The opaque continuation token, when more pages remain.
    #[must_use]
    pub fn next_token(&self) -> Option<String> {
        self.paging
            .as_ref()
            .and_then(|paging| paging.next.as_ref())
            .map(|next| next.after.clone())
    }
}

/// A settings-API user record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HubSpotUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub super_admin: Option<bool>,
}

/// Validate raw records one by one; failures go to the invalid bucket.
#[must_use]
pub fn parse_users(records: &[serde_json::Value]) -> (Vec<HubSpotUser>, Vec<serde_json::Value>) {
    let mut valid = Vec::with_capacity(records.len());
    let mut invalid = Vec::new();
    for record in records {
        match serde_json::from_value::<HubSpotUser>(record.clone()) {
            Ok(user) => valid.push(user),
            Err(_) => invalid.push(record.clone()),
        }
    }
    (valid, invalid)
}

/// Map one validated HubSpot user to the canonical record.
///
/// `portal_id` is the account's routing attribute, used for the profile URL.
/// Super-admins are never proposed for deactivation.
#[must_use]
pub fn map_user(user: &HubSpotUser, portal_id: Option<&str>) -> ConnectorUser {
    let full_name = match (user.first_name.as_deref(), user.last_name.as_deref()) {
        (Some(first), Some(last)) => Some(format!("{first} {last}")),
        (Some(first), None) => Some(first.to_string()),
        (None, Some(last)) => Some(last.to_string()),
        (None, None) => None,
    };
    let is_super_admin = user.super_admin.unwrap_or(false);
    let role = if is_super_admin { "superAdmin" } else { "user" };
    ConnectorUser {
        display_name: display_name_from(&[full_name.as_deref(), Some(&user.email)], &user.id),
        email: Some(user.email.clone()),
        role: Some(role.to_string()),
        is_suspendable: Some(!is_super_admin),
        url: portal_id
            .map(|portal| format!("https://app.hubspot.com/settings/{portal}/users/user/{}", user.id)),
        ..ConnectorUser::new(user.id.clone(), String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ada() -> serde_json::Value {
        json!({
            "id": "u-1",
            "email": "ada@example.com",
            "firstName": "Ada",
            "lastName": "Lovelace",
            "superAdmin": false,
        })
    }

    #[test]
    fn list_response_exposes_next_token() {
        let with_next: UserListResponse = serde_json::from_value(json!({
            "results": [],
            "paging": { "next": { "after": "abc123", "link": "https://api.hubapi.com/..." } },
        }))
        .unwrap();
        assert_eq!(with_next.next_token().as_deref(), Some("abc123"));

        let terminal: UserListResponse =
            serde_json::from_value(json!({ "results": [] })).unwrap();
        assert_eq!(terminal.next_token(), None);
    }

    #[test]
    fn malformed_record_is_shunted_not_fatal() {
        let records = vec![ada(), json!({ "id": "u-2" })];
        let (valid, invalid) = parse_users(&records);
        assert_eq!(valid.len(), 1);
        assert_eq!(invalid.len(), 1);
    }

    #[test]
    fn maps_name_role_and_profile_url() {
        let (valid, _) = parse_users(&[ada()]);
        let user = map_user(&valid[0], Some("12345"));
        assert_eq!(user.display_name, "Ada Lovelace");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert_eq!(user.role.as_deref(), Some("user"));
        assert_eq!(user.is_suspendable, Some(true));
        assert_eq!(
            user.url.as_deref(),
            Some("https://app.hubspot.com/settings/12345/users/user/u-1")
        );
    }

    #[test]
    fn display_name_falls_back_to_email() {
        let user = HubSpotUser {
            id: "u-3".into(),
            email: "bob@example.com".into(),
            first_name: None,
            last_name: None,
            super_admin: None,
        };
        assert_eq!(map_user(&user, None).display_name, "bob@example.com");
    }

    #[test]
    fn super_admin_is_not_suspendable() {
        let user = HubSpotUser {
            super_admin: Some(true),
            ..serde_json::from_value(ada()).unwrap()
        };
        let mapped = map_user(&user, None);
        assert_eq!(mapped.role.as_deref(), Some("superAdmin"));
        assert_eq!(mapped.is_suspendable, Some(false));
        assert_eq!(mapped.url, None);
    }

    #[test]
    fn mapping_is_pure() {
        let (valid, _) = parse_users(&[ada()]);
        assert_eq!(map_user(&valid[0], Some("1")), map_user(&valid[0], Some("1")));
    }
}
