//! monday.com user records and their mapping to the canonical shape.

use serde::{Deserialize, Deserializer};

use elba_connector::user::{display_name_from, ConnectorUser};

/// GraphQL response envelope.
#[derive(Debug, Deserialize)]
pub struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub extensions: Option<serde_json::Value>,
}

impl GraphQlError {
    /// The vendor's machine-readable error code, when present.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|extensions| extensions.get("code"))
            .and_then(|code| code.as_str())
    }
}

/// A `users` query entry. API ids are the `ID` scalar, which older API
/// versions serialize as a number.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MondayUser {
    #[serde(deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub is_admin: Option<bool>,
    #[serde(default)]
    pub is_guest: Option<bool>,
    #[serde(default)]
    pub is_view_only: Option<bool>,
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(id) => Ok(id),
        serde_json::Value::Number(id) => Ok(id.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// Validate raw records one by one; failures go to the invalid bucket.
#[must_use]
pub fn parse_users(records: &[serde_json::Value]) -> (Vec<MondayUser>, Vec<serde_json::Value>) {
    let mut valid = Vec::with_capacity(records.len());
    let mut invalid = Vec::new();
    for record in records {
        match serde_json::from_value::<MondayUser>(record.clone()) {
            Ok(user) => valid.push(user),
            Err(_) => invalid.push(record.clone()),
        }
    }
    (valid, invalid)
}

/// Map one validated monday user to the canonical record.
///
/// The role is derived from the account flags, highest first: admin, then
/// guest, then viewer, else member. Admins are never proposed for
/// deactivation.
#[must_use]
pub fn map_user(user: &MondayUser) -> ConnectorUser {
    let is_admin = user.is_admin.unwrap_or(false);
    let role = if is_admin {
        "admin"
    } else if user.is_guest.unwrap_or(false) {
        "guest"
    } else if user.is_view_only.unwrap_or(false) {
        "viewer"
    } else {
        "member"
    };
    ConnectorUser {
        display_name: display_name_from(
            &[user.name.as_deref(), user.email.as_deref()],
            &user.id,
        ),
        email: user.email.clone(),
        role: Some(role.to_string()),
        is_suspendable: Some(!is_admin),
        url: user.url.clone(),
        ..ConnectorUser::new(user.id.clone(), String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ada() -> serde_json::Value {
        json!({
            "id": "1001",
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "url": "https://acme.monday.com/users/1001",
            "is_admin": false,
            "is_guest": false,
            "is_view_only": false,
        })
    }

    #[test]
    fn numeric_ids_are_tolerated() {
        let (valid, _) = parse_users(&[json!({ "id": 1002, "name": "Bob" })]);
        assert_eq!(valid[0].id, "1002");
    }

    #[test]
    fn malformed_record_is_shunted_not_fatal() {
        let (valid, invalid) = parse_users(&[ada(), json!({ "name": "no id" })]);
        assert_eq!(valid.len(), 1);
        assert_eq!(invalid.len(), 1);
    }

    #[test]
    fn role_flags_rank_admin_guest_viewer_member() {
        let (valid, _) = parse_users(&[ada()]);
        assert_eq!(map_user(&valid[0]).role.as_deref(), Some("member"));

        let admin = MondayUser {
            is_admin: Some(true),
            is_guest: Some(true),
            ..valid[0].clone()
        };
        let mapped = map_user(&admin);
        assert_eq!(mapped.role.as_deref(), Some("admin"));
        assert_eq!(mapped.is_suspendable, Some(false));

        let guest = MondayUser {
            is_guest: Some(true),
            ..valid[0].clone()
        };
        assert_eq!(map_user(&guest).role.as_deref(), Some("guest"));

        let viewer = MondayUser {
            is_view_only: Some(true),
            ..valid[0].clone()
        };
        assert_eq!(map_user(&viewer).role.as_deref(), Some("viewer"));
    }

    #[test]
    fn maps_profile_url_and_display_name() {
        let (valid, _) = parse_users(&[ada()]);
        let user = map_user(&valid[0]);
        assert_eq!(user.display_name, "Ada Lovelace");
        assert_eq!(user.url.as_deref(), Some("https://acme.monday.com/users/1001"));

        let nameless = MondayUser {
            name: None,
            ..valid[0].clone()
        };
        assert_eq!(map_user(&nameless).display_name, "ada@example.com");
    }

    #[test]
    fn graphql_error_code_extraction() {
        let error: GraphQlError = serde_json::from_value(json!({
            "message": "User not found",
            "extensions": { "code": "InvalidUserIdException" },
        }))
        .unwrap();
        assert_eq!(error.code(), Some("InvalidUserIdException"));

        let bare: GraphQlError =
            serde_json::from_value(json!({ "message": "boom" })).unwrap();
        assert_eq!(bare.code(), None);
    }

    #[test]
    fn mapping_is_pure() {
        let (valid, _) = parse_users(&[ada()]);
        assert_eq!(map_user(&valid[0]), map_user(&valid[0]));
    }
}
