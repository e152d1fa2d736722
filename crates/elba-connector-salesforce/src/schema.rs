//! Salesforce user records and their mapping to the canonical shape.

use serde::Deserialize;

use elba_connector::user::{display_name_from, ConnectorUser};

/// Profile name that marks an org administrator.
const ADMIN_PROFILE: &str = "System Administrator";

/// Top-level shape of a SOQL query response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    pub done: bool,
    #[serde(default)]
    pub next_records_url: Option<String>,
    pub records: Vec<serde_json::Value>,
}

impl QueryResponse {
    /// The ready-to-fetch continuation URL, when the query is not done.
    #[must_use]
    pub fn next_url(&self) -> Option<String> {
        if self.done {
            None
        } else {
            self.next_records_url.clone()
        }
    }
}

/// A `User` sObject row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SalesforceUser {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
    #[serde(rename = "Email", default)]
    pub email: Option<String>,
    #[serde(rename = "Username", default)]
    pub username: Option<String>,
    #[serde(rename = "Profile", default)]
    pub profile: Option<ProfileRef>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProfileRef {
    #[serde(rename = "Name", default)]
    pub name: Option<String>,
}

/// Validate raw records one by one; failures go to the invalid bucket.
#[must_use]
pub fn parse_users(
    records: &[serde_json::Value],
) -> (Vec<SalesforceUser>, Vec<serde_json::Value>) {
    let mut valid = Vec::with_capacity(records.len());
    let mut invalid = Vec::new();
    for record in records {
        match serde_json::from_value::<SalesforceUser>(record.clone()) {
            Ok(user) => valid.push(user),
            Err(_) => invalid.push(record.clone()),
        }
    }
    (valid, invalid)
}

/// Map one validated Salesforce user to the canonical record.
///
/// System Administrators and the installing auth user are never proposed for
/// deactivation.
#[must_use]
pub fn map_user(
    user: &SalesforceUser,
    instance_url: &str,
    auth_user_id: Option<&str>,
) -> ConnectorUser {
    let profile_name = user.profile.as_ref().and_then(|profile| profile.name.clone());
    let is_admin = profile_name.as_deref() == Some(ADMIN_PROFILE);
    let is_auth_user = auth_user_id == Some(user.id.as_str());
    ConnectorUser {
        display_name: display_name_from(
            &[
                user.name.as_deref(),
                user.username.as_deref(),
                user.email.as_deref(),
            ],
            &user.id,
        ),
        email: user.email.clone(),
        role: profile_name,
        is_suspendable: Some(!is_admin && !is_auth_user),
        url: Some(format!(
            "{}/lightning/r/User/{}/view",
            instance_url.trim_end_matches('/'),
            user.id
        )),
        ..ConnectorUser::new(user.id.clone(), String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ada() -> serde_json::Value {
        json!({
            "attributes": { "type": "User", "url": "/services/data/v60.0/sobjects/User/005xx1" },
            "Id": "005xx1",
            "Name": "Ada Lovelace",
            "Email": "ada@example.com",
            "Username": "ada@example.com.prod",
            "Profile": { "Name": "Standard User" },
        })
    }

    #[test]
    fn query_response_next_url_requires_not_done() {
        let ongoing: QueryResponse = serde_json::from_value(json!({
            "totalSize": 4000,
            "done": false,
            "nextRecordsUrl": "/services/data/v60.0/query/01gxx-2000",
            "records": [],
        }))
        .unwrap();
        assert_eq!(
            ongoing.next_url().as_deref(),
            Some("/services/data/v60.0/query/01gxx-2000")
        );

        let terminal: QueryResponse = serde_json::from_value(json!({
            "totalSize": 2,
            "done": true,
            "records": [],
        }))
        .unwrap();
        assert_eq!(terminal.next_url(), None);
    }

    #[test]
    fn malformed_record_is_shunted_not_fatal() {
        let (valid, invalid) = parse_users(&[ada(), json!({ "Name": "no id" })]);
        assert_eq!(valid.len(), 1);
        assert_eq!(invalid.len(), 1);
    }

    #[test]
    fn maps_profile_role_and_lightning_url() {
        let (valid, _) = parse_users(&[ada()]);
        let user = map_user(&valid[0], "https://acme.my.salesforce.com/", None);
        assert_eq!(user.display_name, "Ada Lovelace");
        assert_eq!(user.role.as_deref(), Some("Standard User"));
        assert_eq!(user.is_suspendable, Some(true));
        assert_eq!(
            user.url.as_deref(),
            Some("https://acme.my.salesforce.com/lightning/r/User/005xx1/view")
        );
    }

    #[test]
    fn admin_profile_and_auth_user_are_not_suspendable() {
        let (valid, _) = parse_users(&[ada()]);

        let admin = SalesforceUser {
            profile: Some(ProfileRef {
                name: Some(ADMIN_PROFILE.to_string()),
            }),
            ..valid[0].clone()
        };
        assert_eq!(
            map_user(&admin, "https://x.my.salesforce.com", None).is_suspendable,
            Some(false)
        );
        assert_eq!(
            map_user(&valid[0], "https://x.my.salesforce.com", Some("005xx1")).is_suspendable,
            Some(false)
        );
    }

    #[test]
    fn mapping_is_pure() {
        let (valid, _) = parse_users(&[ada()]);
        assert_eq!(
            map_user(&valid[0], "https://x.my.salesforce.com", None),
            map_user(&valid[0], "https://x.my.salesforce.com", None)
        );
    }
}
