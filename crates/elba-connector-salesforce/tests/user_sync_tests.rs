//! End-to-end user sync tests against a mocked Salesforce instance.

#![cfg(feature = "integration")]

use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use elba_connector::cursor::Cursor;
use elba_connector::traits::UserSource;
use elba_connector_salesforce::{SalesforceClient, SalesforceConfig, SalesforceCredentials};

fn client(server: &MockServer) -> SalesforceClient {
    SalesforceClient::new(
        SalesforceConfig::default(),
        SalesforceCredentials {
            access_token: "token".into(),
            refresh_token: "refresh".into(),
        },
        server.uri(),
        None,
    )
    .unwrap()
}

fn salesforce_user(id: &str, name: &str) -> serde_json::Value {
    json!({
        "attributes": { "type": "User" },
        "Id": id,
        "Name": name,
        "Email": format!("{id}@example.com"),
        "Username": format!("{id}@example.com.prod"),
        "Profile": { "Name": "Standard User" },
    })
}

#[tokio::test]
async fn follows_next_records_url_until_done() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/services/data/v60.0/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 3,
            "done": false,
            "nextRecordsUrl": "/services/data/v60.0/query/01gxx-2000",
            "records": [salesforce_user("005a", "Ada"), salesforce_user("005b", "Bob")],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/services/data/v60.0/query/01gxx-2000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalSize": 3,
            "done": true,
            "records": [salesforce_user("005c", "Carol")],
        })))
        .mount(&server)
        .await;

    let client = client(&server);
    let first = client.list_users_page(None).await.unwrap();
    assert_eq!(first.valid_users.len(), 2);
    assert_eq!(
        first.next_cursor,
        Some(Cursor::new("/services/data/v60.0/query/01gxx-2000"))
    );

    let second = client
        .list_users_page(first.next_cursor.as_ref())
        .await
        .unwrap();
    assert_eq!(second.valid_users.len(), 1);
    assert_eq!(second.next_cursor, None);
    assert_eq!(
        second.valid_users[0].url.as_deref().unwrap(),
        &format!("{}/lightning/r/User/005c/view", server.uri())
    );
}

#[tokio::test]
async fn deprovision_is_a_deactivation_patch() {
    let server = MockServer::start().await;

    Mock::given(method("PATCH"))
        .and(path("/services/data/v60.0/sobjects/User/005a"))
        .and(body_partial_json(json!({ "IsActive": false })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/services/data/v60.0/sobjects/User/005gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server);
    client.delete_user("005a").await.unwrap();
    // Already gone: still success.
    client.delete_user("005gone").await.unwrap();
}

#[tokio::test]
async fn server_error_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/services/data/v60.0/query"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).list_users_page(None).await.unwrap_err();
    assert!(err.is_retriable());
}
