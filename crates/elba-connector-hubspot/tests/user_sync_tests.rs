//! End-to-end user sync tests against a mocked HubSpot API.

#![cfg(feature = "integration")]

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use elba_connector::cursor::Cursor;
use elba_connector::traits::UserSource;
use elba_connector_hubspot::{HubSpotClient, HubSpotConfig, HubSpotCredentials};

fn client(server: &MockServer) -> HubSpotClient {
    HubSpotClient::new(
        HubSpotConfig {
            base_url: server.uri(),
            page_size: 2,
            ..HubSpotConfig::default()
        },
        HubSpotCredentials {
            access_token: "token".into(),
            refresh_token: "refresh".into(),
        },
        Some("12345".into()),
    )
    .unwrap()
}

fn hubspot_user(id: &str, email: &str) -> serde_json::Value {
    json!({
        "id": id,
        "email": email,
        "firstName": "Test",
        "lastName": id.to_uppercase(),
        "superAdmin": false,
    })
}

#[tokio::test]
async fn paginates_via_after_token_until_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/settings/v3/users"))
        .and(query_param("after", "tok-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [hubspot_user("u3", "c@example.com")],
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/settings/v3/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                hubspot_user("u1", "a@example.com"),
                hubspot_user("u2", "b@example.com"),
            ],
            "paging": { "next": { "after": "tok-2" } },
        })))
        .mount(&server)
        .await;

    let first = client(&server).list_users_page(None).await.unwrap();
    assert_eq!(first.valid_users.len(), 2);
    assert_eq!(first.next_cursor, Some(Cursor::new("tok-2")));
    assert_eq!(
        first.valid_users[0].url.as_deref(),
        Some("https://app.hubspot.com/settings/12345/users/user/u1")
    );

    let second = client(&server)
        .list_users_page(first.next_cursor.as_ref())
        .await
        .unwrap();
    assert_eq!(second.valid_users.len(), 1);
    assert_eq!(second.next_cursor, None);
}

#[tokio::test]
async fn invalid_records_do_not_abort_the_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/settings/v3/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [hubspot_user("u1", "a@example.com"), { "id": "u2" }],
        })))
        .mount(&server)
        .await;

    let page = client(&server).list_users_page(None).await.unwrap();
    assert_eq!(page.valid_users.len(), 1);
    assert_eq!(page.invalid_records.len(), 1);
}

#[tokio::test]
async fn delete_is_idempotent_on_404() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/settings/v3/users/u9"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    client.delete_user("u9").await.unwrap();
    client.delete_user("u9").await.unwrap();
}
