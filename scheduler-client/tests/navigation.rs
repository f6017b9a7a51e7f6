mod common;

use common::{MockApi, anonymous_client, client_with};
use scheduler_client::{MemoryTokenStorage, NavigationError, RouteName};
use serde_json::json;

#[tokio::test]
async fn auth_route_without_user_redirects_to_login() {
    let mock = MockApi::default();
    let base_url = mock.spawn().await;
    let mut client = anonymous_client(&base_url);

    let landed = client.navigate("/dashboard").await.expect("navigation");

    assert_eq!(landed.name, RouteName::Login);
    assert!(mock.requests().is_empty());
}

#[tokio::test]
async fn guest_route_with_user_redirects_home() {
    let mock = MockApi::default();
    mock.respond("GET", "/api/profile", 200, json!({"data": {"id": 1, "name": "Ann"}}));
    let base_url = mock.spawn().await;
    let mut client = client_with(&base_url, MemoryTokenStorage::with_token("tok-1"));

    let landed = client.navigate("/login").await.expect("navigation");

    assert_eq!(landed.name, RouteName::Home);
    assert!(client.session().is_authenticated());
    assert_eq!(
        mock.last("GET", "/api/profile").authorization.as_deref(),
        Some("Bearer tok-1")
    );
}

#[tokio::test]
async fn rejected_token_is_dropped_and_user_sent_to_login() {
    let mock = MockApi::default();
    mock.respond("GET", "/api/profile", 401, json!({"message": "Unauthenticated."}));
    let base_url = mock.spawn().await;
    let mut client = client_with(&base_url, MemoryTokenStorage::with_token("expired"));

    let landed = client
        .navigate_to(RouteName::PostAnalytics)
        .await
        .expect("navigation");

    assert_eq!(landed.name, RouteName::Login);
    assert!(client.session().token().is_none());
    // Second guard pass on /login runs without a token, so only one profile call.
    assert_eq!(mock.requests().len(), 1);
}

#[tokio::test]
async fn signed_in_user_reaches_parameterized_route() {
    let mock = MockApi::default();
    mock.respond("GET", "/api/profile", 200, json!({"id": 7}));
    let base_url = mock.spawn().await;
    let mut client = client_with(&base_url, MemoryTokenStorage::with_token("tok-7"));

    let landed = client.navigate("/posts/edit/12").await.expect("navigation");

    assert_eq!(landed.name, RouteName::PostEdit);
    assert_eq!(landed.param("id"), Some("12"));
    assert_eq!(
        client.navigator.current().map(|route| route.name),
        Some(RouteName::PostEdit)
    );
    assert_eq!(client.auth.user().map(|user| user.id), Some(7));
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let mock = MockApi::default();
    let base_url = mock.spawn().await;
    let mut client = anonymous_client(&base_url);

    let err = client.navigate("/nowhere").await.expect_err("unknown route");
    assert_eq!(err, NavigationError::NotFound("/nowhere".to_string()));
}
