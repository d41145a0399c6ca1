//! E2E tests for registration, local login, and the profile endpoint

mod common;

use common::{TestServer, no_redirect_client};

#[tokio::test]
async fn test_register_succeeds() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/register"))
        .form(&[
            ("email", "a@b.com"),
            ("username", "alice"),
            ("password", "pw123"),
        ])
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["message"], "Successful");
}

#[tokio::test]
async fn test_register_duplicate_username_fails() {
    let server = TestServer::new().await;
    server.register_user("alice", "a@b.com", "pw123").await;

    let response = server
        .client
        .post(server.url("/register"))
        .form(&[
            ("email", "other@b.com"),
            ("username", "alice"),
            ("password", "pw456"),
        ])
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.status(), 422);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert!(body["error"].is_string());

    assert_eq!(server.state.db.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_login_success_redirects_and_attaches_session() {
    let server = TestServer::new().await;
    server.register_user("alice", "a@b.com", "pw123").await;

    let response = server
        .client
        .post(server.url("/login"))
        .form(&[("username", "alice"), ("password", "pw123")])
        .send()
        .await
        .expect("request succeeds");

    // The redirect was followed to the acknowledgment page.
    assert_eq!(response.status(), 200);
    assert_eq!(response.url().path(), "/login-success");
    let body = response.text().await.expect("response body");
    assert_eq!(body, "Login Attempt was successful.");

    // The session cookie now resolves to the authenticated user.
    let response = server
        .client
        .get(server.url("/profile"))
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["message"], "You made it to the secured profie alice");
}

#[tokio::test]
async fn test_login_wrong_password_redirects_to_failure() {
    let server = TestServer::new().await;
    server.register_user("alice", "a@b.com", "pw123").await;

    let client = no_redirect_client();
    let response = client
        .post(server.url("/login"))
        .form(&[("username", "alice"), ("password", "wrong")])
        .send()
        .await
        .expect("request succeeds");

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert_eq!(location, "/login-failure");
}

#[tokio::test]
async fn test_login_unknown_user_redirects_to_failure() {
    let server = TestServer::new().await;

    let response = server
        .client
        .post(server.url("/login"))
        .form(&[("username", "ghost"), ("password", "pw123")])
        .send()
        .await
        .expect("request succeeds");

    assert_eq!(response.url().path(), "/login-failure");
    let body = response.text().await.expect("response body");
    assert_eq!(body, "Login Attempt Failed.");
}

#[tokio::test]
async fn test_profile_without_session_is_unauthenticated() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/profile"))
        .send()
        .await
        .expect("request succeeds");

    // No distinct status for the unauthenticated case.
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["message"], "You are not authenticated");
}

#[tokio::test]
async fn test_anonymous_request_receives_session_cookie() {
    let server = TestServer::new().await;

    let client = no_redirect_client();
    let response = client
        .get(server.url("/profile"))
        .send()
        .await
        .expect("request succeeds");

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header");
    assert!(set_cookie.contains("sid="));
    assert!(set_cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_logout_detaches_session() {
    let server = TestServer::new().await;
    server.register_user("alice", "a@b.com", "pw123").await;

    let response = server
        .client
        .post(server.url("/login"))
        .form(&[("username", "alice"), ("password", "pw123")])
        .send()
        .await
        .expect("request succeeds");
    assert_eq!(response.url().path(), "/login-success");

    let response = server
        .client
        .post(server.url("/logout"))
        .send()
        .await
        .expect("request succeeds");
    // Followed to the login page.
    assert_eq!(response.status(), 200);
    assert_eq!(response.url().path(), "/login");

    let response = server
        .client
        .get(server.url("/profile"))
        .send()
        .await
        .expect("request succeeds");
    let body: serde_json::Value = response.json().await.expect("json body");
    assert_eq!(body["message"], "You are not authenticated");
}
