//! Registration, login, account self-service, and password reset over HTTP.

use reqwest::StatusCode;
use serde_json::json;

use bookaholic_core::Role;
use bookaholic_integration_tests::{PASSWORD, TestApp, email_for, read, send};

fn reset_token(text_body: &str) -> String {
    let (_, rest) = text_body
        .split_once("/resetpassword/")
        .expect("reset link missing from email");
    rest.split_whitespace()
        .next()
        .expect("reset token missing")
        .to_owned()
}

#[tokio::test]
async fn test_register_logs_in_and_hides_credentials() {
    let app = TestApp::spawn().await;
    let (client, user) = app.register("Reader", Role::User).await;

    assert_eq!(user["role"], "user");
    assert_eq!(user["email"], "reader@example.com");
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());

    let (status, body) = send(client.get(app.api("/auth/me"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["id"], user["id"]);
}

#[tokio::test]
async fn test_register_rejects_admin_role() {
    let app = TestApp::spawn().await;
    let (status, body) = send(TestApp::client().post(app.api("/auth/register")).json(&json!({
        "name": "Mallory",
        "email": "mallory@example.com",
        "password": PASSWORD,
        "role": "admin",
    })))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_register_rejects_duplicate_email() {
    let app = TestApp::spawn().await;
    app.register("Reader", Role::User).await;

    let (status, body) = send(TestApp::client().post(app.api("/auth/register")).json(&json!({
        "name": "Reader Again",
        "email": email_for("Reader"),
        "password": PASSWORD,
    })))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_login_statuses() {
    let app = TestApp::spawn().await;
    app.register("Reader", Role::User).await;
    let client = TestApp::client();

    let (status, _) = send(
        client
            .post(app.api("/auth/login"))
            .json(&json!({"email": email_for("Reader")})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        client
            .post(app.api("/auth/login"))
            .json(&json!({"email": email_for("Reader"), "password": "wrong-password"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid credentials");

    let (status, _) = send(
        client
            .post(app.api("/auth/login"))
            .json(&json!({"email": "nobody@example.com", "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    app.login(&client, &email_for("Reader"), PASSWORD).await;
    let (status, _) = send(client.get(app.api("/auth/me"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_logout_ends_session() {
    let app = TestApp::spawn().await;
    let (client, _) = app.register("Reader", Role::User).await;

    let (status, body) = send(client.get(app.api("/auth/logout"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "data": {}}));

    let (status, body) = send(client.get(app.api("/auth/me"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized to access this route");
}

#[tokio::test]
async fn test_me_requires_session() {
    let app = TestApp::spawn().await;
    let (status, body) = send(TestApp::client().get(app.api("/auth/me"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_update_details_and_password() {
    let app = TestApp::spawn().await;
    let (client, _) = app.register("Reader", Role::User).await;

    let (status, body) = send(
        client
            .put(app.api("/auth/updatedetails"))
            .json(&json!({"name": "Renamed", "email": "renamed@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Renamed");
    assert_eq!(body["data"]["email"], "renamed@example.com");

    let (status, _) = send(client.put(app.api("/auth/updatepassword")).json(&json!({
        "currentPassword": "not-my-password",
        "newPassword": "654321",
    })))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(client.put(app.api("/auth/updatepassword")).json(&json!({
        "currentPassword": PASSWORD,
        "newPassword": "654321",
    })))
    .await;
    assert_eq!(status, StatusCode::OK);

    app.login(&TestApp::client(), "renamed@example.com", "654321")
        .await;
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = TestApp::spawn().await;
    app.register("Reader", Role::User).await;

    let (status, body) = send(
        TestApp::client()
            .post(app.api("/auth/forgotpassword"))
            .json(&json!({"email": email_for("Reader")})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "Email sent");

    let sent = app.mailer.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to.as_str(), "reader@example.com");
    let token = reset_token(&sent[0].text_body);

    let client = TestApp::client();
    let (status, body) = send(
        client
            .put(app.api(&format!("/auth/resetpassword/{token}")))
            .json(&json!({"password": "brand-new"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "reader@example.com");

    // The reset also logs the client in.
    let (status, _) = send(client.get(app.api("/auth/me"))).await;
    assert_eq!(status, StatusCode::OK);

    // Tokens are single use.
    let (status, body) = send(
        TestApp::client()
            .put(app.api(&format!("/auth/resetpassword/{token}")))
            .json(&json!({"password": "another-one"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");

    // A spent token is refused before the password is looked at.
    for body in [json!({"password": ""}), json!({})] {
        let (status, body) = send(
            TestApp::client()
                .put(app.api(&format!("/auth/resetpassword/{token}")))
                .json(&body),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid token");
    }

    app.login(&TestApp::client(), &email_for("Reader"), "brand-new")
        .await;
    let (status, _) = send(
        TestApp::client()
            .post(app.api("/auth/login"))
            .json(&json!({"email": email_for("Reader"), "password": PASSWORD})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_reset_with_unknown_token_and_short_password() {
    let app = TestApp::spawn().await;
    let (status, body) = send(
        TestApp::client()
            .put(app.api("/auth/resetpassword/deadbeef"))
            .json(&json!({"password": "1"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_forgot_password_unknown_email() {
    let app = TestApp::spawn().await;
    let (status, body) = send(
        TestApp::client()
            .post(app.api("/auth/forgotpassword"))
            .json(&json!({"email": "ghost@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "There is no user with that email");
    assert!(app.mailer.sent().await.is_empty());
}

#[tokio::test]
async fn test_malformed_json_uses_error_envelope() {
    let app = TestApp::spawn().await;
    let response = TestApp::client()
        .post(app.api("/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .expect("request failed");
    let (status, body) = read(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}
