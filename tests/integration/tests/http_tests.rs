//! HTTP Integration Tests
//!
//! Run with: cargo test -p integration-tests --test http_tests

use integration_tests::{assert_json, token_for, GatewayClient, TestServer};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server.get("/health").await.expect("Request failed");
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["relay_state"], "connected");
    assert_eq!(body["sessions"], 0);
}

#[tokio::test]
async fn test_health_counts_sessions_and_reports_degraded_relay() {
    let server = TestServer::start().await.expect("Failed to start server");
    let _alice = GatewayClient::connect_as(&server.ws_url(), &token_for("alice").unwrap())
        .await
        .unwrap();
    server.relay.disconnect();

    let response = server.get("/health").await.expect("Request failed");
    let body: Value = assert_json(response, StatusCode::SERVICE_UNAVAILABLE).await.unwrap();
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["relay_state"], "disconnected");
    assert_eq!(body["sessions"], 1);
}

#[tokio::test]
async fn test_list_users() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = token_for("alice").unwrap();

    let response = server.get_auth("/users", &token).await.expect("Request failed");
    let users: Vec<Value> = assert_json(response, StatusCode::OK).await.unwrap();

    let names: Vec<&str> = users.iter().filter_map(|u| u["username"].as_str()).collect();
    assert_eq!(names, ["alice", "bob", "carol"]);
    assert_eq!(users[0]["id"], 1);
}

#[tokio::test]
async fn test_all_user_alias_marks_online_users() {
    let server = TestServer::start().await.expect("Failed to start server");
    let _bob = GatewayClient::connect_as(&server.ws_url(), &token_for("bob").unwrap())
        .await
        .unwrap();
    let token = token_for("alice").unwrap();

    let response = server.get_auth("/all/user", &token).await.expect("Request failed");
    let users: Vec<Value> = assert_json(response, StatusCode::OK).await.unwrap();

    let online: Vec<(&str, bool)> = users
        .iter()
        .filter_map(|u| Some((u["username"].as_str()?, u["online"].as_bool()?)))
        .collect();
    assert_eq!(online, [("alice", false), ("bob", true), ("carol", false)]);
}

#[tokio::test]
async fn test_list_users_requires_auth() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server.get("/users").await.expect("Request failed");
    let body: Value = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body["error"]["code"], "MISSING_AUTH");
}

#[tokio::test]
async fn test_me() {
    let server = TestServer::start().await.expect("Failed to start server");
    let token = token_for("carol").unwrap();

    let response = server.get_auth("/me", &token).await.expect("Request failed");
    let body: Value = assert_json(response, StatusCode::OK).await.unwrap();
    assert_eq!(body["username"], "carol");
    assert_eq!(body["sessions"], serde_json::json!([]));
}

#[tokio::test]
async fn test_me_with_invalid_token() {
    let server = TestServer::start().await.expect("Failed to start server");

    let response = server.get_auth("/me", "garbage").await.expect("Request failed");
    let body: Value = assert_json(response, StatusCode::UNAUTHORIZED).await.unwrap();
    assert_eq!(body["error"]["code"], "AUTHENTICATION_FAILED");
}
