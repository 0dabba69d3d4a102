//! Gateway Integration Tests
//!
//! Drive the WebSocket gateway end to end with an in-process relay.
//!
//! Run with: cargo test -p integration-tests --test gateway_tests

use std::time::Duration;

use integration_tests::{test_config_with, token_for, GatewayClient, Received, TestServer};
use relay_core::{ChatMessage, Destination};
use serde_json::json;

const SILENCE: Duration = Duration::from_millis(200);

async fn connect_as(server: &TestServer, username: &str) -> GatewayClient {
    GatewayClient::connect_as(&server.ws_url(), &token_for(username).unwrap())
        .await
        .expect("Failed to connect")
}

// ============================================================================
// Routing
// ============================================================================

#[tokio::test]
async fn test_public_message_reaches_every_subscriber() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = connect_as(&server, "alice").await;
    let mut bob = connect_as(&server, "bob").await;
    let mut carol = connect_as(&server, "carol").await;
    bob.subscribe("/topic/public").await.unwrap();
    carol.subscribe("/topic/public").await.unwrap();

    alice
        .send_message(&ChatMessage::public("alice", "hello everyone"))
        .await
        .unwrap();

    for client in [&mut bob, &mut carol] {
        let payload = client.expect_message().await.unwrap();
        assert_eq!(payload["destination"], "/topic/public");
        assert_eq!(payload["message"]["from"], "alice");
        assert_eq!(payload["message"]["text"], "hello everyone");
        assert!(payload.get("headers").is_none());
    }

    // Sender is not subscribed, so nothing comes back
    alice.expect_silence(SILENCE).await.unwrap();
}

#[tokio::test]
async fn test_sender_cannot_spoof_from() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = connect_as(&server, "alice").await;
    let mut bob = connect_as(&server, "bob").await;
    bob.subscribe("/topic/public").await.unwrap();

    alice
        .send_message(&ChatMessage::public("mallory", "it was me"))
        .await
        .unwrap();

    let payload = bob.expect_message().await.unwrap();
    assert_eq!(payload["message"]["from"], "alice");
}

#[tokio::test]
async fn test_private_message_reaches_only_subscribed_sessions() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = connect_as(&server, "alice").await;
    let mut bob_a = connect_as(&server, "bob").await;
    let mut bob_b = connect_as(&server, "bob").await;
    let mut bob_idle = connect_as(&server, "bob").await;
    bob_a.subscribe("/user/queue/private").await.unwrap();
    bob_b.subscribe("/user/bob/queue/private").await.unwrap();

    alice
        .send_message(&ChatMessage::direct("alice", "psst", "bob"))
        .await
        .unwrap();

    for client in [&mut bob_a, &mut bob_b] {
        let payload = client.expect_message().await.unwrap();
        assert_eq!(payload["destination"], "/user/bob/queue/private");
        assert_eq!(payload["message"]["text"], "psst");
        assert_eq!(payload["message"]["to"], "bob");
        assert_eq!(payload["headers"]["id"], "alice");
        assert_eq!(payload["headers"]["auto-delete"], true);
        assert_eq!(payload["headers"]["x-message-ttl"], 6000);
    }

    bob_idle.expect_silence(SILENCE).await.unwrap();
    alice.expect_silence(SILENCE).await.unwrap();
}

#[tokio::test]
async fn test_private_message_reaches_username_with_slash() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = connect_as(&server, "alice").await;
    let mut ops = connect_as(&server, "team/ops").await;
    ops.subscribe("/user/queue/private").await.unwrap();

    alice
        .send_message(&ChatMessage::direct("alice", "deploy done", "team/ops"))
        .await
        .unwrap();

    let payload = ops.expect_message().await.unwrap();
    assert_eq!(payload["destination"], "/user/team%2Fops/queue/private");
    assert_eq!(payload["message"]["text"], "deploy done");
    alice.expect_silence(SILENCE).await.unwrap();
}

#[tokio::test]
async fn test_private_message_to_offline_user_is_dropped() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = connect_as(&server, "alice").await;

    alice
        .send_message(&ChatMessage::direct("alice", "anyone?", "nobody"))
        .await
        .unwrap();

    // No error, nothing delivered, connection still usable
    alice.sync().await.unwrap();
    alice.expect_silence(SILENCE).await.unwrap();
}

#[tokio::test]
async fn test_sequence_numbers_increase_per_connection() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = connect_as(&server, "alice").await;
    let mut bob = connect_as(&server, "bob").await;
    bob.subscribe("/topic/public").await.unwrap();

    for text in ["one", "two"] {
        alice.send_message(&ChatMessage::public("alice", text)).await.unwrap();
    }

    // READY used sequence 1
    for (expected_seq, expected_text) in [(2, "one"), (3, "two")] {
        let frame = bob.expect_frame().await.unwrap();
        assert_eq!(frame.s, Some(expected_seq));
        assert_eq!(frame.d.unwrap()["message"]["text"], expected_text);
    }
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = connect_as(&server, "alice").await;
    let mut bob = connect_as(&server, "bob").await;
    bob.subscribe("/topic/public").await.unwrap();
    bob.unsubscribe("/topic/public").await.unwrap();

    assert!(server.relay.watched().is_empty());

    alice.send_message(&ChatMessage::public("alice", "gone")).await.unwrap();
    bob.expect_silence(SILENCE).await.unwrap();
}

// ============================================================================
// Protocol errors
// ============================================================================

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = connect_as(&server, "alice").await;

    alice.send_raw("this is not json").await.unwrap();
    assert_eq!(alice.expect_error().await.unwrap(), "MALFORMED_MESSAGE");

    alice
        .send_raw(json!({ "op": 3, "d": { "body": 1 } }).to_string())
        .await
        .unwrap();
    assert_eq!(alice.expect_error().await.unwrap(), "MALFORMED_MESSAGE");

    alice.sync().await.unwrap();
}

#[tokio::test]
async fn test_send_before_identify_is_rejected() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = GatewayClient::connect(&server.ws_url()).await.unwrap();

    client
        .send_message(&ChatMessage::public("alice", "hi"))
        .await
        .unwrap();
    assert_eq!(client.expect_error().await.unwrap(), "UNAUTHENTICATED");

    client
        .send_raw(json!({ "op": 4, "d": { "destination": "/topic/public" } }).to_string())
        .await
        .unwrap();
    assert_eq!(client.expect_error().await.unwrap(), "UNAUTHENTICATED");

    // Identify still works afterwards
    let ready = client.identify(&token_for("alice").unwrap()).await.unwrap();
    assert_eq!(ready["username"], "alice");
}

#[tokio::test]
async fn test_bad_token_and_second_identify() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut client = GatewayClient::connect(&server.ws_url()).await.unwrap();

    client
        .send_raw(json!({ "op": 2, "d": { "token": "forged" } }).to_string())
        .await
        .unwrap();
    assert_eq!(client.expect_error().await.unwrap(), "AUTHENTICATION_FAILED");

    client.identify(&token_for("alice").unwrap()).await.unwrap();

    client
        .send_raw(json!({ "op": 2, "d": { "token": token_for("bob").unwrap() } }).to_string())
        .await
        .unwrap();
    assert_eq!(client.expect_error().await.unwrap(), "ALREADY_AUTHENTICATED");
}

#[tokio::test]
async fn test_foreign_queue_subscription_is_rejected() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = connect_as(&server, "alice").await;

    alice
        .send_raw(json!({ "op": 4, "d": { "destination": "/user/bob/queue/private" } }).to_string())
        .await
        .unwrap();
    assert_eq!(alice.expect_error().await.unwrap(), "FORBIDDEN_DESTINATION");

    alice
        .send_raw(json!({ "op": 4, "d": { "destination": "/topic/elsewhere" } }).to_string())
        .await
        .unwrap();
    assert_eq!(alice.expect_error().await.unwrap(), "INVALID_DESTINATION");

    assert!(server
        .state
        .registry()
        .subscribers_of(&Destination::user_queue("bob"))
        .is_empty());
    alice.sync().await.unwrap();
}

#[tokio::test]
async fn test_server_only_op_is_rejected() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = connect_as(&server, "alice").await;

    alice.send_raw(json!({ "op": 11 }).to_string()).await.unwrap();
    assert_eq!(alice.expect_error().await.unwrap(), "UNKNOWN_OPCODE");
}

// ============================================================================
// Relay availability
// ============================================================================

#[tokio::test]
async fn test_relay_unavailable_fails_fast() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut alice = connect_as(&server, "alice").await;
    let mut bob = connect_as(&server, "bob").await;
    bob.subscribe("/topic/public").await.unwrap();

    server.relay.disconnect();
    alice
        .send_message(&ChatMessage::public("alice", "lost"))
        .await
        .unwrap();
    assert_eq!(alice.expect_error().await.unwrap(), "RELAY_UNAVAILABLE");
    bob.expect_silence(SILENCE).await.unwrap();

    // Nothing was queued; after reconnect only new messages flow
    server.relay.connect();
    alice
        .send_message(&ChatMessage::public("alice", "back"))
        .await
        .unwrap();
    let payload = bob.expect_message().await.unwrap();
    assert_eq!(payload["message"]["text"], "back");
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_disconnect_op_closes_and_cleans_up() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut bob = connect_as(&server, "bob").await;
    bob.subscribe("/user/queue/private").await.unwrap();
    assert_eq!(server.relay.watched(), vec![Destination::user_queue("bob")]);

    bob.send_raw(json!({ "op": 6 }).to_string()).await.unwrap();
    match bob.recv().await.unwrap() {
        Received::Closed(code) => assert_eq!(code, Some(1000)),
        Received::Frame(frame) => panic!("expected close, got {frame}"),
    }

    for _ in 0..50 {
        if server.state.registry().session_count() == 0 && server.relay.watched().is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(server.state.registry().session_count(), 0);
    assert!(server.relay.watched().is_empty());
}

#[tokio::test]
async fn test_client_close_releases_subscriptions() {
    let server = TestServer::start().await.expect("Failed to start server");
    let mut bob = connect_as(&server, "bob").await;
    bob.subscribe("/topic/public").await.unwrap();
    bob.close().await.unwrap();

    for _ in 0..50 {
        if server.state.registry().session_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(server
        .state
        .registry()
        .subscribers_of(&Destination::public())
        .is_empty());
}

#[tokio::test]
async fn test_silent_connection_times_out() {
    let config = test_config_with(&[("GATEWAY_HEARTBEAT_INTERVAL_MS", "100")]).unwrap();
    let server = TestServer::start_with_config(config).await.unwrap();
    let mut alice = connect_as(&server, "alice").await;
    assert_eq!(alice.heartbeat_interval, 100);

    match alice.recv_within(Duration::from_secs(2)).await.unwrap() {
        Received::Closed(code) => assert_eq!(code, Some(4009)),
        Received::Frame(frame) => panic!("expected close, got {frame}"),
    }
}
