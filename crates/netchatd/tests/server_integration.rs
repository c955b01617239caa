//! Integration tests for the chat server.
//!
//! These tests run a real `ChatServer` on a loopback port and drive it with
//! raw TCP clients, covering admission, the name handshake, fan-out and
//! disconnect handling.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.

mod common;

use common::{assert_chat_line, TestServer};
use netchat_protocol::{BANNER, NAME_EMPTY, NAME_INVALID, NAME_PROMPT, NAME_TAKEN, ROOM_FULL};
use netchatd::config::ServerConfig;
use tokio::time::sleep;

// ============================================================================
// Handshake Tests
// ============================================================================

#[tokio::test]
async fn test_banner_then_prompt() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    let greeting = client.read_until(NAME_PROMPT).await;
    assert_eq!(greeting, format!("{BANNER}{NAME_PROMPT}"));

    server.shutdown().await;
}

#[tokio::test]
async fn test_handshake_success() {
    let server = TestServer::spawn().await;
    let _alice = server.join("alice").await;

    assert_eq!(server.registry.len(), 1);
    assert_eq!(server.registry.names()[0].as_str(), "alice");

    server.shutdown().await;
}

#[tokio::test]
async fn test_name_is_trimmed() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    client.read_until(NAME_PROMPT).await;
    client.send("   bob \r\n").await;
    client.read_until("Welcome, bob!\n").await;

    assert_eq!(server.registry.names()[0].as_str(), "bob");

    server.shutdown().await;
}

#[tokio::test]
async fn test_duplicate_name_rejected() {
    let server = TestServer::spawn().await;
    let _alice = server.join("alice").await;

    let mut imposter = server.connect().await;
    imposter.read_until(NAME_PROMPT).await;
    imposter.send("alice\n").await;

    assert_eq!(imposter.read_to_end().await, NAME_TAKEN);

    server.wait_for_occupancy(1).await;
    assert_eq!(server.registry.len(), 1);
    assert_eq!(server.registry.names()[0].as_str(), "alice");

    server.shutdown().await;
}

#[tokio::test]
async fn test_empty_name_rejected() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    client.read_until(NAME_PROMPT).await;
    client.send("   \n").await;

    assert_eq!(client.read_to_end().await, NAME_EMPTY);
    server.wait_for_occupancy(0).await;
    assert!(server.registry.is_empty());

    server.shutdown().await;
}

#[tokio::test]
async fn test_multiline_name_rejected() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;

    client.read_until(NAME_PROMPT).await;
    client.send("dave\nhello everyone\n").await;

    assert_eq!(client.read_to_end().await, NAME_INVALID);
    server.wait_for_occupancy(0).await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_overlong_name_rejected() {
    let server = TestServer::spawn().await;
    let _alice = server.join("alice").await;
    let mut client = server.connect().await;
    server.wait_for_occupancy(2).await;

    client.read_until(NAME_PROMPT).await;
    client.send(&format!("{}\n", "x".repeat(33))).await;

    assert_eq!(
        client.read_to_end().await,
        "Name too long (max 32 characters). Disconnecting...\n"
    );
    server.wait_for_occupancy(1).await;
    assert_eq!(server.registry.len(), 1);

    // A name at the limit is still accepted.
    let _max = server.join(&"y".repeat(32)).await;
    server.wait_for_occupancy(2).await;

    server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_during_handshake_releases_slot() {
    let server = TestServer::spawn().await;
    let mut client = server.connect().await;
    client.read_until(NAME_PROMPT).await;
    server.wait_for_occupancy(1).await;

    drop(client);

    server.wait_for_occupancy(0).await;
    assert!(server.registry.is_empty());

    server.shutdown().await;
}

// ============================================================================
// Admission Tests
// ============================================================================

#[tokio::test]
async fn test_fourth_client_refused() {
    let server = TestServer::spawn().await;
    let _alice = server.join("alice").await;
    let _bob = server.join("bob").await;
    let _carol = server.join("carol").await;

    let mut dave = server.connect().await;
    assert_eq!(dave.read_to_end().await, ROOM_FULL);

    assert_eq!(server.registry.occupancy(), 3);
    assert_eq!(server.registry.len(), 3);

    server.shutdown().await;
}

#[tokio::test]
async fn test_handshaking_clients_count_toward_ceiling() {
    let server = TestServer::spawn_with(ServerConfig::new("127.0.0.1:0").with_max_connections(1)).await;

    let mut pending = server.connect().await;
    pending.read_until(NAME_PROMPT).await;

    let mut refused = server.connect().await;
    assert_eq!(refused.read_to_end().await, ROOM_FULL);

    server.shutdown().await;
}

#[tokio::test]
async fn test_disconnect_frees_slot_for_refused_client() {
    let server = TestServer::spawn().await;
    let _alice = server.join("alice").await;
    let bob = server.join("bob").await;
    let _carol = server.join("carol").await;

    let mut refused = server.connect().await;
    assert_eq!(refused.read_to_end().await, ROOM_FULL);

    drop(bob);
    server.wait_for_occupancy(2).await;
    assert!(!server.registry.names().iter().any(|n| n.as_str() == "bob"));

    let _dave = server.join("dave").await;
    assert_eq!(server.registry.occupancy(), 3);

    let mut refused_again = server.connect().await;
    assert_eq!(refused_again.read_to_end().await, ROOM_FULL);

    server.shutdown().await;
}

// ============================================================================
// Broadcast Tests
// ============================================================================

#[tokio::test]
async fn test_message_fans_out_to_others_only() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    let mut bob = server.join("bob").await;
    let mut carol = server.join("carol").await;

    alice.send("hello").await;

    assert_chat_line(&bob.read_line().await, "alice", "hello");
    assert_chat_line(&carol.read_line().await, "alice", "hello");
    assert!(alice.is_silent().await, "sender must not receive its own message");

    server.shutdown().await;
}

#[tokio::test]
async fn test_trailing_newline_trimmed() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    let mut bob = server.join("bob").await;

    alice.send("  how are you?\r\n").await;
    assert_chat_line(&bob.read_line().await, "alice", "how are you?");
    assert!(alice.is_silent().await);

    server.shutdown().await;
}

#[tokio::test]
async fn test_blank_message_not_delivered() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    let mut bob = server.join("bob").await;
    let mut carol = server.join("carol").await;

    alice.send("   ").await;
    assert!(bob.is_silent().await);
    assert!(carol.is_silent().await);

    alice.send("still here").await;
    assert_chat_line(&bob.read_line().await, "alice", "still here");

    server.shutdown().await;
}

#[tokio::test]
async fn test_conversation_both_ways() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    let mut bob = server.join("bob").await;

    alice.send("ping").await;
    assert_chat_line(&bob.read_line().await, "alice", "ping");

    bob.send("pong").await;
    assert_chat_line(&alice.read_line().await, "bob", "pong");

    server.shutdown().await;
}

#[tokio::test]
async fn test_late_joiner_sees_only_new_messages() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    let mut bob = server.join("bob").await;

    alice.send("before").await;
    assert_chat_line(&bob.read_line().await, "alice", "before");

    let mut carol = server.join("carol").await;
    assert!(carol.is_silent().await);

    alice.send("after").await;
    assert_chat_line(&carol.read_line().await, "alice", "after");
    assert_chat_line(&bob.read_line().await, "alice", "after");

    server.shutdown().await;
}

#[tokio::test]
async fn test_departed_client_gets_nothing_and_others_continue() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    let bob = server.join("bob").await;
    let mut carol = server.join("carol").await;

    drop(bob);
    server.wait_for_occupancy(2).await;

    alice.send("anyone left?").await;
    assert_chat_line(&carol.read_line().await, "alice", "anyone left?");

    // Give the relay a moment in case anything else was queued.
    sleep(std::time::Duration::from_millis(50)).await;
    assert!(alice.is_silent().await);

    server.shutdown().await;
}

// ============================================================================
// Shutdown Tests
// ============================================================================

#[tokio::test]
async fn test_shutdown_closes_connections() {
    let server = TestServer::spawn().await;
    let mut alice = server.join("alice").await;
    let registry = server.registry.clone();

    server.shutdown().await;

    assert_eq!(alice.read_to_end().await, "");
    assert_eq!(registry.occupancy(), 0);
    assert!(registry.is_empty());
}
