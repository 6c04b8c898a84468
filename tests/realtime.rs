//! WebSocket Gateway Tests
//!
//! Drives /ws over a real listener: connect-time registration, join
//! identity checks, live pushes, anonymous degradation, and the
//! per-session read acks.

mod common;

use std::net::SocketAddr;
use std::time::Duration;

use axum::http::StatusCode;
use common::app;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn connect(addr: SocketAddr, token: Option<&str>) -> WsClient {
    let url = match token {
        Some(token) => format!("ws://{}/ws?token={}", addr, token),
        None => format!("ws://{}/ws", addr),
    };
    let (socket, _) = connect_async(url).await.expect("websocket connect failed");
    socket
}

async fn send_frame(socket: &mut WsClient, frame: Value) {
    socket
        .send(Message::Text(frame.to_string()))
        .await
        .expect("websocket send failed");
}

async fn next_event(socket: &mut WsClient) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("socket closed")
            .expect("socket errored");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).expect("frame was not json");
        }
    }
}

async fn expect_silence(socket: &mut WsClient) {
    match tokio::time::timeout(Duration::from_millis(300), socket.next()).await {
        Err(_) => {}
        Ok(frame) => panic!("expected silence, got {:?}", frame),
    }
}

/// The ack round-trip doubles as a barrier: commands are handled in order,
/// so once the ack is back, everything sent earlier on this socket (and the
/// connect-time registration) has been processed.
async fn sync_session(socket: &mut WsClient) {
    send_frame(socket, json!({ "event": "markAllAsRead" })).await;
    let event = next_event(socket).await;
    assert_eq!(event["event"], "allNotificationsMarkedAsRead");
}

async fn unread_count(app: &common::TestApp, token: &str) -> i64 {
    let resp = app.get("/notifications/unread-count", Some(token)).await;
    assert_eq!(resp.status, StatusCode::OK);
    resp.json()["unreadCount"].as_i64().unwrap()
}

async fn send_system_notification(app: &common::TestApp, recipient: uuid::Uuid, title: &str) {
    let resp = app
        .post_admin(
            "/admin/notifications",
            json!({ "recipient_id": recipient, "title": title, "message": "m" }),
            Some(app.admin_token()),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
}

// ===========================================================================
// Live Push
// ===========================================================================

#[tokio::test]
async fn online_recipient_receives_new_notification() {
    let Some(app) = app().await else { return };
    let addr = app.spawn_server().await;
    let author = app.create_user("ws_push_author").await;
    let fan = app.create_user("ws_push_fan").await;
    let post_id = app.create_post_for_user(author.id, "Live Wire").await;

    let mut socket = connect(addr, Some(&author.access_token)).await;
    sync_session(&mut socket).await;

    let resp = app
        .post_json(
            &format!("/posts/{}/like", post_id),
            json!({}),
            Some(&fan.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);

    let event = next_event(&mut socket).await;
    assert_eq!(event["event"], "newNotification");
    let data = &event["data"];
    assert_eq!(data["kind"], "like");
    assert_eq!(data["recipientId"].as_str().unwrap(), author.id.to_string());
    assert_eq!(data["senderId"].as_str().unwrap(), fan.id.to_string());
    assert_eq!(data["isRead"], false);
}

// ===========================================================================
// Join & Identity
// ===========================================================================

#[tokio::test]
async fn join_cannot_claim_another_identity() {
    let Some(app) = app().await else { return };
    let addr = app.spawn_server().await;
    let intruder = app.create_user("ws_join_intruder").await;
    let victim = app.create_user("ws_join_victim").await;

    let mut socket = connect(addr, Some(&intruder.access_token)).await;
    send_frame(
        &mut socket,
        json!({ "event": "join", "data": { "userId": victim.id } }),
    )
    .await;
    sync_session(&mut socket).await;

    // The victim's channel was not hijacked.
    send_system_notification(app, victim.id, "for the victim").await;
    expect_silence(&mut socket).await;

    // The session's own channel is unaffected.
    send_system_notification(app, intruder.id, "mine").await;
    let event = next_event(&mut socket).await;
    assert_eq!(event["event"], "newNotification");
    assert_eq!(event["data"]["title"], "mine");
}

#[tokio::test]
async fn anonymous_session_is_never_registered() {
    let Some(app) = app().await else { return };
    let addr = app.spawn_server().await;
    let user = app.create_user("ws_anon_target").await;

    // One unread notification while the user is offline.
    send_system_notification(app, user.id, "pending").await;
    let resp = app.get("/notifications", Some(&user.access_token)).await;
    let id = resp.json()["items"][0]["id"].as_str().unwrap().to_string();

    let mut socket = connect(addr, None).await;
    send_frame(
        &mut socket,
        json!({ "event": "join", "data": { "userId": user.id } }),
    )
    .await;
    send_frame(
        &mut socket,
        json!({ "event": "markAsRead", "data": { "notificationId": id } }),
    )
    .await;
    send_frame(&mut socket, json!({ "event": "markAllAsRead" })).await;

    // No acks, no push, and the unread row untouched.
    send_system_notification(app, user.id, "also pending").await;
    expect_silence(&mut socket).await;
    assert_eq!(unread_count(app, &user.access_token).await, 2);
}

#[tokio::test]
async fn invalid_token_degrades_to_anonymous() {
    let Some(app) = app().await else { return };
    let addr = app.spawn_server().await;
    let user = app.create_user("ws_bad_token").await;

    // Connection is accepted despite the garbage token.
    let mut socket = connect(addr, Some("not-a-real-token")).await;
    send_frame(
        &mut socket,
        json!({ "event": "join", "data": { "userId": user.id } }),
    )
    .await;

    send_system_notification(app, user.id, "unreachable").await;
    expect_silence(&mut socket).await;
}

// ===========================================================================
// Read Acks
// ===========================================================================

#[tokio::test]
async fn read_ack_reaches_only_the_issuing_session() {
    let Some(app) = app().await else { return };
    let addr = app.spawn_server().await;
    let reader = app.create_user("ws_ack_reader").await;
    let bystander = app.create_user("ws_ack_bystander").await;

    let mut reader_socket = connect(addr, Some(&reader.access_token)).await;
    sync_session(&mut reader_socket).await;
    let mut bystander_socket = connect(addr, Some(&bystander.access_token)).await;
    sync_session(&mut bystander_socket).await;

    send_system_notification(app, reader.id, "ping").await;
    let event = next_event(&mut reader_socket).await;
    assert_eq!(event["event"], "newNotification");
    let id = event["data"]["id"].as_str().unwrap().to_string();

    send_frame(
        &mut reader_socket,
        json!({ "event": "markAsRead", "data": { "notificationId": id } }),
    )
    .await;
    let ack = next_event(&mut reader_socket).await;
    assert_eq!(ack["event"], "notificationMarkedAsRead");
    assert_eq!(ack["data"]["notificationId"].as_str().unwrap(), id);

    // The mutation is visible on the pull path, and nothing leaked to the
    // other session.
    assert_eq!(unread_count(app, &reader.access_token).await, 0);
    expect_silence(&mut bystander_socket).await;
}

#[tokio::test]
async fn socket_mark_all_read_clears_unread() {
    let Some(app) = app().await else { return };
    let addr = app.spawn_server().await;
    let user = app.create_user("ws_mark_all").await;

    let mut socket = connect(addr, Some(&user.access_token)).await;
    sync_session(&mut socket).await;

    send_system_notification(app, user.id, "one").await;
    send_system_notification(app, user.id, "two").await;
    assert_eq!(next_event(&mut socket).await["event"], "newNotification");
    assert_eq!(next_event(&mut socket).await["event"], "newNotification");
    assert_eq!(unread_count(app, &user.access_token).await, 2);

    send_frame(&mut socket, json!({ "event": "markAllAsRead" })).await;
    let ack = next_event(&mut socket).await;
    assert_eq!(ack["event"], "allNotificationsMarkedAsRead");
    assert_eq!(unread_count(app, &user.access_token).await, 0);
}
