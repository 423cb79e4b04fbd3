//! Integration tests for the HTTP API and WebSocket event streaming.
//!
//! These tests validate the observation surface: REST endpoints for the
//! screen actions and the `/ws` stream that carries session events to
//! connected clients.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures::SinkExt;
use futures::StreamExt;
use grin_session::{
    create_router, AppState, Config, Screen, SessionEvent, SessionState,
};
use grin_tracker::SmileSample;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tungstenite::Message;

/// Helper type for WebSocket client
type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawns the test server and returns its base address.
async fn spawn_test_server(state: AppState) -> (String, tokio::task::JoinHandle<()>) {
    let router = create_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Server failed");
    });

    // Give the server a moment to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr.to_string(), handle)
}

/// Connects a WebSocket client to the given server address.
async fn connect_client(addr: &str) -> WsClient {
    let (ws_stream, _) = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect("Failed to connect to WebSocket");
    ws_stream
}

/// Receives the next text message and parses it as a `SessionEvent`.
/// Automatically handles ping frames by responding with pong.
async fn receive_event(client: &mut WsClient) -> SessionEvent {
    loop {
        let msg = timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timeout waiting for message")
            .expect("Stream ended")
            .expect("WebSocket error");

        match msg {
            Message::Text(text) => {
                return serde_json::from_str(&text).expect("Failed to parse event");
            }
            Message::Ping(data) => {
                client
                    .send(Message::Pong(data))
                    .await
                    .expect("Failed to send pong");
            }
            Message::Pong(_) => {}
            other => panic!("Expected text message, got: {other:?}"),
        }
    }
}

/// Creates an app state with the goal already reached.
async fn state_with_reward() -> AppState {
    let state = AppState::new(Config::default());
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid timestamp");

    let mut session = state.session.lock().await;
    session.begin_detection().expect("begin_detection failed");
    session.observe(SmileSample::smiling(base));
    session.observe(SmileSample::smiling(base + chrono::Duration::seconds(5)));
    assert!(session.reward_available());
    drop(session);

    state
}

// ============================================================================
// Connection Tests
// ============================================================================

/// Tests that a WebSocket client receives a connected event on connection.
#[tokio::test]
async fn test_client_receives_connected_event_on_connect() {
    let state = AppState::new(Config::default());
    let (addr, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&addr).await;
    let event = receive_event(&mut client).await;

    let SessionEvent::Connected(payload) = event else {
        panic!("Expected Connected event, got: {event:?}");
    };
    assert_eq!(payload.state.screen, Screen::Intro);
    assert!(!payload.state.tracker.goal_reached);
}

/// Tests that the connected event reflects the live session state.
#[tokio::test]
async fn test_connected_event_contains_current_state() {
    let state = state_with_reward().await;
    let (addr, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&addr).await;
    let event = receive_event(&mut client).await;

    let SessionEvent::Connected(payload) = event else {
        panic!("Expected Connected event, got: {event:?}");
    };
    assert_eq!(payload.state.screen, Screen::Detector);
    assert!(payload.state.reward_available);
    assert!(payload.state.tracker.goal_reached);
}

/// Tests that multiple clients can connect concurrently.
#[tokio::test]
async fn test_multiple_clients_can_connect() {
    let state = AppState::new(Config::default());
    let (addr, _handle) = spawn_test_server(state).await;

    let mut client1 = connect_client(&addr).await;
    let mut client2 = connect_client(&addr).await;
    let mut client3 = connect_client(&addr).await;

    assert!(matches!(
        receive_event(&mut client1).await,
        SessionEvent::Connected(_)
    ));
    assert!(matches!(
        receive_event(&mut client2).await,
        SessionEvent::Connected(_)
    ));
    assert!(matches!(
        receive_event(&mut client3).await,
        SessionEvent::Connected(_)
    ));
}

// ============================================================================
// Event Broadcast Tests
// ============================================================================

/// Tests that events are broadcast to all connected clients.
#[tokio::test]
async fn test_events_broadcast_to_all_clients() {
    let state = AppState::new(Config::default());
    let broadcaster = state.broadcaster.clone();
    let (addr, _handle) = spawn_test_server(state).await;

    let mut client1 = connect_client(&addr).await;
    let mut client2 = connect_client(&addr).await;

    // Consume connected events
    receive_event(&mut client1).await;
    receive_event(&mut client2).await;

    broadcaster.send(SessionEvent::screen_changed(Screen::Detector));

    let event1 = receive_event(&mut client1).await;
    let event2 = receive_event(&mut client2).await;

    assert!(matches!(event1, SessionEvent::ScreenChanged(_)));
    assert!(matches!(event2, SessionEvent::ScreenChanged(_)));
}

/// Tests that applied samples reach WebSocket clients as smile updates,
/// with the goal edge delivered exactly once.
#[tokio::test]
async fn test_smile_updates_and_single_goal_edge() {
    let state = AppState::new(Config::default());
    let session = Arc::clone(&state.session);
    let broadcaster = state.broadcaster.clone();
    let (addr, _handle) = spawn_test_server(state).await;

    let mut client = connect_client(&addr).await;
    receive_event(&mut client).await;

    // Drive the session the way the sample pump does.
    let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid timestamp");
    {
        let mut session = session.lock().await;
        session.begin_detection().expect("begin_detection failed");

        for secs in [0, 2, 5, 6] {
            let sample = SmileSample::smiling(base + chrono::Duration::seconds(secs));
            let edge = session.observe(sample);
            let snapshot = session.snapshot();
            broadcaster.send(SessionEvent::smile_update(&snapshot));
            if let Some(goal) = edge {
                broadcaster.send(SessionEvent::goal_reached(goal));
            }
        }
    }

    let mut updates = 0;
    let mut goal_edges = 0;
    for _ in 0..5 {
        match receive_event(&mut client).await {
            SessionEvent::SmileUpdate(_) => updates += 1,
            SessionEvent::GoalReached(payload) => {
                goal_edges += 1;
                assert!(payload.streak_seconds >= 5.0);
            }
            other => panic!("Unexpected event: {other:?}"),
        }
    }

    assert_eq!(updates, 4);
    assert_eq!(goal_edges, 1);
}

// ============================================================================
// REST API Tests
// ============================================================================

/// Tests the state endpoint over a real socket.
#[tokio::test]
async fn test_api_state_endpoint() {
    let state = AppState::new(Config::default());
    let (addr, _handle) = spawn_test_server(state).await;

    let response = reqwest::get(format!("http://{addr}/api/state"))
        .await
        .expect("request failed");
    assert!(response.status().is_success());

    let session_state: SessionState = response.json().await.expect("invalid body");
    assert_eq!(session_state.screen, Screen::Intro);
}

/// Tests the full screen flow over the REST API: start, redeem, dismiss.
#[tokio::test]
async fn test_api_screen_flow() {
    // Session already on the detector screen with a reward available.
    let state = state_with_reward().await;
    let (addr, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    // Redeem returns the coupon.
    let response = client
        .post(format!("http://{addr}/api/redeem"))
        .send()
        .await
        .expect("request failed");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("invalid body");
    assert_eq!(body["coupon"]["code"], "SMILE2024");
    assert_eq!(body["state"]["screen"], "redeem");

    // Dismiss returns to the detector with tracking reset.
    let response = client
        .post(format!("http://{addr}/api/dismiss"))
        .send()
        .await
        .expect("request failed");
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.expect("invalid body");
    assert_eq!(body["dismissed"], true);
    assert_eq!(body["state"]["screen"], "detector");
    assert_eq!(body["state"]["tracker"]["goalReached"], false);
}

/// Tests that redeeming without a reward is rejected.
#[tokio::test]
async fn test_api_redeem_without_reward_rejected() {
    let state = AppState::new(Config::default());
    let (addr, _handle) = spawn_test_server(state).await;
    let client = reqwest::Client::new();

    // Start detection first (from intro).
    let response = client
        .post(format!("http://{addr}/api/start"))
        .send()
        .await
        .expect("request failed");
    assert!(response.status().is_success());

    // No goal reached yet: redeem must be refused.
    let response = client
        .post(format!("http://{addr}/api/redeem"))
        .send()
        .await
        .expect("request failed");
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

    let body: serde_json::Value = response.json().await.expect("invalid body");
    assert!(body["error"]
        .as_str()
        .expect("error must be a string")
        .contains("No reward available"));
}

/// Tests that screen actions performed over the API are broadcast to
/// WebSocket clients.
#[tokio::test]
async fn test_api_actions_broadcast_to_ws_clients() {
    let state = AppState::new(Config::default());
    let (addr, _handle) = spawn_test_server(state).await;

    let mut ws_client = connect_client(&addr).await;
    receive_event(&mut ws_client).await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/api/start"))
        .send()
        .await
        .expect("request failed");
    assert!(response.status().is_success());

    let event = receive_event(&mut ws_client).await;
    let SessionEvent::ScreenChanged(payload) = event else {
        panic!("Expected ScreenChanged event, got: {event:?}");
    };
    assert_eq!(payload.screen, Screen::Detector);
}
