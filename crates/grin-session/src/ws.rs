//! WebSocket endpoint for live session observation.
//!
//! A client that connects to `/ws` is greeted with a `connected` event
//! carrying the current [`SessionState`](crate::session::SessionState)
//! snapshot, then receives every [`SessionEvent`] the broadcaster emits
//! for as long as it stays connected. Liveness is enforced with a ping
//! every [`HEARTBEAT_INTERVAL`]; a client that leaves
//! [`MAX_PENDING_PINGS`] pings unanswered is dropped.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::api::AppState;
use crate::events::SessionEvent;

/// Time between heartbeat pings.
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// How many pings may go unanswered before the client is considered gone.
const MAX_PENDING_PINGS: u8 = 3;

/// Upgrades `GET /ws` requests and hands the socket to [`serve_client`].
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("WebSocket upgrade requested");
    ws.on_upgrade(move |socket| serve_client(socket, state))
}

/// Tracks unanswered heartbeat pings for one client.
#[derive(Debug, Default)]
struct Heartbeat {
    pending: u8,
}

impl Heartbeat {
    /// Records a sent ping. Returns `false` once the client has fallen
    /// too far behind and should be disconnected.
    fn beat(&mut self) -> bool {
        self.pending += 1;
        self.pending < MAX_PENDING_PINGS
    }

    /// Records a pong from the client.
    fn ack(&mut self) {
        self.pending = 0;
    }
}

/// What to do with the connection after processing one inbound frame.
enum Inbound {
    Continue,
    Pong,
    PingBack(Vec<u8>),
    Gone,
}

/// Classifies one frame from the client.
///
/// Clients are not expected to send payloads of their own; text and
/// binary frames are ignored.
fn classify_inbound(msg: Option<Result<Message, axum::Error>>) -> Inbound {
    match msg {
        Some(Ok(Message::Pong(_))) => Inbound::Pong,
        Some(Ok(Message::Ping(data))) => Inbound::PingBack(data),
        Some(Ok(Message::Text(_) | Message::Binary(_))) => {
            debug!("Ignoring client payload");
            Inbound::Continue
        }
        Some(Ok(Message::Close(_))) => {
            info!("Client closed the connection");
            Inbound::Gone
        }
        Some(Err(e)) => {
            debug!(error = %e, "WebSocket receive error");
            Inbound::Gone
        }
        None => Inbound::Gone,
    }
}

/// Serializes an event and writes it to the client.
///
/// Returns `false` when the client is gone. A value that fails to
/// serialize is logged and skipped rather than ending the connection.
async fn push_event(sink: &mut SplitSink<WebSocket, Message>, event: &SessionEvent) -> bool {
    let json = match serde_json::to_string(event) {
        Ok(json) => json,
        Err(e) => {
            warn!(event = event.event_name(), error = %e, "Dropping unserializable event");
            return true;
        }
    };

    sink.send(Message::Text(json)).await.is_ok()
}

/// Runs one client connection to completion.
async fn serve_client(socket: WebSocket, state: Arc<AppState>) {
    let (mut sink, mut inbound) = socket.split();

    // Subscribe before snapshotting so no event between the greeting and
    // the first recv() can be missed.
    let mut events = state.broadcaster.subscribe();
    let snapshot = state.session.lock().await.snapshot();

    if !push_event(&mut sink, &SessionEvent::connected(snapshot)).await {
        debug!("Client vanished before the greeting");
        return;
    }
    info!("WebSocket client connected");

    let mut ticker = interval(HEARTBEAT_INTERVAL);
    // The first tick of a tokio interval fires immediately; swallow it
    // so the first real ping goes out one full interval after connect.
    ticker.tick().await;

    let mut heartbeat = Heartbeat::default();

    loop {
        tokio::select! {
            frame = inbound.next() => {
                match classify_inbound(frame) {
                    Inbound::Continue => {}
                    Inbound::Pong => heartbeat.ack(),
                    Inbound::PingBack(data) => {
                        if sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Inbound::Gone => break,
                }
            }

            event = events.recv() => {
                match event {
                    Ok(event) => {
                        if !push_event(&mut sink, &event).await {
                            debug!("Client went away mid-stream");
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "Slow WebSocket client skipped events");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            _ = ticker.tick() => {
                if sink.send(Message::Ping(Vec::new())).await.is_err() {
                    break;
                }
                if !heartbeat.beat() {
                    info!(
                        pending = MAX_PENDING_PINGS,
                        "Client stopped answering pings, disconnecting"
                    );
                    break;
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}
