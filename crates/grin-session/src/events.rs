//! Session event types and broadcasting for real-time observation.
//!
//! The presentation layer re-renders whenever the session changes; this
//! module is the mechanism. Events are broadcast to all connected
//! WebSocket clients as the session progresses.
//!
//! # Event Types
//!
//! - `connected` - Sent when a client connects, includes current state
//! - `intro_stage` - An intro element was revealed
//! - `smile_update` - A classifier sample was applied
//! - `goal_reached` - The smile goal was reached (once per reset cycle)
//! - `screen_changed` - The user moved between screens
//! - `error` - An error occurred
//!
//! # Example
//!
//! ```no_run
//! use grin_session::{EventBroadcaster, Session, SessionEvent};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let broadcaster = EventBroadcaster::new(100);
//! let mut receiver = broadcaster.subscribe();
//!
//! let session = Session::new(Duration::from_secs(5));
//! broadcaster.send(SessionEvent::connected(session.snapshot()));
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {:?}", event);
//! }
//! # }
//! ```

use chrono::{DateTime, Utc};
use grin_tracker::GoalReached;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::intro::IntroStage;
use crate::session::{Screen, SessionState};

// ============================================================================
// Event Payloads
// ============================================================================

/// Payload for the `connected` event.
///
/// Sent immediately when a WebSocket client connects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectedPayload {
    /// The current session state.
    pub state: SessionState,
}

/// Payload for the `intro_stage` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntroStagePayload {
    /// The revealed stage.
    pub stage: IntroStage,
    /// The on-screen text for the stage.
    pub text: String,
    /// When the stage was revealed.
    pub timestamp: DateTime<Utc>,
}

/// Payload for the `smile_update` event.
///
/// Sent once per applied classifier sample. Carries only the fields the
/// detector overlay needs to render its label.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmileUpdatePayload {
    /// Whether the subject is currently smiling.
    pub smiling: bool,
    /// Length of the current streak in seconds.
    pub streak_seconds: f64,
    /// The configured goal in seconds.
    pub goal_seconds: f64,
    /// Whether the goal has been reached since the last reset.
    pub goal_reached: bool,
}

/// Payload for the `goal_reached` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalReachedPayload {
    /// When the goal was reached.
    pub reached_at: DateTime<Utc>,
    /// Length of the winning streak in seconds.
    pub streak_seconds: f64,
}

/// Payload for the `screen_changed` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScreenChangedPayload {
    /// The screen now showing.
    pub screen: Screen,
}

/// Payload for the `error` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Human-readable error message.
    pub message: String,
}

// ============================================================================
// Event Enum
// ============================================================================

/// WebSocket event types for session observation.
///
/// All events are serialized as JSON objects with "event" and "payload"
/// fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Sent when a client connects.
    Connected(ConnectedPayload),
    /// Sent when an intro element is revealed.
    IntroStage(IntroStagePayload),
    /// Sent when a classifier sample is applied.
    SmileUpdate(SmileUpdatePayload),
    /// Sent when the smile goal is reached.
    GoalReached(GoalReachedPayload),
    /// Sent when the user moves between screens.
    ScreenChanged(ScreenChangedPayload),
    /// Sent when an error occurs.
    Error(ErrorPayload),
}

impl SessionEvent {
    /// Creates a `Connected` event with the current session state.
    #[must_use]
    pub const fn connected(state: SessionState) -> Self {
        Self::Connected(ConnectedPayload { state })
    }

    /// Creates an `IntroStage` event.
    #[must_use]
    pub fn intro_stage(stage: IntroStage) -> Self {
        Self::IntroStage(IntroStagePayload {
            stage,
            text: stage.text().to_string(),
            timestamp: Utc::now(),
        })
    }

    /// Creates a `SmileUpdate` event from a session snapshot.
    #[must_use]
    pub fn smile_update(state: &SessionState) -> Self {
        Self::SmileUpdate(SmileUpdatePayload {
            smiling: state.tracker.is_smiling(),
            streak_seconds: state.tracker.current_seconds(),
            goal_seconds: state.goal_seconds,
            goal_reached: state.tracker.goal_reached,
        })
    }

    /// Creates a `GoalReached` event from the tracker's goal edge.
    #[must_use]
    pub fn goal_reached(goal: GoalReached) -> Self {
        Self::GoalReached(GoalReachedPayload {
            reached_at: goal.reached_at,
            streak_seconds: goal.streak.as_secs_f64(),
        })
    }

    /// Creates a `ScreenChanged` event.
    #[must_use]
    pub const fn screen_changed(screen: Screen) -> Self {
        Self::ScreenChanged(ScreenChangedPayload { screen })
    }

    /// Creates an `Error` event.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
        })
    }

    /// Returns the event name as a string.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Connected(_) => "connected",
            Self::IntroStage(_) => "intro_stage",
            Self::SmileUpdate(_) => "smile_update",
            Self::GoalReached(_) => "goal_reached",
            Self::ScreenChanged(_) => "screen_changed",
            Self::Error(_) => "error",
        }
    }
}

// ============================================================================
// Event Broadcaster
// ============================================================================

/// Fans session events out to every live subscriber.
///
/// A thin wrapper around a tokio broadcast channel. Nothing is replayed
/// for late joiners; the WebSocket handler covers them by sending a
/// `connected` snapshot first.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBroadcaster {
    /// Creates a broadcaster whose subscribers each buffer up to
    /// `capacity` events before the oldest are dropped.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Registers a new subscriber.
    ///
    /// A subscriber that falls behind its buffer observes a `Lagged`
    /// error and resumes from the most recent events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Sends an event to every current subscriber, returning how many
    /// of them will see it. Zero subscribers is not an error.
    pub fn send(&self, event: SessionEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

// ============================================================================
// Tests
// ============================================================================
