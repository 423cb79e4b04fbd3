//! Session state for the GRIN flow.
//!
//! This module defines the screen state machine (intro, detector,
//! redeem), the per-session statistics, and the [`Session`] type that
//! ties the smile tracker to the flow. Samples enter through a single
//! mpsc funnel ([`pump_samples`]); all mutation happens under one lock,
//! so tracker reads for display can never tear.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use grin_tracker::{GoalReached, SmileSample, SmileTracker, TrackerState};
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, SessionError};
use crate::events::{EventBroadcaster, SessionEvent};

// ============================================================================
// Screen
// ============================================================================

/// The screen the user is currently on.
///
/// Transitions:
/// - `Intro` -> `Detector` via [`Session::begin_detection`]
/// - `Detector` -> `Redeem` via [`Session::open_redeem`] (requires the
///   reward to be available)
/// - `Redeem` -> `Detector` via [`Session::dismiss_redeem`] (the only
///   place the sticky goal flag is cleared)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Animated intro ("Did you smile today?").
    #[default]
    Intro,
    /// Live camera view with smile detection.
    Detector,
    /// Reward/coupon redemption screen.
    Redeem,
}

impl Screen {
    /// Returns `true` if this screen consumes classifier samples.
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        matches!(self, Self::Detector)
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Intro => write!(f, "intro"),
            Self::Detector => write!(f, "detector"),
            Self::Redeem => write!(f, "redeem"),
        }
    }
}

// ============================================================================
// SessionStats
// ============================================================================

/// Counters accumulated over a session, used for the reward card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStats {
    /// Total classifier samples observed.
    pub samples: u64,

    /// Number of smiling streaks started.
    pub streaks: u32,

    /// Longest streak seen so far.
    pub longest_streak: Duration,
}

impl SessionStats {
    /// Folds one sample (and the tracker state after it) into the counters.
    fn record(&mut self, was_smiling: bool, state: TrackerState) {
        self.samples += 1;

        if state.is_smiling() {
            if !was_smiling {
                self.streaks += 1;
            }
            if state.current_duration > self.longest_streak {
                self.longest_streak = state.current_duration;
            }
        }
    }
}

// ============================================================================
// SessionState
// ============================================================================

/// Serializable snapshot of a session, served by the status API and
/// carried in the `connected` WebSocket event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// The current screen.
    pub screen: Screen,

    /// The tracker snapshot.
    pub tracker: TrackerState,

    /// Whether the reward dialog is showing (goal reached and not yet
    /// dismissed).
    pub reward_available: bool,

    /// The configured goal in seconds.
    pub goal_seconds: f64,

    /// Session counters.
    pub stats: SessionStats,

    /// When the session started.
    pub started_at: DateTime<Utc>,

    /// When the session state last changed.
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Session
// ============================================================================

/// A single smile session: the tracker plus the screen flow around it.
///
/// All methods take `&mut self`; the session is shared behind an
/// `Arc<Mutex<_>>` and mutated only by the sample pump and the API
/// handlers.
#[derive(Debug)]
pub struct Session {
    tracker: SmileTracker,
    screen: Screen,
    reward_available: bool,
    stats: SessionStats,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session with the given smile goal, starting on the
    /// intro screen.
    #[must_use]
    pub fn new(goal: Duration) -> Self {
        let now = Utc::now();
        Self {
            tracker: SmileTracker::new(goal),
            screen: Screen::Intro,
            reward_available: false,
            stats: SessionStats::default(),
            started_at: now,
            updated_at: now,
        }
    }

    /// Creates a session from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.goal())
    }

    /// The current screen.
    #[must_use]
    pub const fn screen(&self) -> Screen {
        self.screen
    }

    /// Whether the reward dialog is currently available.
    #[must_use]
    pub const fn reward_available(&self) -> bool {
        self.reward_available
    }

    /// Session counters so far.
    #[must_use]
    pub const fn stats(&self) -> SessionStats {
        self.stats
    }

    /// When the session started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Elapsed time since the session started.
    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        Utc::now() - self.started_at
    }

    /// Returns a serializable snapshot of the session.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        SessionState {
            screen: self.screen,
            tracker: self.tracker.state(),
            reward_available: self.reward_available,
            goal_seconds: self.tracker.goal().as_secs_f64(),
            stats: self.stats,
            started_at: self.started_at,
            updated_at: self.updated_at,
        }
    }

    /// Updates the `updated_at` timestamp to the current time.
    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Applies one classifier sample.
    ///
    /// Returns the goal edge when this sample reaches the goal; the
    /// reward then stays available until
    /// [`dismiss_redeem`](Self::dismiss_redeem) clears it.
    pub fn observe(&mut self, sample: SmileSample) -> Option<GoalReached> {
        let was_smiling = self.tracker.state().is_smiling();
        let edge = self.tracker.observe(sample);
        self.stats.record(was_smiling, self.tracker.state());
        self.touch();

        if edge.is_some() {
            info!(
                streak_seconds = self.tracker.state().current_seconds(),
                "Smile goal reached"
            );
            self.reward_available = true;
        }

        edge
    }

    /// Leaves the intro screen and starts detection ("Go smile!").
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidScreenTransition` unless the
    /// session is on the intro screen.
    pub fn begin_detection(&mut self) -> Result<()> {
        if self.screen != Screen::Intro {
            return Err(SessionError::invalid_transition(self.screen, Screen::Detector));
        }

        self.screen = Screen::Detector;
        self.touch();
        info!("Detection started");
        Ok(())
    }

    /// Opens the redeem screen ("Redeem your gift").
    ///
    /// # Errors
    ///
    /// Returns `SessionError::RewardNotAvailable` if the goal has not
    /// been reached, or `SessionError::InvalidScreenTransition` when
    /// not on the detector screen.
    pub fn open_redeem(&mut self) -> Result<()> {
        if self.screen != Screen::Detector {
            return Err(SessionError::invalid_transition(self.screen, Screen::Redeem));
        }
        if !self.reward_available {
            return Err(SessionError::RewardNotAvailable);
        }

        self.screen = Screen::Redeem;
        self.touch();
        info!("Redeem screen opened");
        Ok(())
    }

    /// Dismisses the redeem screen ("Done") and returns to the
    /// detector.
    ///
    /// This is the only place the tracker's sticky goal flag is
    /// cleared, so a new streak can trigger the reward again.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidScreenTransition` unless the
    /// session is on the redeem screen.
    pub fn dismiss_redeem(&mut self) -> Result<()> {
        if self.screen != Screen::Redeem {
            return Err(SessionError::invalid_transition(self.screen, Screen::Detector));
        }

        self.screen = Screen::Detector;
        self.reward_available = false;
        self.tracker.reset();
        self.touch();
        info!("Reward dismissed, smile tracking reset");
        Ok(())
    }
}

// ============================================================================
// Sample pump
// ============================================================================

/// Drives a session from the sample funnel until the channel closes.
///
/// This is the single serialization point for tracker mutation: one
/// receiver, one task, one lock acquisition per sample. Each sample
/// produces a `smile_update` broadcast, and the goal edge additionally
/// produces a `goal_reached` broadcast (exactly once per reset cycle).
pub async fn pump_samples(
    session: Arc<Mutex<Session>>,
    mut samples: mpsc::Receiver<SmileSample>,
    broadcaster: EventBroadcaster,
) {
    while let Some(sample) = samples.recv().await {
        let (edge, state) = {
            let mut session = session.lock().await;
            let edge = session.observe(sample);
            (edge, session.snapshot())
        };

        broadcaster.send(SessionEvent::smile_update(&state));

        if let Some(goal) = edge {
            broadcaster.send(SessionEvent::goal_reached(goal));
        }
    }

    debug!("Sample channel closed, pump finished");
}

// ============================================================================
// Tests
// ============================================================================
