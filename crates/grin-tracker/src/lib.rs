//! GRIN Smile Tracking
//!
//! This crate provides the core state machine that turns a stream of
//! per-frame smile observations into a continuous-duration signal and a
//! one-shot goal flag.
//!
//! The tracker is a synchronous, non-suspending reducer: it holds no
//! locks, spawns no tasks, and cannot fail. Samples must be delivered
//! one at a time from a single producer context; serializing delivery
//! is the caller's responsibility (the session layer funnels samples
//! through a single channel).
//!
//! # Types
//!
//! - [`SmileSample`] - A single timestamped classifier observation
//! - [`TrackerState`] - Read-only snapshot of the current streak
//! - [`GoalReached`] - Emitted exactly once per reset cycle when the
//!   goal duration is reached
//! - [`SmileTracker`] - The reducer itself

mod tracker;

pub use tracker::{SmileTracker, DEFAULT_GOAL};

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// SmileSample
// ============================================================================

/// A single classifier observation: whether a smile was present in one
/// processed video frame, and when that frame was captured.
///
/// Samples are produced by the frame-classification collaborator at its
/// own cadence (nominally once per camera frame) and are never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmileSample {
    /// When the observed frame was captured.
    pub timestamp: DateTime<Utc>,

    /// Whether a smile was detected in the frame.
    pub is_smiling: bool,
}

impl SmileSample {
    /// Creates a new sample.
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, is_smiling: bool) -> Self {
        Self {
            timestamp,
            is_smiling,
        }
    }

    /// Creates a smiling sample at the given instant.
    #[must_use]
    pub const fn smiling(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, true)
    }

    /// Creates a not-smiling sample at the given instant.
    #[must_use]
    pub const fn not_smiling(timestamp: DateTime<Utc>) -> Self {
        Self::new(timestamp, false)
    }
}

// ============================================================================
// TrackerState
// ============================================================================

/// Snapshot of the tracker's state after the most recent sample.
///
/// Invariants:
/// - `streak_start` is `None` iff the most recent sample was not
///   smiling (or no sample has arrived yet).
/// - `goal_reached == true` implies `current_duration` reached the goal
///   at some point since the last reset. The flag is sticky: smiling
///   stopping does not clear it, only [`SmileTracker::reset`] does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackerState {
    /// When the current unbroken smiling streak began, if one is active.
    pub streak_start: Option<DateTime<Utc>>,

    /// Elapsed time since `streak_start`, or zero when not smiling.
    pub current_duration: Duration,

    /// Whether the goal duration has been reached since the last reset.
    pub goal_reached: bool,
}

impl TrackerState {
    /// Returns `true` if the subject is currently smiling.
    #[must_use]
    pub const fn is_smiling(&self) -> bool {
        self.streak_start.is_some()
    }

    /// Returns the current streak length in fractional seconds.
    ///
    /// Convenience for display code (e.g. "Smiling: 3.2/5.0s").
    #[must_use]
    pub fn current_seconds(&self) -> f64 {
        self.current_duration.as_secs_f64()
    }
}

// ============================================================================
// GoalReached
// ============================================================================

/// Emitted by [`SmileTracker::observe`] on the false-to-true transition
/// of the goal flag.
///
/// The transition fires at most once per reset cycle, so a consumer that
/// reacts to this value (e.g. by showing a reward dialog) observes the
/// edge exactly once per streak that reaches the goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalReached {
    /// Timestamp of the sample that crossed the goal threshold.
    pub reached_at: DateTime<Utc>,

    /// When the winning streak began.
    pub streak_start: DateTime<Utc>,

    /// Length of the streak at the moment the goal was reached.
    pub streak: Duration,
}
