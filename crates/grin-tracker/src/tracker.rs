//! The smile-duration reducer.
//!
//! Two states, edge-triggered goal:
//!
//! - **NotSmiling** (initial) -> smiling sample -> **Smiling** with
//!   `streak_start` set to the sample timestamp.
//! - **Smiling** -> not-smiling sample -> **NotSmiling** (duration
//!   cleared, goal flag untouched).
//! - **Smiling** -> elapsed >= goal while still smiling -> emits
//!   [`GoalReached`] once and stays in **Smiling**.
//! - [`SmileTracker::reset`] returns to **NotSmiling** from any state
//!   and clears the goal flag.

use std::time::Duration;

use crate::{GoalReached, SmileSample, TrackerState};

/// The product goal: five continuous seconds of smiling.
pub const DEFAULT_GOAL: Duration = Duration::from_secs(5);

/// Converts a stream of [`SmileSample`]s into a continuous-duration
/// signal and a one-shot goal flag.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use grin_tracker::{SmileSample, SmileTracker};
///
/// let mut tracker = SmileTracker::default();
/// let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
///
/// assert!(tracker.observe(SmileSample::smiling(t0)).is_none());
/// let edge = tracker.observe(SmileSample::smiling(t0 + chrono::Duration::seconds(5)));
/// assert!(edge.is_some());
/// assert!(tracker.state().goal_reached);
/// ```
#[derive(Debug, Clone)]
pub struct SmileTracker {
    /// The continuous-smile duration that triggers the goal.
    goal: Duration,

    /// Current streak state.
    state: TrackerState,
}

impl Default for SmileTracker {
    fn default() -> Self {
        Self::new(DEFAULT_GOAL)
    }
}

impl SmileTracker {
    /// Creates a tracker with a custom goal duration.
    #[must_use]
    pub fn new(goal: Duration) -> Self {
        Self {
            goal,
            state: TrackerState::default(),
        }
    }

    /// Returns the configured goal duration.
    #[must_use]
    pub const fn goal(&self) -> Duration {
        self.goal
    }

    /// Returns a snapshot of the current state.
    ///
    /// Repeated calls without an intervening [`observe`](Self::observe)
    /// or [`reset`](Self::reset) return identical values.
    #[must_use]
    pub const fn state(&self) -> TrackerState {
        self.state
    }

    /// Applies one classifier observation.
    ///
    /// Returns `Some(GoalReached)` only on the sample that transitions
    /// the goal flag from false to true; every other call returns
    /// `None`. The flag then stays true, regardless of later samples,
    /// until [`reset`](Self::reset).
    ///
    /// Samples are expected in non-decreasing timestamp order. A sample
    /// timestamped before the streak start clamps the duration to zero
    /// rather than failing; duration accuracy under reordering is
    /// unspecified.
    pub fn observe(&mut self, sample: SmileSample) -> Option<GoalReached> {
        if !sample.is_smiling {
            self.state.streak_start = None;
            self.state.current_duration = Duration::ZERO;
            return None;
        }

        let streak_start = match self.state.streak_start {
            Some(start) => start,
            None => {
                self.state.streak_start = Some(sample.timestamp);
                sample.timestamp
            }
        };

        // Negative deltas clamp to zero.
        self.state.current_duration = (sample.timestamp - streak_start)
            .to_std()
            .unwrap_or(Duration::ZERO);

        if self.state.current_duration >= self.goal && !self.state.goal_reached {
            self.state.goal_reached = true;
            return Some(GoalReached {
                reached_at: sample.timestamp,
                streak_start,
                streak: self.state.current_duration,
            });
        }

        None
    }

    /// Clears the streak and the goal flag, returning the tracker to
    /// its initial state.
    ///
    /// Called by the presentation layer after the reward flow is
    /// dismissed, so a later streak can trigger the reward again.
    pub fn reset(&mut self) {
        self.state = TrackerState::default();
    }
}

// ============================================================================
// Tests
// ============================================================================
