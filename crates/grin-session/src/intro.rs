//! Intro screen sequencing.
//!
//! The intro reveals three elements on a timeline: the emoji, the
//! tagline, and the "Go smile!" button. This module owns the timeline
//! and the task that plays it, emitting an [`intro_stage`] event as
//! each element appears. Rendering is the presentation layer's job.
//!
//! [`intro_stage`]: crate::events::SessionEvent::IntroStage

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::debug;

use crate::config::IntroConfig;
use crate::events::{EventBroadcaster, SessionEvent};

/// One revealed element of the intro screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntroStage {
    /// The large smiley.
    Emoji,
    /// "Did you smile today?"
    Tagline,
    /// The "Go smile!" button.
    Button,
}

impl IntroStage {
    /// The on-screen text for this stage.
    #[must_use]
    pub const fn text(&self) -> &'static str {
        match self {
            Self::Emoji => "\u{1F60A}",
            Self::Tagline => "Did you smile today?",
            Self::Button => "Go smile!",
        }
    }
}

impl std::fmt::Display for IntroStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Emoji => write!(f, "emoji"),
            Self::Tagline => write!(f, "tagline"),
            Self::Button => write!(f, "button"),
        }
    }
}

/// The intro reveal timeline: each stage with its delay from the start
/// of the intro screen.
#[derive(Debug, Clone)]
pub struct IntroTimeline {
    cues: Vec<(IntroStage, Duration)>,
}

impl IntroTimeline {
    /// Builds the timeline from configuration.
    ///
    /// The config validation guarantees the delays are non-decreasing,
    /// so the cues are already in playback order.
    #[must_use]
    pub fn from_config(config: &IntroConfig) -> Self {
        Self {
            cues: vec![
                (IntroStage::Emoji, Duration::from_millis(config.emoji_delay_ms)),
                (
                    IntroStage::Tagline,
                    Duration::from_millis(config.tagline_delay_ms),
                ),
                (
                    IntroStage::Button,
                    Duration::from_millis(config.button_delay_ms),
                ),
            ],
        }
    }

    /// Returns the cues in playback order.
    #[must_use]
    pub fn cues(&self) -> &[(IntroStage, Duration)] {
        &self.cues
    }

    /// Total time until the last stage is revealed.
    #[must_use]
    pub fn total(&self) -> Duration {
        self.cues.last().map_or(Duration::ZERO, |(_, delay)| *delay)
    }

    /// Plays the timeline, broadcasting each stage as it is revealed.
    ///
    /// Completes when the button is visible; the caller then waits for
    /// the user (or the demo driver) to begin detection.
    pub async fn play(&self, broadcaster: &EventBroadcaster) {
        let mut elapsed = Duration::ZERO;

        for (stage, delay) in &self.cues {
            sleep(delay.saturating_sub(elapsed)).await;
            elapsed = *delay;

            debug!(stage = %stage, "Intro stage revealed");
            broadcaster.send(SessionEvent::intro_stage(*stage));
        }
    }
}
