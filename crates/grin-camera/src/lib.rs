//! GRIN Camera and Classification
//!
//! The frame-classification collaborator behind the smile tracker.
//!
//! This crate owns the narrow seam between the session and whatever
//! produces smile observations: a [`Frame`] handle, the
//! [`SmileClassifier`] trait (`classify(frame) -> {is_smiling}`), and a
//! [`CameraFeed`] that stamps frames at a fixed cadence, runs them
//! through a classifier, and funnels the resulting
//! [`SmileSample`](grin_tracker::SmileSample)s into a single channel.
//!
//! Real face detection is a platform service; the implementations here
//! ([`ScriptedClassifier`], [`ConstantClassifier`]) are deterministic
//! stand-ins used by the demo CLI and the test suite. Any detection
//! backend can be substituted without touching the tracker.

mod feed;

pub use feed::{CameraFeed, FeedOptions};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur in the camera/classifier collaborator.
#[derive(Debug, Error)]
pub enum CameraError {
    /// No camera device is available.
    #[error("no camera device available")]
    Unavailable,

    /// Camera access was denied by the platform.
    #[error("camera permission denied")]
    PermissionDenied,

    /// The camera device is held by another process.
    #[error("camera device busy: {0}")]
    DeviceBusy(String),

    /// The classifier backend failed to process a frame.
    #[error("classifier error: {0}")]
    Classifier(String),

    /// A smile script could not be parsed.
    #[error("invalid smile script '{input}': {message}")]
    InvalidScript {
        /// The offending script text.
        input: String,
        /// Description of the parse failure.
        message: String,
    },
}

impl CameraError {
    /// Returns `true` if the operation may succeed on retry.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::DeviceBusy(_))
    }

    /// Returns `true` if no retry can help (the user must intervene).
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::PermissionDenied)
    }
}

/// Result type for camera operations.
pub type Result<T> = std::result::Result<T, CameraError>;

// ============================================================================
// Frame and Classification
// ============================================================================

/// An opaque handle to one captured video frame.
///
/// The feed produces frames at its own cadence; no pixel data crosses
/// this boundary, only the capture instant the classifier needs to
/// stamp its observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    /// Monotonically increasing frame counter within one feed.
    pub index: u64,

    /// When the frame was captured.
    pub captured_at: DateTime<Utc>,
}

/// The classifier's verdict for a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    /// Whether any detected face in the frame is smiling.
    pub is_smiling: bool,
}

impl Classification {
    /// A smiling verdict.
    pub const SMILING: Self = Self { is_smiling: true };

    /// A not-smiling verdict.
    pub const NOT_SMILING: Self = Self { is_smiling: false };
}

/// Per-frame smile detection.
///
/// Implementations are stateful (they may anchor their own clock on the
/// first frame) and are driven from a single feed task, so `&mut self`
/// access is always serialized.
pub trait SmileClassifier: Send {
    /// Classifies one frame.
    fn classify(&mut self, frame: &Frame) -> Result<Classification>;
}

// ============================================================================
// Script
// ============================================================================

/// One phase of a smile script.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Length of the phase in seconds.
    pub seconds: f64,

    /// Whether the subject smiles during the phase.
    pub smiling: bool,
}

impl Segment {
    /// Creates a new segment.
    #[must_use]
    pub const fn new(seconds: f64, smiling: bool) -> Self {
        Self { seconds, smiling }
    }
}

/// A deterministic timeline of smiling and not-smiling phases.
///
/// Scripts describe what the [`ScriptedClassifier`] reports over time.
/// They appear as JSON arrays in configuration and can also be written
/// in a compact text form for the CLI: comma-separated tokens of a
/// duration in seconds followed by `s` (smiling) or `n` (not smiling),
/// e.g. `"2n,6s"` is two seconds of no smile followed by six seconds of
/// smiling. Frames past the end of the script classify as not smiling.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Script {
    segments: Vec<Segment>,
}

impl Script {
    /// Creates a script from segments.
    #[must_use]
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Parses the compact text form, e.g. `"1.5n,6s"`.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::InvalidScript`] for empty input, unknown
    /// phase suffixes, or unparseable durations.
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |message: String| CameraError::InvalidScript {
            input: input.to_string(),
            message,
        };

        let mut segments = Vec::new();
        for token in input.split(',') {
            let token = token.trim();
            if token.is_empty() {
                return Err(invalid("empty segment".to_string()));
            }

            let smiling = match token.chars().last() {
                Some('s') => true,
                Some('n') => false,
                _ => {
                    return Err(invalid(format!(
                        "segment '{token}' must end in 's' (smiling) or 'n' (not smiling)"
                    )));
                }
            };

            let seconds: f64 = token[..token.len() - 1]
                .parse()
                .map_err(|_| invalid(format!("segment '{token}' has no valid duration")))?;
            if seconds <= 0.0 {
                return Err(invalid(format!("segment '{token}' must be positive")));
            }

            segments.push(Segment::new(seconds, smiling));
        }

        Ok(Self::new(segments))
    }

    /// Returns the segments in order.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Returns `true` if the script has no segments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total scripted time in seconds.
    #[must_use]
    pub fn total_seconds(&self) -> f64 {
        self.segments.iter().map(|s| s.seconds).sum()
    }

    /// The scripted verdict at `offset` seconds from the script start.
    ///
    /// Each segment covers the half-open interval `[start, start +
    /// seconds)`; offsets past the end of the script are not smiling.
    #[must_use]
    pub fn smiling_at(&self, offset: f64) -> bool {
        let mut start = 0.0;
        for segment in &self.segments {
            let end = start + segment.seconds;
            if offset >= start && offset < end {
                return segment.smiling;
            }
            start = end;
        }
        false
    }
}

// ============================================================================
// Classifier implementations
// ============================================================================

/// Plays back a [`Script`], anchored on the first frame it sees.
#[derive(Debug, Clone)]
pub struct ScriptedClassifier {
    script: Script,
    anchored_at: Option<DateTime<Utc>>,
}

impl ScriptedClassifier {
    /// Creates a classifier for the given script.
    #[must_use]
    pub const fn new(script: Script) -> Self {
        Self {
            script,
            anchored_at: None,
        }
    }

    /// The script being played back.
    #[must_use]
    pub const fn script(&self) -> &Script {
        &self.script
    }
}

impl SmileClassifier for ScriptedClassifier {
    fn classify(&mut self, frame: &Frame) -> Result<Classification> {
        let anchor = *self.anchored_at.get_or_insert(frame.captured_at);
        let offset = (frame.captured_at - anchor)
            .to_std()
            .unwrap_or_default()
            .as_secs_f64();

        Ok(Classification {
            is_smiling: self.script.smiling_at(offset),
        })
    }
}

/// Reports the same verdict for every frame.
#[derive(Debug, Clone, Copy)]
pub struct ConstantClassifier(pub bool);

impl SmileClassifier for ConstantClassifier {
    fn classify(&mut self, _frame: &Frame) -> Result<Classification> {
        Ok(Classification {
            is_smiling: self.0,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
