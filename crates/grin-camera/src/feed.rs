//! The camera feed task.
//!
//! [`CameraFeed`] owns the producer side of the sample funnel: a tokio
//! task that stamps a [`Frame`] at a fixed interval, runs it through a
//! [`SmileClassifier`], and sends the resulting `SmileSample` into an
//! mpsc channel. The receiving half is the single serialization point
//! required by the tracker; there is exactly one producer task per feed.

use std::time::Duration;

use chrono::Utc;
use grin_tracker::SmileSample;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, instrument, warn};

use crate::{CameraError, Frame, Result, SmileClassifier};

/// Options for opening a camera feed.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use grin_camera::FeedOptions;
///
/// let options = FeedOptions::new(Duration::from_millis(100))
///     .with_channel_capacity(64);
/// ```
#[derive(Debug, Clone)]
pub struct FeedOptions {
    /// Time between captured frames.
    pub frame_interval: Duration,

    /// Capacity of the sample channel.
    pub channel_capacity: usize,

    /// Whether a camera device is present. A missing device is not an
    /// error for the session (the tracker simply never receives
    /// samples), but [`CameraFeed::open`] reports it so the caller can
    /// log and degrade.
    pub available: bool,
}

impl FeedOptions {
    /// Default capacity of the sample channel.
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

    /// Creates options with the given frame interval.
    #[must_use]
    pub const fn new(frame_interval: Duration) -> Self {
        Self {
            frame_interval,
            channel_capacity: Self::DEFAULT_CHANNEL_CAPACITY,
            available: true,
        }
    }

    /// Overrides the sample channel capacity.
    #[must_use]
    pub const fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Marks the camera device as present or missing.
    #[must_use]
    pub const fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }
}

/// Produces [`SmileSample`](grin_tracker::SmileSample)s from a
/// classifier at a fixed cadence.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use grin_camera::{CameraFeed, ConstantClassifier, FeedOptions};
///
/// # async fn example() -> grin_camera::Result<()> {
/// let mut feed = CameraFeed::open(FeedOptions::new(Duration::from_millis(100)))?;
/// let mut samples = feed.start(ConstantClassifier(true));
/// while let Some(sample) = samples.recv().await {
///     println!("smiling: {}", sample.is_smiling);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct CameraFeed {
    options: FeedOptions,
    handle: Option<JoinHandle<()>>,
}

impl CameraFeed {
    /// Opens a feed with the given options.
    ///
    /// # Errors
    ///
    /// Returns [`CameraError::Unavailable`] when the options describe a
    /// missing camera device.
    pub fn open(options: FeedOptions) -> Result<Self> {
        if !options.available {
            return Err(CameraError::Unavailable);
        }

        Ok(Self {
            options,
            handle: None,
        })
    }

    /// Starts the producer task and returns the sample receiver.
    ///
    /// The task runs until the receiver is dropped or
    /// [`stop`](Self::stop) is called. Classifier errors are logged and
    /// the frame is skipped; the feed keeps running (a transient
    /// detector failure must not end the session).
    #[instrument(skip_all, fields(interval_ms = self.options.frame_interval.as_millis()))]
    pub fn start<C>(&mut self, classifier: C) -> mpsc::Receiver<SmileSample>
    where
        C: SmileClassifier + 'static,
    {
        let (tx, rx) = mpsc::channel(self.options.channel_capacity);
        let frame_interval = self.options.frame_interval;

        info!("Starting camera feed");
        let handle = tokio::spawn(run_feed(classifier, frame_interval, tx));
        self.handle = Some(handle);

        rx
    }

    /// Stops the producer task, closing the sample channel.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            info!("Stopping camera feed");
            handle.abort();
        }
    }

    /// Returns `true` while the producer task is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for CameraFeed {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The producer loop: one frame per tick, one sample per frame.
async fn run_feed<C>(
    mut classifier: C,
    frame_interval: Duration,
    tx: mpsc::Sender<SmileSample>,
) where
    C: SmileClassifier,
{
    let mut ticker = interval(frame_interval);
    let mut index: u64 = 0;

    loop {
        ticker.tick().await;

        let frame = Frame {
            index,
            captured_at: Utc::now(),
        };
        index += 1;

        let classification = match classifier.classify(&frame) {
            Ok(classification) => classification,
            Err(e) => {
                warn!(frame = frame.index, error = %e, "Classifier failed, skipping frame");
                continue;
            }
        };

        let sample = SmileSample::new(frame.captured_at, classification.is_smiling);
        if tx.send(sample).await.is_err() {
            debug!("Sample receiver dropped, ending feed");
            break;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{Classification, ConstantClassifier};

    /// A classifier that fails on every other frame.
    struct FlakyClassifier;

    impl SmileClassifier for FlakyClassifier {
        fn classify(&mut self, frame: &Frame) -> Result<Classification> {
            if frame.index % 2 == 0 {
                Ok(Classification::SMILING)
            } else {
                Err(CameraError::Classifier("lost the face".to_string()))
            }
        }
    }

    #[test]
    fn test_open_unavailable_camera_fails() {
        let options = FeedOptions::new(Duration::from_millis(10)).with_available(false);
        let err = CameraFeed::open(options).unwrap_err();
        assert!(matches!(err, CameraError::Unavailable));
    }

    #[tokio::test]
    async fn test_feed_produces_ordered_samples() {
        let mut feed = CameraFeed::open(FeedOptions::new(Duration::from_millis(5))).unwrap();
        let mut rx = feed.start(ConstantClassifier(true));

        let mut samples = Vec::new();
        for _ in 0..5 {
            samples.push(rx.recv().await.unwrap());
        }

        assert!(samples.iter().all(|s| s.is_smiling));
        assert!(
            samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
            "timestamps must be non-decreasing"
        );
    }

    #[tokio::test]
    async fn test_feed_skips_failed_frames() {
        let mut feed = CameraFeed::open(FeedOptions::new(Duration::from_millis(5))).unwrap();
        let mut rx = feed.start(FlakyClassifier);

        // Every delivered sample came from a successful classification.
        for _ in 0..3 {
            let sample = rx.recv().await.unwrap();
            assert!(sample.is_smiling);
        }
    }

    #[tokio::test]
    async fn test_stop_closes_channel() {
        let mut feed = CameraFeed::open(FeedOptions::new(Duration::from_millis(5))).unwrap();
        let mut rx = feed.start(ConstantClassifier(false));

        assert!(feed.is_running());
        feed.stop();

        // Drain whatever was buffered; the channel must then close.
        while rx.recv().await.is_some() {}
        assert!(!feed.is_running());
    }
}
