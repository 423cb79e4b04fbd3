//! End-to-end integration tests for the GRIN session flow.
//!
//! These tests drive the full pipeline from scripted classification
//! through the session screens to reward card generation, without going
//! over the network (see `test_websocket.rs` for the API surface).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use grin_camera::{CameraFeed, FeedOptions, Frame, Script, ScriptedClassifier, SmileClassifier};
use grin_reward::{Coupon, MarkdownGenerator, RewardCard, RewardSummary};
use grin_session::{pump_samples, Config, EventBroadcaster, Screen, Session, SessionEvent};
use grin_tracker::{SmileSample, SmileTracker};
use tokio::sync::Mutex;

/// Path to the sample config fixture.
fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures/demo")
}

/// Fixed base instant for deterministic timestamps.
fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).single().expect("valid timestamp")
}

/// Timestamp `secs` fractional seconds after the base instant.
fn at(secs: f64) -> DateTime<Utc> {
    base() + chrono::Duration::milliseconds((secs * 1000.0).round() as i64)
}

// ============================================================================
// Config fixture tests
// ============================================================================

/// Tests that the sample config fixture loads successfully.
#[test]
fn test_fixture_config_loads() {
    let config = Config::load_from_dir(&fixture_path()).expect("Failed to load fixture config");

    assert!((config.goal_seconds - 3.0).abs() < f64::EPSILON);
    assert_eq!(config.frame_interval_ms, 50);
    assert_eq!(config.coupon.code, "DEMO-GRIN");
    assert_eq!(config.camera.script.segments().len(), 2);
}

/// Tests that config validation rejects a broken goal.
#[test]
fn test_config_validation_end_to_end() {
    let mut config = Config::default();
    config.goal_seconds = -1.0;
    assert!(config.validate().is_err());
}

// ============================================================================
// Full flow tests (hand-fed samples)
// ============================================================================

/// Walks the entire flow: intro, detection, goal, redeem, dismiss, and
/// a second goal after the reset.
#[test]
fn test_full_session_flow() {
    let mut session = Session::new(Duration::from_secs(5));
    assert_eq!(session.screen(), Screen::Intro);

    // "Go smile!"
    session.begin_detection().expect("begin_detection failed");

    // A broken streak, then a winning one.
    assert!(session.observe(SmileSample::smiling(at(0.0))).is_none());
    assert!(session.observe(SmileSample::smiling(at(3.0))).is_none());
    assert!(session.observe(SmileSample::not_smiling(at(4.0))).is_none());
    assert!(session.observe(SmileSample::smiling(at(4.5))).is_none());
    assert!(session.observe(SmileSample::smiling(at(9.4))).is_none());

    let edge = session.observe(SmileSample::smiling(at(9.6)));
    assert!(edge.is_some(), "5s into the second streak must trigger");
    assert!(session.reward_available());

    // Redeem and dismiss; the dismissal resets tracking.
    session.open_redeem().expect("open_redeem failed");
    session.dismiss_redeem().expect("dismiss_redeem failed");
    assert!(!session.snapshot().tracker.goal_reached);

    // A new streak earns the reward again.
    session.observe(SmileSample::smiling(at(20.0)));
    let second = session.observe(SmileSample::smiling(at(25.0)));
    assert!(second.is_some(), "reward must re-trigger after dismissal");
}

/// The goal edge is delivered exactly once while smiling continues.
#[test]
fn test_goal_edge_exactly_once_per_streak() {
    let mut session = Session::new(Duration::from_secs(5));
    session.begin_detection().expect("begin_detection failed");

    let mut edges = 0;
    for tenths in 0..200 {
        let sample = SmileSample::smiling(at(f64::from(tenths) * 0.1));
        if session.observe(sample).is_some() {
            edges += 1;
        }
    }

    assert_eq!(edges, 1);
    assert!(session.snapshot().tracker.goal_reached);
}

// ============================================================================
// Scripted feed tests (real camera pipeline)
// ============================================================================

/// Runs the real feed/pump pipeline against a scripted classifier and
/// waits for the goal event.
#[tokio::test]
async fn test_scripted_feed_reaches_goal() {
    // 0.3s of no smile, then 2s of smiling against a 1s goal.
    let script = Script::parse("0.3n,2s").expect("valid script");

    let session = Arc::new(Mutex::new(Session::new(Duration::from_secs(1))));
    session
        .lock()
        .await
        .begin_detection()
        .expect("begin_detection failed");

    let broadcaster = EventBroadcaster::default();
    let mut events = broadcaster.subscribe();

    let mut feed = CameraFeed::open(FeedOptions::new(Duration::from_millis(20)))
        .expect("camera should be available");
    let samples = feed.start(ScriptedClassifier::new(script));
    tokio::spawn(pump_samples(
        Arc::clone(&session),
        samples,
        broadcaster.clone(),
    ));

    // The goal event must arrive within the scripted window.
    let goal = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            match events.recv().await {
                Ok(SessionEvent::GoalReached(payload)) => break payload,
                Ok(_) => {}
                Err(e) => panic!("event stream ended: {e}"),
            }
        }
    })
    .await
    .expect("goal event not received in time");

    assert!(goal.streak_seconds >= 1.0);
    feed.stop();

    let session = session.lock().await;
    assert!(session.reward_available());
    assert!(session.stats().samples > 0);
    assert!(session.stats().streaks >= 1);
}

/// A feed whose script never smiles must never trigger the goal.
#[tokio::test]
async fn test_scripted_feed_without_smiles_never_triggers() {
    let script = Script::parse("1n").expect("valid script");

    let session = Arc::new(Mutex::new(Session::new(Duration::from_millis(200))));
    session
        .lock()
        .await
        .begin_detection()
        .expect("begin_detection failed");

    let broadcaster = EventBroadcaster::default();
    let mut events = broadcaster.subscribe();

    let mut feed = CameraFeed::open(FeedOptions::new(Duration::from_millis(20)))
        .expect("camera should be available");
    let samples = feed.start(ScriptedClassifier::new(script));
    tokio::spawn(pump_samples(
        Arc::clone(&session),
        samples,
        broadcaster.clone(),
    ));

    // Watch updates for half a second; no goal event may appear.
    let watched = tokio::time::timeout(Duration::from_millis(500), async {
        loop {
            if let Ok(SessionEvent::GoalReached(_)) = events.recv().await {
                break;
            }
        }
    })
    .await;

    assert!(watched.is_err(), "goal must not fire without smiles");
    feed.stop();

    let session = session.lock().await;
    assert!(!session.reward_available());
    assert!(!session.snapshot().tracker.goal_reached);
}

/// Replays the demo script against synthetic frames at the default
/// 100ms cadence: the goal edge lands on the first frame five seconds
/// into the smiling phase, independent of wall-clock time.
#[test]
fn test_demo_script_goal_edge_at_five_seconds() {
    let script = Script::parse("2n,6s").expect("valid script");
    let mut classifier = ScriptedClassifier::new(script);
    let mut tracker = SmileTracker::default();

    let mut edge_at = None;
    for index in 0..80u64 {
        let captured_at = at(index as f64 * 0.1);
        let frame = Frame { index, captured_at };
        let verdict = classifier.classify(&frame).expect("classify failed");

        if tracker
            .observe(SmileSample::new(captured_at, verdict.is_smiling))
            .is_some()
        {
            assert!(edge_at.is_none(), "goal edge fired twice");
            edge_at = Some(captured_at);
        }
    }

    // Smiling covers [2.0s, 8.0s); five seconds in is the 7.0s frame.
    assert_eq!(edge_at, Some(at(7.0)));
}

// ============================================================================
// Reward card generation from a finished session
// ============================================================================

/// Generates the reward card from real session counters.
#[test]
fn test_reward_card_from_session() {
    let mut session = Session::new(Duration::from_secs(5));
    session.begin_detection().expect("begin_detection failed");

    session.observe(SmileSample::smiling(at(0.0)));
    session.observe(SmileSample::smiling(at(2.0)));
    session.observe(SmileSample::not_smiling(at(3.0)));
    session.observe(SmileSample::smiling(at(4.0)));
    let edge = session
        .observe(SmileSample::smiling(at(9.0)))
        .expect("goal expected");

    let snapshot = session.snapshot();
    let card = RewardCard::builder()
        .coupon(Coupon::new("SMILE2024", "20% OFF"))
        .summary(RewardSummary {
            goal_seconds: snapshot.goal_seconds,
            reached_at: edge.reached_at,
            elapsed_seconds: 9,
            samples: snapshot.stats.samples,
            streaks: snapshot.stats.streaks,
            longest_streak_seconds: snapshot.stats.longest_streak.as_secs_f64(),
        })
        .build()
        .expect("card should build");

    assert_eq!(card.summary.samples, 5);
    assert_eq!(card.summary.streaks, 2);

    let markdown = MarkdownGenerator::new(&card).generate();
    assert!(markdown.contains("# Thank you for smiling!"));
    assert!(markdown.contains("SMILE2024"));
    assert!(markdown.contains("| Smile streaks | 2 |"));
    assert!(markdown.contains("| Longest streak | 5.0s |"));
}
