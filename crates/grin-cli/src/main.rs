//! GRIN CLI
//!
//! Runs a smile session end to end: intro timeline, scripted camera
//! feed, live detection readout, and reward card generation, while
//! serving the HTTP/WebSocket observation API.

use std::net::SocketAddr;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;
use grin_camera::{CameraError, CameraFeed, FeedOptions, Script, ScriptedClassifier};
use grin_reward::{json::JsonGenerator, Coupon, MarkdownGenerator, RewardCard, RewardSummary};
use grin_session::{
    create_router, pump_samples, AppState, Config, EventBroadcaster, IntroStage, IntroTimeline,
    Screen, Session, SessionEvent, SessionState,
};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Default port for the HTTP API server.
const DEFAULT_PORT: u16 = 3000;

/// Script used when neither config nor CLI provide one.
const DEFAULT_DEMO_SCRIPT: &str = "2n,6s";

/// GRIN - Smile For A Reward
///
/// Walks through the smile flow: an intro, live smile detection against
/// a classifier feed, and a coupon reward once the subject has smiled
/// continuously for the goal duration.
#[derive(Parser, Debug)]
#[command(name = "grin")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: grin.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Smile script for the demo classifier, e.g. "2n,6s"
    #[arg(short, long, value_name = "SCRIPT")]
    script: Option<String>,

    /// Output directory for reward cards
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Port for the HTTP API server
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Maximum session length in seconds before giving up
    #[arg(long, default_value_t = 60)]
    max_seconds: u64,

    /// Skip the intro timeline
    #[arg(long)]
    skip_intro: bool,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize tracing subscriber with appropriate filter
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!("GRIN starting");
    tracing::debug!(config = ?args.config, "Config file");

    match run_session(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs the full smile flow.
///
/// 1. Load config and apply CLI overrides
/// 2. Start the HTTP/WebSocket server
/// 3. Play the intro timeline
/// 4. Start the camera feed and the sample pump
/// 5. Watch events until the goal is reached (or timeout / Ctrl+C)
/// 6. Redeem: print the coupon, write reward card files, dismiss
#[allow(clippy::too_many_lines)]
async fn run_session(args: Args) -> anyhow::Result<()> {
    // Load configuration
    let mut config = load_config(args.config.as_deref())?;

    // Apply CLI argument overrides
    if let Some(ref script) = args.script {
        config.camera.script = Script::parse(script)?;
    }
    if let Some(ref output_dir) = args.output_dir {
        config.output_dir.clone_from(output_dir);
    }

    // Re-validate after overrides
    config.validate()?;

    // An empty script would never smile; fall back to the demo script.
    if config.camera.available && config.camera.script.is_empty() {
        tracing::info!(script = DEFAULT_DEMO_SCRIPT, "No smile script configured, using demo script");
        config.camera.script = Script::parse(DEFAULT_DEMO_SCRIPT)?;
    }

    print_config(&config);

    // Start the HTTP server
    let app_state = AppState::new(config.clone());
    let session = Arc::clone(&app_state.session);
    let broadcaster = app_state.broadcaster.clone();
    let router = create_router(app_state);

    let addr: SocketAddr = ([127, 0, 0, 1], args.port).into();
    let listener = TcpListener::bind(addr).await.map_err(|e| {
        anyhow::anyhow!(
            "Failed to bind to {addr}: {e}\n\nSuggestion: Try a different port with --port"
        )
    })?;

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            tracing::error!(error = %e, "HTTP server error");
        }
    });

    println!();
    println!("Observation API running on http://{addr} (WebSocket at /ws)");

    // Subscribe before anything can emit, so no event is missed.
    let mut events = broadcaster.subscribe();

    // Play the intro timeline
    println!();
    if args.skip_intro {
        tracing::debug!("Skipping intro timeline");
    } else {
        let timeline = IntroTimeline::from_config(&config.intro);
        let intro_broadcaster = broadcaster.clone();
        let intro = tokio::spawn(async move { timeline.play(&intro_broadcaster).await });

        // Echo the stages as they are revealed.
        while let Ok(event) = events.recv().await {
            if let SessionEvent::IntroStage(payload) = event {
                println!("  {}", payload.text);
                if payload.stage == IntroStage::Button {
                    break;
                }
            }
        }
        intro.await?;
    }

    // "Go smile!" - leave the intro and start detection
    session.lock().await.begin_detection()?;
    broadcaster.send(SessionEvent::screen_changed(Screen::Detector));

    // Start the camera feed
    let feed_options = FeedOptions::new(config.frame_interval())
        .with_available(config.camera.available);

    let mut feed = match CameraFeed::open(feed_options) {
        Ok(mut feed) => {
            let samples = feed.start(ScriptedClassifier::new(config.camera.script.clone()));
            tokio::spawn(pump_samples(
                Arc::clone(&session),
                samples,
                broadcaster.clone(),
            ));
            Some(feed)
        }
        Err(CameraError::Unavailable) => {
            // Not an error: the session just never sees a smile.
            tracing::warn!("No camera available, smile detection is idle");
            println!("No camera available");
            None
        }
        Err(e) => return Err(e.into()),
    };

    println!();
    println!("Watching for a {:.1}s smile...", config.goal_seconds);
    println!("Press Ctrl+C to stop");
    println!();

    // Watch events until the goal is reached
    let outcome = watch_for_goal(&mut events, args.max_seconds).await?;

    if let Some(feed) = feed.as_mut() {
        feed.stop();
    }

    let goal_was_reached = outcome.is_some();
    let result = match outcome {
        Some(reached_at) => {
            redeem_reward(&session, &broadcaster, &config, reached_at).await
        }
        None => {
            println!("No {:.1}-second smile this time.", config.goal_seconds);
            Ok(())
        }
    };

    // Cleanup
    server_handle.abort();

    let snapshot = session.lock().await.snapshot();
    print_summary(&snapshot, goal_was_reached);

    result
}

/// Follows the event stream, printing the detector readout, until the
/// goal edge arrives.
///
/// Returns the goal timestamp, or `None` on timeout or Ctrl+C.
async fn watch_for_goal(
    events: &mut tokio::sync::broadcast::Receiver<SessionEvent>,
    max_seconds: u64,
) -> anyhow::Result<Option<DateTime<Utc>>> {
    let deadline = tokio::time::sleep(Duration::from_secs(max_seconds));
    tokio::pin!(deadline);

    let mut last_label = String::new();

    loop {
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                println!("Interrupted");
                return Ok(None);
            }
            () = &mut deadline => {
                tracing::info!(max_seconds, "Session timed out before the goal");
                return Ok(None);
            }
            event = events.recv() => {
                match event {
                    Ok(SessionEvent::SmileUpdate(payload)) => {
                        let label = if payload.smiling {
                            format!(
                                "Smiling: {:.1}/{:.1}s",
                                payload.streak_seconds.min(payload.goal_seconds),
                                payload.goal_seconds
                            )
                        } else {
                            "No smile detected".to_string()
                        };

                        if label != last_label {
                            println!("  {label}");
                            last_label = label;
                        }
                    }
                    Ok(SessionEvent::GoalReached(payload)) => {
                        println!();
                        println!("Congratulations! You receive a gift!");
                        return Ok(Some(payload.reached_at));
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(missed = n, "Event stream lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        anyhow::bail!("Event stream closed unexpectedly");
                    }
                }
            }
        }
    }
}

/// Runs the redeem flow: opens the redeem screen, prints and writes the
/// reward card, and dismisses it (which resets smile tracking).
async fn redeem_reward(
    session: &Arc<Mutex<Session>>,
    broadcaster: &EventBroadcaster,
    config: &Config,
    reached_at: DateTime<Utc>,
) -> anyhow::Result<()> {
    let (snapshot, elapsed) = {
        let mut session = session.lock().await;
        session.open_redeem()?;
        (session.snapshot(), session.elapsed())
    };
    broadcaster.send(SessionEvent::screen_changed(Screen::Redeem));

    let coupon = Coupon::new(config.coupon.code.clone(), config.coupon.headline.clone())
        .with_promo_label(config.coupon.promo_label.clone())
        .with_subject(config.coupon.subject.clone())
        .with_valid_until(config.coupon.valid_until.clone());

    let summary = RewardSummary {
        goal_seconds: snapshot.goal_seconds,
        reached_at,
        elapsed_seconds: u64::try_from(elapsed.num_seconds()).unwrap_or(0),
        samples: snapshot.stats.samples,
        streaks: snapshot.stats.streaks,
        longest_streak_seconds: snapshot.stats.longest_streak.as_secs_f64(),
    };

    let card = RewardCard::builder()
        .coupon(coupon)
        .summary(summary)
        .build()?;

    // Print the card and write it to the output directory
    let markdown = MarkdownGenerator::new(&card).generate();
    println!();
    println!("{markdown}");

    write_reward_files(&card, Path::new(&config.output_dir))?;

    // "Done" - dismiss the redeem screen, resetting smile tracking
    session.lock().await.dismiss_redeem()?;
    broadcaster.send(SessionEvent::screen_changed(Screen::Detector));

    Ok(())
}

/// Writes the Markdown and JSON reward cards to the output directory.
fn write_reward_files(card: &RewardCard, output_dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(output_dir)?;

    let md_path = output_dir.join("grin-reward.md");
    let markdown = MarkdownGenerator::new(card).generate();
    std::fs::write(&md_path, markdown)?;
    println!("Reward card: {}", md_path.display());

    let json_path = output_dir.join("grin-reward.json");
    JsonGenerator::new(card).write_to_file(&json_path, true)?;
    println!("Reward JSON: {}", json_path.display());

    Ok(())
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

/// Prints the loaded configuration.
fn print_config(config: &Config) {
    println!("Configuration loaded:");
    println!("  Goal: {:.1}s continuous smile", config.goal_seconds);
    println!("  Frame interval: {}ms", config.frame_interval_ms);
    println!("  Camera available: {}", config.camera.available);
    if !config.camera.script.is_empty() {
        println!(
            "  Smile script: {} segment(s), {:.1}s total",
            config.camera.script.segments().len(),
            config.camera.script.total_seconds()
        );
    }
    println!("  Coupon: {} ({})", config.coupon.code, config.coupon.headline);
    println!("  Output directory: {}", config.output_dir);
}

/// Prints a summary of the session.
fn print_summary(snapshot: &SessionState, goal_was_reached: bool) {
    println!();
    println!("=== Session Summary ===");
    println!("Screen: {}", snapshot.screen);
    println!("Frames classified: {}", snapshot.stats.samples);
    println!("Smile streaks: {}", snapshot.stats.streaks);
    println!(
        "Longest streak: {:.1}s",
        snapshot.stats.longest_streak.as_secs_f64()
    );
    println!("Reward earned: {goal_was_reached}");
}
