//! HTTP API endpoints for the GRIN session.
//!
//! This module provides the REST surface the presentation layer drives:
//! reading the session snapshot and performing the three screen actions
//! (start detection, redeem, dismiss). The live event stream is served
//! by the `/ws` endpoint (see [`crate::ws`]).
//!
//! # Endpoints
//!
//! - `GET /api/state` - Current session snapshot
//! - `POST /api/start` - Leave the intro and start detection
//! - `POST /api/redeem` - Open the redeem screen, returns the coupon
//! - `POST /api/dismiss` - Dismiss the redeem screen (resets tracking)
//! - `GET /ws` - WebSocket event stream
//!
//! # Example
//!
//! ```no_run
//! use grin_session::{AppState, Config, create_router};
//!
//! # async fn example() {
//! let state = AppState::new(Config::default());
//! let router = create_router(state);
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await.unwrap();
//! axum::serve(listener, router).await.unwrap();
//! # }
//! ```

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::{Config, CouponConfig};
use crate::events::{EventBroadcaster, SessionEvent};
use crate::session::{Screen, Session, SessionState};
use crate::ws::ws_handler;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Response body for the start endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartResponse {
    /// Whether detection was started.
    pub started: bool,
    /// The session state after the transition.
    pub state: SessionState,
}

/// Response body for the redeem endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResponse {
    /// The coupon to present.
    pub coupon: CouponConfig,
    /// The session state after the transition.
    pub state: SessionState,
}

/// Response body for the dismiss endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DismissResponse {
    /// Whether the redeem screen was dismissed.
    pub dismissed: bool,
    /// The session state after the transition (tracking reset).
    pub state: SessionState,
}

/// Error response body returned on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Description of the error.
    pub error: String,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for the HTTP server.
///
/// Contains the configuration, the mutable session, and the event
/// broadcaster, all wrapped for thread-safe sharing across handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Configuration for the session.
    pub config: Config,
    /// The current smile session.
    pub session: Arc<Mutex<Session>>,
    /// Broadcaster for WebSocket events.
    pub broadcaster: EventBroadcaster,
}

impl AppState {
    /// Creates a new `AppState` with a fresh session built from the
    /// configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let session = Session::from_config(&config);
        Self {
            config,
            session: Arc::new(Mutex::new(session)),
            broadcaster: EventBroadcaster::default(),
        }
    }

    /// Creates a new `AppState` around an existing session.
    #[must_use]
    pub fn with_session(config: Config, session: Arc<Mutex<Session>>) -> Self {
        Self {
            config,
            session,
            broadcaster: EventBroadcaster::default(),
        }
    }
}

// ============================================================================
// API Error Type
// ============================================================================

/// Internal error type for API handlers.
#[derive(Debug)]
enum ApiError {
    /// Session is not in a state that accepts this request.
    InvalidState(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let Self::InvalidState(message) = self;
        let body = Json(ErrorResponse { error: message });
        (StatusCode::SERVICE_UNAVAILABLE, body).into_response()
    }
}

// ============================================================================
// Router Setup
// ============================================================================

/// Creates the HTTP router with all API endpoints.
///
/// # Returns
///
/// An axum `Router` configured with:
/// - All API routes under `/api` plus the `/ws` upgrade
/// - CORS middleware for development
/// - Tracing middleware for request logging
pub fn create_router(state: AppState) -> Router {
    // Configure CORS for development (allow all origins)
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/state", get(handle_state))
        .route("/start", post(handle_start))
        .route("/redeem", post(handle_redeem))
        .route("/dismiss", post(handle_dismiss));

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

// ============================================================================
// Handlers
// ============================================================================

/// Handler for `GET /api/state`.
async fn handle_state(State(state): State<Arc<AppState>>) -> Json<SessionState> {
    let session = state.session.lock().await;
    Json(session.snapshot())
}

/// Handler for `POST /api/start`.
///
/// Leaves the intro screen and starts smile detection.
async fn handle_start(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StartResponse>, ApiError> {
    let mut session = state.session.lock().await;

    session.begin_detection().map_err(|e| {
        warn!(screen = %session.screen(), "Cannot start detection");
        ApiError::InvalidState(e.to_string())
    })?;

    let snapshot = session.snapshot();
    drop(session);

    info!("Detection started via API");
    state
        .broadcaster
        .send(SessionEvent::screen_changed(Screen::Detector));

    Ok(Json(StartResponse {
        started: true,
        state: snapshot,
    }))
}

/// Handler for `POST /api/redeem`.
///
/// Opens the redeem screen and returns the coupon. Fails when the goal
/// has not been reached yet.
async fn handle_redeem(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RedeemResponse>, ApiError> {
    let mut session = state.session.lock().await;

    session.open_redeem().map_err(|e| {
        warn!(screen = %session.screen(), "Cannot open redeem screen");
        ApiError::InvalidState(e.to_string())
    })?;

    let snapshot = session.snapshot();
    drop(session);

    info!(code = %state.config.coupon.code, "Coupon redeemed via API");
    state
        .broadcaster
        .send(SessionEvent::screen_changed(Screen::Redeem));

    Ok(Json(RedeemResponse {
        coupon: state.config.coupon.clone(),
        state: snapshot,
    }))
}

/// Handler for `POST /api/dismiss`.
///
/// Dismisses the redeem screen, returning to the detector with smile
/// tracking reset.
async fn handle_dismiss(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DismissResponse>, ApiError> {
    let mut session = state.session.lock().await;

    session.dismiss_redeem().map_err(|e| {
        warn!(screen = %session.screen(), "Cannot dismiss redeem screen");
        ApiError::InvalidState(e.to_string())
    })?;

    let snapshot = session.snapshot();
    drop(session);

    info!("Reward dismissed via API");
    state
        .broadcaster
        .send(SessionEvent::screen_changed(Screen::Detector));

    Ok(Json(DismissResponse {
        dismissed: true,
        state: snapshot,
    }))
}

// ============================================================================
// Tests
// ============================================================================
