//! GRIN Session Orchestration
//!
//! Ties the smile tracker to the three-screen flow (intro, detector,
//! redeem), funnels classifier samples through a single serialization
//! point, and exposes the session to the presentation layer over HTTP
//! and WebSocket.

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod intro;
pub mod session;
pub mod ws;

pub use api::{
    create_router, AppState, DismissResponse, ErrorResponse, RedeemResponse, StartResponse,
};
pub use config::{CameraConfig, Config, CouponConfig, IntroConfig};
pub use error::{Result, SessionError};
pub use events::{
    ConnectedPayload, ErrorPayload, EventBroadcaster, GoalReachedPayload, IntroStagePayload,
    ScreenChangedPayload, SessionEvent, SmileUpdatePayload,
};
pub use intro::{IntroStage, IntroTimeline};
pub use session::{pump_samples, Screen, Session, SessionState, SessionStats};
