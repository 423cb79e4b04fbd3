//! GRIN Reward Generation
//!
//! This crate provides types and utilities for generating the reward
//! presented after a completed smile session. A reward card can be
//! serialized to JSON for programmatic access or rendered to Markdown
//! for human consumption.
//!
//! # Types
//!
//! - [`Coupon`] - The offer: code, headline, and validity text
//! - [`RewardSummary`] - Metrics of the session that earned the reward
//! - [`RewardCard`] - The complete card combining both
//!
//! # Generators
//!
//! - [`json::JsonGenerator`] - JSON output, compact or pretty
//! - [`MarkdownGenerator`] - Human-readable Markdown card
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use grin_reward::{Coupon, RewardCard, RewardSummary};
//! use grin_reward::json::JsonGenerator;
//!
//! let card = RewardCard::builder()
//!     .coupon(Coupon::new("SMILE2024", "20% OFF"))
//!     .summary(RewardSummary {
//!         goal_seconds: 5.0,
//!         reached_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 5).unwrap(),
//!         elapsed_seconds: 42,
//!         samples: 420,
//!         streaks: 2,
//!         longest_streak_seconds: 5.1,
//!     })
//!     .build()
//!     .unwrap();
//!
//! let generator = JsonGenerator::new(&card);
//! let json = generator.generate_pretty().unwrap();
//! assert!(json.contains("SMILE2024"));
//! ```

pub mod json;
mod markdown;

pub use markdown::MarkdownGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during reward generation.
#[derive(Debug, Error)]
pub enum RewardError {
    /// Failed to serialize the card to JSON.
    #[error("failed to serialize reward card: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write card files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid card data.
    #[error("invalid reward data: {0}")]
    InvalidData(String),
}

/// Result type for reward operations.
pub type Result<T> = std::result::Result<T, RewardError>;

// ============================================================================
// Coupon
// ============================================================================

/// The offer presented on the reward card.
///
/// The text fields mirror what the redeem screen shows: a small promo
/// label, the headline, the subject line, the code itself, and a
/// human-readable validity note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    /// The redeemable coupon code.
    pub code: String,

    /// Small promo label above the headline.
    pub promo_label: String,

    /// The offer headline.
    pub headline: String,

    /// What the offer applies to.
    pub subject: String,

    /// Human-readable validity text.
    pub valid_until: String,
}

impl Coupon {
    /// Creates a coupon with the given code and headline, using the
    /// standard promo copy for the remaining fields.
    #[must_use]
    pub fn new(code: impl Into<String>, headline: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            promo_label: "SPECIAL OFFER".to_string(),
            headline: headline.into(),
            subject: "Your Next Purchase".to_string(),
            valid_until: "Dec 31, 2024".to_string(),
        }
    }

    /// Overrides the promo label.
    #[must_use]
    pub fn with_promo_label(mut self, label: impl Into<String>) -> Self {
        self.promo_label = label.into();
        self
    }

    /// Overrides the subject line.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    /// Overrides the validity text.
    #[must_use]
    pub fn with_valid_until(mut self, valid_until: impl Into<String>) -> Self {
        self.valid_until = valid_until.into();
        self
    }
}

// ============================================================================
// RewardSummary
// ============================================================================

/// Metrics of the session that earned the reward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSummary {
    /// The continuous-smile goal in seconds.
    pub goal_seconds: f64,

    /// When the goal was reached.
    pub reached_at: DateTime<Utc>,

    /// Session length at redemption, in whole seconds.
    pub elapsed_seconds: u64,

    /// Total classifier samples observed.
    pub samples: u64,

    /// Number of smiling streaks started.
    pub streaks: u32,

    /// Longest streak seen, in seconds.
    pub longest_streak_seconds: f64,
}

// ============================================================================
// RewardCard
// ============================================================================

/// The complete reward card: the coupon plus the session summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardCard {
    /// The offer.
    pub coupon: Coupon,

    /// Metrics of the earning session.
    pub summary: RewardSummary,
}

impl RewardCard {
    /// Creates a new card builder.
    #[must_use]
    pub fn builder() -> RewardCardBuilder {
        RewardCardBuilder::default()
    }

    /// Serializes the card to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns `RewardError::Serialization` if JSON serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(RewardError::from)
    }
}

/// Builder for constructing [`RewardCard`] instances.
#[derive(Debug, Clone, Default)]
pub struct RewardCardBuilder {
    coupon: Option<Coupon>,
    summary: Option<RewardSummary>,
}

impl RewardCardBuilder {
    /// Sets the coupon.
    #[must_use]
    pub fn coupon(mut self, coupon: Coupon) -> Self {
        self.coupon = Some(coupon);
        self
    }

    /// Sets the session summary.
    #[must_use]
    pub const fn summary(mut self, summary: RewardSummary) -> Self {
        self.summary = Some(summary);
        self
    }

    /// Builds the card.
    ///
    /// # Errors
    ///
    /// Returns `RewardError::InvalidData` if required fields are missing
    /// or the coupon code is empty.
    pub fn build(self) -> Result<RewardCard> {
        let coupon = self
            .coupon
            .ok_or_else(|| RewardError::InvalidData("coupon is required".to_string()))?;

        if coupon.code.trim().is_empty() {
            return Err(RewardError::InvalidData(
                "coupon code must not be empty".to_string(),
            ));
        }

        let summary = self
            .summary
            .ok_or_else(|| RewardError::InvalidData("summary is required".to_string()))?;

        Ok(RewardCard { coupon, summary })
    }
}

// ============================================================================
// Tests
// ============================================================================
