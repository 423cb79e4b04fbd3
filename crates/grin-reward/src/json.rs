//! JSON reward card generation.
//!
//! This module provides [`JsonGenerator`] for serializing reward cards
//! to JSON. Cards can be generated as compact single-line JSON or
//! pretty-printed for human readability.
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
//! let compact = generator.generate().unwrap();
//! assert!(!compact.contains('\n'));
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::{Result, RewardCard, RewardError};

/// JSON reward card generator.
///
/// Wraps a [`RewardCard`] reference and provides methods for
/// serializing it to JSON in various formats.
pub struct JsonGenerator<'a> {
    card: &'a RewardCard,
}

impl<'a> JsonGenerator<'a> {
    /// Creates a new JSON generator for the given card.
    #[must_use]
    pub const fn new(card: &'a RewardCard) -> Self {
        Self { card }
    }

    /// Generates compact JSON output (single line, no extra whitespace).
    ///
    /// # Errors
    ///
    /// Returns [`RewardError::Serialization`] if serialization fails.
    pub fn generate(&self) -> Result<String> {
        serde_json::to_string(self.card).map_err(RewardError::from)
    }

    /// Generates pretty-printed JSON output with indentation.
    ///
    /// # Errors
    ///
    /// Returns [`RewardError::Serialization`] if serialization fails.
    pub fn generate_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self.card).map_err(RewardError::from)
    }

    /// Writes the card to a file, pretty-printed when `pretty` is true.
    ///
    /// # Errors
    ///
    /// Returns [`RewardError::Serialization`] if serialization fails or
    /// [`RewardError::Io`] if the file cannot be written.
    pub fn write_to_file(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = if pretty {
            self.generate_pretty()?
        } else {
            self.generate()?
        };

        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        file.write_all(b"\n")?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
