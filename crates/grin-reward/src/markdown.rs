//! Markdown reward card generation.
//!
//! This module provides the [`MarkdownGenerator`] struct for converting
//! a [`RewardCard`] into a human-readable Markdown document: the coupon
//! (promo label, headline, code, validity) followed by a table of
//! session metrics.
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use grin_reward::{Coupon, MarkdownGenerator, RewardCard, RewardSummary};
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
//! let generator = MarkdownGenerator::new(&card);
//! let markdown = generator.generate();
//! assert!(markdown.contains("# Thank you for smiling!"));
//! ```

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::RewardCard;

/// Generates Markdown reward cards.
pub struct MarkdownGenerator<'a> {
    card: &'a RewardCard,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given card.
    #[must_use]
    pub const fn new(card: &'a RewardCard) -> Self {
        Self { card }
    }

    /// Generates the complete Markdown card.
    ///
    /// The output includes:
    ///
    /// - Title and reward copy
    /// - The coupon (promo label, headline, code block, validity)
    /// - A session metrics table
    /// - Footer with generation timestamp
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_title(&mut output);
        self.write_coupon(&mut output);
        self.write_session(&mut output);
        Self::write_footer(&mut output);

        output
    }

    /// Writes the card title and reward copy.
    fn write_title(&self, output: &mut String) {
        let _ = writeln!(output, "# Thank you for smiling!\n");
        let _ = writeln!(output, "Here's your reward.\n");
    }

    /// Writes the coupon section.
    fn write_coupon(&self, output: &mut String) {
        let coupon = &self.card.coupon;

        let _ = writeln!(output, "## {}\n", escape_markdown(&coupon.promo_label));
        let _ = writeln!(
            output,
            "**{}** {}\n",
            escape_markdown(&coupon.headline),
            escape_markdown(&coupon.subject)
        );
        let _ = writeln!(output, "Your coupon code:\n");
        let _ = writeln!(output, "```\n{}\n```\n", coupon.code);
        let _ = writeln!(output, "Valid until {}\n", escape_markdown(&coupon.valid_until));
    }

    /// Writes the session metrics table.
    fn write_session(&self, output: &mut String) {
        let summary = &self.card.summary;

        let _ = writeln!(output, "## Session\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(
            output,
            "| Goal | {:.1}s continuous smile |",
            summary.goal_seconds
        );
        let _ = writeln!(
            output,
            "| Reached at | {} |",
            format_timestamp(&summary.reached_at)
        );
        let _ = writeln!(
            output,
            "| Session length | {} |",
            format_duration(summary.elapsed_seconds)
        );
        let _ = writeln!(output, "| Frames classified | {} |", summary.samples);
        let _ = writeln!(output, "| Smile streaks | {} |", summary.streaks);
        let _ = writeln!(
            output,
            "| Longest streak | {:.1}s |",
            summary.longest_streak_seconds
        );
        let _ = writeln!(output);
    }

    /// Writes the card footer.
    fn write_footer(output: &mut String) {
        let _ = writeln!(output, "---");
        let timestamp = format_timestamp(&Utc::now());
        let _ = writeln!(output, "*Generated by GRIN at {timestamp}*");
    }
}

// ============================================================================
// Formatting helpers
// ============================================================================

/// Formats a duration in seconds as "XmYs" (or "Ys" under a minute).
fn format_duration(seconds: u64) -> String {
    let minutes = seconds / 60;
    let remainder = seconds % 60;

    if minutes == 0 {
        format!("{remainder}s")
    } else {
        format!("{minutes}m {remainder}s")
    }
}

/// Formats a UTC timestamp for display.
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Escapes Markdown special characters in user-provided text.
fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '*' | '_' | '`' | '[' | ']' | '#' | '|' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

// ============================================================================
// Tests
// ============================================================================
