//! Configuration types for GRIN sessions.
//!
//! This module provides all configuration structures used to control a
//! smile session: the goal duration, camera framing, intro timeline,
//! and the coupon presented on the redeem screen.

use std::path::Path;
use std::time::Duration;

use grin_camera::Script;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SessionError};

/// The default config file name.
const CONFIG_FILE_NAME: &str = "grin.json";

/// Coupon codes are uppercase alphanumerics (dashes allowed), 4-32 chars.
static COUPON_CODE_RE: Lazy<Regex> = Lazy::new(|| {
    #[allow(clippy::unwrap_used)]
    let re = Regex::new(r"^[A-Z0-9][A-Z0-9-]{3,31}$").unwrap();
    re
});

/// Default continuous-smile goal in seconds.
const fn default_goal_seconds() -> f64 {
    5.0
}

/// Default interval between classified frames in milliseconds.
const fn default_frame_interval_ms() -> u64 {
    100
}

/// Default output directory for reward cards.
fn default_output_dir() -> String {
    ".".to_string()
}

/// Default value for boolean options that default to true.
const fn default_true() -> bool {
    true
}

/// Default coupon code.
fn default_coupon_code() -> String {
    "SMILE2024".to_string()
}

/// Default coupon promo label.
fn default_promo_label() -> String {
    "SPECIAL OFFER".to_string()
}

/// Default coupon headline.
fn default_headline() -> String {
    "20% OFF".to_string()
}

/// Default coupon subject line.
fn default_subject() -> String {
    "Your Next Purchase".to_string()
}

/// Default coupon validity text.
fn default_valid_until() -> String {
    "Dec 31, 2024".to_string()
}

/// Default delay before the intro emoji appears.
const fn default_emoji_delay_ms() -> u64 {
    500
}

/// Default delay before the intro tagline appears.
const fn default_tagline_delay_ms() -> u64 {
    1500
}

/// Default delay before the intro button appears.
const fn default_button_delay_ms() -> u64 {
    2500
}

/// Main configuration for a GRIN session.
///
/// Controls the smile goal, the camera feed cadence, the intro
/// timeline, and the coupon shown when the goal is reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Continuous-smile duration that triggers the reward, in seconds.
    #[serde(default = "default_goal_seconds")]
    pub goal_seconds: f64,

    /// Interval between classified frames, in milliseconds.
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,

    /// Camera collaborator settings.
    #[serde(default)]
    pub camera: CameraConfig,

    /// Intro screen timeline.
    #[serde(default)]
    pub intro: IntroConfig,

    /// The coupon presented on the redeem screen.
    #[serde(default)]
    pub coupon: CouponConfig,

    /// Output directory for generated reward cards.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            goal_seconds: default_goal_seconds(),
            frame_interval_ms: default_frame_interval_ms(),
            camera: CameraConfig::default(),
            intro: IntroConfig::default(),
            coupon: CouponConfig::default(),
            output_dir: default_output_dir(),
        }
    }
}

impl Config {
    /// Loads configuration from the current working directory.
    ///
    /// Looks for `grin.json` in the current directory. If found, loads
    /// and validates the configuration. If not found, returns default
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but contains invalid JSON.
    pub fn load() -> Result<Self> {
        let current_dir = std::env::current_dir().map_err(|e| {
            SessionError::config_parse(
                "<current directory>",
                format!("cannot determine current directory: {e}"),
            )
        })?;
        Self::load_from_dir(&current_dir)
    }

    /// Loads configuration from a specific directory.
    ///
    /// # Errors
    ///
    /// Returns an error if `grin.json` exists there but contains
    /// invalid JSON.
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let config_path = dir.join(CONFIG_FILE_NAME);
        Self::load_from_file(&config_path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// If the file does not exist, returns default configuration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ConfigParseError` if the file exists but
    /// contains invalid JSON, or `SessionError::ConfigValidationError`
    /// if the values are invalid.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let config = Self::default();
                config.validate()?;
                return Ok(config);
            }
            Err(e) => {
                return Err(SessionError::config_parse(
                    path,
                    format!("failed to read file: {e}"),
                ));
            }
        };

        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| SessionError::config_parse(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration values.
    ///
    /// Checks that:
    /// - `goal_seconds` is positive and finite
    /// - `frame_interval_ms` is greater than 0
    /// - `output_dir` is not empty
    /// - the coupon text fields are present and the code matches the
    ///   coupon code pattern
    /// - the intro stage delays are non-decreasing
    ///
    /// # Errors
    ///
    /// Returns `SessionError::ConfigValidationError` if any check fails.
    pub fn validate(&self) -> Result<()> {
        if !self.goal_seconds.is_finite() || self.goal_seconds <= 0.0 {
            return Err(SessionError::config_validation(
                "goalSeconds must be greater than 0",
                "Set goalSeconds to a positive number of seconds in your grin.json",
            ));
        }

        if self.frame_interval_ms == 0 {
            return Err(SessionError::config_validation(
                "frameIntervalMs must be greater than 0",
                "Set frameIntervalMs to at least 1 in your grin.json",
            ));
        }

        if self.output_dir.trim().is_empty() {
            return Err(SessionError::config_validation(
                "outputDir must not be empty",
                "Provide a valid output directory path in your grin.json (use '.' for current directory)",
            ));
        }

        self.coupon.validate()?;
        self.intro.validate()?;

        Ok(())
    }

    /// The smile goal as a duration.
    #[must_use]
    pub fn goal(&self) -> Duration {
        Duration::from_secs_f64(self.goal_seconds)
    }

    /// The frame interval as a duration.
    #[must_use]
    pub const fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }
}

/// Camera collaborator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraConfig {
    /// Whether a camera device is present. When false, the session
    /// starts without a feed and simply never sees a smile.
    #[serde(default = "default_true")]
    pub available: bool,

    /// Smile script for the scripted classifier. Empty means the
    /// subject never smiles.
    #[serde(default)]
    pub script: Script,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            available: default_true(),
            script: Script::default(),
        }
    }
}

/// Intro screen timeline configuration.
///
/// Delays are measured from entering the intro screen; each stage
/// reveals one element (emoji, tagline, button).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntroConfig {
    /// Delay before the emoji appears, in milliseconds.
    #[serde(default = "default_emoji_delay_ms")]
    pub emoji_delay_ms: u64,

    /// Delay before the tagline appears, in milliseconds.
    #[serde(default = "default_tagline_delay_ms")]
    pub tagline_delay_ms: u64,

    /// Delay before the button appears, in milliseconds.
    #[serde(default = "default_button_delay_ms")]
    pub button_delay_ms: u64,
}

impl Default for IntroConfig {
    fn default() -> Self {
        Self {
            emoji_delay_ms: default_emoji_delay_ms(),
            tagline_delay_ms: default_tagline_delay_ms(),
            button_delay_ms: default_button_delay_ms(),
        }
    }
}

impl IntroConfig {
    /// Validates that the stage delays are non-decreasing.
    fn validate(&self) -> Result<()> {
        if self.emoji_delay_ms > self.tagline_delay_ms
            || self.tagline_delay_ms > self.button_delay_ms
        {
            return Err(SessionError::config_validation(
                "intro delays must be non-decreasing (emoji <= tagline <= button)",
                "Order intro.emojiDelayMs, intro.taglineDelayMs and intro.buttonDelayMs in your grin.json",
            ));
        }
        Ok(())
    }
}

/// The coupon presented on the redeem screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponConfig {
    /// The redeemable coupon code.
    #[serde(default = "default_coupon_code")]
    pub code: String,

    /// Small promo label above the headline.
    #[serde(default = "default_promo_label")]
    pub promo_label: String,

    /// The offer headline.
    #[serde(default = "default_headline")]
    pub headline: String,

    /// What the offer applies to.
    #[serde(default = "default_subject")]
    pub subject: String,

    /// Human-readable validity text.
    #[serde(default = "default_valid_until")]
    pub valid_until: String,
}

impl Default for CouponConfig {
    fn default() -> Self {
        Self {
            code: default_coupon_code(),
            promo_label: default_promo_label(),
            headline: default_headline(),
            subject: default_subject(),
            valid_until: default_valid_until(),
        }
    }
}

impl CouponConfig {
    /// Validates the coupon fields.
    fn validate(&self) -> Result<()> {
        if !COUPON_CODE_RE.is_match(&self.code) {
            return Err(SessionError::config_validation(
                format!("coupon.code '{}' is not a valid coupon code", self.code),
                "Use 4-32 uppercase letters, digits or dashes, e.g. SMILE2024",
            ));
        }

        for (field, value) in [
            ("coupon.promoLabel", &self.promo_label),
            ("coupon.headline", &self.headline),
            ("coupon.subject", &self.subject),
            ("coupon.validUntil", &self.valid_until),
        ] {
            if value.trim().is_empty() {
                return Err(SessionError::config_validation(
                    format!("{field} must not be empty"),
                    format!("Provide text for {field} in your grin.json"),
                ));
            }
        }

        Ok(())
    }
}
