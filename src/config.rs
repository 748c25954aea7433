//! Runtime settings for a game session
//!
//! Settings are deserialized from JSON, validated with [`garde`] and then
//! handed to [`crate::game::Game::new`]. Durations are expressed in
//! milliseconds on the wire.

use std::time::Duration;

use garde::Validate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    constants::{capture, timing::*},
    player::Player,
};

/// Validates that a duration, in milliseconds, falls within specified bounds
///
/// # Errors
///
/// Returns a `garde::Error` if the duration is outside the inclusive range
/// `[MIN_MILLIS, MAX_MILLIS]`.
pub fn validate_millis<const MIN_MILLIS: u64, const MAX_MILLIS: u64>(
    val: &Duration,
    _ctx: &(),
) -> garde::Result {
    let millis = u64::try_from(val.as_millis()).unwrap_or(u64::MAX);
    if (MIN_MILLIS..=MAX_MILLIS).contains(&millis) {
        Ok(())
    } else {
        Err(garde::Error::new(format!(
            "outside of bounds [{MIN_MILLIS},{MAX_MILLIS}] ms",
        )))
    }
}

/// Tunable parameters of a game session
#[serde_with::serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    /// Seconds the contestants have to buzz in on a clue, and to answer a wager clue
    #[garde(range(min = MIN_RESPONSE_SECONDS, max = MAX_RESPONSE_SECONDS))]
    pub response_seconds: u32,
    /// Seconds the contestants have to write their final-round answers
    #[garde(range(min = MIN_FINAL_SECONDS, max = MAX_FINAL_SECONDS))]
    pub final_answer_seconds: u32,
    /// Pause after an answer result is shown
    #[garde(custom(validate_millis::<0, MAX_DISPLAY_DELAY_MS>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub result_delay: Duration,
    /// Pause after the correct response is revealed, before the clue closes
    #[garde(custom(validate_millis::<0, MAX_DISPLAY_DELAY_MS>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub reveal_delay: Duration,
    /// Delay before the first transcript capture retry; doubles on each retry
    #[garde(custom(validate_millis::<0, MAX_DISPLAY_DELAY_MS>))]
    #[serde_as(as = "serde_with::DurationMilliSeconds<u64>")]
    pub capture_retry_delay: Duration,
    /// Capture attempts allowed per buzzer lock before giving up
    #[garde(range(min = 1, max = capture::MAX_ATTEMPTS))]
    pub max_capture_attempts: u32,
    /// Contestant in control at the start of the game, random when absent
    #[garde(skip)]
    pub first_control: Option<Player>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            response_seconds: DEFAULT_RESPONSE_SECONDS,
            final_answer_seconds: DEFAULT_FINAL_SECONDS,
            result_delay: Duration::from_millis(DEFAULT_RESULT_DELAY_MS),
            reveal_delay: Duration::from_millis(DEFAULT_REVEAL_DELAY_MS),
            capture_retry_delay: Duration::from_millis(capture::DEFAULT_RETRY_DELAY_MS),
            max_capture_attempts: capture::DEFAULT_MAX_ATTEMPTS,
            first_control: None,
        }
    }
}

/// Errors produced while loading settings
#[derive(Debug, Error)]
pub enum Error {
    /// The settings document is not valid JSON for [`Settings`]
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
    /// The settings are well-formed but out of bounds
    #[error("invalid settings: {0}")]
    Invalid(garde::Report),
}

impl Settings {
    /// Parses and validates settings from a JSON document
    ///
    /// Missing fields take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed JSON and [`Error::Invalid`]
    /// when a value is out of bounds.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate().map_err(Error::Invalid)?;
        Ok(settings)
    }

    /// Delay before capture retry number `retry` (1-based), doubling each time
    pub fn capture_backoff(&self, retry: u32) -> Duration {
        self.capture_retry_delay
            .saturating_mul(1 << retry.saturating_sub(1).min(16))
    }
}
