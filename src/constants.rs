//! Configuration constants for the clueboard game system
//!
//! This module contains the fixed dimensions, scoring floors, timing
//! defaults and validation bounds used throughout the game so that the
//! board, the controller and the settings agree on the same limits.

/// Board layout constants
pub mod board {
    /// Number of categories on each board round
    pub const CATEGORY_COUNT: usize = 6;
    /// Number of clues (value rows) in each category
    pub const VALUES_PER_CATEGORY: usize = 5;
    /// Number of clues on each board round
    pub const CLUES_PER_ROUND: usize = CATEGORY_COUNT * VALUES_PER_CATEGORY;
    /// Maximum length of clue, response and category text in characters
    pub const MAX_TEXT_LENGTH: usize = 1000;
}

/// Wager constants
pub mod wager {
    /// Wager ceiling offered on the standard round regardless of a low score
    pub const STANDARD_FLOOR: i64 = 1000;
    /// Wager ceiling offered on the double round regardless of a low score
    pub const DOUBLE_FLOOR: i64 = 2000;
    /// Smallest wager the input layer should offer on a wager clue
    pub const MIN_CLUE_WAGER: u32 = 5;
}

/// Timing constants, in seconds unless stated otherwise
pub mod timing {
    /// Default response window for a clue
    pub const DEFAULT_RESPONSE_SECONDS: u32 = 10;
    /// Shortest allowed response window
    pub const MIN_RESPONSE_SECONDS: u32 = 3;
    /// Longest allowed response window
    pub const MAX_RESPONSE_SECONDS: u32 = 60;
    /// Default answer window of the final round
    pub const DEFAULT_FINAL_SECONDS: u32 = 30;
    /// Shortest allowed final-round answer window
    pub const MIN_FINAL_SECONDS: u32 = 5;
    /// Longest allowed final-round answer window
    pub const MAX_FINAL_SECONDS: u32 = 120;
    /// Default pause after an answer result is shown, in milliseconds
    pub const DEFAULT_RESULT_DELAY_MS: u64 = 2000;
    /// Default pause after the correct response is revealed, in milliseconds
    pub const DEFAULT_REVEAL_DELAY_MS: u64 = 3000;
    /// Longest allowed display pause, in milliseconds
    pub const MAX_DISPLAY_DELAY_MS: u64 = 10_000;
}

/// Transcript capture constants
pub mod capture {
    /// Delay before the first capture retry, in milliseconds
    pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
    /// Default number of capture attempts per buzzer lock
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    /// Largest configurable number of capture attempts per buzzer lock
    pub const MAX_ATTEMPTS: u32 = 10;
}
