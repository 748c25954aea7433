//! External collaborators
//!
//! Speech capture, answer judgment and used-clue persistence happen outside
//! the game core. The core asks for them through the [`Services`] trait and
//! receives the results later as [`crate::game::ServiceMessage`]s tagged with
//! the [`Ticket`] the request was issued under.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{board::ClueId, player::Player};

/// Tag identifying which wait a collaborator result belongs to
///
/// `attempt` names the clue (or final round) being played and `step` the
/// phase of that attempt. Results carrying any other ticket are stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    /// Identifier of the clue attempt or final round
    pub attempt: u64,
    /// Phase counter within the attempt
    pub step: u32,
}

/// Correctness verdict returned by the judgment oracle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Whether the candidate answer is accepted
    pub correct: bool,
    /// Short human readable reason
    pub explanation: String,
}

/// A request to judge one candidate answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgmentRequest {
    /// Ticket to echo back with the verdict
    pub ticket: Ticket,
    /// Contestant whose answer is judged
    pub player: Player,
    /// Clue text shown to the contestants
    pub clue: String,
    /// Reference correct response
    pub reference: String,
    /// Candidate answer as transcribed or typed
    pub candidate: String,
}

/// Failures reported by external collaborators
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum Error {
    /// Transcript capture failed
    #[error("capture failed: {0}")]
    Capture(String),
    /// The judgment oracle could not produce a verdict
    #[error("judgment unavailable: {0}")]
    JudgmentUnavailable(String),
    /// Used clues could not be saved
    #[error("persistence failed: {0}")]
    Persistence(String),
}

/// Requests the game core issues to its collaborators
///
/// Implementations must not call back into the game synchronously; results
/// are delivered later through [`crate::game::Game::receive_message`].
pub trait Services {
    /// Starts listening for one contestant's spoken answer
    ///
    /// Exactly one transcript or capture failure is expected per call.
    fn start_capture(&mut self, ticket: Ticket, player: Player);

    /// Stops any capture in progress; safe to call when none is running
    fn stop_capture(&mut self);

    /// Asks the oracle to judge a candidate answer
    fn request_judgment(&mut self, request: JudgmentRequest);

    /// Saves the identifiers of every clue played this game, best effort
    fn persist_used_clues(&mut self, ids: Vec<ClueId>);
}

/// Normalizes an answer for approximate comparison
///
/// Lower-cases, drops everything but ASCII letters, digits and whitespace,
/// and collapses runs of whitespace.
fn normalize(answer: &str) -> String {
    answer
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .join(" ")
}

/// Deterministic local judgment used when the oracle is unavailable
///
/// An answer is accepted when either normalized text contains the other.
/// Blank answers are never accepted.
pub fn fallback_verdict(reference: &str, candidate: &str) -> Verdict {
    let reference = normalize(reference);
    let candidate = normalize(candidate);

    let correct = !candidate.is_empty()
        && !reference.is_empty()
        && (candidate.contains(&reference) || reference.contains(&candidate));

    Verdict {
        correct,
        explanation: "oracle unavailable - using simple matching".to_owned(),
    }
}
