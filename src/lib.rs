//! # Clueboard
//!
//! This library provides the core game logic for a two-contestant trivia
//! game played on a board of categories and clue values. It handles board
//! selection, buzzer arbitration, the lifecycle of each clue, wagers, the
//! final round and the running scores.
//!
//! The core is free of I/O. Display output goes through a
//! [`session::Tunnel`], speech capture, answer judgment and persistence
//! through [`services::Services`], and delays through an injected scheduler
//! that later hands an [`AlarmMessage`] back to the game. The [`runtime`]
//! module wires all of this to tokio.

#![cfg_attr(all(coverage_nightly, test), feature(coverage_attribute))]
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::too_many_arguments)]
#![allow(clippy::similar_names)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::ignored_unit_patterns)]
#![allow(clippy::struct_field_names)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::wildcard_imports)]
use serde::{Deserialize, Serialize};

pub mod constants;

pub mod arbiter;
pub mod board;
pub mod clue;
pub mod config;
pub mod final_round;
pub mod game;
pub mod ledger;
pub mod player;
pub mod runtime;
pub mod services;
pub mod session;
pub mod timer;

#[cfg(test)]
mod mocks;

pub use game::SyncMessage;

/// Messages sent to update specific aspects of the displayed game
///
/// Update messages are incremental: each one changes a single part of what
/// the presentation layer shows.
#[derive(Debug, Serialize, Clone, PartialEq, Eq, derive_more::From)]
pub enum UpdateMessage {
    /// Board, scores, control and round updates
    Game(game::UpdateMessage),
    /// Updates of the clue being played
    Clue(clue::UpdateMessage),
    /// Final round updates
    Final(final_round::UpdateMessage),
}

impl UpdateMessage {
    /// Converts the update message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// Alarm messages for timed events
///
/// The game hands these to its scheduler together with a delay and expects
/// them back through [`game::Game::receive_alarm`] once the delay elapsed.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::From, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Countdown ticks
    Timer(timer::AlarmMessage),
    /// Clue lifecycle transitions
    Clue(clue::AlarmMessage),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{arbiter::BuzzerState, player::Player};

    #[test]
    fn test_update_message_serialization() {
        let message: UpdateMessage = clue::UpdateMessage::Buzzer(BuzzerState::Locked(Player::Two)).into();
        assert_eq!(
            message.to_message(),
            r#"{"Clue":{"Buzzer":{"Locked":"Two"}}}"#
        );
    }

    #[test]
    fn test_optional_fields_are_skipped() {
        let message: UpdateMessage = clue::UpdateMessage::AnswerResult {
            player: Player::One,
            correct: false,
            message: "Time's up! -$200".to_owned(),
            explanation: None,
        }
        .into();
        assert!(!message.to_message().contains("explanation"));
    }

    #[test]
    fn test_alarm_message_round_trips_through_json() {
        let alarm: AlarmMessage = timer::AlarmMessage::Tick {
            clock: timer::Clock::Final,
            owner: 3,
            generation: 9,
        }
        .into();
        let json = serde_json::to_string(&alarm).unwrap();
        assert_eq!(serde_json::from_str::<AlarmMessage>(&json).unwrap(), alarm);
    }
}
