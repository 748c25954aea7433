//! Score ledger
//!
//! The authoritative running totals of both contestants. Totals may go
//! negative. Only the clue lifecycle and the final round mutate the ledger,
//! which is why its mutators are crate-private.

use std::cmp::Ordering;

use enum_map::EnumMap;
use serde::{Deserialize, Serialize};

use crate::player::Player;

/// Result of a finished game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The contestant with the strictly higher score
    Winner(Player),
    /// Both contestants finished level
    Tie,
}

/// Running totals of both contestants
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLedger {
    scores: EnumMap<Player, i64>,
}

impl ScoreLedger {
    /// Returns a contestant's current total
    pub fn score(&self, player: Player) -> i64 {
        self.scores[player]
    }

    /// Returns both totals
    pub fn scores(&self) -> EnumMap<Player, i64> {
        self.scores
    }

    /// Adds an amount to a contestant's total
    ///
    /// # Returns
    ///
    /// The contestant's new total
    pub(crate) fn award(&mut self, player: Player, amount: u32) -> i64 {
        self.scores[player] += i64::from(amount);
        self.scores[player]
    }

    /// Subtracts an amount from a contestant's total
    ///
    /// # Returns
    ///
    /// The contestant's new total
    pub(crate) fn deduct(&mut self, player: Player, amount: u32) -> i64 {
        self.scores[player] -= i64::from(amount);
        self.scores[player]
    }

    /// Resets both totals to zero
    pub(crate) fn reset(&mut self) {
        self.scores = EnumMap::default();
    }

    /// Returns the contestant with the strictly lower total, if any
    pub fn trailing(&self) -> Option<Player> {
        match self.scores[Player::One].cmp(&self.scores[Player::Two]) {
            Ordering::Less => Some(Player::One),
            Ordering::Greater => Some(Player::Two),
            Ordering::Equal => None,
        }
    }

    /// Decides the game from the current totals
    pub fn outcome(&self) -> Outcome {
        match self.trailing() {
            Some(player) => Outcome::Winner(player.other()),
            None => Outcome::Tie,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_award_and_deduct() {
        let mut ledger = ScoreLedger::default();
        assert_eq!(ledger.award(Player::One, 400), 400);
        assert_eq!(ledger.deduct(Player::One, 1000), -600);
        assert_eq!(ledger.score(Player::Two), 0);
    }

    #[test]
    fn test_trailing_player() {
        let mut ledger = ScoreLedger::default();
        assert_eq!(ledger.trailing(), None);

        ledger.award(Player::One, 800);
        ledger.award(Player::Two, 1200);
        assert_eq!(ledger.trailing(), Some(Player::One));

        ledger.award(Player::One, 600);
        assert_eq!(ledger.trailing(), Some(Player::Two));
    }

    #[test]
    fn test_outcome() {
        let mut ledger = ScoreLedger::default();
        assert_eq!(ledger.outcome(), Outcome::Tie);

        ledger.deduct(Player::One, 200);
        assert_eq!(ledger.outcome(), Outcome::Winner(Player::Two));

        ledger.award(Player::One, 400);
        assert_eq!(ledger.outcome(), Outcome::Winner(Player::One));
    }

    #[test]
    fn test_reset() {
        let mut ledger = ScoreLedger::default();
        ledger.award(Player::Two, 2000);
        ledger.reset();
        assert_eq!(ledger, ScoreLedger::default());
    }
}
