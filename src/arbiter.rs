//! Buzzer arbitration
//!
//! The arbiter only tracks who holds the right to answer. Which contestants
//! already answered a clue is owned by the clue lifecycle and passed in on
//! every press.

use serde::{Deserialize, Serialize};

use crate::player::Player;

/// Lock state of the buzzers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuzzerState {
    /// Nobody may buzz
    #[default]
    Closed,
    /// The first eligible press wins the lock
    Open,
    /// A contestant holds the right to answer
    Locked(Player),
}

/// Decides who may attempt an answer at any moment
#[derive(Debug, Clone, Default)]
pub struct Arbiter {
    state: BuzzerState,
}

impl Arbiter {
    /// Current lock state
    pub fn state(&self) -> BuzzerState {
        self.state
    }

    /// Opens the buzzers
    ///
    /// # Returns
    ///
    /// `false` (and no change) unless the buzzers were closed
    pub fn open(&mut self) -> bool {
        if self.state == BuzzerState::Closed {
            self.state = BuzzerState::Open;
            true
        } else {
            false
        }
    }

    /// Registers a buzzer press
    ///
    /// # Returns
    ///
    /// `true` if the press won the lock. Presses are ignored while the
    /// buzzers are not open and from contestants in `already_answered`.
    pub fn press(&mut self, player: Player, already_answered: &[Player]) -> bool {
        if self.state == BuzzerState::Open && !already_answered.contains(&player) {
            self.state = BuzzerState::Locked(player);
            true
        } else {
            false
        }
    }

    /// Hands the lock straight to a contestant, bypassing the open/press cycle
    ///
    /// Used for wager clues where only the contestant in control may answer.
    pub fn lock(&mut self, player: Player) {
        self.state = BuzzerState::Locked(player);
    }

    /// Forces the buzzers closed from any state
    pub fn close(&mut self) {
        self.state = BuzzerState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_only_from_closed() {
        let mut arbiter = Arbiter::default();
        assert!(arbiter.open());
        assert!(!arbiter.open());

        arbiter.lock(Player::One);
        assert!(!arbiter.open());
        assert_eq!(arbiter.state(), BuzzerState::Locked(Player::One));
    }

    #[test]
    fn test_first_press_wins() {
        let mut arbiter = Arbiter::default();
        arbiter.open();

        assert!(arbiter.press(Player::Two, &[]));
        assert!(!arbiter.press(Player::One, &[]));
        assert_eq!(arbiter.state(), BuzzerState::Locked(Player::Two));
    }

    #[test]
    fn test_press_ignored_when_closed() {
        let mut arbiter = Arbiter::default();
        assert!(!arbiter.press(Player::One, &[]));
        assert_eq!(arbiter.state(), BuzzerState::Closed);
    }

    #[test]
    fn test_player_who_answered_cannot_relock() {
        let mut arbiter = Arbiter::default();
        arbiter.open();

        assert!(!arbiter.press(Player::One, &[Player::One]));
        assert_eq!(arbiter.state(), BuzzerState::Open);

        assert!(arbiter.press(Player::Two, &[Player::One]));
        assert_eq!(arbiter.state(), BuzzerState::Locked(Player::Two));
    }

    #[test]
    fn test_close_from_any_state() {
        let mut arbiter = Arbiter::default();
        arbiter.close();
        assert_eq!(arbiter.state(), BuzzerState::Closed);

        arbiter.open();
        arbiter.close();
        assert_eq!(arbiter.state(), BuzzerState::Closed);

        arbiter.lock(Player::Two);
        arbiter.close();
        assert_eq!(arbiter.state(), BuzzerState::Closed);
    }
}
