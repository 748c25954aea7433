//! Player identities
//!
//! The game is played by exactly two contestants. They are identified by
//! a small copyable enum which doubles as an [`enum_map`] key so that
//! per-player data (scores, wagers, answers) is stored without hashing.

use std::fmt::Display;

use enum_map::Enum;
use serde::{Deserialize, Serialize};

/// One of the two contestants
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Enum)]
pub enum Player {
    /// The first contestant
    One,
    /// The second contestant
    Two,
}

impl Player {
    /// Number of contestants in a game
    pub const COUNT: usize = 2;

    /// Both contestants, in seat order
    pub const ALL: [Player; Self::COUNT] = [Player::One, Player::Two];

    /// Returns the opposing contestant
    pub fn other(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    /// Returns the 1-based seat number shown to contestants
    pub fn number(self) -> u8 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }

    /// Picks a contestant uniformly at random
    pub fn random() -> Self {
        if fastrand::bool() { Self::One } else { Self::Two }
    }
}

impl Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.number())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_is_involution() {
        for player in Player::ALL {
            assert_ne!(player.other(), player);
            assert_eq!(player.other().other(), player);
        }
    }

    #[test]
    fn test_display_uses_seat_number() {
        assert_eq!(Player::One.to_string(), "Player 1");
        assert_eq!(Player::Two.to_string(), "Player 2");
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&Player::Two).unwrap();
        assert_eq!(json, "\"Two\"");
        let player: Player = serde_json::from_str("\"One\"").unwrap();
        assert_eq!(player, Player::One);
    }
}
