//! Board model
//!
//! A [`Board`] is produced by an external question provider before the game
//! starts and stays immutable for the whole game. It holds two board rounds
//! of 6 categories × 5 clues each and an optional final clue. Clues are
//! addressed by `(category_index, value_index)` and identified across the
//! game by their [`ClueId`].

use std::collections::HashSet;

use garde::Validate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{board::*, wager};

/// Phase of the game, in play order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Round {
    /// First board round
    Standard,
    /// Second board round, with doubled values
    Double,
    /// Closing single clue with simultaneous wagers
    Final,
}

impl Round {
    /// Wager ceiling a low-scoring contestant may still bet up to on a wager clue
    pub fn wager_floor(self) -> i64 {
        match self {
            Self::Standard => wager::STANDARD_FLOOR,
            Self::Double => wager::DOUBLE_FLOOR,
            Self::Final => 0,
        }
    }

    /// Banner announced when the round begins
    pub fn banner(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD ROUND",
            Self::Double => "DOUBLE ROUND",
            Self::Final => "FINAL ROUND",
        }
    }
}

/// Stable identifier of a clue, used to track which clues were played
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[serde(transparent)]
pub struct ClueId(String);

impl ClueId {
    /// Returns the identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClueId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// Validates that a clue identifier is not blank
fn validate_clue_id(id: &ClueId, _ctx: &()) -> garde::Result {
    if id.as_str().trim().is_empty() {
        Err(garde::Error::new("clue identifier cannot be empty"))
    } else {
        Ok(())
    }
}

/// One question/answer unit on a board round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Clue {
    /// Identifier stable across the game
    #[garde(custom(validate_clue_id))]
    pub id: ClueId,
    /// Category the clue belongs to
    #[garde(length(chars, min = 1, max = MAX_TEXT_LENGTH))]
    pub category: String,
    /// Dollar value shown on the board
    #[garde(range(min = 1))]
    pub value: u32,
    /// Clue text read to the contestants
    #[garde(length(chars, min = 1, max = MAX_TEXT_LENGTH))]
    pub text: String,
    /// Reference correct response
    #[garde(length(chars, min = 1, max = MAX_TEXT_LENGTH))]
    pub response: String,
    /// Whether the clue is a wager clue (daily double)
    #[garde(skip)]
    #[serde(default)]
    pub daily_double: bool,
}

/// The closing single clue played with simultaneous wagers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct FinalClue {
    /// Category announced before wagers are placed
    #[garde(length(chars, min = 1, max = MAX_TEXT_LENGTH))]
    pub category: String,
    /// Clue text revealed after wagers are placed
    #[garde(length(chars, min = 1, max = MAX_TEXT_LENGTH))]
    pub text: String,
    /// Reference correct response
    #[garde(length(chars, min = 1, max = MAX_TEXT_LENGTH))]
    pub response: String,
}

/// One board round: 6 categories and their 30 clues in category-major order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct BoardRound {
    /// Category names, left to right
    #[garde(
        length(min = CATEGORY_COUNT, max = CATEGORY_COUNT),
        inner(length(chars, min = 1, max = MAX_TEXT_LENGTH))
    )]
    pub categories: Vec<String>,
    /// Clues, `category_index * 5 + value_index`
    #[garde(length(min = CLUES_PER_ROUND, max = CLUES_PER_ROUND), dive)]
    pub clues: Vec<Clue>,
}

impl BoardRound {
    /// Looks up the clue at a board position
    ///
    /// # Returns
    ///
    /// `None` if the position lies outside the 6 × 5 grid
    pub fn clue(&self, category_index: usize, value_index: usize) -> Option<&Clue> {
        if category_index >= CATEGORY_COUNT || value_index >= VALUES_PER_CATEGORY {
            return None;
        }
        self.clues
            .get(category_index * VALUES_PER_CATEGORY + value_index)
    }

    /// Returns whether every clue of this round is in the used set
    pub fn is_exhausted(&self, used: &UsedClues) -> bool {
        self.clues.iter().all(|clue| used.contains(&clue.id))
    }

    /// Builds the per-category "already played" grid used by displays
    pub fn used_grid(&self, used: &UsedClues) -> Vec<Vec<bool>> {
        self.clues
            .chunks(VALUES_PER_CATEGORY)
            .map(|column| column.iter().map(|clue| used.contains(&clue.id)).collect_vec())
            .collect_vec()
    }
}

/// A complete game board as handed over by the question provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct Board {
    /// The standard round
    #[garde(dive)]
    pub standard: BoardRound,
    /// The double-value round
    #[garde(dive)]
    pub double: BoardRound,
    /// The final clue, absent when the provider has none left
    #[garde(dive)]
    #[serde(default)]
    pub final_clue: Option<FinalClue>,
}

/// Errors produced while loading a board
#[derive(Debug, Error)]
pub enum Error {
    /// The board document is not valid JSON for [`Board`]
    #[error("malformed board: {0}")]
    Parse(#[from] serde_json::Error),
    /// The board does not have the expected shape
    #[error("invalid board: {0}")]
    Invalid(garde::Report),
    /// Two clues share the same identifier
    #[error("duplicate clue identifier {0}")]
    DuplicateClue(ClueId),
}

impl Board {
    /// Returns the board round played during `round`
    ///
    /// # Returns
    ///
    /// `None` for [`Round::Final`], which has no board
    pub fn round(&self, round: Round) -> Option<&BoardRound> {
        match round {
            Round::Standard => Some(&self.standard),
            Round::Double => Some(&self.double),
            Round::Final => None,
        }
    }

    /// Parses and validates a board from a JSON document
    ///
    /// # Errors
    ///
    /// Returns [`Error::Parse`] for malformed JSON, [`Error::Invalid`] if a
    /// round does not have exactly 6 categories and 30 clues or a field is
    /// empty, and [`Error::DuplicateClue`] when an identifier repeats.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        let board: Self = serde_json::from_str(json)?;
        board.check()?;
        Ok(board)
    }

    /// Validates the shape of the board and the uniqueness of its clue identifiers
    ///
    /// # Errors
    ///
    /// See [`Board::from_json`].
    pub fn check(&self) -> Result<(), Error> {
        self.validate().map_err(Error::Invalid)?;

        let mut seen = HashSet::new();
        for clue in self.standard.clues.iter().chain(&self.double.clues) {
            if !seen.insert(&clue.id) {
                return Err(Error::DuplicateClue(clue.id.clone()));
            }
        }
        Ok(())
    }
}

/// Insertion-ordered set of clue identifiers that have been played
///
/// Identifiers are only ever added; the set never shrinks during a game.
#[derive(Debug, Clone, Default)]
pub struct UsedClues {
    order: Vec<ClueId>,
    seen: HashSet<ClueId>,
}

impl UsedClues {
    /// Marks a clue as used
    ///
    /// # Returns
    ///
    /// `false` if the clue was already used, in which case nothing changes
    pub fn insert(&mut self, id: ClueId) -> bool {
        if self.seen.insert(id.clone()) {
            self.order.push(id);
            true
        } else {
            false
        }
    }

    /// Returns whether the clue has been used
    pub fn contains(&self, id: &ClueId) -> bool {
        self.seen.contains(id)
    }

    /// Number of used clues
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns whether no clue has been used yet
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Used identifiers in the order they were played
    pub fn as_slice(&self) -> &[ClueId] {
        &self.order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::test_board;

    #[test]
    fn test_fixture_board_is_valid() {
        assert!(test_board().check().is_ok());
    }

    #[test]
    fn test_clue_lookup() {
        let board = test_board();
        let clue = board.standard.clue(2, 3).unwrap();
        assert_eq!(clue.id, ClueId::from("s-2-3"));
        assert_eq!(clue.value, 800);

        assert!(board.standard.clue(CATEGORY_COUNT, 0).is_none());
        assert!(board.standard.clue(0, VALUES_PER_CATEGORY).is_none());
    }

    #[test]
    fn test_wrong_category_count_is_invalid() {
        let mut board = test_board();
        board.double.categories.pop();
        assert!(matches!(board.check(), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_wrong_clue_count_is_invalid() {
        let mut board = test_board();
        board.standard.clues.pop();
        assert!(matches!(board.check(), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_zero_value_is_invalid() {
        let mut board = test_board();
        board.standard.clues[0].value = 0;
        assert!(matches!(board.check(), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_duplicate_identifier_across_rounds() {
        let mut board = test_board();
        board.double.clues[7].id = board.standard.clues[4].id.clone();
        assert!(matches!(board.check(), Err(Error::DuplicateClue(id)) if id == ClueId::from("s-0-4")));
    }

    #[test]
    fn test_from_json_round_trip_of_fixture() {
        let json = serde_json::to_string(&test_board()).unwrap();
        let board = Board::from_json(&json).unwrap();
        assert_eq!(board, test_board());
    }

    #[test]
    fn test_final_clue_is_optional() {
        let mut value = serde_json::to_value(test_board()).unwrap();
        value.as_object_mut().unwrap().remove("final_clue");
        let board = Board::from_json(&value.to_string()).unwrap();
        assert!(board.final_clue.is_none());
    }

    #[test]
    fn test_used_clues_only_grow() {
        let mut used = UsedClues::default();
        assert!(used.is_empty());
        assert!(used.insert(ClueId::from("a")));
        assert!(used.insert(ClueId::from("b")));
        assert!(!used.insert(ClueId::from("a")));
        assert_eq!(used.len(), 2);
        assert_eq!(used.as_slice(), &[ClueId::from("a"), ClueId::from("b")]);
    }

    #[test]
    fn test_exhaustion_and_grid() {
        let board = test_board();
        let mut used = UsedClues::default();
        assert!(!board.standard.is_exhausted(&used));

        used.insert(board.standard.clues[6].id.clone());
        let grid = board.standard.used_grid(&used);
        assert_eq!(grid.len(), CATEGORY_COUNT);
        assert!(grid[1][1]);
        assert!(!grid[1][0]);

        for clue in &board.standard.clues {
            used.insert(clue.id.clone());
        }
        assert!(board.standard.is_exhausted(&used));
        assert!(!board.double.is_exhausted(&used));
    }
}
