//! Core game logic and state management
//!
//! This module contains the [`Game`] struct, which owns the board, the used
//! clue set, the score ledger and the contestant in control, and drives the
//! rounds from the first board to the final results. All input arrives
//! through [`Game::receive_message`] and [`Game::receive_alarm`]; the game
//! never blocks and never spawns work of its own.

use std::time::Duration;

use enum_map::EnumMap;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    AlarmMessage,
    board::{Board, ClueId, Round, UsedClues},
    clue::{self, ClueAttempt, ClueView},
    config::Settings,
    constants::timing::{MAX_RESPONSE_SECONDS, MIN_RESPONSE_SECONDS},
    final_round::{self, FinalRound, FinalView},
    ledger::{Outcome, ScoreLedger},
    player::Player,
    services::{self, Services, Ticket, Verdict},
    session::Tunnel,
};

/// Represents the current phase of the game
#[derive(Debug, Clone)]
pub enum State {
    /// Created but not started
    Waiting,
    /// The board is shown and the controller picks a clue
    Board,
    /// A clue is being played
    Clue(Box<ClueAttempt>),
    /// The final round is being played
    Final(Box<FinalRound>),
    /// The game is over
    Done(Outcome),
}

/// Why a clue selection was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
pub enum Rejection {
    /// The clue was already played
    #[error("clue was already played")]
    AlreadyUsed,
    /// Another clue is still being played
    #[error("another clue is in progress")]
    InProgress,
    /// The position lies outside the board
    #[error("position is outside the board")]
    OutOfBounds,
    /// The selection names a round other than the current one
    #[error("clue belongs to another round")]
    WrongRound,
}

/// Errors returned for input the game refuses
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A clue selection was refused
    #[error("invalid selection: {0}")]
    InvalidSelection(Rejection),
    /// The input needs a clue in play
    #[error("no clue is being played")]
    NoActiveClue,
    /// The input does not apply to the current phase
    #[error("input is not expected right now")]
    UnexpectedInput,
    /// A buzzer press had no effect
    #[error("{0} cannot buzz right now")]
    BuzzIgnored(Player),
    /// A wager exceeded what the contestant may bet
    #[error("{player} wagered ${wager}, more than the allowed ${max}")]
    WagerTooLarge {
        /// Contestant who wagered
        player: Player,
        /// Wager placed
        wager: u32,
        /// Largest acceptable wager
        max: i64,
    },
    /// A response time outside the accepted range
    #[error(
        "response time of {0}s is outside [{min}, {max}]",
        min = MIN_RESPONSE_SECONDS,
        max = MAX_RESPONSE_SECONDS
    )]
    ResponseTimeOutOfRange(u32),
    /// The game has not been started
    #[error("the game has not started")]
    NotStarted,
    /// The game is over
    #[error("the game is over")]
    Finished,
}

/// Input from the contestants and the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputMessage {
    /// Pick a clue off the board
    SelectClue {
        /// Category column
        category: usize,
        /// Value row
        value: usize,
        /// Round the selection was made in
        round: Round,
    },
    /// A buzzer press
    Buzz(Player),
    /// The controller's wager on a wager clue
    SubmitWager(u32),
    /// Both final-round wagers
    SubmitFinalWagers {
        /// Wager of player one
        one: u32,
        /// Wager of player two
        two: u32,
    },
    /// A contestant's in-progress final answer
    FinalAnswerDraft {
        /// Contestant typing
        player: Player,
        /// Text typed so far
        text: String,
    },
    /// Both final-round answers
    SubmitFinalAnswers {
        /// Answer of player one
        one: String,
        /// Answer of player two
        two: String,
    },
    /// Abandon the current clue and show its answer
    SkipClue,
    /// Hand board control to the other contestant
    ToggleControl,
    /// Change the response time used from the next clue timer on
    SetResponseTime(u32),
}

/// Results delivered by external collaborators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceMessage {
    /// A captured spoken answer
    Transcript {
        /// Ticket the capture was started with
        ticket: Ticket,
        /// Contestant who spoke
        player: Player,
        /// Transcribed text
        text: String,
    },
    /// Capture failed
    CaptureFailed {
        /// Ticket the capture was started with
        ticket: Ticket,
        /// Contestant being listened to
        player: Player,
        /// What went wrong
        error: services::Error,
    },
    /// A verdict on a candidate answer, or the reason there is none
    Verdict {
        /// Ticket the judgment was requested with
        ticket: Ticket,
        /// Contestant whose answer was judged
        player: Player,
        /// Verdict or oracle failure
        result: Result<Verdict, String>,
    },
}

/// Every message the game accepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
pub enum IncomingMessage {
    /// Contestant or operator input
    Input(InputMessage),
    /// Collaborator result
    Service(ServiceMessage),
}

/// Game-level display updates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UpdateMessage {
    /// Show the board of a round
    Board {
        /// Round the board belongs to
        round: Round,
        /// Category names
        categories: Vec<String>,
        /// Played clues, per category
        used: Vec<Vec<bool>>,
    },
    /// Announce a new round
    RoundBanner(String),
    /// Mark a clue as played on the board
    ClueUsed {
        /// Category column
        category: usize,
        /// Value row
        value: usize,
    },
    /// Return from the clue to the board
    HideClue,
    /// Current totals
    Scores(EnumMap<Player, i64>),
    /// Contestant in control of the board
    Control(Player),
    /// The game is over
    GameOver {
        /// Winner or tie
        outcome: Outcome,
        /// Final totals
        scores: EnumMap<Player, i64>,
    },
}

/// Board as shown to displays
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardView {
    /// Category names
    pub categories: Vec<String>,
    /// Played clues, per category
    pub used: Vec<Vec<bool>>,
}

/// Full snapshot of the game for displays that join late
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncMessage {
    /// Game identifier
    pub game: Uuid,
    /// Whether the game has started
    pub started: bool,
    /// Current round
    pub round: Round,
    /// Current totals
    pub scores: EnumMap<Player, i64>,
    /// Contestant in control of the board
    pub control: Player,
    /// Board of the current round
    pub board: Option<BoardView>,
    /// Clue being played
    pub clue: Option<ClueView>,
    /// Final round in progress
    pub final_round: Option<FinalView>,
    /// Result, once the game is over
    pub outcome: Option<Outcome>,
}

impl SyncMessage {
    /// Converts the sync message to a JSON string for transmission
    ///
    /// # Panics
    ///
    /// This method panics if serialization fails, which should never happen
    /// with the default JSON serializer for well-formed data.
    pub fn to_message(&self) -> String {
        serde_json::to_string(self).expect("default serializer cannot fail")
    }
}

/// A two-contestant game session
#[derive(Debug, Clone)]
pub struct Game {
    id: Uuid,
    settings: Settings,
    board: Board,
    round: Round,
    used: UsedClues,
    ledger: ScoreLedger,
    control: Player,
    state: State,
    attempts: u64,
}

impl Game {
    /// Creates a game that waits for [`Game::play`]
    ///
    /// # Arguments
    ///
    /// * `board` - Board produced by the question provider, already checked
    /// * `settings` - Timing and retry settings, already validated
    pub fn new(board: Board, settings: Settings) -> Self {
        Self {
            id: Uuid::new_v4(),
            control: settings.first_control.unwrap_or(Player::One),
            settings,
            board,
            round: Round::Standard,
            used: UsedClues::default(),
            ledger: ScoreLedger::default(),
            state: State::Waiting,
            attempts: 0,
        }
    }

    /// Game identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current phase
    pub fn state(&self) -> &State {
        &self.state
    }

    /// Current round
    pub fn round(&self) -> Round {
        self.round
    }

    /// Contestant in control of the board
    pub fn control(&self) -> Player {
        self.control
    }

    /// Running totals
    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    /// Clues played so far
    pub fn used(&self) -> &UsedClues {
        &self.used
    }

    /// Result, once the game is over
    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            State::Done(outcome) => Some(outcome),
            _ => None,
        }
    }

    /// Starts the game on the standard round
    ///
    /// Scores and the used set are cleared and control goes to the
    /// configured first contestant, or a random one. Calling it again
    /// restarts the game; callbacks from the earlier game become stale.
    pub fn play<T: Tunnel>(&mut self, tunnel: &T) {
        self.round = Round::Standard;
        self.used = UsedClues::default();
        self.ledger.reset();
        self.control = self.settings.first_control.unwrap_or_else(Player::random);
        self.state = State::Board;
        // retires tickets of whatever was in play before a restart
        self.attempts += 1;

        info!(game = %self.id, player = %self.control, "game started");
        self.announce_round(tunnel);
    }

    fn announce_round<T: Tunnel>(&self, tunnel: &T) {
        tunnel.send_message(&UpdateMessage::RoundBanner(self.round.banner().to_owned()).into());
        if let Some(board) = self.board.round(self.round) {
            tunnel.send_message(
                &UpdateMessage::Board {
                    round: self.round,
                    categories: board.categories.clone(),
                    used: board.used_grid(&self.used),
                }
                .into(),
            );
        }
        tunnel.send_message(&UpdateMessage::Scores(self.ledger.scores()).into());
        tunnel.send_message(&UpdateMessage::Control(self.control).into());
    }

    /// Handles one incoming message
    ///
    /// # Errors
    ///
    /// Input the current phase does not accept is refused with an [`Error`]
    /// and leaves the game unchanged. Collaborator results never fail; stale
    /// ones are dropped.
    ///
    /// # Type Parameters
    ///
    /// * `T` - Type implementing the Tunnel trait for display output
    /// * `V` - Collaborators for capture, judgment and persistence
    /// * `S` - Function type for scheduling alarm messages
    pub fn receive_message<T: Tunnel, V: Services, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        message: IncomingMessage,
        tunnel: &T,
        services: &mut V,
        schedule_message: &mut S,
    ) -> Result<(), Error> {
        match message {
            IncomingMessage::Input(input) => {
                self.receive_input(input, tunnel, services, schedule_message)
            }
            IncomingMessage::Service(result) => {
                self.receive_service(result, tunnel, services, schedule_message);
                Ok(())
            }
        }
    }

    fn receive_input<T: Tunnel, V: Services, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        input: InputMessage,
        tunnel: &T,
        services: &mut V,
        schedule_message: &mut S,
    ) -> Result<(), Error> {
        if let InputMessage::SetResponseTime(seconds) = input {
            return self.set_response_time(seconds);
        }
        match self.state {
            State::Waiting => return Err(Error::NotStarted),
            State::Done(_) => return Err(Error::Finished),
            _ => {}
        }

        match input {
            InputMessage::SelectClue {
                category,
                value,
                round,
            } => self.select_clue(category, value, round, tunnel, schedule_message),
            InputMessage::Buzz(player) => match &mut self.state {
                State::Clue(attempt) => attempt.buzz(player, tunnel, services),
                _ => Err(Error::NoActiveClue),
            },
            InputMessage::SubmitWager(amount) => match &mut self.state {
                State::Clue(attempt) => attempt.submit_wager(
                    amount,
                    &self.ledger,
                    &self.settings,
                    tunnel,
                    services,
                    schedule_message,
                ),
                _ => Err(Error::NoActiveClue),
            },
            InputMessage::SubmitFinalWagers { one, two } => match &mut self.state {
                State::Final(round) => round.submit_wagers(
                    EnumMap::from_array([one, two]),
                    &self.ledger,
                    &self.settings,
                    tunnel,
                    schedule_message,
                ),
                _ => Err(Error::UnexpectedInput),
            },
            InputMessage::FinalAnswerDraft { player, text } => match &mut self.state {
                State::Final(round) => round.update_draft(player, text),
                _ => Err(Error::UnexpectedInput),
            },
            InputMessage::SubmitFinalAnswers { one, two } => match &mut self.state {
                State::Final(round) => {
                    round.submit_answers(EnumMap::from_array([one, two]), tunnel, services)
                }
                _ => Err(Error::UnexpectedInput),
            },
            InputMessage::SkipClue => match &mut self.state {
                State::Clue(attempt) => {
                    attempt.skip(&self.settings, tunnel, services, schedule_message);
                    Ok(())
                }
                _ => Err(Error::NoActiveClue),
            },
            InputMessage::ToggleControl => {
                self.control = self.control.other();
                info!(game = %self.id, player = %self.control, "control toggled");
                tunnel.send_message(&UpdateMessage::Control(self.control).into());
                Ok(())
            }
            InputMessage::SetResponseTime(seconds) => self.set_response_time(seconds),
        }
    }

    fn set_response_time(&mut self, seconds: u32) -> Result<(), Error> {
        if !(MIN_RESPONSE_SECONDS..=MAX_RESPONSE_SECONDS).contains(&seconds) {
            return Err(Error::ResponseTimeOutOfRange(seconds));
        }
        self.settings.response_seconds = seconds;
        info!(game = %self.id, seconds, "response time changed");
        Ok(())
    }

    fn select_clue<T: Tunnel, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        category: usize,
        value: usize,
        round: Round,
        tunnel: &T,
        schedule_message: &mut S,
    ) -> Result<(), Error> {
        match self.state {
            State::Board => {}
            State::Clue(_) => return Err(Error::InvalidSelection(Rejection::InProgress)),
            _ => return Err(Error::InvalidSelection(Rejection::WrongRound)),
        }
        if round != self.round {
            return Err(Error::InvalidSelection(Rejection::WrongRound));
        }

        let clue = self
            .board
            .round(round)
            .and_then(|board| board.clue(category, value))
            .ok_or(Error::InvalidSelection(Rejection::OutOfBounds))?
            .clone();
        if !self.used.insert(clue.id.clone()) {
            debug!(game = %self.id, clue = %clue.id, "clue already used");
            return Err(Error::InvalidSelection(Rejection::AlreadyUsed));
        }

        tunnel.send_message(&UpdateMessage::ClueUsed { category, value }.into());

        self.attempts += 1;
        let mut attempt = ClueAttempt::new(self.attempts, round, clue, self.control);
        attempt.begin(&self.ledger, &self.settings, tunnel, schedule_message);
        self.state = State::Clue(Box::new(attempt));
        Ok(())
    }

    fn receive_service<T: Tunnel, V: Services, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        message: ServiceMessage,
        tunnel: &T,
        services: &mut V,
        schedule_message: &mut S,
    ) {
        let final_finished = match (&mut self.state, message) {
            (
                State::Clue(attempt),
                ServiceMessage::Transcript {
                    ticket,
                    player,
                    text,
                },
            ) => {
                attempt.receive_transcript(ticket, player, text, tunnel, services);
                false
            }
            (
                State::Clue(attempt),
                ServiceMessage::CaptureFailed {
                    ticket,
                    player,
                    error,
                },
            ) => {
                attempt.receive_capture_failure(
                    ticket,
                    player,
                    &error,
                    &self.settings,
                    tunnel,
                    schedule_message,
                );
                false
            }
            (
                State::Clue(attempt),
                ServiceMessage::Verdict {
                    ticket,
                    player,
                    result,
                },
            ) => {
                attempt.receive_verdict(
                    ticket,
                    player,
                    result,
                    &mut self.ledger,
                    &mut self.control,
                    &self.settings,
                    tunnel,
                    schedule_message,
                );
                false
            }
            (
                State::Final(round),
                ServiceMessage::Verdict {
                    ticket,
                    player,
                    result,
                },
            ) => {
                round.receive_verdict(ticket, player, result, &mut self.ledger, tunnel)
                    == final_round::Progress::Finished
            }
            (_, message) => {
                debug!(game = %self.id, ?message, "dropping collaborator result with no taker");
                false
            }
        };

        if final_finished {
            self.end_game(tunnel, services);
        }
    }

    /// Delivers an alarm previously scheduled through `schedule_message`
    pub fn receive_alarm<T: Tunnel, V: Services, S: FnMut(AlarmMessage, Duration)>(
        &mut self,
        alarm: &AlarmMessage,
        tunnel: &T,
        services: &mut V,
        schedule_message: &mut S,
    ) {
        let closed = match (&mut self.state, alarm) {
            (State::Clue(attempt), AlarmMessage::Timer(tick)) => {
                attempt.receive_tick(
                    tick,
                    &mut self.ledger,
                    &self.settings,
                    tunnel,
                    services,
                    schedule_message,
                );
                false
            }
            (State::Final(round), AlarmMessage::Timer(tick)) => {
                round.receive_tick(tick, tunnel, services, schedule_message);
                false
            }
            (State::Clue(attempt), AlarmMessage::Clue(alarm)) => {
                attempt.receive_alarm(alarm, &self.settings, tunnel, services, schedule_message)
                    == clue::Progress::Closed
            }
            _ => {
                debug!(game = %self.id, ?alarm, "dropping alarm with no taker");
                false
            }
        };

        if closed {
            self.finish_clue(tunnel, services);
        }
    }

    fn finish_clue<T: Tunnel, V: Services>(&mut self, tunnel: &T, services: &mut V) {
        self.state = State::Board;
        tunnel.send_message(&UpdateMessage::HideClue.into());

        let exhausted = self
            .board
            .round(self.round)
            .is_some_and(|board| board.is_exhausted(&self.used));
        if exhausted {
            self.advance_round(tunnel, services);
        }
    }

    fn advance_round<T: Tunnel, V: Services>(&mut self, tunnel: &T, services: &mut V) {
        match self.round {
            Round::Standard => {
                self.round = Round::Double;
                if let Some(trailing) = self.ledger.trailing() {
                    self.control = trailing;
                }
                info!(game = %self.id, player = %self.control, "double round started");
                self.announce_round(tunnel);
            }
            Round::Double => {
                self.round = Round::Final;
                match self.board.final_clue.clone() {
                    Some(clue) => {
                        self.attempts += 1;
                        tunnel.send_message(
                            &UpdateMessage::RoundBanner(self.round.banner().to_owned()).into(),
                        );
                        let mut round = FinalRound::new(self.attempts, clue);
                        round.begin(&self.ledger, tunnel);
                        self.state = State::Final(Box::new(round));
                    }
                    None => {
                        info!(game = %self.id, "no final clue, ending game");
                        self.end_game(tunnel, services);
                    }
                }
            }
            Round::Final => {}
        }
    }

    fn end_game<T: Tunnel, V: Services>(&mut self, tunnel: &T, services: &mut V) {
        let outcome = self.ledger.outcome();
        self.state = State::Done(outcome);
        info!(
            game = %self.id,
            ?outcome,
            one = self.ledger.score(Player::One),
            two = self.ledger.score(Player::Two),
            "game over"
        );

        tunnel.send_message(
            &UpdateMessage::GameOver {
                outcome,
                scores: self.ledger.scores(),
            }
            .into(),
        );
        services.persist_used_clues(self.used_clue_ids());
    }

    /// Builds a full snapshot of the game
    pub fn sync_message(&self) -> SyncMessage {
        SyncMessage {
            game: self.id,
            started: !matches!(self.state, State::Waiting),
            round: self.round,
            scores: self.ledger.scores(),
            control: self.control,
            board: self.board.round(self.round).map(|board| BoardView {
                categories: board.categories.clone(),
                used: board.used_grid(&self.used),
            }),
            clue: match &self.state {
                State::Clue(attempt) => Some(attempt.view()),
                _ => None,
            },
            final_round: match &self.state {
                State::Final(round) => Some(round.view()),
                _ => None,
            },
            outcome: self.outcome(),
        }
    }

    /// Sends a full snapshot through the tunnel
    pub fn sync<T: Tunnel>(&self, tunnel: &T) {
        tunnel.send_state(&self.sync_message());
    }

    /// Identifiers of the clues played, in order
    pub fn used_clue_ids(&self) -> Vec<ClueId> {
        self.used.as_slice().to_vec()
    }
}
