//! Final round
//!
//! Both contestants wager simultaneously on a single clue, type their
//! answers against a longer timer, and are judged concurrently. Scores are
//! applied only once both verdicts are in.

use std::time::Duration;

use enum_map::EnumMap;
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tracing::{debug, info, warn};

use crate::{
    board::FinalClue,
    config::Settings,
    game::Error,
    ledger::ScoreLedger,
    player::Player,
    services::{self, JudgmentRequest, Services, Ticket, Verdict},
    session::Tunnel,
    timer::{self, Clock, Countdown, Tick},
};

/// Phase of the final round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Waiting for both wagers
    #[default]
    Wagering,
    /// The clue is shown and answers are typed
    Answering,
    /// Both answers are locked and wait for verdicts
    Judging,
    /// Results were applied
    Finished,
}

/// Per-contestant outcome of the final round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalEntry {
    /// Answer as submitted
    pub answer: String,
    /// Wager placed
    pub wager: u32,
    /// Whether the answer was accepted
    pub correct: bool,
    /// Reason given by the oracle
    pub explanation: String,
    /// Total after the wager was applied
    pub score: i64,
}

/// Display updates emitted during the final round
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UpdateMessage {
    /// Announce the category and ask both contestants for wagers
    WagerPrompt {
        /// Category of the final clue
        category: String,
        /// Current totals
        scores: EnumMap<Player, i64>,
        /// Largest acceptable wager per contestant
        max_wagers: EnumMap<Player, i64>,
    },
    /// Show the final clue and start the answer timer
    Question {
        /// Category of the final clue
        category: String,
        /// Clue text
        text: String,
        /// Seconds available to answer
        seconds: u32,
    },
    /// Remaining time on the final timer
    Timer {
        /// Seconds left
        remaining: u32,
        /// Seconds the timer was started with
        total: u32,
    },
    /// Both answers are locked and are being judged
    Judging,
    /// Final results for both contestants
    Results {
        /// Reference correct response
        response: String,
        /// Outcome per contestant
        entries: EnumMap<Player, FinalEntry>,
    },
}

/// Snapshot of the final round, for late-joining displays
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalView {
    /// Category of the final clue
    pub category: String,
    /// Clue text, once wagers are in
    pub text: Option<String>,
    /// Current phase
    pub phase: Phase,
    /// Seconds left on the final timer, while it runs
    pub remaining: Option<u32>,
}

/// Whether the final round finished after an event
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Still in play
    Continue,
    /// Results were applied
    Finished,
}

/// The final round of a game
#[derive(Debug, Clone)]
pub struct FinalRound {
    id: u64,
    clue: FinalClue,
    phase: Phase,
    wagers: EnumMap<Player, u32>,
    drafts: EnumMap<Player, String>,
    answers: EnumMap<Player, String>,
    verdicts: EnumMap<Player, Option<Verdict>>,
    timer: Countdown,
}

impl FinalRound {
    /// Creates the final round for `clue`
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier unique within the game, echoed in judgment tickets
    /// * `clue` - The final clue
    pub fn new(id: u64, clue: FinalClue) -> Self {
        Self {
            id,
            clue,
            phase: Phase::Wagering,
            wagers: EnumMap::default(),
            drafts: EnumMap::default(),
            answers: EnumMap::default(),
            verdicts: EnumMap::default(),
            timer: Countdown::new(Clock::Final, id),
        }
    }

    /// Current phase
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Placed wagers; zero until both are in
    pub fn wagers(&self) -> EnumMap<Player, u32> {
        self.wagers
    }

    /// Ticket judgment requests are issued under
    pub fn ticket(&self) -> Ticket {
        Ticket {
            attempt: self.id,
            step: 0,
        }
    }

    /// Snapshot for displays
    pub fn view(&self) -> FinalView {
        FinalView {
            category: self.clue.category.clone(),
            text: (self.phase != Phase::Wagering).then(|| self.clue.text.clone()),
            phase: self.phase,
            remaining: self.timer.is_running().then(|| self.timer.remaining()),
        }
    }

    /// Announces the category and asks for wagers
    pub fn begin<T: Tunnel>(&mut self, ledger: &ScoreLedger, tunnel: &T) {
        info!(attempt = self.id, category = %self.clue.category, "final round started");
        let scores = ledger.scores();
        tunnel.send_message(
            &UpdateMessage::WagerPrompt {
                category: self.clue.category.clone(),
                scores,
                max_wagers: scores.map(|_, score| score.max(0)),
            }
            .into(),
        );
    }

    /// Accepts both wagers at once
    ///
    /// Each wager must lie between zero and the contestant's score, or zero
    /// for a contestant without a positive score. Once accepted, wagers are
    /// fixed and the clue is shown with the final timer running.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedInput`] unless wagers are awaited, and
    /// [`Error::WagerTooLarge`] for the first wager out of range, in which
    /// case neither wager is kept.
    pub fn submit_wagers<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        wagers: EnumMap<Player, u32>,
        ledger: &ScoreLedger,
        settings: &Settings,
        tunnel: &T,
        schedule_message: &mut S,
    ) -> Result<(), Error> {
        if self.phase != Phase::Wagering {
            return Err(Error::UnexpectedInput);
        }

        for (player, &wager) in &wagers {
            let max = ledger.score(player).max(0);
            if i64::from(wager) > max {
                return Err(Error::WagerTooLarge { player, wager, max });
            }
        }

        self.wagers = wagers;
        self.phase = Phase::Answering;
        info!(
            attempt = self.id,
            one = wagers[Player::One],
            two = wagers[Player::Two],
            "final wagers locked"
        );

        tunnel.send_message(
            &UpdateMessage::Question {
                category: self.clue.category.clone(),
                text: self.clue.text.clone(),
                seconds: settings.final_answer_seconds,
            }
            .into(),
        );
        self.timer
            .start(settings.final_answer_seconds, schedule_message);
        tunnel.send_message(
            &UpdateMessage::Timer {
                remaining: self.timer.remaining(),
                total: self.timer.total(),
            }
            .into(),
        );
        Ok(())
    }

    /// Records a contestant's in-progress answer
    ///
    /// Drafts are what gets submitted if the timer runs out.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedInput`] unless answers are being typed.
    pub fn update_draft(&mut self, player: Player, text: String) -> Result<(), Error> {
        if self.phase != Phase::Answering {
            return Err(Error::UnexpectedInput);
        }
        self.drafts[player] = text;
        Ok(())
    }

    /// Submits both answers before the timer runs out
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedInput`] unless answers are being typed.
    pub fn submit_answers<T: Tunnel, V: Services>(
        &mut self,
        answers: EnumMap<Player, String>,
        tunnel: &T,
        services: &mut V,
    ) -> Result<(), Error> {
        if self.phase != Phase::Answering {
            return Err(Error::UnexpectedInput);
        }
        self.lock_answers(answers, tunnel, services);
        Ok(())
    }

    fn lock_answers<T: Tunnel, V: Services>(
        &mut self,
        answers: EnumMap<Player, String>,
        tunnel: &T,
        services: &mut V,
    ) {
        self.timer.stop();
        self.answers = answers.map(|_, answer| answer.trim().to_owned());
        self.phase = Phase::Judging;
        info!(attempt = self.id, "final answers locked");
        tunnel.send_message(&UpdateMessage::Judging.into());

        for player in Player::ALL {
            services.request_judgment(JudgmentRequest {
                ticket: self.ticket(),
                player,
                clue: self.clue.text.clone(),
                reference: self.clue.response.clone(),
                candidate: self.answers[player].clone(),
            });
        }
    }

    /// Delivers a final timer tick; on expiry the drafts are submitted
    pub fn receive_tick<T: Tunnel, V: Services, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        alarm: &timer::AlarmMessage,
        tunnel: &T,
        services: &mut V,
        schedule_message: &mut S,
    ) {
        match self.timer.receive_tick(alarm, schedule_message) {
            Tick::Stale => debug!(attempt = self.id, ?alarm, "stale timer tick ignored"),
            Tick::Remaining(remaining) => tunnel.send_message(
                &UpdateMessage::Timer {
                    remaining,
                    total: self.timer.total(),
                }
                .into(),
            ),
            Tick::Expired => {
                tunnel.send_message(
                    &UpdateMessage::Timer {
                        remaining: 0,
                        total: self.timer.total(),
                    }
                    .into(),
                );
                if self.phase == Phase::Answering {
                    info!(attempt = self.id, "final timer expired, submitting drafts");
                    let drafts = std::mem::take(&mut self.drafts);
                    self.lock_answers(drafts, tunnel, services);
                }
            }
        }
    }

    /// Records one verdict; once both are in, scores are applied
    ///
    /// # Returns
    ///
    /// [`Progress::Finished`] when the results were announced
    pub fn receive_verdict<T: Tunnel>(
        &mut self,
        ticket: Ticket,
        player: Player,
        result: Result<Verdict, String>,
        ledger: &mut ScoreLedger,
        tunnel: &T,
    ) -> Progress {
        if ticket != self.ticket() || self.phase != Phase::Judging || self.verdicts[player].is_some()
        {
            debug!(attempt = self.id, ?ticket, player = %player, "dropping stale final verdict");
            return Progress::Continue;
        }

        let verdict = result.unwrap_or_else(|error| {
            warn!(attempt = self.id, player = %player, %error, "oracle unavailable");
            services::fallback_verdict(&self.clue.response, &self.answers[player])
        });
        self.verdicts[player] = Some(verdict);

        if self.verdicts.values().any(Option::is_none) {
            return Progress::Continue;
        }

        let entries = EnumMap::from_fn(|player: Player| {
            let verdict = self.verdicts[player].clone().unwrap_or_else(|| Verdict {
                correct: false,
                explanation: String::new(),
            });
            let wager = self.wagers[player];
            let score = if verdict.correct {
                ledger.award(player, wager)
            } else {
                ledger.deduct(player, wager)
            };
            info!(
                attempt = self.id,
                player = %player,
                correct = verdict.correct,
                wager,
                score,
                "final answer judged"
            );
            FinalEntry {
                answer: self.answers[player].clone(),
                wager,
                correct: verdict.correct,
                explanation: verdict.explanation,
                score,
            }
        });

        self.phase = Phase::Finished;
        tunnel.send_message(
            &UpdateMessage::Results {
                response: self.clue.response.clone(),
                entries,
            }
            .into(),
        );
        tunnel.send_message(&crate::game::UpdateMessage::Scores(ledger.scores()).into());
        Progress::Finished
    }
}
