//! Clue lifecycle
//!
//! A [`ClueAttempt`] drives one selected clue from the moment it is picked
//! off the board until it closes. Standard clues open the buzzers to both
//! contestants; wager clues (daily doubles) first collect a wager from the
//! contestant in control, who then answers alone.
//!
//! Every wait the attempt performs (a capture, a judgment, a display delay)
//! is tagged with a [`Ticket`]. The ticket's step is bumped on each phase
//! change, so a callback that arrives after its phase was left is dropped.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use tracing::{debug, info, warn};

use crate::{
    arbiter::{Arbiter, BuzzerState},
    board::{Clue, Round},
    config::Settings,
    constants::wager::MIN_CLUE_WAGER,
    game::Error,
    ledger::ScoreLedger,
    player::Player,
    services::{self, JudgmentRequest, Services, Ticket, Verdict},
    session::Tunnel,
    timer::{self, Clock, Countdown, Tick},
};

/// Phase of a clue attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// A wager clue waits for the controller's wager
    AwaitingWager,
    /// The buzzers are open and the response timer runs
    BuzzersOpen,
    /// The contestant's spoken answer is being captured
    Answering(Player),
    /// Capture gave up on a wager clue; the contestant may press again
    CaptureFailed(Player),
    /// The captured answer waits for a verdict
    Judging {
        /// Contestant who answered
        player: Player,
        /// Transcribed answer
        answer: String,
    },
    /// A verdict was applied and the next step is scheduled
    Judged,
    /// The reference answer is shown and the clue is about to close
    Revealed,
}

/// Why the reference answer is revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealReason {
    /// Both contestants answered wrong
    BothMissed,
    /// The contestant answering a wager clue missed
    WagerMissed,
    /// The timer ran out with nobody holding the buzzer
    TimeUp,
    /// The clue was skipped
    Skipped,
}

/// Scheduled transitions of a clue attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Step {
    /// Capture the current contestant's answer again
    RetryCapture,
    /// Re-open the buzzers for the contestant who has not answered
    Reopen,
    /// Show the reference answer
    Reveal(RevealReason),
    /// Close the clue and return to the board
    Close,
}

/// Alarm messages of a clue attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmMessage {
    /// Move the attempt identified by `ticket` on to `to`
    Proceed {
        /// Ticket that was current when the alarm was scheduled
        ticket: Ticket,
        /// Transition to perform
        to: Step,
    },
}

/// Display updates emitted while a clue is played
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UpdateMessage {
    /// Show the clue text
    Clue {
        /// Category of the clue
        category: String,
        /// Board value of the clue
        value: u32,
        /// Clue text
        text: String,
        /// Whether the clue is a daily double
        daily_double: bool,
    },
    /// Ask the controller for a wager
    WagerPrompt {
        /// Contestant who must wager
        player: Player,
        /// Their current score
        score: i64,
        /// Largest acceptable wager
        max_wager: i64,
        /// Suggested smallest wager
        min_wager: u32,
    },
    /// A wager was larger than allowed
    WagerRejected {
        /// Contestant who wagered
        player: Player,
        /// Largest acceptable wager
        max_wager: i64,
    },
    /// Buzzer lock state changed
    Buzzer(BuzzerState),
    /// Free-form status line
    Status(String),
    /// The outcome of one answer
    AnswerResult {
        /// Contestant the result applies to
        player: Player,
        /// Whether the answer was accepted
        correct: bool,
        /// Message such as `Correct! +$400`
        message: String,
        /// Reason given by the oracle, if any
        explanation: Option<String>,
    },
    /// Show the reference answer
    Reveal {
        /// Reference correct response
        response: String,
        /// Why it is revealed
        reason: RevealReason,
    },
    /// Remaining time on the response timer
    Timer {
        /// Seconds left
        remaining: u32,
        /// Seconds the timer was started with
        total: u32,
    },
    /// The contestant's answer could not be heard and capture is retried
    CaptureRetry {
        /// Contestant being listened to
        player: Player,
        /// Number of failed captures so far
        failures: u32,
    },
    /// Capture gave up after all retries
    CaptureFailed(Player),
}

/// Snapshot of the clue being played, for late-joining displays
#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClueView {
    /// Category of the clue
    pub category: String,
    /// Board value of the clue
    pub value: u32,
    /// Clue text, hidden while a wager is pending
    pub text: Option<String>,
    /// Whether the clue is a daily double
    pub daily_double: bool,
    /// Accepted wager
    pub wager: Option<u32>,
    /// Buzzer lock state
    pub buzzer: BuzzerState,
    /// Current phase
    pub phase: Phase,
    /// Contestants who already answered
    pub answered: Vec<Player>,
    /// Seconds left on the response timer, while it runs
    pub remaining: Option<u32>,
}

/// What the game should do after delivering an event to an attempt
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The attempt is still in play
    Continue,
    /// The attempt is over; return to the board
    Closed,
}

/// Largest wager a contestant may place on a wager clue
///
/// Contestants may always bet up to the round's floor, even when their
/// score is lower or negative.
pub fn max_wager(score: i64, round: Round) -> i64 {
    score.max(round.wager_floor())
}

/// One play of a single clue
#[derive(Debug, Clone)]
pub struct ClueAttempt {
    id: u64,
    step: u32,
    round: Round,
    clue: Clue,
    controller: Player,
    phase: Phase,
    arbiter: Arbiter,
    answered: Vec<Player>,
    wager: Option<u32>,
    capture_failures: u32,
    timer: Countdown,
}

impl ClueAttempt {
    /// Creates an attempt for a freshly selected clue
    ///
    /// # Arguments
    ///
    /// * `id` - Identifier unique to this attempt within the game
    /// * `round` - Round the clue was selected in
    /// * `clue` - The selected clue
    /// * `controller` - Contestant in control of the board
    pub fn new(id: u64, round: Round, clue: Clue, controller: Player) -> Self {
        let phase = if clue.daily_double {
            Phase::AwaitingWager
        } else {
            Phase::BuzzersOpen
        };
        Self {
            id,
            step: 0,
            round,
            clue,
            controller,
            phase,
            arbiter: Arbiter::default(),
            answered: Vec::new(),
            wager: None,
            capture_failures: 0,
            timer: Countdown::new(Clock::Response, id),
        }
    }

    /// The clue being played
    pub fn clue(&self) -> &Clue {
        &self.clue
    }

    /// Current phase
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    /// Current buzzer lock state
    pub fn buzzer(&self) -> BuzzerState {
        self.arbiter.state()
    }

    /// Contestants who answered and may not buzz again
    pub fn answered(&self) -> &[Player] {
        &self.answered
    }

    /// Accepted wager, if any
    pub fn wager(&self) -> Option<u32> {
        self.wager
    }

    /// Ticket of the wait the attempt is currently in
    pub fn ticket(&self) -> Ticket {
        Ticket {
            attempt: self.id,
            step: self.step,
        }
    }

    /// Seconds left on the response timer, if it runs
    pub fn remaining(&self) -> Option<u32> {
        self.timer.is_running().then(|| self.timer.remaining())
    }

    /// Snapshot for displays
    pub fn view(&self) -> ClueView {
        ClueView {
            category: self.clue.category.clone(),
            value: self.clue.value,
            text: (self.phase != Phase::AwaitingWager).then(|| self.clue.text.clone()),
            daily_double: self.clue.daily_double,
            wager: self.wager,
            buzzer: self.arbiter.state(),
            phase: self.phase.clone(),
            answered: self.answered.clone(),
            remaining: self.remaining(),
        }
    }

    /// Amount won or lost on this clue
    fn stake(&self) -> u32 {
        self.wager.unwrap_or(self.clue.value)
    }

    fn advance(&mut self) {
        self.step += 1;
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        if ticket == self.ticket() {
            true
        } else {
            debug!(
                attempt = self.id,
                ?ticket,
                current = ?self.ticket(),
                "dropping stale clue callback"
            );
            false
        }
    }

    /// Presents the clue
    ///
    /// Standard clues open the buzzers and start the response timer. Wager
    /// clues prompt the controller for a wager and wait.
    ///
    /// # Type Parameters
    ///
    /// * `T` - Type implementing the Tunnel trait for display output
    /// * `S` - Function type for scheduling alarm messages
    pub fn begin<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        ledger: &ScoreLedger,
        settings: &Settings,
        tunnel: &T,
        schedule_message: &mut S,
    ) {
        info!(
            attempt = self.id,
            clue = %self.clue.id,
            round = ?self.round,
            player = %self.controller,
            daily_double = self.clue.daily_double,
            "clue selected"
        );

        if self.clue.daily_double {
            let score = ledger.score(self.controller);
            self.phase = Phase::AwaitingWager;
            tunnel.send_message(
                &UpdateMessage::WagerPrompt {
                    player: self.controller,
                    score,
                    max_wager: max_wager(score, self.round),
                    min_wager: MIN_CLUE_WAGER,
                }
                .into(),
            );
        } else {
            self.show_clue(tunnel);
            self.open_buzzers("Press your buzzer!", settings, tunnel, schedule_message);
        }
    }

    fn show_clue<T: Tunnel>(&self, tunnel: &T) {
        tunnel.send_message(
            &UpdateMessage::Clue {
                category: self.clue.category.clone(),
                value: self.clue.value,
                text: self.clue.text.clone(),
                daily_double: self.clue.daily_double,
            }
            .into(),
        );
    }

    fn open_buzzers<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        status: &str,
        settings: &Settings,
        tunnel: &T,
        schedule_message: &mut S,
    ) {
        self.arbiter.close();
        self.arbiter.open();
        self.phase = Phase::BuzzersOpen;
        self.advance();

        tunnel.send_message(&UpdateMessage::Buzzer(self.arbiter.state()).into());
        tunnel.send_message(&UpdateMessage::Status(status.to_owned()).into());
        self.start_timer(settings, tunnel, schedule_message);
    }

    fn start_timer<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        settings: &Settings,
        tunnel: &T,
        schedule_message: &mut S,
    ) {
        self.timer
            .start(settings.response_seconds, schedule_message);
        tunnel.send_message(
            &UpdateMessage::Timer {
                remaining: self.timer.remaining(),
                total: self.timer.total(),
            }
            .into(),
        );
    }

    /// Accepts the controller's wager on a wager clue
    ///
    /// On success the clue is shown, the controller is locked in and their
    /// answer is captured while the response timer runs.
    ///
    /// # Errors
    ///
    /// [`Error::UnexpectedInput`] unless a wager is awaited, and
    /// [`Error::WagerTooLarge`] if `amount` exceeds [`max_wager`]. A rejected
    /// wager leaves the attempt waiting for another one.
    pub fn submit_wager<T: Tunnel, V: Services, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        amount: u32,
        ledger: &ScoreLedger,
        settings: &Settings,
        tunnel: &T,
        services: &mut V,
        schedule_message: &mut S,
    ) -> Result<(), Error> {
        if self.phase != Phase::AwaitingWager {
            return Err(Error::UnexpectedInput);
        }

        let max = max_wager(ledger.score(self.controller), self.round);
        if i64::from(amount) > max {
            tunnel.send_message(
                &UpdateMessage::WagerRejected {
                    player: self.controller,
                    max_wager: max,
                }
                .into(),
            );
            return Err(Error::WagerTooLarge {
                player: self.controller,
                wager: amount,
                max,
            });
        }

        self.wager = Some(amount);
        info!(
            attempt = self.id,
            player = %self.controller,
            wager = amount,
            "wager accepted"
        );

        self.show_clue(tunnel);
        self.arbiter.lock(self.controller);
        tunnel.send_message(&UpdateMessage::Buzzer(self.arbiter.state()).into());
        tunnel.send_message(
            &UpdateMessage::Status(format!("{}, speak your answer...", self.controller)).into(),
        );
        self.start_timer(settings, tunnel, schedule_message);
        self.begin_capture(self.controller, services);
        Ok(())
    }

    /// Registers a buzzer press
    ///
    /// While the buzzers are open the first contestant who has not answered
    /// yet wins the lock; on standard clues the response timer stops. After
    /// capture gave up on a wager clue, a press by the controller restarts
    /// capture.
    ///
    /// # Errors
    ///
    /// [`Error::BuzzIgnored`] when the press has no effect.
    pub fn buzz<T: Tunnel, V: Services>(
        &mut self,
        player: Player,
        tunnel: &T,
        services: &mut V,
    ) -> Result<(), Error> {
        match self.phase {
            Phase::BuzzersOpen => {
                if !self.arbiter.press(player, &self.answered) {
                    debug!(attempt = self.id, player = %player, "buzz ignored");
                    return Err(Error::BuzzIgnored(player));
                }
                self.timer.stop();
                info!(attempt = self.id, player = %player, "buzzer locked");
            }
            Phase::CaptureFailed(holder) if holder == player => {
                info!(attempt = self.id, player = %player, "capture restarted");
            }
            _ => {
                debug!(attempt = self.id, player = %player, "buzz ignored");
                return Err(Error::BuzzIgnored(player));
            }
        }

        tunnel.send_message(&UpdateMessage::Buzzer(self.arbiter.state()).into());
        tunnel.send_message(&UpdateMessage::Status(format!("{player}, speak your answer...")).into());
        self.begin_capture(player, services);
        Ok(())
    }

    fn begin_capture<V: Services>(&mut self, player: Player, services: &mut V) {
        self.capture_failures = 0;
        self.listen(player, services);
    }

    fn listen<V: Services>(&mut self, player: Player, services: &mut V) {
        self.phase = Phase::Answering(player);
        self.advance();
        services.start_capture(self.ticket(), player);
    }

    /// Receives a transcript of the locked contestant's answer
    ///
    /// Stops the response timer and asks the oracle for a verdict. Stale
    /// transcripts are dropped.
    pub fn receive_transcript<T: Tunnel, V: Services>(
        &mut self,
        ticket: Ticket,
        player: Player,
        text: String,
        tunnel: &T,
        services: &mut V,
    ) {
        if !self.is_current(ticket) || self.phase != Phase::Answering(player) {
            return;
        }

        self.timer.stop();
        info!(attempt = self.id, player = %player, answer = %text, "answer captured");
        tunnel.send_message(&UpdateMessage::Status(format!("Validating: \"{text}\"...")).into());

        self.phase = Phase::Judging {
            player,
            answer: text.clone(),
        };
        self.advance();
        services.request_judgment(JudgmentRequest {
            ticket: self.ticket(),
            player,
            clue: self.clue.text.clone(),
            reference: self.clue.response.clone(),
            candidate: text,
        });
    }

    /// Receives a capture failure
    ///
    /// Capture is retried with a doubling delay. When the attempts are used
    /// up, a standard clue re-opens the buzzers and a wager clue waits for
    /// the controller to press again.
    pub fn receive_capture_failure<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        ticket: Ticket,
        player: Player,
        error: &services::Error,
        settings: &Settings,
        tunnel: &T,
        schedule_message: &mut S,
    ) {
        if !self.is_current(ticket) || self.phase != Phase::Answering(player) {
            return;
        }

        self.capture_failures += 1;
        self.advance();

        if self.capture_failures < settings.max_capture_attempts {
            warn!(
                attempt = self.id,
                player = %player,
                failures = self.capture_failures,
                %error,
                "capture failed, retrying"
            );
            tunnel.send_message(
                &UpdateMessage::CaptureRetry {
                    player,
                    failures: self.capture_failures,
                }
                .into(),
            );
            schedule_message(
                AlarmMessage::Proceed {
                    ticket: self.ticket(),
                    to: Step::RetryCapture,
                }
                .into(),
                settings.capture_backoff(self.capture_failures),
            );
            return;
        }

        warn!(
            attempt = self.id,
            player = %player,
            failures = self.capture_failures,
            %error,
            "capture gave up"
        );
        tunnel.send_message(&UpdateMessage::CaptureFailed(player).into());

        if self.wager.is_some() {
            self.phase = Phase::CaptureFailed(player);
            tunnel.send_message(
                &UpdateMessage::Status(format!("{player}, press your buzzer to answer again"))
                    .into(),
            );
        } else {
            self.timer.stop();
            self.open_buzzers(
                &format!("Couldn't hear {player}. Buzz in again!"),
                settings,
                tunnel,
                schedule_message,
            );
        }
    }

    /// Applies the oracle's verdict on the answer being judged
    ///
    /// An oracle failure falls back to [`services::fallback_verdict`].
    pub fn receive_verdict<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        ticket: Ticket,
        player: Player,
        result: Result<Verdict, String>,
        ledger: &mut ScoreLedger,
        control: &mut Player,
        settings: &Settings,
        tunnel: &T,
        schedule_message: &mut S,
    ) {
        if !self.is_current(ticket) {
            return;
        }
        let Phase::Judging {
            player: holder,
            answer,
        } = &self.phase
        else {
            return;
        };
        if *holder != player {
            return;
        }

        let verdict = result.unwrap_or_else(|error| {
            warn!(attempt = self.id, player = %player, %error, "oracle unavailable");
            services::fallback_verdict(&self.clue.response, answer)
        });

        if verdict.correct {
            self.award(player, verdict.explanation, ledger, control, settings, tunnel, schedule_message);
        } else {
            self.charge_miss(
                player,
                "Incorrect.",
                Some(verdict.explanation),
                ledger,
                settings,
                tunnel,
                schedule_message,
            );
        }
    }

    fn award<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        player: Player,
        explanation: String,
        ledger: &mut ScoreLedger,
        control: &mut Player,
        settings: &Settings,
        tunnel: &T,
        schedule_message: &mut S,
    ) {
        let stake = self.stake();
        let score = ledger.award(player, stake);
        *control = player;
        info!(attempt = self.id, player = %player, stake, score, "answer correct");

        self.timer.stop();
        self.arbiter.close();
        tunnel.send_message(&UpdateMessage::Buzzer(self.arbiter.state()).into());
        tunnel.send_message(
            &UpdateMessage::AnswerResult {
                player,
                correct: true,
                message: format!("Correct! +${stake}"),
                explanation: Some(explanation),
            }
            .into(),
        );
        tunnel.send_message(&crate::game::UpdateMessage::Scores(ledger.scores()).into());
        tunnel.send_message(&crate::game::UpdateMessage::Control(player).into());

        self.phase = Phase::Judged;
        self.advance();
        schedule_message(
            AlarmMessage::Proceed {
                ticket: self.ticket(),
                to: Step::Close,
            }
            .into(),
            settings.result_delay,
        );
    }

    fn charge_miss<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        player: Player,
        prefix: &str,
        explanation: Option<String>,
        ledger: &mut ScoreLedger,
        settings: &Settings,
        tunnel: &T,
        schedule_message: &mut S,
    ) {
        let stake = self.stake();
        let score = ledger.deduct(player, stake);
        info!(attempt = self.id, player = %player, stake, score, "answer missed");

        self.answered.push(player);
        self.timer.stop();
        self.arbiter.close();
        tunnel.send_message(&UpdateMessage::Buzzer(self.arbiter.state()).into());
        tunnel.send_message(
            &UpdateMessage::AnswerResult {
                player,
                correct: false,
                message: format!("{prefix} -${stake}"),
                explanation,
            }
            .into(),
        );
        tunnel.send_message(&crate::game::UpdateMessage::Scores(ledger.scores()).into());

        self.phase = Phase::Judged;
        self.advance();
        let to = if self.wager.is_some() {
            Step::Reveal(RevealReason::WagerMissed)
        } else if self.answered.len() >= Player::COUNT {
            Step::Reveal(RevealReason::BothMissed)
        } else {
            Step::Reopen
        };
        schedule_message(
            AlarmMessage::Proceed {
                ticket: self.ticket(),
                to,
            }
            .into(),
            settings.result_delay,
        );
    }

    fn reveal<T: Tunnel, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        reason: RevealReason,
        settings: &Settings,
        tunnel: &T,
        schedule_message: &mut S,
    ) {
        self.timer.stop();
        self.arbiter.close();
        info!(attempt = self.id, ?reason, "revealing response");
        tunnel.send_message(&UpdateMessage::Buzzer(self.arbiter.state()).into());
        tunnel.send_message(
            &UpdateMessage::Reveal {
                response: self.clue.response.clone(),
                reason,
            }
            .into(),
        );

        self.phase = Phase::Revealed;
        self.advance();
        schedule_message(
            AlarmMessage::Proceed {
                ticket: self.ticket(),
                to: Step::Close,
            }
            .into(),
            settings.reveal_delay,
        );
    }

    /// Delivers a response timer tick
    ///
    /// On expiry with the buzzers open the answer is revealed. When a
    /// contestant holds the lock (possible on wager clues), expiry counts as
    /// a wrong answer.
    pub fn receive_tick<T: Tunnel, V: Services, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        alarm: &timer::AlarmMessage,
        ledger: &mut ScoreLedger,
        settings: &Settings,
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
                self.expire(ledger, settings, tunnel, services, schedule_message);
            }
        }
    }

    fn expire<T: Tunnel, V: Services, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        ledger: &mut ScoreLedger,
        settings: &Settings,
        tunnel: &T,
        services: &mut V,
        schedule_message: &mut S,
    ) {
        match self.phase {
            Phase::BuzzersOpen => {
                info!(attempt = self.id, "time expired with buzzers open");
                self.reveal(RevealReason::TimeUp, settings, tunnel, schedule_message);
            }
            Phase::Answering(player) | Phase::CaptureFailed(player) => {
                info!(attempt = self.id, player = %player, "time expired while answering");
                services.stop_capture();
                self.charge_miss(
                    player,
                    "Time's up!",
                    None,
                    ledger,
                    settings,
                    tunnel,
                    schedule_message,
                );
            }
            _ => {}
        }
    }

    /// Delivers a scheduled transition
    ///
    /// # Returns
    ///
    /// [`Progress::Closed`] once the attempt is finished
    pub fn receive_alarm<T: Tunnel, V: Services, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        alarm: &AlarmMessage,
        settings: &Settings,
        tunnel: &T,
        services: &mut V,
        schedule_message: &mut S,
    ) -> Progress {
        let AlarmMessage::Proceed { ticket, to } = *alarm;
        if !self.is_current(ticket) {
            return Progress::Continue;
        }

        match to {
            Step::RetryCapture => {
                if let Phase::Answering(player) = self.phase {
                    debug!(attempt = self.id, player = %player, "retrying capture");
                    self.listen(player, services);
                }
            }
            Step::Reopen => {
                self.open_buzzers("Other player can buzz in!", settings, tunnel, schedule_message);
            }
            Step::Reveal(reason) => self.reveal(reason, settings, tunnel, schedule_message),
            Step::Close => {
                self.timer.stop();
                self.arbiter.close();
                services.stop_capture();
                info!(attempt = self.id, clue = %self.clue.id, "clue closed");
                return Progress::Closed;
            }
        }

        Progress::Continue
    }

    /// Abandons the clue from any phase and reveals the reference answer
    ///
    /// No score changes. Every callback of earlier phases becomes stale.
    pub fn skip<T: Tunnel, V: Services, S: FnMut(crate::AlarmMessage, Duration)>(
        &mut self,
        settings: &Settings,
        tunnel: &T,
        services: &mut V,
        schedule_message: &mut S,
    ) {
        info!(attempt = self.id, clue = %self.clue.id, "clue skipped");
        services.stop_capture();
        self.reveal(RevealReason::Skipped, settings, tunnel, schedule_message);
    }
}
