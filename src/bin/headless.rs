//! Headless game driver
//!
//! Plays a complete game between two scripted bots through the tokio
//! runtime. The bots pick clues in board order, buzz as soon as the buzzers
//! open, and "speak" the right response with a configurable probability.

use std::{
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use clap::Parser;
use garde::Validate;
use clueboard::{
    UpdateMessage,
    arbiter::BuzzerState,
    board::{Board, BoardRound, Clue, ClueId, FinalClue, Round},
    clue,
    config::Settings,
    constants::{
        board::{CATEGORY_COUNT, VALUES_PER_CATEGORY},
        timing::DEFAULT_RESPONSE_SECONDS,
    },
    final_round,
    game::{self, Game, InputMessage},
    player::Player,
    runtime::{self, Collaborators, FallbackOracle, GameHandle, MemoryStore, Transcriber},
    services,
    session::Tunnel,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use web_time::Instant;

#[derive(Parser, Debug)]
#[command(name = "headless")]
#[command(about = "Plays a full game between two scripted bots")]
struct Args {
    /// JSON board to play; a synthetic board is generated when omitted
    #[arg(long)]
    board: Option<PathBuf>,

    /// Probability that a bot answers correctly
    #[arg(long, default_value_t = 0.6)]
    accuracy: f64,

    /// Seconds to buzz in on each clue
    #[arg(long, default_value_t = DEFAULT_RESPONSE_SECONDS)]
    response_seconds: u32,

    /// Skip every display pause
    #[arg(long)]
    fast: bool,

    /// Seed for deterministic bots and boards
    #[arg(long, env = "CLUEBOARD_SEED")]
    seed: Option<u64>,
}

/// Forwards display commands to the driver loop
struct BotTunnel {
    updates: mpsc::UnboundedSender<UpdateMessage>,
}

impl Tunnel for BotTunnel {
    fn send_message(&self, message: &UpdateMessage) {
        debug!(message = %message.to_message(), "display");
        let _ = self.updates.send(message.clone());
    }

    fn send_state(&self, state: &clueboard::SyncMessage) {
        debug!(state = %state.to_message(), "snapshot");
    }
}

/// Speaks the expected response with probability `accuracy`
struct BotVoice {
    expected: Arc<Mutex<String>>,
    accuracy: f64,
    rng: Mutex<fastrand::Rng>,
    delay: Duration,
}

#[async_trait]
impl Transcriber for BotVoice {
    async fn capture(&self, player: Player) -> Result<String, services::Error> {
        tokio::time::sleep(self.delay).await;
        let knows = self
            .rng
            .lock()
            .map(|mut rng| rng.f64() < self.accuracy)
            .unwrap_or(false);
        let text = if knows {
            self.expected
                .lock()
                .map(|expected| expected.clone())
                .unwrap_or_default()
        } else {
            "I'm not sure".to_owned()
        };
        debug!(player = %player, answer = %text, "bot answered");
        Ok(text)
    }
}

struct Driver {
    board: Board,
    handle: GameHandle,
    expected: Arc<Mutex<String>>,
    rng: fastrand::Rng,
    accuracy: f64,
    fast: bool,
}

impl Driver {
    async fn pause(&mut self) {
        if !self.fast {
            tokio::time::sleep(Duration::from_millis(self.rng.u64(100..600))).await;
        }
    }

    async fn pick_clue(&mut self) -> Result<(), runtime::Error> {
        let state = self.handle.snapshot().await?;
        if state.clue.is_some() || state.final_round.is_some() || state.outcome.is_some() {
            return Ok(());
        }
        let (Some(view), Some(board)) = (state.board, self.board.round(state.round)) else {
            return Ok(());
        };

        let Some((category, value)) = (0..CATEGORY_COUNT)
            .flat_map(|category| (0..VALUES_PER_CATEGORY).map(move |value| (category, value)))
            .find(|&(category, value)| !view.used[category][value])
        else {
            return Ok(());
        };

        if let (Some(clue), Ok(mut expected)) = (board.clue(category, value), self.expected.lock()) {
            expected.clone_from(&clue.response);
        }

        self.pause().await;
        match self
            .handle
            .send(InputMessage::SelectClue {
                category,
                value,
                round: state.round,
            })
            .await
        {
            Err(runtime::Error::Rejected(error)) => {
                debug!(%error, "selection refused");
                Ok(())
            }
            other => other,
        }
    }

    async fn buzz(&mut self) -> Result<(), runtime::Error> {
        let Some(clue) = self.handle.snapshot().await?.clue else {
            return Ok(());
        };
        let eligible: Vec<Player> = Player::ALL
            .into_iter()
            .filter(|player| !clue.answered.contains(player))
            .collect();
        let Some(&player) = eligible.get(self.rng.usize(..eligible.len().max(1))) else {
            return Ok(());
        };

        self.pause().await;
        match self.handle.send(InputMessage::Buzz(player)).await {
            Err(runtime::Error::Rejected(error)) => {
                debug!(%error, "buzz refused");
                Ok(())
            }
            other => other,
        }
    }

    fn final_answer(&mut self) -> String {
        match &self.board.final_clue {
            Some(clue) if self.rng.f64() < self.accuracy => clue.response.clone(),
            _ => "no idea".to_owned(),
        }
    }

    async fn handle_update(&mut self, update: UpdateMessage) -> Result<bool, runtime::Error> {
        match update {
            UpdateMessage::Game(game::UpdateMessage::Board { .. } | game::UpdateMessage::HideClue) => {
                self.pick_clue().await?;
            }
            UpdateMessage::Clue(clue::UpdateMessage::Buzzer(BuzzerState::Open)) => {
                self.buzz().await?;
            }
            UpdateMessage::Clue(clue::UpdateMessage::WagerPrompt {
                player, max_wager, ..
            }) => {
                let wager = u32::try_from(max_wager).unwrap_or(u32::MAX);
                info!(player = %player, wager, "bot wagers everything");
                self.pause().await;
                self.handle.send(InputMessage::SubmitWager(wager)).await?;
            }
            UpdateMessage::Final(final_round::UpdateMessage::WagerPrompt { scores, .. }) => {
                let half = |player: Player| u32::try_from(scores[player].max(0) / 2).unwrap_or(0);
                self.handle
                    .send(InputMessage::SubmitFinalWagers {
                        one: half(Player::One),
                        two: half(Player::Two),
                    })
                    .await?;
            }
            UpdateMessage::Final(final_round::UpdateMessage::Question { .. }) => {
                let one = self.final_answer();
                let two = self.final_answer();
                self.pause().await;
                self.handle
                    .send(InputMessage::SubmitFinalAnswers { one, two })
                    .await?;
            }
            UpdateMessage::Game(game::UpdateMessage::GameOver { outcome, scores }) => {
                info!(
                    ?outcome,
                    one = scores[Player::One],
                    two = scores[Player::Two],
                    "final scoreline"
                );
                return Ok(true);
            }
            _ => {}
        }
        Ok(false)
    }
}

fn synthetic_round(rng: &mut fastrand::Rng, round: Round, step: u32, daily_doubles: usize) -> BoardRound {
    let prefix = match round {
        Round::Standard => "standard",
        Round::Double => "double",
        Round::Final => "final",
    };

    let mut doubles = Vec::new();
    while doubles.len() < daily_doubles {
        let spot = (rng.usize(..CATEGORY_COUNT), rng.usize(1..VALUES_PER_CATEGORY));
        if !doubles.contains(&spot) {
            doubles.push(spot);
        }
    }

    let clues = (0..CATEGORY_COUNT)
        .flat_map(|category| (0..VALUES_PER_CATEGORY).map(move |value| (category, value)))
        .map(|(category, value)| {
            let value_amount = step * (u32::try_from(value).unwrap_or(0) + 1);
            Clue {
                id: ClueId::from(format!("{prefix}-{category}-{value}")),
                category: format!("Topic {}", category + 1),
                value: value_amount,
                text: format!("The ${value_amount} clue of topic {}", category + 1),
                response: format!("answer {prefix} {category} {value}"),
                daily_double: doubles.contains(&(category, value)),
            }
        })
        .collect();

    BoardRound {
        categories: (1..=CATEGORY_COUNT).map(|n| format!("Topic {n}")).collect(),
        clues,
    }
}

fn synthetic_board(rng: &mut fastrand::Rng) -> Board {
    Board {
        standard: synthetic_round(rng, Round::Standard, 200, 1),
        double: synthetic_round(rng, Round::Double, 400, 2),
        final_clue: Some(FinalClue {
            category: "Closing Topic".to_owned(),
            text: "The last clue of the game".to_owned(),
            response: "the final answer".to_owned(),
        }),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if !(0.0..=1.0).contains(&args.accuracy) {
        return Err(format!("accuracy {} is outside [0, 1]", args.accuracy).into());
    }

    let mut rng = args.seed.map_or_else(fastrand::Rng::new, fastrand::Rng::with_seed);
    let board = match &args.board {
        Some(path) => Board::from_json(&std::fs::read_to_string(path)?)?,
        None => synthetic_board(&mut rng),
    };

    let mut settings = Settings {
        response_seconds: args.response_seconds,
        ..Settings::default()
    };
    if args.fast {
        settings.result_delay = Duration::ZERO;
        settings.reveal_delay = Duration::ZERO;
        settings.capture_retry_delay = Duration::ZERO;
    }
    settings.validate()?;

    let expected = Arc::new(Mutex::new(String::new()));
    let voice = BotVoice {
        expected: Arc::clone(&expected),
        accuracy: args.accuracy,
        rng: Mutex::new(rng.fork()),
        delay: if args.fast {
            Duration::ZERO
        } else {
            Duration::from_millis(800)
        },
    };

    let (updates, mut receiver) = mpsc::unbounded_channel();
    let handle = runtime::spawn(
        Game::new(board.clone(), settings),
        BotTunnel { updates },
        Collaborators {
            transcriber: Arc::new(voice),
            oracle: Arc::new(FallbackOracle),
            store: Arc::new(MemoryStore::default()),
        },
    );

    let started = Instant::now();
    handle.play()?;

    let mut driver = Driver {
        board,
        handle: handle.clone(),
        expected,
        rng,
        accuracy: args.accuracy,
        fast: args.fast,
    };
    while let Some(update) = receiver.recv().await {
        if driver.handle_update(update).await? {
            break;
        }
    }

    let game = handle.shutdown().await?;
    if game.outcome().is_none() {
        warn!("display channel closed before the game ended");
    }
    info!(
        clues = game.used().len(),
        elapsed_ms = started.elapsed().as_millis(),
        "game finished"
    );
    Ok(())
}
