//! Tokio runtime for a game
//!
//! [`spawn`] moves a [`Game`] into a task that owns it and applies commands
//! one at a time, so every mutation of the game is serialized. Collaborator
//! requests made by the game run as separate tasks and post their results
//! back to the same queue; scheduled alarms become sleeping tasks that do
//! the same.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    AlarmMessage, SyncMessage,
    board::ClueId,
    game::{self, Game, InputMessage, ServiceMessage},
    player::Player,
    services::{self, JudgmentRequest, Services, Ticket, Verdict},
    session::Tunnel,
};

/// Captures a contestant's spoken answer
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Listens to `player` and returns what they said
    async fn capture(&self, player: Player) -> Result<String, services::Error>;
}

/// Judges whether a candidate answer matches the reference response
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Returns a verdict on `candidate`
    async fn judge(
        &self,
        clue: &str,
        reference: &str,
        candidate: &str,
    ) -> Result<Verdict, services::Error>;
}

/// Remembers which clues were played so later boards can avoid them
#[async_trait]
pub trait ClueStore: Send + Sync {
    /// Saves the identifiers of the clues played in a game
    async fn persist_used_clues(&self, ids: &[ClueId]) -> Result<(), services::Error>;
}

/// Oracle that only does local approximate matching
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackOracle;

#[async_trait]
impl Oracle for FallbackOracle {
    async fn judge(
        &self,
        _clue: &str,
        reference: &str,
        candidate: &str,
    ) -> Result<Verdict, services::Error> {
        Ok(services::fallback_verdict(reference, candidate))
    }
}

/// Clue store keeping the identifiers in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    ids: Mutex<Vec<ClueId>>,
}

impl MemoryStore {
    /// Every identifier persisted so far
    pub fn ids(&self) -> Vec<ClueId> {
        self.ids.lock().map(|ids| ids.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ClueStore for MemoryStore {
    async fn persist_used_clues(&self, ids: &[ClueId]) -> Result<(), services::Error> {
        self.ids
            .lock()
            .map_err(|_| services::Error::Persistence("store lock poisoned".to_owned()))?
            .extend_from_slice(ids);
        Ok(())
    }
}

/// The asynchronous collaborators a running game talks to
#[derive(Clone)]
pub struct Collaborators {
    /// Speech capture
    pub transcriber: Arc<dyn Transcriber>,
    /// Answer judgment
    pub oracle: Arc<dyn Oracle>,
    /// Used-clue persistence
    pub store: Arc<dyn ClueStore>,
}

/// Errors returned by a [`GameHandle`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// The game task has stopped
    #[error("game task has stopped")]
    Closed,
    /// The game refused the input
    #[error(transparent)]
    Rejected(#[from] game::Error),
}

enum Command {
    Play,
    Input(InputMessage, oneshot::Sender<Result<(), game::Error>>),
    Service(ServiceMessage),
    Alarm(AlarmMessage),
    Snapshot(oneshot::Sender<SyncMessage>),
    Shutdown(oneshot::Sender<Game>),
}

/// Posts a command unless the game task is gone
fn post(commands: &mpsc::WeakUnboundedSender<Command>, command: Command) {
    if let Some(commands) = commands.upgrade() {
        let _ = commands.send(command);
    }
}

/// [`Services`] implementation that runs each request as a task
struct Dispatcher {
    commands: mpsc::WeakUnboundedSender<Command>,
    collaborators: Collaborators,
    capture: Option<JoinHandle<()>>,
}

impl Services for Dispatcher {
    fn start_capture(&mut self, ticket: Ticket, player: Player) {
        self.stop_capture();
        let transcriber = Arc::clone(&self.collaborators.transcriber);
        let commands = self.commands.clone();
        self.capture = Some(tokio::spawn(async move {
            let message = match transcriber.capture(player).await {
                Ok(text) => ServiceMessage::Transcript {
                    ticket,
                    player,
                    text,
                },
                Err(error) => ServiceMessage::CaptureFailed {
                    ticket,
                    player,
                    error,
                },
            };
            post(&commands, Command::Service(message));
        }));
    }

    fn stop_capture(&mut self) {
        if let Some(task) = self.capture.take() {
            task.abort();
        }
    }

    fn request_judgment(&mut self, request: JudgmentRequest) {
        let oracle = Arc::clone(&self.collaborators.oracle);
        let commands = self.commands.clone();
        tokio::spawn(async move {
            let result = oracle
                .judge(&request.clue, &request.reference, &request.candidate)
                .await
                .map_err(|error| error.to_string());
            post(
                &commands,
                Command::Service(ServiceMessage::Verdict {
                    ticket: request.ticket,
                    player: request.player,
                    result,
                }),
            );
        });
    }

    fn persist_used_clues(&mut self, ids: Vec<ClueId>) {
        let store = Arc::clone(&self.collaborators.store);
        tokio::spawn(async move {
            match store.persist_used_clues(&ids).await {
                Ok(()) => info!(count = ids.len(), "used clues persisted"),
                Err(error) => warn!(%error, count = ids.len(), "failed to persist used clues"),
            }
        });
    }
}

struct Actor<T> {
    game: Game,
    tunnel: T,
    services: Dispatcher,
    receiver: mpsc::UnboundedReceiver<Command>,
}

impl<T: Tunnel + Send + 'static> Actor<T> {
    async fn run(mut self) {
        let alarms = self.services.commands.clone();
        let mut schedule_message = move |alarm: AlarmMessage, delay: Duration| {
            let alarms = alarms.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                post(&alarms, Command::Alarm(alarm));
            });
        };

        while let Some(command) = self.receiver.recv().await {
            match command {
                Command::Play => self.game.play(&self.tunnel),
                Command::Input(input, reply) => {
                    let result = self.game.receive_message(
                        input.into(),
                        &self.tunnel,
                        &mut self.services,
                        &mut schedule_message,
                    );
                    if let Err(error) = &result {
                        debug!(game = %self.game.id(), %error, "input rejected");
                    }
                    let _ = reply.send(result);
                }
                Command::Service(message) => {
                    let _ = self.game.receive_message(
                        message.into(),
                        &self.tunnel,
                        &mut self.services,
                        &mut schedule_message,
                    );
                }
                Command::Alarm(alarm) => self.game.receive_alarm(
                    &alarm,
                    &self.tunnel,
                    &mut self.services,
                    &mut schedule_message,
                ),
                Command::Snapshot(reply) => {
                    let _ = reply.send(self.game.sync_message());
                }
                Command::Shutdown(reply) => {
                    self.services.stop_capture();
                    info!(game = %self.game.id(), "game task stopped");
                    let _ = reply.send(self.game);
                    return;
                }
            }
        }
    }
}

/// Handle to a game running in its own task
#[derive(Debug, Clone)]
pub struct GameHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Play => f.write_str("Play"),
            Self::Input(input, _) => f.debug_tuple("Input").field(input).finish(),
            Self::Service(message) => f.debug_tuple("Service").field(message).finish(),
            Self::Alarm(alarm) => f.debug_tuple("Alarm").field(alarm).finish(),
            Self::Snapshot(_) => f.write_str("Snapshot"),
            Self::Shutdown(_) => f.write_str("Shutdown"),
        }
    }
}

/// Moves `game` into a new task and returns a handle to it
///
/// Must be called within a tokio runtime.
pub fn spawn<T: Tunnel + Send + 'static>(
    game: Game,
    tunnel: T,
    collaborators: Collaborators,
) -> GameHandle {
    let (commands, receiver) = mpsc::unbounded_channel();
    let actor = Actor {
        game,
        tunnel,
        services: Dispatcher {
            commands: commands.downgrade(),
            collaborators,
            capture: None,
        },
        receiver,
    };
    tokio::spawn(actor.run());
    GameHandle { commands }
}

impl GameHandle {
    fn post(&self, command: Command) -> Result<(), Error> {
        self.commands.send(command).map_err(|_| Error::Closed)
    }

    /// Starts (or restarts) the game
    pub fn play(&self) -> Result<(), Error> {
        self.post(Command::Play)
    }

    /// Delivers contestant or operator input and waits for the game's answer
    ///
    /// # Errors
    ///
    /// [`Error::Rejected`] when the game refuses the input and
    /// [`Error::Closed`] when the task has stopped.
    pub async fn send(&self, input: InputMessage) -> Result<(), Error> {
        let (reply, response) = oneshot::channel();
        self.post(Command::Input(input, reply))?;
        response.await.map_err(|_| Error::Closed)??;
        Ok(())
    }

    /// Returns a full snapshot of the game
    pub async fn snapshot(&self) -> Result<SyncMessage, Error> {
        let (reply, response) = oneshot::channel();
        self.post(Command::Snapshot(reply))?;
        response.await.map_err(|_| Error::Closed)
    }

    /// Stops the task and hands the game back
    ///
    /// Collaborator results and alarms still in flight are discarded.
    pub async fn shutdown(self) -> Result<Game, Error> {
        let (reply, response) = oneshot::channel();
        self.post(Command::Shutdown(reply))?;
        response.await.map_err(|_| Error::Closed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        board::Round,
        clue::Phase,
        config::Settings,
        mocks::{MockTunnel, test_board},
    };

    struct Speaks(String);

    #[async_trait]
    impl Transcriber for Speaks {
        async fn capture(&self, _player: Player) -> Result<String, services::Error> {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(self.0.clone())
        }
    }

    struct Mute;

    #[async_trait]
    impl Transcriber for Mute {
        async fn capture(&self, _player: Player) -> Result<String, services::Error> {
            Err(services::Error::Capture("no speech detected".to_owned()))
        }
    }

    struct Offline;

    #[async_trait]
    impl Oracle for Offline {
        async fn judge(&self, _: &str, _: &str, _: &str) -> Result<Verdict, services::Error> {
            Err(services::Error::JudgmentUnavailable("offline".to_owned()))
        }
    }

    fn start(transcriber: Arc<dyn Transcriber>, oracle: Arc<dyn Oracle>) -> (GameHandle, MockTunnel) {
        let settings = Settings {
            first_control: Some(Player::One),
            ..Settings::default()
        };
        let tunnel = MockTunnel::default();
        let handle = spawn(
            Game::new(test_board(), settings),
            tunnel.clone(),
            Collaborators {
                transcriber,
                oracle,
                store: Arc::new(MemoryStore::default()),
            },
        );
        handle.play().unwrap();
        (handle, tunnel)
    }

    fn select(category: usize, value: usize) -> InputMessage {
        InputMessage::SelectClue {
            category,
            value,
            round: Round::Standard,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_spoken_answer_is_judged_and_scored() {
        let (handle, _) = start(
            Arc::new(Speaks("Response s 0-0".to_owned())),
            Arc::new(FallbackOracle),
        );

        handle.send(select(0, 0)).await.unwrap();
        handle.send(InputMessage::Buzz(Player::One)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;
        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.scores[Player::One], 200);
        assert!(state.clue.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unavailable_oracle_falls_back_to_matching() {
        let (handle, _) = start(Arc::new(Speaks("nonsense".to_owned())), Arc::new(Offline));

        handle.send(select(0, 0)).await.unwrap();
        handle.send(InputMessage::Buzz(Player::Two)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(1)).await;
        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.scores[Player::Two], -200);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capture_failures_reopen_buzzers() {
        let (handle, tunnel) = start(Arc::new(Mute), Arc::new(FallbackOracle));

        handle.send(select(0, 0)).await.unwrap();
        handle.send(InputMessage::Buzz(Player::One)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(4)).await;
        let clue = handle.snapshot().await.unwrap().clue.unwrap();
        assert_eq!(clue.phase, Phase::BuzzersOpen);
        assert!(clue.answered.is_empty());
        assert!(
            tunnel
                .messages()
                .contains(&crate::clue::UpdateMessage::CaptureFailed(Player::One).into())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unanswered_clue_times_out() {
        let (handle, _) = start(Arc::new(Mute), Arc::new(FallbackOracle));
        handle.send(select(0, 0)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert!(handle.snapshot().await.unwrap().clue.is_some());

        tokio::time::sleep(Duration::from_secs(5)).await;
        let state = handle.snapshot().await.unwrap();
        assert!(state.clue.is_none());
        assert_eq!(state.scores[Player::One], 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_input_is_reported() {
        let (handle, _) = start(Arc::new(Mute), Arc::new(FallbackOracle));
        assert_eq!(
            handle.send(InputMessage::SkipClue).await,
            Err(Error::Rejected(game::Error::NoActiveClue))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_returns_game() {
        let (handle, _) = start(Arc::new(Mute), Arc::new(FallbackOracle));
        let other = handle.clone();
        handle.send(select(0, 0)).await.unwrap();

        let game = handle.shutdown().await.unwrap();
        assert_eq!(game.used().len(), 1);
        assert_eq!(other.snapshot().await, Err(Error::Closed));
    }

    #[tokio::test]
    async fn test_memory_store_keeps_ids() {
        let store = MemoryStore::default();
        store
            .persist_used_clues(&[ClueId::from("a"), ClueId::from("b")])
            .await
            .unwrap();
        assert_eq!(store.ids().len(), 2);
    }
}
