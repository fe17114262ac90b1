//! Match task: serializes submissions from independent input sources into
//! the resolver and paces round execution.

use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;

use super::events::{EventChannel, GameEvent};
use super::queue::SubmitError;
use super::resolver::{Pacer, RoundPhase, RoundResolver};
use super::types::{ActionResult, ActionType, GameAction, PlayerId, Position};
use super::world::{GameSetup, GameState, SetupError};

/// Match handle errors
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("match {0} is no longer running")]
    Closed(Uuid),

    #[error("invalid setup: {0}")]
    Setup(#[from] SetupError),
}

/// Requests handled by the match task
#[derive(Debug)]
pub enum MatchCommand {
    Submit {
        action: GameAction,
        reply: oneshot::Sender<ActionResult>,
    },
    AvailableActions {
        player_id: PlayerId,
        reply: oneshot::Sender<Vec<ActionType>>,
    },
    AvailableMoves {
        player_id: PlayerId,
        reply: oneshot::Sender<Vec<Position>>,
    },
    AvailableTargets {
        player_id: PlayerId,
        reply: oneshot::Sender<Vec<Position>>,
    },
    Snapshot {
        reply: oneshot::Sender<GameState>,
    },
    NewGame {
        setup: GameSetup,
        reply: oneshot::Sender<Result<(), SetupError>>,
    },
    Shutdown,
}

/// Cloneable handle to a running match, one per input source
#[derive(Debug, Clone)]
pub struct MatchHandle {
    pub id: Uuid,
    command_tx: mpsc::Sender<MatchCommand>,
    events: EventChannel,
}

impl MatchHandle {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> MatchCommand,
    ) -> Result<T, MatchError> {
        let (reply, rx) = oneshot::channel();
        self.command_tx
            .send(build(reply))
            .await
            .map_err(|_| MatchError::Closed(self.id))?;
        rx.await.map_err(|_| MatchError::Closed(self.id))
    }

    /// Submit an action for the current round
    pub async fn submit(&self, action: GameAction) -> Result<ActionResult, MatchError> {
        self.request(|reply| MatchCommand::Submit { action, reply })
            .await
    }

    pub async fn available_actions(&self, player_id: PlayerId) -> Result<Vec<ActionType>, MatchError> {
        self.request(|reply| MatchCommand::AvailableActions { player_id, reply })
            .await
    }

    pub async fn available_moves(&self, player_id: PlayerId) -> Result<Vec<Position>, MatchError> {
        self.request(|reply| MatchCommand::AvailableMoves { player_id, reply })
            .await
    }

    pub async fn available_targets(&self, player_id: PlayerId) -> Result<Vec<Position>, MatchError> {
        self.request(|reply| MatchCommand::AvailableTargets { player_id, reply })
            .await
    }

    /// Copy of the current world state
    pub async fn snapshot(&self) -> Result<GameState, MatchError> {
        self.request(|reply| MatchCommand::Snapshot { reply }).await
    }

    pub async fn new_game(&self, setup: GameSetup) -> Result<(), MatchError> {
        self.request(|reply| MatchCommand::NewGame { setup, reply })
            .await?
            .map_err(MatchError::from)
    }

    /// Receive events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.events.subscribe()
    }

    /// Ask the match task to stop after the current command
    pub async fn shutdown(&self) -> Result<(), MatchError> {
        self.command_tx
            .send(MatchCommand::Shutdown)
            .await
            .map_err(|_| MatchError::Closed(self.id))
    }
}

/// Pacer used while a round executes: waits out the delay while rejecting
/// submissions and holding other commands until the round is over
struct RoundPacer<'a> {
    match_id: Uuid,
    delay: Duration,
    commands: &'a mut mpsc::Receiver<MatchCommand>,
    open: bool,
    deferred: Vec<MatchCommand>,
}

impl RoundPacer<'_> {
    fn intercept(&mut self, command: MatchCommand) {
        match command {
            MatchCommand::Submit { action, reply } => {
                debug!(
                    match_id = %self.match_id,
                    player_id = %action.player_id,
                    "Submission arrived mid-round, rejecting"
                );
                let _ = reply.send(ActionResult::failure(SubmitError::NotAccepting.to_string()));
            }
            other => self.deferred.push(other),
        }
    }
}

impl Pacer for RoundPacer<'_> {
    fn pause(&mut self) -> impl std::future::Future<Output = ()> + Send {
        async move {
            let sleep = tokio::time::sleep(self.delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    biased;
                    command = self.commands.recv(), if self.open => match command {
                        Some(command) => self.intercept(command),
                        None => self.open = false,
                    },
                    _ = &mut sleep => break,
                }
            }
        }
    }
}

/// The authoritative match task
pub struct GameMatch {
    id: Uuid,
    resolver: RoundResolver,
    commands: mpsc::Receiver<MatchCommand>,
    action_delay: Duration,
}

impl GameMatch {
    /// Create a new match
    pub fn new(setup: GameSetup, config: &EngineConfig) -> Result<(Self, MatchHandle), SetupError> {
        let id = Uuid::new_v4();
        let (command_tx, commands) = mpsc::channel(config.command_channel_capacity.max(1));
        let events = EventChannel::new(config.event_channel_capacity);
        let resolver = RoundResolver::new(setup, events.clone())?;

        let handle = MatchHandle {
            id,
            command_tx,
            events,
        };
        let game_match = Self {
            id,
            resolver,
            commands,
            action_delay: config.action_delay,
        };

        Ok((game_match, handle))
    }

    /// Serve commands until every handle is dropped or shutdown is requested
    pub async fn run(mut self) {
        info!(match_id = %self.id, "Match started");

        while let Some(command) = self.commands.recv().await {
            if !self.dispatch(command).await {
                break;
            }
        }

        info!(
            match_id = %self.id,
            round = self.resolver.round(),
            outcome = ?self.resolver.outcome(),
            "Match stopped"
        );
    }

    async fn dispatch(&mut self, command: MatchCommand) -> bool {
        if !self.handle(command) {
            return false;
        }
        if self.resolver.phase() != RoundPhase::ExecutingActions {
            return true;
        }

        let mut pacer = RoundPacer {
            match_id: self.id,
            delay: self.action_delay,
            commands: &mut self.commands,
            open: true,
            deferred: Vec::new(),
        };
        if let Some(report) = self.resolver.execute_round(&mut pacer).await {
            info!(
                match_id = %self.id,
                round = report.round,
                actions = report.results.len(),
                "Round complete"
            );
        }

        let deferred = std::mem::take(&mut pacer.deferred);
        deferred.into_iter().all(|command| self.handle(command))
    }

    /// Handle one command in `AwaitingActions`. Returns false on shutdown.
    fn handle(&mut self, command: MatchCommand) -> bool {
        match command {
            MatchCommand::Submit { action, reply } => {
                let result = self.resolver.submit_action(action);
                let _ = reply.send(result);
            }
            MatchCommand::AvailableActions { player_id, reply } => {
                let _ = reply.send(self.resolver.available_actions(&player_id));
            }
            MatchCommand::AvailableMoves { player_id, reply } => {
                let _ = reply.send(self.resolver.available_moves(&player_id));
            }
            MatchCommand::AvailableTargets { player_id, reply } => {
                let _ = reply.send(self.resolver.available_targets(&player_id));
            }
            MatchCommand::Snapshot { reply } => {
                let _ = reply.send(self.resolver.current_state().clone());
            }
            MatchCommand::NewGame { setup, reply } => {
                let result = self.resolver.new_game(setup);
                if let Err(err) = &result {
                    warn!(match_id = %self.id, error = %err, "Rejected new game setup");
                }
                let _ = reply.send(result);
            }
            MatchCommand::Shutdown => {
                info!(match_id = %self.id, "Shutdown requested");
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::Outcome;

    fn config(delay_ms: u64) -> EngineConfig {
        EngineConfig {
            action_delay: Duration::from_millis(delay_ms),
            ..EngineConfig::default()
        }
    }

    fn spawn(delay_ms: u64) -> MatchHandle {
        let (game_match, handle) = GameMatch::new(GameSetup::standard(), &config(delay_ms)).unwrap();
        tokio::spawn(game_match.run());
        handle
    }

    #[tokio::test]
    async fn concurrent_sources_resolve_a_round() {
        let handle = spawn(0);
        let mut events = handle.subscribe();

        let h1 = handle.clone();
        let h2 = handle.clone();
        let (r1, r2) = tokio::join!(
            async move { h1.submit(GameAction::attack("player1", None)).await },
            async move { h2.submit(GameAction::defend("player2")).await },
        );
        assert!(r1.unwrap().success);
        assert!(r2.unwrap().success);

        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.current_round, 2);
        let p2 = state.player(&"player2".into()).unwrap();
        assert_eq!(p2.resources.health, 100);
        assert_eq!(p2.resources.shield, 2);

        let mut executed = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, GameEvent::ActionExecuted { .. }) {
                executed += 1;
            }
        }
        assert_eq!(executed, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn submissions_during_execution_are_rejected() {
        let handle = spawn(1000);

        handle.submit(GameAction::defend("player1")).await.unwrap();
        handle.submit(GameAction::defend("player2")).await.unwrap();

        let late = handle.submit(GameAction::attack("player1", None)).await.unwrap();
        assert!(!late.success);

        // deferred until the round is over
        let state = handle.snapshot().await.unwrap();
        assert_eq!(state.current_round, 2);
        assert_eq!(state.players[0].resources.ammo, 10);
        assert!(state.action_history.iter().all(|h| h.action.action_type() == ActionType::Defend));
    }

    #[tokio::test]
    async fn queries_and_new_game() {
        let handle = spawn(0);
        let p1 = PlayerId::new("player1");

        assert_eq!(
            handle.available_targets(p1.clone()).await.unwrap(),
            vec![Position::new(4, 1)]
        );
        assert_eq!(handle.available_moves(p1.clone()).await.unwrap().len(), 4);
        assert_eq!(handle.available_actions(p1.clone()).await.unwrap().len(), 3);

        let mut bad = GameSetup::standard();
        bad.players.pop();
        assert!(matches!(
            handle.new_game(bad).await,
            Err(MatchError::Setup(SetupError::TooFewPlayers(1)))
        ));
        handle.new_game(GameSetup::standard()).await.unwrap();
    }

    #[tokio::test]
    async fn game_over_is_broadcast() {
        let handle = spawn(0);
        let mut events = handle.subscribe();

        // player2 dodges every round, but the attack resolves first
        let dodges = [Position::new(4, 0), Position::new(4, 1)];
        for round in 0..5 {
            handle.submit(GameAction::attack("player1", None)).await.unwrap();
            handle
                .submit(GameAction::move_to("player2", dodges[round % 2]))
                .await
                .unwrap();
            // answered only once the round has resolved
            handle.snapshot().await.unwrap();
        }

        let mut outcome = None;
        while let Ok(event) = events.try_recv() {
            if let GameEvent::GameOver { outcome: decided } = event {
                outcome = Some(decided);
            }
        }
        assert_eq!(outcome, Some(Outcome::Winner("player1".into())));
    }

    #[tokio::test]
    async fn shutdown_closes_handle() {
        let handle = spawn(0);
        handle.shutdown().await.unwrap();

        let result = handle.snapshot().await;
        assert!(matches!(result, Err(MatchError::Closed(_))));
    }
}
