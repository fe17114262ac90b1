//! Round resolver - the two-phase state machine that owns the world state.
//!
//! Rounds alternate between [`RoundPhase::AwaitingActions`], where each
//! player may submit (and resubmit) one action, and
//! [`RoundPhase::ExecutingActions`], where the queued actions are applied in
//! priority order with a caller-supplied pause between them. Win detection
//! runs after every round and announces a decided match each time, but never
//! stops the cycle.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, info};

use crate::util::time::Timer;

use super::events::{EventChannel, GameEvent};
use super::queue::{ActionQueue, SubmitError, Submitted};
use super::rules::{self, Resolution};
use super::types::{ActionKind, ActionResult, ActionType, GameAction, Outcome, PlayerId, Position};
use super::world::{GameSetup, GameState, SetupError};

/// Resolver phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    /// Accepting submissions
    AwaitingActions,
    /// Applying queued actions; submissions are rejected
    ExecutingActions,
}

/// Inputs that drive phase transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseSignal {
    /// An action was stored; `all_ready` when every player has one pending
    ActionStored { all_ready: bool },
    /// Every queued action has been applied
    RoundResolved,
}

impl RoundPhase {
    pub fn accepts_submissions(self) -> bool {
        self == RoundPhase::AwaitingActions
    }

    /// Transition function
    pub fn next(self, signal: PhaseSignal) -> RoundPhase {
        match (self, signal) {
            (RoundPhase::AwaitingActions, PhaseSignal::ActionStored { all_ready: true }) => {
                RoundPhase::ExecutingActions
            }
            (RoundPhase::ExecutingActions, PhaseSignal::RoundResolved) => {
                RoundPhase::AwaitingActions
            }
            (phase, _) => phase,
        }
    }
}

/// Pause inserted after each resolved action so observers can animate
pub trait Pacer {
    fn pause(&mut self) -> impl Future<Output = ()> + Send;
}

/// Headless pacing: never waits
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacer for NoDelay {
    fn pause(&mut self) -> impl Future<Output = ()> + Send {
        std::future::ready(())
    }
}

/// Interactive pacing: sleeps a fixed duration
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay(pub Duration);

impl Pacer for FixedDelay {
    fn pause(&mut self) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(self.0)
    }
}

/// Everything that happened in one resolved round
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundReport {
    pub round: u32,
    /// Executed actions with their results, in execution order
    pub results: Vec<(GameAction, ActionResult)>,
    /// Outcome after the round, if the match is decided
    pub outcome: Option<Outcome>,
}

/// The round resolver. Single writer of [`GameState`].
#[derive(Debug)]
pub struct RoundResolver {
    state: GameState,
    queue: ActionQueue,
    phase: RoundPhase,
    events: EventChannel,
}

impl RoundResolver {
    /// Start a game from `setup`, emitting `RoundStarted { round: 1 }`
    pub fn new(setup: GameSetup, events: EventChannel) -> Result<Self, SetupError> {
        let state = GameState::from_setup(setup)?;
        let queue = ActionQueue::for_state(&state);
        let resolver = Self {
            state,
            queue,
            phase: RoundPhase::AwaitingActions,
            events,
        };
        resolver.events.emit(GameEvent::RoundStarted { round: 1 });
        Ok(resolver)
    }

    /// Throw away the current match and start over from `setup`
    pub fn new_game(&mut self, setup: GameSetup) -> Result<(), SetupError> {
        let state = GameState::from_setup(setup)?;
        self.queue = ActionQueue::for_state(&state);
        self.state = state;
        self.phase = RoundPhase::AwaitingActions;
        info!("New game started");
        self.events.emit(GameEvent::RoundStarted { round: 1 });
        Ok(())
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.state.current_round
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.state.outcome.as_ref()
    }

    /// Read-only view of the world
    pub fn current_state(&self) -> &GameState {
        &self.state
    }

    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    pub fn has_submitted(&self, id: &PlayerId) -> bool {
        self.queue.has_pending(id)
    }

    pub fn available_actions(&self, id: &PlayerId) -> Vec<ActionType> {
        rules::available_actions(&self.state, id)
    }

    pub fn available_moves(&self, id: &PlayerId) -> Vec<Position> {
        rules::available_moves(&self.state, id)
    }

    pub fn available_targets(&self, id: &PlayerId) -> Vec<Position> {
        rules::available_targets(&self.state, id)
    }

    /// Queue a player's action for this round.
    ///
    /// Resubmitting before the round runs replaces the earlier action. Once
    /// every player has an action pending the resolver moves to
    /// `ExecutingActions` and rejects further submissions until
    /// [`execute_round`](Self::execute_round) completes.
    pub fn submit_action(&mut self, action: GameAction) -> ActionResult {
        if !self.phase.accepts_submissions() {
            debug!(player_id = %action.player_id, "Rejected submission while executing");
            return ActionResult::failure(SubmitError::NotAccepting.to_string());
        }

        let player_id = action.player_id.clone();
        let action_type = action.action_type();
        let stored = match self.queue.submit(action) {
            Ok(stored) => stored,
            Err(err) => {
                debug!(player_id = %player_id, error = %err, "Rejected submission");
                return ActionResult::failure(err.to_string());
            }
        };

        let all_ready = self.queue.both_ready();
        self.phase = self.phase.next(PhaseSignal::ActionStored { all_ready });
        if self.phase == RoundPhase::ExecutingActions {
            self.queue.close();
        }

        debug!(
            round = self.state.current_round,
            player_id = %player_id,
            action = %action_type,
            replaced = stored == Submitted::Replaced,
            all_ready,
            "Action submitted"
        );

        let message = match stored {
            Submitted::Queued => "queued",
            Submitted::Replaced => "replaced",
        };
        ActionResult::success(message, Vec::new())
    }

    /// Resolve the queued round. Does nothing unless every player has
    /// submitted.
    ///
    /// Actions run one at a time, defend before attack before move, with
    /// `pacer` awaited after each. Afterwards the win check runs, pending
    /// actions and defend flags are cleared and the round counter advances.
    pub async fn execute_round<P: Pacer>(&mut self, pacer: &mut P) -> Option<RoundReport> {
        if self.phase != RoundPhase::ExecutingActions {
            return None;
        }

        let timer = Timer::new();
        let round = self.state.current_round;
        let actions = self.queue.drain();
        let mut results = Vec::with_capacity(actions.len());

        for action in actions {
            let Resolution { result, events } = self.apply(&action);

            for event in events {
                self.events.emit(event);
            }
            self.events.emit(GameEvent::ActionExecuted {
                player_id: action.player_id.clone(),
                action_type: action.action_type(),
                result: result.clone(),
            });
            debug!(
                round,
                player_id = %action.player_id,
                action = %action.action_type(),
                success = result.success,
                message = %result.message,
                "Action resolved"
            );

            self.state.record(action.clone(), result.clone());
            results.push((action, result));

            pacer.pause().await;
        }

        let outcome = rules::check_win(&self.state);
        if let Some(decided) = &outcome {
            info!(round, outcome = %decided, "Game over");
            self.events.emit(GameEvent::GameOver {
                outcome: decided.clone(),
            });
        }
        self.state.outcome = outcome.clone();

        self.finish_round();
        info!(round, elapsed_ms = timer.elapsed_ms(), "Round resolved");

        Some(RoundReport {
            round,
            results,
            outcome,
        })
    }

    fn apply(&mut self, action: &GameAction) -> Resolution {
        let id = &action.player_id;
        match action.kind {
            ActionKind::Move { target } => rules::process_move(&mut self.state, id, target),
            ActionKind::Attack { target } => rules::process_attack(&mut self.state, id, target),
            ActionKind::Defend => rules::process_defend(&mut self.state, id),
        }
    }

    fn finish_round(&mut self) {
        self.queue.reset(&mut self.state);
        self.state.current_round += 1;
        self.phase = self.phase.next(PhaseSignal::RoundResolved);
        self.events.emit(GameEvent::RoundStarted {
            round: self.state.current_round,
        });
    }
}
