//! Pending-action store: one slot per registered player per round

use super::types::{GameAction, PlayerId};
use super::world::GameState;

/// How a submission was stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// Slot was empty
    Queued,
    /// Latest submission replaced the earlier one
    Replaced,
}

/// Submission rejections
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("not accepting actions while the round resolves")]
    NotAccepting,

    #[error("unknown player: {0}")]
    UnknownPlayer(PlayerId),
}

/// The action queue
#[derive(Debug, Clone)]
pub struct ActionQueue {
    /// Player ids in registration order
    registered: Vec<PlayerId>,
    /// Pending action per registered player, same indexing
    slots: Vec<Option<GameAction>>,
    accepting: bool,
}

impl ActionQueue {
    pub fn new(registered: Vec<PlayerId>) -> Self {
        let slots = vec![None; registered.len()];
        Self {
            registered,
            slots,
            accepting: true,
        }
    }

    /// Queue for every player in the state, in registration order
    pub fn for_state(state: &GameState) -> Self {
        Self::new(state.players.iter().map(|p| p.id.clone()).collect())
    }

    /// Store a pending action, replacing any earlier one from the same player
    pub fn submit(&mut self, action: GameAction) -> Result<Submitted, SubmitError> {
        if !self.accepting {
            return Err(SubmitError::NotAccepting);
        }
        let slot = self
            .registered
            .iter()
            .position(|id| id == &action.player_id)
            .ok_or_else(|| SubmitError::UnknownPlayer(action.player_id.clone()))?;

        match self.slots[slot].replace(action) {
            Some(_) => Ok(Submitted::Replaced),
            None => Ok(Submitted::Queued),
        }
    }

    /// True once every registered player has a pending action
    pub fn both_ready(&self) -> bool {
        !self.slots.is_empty() && self.slots.iter().all(Option::is_some)
    }

    pub fn has_pending(&self, id: &PlayerId) -> bool {
        self.registered
            .iter()
            .zip(&self.slots)
            .any(|(registered, slot)| registered == id && slot.is_some())
    }

    /// Pending action of a player, if any
    pub fn pending(&self, id: &PlayerId) -> Option<&GameAction> {
        self.registered
            .iter()
            .position(|registered| registered == id)
            .and_then(|slot| self.slots[slot].as_ref())
    }

    /// Number of pending actions
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting
    }

    /// Stop accepting submissions until the next [`reset`](Self::reset)
    pub fn close(&mut self) {
        self.accepting = false;
    }

    /// Take all pending actions in execution order: higher priority first,
    /// registration order within equal priority
    pub fn drain(&mut self) -> Vec<GameAction> {
        let mut actions: Vec<GameAction> = self.slots.iter_mut().filter_map(Option::take).collect();
        actions.sort_by_key(|a| std::cmp::Reverse(a.action_type().priority()));
        actions
    }

    /// Start a fresh round: clear pending actions and every defend flag,
    /// then accept submissions again
    pub fn reset(&mut self, state: &mut GameState) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        state.reset_defense();
        self.accepting = true;
    }
}
