//! Event fan-out to observers (renderers, animation, logging).
//!
//! Delivery is synchronous and best-effort: events are pushed into a
//! broadcast channel, nothing is retained for late subscribers, and a
//! lagging subscriber loses the oldest events.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::{ActionResult, ActionType, Outcome, PlayerId, Position, WeaponType};

/// Notifications emitted while rounds are resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEvent {
    /// A new round is accepting submissions
    RoundStarted { round: u32 },

    /// One queued action finished resolving
    ActionExecuted {
        player_id: PlayerId,
        action_type: ActionType,
        result: ActionResult,
    },

    PlayerMoved {
        player_id: PlayerId,
        from: Position,
        to: Position,
    },

    PlayerDefended { player_id: PlayerId },

    /// A shot was fired, hit or not
    PlayerAttacked {
        player_id: PlayerId,
        weapon: WeaponType,
        affected: Vec<Position>,
    },

    DamageDealt {
        attacker_id: PlayerId,
        target_id: PlayerId,
        health_damage: u32,
        shield_absorbed: u32,
    },

    /// The match has been decided. Rounds keep cycling afterwards.
    GameOver { outcome: Outcome },
}

/// Broadcast channel for [`GameEvent`]s
#[derive(Debug, Clone)]
pub struct EventChannel {
    tx: broadcast::Sender<GameEvent>,
}

impl EventChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<GameEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Push an event to current subscribers; dropped if there are none
    pub fn emit(&self, event: GameEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new(128)
    }
}
