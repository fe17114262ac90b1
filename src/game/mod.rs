//! Turn resolution: world state, rules, action queue and round resolver

pub mod combat;
pub mod events;
pub mod r#match;
pub mod movement;
pub mod queue;
pub mod resolver;
pub mod rules;
pub mod types;
pub mod world;

pub use events::{EventChannel, GameEvent};
pub use queue::{ActionQueue, SubmitError, Submitted};
pub use r#match::{GameMatch, MatchError, MatchHandle};
pub use resolver::{FixedDelay, NoDelay, Pacer, RoundPhase, RoundReport, RoundResolver};
pub use rules::ActionError;
pub use types::{
    ActionKind, ActionResult, ActionType, GameAction, Outcome, Player, PlayerId, Position,
    Resources, Side, Weapon, WeaponType,
};
pub use world::{GameSetup, GameState, PlayerSetup, SetupError};
