//! Duel Engine - turn resolution for a two-player simultaneous grid combat game
//!
//! Both players submit one action per round (move, attack or defend). Once
//! both have submitted, the round resolves deterministically: defend before
//! attack before move, one action at a time, followed by win detection.
//!
//! - [`game::RoundResolver`] is the synchronous core that owns the world.
//! - [`game::GameMatch`] runs it as a task fed by cloneable [`game::MatchHandle`]s.

pub mod config;
pub mod game;
pub mod util;
