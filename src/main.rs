//! Duel Engine - headless match driver
//!
//! Runs one match with a submitting task per player. Each player cycles
//! through a list of actions, either from the JSON file named by
//! `MATCH_SCRIPT` or from the built-in script. Every engine event is logged.

use std::path::Path;

use anyhow::{bail, Context};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use duel_engine::config::EngineConfig;
use duel_engine::game::{
    ActionKind, GameAction, GameEvent, GameMatch, GameSetup, GameState, MatchHandle,
    PlayerId,
};

/// Actions one player cycles through, one per round
#[derive(Debug, Clone, Deserialize)]
struct PlayerScript {
    player_id: PlayerId,
    actions: Vec<ActionKind>,
}

#[derive(Debug, Clone, Deserialize)]
struct MatchScript {
    players: Vec<PlayerScript>,
}

impl MatchScript {
    /// player1 keeps firing, player2 alternates between shield and shot
    fn built_in() -> Self {
        Self {
            players: vec![
                PlayerScript {
                    player_id: PlayerId::new("player1"),
                    actions: vec![ActionKind::Attack { target: None }],
                },
                PlayerScript {
                    player_id: PlayerId::new("player2"),
                    actions: vec![ActionKind::Defend, ActionKind::Attack { target: None }],
                },
            ],
        }
    }

    fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading match script {}", path.display()))?;
        let script: Self = serde_json::from_str(&raw)
            .with_context(|| format!("parsing match script {}", path.display()))?;
        if let Some(empty) = script.players.iter().find(|p| p.actions.is_empty()) {
            bail!("match script has no actions for {}", empty.player_id);
        }
        Ok(script)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = EngineConfig::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    let script = match &config.match_script {
        Some(path) => MatchScript::load(path)?,
        None => MatchScript::built_in(),
    };

    let setup = GameSetup::standard();
    for player in &setup.players {
        if !script.players.iter().any(|s| s.player_id == player.id) {
            bail!("match script has no actions for {}", player.id);
        }
    }
    if let Some(stranger) = script
        .players
        .iter()
        .find(|s| !setup.players.iter().any(|p| p.id == s.player_id))
    {
        bail!("match script names unknown player {}", stranger.player_id);
    }

    let (game_match, handle) = GameMatch::new(setup, &config)?;
    info!(
        match_id = %handle.id,
        action_delay_ms = config.action_delay.as_millis() as u64,
        max_rounds = config.max_rounds,
        "Starting headless match"
    );

    let logger = tokio::spawn(log_events(handle.clone()));
    let engine = tokio::spawn(game_match.run());

    let drivers: Vec<_> = script
        .players
        .into_iter()
        .map(|player| tokio::spawn(drive_player(handle.clone(), player, config.max_rounds)))
        .collect();
    for driver in drivers {
        driver.await??;
    }

    let state = handle.snapshot().await?;
    for player in &state.players {
        info!(
            player_id = %player.id,
            health = player.resources.health,
            shield = player.resources.shield,
            ammo = player.resources.ammo,
            "Final resources"
        );
    }
    match &state.outcome {
        Some(outcome) => info!(round = state.current_round - 1, %outcome, "Match decided"),
        None => info!(rounds = config.max_rounds, "No winner within the round limit"),
    }

    handle.shutdown().await?;
    engine.await?;
    logger.abort();

    info!("Driver shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Submit this player's scripted action every round until the match is
/// decided or the round limit is reached
async fn drive_player(handle: MatchHandle, script: PlayerScript, max_rounds: u32) -> anyhow::Result<()> {
    let mut events = handle.subscribe();
    let mut round: u32 = handle.snapshot().await?.current_round;

    while round <= max_rounds {
        let kind = script.actions[(round as usize - 1) % script.actions.len()];
        let result = handle
            .submit(GameAction::new(script.player_id.clone(), kind))
            .await?;
        if !result.success {
            warn!(player_id = %script.player_id, round, message = %result.message, "Submission rejected");
        }

        loop {
            match events.recv().await {
                Ok(GameEvent::RoundStarted { round: next }) => {
                    round = next;
                    break;
                }
                Ok(GameEvent::GameOver { .. }) | Err(RecvError::Closed) => return Ok(()),
                Ok(_) => {}
                Err(RecvError::Lagged(missed)) => {
                    warn!(player_id = %script.player_id, missed, "Event stream lagged");
                    match resync(round, &handle.snapshot().await?) {
                        Resync::Finished => return Ok(()),
                        Resync::Advanced(next) => {
                            round = next;
                            break;
                        }
                        Resync::Waiting => {}
                    }
                }
            }
        }
    }

    Ok(())
}

/// Where a driver stands after missing events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resync {
    /// The match was decided while we weren't listening
    Finished,
    /// A later round has already started
    Advanced(u32),
    /// Our round is still collecting actions
    Waiting,
}

fn resync(submitted_for: u32, state: &GameState) -> Resync {
    if state.outcome.is_some() {
        Resync::Finished
    } else if state.current_round > submitted_for {
        Resync::Advanced(state.current_round)
    } else {
        Resync::Waiting
    }
}

/// Log every engine event as JSON
async fn log_events(handle: MatchHandle) {
    let mut events = handle.subscribe();
    drop(handle);

    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => info!(event = %json, "Engine event"),
                Err(err) => warn!(error = %err, "Failed to encode event"),
            },
            Err(RecvError::Lagged(missed)) => warn!(missed, "Event logger lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}
