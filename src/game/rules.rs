//! Resolution rules - legality checks and effects of move / attack / defend.
//!
//! Every function reads the [`GameState`] it is given; only the `process_*`
//! functions and [`apply_damage`] mutate it, and only on success.

use super::combat::{self, AttackPlan, HitResult, IMPACT_EFFECT_MS};
use super::events::GameEvent;
use super::movement::{in_home_zone, neighbours};
use super::types::{
    ActionResult, ActionType, EffectKind, Outcome, Player, PlayerId, Position, VisualEffect,
    WeaponType,
};
use super::world::GameState;

const SHIELD_EFFECT_MS: u32 = 1000;
const MOVE_EFFECT_MS: u32 = 300;

/// Why an action could not be carried out
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("unknown player: {0}")]
    UnknownPlayer(PlayerId),

    #[error("cell {0} is outside the home zone")]
    OutsideHomeZone(Position),

    #[error("cell {to} is not one step from {from}")]
    NotAdjacent { from: Position, to: Position },

    #[error("cell {0} is occupied")]
    Occupied(Position),

    #[error("no active weapon")]
    NoActiveWeapon,

    #[error("out of ammo: have {have}, need {need}")]
    OutOfAmmo { have: u32, need: u32 },

    #[error("{0} needs a target cell")]
    MissingTarget(WeaponType),

    #[error("target cell {0} is off the board")]
    OffBoard(Position),

    #[error("no opponent to target")]
    NoOpponent,
}

/// Result of resolving one action plus the notifications it produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub result: ActionResult,
    pub events: Vec<GameEvent>,
}

impl Resolution {
    fn rejected(err: ActionError) -> Self {
        Self {
            result: ActionResult::failure(err.to_string()),
            events: Vec::new(),
        }
    }
}

fn check_move(state: &GameState, player: &Player, target: Position) -> Result<(), ActionError> {
    if !in_home_zone(player.side, target) {
        return Err(ActionError::OutsideHomeZone(target));
    }
    if player.position.distance(target) != 1 {
        return Err(ActionError::NotAdjacent {
            from: player.position,
            to: target,
        });
    }
    if state.is_occupied(target) {
        return Err(ActionError::Occupied(target));
    }
    Ok(())
}

fn check_attack(player: &Player) -> Result<(), ActionError> {
    let weapon = player.active_weapon().ok_or(ActionError::NoActiveWeapon)?;
    if player.resources.ammo < weapon.ammo_per_shot {
        return Err(ActionError::OutOfAmmo {
            have: player.resources.ammo,
            need: weapon.ammo_per_shot,
        });
    }
    Ok(())
}

/// Target inside the home zone, exactly one orthogonal step away, and empty
pub fn can_move(state: &GameState, player: &Player, target: Position) -> bool {
    check_move(state, player, target).is_ok()
}

/// Has an active weapon and enough ammo for one shot
pub fn can_attack(player: &Player) -> bool {
    check_attack(player).is_ok()
}

/// Cells the player's active weapon would cover this round
pub fn resolve_attack_targets(
    state: &GameState,
    player: &Player,
    declared: Option<Position>,
) -> Result<AttackPlan, ActionError> {
    let weapon = player.active_weapon().ok_or(ActionError::NoActiveWeapon)?;
    let opponent = state.opponent_of(&player.id).map(|p| p.position);
    combat::resolve_attack_targets(player, weapon, opponent, declared)
}

/// Apply one hit to a player, honouring an active shield
pub fn apply_damage(state: &mut GameState, target: &PlayerId, raw_damage: u32) -> Option<HitResult> {
    let player = state.player_mut(target)?;
    Some(combat::apply_damage(player, raw_damage))
}

pub fn process_move(state: &mut GameState, id: &PlayerId, target: Position) -> Resolution {
    let Some(player) = state.player(id) else {
        return Resolution::rejected(ActionError::UnknownPlayer(id.clone()));
    };
    if let Err(err) = check_move(state, player, target) {
        return Resolution::rejected(err);
    }

    let from = player.position;
    state.move_player(id, target);

    Resolution {
        result: ActionResult::success("moved", vec![from, target]).with_effects(vec![
            VisualEffect {
                kind: EffectKind::Move,
                position: target,
                duration_ms: MOVE_EFFECT_MS,
            },
        ]),
        events: vec![GameEvent::PlayerMoved {
            player_id: id.clone(),
            from,
            to: target,
        }],
    }
}

pub fn process_defend(state: &mut GameState, id: &PlayerId) -> Resolution {
    let Some(player) = state.player_mut(id) else {
        return Resolution::rejected(ActionError::UnknownPlayer(id.clone()));
    };

    player.is_defending = true;
    let position = player.position;

    Resolution {
        result: ActionResult::success("defending", vec![position]).with_effects(vec![
            VisualEffect {
                kind: EffectKind::Shield,
                position,
                duration_ms: SHIELD_EFFECT_MS,
            },
        ]),
        events: vec![GameEvent::PlayerDefended {
            player_id: id.clone(),
        }],
    }
}

/// Fire the active weapon.
///
/// Insufficient ammo or an unresolvable target is a failure and leaves ammo
/// alone. Once the shot is fired ammo is spent; an out-of-range aim or empty
/// cells make it a successful miss.
pub fn process_attack(
    state: &mut GameState,
    id: &PlayerId,
    declared: Option<Position>,
) -> Resolution {
    let Some(player) = state.player(id) else {
        return Resolution::rejected(ActionError::UnknownPlayer(id.clone()));
    };
    if let Err(err) = check_attack(player) {
        return Resolution::rejected(err);
    }
    let plan = match resolve_attack_targets(state, player, declared) {
        Ok(plan) => plan,
        Err(err) => return Resolution::rejected(err),
    };
    let Some(weapon) = player.active_weapon().cloned() else {
        return Resolution::rejected(ActionError::NoActiveWeapon);
    };

    if let Some(shooter) = state.player_mut(id) {
        shooter.resources.ammo -= weapon.ammo_per_shot;
    }

    let mut events = vec![GameEvent::PlayerAttacked {
        player_id: id.clone(),
        weapon: weapon.weapon_type,
        affected: plan.cells.clone(),
    }];

    let mut hits = Vec::new();
    if plan.in_range {
        let victims: Vec<PlayerId> = state
            .players
            .iter()
            .filter(|p| &p.id != id && plan.cells.contains(&p.position))
            .map(|p| p.id.clone())
            .collect();

        for victim in victims {
            if let Some(hit) = apply_damage(state, &victim, weapon.damage) {
                hits.push(hit);
            }
        }
    }

    let effect_kind = if hits.is_empty() {
        EffectKind::Miss
    } else {
        EffectKind::Explosion
    };
    let effects = plan
        .cells
        .iter()
        .map(|&position| VisualEffect {
            kind: effect_kind,
            position,
            duration_ms: IMPACT_EFFECT_MS,
        })
        .collect();

    let result = if hits.is_empty() {
        ActionResult::success("miss", plan.cells)
    } else {
        let dealt = hits.iter().map(|h| h.health_damage).sum();
        ActionResult::success("hit", plan.cells).with_damage(dealt)
    };

    events.extend(hits.into_iter().map(|hit| GameEvent::DamageDealt {
        attacker_id: id.clone(),
        target_id: hit.target_id,
        health_damage: hit.health_damage,
        shield_absorbed: hit.shield_absorbed,
    }));

    Resolution {
        result: result.with_effects(effects),
        events,
    }
}

/// Sole survivor wins, nobody left is a draw, otherwise undecided
pub fn check_win(state: &GameState) -> Option<Outcome> {
    let mut alive = state.players.iter().filter(|p| p.is_alive());
    match (alive.next(), alive.next()) {
        (None, _) => Some(Outcome::Draw),
        (Some(survivor), None) => Some(Outcome::Winner(survivor.id.clone())),
        (Some(_), Some(_)) => None,
    }
}

/// Action types the player could submit right now
pub fn available_actions(state: &GameState, id: &PlayerId) -> Vec<ActionType> {
    let Some(player) = state.player(id) else {
        return Vec::new();
    };

    let mut actions = vec![ActionType::Move, ActionType::Defend];
    if can_attack(player) {
        actions.push(ActionType::Attack);
    }
    actions
}

/// Cells the player could legally step to from the current position
pub fn available_moves(state: &GameState, id: &PlayerId) -> Vec<Position> {
    let Some(player) = state.player(id) else {
        return Vec::new();
    };

    neighbours(player.position)
        .filter(|&cell| can_move(state, player, cell))
        .collect()
}

/// Cells the player could attack: the opponent's cell for point weapons,
/// every board cell within range for area weapons
pub fn available_targets(state: &GameState, id: &PlayerId) -> Vec<Position> {
    let Some(player) = state.player(id) else {
        return Vec::new();
    };
    if !can_attack(player) {
        return Vec::new();
    }
    let Some(weapon) = player.active_weapon() else {
        return Vec::new();
    };

    if weapon.weapon_type.is_point() {
        return state
            .opponent_of(id)
            .map(|p| vec![p.position])
            .unwrap_or_default();
    }

    let mut cells = Vec::new();
    for x in 0..super::types::BOARD_WIDTH {
        for y in 0..super::types::BOARD_HEIGHT {
            let cell = Position::new(x, y);
            if player.position.distance(cell) <= weapon.range {
                cells.push(cell);
            }
        }
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::{Side, Weapon};
    use crate::game::world::{GameSetup, PlayerSetup};

    fn p1() -> PlayerId {
        PlayerId::new("player1")
    }

    fn p2() -> PlayerId {
        PlayerId::new("player2")
    }

    fn standard() -> GameState {
        GameState::from_setup(GameSetup::standard()).unwrap()
    }

    fn with_shotgun() -> GameState {
        GameState::from_setup(GameSetup {
            players: vec![
                PlayerSetup::standard("player1", Side::Left, Position::new(2, 1))
                    .wielding(Weapon::standard(WeaponType::Shotgun)),
                PlayerSetup::standard("player2", Side::Right, Position::new(4, 1)),
            ],
        })
        .unwrap()
    }

    #[test]
    fn move_to_adjacent_cell_in_zone() {
        let mut state = standard();

        let res = process_move(&mut state, &p1(), Position::new(2, 1));

        assert!(res.result.success);
        assert_eq!(
            res.result.affected_positions,
            vec![Position::new(1, 1), Position::new(2, 1)]
        );
        assert_eq!(state.player(&p1()).unwrap().position, Position::new(2, 1));
        assert!(matches!(res.events[0], GameEvent::PlayerMoved { .. }));
    }

    #[test]
    fn cross_zone_and_long_moves_rejected() {
        let mut state = standard();
        let before = state.clone();

        let cross = process_move(&mut state, &p1(), Position::new(3, 1));
        let off_board = process_move(&mut state, &p1(), Position::new(1, 3));
        let diagonal = process_move(&mut state, &p1(), Position::new(0, 0));

        assert!(!cross.result.success);
        assert!(!off_board.result.success);
        assert!(!diagonal.result.success);
        assert!(cross.events.is_empty());
        assert_eq!(state, before);
    }

    #[test]
    fn two_step_move_rejected() {
        let mut state = standard();
        state.move_player(&p1(), Position::new(0, 1));

        let res = process_move(&mut state, &p1(), Position::new(2, 1));

        assert!(!res.result.success);
        assert_eq!(res.result.message, "cell (2, 1) is not one step from (0, 1)");
        assert_eq!(state.player(&p1()).unwrap().position, Position::new(0, 1));
    }

    #[test]
    fn occupied_cell_rejected() {
        let mut state = GameState::from_setup(GameSetup {
            players: vec![
                PlayerSetup::standard("player1", Side::Left, Position::new(1, 1)),
                PlayerSetup::standard("player2", Side::Right, Position::new(4, 1)),
                PlayerSetup::standard("player3", Side::Left, Position::new(2, 1)),
            ],
        })
        .unwrap();

        assert!(!can_move(
            &state,
            state.player(&p1()).unwrap(),
            Position::new(2, 1)
        ));
        let res = process_move(&mut state, &p1(), Position::new(2, 1));
        assert_eq!(res.result.message, "cell (2, 1) is occupied");
    }

    #[test]
    fn pistol_hit_scenario() {
        let mut state = standard();

        let res = process_attack(&mut state, &p1(), None);

        assert!(res.result.success);
        assert_eq!(res.result.message, "hit");
        assert_eq!(res.result.damage, Some(20));
        assert_eq!(res.result.affected_positions, vec![Position::new(4, 1)]);
        assert_eq!(state.player(&p2()).unwrap().resources.health, 80);
        assert_eq!(state.player(&p1()).unwrap().resources.ammo, 9);
    }

    #[test]
    fn defending_target_absorbs_with_shield() {
        let mut state = standard();
        process_defend(&mut state, &p1());

        let res = process_attack(&mut state, &p2(), None);

        let target = state.player(&p1()).unwrap();
        assert!(res.result.success);
        assert_eq!(res.result.damage, Some(0));
        assert_eq!(target.resources.health, 100);
        assert_eq!(target.resources.shield, 2);
    }

    #[test]
    fn out_of_ammo_is_a_failure_without_spending() {
        let mut state = standard();
        state.player_mut(&p1()).unwrap().resources.ammo = 0;

        let res = process_attack(&mut state, &p1(), None);

        assert!(!res.result.success);
        assert_eq!(res.result.message, "out of ammo: have 0, need 1");
        assert_eq!(state.player(&p1()).unwrap().resources.ammo, 0);
        assert_eq!(state.player(&p2()).unwrap().resources.health, 100);
        assert!(!can_attack(state.player(&p1()).unwrap()));
    }

    #[test]
    fn area_attack_on_empty_cells_is_a_miss_that_spends_ammo() {
        let mut state = with_shotgun();

        let res = process_attack(&mut state, &p1(), Some(Position::new(3, 0)));

        assert!(res.result.success);
        assert_eq!(res.result.message, "miss");
        assert_eq!(res.result.damage, None);
        assert_eq!(state.player(&p1()).unwrap().resources.ammo, 8);
        assert_eq!(state.player(&p2()).unwrap().resources.health, 100);
    }

    #[test]
    fn area_attack_hits_player_inside_pattern() {
        let mut state = with_shotgun();

        let res = process_attack(&mut state, &p1(), Some(Position::new(3, 1)));

        assert_eq!(res.result.message, "hit");
        assert_eq!(state.player(&p2()).unwrap().resources.health, 85);
        assert!(res
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::DamageDealt { health_damage: 15, .. })));
    }

    #[test]
    fn area_attack_out_of_range_misses() {
        let mut state = GameState::from_setup(GameSetup {
            players: vec![
                PlayerSetup::standard("player1", Side::Left, Position::new(0, 0))
                    .wielding(Weapon::standard(WeaponType::Shotgun)),
                PlayerSetup::standard("player2", Side::Right, Position::new(5, 2)),
            ],
        })
        .unwrap();

        let res = process_attack(&mut state, &p1(), Some(Position::new(5, 2)));

        assert!(res.result.success);
        assert_eq!(res.result.message, "miss");
        assert!(res.result.affected_positions.contains(&Position::new(5, 2)));
        assert_eq!(state.player(&p2()).unwrap().resources.health, 100);
        assert_eq!(state.player(&p1()).unwrap().resources.ammo, 8);
    }

    #[test]
    fn area_attack_without_target_keeps_ammo() {
        let mut state = with_shotgun();

        let res = process_attack(&mut state, &p1(), None);

        assert!(!res.result.success);
        assert_eq!(state.player(&p1()).unwrap().resources.ammo, 10);
    }

    #[test]
    fn unknown_player_rejected() {
        let mut state = standard();
        let ghost = PlayerId::new("ghost");

        assert!(!process_move(&mut state, &ghost, Position::new(0, 0)).result.success);
        assert!(!process_attack(&mut state, &ghost, None).result.success);
        assert!(!process_defend(&mut state, &ghost).result.success);
        assert!(available_actions(&state, &ghost).is_empty());
    }

    #[test]
    fn win_and_draw_detection() {
        let mut state = standard();
        assert_eq!(check_win(&state), None);

        state.player_mut(&p2()).unwrap().resources.health = 0;
        assert_eq!(check_win(&state), Some(Outcome::Winner(p1())));

        state.player_mut(&p1()).unwrap().resources.health = 0;
        assert_eq!(check_win(&state), Some(Outcome::Draw));
    }

    #[test]
    fn queries_follow_current_state() {
        let mut state = standard();

        assert_eq!(
            available_actions(&state, &p1()),
            vec![ActionType::Move, ActionType::Defend, ActionType::Attack]
        );
        assert_eq!(
            available_moves(&state, &p1()),
            vec![
                Position::new(0, 1),
                Position::new(2, 1),
                Position::new(1, 0),
                Position::new(1, 2),
            ]
        );
        assert_eq!(available_targets(&state, &p1()), vec![Position::new(4, 1)]);

        state.player_mut(&p1()).unwrap().resources.ammo = 0;
        assert_eq!(
            available_actions(&state, &p1()),
            vec![ActionType::Move, ActionType::Defend]
        );
        assert!(available_targets(&state, &p1()).is_empty());
    }

    #[test]
    fn area_targets_cover_cells_in_range() {
        let state = with_shotgun();

        let targets = available_targets(&state, &p1());

        assert!(targets.contains(&Position::new(5, 1)));
        assert!(!targets.contains(&Position::new(5, 0)));
        assert!(targets.iter().all(|c| Position::new(2, 1).distance(*c) <= 3));
    }
}
