//! Combat system - weapons, damage, target resolution

use super::rules::ActionError;
use super::types::{Player, PlayerId, Position, Weapon, WeaponType};

/// How long explosion/miss hints should stay on screen
pub const IMPACT_EFFECT_MS: u32 = 800;

impl Weapon {
    /// Standard stats per weapon type
    pub fn standard(weapon_type: WeaponType) -> Self {
        let single = vec![Position::new(0, 0)];
        match weapon_type {
            WeaponType::Pistol => Self {
                weapon_type,
                damage: 20,
                range: 5,
                ammo_per_shot: 1,
                attack_pattern: single,
            },
            WeaponType::Shotgun => Self {
                weapon_type,
                damage: 15,
                range: 3,
                ammo_per_shot: 2,
                attack_pattern: vec![
                    Position::new(0, 0),
                    Position::new(1, 0),
                    Position::new(-1, 0),
                    Position::new(0, 1),
                    Position::new(0, -1),
                ],
            },
            WeaponType::Sniper => Self {
                weapon_type,
                damage: 40,
                range: 7,
                ammo_per_shot: 2,
                attack_pattern: single,
            },
            WeaponType::Machinegun => Self {
                weapon_type,
                damage: 10,
                range: 4,
                ammo_per_shot: 3,
                attack_pattern: single,
            },
        }
    }
}

/// Cells an attack covers and whether its aim point is reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackPlan {
    /// Cell the range check is measured against
    pub aim: Position,
    /// In-bounds cells covered by the shot
    pub cells: Vec<Position>,
    pub in_range: bool,
}

/// Work out which cells an attack covers.
///
/// Point weapons ignore `declared` and aim at the opponent's live cell.
/// Area weapons require an on-board `declared` cell and cover
/// `declared + offset` for every pattern offset that stays on the board.
pub fn resolve_attack_targets(
    attacker: &Player,
    weapon: &Weapon,
    opponent_position: Option<Position>,
    declared: Option<Position>,
) -> Result<AttackPlan, ActionError> {
    let aim = if weapon.weapon_type.is_point() {
        opponent_position.ok_or(ActionError::NoOpponent)?
    } else {
        let target = declared.ok_or(ActionError::MissingTarget(weapon.weapon_type))?;
        if !target.in_bounds() {
            return Err(ActionError::OffBoard(target));
        }
        target
    };

    let cells = if weapon.weapon_type.is_point() {
        vec![aim]
    } else {
        weapon
            .attack_pattern
            .iter()
            .map(|offset| aim.offset(*offset))
            .filter(|cell| cell.in_bounds())
            .collect()
    };

    Ok(AttackPlan {
        aim,
        cells,
        in_range: attacker.position.distance(aim) <= weapon.range,
    })
}

/// Result of applying one hit to a player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitResult {
    pub target_id: PlayerId,
    /// Health actually removed
    pub health_damage: u32,
    /// Shield points consumed by a block
    pub shield_absorbed: u32,
    pub target_killed: bool,
}

/// Apply a hit. A defending player with shield left loses exactly one
/// shield point and no health; anyone else loses `raw_damage` health,
/// floored at 0.
pub fn apply_damage(target: &mut Player, raw_damage: u32) -> HitResult {
    if target.is_defending && target.resources.shield > 0 {
        target.resources.shield -= 1;
        return HitResult {
            target_id: target.id.clone(),
            health_damage: 0,
            shield_absorbed: 1,
            target_killed: false,
        };
    }

    let before = target.resources.health;
    target.resources.health = before.saturating_sub(raw_damage);
    HitResult {
        target_id: target.id.clone(),
        health_damage: before - target.resources.health,
        shield_absorbed: 0,
        target_killed: before > 0 && target.resources.health == 0,
    }
}
