//! Data model shared by the world state, rules, queue and resolver.
//! Everything here is serializable so observers can consume snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Board width in cells (two 3-wide home zones side by side)
pub const BOARD_WIDTH: i32 = 6;
/// Board height in cells
pub const BOARD_HEIGHT: i32 = 3;

/// Player identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Which half of the board a player lives on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Home zone x in [0, 2]
    Left,
    /// Home zone x in [3, 5]
    Right,
}

impl Side {
    /// Inclusive x-range of this side's home zone
    pub fn x_range(self) -> (i32, i32) {
        match self {
            Side::Left => (0, 2),
            Side::Right => (3, 5),
        }
    }
}

/// Integer grid coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Manhattan distance to another cell
    pub fn distance(self, other: Position) -> u32 {
        self.x.abs_diff(other.x).saturating_add(self.y.abs_diff(other.y))
    }

    /// Shift by `by`, clamping at the edges of `i32`
    pub fn offset(self, by: Position) -> Position {
        Position::new(self.x.saturating_add(by.x), self.y.saturating_add(by.y))
    }

    /// Whether the cell lies on the 6x3 board
    pub fn in_bounds(self) -> bool {
        (0..BOARD_WIDTH).contains(&self.x) && (0..BOARD_HEIGHT).contains(&self.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Player resources. Subtraction always floors at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resources {
    pub health: u32,
    pub shield: u32,
    pub ammo: u32,
}

/// Signed change to apply to [`Resources`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceDelta {
    pub health: i64,
    pub shield: i64,
    pub ammo: i64,
}

/// Weapon types available in the game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeaponType {
    /// Reliable single-cell shot
    Pistol,
    /// Short range spread around a chosen cell
    Shotgun,
    /// Long range single-cell shot
    Sniper,
    /// Cheap, weak single-cell burst
    Machinegun,
}

impl WeaponType {
    /// Point weapons always hit the opponent's current cell
    pub fn is_point(self) -> bool {
        !self.is_area()
    }

    /// Area weapons hit a pattern around a declared cell
    pub fn is_area(self) -> bool {
        matches!(self, WeaponType::Shotgun)
    }
}

impl fmt::Display for WeaponType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WeaponType::Pistol => "pistol",
            WeaponType::Shotgun => "shotgun",
            WeaponType::Sniper => "sniper",
            WeaponType::Machinegun => "machinegun",
        };
        f.write_str(name)
    }
}

/// Weapon definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Weapon {
    pub weapon_type: WeaponType,
    /// Health damage per hit
    pub damage: u32,
    /// Max Manhattan distance from attacker to target cell
    pub range: u32,
    pub ammo_per_shot: u32,
    /// Offsets from the target cell that the shot covers
    pub attack_pattern: Vec<Position>,
}

/// Player state (authoritative)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub side: Side,
    pub position: Position,
    pub resources: Resources,
    pub weapons: Vec<Weapon>,
    pub active_weapon: WeaponType,
    pub is_defending: bool,
}

impl Player {
    /// The weapon matching `active_weapon`, if the player carries one
    pub fn active_weapon(&self) -> Option<&Weapon> {
        self.weapons
            .iter()
            .find(|w| w.weapon_type == self.active_weapon)
    }

    pub fn is_alive(&self) -> bool {
        self.resources.health > 0
    }
}

/// Kinds of action a player can take in a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Move,
    Attack,
    Defend,
}

impl ActionType {
    /// Execution priority within a round; higher resolves first
    pub fn priority(self) -> u8 {
        match self {
            ActionType::Defend => 3,
            ActionType::Attack => 2,
            ActionType::Move => 1,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionType::Move => "move",
            ActionType::Attack => "attack",
            ActionType::Defend => "defend",
        };
        f.write_str(name)
    }
}

/// Action payload, one variant per action type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// Step to an adjacent cell in the home zone
    Move { target: Position },
    /// Fire the active weapon. Area weapons need a target, point weapons ignore it.
    Attack {
        #[serde(default)]
        target: Option<Position>,
    },
    /// Spend the round behind the shield
    Defend,
}

impl ActionKind {
    pub fn action_type(&self) -> ActionType {
        match self {
            ActionKind::Move { .. } => ActionType::Move,
            ActionKind::Attack { .. } => ActionType::Attack,
            ActionKind::Defend => ActionType::Defend,
        }
    }
}

/// A player's submitted action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameAction {
    pub player_id: PlayerId,
    pub kind: ActionKind,
    /// Unix millis at submission
    pub submitted_at: u64,
}

impl GameAction {
    pub fn new(player_id: impl Into<PlayerId>, kind: ActionKind) -> Self {
        Self {
            player_id: player_id.into(),
            kind,
            submitted_at: crate::util::time::unix_millis(),
        }
    }

    pub fn move_to(player_id: impl Into<PlayerId>, target: Position) -> Self {
        Self::new(player_id, ActionKind::Move { target })
    }

    pub fn attack(player_id: impl Into<PlayerId>, target: Option<Position>) -> Self {
        Self::new(player_id, ActionKind::Attack { target })
    }

    pub fn defend(player_id: impl Into<PlayerId>) -> Self {
        Self::new(player_id, ActionKind::Defend)
    }

    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }
}

/// Rendering hint attached to a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Shield,
    Move,
    Explosion,
    Miss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualEffect {
    pub kind: EffectKind,
    pub position: Position,
    pub duration_ms: u32,
}

/// Outcome of resolving (or rejecting) one action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub affected_positions: Vec<Position>,
    /// Health damage dealt, present only when something was hit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub damage: Option<u32>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visual_effects: Option<Vec<VisualEffect>>,
}

impl ActionResult {
    pub fn success(message: impl Into<String>, affected_positions: Vec<Position>) -> Self {
        Self {
            success: true,
            affected_positions,
            damage: None,
            message: message.into(),
            visual_effects: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            affected_positions: Vec::new(),
            damage: None,
            message: message.into(),
            visual_effects: None,
        }
    }

    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = Some(damage);
        self
    }

    pub fn with_effects(mut self, effects: Vec<VisualEffect>) -> Self {
        self.visual_effects = Some(effects);
        self
    }
}

/// Terrain type of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerrainKind {
    #[default]
    Empty,
    Cover,
    Damage,
    Bonus,
}

/// Terrain of one cell. Carried in snapshots, not used by resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Terrain {
    pub kind: TerrainKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effect: Option<i32>,
}

/// Decided result of the match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "player", rename_all = "snake_case")]
pub enum Outcome {
    Winner(PlayerId),
    Draw,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Winner(id) => write!(f, "winner {id}"),
            Outcome::Draw => f.write_str("draw"),
        }
    }
}
