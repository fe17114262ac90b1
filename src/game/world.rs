//! World state - the authoritative snapshot mutated by the resolver

use serde::{Deserialize, Serialize};

use super::movement::in_home_zone;
use super::types::{
    ActionResult, GameAction, Outcome, Player, PlayerId, Position, ResourceDelta, Resources, Side,
    Terrain, Weapon, WeaponType, BOARD_HEIGHT, BOARD_WIDTH,
};

/// Starting configuration for one player
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSetup {
    pub id: PlayerId,
    pub side: Side,
    pub position: Position,
    pub resources: Resources,
    pub weapons: Vec<Weapon>,
    pub active_weapon: WeaponType,
}

impl PlayerSetup {
    /// Health 100, shield 3, ammo 10, pistol in hand
    pub fn standard(id: impl Into<PlayerId>, side: Side, position: Position) -> Self {
        Self {
            id: id.into(),
            side,
            position,
            resources: Resources {
                health: 100,
                shield: 3,
                ammo: 10,
            },
            weapons: vec![Weapon::standard(WeaponType::Pistol)],
            active_weapon: WeaponType::Pistol,
        }
    }

    /// Add a weapon to the loadout and make it the active one
    pub fn wielding(mut self, weapon: Weapon) -> Self {
        self.active_weapon = weapon.weapon_type;
        self.weapons.retain(|w| w.weapon_type != weapon.weapon_type);
        self.weapons.push(weapon);
        self
    }

    fn into_player(self) -> Player {
        Player {
            id: self.id,
            side: self.side,
            position: self.position,
            resources: self.resources,
            weapons: self.weapons,
            active_weapon: self.active_weapon,
            is_defending: false,
        }
    }
}

/// Match opening: the players in registration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    pub players: Vec<PlayerSetup>,
}

impl GameSetup {
    /// `player1` at (1,1) facing `player2` at (4,1), both with pistols
    pub fn standard() -> Self {
        Self {
            players: vec![
                PlayerSetup::standard("player1", Side::Left, Position::new(1, 1)),
                PlayerSetup::standard("player2", Side::Right, Position::new(4, 1)),
            ],
        }
    }
}

impl Default for GameSetup {
    fn default() -> Self {
        Self::standard()
    }
}

/// Setup validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
    #[error("a match needs at least two players, got {0}")]
    TooFewPlayers(usize),

    #[error("duplicate player id: {0}")]
    DuplicatePlayer(PlayerId),

    #[error("player {id} starts outside their home zone at {position}")]
    OutsideHomeZone { id: PlayerId, position: Position },

    #[error("players share the starting cell {0}")]
    SharedCell(Position),
}

/// One executed action with its result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub round: u32,
    pub action: GameAction,
    pub result: ActionResult,
}

/// Authoritative game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Players in registration order
    pub players: Vec<Player>,
    /// Indexed `[x][y]`
    pub terrain: Vec<Vec<Terrain>>,
    pub current_round: u32,
    pub action_history: Vec<HistoryEntry>,
    /// Set once `check_win` has decided the match
    pub outcome: Option<Outcome>,
}

impl GameState {
    pub fn from_setup(setup: GameSetup) -> Result<Self, SetupError> {
        if setup.players.len() < 2 {
            return Err(SetupError::TooFewPlayers(setup.players.len()));
        }

        let mut players: Vec<Player> = Vec::with_capacity(setup.players.len());
        for entry in setup.players {
            if players.iter().any(|p| p.id == entry.id) {
                return Err(SetupError::DuplicatePlayer(entry.id));
            }
            if !in_home_zone(entry.side, entry.position) {
                return Err(SetupError::OutsideHomeZone {
                    id: entry.id,
                    position: entry.position,
                });
            }
            if players.iter().any(|p| p.position == entry.position) {
                return Err(SetupError::SharedCell(entry.position));
            }
            players.push(entry.into_player());
        }

        Ok(Self {
            players,
            terrain: vec![vec![Terrain::default(); BOARD_HEIGHT as usize]; BOARD_WIDTH as usize],
            current_round: 1,
            action_history: Vec::new(),
            outcome: None,
        })
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn player_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| &p.id == id)
    }

    /// First registered player other than `id`
    pub fn opponent_of(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id != id)
    }

    pub fn occupant(&self, pos: Position) -> Option<&Player> {
        self.players.iter().find(|p| p.position == pos)
    }

    pub fn is_occupied(&self, pos: Position) -> bool {
        self.occupant(pos).is_some()
    }

    pub fn move_player(&mut self, id: &PlayerId, to: Position) {
        if let Some(player) = self.player_mut(id) {
            player.position = to;
        }
    }

    /// Clear every player's defend flag
    pub fn reset_defense(&mut self) {
        for player in &mut self.players {
            player.is_defending = false;
        }
    }

    /// Add signed deltas to a player's resources, clamping each at 0
    pub fn adjust_resources(&mut self, id: &PlayerId, delta: ResourceDelta) -> Option<Resources> {
        fn apply(value: u32, delta: i64) -> u32 {
            (i64::from(value) + delta).clamp(0, i64::from(u32::MAX)) as u32
        }

        let player = self.player_mut(id)?;
        let r = &mut player.resources;
        r.health = apply(r.health, delta.health);
        r.shield = apply(r.shield, delta.shield);
        r.ammo = apply(r.ammo, delta.ammo);
        Some(*r)
    }

    /// Terrain at a cell; off-board cells read as empty
    pub fn terrain_at(&self, pos: Position) -> Terrain {
        if !pos.in_bounds() {
            return Terrain::default();
        }
        self.terrain[pos.x as usize][pos.y as usize]
    }

    /// Returns false when `pos` is off the board
    pub fn set_terrain(&mut self, pos: Position, terrain: Terrain) -> bool {
        if !pos.in_bounds() {
            return false;
        }
        self.terrain[pos.x as usize][pos.y as usize] = terrain;
        true
    }

    pub fn record(&mut self, action: GameAction, result: ActionResult) {
        self.action_history.push(HistoryEntry {
            round: self.current_round,
            action,
            result,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::types::TerrainKind;

    #[test]
    fn standard_opening() {
        let state = GameState::from_setup(GameSetup::standard()).unwrap();

        assert_eq!(state.current_round, 1);
        assert_eq!(state.players.len(), 2);
        let p1 = state.player(&"player1".into()).unwrap();
        assert_eq!(p1.position, Position::new(1, 1));
        assert_eq!(p1.resources.health, 100);
        assert_eq!(p1.resources.shield, 3);
        assert_eq!(p1.resources.ammo, 10);
        assert_eq!(p1.active_weapon().unwrap().damage, 20);
        assert_eq!(
            state.opponent_of(&"player1".into()).unwrap().id,
            PlayerId::new("player2")
        );
    }

    #[test]
    fn rejects_bad_setups() {
        let mut setup = GameSetup::standard();
        setup.players.truncate(1);
        assert_eq!(
            GameState::from_setup(setup),
            Err(SetupError::TooFewPlayers(1))
        );

        let mut setup = GameSetup::standard();
        setup.players[1].id = "player1".into();
        assert!(matches!(
            GameState::from_setup(setup),
            Err(SetupError::DuplicatePlayer(_))
        ));

        let mut setup = GameSetup::standard();
        setup.players[0].position = Position::new(4, 0);
        assert!(matches!(
            GameState::from_setup(setup),
            Err(SetupError::OutsideHomeZone { .. })
        ));
    }

    #[test]
    fn adjust_resources_clamps_at_zero() {
        let mut state = GameState::from_setup(GameSetup::standard()).unwrap();
        let id = PlayerId::new("player2");

        let after = state
            .adjust_resources(
                &id,
                ResourceDelta {
                    health: -250,
                    shield: 2,
                    ammo: -3,
                },
            )
            .unwrap();

        assert_eq!(after.health, 0);
        assert_eq!(after.shield, 5);
        assert_eq!(after.ammo, 7);
        assert!(state
            .adjust_resources(&"nobody".into(), ResourceDelta::default())
            .is_none());
    }

    #[test]
    fn terrain_grid_defaults_to_empty() {
        let mut state = GameState::from_setup(GameSetup::standard()).unwrap();
        let cover = Terrain {
            kind: TerrainKind::Cover,
            effect: Some(1),
        };

        assert_eq!(state.terrain_at(Position::new(5, 2)), Terrain::default());
        assert!(state.set_terrain(Position::new(5, 2), cover));
        assert_eq!(state.terrain_at(Position::new(5, 2)), cover);
        assert!(!state.set_terrain(Position::new(6, 0), cover));
    }

    #[test]
    fn wielding_replaces_active_weapon() {
        let setup = PlayerSetup::standard("player1", Side::Left, Position::new(0, 0))
            .wielding(Weapon::standard(WeaponType::Shotgun));

        assert_eq!(setup.active_weapon, WeaponType::Shotgun);
        assert_eq!(setup.weapons.len(), 2);
    }
}
