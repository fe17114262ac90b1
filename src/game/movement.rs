//! Grid movement - home zones and single-step adjacency

use super::types::{Position, Side, BOARD_HEIGHT};

/// Orthogonal single-step offsets
const STEPS: [Position; 4] = [
    Position::new(-1, 0),
    Position::new(1, 0),
    Position::new(0, -1),
    Position::new(0, 1),
];

/// Whether `pos` lies inside the home zone of `side`
pub fn in_home_zone(side: Side, pos: Position) -> bool {
    let (min_x, max_x) = side.x_range();
    (min_x..=max_x).contains(&pos.x) && (0..BOARD_HEIGHT).contains(&pos.y)
}

/// Geometric legality of a step, ignoring occupancy
pub fn is_legal_step(side: Side, from: Position, to: Position) -> bool {
    in_home_zone(side, to) && from.distance(to) == 1
}

/// The four orthogonal neighbours of a cell, in a fixed order
pub fn neighbours(pos: Position) -> impl Iterator<Item = Position> {
    STEPS.into_iter().map(move |step| pos.offset(step))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_zones_are_disjoint_halves() {
        assert!(in_home_zone(Side::Left, Position::new(2, 2)));
        assert!(!in_home_zone(Side::Left, Position::new(3, 0)));
        assert!(in_home_zone(Side::Right, Position::new(3, 0)));
        assert!(!in_home_zone(Side::Right, Position::new(2, 1)));
        assert!(!in_home_zone(Side::Right, Position::new(4, 3)));
    }

    #[test]
    fn only_orthogonal_single_steps() {
        let from = Position::new(1, 1);
        assert!(is_legal_step(Side::Left, from, Position::new(2, 1)));
        assert!(is_legal_step(Side::Left, from, Position::new(1, 0)));
        assert!(!is_legal_step(Side::Left, from, Position::new(2, 2)));
        assert!(!is_legal_step(Side::Left, from, Position::new(1, 1)));
        assert!(!is_legal_step(Side::Left, Position::new(0, 1), Position::new(2, 1)));
    }

    #[test]
    fn cross_zone_step_is_illegal() {
        assert!(!is_legal_step(
            Side::Left,
            Position::new(2, 1),
            Position::new(3, 1)
        ));
    }

    #[test]
    fn neighbours_in_fixed_order() {
        let cells: Vec<_> = neighbours(Position::new(1, 1)).collect();
        assert_eq!(
            cells,
            vec![
                Position::new(0, 1),
                Position::new(2, 1),
                Position::new(1, 0),
                Position::new(1, 2),
            ]
        );
    }
}
