// Straight-line character movement.
//
// A character walks from `from` towards its next waypoint one tile per
// block. The axis with the longer span advances by exactly one; the other
// coordinate is recomputed from the line's slope relative to `from`,
// rounded to nearest with ties away from zero. Recomputing from the anchor
// (instead of accumulating per-step offsets) keeps the path identical no
// matter how many blocks it takes.
//
// If the next tile is not walkable the character stops and forgets its
// waypoints. Facing only changes when the tile actually changes.
//
// **Critical constraint: determinism.** Integer arithmetic only; division
// truncates towards zero as Rust's `/` on signed integers does.

use crate::map::GameMap;
use crate::state::CharacterState;
use crate::types::Coord;

fn coord_step(x: i32, target: i32) -> i32 {
    match x.cmp(&target) {
        std::cmp::Ordering::Less => x + 1,
        std::cmp::Ordering::Greater => x - 1,
        std::cmp::Ordering::Equal => x,
    }
}

/// Dependent coordinate `v` for reference coordinate `u` on the line from
/// `(from_u, from_v)` with spans `du` (the longer one) and `dv`.
fn coord_upd(u: i32, v: i32, du: i32, dv: i32, from_u: i32, from_v: i32) -> i32 {
    if dv == 0 {
        return v;
    }
    let tmp = (u - from_u) * dv;
    let res = (tmp.abs() + du.abs() / 2) / du;
    if tmp < 0 { from_v - res } else { from_v + res }
}

/// Numpad direction of a single step from `from` to `to` (5 = no move).
pub fn direction(from: Coord, to: Coord) -> u8 {
    let dx = (to.x - from.x).clamp(-1, 1);
    let dy = (to.y - from.y).clamp(-1, 1);
    ((1 - dy) * 3 + dx + 2) as u8
}

impl CharacterState {
    pub fn stop_moving(&mut self) {
        self.from = self.coord;
        self.waypoints.clear();
    }

    /// Drop waypoints the character is already standing on.
    fn pop_reached_waypoints(&mut self) {
        while self.waypoints.last() == Some(&self.coord) {
            self.waypoints.pop();
        }
    }

    /// Take one step towards the next waypoint.
    pub fn move_towards_waypoint(&mut self, map: &GameMap) {
        if self.waypoints.last() == Some(&self.coord) {
            self.from = self.coord;
            self.pop_reached_waypoints();
        }
        let Some(&target) = self.waypoints.last() else {
            self.from = self.coord;
            return;
        };

        let dx = target.x - self.from.x;
        let dy = target.y - self.from.y;
        let next = if dx.abs() > dy.abs() {
            let x = coord_step(self.coord.x, target.x);
            Coord::new(x, coord_upd(x, self.coord.y, dx, dy, self.from.x, self.from.y))
        } else {
            let y = coord_step(self.coord.y, target.y);
            Coord::new(coord_upd(y, self.coord.x, dy, dx, self.from.y, self.from.x), y)
        };

        if !map.is_walkable(next) {
            self.stop_moving();
            return;
        }
        let dir = direction(self.coord, next);
        if dir != 5 {
            self.dir = dir;
        }
        self.coord = next;
        if self.coord == target {
            self.from = self.coord;
            self.pop_reached_waypoints();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::small_layout;

    fn walker(at: Coord, path_in_travel_order: &[Coord]) -> CharacterState {
        let mut ch = CharacterState::new(at, 2);
        ch.waypoints = path_in_travel_order.iter().rev().copied().collect();
        ch
    }

    fn map() -> GameMap {
        GameMap::new(small_layout()).unwrap()
    }

    #[test]
    fn directions_follow_numpad() {
        let c = Coord::new(5, 5);
        assert_eq!(direction(c, Coord::new(5, 6)), 2);
        assert_eq!(direction(c, Coord::new(5, 4)), 8);
        assert_eq!(direction(c, Coord::new(4, 5)), 4);
        assert_eq!(direction(c, Coord::new(6, 5)), 6);
        assert_eq!(direction(c, Coord::new(6, 6)), 3);
        assert_eq!(direction(c, Coord::new(4, 4)), 7);
        assert_eq!(direction(c, Coord::new(9, 0)), 9);
        assert_eq!(direction(c, c), 5);
    }

    #[test]
    fn slope_rounding() {
        // Line from (0,0) to (4,1): y stays 0 until x = 2, where 0.5 rounds up.
        assert_eq!(coord_upd(1, 0, 4, 1, 0, 0), 0);
        assert_eq!(coord_upd(2, 0, 4, 1, 0, 0), 1);
        // Same line walked backwards keeps the symmetric rounding.
        assert_eq!(coord_upd(-2, 0, -4, -1, 0, 0), -1);
        assert_eq!(coord_upd(-1, 0, -4, -1, 0, 0), 0);
        // Mixed signs.
        assert_eq!(coord_upd(-2, 0, -4, 1, 0, 0), 1);
        assert_eq!(coord_upd(2, 0, 4, -1, 0, 0), -1);
    }

    #[test]
    fn no_waypoints_stays_put() {
        let mut ch = walker(Coord::new(3, 3), &[]);
        ch.from = Coord::new(1, 1);
        ch.move_towards_waypoint(&map());
        assert_eq!(ch.coord, Coord::new(3, 3));
        assert_eq!(ch.from, Coord::new(3, 3));
        assert_eq!(ch.dir, 2);
    }

    #[test]
    fn waypoint_on_current_tile_is_cleared() {
        let mut ch = walker(Coord::new(3, 3), &[Coord::new(3, 3)]);
        ch.move_towards_waypoint(&map());
        assert_eq!(ch.coord, Coord::new(3, 3));
        assert!(ch.waypoints.is_empty());
    }

    #[test]
    fn walks_diagonal_line() {
        let map = map();
        let mut ch = walker(Coord::new(2, 2), &[Coord::new(8, 5)]);
        let mut path = Vec::new();
        while !ch.waypoints.is_empty() {
            ch.move_towards_waypoint(&map);
            path.push(ch.coord);
        }
        assert_eq!(
            path,
            vec![
                Coord::new(3, 3),
                Coord::new(4, 3),
                Coord::new(5, 4),
                Coord::new(6, 4),
                Coord::new(7, 5),
                Coord::new(8, 5),
            ]
        );
        assert_eq!(ch.from, Coord::new(8, 5));
        assert_eq!(ch.dir, 6);
    }

    #[test]
    fn continues_to_next_waypoint() {
        let map = map();
        let mut ch = walker(Coord::new(2, 2), &[Coord::new(3, 2), Coord::new(3, 4)]);
        ch.move_towards_waypoint(&map);
        assert_eq!(ch.coord, Coord::new(3, 2));
        assert_eq!(ch.waypoints, vec![Coord::new(3, 4)]);
        ch.move_towards_waypoint(&map);
        assert_eq!(ch.coord, Coord::new(3, 3));
        assert_eq!(ch.dir, 2);
    }

    #[test]
    fn blocked_tile_stops_movement() {
        let mut layout = small_layout();
        layout.obstacles.push(Coord::new(4, 3));
        let map = GameMap::new(layout).unwrap();
        let mut ch = walker(Coord::new(3, 3), &[Coord::new(6, 3)]);
        ch.move_towards_waypoint(&map);
        assert_eq!(ch.coord, Coord::new(3, 3));
        assert!(ch.waypoints.is_empty());
        assert_eq!(ch.from, ch.coord);
    }
}
