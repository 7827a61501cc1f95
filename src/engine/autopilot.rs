use std::collections::{HashMap, HashSet, VecDeque};

use crate::maze::Maze;
use crate::types::{Direction, Position, PursuerState};

use super::GameEngine;

/// First move of a shortest path from `from` to the nearest cell accepted by
/// `is_goal`, never entering `avoid`. Neighbours are expanded in tie-break
/// priority order, so equal routes always resolve the same way.
pub fn first_step_towards(
    maze: &Maze,
    from: Position,
    is_goal: impl Fn(Position) -> bool,
    avoid: &HashSet<Position>,
) -> Option<Direction> {
    let mut first_move: HashMap<Position, Direction> = HashMap::new();
    let mut visited: HashSet<Position> = HashSet::new();
    let mut queue = VecDeque::new();
    visited.insert(from);
    queue.push_back(from);

    while let Some(cell) = queue.pop_front() {
        if cell != from && is_goal(cell) {
            return first_move.get(&cell).copied();
        }
        for (dir, next) in maze.neighbors(cell) {
            if !maze.is_traversable(next) || avoid.contains(&next) || !visited.insert(next) {
                continue;
            }
            let origin = if cell == from {
                dir
            } else {
                first_move.get(&cell).copied().unwrap_or(dir)
            };
            first_move.insert(next, origin);
            queue.push_back(next);
        }
    }
    None
}

impl GameEngine {
    /// Direction a simple bot would press right now: the nearest pellet,
    /// keeping clear of cells next to chasing pursuers when it can.
    pub fn autopilot_direction(&self) -> Direction {
        let from = self.player.position;
        let is_pellet = |cell: Position| self.pellets.kind_at(cell).is_some();

        let mut danger = HashSet::new();
        for pursuer in &self.pursuers {
            if pursuer.state != PursuerState::Chasing {
                continue;
            }
            danger.insert(pursuer.position);
            for (_, next) in self.maze.neighbors(pursuer.position) {
                danger.insert(next);
            }
        }
        danger.remove(&from);

        if let Some(dir) = first_step_towards(&self.maze, from, is_pellet, &danger) {
            return dir;
        }
        first_step_towards(&self.maze, from, is_pellet, &HashSet::new()).unwrap_or(Direction::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = concat!(
        "#######\n",
        "#.....#\n",
        "#.###.#\n",
        "#..P..#\n",
        "#######\n",
    );

    #[test]
    fn finds_the_shortest_route() {
        let maze = Maze::parse_with_roster(FIXTURE, 0).expect("fixture is valid");
        let goal = Position::new(1, 5);
        let dir = first_step_towards(&maze, maze.player_start(), |cell| cell == goal, &HashSet::new());
        assert_eq!(dir, Some(Direction::Right));
    }

    #[test]
    fn equal_routes_follow_priority_order() {
        let maze = Maze::parse_with_roster(FIXTURE, 0).expect("fixture is valid");
        let goal = Position::new(1, 3);
        // Both ways round the block take six steps; Left is expanded first.
        let dir = first_step_towards(&maze, maze.player_start(), |cell| cell == goal, &HashSet::new());
        assert_eq!(dir, Some(Direction::Left));
    }

    #[test]
    fn avoided_cells_force_a_detour() {
        let maze = Maze::parse_with_roster(FIXTURE, 0).expect("fixture is valid");
        let goal = Position::new(1, 3);
        let avoid: HashSet<Position> = [Position::new(3, 2)].into_iter().collect();
        let dir = first_step_towards(&maze, maze.player_start(), |cell| cell == goal, &avoid);
        assert_eq!(dir, Some(Direction::Right));
    }

    #[test]
    fn unreachable_goal_yields_none() {
        let maze = Maze::parse_with_roster(FIXTURE, 0).expect("fixture is valid");
        let dir = first_step_towards(&maze, maze.player_start(), |_| false, &HashSet::new());
        assert_eq!(dir, None);
    }
}
