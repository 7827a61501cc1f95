use crate::maze::Maze;
use crate::types::{Direction, PlayerView, Position};

#[derive(Clone, Debug)]
pub struct PlayerAgent {
    pub position: Position,
    pub facing: Direction,
    pub queued: Direction,
    spawn: Position,
}

impl PlayerAgent {
    pub fn new(spawn: Position) -> Self {
        Self {
            position: spawn,
            facing: Direction::None,
            queued: Direction::None,
            spawn,
        }
    }

    pub fn set_queued(&mut self, dir: Direction) {
        self.queued = dir;
    }

    /// One due step. A queued turn wins when its cell is open, otherwise the
    /// agent keeps its facing; blocked both ways it stays put.
    /// Returns the new cell when the agent moved.
    pub fn step(&mut self, maze: &Maze) -> Option<Position> {
        if self.queued != Direction::None {
            let next = self.position.offset(self.queued);
            if maze.is_traversable(next) {
                self.facing = self.queued;
                self.queued = Direction::None;
                self.position = next;
                return Some(next);
            }
        }
        if self.facing == Direction::None {
            return None;
        }
        let next = self.position.offset(self.facing);
        if !maze.is_traversable(next) {
            return None;
        }
        self.position = next;
        Some(next)
    }

    pub fn reset(&mut self) {
        self.position = self.spawn;
        self.facing = Direction::None;
        self.queued = Direction::None;
    }

    pub fn view(&self) -> PlayerView {
        PlayerView {
            row: self.position.row,
            col: self.position.col,
            facing: self.facing,
            queued: self.queued,
        }
    }
}
