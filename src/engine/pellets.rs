use std::collections::BTreeMap;

use crate::maze::Maze;
use crate::types::{CellKind, Position};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Consumed {
    pub kind: CellKind,
    pub points: u32,
}

/// Remaining pellets of the current level. The count only ever goes down.
#[derive(Clone, Debug)]
pub struct PelletTracker {
    remaining: BTreeMap<Position, CellKind>,
    total: usize,
    pellet_points: u32,
    power_pellet_points: u32,
}

impl PelletTracker {
    pub fn new(maze: &Maze, pellet_points: u32, power_pellet_points: u32) -> Self {
        let remaining: BTreeMap<Position, CellKind> = maze.pellet_cells().collect();
        let total = remaining.len();
        Self {
            remaining,
            total,
            pellet_points,
            power_pellet_points,
        }
    }

    /// Eats whatever pellet sits at `pos`. Empty cells yield `None`.
    pub fn consume(&mut self, pos: Position) -> Option<Consumed> {
        let kind = self.remaining.remove(&pos)?;
        let points = match kind {
            CellKind::PowerPellet => self.power_pellet_points,
            _ => self.pellet_points,
        };
        Some(Consumed { kind, points })
    }

    pub fn kind_at(&self, pos: Position) -> Option<CellKind> {
        self.remaining.get(&pos).copied()
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn is_cleared(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Share of the level's pellets already eaten, in `[0, 1]`.
    pub fn cleared_ratio(&self) -> f32 {
        if self.total == 0 {
            return 1.0;
        }
        (self.total - self.remaining.len()) as f32 / self.total as f32
    }

    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.remaining.keys().copied()
    }
}
