use std::collections::{HashSet, VecDeque};

use crate::constants::{CLASSIC_MAZE, HOME_CORNER_INSET, MAX_PURSUERS};
use crate::error::ConfigurationError;
use crate::types::{CellKind, Direction, MazeInit, Position};

/// Immutable grid of cell kinds plus the anchors derived from the maze text.
/// Pellet consumption is tracked elsewhere; the grid itself never changes.
#[derive(Clone, Debug)]
pub struct Maze {
    rows: i32,
    cols: i32,
    cells: Vec<CellKind>,
    player_start: Position,
    pursuer_spawns: Vec<Position>,
    house_cell: Option<Position>,
}

impl Maze {
    /// Parses a maze with the full roster of four pursuer spawns.
    pub fn parse(text: &str) -> Result<Self, ConfigurationError> {
        Self::parse_with_roster(text, MAX_PURSUERS)
    }

    /// Built-in 19x19 layout with a central pursuer house.
    pub fn classic() -> Result<Self, ConfigurationError> {
        Self::parse(CLASSIC_MAZE)
    }

    /// Parses a maze that must contain exactly `pursuer_count` spawns.
    ///
    /// Markers: `#` wall, `.` pellet, `*` power pellet, ` ` empty,
    /// `H` house interior, `P` player start (empty), `G` pursuer spawn
    /// (house interior).
    pub fn parse_with_roster(text: &str, pursuer_count: usize) -> Result<Self, ConfigurationError> {
        if pursuer_count > MAX_PURSUERS {
            return Err(ConfigurationError::PursuerSpawnCount {
                expected: MAX_PURSUERS,
                found: pursuer_count,
            });
        }

        let lines = trimmed_lines(text);
        let Some(first) = lines.first() else {
            return Err(ConfigurationError::EmptyMaze);
        };
        let width = first.chars().count();
        if width == 0 {
            return Err(ConfigurationError::EmptyMaze);
        }

        let mut cells = Vec::with_capacity(width * lines.len());
        let mut player_start: Option<Position> = None;
        let mut pursuer_spawns = Vec::new();
        for (row, line) in lines.iter().enumerate() {
            let found = line.chars().count();
            if found != width {
                return Err(ConfigurationError::RaggedRow {
                    row,
                    expected: width,
                    found,
                });
            }
            for (col, marker) in line.chars().enumerate() {
                let pos = Position::new(row as i32, col as i32);
                let kind = match marker {
                    '#' => CellKind::Wall,
                    '.' => CellKind::Pellet,
                    '*' => CellKind::PowerPellet,
                    ' ' => CellKind::Empty,
                    'H' => CellKind::HouseInterior,
                    'P' => {
                        if player_start.is_some() {
                            return Err(ConfigurationError::DuplicatePlayerStart { row, col });
                        }
                        player_start = Some(pos);
                        CellKind::Empty
                    }
                    'G' => {
                        pursuer_spawns.push(pos);
                        CellKind::HouseInterior
                    }
                    _ => return Err(ConfigurationError::UnknownMarker { row, col, marker }),
                };
                cells.push(kind);
            }
        }

        let rows = lines.len();
        for row in 0..rows {
            for col in 0..width {
                let on_border = row == 0 || col == 0 || row == rows - 1 || col == width - 1;
                if on_border && cells[row * width + col] != CellKind::Wall {
                    return Err(ConfigurationError::OpenBorder { row, col });
                }
            }
        }

        let Some(player_start) = player_start else {
            return Err(ConfigurationError::MissingPlayerStart);
        };
        if pursuer_spawns.len() != pursuer_count {
            return Err(ConfigurationError::PursuerSpawnCount {
                expected: pursuer_count,
                found: pursuer_spawns.len(),
            });
        }

        let mut maze = Maze {
            rows: rows as i32,
            cols: width as i32,
            cells,
            player_start,
            pursuer_spawns,
            house_cell: None,
        };

        let pellets: Vec<Position> = maze.pellet_cells().map(|(pos, _)| pos).collect();
        if pellets.is_empty() {
            return Err(ConfigurationError::NoPellets);
        }
        let reachable = build_reachable_cells(&maze, maze.player_start);
        if let Some(pos) = pellets.iter().find(|pos| !reachable.contains(pos)) {
            return Err(ConfigurationError::UnreachablePellet {
                row: pos.row as usize,
                col: pos.col as usize,
            });
        }

        maze.house_cell = find_house_cell(&maze);
        Ok(maze)
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.row >= 0 && pos.col >= 0 && pos.row < self.rows && pos.col < self.cols
    }

    /// Out-of-bounds positions read as walls.
    pub fn cell_at(&self, pos: Position) -> CellKind {
        if !self.in_bounds(pos) {
            return CellKind::Wall;
        }
        self.cells[(pos.row * self.cols + pos.col) as usize]
    }

    pub fn is_traversable(&self, pos: Position) -> bool {
        self.in_bounds(pos) && self.cell_at(pos) != CellKind::Wall
    }

    /// In-bounds cardinal neighbours in tie-break priority order. Walls are
    /// included; filtering them is up to the caller.
    pub fn neighbors(&self, pos: Position) -> Vec<(Direction, Position)> {
        Direction::PRIORITY
            .iter()
            .map(|dir| (*dir, pos.offset(*dir)))
            .filter(|(_, next)| self.in_bounds(*next))
            .collect()
    }

    pub fn player_start(&self) -> Position {
        self.player_start
    }

    pub fn pursuer_spawns(&self) -> &[Position] {
        &self.pursuer_spawns
    }

    /// Where captured pursuers wait for their respawn. `None` only for mazes
    /// without pursuers.
    pub fn house_cell(&self) -> Option<Position> {
        self.house_cell
    }

    /// Flee anchor of roster slot `slot`: top-right, top-left, bottom-right,
    /// bottom-left, each inset from the border.
    pub fn home_corner(&self, slot: usize) -> Position {
        let top = HOME_CORNER_INSET.min(self.rows - 1);
        let bottom = (self.rows - 1 - HOME_CORNER_INSET).max(0);
        let left = HOME_CORNER_INSET.min(self.cols - 1);
        let right = (self.cols - 1 - HOME_CORNER_INSET).max(0);
        match slot % 4 {
            0 => Position::new(top, right),
            1 => Position::new(top, left),
            2 => Position::new(bottom, right),
            _ => Position::new(bottom, left),
        }
    }

    /// Pellet and power-pellet cells in row-major order.
    pub fn pellet_cells(&self) -> impl Iterator<Item = (Position, CellKind)> + '_ {
        self.cells.iter().enumerate().filter_map(move |(idx, kind)| {
            if matches!(kind, CellKind::Pellet | CellKind::PowerPellet) {
                let idx = idx as i32;
                Some((Position::new(idx / self.cols, idx % self.cols), *kind))
            } else {
                None
            }
        })
    }

    /// Renders the maze back into its text form, markers included.
    pub fn tiles(&self) -> Vec<String> {
        (0..self.rows)
            .map(|row| {
                (0..self.cols)
                    .map(|col| {
                        let pos = Position::new(row, col);
                        if pos == self.player_start {
                            return 'P';
                        }
                        if self.pursuer_spawns.contains(&pos) {
                            return 'G';
                        }
                        match self.cell_at(pos) {
                            CellKind::Wall => '#',
                            CellKind::Pellet => '.',
                            CellKind::PowerPellet => '*',
                            CellKind::Empty => ' ',
                            CellKind::HouseInterior => 'H',
                        }
                    })
                    .collect()
            })
            .collect()
    }

    pub fn to_init(&self) -> MazeInit {
        MazeInit {
            rows: self.rows,
            cols: self.cols,
            tiles: self.tiles(),
        }
    }
}

fn trimmed_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|line| line.is_empty()).count();
    lines.drain(..leading);
    lines
}

pub fn build_reachable_cells(maze: &Maze, start: Position) -> HashSet<Position> {
    let mut out = HashSet::new();
    if !maze.is_traversable(start) {
        return out;
    }

    let mut queue = VecDeque::new();
    out.insert(start);
    queue.push_back(start);

    while let Some(pos) = queue.pop_front() {
        for (_, next) in maze.neighbors(pos) {
            if !maze.is_traversable(next) {
                continue;
            }
            if out.insert(next) {
                queue.push_back(next);
            }
        }
    }

    out
}

/// House-interior cell closest to the centre of the pursuer spawns, ties
/// broken by row then column.
fn find_house_cell(maze: &Maze) -> Option<Position> {
    let spawns = maze.pursuer_spawns();
    if spawns.is_empty() {
        return None;
    }
    let count = spawns.len() as i32;
    let center = Position::new(
        spawns.iter().map(|s| s.row).sum::<i32>() / count,
        spawns.iter().map(|s| s.col).sum::<i32>() / count,
    );

    let mut best: Option<(i32, Position)> = None;
    for row in 0..maze.rows() {
        for col in 0..maze.cols() {
            let pos = Position::new(row, col);
            if maze.cell_at(pos) != CellKind::HouseInterior {
                continue;
            }
            let dist = pos.manhattan(center);
            if best.map(|(d, p)| (d, p) > (dist, pos)).unwrap_or(true) {
                best = Some((dist, pos));
            }
        }
    }
    best.map(|(_, pos)| pos)
}
