use crate::maze::Maze;
use crate::rng::Rng;
use crate::types::{Direction, Personality, Position, PursuerState, PursuerView};

use super::timers::Countdown;

/// Inputs every target strategy may look at.
#[derive(Clone, Copy, Debug)]
pub struct TargetContext {
    pub pursuer: Position,
    pub player: Position,
    pub player_facing: Direction,
    pub home_corner: Position,
    pub rows: i32,
    pub cols: i32,
    pub coward_radius: i32,
    pub erratic_pursuit_chance: f32,
}

pub trait TargetStrategy: Sync {
    fn select_target(&self, ctx: &TargetContext, rng: &mut Rng) -> Position;
}

pub struct DirectPursuit;
pub struct AmbushPursuit;
pub struct ErraticPursuit;
pub struct CowardlyPursuit;

impl TargetStrategy for DirectPursuit {
    fn select_target(&self, ctx: &TargetContext, _rng: &mut Rng) -> Position {
        ctx.player
    }
}

impl TargetStrategy for AmbushPursuit {
    // Aims at the player's cell; `ctx.player_facing` is unused for now.
    fn select_target(&self, ctx: &TargetContext, _rng: &mut Rng) -> Position {
        ctx.player
    }
}

impl TargetStrategy for ErraticPursuit {
    fn select_target(&self, ctx: &TargetContext, rng: &mut Rng) -> Position {
        if rng.chance(ctx.erratic_pursuit_chance) {
            return ctx.player;
        }
        Position::new(
            rng.below(ctx.rows.max(0) as u32) as i32,
            rng.below(ctx.cols.max(0) as u32) as i32,
        )
    }
}

impl TargetStrategy for CowardlyPursuit {
    fn select_target(&self, ctx: &TargetContext, _rng: &mut Rng) -> Position {
        if ctx.pursuer.manhattan(ctx.player) > ctx.coward_radius {
            ctx.player
        } else {
            ctx.home_corner
        }
    }
}

pub fn strategy_for(personality: Personality) -> &'static dyn TargetStrategy {
    match personality {
        Personality::Direct => &DirectPursuit,
        Personality::Ambush => &AmbushPursuit,
        Personality::Erratic => &ErraticPursuit,
        Personality::Cowardly => &CowardlyPursuit,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PursuerEvent {
    PowerPelletConsumed,
    PowerExpired,
    ContactWithPlayer,
    RespawnElapsed,
    RoundReset,
}

impl PursuerEvent {
    pub const ALL: [PursuerEvent; 5] = [
        PursuerEvent::PowerPelletConsumed,
        PursuerEvent::PowerExpired,
        PursuerEvent::ContactWithPlayer,
        PursuerEvent::RespawnElapsed,
        PursuerEvent::RoundReset,
    ];
}

/// Transition table. Total: every pair maps to a state.
///
/// A chasing pursuer touching the player stays chasing; the life loss is the
/// session's business, not the pursuer's.
pub fn next_state(state: PursuerState, event: PursuerEvent) -> PursuerState {
    use PursuerEvent as E;
    use PursuerState as S;
    match (state, event) {
        (_, E::RoundReset) => S::Chasing,
        (S::Chasing, E::PowerPelletConsumed) => S::Frightened,
        (S::Frightened, E::PowerPelletConsumed) => S::Frightened,
        (S::Captured, E::PowerPelletConsumed) => S::Captured,
        (S::Frightened, E::PowerExpired) => S::Chasing,
        (S::Chasing | S::Captured, E::PowerExpired) => state,
        (S::Frightened, E::ContactWithPlayer) => S::Captured,
        (S::Chasing | S::Captured, E::ContactWithPlayer) => state,
        (S::Captured, E::RespawnElapsed) => S::Chasing,
        (S::Chasing | S::Frightened, E::RespawnElapsed) => state,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Steering {
    Seek,
    Flee,
}

/// Picks the next move from `from`.
///
/// Legal moves lead to traversable cells. Reversing `facing` is excluded
/// unless it is the only legal move. Among the rest, the move whose
/// destination is nearest to `target` wins (`Seek`) or farthest (`Flee`);
/// ties go to the earlier entry of `Direction::PRIORITY`.
pub fn choose_direction(
    maze: &Maze,
    from: Position,
    facing: Direction,
    target: Position,
    steering: Steering,
) -> Direction {
    let legal: Vec<(Direction, Position)> = maze
        .neighbors(from)
        .into_iter()
        .filter(|(_, next)| maze.is_traversable(*next))
        .collect();
    let reverse = facing.reverse();
    let forward: Vec<(Direction, Position)> = legal
        .iter()
        .copied()
        .filter(|(dir, _)| facing == Direction::None || *dir != reverse)
        .collect();
    let candidates = if forward.is_empty() { legal } else { forward };

    let mut best: Option<(Direction, i32)> = None;
    for (dir, next) in candidates {
        let dist = next.manhattan(target);
        let better = match best {
            None => true,
            Some((_, best_dist)) => match steering {
                Steering::Seek => dist < best_dist,
                Steering::Flee => dist > best_dist,
            },
        };
        if better {
            best = Some((dir, dist));
        }
    }
    best.map(|(dir, _)| dir).unwrap_or(Direction::None)
}

#[derive(Clone, Debug)]
pub struct PursuerAgent {
    pub id: usize,
    pub personality: Personality,
    pub position: Position,
    pub facing: Direction,
    pub state: PursuerState,
    pub home_corner: Position,
    pub respawn: Countdown,
    spawn: Position,
}

impl PursuerAgent {
    pub fn new(id: usize, personality: Personality, spawn: Position, home_corner: Position) -> Self {
        Self {
            id,
            personality,
            position: spawn,
            facing: start_facing_for(id),
            state: PursuerState::Chasing,
            home_corner,
            respawn: Countdown::default(),
            spawn,
        }
    }

    /// Applies `event` and returns the resulting state.
    pub fn handle(&mut self, event: PursuerEvent) -> PursuerState {
        self.state = next_state(self.state, event);
        self.state
    }

    /// Chasing pursuers aim where their personality says; frightened ones
    /// steer relative to their home corner.
    pub fn target(&self, ctx: &TargetContext, rng: &mut Rng) -> (Position, Steering) {
        match self.state {
            PursuerState::Frightened => (self.home_corner, Steering::Flee),
            _ => (
                strategy_for(self.personality).select_target(ctx, rng),
                Steering::Seek,
            ),
        }
    }

    /// One due step. Captured pursuers never move.
    pub fn step(&mut self, maze: &Maze, ctx: &TargetContext, rng: &mut Rng) -> bool {
        if self.state == PursuerState::Captured {
            return false;
        }
        let (target, steering) = self.target(ctx, rng);
        let dir = choose_direction(maze, self.position, self.facing, target, steering);
        if dir == Direction::None {
            return false;
        }
        self.position = self.position.offset(dir);
        self.facing = dir;
        true
    }

    pub fn send_to(&mut self, cell: Position) {
        self.position = cell;
    }

    /// Back to the spawn cell after a lost life or a cleared level. Facing
    /// alternates up/down by id here, unlike the opening line-up.
    pub fn reset(&mut self) {
        self.position = self.spawn;
        self.facing = round_facing_for(self.id);
        self.respawn.cancel();
        self.handle(PursuerEvent::RoundReset);
    }

    /// Full reset for a fresh game: the opening line-up facing.
    pub fn restore_start(&mut self) {
        self.reset();
        self.facing = start_facing_for(self.id);
    }

    pub fn view(&self) -> PursuerView {
        PursuerView {
            id: self.id,
            personality: self.personality,
            row: self.position.row,
            col: self.position.col,
            facing: self.facing,
            state: self.state,
            respawn_in_ms: self
                .respawn
                .is_active()
                .then(|| self.respawn.remaining_ms()),
        }
    }
}

fn start_facing_for(id: usize) -> Direction {
    match id {
        3 => Direction::Left,
        _ => round_facing_for(id),
    }
}

fn round_facing_for(id: usize) -> Direction {
    if id % 2 == 0 {
        Direction::Up
    } else {
        Direction::Down
    }
}
