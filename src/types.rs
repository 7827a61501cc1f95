use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Position {
    pub row: i32,
    pub col: i32,
}

impl Position {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn manhattan(self, other: Position) -> i32 {
        (self.row - other.row).abs() + (self.col - other.col).abs()
    }

    pub fn offset(self, dir: Direction) -> Position {
        match dir {
            Direction::Up => Position::new(self.row - 1, self.col),
            Direction::Down => Position::new(self.row + 1, self.col),
            Direction::Left => Position::new(self.row, self.col - 1),
            Direction::Right => Position::new(self.row, self.col + 1),
            Direction::None => self,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
    None,
}

impl Direction {
    /// Tie-break order for equally good pursuer moves.
    pub const PRIORITY: [Direction; 4] = [
        Direction::Up,
        Direction::Left,
        Direction::Down,
        Direction::Right,
    ];

    pub fn reverse(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::None => Self::None,
        }
    }

    pub fn parse_move(value: &str) -> Option<Self> {
        match value {
            "up" => Some(Self::Up),
            "down" => Some(Self::Down),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    Wall,
    Pellet,
    PowerPellet,
    Empty,
    HouseInterior,
}

/// Target-selection strategy of a pursuer while it is chasing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Personality {
    /// Heads straight for the player's cell.
    Direct,
    /// Meant to cut the player off ahead of its facing; currently targets the
    /// player's cell exactly like `Direct`.
    Ambush,
    /// Chases half the time, otherwise wanders toward a random cell.
    Erratic,
    /// Chases from afar, retreats to its home corner when close.
    Cowardly,
}

impl Personality {
    pub const ROSTER: [Personality; 4] = [
        Personality::Direct,
        Personality::Ambush,
        Personality::Erratic,
        Personality::Cowardly,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PursuerState {
    Chasing,
    Frightened,
    Captured,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Idle,
    Running,
    Paused,
    AwaitingContinue,
    Ended,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Won,
    Lost,
    Closed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SessionEnd {
    #[serde(rename = "finalScore")]
    pub final_score: u32,
    pub outcome: Outcome,
}

#[derive(Clone, Debug, Serialize)]
pub struct MazeInit {
    pub rows: i32,
    pub cols: i32,
    pub tiles: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PlayerView {
    pub row: i32,
    pub col: i32,
    pub facing: Direction,
    pub queued: Direction,
}

#[derive(Clone, Debug, Serialize)]
pub struct PursuerView {
    pub id: usize,
    pub personality: Personality,
    pub row: i32,
    pub col: i32,
    pub facing: Direction,
    pub state: PursuerState,
    #[serde(rename = "respawnInMs", skip_serializing_if = "Option::is_none")]
    pub respawn_in_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuntimeEvent {
    PhaseChanged {
        phase: SessionPhase,
    },
    PelletEaten {
        row: i32,
        col: i32,
        points: u32,
    },
    PowerPelletEaten {
        row: i32,
        col: i32,
        points: u32,
    },
    PowerModeStarted {
        #[serde(rename = "durationMs")]
        duration_ms: u64,
    },
    PowerModeEnded,
    PursuerCaptured {
        pursuer: usize,
        points: u32,
    },
    PursuerRespawned {
        pursuer: usize,
    },
    LifeLost {
        #[serde(rename = "livesRemaining")]
        lives_remaining: u32,
    },
    ContinueRequested,
    ContinueResolved {
        accepted: bool,
    },
    LevelStarted {
        level: u32,
    },
    SessionEnded {
        #[serde(rename = "finalScore")]
        final_score: u32,
        outcome: Outcome,
    },
}

#[derive(Clone, Debug, Serialize)]
pub struct Snapshot {
    pub tick: u64,
    #[serde(rename = "elapsedMs")]
    pub elapsed_ms: u64,
    pub phase: SessionPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    pub score: u32,
    pub lives: u32,
    pub level: u32,
    #[serde(rename = "pelletsRemaining")]
    pub pellets_remaining: usize,
    #[serde(rename = "powerRemainingMs")]
    pub power_remaining_ms: u64,
    pub player: PlayerView,
    pub pursuers: Vec<PursuerView>,
    pub events: Vec<RuntimeEvent>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(rename = "finalScore")]
    pub final_score: u32,
    pub level: u32,
    #[serde(rename = "durationMs")]
    pub duration_ms: u64,
    #[serde(rename = "pelletsEaten")]
    pub pellets_eaten: u32,
    #[serde(rename = "pursuersCaptured")]
    pub pursuers_captured: u32,
    #[serde(rename = "livesLost")]
    pub lives_lost: u32,
}
