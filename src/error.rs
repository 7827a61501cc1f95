use thiserror::Error;

/// Fatal load-time failure. A maze or config that produces one of these can
/// never start a session; retrying with the same input fails the same way.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("maze definition is empty")]
    EmptyMaze,
    #[error("row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("unknown maze marker {marker:?} at ({row}, {col})")]
    UnknownMarker { row: usize, col: usize, marker: char },
    #[error("border cell ({row}, {col}) is not a wall")]
    OpenBorder { row: usize, col: usize },
    #[error("maze has no player start")]
    MissingPlayerStart,
    #[error("second player start at ({row}, {col})")]
    DuplicatePlayerStart { row: usize, col: usize },
    #[error("maze has {found} pursuer spawns, expected {expected}")]
    PursuerSpawnCount { expected: usize, found: usize },
    #[error("maze has no pellets")]
    NoPellets,
    #[error("pellet at ({row}, {col}) cannot be reached from the player start")]
    UnreachablePellet { row: usize, col: usize },
    #[error("invalid tunable `{name}`: {reason}")]
    InvalidTunable { name: &'static str, reason: String },
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },
    #[error("failed to parse session config: {0}")]
    Parse(String),
}

/// Failure of the economy collaborator asked whether a lost session may
/// continue. Every variant is treated as "cannot continue".
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ContinueError {
    #[error("continue decision timed out")]
    TimedOut,
    #[error("economy service unavailable: {0}")]
    Unavailable(String),
}
