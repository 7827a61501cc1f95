pub const TICK_RATE: u32 = 20;
pub const TICK_MS: u64 = 1000 / TICK_RATE as u64;

pub const STARTING_LIVES: u32 = 3;
pub const PELLET_POINTS: u32 = 10;
pub const POWER_PELLET_POINTS: u32 = 50;
pub const CAPTURE_POINTS: u32 = 200;

pub const PLAYER_CADENCE_MS: u64 = 150;
pub const PURSUER_CADENCE_MS: u64 = 180;
pub const FRIGHTENED_CADENCE_MS: u64 = 250;
pub const DEPLETION_SPEEDUP: f32 = 0.25;

pub const POWER_DURATION_MS: u64 = 8_000;
pub const CAPTURED_RESPAWN_MS: u64 = 3_000;
pub const RESPAWN_GRACE_MS: u64 = 0;

pub const COWARD_RADIUS: i32 = 8;
pub const ERRATIC_PURSUIT_CHANCE: f32 = 0.5;

pub const MAX_PURSUERS: usize = 4;
pub const HOME_CORNER_INSET: i32 = 2;

pub const CONTINUE_TIMEOUT_MS: u64 = 15_000;

pub const CLASSIC_MAZE: &str = concat!(
    "###################\n",
    "#.................#\n",
    "#.*.............*.#\n",
    "#....#########....#\n",
    "#....#.......#....#\n",
    "#....#.......#....#\n",
    "#....#.......#....#\n",
    "#.................#\n",
    "#.......HHH.......#\n",
    "#######.GGG.#######\n",
    "#.......HGH.......#\n",
    "#.......HHH.......#\n",
    "#....#.......#....#\n",
    "#....#.......#....#\n",
    "#....#...P...#....#\n",
    "#....#########....#\n",
    "#.*.............*.#\n",
    "#.................#\n",
    "###################\n",
);

/// Chasing cadence after pellet depletion is applied. `cleared_ratio` is the
/// share of pellets already eaten.
pub fn chasing_cadence_ms(base_ms: u64, speedup: f32, cleared_ratio: f32) -> u64 {
    let factor = 1.0 - speedup * cleared_ratio.clamp(0.0, 1.0);
    ((base_ms as f32) * factor).round().max(1.0) as u64
}
