use crate::config::SessionConfig;
use crate::constants::chasing_cadence_ms;
use crate::error::{ConfigurationError, ContinueError};
use crate::maze::Maze;
use crate::rng::Rng;
use crate::types::{
    CellKind, Direction, MazeInit, Outcome, Personality, PlayerView, Position, PursuerState,
    PursuerView, RuntimeEvent, SessionEnd, SessionPhase, SessionSummary, Snapshot,
};

mod autopilot;
mod collision;
mod hooks;
mod pellets;
mod player;
mod pursuer;
mod scheduler;
mod timers;

pub use self::autopilot::first_step_towards;
pub use self::collision::{detect_contacts, Contact};
pub use self::hooks::{ContinueOffer, NoopHooks, SessionHooks};
pub use self::pellets::{Consumed, PelletTracker};
pub use self::player::PlayerAgent;
pub use self::pursuer::{
    choose_direction, next_state, strategy_for, PursuerAgent, PursuerEvent, Steering,
    TargetContext, TargetStrategy,
};
pub use self::scheduler::{pursuer_slot, MovementScheduler, SlotId, PLAYER_SLOT};
pub use self::timers::{Countdown, PowerModeTimer};

#[derive(Clone, Debug, Default)]
struct SessionStats {
    pellets_eaten: u32,
    pursuers_captured: u32,
    lives_lost: u32,
}

/// One maze-chase session: the only owner of every piece of mutable game
/// state. Hosts feed it wall-clock deltas through `step` and inputs through
/// the session methods; everything else is read back via snapshots.
pub struct GameEngine {
    config: SessionConfig,
    maze: Maze,
    seed: u32,
    rng: Rng,
    hooks: Box<dyn SessionHooks>,

    phase: SessionPhase,
    ended: Option<SessionEnd>,
    tick_counter: u64,
    elapsed_ms: u64,
    score: u32,
    lives: u32,
    level: u32,

    player: PlayerAgent,
    pursuers: Vec<PursuerAgent>,
    pellets: PelletTracker,
    power: PowerModeTimer,
    scheduler: MovementScheduler,
    grace: Countdown,
    events: Vec<RuntimeEvent>,
    stats: SessionStats,
}

impl GameEngine {
    pub fn new(
        maze: Maze,
        config: SessionConfig,
        seed: u32,
        hooks: Box<dyn SessionHooks>,
    ) -> Result<Self, ConfigurationError> {
        config.validate()?;

        let player = PlayerAgent::new(maze.player_start());
        let pursuers: Vec<PursuerAgent> = maze
            .pursuer_spawns()
            .iter()
            .enumerate()
            .map(|(idx, spawn)| {
                let personality = Personality::ROSTER[idx % Personality::ROSTER.len()];
                PursuerAgent::new(idx, personality, *spawn, maze.home_corner(idx))
            })
            .collect();

        let mut scheduler = MovementScheduler::new();
        scheduler.add_slot(config.player_cadence_ms);
        for _ in &pursuers {
            scheduler.add_slot(config.pursuer_cadence_ms);
        }

        let pellets = PelletTracker::new(&maze, config.pellet_points, config.power_pellet_points);
        let lives = config.starting_lives;

        let mut engine = Self {
            config,
            maze,
            seed,
            rng: Rng::new(seed),
            hooks,
            phase: SessionPhase::Idle,
            ended: None,
            tick_counter: 0,
            elapsed_ms: 0,
            score: 0,
            lives,
            level: 1,
            player,
            pursuers,
            pellets,
            power: PowerModeTimer::default(),
            scheduler,
            grace: Countdown::default(),
            events: Vec::new(),
            stats: SessionStats::default(),
        };
        engine.refresh_pursuer_cadences();
        Ok(engine)
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_ended(&self) -> bool {
        self.phase == SessionPhase::Ended
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.ended.map(|end| end.outcome)
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn lives(&self) -> u32 {
        self.lives
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn tick(&self) -> u64 {
        self.tick_counter
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn pellets_remaining(&self) -> usize {
        self.pellets.remaining()
    }

    pub fn power_remaining_ms(&self) -> u64 {
        self.power.remaining_ms()
    }

    /// Events queued since the last draining snapshot.
    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn maze(&self) -> &Maze {
        &self.maze
    }

    pub fn get_maze_init(&self) -> MazeInit {
        self.maze.to_init()
    }

    pub fn player_view(&self) -> PlayerView {
        self.player.view()
    }

    pub fn pursuer_views(&self) -> Vec<PursuerView> {
        self.pursuers.iter().map(PursuerAgent::view).collect()
    }

    /// Idle to Running. Anything else is left alone.
    pub fn start(&mut self) {
        if self.phase == SessionPhase::Idle {
            self.set_phase(SessionPhase::Running);
        }
    }

    pub fn pause(&mut self) {
        if self.phase == SessionPhase::Running {
            self.set_phase(SessionPhase::Paused);
        }
    }

    pub fn resume(&mut self) {
        if self.phase == SessionPhase::Paused {
            self.set_phase(SessionPhase::Running);
        }
    }

    /// Queues a turn for the player's next due step. The first real
    /// direction also starts an idle session.
    pub fn set_direction(&mut self, dir: Direction) {
        match self.phase {
            SessionPhase::Ended | SessionPhase::AwaitingContinue => return,
            SessionPhase::Idle if dir != Direction::None => self.start(),
            _ => {}
        }
        self.player.set_queued(dir);
    }

    /// Ends the session as `closed` with the score as it stands. Safe at any
    /// point; a session that already ended stays as it was.
    pub fn close(&mut self) {
        self.finish(Outcome::Closed);
    }

    /// Answer to a pending continue. `Ok(true)` refills lives and replays the
    /// round; a refusal or any error ends the session `lost`.
    /// Returns false when no continue was pending.
    pub fn resolve_continue(&mut self, result: Result<bool, ContinueError>) -> bool {
        if self.phase != SessionPhase::AwaitingContinue {
            return false;
        }
        let accepted = matches!(result, Ok(true));
        self.events.push(RuntimeEvent::ContinueResolved { accepted });
        if accepted {
            self.lives = self.config.starting_lives;
            self.reset_round();
            self.set_phase(SessionPhase::Running);
        } else {
            self.finish(Outcome::Lost);
        }
        true
    }

    /// After a win: same maze, every pellet back, one level up. Score and
    /// lives carry over and the next clear reports its own session end.
    pub fn next_level(&mut self) -> bool {
        if self.outcome() != Some(Outcome::Won) {
            return false;
        }
        self.level += 1;
        self.pellets = self.fresh_pellets();
        self.ended = None;
        self.reset_round();
        self.events.push(RuntimeEvent::LevelStarted { level: self.level });
        self.set_phase(SessionPhase::Idle);
        true
    }

    /// After a win or loss: back to level one with a zero score and full
    /// lives. Closed sessions stay closed.
    pub fn restart(&mut self) -> bool {
        if !matches!(self.outcome(), Some(Outcome::Won | Outcome::Lost)) {
            return false;
        }
        self.score = 0;
        self.lives = self.config.starting_lives;
        self.level = 1;
        self.elapsed_ms = 0;
        self.stats = SessionStats::default();
        self.pellets = self.fresh_pellets();
        self.ended = None;
        self.reset_round();
        for pursuer in &mut self.pursuers {
            pursuer.restore_start();
        }
        self.events.push(RuntimeEvent::LevelStarted { level: self.level });
        self.set_phase(SessionPhase::Idle);
        true
    }

    /// One logic tick. Only a running session moves; paused, idle, awaiting
    /// and ended sessions ignore the delta entirely.
    pub fn step(&mut self, dt_ms: u64) {
        if self.phase != SessionPhase::Running {
            return;
        }
        self.tick_counter += 1;
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);

        self.update_timers(dt_ms);
        self.refresh_pursuer_cadences();
        self.scheduler.advance(dt_ms);

        // A long delta owes some agents several steps. They are paid out in
        // rounds of at most one step each, player first, with contacts
        // checked after every round so no two agents pass through each other.
        loop {
            let player_before = self.player.position;
            let pursuers_before: Vec<Position> =
                self.pursuers.iter().map(|pursuer| pursuer.position).collect();
            let player_due = self.update_player();
            let pursuers_due = self.update_pursuers();
            if !player_due && !pursuers_due {
                break;
            }
            let round_reset = self.resolve_contacts(player_before, &pursuers_before);

            if self.phase == SessionPhase::Running && self.pellets.is_cleared() {
                self.finish(Outcome::Won);
            }
            if round_reset || self.phase != SessionPhase::Running {
                break;
            }
            self.refresh_pursuer_cadences();
        }
    }

    pub fn build_snapshot(&mut self, include_events: bool) -> Snapshot {
        let snapshot = Snapshot {
            tick: self.tick_counter,
            elapsed_ms: self.elapsed_ms,
            phase: self.phase,
            outcome: self.outcome(),
            score: self.score,
            lives: self.lives,
            level: self.level,
            pellets_remaining: self.pellets.remaining(),
            power_remaining_ms: self.power.remaining_ms(),
            player: self.player.view(),
            pursuers: self.pursuer_views(),
            events: if include_events {
                self.events.clone()
            } else {
                Vec::new()
            },
        };
        if include_events {
            self.events.clear();
        }
        snapshot
    }

    pub fn build_summary(&self) -> SessionSummary {
        SessionSummary {
            outcome: self.outcome(),
            final_score: self.ended.map(|end| end.final_score).unwrap_or(self.score),
            level: self.level,
            duration_ms: self.elapsed_ms,
            pellets_eaten: self.stats.pellets_eaten,
            pursuers_captured: self.stats.pursuers_captured,
            lives_lost: self.stats.lives_lost,
        }
    }

    fn update_timers(&mut self, dt_ms: u64) {
        self.grace.tick(dt_ms);

        if self.power.tick(dt_ms) {
            for pursuer in &mut self.pursuers {
                pursuer.handle(PursuerEvent::PowerExpired);
            }
            self.events.push(RuntimeEvent::PowerModeEnded);
        }

        for idx in 0..self.pursuers.len() {
            if self.pursuers[idx].respawn.tick(dt_ms)
                && self.pursuers[idx].handle(PursuerEvent::RespawnElapsed) == PursuerState::Chasing
            {
                self.events.push(RuntimeEvent::PursuerRespawned { pursuer: idx });
            }
        }
    }

    fn refresh_pursuer_cadences(&mut self) {
        let chasing = chasing_cadence_ms(
            self.config.pursuer_cadence_ms,
            self.config.depletion_speedup,
            self.pellets.cleared_ratio(),
        );
        for (idx, pursuer) in self.pursuers.iter().enumerate() {
            let cadence = match pursuer.state {
                PursuerState::Frightened => self.config.frightened_cadence_ms,
                _ => chasing,
            };
            self.scheduler.set_cadence(pursuer_slot(idx), cadence);
        }
    }

    /// At most one player step. Returns whether one was owed, moved or not.
    fn update_player(&mut self) -> bool {
        if !self.scheduler.take_step(PLAYER_SLOT) {
            return false;
        }
        if let Some(cell) = self.player.step(&self.maze) {
            self.consume_at(cell);
        }
        true
    }

    fn consume_at(&mut self, cell: Position) {
        let Some(consumed) = self.pellets.consume(cell) else {
            return;
        };
        self.score = self.score.saturating_add(consumed.points);
        self.stats.pellets_eaten += 1;
        if consumed.kind == CellKind::PowerPellet {
            self.events.push(RuntimeEvent::PowerPelletEaten {
                row: cell.row,
                col: cell.col,
                points: consumed.points,
            });
            self.enter_power_mode();
        } else {
            self.events.push(RuntimeEvent::PelletEaten {
                row: cell.row,
                col: cell.col,
                points: consumed.points,
            });
        }
    }

    fn enter_power_mode(&mut self) {
        let duration_ms = self.config.power_duration_ms;
        self.power.start(duration_ms);
        for pursuer in &mut self.pursuers {
            pursuer.handle(PursuerEvent::PowerPelletConsumed);
        }
        self.refresh_pursuer_cadences();
        self.events.push(RuntimeEvent::PowerModeStarted { duration_ms });
    }

    fn update_pursuers(&mut self) -> bool {
        let mut any_due = false;
        for idx in 0..self.pursuers.len() {
            if !self.scheduler.take_step(pursuer_slot(idx)) {
                continue;
            }
            any_due = true;
            let ctx = self.target_context(idx);
            self.pursuers[idx].step(&self.maze, &ctx, &mut self.rng);
        }
        any_due
    }

    fn target_context(&self, idx: usize) -> TargetContext {
        let pursuer = &self.pursuers[idx];
        TargetContext {
            pursuer: pursuer.position,
            player: self.player.position,
            player_facing: self.player.facing,
            home_corner: pursuer.home_corner,
            rows: self.maze.rows(),
            cols: self.maze.cols(),
            coward_radius: self.config.coward_radius,
            erratic_pursuit_chance: self.config.erratic_pursuit_chance,
        }
    }

    fn lose_life(&mut self) {
        self.lives = self.lives.saturating_sub(1);
        self.stats.lives_lost += 1;
        self.events.push(RuntimeEvent::LifeLost {
            lives_remaining: self.lives,
        });
        if self.lives > 0 {
            self.reset_round();
            return;
        }
        match self.hooks.on_life_lost() {
            ContinueOffer::Pending => {
                self.events.push(RuntimeEvent::ContinueRequested);
                self.set_phase(SessionPhase::AwaitingContinue);
            }
            ContinueOffer::Declined => self.finish(Outcome::Lost),
        }
    }

    /// Everyone back to their spawn, power mode off, step clocks zeroed.
    fn reset_round(&mut self) {
        self.player.reset();
        for pursuer in &mut self.pursuers {
            pursuer.reset();
        }
        if self.power.is_active() {
            self.power.cancel();
            self.events.push(RuntimeEvent::PowerModeEnded);
        }
        self.scheduler.reset_all();
        self.refresh_pursuer_cadences();
        if self.config.respawn_grace_ms > 0 {
            self.grace.start(self.config.respawn_grace_ms);
        } else {
            self.grace.cancel();
        }
    }

    fn fresh_pellets(&self) -> PelletTracker {
        PelletTracker::new(
            &self.maze,
            self.config.pellet_points,
            self.config.power_pellet_points,
        )
    }

    /// Latches the first end of the session and tells the host once.
    fn finish(&mut self, outcome: Outcome) {
        if self.ended.is_some() {
            return;
        }
        let end = SessionEnd {
            final_score: self.score,
            outcome,
        };
        self.ended = Some(end);
        self.set_phase(SessionPhase::Ended);
        self.events.push(RuntimeEvent::SessionEnded {
            final_score: end.final_score,
            outcome,
        });
        self.hooks.on_session_end(end.final_score, outcome);
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase == phase {
            return;
        }
        self.phase = phase;
        self.events.push(RuntimeEvent::PhaseChanged { phase });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::constants::TICK_MS;

    #[derive(Clone, Default)]
    struct Recorder {
        ends: Arc<Mutex<Vec<(u32, Outcome)>>>,
        offer: Option<ContinueOffer>,
    }

    impl SessionHooks for Recorder {
        fn on_session_end(&mut self, final_score: u32, outcome: Outcome) {
            if let Ok(mut ends) = self.ends.lock() {
                ends.push((final_score, outcome));
            }
        }

        fn on_life_lost(&mut self) -> ContinueOffer {
            self.offer.unwrap_or(ContinueOffer::Declined)
        }
    }

    impl Recorder {
        fn ends(&self) -> Vec<(u32, Outcome)> {
            self.ends.lock().expect("recorder lock").clone()
        }
    }

    const OPEN: &str = concat!(
        "#########\n",
        "#P*.....#\n",
        "#.##H##.#\n",
        "#.#GGGG.#\n",
        "#.......#\n",
        "#########\n",
    );

    fn engine_with(text: &str, roster: usize, recorder: &Recorder) -> GameEngine {
        let maze = Maze::parse_with_roster(text, roster).expect("fixture is valid");
        GameEngine::new(maze, SessionConfig::default(), 7, Box::new(recorder.clone()))
            .expect("default config is valid")
    }

    fn drain(engine: &mut GameEngine) -> Vec<RuntimeEvent> {
        engine.build_snapshot(true).events
    }

    #[test]
    fn roster_follows_spawn_order() {
        let engine = engine_with(OPEN, 4, &Recorder::default());
        let personalities: Vec<Personality> = engine
            .pursuer_views()
            .iter()
            .map(|view| view.personality)
            .collect();
        assert_eq!(personalities, Personality::ROSTER.to_vec());
        assert_eq!(engine.pursuers[0].home_corner, engine.maze.home_corner(0));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let maze = Maze::parse_with_roster(OPEN, 4).expect("fixture is valid");
        let config = SessionConfig {
            player_cadence_ms: 0,
            ..SessionConfig::default()
        };
        assert!(GameEngine::new(maze, config, 1, Box::new(NoopHooks)).is_err());
    }

    #[test]
    fn idle_session_ignores_time() {
        let mut engine = engine_with(OPEN, 4, &Recorder::default());
        engine.step(10_000);
        assert_eq!(engine.tick(), 0);
        assert_eq!(engine.phase(), SessionPhase::Idle);
        engine.set_direction(Direction::None);
        assert_eq!(engine.phase(), SessionPhase::Idle);
        engine.set_direction(Direction::Right);
        assert_eq!(engine.phase(), SessionPhase::Running);
    }

    #[test]
    fn build_snapshot_drains_events_when_requested() {
        let mut engine = engine_with(OPEN, 4, &Recorder::default());
        engine.start();
        let peek = engine.build_snapshot(false);
        assert!(peek.events.is_empty());
        let first = engine.build_snapshot(true);
        let second = engine.build_snapshot(true);
        assert_eq!(
            first.events,
            vec![RuntimeEvent::PhaseChanged {
                phase: SessionPhase::Running
            }]
        );
        assert!(second.events.is_empty());
    }

    #[test]
    fn power_pellet_frightens_every_pursuer_at_once() {
        let mut engine = engine_with(OPEN, 4, &Recorder::default());
        engine.set_direction(Direction::Right);
        for _ in 0..3 {
            engine.step(TICK_MS);
        }
        assert_eq!(engine.score(), 50);
        assert!(engine
            .pursuers
            .iter()
            .all(|pursuer| pursuer.state == PursuerState::Frightened));
        assert_eq!(engine.power_remaining_ms(), 8_000);
        assert_eq!(
            engine.scheduler.cadence_ms(pursuer_slot(0)),
            Some(engine.config.frightened_cadence_ms)
        );
    }

    #[test]
    fn frightened_contact_captures_without_costing_a_life() {
        let recorder = Recorder::default();
        let mut engine = engine_with(OPEN, 4, &recorder);
        engine.start();
        engine.enter_power_mode();
        let cell = engine.player.position;
        engine.pursuers[2].position = cell;
        drain(&mut engine);

        engine.resolve_contacts(cell, &[Position::new(3, 3); 4]);
        assert_eq!(engine.pursuers[2].state, PursuerState::Captured);
        assert_eq!(Some(engine.pursuers[2].position), engine.maze.house_cell());
        assert_eq!(engine.score(), 200);
        assert_eq!(engine.lives(), 3);
        assert!(drain(&mut engine).contains(&RuntimeEvent::PursuerCaptured {
            pursuer: 2,
            points: 200
        }));
    }

    #[test]
    fn captured_pursuer_ignores_power_expiry_and_respawns_on_its_own_clock() {
        let mut engine = engine_with(OPEN, 4, &Recorder::default());
        engine.start();
        engine.enter_power_mode();
        let cell = engine.player.position;
        engine.pursuers[0].position = cell;
        engine.resolve_contacts(cell, &[Position::new(3, 3); 4]);
        assert_eq!(engine.pursuers[0].state, PursuerState::Captured);

        engine.power.start(100);
        engine.update_timers(100);
        assert_eq!(engine.pursuers[0].state, PursuerState::Captured);
        assert_eq!(engine.pursuers[1].state, PursuerState::Chasing);

        engine.update_timers(engine.config.captured_respawn_ms);
        assert_eq!(engine.pursuers[0].state, PursuerState::Chasing);
        assert!(drain(&mut engine).contains(&RuntimeEvent::PursuerRespawned { pursuer: 0 }));
    }

    #[test]
    fn swap_collision_costs_a_life() {
        let mut engine = engine_with(OPEN, 4, &Recorder::default());
        engine.start();
        let before = Position::new(1, 3);
        let after = Position::new(1, 4);
        engine.player.position = after;
        engine.pursuers[1].position = before;
        let mut pursuers_before = vec![Position::new(3, 3); 4];
        pursuers_before[1] = after;

        engine.resolve_contacts(before, &pursuers_before);
        assert_eq!(engine.lives(), 2);
        assert_eq!(engine.player.position, engine.maze.player_start());
        assert_eq!(engine.pursuers[1].position, engine.maze.pursuer_spawns()[1]);
        assert_eq!(engine.pursuers[3].facing, Direction::Down);
    }

    #[test]
    fn one_life_per_tick_even_with_two_attackers() {
        let mut engine = engine_with(OPEN, 4, &Recorder::default());
        engine.start();
        let cell = Position::new(1, 5);
        engine.player.position = cell;
        engine.pursuers[0].position = cell;
        engine.pursuers[1].position = cell;
        engine.resolve_contacts(cell, &[cell; 4]);
        assert_eq!(engine.lives(), 2);
    }

    #[test]
    fn grace_window_blocks_contacts() {
        let maze = Maze::parse_with_roster(OPEN, 4).expect("fixture is valid");
        let config = SessionConfig {
            respawn_grace_ms: 1_000,
            ..SessionConfig::default()
        };
        let mut engine =
            GameEngine::new(maze, config, 3, Box::new(NoopHooks)).expect("config is valid");
        engine.start();
        let cell = Position::new(1, 5);
        engine.player.position = cell;
        engine.pursuers[0].position = cell;
        engine.resolve_contacts(cell, &[cell; 4]);
        assert_eq!(engine.lives(), 2);

        engine.player.position = cell;
        engine.pursuers[0].position = cell;
        engine.resolve_contacts(cell, &[cell; 4]);
        assert_eq!(engine.lives(), 2);

        engine.update_timers(1_000);
        engine.resolve_contacts(cell, &[cell; 4]);
        assert_eq!(engine.lives(), 1);
    }

    #[test]
    fn last_life_with_pending_continue_waits_for_the_host() {
        let recorder = Recorder {
            offer: Some(ContinueOffer::Pending),
            ..Recorder::default()
        };
        let mut engine = engine_with(OPEN, 4, &recorder);
        engine.start();
        engine.lives = 1;
        let cell = Position::new(1, 5);
        engine.player.position = cell;
        engine.pursuers[0].position = cell;
        engine.resolve_contacts(cell, &[cell; 4]);

        assert_eq!(engine.phase(), SessionPhase::AwaitingContinue);
        assert!(recorder.ends().is_empty());
        let tick = engine.tick();
        engine.step(TICK_MS);
        assert_eq!(engine.tick(), tick);

        assert!(engine.resolve_continue(Ok(true)));
        assert_eq!(engine.phase(), SessionPhase::Running);
        assert_eq!(engine.lives(), 3);
        assert!(!engine.resolve_continue(Ok(true)));
    }

    #[test]
    fn failed_continue_ends_lost() {
        let recorder = Recorder {
            offer: Some(ContinueOffer::Pending),
            ..Recorder::default()
        };
        let mut engine = engine_with(OPEN, 4, &recorder);
        engine.start();
        engine.score = 120;
        engine.lives = 1;
        engine.lose_life();
        assert!(engine.resolve_continue(Err(ContinueError::TimedOut)));
        assert_eq!(engine.outcome(), Some(Outcome::Lost));
        assert_eq!(recorder.ends(), vec![(120, Outcome::Lost)]);
    }

    #[test]
    fn session_end_fires_once() {
        let recorder = Recorder::default();
        let mut engine = engine_with(OPEN, 4, &recorder);
        engine.start();
        engine.score = 40;
        engine.finish(Outcome::Won);
        engine.close();
        engine.finish(Outcome::Lost);
        assert_eq!(recorder.ends(), vec![(40, Outcome::Won)]);
        assert_eq!(engine.outcome(), Some(Outcome::Won));
    }

    #[test]
    fn next_level_restores_pellets_and_keeps_score() {
        let recorder = Recorder::default();
        let mut engine = engine_with(OPEN, 4, &recorder);
        engine.start();
        assert!(!engine.next_level());
        let total = engine.pellets.total();
        for cell in engine.pellets.positions().collect::<Vec<_>>() {
            engine.consume_at(cell);
        }
        engine.step(TICK_MS);
        assert_eq!(engine.outcome(), Some(Outcome::Won));
        let score = engine.score();

        assert!(engine.next_level());
        assert_eq!(engine.level(), 2);
        assert_eq!(engine.phase(), SessionPhase::Idle);
        assert_eq!(engine.pellets_remaining(), total);
        assert_eq!(engine.score(), score);
        assert_eq!(engine.outcome(), None);
        assert!(!engine.next_level());

        engine.close();
        assert_eq!(recorder.ends(), vec![(score, Outcome::Won), (score, Outcome::Closed)]);
    }

    #[test]
    fn restart_is_refused_after_close() {
        let mut engine = engine_with(OPEN, 4, &Recorder::default());
        engine.close();
        assert!(!engine.restart());
        assert_eq!(engine.phase(), SessionPhase::Ended);
    }

    #[test]
    fn restart_after_loss_resets_the_session() {
        let mut engine = engine_with(OPEN, 4, &Recorder::default());
        engine.start();
        engine.score = 300;
        engine.lives = 1;
        engine.lose_life();
        assert_eq!(engine.outcome(), Some(Outcome::Lost));

        assert!(engine.restart());
        assert_eq!(engine.score(), 0);
        assert_eq!(engine.lives(), 3);
        assert_eq!(engine.level(), 1);
        assert_eq!(engine.phase(), SessionPhase::Idle);
        assert_eq!(engine.build_summary().lives_lost, 0);
        assert_eq!(engine.pursuers[3].facing, Direction::Left);
    }

    #[test]
    fn chasing_pursuers_speed_up_as_pellets_run_out() {
        let mut engine = engine_with(OPEN, 4, &Recorder::default());
        let base = engine.scheduler.cadence_ms(pursuer_slot(0));
        assert_eq!(base, Some(engine.config.pursuer_cadence_ms));
        let cells: Vec<Position> = engine.pellets.positions().collect();
        for cell in cells.iter().skip(1) {
            if engine.pellets.kind_at(*cell) == Some(CellKind::Pellet) {
                engine.consume_at(*cell);
            }
        }
        engine.refresh_pursuer_cadences();
        let faster = engine.scheduler.cadence_ms(pursuer_slot(0)).unwrap_or(0);
        assert!(faster < engine.config.pursuer_cadence_ms);
    }

    #[test]
    fn autopilot_heads_for_the_nearest_pellet() {
        let engine = engine_with(OPEN, 4, &Recorder::default());
        // (2, 1) and (1, 2) are both one step away; Down is expanded first.
        assert_eq!(engine.autopilot_direction(), Direction::Down);
    }

    #[test]
    fn summary_counts_what_happened() {
        let mut engine = engine_with(OPEN, 4, &Recorder::default());
        engine.set_direction(Direction::Right);
        for _ in 0..6 {
            engine.step(TICK_MS);
        }
        let summary = engine.build_summary();
        assert_eq!(summary.pellets_eaten, 2);
        assert_eq!(summary.final_score, 60);
        assert_eq!(summary.duration_ms, 6 * TICK_MS);
        assert_eq!(summary.outcome, None);
    }

    #[test]
    fn long_delta_cannot_carry_agents_through_each_other() {
        let recorder = Recorder::default();
        let mut engine = engine_with("#########\n#P.....G#\n#########\n", 1, &recorder);
        engine.set_direction(Direction::Right);
        drain(&mut engine);

        // 600ms owes the player four steps and the pursuer three; they meet
        // on (1, 4) in the third round.
        engine.step(600);
        assert_eq!(engine.lives(), 2);
        assert_eq!(engine.player.position, engine.maze.player_start());
        assert_eq!(engine.pursuers[0].position, engine.maze.pursuer_spawns()[0]);
        let lost = drain(&mut engine)
            .into_iter()
            .filter(|event| matches!(event, RuntimeEvent::LifeLost { .. }))
            .count();
        assert_eq!(lost, 1);
    }

    #[test]
    fn long_delta_pays_every_owed_step() {
        let mut engine = engine_with("###########\n#P........#\n###########\n", 0, &Recorder::default());
        engine.set_direction(Direction::Right);
        engine.step(1_000);
        assert_eq!(engine.player.position, Position::new(1, 7));
        assert_eq!(engine.score(), 60);
        assert_eq!(engine.scheduler.pending_ms(PLAYER_SLOT), Some(100));
    }

    #[test]
    fn ended_sessions_ignore_controls() {
        let won = Recorder::default();
        let mut engine = engine_with("#####\n#P. #\n#####\n", 0, &won);
        engine.set_direction(Direction::Right);
        engine.step(engine.config.player_cadence_ms);
        assert_eq!(engine.outcome(), Some(Outcome::Won));

        let lost = Recorder::default();
        let mut other = engine_with(OPEN, 4, &lost);
        other.start();
        other.score = 70;
        other.lives = 1;
        other.lose_life();
        assert_eq!(other.outcome(), Some(Outcome::Lost));

        for engine in [&mut engine, &mut other] {
            let before = engine.build_snapshot(true);
            engine.pause();
            engine.resume();
            engine.set_direction(Direction::Left);
            engine.step(TICK_MS);
            let after = engine.build_snapshot(true);
            assert_eq!(after.phase, SessionPhase::Ended);
            assert_eq!(after.score, before.score);
            assert_eq!(after.lives, before.lives);
            assert_eq!(after.tick, before.tick);
            assert!(after.events.is_empty());
            assert_eq!(after.player.queued, Direction::None);
        }
        assert_eq!(won.ends(), vec![(10, Outcome::Won)]);
        assert_eq!(lost.ends(), vec![(70, Outcome::Lost)]);
    }
}
