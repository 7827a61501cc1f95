use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use anyhow::Context;
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use maze_chase_engine::config::SessionConfig;
use maze_chase_engine::constants::TICK_MS;
use maze_chase_engine::engine::{GameEngine, SessionHooks};
use maze_chase_engine::maze::Maze;
use maze_chase_engine::telemetry::{log_events, LogContext};
use maze_chase_engine::types::{Outcome, Position, RuntimeEvent, Snapshot};
use serde::Serialize;
use serde_json::json;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless autopilot runs of the maze chase engine")]
struct Cli {
    #[arg(long)]
    seed: Option<u32>,
    #[arg(long, default_value_t = 1)]
    runs: u32,
    /// Maze text file; the built-in classic layout when omitted.
    #[arg(long)]
    maze: Option<PathBuf>,
    /// JSON file with session tunables.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Wall-clock budget per run in simulated seconds.
    #[arg(long, default_value_t = 600)]
    max_seconds: u64,
    #[arg(long)]
    session_id: Option<String>,
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

#[derive(Clone, Debug, Serialize)]
struct RunResultLine {
    run: u32,
    seed: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<Outcome>,
    #[serde(rename = "finalScore")]
    final_score: u32,
    level: u32,
    #[serde(rename = "durationMs")]
    duration_ms: u64,
    #[serde(rename = "pelletsEaten")]
    pellets_eaten: u32,
    #[serde(rename = "pursuersCaptured")]
    pursuers_captured: u32,
    #[serde(rename = "livesLost")]
    lives_lost: u32,
    #[serde(rename = "powerModes")]
    power_modes: u32,
    #[serde(rename = "timedOut")]
    timed_out: bool,
    anomalies: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
struct AnomalyRecord {
    tick: u64,
    message: String,
}

#[derive(Clone, Debug)]
struct RunOutput {
    result: RunResultLine,
    anomaly_records: Vec<AnomalyRecord>,
    finished_tick: u64,
}

#[derive(Clone, Debug, Serialize)]
struct RunSummary {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "startedAt")]
    started_at: String,
    #[serde(rename = "finishedAt")]
    finished_at: String,
    #[serde(rename = "runCount")]
    run_count: usize,
    #[serde(rename = "anomalyCount")]
    anomaly_count: usize,
    #[serde(rename = "averageScore")]
    average_score: u32,
    #[serde(rename = "outcomeCounts")]
    outcome_counts: BTreeMap<String, usize>,
    runs: Vec<RunResultLine>,
}

/// Counts end-of-session callbacks so a double fire shows up as an anomaly.
#[derive(Clone, Default)]
struct EndCounter {
    fired: Arc<AtomicU32>,
}

impl SessionHooks for EndCounter {
    fn on_session_end(&mut self, _final_score: u32, _outcome: Outcome) {
        self.fired.fetch_add(1, Ordering::SeqCst);
    }
}

fn main() {
    let cli = Cli::parse();
    let base_seed = cli.seed.unwrap_or_else(rand::random);
    let started_at = timestamp();
    let session_id = cli
        .session_id
        .clone()
        .unwrap_or_else(|| default_session_id(base_seed));
    let run_log = LogContext::new(session_id.clone(), None);

    let (maze, config) = match load_setup(&cli) {
        Ok(setup) => setup,
        Err(error) => {
            run_log.emit(
                "error",
                "fatal_config",
                None,
                json!({ "error": format!("{error:#}") }),
            );
            std::process::exit(2);
        }
    };

    let mut has_anomaly = false;
    let mut results = Vec::new();
    let mut outcome_counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_anomalies = 0usize;
    let tick_limit = cli.max_seconds.saturating_mul(1_000) / TICK_MS;

    for run in 0..cli.runs {
        let seed = base_seed.wrapping_add(run);
        let log = LogContext::new(session_id.clone(), Some(seed));
        log.emit(
            "info",
            "run_started",
            None,
            json!({
                "run": run,
                "rows": maze.rows(),
                "cols": maze.cols(),
                "pursuers": maze.pursuer_spawns().len(),
            }),
        );

        let output = match run_session(run, seed, maze.clone(), config.clone(), tick_limit, &log) {
            Ok(output) => output,
            Err(error) => {
                log.emit(
                    "error",
                    "fatal_config",
                    None,
                    json!({ "error": format!("{error:#}") }),
                );
                std::process::exit(2);
            }
        };

        for anomaly in &output.anomaly_records {
            log.emit(
                "warn",
                "anomaly_detected",
                Some(anomaly.tick),
                json!({ "message": anomaly.message }),
            );
        }
        if !output.result.anomalies.is_empty() {
            has_anomaly = true;
        }
        total_anomalies += output.anomaly_records.len();
        *outcome_counts
            .entry(outcome_key(output.result.outcome))
            .or_insert(0) += 1;

        log.emit(
            "info",
            "run_finished",
            Some(output.finished_tick),
            json!({
                "outcome": output.result.outcome,
                "finalScore": output.result.final_score,
                "durationMs": output.result.duration_ms,
                "anomalyCount": output.anomaly_records.len(),
            }),
        );

        match serde_json::to_string(&output.result) {
            Ok(line) => println!("{line}"),
            Err(error) => log.emit(
                "error",
                "result_serialize_failed",
                None,
                json!({ "error": error.to_string() }),
            ),
        }
        results.push(output.result);
    }

    let summary = build_run_summary(
        session_id,
        started_at,
        timestamp(),
        results,
        outcome_counts,
        total_anomalies,
    );

    let mut summary_out_written: Option<String> = None;
    if let Some(path) = cli.summary_out.as_ref() {
        if let Err(error) = write_summary(path, &summary) {
            run_log.emit(
                "error",
                "summary_write_failed",
                None,
                json!({
                    "path": path.to_string_lossy(),
                    "error": format!("{error:#}"),
                }),
            );
            std::process::exit(2);
        }
        summary_out_written = Some(path.to_string_lossy().to_string());
    }

    run_log.emit(
        "info",
        "all_runs_finished",
        None,
        json!({
            "runCount": summary.run_count,
            "anomalyCount": summary.anomaly_count,
            "averageScore": summary.average_score,
            "outcomeCounts": summary.outcome_counts,
            "summaryOut": summary_out_written,
        }),
    );

    if has_anomaly {
        std::process::exit(1);
    }
}

fn load_setup(cli: &Cli) -> anyhow::Result<(Maze, SessionConfig)> {
    let maze = match cli.maze.as_ref() {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading maze {}", path.display()))?;
            Maze::parse(&text).with_context(|| format!("parsing maze {}", path.display()))?
        }
        None => Maze::classic().context("building the classic maze")?,
    };
    let config = match cli.config.as_ref() {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    Ok((maze, config))
}

fn run_session(
    run: u32,
    seed: u32,
    maze: Maze,
    config: SessionConfig,
    tick_limit: u64,
    log: &LogContext,
) -> anyhow::Result<RunOutput> {
    let counter = EndCounter::default();
    let fired = Arc::clone(&counter.fired);
    let mut engine = GameEngine::new(maze, config, seed, Box::new(counter))?;

    let mut anomalies = Vec::new();
    let mut anomaly_records = Vec::new();
    let mut anomaly_seen = HashSet::new();
    let mut last_pellets = engine.pellets_remaining();
    let mut power_modes = 0u32;
    let mut timed_out = false;
    let mut last_tick = 0u64;

    engine.start();
    while !engine.is_ended() {
        let dir = engine.autopilot_direction();
        engine.set_direction(dir);
        engine.step(TICK_MS);

        let snapshot = engine.build_snapshot(true);
        last_tick = snapshot.tick;
        for message in collect_snapshot_anomalies(engine.maze(), &snapshot, last_pellets) {
            push_anomaly(
                &mut anomalies,
                &mut anomaly_records,
                &mut anomaly_seen,
                snapshot.tick,
                message,
            );
        }
        last_pellets = snapshot.pellets_remaining;
        power_modes += snapshot
            .events
            .iter()
            .filter(|event| matches!(event, RuntimeEvent::PowerModeStarted { .. }))
            .count() as u32;
        log_events(log, snapshot.tick, &snapshot.events);

        if snapshot.tick >= tick_limit && !engine.is_ended() {
            timed_out = true;
            engine.close();
            log_events(log, snapshot.tick, &engine.build_snapshot(true).events);
        }
    }

    let fired = fired.load(Ordering::SeqCst);
    if fired != 1 {
        push_anomaly(
            &mut anomalies,
            &mut anomaly_records,
            &mut anomaly_seen,
            last_tick,
            format!("session end fired {fired} times"),
        );
    }

    let summary = engine.build_summary();
    Ok(RunOutput {
        result: RunResultLine {
            run,
            seed,
            outcome: summary.outcome,
            final_score: summary.final_score,
            level: summary.level,
            duration_ms: summary.duration_ms,
            pellets_eaten: summary.pellets_eaten,
            pursuers_captured: summary.pursuers_captured,
            lives_lost: summary.lives_lost,
            power_modes,
            timed_out,
            anomalies,
        },
        anomaly_records,
        finished_tick: last_tick,
    })
}

fn collect_snapshot_anomalies(maze: &Maze, snapshot: &Snapshot, last_pellets: usize) -> Vec<String> {
    let mut anomalies = Vec::new();
    if snapshot.pellets_remaining > last_pellets {
        anomalies.push(format!(
            "pellets went up: {last_pellets} -> {}",
            snapshot.pellets_remaining
        ));
    }

    let player = Position::new(snapshot.player.row, snapshot.player.col);
    if !maze.is_traversable(player) {
        anomalies.push(format!("player on a wall at {},{}", player.row, player.col));
    }
    for pursuer in &snapshot.pursuers {
        if !maze.is_traversable(Position::new(pursuer.row, pursuer.col)) {
            anomalies.push(format!(
                "pursuer {} on a wall at {},{}",
                pursuer.id, pursuer.row, pursuer.col
            ));
        }
    }

    let wins = snapshot
        .events
        .iter()
        .filter(|event| {
            matches!(
                event,
                RuntimeEvent::SessionEnded {
                    outcome: Outcome::Won,
                    ..
                }
            )
        })
        .count();
    if wins > 0 && snapshot.pellets_remaining != 0 {
        anomalies.push(format!(
            "won with {} pellets left",
            snapshot.pellets_remaining
        ));
    }
    anomalies
}

fn push_anomaly(
    anomalies: &mut Vec<String>,
    anomaly_records: &mut Vec<AnomalyRecord>,
    anomaly_seen: &mut HashSet<String>,
    tick: u64,
    message: String,
) {
    anomaly_records.push(AnomalyRecord {
        tick,
        message: message.clone(),
    });
    if anomaly_seen.insert(message.clone()) {
        anomalies.push(message);
    }
}

fn default_session_id(seed: u32) -> String {
    format!("sim-{seed}")
}

fn outcome_key(outcome: Option<Outcome>) -> String {
    match outcome {
        Some(Outcome::Won) => "won",
        Some(Outcome::Lost) => "lost",
        Some(Outcome::Closed) => "closed",
        None => "unfinished",
    }
    .to_string()
}

fn build_run_summary(
    session_id: String,
    started_at: String,
    finished_at: String,
    runs: Vec<RunResultLine>,
    outcome_counts: BTreeMap<String, usize>,
    anomaly_count: usize,
) -> RunSummary {
    let run_count = runs.len();
    let total_score: u64 = runs.iter().map(|run| u64::from(run.final_score)).sum();
    let average_score = if run_count == 0 {
        0
    } else {
        (total_score / run_count as u64) as u32
    };
    RunSummary {
        session_id,
        started_at,
        finished_at,
        run_count,
        anomaly_count,
        average_score,
        outcome_counts,
        runs,
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn write_summary(path: &Path, summary: &RunSummary) -> anyhow::Result<()> {
    let summary_text =
        serde_json::to_string_pretty(summary).context("serializing run summary")?;
    std::fs::write(path, summary_text)
        .with_context(|| format!("writing summary to {}", path.display()))
}
