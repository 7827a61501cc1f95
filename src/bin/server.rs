use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use maze_chase_engine::config::SessionConfig;
use maze_chase_engine::constants::{CONTINUE_TIMEOUT_MS, TICK_MS};
use maze_chase_engine::engine::{ContinueOffer, GameEngine, SessionHooks};
use maze_chase_engine::error::ContinueError;
use maze_chase_engine::maze::Maze;
use maze_chase_engine::server_protocol::{parse_client_message, ParsedClientMessage};
use maze_chase_engine::server_utils::{parse_continue_timeout_ms, parse_port, sanitize_name};
use maze_chase_engine::telemetry::{log_events, LogContext};
use maze_chase_engine::types::{Outcome, SessionPhase};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tower_http::services::{ServeDir, ServeFile};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

type SharedState = Arc<Mutex<ServerState>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueuePolicy {
    DropOnFull,
    DisconnectOnFull,
}

/// Loaded once at startup; every session is built from it.
struct ServerSettings {
    maze: Maze,
    config: SessionConfig,
    continue_timeout_ms: u64,
}

struct ClientSession {
    tx: mpsc::Sender<String>,
    name: String,
    log: LogContext,
    engine: Option<GameEngine>,
    continue_deadline_ms: Option<u64>,
    /// Set by the session hooks when the outbound queue refused a message.
    stalled: Arc<AtomicBool>,
}

struct ServerState {
    settings: Arc<ServerSettings>,
    clients: HashMap<String, ClientSession>,
    clock_ms: u64,
}

impl ServerState {
    fn new(settings: ServerSettings) -> Self {
        Self {
            settings: Arc::new(settings),
            clients: HashMap::new(),
            clock_ms: 0,
        }
    }
}

/// Relays engine callbacks to one socket. A continue offer is only pending
/// if it actually reached the client; a lost end notice stalls the client so
/// the next flush disconnects it.
struct ConnectionHooks {
    tx: mpsc::Sender<String>,
    continue_timeout_ms: u64,
    log: LogContext,
    stalled: Arc<AtomicBool>,
}

impl SessionHooks for ConnectionHooks {
    fn on_session_end(&mut self, final_score: u32, outcome: Outcome) {
        let message = json!({
            "type": "session_end",
            "finalScore": final_score,
            "outcome": outcome,
        });
        if let Err(error) = self.tx.try_send(message.to_string()) {
            self.log.emit(
                "warn",
                "session_end_undelivered",
                None,
                json!({ "error": error.to_string(), "finalScore": final_score }),
            );
            self.stalled.store(true, Ordering::Relaxed);
        }
    }

    fn on_life_lost(&mut self) -> ContinueOffer {
        let message = json!({
            "type": "continue_offer",
            "timeoutMs": self.continue_timeout_ms,
        });
        match self.tx.try_send(message.to_string()) {
            Ok(()) => ContinueOffer::Pending,
            Err(error) => {
                self.log.emit(
                    "warn",
                    "continue_offer_undelivered",
                    None,
                    json!({ "error": error.to_string() }),
                );
                ContinueOffer::Declined
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let port = parse_port(std::env::var("PORT").ok().as_deref());
    let boot_log = LogContext::new("server", None);

    let settings = match load_settings() {
        Ok(settings) => settings,
        Err(error) => {
            boot_log.emit(
                "error",
                "fatal_config",
                None,
                json!({ "error": format!("{error:#}") }),
            );
            std::process::exit(2);
        }
    };
    println!(
        "[server] maze {}x{} with {} pursuers",
        settings.maze.rows(),
        settings.maze.cols(),
        settings.maze.pursuer_spawns().len()
    );

    let state = Arc::new(Mutex::new(ServerState::new(settings)));
    start_tick_loop(state.clone());

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/api/maze", get(maze_handler))
        .route("/ws", get(ws_handler))
        .with_state(state);

    let app = if let Some(static_dir) = resolve_static_dir() {
        let index_file = static_dir.join("index.html");
        println!(
            "[server] static file root: {}",
            static_dir.to_string_lossy()
        );
        app.fallback_service(
            ServeDir::new(static_dir).not_found_service(ServeFile::new(index_file)),
        )
    } else {
        eprintln!("[server] static file root not found. set STATIC_DIR to serve a client.");
        app
    };

    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;

    println!("[server] listening on :{port}");
    axum::serve(listener, app).await.context("server runtime failed")?;
    Ok(())
}

fn load_settings() -> anyhow::Result<ServerSettings> {
    let maze = match std::env::var("MAZE_PATH") {
        Ok(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("reading maze {path}"))?;
            Maze::parse(&text).with_context(|| format!("parsing maze {path}"))?
        }
        Err(_) => Maze::classic().context("building the classic maze")?,
    };
    let config = match std::env::var("SESSION_CONFIG_PATH") {
        Ok(path) => SessionConfig::load(&PathBuf::from(path))?,
        Err(_) => SessionConfig::default(),
    };
    let continue_timeout_ms = parse_continue_timeout_ms(
        std::env::var("CONTINUE_TIMEOUT_MS").ok().as_deref(),
        CONTINUE_TIMEOUT_MS,
    );
    Ok(ServerSettings {
        maze,
        config,
        continue_timeout_ms,
    })
}

fn resolve_static_dir() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var("STATIC_DIR") {
        let path = PathBuf::from(raw);
        if path.join("index.html").is_file() {
            return Some(path);
        }
    }

    let candidates = [PathBuf::from("web"), PathBuf::from("dist/client")];
    candidates
        .into_iter()
        .find(|path| path.join("index.html").is_file())
}

async fn healthz(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(json!({ "ok": true, "sessions": guard.clients.len() }))
}

async fn maze_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let guard = state.lock().await;
    Json(json!({
        "maze": guard.settings.maze.to_init(),
        "config": guard.settings.config,
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(state, socket))
}

async fn handle_socket(state: SharedState, socket: WebSocket) {
    let client_id = make_session_id();
    let (tx, mut rx) = mpsc::channel::<String>(256);

    {
        let mut guard = state.lock().await;
        register_client(&mut guard, &client_id, tx.clone());
    }

    let (mut ws_sender, mut ws_receiver) = socket.split();
    let writer = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if ws_sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(received) = ws_receiver.next().await {
        let Ok(message) = received else {
            break;
        };

        match message {
            Message::Text(raw) => {
                handle_client_message(&state, &client_id, raw.as_str()).await;
            }
            Message::Binary(raw) => {
                if let Ok(text) = String::from_utf8(raw.to_vec()) {
                    handle_client_message(&state, &client_id, &text).await;
                } else {
                    let mut guard = state.lock().await;
                    send_error(&mut guard, &client_id, "invalid utf8 message");
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    {
        let mut guard = state.lock().await;
        disconnect_client(&mut guard, &client_id);
    }
    drop(tx);
    let _ = writer.await;
}

async fn handle_client_message(state: &SharedState, client_id: &str, raw: &str) {
    let mut guard = state.lock().await;
    let Some(message) = parse_client_message(raw) else {
        send_error(&mut guard, client_id, "invalid message");
        return;
    };
    apply_client_message(&mut guard, client_id, message);
}

fn register_client(state: &mut ServerState, client_id: &str, tx: mpsc::Sender<String>) {
    let log = LogContext::new(client_id, None);
    log.emit("info", "client_connected", None, json!({}));
    state.clients.insert(
        client_id.to_string(),
        ClientSession {
            tx,
            name: sanitize_name(""),
            log,
            engine: None,
            continue_deadline_ms: None,
            stalled: Arc::new(AtomicBool::new(false)),
        },
    );
    send_to_client(
        state,
        client_id,
        &json!({ "type": "welcome", "clientId": client_id }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn apply_client_message(state: &mut ServerState, client_id: &str, message: ParsedClientMessage) {
    match message {
        ParsedClientMessage::Hello { name, seed } => {
            open_session(state, client_id, &name, seed);
            return;
        }
        ParsedClientMessage::Ping { t } => {
            send_to_client(
                state,
                client_id,
                &json!({ "type": "pong", "t": t }),
                QueuePolicy::DisconnectOnFull,
            );
            return;
        }
        _ => {}
    }

    let has_session = state
        .clients
        .get(client_id)
        .is_some_and(|client| client.engine.is_some());
    if !has_session {
        send_error(state, client_id, "send hello first");
        return;
    }
    let Some(client) = state.clients.get_mut(client_id) else {
        return;
    };
    let Some(engine) = client.engine.as_mut() else {
        return;
    };
    match message {
        ParsedClientMessage::Start => engine.start(),
        ParsedClientMessage::Input { dir } => engine.set_direction(dir),
        ParsedClientMessage::Pause => engine.pause(),
        ParsedClientMessage::Resume => engine.resume(),
        ParsedClientMessage::Close => engine.close(),
        ParsedClientMessage::Continue { accept } => {
            client.continue_deadline_ms = None;
            engine.resolve_continue(Ok(accept));
        }
        ParsedClientMessage::NextLevel => {
            engine.next_level();
        }
        ParsedClientMessage::Restart => {
            engine.restart();
        }
        ParsedClientMessage::Hello { .. } | ParsedClientMessage::Ping { .. } => {}
    }
    flush_session(state, client_id);
}

fn open_session(state: &mut ServerState, client_id: &str, name: &str, seed: Option<u32>) {
    let settings = Arc::clone(&state.settings);
    let Some(client) = state.clients.get_mut(client_id) else {
        return;
    };
    if let Some(previous) = client.engine.as_mut() {
        previous.close();
    }

    let seed = seed.unwrap_or_else(rand::random);
    let hooks = ConnectionHooks {
        tx: client.tx.clone(),
        continue_timeout_ms: settings.continue_timeout_ms,
        log: LogContext::new(client_id, Some(seed)),
        stalled: Arc::clone(&client.stalled),
    };
    let engine = match GameEngine::new(
        settings.maze.clone(),
        settings.config.clone(),
        seed,
        Box::new(hooks),
    ) {
        Ok(engine) => engine,
        Err(error) => {
            client.log.emit(
                "error",
                "session_rejected",
                None,
                json!({ "error": error.to_string() }),
            );
            send_error(state, client_id, "session could not be created");
            return;
        }
    };

    client.name = sanitize_name(name);
    client.log = LogContext::new(client_id, Some(seed));
    client.continue_deadline_ms = None;
    client.log.emit(
        "info",
        "session_started",
        None,
        json!({ "name": client.name }),
    );
    let init = json!({
        "type": "session_init",
        "name": client.name,
        "seed": seed,
        "maze": engine.get_maze_init(),
        "config": engine.config(),
    });
    client.engine = Some(engine);

    send_to_client(state, client_id, &init, QueuePolicy::DisconnectOnFull);
    flush_session(state, client_id);
}

/// Sends a fresh snapshot with whatever events are queued and logs them.
fn flush_session(state: &mut ServerState, client_id: &str) {
    let Some(client) = state.clients.get_mut(client_id) else {
        return;
    };
    let Some(engine) = client.engine.as_mut() else {
        return;
    };
    let snapshot = engine.build_snapshot(true);
    log_events(&client.log, snapshot.tick, &snapshot.events);
    if client.stalled.load(Ordering::Relaxed) {
        disconnect_client(state, client_id);
        return;
    }
    send_to_client(
        state,
        client_id,
        &json!({ "type": "state", "snapshot": snapshot }),
        QueuePolicy::DropOnFull,
    );
}

fn disconnect_client(state: &mut ServerState, client_id: &str) {
    let Some(mut client) = state.clients.remove(client_id) else {
        return;
    };
    if let Some(engine) = client.engine.as_mut() {
        engine.close();
        let snapshot = engine.build_snapshot(true);
        log_events(&client.log, snapshot.tick, &snapshot.events);
    }
    client
        .log
        .emit("info", "client_disconnected", None, json!({}));
}

fn start_tick_loop(state: SharedState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;
            let mut guard = state.lock().await;
            tick_sessions(&mut guard, TICK_MS);
        }
    });
}

fn tick_sessions(state: &mut ServerState, dt_ms: u64) {
    state.clock_ms = state.clock_ms.saturating_add(dt_ms);
    let now_ms = state.clock_ms;
    let continue_timeout_ms = state.settings.continue_timeout_ms;
    let client_ids: Vec<String> = state.clients.keys().cloned().collect();

    for client_id in client_ids {
        let should_send = {
            let Some(client) = state.clients.get_mut(&client_id) else {
                continue;
            };
            let Some(engine) = client.engine.as_mut() else {
                continue;
            };
            engine.step(dt_ms);

            if engine.phase() == SessionPhase::AwaitingContinue {
                let deadline = *client
                    .continue_deadline_ms
                    .get_or_insert(now_ms + continue_timeout_ms);
                if now_ms >= deadline {
                    client.continue_deadline_ms = None;
                    engine.resolve_continue(Err(ContinueError::TimedOut));
                }
            } else {
                client.continue_deadline_ms = None;
            }

            engine.phase() == SessionPhase::Running || engine.has_pending_events()
        };
        if should_send {
            flush_session(state, &client_id);
        }
    }
}

fn send_to_client(state: &mut ServerState, client_id: &str, message: &Value, policy: QueuePolicy) {
    let send_failed = if let Some(client) = state.clients.get(client_id) {
        client.tx.try_send(message.to_string()).is_err()
    } else {
        false
    };
    if send_failed && policy == QueuePolicy::DisconnectOnFull {
        disconnect_client(state, client_id);
    }
}

fn send_error(state: &mut ServerState, client_id: &str, message: &str) {
    send_to_client(
        state,
        client_id,
        &json!({ "type": "error", "message": message }),
        QueuePolicy::DisconnectOnFull,
    );
}

fn make_session_id() -> String {
    let seq = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    format!("ws_{seq}_{suffix}")
}
