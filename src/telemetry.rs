use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::{json, Value};

use crate::types::RuntimeEvent;

#[derive(Clone, Debug, Serialize)]
pub struct StructuredLogLine {
    pub timestamp: String,
    pub level: String,
    pub event: String,
    #[serde(rename = "sessionId")]
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<u64>,
    pub details: Value,
}

/// Who a log line is about.
#[derive(Clone, Debug)]
pub struct LogContext {
    pub session_id: String,
    pub seed: Option<u32>,
}

impl LogContext {
    pub fn new(session_id: impl Into<String>, seed: Option<u32>) -> Self {
        Self {
            session_id: session_id.into(),
            seed,
        }
    }

    pub fn line(&self, level: &str, event: &str, tick: Option<u64>, details: Value) -> StructuredLogLine {
        StructuredLogLine {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: level.to_string(),
            event: event.to_string(),
            session_id: self.session_id.clone(),
            seed: self.seed,
            tick,
            details,
        }
    }

    pub fn emit(&self, level: &str, event: &str, tick: Option<u64>, details: Value) {
        emit_log(&self.line(level, event, tick, details));
    }
}

/// One JSON object per line on stderr.
pub fn emit_log(line: &StructuredLogLine) {
    match serde_json::to_string(line) {
        Ok(text) => eprintln!("{text}"),
        Err(error) => eprintln!("[log] failed to serialize {}: {error}", line.event),
    }
}

/// Level, name and details for the events worth a log line. Pellet-by-pellet
/// and phase chatter is left to snapshots.
pub fn describe_event(event: &RuntimeEvent) -> Option<(&'static str, &'static str, Value)> {
    match event {
        RuntimeEvent::PowerModeStarted { duration_ms } => Some((
            "info",
            "power_mode_started",
            json!({ "durationMs": duration_ms }),
        )),
        RuntimeEvent::PursuerCaptured { pursuer, points } => Some((
            "info",
            "pursuer_captured",
            json!({ "pursuer": pursuer, "points": points }),
        )),
        RuntimeEvent::LifeLost { lives_remaining } => Some((
            "warn",
            "life_lost",
            json!({ "livesRemaining": lives_remaining }),
        )),
        RuntimeEvent::ContinueRequested => Some(("info", "continue_requested", json!({}))),
        RuntimeEvent::ContinueResolved { accepted } => Some((
            "info",
            "continue_resolved",
            json!({ "accepted": accepted }),
        )),
        RuntimeEvent::LevelStarted { level } => {
            Some(("info", "level_started", json!({ "level": level })))
        }
        RuntimeEvent::SessionEnded {
            final_score,
            outcome,
        } => Some((
            "info",
            "session_ended",
            json!({ "finalScore": final_score, "outcome": outcome }),
        )),
        _ => None,
    }
}

pub fn log_events(ctx: &LogContext, tick: u64, events: &[RuntimeEvent]) {
    for event in events {
        if let Some((level, name, details)) = describe_event(event) {
            ctx.emit(level, name, Some(tick), details);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::types::Outcome;

    #[test]
    fn line_serializes_with_camel_case_keys() {
        let ctx = LogContext::new("sim-7", Some(7));
        let line = ctx.line("info", "session_started", Some(3), json!({ "rows": 19 }));
        let value = serde_json::to_value(&line).expect("log line should serialize");
        assert_eq!(value["sessionId"], "sim-7");
        assert_eq!(value["seed"], 7);
        assert_eq!(value["tick"], 3);
        assert_eq!(value["details"]["rows"], 19);
        let timestamp = value["timestamp"].as_str().expect("timestamp is a string");
        assert!(DateTime::parse_from_rfc3339(timestamp).is_ok());
    }

    #[test]
    fn optional_fields_are_omitted() {
        let ctx = LogContext::new("ws-abc", None);
        let value = serde_json::to_value(ctx.line("warn", "x", None, Value::Null))
            .expect("log line should serialize");
        assert!(value.get("seed").is_none());
        assert!(value.get("tick").is_none());
    }

    #[test]
    fn only_notable_events_are_described() {
        assert!(describe_event(&RuntimeEvent::PelletEaten {
            row: 1,
            col: 1,
            points: 10
        })
        .is_none());
        let (level, name, details) = describe_event(&RuntimeEvent::SessionEnded {
            final_score: 90,
            outcome: Outcome::Closed,
        })
        .expect("session end is logged");
        assert_eq!(level, "info");
        assert_eq!(name, "session_ended");
        assert_eq!(details["outcome"], "closed");
        let (level, _, _) = describe_event(&RuntimeEvent::LifeLost { lives_remaining: 1 })
            .expect("life loss is logged");
        assert_eq!(level, "warn");
    }
}
