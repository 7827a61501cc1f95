use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::{
    CAPTURED_RESPAWN_MS, CAPTURE_POINTS, COWARD_RADIUS, DEPLETION_SPEEDUP, ERRATIC_PURSUIT_CHANCE,
    FRIGHTENED_CADENCE_MS, PELLET_POINTS, PLAYER_CADENCE_MS, POWER_DURATION_MS,
    POWER_PELLET_POINTS, PURSUER_CADENCE_MS, RESPAWN_GRACE_MS, STARTING_LIVES,
};
use crate::error::ConfigurationError;

/// Tunables for one session. Every field may be omitted from a JSON file and
/// falls back to the value in `constants`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    #[serde(rename = "startingLives")]
    pub starting_lives: u32,
    #[serde(rename = "pelletPoints")]
    pub pellet_points: u32,
    #[serde(rename = "powerPelletPoints")]
    pub power_pellet_points: u32,
    #[serde(rename = "capturePoints")]
    pub capture_points: u32,
    #[serde(rename = "playerCadenceMs")]
    pub player_cadence_ms: u64,
    #[serde(rename = "pursuerCadenceMs")]
    pub pursuer_cadence_ms: u64,
    #[serde(rename = "frightenedCadenceMs")]
    pub frightened_cadence_ms: u64,
    #[serde(rename = "depletionSpeedup")]
    pub depletion_speedup: f32,
    #[serde(rename = "powerDurationMs")]
    pub power_duration_ms: u64,
    #[serde(rename = "capturedRespawnMs")]
    pub captured_respawn_ms: u64,
    /// Invincibility window after a life-loss reset. Zero disables it.
    #[serde(rename = "respawnGraceMs")]
    pub respawn_grace_ms: u64,
    #[serde(rename = "cowardRadius")]
    pub coward_radius: i32,
    #[serde(rename = "erraticPursuitChance")]
    pub erratic_pursuit_chance: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            starting_lives: STARTING_LIVES,
            pellet_points: PELLET_POINTS,
            power_pellet_points: POWER_PELLET_POINTS,
            capture_points: CAPTURE_POINTS,
            player_cadence_ms: PLAYER_CADENCE_MS,
            pursuer_cadence_ms: PURSUER_CADENCE_MS,
            frightened_cadence_ms: FRIGHTENED_CADENCE_MS,
            depletion_speedup: DEPLETION_SPEEDUP,
            power_duration_ms: POWER_DURATION_MS,
            captured_respawn_ms: CAPTURED_RESPAWN_MS,
            respawn_grace_ms: RESPAWN_GRACE_MS,
            coward_radius: COWARD_RADIUS,
            erratic_pursuit_chance: ERRATIC_PURSUIT_CHANCE,
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigurationError> {
        let config: SessionConfig =
            serde_json::from_str(raw).map_err(|err| ConfigurationError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let raw = fs::read_to_string(path).map_err(|err| ConfigurationError::Io {
            path: path.to_string_lossy().to_string(),
            message: err.to_string(),
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.starting_lives == 0 {
            return Err(invalid("startingLives", "must be at least 1"));
        }
        let cadences = [
            ("playerCadenceMs", self.player_cadence_ms),
            ("pursuerCadenceMs", self.pursuer_cadence_ms),
            ("frightenedCadenceMs", self.frightened_cadence_ms),
        ];
        for (name, value) in cadences {
            if value == 0 {
                return Err(invalid(name, "must be greater than zero"));
            }
        }
        if !(0.0..1.0).contains(&self.depletion_speedup) {
            return Err(invalid("depletionSpeedup", "must be within [0, 1)"));
        }
        if !(0.0..=1.0).contains(&self.erratic_pursuit_chance) {
            return Err(invalid("erraticPursuitChance", "must be within [0, 1]"));
        }
        if self.coward_radius < 0 {
            return Err(invalid("cowardRadius", "must not be negative"));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidTunable {
        name,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_fields() {
        let config = SessionConfig::from_json_str(r#"{"startingLives":5,"respawnGraceMs":1500}"#)
            .expect("partial config should parse");
        assert_eq!(config.starting_lives, 5);
        assert_eq!(config.respawn_grace_ms, 1_500);
        assert_eq!(config.pellet_points, PELLET_POINTS);
        assert_eq!(config.power_duration_ms, POWER_DURATION_MS);
    }

    #[test]
    fn zero_cadence_is_rejected() {
        let err = SessionConfig::from_json_str(r#"{"pursuerCadenceMs":0}"#)
            .expect_err("zero cadence must fail");
        assert!(matches!(
            err,
            ConfigurationError::InvalidTunable {
                name: "pursuerCadenceMs",
                ..
            }
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = SessionConfig::from_json_str("{nope").expect_err("bad json must fail");
        assert!(matches!(err, ConfigurationError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let target = std::env::temp_dir()
            .join("maze-chase-missing-config-dir")
            .join("config.json");
        let err = SessionConfig::load(&target).expect_err("missing file must fail");
        assert!(matches!(err, ConfigurationError::Io { .. }));
    }
}
