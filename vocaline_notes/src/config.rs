// Project configuration.
//
// Tempo, tick resolution, rendering step, and the expression descriptor
// registry live in `ProjectConfig`, loaded from JSON. Every field has a
// default, so a config file only needs the values it changes; an empty
// object `{}` is a valid config.
//
// `from_json` rejects configs that parse but cannot drive rendering: a
// non-positive or non-finite tempo, a zero resolution, or an expression
// descriptor whose range is inverted or excludes its default.
//
// See also: `tempo.rs` for `Tempo` (built by `ProjectConfig::tempo`),
// `expression.rs` for the descriptor registry and its stock entries.

use crate::expression::{ExpressionRegistry, default_registry};
use crate::tempo::{DEFAULT_BPM, DEFAULT_RESOLUTION, Tempo};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Quarter notes per minute.
    pub bpm: f64,
    /// Ticks per quarter note.
    pub resolution: u32,
    /// Tick step between rendered pitch samples.
    pub render_step_ticks: u32,
    /// Expression descriptors keyed by abbreviation.
    pub expressions: ExpressionRegistry,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            bpm: DEFAULT_BPM,
            resolution: DEFAULT_RESOLUTION,
            render_step_ticks: 5,
            expressions: default_registry(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    /// Parsed, but a field holds a value rendering cannot use.
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Json(e) => write!(f, "malformed config: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Json(e)
    }
}

impl ProjectConfig {
    /// The tick/time mapping for this project.
    pub fn tempo(&self) -> Tempo {
        Tempo::new(self.bpm, self.resolution)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ProjectConfig = serde_json::from_str(json)?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if !(self.bpm.is_finite() && self.bpm > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "bpm must be positive, got {}",
                self.bpm
            )));
        }
        if self.resolution == 0 {
            return Err(ConfigError::Invalid("resolution must be positive".into()));
        }
        if let Some((key, d)) = self.expressions.iter().find(|(_, d)| !d.is_valid()) {
            return Err(ConfigError::Invalid(format!(
                "expression {key}: range [{}, {}] with default {}",
                d.min, d.max, d.default_value
            )));
        }
        Ok(())
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tempo::TickTimeline;

    #[test]
    fn empty_object_is_default() {
        let config = ProjectConfig::from_json("{}").unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn partial_config_overrides_only_given_fields() {
        let config = ProjectConfig::from_json(
            r#"{"bpm": 60, "expressions": {"bre": {"name": "breathiness", "abbr": "bre",
                "min": 0, "max": 100, "default_value": 10, "flag": "B"}}}"#,
        )
        .unwrap();
        assert_eq!(config.bpm, 60.0);
        assert_eq!(config.resolution, DEFAULT_RESOLUTION);
        assert_eq!(config.expressions.len(), 1);
        assert_eq!(config.expressions["bre"].default_value, 10.0);
        assert!((config.tempo().ms_to_ticks(1000.0) - 480.0).abs() < 1e-9);
    }

    #[test]
    fn inverted_expression_range_is_rejected() {
        let err = ProjectConfig::from_json(
            r#"{"expressions": {"bre": {"name": "breathiness", "abbr": "bre",
                "min": 100, "max": 0, "default_value": 0, "flag": "B"}}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
        assert!(err.to_string().contains("bre"));
    }

    #[test]
    fn unusable_tempo_is_rejected() {
        for json in [r#"{"bpm": 0}"#, r#"{"bpm": -90}"#, r#"{"resolution": 0}"#] {
            let err = ProjectConfig::from_json(json).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{json}: {err}");
        }
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = ProjectConfig::from_json("{\"bpm\": ").unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn load_missing_file_is_an_error() {
        let err = ProjectConfig::load(Path::new("/nonexistent/vocaline.json"));
        assert!(err.is_err());
    }
}
