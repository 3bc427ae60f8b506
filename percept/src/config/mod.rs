//! Engine configuration.
//!
//! Configuration is read once from a JSON file into a raw [`ConfigFile`],
//! validated, and translated into an immutable [`EngineConfig`] that the
//! controller receives at construction. The core never runs with an invalid
//! config and never mutates one.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::backend::ApproachId;

/// Default capture interval (the reference deployment samples at 1 fps).
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 1000;

/// Default evaluation window size.
pub const DEFAULT_EVALUATION_WINDOW: usize = 5;

/// Default minimum seconds between switches.
pub const DEFAULT_COOLDOWN_SECS: f64 = 10.0;

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Run the starting approach for the whole session.
    Static,
    /// Monitor performance and switch approaches automatically.
    Dynamic,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Static => write!(f, "static"),
            Mode::Dynamic => write!(f, "dynamic"),
        }
    }
}

/// Performance limits that trigger a switch when window averages cross them.
///
/// `min_fps` is a lower bound; the others are upper bounds. All strict.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Thresholds {
    pub max_latency_ms: f64,
    pub max_cpu_percent: f64,
    pub max_memory_mb: f64,
    pub min_fps: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_latency_ms: 1000.0,
            max_cpu_percent: 80.0,
            max_memory_mb: 2000.0,
            min_fps: 0.8,
        }
    }
}

/// Validated dynamic-mode settings.
#[derive(Debug, Clone, Copy)]
pub struct DynamicSettings {
    pub thresholds: Thresholds,
    pub evaluation_window: usize,
    pub switch_cooldown: Duration,
}

impl Default for DynamicSettings {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            evaluation_window: DEFAULT_EVALUATION_WINDOW,
            switch_cooldown: Duration::from_secs_f64(DEFAULT_COOLDOWN_SECS),
        }
    }
}

/// Validated, immutable engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mode: Mode,
    pub starting_approach: ApproachId,
    pub frame_interval: Duration,
    pub dynamic: DynamicSettings,
    /// Approach ids in fallback order: starting approach first, then the
    /// remaining configured ids sorted.
    pub approach_order: Vec<ApproachId>,
}

/// How an approach id is realized.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApproachSpec {
    /// Heuristic over pre-extracted hand landmarks.
    Landmark,
    /// OpenAI-compatible VLM inference server.
    Vlm {
        endpoint: String,
        #[serde(default)]
        model: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
}

/// Configuration errors. All fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON in config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown mode '{0}', expected 'static' or 'dynamic'")]
    UnknownMode(String),

    #[error("starting approach '{0}' is not configured under 'approaches'")]
    UnknownStartingApproach(String),

    #[error("mode is 'dynamic' but 'dynamic.enabled' is false")]
    DynamicModeDisabled,

    #[error("dynamic mode needs at least two approaches, found {0}")]
    NotEnoughApproaches(usize),

    #[error("evaluation_window must be at least 1")]
    WindowTooSmall,

    #[error("threshold '{0}' must be a positive number")]
    NonPositiveThreshold(&'static str),

    #[error("switch_cooldown_seconds must be non-negative, got {0}")]
    NegativeCooldown(f64),
}

/// Raw configuration file contents.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub mode: String,

    /// Starting approach id.
    pub approach: String,

    #[serde(default)]
    pub capture: CaptureSection,

    #[serde(default)]
    pub dynamic: DynamicSection,

    pub approaches: HashMap<String, ApproachSpec>,
}

/// `capture` section of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureSection {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for CaptureSection {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_FRAME_INTERVAL_MS,
        }
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_FRAME_INTERVAL_MS
}

/// `dynamic` section of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct DynamicSection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub performance_thresholds: Thresholds,

    #[serde(default = "default_window")]
    pub evaluation_window: usize,

    #[serde(default = "default_cooldown")]
    pub switch_cooldown_seconds: f64,
}

impl Default for DynamicSection {
    fn default() -> Self {
        Self {
            enabled: false,
            performance_thresholds: Thresholds::default(),
            evaluation_window: DEFAULT_EVALUATION_WINDOW,
            switch_cooldown_seconds: DEFAULT_COOLDOWN_SECS,
        }
    }
}

fn default_window() -> usize {
    DEFAULT_EVALUATION_WINDOW
}

fn default_cooldown() -> f64 {
    DEFAULT_COOLDOWN_SECS
}

impl ConfigFile {
    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Validate and translate into the immutable engine configuration.
    pub fn to_engine_config(&self) -> Result<EngineConfig, ConfigError> {
        let mode = match self.mode.as_str() {
            "static" => Mode::Static,
            "dynamic" => Mode::Dynamic,
            other => return Err(ConfigError::UnknownMode(other.to_string())),
        };

        if !self.approaches.contains_key(&self.approach) {
            return Err(ConfigError::UnknownStartingApproach(self.approach.clone()));
        }

        let mut dynamic = DynamicSettings::default();
        if mode == Mode::Dynamic {
            if !self.dynamic.enabled {
                return Err(ConfigError::DynamicModeDisabled);
            }
            if self.approaches.len() < 2 {
                return Err(ConfigError::NotEnoughApproaches(self.approaches.len()));
            }
            if self.dynamic.evaluation_window < 1 {
                return Err(ConfigError::WindowTooSmall);
            }
            validate_thresholds(&self.dynamic.performance_thresholds)?;
            let cooldown = self.dynamic.switch_cooldown_seconds;
            if !cooldown.is_finite() || cooldown < 0.0 {
                return Err(ConfigError::NegativeCooldown(cooldown));
            }
            dynamic = DynamicSettings {
                thresholds: self.dynamic.performance_thresholds,
                evaluation_window: self.dynamic.evaluation_window,
                switch_cooldown: Duration::from_secs_f64(cooldown),
            };
        }

        let starting_approach = ApproachId::new(&self.approach);

        // Fallback order: starting approach first, remaining ids sorted for
        // determinism (the file's map carries no order).
        let mut rest: Vec<ApproachId> = self
            .approaches
            .keys()
            .filter(|id| **id != self.approach)
            .map(ApproachId::new)
            .collect();
        rest.sort();
        let mut approach_order = vec![starting_approach.clone()];
        approach_order.extend(rest);

        Ok(EngineConfig {
            mode,
            starting_approach,
            frame_interval: Duration::from_millis(self.capture.interval_ms),
            dynamic,
            approach_order,
        })
    }

    /// Spec for a configured approach id.
    pub fn approach_spec(&self, id: &ApproachId) -> Option<&ApproachSpec> {
        self.approaches.get(id.as_str())
    }
}

fn validate_thresholds(thresholds: &Thresholds) -> Result<(), ConfigError> {
    let checks = [
        ("max_latency_ms", thresholds.max_latency_ms),
        ("max_cpu_percent", thresholds.max_cpu_percent),
        ("max_memory_mb", thresholds.max_memory_mb),
        ("min_fps", thresholds.min_fps),
    ];
    for (name, value) in checks {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::NonPositiveThreshold(name));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_json() -> &'static str {
        r#"{
            "mode": "dynamic",
            "approach": "landmark",
            "capture": { "interval_ms": 500 },
            "dynamic": {
                "enabled": true,
                "performance_thresholds": {
                    "max_latency_ms": 1000.0,
                    "max_cpu_percent": 80.0,
                    "max_memory_mb": 2000.0,
                    "min_fps": 0.8
                },
                "evaluation_window": 5,
                "switch_cooldown_seconds": 10.0
            },
            "approaches": {
                "landmark": { "kind": "landmark" },
                "vlm": { "kind": "vlm", "endpoint": "http://127.0.0.1:8080" }
            }
        }"#
    }

    fn parse(json: &str) -> ConfigFile {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_and_validate_sample() {
        let config = parse(sample_json()).to_engine_config().unwrap();
        assert_eq!(config.mode, Mode::Dynamic);
        assert_eq!(config.starting_approach, ApproachId::new("landmark"));
        assert_eq!(config.frame_interval, Duration::from_millis(500));
        assert_eq!(config.dynamic.evaluation_window, 5);
        assert_eq!(config.dynamic.switch_cooldown, Duration::from_secs(10));
        assert_eq!(
            config.approach_order,
            vec![ApproachId::new("landmark"), ApproachId::new("vlm")]
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(sample_json().as_bytes()).unwrap();

        let config = ConfigFile::load(file.path()).unwrap();
        assert_eq!(config.approach, "landmark");
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigFile::load(Path::new("/nonexistent/config.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let mut file = parse(sample_json());
        file.mode = "adaptive".to_string();
        assert!(matches!(
            file.to_engine_config(),
            Err(ConfigError::UnknownMode(_))
        ));
    }

    #[test]
    fn test_unknown_starting_approach_rejected() {
        let mut file = parse(sample_json());
        file.approach = "cnn".to_string();
        assert!(matches!(
            file.to_engine_config(),
            Err(ConfigError::UnknownStartingApproach(_))
        ));
    }

    #[test]
    fn test_dynamic_mode_requires_enabled_flag() {
        let mut file = parse(sample_json());
        file.dynamic.enabled = false;
        assert!(matches!(
            file.to_engine_config(),
            Err(ConfigError::DynamicModeDisabled)
        ));
    }

    #[test]
    fn test_dynamic_mode_requires_two_approaches() {
        let mut file = parse(sample_json());
        file.approaches.remove("vlm");
        assert!(matches!(
            file.to_engine_config(),
            Err(ConfigError::NotEnoughApproaches(1))
        ));
    }

    #[test]
    fn test_window_size_zero_rejected() {
        let mut file = parse(sample_json());
        file.dynamic.evaluation_window = 0;
        assert!(matches!(
            file.to_engine_config(),
            Err(ConfigError::WindowTooSmall)
        ));
    }

    #[test]
    fn test_non_positive_threshold_rejected() {
        let mut file = parse(sample_json());
        file.dynamic.performance_thresholds.min_fps = 0.0;
        assert!(matches!(
            file.to_engine_config(),
            Err(ConfigError::NonPositiveThreshold("min_fps"))
        ));
    }

    #[test]
    fn test_negative_cooldown_rejected() {
        let mut file = parse(sample_json());
        file.dynamic.switch_cooldown_seconds = -1.0;
        assert!(matches!(
            file.to_engine_config(),
            Err(ConfigError::NegativeCooldown(_))
        ));
    }

    #[test]
    fn test_static_mode_skips_dynamic_validation() {
        let mut file = parse(sample_json());
        file.mode = "static".to_string();
        file.dynamic.enabled = false;
        file.dynamic.evaluation_window = 0;
        // Static mode never evaluates thresholds, so these are not fatal.
        let config = file.to_engine_config().unwrap();
        assert_eq!(config.mode, Mode::Static);
    }

    #[test]
    fn test_vlm_spec_fields() {
        let file = parse(sample_json());
        let spec = file.approach_spec(&ApproachId::new("vlm")).unwrap();
        match spec {
            ApproachSpec::Vlm {
                endpoint,
                model,
                timeout_secs,
            } => {
                assert_eq!(endpoint, "http://127.0.0.1:8080");
                assert!(model.is_none());
                assert!(timeout_secs.is_none());
            }
            other => panic!("expected vlm spec, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_applied_when_sections_missing() {
        let json = r#"{
            "mode": "static",
            "approach": "landmark",
            "approaches": { "landmark": { "kind": "landmark" } }
        }"#;
        let config = parse(json).to_engine_config().unwrap();
        assert_eq!(
            config.frame_interval,
            Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS)
        );
        assert_eq!(config.dynamic.evaluation_window, DEFAULT_EVALUATION_WINDOW);
    }
}
