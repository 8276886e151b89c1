//! # Configuration System
//!
//! YAML configuration for wlab runs:
//!
//! - Solver settings (budget, tolerance, iteration cap, bracket)
//! - Channel draw settings (count, noise power, seed)
//! - Logging
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `WLAB_CONFIG` environment variable
//! 2. `./wlab.yaml` (current directory)
//! 3. `~/.config/wlab/config.yaml` (user config)
//! 4. `/etc/wlab/config.yaml` (system config)
//!
//! ## Example Configuration
//!
//! ```yaml
//! solver:
//!   total_power: 5.0
//!   tolerance: 1.0e-6
//!   max_iterations: 1000
//!   bracket: analytic
//!
//! channels:
//!   num_channels: 6
//!   noise_power: 1.0
//!   seed: 42
//!
//! logging:
//!   level: info
//!   format: compact
//! ```

use crate::observe::LogConfig;
use crate::waterfilling::{BracketStrategy, WaterFilling, DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "WLAB_CONFIG";

/// Error type for configuration operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("config not found: {0}")]
    NotFound(String),

    #[error("failed to read config: {0}")]
    ReadError(String),

    #[error("failed to parse config: {0}")]
    ParseError(String),

    #[error("invalid config: {0}")]
    ValidationError(String),
}

/// Water-filling solver settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Total power budget
    pub total_power: f64,
    /// Maximum |allocated - budget| accepted as converged
    pub tolerance: f64,
    /// Hard cap on bisection steps
    pub max_iterations: usize,
    /// Initial bracket on the multiplier
    pub bracket: BracketStrategy,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            total_power: 5.0,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            bracket: BracketStrategy::Analytic,
        }
    }
}

impl SolverConfig {
    /// Build the solver described by these settings.
    pub fn solver(&self) -> WaterFilling {
        WaterFilling::new(self.total_power)
            .with_tolerance(self.tolerance)
            .with_max_iterations(self.max_iterations)
            .with_bracket(self.bracket)
    }
}

/// Random sub-channel draw settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    /// Number of parallel sub-channels
    pub num_channels: usize,
    /// Noise power per sub-channel
    pub noise_power: f64,
    /// RNG seed (None draws from entropy)
    pub seed: Option<u64>,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            num_channels: 6,
            noise_power: 1.0,
            seed: None,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WlabConfig {
    pub solver: SolverConfig,
    pub channels: ChannelSettings,
    pub logging: LogConfig,
}

impl WlabConfig {
    /// Load from the first file on the search path, or defaults if none exists.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if !path.exists() {
                return Err(ConfigError::NotFound(format!(
                    "{} points to {}",
                    CONFIG_ENV,
                    path.display()
                )));
            }
            return Self::load_from(&path);
        }

        for path in Self::config_search_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "loading config");
                return Self::load_from(&path);
            }
        }

        Ok(Self::default())
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        Self::parse(&content)
    }

    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = self.to_yaml()?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./wlab.yaml")];

        if let Some(dirs) = directories::ProjectDirs::from("", "", "wlab") {
            paths.push(dirs.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/wlab/config.yaml"));

        paths
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let solver = &self.solver;
        if !(solver.total_power.is_finite() && solver.total_power > 0.0) {
            return Err(ConfigError::ValidationError(
                "solver.total_power must be positive".to_string(),
            ));
        }
        if !(solver.tolerance.is_finite() && solver.tolerance > 0.0) {
            return Err(ConfigError::ValidationError(
                "solver.tolerance must be positive".to_string(),
            ));
        }
        if solver.max_iterations == 0 {
            return Err(ConfigError::ValidationError(
                "solver.max_iterations must be > 0".to_string(),
            ));
        }

        if self.channels.num_channels == 0 {
            return Err(ConfigError::ValidationError(
                "channels.num_channels must be > 0".to_string(),
            ));
        }
        if !(self.channels.noise_power.is_finite() && self.channels.noise_power > 0.0) {
            return Err(ConfigError::ValidationError(
                "channels.noise_power must be positive".to_string(),
            ));
        }

        Ok(())
    }

    /// Annotated example file with the defaults and a fixed seed.
    pub fn example_yaml() -> String {
        let config = Self {
            channels: ChannelSettings {
                seed: Some(42),
                ..Default::default()
            },
            ..Default::default()
        };
        let body = config.to_yaml().unwrap_or_default();
        format!(
            "# wlab configuration\n# Search path: $WLAB_CONFIG, ./wlab.yaml, ~/.config/wlab/config.yaml, /etc/wlab/config.yaml\n{}",
            body
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observe::{LogFormat, LogLevel};

    #[test]
    fn test_default_config() {
        let config = WlabConfig::default();
        assert_eq!(config.solver.total_power, 5.0);
        assert_eq!(config.solver.tolerance, 1e-6);
        assert_eq!(config.solver.max_iterations, 1000);
        assert_eq!(config.channels.num_channels, 6);
        assert!(config.channels.seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
solver:
  total_power: 10.0
  tolerance: 1.0e-9
  bracket: snr-range

channels:
  num_channels: 8
  noise_power: 0.5
  seed: 7

logging:
  level: debug
  format: json
"#;

        let config = WlabConfig::parse(yaml).unwrap();
        assert_eq!(config.solver.total_power, 10.0);
        assert_eq!(config.solver.tolerance, 1e-9);
        assert_eq!(config.solver.bracket, BracketStrategy::SnrRange);
        assert_eq!(config.channels.num_channels, 8);
        assert_eq!(config.channels.seed, Some(7));
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_parse_partial_yaml() {
        let yaml = r#"
channels:
  num_channels: 3
"#;

        let config = WlabConfig::parse(yaml).unwrap();
        assert_eq!(config.channels.num_channels, 3);
        // Defaults should be applied
        assert_eq!(config.channels.noise_power, 1.0);
        assert_eq!(config.solver.max_iterations, 1000);
        assert_eq!(config.solver.bracket, BracketStrategy::Analytic);
    }

    #[test]
    fn test_parse_error() {
        let err = WlabConfig::parse("solver: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_validation() {
        let mut config = WlabConfig::default();
        config.solver.total_power = 0.0;
        assert!(config.validate().is_err());

        config.solver.total_power = 5.0;
        config.solver.tolerance = -1.0;
        assert!(config.validate().is_err());

        config.solver.tolerance = 1e-6;
        config.channels.num_channels = 0;
        assert!(config.validate().is_err());

        config.channels.num_channels = 4;
        config.channels.noise_power = f64::NAN;
        assert!(config.validate().is_err());

        config.channels.noise_power = 1.0;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_solver_from_config() {
        let config = SolverConfig {
            total_power: 2.0,
            tolerance: 1e-8,
            max_iterations: 50,
            bracket: BracketStrategy::SnrRange,
        };
        let solver = config.solver();
        assert_eq!(solver.total_power, 2.0);
        assert_eq!(solver.tolerance, 1e-8);
        assert_eq!(solver.max_iterations, 50);
        assert_eq!(solver.bracket, BracketStrategy::SnrRange);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wlab.yaml");

        let mut config = WlabConfig::default();
        config.channels.seed = Some(99);
        config.solver.total_power = 12.5;
        config.save(&path).unwrap();

        let loaded = WlabConfig::load_from(&path).unwrap();
        assert_eq!(loaded.channels.seed, Some(99));
        assert_eq!(loaded.solver.total_power, 12.5);
    }

    #[test]
    fn test_load_missing_file() {
        let err = WlabConfig::load_from(Path::new("/nonexistent/wlab.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError(_)));
    }

    #[test]
    fn test_example_yaml_parses() {
        let yaml = WlabConfig::example_yaml();
        assert!(yaml.starts_with("# wlab configuration"));
        let config = WlabConfig::parse(&yaml).unwrap();
        assert_eq!(config.channels.seed, Some(42));
        assert!(config.validate().is_ok());
    }
}
