//! Water-Filling Runs
//!
//! A run is one "new channels" action: draw a fresh Rayleigh channel set,
//! water-fill the power budget over it, and compare the resulting capacity
//! with equal power allocation. Each [`Run::reset`] produces a new,
//! self-contained [`RunResult`]; nothing from a previous draw is reused.
//!
//! ```rust
//! use wlab_core::WaterFilling;
//! use wlab_sim::channel::ChannelConfig;
//! use wlab_sim::run::{Run, RunConfig};
//!
//! let config = RunConfig {
//!     channels: ChannelConfig::seeded(6, 42),
//!     solver: WaterFilling::new(5.0),
//! };
//!
//! let result = Run::execute(&config).unwrap();
//! assert!(result.is_trustworthy());
//! assert!(result.comparison.water_filling >= result.comparison.equal_power - 1e-6);
//! ```

use crate::channel::{inv_snrs, snrs, ChannelConfig, ChannelGenerator, SubChannel};
use crate::error::SimResult;
use serde::{Deserialize, Serialize};
use wlab_core::{Allocation, CapacityComparison, SolveTrace, WaterFilling, WlabConfig};

/// Channel draw plus solver settings for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub channels: ChannelConfig,
    pub solver: WaterFilling,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            channels: ChannelConfig::default(),
            solver: WaterFilling::new(5.0),
        }
    }
}

impl From<&WlabConfig> for RunConfig {
    fn from(config: &WlabConfig) -> Self {
        Self {
            channels: ChannelConfig::from(&config.channels),
            solver: config.solver.solver(),
        }
    }
}

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub channels: Vec<SubChannel>,
    pub allocation: Allocation,
    pub trace: SolveTrace,
    pub comparison: CapacityComparison,
}

impl RunResult {
    /// Whether the capacity comparison rests on a converged allocation.
    pub fn is_trustworthy(&self) -> bool {
        self.allocation.converged
    }
}

/// Repeatable water-filling run over fresh channel draws.
#[derive(Debug)]
pub struct Run {
    generator: ChannelGenerator,
    solver: WaterFilling,
}

impl Run {
    pub fn new(config: RunConfig) -> SimResult<Self> {
        Ok(Self {
            generator: ChannelGenerator::new(config.channels)?,
            solver: config.solver,
        })
    }

    /// One-shot run.
    pub fn execute(config: &RunConfig) -> SimResult<RunResult> {
        Self::new(config.clone())?.reset()
    }

    pub fn solver(&self) -> &WaterFilling {
        &self.solver
    }

    /// Draw new channels and solve over them.
    pub fn reset(&mut self) -> SimResult<RunResult> {
        let channels = self.generator.generate();
        self.solve_channels(channels)
    }

    /// Solve over an existing channel set.
    pub fn solve_channels(&self, channels: Vec<SubChannel>) -> SimResult<RunResult> {
        let (allocation, trace) = self.solver.solve_traced(&inv_snrs(&channels))?;
        let comparison =
            CapacityComparison::compute(&snrs(&channels), &allocation.powers, self.solver.total_power)?;

        tracing::info!(
            channels = channels.len(),
            active = allocation.active_channels(),
            iterations = allocation.iterations,
            converged = allocation.converged,
            capacity_wf = comparison.water_filling,
            capacity_equal = comparison.equal_power,
            "run complete"
        );

        Ok(RunResult {
            channels,
            allocation,
            trace,
            comparison,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use wlab_core::{BracketStrategy, SolverError};

    #[test]
    fn test_run_conserves_power() {
        let config = RunConfig {
            channels: ChannelConfig::seeded(6, 1),
            solver: WaterFilling::new(5.0),
        };
        let result = Run::execute(&config).unwrap();
        assert_eq!(result.channels.len(), 6);
        assert_eq!(result.allocation.num_channels(), 6);
        assert!(result.is_trustworthy());
        assert!((result.allocation.total_power - 5.0).abs() < 1e-6);
        assert_eq!(result.trace.len(), result.allocation.iterations);
    }

    #[test]
    fn test_reset_draws_new_channels() {
        let mut run = Run::new(RunConfig {
            channels: ChannelConfig::seeded(5, 3),
            ..Default::default()
        })
        .unwrap();
        let first = run.reset().unwrap();
        let second = run.reset().unwrap();
        assert_ne!(first.channels, second.channels);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let config = RunConfig {
            channels: ChannelConfig::seeded(6, 77),
            ..Default::default()
        };
        assert_eq!(Run::execute(&config).unwrap(), Run::execute(&config).unwrap());
    }

    #[test]
    fn test_water_filling_never_loses() {
        let mut run = Run::new(RunConfig {
            channels: ChannelConfig::seeded(8, 12),
            solver: WaterFilling::new(3.0).with_tolerance(1e-10),
        })
        .unwrap();
        for _ in 0..50 {
            let result = run.reset().unwrap();
            assert!(result.comparison.gain() >= -1e-7);
        }
    }

    #[test]
    fn test_solve_known_channels() {
        let channels = vec![
            SubChannel::from_gain(1, 5.0, 1.0),
            SubChannel::from_gain(2, 2.0, 1.0),
            SubChannel::from_gain(3, 0.5, 1.0),
        ];
        let run = Run::new(RunConfig::default()).unwrap();
        let result = run.solve_channels(channels).unwrap();
        assert!(result.is_trustworthy());
        assert!((result.allocation.water_level - 7.7 / 3.0).abs() < 1e-5);
        assert!(result.comparison.improvement_percent() > 0.0);
    }

    #[test]
    fn test_untrustworthy_when_capped() {
        let channels = vec![
            SubChannel::from_gain(1, 5.0, 1.0),
            SubChannel::from_gain(2, 2.0, 1.0),
            SubChannel::from_gain(3, 0.5, 1.0),
        ];
        let run = Run::new(RunConfig {
            solver: WaterFilling::new(5.0)
                .with_bracket(BracketStrategy::SnrRange)
                .with_max_iterations(100),
            ..Default::default()
        })
        .unwrap();
        let result = run.solve_channels(channels).unwrap();
        assert!(!result.is_trustworthy());
    }

    #[test]
    fn test_invalid_solver_settings_surface() {
        let mut run = Run::new(RunConfig {
            solver: WaterFilling::new(-1.0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            run.reset().unwrap_err(),
            SimError::Solver(SolverError::InvalidPower(-1.0))
        );
    }

    #[test]
    fn test_from_wlab_config() {
        let mut config = WlabConfig::default();
        config.channels.num_channels = 4;
        config.solver.total_power = 2.0;
        let run_config = RunConfig::from(&config);
        assert_eq!(run_config.channels.num_channels, 4);
        assert_eq!(run_config.solver.total_power, 2.0);
    }
}
