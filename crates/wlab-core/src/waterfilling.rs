//! # Water-Filling Power Allocation
//!
//! Finds the power allocation over `N` parallel sub-channels that maximises
//! the sum capacity `sum_i log2(1 + P_i * gamma_i)` under the budget
//! `sum_i P_i <= P_total`, `P_i >= 0`.
//!
//! The optimum has the form `P_i = max(1/mu - 1/gamma_i, 0)`: every channel is
//! filled up to a common water level `1/mu` above its floor `1/gamma_i`, and
//! channels whose floor sits above the water stay dry. The solver finds `mu` by
//! bisection, one bracket halving per iteration, and can record every step so
//! the search can be replayed afterwards.
//!
//! ```text
//!  level
//!    ^        water level 1/mu
//!    |  - - -+-----+-----+- - - - - - - - -
//!    |       |~~~~~|~~~~~|           +-----+
//!    |       |~~~~~|~~~~~|           | dry |
//!    |       |~~~~~+-----+           |     |
//!    |       +-----+ 1/g2|           |     |
//!    |       | 1/g1|     |           | 1/g3|
//!    +-------+-----+-----+-----------+-----+--> channel
//! ```
//!
//! # Example
//!
//! ```rust
//! use wlab_core::waterfilling::{WaterFilling, BracketStrategy};
//!
//! let inv_snr = [0.2, 0.5, 2.0];
//! let alloc = WaterFilling::new(5.0)
//!     .with_tolerance(1e-9)
//!     .with_bracket(BracketStrategy::Analytic)
//!     .solve(&inv_snr)
//!     .unwrap();
//!
//! assert!(alloc.converged);
//! assert!((alloc.total_power - 5.0).abs() < 1e-9);
//! assert!(alloc.powers[0] >= alloc.powers[2]);
//! ```

use crate::error::{SolverError, SolverResult};
use serde::{Deserialize, Serialize};

/// Default maximum deviation between allocated and budgeted power.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// Default hard cap on bisection steps.
pub const DEFAULT_MAX_ITERATIONS: usize = 1000;

/// How the initial bracket on the multiplier `mu` is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BracketStrategy {
    /// `mu` in `[1/(max floor + P/N), 1/(min floor + P/N)]`.
    ///
    /// At water level `min floor + P/N` no channel can hold more than `P/N`,
    /// and at `max floor + P/N` every channel holds at least `P/N`, so the
    /// root always lies inside.
    Analytic,
    /// `mu` in `[min gamma, max gamma]`, i.e. the water level is searched
    /// between the best and the worst floor.
    ///
    /// Only brackets the root when the solved water level stays below the
    /// worst floor. Otherwise the search runs into the iteration cap and the
    /// allocation comes back with `converged == false`.
    SnrRange,
}

impl Default for BracketStrategy {
    fn default() -> Self {
        BracketStrategy::Analytic
    }
}

impl std::fmt::Display for BracketStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BracketStrategy::Analytic => write!(f, "analytic"),
            BracketStrategy::SnrRange => write!(f, "snr-range"),
        }
    }
}

impl std::str::FromStr for BracketStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "analytic" => Ok(BracketStrategy::Analytic),
            "snr-range" | "snr_range" | "snr" => Ok(BracketStrategy::SnrRange),
            other => Err(format!(
                "Unknown bracket strategy: {}. Use analytic or snr-range",
                other
            )),
        }
    }
}

/// Bisection bracket on the multiplier `mu`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket {
    pub mu_low: f64,
    pub mu_high: f64,
}

impl Bracket {
    /// Build the starting bracket for a validated channel set.
    pub fn initial(strategy: BracketStrategy, inv_snr: &[f64], total_power: f64) -> Self {
        let (min_floor, max_floor) = floor_range(inv_snr);
        match strategy {
            BracketStrategy::Analytic => {
                let share = total_power / inv_snr.len() as f64;
                Self {
                    mu_low: 1.0 / (max_floor + share),
                    mu_high: 1.0 / (min_floor + share),
                }
            }
            // min gamma = 1/max floor, max gamma = 1/min floor
            BracketStrategy::SnrRange => Self {
                mu_low: 1.0 / max_floor,
                mu_high: 1.0 / min_floor,
            },
        }
    }

    /// Midpoint of the bracket.
    pub fn midpoint(&self) -> f64 {
        (self.mu_low + self.mu_high) / 2.0
    }

    /// Water levels spanned by the bracket, lowest first.
    pub fn water_levels(&self) -> (f64, f64) {
        (1.0 / self.mu_high, 1.0 / self.mu_low)
    }
}

/// One bisection step, as recorded by [`WaterFilling::solve_traced`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IterationRecord {
    /// 1-based step number
    pub iteration: usize,
    pub mu_low: f64,
    pub mu_high: f64,
    pub mu_mid: f64,
    /// Allocated minus budgeted power at `mu_mid`
    pub error: f64,
    pub total_allocated: f64,
}

impl IterationRecord {
    /// Water level probed at this step.
    pub fn water_level(&self) -> f64 {
        1.0 / self.mu_mid
    }
}

/// Ordered bisection history of one solve.
///
/// Stepping through the records reproduces the search one bracket halving at
/// a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveTrace {
    records: Vec<IterationRecord>,
}

impl SolveTrace {
    pub fn records(&self) -> &[IterationRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Record at a 0-based replay position, clamped to the last step.
    pub fn step(&self, position: usize) -> Option<&IterationRecord> {
        if self.records.is_empty() {
            return None;
        }
        self.records.get(position.min(self.records.len() - 1))
    }

    pub fn last(&self) -> Option<&IterationRecord> {
        self.records.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, IterationRecord> {
        self.records.iter()
    }
}

/// Result of a water-filling solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    /// Power per channel, in input order
    pub powers: Vec<f64>,
    /// Filled height per channel (`1/gamma_i + P_i`)
    pub levels: Vec<f64>,
    /// Final multiplier
    pub mu: f64,
    /// Common water level `1/mu`
    pub water_level: f64,
    /// Realised `sum P_i`
    pub total_power: f64,
    /// `total_power` minus the budget
    pub final_error: f64,
    /// Bisection steps evaluated
    pub iterations: usize,
    /// Whether the tolerance was met before the iteration cap
    pub converged: bool,
}

impl Allocation {
    pub fn num_channels(&self) -> usize {
        self.powers.len()
    }

    /// Number of channels receiving non-zero power.
    pub fn active_channels(&self) -> usize {
        self.powers.iter().filter(|&&p| p > 0.0).count()
    }

    /// Whether channel `index` (0-based) was left dry.
    pub fn is_dry(&self, index: usize) -> bool {
        self.powers.get(index).map_or(false, |&p| p <= 0.0)
    }
}

/// Bisection water-filling solver.
///
/// Holds the power budget and search settings; the channel floors are passed
/// to each [`solve`](Self::solve) call. Solving is pure, so one solver value
/// can be reused across channel draws and threads.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterFilling {
    pub total_power: f64,
    pub tolerance: f64,
    pub max_iterations: usize,
    pub bracket: BracketStrategy,
}

impl WaterFilling {
    /// Solver for the given budget with default tolerance, cap and bracket.
    pub fn new(total_power: f64) -> Self {
        Self {
            total_power,
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            bracket: BracketStrategy::default(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_bracket(mut self, bracket: BracketStrategy) -> Self {
        self.bracket = bracket;
        self
    }

    /// Check the settings and the channel floors.
    pub fn validate(&self, inv_snr: &[f64]) -> SolverResult<()> {
        validate_inputs(inv_snr, self.total_power)?;
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(SolverError::InvalidTolerance(self.tolerance));
        }
        if self.max_iterations == 0 {
            return Err(SolverError::InvalidIterationCap);
        }
        Ok(())
    }

    /// Allocate the budget over channels with floors `inv_snr` (`1/gamma_i`).
    pub fn solve(&self, inv_snr: &[f64]) -> SolverResult<Allocation> {
        self.run(inv_snr, None)
    }

    /// Like [`solve`](Self::solve), also returning every bisection step.
    pub fn solve_traced(&self, inv_snr: &[f64]) -> SolverResult<(Allocation, SolveTrace)> {
        let mut records = Vec::new();
        let alloc = self.run(inv_snr, Some(&mut records))?;
        Ok((alloc, SolveTrace { records }))
    }

    fn run(
        &self,
        inv_snr: &[f64],
        mut history: Option<&mut Vec<IterationRecord>>,
    ) -> SolverResult<Allocation> {
        self.validate(inv_snr)?;

        let mut bracket = Bracket::initial(self.bracket, inv_snr, self.total_power);
        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            let mu_mid = bracket.midpoint();
            let total_allocated = allocated_power(inv_snr, 1.0 / mu_mid);
            let error = total_allocated - self.total_power;
            iterations += 1;

            tracing::trace!(
                iteration = iterations,
                mu_low = bracket.mu_low,
                mu_high = bracket.mu_high,
                mu_mid,
                error,
                "bisection step"
            );

            if let Some(records) = history.as_deref_mut() {
                records.push(IterationRecord {
                    iteration: iterations,
                    mu_low: bracket.mu_low,
                    mu_high: bracket.mu_high,
                    mu_mid,
                    error,
                    total_allocated,
                });
            }

            if error.abs() < self.tolerance {
                converged = true;
                break;
            } else if error > 0.0 {
                // Too much water: raise mu to lower the level
                bracket.mu_low = mu_mid;
            } else {
                bracket.mu_high = mu_mid;
            }
        }

        let mu = bracket.midpoint();
        let water_level = 1.0 / mu;
        let powers = fill(inv_snr, water_level);
        let levels = inv_snr.iter().zip(&powers).map(|(a, p)| a + p).collect();
        let total_power: f64 = powers.iter().sum();
        let final_error = total_power - self.total_power;

        if converged {
            tracing::debug!(
                channels = inv_snr.len(),
                iterations,
                water_level,
                "water-filling converged"
            );
        } else {
            tracing::warn!(
                channels = inv_snr.len(),
                iterations,
                final_error,
                bracket = %self.bracket,
                "water-filling hit iteration cap without meeting tolerance"
            );
        }

        Ok(Allocation {
            powers,
            levels,
            mu,
            water_level,
            total_power,
            final_error,
            iterations,
            converged,
        })
    }
}

/// Solve with the default tolerance, iteration cap and bracket.
pub fn waterfill(inv_snr: &[f64], total_power: f64) -> SolverResult<Allocation> {
    WaterFilling::new(total_power).solve(inv_snr)
}

/// Closed-form water level by active-set elimination.
///
/// Sorts the floors, starts with every channel wet and drops the highest
/// floor until the level `(P + sum of wet floors) / wet count` clears every
/// remaining floor. Exact up to rounding, so it serves as a reference for the
/// bisection result.
pub fn exact_water_level(inv_snr: &[f64], total_power: f64) -> SolverResult<f64> {
    validate_inputs(inv_snr, total_power)?;

    let mut floors = inv_snr.to_vec();
    floors.sort_by(|a, b| a.total_cmp(b));

    let mut active = floors.len();
    loop {
        let level = (total_power + floors[..active].iter().sum::<f64>()) / active as f64;
        // With one channel left the level is floor + P, always above the floor
        if level > floors[active - 1] || active == 1 {
            return Ok(level);
        }
        active -= 1;
    }
}

/// Per-channel powers for a given water level.
pub fn fill(inv_snr: &[f64], water_level: f64) -> Vec<f64> {
    inv_snr
        .iter()
        .map(|&floor| (water_level - floor).max(0.0))
        .collect()
}

fn allocated_power(inv_snr: &[f64], water_level: f64) -> f64 {
    inv_snr
        .iter()
        .map(|&floor| (water_level - floor).max(0.0))
        .sum()
}

fn floor_range(inv_snr: &[f64]) -> (f64, f64) {
    inv_snr
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &a| {
            (lo.min(a), hi.max(a))
        })
}

fn validate_inputs(inv_snr: &[f64], total_power: f64) -> SolverResult<()> {
    if inv_snr.is_empty() {
        return Err(SolverError::NoChannels);
    }
    if !(total_power.is_finite() && total_power > 0.0) {
        return Err(SolverError::InvalidPower(total_power));
    }
    if let Some((index, &value)) = inv_snr
        .iter()
        .enumerate()
        .find(|(_, &a)| !(a.is_finite() && a > 0.0))
    {
        return Err(SolverError::InvalidInverseSnr { index, value });
    }
    Ok(())
}
