//! Shannon Capacity of Parallel Channels
//!
//! Sum capacity of a power allocation over parallel Gaussian sub-channels, and
//! the comparison between a water-filling allocation and the equal-power
//! baseline.
//!
//! ## Example
//!
//! ```rust
//! use wlab_core::capacity::{capacity_with_allocation, equal_power, CapacityComparison};
//! use wlab_core::waterfilling::waterfill;
//!
//! let snr = [5.0, 2.0, 0.5];
//! let inv_snr: Vec<f64> = snr.iter().map(|g| 1.0 / g).collect();
//! let alloc = waterfill(&inv_snr, 5.0).unwrap();
//!
//! let cmp = CapacityComparison::compute(&snr, &alloc.powers, 5.0).unwrap();
//! assert!(cmp.water_filling >= cmp.equal_power);
//!
//! let eq = capacity_with_allocation(&snr, &equal_power(3, 5.0)).unwrap();
//! assert!((eq - cmp.equal_power).abs() < 1e-12);
//! ```

use crate::error::{SolverError, SolverResult};
use serde::{Deserialize, Serialize};

/// Sum capacity `sum_i log2(1 + P_i * gamma_i)` in bits per channel use.
///
/// Channels with no power contribute nothing.
pub fn capacity_with_allocation(snr: &[f64], powers: &[f64]) -> SolverResult<f64> {
    if snr.len() != powers.len() {
        return Err(SolverError::LengthMismatch {
            expected: snr.len(),
            actual: powers.len(),
        });
    }

    Ok(snr
        .iter()
        .zip(powers)
        .map(|(&g, &p)| if p > 0.0 { (1.0 + p * g).log2() } else { 0.0 })
        .sum())
}

/// Spread `total_power` evenly over `num_channels` channels.
pub fn equal_power(num_channels: usize, total_power: f64) -> Vec<f64> {
    if num_channels == 0 {
        return vec![];
    }
    vec![total_power / num_channels as f64; num_channels]
}

/// Water-filling capacity next to the equal-power baseline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapacityComparison {
    /// Capacity of the supplied allocation (bits/channel use)
    pub water_filling: f64,
    /// Capacity with `P_total / N` on every channel
    pub equal_power: f64,
}

impl CapacityComparison {
    /// Compare `powers` against equal allocation of `total_power`.
    pub fn compute(snr: &[f64], powers: &[f64], total_power: f64) -> SolverResult<Self> {
        let water_filling = capacity_with_allocation(snr, powers)?;
        let equal_power = capacity_with_allocation(snr, &equal_power(snr.len(), total_power))?;
        Ok(Self {
            water_filling,
            equal_power,
        })
    }

    /// Absolute capacity gain in bits/channel use.
    pub fn gain(&self) -> f64 {
        self.water_filling - self.equal_power
    }

    /// Gain as a percentage of the equal-power capacity.
    ///
    /// Zero when the baseline capacity is zero.
    pub fn improvement_percent(&self) -> f64 {
        if self.equal_power > 0.0 {
            self.gain() / self.equal_power * 100.0
        } else {
            0.0
        }
    }
}
