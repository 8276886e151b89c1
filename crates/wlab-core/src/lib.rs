//! # Water-Filling Core Library
//!
//! Optimal power allocation over parallel Gaussian sub-channels.
//!
//! ## Overview
//!
//! Given `N` sub-channels with signal-to-noise ratios `gamma_i` and a total
//! power budget, water-filling pours power into the channels up to a common
//! water level `1/mu`. Strong channels (low floor `1/gamma_i`) take more
//! power, channels whose floor sits above the water take none, and the sum
//! capacity `sum_i log2(1 + P_i * gamma_i)` is maximised.
//!
//! This crate provides:
//!
//! - **Solver**: bisection on `mu` with a guaranteed bracket, convergence
//!   reporting and an optional per-step trace ([`waterfilling`])
//! - **Capacity**: water-filling vs. equal-power comparison ([`capacity`])
//! - **Configuration**: YAML settings with a search path ([`config`])
//! - **Logging**: `tracing` subscriber setup ([`observe`])
//!
//! ## Example
//!
//! ```rust
//! use wlab_core::prelude::*;
//!
//! let snr = [5.0, 2.0, 0.5];
//! let inv_snr: Vec<f64> = snr.iter().map(|g| 1.0 / g).collect();
//!
//! let alloc = WaterFilling::new(5.0).solve(&inv_snr).unwrap();
//! assert!(alloc.converged);
//!
//! let cmp = CapacityComparison::compute(&snr, &alloc.powers, 5.0).unwrap();
//! assert!(cmp.gain() > 0.0);
//! ```

pub mod capacity;
pub mod config;
pub mod error;
pub mod observe;
pub mod waterfilling;

pub use capacity::{capacity_with_allocation, equal_power, CapacityComparison};
pub use config::{ConfigError, WlabConfig};
pub use error::{SolverError, SolverResult};
pub use waterfilling::{
    exact_water_level, waterfill, Allocation, BracketStrategy, IterationRecord, SolveTrace,
    WaterFilling,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::capacity::CapacityComparison;
    pub use crate::error::{SolverError, SolverResult};
    pub use crate::waterfilling::{Allocation, BracketStrategy, SolveTrace, WaterFilling};
}
