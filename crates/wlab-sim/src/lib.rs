//! # Water-Filling Simulation
//!
//! Random channel sets and end-to-end runs for the water-filling solver in
//! `wlab-core`:
//!
//! - [`channel`]: Rayleigh sub-channel generation
//! - [`run`]: draw, solve and compare in one step

pub mod channel;
pub mod error;
pub mod run;

pub use channel::{ChannelConfig, ChannelGenerator, SubChannel};
pub use error::{SimError, SimResult};
pub use run::{Run, RunConfig, RunResult};
