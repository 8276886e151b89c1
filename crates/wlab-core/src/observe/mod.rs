//! # Observability
//!
//! Structured logging for wlab via `tracing`. Library code only emits events;
//! binaries call [`init_logging`] once to install a subscriber.
//!
//! | Level | Emitted by |
//! |-------|------------|
//! | trace | every bisection step |
//! | debug | solve summaries, config discovery |
//! | info  | channel draws and run summaries |
//! | warn  | solves that hit the iteration cap |

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
