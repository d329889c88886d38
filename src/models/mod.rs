//! Forecasting model implementations.
//!
//! - `regression`: linear / polynomial fits on the month index
//! - `seasonal`: trend + changepoint model on calendar time
//! - `model`: closed dispatch over `ModelKind` and the capability-aware catalog

pub mod model;
pub mod regression;
pub mod seasonal;

pub use model::*;
