//! Serving boundary: eligible titles, history and forecasts.

pub mod service;

pub use service::*;
