//! `salary-forecast` library crate.
//!
//! The binary (`sf`) is a thin wrapper around this library so that:
//!
//! - the evaluation pipeline and the serving layer are testable without
//!   spawning processes
//! - an HTTP front-end can reuse `serve::ForecastService` directly

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod models;
pub mod report;
pub mod serve;
pub mod series;
