//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - model kinds and persisted winner labels (`ModelKind`, `WinnerModel`)
//! - monthly series (`TimeSeries`) and their raw inputs (`PostingRecord`, `MonthlyAggregate`)
//! - evaluation and serving outputs (`EvaluationResult`, `WinnerRecord`, `ForecastPoint`)
//! - model configuration (`ForecastConfig`, `SeasonalConfig`)

pub mod types;

pub use types::*;
