//! Input/output helpers.
//!
//! - CSV ingest + validation of postings and aggregates (`ingest`)
//! - winner table JSON/CSV read/write (`winners`)
//! - model comparison export (`export`)

pub mod export;
pub mod ingest;
pub mod winners;

pub use export::*;
pub use ingest::*;
pub use winners::*;
