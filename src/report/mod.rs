//! Reporting utilities: evaluation diagnostics, winner tables, history and
//! forecast listings.

pub mod format;

pub use format::*;
