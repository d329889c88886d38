//! Data sources that do not come from files.

pub mod sample;
