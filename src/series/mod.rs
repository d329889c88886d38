//! Monthly series construction.
//!
//! - `builder`: postings → aggregates → `TimeSeries`
//! - `source`: immutable aggregate store queried by the pipeline and the server

pub mod builder;
pub mod source;

pub use builder::*;
pub use source::*;
