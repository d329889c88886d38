//! Hold-out evaluation and winner selection.

pub mod evaluator;
pub mod metrics;
pub mod selection;

pub use evaluator::{Evaluator, TitleEvaluation, split_index};
pub use selection::{WinnerTable, select_winner};
