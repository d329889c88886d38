//! Shared model-selection pipeline.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! aggregates -> eligible titles -> per-title evaluation -> winner table -> files
//!
//! The CLI then only decides where the data comes from and what to print.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::MIN_HISTORY_MONTHS;
use crate::error::AppError;
use crate::fit::{Evaluator, TitleEvaluation, WinnerTable};
use crate::io::{write_comparison_csv, write_winners_csv, write_winners_json};
use crate::models::ModelCatalog;
use crate::series::SeriesSource;

/// All computed outputs of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Evaluations of eligible titles, in title order.
    pub evaluations: Vec<TitleEvaluation>,
    /// Titles that were not evaluated, with the reason.
    pub excluded: Vec<(String, String)>,
    /// Freshly built winner table (replaces any previous one).
    pub winners: WinnerTable,
}

/// Files written by `write_outputs`.
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub winners_json: PathBuf,
    pub winners_csv: PathBuf,
    pub comparison_csv: PathBuf,
}

/// Evaluate every eligible title and select the winners.
pub fn run_pipeline(source: &SeriesSource, catalog: &ModelCatalog) -> PipelineRun {
    let mut excluded: Vec<(String, String)> = source
        .month_counts()
        .into_iter()
        .filter(|(_, months)| *months < MIN_HISTORY_MONTHS)
        .map(|(title, months)| (title, format!("{months} months (< {MIN_HISTORY_MONTHS} required)")))
        .collect();

    let titles = source.eligible_titles();
    info!(
        titles = titles.len(),
        excluded = excluded.len(),
        candidates = catalog.candidates().len(),
        "evaluating titles"
    );

    let mut evaluations = Vec::with_capacity(titles.len());
    for (title, outcome) in Evaluator::new(catalog).evaluate_titles(source, &titles) {
        match outcome {
            Ok(eval) => evaluations.push(eval),
            Err(e) => {
                warn!(%title, error = %e, "title skipped");
                excluded.push((title, e.to_string()));
            }
        }
    }

    let winners = WinnerTable::from_evaluations(&evaluations);
    let unscored = winners
        .records()
        .iter()
        .filter(|r| r.best_rmse.is_none())
        .count();
    info!(winners = winners.len(), unscored, "winner table rebuilt");

    PipelineRun {
        evaluations,
        excluded,
        winners,
    }
}

/// Write the winner table (JSON + CSV) and the comparison summary.
///
/// `winners_json` overrides the default `<out_dir>/model_winners.json`.
pub fn write_outputs(run: &PipelineRun, out_dir: &Path, winners_json: Option<&Path>) -> Result<PipelineOutputs, AppError> {
    std::fs::create_dir_all(out_dir)
        .map_err(|e| AppError::new(2, format!("Failed to create output directory '{}': {e}", out_dir.display())))?;

    let outputs = PipelineOutputs {
        winners_json: winners_json
            .map(Path::to_path_buf)
            .unwrap_or_else(|| out_dir.join("model_winners.json")),
        winners_csv: out_dir.join("model_winners.csv"),
        comparison_csv: out_dir.join("model_comparison_summary.csv"),
    };

    if let Some(parent) = outputs.winners_json.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create directory '{}': {e}", parent.display())))?;
    }

    write_winners_json(&outputs.winners_json, &run.winners)?;
    write_winners_csv(&outputs.winners_csv, &run.winners)?;
    write_comparison_csv(&outputs.comparison_csv, &run.evaluations)?;

    info!(path = %outputs.winners_json.display(), "winner table written");
    Ok(outputs)
}
