//! Export the per-title model comparison to CSV.
//!
//! One row per scored `(title, model)` pair, meant for spreadsheets or
//! downstream scripts. Skipped candidates do not appear.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::AppError;
use crate::fit::TitleEvaluation;

pub fn write_comparison_csv(path: &Path, evaluations: &[TitleEvaluation]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create comparison CSV '{}': {e}", path.display())))?;
    let mut file = BufWriter::new(file);

    writeln!(file, "job_title,model,rmse,mape")
        .map_err(|e| AppError::new(2, format!("Failed to write comparison CSV header: {e}")))?;

    for eval in evaluations {
        for r in &eval.results {
            writeln!(
                file,
                "{},{},{:.4},{}",
                csv_field(&eval.title),
                r.model,
                r.rmse,
                r.mape.map(|v| format!("{v:.4}")).unwrap_or_default(),
            )
            .map_err(|e| AppError::new(2, format!("Failed to write comparison CSV row: {e}")))?;
        }
    }

    file.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush comparison CSV: {e}")))
}

fn csv_field(s: &str) -> String {
    if s.contains([',', '"', '\n']) {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
