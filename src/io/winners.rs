//! Read/write the winner table.
//!
//! The JSON file is the table the serving layer loads: an array of
//! `{job_title, best_model, best_mape, best_rmse}` records, with `"N/A"` and
//! `null` metrics for titles where nothing could be scored. A CSV copy with the
//! same columns is written for spreadsheets.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::domain::WinnerRecord;
use crate::error::AppError;
use crate::fit::WinnerTable;

pub fn write_winners_json(path: &Path, table: &WinnerTable) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create winners JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &table.persisted_order())
        .map_err(|e| AppError::new(2, format!("Failed to write winners JSON: {e}")))
}

/// Load the winner table. Unknown model tags are kept and only rejected when
/// a forecast for that title is requested.
pub fn read_winners_json(path: &Path) -> Result<WinnerTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open winners JSON '{}': {e}", path.display())))?;
    let records: Vec<WinnerRecord> =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid winners JSON: {e}")))?;
    Ok(WinnerTable::new(records))
}

pub fn write_winners_csv(path: &Path, table: &WinnerTable) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create winners CSV '{}': {e}", path.display())))?;
    for record in table.persisted_order() {
        writer
            .serialize(record)
            .map_err(|e| AppError::new(2, format!("Failed to write winners CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush winners CSV: {e}")))
}
