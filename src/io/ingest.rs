//! CSV ingest for raw postings and monthly aggregates.
//!
//! Both loaders follow the same rules:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Row-level validation**: bad rows are skipped and reported, not fatal
//! - header names are matched case-insensitively, BOM-tolerant, with aliases
//!   for the raw export's column names

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use csv::StringRecord;

use crate::domain::{MonthlyAggregate, PostingRecord, month_start};
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: parsed rows plus the rows that were rejected.
#[derive(Debug, Clone)]
pub struct Ingested<T> {
    pub rows: Vec<T>,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
}

const TITLE: &[&str] = &["job_title", "business title", "title"];
const SALARY: &[&str] = &["salary_annual", "salary per annum", "salary"];
const POSTING_DATE: &[&str] = &["posting_date", "posting date"];
const LOCATION: &[&str] = &["work_location", "work location"];
const MONTH: &[&str] = &["month"];
const AVG_SALARY: &[&str] = &["avg_salary"];
const JOB_COUNT: &[&str] = &["job_count"];

/// Load raw postings from a CSV file.
pub fn load_postings(path: &Path) -> Result<Ingested<PostingRecord>, AppError> {
    let file = open(path, "postings CSV")?;
    read_postings(file)
}

pub fn read_postings<R: Read>(reader: R) -> Result<Ingested<PostingRecord>, AppError> {
    read_rows(reader, &[TITLE, SALARY, POSTING_DATE], parse_posting)
}

/// Load monthly aggregate rows from a CSV file.
pub fn load_aggregates(path: &Path) -> Result<Ingested<MonthlyAggregate>, AppError> {
    let file = open(path, "aggregates CSV")?;
    read_aggregates(file)
}

pub fn read_aggregates<R: Read>(reader: R) -> Result<Ingested<MonthlyAggregate>, AppError> {
    read_rows(reader, &[MONTH, TITLE, AVG_SALARY], parse_aggregate)
}

/// Write monthly aggregate rows (the format `load_aggregates` reads).
pub fn write_aggregates(path: &Path, rows: &[MonthlyAggregate]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create aggregates CSV '{}': {e}", path.display())))?;
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(2, format!("Failed to write aggregates CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush aggregates CSV: {e}")))
}

fn open(path: &Path, what: &str) -> Result<File, AppError> {
    File::open(path).map_err(|e| AppError::new(2, format!("Failed to open {what} '{}': {e}", path.display())))
}

fn read_rows<R: Read, T>(
    reader: R,
    required: &[&[&str]],
    parse: fn(&StringRecord, &HashMap<String, usize>) -> Result<T, String>,
) -> Result<Ingested<T>, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    for names in required {
        if find_column(&header_map, names).is_none() {
            return Err(AppError::new(
                2,
                format!("Missing required column: `{}`", names.first().copied().unwrap_or_default()),
            ));
        }
    }

    let mut rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // records() starts after the header line; lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        match parse(&record, &header_map) {
            Ok(row) => rows.push(row),
            Err(message) => row_errors.push(RowError { line, message }),
        }
    }

    if rows.is_empty() {
        return Err(AppError::new(3, "No valid rows remain after validation."));
    }

    Ok(Ingested {
        rows,
        row_errors,
        rows_read,
    })
}

fn parse_posting(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<PostingRecord, String> {
    let job_title = get_required(record, header_map, TITLE)?.to_string();
    let salary = parse_salary(get_required(record, header_map, SALARY)?)?;
    if salary <= 0.0 {
        return Err(format!("Non-positive salary: {salary}"));
    }
    let posting_date = parse_date(get_required(record, header_map, POSTING_DATE)?)?;
    let work_location = get_optional(record, header_map, LOCATION).map(str::to_string);

    Ok(PostingRecord {
        job_title,
        posting_date,
        salary,
        work_location,
    })
}

fn parse_aggregate(record: &StringRecord, header_map: &HashMap<String, usize>) -> Result<MonthlyAggregate, String> {
    let month = month_start(parse_date(get_required(record, header_map, MONTH)?)?);
    let job_title = get_required(record, header_map, TITLE)?.to_string();
    let avg_salary = parse_salary(get_required(record, header_map, AVG_SALARY)?)?;
    let work_location = get_optional(record, header_map, LOCATION).unwrap_or_default().to_string();
    let job_count = match get_optional(record, header_map, JOB_COUNT) {
        Some(s) => s
            .parse::<u64>()
            .map_err(|_| format!("Invalid job_count '{s}'"))?,
        None => 0,
    };

    Ok(MonthlyAggregate {
        month,
        job_title,
        work_location,
        job_count,
        avg_salary,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn find_column(header_map: &HashMap<String, usize>, names: &[&str]) -> Option<usize> {
    names.iter().find_map(|n| header_map.get(*n).copied())
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    names: &[&str],
) -> Result<&'a str, String> {
    let name = names.first().copied().unwrap_or_default();
    let idx = find_column(header_map, names).ok_or_else(|| format!("Missing required column: `{name}`"))?;
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("Missing required value: `{name}`"))
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, names: &[&str]) -> Option<&'a str> {
    let idx = find_column(header_map, names)?;
    record.get(idx).map(str::trim).filter(|s| !s.is_empty())
}

fn parse_date(s: &str) -> Result<NaiveDate, String> {
    const DATE_FMTS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    const DATETIME_FMTS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%m/%d/%Y %I:%M:%S %p"];

    for fmt in DATE_FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Ok(d);
        }
    }
    for fmt in DATETIME_FMTS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(dt.date());
        }
    }
    Err(format!(
        "Invalid date '{s}'. Expected one of: YYYY-MM-DD, MM/DD/YYYY, YYYY/MM/DD, DD-MM-YYYY."
    ))
}

/// Parse a salary, tolerating currency symbols and thousands separators.
fn parse_salary(s: &str) -> Result<f64, String> {
    let cleaned: String = s.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
    let v = cleaned
        .parse::<f64>()
        .map_err(|_| format!("Invalid salary '{s}'"))?;
    if v.is_finite() { Ok(v) } else { Err(format!("Non-finite salary '{s}'")) }
}
