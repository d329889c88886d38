//! Raw postings → monthly aggregates → per-title monthly series.
//!
//! Aggregation happens in two stages, mirroring how the aggregate file is
//! produced upstream:
//!
//! 1. `aggregate_postings`: group valid postings by `(month, title, location)`
//!    into `job_count` + mean salary.
//! 2. `build_series`: select one title (case-insensitive), group by month and
//!    average `avg_salary` across locations.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::domain::{MonthlyAggregate, MonthlyPoint, PostingRecord, TimeSeries, month_start};
use crate::error::ForecastError;

/// Lowercase key used for case-insensitive title matching.
pub fn title_key(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Group postings by `(month, title, location)`.
///
/// Postings with an empty title or a non-finite / non-positive salary are
/// dropped. Output is sorted by month, then title, then location.
pub fn aggregate_postings(records: &[PostingRecord]) -> Vec<MonthlyAggregate> {
    let mut groups: BTreeMap<(NaiveDate, String, String), (u64, f64)> = BTreeMap::new();

    for r in records {
        let title = r.job_title.trim();
        if title.is_empty() || !r.salary.is_finite() || r.salary <= 0.0 {
            continue;
        }
        let location = r.work_location.as_deref().map(str::trim).unwrap_or("").to_string();
        let key = (month_start(r.posting_date), title.to_string(), location);
        let entry = groups.entry(key).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += r.salary;
    }

    groups
        .into_iter()
        .map(|((month, job_title, work_location), (count, sum))| MonthlyAggregate {
            month,
            job_title,
            work_location,
            job_count: count,
            avg_salary: sum / count as f64,
        })
        .collect()
}

/// Build the monthly series for `title` from aggregate rows.
///
/// Rows are matched case-insensitively; several rows for one month (one per
/// location) are averaged. Fails with `NotFound` when no row matches.
pub fn build_series<'a>(
    title: &str,
    rows: impl IntoIterator<Item = &'a MonthlyAggregate>,
) -> Result<TimeSeries, ForecastError> {
    let key = title_key(title);
    let mut by_month: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

    for row in rows {
        if title_key(&row.job_title) != key || !row.avg_salary.is_finite() {
            continue;
        }
        let entry = by_month.entry(month_start(row.month)).or_insert((0.0, 0));
        entry.0 += row.avg_salary;
        entry.1 += 1;
    }

    if by_month.is_empty() {
        return Err(ForecastError::NotFound(title.to_string()));
    }

    let points = by_month
        .into_iter()
        .map(|(month, (sum, count))| MonthlyPoint {
            month,
            value: sum / count as f64,
        })
        .collect();

    TimeSeries::new(title, points)
}
