//! Read-only store of monthly aggregate rows.
//!
//! Loaded once (from the aggregate CSV or straight from postings) and then
//! shared immutably by the pipeline and the serving layer.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::domain::{
    HistoryPoint, MIN_HISTORY_MONTHS, MonthlyAggregate, PostingRecord, TimeSeries, TitleSummary, month_start,
};
use crate::error::ForecastError;
use crate::series::builder::{aggregate_postings, build_series, title_key};

#[derive(Debug, Clone, Default)]
pub struct SeriesSource {
    rows: Vec<MonthlyAggregate>,
    /// Lowercase title -> row indexes.
    by_title: HashMap<String, Vec<usize>>,
}

impl SeriesSource {
    pub fn new(rows: Vec<MonthlyAggregate>) -> Self {
        let mut by_title: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, row) in rows.iter().enumerate() {
            by_title.entry(title_key(&row.job_title)).or_default().push(i);
        }
        Self { rows, by_title }
    }

    pub fn from_postings(records: &[PostingRecord]) -> Self {
        Self::new(aggregate_postings(records))
    }

    pub fn rows(&self) -> &[MonthlyAggregate] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct exact titles, sorted.
    pub fn titles(&self) -> Vec<String> {
        self.month_counts().into_keys().collect()
    }

    /// Distinct months per exact title.
    pub fn month_counts(&self) -> BTreeMap<String, usize> {
        let mut months: BTreeMap<&str, BTreeSet<NaiveDate>> = BTreeMap::new();
        for row in &self.rows {
            months.entry(row.job_title.as_str()).or_default().insert(month_start(row.month));
        }
        months
            .into_iter()
            .map(|(title, set)| (title.to_string(), set.len()))
            .collect()
    }

    /// Titles with at least `MIN_HISTORY_MONTHS` distinct months, sorted.
    pub fn eligible_titles(&self) -> Vec<String> {
        self.month_counts()
            .into_iter()
            .filter(|(_, months)| *months >= MIN_HISTORY_MONTHS)
            .map(|(title, _)| title)
            .collect()
    }

    /// One summary per exact title, most months first, then most postings,
    /// then title.
    pub fn title_summaries(&self) -> Vec<TitleSummary> {
        struct Acc {
            months: BTreeSet<NaiveDate>,
            total_posts: u64,
            salary_sum: f64,
            rows: usize,
        }

        let mut by_title: BTreeMap<&str, Acc> = BTreeMap::new();
        for row in &self.rows {
            let acc = by_title.entry(row.job_title.as_str()).or_insert_with(|| Acc {
                months: BTreeSet::new(),
                total_posts: 0,
                salary_sum: 0.0,
                rows: 0,
            });
            acc.months.insert(month_start(row.month));
            acc.total_posts += row.job_count;
            acc.salary_sum += row.avg_salary;
            acc.rows += 1;
        }

        let mut out: Vec<TitleSummary> = by_title
            .into_iter()
            .filter_map(|(title, acc)| {
                Some(TitleSummary {
                    job_title: title.to_string(),
                    months: acc.months.len(),
                    total_posts: acc.total_posts,
                    first_month: *acc.months.first()?,
                    last_month: *acc.months.last()?,
                    avg_salary: acc.salary_sum / acc.rows as f64,
                })
            })
            .collect();
        out.sort_by(|a, b| {
            b.months
                .cmp(&a.months)
                .then(b.total_posts.cmp(&a.total_posts))
                .then_with(|| a.job_title.cmp(&b.job_title))
        });
        out
    }

    /// The title's monthly series (case-insensitive match).
    pub fn series_for(&self, title: &str) -> Result<TimeSeries, ForecastError> {
        let Some(idx) = self.by_title.get(&title_key(title)) else {
            return Err(ForecastError::NotFound(title.to_string()));
        };
        build_series(title, idx.iter().map(|&i| &self.rows[i]))
    }

    pub fn history(&self, title: &str) -> Result<Vec<HistoryPoint>, ForecastError> {
        let series = self.series_for(title)?;
        Ok(series
            .points()
            .iter()
            .map(|p| HistoryPoint {
                month: p.month,
                avg_salary: p.value,
            })
            .collect())
    }
}
