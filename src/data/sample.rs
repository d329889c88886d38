//! Synthetic job-posting generation.
//!
//! Each title gets a base salary, a monthly growth rate and a small annual
//! cycle; postings scatter log-normally around that path. The last title in
//! the catalog only posts for a few months so the history gate has something
//! to reject.

use chrono::{Datelike, NaiveDate};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{MIN_HISTORY_MONTHS, PostingRecord, add_months};
use crate::error::AppError;

const TITLE_CATALOG: [&str; 8] = [
    "Data Analyst",
    "Data Engineer",
    "Civil Engineer",
    "Project Manager",
    "Accountant",
    "Community Coordinator",
    "IT Specialist",
    "Clerical Associate",
];

const LOCATIONS: [&str; 4] = ["Manhattan", "Brooklyn", "Queens", "Bronx"];

/// Log-scale noise of individual postings around the title's monthly level.
const POSTING_NOISE: f64 = 0.04;

#[derive(Debug, Clone, PartialEq)]
pub struct SampleConfig {
    pub seed: u64,
    /// First month of the sample (any day; truncated to the month).
    pub start: NaiveDate,
    pub months: u32,
    /// Number of titles, at most the catalog size.
    pub titles: usize,
    /// Upper bound of postings per title and month (at least one is drawn).
    pub max_postings_per_month: u32,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            start: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            months: 24,
            titles: 6,
            max_postings_per_month: 5,
        }
    }
}

pub fn generate_postings(config: &SampleConfig) -> Result<Vec<PostingRecord>, AppError> {
    if config.months == 0 {
        return Err(AppError::new(2, "Sample months must be > 0."));
    }
    if config.titles == 0 || config.titles > TITLE_CATALOG.len() {
        return Err(AppError::new(
            2,
            format!("Sample titles must be in 1..={}.", TITLE_CATALOG.len()),
        ));
    }
    if config.max_postings_per_month == 0 {
        return Err(AppError::new(2, "Max postings per month must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = Normal::new(0.0, POSTING_NOISE)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;
    let start = config.start.with_day(1).unwrap_or(config.start);

    let mut postings = Vec::new();
    for (i, title) in TITLE_CATALOG.iter().take(config.titles).enumerate() {
        let base: f64 = rng.gen_range(45_000.0..140_000.0);
        let growth: f64 = rng.gen_range(0.002..0.008);
        let amplitude: f64 = rng.gen_range(0.0..0.03);

        let is_sparse = config.titles > 1 && i + 1 == config.titles;
        let months = if is_sparse {
            config.months.min(MIN_HISTORY_MONTHS as u32 - 3)
        } else {
            config.months
        };

        for m in 0..months {
            let Some(month) = add_months(start, m) else {
                return Err(AppError::new(2, "Sample range exceeds the calendar."));
            };
            let phase = 2.0 * std::f64::consts::PI * f64::from(month.month0()) / 12.0;
            let level = base * (1.0 + growth).powi(m as i32) * (1.0 + amplitude * phase.sin());

            let count = rng.gen_range(1..=config.max_postings_per_month);
            for _ in 0..count {
                let day = rng.gen_range(1..=28);
                let posting_date = month.with_day(day).unwrap_or(month);
                let salary = (level * noise.sample(&mut rng).exp()).round();
                let location = LOCATIONS[rng.gen_range(0..LOCATIONS.len())];

                postings.push(PostingRecord {
                    job_title: title.to_string(),
                    posting_date,
                    salary,
                    work_location: Some(location.to_string()),
                });
            }
        }
    }

    Ok(postings)
}
