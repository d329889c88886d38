//! Chronological hold-out evaluation of every candidate model.
//!
//! For a series of `n` months:
//! - train on `[0, split)`, score on `[split, n)` with `split = floor(0.8·n)`
//! - fit every available candidate on the prefix and predict the suffix
//! - a candidate that fails to fit or whose prediction cannot be aligned with
//!   the held-out months is skipped; the others are still scored
//!
//! Titles are independent, so `evaluate_titles` runs them in parallel.

use rayon::prelude::*;
use tracing::debug;

use crate::domain::{EvaluationResult, ModelKind, MonthlyPoint, TimeSeries, add_months};
use crate::error::ForecastError;
use crate::fit::metrics::{mape, rmse};
use crate::models::{ModelCatalog, Step};
use crate::series::SeriesSource;

/// Fraction of the series used for training.
pub const TRAIN_FRACTION: f64 = 0.8;

/// Index of the first held-out month.
pub fn split_index(n: usize) -> usize {
    (n as f64 * TRAIN_FRACTION).floor() as usize
}

/// Evaluation output for one title.
#[derive(Debug, Clone)]
pub struct TitleEvaluation {
    pub title: String,
    pub n_months: usize,
    pub split: usize,
    /// One result per candidate that was scored, in candidate order.
    pub results: Vec<EvaluationResult>,
    /// Candidates that were skipped and why (for diagnostics).
    pub skipped: Vec<(ModelKind, String)>,
}

#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    catalog: &'a ModelCatalog,
}

impl<'a> Evaluator<'a> {
    pub fn new(catalog: &'a ModelCatalog) -> Self {
        Self { catalog }
    }

    /// Evaluate all candidates for one series.
    ///
    /// Fails only with `InsufficientHistory`; per-model failures are recorded in
    /// `skipped`.
    pub fn evaluate(&self, series: &TimeSeries) -> Result<TitleEvaluation, ForecastError> {
        series.ensure_sufficient()?;

        let points = series.points();
        let n = points.len();
        let split = split_index(n);
        let (train, test) = points.split_at(split);

        let mut results = Vec::new();
        let mut skipped = Vec::new();
        for kind in self.catalog.candidates() {
            match self.evaluate_kind(kind, train, test) {
                Ok(result) => results.push(result),
                Err(reason) => {
                    debug!(title = series.title(), model = %kind, %reason, "candidate skipped");
                    skipped.push((kind, reason));
                }
            }
        }

        Ok(TitleEvaluation {
            title: series.title().to_string(),
            n_months: n,
            split,
            results,
            skipped,
        })
    }

    /// Evaluate several titles in parallel; output keeps the input order.
    pub fn evaluate_titles(
        &self,
        source: &SeriesSource,
        titles: &[String],
    ) -> Vec<(String, Result<TitleEvaluation, ForecastError>)> {
        titles
            .par_iter()
            .map(|title| {
                let outcome = source
                    .series_for(title)
                    .and_then(|series| self.evaluate(&series));
                (title.clone(), outcome)
            })
            .collect()
    }

    fn evaluate_kind(
        &self,
        kind: ModelKind,
        train: &[MonthlyPoint],
        test: &[MonthlyPoint],
    ) -> Result<EvaluationResult, String> {
        let fit = self.catalog.fit(kind, train).map_err(|e| e.to_string())?;
        let steps = held_out_steps(kind, train, test)?;

        let predicted = fit.predict_values(&steps);
        if predicted.len() != test.len() {
            return Err(format!(
                "expected {} held-out predictions, got {}",
                test.len(),
                predicted.len()
            ));
        }

        let actual: Vec<f64> = test.iter().map(|p| p.value).collect();
        let rmse = rmse(&actual, &predicted).ok_or_else(|| "non-finite held-out predictions".to_string())?;
        let mape = mape(&actual, &predicted);

        Ok(EvaluationResult {
            model: kind,
            rmse,
            mape,
        })
    }
}

/// Prediction steps for the held-out months.
///
/// The seasonal model forecasts the `test.len()` calendar months that follow
/// the last training month; a held-out month outside that grid (a gap in the
/// series) cannot be aligned and the candidate is skipped.
fn held_out_steps(kind: ModelKind, train: &[MonthlyPoint], test: &[MonthlyPoint]) -> Result<Vec<Step>, String> {
    let offset = train.len();

    if kind == ModelKind::Seasonal {
        let last_train = train
            .last()
            .map(|p| p.month)
            .ok_or_else(|| "empty training window".to_string())?;
        let grid_end = add_months(last_train, test.len() as u32)
            .ok_or_else(|| "forecast grid out of calendar range".to_string())?;
        let misaligned = test.iter().filter(|p| p.month > grid_end).count();
        if misaligned > 0 {
            return Err(format!(
                "{misaligned} held-out month(s) fall outside the forecast grid ending {grid_end}"
            ));
        }
    }

    Ok(test
        .iter()
        .enumerate()
        .map(|(i, p)| Step {
            index: offset + i,
            month: p.month,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ForecastConfig, MIN_HISTORY_MONTHS, MonthlyAggregate};
    use chrono::NaiveDate;

    fn series_from(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let points = values
            .iter()
            .enumerate()
            .map(|(i, &value)| MonthlyPoint {
                month: add_months(start, i as u32).unwrap(),
                value,
            })
            .collect();
        TimeSeries::new("Test Title", points).unwrap()
    }

    #[test]
    fn split_stays_inside_series() {
        for n in MIN_HISTORY_MONTHS..200 {
            let split = split_index(n);
            assert!(split > 0 && split < n, "n={n} split={split}");
            assert_eq!(split, (0.8 * n as f64).floor() as usize);
        }
        assert_eq!(split_index(10), 8);
        assert_eq!(split_index(8), 6);
    }

    #[test]
    fn scores_every_candidate_on_clean_data() {
        let catalog = ModelCatalog::new(&ForecastConfig::default());
        let values: Vec<f64> = (0..12).map(|i| 60_000.0 + 250.0 * i as f64).collect();
        let eval = Evaluator::new(&catalog).evaluate(&series_from(&values)).unwrap();

        assert_eq!(eval.split, 9);
        assert_eq!(eval.results.len(), 3);
        assert!(eval.skipped.is_empty());
        let linear = eval.results.iter().find(|r| r.model == ModelKind::Linear).unwrap();
        assert!(linear.rmse < 1e-6);
        assert!(linear.mape.unwrap() < 1e-6);
        assert!(eval.results.iter().all(|r| r.rmse >= 0.0));
    }

    #[test]
    fn zero_actual_leaves_mape_undefined() {
        let catalog = ModelCatalog::new(&ForecastConfig::default());
        let mut values: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        values[9] = 0.0;
        let eval = Evaluator::new(&catalog).evaluate(&series_from(&values)).unwrap();

        assert!(!eval.results.is_empty());
        for r in &eval.results {
            assert!(r.mape.is_none());
            assert!(r.rmse.is_finite());
        }
    }

    #[test]
    fn short_series_is_insufficient() {
        let catalog = ModelCatalog::new(&ForecastConfig::default());
        let err = Evaluator::new(&catalog)
            .evaluate(&series_from(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]))
            .unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientHistory { months: 7, .. }));
    }

    #[test]
    fn seasonal_skipped_when_held_out_months_have_gaps() {
        let catalog = ModelCatalog::new(&ForecastConfig::default());
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        // 10 months; the last two held-out months jump ahead a year.
        let offsets = [0, 1, 2, 3, 4, 5, 6, 7, 20, 21];
        let points = offsets
            .iter()
            .map(|&o| MonthlyPoint {
                month: add_months(start, o).unwrap(),
                value: 100.0 + o as f64,
            })
            .collect();
        let series = TimeSeries::new("Gappy", points).unwrap();
        let eval = Evaluator::new(&catalog).evaluate(&series).unwrap();

        assert!(eval.results.iter().all(|r| r.model != ModelKind::Seasonal));
        assert!(eval.skipped.iter().any(|(k, _)| *k == ModelKind::Seasonal));
        assert!(eval.results.iter().any(|r| r.model == ModelKind::Linear));
    }

    #[test]
    fn titles_are_evaluated_independently() {
        let catalog = ModelCatalog::new(&ForecastConfig::default());
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let mut rows = Vec::new();
        for (title, months) in [("Long", 10u32), ("Short", 4u32)] {
            for i in 0..months {
                rows.push(MonthlyAggregate {
                    month: add_months(start, i).unwrap(),
                    job_title: title.to_string(),
                    work_location: String::new(),
                    job_count: 1,
                    avg_salary: 500.0 + i as f64,
                });
            }
        }
        let source = SeriesSource::new(rows);
        let titles = vec!["Long".to_string(), "Short".to_string(), "Missing".to_string()];
        let out = Evaluator::new(&catalog).evaluate_titles(&source, &titles);

        assert_eq!(out.len(), 3);
        assert!(out[0].1.is_ok());
        assert!(matches!(out[1].1, Err(ForecastError::InsufficientHistory { .. })));
        assert!(matches!(out[2].1, Err(ForecastError::NotFound(_))));
    }
}
