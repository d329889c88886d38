//! Request handling over an immutable data snapshot.
//!
//! A request resolves in a fixed order:
//! 1. parameters (`MissingParameter`, `InvalidParameter`)
//! 2. winner lookup (`NoWinner`, also for `N/A` winners)
//! 3. series rebuild (`NotFound`, `InsufficientHistory`)
//! 4. refit of the winning kind on the full series (`UnsupportedModel`, `FitFailure`)
//! 5. prediction of `horizon` months after the last observed month

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{DEFAULT_HORIZON, ForecastPoint, HistoryPoint, ModelKind, TimeSeries, WinnerModel, add_months};
use crate::error::ForecastError;
use crate::fit::WinnerTable;
use crate::models::{ModelCatalog, Step};
use crate::series::SeriesSource;

/// Data a request reads from. Never mutated once published.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub source: SeriesSource,
    pub winners: WinnerTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryResponse {
    pub job_title: String,
    pub history: Vec<HistoryPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResponse {
    pub job_title: String,
    pub model: ModelKind,
    pub forecast: Vec<ForecastPoint>,
}

#[derive(Debug)]
pub struct ForecastService {
    catalog: ModelCatalog,
    snapshot: RwLock<Arc<Snapshot>>,
}

impl ForecastService {
    pub fn new(source: SeriesSource, winners: WinnerTable, catalog: ModelCatalog) -> Self {
        Self {
            catalog,
            snapshot: RwLock::new(Arc::new(Snapshot { source, winners })),
        }
    }

    /// Current snapshot; requests hold it for their whole duration.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot.read())
    }

    /// Publish new data. In-flight requests keep the snapshot they started with.
    pub fn refresh(&self, source: SeriesSource, winners: WinnerTable) {
        let next = Arc::new(Snapshot { source, winners });
        let mut guard = self.snapshot.write();
        *guard = next;
        info!(rows = guard.source.len(), winners = guard.winners.len(), "snapshot refreshed");
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    pub fn list_eligible_titles(&self) -> Vec<String> {
        self.snapshot().source.eligible_titles()
    }

    pub fn get_history(&self, title: Option<&str>) -> Result<HistoryResponse, ForecastError> {
        let title = require_title(title)?;
        let history = self.snapshot().source.history(title)?;
        Ok(HistoryResponse {
            job_title: title.to_string(),
            history,
        })
    }

    /// Forecast with the default horizon when `horizon` is `None`.
    pub fn get_forecast(&self, title: Option<&str>, horizon: Option<usize>) -> Result<ForecastResponse, ForecastError> {
        let title = require_title(title)?;
        self.forecast(title, horizon.unwrap_or(DEFAULT_HORIZON))
    }

    pub fn forecast(&self, title: &str, horizon: usize) -> Result<ForecastResponse, ForecastError> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter {
                name: "horizon",
                reason: "must be >= 1".to_string(),
            });
        }

        let snapshot = self.snapshot();
        let winner = snapshot
            .winners
            .get(title)
            .ok_or_else(|| ForecastError::NoWinner(title.to_string()))?;

        let kind = match &winner.best_model {
            WinnerModel::Model(kind) => *kind,
            WinnerModel::NotAvailable => return Err(ForecastError::NoWinner(title.to_string())),
            WinnerModel::Unrecognized(tag) => return Err(ForecastError::UnsupportedModel(tag.clone())),
        };

        let series = snapshot.source.series_for(title)?;
        series.ensure_sufficient()?;

        let forecast = forecast_series(&self.catalog, kind, &series, horizon)?;
        debug!(title, model = %kind, horizon, "forecast served");

        Ok(ForecastResponse {
            job_title: title.to_string(),
            model: kind,
            forecast,
        })
    }
}

fn require_title(title: Option<&str>) -> Result<&str, ForecastError> {
    match title.map(str::trim) {
        Some(t) if !t.is_empty() => Ok(t),
        _ => Err(ForecastError::MissingParameter("job_title")),
    }
}

/// Refit `kind` on the whole series and project `horizon` months past its end.
///
/// Regressions continue the month index (`n, n+1, ...`); the seasonal model
/// reads the calendar months directly.
pub fn forecast_series(
    catalog: &ModelCatalog,
    kind: ModelKind,
    series: &TimeSeries,
    horizon: usize,
) -> Result<Vec<ForecastPoint>, ForecastError> {
    let fit = catalog.fit(kind, series.points())?;

    let n = series.len();
    let last = series.last_month();
    let steps = (1..=horizon)
        .map(|k| {
            let month = u32::try_from(k)
                .ok()
                .and_then(|k| add_months(last, k))
                .ok_or_else(|| ForecastError::InvalidParameter {
                    name: "horizon",
                    reason: format!("{horizon} months past {last} is out of range"),
                })?;
            Ok(Step {
                index: n + k - 1,
                month,
            })
        })
        .collect::<Result<Vec<_>, ForecastError>>()?;

    Ok(fit
        .predict(&steps)
        .into_iter()
        .zip(&steps)
        .map(|(p, step)| ForecastPoint {
            month: step.month,
            predicted_value: p.value,
            lower_bound: p.bounds.map(|(lo, _)| lo),
            upper_bound: p.bounds.map(|(_, hi)| hi),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ForecastConfig, MonthlyAggregate, WinnerRecord};
    use crate::fit::{Evaluator, TitleEvaluation};
    use chrono::NaiveDate;

    fn month(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    fn rows(title: &str, values: &[f64]) -> Vec<MonthlyAggregate> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| MonthlyAggregate {
                month: add_months(month(2023, 1), i as u32).unwrap(),
                job_title: title.to_string(),
                work_location: "Remote".to_string(),
                job_count: 3,
                avg_salary: v,
            })
            .collect()
    }

    fn winner(title: &str, kind: ModelKind) -> WinnerRecord {
        WinnerRecord {
            job_title: title.to_string(),
            best_model: WinnerModel::Model(kind),
            best_mape: Some(1.0),
            best_rmse: Some(1.0),
        }
    }

    fn linear_values() -> Vec<f64> {
        (0..8).map(|i| 100.0 + 2.0 * i as f64).collect()
    }

    fn service(rows: Vec<MonthlyAggregate>, winners: Vec<WinnerRecord>) -> ForecastService {
        ForecastService::new(
            SeriesSource::new(rows),
            WinnerTable::new(winners),
            ModelCatalog::new(&ForecastConfig::default()),
        )
    }

    #[test]
    fn linear_winner_extends_the_trend() {
        let svc = service(rows("Analyst", &linear_values()), vec![winner("Analyst", ModelKind::Linear)]);
        let resp = svc.get_forecast(Some("Analyst"), Some(3)).unwrap();

        assert_eq!(resp.model, ModelKind::Linear);
        assert_eq!(resp.forecast.len(), 3);
        assert_eq!(resp.forecast[0].month, month(2023, 9));
        assert_eq!(resp.forecast[2].month, month(2023, 11));
        for (i, pair) in resp.forecast.windows(2).enumerate() {
            let slope = pair[1].predicted_value - pair[0].predicted_value;
            assert!((slope - 2.0).abs() < 1e-6, "step {i}: slope {slope}");
        }
        assert!((resp.forecast[0].predicted_value - 116.0).abs() < 1e-6);
        assert!(resp.forecast.iter().all(|p| p.lower_bound.is_none() && p.upper_bound.is_none()));
    }

    #[test]
    fn default_horizon_is_six_months() {
        let svc = service(rows("Analyst", &linear_values()), vec![winner("Analyst", ModelKind::Linear)]);
        let resp = svc.get_forecast(Some("analyst"), None).unwrap();
        assert_eq!(resp.forecast.len(), DEFAULT_HORIZON);
    }

    #[test]
    fn short_history_is_insufficient() {
        let svc = service(
            rows("Analyst", &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]),
            vec![winner("Analyst", ModelKind::Linear)],
        );
        let err = svc.get_forecast(Some("Analyst"), Some(3)).unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientHistory { months: 7, .. }));
    }

    #[test]
    fn winner_lookup_precedes_series_lookup() {
        let svc = service(rows("Analyst", &linear_values()), vec![winner("Ghost", ModelKind::Linear)]);

        // In the series, not in the winner table.
        assert_eq!(
            svc.get_forecast(Some("Analyst"), Some(3)).unwrap_err(),
            ForecastError::NoWinner("Analyst".to_string())
        );
        // Nowhere at all: still reported as a missing winner.
        assert_eq!(
            svc.get_forecast(Some("Nurse"), Some(3)).unwrap_err(),
            ForecastError::NoWinner("Nurse".to_string())
        );
        // Winner exists but there is no data.
        assert_eq!(
            svc.get_forecast(Some("Ghost"), Some(3)).unwrap_err(),
            ForecastError::NotFound("Ghost".to_string())
        );
    }

    #[test]
    fn title_with_no_scored_model_has_no_winner() {
        let evaluation = TitleEvaluation {
            title: "Clerk".to_string(),
            n_months: 8,
            split: 6,
            results: Vec::new(),
            skipped: vec![(ModelKind::Linear, "fit failed".to_string())],
        };
        let table = WinnerTable::from_evaluations([&evaluation]);
        let record = table.get("Clerk").unwrap();
        assert_eq!(record.best_model, WinnerModel::NotAvailable);
        assert_eq!(record.best_mape, None);
        assert_eq!(record.best_rmse, None);

        let svc = ForecastService::new(
            SeriesSource::new(rows("Clerk", &linear_values())),
            table,
            ModelCatalog::new(&ForecastConfig::default()),
        );
        assert_eq!(
            svc.get_forecast(Some("Clerk"), Some(3)).unwrap_err(),
            ForecastError::NoWinner("Clerk".to_string())
        );
    }

    #[test]
    fn title_where_every_candidate_fails_has_no_winner() {
        // Means overflow, so every regression fit or its held-out score is non-finite.
        let source = SeriesSource::new(rows("Clerk", &[f64::MAX; 8]));
        let catalog = ModelCatalog::new(&ForecastConfig {
            seasonal_available: false,
            ..ForecastConfig::default()
        });

        let series = source.series_for("Clerk").unwrap();
        let evaluation = Evaluator::new(&catalog).evaluate(&series).unwrap();
        assert!(evaluation.results.is_empty());
        assert_eq!(evaluation.skipped.len(), catalog.candidates().len());

        let table = WinnerTable::from_evaluations([&evaluation]);
        let record = table.get("Clerk").unwrap();
        assert_eq!(record.best_model, WinnerModel::NotAvailable);
        assert_eq!(record.best_mape, None);
        assert_eq!(record.best_rmse, None);

        let svc = ForecastService::new(source, table, catalog);
        assert_eq!(
            svc.get_forecast(Some("Clerk"), Some(3)).unwrap_err(),
            ForecastError::NoWinner("Clerk".to_string())
        );
    }

    #[test]
    fn missing_and_invalid_parameters() {
        let svc = service(rows("Analyst", &linear_values()), vec![winner("Analyst", ModelKind::Linear)]);
        assert_eq!(
            svc.get_forecast(None, Some(3)).unwrap_err(),
            ForecastError::MissingParameter("job_title")
        );
        assert_eq!(
            svc.get_history(Some("   ")).unwrap_err(),
            ForecastError::MissingParameter("job_title")
        );
        assert!(matches!(
            svc.get_forecast(Some("Analyst"), Some(0)),
            Err(ForecastError::InvalidParameter { name: "horizon", .. })
        ));
    }

    #[test]
    fn unknown_or_unavailable_model_is_unsupported() {
        let unknown = WinnerRecord {
            job_title: "Analyst".to_string(),
            best_model: WinnerModel::Unrecognized("ARIMA".to_string()),
            best_mape: Some(1.0),
            best_rmse: Some(1.0),
        };
        let svc = service(rows("Analyst", &linear_values()), vec![unknown]);
        assert_eq!(
            svc.get_forecast(Some("Analyst"), Some(3)).unwrap_err(),
            ForecastError::UnsupportedModel("ARIMA".to_string())
        );

        let config = ForecastConfig {
            seasonal_available: false,
            ..ForecastConfig::default()
        };
        let svc = ForecastService::new(
            SeriesSource::new(rows("Analyst", &linear_values())),
            WinnerTable::new(vec![winner("Analyst", ModelKind::Seasonal)]),
            ModelCatalog::new(&config),
        );
        assert!(matches!(
            svc.get_forecast(Some("Analyst"), Some(3)),
            Err(ForecastError::UnsupportedModel(_))
        ));
    }

    #[test]
    fn seasonal_forecast_carries_bounds() {
        let values: Vec<f64> = (0..12).map(|i| 70_000.0 + 300.0 * i as f64 + if i % 2 == 0 { 150.0 } else { -150.0 }).collect();
        let svc = service(rows("Engineer", &values), vec![winner("Engineer", ModelKind::Seasonal)]);
        let resp = svc.get_forecast(Some("Engineer"), Some(4)).unwrap();

        assert_eq!(resp.forecast.len(), 4);
        for p in &resp.forecast {
            let (lo, hi) = (p.lower_bound.unwrap(), p.upper_bound.unwrap());
            assert!(lo <= p.predicted_value && p.predicted_value <= hi);
        }
    }

    #[test]
    fn forecasts_are_deterministic() {
        let values: Vec<f64> = (0..10).map(|i| 50_000.0 + 120.0 * (i * i) as f64).collect();
        for kind in [ModelKind::Linear, ModelKind::Polynomial { degree: 2 }, ModelKind::Seasonal] {
            let svc = service(rows("Analyst", &values), vec![winner("Analyst", kind)]);
            let a = svc.get_forecast(Some("Analyst"), Some(5)).unwrap();
            let b = svc.get_forecast(Some("Analyst"), Some(5)).unwrap();
            assert_eq!(a, b, "{kind}");
        }
    }

    #[test]
    fn history_lists_monthly_means() {
        let svc = service(rows("Analyst", &linear_values()), Vec::new());
        let resp = svc.get_history(Some("ANALYST")).unwrap();
        assert_eq!(resp.history.len(), 8);
        assert_eq!(resp.history[0].month, month(2023, 1));
        assert_eq!(resp.history[0].avg_salary, 100.0);
        assert!(matches!(svc.get_history(Some("Nurse")), Err(ForecastError::NotFound(_))));
    }

    #[test]
    fn refresh_swaps_the_snapshot() {
        let svc = service(rows("Analyst", &linear_values()), Vec::new());
        let before = svc.snapshot();
        assert_eq!(svc.list_eligible_titles(), vec!["Analyst"]);

        let catalog = svc.catalog().clone();
        let source = SeriesSource::new(rows("Engineer", &linear_values()));
        let evaluations: Vec<TitleEvaluation> = source
            .eligible_titles()
            .iter()
            .map(|t| Evaluator::new(&catalog).evaluate(&source.series_for(t).unwrap()).unwrap())
            .collect();
        svc.refresh(source, WinnerTable::from_evaluations(&evaluations));

        assert_eq!(svc.list_eligible_titles(), vec!["Engineer"]);
        assert!(svc.get_forecast(Some("Engineer"), Some(2)).is_ok());
        // The old snapshot is untouched.
        assert_eq!(before.source.eligible_titles(), vec!["Analyst"]);
    }
}
