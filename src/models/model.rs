//! Model dispatch over the closed set of model kinds.
//!
//! The evaluator and the serving layer rely on two primitive operations:
//! - fit a model kind on a training window (`ModelCatalog::fit`)
//! - predict at future steps (`FittedModel::predict`)
//!
//! A step carries both the month index `t` (used by the regressions) and the
//! calendar month (used by the seasonal model), so callers build one grid and
//! every kind reads the coordinate it was fit on.

use chrono::NaiveDate;

use crate::domain::{ForecastConfig, ModelKind, MonthlyPoint, SeasonalConfig};
use crate::error::ForecastError;
use crate::models::regression::{RegressionFit, fit_linear, fit_polynomial};
use crate::models::seasonal::{SeasonalFit, fit_seasonal};

/// A position to predict at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    /// Zero-based month index relative to the start of the fitted window.
    pub index: usize,
    pub month: NaiveDate,
}

/// A predicted value with optional `(lower, upper)` bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub value: f64,
    pub bounds: Option<(f64, f64)>,
}

/// Fitted state, owned by exactly one fit.
#[derive(Debug, Clone, PartialEq)]
pub enum FittedModel {
    Regression(RegressionFit),
    Seasonal(SeasonalFit),
}

impl FittedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            FittedModel::Regression(fit) => fit.kind(),
            FittedModel::Seasonal(_) => ModelKind::Seasonal,
        }
    }

    pub fn predict(&self, steps: &[Step]) -> Vec<Prediction> {
        match self {
            FittedModel::Regression(fit) => steps
                .iter()
                .map(|s| Prediction {
                    value: fit.predict(s.index),
                    bounds: None,
                })
                .collect(),
            FittedModel::Seasonal(fit) => steps
                .iter()
                .map(|s| {
                    let p = fit.predict(s.month);
                    Prediction {
                        value: p.value,
                        bounds: Some((p.lower, p.upper)),
                    }
                })
                .collect(),
        }
    }

    pub fn predict_values(&self, steps: &[Step]) -> Vec<f64> {
        self.predict(steps).into_iter().map(|p| p.value).collect()
    }
}

/// Which model kinds exist in this process and how to fit them.
///
/// Built once from `ForecastConfig`; the seasonal capability flag is fixed for
/// the lifetime of the catalog.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    polynomial_degree: u32,
    seasonal: SeasonalConfig,
    seasonal_available: bool,
}

impl ModelCatalog {
    pub fn new(config: &ForecastConfig) -> Self {
        Self {
            polynomial_degree: config.polynomial_degree,
            seasonal: config.seasonal.clone(),
            seasonal_available: config.seasonal_available,
        }
    }

    /// Candidate kinds evaluated by the pipeline, in tie-break priority order.
    pub fn candidates(&self) -> Vec<ModelKind> {
        let mut out = vec![
            ModelKind::Linear,
            ModelKind::Polynomial {
                degree: self.polynomial_degree,
            },
        ];
        if self.seasonal_available {
            out.push(ModelKind::Seasonal);
        }
        out
    }

    pub fn is_available(&self, kind: ModelKind) -> bool {
        match kind {
            ModelKind::Linear => true,
            ModelKind::Polynomial { degree } => degree >= 1,
            ModelKind::Seasonal => self.seasonal_available,
        }
    }

    /// Fit `kind` on `window` (index 0 is the window's first month).
    pub fn fit(&self, kind: ModelKind, window: &[MonthlyPoint]) -> Result<FittedModel, ForecastError> {
        if !self.is_available(kind) {
            return Err(ForecastError::UnsupportedModel(kind.label()));
        }
        match kind {
            ModelKind::Linear => fit_linear(window).map(FittedModel::Regression),
            ModelKind::Polynomial { degree } => fit_polynomial(window, degree).map(FittedModel::Regression),
            ModelKind::Seasonal => fit_seasonal(window, &self.seasonal).map(FittedModel::Seasonal),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::add_months;

    fn window(values: &[f64]) -> Vec<MonthlyPoint> {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, &value)| MonthlyPoint {
                month: add_months(start, i as u32).unwrap(),
                value,
            })
            .collect()
    }

    #[test]
    fn candidates_follow_priority_order() {
        let catalog = ModelCatalog::new(&ForecastConfig::default());
        assert_eq!(
            catalog.candidates(),
            vec![
                ModelKind::Linear,
                ModelKind::Polynomial { degree: 2 },
                ModelKind::Seasonal
            ]
        );
    }

    #[test]
    fn seasonal_is_unsupported_without_capability() {
        let config = ForecastConfig {
            seasonal_available: false,
            ..ForecastConfig::default()
        };
        let catalog = ModelCatalog::new(&config);
        assert!(!catalog.candidates().contains(&ModelKind::Seasonal));

        let err = catalog
            .fit(ModelKind::Seasonal, &window(&[1.0, 2.0, 3.0]))
            .unwrap_err();
        assert!(matches!(err, ForecastError::UnsupportedModel(_)));
    }

    #[test]
    fn only_seasonal_predictions_carry_bounds() {
        let catalog = ModelCatalog::new(&ForecastConfig::default());
        let w = window(&[1.0, 2.0, 3.5, 4.0, 5.5, 6.0, 7.5, 8.0]);
        let steps: Vec<Step> = w
            .iter()
            .enumerate()
            .map(|(index, p)| Step { index, month: p.month })
            .collect();

        for kind in catalog.candidates() {
            let fit = catalog.fit(kind, &w).unwrap();
            assert_eq!(fit.kind(), kind);
            let preds = fit.predict(&steps);
            assert_eq!(preds.len(), steps.len());
            assert_eq!(preds.iter().all(|p| p.bounds.is_some()), kind.has_bounds());
        }
    }
}
