//! Linear and polynomial regressions on the month index.
//!
//! Both fit `y` against powers of the zero-based month index `t`:
//! - `Linear`: closed-form OLS for `y = a·t + b`
//! - `Polynomial(d)`: least squares on `[1, t, …, t^d]` via SVD

use nalgebra::{DMatrix, DVector};

use crate::domain::{ModelKind, MonthlyPoint};
use crate::error::ForecastError;
use crate::math::{eval_poly, power_row, solve_least_squares};

/// Both regressions need at least two observations.
pub const REGRESSION_MIN_POINTS: usize = 2;

/// Fitted coefficients in increasing power order (`coeffs[0]` is the intercept).
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionFit {
    kind: ModelKind,
    coeffs: Vec<f64>,
}

impl RegressionFit {
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    pub fn predict(&self, t: usize) -> f64 {
        eval_poly(&self.coeffs, t as f64)
    }
}

pub fn fit_linear(window: &[MonthlyPoint]) -> Result<RegressionFit, ForecastError> {
    let kind = ModelKind::Linear;
    ensure_min_points(kind, window)?;

    let n = window.len() as f64;
    let t_bar = (window.len() - 1) as f64 / 2.0;
    let y_bar = window.iter().map(|p| p.value).sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (t, p) in window.iter().enumerate() {
        let dt = t as f64 - t_bar;
        sxy += dt * (p.value - y_bar);
        sxx += dt * dt;
    }

    let slope = sxy / sxx;
    let intercept = y_bar - slope * t_bar;
    if !(slope.is_finite() && intercept.is_finite()) {
        return Err(ForecastError::fit_failure(kind.label(), "non-finite coefficients"));
    }

    Ok(RegressionFit {
        kind,
        coeffs: vec![intercept, slope],
    })
}

pub fn fit_polynomial(window: &[MonthlyPoint], degree: u32) -> Result<RegressionFit, ForecastError> {
    let kind = ModelKind::Polynomial { degree };
    if degree == 0 {
        return Err(ForecastError::fit_failure(kind.label(), "degree must be >= 1"));
    }
    ensure_min_points(kind, window)?;

    let degree = degree as usize;
    let n = window.len();
    let mut x = DMatrix::<f64>::zeros(n, degree + 1);
    let mut y = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; degree + 1];

    for (t, p) in window.iter().enumerate() {
        power_row(t as f64, degree, &mut row);
        for (j, v) in row.iter().enumerate() {
            x[(t, j)] = *v;
        }
        y[t] = p.value;
    }

    let beta = solve_least_squares(&x, &y)
        .ok_or_else(|| ForecastError::fit_failure(kind.label(), "least squares solve failed"))?;

    Ok(RegressionFit {
        kind,
        coeffs: beta.iter().copied().collect(),
    })
}

fn ensure_min_points(kind: ModelKind, window: &[MonthlyPoint]) -> Result<(), ForecastError> {
    if window.len() < REGRESSION_MIN_POINTS {
        return Err(ForecastError::fit_failure(
            kind.label(),
            format!(
                "need at least {REGRESSION_MIN_POINTS} points, got {}",
                window.len()
            ),
        ));
    }
    Ok(())
}
