//! Seasonal model: additive piecewise-linear trend with changepoints.
//!
//! Unlike the regressions, this model is fit on calendar time. Each month is
//! converted to days since the first training month and scaled to `s ∈ [0, 1]`
//! over the training span:
//!
//! ```text
//! y(s) = m + k·s + Σ_j δ_j · max(0, s - c_j) + Σ fourier(days)
//! ```
//!
//! - changepoints `c_j` sit on evenly spaced rows within the first
//!   `changepoint_range` of the history
//! - `δ_j` (and Fourier coefficients) carry a ridge penalty derived from their
//!   prior scale, so `changepoint_prior_scale` controls trend flexibility
//! - `y` is scaled by its maximum absolute value before solving
//!
//! The uncertainty band combines the in-sample residual noise with a trend term
//! that grows past the last observation at the historical changepoint rate and
//! magnitude. It is computed analytically, so repeated fits are identical.

use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};

use crate::domain::{ModelKind, MonthlyPoint, SeasonalConfig};
use crate::error::ForecastError;
use crate::math::{fourier_terms, hinge, solve_ridge};

/// Minimum history the seasonal model accepts.
pub const SEASONAL_MIN_POINTS: usize = 2;

/// Assumed observation noise on scaled `y`; converts prior scales into ridge strengths.
const NOISE_PRIOR: f64 = 0.05;

const YEARLY: (f64, usize) = (365.25, 10);
const WEEKLY: (f64, usize) = (7.0, 3);
const DAILY: (f64, usize) = (1.0, 4);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Component {
    period_days: f64,
    order: usize,
}

/// Point forecast plus symmetric band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeasonalPrediction {
    pub value: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalFit {
    start: NaiveDate,
    t_scale: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    components: Vec<Component>,
    /// `[m, k, δ_1..δ_c, fourier...]` on scaled `y`.
    coeffs: Vec<f64>,
    sigma_obs: f64,
    delta_scale: f64,
    z: f64,
}

impl SeasonalFit {
    pub fn changepoints(&self) -> &[f64] {
        &self.changepoints
    }

    pub fn predict(&self, month: NaiveDate) -> SeasonalPrediction {
        let days = (month - self.start).num_days() as f64;
        let row = design_row(days, self.t_scale, &self.changepoints, &self.components);
        let y_scaled: f64 = row.iter().zip(self.coeffs.iter()).map(|(x, b)| x * b).sum();

        // Future trend changes arrive at the historical rate (changepoints per
        // unit of scaled time) with Laplace magnitude `delta_scale`; each adds a
        // slope change whose variance accumulates as dt^3 / 3.
        let s = days / self.t_scale;
        let dt = (s - 1.0).max(0.0);
        let rate = self.changepoints.len() as f64;
        let trend_var = rate * 2.0 * self.delta_scale.powi(2) * dt.powi(3) / 3.0;
        let sigma = (self.sigma_obs.powi(2) + trend_var).sqrt() * self.y_scale;

        let value = y_scaled * self.y_scale;
        SeasonalPrediction {
            value,
            lower: value - self.z * sigma,
            upper: value + self.z * sigma,
        }
    }
}

pub fn fit_seasonal(window: &[MonthlyPoint], config: &SeasonalConfig) -> Result<SeasonalFit, ForecastError> {
    let label = ModelKind::Seasonal.label();
    if window.len() < SEASONAL_MIN_POINTS {
        return Err(ForecastError::fit_failure(
            label,
            format!(
                "need at least {SEASONAL_MIN_POINTS} points, got {}",
                window.len()
            ),
        ));
    }

    let start = window[0].month;
    let days: Vec<f64> = window
        .iter()
        .map(|p| (p.month - start).num_days() as f64)
        .collect();
    let t_scale = days[days.len() - 1];
    if t_scale <= 0.0 {
        return Err(ForecastError::fit_failure(label, "history spans zero days"));
    }

    let y_abs_max = window.iter().map(|p| p.value.abs()).fold(0.0, f64::max);
    let y_scale = if y_abs_max > 0.0 { y_abs_max } else { 1.0 };

    let s: Vec<f64> = days.iter().map(|d| d / t_scale).collect();
    let changepoints = place_changepoints(&s, config);
    let components = enabled_components(config);

    let n = window.len();
    let n_cp = changepoints.len();
    let first_row = design_row(days[0], t_scale, &changepoints, &components);
    let p = first_row.len();

    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut y = DVector::<f64>::zeros(n);
    for i in 0..n {
        let row = design_row(days[i], t_scale, &changepoints, &components);
        for (j, v) in row.iter().enumerate() {
            x[(i, j)] = *v;
        }
        y[i] = window[i].value / y_scale;
    }

    let cp_penalty = (NOISE_PRIOR / config.changepoint_prior_scale).powi(2);
    let seasonal_penalty = (NOISE_PRIOR / config.seasonality_prior_scale).powi(2);
    let mut penalties = vec![0.0; p];
    for (j, slot) in penalties.iter_mut().enumerate().skip(2) {
        *slot = if j < 2 + n_cp { cp_penalty } else { seasonal_penalty };
    }

    let beta = solve_ridge(&x, &y, &penalties)
        .ok_or_else(|| ForecastError::fit_failure(label.clone(), "penalised least squares solve failed"))?;
    let coeffs: Vec<f64> = beta.iter().copied().collect();

    let fitted = &x * &beta;
    let sse: f64 = (0..n).map(|i| (y[i] - fitted[i]).powi(2)).sum();
    let sigma_obs = (sse / n as f64).sqrt();
    if !sigma_obs.is_finite() {
        return Err(ForecastError::fit_failure(label, "non-finite residuals"));
    }

    let delta_scale = if n_cp > 0 {
        coeffs[2..2 + n_cp].iter().map(|d| d.abs()).sum::<f64>() / n_cp as f64
    } else {
        0.0
    };

    Ok(SeasonalFit {
        start,
        t_scale,
        y_scale,
        changepoints,
        components,
        coeffs,
        sigma_obs,
        delta_scale,
        z: z_for_interval(config.interval_width),
    })
}

/// Changepoints at evenly spaced rows of the first `changepoint_range` of history.
fn place_changepoints(s: &[f64], config: &SeasonalConfig) -> Vec<f64> {
    let hist_size = (s.len() as f64 * config.changepoint_range).floor() as usize;
    let n_cp = config.n_changepoints.min(hist_size.saturating_sub(1));
    if n_cp == 0 {
        return Vec::new();
    }

    let last = (hist_size - 1) as f64;
    (1..=n_cp)
        .map(|j| {
            let idx = (j as f64 * last / n_cp as f64).round() as usize;
            s[idx.min(s.len() - 1)]
        })
        .collect()
}

fn enabled_components(config: &SeasonalConfig) -> Vec<Component> {
    let mut out = Vec::new();
    for (enabled, (period_days, order)) in [
        (config.yearly_seasonality, YEARLY),
        (config.weekly_seasonality, WEEKLY),
        (config.daily_seasonality, DAILY),
    ] {
        if enabled {
            out.push(Component { period_days, order });
        }
    }
    out
}

fn design_row(days: f64, t_scale: f64, changepoints: &[f64], components: &[Component]) -> Vec<f64> {
    let s = days / t_scale;
    let mut row = Vec::with_capacity(2 + changepoints.len());
    row.push(1.0);
    row.push(s);
    for &c in changepoints {
        row.push(hinge(s, c));
    }
    for comp in components {
        fourier_terms(days, comp.period_days, comp.order, &mut row);
    }
    row
}

/// Two-sided normal quantile for common interval widths.
fn z_for_interval(width: f64) -> f64 {
    match width {
        x if x >= 0.99 => 2.576,
        x if x >= 0.95 => 1.96,
        x if x >= 0.90 => 1.645,
        x if x >= 0.80 => 1.282,
        x if x >= 0.68 => 0.994,
        _ => 0.674,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::add_months;

    fn window(values: &[f64]) -> Vec<MonthlyPoint> {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
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
    fn changepoints_stay_in_leading_range() {
        let w = window(&[1.0; 20]);
        let fit = fit_seasonal(&w, &SeasonalConfig::default()).unwrap();
        // hist_size = 16 -> 15 changepoints, all at or before row 15.
        assert_eq!(fit.changepoints().len(), 15);
        let limit = (w[15].month - w[0].month).num_days() as f64 / (w[19].month - w[0].month).num_days() as f64;
        assert!(fit.changepoints().iter().all(|&c| c > 0.0 && c <= limit + 1e-12));
    }

    #[test]
    fn tracks_a_steady_trend() {
        let values: Vec<f64> = (0..12).map(|i| 50_000.0 + 500.0 * i as f64).collect();
        let w = window(&values);
        let fit = fit_seasonal(&w, &SeasonalConfig::default()).unwrap();

        let next = add_months(w[11].month, 1).unwrap();
        let p = fit.predict(next);
        assert!(p.value > values[11], "forecast {} should continue the trend", p.value);
        assert!(p.lower <= p.value && p.value <= p.upper);
    }

    #[test]
    fn band_widens_with_horizon() {
        let values = [10.0, 12.0, 11.0, 14.0, 13.0, 15.0, 17.0, 16.0, 18.0, 21.0];
        let w = window(&values);
        let fit = fit_seasonal(&w, &SeasonalConfig::default()).unwrap();
        let last = w[w.len() - 1].month;
        let near = fit.predict(add_months(last, 1).unwrap());
        let far = fit.predict(add_months(last, 12).unwrap());
        assert!(far.upper - far.lower >= near.upper - near.lower);
    }

    #[test]
    fn refit_is_deterministic() {
        let values = [3.0, 4.0, 3.5, 5.0, 6.0, 5.5, 7.0, 8.0];
        let w = window(&values);
        let a = fit_seasonal(&w, &SeasonalConfig::default()).unwrap();
        let b = fit_seasonal(&w, &SeasonalConfig::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn yearly_component_is_optional() {
        let values: Vec<f64> = (0..24).map(|i| 100.0 + (i % 12) as f64).collect();
        let cfg = SeasonalConfig {
            yearly_seasonality: true,
            ..SeasonalConfig::default()
        };
        let fit = fit_seasonal(&window(&values), &cfg).unwrap();
        assert!(fit.predict(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()).value.is_finite());
    }

    #[test]
    fn single_point_is_rejected() {
        let err = fit_seasonal(&window(&[1.0]), &SeasonalConfig::default()).unwrap_err();
        assert!(matches!(err, ForecastError::FitFailure { .. }));
    }
}
