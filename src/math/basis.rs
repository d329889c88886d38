//! Basis functions used to build design rows.
//!
//! - powers of the month index for the polynomial family
//! - hinge terms `max(0, s - c)` for piecewise-linear trends
//! - Fourier pairs for periodic components

use std::f64::consts::PI;

/// Fill `out` with `[1, t, t^2, …, t^degree]`.
///
/// # Panics
/// Panics if `out.len() != degree + 1`.
pub fn power_row(t: f64, degree: usize, out: &mut [f64]) {
    assert_eq!(out.len(), degree + 1, "power_row: output length mismatch");
    let mut acc = 1.0;
    for slot in out.iter_mut() {
        *slot = acc;
        acc *= t;
    }
}

/// Evaluate a polynomial with coefficients in increasing power order.
pub fn eval_poly(coeffs: &[f64], t: f64) -> f64 {
    // Horner
    coeffs.iter().rev().fold(0.0, |acc, &c| acc * t + c)
}

/// Hinge term of a changepoint at `c`.
pub fn hinge(s: f64, c: f64) -> f64 {
    (s - c).max(0.0)
}

/// Append `order` Fourier pairs `(sin, cos)` of period `period` evaluated at `x`.
///
/// `x` and `period` must share a unit (days in this crate).
pub fn fourier_terms(x: f64, period: f64, order: usize, out: &mut Vec<f64>) {
    for k in 1..=order {
        let angle = 2.0 * PI * k as f64 * x / period;
        out.push(angle.sin());
        out.push(angle.cos());
    }
}
