//! Held-out accuracy metrics.

/// Actuals at or below this magnitude count as zero for MAPE.
pub const MAPE_ZERO_TOLERANCE: f64 = f64::EPSILON;

/// Root mean squared error.
///
/// `None` if the slices are empty, differ in length, or the result is non-finite.
pub fn rmse(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }
    let mse = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64;
    let v = mse.sqrt();
    v.is_finite().then_some(v)
}

/// Mean absolute percentage error, in percent.
///
/// Undefined (`None`) when any actual value is within `MAPE_ZERO_TOLERANCE` of
/// zero or the result is non-finite.
pub fn mape(actual: &[f64], predicted: &[f64]) -> Option<f64> {
    if actual.is_empty() || actual.len() != predicted.len() {
        return None;
    }
    if actual.iter().any(|a| a.abs() <= MAPE_ZERO_TOLERANCE) {
        return None;
    }
    let mean = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs() / a.abs())
        .sum::<f64>()
        / actual.len() as f64;
    let v = mean * 100.0;
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rmse_of_known_errors() {
        let v = rmse(&[1.0, 2.0, 3.0, 4.0], &[2.0, 2.0, 3.0, 2.0]).unwrap();
        // errors: 1, 0, 0, 2 -> mse = 5/4
        assert!((v - (1.25f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn rmse_is_zero_for_perfect_predictions() {
        assert_eq!(rmse(&[5.0, 6.0], &[5.0, 6.0]), Some(0.0));
    }

    #[test]
    fn mape_in_percent() {
        let v = mape(&[100.0, 200.0], &[110.0, 180.0]).unwrap();
        assert!((v - 10.0).abs() < 1e-12);
    }

    #[test]
    fn mape_absent_when_an_actual_is_zero() {
        assert_eq!(mape(&[100.0, 0.0], &[100.0, 1.0]), None);
        // RMSE stays defined for the same data.
        assert!(rmse(&[100.0, 0.0], &[100.0, 1.0]).is_some());
    }

    #[test]
    fn mape_absent_for_near_zero_actuals() {
        assert_eq!(mape(&[100.0, 1e-300], &[100.0, 1.0]), None);
        assert_eq!(mape(&[100.0, -1e-17], &[100.0, 1.0]), None);
        assert!(mape(&[100.0, 1e-3], &[100.0, 1e-3]).is_some());
    }

    #[test]
    fn mismatched_lengths_are_undefined() {
        assert_eq!(rmse(&[1.0, 2.0], &[1.0]), None);
        assert_eq!(mape(&[1.0], &[]), None);
    }
}
