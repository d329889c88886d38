//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during evaluation and serving
//! - exported to JSON/CSV (winner table, comparison summary, forecasts)
//! - reloaded later by the serving layer

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ForecastError;

/// Hard gate: a title needs this many distinct months before any model is fit.
///
/// Enforced identically by the evaluation pipeline and by the serving layer.
pub const MIN_HISTORY_MONTHS: usize = 8;

/// Default number of months returned by `get_forecast`.
pub const DEFAULT_HORIZON: usize = 6;

/// Default polynomial degree for the `Polynomial` candidate.
pub const DEFAULT_POLY_DEGREE: u32 = 2;

/// Truncate a date to the first day of its month.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// `month + n` calendar months.
pub fn add_months(month: NaiveDate, n: u32) -> Option<NaiveDate> {
    month.checked_add_months(Months::new(n))
}

/// Serde adapter for months rendered as `YYYY-MM-01`.
pub mod month_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    const FMT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(month: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&month.format(FMT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&s, FMT).map_err(serde::de::Error::custom)
    }
}

/// Concrete forecasting model kind.
///
/// This is a closed set: persisted labels are parsed into one of these variants
/// (or kept as an unrecognized tag, see [`WinnerModel`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ModelKind {
    Linear,
    Polynomial { degree: u32 },
    Seasonal,
}

impl ModelKind {
    /// Persisted / human-readable label.
    pub fn label(self) -> String {
        match self {
            ModelKind::Linear => "Linear".to_string(),
            ModelKind::Polynomial { degree } => format!("Polynomial d{degree}"),
            ModelKind::Seasonal => "Seasonal".to_string(),
        }
    }

    /// Parse a persisted label.
    ///
    /// `Prophet` is accepted as the legacy name of the seasonal model.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim() {
            "Linear" => Some(ModelKind::Linear),
            "Seasonal" | "Prophet" => Some(ModelKind::Seasonal),
            other => {
                let degree = other.strip_prefix("Polynomial d")?.parse::<u32>().ok()?;
                (degree > 0).then_some(ModelKind::Polynomial { degree })
            }
        }
    }

    /// Fixed priority used to break exact ties (lower wins).
    pub fn priority(self) -> (u8, u32) {
        match self {
            ModelKind::Linear => (0, 1),
            ModelKind::Polynomial { degree } => (1, degree),
            ModelKind::Seasonal => (2, 0),
        }
    }

    /// Whether forecasts from this kind carry uncertainty bounds.
    pub fn has_bounds(self) -> bool {
        matches!(self, ModelKind::Seasonal)
    }
}

impl TryFrom<String> for ModelKind {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ModelKind::parse_label(&value).ok_or_else(|| format!("unknown model label '{value}'"))
    }
}

impl From<ModelKind> for String {
    fn from(value: ModelKind) -> Self {
        value.label()
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// The `best_model` field of a winner record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum WinnerModel {
    Model(ModelKind),
    /// No candidate evaluated successfully (`"N/A"`).
    NotAvailable,
    /// A tag this build does not know; served as `UnsupportedModel`.
    Unrecognized(String),
}

impl WinnerModel {
    pub const NOT_AVAILABLE: &'static str = "N/A";

    pub fn label(&self) -> String {
        match self {
            WinnerModel::Model(kind) => kind.label(),
            WinnerModel::NotAvailable => Self::NOT_AVAILABLE.to_string(),
            WinnerModel::Unrecognized(tag) => tag.clone(),
        }
    }
}

impl From<String> for WinnerModel {
    fn from(value: String) -> Self {
        if value.trim() == Self::NOT_AVAILABLE {
            return WinnerModel::NotAvailable;
        }
        match ModelKind::parse_label(&value) {
            Some(kind) => WinnerModel::Model(kind),
            None => WinnerModel::Unrecognized(value),
        }
    }
}

impl From<WinnerModel> for String {
    fn from(value: WinnerModel) -> Self {
        value.label()
    }
}

/// One month of a title's series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyPoint {
    #[serde(with = "month_format")]
    pub month: NaiveDate,
    pub value: f64,
}

/// A title's monthly series: strictly increasing, first-of-month, finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    title: String,
    points: Vec<MonthlyPoint>,
}

impl TimeSeries {
    pub fn new(title: impl Into<String>, points: Vec<MonthlyPoint>) -> Result<Self, ForecastError> {
        let title = title.into();
        if points.is_empty() {
            return Err(ForecastError::InvalidSeries(format!("series for '{title}' is empty")));
        }
        for p in &points {
            if p.month.day() != 1 {
                return Err(ForecastError::InvalidSeries(format!(
                    "month {} is not a month start",
                    p.month
                )));
            }
            if !p.value.is_finite() {
                return Err(ForecastError::InvalidSeries(format!(
                    "non-finite value at {}",
                    p.month
                )));
            }
        }
        if let Some(w) = points.windows(2).find(|w| w[1].month <= w[0].month) {
            return Err(ForecastError::InvalidSeries(format!(
                "months must be strictly increasing ({} then {})",
                w[0].month, w[1].month
            )));
        }
        Ok(Self { title, points })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn points(&self) -> &[MonthlyPoint] {
        &self.points
    }

    /// Number of distinct months.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_month(&self) -> NaiveDate {
        self.points[self.points.len() - 1].month
    }

    pub fn is_sufficient(&self) -> bool {
        self.len() >= MIN_HISTORY_MONTHS
    }

    /// Fail with `InsufficientHistory` below the minimum month count.
    pub fn ensure_sufficient(&self) -> Result<(), ForecastError> {
        if self.is_sufficient() {
            Ok(())
        } else {
            Err(ForecastError::InsufficientHistory {
                title: self.title.clone(),
                months: self.len(),
            })
        }
    }
}

/// Held-out accuracy of one model kind for one title.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub model: ModelKind,
    pub rmse: f64,
    /// Absent when any held-out actual is zero or the value is non-finite.
    pub mape: Option<f64>,
}

/// Persisted winner for one title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub job_title: String,
    pub best_model: WinnerModel,
    pub best_mape: Option<f64>,
    pub best_rmse: Option<f64>,
}

impl WinnerRecord {
    pub fn not_available(job_title: impl Into<String>) -> Self {
        Self {
            job_title: job_title.into(),
            best_model: WinnerModel::NotAvailable,
            best_mape: None,
            best_rmse: None,
        }
    }
}

/// A single forecast month.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    #[serde(with = "month_format")]
    pub month: NaiveDate,
    #[serde(rename = "predicted_salary")]
    pub predicted_value: f64,
    #[serde(rename = "yhat_lower", skip_serializing_if = "Option::is_none", default)]
    pub lower_bound: Option<f64>,
    #[serde(rename = "yhat_upper", skip_serializing_if = "Option::is_none", default)]
    pub upper_bound: Option<f64>,
}

/// One month of `get_history` output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    #[serde(with = "month_format")]
    pub month: NaiveDate,
    pub avg_salary: f64,
}

/// A raw job posting (input of the series builder).
#[derive(Debug, Clone, PartialEq)]
pub struct PostingRecord {
    pub job_title: String,
    pub posting_date: NaiveDate,
    pub salary: f64,
    pub work_location: Option<String>,
}

/// Monthly aggregate row keyed by `(month, job_title, work_location)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    #[serde(with = "month_format")]
    pub month: NaiveDate,
    pub job_title: String,
    #[serde(default)]
    pub work_location: String,
    #[serde(default)]
    pub job_count: u64,
    pub avg_salary: f64,
}

/// Per-title overview of the aggregate rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TitleSummary {
    pub job_title: String,
    /// Distinct months with at least one row.
    pub months: usize,
    /// Sum of `job_count` over all rows.
    pub total_posts: u64,
    #[serde(with = "month_format")]
    pub first_month: NaiveDate,
    #[serde(with = "month_format")]
    pub last_month: NaiveDate,
    /// Unweighted mean of the rows' `avg_salary`.
    pub avg_salary: f64,
}

/// Settings of the seasonal (trend + changepoint) model.
#[derive(Debug, Clone, PartialEq)]
pub struct SeasonalConfig {
    /// Changepoint flexibility; larger values let the trend bend more.
    pub changepoint_prior_scale: f64,
    /// Maximum number of potential changepoints.
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    pub yearly_seasonality: bool,
    pub weekly_seasonality: bool,
    pub daily_seasonality: bool,
    pub seasonality_prior_scale: f64,
    /// Coverage of the uncertainty band (e.g. 0.80).
    pub interval_width: f64,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            changepoint_prior_scale: 0.5,
            n_changepoints: 25,
            changepoint_range: 0.8,
            yearly_seasonality: false,
            weekly_seasonality: false,
            daily_seasonality: false,
            seasonality_prior_scale: 10.0,
            interval_width: 0.8,
        }
    }
}

/// Model settings shared by the pipeline and the serving layer.
///
/// This is derived from CLI flags / environment (plus defaults).
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastConfig {
    pub polynomial_degree: u32,
    pub seasonal: SeasonalConfig,
    /// Capability flag decided once at process start.
    pub seasonal_available: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            polynomial_degree: DEFAULT_POLY_DEGREE,
            seasonal: SeasonalConfig::default(),
            seasonal_available: true,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<(), ForecastError> {
        let invalid = |name, reason: &str| ForecastError::InvalidParameter {
            name,
            reason: reason.to_string(),
        };
        if self.polynomial_degree == 0 {
            return Err(invalid("poly_degree", "must be >= 1"));
        }
        let s = &self.seasonal;
        if !(s.changepoint_prior_scale.is_finite() && s.changepoint_prior_scale > 0.0) {
            return Err(invalid("changepoint_prior_scale", "must be finite and > 0"));
        }
        if !(s.changepoint_range > 0.0 && s.changepoint_range <= 1.0) {
            return Err(invalid("changepoint_range", "must be in (0, 1]"));
        }
        if !(s.seasonality_prior_scale.is_finite() && s.seasonality_prior_scale > 0.0) {
            return Err(invalid("seasonality_prior_scale", "must be finite and > 0"));
        }
        if !(s.interval_width > 0.0 && s.interval_width < 1.0) {
            return Err(invalid("interval_width", "must be in (0, 1)"));
        }
        Ok(())
    }
}
