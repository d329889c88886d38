//! Error types.
//!
//! - `ForecastError` is the library taxonomy returned by the core (series,
//!   models, evaluation, serving).
//! - `AppError` is what the `sf` binary reports: a message plus a process exit
//!   code.

use thiserror::Error;

use crate::domain::MIN_HISTORY_MONTHS;

/// Coarse error kind, stable across message changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    MissingParameter,
    InvalidParameter,
    NotFound,
    InsufficientHistory,
    NoWinner,
    UnsupportedModel,
    FitFailure,
    InvalidSeries,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("Missing '{0}' parameter")]
    MissingParameter(&'static str),

    #[error("Invalid '{name}' parameter: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("No data found for title: {0}")]
    NotFound(String),

    #[error("Insufficient history for '{title}': {months} months (< {required} required)", required = MIN_HISTORY_MONTHS)]
    InsufficientHistory { title: String, months: usize },

    #[error("No winner model found for title: {0}")]
    NoWinner(String),

    #[error("Unsupported model or model not available: {0}")]
    UnsupportedModel(String),

    #[error("{model} fit failed: {reason}")]
    FitFailure { model: String, reason: String },

    #[error("Invalid series: {0}")]
    InvalidSeries(String),
}

impl ForecastError {
    pub fn fit_failure(model: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FitFailure {
            model: model.into(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingParameter(_) => ErrorKind::MissingParameter,
            Self::InvalidParameter { .. } => ErrorKind::InvalidParameter,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            Self::NoWinner(_) => ErrorKind::NoWinner,
            Self::UnsupportedModel(_) => ErrorKind::UnsupportedModel,
            Self::FitFailure { .. } => ErrorKind::FitFailure,
            Self::InvalidSeries(_) => ErrorKind::InvalidSeries,
        }
    }

    /// Exit code used when this error terminates the `sf` binary.
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::MissingParameter | ErrorKind::InvalidParameter | ErrorKind::InvalidSeries => 2,
            ErrorKind::NotFound | ErrorKind::InsufficientHistory | ErrorKind::NoWinner => 3,
            ErrorKind::FitFailure => 4,
            ErrorKind::UnsupportedModel => 5,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<ForecastError> for AppError {
    fn from(err: ForecastError) -> Self {
        Self::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
