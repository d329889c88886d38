//! Command-line parsing for the salary forecaster.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! evaluation and serving code. File locations fall back to `SF_*` environment
//! variables (a `.env` file is honoured).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_HORIZON, DEFAULT_POLY_DEGREE};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "sf", version, about = "Per-title salary forecasting: model selection and serving")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate a synthetic postings CSV.
    Sample(SampleArgs),
    /// Aggregate raw postings into the monthly aggregates CSV.
    Aggregate(AggregateArgs),
    /// Evaluate every model per title and write the winner table.
    Evaluate(EvaluateArgs),
    /// Print the stored winner table.
    Compare(WinnersArgs),
    /// List titles with enough history to forecast.
    Titles(TitlesArgs),
    /// Print a title's monthly history.
    History(HistoryArgs),
    /// Forecast a title with its stored winning model.
    Forecast(ForecastArgs),
}

#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Output postings CSV.
    #[arg(long, short = 'o', env = "SF_POSTINGS_PATH", default_value = "data/postings.csv")]
    pub out: PathBuf,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of months to generate.
    #[arg(long, default_value_t = 24)]
    pub months: u32,

    /// Number of titles to generate.
    #[arg(long, default_value_t = 6)]
    pub titles: usize,

    /// First month (YYYY-MM-DD).
    #[arg(long, default_value = "2022-01-01")]
    pub start: chrono::NaiveDate,

    /// Upper bound of postings per title and month.
    #[arg(long, default_value_t = 5)]
    pub max_postings: u32,
}

#[derive(Debug, Args, Clone)]
pub struct AggregateArgs {
    /// Raw postings CSV.
    #[arg(long, env = "SF_POSTINGS_PATH", default_value = "data/postings.csv")]
    pub postings: PathBuf,

    /// Output monthly aggregates CSV.
    #[arg(long, short = 'o', env = "SF_DATA_PATH", default_value = "data/monthly_aggregates.csv")]
    pub out: PathBuf,
}

/// Where the monthly aggregates come from.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Monthly aggregates CSV.
    #[arg(long, env = "SF_DATA_PATH", default_value = "data/monthly_aggregates.csv")]
    pub data: PathBuf,

    /// Read raw postings instead of the aggregates file (takes precedence).
    #[arg(long)]
    pub postings: Option<PathBuf>,
}

/// Model settings shared by evaluation and serving.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Degree of the polynomial candidate.
    #[arg(long, default_value_t = DEFAULT_POLY_DEGREE)]
    pub poly_degree: u32,

    /// Trend flexibility of the seasonal model.
    #[arg(long, default_value_t = 0.5)]
    pub changepoint_prior_scale: f64,

    /// Coverage of the seasonal forecast band.
    #[arg(long, default_value_t = 0.8)]
    pub interval_width: f64,

    /// Enable yearly seasonality in the seasonal model.
    #[arg(long)]
    pub yearly_seasonality: bool,

    /// Whether the seasonal model is available in this process.
    #[arg(long, env = "SF_SEASONAL", default_value_t = true, action = clap::ArgAction::Set)]
    pub seasonal: bool,

    /// Shorthand for `--seasonal false`.
    #[arg(long)]
    pub no_seasonal: bool,
}

#[derive(Debug, Args, Clone)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Output directory for the winner table and comparison summary.
    #[arg(long, default_value = "data/processed")]
    pub out_dir: PathBuf,

    /// Winner table JSON (defaults to `<out-dir>/model_winners.json`).
    #[arg(long, env = "SF_WINNERS_PATH")]
    pub winners: Option<PathBuf>,

    /// Do not print per-title diagnostics.
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct WinnersArgs {
    /// Winner table JSON.
    #[arg(long, env = "SF_WINNERS_PATH", default_value = "data/processed/model_winners.json")]
    pub winners: PathBuf,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct TitlesArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Show months, postings, first/last month and mean salary per title.
    #[arg(long, short = 's')]
    pub summary: bool,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct HistoryArgs {
    /// Job title (case-insensitive).
    #[arg(long, short = 't')]
    pub title: Option<String>,

    #[command(flatten)]
    pub data: DataArgs,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct ForecastArgs {
    /// Job title (case-insensitive).
    #[arg(long, short = 't')]
    pub title: Option<String>,

    /// Months to forecast past the last observed month.
    #[arg(long, short = 'H', default_value_t = DEFAULT_HORIZON)]
    pub horizon: usize,

    #[command(flatten)]
    pub data: DataArgs,

    /// Winner table JSON.
    #[arg(long, env = "SF_WINNERS_PATH", default_value = "data/processed/model_winners.json")]
    pub winners: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,

    /// Print JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}
