//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and initialises logging
//! - parses CLI arguments
//! - loads postings / aggregates and the winner table
//! - runs the model-selection pipeline or serves history and forecasts
//! - prints reports and writes outputs

use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{
    AggregateArgs, Command, DataArgs, EvaluateArgs, ForecastArgs, HistoryArgs, ModelArgs, SampleArgs, TitlesArgs,
    WinnersArgs,
};
use crate::data::sample::{SampleConfig, generate_postings};
use crate::domain::{ForecastConfig, PostingRecord, SeasonalConfig};
use crate::error::AppError;
use crate::io::ingest::{Ingested, RowError};
use crate::models::ModelCatalog;
use crate::series::{SeriesSource, aggregate_postings};
use crate::serve::ForecastService;

pub mod pipeline;

/// Entry point for the `sf` binary.
pub fn run() -> Result<(), AppError> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Sample(args) => handle_sample(args),
        Command::Aggregate(args) => handle_aggregate(args),
        Command::Evaluate(args) => handle_evaluate(args),
        Command::Compare(args) => handle_compare(args),
        Command::Titles(args) => handle_titles(args),
        Command::History(args) => handle_history(args),
        Command::Forecast(args) => handle_forecast(args),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"));
    let Ok(filter) = filter else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = SampleConfig {
        seed: args.seed,
        start: args.start,
        months: args.months,
        titles: args.titles,
        max_postings_per_month: args.max_postings,
    };
    let postings = generate_postings(&config)?;
    write_postings_csv(&args.out, &postings)?;
    info!(rows = postings.len(), path = %args.out.display(), "sample postings written");
    Ok(())
}

fn handle_aggregate(args: AggregateArgs) -> Result<(), AppError> {
    let ingested = crate::io::load_postings(&args.postings)?;
    log_row_errors("postings", &ingested);

    let rows = aggregate_postings(&ingested.rows);
    ensure_parent_dir(&args.out)?;
    crate::io::write_aggregates(&args.out, &rows)?;
    info!(rows = rows.len(), path = %args.out.display(), "monthly aggregates written");
    Ok(())
}

fn handle_evaluate(args: EvaluateArgs) -> Result<(), AppError> {
    let catalog = catalog_from_args(&args.model)?;
    let source = load_source(&args.data)?;

    let run = pipeline::run_pipeline(&source, &catalog);
    let outputs = pipeline::write_outputs(&run, &args.out_dir, args.winners.as_deref())?;

    if !args.quiet {
        println!("{}", crate::report::format_evaluations(&run.evaluations, &run.winners));
        print!("{}", crate::report::format_exclusions(&run.excluded));
    }
    println!("{}", crate::report::format_winners(&run.winners));
    println!("Saved: {}", outputs.winners_json.display());
    println!("Saved: {}", outputs.winners_csv.display());
    println!("Saved: {}", outputs.comparison_csv.display());
    Ok(())
}

fn handle_compare(args: WinnersArgs) -> Result<(), AppError> {
    let table = crate::io::read_winners_json(&args.winners)?;
    if args.json {
        print_json(&table.persisted_order())
    } else {
        print!("{}", crate::report::format_winners(&table));
        Ok(())
    }
}

fn handle_titles(args: TitlesArgs) -> Result<(), AppError> {
    let source = load_source(&args.data)?;

    if args.summary {
        let summaries = source.title_summaries();
        if args.json {
            return print_json(&summaries);
        }
        print!("{}", crate::report::format_title_summaries(&summaries));
        return Ok(());
    }

    let titles = source.eligible_titles();
    if args.json {
        print_json(&titles)
    } else {
        print!("{}", crate::report::format_titles(&titles));
        Ok(())
    }
}

fn handle_history(args: HistoryArgs) -> Result<(), AppError> {
    let source = load_source(&args.data)?;
    let service = ForecastService::new(source, Default::default(), ModelCatalog::new(&ForecastConfig::default()));
    let history = service.get_history(args.title.as_deref())?;

    if args.json {
        print_json(&history)
    } else {
        print!("{}", crate::report::format_history(&history));
        Ok(())
    }
}

fn handle_forecast(args: ForecastArgs) -> Result<(), AppError> {
    let catalog = catalog_from_args(&args.model)?;
    let source = load_source(&args.data)?;
    let winners = crate::io::read_winners_json(&args.winners)?;

    let service = ForecastService::new(source, winners, catalog);
    let forecast = service.get_forecast(args.title.as_deref(), Some(args.horizon))?;

    if args.json {
        print_json(&forecast)
    } else {
        print!("{}", crate::report::format_forecast(&forecast));
        Ok(())
    }
}

pub fn forecast_config_from_args(args: &ModelArgs) -> Result<ForecastConfig, AppError> {
    let config = ForecastConfig {
        polynomial_degree: args.poly_degree,
        seasonal: SeasonalConfig {
            changepoint_prior_scale: args.changepoint_prior_scale,
            interval_width: args.interval_width,
            yearly_seasonality: args.yearly_seasonality,
            ..SeasonalConfig::default()
        },
        seasonal_available: args.seasonal && !args.no_seasonal,
    };
    config.validate()?;
    Ok(config)
}

fn catalog_from_args(args: &ModelArgs) -> Result<ModelCatalog, AppError> {
    let config = forecast_config_from_args(args)?;
    if !config.seasonal_available {
        info!("seasonal model disabled for this process");
    }
    Ok(ModelCatalog::new(&config))
}

/// Raw postings win over the aggregates file when both are given.
fn load_source(args: &DataArgs) -> Result<SeriesSource, AppError> {
    let source = match &args.postings {
        Some(path) => {
            let ingested = crate::io::load_postings(path)?;
            log_row_errors("postings", &ingested);
            SeriesSource::from_postings(&ingested.rows)
        }
        None => {
            let ingested = crate::io::load_aggregates(&args.data)?;
            log_row_errors("aggregates", &ingested);
            SeriesSource::new(ingested.rows)
        }
    };
    info!(rows = source.len(), titles = source.titles().len(), "series source loaded");
    Ok(source)
}

fn log_row_errors<T>(what: &str, ingested: &Ingested<T>) {
    if ingested.row_errors.is_empty() {
        return;
    }
    tracing::warn!(
        what,
        rejected = ingested.row_errors.len(),
        read = ingested.rows_read,
        "rows rejected during ingest"
    );
    for RowError { line, message } in ingested.row_errors.iter().take(10) {
        tracing::debug!(what, line, %message, "rejected row");
    }
}

fn write_postings_csv(path: &std::path::Path, postings: &[PostingRecord]) -> Result<(), AppError> {
    ensure_parent_dir(path)?;
    let mut writer = csv::Writer::from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to create postings CSV '{}': {e}", path.display())))?;
    writer
        .write_record(["job_title", "salary_annual", "posting_date", "work_location"])
        .map_err(|e| AppError::new(2, format!("Failed to write postings CSV header: {e}")))?;
    for p in postings {
        let salary = format!("{:.2}", p.salary);
        let date = p.posting_date.format("%Y-%m-%d").to_string();
        writer
            .write_record([
                p.job_title.as_str(),
                salary.as_str(),
                date.as_str(),
                p.work_location.as_deref().unwrap_or(""),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write postings CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush postings CSV: {e}")))
}

fn ensure_parent_dir(path: &std::path::Path) -> Result<(), AppError> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => std::fs::create_dir_all(parent)
            .map_err(|e| AppError::new(2, format!("Failed to create directory '{}': {e}", parent.display()))),
        None => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let text =
        serde_json::to_string_pretty(value).map_err(|e| AppError::new(2, format!("Failed to encode JSON: {e}")))?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn model_args(argv: &[&str]) -> ModelArgs {
        let mut full = vec!["sf", "evaluate"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Evaluate(args) => args.model,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn config_follows_flags() {
        let config = forecast_config_from_args(&model_args(&["--no-seasonal", "--poly-degree", "3"])).unwrap();
        assert!(!config.seasonal_available);
        assert_eq!(config.polynomial_degree, 3);
        assert_eq!(config.seasonal.changepoint_prior_scale, 0.5);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let err = forecast_config_from_args(&model_args(&["--poly-degree", "0"])).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn sample_postings_round_trip_through_ingest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("postings.csv");
        let postings = generate_postings(&SampleConfig::default()).unwrap();
        write_postings_csv(&path, &postings).unwrap();

        let ingested = crate::io::load_postings(&path).unwrap();
        assert!(ingested.row_errors.is_empty());
        assert_eq!(ingested.rows.len(), postings.len());
        assert_eq!(ingested.rows[0].job_title, postings[0].job_title);
        assert_eq!(ingested.rows[0].posting_date, postings[0].posting_date);
    }
}
