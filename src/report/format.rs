//! Formatted terminal output.
//!
//! Formatting lives in one place so the evaluation and serving code stays free
//! of presentation details.

use crate::domain::{MIN_HISTORY_MONTHS, TitleSummary, WinnerModel, WinnerRecord};
use crate::fit::{TitleEvaluation, WinnerTable};
use crate::serve::{ForecastResponse, HistoryResponse};

/// Per-title model diagnostics plus the chosen winner.
pub fn format_evaluations(evaluations: &[TitleEvaluation], winners: &WinnerTable) -> String {
    let mut out = String::new();

    out.push_str("=== sf - Salary Forecast Model Comparison ===\n");
    out.push_str(&format!("Titles evaluated: {}\n", evaluations.len()));

    for eval in evaluations {
        let best = winners.get(&eval.title).map(|w| &w.best_model);
        out.push_str(&format!(
            "\n{} (n={}, train={}, test={})\n",
            eval.title,
            eval.n_months,
            eval.split,
            eval.n_months - eval.split
        ));
        for r in &eval.results {
            let chosen = if best == Some(&WinnerModel::Model(r.model)) { "*" } else { " " };
            out.push_str(&format!(
                "{chosen} {:<14} RMSE={:>12.2} MAPE={}\n",
                r.model.label(),
                r.rmse,
                fmt_pct(r.mape)
            ));
        }
        for (kind, reason) in &eval.skipped {
            out.push_str(&format!("  (skipped {kind}) {reason}\n"));
        }
        if best == Some(&WinnerModel::NotAvailable) {
            out.push_str("  no model could be scored: N/A\n");
        }
    }

    out
}

/// Titles that were excluded from evaluation and why.
pub fn format_exclusions(excluded: &[(String, String)]) -> String {
    if excluded.is_empty() {
        return String::new();
    }
    let mut out = format!("\nExcluded titles ({}):\n", excluded.len());
    for (title, reason) in excluded {
        out.push_str(&format!("- {title}: {reason}\n"));
    }
    out
}

pub fn format_winners(table: &WinnerTable) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<32} {:<14} {:>10} {:>12}\n",
        "job_title", "best_model", "best_mape", "best_rmse"
    ));
    for record in table.persisted_order() {
        out.push_str(&format_winner_row(record));
    }
    out
}

fn format_winner_row(record: &WinnerRecord) -> String {
    format!(
        "{:<32} {:<14} {:>10} {:>12}\n",
        truncate(&record.job_title, 32),
        record.best_model.label(),
        fmt_pct(record.best_mape),
        record.best_rmse.map(|v| format!("{v:.2}")).unwrap_or_else(|| "-".to_string()),
    )
}

pub fn format_titles(titles: &[String]) -> String {
    let mut out = String::new();
    for t in titles {
        out.push_str(t);
        out.push('\n');
    }
    out
}

/// History overview per title; titles below the history gate are marked.
pub fn format_title_summaries(summaries: &[TitleSummary]) -> String {
    let mut out = format!(
        "{:<32} {:>6} {:>8} {:<8} {:<8} {:>12}\n",
        "job_title", "months", "posts", "first", "last", "avg_salary"
    );
    for s in summaries {
        let marker = if s.months < MIN_HISTORY_MONTHS { " *" } else { "" };
        out.push_str(&format!(
            "{:<32} {:>6} {:>8} {:<8} {:<8} {:>12.2}{marker}\n",
            truncate(&s.job_title, 32),
            s.months,
            s.total_posts,
            s.first_month.format("%Y-%m"),
            s.last_month.format("%Y-%m"),
            s.avg_salary,
        ));
    }
    if summaries.iter().any(|s| s.months < MIN_HISTORY_MONTHS) {
        out.push_str(&format!("* fewer than {MIN_HISTORY_MONTHS} months; not forecastable\n"));
    }
    out
}

pub fn format_history(history: &HistoryResponse) -> String {
    let mut out = format!("History: {}\n", history.job_title);
    out.push_str(&format!("{:<10} {:>12}\n", "month", "avg_salary"));
    for p in &history.history {
        out.push_str(&format!("{:<10} {:>12.2}\n", p.month.format("%Y-%m"), p.avg_salary));
    }
    out
}

pub fn format_forecast(forecast: &ForecastResponse) -> String {
    let mut out = format!("Forecast: {} (model={})\n", forecast.job_title, forecast.model);
    let with_bounds = forecast.forecast.iter().any(|p| p.lower_bound.is_some());

    if with_bounds {
        out.push_str(&format!("{:<10} {:>12} {:>12} {:>12}\n", "month", "predicted", "lower", "upper"));
    } else {
        out.push_str(&format!("{:<10} {:>12}\n", "month", "predicted"));
    }
    for p in &forecast.forecast {
        let month = p.month.format("%Y-%m");
        match (p.lower_bound, p.upper_bound) {
            (Some(lo), Some(hi)) => {
                out.push_str(&format!("{month:<10} {:>12.2} {lo:>12.2} {hi:>12.2}\n", p.predicted_value));
            }
            _ => out.push_str(&format!("{month:<10} {:>12.2}\n", p.predicted_value)),
        }
    }
    out
}

fn fmt_pct(v: Option<f64>) -> String {
    v.map(|v| format!("{v:.2}%")).unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let head: String = s.chars().take(width.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
