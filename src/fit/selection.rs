//! Winner selection and the winner table.
//!
//! Selection rules for one title:
//! 1. Among results with a defined MAPE, pick the minimum MAPE.
//! 2. Ties on MAPE fall back to the lower RMSE, then to the fixed model
//!    priority (`Linear < Polynomial < Seasonal`).
//! 3. If no result has a MAPE, pick the minimum RMSE (same priority tie-break).
//! 4. If nothing was scored, the title's winner is `N/A`.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::domain::{EvaluationResult, WinnerModel, WinnerRecord};
use crate::fit::evaluator::TitleEvaluation;
use crate::series::title_key;

/// Pick the winning model for one title.
pub fn select_winner(title: &str, results: &[EvaluationResult]) -> WinnerRecord {
    let with_mape = results
        .iter()
        .filter(|r| r.mape.is_some())
        .min_by(|a, b| by_mape(a, b));

    let best = with_mape.or_else(|| results.iter().min_by(|a, b| by_rmse(a, b)));

    match best {
        Some(r) => WinnerRecord {
            job_title: title.to_string(),
            best_model: WinnerModel::Model(r.model),
            best_mape: r.mape,
            best_rmse: Some(r.rmse),
        },
        None => WinnerRecord::not_available(title),
    }
}

fn by_mape(a: &EvaluationResult, b: &EvaluationResult) -> Ordering {
    let am = a.mape.unwrap_or(f64::INFINITY);
    let bm = b.mape.unwrap_or(f64::INFINITY);
    am.total_cmp(&bm).then_with(|| by_rmse(a, b))
}

fn by_rmse(a: &EvaluationResult, b: &EvaluationResult) -> Ordering {
    a.rmse
        .total_cmp(&b.rmse)
        .then_with(|| a.model.priority().cmp(&b.model.priority()))
}

/// One winner per title, looked up case-insensitively.
///
/// Records are kept sorted by exact title. If two titles differ only by case,
/// lookups resolve to the first of them in that order.
#[derive(Debug, Clone, Default)]
pub struct WinnerTable {
    records: Vec<WinnerRecord>,
    index: HashMap<String, usize>,
}

impl WinnerTable {
    pub fn new(mut records: Vec<WinnerRecord>) -> Self {
        records.sort_by(|a, b| a.job_title.cmp(&b.job_title));
        records.dedup_by(|a, b| a.job_title == b.job_title);

        let mut index = HashMap::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            index.entry(title_key(&record.job_title)).or_insert(i);
        }
        Self { records, index }
    }

    /// Build a fresh table from per-title evaluations.
    pub fn from_evaluations<'a>(evaluations: impl IntoIterator<Item = &'a TitleEvaluation>) -> Self {
        Self::new(
            evaluations
                .into_iter()
                .map(|e| select_winner(&e.title, &e.results))
                .collect(),
        )
    }

    pub fn get(&self, title: &str) -> Option<&WinnerRecord> {
        self.index.get(&title_key(title)).map(|&i| &self.records[i])
    }

    /// Records sorted by title.
    pub fn records(&self) -> &[WinnerRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in persisted order: by model label, then MAPE (absent last),
    /// then title.
    pub fn persisted_order(&self) -> Vec<&WinnerRecord> {
        let mut out: Vec<&WinnerRecord> = self.records.iter().collect();
        out.sort_by(|a, b| {
            a.best_model
                .label()
                .cmp(&b.best_model.label())
                .then_with(|| match (a.best_mape, b.best_mape) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                })
                .then_with(|| a.job_title.cmp(&b.job_title))
        });
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ModelKind;

    fn result(model: ModelKind, rmse: f64, mape: Option<f64>) -> EvaluationResult {
        EvaluationResult { model, rmse, mape }
    }

    const POLY2: ModelKind = ModelKind::Polynomial { degree: 2 };

    #[test]
    fn lowest_mape_wins() {
        let results = [
            result(ModelKind::Linear, 1.0, Some(9.0)),
            result(POLY2, 50.0, Some(3.0)),
            result(ModelKind::Seasonal, 2.0, Some(4.0)),
        ];
        let w = select_winner("Analyst", &results);
        assert_eq!(w.best_model, WinnerModel::Model(POLY2));
        assert_eq!(w.best_mape, Some(3.0));
        assert_eq!(w.best_rmse, Some(50.0));
    }

    #[test]
    fn mape_tie_breaks_on_rmse() {
        let results = [
            result(ModelKind::Linear, 4.0, Some(5.0)),
            result(POLY2, 3.0, Some(5.0)),
        ];
        let w = select_winner("Analyst", &results);
        assert_eq!(w.best_model, WinnerModel::Model(POLY2));
    }

    #[test]
    fn exact_tie_prefers_simpler_model() {
        let results = [
            result(ModelKind::Seasonal, 3.0, Some(5.0)),
            result(POLY2, 3.0, Some(5.0)),
            result(ModelKind::Linear, 3.0, Some(5.0)),
        ];
        let w = select_winner("Analyst", &results);
        assert_eq!(w.best_model, WinnerModel::Model(ModelKind::Linear));

        let mut reversed = results;
        reversed.reverse();
        assert_eq!(select_winner("Analyst", &reversed), w);
    }

    #[test]
    fn falls_back_to_rmse_without_any_mape() {
        let results = [
            result(ModelKind::Linear, 7.0, None),
            result(ModelKind::Seasonal, 2.0, None),
        ];
        let w = select_winner("Analyst", &results);
        assert_eq!(w.best_model, WinnerModel::Model(ModelKind::Seasonal));
        assert_eq!(w.best_mape, None);
        assert_eq!(w.best_rmse, Some(2.0));
    }

    #[test]
    fn defined_mape_beats_lower_rmse_without_mape() {
        let results = [
            result(ModelKind::Linear, 0.5, None),
            result(POLY2, 9.0, Some(12.0)),
        ];
        assert_eq!(select_winner("Analyst", &results).best_model, WinnerModel::Model(POLY2));
    }

    #[test]
    fn nothing_scored_is_not_available() {
        let w = select_winner("Analyst", &[]);
        assert_eq!(w, WinnerRecord::not_available("Analyst"));
    }

    #[test]
    fn table_lookup_ignores_case() {
        let table = WinnerTable::new(vec![
            select_winner("Data Engineer", &[result(ModelKind::Linear, 1.0, Some(1.0))]),
            WinnerRecord::not_available("Clerk"),
        ]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records()[0].job_title, "Clerk");
        assert!(table.get("data engineer").is_some());
        assert!(table.get("Nurse").is_none());
    }

    #[test]
    fn persisted_order_puts_missing_mape_last() {
        let table = WinnerTable::new(vec![
            WinnerRecord {
                job_title: "B".into(),
                best_model: WinnerModel::Model(ModelKind::Linear),
                best_mape: None,
                best_rmse: Some(1.0),
            },
            WinnerRecord {
                job_title: "A".into(),
                best_model: WinnerModel::Model(ModelKind::Linear),
                best_mape: Some(8.0),
                best_rmse: Some(2.0),
            },
            WinnerRecord::not_available("C"),
        ]);
        let order: Vec<&str> = table
            .persisted_order()
            .into_iter()
            .map(|r| r.job_title.as_str())
            .collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }
}
