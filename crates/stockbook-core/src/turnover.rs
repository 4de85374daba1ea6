//! Per-nomenclature turnover aggregation over a date range.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use stockbook_utils::{format_datetime, round2};

use super::error::{CoreError, CoreResult};
use super::filter::{FilterEngine, FilterOp, FilterPredicate};
use super::ledger::Ledger;
use super::models::{Nomenclature, StockTransaction};
use super::types::TransactionType;

/// One row of the turnover report
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TurnoverRow {
    pub nomenclature_id: String,
    pub nomenclature_name: String,
    pub unit_name: String,
    pub opening_balance: f64,
    pub income: f64,
    pub outcome: f64,
    pub closing_balance: f64,
    pub transaction_count: usize,
}

/// Turnover report engine.
///
/// Only nomenclatures with at least one movement inside the filtered window
/// appear in the report; a nonzero balance alone does not earn a row. The
/// storage scope applies to opening balances and period transactions alike.
pub struct TurnoverReportEngine;

impl TurnoverReportEngine {
    /// Generate the report for `[start, end]`, optionally scoped to a
    /// storage and narrowed by caller-supplied predicates. Rows are ordered
    /// by nomenclature name.
    pub fn generate(
        ledger: &Ledger,
        start: NaiveDateTime,
        end: NaiveDateTime,
        storage_id: Option<&str>,
        extra_filters: &[FilterPredicate],
    ) -> CoreResult<Vec<TurnoverRow>> {
        if start > end {
            return Err(CoreError::validation(format!(
                "Start date {} is after end date {}",
                start, end
            )));
        }

        let mut predicates = vec![
            FilterPredicate::new("date", FilterOp::GreaterEqual, format_datetime(&start)),
            FilterPredicate::new("date", FilterOp::LessEqual, format_datetime(&end)),
        ];
        if let Some(storage_id) = storage_id {
            predicates.push(FilterPredicate::new("storage/id", FilterOp::Equals, storage_id));
        }
        predicates.extend_from_slice(extra_filters);

        let period = FilterEngine::filter(ledger.transactions(), &predicates);
        log::debug!(
            "Turnover window {}..{} selected {} transactions",
            start,
            end,
            period.len()
        );

        let mut groups: BTreeMap<String, Vec<&StockTransaction>> = BTreeMap::new();
        for tx in period {
            groups.entry(tx.nomenclature.id.clone()).or_default().push(tx);
        }

        let mut rows = Vec::with_capacity(groups.len());
        for (nomenclature_id, transactions) in groups {
            let nomenclature = &transactions[0].nomenclature;
            let opening = Self::opening_balance(ledger, &nomenclature_id, start, storage_id);

            let mut income = 0.0;
            let mut outcome = 0.0;
            for tx in &transactions {
                match tx.transaction_type {
                    TransactionType::In => income += tx.quantity_in_base_units(),
                    TransactionType::Out => outcome += tx.quantity_in_base_units(),
                }
            }

            rows.push(TurnoverRow {
                nomenclature_id,
                nomenclature_name: nomenclature.name.clone(),
                unit_name: base_unit_name(nomenclature),
                opening_balance: round2(opening),
                income: round2(income),
                outcome: round2(outcome),
                closing_balance: round2(opening + income - outcome),
                transaction_count: transactions.len(),
            });
        }
        rows.sort_by(|a, b| a.nomenclature_name.cmp(&b.nomenclature_name));
        Ok(rows)
    }

    /// Balance of one nomenclature strictly before `start`, within the same
    /// storage scope as the period selection.
    fn opening_balance(
        ledger: &Ledger,
        nomenclature_id: &str,
        start: NaiveDateTime,
        storage_id: Option<&str>,
    ) -> f64 {
        let mut predicates = vec![
            FilterPredicate::new("date", FilterOp::Less, format_datetime(&start)),
            FilterPredicate::new("nomenclature/id", FilterOp::Equals, nomenclature_id),
        ];
        if let Some(storage_id) = storage_id {
            predicates.push(FilterPredicate::new("storage/id", FilterOp::Equals, storage_id));
        }
        FilterEngine::filter(ledger.transactions(), &predicates)
            .into_iter()
            .map(|tx| tx.signed_base_quantity())
            .sum()
    }
}

fn base_unit_name(nomenclature: &Nomenclature) -> String {
    match &nomenclature.unit.base_unit {
        Some(base) => base.name.clone(),
        None => nomenclature.unit.name.clone(),
    }
}

// ==================== Tests ====================
