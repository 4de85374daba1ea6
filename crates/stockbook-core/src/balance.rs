//! Balance computation with checkpoint-plus-delta acceleration.
//!
//! A balance query replays the transaction log up to the target date. When
//! a blocking date is configured and a matching checkpoint exists, queries
//! past the blocking date start from the cached balances and fold only the
//! delta transactions. The two paths must agree for identical ledger
//! contents; every caching failure degrades silently to full replay.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;
use stockbook_utils::{format_datetime, round2};

use super::checkpoint::{BalanceCheckpoint, CheckpointEntry, CheckpointStore};
use super::filter::{FilterEngine, FilterOp, FilterPredicate};
use super::ledger::Ledger;
use super::models::Nomenclature;

/// A computed balance for one nomenclature
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BalancePosition {
    pub nomenclature: Nomenclature,
    pub balance: f64,
}

/// One row of the balance report
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BalanceReportRow {
    pub nomenclature_id: String,
    pub nomenclature_name: String,
    pub unit_name: String,
    pub balance: f64,
    pub calculation_date: NaiveDateTime,
}

/// Balance engine owning the checkpoint slot
#[derive(Debug, Clone)]
pub struct BalanceEngine {
    store: CheckpointStore,
}

impl BalanceEngine {
    pub fn new(store: CheckpointStore) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Compute per-nomenclature balances as of `target_date`.
    ///
    /// The checkpoint fast path applies only to storage-agnostic queries:
    /// the cached snapshot is global, so a storage-scoped query served from
    /// it would disagree with full replay. Storage-scoped queries always
    /// replay.
    pub fn calculate_balances(
        &self,
        ledger: &Ledger,
        blocking_date: Option<NaiveDateTime>,
        target_date: NaiveDateTime,
        storage_id: Option<&str>,
    ) -> BTreeMap<String, BalancePosition> {
        if storage_id.is_none() {
            if let Some(blocking) = blocking_date {
                if blocking < target_date {
                    if let Some(checkpoint) = self.store.load(blocking) {
                        log::debug!(
                            "Balance query at {} served from checkpoint {}",
                            target_date,
                            blocking
                        );
                        return self.apply_delta(ledger, checkpoint, blocking, target_date);
                    }
                }
            }
        }
        self.full_replay(ledger, target_date, storage_id)
    }

    /// Rebuild the checkpoint slot from a storage-agnostic full replay at
    /// `blocking_date`. Returns `false` on any persistence failure, leaving
    /// the prior slot intact; never errors.
    pub fn recompute_checkpoint(&self, ledger: &Ledger, blocking_date: NaiveDateTime) -> bool {
        let balances = self.full_replay(ledger, blocking_date, None);
        let mut checkpoint = BalanceCheckpoint::new(blocking_date);
        for (id, position) in balances {
            checkpoint.balances.insert(
                id.clone(),
                CheckpointEntry {
                    nomenclature_id: id,
                    balance: position.balance,
                    calculation_date: blocking_date,
                },
            );
        }
        match self.store.save(&checkpoint) {
            Ok(()) => {
                log::info!(
                    "Recomputed checkpoint at {} ({} positions)",
                    blocking_date,
                    checkpoint.balances.len()
                );
                true
            }
            Err(e) => {
                log::error!("Failed to persist checkpoint at {}: {}", blocking_date, e);
                false
            }
        }
    }

    /// Balance report: one row per nomenclature with nonzero balance,
    /// quantities rounded to 2 decimals, ordered by nomenclature name.
    pub fn balance_report(
        &self,
        ledger: &Ledger,
        blocking_date: Option<NaiveDateTime>,
        target_date: NaiveDateTime,
        storage_id: Option<&str>,
    ) -> Vec<BalanceReportRow> {
        let balances = self.calculate_balances(ledger, blocking_date, target_date, storage_id);
        let mut rows: Vec<BalanceReportRow> = balances
            .into_values()
            .filter(|position| position.balance != 0.0)
            .map(|position| BalanceReportRow {
                nomenclature_id: position.nomenclature.id.clone(),
                nomenclature_name: position.nomenclature.name.clone(),
                unit_name: base_unit_name(&position.nomenclature),
                balance: round2(position.balance),
                calculation_date: target_date,
            })
            .collect();
        rows.sort_by(|a, b| a.nomenclature_name.cmp(&b.nomenclature_name));
        rows
    }

    // ==================== Replay paths ====================

    fn full_replay(
        &self,
        ledger: &Ledger,
        target_date: NaiveDateTime,
        storage_id: Option<&str>,
    ) -> BTreeMap<String, BalancePosition> {
        let predicates = date_window(None, Some(target_date), storage_id);
        let selected = FilterEngine::filter(ledger.transactions(), &predicates);
        let mut balances = BTreeMap::new();
        fold_transactions(&mut balances, selected);
        balances
    }

    /// Fold every transaction strictly after the checkpoint date into the
    /// cached balances. The checkpoint owns `date <= blocking`, the delta
    /// owns `date > blocking`, so a transaction dated exactly at the
    /// blocking date is counted once.
    fn apply_delta(
        &self,
        ledger: &Ledger,
        checkpoint: BalanceCheckpoint,
        blocking_date: NaiveDateTime,
        target_date: NaiveDateTime,
    ) -> BTreeMap<String, BalancePosition> {
        let mut balances = BTreeMap::new();
        for (id, entry) in checkpoint.balances {
            if let Some(nomenclature) = resolve_nomenclature(ledger, &id) {
                balances.insert(
                    id,
                    BalancePosition {
                        nomenclature,
                        balance: entry.balance,
                    },
                );
            } else {
                log::warn!("Checkpoint references unknown nomenclature {}", id);
            }
        }

        let predicates = date_window(Some(blocking_date), Some(target_date), None);
        let delta = FilterEngine::filter(ledger.transactions(), &predicates);
        fold_transactions(&mut balances, delta);
        balances
    }
}

fn date_window(
    after: Option<NaiveDateTime>,
    up_to: Option<NaiveDateTime>,
    storage_id: Option<&str>,
) -> Vec<FilterPredicate> {
    let mut predicates = Vec::new();
    if let Some(after) = after {
        predicates.push(FilterPredicate::new(
            "date",
            FilterOp::Greater,
            format_datetime(&after),
        ));
    }
    if let Some(up_to) = up_to {
        predicates.push(FilterPredicate::new(
            "date",
            FilterOp::LessEqual,
            format_datetime(&up_to),
        ));
    }
    if let Some(storage_id) = storage_id {
        predicates.push(FilterPredicate::new("storage/id", FilterOp::Equals, storage_id));
    }
    predicates
}

fn fold_transactions<'a>(
    balances: &mut BTreeMap<String, BalancePosition>,
    transactions: impl IntoIterator<Item = &'a crate::models::StockTransaction>,
) {
    for tx in transactions {
        let position = balances
            .entry(tx.nomenclature.id.clone())
            .or_insert_with(|| BalancePosition {
                nomenclature: tx.nomenclature.clone(),
                balance: 0.0,
            });
        position.balance += tx.signed_base_quantity();
    }
}

/// Resolve a nomenclature by id, falling back to the snapshot carried by
/// any historical transaction when the reference was deleted.
fn resolve_nomenclature(ledger: &Ledger, id: &str) -> Option<Nomenclature> {
    if let Some(found) = ledger.nomenclature(id) {
        return Some(found.clone());
    }
    ledger
        .transactions()
        .iter()
        .find(|tx| tx.nomenclature.id == id)
        .map(|tx| tx.nomenclature.clone())
}

/// Name of the unit balances are expressed in: the base unit when the
/// nomenclature's default unit is derived.
fn base_unit_name(nomenclature: &Nomenclature) -> String {
    match &nomenclature.unit.base_unit {
        Some(base) => base.name.clone(),
        None => nomenclature.unit.name.clone(),
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::TransactionPayload;
    use crate::types::TransactionType;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn engine() -> (tempfile::TempDir, BalanceEngine) {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("balances_cache.json"));
        (dir, BalanceEngine::new(store))
    }

    fn add_tx(
        ledger: &mut Ledger,
        name: &str,
        at: NaiveDateTime,
        quantity: f64,
        tx_type: TransactionType,
    ) {
        let nomenclature_id = ledger.nomenclature_by_name(name).unwrap().id.clone();
        let storage_id = ledger.storage_by_name("main storage").unwrap().id.clone();
        ledger
            .add_transaction(TransactionPayload {
                date: at,
                nomenclature_id,
                storage_id,
                quantity,
                unit_id: None,
                transaction_type: tx_type,
            })
            .unwrap();
    }

    #[test]
    fn test_full_replay_balance() {
        let (_dir, engine) = engine();
        let mut ledger = Ledger::seeded();
        add_tx(&mut ledger, "wheat flour", date(2024, 1, 1), 100.0, TransactionType::In);
        add_tx(&mut ledger, "wheat flour", date(2024, 2, 1), 40.0, TransactionType::Out);

        let balances = engine.calculate_balances(&ledger, None, date(2024, 3, 1), None);
        let flour_id = ledger.nomenclature_by_name("wheat flour").unwrap().id.clone();
        assert_eq!(balances[&flour_id].balance, 60.0);
    }

    #[test]
    fn test_checkpoint_path_matches_full_replay() {
        let (_dir, engine) = engine();
        let mut ledger = Ledger::seeded();
        add_tx(&mut ledger, "wheat flour", date(2024, 1, 1), 100.0, TransactionType::In);
        add_tx(&mut ledger, "wheat flour", date(2024, 2, 1), 40.0, TransactionType::Out);

        let target = date(2024, 3, 1);
        let without_checkpoint = engine.calculate_balances(&ledger, None, target, None);

        let blocking = date(2024, 1, 15);
        assert!(engine.recompute_checkpoint(&ledger, blocking));
        let with_checkpoint = engine.calculate_balances(&ledger, Some(blocking), target, None);

        assert_eq!(without_checkpoint, with_checkpoint);
        let flour_id = ledger.nomenclature_by_name("wheat flour").unwrap().id.clone();
        assert_eq!(with_checkpoint[&flour_id].balance, 60.0);
    }

    #[test]
    fn test_blocking_date_boundary_counted_once() {
        let (_dir, engine) = engine();
        let mut ledger = Ledger::seeded();
        let blocking = date(2024, 1, 15);
        // dated exactly at the blocking date
        add_tx(&mut ledger, "sugar", blocking, 50.0, TransactionType::In);

        assert!(engine.recompute_checkpoint(&ledger, blocking));
        let balances = engine.calculate_balances(&ledger, Some(blocking), date(2024, 2, 1), None);
        let sugar_id = ledger.nomenclature_by_name("sugar").unwrap().id.clone();
        assert_eq!(balances[&sugar_id].balance, 50.0);
    }

    #[test]
    fn test_storage_scoped_query_ignores_checkpoint() {
        let (_dir, engine) = engine();
        let mut ledger = Ledger::seeded();
        add_tx(&mut ledger, "butter", date(2024, 1, 1), 30.0, TransactionType::In);

        let (second, _) = ledger
            .create(
                crate::types::ReferenceKind::Storages,
                serde_json::json!({"name": "warehouse 2"}),
            )
            .unwrap();
        let second_id = second["id"].as_str().unwrap().to_string();

        let blocking = date(2024, 1, 15);
        assert!(engine.recompute_checkpoint(&ledger, blocking));

        // the global checkpoint holds 30 butter; the second storage saw nothing
        let scoped = engine.calculate_balances(
            &ledger,
            Some(blocking),
            date(2024, 2, 1),
            Some(&second_id),
        );
        assert!(scoped.is_empty());
    }

    #[test]
    fn test_new_nomenclature_appears_via_delta() {
        let (_dir, engine) = engine();
        let mut ledger = Ledger::seeded();
        let blocking = date(2024, 1, 15);
        assert!(engine.recompute_checkpoint(&ledger, blocking));

        // movement after the checkpoint, for an item absent from it
        add_tx(&mut ledger, "salt", date(2024, 1, 20), 5.0, TransactionType::In);
        let balances = engine.calculate_balances(&ledger, Some(blocking), date(2024, 2, 1), None);
        let salt_id = ledger.nomenclature_by_name("salt").unwrap().id.clone();
        assert_eq!(balances[&salt_id].balance, 5.0);
    }

    #[test]
    fn test_recompute_is_idempotent() {
        let (_dir, engine) = engine();
        let mut ledger = Ledger::seeded();
        add_tx(&mut ledger, "oatmeal", date(2024, 1, 5), 200.0, TransactionType::In);
        let blocking = date(2024, 1, 15);

        assert!(engine.recompute_checkpoint(&ledger, blocking));
        let first = std::fs::read_to_string(engine.store().path()).unwrap();
        assert!(engine.recompute_checkpoint(&ledger, blocking));
        let second = std::fs::read_to_string(engine.store().path()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_balance_report_skips_zero_and_converts_units() {
        let (_dir, engine) = engine();
        let mut ledger = Ledger::seeded();
        let kg_id = {
            let units = ledger.list(crate::types::ReferenceKind::Units);
            units.iter().find(|u| u["name"] == "kg").unwrap()["id"]
                .as_str()
                .unwrap()
                .to_string()
        };
        let flour_id = ledger.nomenclature_by_name("wheat flour").unwrap().id.clone();
        let storage_id = ledger.storage_by_name("main storage").unwrap().id.clone();
        ledger
            .add_transaction(TransactionPayload {
                date: date(2024, 1, 1),
                nomenclature_id: flour_id.clone(),
                storage_id,
                quantity: 2.0,
                unit_id: Some(kg_id),
                transaction_type: TransactionType::In,
            })
            .unwrap();
        // sugar nets out to zero
        add_tx(&mut ledger, "sugar", date(2024, 1, 2), 10.0, TransactionType::In);
        add_tx(&mut ledger, "sugar", date(2024, 1, 3), 10.0, TransactionType::Out);

        let rows = engine.balance_report(&ledger, None, date(2024, 2, 1), None);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].nomenclature_id, flour_id);
        assert_eq!(rows[0].balance, 2000.0);
        assert_eq!(rows[0].unit_name, "gram");
    }
}
