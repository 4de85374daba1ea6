//! In-memory data context: reference collections plus the transaction log.
//!
//! The ledger is an owned value constructed once at startup and passed by
//! reference; there is no global state. Reference mutations return a typed
//! [`LedgerEvent`] the caller dispatches synchronously.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::{CoreError, CoreResult};
use super::filter::{FilterEngine, FilterPredicate};
use super::models::{Nomenclature, NomenclatureGroup, StockTransaction, Storage, UnitOfMeasure};
use super::types::{ReferenceKind, TransactionType};

const MAX_NAME_LEN: usize = 50;
const MAX_FULL_NAME_LEN: usize = 255;

// ==================== Events ====================

/// Typed notification emitted by ledger mutations.
///
/// Dispatched synchronously by the caller; the API layer reacts to
/// `UnitChanged` by recomputing the balance checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    ReferenceAdded { kind: ReferenceKind, id: String },
    ReferenceChanged { kind: ReferenceKind, id: String },
    ReferenceDeleted { kind: ReferenceKind, id: String },
    /// A unit of measure was modified; derived caches must be rebuilt
    UnitChanged { id: String },
    TransactionAdded { id: String },
}

// ==================== Write payloads ====================

/// Request body for creating or updating a unit of measure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitPayload {
    pub name: String,
    #[serde(default = "default_coefficient")]
    pub coefficient: i64,
    #[serde(default)]
    pub base_unit_id: Option<String>,
}

fn default_coefficient() -> i64 {
    1
}

/// Request body for creating or updating a nomenclature group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupPayload {
    pub name: String,
}

/// Request body for creating or updating a nomenclature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NomenclaturePayload {
    pub name: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub group_id: String,
    pub unit_id: String,
}

/// Request body for creating or updating a storage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoragePayload {
    pub name: String,
}

/// Request body for appending a stock movement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionPayload {
    pub date: NaiveDateTime,
    pub nomenclature_id: String,
    pub storage_id: String,
    pub quantity: f64,
    /// Defaults to the nomenclature's own unit when omitted
    #[serde(default)]
    pub unit_id: Option<String>,
    pub transaction_type: TransactionType,
}

// ==================== Ledger ====================

/// Owned data context holding all reference collections and the
/// append-only transaction log.
#[derive(Debug, Default)]
pub struct Ledger {
    units: HashMap<String, UnitOfMeasure>,
    groups: HashMap<String, NomenclatureGroup>,
    nomenclatures: HashMap<String, Nomenclature>,
    storages: HashMap<String, Storage>,
    transactions: Vec<StockTransaction>,
}

impl Ledger {
    /// An empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger seeded with the reference baking data set: gram and
    /// kilogram units, the "ingredients" group, eight nomenclatures and a
    /// main storage.
    pub fn seeded() -> Self {
        let mut ledger = Self::new();

        let gram = UnitOfMeasure::gram();
        let kg = UnitOfMeasure::kilogram(gram.clone());
        ledger.units.insert(gram.id.clone(), gram.clone());
        ledger.units.insert(kg.id.clone(), kg);

        let ingredients = NomenclatureGroup::new("ingredients");
        ledger
            .groups
            .insert(ingredients.id.clone(), ingredients.clone());

        let items = [
            ("wheat flour", "wheat flour"),
            ("oatmeal", "oatmeal"),
            ("sugar", "granulated sugar"),
            ("butter", "butter"),
            ("chicken egg", "chicken egg"),
            ("dark chocolate", "dark chocolate"),
            ("baking powder", "baking powder"),
            ("salt", "salt"),
        ];
        for (name, full_name) in items {
            let item = Nomenclature::new(name, full_name, ingredients.clone(), gram.clone());
            ledger.nomenclatures.insert(item.id.clone(), item);
        }

        let main = Storage::new("main storage");
        ledger.storages.insert(main.id.clone(), main);

        ledger
    }

    // ==================== Typed accessors ====================

    pub fn transactions(&self) -> &[StockTransaction] {
        &self.transactions
    }

    pub fn unit(&self, id: &str) -> Option<&UnitOfMeasure> {
        self.units.get(id)
    }

    pub fn group(&self, id: &str) -> Option<&NomenclatureGroup> {
        self.groups.get(id)
    }

    pub fn nomenclature(&self, id: &str) -> Option<&Nomenclature> {
        self.nomenclatures.get(id)
    }

    pub fn storage(&self, id: &str) -> Option<&Storage> {
        self.storages.get(id)
    }

    pub fn nomenclatures(&self) -> impl Iterator<Item = &Nomenclature> {
        self.nomenclatures.values()
    }

    /// Find a storage by exact name; used by demo seeding and tests
    pub fn storage_by_name(&self, name: &str) -> Option<&Storage> {
        self.storages.values().find(|s| s.name == name)
    }

    pub fn nomenclature_by_name(&self, name: &str) -> Option<&Nomenclature> {
        self.nomenclatures.values().find(|n| n.name == name)
    }

    // ==================== Transactions ====================

    /// Append a movement to the ledger. The referenced entities are cloned
    /// into the transaction; later reference edits never rewrite history.
    pub fn add_transaction(&mut self, payload: TransactionPayload) -> CoreResult<LedgerEvent> {
        if !payload.quantity.is_finite() || payload.quantity <= 0.0 {
            return Err(CoreError::validation(format!(
                "Transaction quantity must be positive, got {}",
                payload.quantity
            )));
        }
        let nomenclature = self
            .nomenclatures
            .get(&payload.nomenclature_id)
            .ok_or_else(|| CoreError::ReferenceNotFound {
                kind: ReferenceKind::Nomenclatures.to_string(),
                id: payload.nomenclature_id.clone(),
            })?
            .clone();
        let storage = self
            .storages
            .get(&payload.storage_id)
            .ok_or_else(|| CoreError::ReferenceNotFound {
                kind: ReferenceKind::Storages.to_string(),
                id: payload.storage_id.clone(),
            })?
            .clone();
        let unit = match &payload.unit_id {
            Some(unit_id) => self
                .units
                .get(unit_id)
                .ok_or_else(|| CoreError::ReferenceNotFound {
                    kind: ReferenceKind::Units.to_string(),
                    id: unit_id.clone(),
                })?
                .clone(),
            None => nomenclature.unit.clone(),
        };

        let tx = StockTransaction::new(
            payload.date,
            nomenclature,
            storage,
            payload.quantity,
            unit,
            payload.transaction_type,
        );
        let id = tx.id.clone();
        log::debug!(
            "Appended {} transaction {} for {} x {}",
            tx.transaction_type,
            id,
            tx.nomenclature.name,
            tx.quantity
        );
        self.transactions.push(tx);
        Ok(LedgerEvent::TransactionAdded { id })
    }

    /// A transaction by id
    pub fn transaction(&self, id: &str) -> Option<&StockTransaction> {
        self.transactions.iter().find(|t| t.id == id)
    }

    // ==================== Generic reference CRUD ====================

    /// All records of a reference collection as JSON values
    pub fn list(&self, kind: ReferenceKind) -> Vec<serde_json::Value> {
        match kind {
            ReferenceKind::Units => to_values(self.units.values()),
            ReferenceKind::Groups => to_values(self.groups.values()),
            ReferenceKind::Nomenclatures => to_values(self.nomenclatures.values()),
            ReferenceKind::Storages => to_values(self.storages.values()),
        }
    }

    /// A single record by id
    pub fn get(&self, kind: ReferenceKind, id: &str) -> CoreResult<serde_json::Value> {
        let found = match kind {
            ReferenceKind::Units => self.units.get(id).map(to_value),
            ReferenceKind::Groups => self.groups.get(id).map(to_value),
            ReferenceKind::Nomenclatures => self.nomenclatures.get(id).map(to_value),
            ReferenceKind::Storages => self.storages.get(id).map(to_value),
        };
        found.ok_or_else(|| CoreError::ReferenceNotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        })
    }

    /// Filter a reference collection by predicates
    pub fn filter(&self, kind: ReferenceKind, predicates: &[FilterPredicate]) -> Vec<serde_json::Value> {
        let records = self.list(kind);
        FilterEngine::filter(&records, predicates)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Create a reference record from a JSON payload
    pub fn create(
        &mut self,
        kind: ReferenceKind,
        payload: serde_json::Value,
    ) -> CoreResult<(serde_json::Value, LedgerEvent)> {
        match kind {
            ReferenceKind::Units => {
                let unit = self.build_unit(parse_payload(payload)?)?;
                let value = to_value(&unit);
                let id = unit.id.clone();
                self.units.insert(id.clone(), unit);
                Ok((value, LedgerEvent::ReferenceAdded { kind, id }))
            }
            ReferenceKind::Groups => {
                let body: GroupPayload = parse_payload(payload)?;
                let name = validate_name(&body.name)?;
                let group = NomenclatureGroup::new(&name);
                let value = to_value(&group);
                let id = group.id.clone();
                self.groups.insert(id.clone(), group);
                Ok((value, LedgerEvent::ReferenceAdded { kind, id }))
            }
            ReferenceKind::Nomenclatures => {
                let item = self.build_nomenclature(parse_payload(payload)?)?;
                let value = to_value(&item);
                let id = item.id.clone();
                self.nomenclatures.insert(id.clone(), item);
                Ok((value, LedgerEvent::ReferenceAdded { kind, id }))
            }
            ReferenceKind::Storages => {
                let body: StoragePayload = parse_payload(payload)?;
                let name = validate_name(&body.name)?;
                let storage = Storage::new(&name);
                let value = to_value(&storage);
                let id = storage.id.clone();
                self.storages.insert(id.clone(), storage);
                Ok((value, LedgerEvent::ReferenceAdded { kind, id }))
            }
        }
    }

    /// Update a reference record in place, keeping its id
    pub fn update(
        &mut self,
        kind: ReferenceKind,
        id: &str,
        payload: serde_json::Value,
    ) -> CoreResult<(serde_json::Value, LedgerEvent)> {
        let not_found = || CoreError::ReferenceNotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        };
        match kind {
            ReferenceKind::Units => {
                if !self.units.contains_key(id) {
                    return Err(not_found());
                }
                let mut unit = self.build_unit(parse_payload(payload)?)?;
                unit.id = id.to_string();
                let value = to_value(&unit);
                self.units.insert(id.to_string(), unit);
                Ok((value, LedgerEvent::UnitChanged { id: id.to_string() }))
            }
            ReferenceKind::Groups => {
                let body: GroupPayload = parse_payload(payload)?;
                let name = validate_name(&body.name)?;
                let group = self.groups.get_mut(id).ok_or_else(not_found)?;
                group.name = name;
                let value = to_value(group);
                Ok((
                    value,
                    LedgerEvent::ReferenceChanged {
                        kind,
                        id: id.to_string(),
                    },
                ))
            }
            ReferenceKind::Nomenclatures => {
                if !self.nomenclatures.contains_key(id) {
                    return Err(not_found());
                }
                let mut item = self.build_nomenclature(parse_payload(payload)?)?;
                item.id = id.to_string();
                let value = to_value(&item);
                self.nomenclatures.insert(id.to_string(), item);
                Ok((
                    value,
                    LedgerEvent::ReferenceChanged {
                        kind,
                        id: id.to_string(),
                    },
                ))
            }
            ReferenceKind::Storages => {
                let body: StoragePayload = parse_payload(payload)?;
                let name = validate_name(&body.name)?;
                let storage = self.storages.get_mut(id).ok_or_else(not_found)?;
                storage.name = name;
                let value = to_value(storage);
                Ok((
                    value,
                    LedgerEvent::ReferenceChanged {
                        kind,
                        id: id.to_string(),
                    },
                ))
            }
        }
    }

    /// Delete a reference record. Past transactions keep their snapshots.
    pub fn delete(&mut self, kind: ReferenceKind, id: &str) -> CoreResult<LedgerEvent> {
        let removed = match kind {
            ReferenceKind::Units => self.units.remove(id).is_some(),
            ReferenceKind::Groups => self.groups.remove(id).is_some(),
            ReferenceKind::Nomenclatures => self.nomenclatures.remove(id).is_some(),
            ReferenceKind::Storages => self.storages.remove(id).is_some(),
        };
        if !removed {
            return Err(CoreError::ReferenceNotFound {
                kind: kind.to_string(),
                id: id.to_string(),
            });
        }
        Ok(LedgerEvent::ReferenceDeleted {
            kind,
            id: id.to_string(),
        })
    }

    // ==================== Payload assembly ====================

    fn build_unit(&self, body: UnitPayload) -> CoreResult<UnitOfMeasure> {
        let name = validate_name(&body.name)?;
        if body.coefficient <= 0 {
            return Err(CoreError::validation(format!(
                "Unit coefficient must be positive, got {}",
                body.coefficient
            )));
        }
        let base_unit = match &body.base_unit_id {
            Some(base_id) => Some(
                self.units
                    .get(base_id)
                    .ok_or_else(|| CoreError::ReferenceNotFound {
                        kind: ReferenceKind::Units.to_string(),
                        id: base_id.clone(),
                    })?
                    .clone(),
            ),
            None => None,
        };
        Ok(UnitOfMeasure::new(&name, body.coefficient, base_unit))
    }

    fn build_nomenclature(&self, body: NomenclaturePayload) -> CoreResult<Nomenclature> {
        let name = validate_name(&body.name)?;
        let full_name = body.full_name.unwrap_or_else(|| name.clone());
        if full_name.trim().len() > MAX_FULL_NAME_LEN {
            return Err(CoreError::validation(format!(
                "Full name exceeds {} characters",
                MAX_FULL_NAME_LEN
            )));
        }
        let group = self
            .groups
            .get(&body.group_id)
            .ok_or_else(|| CoreError::ReferenceNotFound {
                kind: ReferenceKind::Groups.to_string(),
                id: body.group_id.clone(),
            })?
            .clone();
        let unit = self
            .units
            .get(&body.unit_id)
            .ok_or_else(|| CoreError::ReferenceNotFound {
                kind: ReferenceKind::Units.to_string(),
                id: body.unit_id.clone(),
            })?
            .clone();
        Ok(Nomenclature::new(&name, &full_name, group, unit))
    }
}

fn validate_name(name: &str) -> CoreResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::validation("Name must not be empty"));
    }
    if trimmed.len() > MAX_NAME_LEN {
        return Err(CoreError::validation(format!(
            "Name exceeds {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

fn parse_payload<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> CoreResult<T> {
    serde_json::from_value(value)
        .map_err(|e| CoreError::InvalidFormat {
            message: e.to_string(),
        })
}

fn to_value<T: Serialize>(record: &T) -> serde_json::Value {
    serde_json::to_value(record).unwrap_or(serde_json::Value::Null)
}

fn to_values<'a, T: Serialize + 'a>(records: impl Iterator<Item = &'a T>) -> Vec<serde_json::Value> {
    records.map(to_value).collect()
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterOp;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_seeded_reference_data() {
        let ledger = Ledger::seeded();
        assert_eq!(ledger.list(ReferenceKind::Units).len(), 2);
        assert_eq!(ledger.list(ReferenceKind::Groups).len(), 1);
        assert_eq!(ledger.list(ReferenceKind::Nomenclatures).len(), 8);
        assert_eq!(ledger.list(ReferenceKind::Storages).len(), 1);
        assert!(ledger.nomenclature_by_name("wheat flour").is_some());
        assert!(ledger.storage_by_name("main storage").is_some());
    }

    #[test]
    fn test_add_transaction_snapshots_references() {
        let mut ledger = Ledger::seeded();
        let flour_id = ledger.nomenclature_by_name("wheat flour").unwrap().id.clone();
        let storage_id = ledger.storage_by_name("main storage").unwrap().id.clone();

        let event = ledger
            .add_transaction(TransactionPayload {
                date: date(2024, 1, 1),
                nomenclature_id: flour_id.clone(),
                storage_id,
                quantity: 100.0,
                unit_id: None,
                transaction_type: TransactionType::In,
            })
            .unwrap();
        assert!(matches!(event, LedgerEvent::TransactionAdded { .. }));

        // mutating the reference afterwards must not rewrite history
        let renamed = serde_json::json!({
            "name": "rye flour",
            "full_name": "rye flour",
            "group_id": ledger.transactions()[0].nomenclature.group.id,
            "unit_id": ledger.transactions()[0].unit.id,
        });
        ledger
            .update(ReferenceKind::Nomenclatures, &flour_id, renamed)
            .unwrap();
        assert_eq!(ledger.transactions()[0].nomenclature.name, "wheat flour");
    }

    #[test]
    fn test_add_transaction_rejects_bad_quantity() {
        let mut ledger = Ledger::seeded();
        let flour_id = ledger.nomenclature_by_name("salt").unwrap().id.clone();
        let storage_id = ledger.storage_by_name("main storage").unwrap().id.clone();
        let result = ledger.add_transaction(TransactionPayload {
            date: date(2024, 1, 1),
            nomenclature_id: flour_id,
            storage_id,
            quantity: -5.0,
            unit_id: None,
            transaction_type: TransactionType::In,
        });
        assert!(matches!(result, Err(CoreError::ValidationError { .. })));
    }

    #[test]
    fn test_unit_update_emits_unit_changed() {
        let mut ledger = Ledger::seeded();
        let unit_id = {
            let units = ledger.list(ReferenceKind::Units);
            units
                .iter()
                .find(|u| u["name"] == "kg")
                .unwrap()["id"]
                .as_str()
                .unwrap()
                .to_string()
        };
        let (_, event) = ledger
            .update(
                ReferenceKind::Units,
                &unit_id,
                serde_json::json!({"name": "kilogram", "coefficient": 1000}),
            )
            .unwrap();
        assert_eq!(event, LedgerEvent::UnitChanged { id: unit_id });
    }

    #[test]
    fn test_crud_round_trip() {
        let mut ledger = Ledger::new();
        let (created, _) = ledger
            .create(ReferenceKind::Storages, serde_json::json!({"name": "warehouse 2"}))
            .unwrap();
        let id = created["id"].as_str().unwrap().to_string();

        let fetched = ledger.get(ReferenceKind::Storages, &id).unwrap();
        assert_eq!(fetched["name"], "warehouse 2");

        ledger.delete(ReferenceKind::Storages, &id).unwrap();
        assert!(matches!(
            ledger.get(ReferenceKind::Storages, &id),
            Err(CoreError::ReferenceNotFound { .. })
        ));
    }

    #[test]
    fn test_create_rejects_empty_name() {
        let mut ledger = Ledger::new();
        let result = ledger.create(ReferenceKind::Groups, serde_json::json!({"name": "   "}));
        assert!(matches!(result, Err(CoreError::ValidationError { .. })));
    }

    #[test]
    fn test_filter_references() {
        let ledger = Ledger::seeded();
        let matches = ledger.filter(
            ReferenceKind::Nomenclatures,
            &[FilterPredicate::new("name", FilterOp::Like, "flour")],
        );
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0]["name"], "wheat flour");
    }
}
