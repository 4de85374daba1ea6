//! Core data models for the stock-movement ledger

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use stockbook_utils::generate_id;

use super::types::TransactionType;

/// Unit of measure with an at-most-one-level conversion chain.
///
/// A unit either is a base unit (`base_unit` is `None`, coefficient
/// irrelevant) or references its base unit with a multiplicative
/// coefficient. Deeper chains are not evaluated; callers must flatten them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitOfMeasure {
    /// Unique identifier
    pub id: String,
    /// Unit name (e.g., "gram")
    pub name: String,
    /// Multiplier into the base unit
    pub coefficient: i64,
    /// Base unit, if this unit is derived
    pub base_unit: Option<Box<UnitOfMeasure>>,
}

impl UnitOfMeasure {
    /// Create a unit of measure
    pub fn new(name: &str, coefficient: i64, base_unit: Option<UnitOfMeasure>) -> Self {
        Self {
            id: generate_id(),
            name: name.trim().to_string(),
            coefficient,
            base_unit: base_unit.map(Box::new),
        }
    }

    /// The reference base unit: gram
    pub fn gram() -> Self {
        Self::new("gram", 1, None)
    }

    /// Kilogram, derived from the given gram unit
    pub fn kilogram(gram: UnitOfMeasure) -> Self {
        Self::new("kg", 1000, Some(gram))
    }
}

/// Nomenclature group (e.g., "ingredients")
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NomenclatureGroup {
    /// Unique identifier
    pub id: String,
    /// Group name
    pub name: String,
}

impl NomenclatureGroup {
    /// Create a group
    pub fn new(name: &str) -> Self {
        Self {
            id: generate_id(),
            name: name.trim().to_string(),
        }
    }
}

/// A catalog item that can be moved in and out of storage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Nomenclature {
    /// Unique identifier
    pub id: String,
    /// Short name
    pub name: String,
    /// Full descriptive name
    pub full_name: String,
    /// Group the item belongs to
    pub group: NomenclatureGroup,
    /// Default unit of measure
    pub unit: UnitOfMeasure,
}

impl Nomenclature {
    /// Create a nomenclature
    pub fn new(name: &str, full_name: &str, group: NomenclatureGroup, unit: UnitOfMeasure) -> Self {
        Self {
            id: generate_id(),
            name: name.trim().to_string(),
            full_name: full_name.trim().to_string(),
            group,
            unit,
        }
    }
}

/// A named stock location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Storage {
    /// Unique identifier
    pub id: String,
    /// Storage name
    pub name: String,
}

impl Storage {
    /// Create a storage
    pub fn new(name: &str) -> Self {
        Self {
            id: generate_id(),
            name: name.trim().to_string(),
        }
    }
}

/// An immutable stock movement record.
///
/// Transactions are appended once and never mutated; the referenced
/// entities are snapshots taken at entry time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockTransaction {
    /// Unique identifier
    pub id: String,
    /// Movement date
    pub date: NaiveDateTime,
    /// Item being moved
    pub nomenclature: Nomenclature,
    /// Location of the movement
    pub storage: Storage,
    /// Quantity as entered, in `unit`
    pub quantity: f64,
    /// Unit of measure the quantity was entered in
    pub unit: UnitOfMeasure,
    /// Movement direction
    pub transaction_type: TransactionType,
}

impl StockTransaction {
    /// Create a stock movement record
    pub fn new(
        date: NaiveDateTime,
        nomenclature: Nomenclature,
        storage: Storage,
        quantity: f64,
        unit: UnitOfMeasure,
        transaction_type: TransactionType,
    ) -> Self {
        Self {
            id: generate_id(),
            date,
            nomenclature,
            storage,
            quantity,
            unit,
            transaction_type,
        }
    }

    /// Quantity normalized to base units.
    ///
    /// `quantity * coefficient` when the unit is derived, the raw quantity
    /// when the unit itself is a base unit.
    pub fn quantity_in_base_units(&self) -> f64 {
        if self.unit.base_unit.is_some() {
            self.quantity * self.unit.coefficient as f64
        } else {
            self.quantity
        }
    }

    /// Signed base-unit quantity: positive for inbound, negative for outbound
    pub fn signed_base_quantity(&self) -> f64 {
        match self.transaction_type {
            TransactionType::In => self.quantity_in_base_units(),
            TransactionType::Out => -self.quantity_in_base_units(),
        }
    }
}

// ==================== Tests ====================
