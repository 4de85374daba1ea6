//! Basic types for the core ledger module

use serde::{Deserialize, Serialize};

/// Direction of a stock movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Inbound movement (goods received into a storage)
    In,
    /// Outbound movement (goods issued from a storage)
    Out,
}

impl std::str::FromStr for TransactionType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" => Ok(TransactionType::In),
            "out" => Ok(TransactionType::Out),
            _ => Err(format!("Invalid transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionType::In => write!(f, "in"),
            TransactionType::Out => write!(f, "out"),
        }
    }
}

/// Kinds of reference data held by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceKind {
    /// Units of measure
    Units,
    /// Nomenclature groups
    Groups,
    /// Nomenclatures (catalog items)
    Nomenclatures,
    /// Storages (stock locations)
    Storages,
}

impl std::str::FromStr for ReferenceKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "units" | "unit" => Ok(ReferenceKind::Units),
            "groups" | "group" => Ok(ReferenceKind::Groups),
            "nomenclatures" | "nomenclature" => Ok(ReferenceKind::Nomenclatures),
            "storages" | "storage" => Ok(ReferenceKind::Storages),
            _ => Err(format!("Invalid reference kind: {}", s)),
        }
    }
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReferenceKind::Units => write!(f, "units"),
            ReferenceKind::Groups => write!(f, "groups"),
            ReferenceKind::Nomenclatures => write!(f, "nomenclatures"),
            ReferenceKind::Storages => write!(f, "storages"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_transaction_type_round_trip() {
        assert_eq!(TransactionType::from_str("in").unwrap(), TransactionType::In);
        assert_eq!(TransactionType::from_str("OUT").unwrap(), TransactionType::Out);
        assert_eq!(TransactionType::In.to_string(), "in");
        assert!(TransactionType::from_str("sideways").is_err());
    }

    #[test]
    fn test_reference_kind_round_trip() {
        assert_eq!(ReferenceKind::from_str("units").unwrap(), ReferenceKind::Units);
        assert_eq!(ReferenceKind::from_str("storage").unwrap(), ReferenceKind::Storages);
        assert_eq!(ReferenceKind::Nomenclatures.to_string(), "nomenclatures");
        assert!(ReferenceKind::from_str("recipes").is_err());
    }
}
