//! Generic predicate filtering over heterogeneous record collections.
//!
//! Predicates carry a `/`-delimited field path, a comparison operator and a
//! string comparison value. Evaluation folds the predicate list over the
//! input, narrowing the result set at each step (conjunction). Field
//! resolution is fail-closed: a record whose path cannot be resolved does
//! not match.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use stockbook_utils::format_datetime;

use super::models::{Nomenclature, NomenclatureGroup, StockTransaction, Storage, UnitOfMeasure};

// ==================== Operators ====================

/// Comparison operator of a filter predicate.
///
/// Unknown wire tokens deserialize to `Equals`; `FromStr` is strict.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum FilterOp {
    #[serde(rename = "EQUALS")]
    Equals,
    #[serde(rename = "LIKE")]
    Like,
    #[serde(rename = "NOT_EQUAL")]
    NotEqual,
    #[serde(rename = "GREATER")]
    Greater,
    #[serde(rename = "GREATER_EQUAL")]
    GreaterEqual,
    #[serde(rename = "LESS")]
    Less,
    #[serde(rename = "LESS_EQUAL")]
    LessEqual,
}

impl<'de> Deserialize<'de> for FilterOp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let token = String::deserialize(deserializer)?;
        Ok(token.parse().unwrap_or(FilterOp::Equals))
    }
}

impl FromStr for FilterOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EQUALS" => Ok(FilterOp::Equals),
            "LIKE" => Ok(FilterOp::Like),
            "NOT_EQUAL" => Ok(FilterOp::NotEqual),
            "GREATER" => Ok(FilterOp::Greater),
            "GREATER_EQUAL" => Ok(FilterOp::GreaterEqual),
            "LESS" => Ok(FilterOp::Less),
            "LESS_EQUAL" => Ok(FilterOp::LessEqual),
            _ => Err(format!("Invalid filter operator: {}", s)),
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FilterOp::Equals => "EQUALS",
            FilterOp::Like => "LIKE",
            FilterOp::NotEqual => "NOT_EQUAL",
            FilterOp::Greater => "GREATER",
            FilterOp::GreaterEqual => "GREATER_EQUAL",
            FilterOp::Less => "LESS",
            FilterOp::LessEqual => "LESS_EQUAL",
        };
        write!(f, "{}", s)
    }
}

/// A single field-path/operator/value filter condition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterPredicate {
    /// `/`-delimited field path (e.g., `nomenclature/group/name`)
    pub field_name: String,
    /// Comparison value; always travels as a string
    pub value: String,
    /// Comparison operator
    #[serde(rename = "type")]
    pub op: FilterOp,
}

impl FilterPredicate {
    pub fn new(field_name: &str, op: FilterOp, value: impl Into<String>) -> Self {
        Self {
            field_name: field_name.to_string(),
            value: value.into(),
            op,
        }
    }
}

// ==================== Field access ====================

/// A resolved field value during predicate evaluation
pub enum FieldValue<'a> {
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
    /// A nested record; resolution must continue with another path segment
    Record(&'a dyn FieldAccess),
}

impl FieldValue<'_> {
    /// String form used for comparisons.
    ///
    /// Float `Display` renders whole numbers without a decimal point, so
    /// `quantity = "100"` matches a stored `100.0` at any magnitude.
    /// Date-times render as ISO-8601, which sorts lexicographically in
    /// chronological order.
    fn as_text(&self) -> Option<String> {
        match self {
            FieldValue::Text(s) => Some(s.clone()),
            FieldValue::Number(n) => Some(format!("{}", n)),
            FieldValue::DateTime(dt) => Some(format_datetime(dt)),
            FieldValue::Record(_) => None,
        }
    }
}

/// Uniform field lookup every filterable record type implements
pub trait FieldAccess {
    /// Look up a single field by name; `None` when the field does not exist
    fn field(&self, name: &str) -> Option<FieldValue<'_>>;
}

impl FieldAccess for UnitOfMeasure {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Text(self.id.clone())),
            "name" => Some(FieldValue::Text(self.name.clone())),
            "coefficient" => Some(FieldValue::Number(self.coefficient as f64)),
            "base_unit" => self
                .base_unit
                .as_deref()
                .map(|u| FieldValue::Record(u as &dyn FieldAccess)),
            _ => None,
        }
    }
}

impl FieldAccess for NomenclatureGroup {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Text(self.id.clone())),
            "name" => Some(FieldValue::Text(self.name.clone())),
            _ => None,
        }
    }
}

impl FieldAccess for Nomenclature {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Text(self.id.clone())),
            "name" => Some(FieldValue::Text(self.name.clone())),
            "full_name" => Some(FieldValue::Text(self.full_name.clone())),
            "group" => Some(FieldValue::Record(&self.group)),
            "unit" => Some(FieldValue::Record(&self.unit)),
            _ => None,
        }
    }
}

impl FieldAccess for Storage {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Text(self.id.clone())),
            "name" => Some(FieldValue::Text(self.name.clone())),
            _ => None,
        }
    }
}

impl FieldAccess for StockTransaction {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        match name {
            "id" => Some(FieldValue::Text(self.id.clone())),
            "date" => Some(FieldValue::DateTime(self.date)),
            "nomenclature" => Some(FieldValue::Record(&self.nomenclature)),
            "storage" => Some(FieldValue::Record(&self.storage)),
            "quantity" => Some(FieldValue::Number(self.quantity)),
            "unit" => Some(FieldValue::Record(&self.unit)),
            "transaction_type" => Some(FieldValue::Text(self.transaction_type.to_string())),
            _ => None,
        }
    }
}

/// Map-like access for dynamic JSON records
impl FieldAccess for serde_json::Value {
    fn field(&self, name: &str) -> Option<FieldValue<'_>> {
        let value = self.as_object()?.get(name)?;
        match value {
            serde_json::Value::String(s) => Some(FieldValue::Text(s.clone())),
            serde_json::Value::Number(n) => n.as_f64().map(FieldValue::Number),
            serde_json::Value::Bool(b) => Some(FieldValue::Text(b.to_string())),
            serde_json::Value::Object(_) => Some(FieldValue::Record(value)),
            _ => None,
        }
    }
}

// ==================== Evaluation ====================

/// Result of evaluating one predicate against one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOutcome {
    Match,
    NoMatch,
    /// The field path could not be resolved to a comparable value
    Unresolved,
}

/// Ordered conjunctive predicate evaluation engine.
///
/// Linear scan by design; no indexing. Complexity is
/// O(predicates x records x path depth).
pub struct FilterEngine;

impl FilterEngine {
    /// Keep only records matching every predicate, in predicate order.
    ///
    /// Empty predicate lists return the input unchanged. Unresolved
    /// predicates reject the record (fail-closed).
    pub fn filter<'a, T: FieldAccess>(
        records: impl IntoIterator<Item = &'a T>,
        predicates: &[FilterPredicate],
    ) -> Vec<&'a T> {
        let mut kept: Vec<&T> = records.into_iter().collect();
        for predicate in predicates {
            kept.retain(|record| {
                Self::evaluate(*record as &dyn FieldAccess, predicate) == PredicateOutcome::Match
            });
        }
        kept
    }

    /// Evaluate a single predicate against a single record
    pub fn evaluate(record: &dyn FieldAccess, predicate: &FilterPredicate) -> PredicateOutcome {
        let resolved = match Self::resolve_path(record, &predicate.field_name) {
            Some(value) => value,
            None => return PredicateOutcome::Unresolved,
        };
        let field_text = match resolved.as_text() {
            Some(text) => text,
            // terminal value is itself a record, nothing to compare
            None => return PredicateOutcome::Unresolved,
        };
        let matched = Self::compare(&field_text, &predicate.value, predicate.op);
        if matched {
            PredicateOutcome::Match
        } else {
            PredicateOutcome::NoMatch
        }
    }

    /// Walk a `/`-delimited path through nested records
    fn resolve_path<'a>(record: &'a dyn FieldAccess, path: &str) -> Option<FieldValue<'a>> {
        let mut segments = path.split('/');
        let first = segments.next()?;
        let mut current = record.field(first)?;
        for segment in segments {
            match current {
                FieldValue::Record(nested) => {
                    current = nested.field(segment)?;
                }
                _ => return None,
            }
        }
        Some(current)
    }

    fn compare(field: &str, value: &str, op: FilterOp) -> bool {
        match op {
            FilterOp::Equals => field == value,
            FilterOp::NotEqual => field != value,
            FilterOp::Like => field.to_lowercase().contains(&value.to_lowercase()),
            FilterOp::Greater | FilterOp::GreaterEqual | FilterOp::Less | FilterOp::LessEqual => {
                Self::compare_ordered(field, value, op)
            }
        }
    }

    /// Numeric comparison when both sides parse as floats, lexicographic
    /// otherwise. The fallback keeps ISO-8601 date strings comparable in
    /// chronological order without a dedicated date operand type.
    fn compare_ordered(field: &str, value: &str, op: FilterOp) -> bool {
        let ordering = match (field.parse::<f64>(), value.parse::<f64>()) {
            (Ok(a), Ok(b)) => a.partial_cmp(&b),
            _ => Some(field.cmp(value)),
        };
        let ordering = match ordering {
            Some(ord) => ord,
            None => return false,
        };
        match op {
            FilterOp::Greater => ordering.is_gt(),
            FilterOp::GreaterEqual => ordering.is_ge(),
            FilterOp::Less => ordering.is_lt(),
            FilterOp::LessEqual => ordering.is_le(),
            _ => false,
        }
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TransactionType;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn transaction(tx_type: TransactionType, quantity: f64) -> StockTransaction {
        let gram = UnitOfMeasure::gram();
        let group = NomenclatureGroup::new("ingredients");
        let flour = Nomenclature::new("wheat flour", "wheat flour", group, gram.clone());
        StockTransaction::new(
            date(2024, 1, 15),
            flour,
            Storage::new("main"),
            quantity,
            gram,
            tx_type,
        )
    }

    #[test]
    fn test_empty_predicates_return_input() {
        let txs = vec![transaction(TransactionType::In, 10.0)];
        let kept = FilterEngine::filter(&txs, &[]);
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_predicate_composition() {
        let txs = vec![
            transaction(TransactionType::In, 30.0),
            transaction(TransactionType::In, 80.0),
            transaction(TransactionType::Out, 80.0),
        ];
        let predicates = vec![
            FilterPredicate::new("transaction_type", FilterOp::Equals, "in"),
            FilterPredicate::new("quantity", FilterOp::Greater, "50"),
        ];
        let kept = FilterEngine::filter(&txs, &predicates);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].quantity, 80.0);
        assert_eq!(kept[0].transaction_type, TransactionType::In);
    }

    #[test]
    fn test_monotonic_narrowing() {
        let txs = vec![
            transaction(TransactionType::In, 30.0),
            transaction(TransactionType::In, 80.0),
            transaction(TransactionType::Out, 80.0),
        ];
        let p1 = vec![FilterPredicate::new("transaction_type", FilterOp::Equals, "in")];
        let p2 = vec![FilterPredicate::new("quantity", FilterOp::Greater, "50")];
        let combined: Vec<FilterPredicate> =
            p1.iter().cloned().chain(p2.iter().cloned()).collect();

        let staged: Vec<&StockTransaction> = {
            let first: Vec<&StockTransaction> = FilterEngine::filter(&txs, &p1);
            FilterEngine::filter(first, &p2)
        };
        let direct = FilterEngine::filter(&txs, &combined);
        let staged_ids: Vec<&str> = staged.iter().map(|t| t.id.as_str()).collect();
        let direct_ids: Vec<&str> = direct.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(staged_ids, direct_ids);
    }

    #[test]
    fn test_nested_path_resolution() {
        let txs = vec![transaction(TransactionType::In, 10.0)];
        let predicates = vec![FilterPredicate::new(
            "nomenclature/group/name",
            FilterOp::Equals,
            "ingredients",
        )];
        assert_eq!(FilterEngine::filter(&txs, &predicates).len(), 1);
    }

    #[test]
    fn test_missing_field_is_unresolved() {
        let tx = transaction(TransactionType::In, 10.0);
        let predicate = FilterPredicate::new("no_such_field", FilterOp::Equals, "x");
        assert_eq!(
            FilterEngine::evaluate(&tx, &predicate),
            PredicateOutcome::Unresolved
        );
        let txs = vec![tx];
        assert!(FilterEngine::filter(&txs, &[predicate]).is_empty());
    }

    #[test]
    fn test_terminal_record_is_unresolved() {
        let tx = transaction(TransactionType::In, 10.0);
        let predicate = FilterPredicate::new("nomenclature", FilterOp::Equals, "x");
        assert_eq!(
            FilterEngine::evaluate(&tx, &predicate),
            PredicateOutcome::Unresolved
        );
    }

    #[test]
    fn test_date_range_comparison() {
        let txs = vec![transaction(TransactionType::In, 10.0)];
        let in_range = vec![
            FilterPredicate::new("date", FilterOp::GreaterEqual, "2024-01-01T00:00:00"),
            FilterPredicate::new("date", FilterOp::LessEqual, "2024-01-31T00:00:00"),
        ];
        assert_eq!(FilterEngine::filter(&txs, &in_range).len(), 1);

        let before = vec![FilterPredicate::new(
            "date",
            FilterOp::Less,
            "2024-01-15T00:00:00",
        )];
        assert!(FilterEngine::filter(&txs, &before).is_empty());
    }

    #[test]
    fn test_like_is_case_insensitive() {
        let txs = vec![transaction(TransactionType::In, 10.0)];
        let predicates = vec![FilterPredicate::new(
            "nomenclature/name",
            FilterOp::Like,
            "FLOUR",
        )];
        assert_eq!(FilterEngine::filter(&txs, &predicates).len(), 1);
    }

    #[test]
    fn test_numeric_string_form_of_whole_quantity() {
        let txs = vec![transaction(TransactionType::In, 100.0)];
        let predicates = vec![FilterPredicate::new("quantity", FilterOp::Equals, "100")];
        assert_eq!(FilterEngine::filter(&txs, &predicates).len(), 1);
    }

    #[test]
    fn test_numeric_string_form_beyond_i64_range() {
        // whole quantities past i64::MAX still render exactly
        let txs = vec![transaction(TransactionType::In, 1e19)];
        let predicates = vec![FilterPredicate::new(
            "quantity",
            FilterOp::Equals,
            "10000000000000000000",
        )];
        assert_eq!(FilterEngine::filter(&txs, &predicates).len(), 1);
    }

    #[test]
    fn test_json_value_records() {
        let records = vec![
            serde_json::json!({"name": "sugar", "group": {"name": "ingredients"}}),
            serde_json::json!({"name": "box", "group": {"name": "packaging"}}),
        ];
        let predicates = vec![FilterPredicate::new(
            "group/name",
            FilterOp::Equals,
            "ingredients",
        )];
        let kept = FilterEngine::filter(&records, &predicates);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0]["name"], "sugar");
    }

    #[test]
    fn test_op_wire_tokens() {
        assert_eq!("GREATER_EQUAL".parse::<FilterOp>().unwrap(), FilterOp::GreaterEqual);
        assert!("greater".parse::<FilterOp>().is_err());
        let parsed: FilterOp = serde_json::from_str("\"BOGUS\"").unwrap();
        assert_eq!(parsed, FilterOp::Equals);
        assert_eq!(serde_json::to_string(&FilterOp::LessEqual).unwrap(), "\"LESS_EQUAL\"");
    }
}
