//! Core stock-movement ledger processing and business logic

pub mod balance;
pub mod checkpoint;
pub mod error;
pub mod filter;
pub mod ledger;
pub mod models;
pub mod turnover;
pub mod types;

pub use balance::{BalanceEngine, BalancePosition, BalanceReportRow};
pub use checkpoint::{BalanceCheckpoint, CheckpointEntry, CheckpointStore};
pub use error::{CoreError, CoreResult, ErrorCode, ErrorSeverity};
pub use filter::{FieldAccess, FieldValue, FilterEngine, FilterOp, FilterPredicate, PredicateOutcome};
pub use ledger::{
    GroupPayload, Ledger, LedgerEvent, NomenclaturePayload, StoragePayload, TransactionPayload,
    UnitPayload,
};
pub use models::{Nomenclature, NomenclatureGroup, StockTransaction, Storage, UnitOfMeasure};
pub use turnover::{TurnoverReportEngine, TurnoverRow};
pub use types::{ReferenceKind, TransactionType};
