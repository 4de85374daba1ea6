//! Single-slot persistent balance checkpoint.
//!
//! Exactly one checkpoint document exists at a time; saving replaces it
//! wholesale. Loading is lenient: any missing, stale or unreadable slot is
//! reported as "no usable checkpoint", never as an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::error::CoreResult;

/// One cached balance position inside a checkpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CheckpointEntry {
    pub nomenclature_id: String,
    pub balance: f64,
    pub calculation_date: NaiveDateTime,
}

/// Storage-agnostic snapshot of all balances as of `calculation_date`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BalanceCheckpoint {
    pub calculation_date: NaiveDateTime,
    pub balances: BTreeMap<String, CheckpointEntry>,
}

impl BalanceCheckpoint {
    pub fn new(calculation_date: NaiveDateTime) -> Self {
        Self {
            calculation_date,
            balances: BTreeMap::new(),
        }
    }
}

/// File-backed single-slot checkpoint store
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the slot if it holds a checkpoint dated exactly `expected_date`.
    ///
    /// Missing file, parse failure and date mismatch all yield `None`.
    pub fn load(&self, expected_date: NaiveDateTime) -> Option<BalanceCheckpoint> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                log::debug!("No checkpoint at {}: {}", self.path.display(), e);
                return None;
            }
        };
        let checkpoint: BalanceCheckpoint = match serde_json::from_str(&raw) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                log::warn!("Unreadable checkpoint at {}: {}", self.path.display(), e);
                return None;
            }
        };
        if checkpoint.calculation_date != expected_date {
            log::debug!(
                "Checkpoint dated {} does not match requested {}",
                checkpoint.calculation_date,
                expected_date
            );
            return None;
        }
        Some(checkpoint)
    }

    /// Replace the slot with `checkpoint`.
    ///
    /// Writes to a sibling temporary file first, then renames over the
    /// slot, so a failed write leaves the prior checkpoint intact.
    pub fn save(&self, checkpoint: &BalanceCheckpoint) -> CoreResult<()> {
        let serialized = serde_json::to_string_pretty(checkpoint)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serialized)?;
        fs::rename(&tmp, &self.path)?;
        log::debug!(
            "Saved checkpoint for {} ({} positions) to {}",
            checkpoint.calculation_date,
            checkpoint.balances.len(),
            self.path.display()
        );
        Ok(())
    }
}

// ==================== Tests ====================
