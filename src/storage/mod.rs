//! Persistence layer.
//!
//! The bet history is an append-only ledger behind the `LedgerStore`
//! trait. `CsvLedger` keeps it in a flat CSV file; `MemoryLedger` backs
//! tests and runs that should not touch disk.

pub mod csv;
pub mod history;

use anyhow::Result;
use std::sync::Mutex;

use crate::types::{EvaluatedBet, OddsboardError};

pub use self::csv::CsvLedger;
pub use history::HistoryAccumulator;

/// Append-only store of evaluated bets.
pub trait LedgerStore: Send + Sync {
    /// Append records after everything already stored. Returns the number
    /// of records written. Existing records are never rewritten.
    fn append(&self, records: &[EvaluatedBet]) -> Result<usize>;

    /// Every stored record, oldest first.
    fn read_all(&self) -> Result<Vec<EvaluatedBet>>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// In-memory ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    records: Mutex<Vec<EvaluatedBet>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the ledger with existing history.
    pub fn with_records(records: Vec<EvaluatedBet>) -> Self {
        Self {
            records: Mutex::new(records),
        }
    }
}

impl LedgerStore for MemoryLedger {
    fn append(&self, records: &[EvaluatedBet]) -> Result<usize> {
        let mut stored = self
            .records
            .lock()
            .map_err(|_| OddsboardError::Ledger("memory ledger lock poisoned".into()))?;
        stored.extend_from_slice(records);
        Ok(records.len())
    }

    fn read_all(&self) -> Result<Vec<EvaluatedBet>> {
        let stored = self
            .records
            .lock()
            .map_err(|_| OddsboardError::Ledger("memory ledger lock poisoned".into()))?;
        Ok(stored.clone())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
