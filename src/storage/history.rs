//! History accumulator and ledger analytics.
//!
//! Wraps a `LedgerStore` so that ledger trouble never reaches the caller:
//! a failed append records nothing, an unreadable ledger reads as empty.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::LedgerStore;
use crate::strategy::valuation::round_dp;
use crate::types::{BetResult, EvaluatedBet};

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

pub struct HistoryAccumulator {
    store: Box<dyn LedgerStore>,
}

impl HistoryAccumulator {
    pub fn new(store: Box<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Append a batch to the ledger. Returns how many rows were written;
    /// 0 for an empty batch or on any I/O failure.
    pub fn record(&self, bets: &[EvaluatedBet]) -> usize {
        if bets.is_empty() {
            return 0;
        }
        match self.store.append(bets) {
            Ok(written) => {
                info!(ledger = %self.store.describe(), written, "Recorded bets to history");
                written
            }
            Err(e) => {
                warn!(ledger = %self.store.describe(), error = %e, "Failed to record bets, history unchanged");
                0
            }
        }
    }

    /// Every record in the ledger, oldest first. Empty when the ledger is
    /// missing or unreadable.
    pub fn load(&self) -> Vec<EvaluatedBet> {
        match self.store.read_all() {
            Ok(records) => records,
            Err(e) => {
                warn!(ledger = %self.store.describe(), error = %e, "Failed to load history, treating as empty");
                Vec::new()
            }
        }
    }

    pub fn describe(&self) -> String {
        self.store.describe()
    }
}

// ---------------------------------------------------------------------------
// EV trend
// ---------------------------------------------------------------------------

/// Mean EV% for one ledger date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub mean_ev_pct: f64,
    pub count: usize,
}

/// One point per distinct date string, in ascending date order.
pub fn ev_trend(records: &[EvaluatedBet]) -> Vec<TrendPoint> {
    let mut by_date: BTreeMap<&str, (f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = by_date.entry(record.date.as_str()).or_insert((0.0, 0));
        entry.0 += record.expected_value_pct;
        entry.1 += 1;
    }

    by_date
        .into_iter()
        .map(|(date, (sum, count))| TrendPoint {
            date: date.to_string(),
            mean_ev_pct: round_dp(sum / count as f64, 2),
            count,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Hit rate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitRate {
    pub wins: usize,
    pub losses: usize,
}

impl HitRate {
    pub fn resolved(&self) -> usize {
        self.wins + self.losses
    }

    /// Wins over resolved bets, in [0, 1].
    pub fn rate(&self) -> f64 {
        match self.resolved() {
            0 => 0.0,
            n => self.wins as f64 / n as f64,
        }
    }

    /// Hit rate as a percentage, 1 dp.
    pub fn pct(&self) -> f64 {
        round_dp(self.rate() * 100.0, 1)
    }
}

/// Hit rate over resolved records. `None` when nothing has resolved.
pub fn hit_rate(records: &[EvaluatedBet]) -> Option<HitRate> {
    let wins = records.iter().filter(|r| r.result == BetResult::Win).count();
    let losses = records.iter().filter(|r| r.result == BetResult::Loss).count();
    let rate = HitRate { wins, losses };
    (rate.resolved() > 0).then_some(rate)
}

// ---------------------------------------------------------------------------
// EV distribution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram of EV% over [min, max]. The last bin includes
/// the maximum. When every bet has the same EV the result is one bin.
pub fn ev_distribution(bets: &[EvaluatedBet], bins: usize) -> Vec<HistogramBin> {
    if bets.is_empty() || bins == 0 {
        return Vec::new();
    }

    let evs: Vec<f64> = bets
        .iter()
        .map(|b| b.expected_value_pct)
        .filter(|v| v.is_finite())
        .collect();
    let (Some(min), Some(max)) = (
        evs.iter().copied().reduce(f64::min),
        evs.iter().copied().reduce(f64::max),
    ) else {
        return Vec::new();
    };

    if min == max {
        return vec![HistogramBin {
            lower: min,
            upper: max,
            count: evs.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut histogram: Vec<HistogramBin> = (0..bins)
        .map(|i| HistogramBin {
            lower: round_dp(min + width * i as f64, 2),
            upper: round_dp(if i + 1 == bins { max } else { min + width * (i + 1) as f64 }, 2),
            count: 0,
        })
        .collect();

    for ev in evs {
        let idx = (((ev - min) / width) as usize).min(bins - 1);
        histogram[idx].count += 1;
    }
    histogram
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
