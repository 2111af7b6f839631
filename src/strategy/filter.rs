//! Bet filtering and ranking.
//!
//! Every function here takes a slice and returns a new `Vec`, so the
//! predicates compose in any order and the caller's collection is never
//! touched.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::types::EvaluatedBet;

/// Lowest and highest accepted EV threshold (percent).
pub const MIN_EV_FLOOR: i32 = -100;
pub const MIN_EV_CEILING: i32 = 100;

/// Picker values that mean "no restriction".
const ALL_TEAMS: &str = "All Teams";
const ALL_MARKETS: &str = "All";

/// Keep bets whose EV% is at least `minimum_ev` (clamped to [-100, 100]).
pub fn filter_min_ev(bets: &[EvaluatedBet], minimum_ev: i32) -> Vec<EvaluatedBet> {
    let threshold = minimum_ev.clamp(MIN_EV_FLOOR, MIN_EV_CEILING) as f64;
    bets.iter()
        .filter(|b| b.expected_value_pct >= threshold)
        .cloned()
        .collect()
}

/// Keep bets where `team` plays either side. `None` keeps everything.
pub fn filter_team(bets: &[EvaluatedBet], team: Option<&str>) -> Vec<EvaluatedBet> {
    match team {
        Some(team) => bets.iter().filter(|b| b.involves(team)).cloned().collect(),
        None => bets.to_vec(),
    }
}

/// Keep bets on the given market key. `None` keeps everything.
pub fn filter_market(bets: &[EvaluatedBet], market: Option<&str>) -> Vec<EvaluatedBet> {
    match market {
        Some(market) => bets.iter().filter(|b| b.market == market).cloned().collect(),
        None => bets.to_vec(),
    }
}

/// Sort by EV% descending. The sort is stable, so equal EVs keep the
/// order in which the normalizer discovered them.
pub fn rank_by_ev(bets: &[EvaluatedBet]) -> Vec<EvaluatedBet> {
    let mut ranked = bets.to_vec();
    ranked.sort_by(|a, b| {
        b.expected_value_pct
            .partial_cmp(&a.expected_value_pct)
            .unwrap_or(Ordering::Equal)
    });
    ranked
}

/// The best `n` bets by EV%.
pub fn top_n(bets: &[EvaluatedBet], n: usize) -> Vec<EvaluatedBet> {
    let mut ranked = rank_by_ev(bets);
    ranked.truncate(n);
    ranked
}

/// The user's current filter choices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BetFilter {
    /// Minimum EV% to show.
    pub min_ev: i32,
    /// Restrict to one team; `None` for all teams.
    pub team: Option<String>,
    /// Restrict to one market key; `None` for all markets.
    pub market: Option<String>,
}

impl BetFilter {
    /// Build a filter from raw picker values. Blank strings and the
    /// "All Teams" / "All" choices mean no restriction.
    pub fn new(min_ev: i32, team: Option<&str>, market: Option<&str>) -> Self {
        Self {
            min_ev: min_ev.clamp(MIN_EV_FLOOR, MIN_EV_CEILING),
            team: normalize_choice(team, ALL_TEAMS),
            market: normalize_choice(market, ALL_MARKETS),
        }
    }

    /// Whether a single bet passes every predicate.
    pub fn matches(&self, bet: &EvaluatedBet) -> bool {
        let threshold = self.min_ev.clamp(MIN_EV_FLOOR, MIN_EV_CEILING) as f64;
        bet.expected_value_pct >= threshold
            && self.team.as_deref().map_or(true, |t| bet.involves(t))
            && self.market.as_deref().map_or(true, |m| bet.market == m)
    }

    /// Apply all predicates, preserving input order.
    pub fn apply(&self, bets: &[EvaluatedBet]) -> Vec<EvaluatedBet> {
        let by_market = filter_market(bets, self.market.as_deref());
        let by_team = filter_team(&by_market, self.team.as_deref());
        filter_min_ev(&by_team, self.min_ev)
    }
}

fn normalize_choice(value: Option<&str>, all_label: &str) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case(all_label))
        .map(str::to_string)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
