//! Strategy: odds valuation, bet evaluation, filtering and ranking.

pub mod filter;
pub mod valuation;

use tracing::debug;

use crate::engine::normalizer::NormalizedOutcome;
use crate::types::{BetResult, EvaluatedBet};
use valuation::value_outcome;

/// Value one normalized outcome and stamp it with the run date.
pub fn evaluate_outcome(outcome: &NormalizedOutcome<'_>, date: &str) -> EvaluatedBet {
    let valuation = value_outcome(outcome.price);
    if valuation.odds == 0 {
        debug!(
            matchup = %outcome.matchup,
            market = outcome.market,
            selection = outcome.selection,
            "No usable price, valued at neutral probability"
        );
    }

    EvaluatedBet {
        date: date.to_string(),
        matchup: outcome.matchup_label(),
        market: outcome.market.to_string(),
        selection: outcome.selection.to_string(),
        american_odds: valuation.odds,
        model_probability: valuation.model_probability,
        implied_probability: valuation.implied_probability,
        expected_value_pct: valuation.breakdown.ev_pct,
        result: BetResult::Pending,
    }
}

/// Value every outcome, preserving discovery order.
pub fn evaluate_all<'a, I>(outcomes: I, date: &str) -> Vec<EvaluatedBet>
where
    I: IntoIterator<Item = NormalizedOutcome<'a>>,
{
    outcomes
        .into_iter()
        .map(|o| evaluate_outcome(&o, date))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
