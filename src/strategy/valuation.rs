//! Odds valuation.
//!
//! Pure conversions from an American odds quote to an implied probability,
//! a model win probability and an expected value per 100 staked.
//!
//! The "model" is a fixed logistic curve applied straight to the odds
//! number, `1 / (1 + 10^(-odds/400))`. It is not a trained predictor.

use rust_decimal::prelude::*;
use tracing::debug;

/// Probability used whenever odds are missing, zero or numerically unusable.
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

/// Logistic scale of the model curve (Elo-style).
const MODEL_SCALE: f64 = 400.0;

/// Result of [`expected_value`], in the units shown to users.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvBreakdown {
    /// Expected profit per 100 staked, 2 dp.
    pub ev_pct: f64,
    /// Model probability × 100, 1 dp.
    pub model_pct: f64,
    /// Implied probability × 100, 1 dp.
    pub implied_pct: f64,
}

/// Everything the evaluator needs for one outcome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Valuation {
    /// Odds actually used; 0 when the quote was unusable.
    pub odds: i32,
    pub model_probability: f64,
    pub implied_probability: f64,
    pub breakdown: EvBreakdown,
}

/// Round half-to-even at `dp` decimal places, working on the exact binary
/// value of `value`. Only true midpoints take the even rule; `56.055`, which
/// is stored as `56.05499...`, rounds down. Non-finite input is returned
/// unchanged.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    Decimal::from_f64_retain(value)
        .map(|d| d.round_dp_with_strategy(dp, RoundingStrategy::MidpointNearestEven))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Bookmaker implied probability of an American odds quote.
///
/// `odds > 0`: `100 / (100 + odds)`. `odds < 0`: `|odds| / (100 + |odds|)`.
/// Zero is not a valid quote and yields `None`.
pub fn implied_probability(odds: i32) -> Option<f64> {
    match odds {
        0 => None,
        o if o > 0 => Some(100.0 / (100.0 + o as f64)),
        o => {
            let abs = (o as f64).abs();
            Some(abs / (100.0 + abs))
        }
    }
}

/// Model win probability, 4 dp.
///
/// Odds below about -123300 overflow the power term; the curve is clamped
/// to its limit of 0.0 there so it stays non-decreasing over every `i32`.
/// A non-finite result falls back to [`NEUTRAL_PROBABILITY`].
pub fn model_probability(odds: i32) -> f64 {
    let power = 10f64.powf(-(odds as f64) / MODEL_SCALE);
    if power == f64::INFINITY {
        debug!(odds, "Model curve overflowed, clamping to 0");
        return 0.0;
    }
    let p = 1.0 / (1.0 + power);
    if !p.is_finite() {
        return NEUTRAL_PROBABILITY;
    }
    round_dp(p, 4)
}

/// Expected value of a 100-unit stake at `odds` given `model_prob`.
///
/// `ev = p × (odds if odds > 0 else 100) − (1 − p) × 100`
///
/// Unpriced odds (0) report a neutral 50.0 implied percentage.
pub fn expected_value(model_prob: f64, odds: i32) -> EvBreakdown {
    let payout = if odds > 0 { odds as f64 } else { 100.0 };
    let ev = model_prob * payout - (1.0 - model_prob) * 100.0;
    let implied = implied_probability(odds).unwrap_or(NEUTRAL_PROBABILITY);

    EvBreakdown {
        ev_pct: round_dp(ev, 2),
        model_pct: round_dp(model_prob * 100.0, 1),
        implied_pct: round_dp(implied * 100.0, 1),
    }
}

/// Value one outcome price. Missing or zero odds take the neutral path:
/// both probabilities 0.5 and an EV computed consistently from them.
pub fn value_outcome(price: Option<i32>) -> Valuation {
    match price.filter(|p| *p != 0) {
        Some(odds) => {
            let model = model_probability(odds);
            Valuation {
                odds,
                model_probability: model,
                implied_probability: implied_probability(odds).unwrap_or(NEUTRAL_PROBABILITY),
                breakdown: expected_value(model, odds),
            }
        }
        None => Valuation {
            odds: 0,
            model_probability: NEUTRAL_PROBABILITY,
            implied_probability: NEUTRAL_PROBABILITY,
            breakdown: expected_value(NEUTRAL_PROBABILITY, 0),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn approx(a: f64, b: f64, tol: f64) -> bool {
        (a - b).abs() < tol
    }

    #[test]
    fn test_implied_probability_table() {
        let cases = [
            (-150, 0.6),
            (130, 100.0 / 230.0),
            (100, 0.5),
            (-100, 0.5),
            (-110, 110.0 / 210.0),
            (400, 0.2),
        ];
        for (odds, expected) in cases {
            let p = implied_probability(odds).unwrap();
            assert!(approx(p, expected, 1e-12), "odds {odds}: {p} != {expected}");
        }
    }

    #[test]
    fn test_implied_probability_rejects_zero() {
        assert_eq!(implied_probability(0), None);
    }

    #[test]
    fn test_implied_probability_in_open_unit_interval() {
        for odds in (-100_000..=100_000).step_by(37).filter(|o| *o != 0) {
            let p = implied_probability(odds).unwrap();
            assert!(p > 0.0 && p < 1.0, "odds {odds} gave {p}");
        }
        for odds in [1, -1, i32::MAX, i32::MIN + 1] {
            let p = implied_probability(odds).unwrap();
            assert!(p > 0.0 && p < 1.0, "odds {odds} gave {p}");
        }
    }

    #[test]
    fn test_model_probability_values() {
        assert_eq!(model_probability(0), 0.5);
        // 1 / (1 + 10^(150/400)) = 0.29661...
        assert!(approx(model_probability(-150), 0.2966, 1e-12));
        // 1 / (1 + 10^(-130/400)) = 0.67881...
        assert!(approx(model_probability(130), 0.6788, 1e-12));
        assert!(approx(model_probability(400), 0.9091, 1e-12));
    }

    #[test]
    fn test_model_probability_is_rounded_to_four_places() {
        for odds in [-333, -120, 115, 275, 999] {
            let p = model_probability(odds);
            assert!(approx(p * 10_000.0, (p * 10_000.0).round(), 1e-6), "odds {odds}: {p}");
        }
    }

    #[test]
    fn test_model_probability_monotonic() {
        let mut previous = model_probability(-100_000);
        for odds in (-100_000..=100_000).step_by(25) {
            let p = model_probability(odds);
            assert!(p >= previous, "not monotonic at {odds}: {p} < {previous}");
            previous = p;
        }
    }

    #[test]
    fn test_model_probability_overflow_clamps_to_zero() {
        // 10^(2^31 / 400) overflows f64
        assert_eq!(model_probability(i32::MIN), 0.0);
        assert_eq!(model_probability(-130_000), 0.0);
        assert_eq!(model_probability(i32::MAX), 1.0);
    }

    #[test]
    fn test_model_probability_monotonic_across_overflow() {
        let mut previous = model_probability(i32::MIN);
        for odds in (-200_000..=-100_000).step_by(7).chain([i32::MAX]) {
            let p = model_probability(odds);
            assert!(p >= previous, "not monotonic at {odds}: {p} < {previous}");
            previous = p;
        }
    }

    #[test]
    fn test_expected_value_underdog() {
        // p = 0.6789 at +130: 0.6789 * 130 - 0.3211 * 100 = 56.147
        let ev = expected_value(0.6789, 130);
        assert!(approx(ev.ev_pct, 56.15, 1e-9));
        assert!(approx(ev.model_pct, 67.9, 1e-9));
        assert!(approx(ev.implied_pct, 43.5, 1e-9));
    }

    #[test]
    fn test_expected_value_favourite() {
        // p = 0.2966 at -150: 0.2966 * 100 - 0.7034 * 100 = -40.68
        let ev = expected_value(0.2966, -150);
        assert!(approx(ev.ev_pct, -40.68, 1e-9));
        assert!(approx(ev.model_pct, 29.7, 1e-9));
        assert!(approx(ev.implied_pct, 60.0, 1e-9));
    }

    #[test]
    fn test_expected_value_unpriced() {
        let ev = expected_value(NEUTRAL_PROBABILITY, 0);
        assert_eq!(ev.ev_pct, 0.0);
        assert_eq!(ev.model_pct, 50.0);
        assert_eq!(ev.implied_pct, 50.0);
    }

    #[test]
    fn test_expected_value_is_deterministic() {
        for (p, odds) in [(0.41, 145), (0.73, -260), (0.5, 100), (0.0, -5000)] {
            assert_eq!(expected_value(p, odds), expected_value(p, odds));
        }
    }

    #[test]
    fn test_value_outcome_priced() {
        let v = value_outcome(Some(-150));
        assert_eq!(v.odds, -150);
        assert!(approx(v.implied_probability, 0.6, 1e-12));
        assert_eq!(v.model_probability, 0.2966);
        assert_eq!(v.breakdown, expected_value(0.2966, -150));
    }

    #[test]
    fn test_value_outcome_neutral_path() {
        for price in [None, Some(0)] {
            let v = value_outcome(price);
            assert_eq!(v.odds, 0);
            assert_eq!(v.model_probability, NEUTRAL_PROBABILITY);
            assert_eq!(v.implied_probability, NEUTRAL_PROBABILITY);
            assert_eq!(v.breakdown.ev_pct, 0.0);
        }
    }

    #[test]
    fn test_round_dp_half_even() {
        // Exact binary midpoints take the even neighbour
        assert_eq!(Decimal::from_f64(round_dp(0.125, 2)).unwrap(), dec!(0.12));
        assert_eq!(Decimal::from_f64(round_dp(0.375, 2)).unwrap(), dec!(0.38));
        assert_eq!(Decimal::from_f64(round_dp(2.5, 0)).unwrap(), dec!(2));
        // 0.135 is stored slightly above the midpoint, 2.675 slightly below
        assert_eq!(Decimal::from_f64(round_dp(0.135, 2)).unwrap(), dec!(0.14));
        assert_eq!(Decimal::from_f64(round_dp(2.675, 2)).unwrap(), dec!(2.67));
        // 0.0005 * 100 lands just above 0.05
        assert_eq!(Decimal::from_f64(round_dp(0.0005 * 100.0, 1)).unwrap(), dec!(0.1));
        assert!(approx(round_dp(-40.684, 2), -40.68, 1e-12));
        assert!(round_dp(f64::NAN, 2).is_nan());
    }

    #[test]
    fn test_value_outcome_reference_table() {
        // (odds, model, ev%, model%, implied%)
        let cases = [
            (127, 0.675, 53.23, 67.5, 44.1),
            (342, 0.8775, 287.85, 87.8, 22.6),
            (705, 0.983, 691.31, 98.3, 12.4),
            (130, 0.6788, 56.12, 67.9, 43.5),
            (400, 0.9091, 354.55, 90.9, 20.0),
            (-110, 0.3468, -30.64, 34.7, 52.4),
            (-150, 0.2966, -40.68, 29.7, 60.0),
            (-550, 0.0405, -91.9, 4.0, 84.6),
            (-1338, 0.0005, -99.9, 0.1, 93.0),
        ];
        for (odds, model, ev_pct, model_pct, implied_pct) in cases {
            let v = value_outcome(Some(odds));
            assert_eq!(v.model_probability, model, "odds {odds}");
            assert_eq!(v.breakdown.ev_pct, ev_pct, "odds {odds}");
            assert_eq!(v.breakdown.model_pct, model_pct, "odds {odds}");
            assert_eq!(v.breakdown.implied_pct, implied_pct, "odds {odds}");
        }
    }
}
