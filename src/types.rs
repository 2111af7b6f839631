//! Shared types for ODDSBOARD.
//!
//! Two families live here: the wire model for the odds feed (games →
//! bookmakers → markets → outcomes, every field optional because the
//! feed is not trusted) and the evaluated-bet record that every later
//! stage consumes.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::strategy::valuation::round_dp;

// ---------------------------------------------------------------------------
// Feed wire model
// ---------------------------------------------------------------------------

/// One wagerable side of a market from one bookmaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOutcome {
    /// Selection label (team, "Over", player name, ...).
    #[serde(default)]
    pub name: Option<String>,
    /// American odds. `None` when the feed sent null, zero, a fractional
    /// number or something that is not a number at all.
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: Option<i32>,
}

/// A named market (`h2h`, `spreads`, `totals`, player props) quoted by
/// one bookmaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub outcomes: Vec<RawOutcome>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bookmaker {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub markets: Vec<MarketQuote>,
}

/// A single game as returned by the odds feed.
///
/// The v4 feed sends `home_team` / `away_team`; older payloads send a
/// `teams` pair plus `home_team`. Both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOdds {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub sport_key: Option<String>,
    #[serde(default)]
    pub commence_time: Option<String>,
    #[serde(default)]
    pub home_team: Option<String>,
    #[serde(default)]
    pub away_team: Option<String>,
    #[serde(default)]
    pub teams: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub bookmakers: Vec<Bookmaker>,
}

impl GameOdds {
    /// Resolve the two sides of the game.
    ///
    /// Returns `None` unless the team pair has exactly two distinct names
    /// and `home_team` is one of them. The away side is whichever name is
    /// not the home team.
    pub fn matchup(&self) -> Option<Matchup> {
        let home = self.home_team.as_deref()?.trim();
        if home.is_empty() {
            return None;
        }

        let pair: Vec<&str> = match &self.teams {
            Some(teams) => teams.iter().map(|t| t.trim()).collect(),
            None => vec![self.away_team.as_deref()?.trim(), home],
        };

        if pair.len() != 2 || pair[0] == pair[1] || pair.iter().any(|t| t.is_empty()) {
            return None;
        }
        if !pair.contains(&home) {
            return None;
        }

        let away = pair.into_iter().find(|t| *t != home)?;
        Some(Matchup {
            home: home.to_string(),
            away: away.to_string(),
        })
    }
}

/// The two sides of a validated game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Matchup {
    pub home: String,
    pub away: String,
}

impl Matchup {
    /// The "Away @ Home" label used in tables and the ledger.
    pub fn label(&self) -> String {
        format!("{} @ {}", self.away, self.home)
    }

    pub fn involves(&self, team: &str) -> bool {
        self.home == team || self.away == team
    }
}

impl fmt::Display for Matchup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.away, self.home)
    }
}

// ---------------------------------------------------------------------------
// Evaluated bets
// ---------------------------------------------------------------------------

/// Settlement state of a bet. The engine only ever writes `Pending`;
/// `Win`/`Loss` come from whoever settles the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BetResult {
    #[default]
    Pending,
    Win,
    Loss,
}

impl BetResult {
    pub fn is_resolved(&self) -> bool {
        !matches!(self, BetResult::Pending)
    }
}

impl fmt::Display for BetResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BetResult::Pending => write!(f, "Pending"),
            BetResult::Win => write!(f, "Win"),
            BetResult::Loss => write!(f, "Loss"),
        }
    }
}

/// Parse a ledger result cell (case-insensitive).
impl std::str::FromStr for BetResult {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" | "" => Ok(BetResult::Pending),
            "win" | "won" => Ok(BetResult::Win),
            "loss" | "lost" => Ok(BetResult::Loss),
            _ => Err(anyhow::anyhow!("Unknown bet result: {s}")),
        }
    }
}

/// One outcome after valuation: the row shown in the bet table and
/// appended to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedBet {
    /// ISO date (`YYYY-MM-DD`) of the evaluation run.
    pub date: String,
    /// "Away @ Home"
    pub matchup: String,
    pub market: String,
    pub selection: String,
    /// American odds; 0 means the feed had no usable price.
    pub american_odds: i32,
    /// Model win probability, 4 decimal places.
    pub model_probability: f64,
    /// Bookmaker implied probability (no vig removal).
    pub implied_probability: f64,
    /// Expected profit per 100 staked, 2 decimal places.
    pub expected_value_pct: f64,
    #[serde(default)]
    pub result: BetResult,
}

impl fmt::Display for EvaluatedBet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} | {} {} {:+} | model={:.1}% implied={:.1}% EV={:.2}% ({})",
            self.date,
            self.matchup,
            self.market,
            self.selection,
            self.american_odds,
            self.model_pct(),
            self.implied_pct(),
            self.expected_value_pct,
            self.result,
        )
    }
}

impl EvaluatedBet {
    /// Model probability as a percentage, 1 decimal place.
    pub fn model_pct(&self) -> f64 {
        round_dp(self.model_probability * 100.0, 1)
    }

    /// Implied probability as a percentage, 1 decimal place.
    pub fn implied_pct(&self) -> f64 {
        round_dp(self.implied_probability * 100.0, 1)
    }

    /// Split the matchup label back into `(away, home)`.
    pub fn sides(&self) -> Option<(&str, &str)> {
        self.matchup.split_once(" @ ")
    }

    /// Whether `team` plays on either side of this bet's matchup.
    pub fn involves(&self, team: &str) -> bool {
        self.sides()
            .map(|(away, home)| away == team || home == team)
            .unwrap_or(false)
    }

    /// Whether the feed supplied a usable price for this outcome.
    pub fn is_priced(&self) -> bool {
        self.american_odds != 0
    }

    /// Helper to build a test/sample bet with sensible defaults.
    #[cfg(test)]
    pub fn sample(ev_pct: f64) -> Self {
        EvaluatedBet {
            date: "2024-01-01".to_string(),
            matchup: "Boston Celtics @ Miami Heat".to_string(),
            market: "h2h".to_string(),
            selection: "Miami Heat".to_string(),
            american_odds: 120,
            model_probability: 0.6712,
            implied_probability: 100.0 / 220.0,
            expected_value_pct: ev_pct,
            result: BetResult::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Lenient deserializers
// ---------------------------------------------------------------------------

/// Accept a missing or `null` list as empty.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(price_from_value))
}

/// Interpret a JSON value as an American odds price.
///
/// Integers, integral floats and numeric strings (`"+150"`) are accepted.
/// Zero, fractional values and anything non-numeric are unpriced.
pub fn price_from_value(value: &serde_json::Value) -> Option<i32> {
    let raw = match value {
        serde_json::Value::Number(n) => n.as_f64()?,
        serde_json::Value::String(s) => {
            let s = s.trim();
            s.strip_prefix('+').unwrap_or(s).parse::<f64>().ok()?
        }
        _ => return None,
    };

    if !raw.is_finite() || raw == 0.0 || raw.fract() != 0.0 || raw.abs() > i32::MAX as f64 {
        return None;
    }
    Some(raw as i32)
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for ODDSBOARD.
#[derive(Debug, thiserror::Error)]
pub enum OddsboardError {
    #[error("Odds feed error ({feed}): {message}")]
    Feed { feed: String, message: String },

    #[error("Ledger error: {0}")]
    Ledger(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
