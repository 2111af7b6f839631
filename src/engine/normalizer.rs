//! Outcome normalizer.
//!
//! Flattens the nested feed payload (games → bookmakers → markets →
//! outcomes) into one record per wagerable outcome. Anything that cannot
//! be interpreted is skipped at the narrowest level possible: a bad game
//! drops that game, a keyless market drops that market, a nameless
//! outcome drops that outcome. Nothing here returns an error.

use std::collections::BTreeSet;

use serde_json::Value;
use tracing::{debug, warn};

use crate::types::{GameOdds, Matchup};

/// One outcome with the game and market context it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedOutcome<'a> {
    pub matchup: Matchup,
    pub bookmaker: &'a str,
    pub market: &'a str,
    pub selection: &'a str,
    /// American odds; `None` when the feed had no usable price.
    pub price: Option<i32>,
}

impl NormalizedOutcome<'_> {
    pub fn matchup_label(&self) -> String {
        self.matchup.label()
    }
}

/// Decode a raw feed payload into games.
///
/// A payload that is not a JSON array yields no games. Each element is
/// decoded on its own so one malformed game cannot sink the batch.
pub fn parse_payload(payload: Value) -> Vec<GameOdds> {
    let items = match payload {
        Value::Array(items) => items,
        Value::Null => return Vec::new(),
        other => {
            warn!(kind = json_kind(&other), "Odds payload is not an array, ignoring");
            return Vec::new();
        }
    };

    let total = items.len();
    let games: Vec<GameOdds> = items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| match serde_json::from_value::<GameOdds>(item) {
            Ok(game) => Some(game),
            Err(e) => {
                warn!(index = idx, error = %e, "Skipping undecodable game");
                None
            }
        })
        .collect();

    debug!(total, decoded = games.len(), "Odds payload decoded");
    games
}

/// Lazily flatten games into outcomes, in feed order.
///
/// The iterator borrows `games` and holds no other state, so calling this
/// again re-traverses the same input from the start.
pub fn normalize(games: &[GameOdds]) -> impl Iterator<Item = NormalizedOutcome<'_>> + '_ {
    games.iter().flat_map(|game| {
        let matchup = game.matchup();
        if matchup.is_none() {
            debug!(
                id = game.id.as_deref().unwrap_or("?"),
                home = game.home_team.as_deref().unwrap_or("?"),
                "Skipping game without a clean two-team matchup"
            );
        }

        matchup.into_iter().flat_map(move |matchup| {
            game.bookmakers.iter().flat_map(move |bookmaker| {
                let book = bookmaker.key.as_deref().unwrap_or("unknown");
                let matchup = matchup.clone();

                bookmaker
                    .markets
                    .iter()
                    .filter_map(|market| market.key.as_deref().map(|key| (key, market)))
                    .flat_map(move |(key, market)| {
                        let matchup = matchup.clone();
                        market.outcomes.iter().filter_map(move |outcome| {
                            let selection = outcome.name.as_deref()?;
                            Some(NormalizedOutcome {
                                matchup: matchup.clone(),
                                bookmaker: book,
                                market: key,
                                selection,
                                price: outcome.price,
                            })
                        })
                    })
            })
        })
    })
}

/// Every team name mentioned by the feed, sorted and de-duplicated.
pub fn all_teams(games: &[GameOdds]) -> Vec<String> {
    let mut teams = BTreeSet::new();
    for game in games {
        let named = game
            .home_team
            .iter()
            .chain(game.away_team.iter())
            .chain(game.teams.iter().flatten());
        for team in named {
            let team = team.trim();
            if !team.is_empty() {
                teams.insert(team.to_string());
            }
        }
    }
    teams.into_iter().collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
