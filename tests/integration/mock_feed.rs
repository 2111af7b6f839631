//! Mock odds feed for integration testing.
//!
//! Returns a fixed slate (or a forced error) and counts how often it was
//! polled. No network, no disk.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use oddsboard::data::OddsFeed;
use oddsboard::engine::normalizer::parse_payload;
use oddsboard::types::GameOdds;

pub struct MockFeed {
    games: Vec<GameOdds>,
    /// If set, every fetch fails with this message.
    force_error: Mutex<Option<String>>,
    calls: Arc<AtomicUsize>,
}

impl MockFeed {
    pub fn new(payload: Value) -> Self {
        Self {
            games: parse_payload(payload),
            force_error: Mutex::new(None),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(msg: &str) -> Self {
        let feed = Self::new(Value::Array(Vec::new()));
        *feed.force_error.lock().unwrap() = Some(msg.to_string());
        feed
    }

    /// Shared counter, readable after the feed is boxed into a pipeline.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }
}

#[async_trait]
impl OddsFeed for MockFeed {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_games(&self) -> Result<Vec<GameOdds>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        Ok(self.games.clone())
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Two NBA games, two books, three markets, plus one game with no away
/// team that must contribute nothing.
pub fn nba_slate() -> Value {
    json!([
        {
            "id": "evt-1",
            "sport_key": "basketball_nba",
            "commence_time": "2024-03-01T00:30:00Z",
            "home_team": "Miami Heat",
            "away_team": "Boston Celtics",
            "bookmakers": [
                { "key": "draftkings", "title": "DraftKings", "markets": [
                    { "key": "h2h", "outcomes": [
                        { "name": "Boston Celtics", "price": -150 },
                        { "name": "Miami Heat", "price": 130 }
                    ]},
                    { "key": "totals", "outcomes": [
                        { "name": "Over", "price": -110, "point": 214.5 },
                        { "name": "Under", "price": -110, "point": 214.5 }
                    ]}
                ]},
                { "key": "fanduel", "title": "FanDuel", "markets": [
                    { "key": "spreads", "outcomes": [
                        { "name": "Boston Celtics", "price": "+105", "point": -3.5 },
                        { "name": "Miami Heat", "price": null, "point": 3.5 }
                    ]}
                ]}
            ]
        },
        {
            "id": "evt-2",
            "sport_key": "basketball_nba",
            "home_team": "Denver Nuggets",
            "away_team": "Utah Jazz",
            "bookmakers": [
                { "key": "draftkings", "markets": [
                    { "key": "h2h", "outcomes": [
                        { "name": "Utah Jazz", "price": 400 },
                        { "name": "Denver Nuggets", "price": -550 }
                    ]}
                ]}
            ]
        },
        {
            "id": "evt-3",
            "home_team": "Orlando Magic",
            "bookmakers": [
                { "key": "draftkings", "markets": [
                    { "key": "h2h", "outcomes": [{ "name": "Orlando Magic", "price": -200 }] }
                ]}
            ]
        }
    ])
}

/// One game, one book, one h2h market.
pub fn single_h2h(home: &str, away: &str, home_price: i32, away_price: i32) -> Value {
    json!({
        "home_team": home,
        "away_team": away,
        "bookmakers": [{ "key": "dk", "markets": [{ "key": "h2h", "outcomes": [
            { "name": away, "price": away_price },
            { "name": home, "price": home_price }
        ]}]}]
    })
}
