//! Odds feeds.
//!
//! Defines the `OddsFeed` trait and its implementations: the live
//! Odds API client and a file replay feed for offline runs.

pub mod odds_api;
pub mod odds_file;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{FeedConfig, FeedSource};
use crate::session::Session;
use crate::types::{GameOdds, OddsboardError};

pub use odds_api::OddsApiClient;
pub use odds_file::FileFeed;

/// Abstraction over odds sources.
#[async_trait]
pub trait OddsFeed: Send + Sync {
    /// Short identifier for logs.
    fn name(&self) -> &str;

    /// Fetch the current slate of games with their bookmaker prices.
    async fn fetch_games(&self) -> Result<Vec<GameOdds>>;
}

/// Fetch from `feed`, turning any failure into an empty slate.
pub async fn fetch_or_empty(feed: &dyn OddsFeed) -> Vec<GameOdds> {
    match feed.fetch_games().await {
        Ok(games) => {
            info!(feed = feed.name(), games = games.len(), "Fetched odds");
            games
        }
        Err(e) => {
            warn!(feed = feed.name(), error = %e, "Odds fetch failed, continuing with no games");
            Vec::new()
        }
    }
}

/// Build the feed selected in config.
pub fn build_feed(config: &FeedConfig, session: &Session) -> Result<Box<dyn OddsFeed>> {
    match config.source {
        FeedSource::Api => Ok(Box::new(OddsApiClient::new(config, session)?)),
        FeedSource::File => {
            let path = config
                .payload_path
                .as_deref()
                .ok_or_else(|| {
                    OddsboardError::Config("feed.payload_path is required when feed.source = \"file\"".into())
                })?;
            Ok(Box::new(FileFeed::new(path)))
        }
    }
}
