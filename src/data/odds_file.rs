//! Replay feed: reads a saved Odds API payload from disk.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::OddsFeed;
use crate::engine::normalizer::parse_payload;
use crate::types::GameOdds;

pub struct FileFeed {
    path: PathBuf,
}

impl FileFeed {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl OddsFeed for FileFeed {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_games(&self) -> Result<Vec<GameOdds>> {
        debug!(path = %self.path.display(), "Reading saved odds payload");
        let text = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read odds payload {}", self.path.display()))?;
        let payload: Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse odds payload {}", self.path.display()))?;
        Ok(parse_payload(payload))
    }
}
